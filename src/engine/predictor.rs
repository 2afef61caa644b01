//! Pregame win-probability model for NFL matchups.
//!
//! A weighted-rule scorer, not a statistical model: both teams start from the
//! same baseline and a fixed sequence of rules moves the two scores apart.
//! Each rule also explains itself — when its effect clears the rule's
//! materiality threshold it appends a human-readable factor, so the UI can
//! show *why* the model leans the way it does.
//!
//! Rules in evaluation order:
//! 1. Offense-vs-defense matchup (always scored, factor on any edge)
//! 2. Turnover differential
//! 3. Injury impact (see [`super::injuries`])
//! 4. Home-field advantage (unconditional)
//! 5. Point-differential quality
//! 6. Strength of schedule
//!
//! The function is pure and deterministic: identical inputs always produce an
//! identical [`PredictionResult`].

use crate::db::models::{InjuryRecord, PredictionFactor, PredictionResult, TeamMetrics};

use super::injuries;

/// Baseline score both teams start from.
const BASE_SCORE: f64 = 50.0;
/// Flat score bonus for playing at home.
const HOME_FIELD_BONUS: f64 = 4.2;
/// Scores are clamped here before the probability division; prevents
/// degenerate splits from heavily penalized teams.
const SCORE_FLOOR: f64 = 15.0;

/// Weight on the offense-vs-defense matchup margin.
const MATCHUP_WEIGHT: f64 = 1.2;
/// Cross-matchup discount: a defense only partially cancels an offense.
const DEFENSE_DISCOUNT: f64 = 0.8;
/// Weight on the turnover-differential margin.
const TURNOVER_WEIGHT: f64 = 0.8;
/// Turnover margins at or below this are noise.
const TURNOVER_THRESHOLD: f64 = 3.0;
/// Weight on the net point-differential margin.
const POINT_DIFF_WEIGHT: f64 = 0.6;
const POINT_DIFF_THRESHOLD: f64 = 2.0;
/// Strength of schedule is reported on 0–1; scaled up to score points.
const SCHEDULE_WEIGHT: f64 = 15.0;
const SCHEDULE_THRESHOLD: f64 = 2.0;
/// Injury-penalty gap required for the comparative injury factor.
const INJURY_GAP_THRESHOLD: f64 = 3.0;

/// Confidence band: 45 = coin flip with a lean, 92 = as sure as this model gets.
const CONFIDENCE_FLOOR: f64 = 45.0;
const CONFIDENCE_CEILING: f64 = 92.0;
/// Score-gap multiplier feeding the confidence scalar.
const CONFIDENCE_SLOPE: f64 = 3.0;

/// Factor list is truncated here, evaluation order preserved.
const MAX_FACTORS: usize = 6;

/// Predict the outcome of one game from both teams' season metrics and
/// injury reports. Callers supply already-validated metrics; there is no
/// error path.
pub fn predict(
    home: &TeamMetrics,
    away: &TeamMetrics,
    home_injuries: &[InjuryRecord],
    away_injuries: &[InjuryRecord],
) -> PredictionResult {
    let mut home_score = BASE_SCORE;
    let mut away_score = BASE_SCORE;
    let mut factors: Vec<PredictionFactor> = Vec::new();

    // 1. Offense-vs-defense matchup
    let home_attack = offense_power(home) - DEFENSE_DISCOUNT * defense_power(away);
    let away_attack = offense_power(away) - DEFENSE_DISCOUNT * defense_power(home);
    let matchup_margin = (home_attack - away_attack).abs();
    if home_attack > away_attack {
        home_score += MATCHUP_WEIGHT * matchup_margin;
        factors.push(stats_factor(
            "Home offense has the edge over the away defense",
        ));
    } else if away_attack > home_attack {
        away_score += MATCHUP_WEIGHT * matchup_margin;
        factors.push(stats_factor(
            "Away offense has the edge over the home defense",
        ));
    }

    // 2. Turnover differential
    let turnover_margin = (home.turnover_diff - away.turnover_diff).abs();
    if turnover_margin > TURNOVER_THRESHOLD {
        if home.turnover_diff > away.turnover_diff {
            home_score += TURNOVER_WEIGHT * turnover_margin;
            factors.push(stats_factor("Home team wins the turnover battle"));
        } else {
            away_score += TURNOVER_WEIGHT * turnover_margin;
            factors.push(stats_factor("Away team wins the turnover battle"));
        }
    }

    // 3. Injury impact
    let home_penalty = injuries::team_penalty(home_injuries);
    let away_penalty = injuries::team_penalty(away_injuries);
    home_score -= home_penalty;
    away_score -= away_penalty;
    if injuries::has_qb_injury(home_injuries) {
        factors.push(injury_factor("Home quarterback on the injury report"));
    }
    if injuries::has_qb_injury(away_injuries) {
        factors.push(injury_factor("Away quarterback on the injury report"));
    }
    let injury_gap = (home_penalty - away_penalty).abs();
    if injury_gap > INJURY_GAP_THRESHOLD {
        if home_penalty > away_penalty {
            factors.push(injury_factor("Home team carrying more significant injuries"));
        } else {
            factors.push(injury_factor("Away team carrying more significant injuries"));
        }
    }

    // 4. Home-field advantage (unconditional)
    home_score += HOME_FIELD_BONUS;
    factors.push(PredictionFactor {
        text: "Home field advantage".to_string(),
        source: "Venue".to_string(),
        reference: "home-field".to_string(),
    });

    // 5. Point-differential quality
    let home_quality = home.points_per_game - home.points_allowed;
    let away_quality = away.points_per_game - away.points_allowed;
    let quality_margin = (home_quality - away_quality).abs();
    if quality_margin > POINT_DIFF_THRESHOLD {
        if home_quality > away_quality {
            home_score += POINT_DIFF_WEIGHT * quality_margin;
            factors.push(stats_factor("Home team owns the better point differential"));
        } else {
            away_score += POINT_DIFF_WEIGHT * quality_margin;
            factors.push(stats_factor("Away team owns the better point differential"));
        }
    }

    // 6. Strength of schedule
    if let (Some(home_sos), Some(away_sos)) =
        (home.strength_of_schedule, away.strength_of_schedule)
    {
        let schedule_margin = SCHEDULE_WEIGHT * (home_sos - away_sos).abs();
        if schedule_margin > SCHEDULE_THRESHOLD {
            if home_sos > away_sos {
                home_score += schedule_margin;
                factors.push(stats_factor("Home team battle-tested by a tougher schedule"));
            } else {
                away_score += schedule_margin;
                factors.push(stats_factor("Away team battle-tested by a tougher schedule"));
            }
        }
    }

    // Post-processing
    let home_score = home_score.max(SCORE_FLOOR);
    let away_score = away_score.max(SCORE_FLOOR);
    let home_win_probability =
        (100.0 * home_score / (home_score + away_score)).round() as u8;
    let away_win_probability = 100 - home_win_probability;
    let confidence = (CONFIDENCE_FLOOR + CONFIDENCE_SLOPE * (home_score - away_score).abs())
        .round()
        .min(CONFIDENCE_CEILING) as u8;
    factors.truncate(MAX_FACTORS);

    PredictionResult {
        home_win_probability,
        away_win_probability,
        confidence,
        factors,
    }
}

/// Scoring output proxy: points per game plus a yardage term.
fn offense_power(team: &TeamMetrics) -> f64 {
    team.points_per_game + team.total_yards / 25.0
}

/// Scoring prevention proxy: yards and points allowed, inverted.
fn defense_power(team: &TeamMetrics) -> f64 {
    (450.0 - team.yards_allowed) / 10.0 + (35.0 - team.points_allowed)
}

fn stats_factor(text: &str) -> PredictionFactor {
    PredictionFactor {
        text: text.to_string(),
        source: "Season statistics".to_string(),
        reference: "team-metrics".to_string(),
    }
}

fn injury_factor(text: &str) -> PredictionFactor {
    PredictionFactor {
        text: text.to_string(),
        source: "Injury report".to_string(),
        reference: "injury-report".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{InjuryStatus, PositionCode};

    fn metrics(
        ppg: f64,
        pa: f64,
        yards: f64,
        yards_allowed: f64,
        turnover_diff: f64,
        sos: Option<f64>,
    ) -> TeamMetrics {
        TeamMetrics {
            points_per_game: ppg,
            points_allowed: pa,
            total_yards: yards,
            yards_allowed,
            turnover_diff,
            strength_of_schedule: sos,
        }
    }

    fn average_team() -> TeamMetrics {
        metrics(22.5, 22.5, 330.0, 330.0, 0.0, Some(0.5))
    }

    fn injury(position: PositionCode, severity: u8, status: InjuryStatus) -> InjuryRecord {
        InjuryRecord {
            position,
            severity,
            status,
        }
    }

    #[test]
    fn probabilities_always_sum_to_100_and_confidence_stays_in_band() {
        // Sweep a grid including degenerate inputs that trip the score floor.
        for ppg in [0.0, 10.0, 22.5, 35.0] {
            for pa in [10.0, 22.5, 40.0] {
                for yards in [150.0, 330.0, 450.0] {
                    for to in [-12.0, 0.0, 12.0] {
                        let home = metrics(ppg, pa, yards, 330.0, to, Some(0.6));
                        let away = metrics(22.5, 22.5, 330.0, yards, -to, Some(0.4));
                        let result = predict(&home, &away, &[], &[]);
                        assert_eq!(
                            result.home_win_probability as u32
                                + result.away_win_probability as u32,
                            100
                        );
                        assert!(
                            (45..=92).contains(&result.confidence),
                            "confidence {} out of band",
                            result.confidence
                        );
                        assert!(result.factors.len() <= 6);
                    }
                }
            }
        }
    }

    #[test]
    fn predict_is_deterministic() {
        let home = metrics(27.0, 20.0, 380.0, 310.0, 5.0, Some(0.55));
        let away = metrics(21.0, 24.0, 310.0, 360.0, -3.0, Some(0.45));
        let hurt = [injury(PositionCode::QB, 3, InjuryStatus::Questionable)];
        let first = predict(&home, &away, &hurt, &[]);
        let second = predict(&home, &away, &hurt, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn identical_teams_decided_by_home_field_alone() {
        let team = average_team();
        let result = predict(&team, &team, &[], &[]);

        assert!(result.home_win_probability > 50);
        // Only the 4.2-point home bonus separates the scores, so the
        // confidence scalar sits near its floor.
        assert!(result.confidence < 60, "confidence {}", result.confidence);
        assert_eq!(result.factors.len(), 1);
        assert_eq!(result.factors[0].reference, "home-field");
    }

    #[test]
    fn dominant_home_team_beats_the_even_matchup_baseline() {
        let team = average_team();
        let baseline = predict(&team, &team, &[], &[]);

        let strong = metrics(30.0, 17.0, 400.0, 300.0, 8.0, Some(0.65));
        let weak = metrics(17.0, 27.0, 300.0, 400.0, -2.0, Some(0.40));
        let lopsided = predict(&strong, &weak, &[], &[]);

        assert!(lopsided.home_win_probability > baseline.home_win_probability);
        assert!(lopsided.confidence > baseline.confidence);
        // Every rule fires for the home side here.
        assert!(lopsided.factors.len() >= 4);
    }

    #[test]
    fn turnover_factor_needs_a_margin_above_three() {
        let team = average_team();
        let mut plus_three = team.clone();
        plus_three.turnover_diff = 3.0;
        let result = predict(&plus_three, &team, &[], &[]);
        assert!(!result
            .factors
            .iter()
            .any(|f| f.text.contains("turnover")));

        let mut plus_six = team.clone();
        plus_six.turnover_diff = 6.0;
        let result = predict(&plus_six, &team, &[], &[]);
        assert!(result
            .factors
            .iter()
            .any(|f| f.text.contains("turnover battle")));
    }

    #[test]
    fn qb_injury_drags_down_the_injured_side() {
        let team = average_team();
        let healthy = predict(&team, &team, &[], &[]);
        let hurt = [injury(PositionCode::QB, 4, InjuryStatus::Out)];
        let injured = predict(&team, &team, &hurt, &[]);

        assert!(injured.home_win_probability < healthy.home_win_probability);
        assert!(injured
            .factors
            .iter()
            .any(|f| f.text.contains("Home quarterback")));
    }

    #[test]
    fn comparative_injury_factor_needs_a_gap_above_three() {
        let team = average_team();
        // 1.5 × 2 × 1.0 = 3.0 penalty: at the threshold, not over it.
        let mild = [injury(PositionCode::RB, 2, InjuryStatus::Out)];
        let result = predict(&team, &team, &mild, &[]);
        assert!(!result
            .factors
            .iter()
            .any(|f| f.text.contains("more significant")));

        // QB out at severity 4: 12.0 penalty against a clean sheet.
        let severe = [injury(PositionCode::QB, 4, InjuryStatus::Out)];
        let result = predict(&team, &team, &severe, &[]);
        assert!(result
            .factors
            .iter()
            .any(|f| f.text.contains("Home team carrying more significant injuries")));
    }

    #[test]
    fn schedule_factor_skipped_when_either_side_lacks_sos() {
        let mut home = average_team();
        home.strength_of_schedule = Some(0.9);
        let mut away = average_team();
        away.strength_of_schedule = None;
        let result = predict(&home, &away, &[], &[]);
        assert!(!result
            .factors
            .iter()
            .any(|f| f.text.contains("schedule")));

        away.strength_of_schedule = Some(0.3);
        let result = predict(&home, &away, &[], &[]);
        assert!(result
            .factors
            .iter()
            .any(|f| f.text.contains("tougher schedule")));
    }

    #[test]
    fn factor_list_caps_at_six_in_evaluation_order() {
        // Force every rule to emit: matchup, turnovers, both QB factors,
        // the comparative injury factor, home field, point diff, schedule.
        let strong = metrics(31.0, 16.0, 410.0, 290.0, 9.0, Some(0.70));
        let weak = metrics(15.0, 29.0, 280.0, 420.0, -6.0, Some(0.35));
        let home_hurt = [injury(PositionCode::QB, 5, InjuryStatus::Out)];
        let away_hurt = [injury(PositionCode::QB, 1, InjuryStatus::Questionable)];
        let result = predict(&strong, &weak, &home_hurt, &away_hurt);

        assert_eq!(result.factors.len(), 6);
        // Evaluation order is preserved; truncation drops the tail rules.
        assert_eq!(result.factors[0].reference, "team-metrics");
        assert_eq!(result.factors[5].reference, "home-field");
    }

    #[test]
    fn score_floor_prevents_degenerate_probabilities() {
        // An absurd injury load would push the score negative without the floor.
        let team = average_team();
        let decimated: Vec<InjuryRecord> = (0..10)
            .map(|_| injury(PositionCode::QB, 5, InjuryStatus::Out))
            .collect();
        let result = predict(&team, &team, &decimated, &[]);
        assert!(result.home_win_probability > 0);
        assert_eq!(
            result.home_win_probability as u32 + result.away_win_probability as u32,
            100
        );
    }
}
