//! Injury-report scoring: how much a team's listed injuries should cost it.
//!
//! Each injury is worth `severity × position_weight × status_multiplier`
//! score points. A questionable backup punter is noise; a quarterback ruled
//! out swings the whole matchup.

use crate::db::models::{InjuryRecord, InjuryStatus, PositionCode};

/// Positional importance on the injury report. Quarterbacks dominate;
/// skill positions and line play matter; everything else is marginal.
pub fn position_weight(position: PositionCode) -> f64 {
    match position {
        PositionCode::QB => 3.0,
        PositionCode::RB | PositionCode::WR => 1.5,
        PositionCode::TE | PositionCode::OL => 1.2,
        PositionCode::DL | PositionCode::LB => 1.1,
        _ => 0.8,
    }
}

/// Likelihood-of-absence scaling for the report status.
pub fn status_multiplier(status: InjuryStatus) -> f64 {
    match status {
        InjuryStatus::Out => 1.0,
        InjuryStatus::Doubtful => 0.7,
        InjuryStatus::Questionable => 0.4,
        InjuryStatus::Probable => 0.2,
    }
}

/// Total score penalty for one team's injury report.
pub fn team_penalty(injuries: &[InjuryRecord]) -> f64 {
    injuries
        .iter()
        .map(|injury| {
            f64::from(injury.severity)
                * position_weight(injury.position)
                * status_multiplier(injury.status)
        })
        .sum()
}

/// Whether any quarterback appears on the report, regardless of status.
pub fn has_qb_injury(injuries: &[InjuryRecord]) -> bool {
    injuries
        .iter()
        .any(|injury| injury.position == PositionCode::QB)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn injury(position: PositionCode, severity: u8, status: InjuryStatus) -> InjuryRecord {
        InjuryRecord {
            position,
            severity,
            status,
        }
    }

    #[test]
    fn qb_out_dominates_the_penalty() {
        let qb = team_penalty(&[injury(PositionCode::QB, 4, InjuryStatus::Out)]);
        let punter = team_penalty(&[injury(PositionCode::P, 4, InjuryStatus::Out)]);
        assert_relative_eq!(qb, 12.0, epsilon = 1e-9);
        assert_relative_eq!(punter, 3.2, epsilon = 1e-9);
    }

    #[test]
    fn status_discounts_the_same_injury() {
        let out = team_penalty(&[injury(PositionCode::WR, 3, InjuryStatus::Out)]);
        let questionable = team_penalty(&[injury(PositionCode::WR, 3, InjuryStatus::Questionable)]);
        assert!(questionable < out);
        assert_relative_eq!(questionable, 1.8, epsilon = 1e-9);
    }

    #[test]
    fn penalties_sum_across_the_report() {
        let report = [
            injury(PositionCode::QB, 2, InjuryStatus::Doubtful),
            injury(PositionCode::OL, 3, InjuryStatus::Out),
        ];
        assert_relative_eq!(team_penalty(&report), 2.0 * 3.0 * 0.7 + 3.0 * 1.2, epsilon = 1e-9);
    }

    #[test]
    fn qb_detection_ignores_status() {
        assert!(has_qb_injury(&[injury(
            PositionCode::QB,
            1,
            InjuryStatus::Probable
        )]));
        assert!(!has_qb_injury(&[injury(
            PositionCode::RB,
            5,
            InjuryStatus::Out
        )]));
    }

    #[test]
    fn empty_report_costs_nothing() {
        assert_relative_eq!(team_penalty(&[]), 0.0, epsilon = 1e-12);
    }
}
