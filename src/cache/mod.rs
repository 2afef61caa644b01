//! Prediction cache and regeneration scheduling.
//!
//! Generated predictions for the active week live in a single persisted
//! record. Reads never trigger work; staleness is only evaluated when a
//! caller asks, and regeneration replaces the record wholesale so readers
//! never observe a half-built week.

use anyhow::Result;
use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::db::models::{Game, PredictionCacheEntry, StoredPrediction};
use crate::db::{self, keys, Store};
use crate::engine;
use crate::provider::MetricsProvider;
use crate::tracker::OutcomeTracker;

/// Cached weekly predictions with lazy staleness checks and a guard
/// against concurrent regeneration.
#[derive(Clone)]
pub struct PredictionCache {
    store: Arc<dyn Store>,
    provider: Arc<dyn MetricsProvider>,
    tracker: OutcomeTracker,
    staleness: Duration,
    inter_game_delay: std::time::Duration,
    busy: Arc<AtomicBool>,
}

impl PredictionCache {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn MetricsProvider>,
        tracker: OutcomeTracker,
        staleness: Duration,
        inter_game_delay: std::time::Duration,
    ) -> Self {
        PredictionCache {
            store,
            provider,
            tracker,
            staleness,
            inter_game_delay,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    fn load_entry(&self) -> Result<Option<PredictionCacheEntry>> {
        db::read_record(self.store.as_ref(), keys::PREDICTION_CACHE)
    }

    /// Whether the cached record can still serve the given week.
    ///
    /// Missing, for another week, empty, or older than the staleness
    /// window all mean "regenerate".
    pub fn needs_refresh(&self, week: i32) -> Result<bool> {
        let Some(entry) = self.load_entry()? else {
            return Ok(true);
        };
        if entry.week != week || entry.predictions.is_empty() {
            return Ok(true);
        }
        Ok(entry.is_stale(Utc::now(), self.staleness))
    }

    /// Startup path: reuse a fresh cache, regenerate otherwise.
    pub async fn initialize(&self, games: &[Game], week: i32) -> Result<()> {
        if self.needs_refresh(week)? {
            self.generate(games, week).await?;
        } else {
            let count = self.load_entry()?.map_or(0, |e| e.predictions.len());
            info!("Reusing cached predictions for week {} ({} games)", week, count);
        }
        Ok(())
    }

    /// Regenerate immediately, bypassing the staleness check. Returns
    /// false when a generation pass is already running.
    pub async fn force_refresh(&self, games: &[Game], week: i32) -> Result<bool> {
        self.generate(games, week).await
    }

    /// Re-fetch the schedule and regenerate; the manual-refresh path.
    pub async fn refresh_now(&self, week: i32) -> Result<bool> {
        let games = self.provider.schedule(week).await?;
        self.force_refresh(&games, week).await
    }

    /// Run one generation pass over the week's games. Returns false (and
    /// does nothing) if another pass holds the busy flag.
    pub async fn generate(&self, games: &[Game], week: i32) -> Result<bool> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Prediction generation already in progress, skipping");
            return Ok(false);
        }
        let result = self.generate_inner(games, week).await;
        self.busy.store(false, Ordering::SeqCst);
        result.map(|()| true)
    }

    async fn generate_inner(&self, games: &[Game], week: i32) -> Result<()> {
        info!(
            "Generating predictions for week {} ({} scheduled games) via {}",
            week,
            games.len(),
            self.provider.name()
        );
        let mut predictions = Vec::new();

        for game in games {
            if game.is_completed {
                continue;
            }
            let stored = match self.predict_game(game).await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!("Skipping {} vs {}: {}", game.home_team, game.away_team, e);
                    continue;
                }
            };
            self.tracker.record_outcome(&stored, game)?;
            predictions.push(stored);

            if !self.inter_game_delay.is_zero() {
                tokio::time::sleep(self.inter_game_delay).await;
            }
        }

        let entry = PredictionCacheEntry {
            week,
            last_generated: Utc::now(),
            predictions,
        };
        info!(
            "Caching {} predictions for week {}",
            entry.predictions.len(),
            week
        );
        db::write_record(self.store.as_ref(), keys::PREDICTION_CACHE, &entry)?;
        // Leaderboard totals grow with every recorded prediction.
        self.tracker.get_leaderboard()?;
        Ok(())
    }

    async fn predict_game(&self, game: &Game) -> Result<StoredPrediction> {
        let home = self.provider.team_metrics(&game.home_team).await?;
        let away = self.provider.team_metrics(&game.away_team).await?;
        let home_injuries = self.provider.injuries(&game.home_team).await?;
        let away_injuries = self.provider.injuries(&game.away_team).await?;

        let prediction = engine::predict(&home, &away, &home_injuries, &away_injuries);
        let generated_at = Utc::now();
        Ok(StoredPrediction {
            id: format!("pred-{}-{}", game.id, generated_at.timestamp_millis()),
            game_id: game.id.clone(),
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            generated_at,
            prediction,
        })
    }

    pub fn get_prediction(&self, game_id: &str) -> Result<Option<StoredPrediction>> {
        let entry = self.load_entry()?;
        Ok(entry.and_then(|e| e.predictions.into_iter().find(|p| p.game_id == game_id)))
    }

    pub fn get_all_predictions(&self) -> Result<Vec<StoredPrediction>> {
        Ok(self.load_entry()?.map(|e| e.predictions).unwrap_or_default())
    }

    /// Drop the cached record; the next staleness check regenerates.
    pub fn clear(&self) -> Result<()> {
        self.store.delete(keys::PREDICTION_CACHE)
    }

    /// Background regeneration loop. Every period (plus a small random
    /// offset) the schedule is re-fetched and the cache regenerated,
    /// fresh or not; a shutdown signal on the watch channel ends the loop.
    pub async fn run_scheduler(
        self,
        week: i32,
        period: std::time::Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; startup already generated.
        interval.tick().await;
        info!("Regeneration scheduler running every {:?}", period);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => {
                    info!("Scheduler shutting down");
                    return;
                }
            }

            let jitter = rand::thread_rng().gen_range(0..30);
            tokio::time::sleep(std::time::Duration::from_secs(jitter)).await;

            let games = match self.provider.schedule(week).await {
                Ok(games) => games,
                Err(e) => {
                    error!("Schedule fetch failed, keeping stale cache: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.generate(&games, week).await {
                error!("Scheduled regeneration failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::TeamMetrics;
    use crate::db::MemoryStore;
    use crate::provider::StaticProvider;
    use chrono::TimeZone;

    fn metrics(ppg: f64) -> TeamMetrics {
        TeamMetrics {
            points_per_game: ppg,
            points_allowed: 21.0,
            total_yards: 340.0,
            yards_allowed: 330.0,
            turnover_diff: 0.0,
            strength_of_schedule: None,
        }
    }

    fn game(id: &str, home: &str, away: &str, week: i32, completed: bool) -> Game {
        Game {
            id: id.to_string(),
            week,
            home_team: home.to_string(),
            away_team: away.to_string(),
            is_completed: completed,
            kickoff: Utc.with_ymd_and_hms(2025, 9, 7, 17, 0, 0).unwrap(),
        }
    }

    fn cache_with(provider: StaticProvider) -> PredictionCache {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let tracker = OutcomeTracker::new(store.clone(), "gridcast-v2", 2025, false);
        PredictionCache::new(
            store,
            Arc::new(provider),
            tracker,
            Duration::hours(12),
            std::time::Duration::ZERO,
        )
    }

    fn two_team_provider() -> StaticProvider {
        StaticProvider::new()
            .with_team("PHI", metrics(27.0), vec![])
            .with_team("DAL", metrics(22.0), vec![])
            .with_team("KC", metrics(25.0), vec![])
            .with_team("BUF", metrics(24.0), vec![])
    }

    #[tokio::test]
    async fn empty_store_needs_refresh() {
        let cache = cache_with(two_team_provider());
        assert!(cache.needs_refresh(1).unwrap());
    }

    #[tokio::test]
    async fn fresh_generation_satisfies_same_week_only() {
        let cache = cache_with(two_team_provider());
        let games = vec![game("g1", "PHI", "DAL", 1, false)];
        assert!(cache.generate(&games, 1).await.unwrap());

        assert!(!cache.needs_refresh(1).unwrap());
        assert!(cache.needs_refresh(2).unwrap());
    }

    #[tokio::test]
    async fn an_aged_cache_goes_stale() {
        let cache = cache_with(two_team_provider());
        let games = vec![game("g1", "PHI", "DAL", 1, false)];
        cache.generate(&games, 1).await.unwrap();

        let mut entry = cache.load_entry().unwrap().unwrap();
        entry.last_generated = Utc::now() - Duration::hours(13);
        db::write_record(cache.store.as_ref(), keys::PREDICTION_CACHE, &entry).unwrap();

        assert!(cache.needs_refresh(1).unwrap());
    }

    #[tokio::test]
    async fn an_empty_prediction_list_is_never_fresh() {
        let cache = cache_with(two_team_provider());
        // All games already played: the pass completes but caches nothing.
        let games = vec![game("g1", "PHI", "DAL", 1, true)];
        cache.generate(&games, 1).await.unwrap();

        assert!(cache.get_all_predictions().unwrap().is_empty());
        assert!(cache.needs_refresh(1).unwrap());
    }

    #[tokio::test]
    async fn completed_games_are_skipped() {
        let cache = cache_with(two_team_provider());
        let games = vec![
            game("g1", "PHI", "DAL", 1, true),
            game("g2", "KC", "BUF", 1, false),
        ];
        cache.generate(&games, 1).await.unwrap();

        let predictions = cache.get_all_predictions().unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].game_id, "g2");
    }

    #[tokio::test]
    async fn a_failing_game_does_not_sink_the_batch() {
        // "NYJ" has no fixture data, so its game fails while the other
        // two still produce predictions.
        let cache = cache_with(two_team_provider());
        let games = vec![
            game("g1", "PHI", "DAL", 1, false),
            game("g2", "NYJ", "KC", 1, false),
            game("g3", "KC", "BUF", 1, false),
        ];
        cache.generate(&games, 1).await.unwrap();

        let predictions = cache.get_all_predictions().unwrap();
        assert_eq!(predictions.len(), 2);
        assert!(predictions.iter().all(|p| p.game_id != "g2"));
    }

    #[tokio::test]
    async fn regeneration_replaces_the_record_wholesale() {
        let cache = cache_with(two_team_provider());
        cache
            .generate(&[game("g1", "PHI", "DAL", 1, false)], 1)
            .await
            .unwrap();
        cache
            .generate(&[game("g9", "KC", "BUF", 2, false)], 2)
            .await
            .unwrap();

        let predictions = cache.get_all_predictions().unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].game_id, "g9");
        assert!(cache.get_prediction("g1").unwrap().is_none());
    }

    #[tokio::test]
    async fn busy_flag_makes_generation_a_noop() {
        let cache = cache_with(two_team_provider());
        cache.busy.store(true, Ordering::SeqCst);

        let ran = cache
            .generate(&[game("g1", "PHI", "DAL", 1, false)], 1)
            .await
            .unwrap();
        assert!(!ran);
        assert!(cache.get_all_predictions().unwrap().is_empty());
        // The flag belongs to the pass that set it; a skip must not clear it.
        assert!(cache.busy.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn every_prediction_gets_a_pending_outcome() {
        let cache = cache_with(two_team_provider());
        let games = vec![
            game("g1", "PHI", "DAL", 1, false),
            game("g2", "KC", "BUF", 1, false),
        ];
        cache.generate(&games, 1).await.unwrap();

        let outcomes = cache.tracker.get_outcomes().unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.is_correct.is_none()));
    }

    #[tokio::test]
    async fn prediction_ids_are_unique_per_game() {
        let cache = cache_with(two_team_provider());
        let games = vec![
            game("g1", "PHI", "DAL", 1, false),
            game("g2", "KC", "BUF", 1, false),
        ];
        cache.generate(&games, 1).await.unwrap();

        let predictions = cache.get_all_predictions().unwrap();
        assert!(predictions[0].id.starts_with("pred-g1-"));
        assert!(predictions[1].id.starts_with("pred-g2-"));
        assert_ne!(predictions[0].id, predictions[1].id);
    }

    #[tokio::test]
    async fn clearing_the_cache_forces_a_refresh() {
        let cache = cache_with(two_team_provider());
        cache
            .generate(&[game("g1", "PHI", "DAL", 1, false)], 1)
            .await
            .unwrap();
        assert!(!cache.needs_refresh(1).unwrap());

        cache.clear().unwrap();
        assert!(cache.needs_refresh(1).unwrap());
        assert!(cache.get_all_predictions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn initialize_reuses_a_fresh_cache() {
        let cache = cache_with(two_team_provider());
        let games = vec![game("g1", "PHI", "DAL", 1, false)];
        cache.initialize(&games, 1).await.unwrap();
        let first = cache.get_all_predictions().unwrap();

        cache.initialize(&games, 1).await.unwrap();
        let second = cache.get_all_predictions().unwrap();
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].generated_at, second[0].generated_at);
    }
}
