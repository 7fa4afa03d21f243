use crate::core::{CancelToken, Pipeline};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Fetch,
    ScoreAll,
    Filter,
    FavoriteQualifying,
    Persist,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fetched: usize,
    pub scored: usize,
    pub unscored: usize,
    pub qualifying: usize,
    pub favorited: usize,
    pub favorite_failures: usize,
    pub cancelled: bool,
    pub output_path: String,
}

pub struct ScoutEngine<P: Pipeline> {
    pipeline: P,
    cancel: CancelToken,
    state: Mutex<RunState>,
}

impl<P: Pipeline> ScoutEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::with_cancel(pipeline, CancelToken::new())
    }

    pub fn with_cancel(pipeline: P, cancel: CancelToken) -> Self {
        Self {
            pipeline,
            cancel,
            state: Mutex::new(RunState::Fetch),
        }
    }

    /// Last state the run entered; `Failed` after a fetch failure.
    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, state: RunState) {
        tracing::debug!(state = ?state, "Entering run state");
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// FETCH → SCORE_ALL → FILTER → FAVORITE_QUALIFYING → PERSIST → DONE.
    /// Only a fetch failure ends the run in `Failed`.
    pub async fn run(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        tracing::info!("🚀 Starting co-op scout run");

        self.enter(RunState::Fetch);
        let listings = match self.pipeline.extract().await {
            Ok(listings) => listings,
            Err(e) => {
                self.enter(RunState::Failed);
                tracing::error!(error = %e, "❌ Fetch failed, no listings to score");
                return Err(e);
            }
        };

        self.enter(RunState::ScoreAll);
        let batch = self.pipeline.score_all(&listings, &self.cancel).await;

        self.enter(RunState::Filter);
        let jobs = self.pipeline.filter(&batch.scored);

        self.enter(RunState::FavoriteQualifying);
        let favorites = self.pipeline.favorite(&jobs).await;

        self.enter(RunState::Persist);
        let output_path = self.pipeline.load(&jobs).await?;

        self.enter(RunState::Done);
        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            fetched: listings.len(),
            scored: batch.scored.len() - batch.unscored_count(),
            unscored: batch.unscored_count(),
            qualifying: jobs.len(),
            favorited: favorites.favorited,
            favorite_failures: favorites.failed.len(),
            cancelled: batch.cancelled,
            output_path,
        };

        tracing::info!(
            fetched = summary.fetched,
            scored = summary.scored,
            unscored = summary.unscored,
            qualifying = summary.qualifying,
            favorited = summary.favorited,
            favorite_failures = summary.favorite_failures,
            cancelled = summary.cancelled,
            "✅ Run finished in {}s",
            (summary.finished_at - summary.started_at).num_seconds()
        );

        Ok(summary)
    }
}
