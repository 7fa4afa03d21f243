use crate::domain::model::{
    CancelToken, FavoriteReport, ListingRecord, QualifyingJob, ScoreBatch, ScoredListing,
    SearchParams,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use thiserror::Error;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn search_params(&self) -> &SearchParams;
    fn min_score(&self) -> u8;
    fn job_url_template(&self) -> &str;
    fn output_path(&self) -> &str;
    fn raw_file(&self) -> &str;
    fn filtered_file(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn favorite_enabled(&self) -> bool;
}

#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_all(&self, params: &SearchParams) -> Result<Vec<ListingRecord>>;
}

#[async_trait]
pub trait Favoriter: Send + Sync {
    async fn mark_interested(&self, listing_id: &str) -> Result<()>;
}

/// Messages sent to the language model for one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub profile_context: String,
    pub listing: String,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Rate limited by model provider (status {status})")]
    RateLimited { status: u16 },

    #[error("Model request timed out")]
    Timeout,

    #[error("Model provider unavailable (status {status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("Model API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed model response: {0}")]
    Malformed(String),

    #[error("Model returned empty content")]
    EmptyContent,
}

impl ModelError {
    /// 可重試的錯誤：限流、逾時、伺服器端錯誤
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::RateLimited { .. } | ModelError::Timeout | ModelError::Unavailable { .. } => {
                true
            }
            ModelError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> std::result::Result<String, ModelError>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<ListingRecord>>;
    async fn score_all(&self, listings: &[ListingRecord], cancel: &CancelToken) -> ScoreBatch;
    fn filter(&self, scored: &[ScoredListing]) -> Vec<QualifyingJob>;
    async fn favorite(&self, jobs: &[QualifyingJob]) -> FavoriteReport;
    async fn load(&self, jobs: &[QualifyingJob]) -> Result<String>;
}
