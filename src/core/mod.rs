pub mod engine;
pub mod pipeline;
pub mod portal;
pub mod prompts;
pub mod scorer;

pub use crate::domain::model::{
    CancelToken, FavoriteReport, ListingRecord, QualifyingJob, Score, ScoreBatch, ScoredListing,
    SearchParams, StudentProfile,
};
pub use crate::domain::ports::{
    ConfigProvider, Favoriter, LanguageModel, ListingSource, ModelError, Pipeline, Prompt, Storage,
};
pub use crate::utils::error::Result;
