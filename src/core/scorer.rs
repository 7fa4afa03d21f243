use crate::config::toml_config::ScoringConfig;
use crate::core::prompts;
use crate::core::{LanguageModel, ListingRecord, Score, StudentProfile};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Exponential backoff for transient model failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

impl From<&ScoringConfig> for RetryPolicy {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

pub struct Scorer {
    model: Arc<dyn LanguageModel>,
    profile_context: String,
    retry: RetryPolicy,
    max_description_chars: usize,
}

impl Scorer {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        profile: &StudentProfile,
        config: &ScoringConfig,
    ) -> Self {
        Self {
            model,
            profile_context: prompts::profile_context(profile),
            retry: RetryPolicy::from(config),
            max_description_chars: config.max_description_chars,
        }
    }

    /// Scores one listing. Never fails: anything that prevents a valid score
    /// yields `Score::Unscored`.
    pub async fn score(&self, listing: &ListingRecord) -> Score {
        let prompt =
            prompts::build_prompt(&self.profile_context, listing, self.max_description_chars);
        let mut attempt = 0u32;

        loop {
            match self.model.complete(&prompt).await {
                Ok(reply) => {
                    return match parse_score(&reply) {
                        Some(value) => {
                            tracing::debug!(job_id = %listing.id, score = value, "Scored listing");
                            Score::Scored(value)
                        }
                        None => {
                            tracing::warn!(
                                job_id = %listing.id,
                                reply = %reply.trim(),
                                "⚠️ Could not parse a 0-100 score from model reply"
                            );
                            Score::Unscored
                        }
                    };
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        job_id = %listing.id,
                        attempt = attempt + 1,
                        error = %e,
                        "Transient model error, retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        job_id = %listing.id,
                        attempts = attempt + 1,
                        error = %e,
                        "❌ Scoring failed, marking listing as unscored"
                    );
                    return Score::Unscored;
                }
            }
        }
    }
}

fn integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+").expect("integer pattern is valid"))
}

/// 取回覆中第一個整數，超出 0-100 視為解析失敗
pub fn parse_score(reply: &str) -> Option<u8> {
    let first = integer_pattern().find(reply)?;
    let value: i64 = first.as_str().parse().ok()?;
    if (0..=100).contains(&value) {
        u8::try_from(value).ok()
    } else {
        None
    }
}
