use crate::config::toml_config::PortalConfig;
use crate::core::{Favoriter, ListingRecord, ListingSource, SearchParams};
use crate::domain::model::fill_job_id_path;
use crate::utils::error::{Result, ScoutError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, COOKIE};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;

/// Client for the career-portal job API. Every request carries the session
/// cookie given at construction.
pub struct PortalClient {
    client: Client,
    config: PortalConfig,
}

impl PortalClient {
    pub fn new(config: PortalConfig, session_cookie: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(COOKIE, header_value("cookie", session_cookie)?);
        if let Some(auth) = &config.authorization {
            headers.insert(AUTHORIZATION, header_value("portal.authorization", auth)?);
        }
        headers.insert(
            HeaderName::from_static("x-requested-system-user"),
            header_value("portal.system_user", &config.system_user)?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn fetch_page(&self, params: &SearchParams, page: u32) -> Result<Vec<serde_json::Value>> {
        let url = self.endpoint(&self.config.jobs_path);
        tracing::debug!(page, "Requesting listings page from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&params.query_pairs(page))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ScoutError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ScoutError::MalformedResponse {
                message: format!("page {} is not valid JSON: {}", page, e),
            })?;

        match json.get(&self.config.results_key) {
            Some(serde_json::Value::Array(items)) => Ok(items.clone()),
            _ => Err(ScoutError::MalformedResponse {
                message: format!(
                    "page {} has no '{}' array",
                    page, self.config.results_key
                ),
            }),
        }
    }
}

fn header_value(field: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ScoutError::InvalidConfigValueError {
        field: field.to_string(),
        value: "<redacted>".to_string(),
        reason: format!("not a valid HTTP header value: {}", e),
    })
}

#[async_trait]
impl ListingSource for PortalClient {
    async fn fetch_all(&self, params: &SearchParams) -> Result<Vec<ListingRecord>> {
        tracing::info!("📥 Fetching listings from {}", self.config.base_url);

        let mut listings: Vec<ListingRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut duplicates = 0usize;

        'pages: for page in 0..params.max_pages {
            let items = match self.fetch_page(params, page).await {
                Ok(items) => items,
                Err(e) if listings.is_empty() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        page,
                        error = %e,
                        "⚠️ Listing fetch failed mid-pagination, keeping {} listings",
                        listings.len()
                    );
                    break;
                }
            };

            if items.is_empty() {
                tracing::debug!(page, "Empty page, end of results");
                break;
            }

            for item in items {
                let Some(listing) = ListingRecord::from_value(item, &self.config.fields) else {
                    tracing::warn!(page, "Skipping listing without '{}'", self.config.fields.id);
                    continue;
                };

                // 分頁重疊時以第一次出現者為準
                if !seen.insert(listing.id.clone()) {
                    duplicates += 1;
                    tracing::debug!(job_id = %listing.id, "Duplicate listing across pages");
                    continue;
                }

                listings.push(listing);
                if params.max_results.is_some_and(|cap| listings.len() >= cap) {
                    tracing::info!("Reached max_results cap of {}", listings.len());
                    break 'pages;
                }
            }

            if page + 1 == params.max_pages {
                tracing::info!("Reached max_pages cap of {}", params.max_pages);
            }
        }

        tracing::info!(
            "Fetched {} unique listings ({} duplicates dropped)",
            listings.len(),
            duplicates
        );
        Ok(listings)
    }
}

#[async_trait]
impl Favoriter for PortalClient {
    async fn mark_interested(&self, listing_id: &str) -> Result<()> {
        let url = self.endpoint(&fill_job_id_path(&self.config.favorite_path, listing_id));

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| ScoutError::Favoriting {
                job_id: listing_id.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutError::Favoriting {
                job_id: listing_id.to_string(),
                message: format!("status {}: {}", status.as_u16(), body),
            });
        }

        tracing::debug!(job_id = %listing_id, "Marked as interested");
        Ok(())
    }
}
