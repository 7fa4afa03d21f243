use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Keys used to read the normalized fields out of a raw portal object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListingFields {
    pub id: String,
    pub title: String,
    pub employer: String,
    pub description: String,
}

impl Default for ListingFields {
    fn default() -> Self {
        Self {
            id: "job_id".to_string(),
            title: "job_title".to_string(),
            employer: "name".to_string(),
            description: "job_desc".to_string(),
        }
    }
}

/// One job posting as returned by the portal.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub id: String,
    pub title: String,
    pub employer: String,
    pub description: String,
    pub raw: serde_json::Value,
}

impl ListingRecord {
    /// 從原始 JSON 物件建立；沒有 id 的物件回傳 None
    pub fn from_value(raw: serde_json::Value, fields: &ListingFields) -> Option<Self> {
        let obj = raw.as_object()?;

        let id = match obj.get(&fields.id)? {
            serde_json::Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };

        let text = |key: &str, default: &str| {
            obj.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or(default)
                .to_string()
        };

        let title = text(&fields.title, "Unknown Title");
        let employer = text(&fields.employer, "Unknown Company");
        let description = text(&fields.description, "");

        Some(Self {
            id,
            title,
            employer,
            description,
            raw,
        })
    }
}

/// Outcome of scoring one listing. `Unscored` is the sentinel for a listing
/// the model could not score, never equal to a real 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Scored(u8),
    Unscored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredListing {
    pub listing: ListingRecord,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifyingJob {
    pub id: String,
    pub title: String,
    pub employer: String,
    pub score: u8,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub year: String,
    pub major: String,
    #[serde(default)]
    pub school: Option<String>,
    pub gpa: f32,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub coursework: Vec<String>,
    #[serde(default)]
    pub honors: Vec<String>,
    #[serde(default)]
    pub preferences: Option<String>,
}

/// Query parameters for the listing search, forwarded to the portal as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub job_type: u32,
    #[serde(default)]
    pub industries: Vec<u32>,
    pub posted_within_days: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

fn default_per_page() -> u32 {
    100
}

fn default_sort() -> String {
    "!postdate".to_string()
}

fn default_max_pages() -> u32 {
    10
}

impl SearchParams {
    /// 單頁查詢參數；`page` 由分頁迴圈提供
    pub fn query_pairs(&self, page: u32) -> Vec<(String, String)> {
        let industries = self
            .industries
            .iter()
            .map(|code| code.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let mut pairs = vec![
            ("perPage".to_string(), self.per_page.to_string()),
            ("page".to_string(), page.to_string()),
            ("sort".to_string(), self.sort.clone()),
            ("job_type".to_string(), self.job_type.to_string()),
            ("industry".to_string(), industries),
            ("postdate".to_string(), self.posted_within_days.to_string()),
        ];
        pairs.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        pairs
    }
}

/// 路徑片段中保留 RFC 3986 unreserved 字元
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Replaces `{job_id}` in a URL template whose placeholder sits in the query
/// string. The id is form-urlencoded.
pub fn fill_job_id(template: &str, job_id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(job_id.as_bytes()).collect();
    template.replace("{job_id}", &encoded)
}

/// Replaces `{job_id}` in a request path, encoding the id as a single path
/// segment.
pub fn fill_job_id_path(template: &str, job_id: &str) -> String {
    let encoded = utf8_percent_encode(job_id, PATH_SEGMENT).to_string();
    template.replace("{job_id}", &encoded)
}

/// Cooperative stop flag checked between listings; the in-flight score call
/// always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoreBatch {
    pub scored: Vec<ScoredListing>,
    pub cancelled: bool,
}

impl ScoreBatch {
    pub fn unscored_count(&self) -> usize {
        self.scored
            .iter()
            .filter(|s| s.score == Score::Unscored)
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteReport {
    pub favorited: usize,
    pub failed: Vec<String>,
    pub skipped: bool,
}
