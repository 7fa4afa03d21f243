use crate::core::ConfigProvider;
use crate::domain::model::{ListingFields, SearchParams, StudentProfile};
use crate::utils::error::{Result, ScoutError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutConfig {
    pub portal: PortalConfig,
    pub search: SearchParams,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub profile: StudentProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub base_url: String,
    #[serde(default = "default_jobs_path")]
    pub jobs_path: String,
    #[serde(default = "default_favorite_path")]
    pub favorite_path: String,
    /// Listing link written to the filtered output; `{job_id}` is replaced
    /// by the percent-encoded listing id.
    pub job_url_template: String,
    #[serde(default = "default_results_key")]
    pub results_key: String,
    #[serde(default)]
    pub authorization: Option<String>,
    #[serde(default = "default_system_user")]
    pub system_user: String,
    #[serde(default = "default_portal_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub fields: ListingFields,
}

fn default_jobs_path() -> String {
    "/api/v2/jobs".to_string()
}

fn default_favorite_path() -> String {
    "/api/v2/jobs/{job_id}/favorite".to_string()
}

fn default_results_key() -> String {
    "models".to_string()
}

fn default_system_user() -> String {
    "students".to_string()
}

fn default_portal_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_description_chars: usize,
    pub min_score: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            temperature: 0.3,
            max_tokens: 10,
            top_p: 1.0,
            timeout_seconds: 30,
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            max_description_chars: 4000,
            min_score: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub raw_file: String,
    pub filtered_file: String,
    pub formats: Vec<String>,
    pub favorite: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
            raw_file: "response.json".to_string(),
            filtered_file: "good_jobs.json".to_string(),
            formats: vec!["json".to_string()],
            favorite: true,
        }
    }
}

impl ScoutConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ScoutError::Io)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ScoutError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PORTAL_AUTH})，未設定者保留原字串
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("portal.base_url", &self.portal.base_url)?;
        validation::validate_url("scoring.api_base", &self.scoring.api_base)?;
        validation::validate_url_template("portal.job_url_template", &self.portal.job_url_template)?;
        validation::validate_placeholder("portal.favorite_path", &self.portal.favorite_path)?;
        validation::validate_non_empty_string("portal.results_key", &self.portal.results_key)?;
        validation::validate_non_empty_string("portal.fields.id", &self.portal.fields.id)?;
        validation::validate_positive_number("search.per_page", self.search.per_page as usize, 1)?;
        validation::validate_positive_number("search.max_pages", self.search.max_pages as usize, 1)?;
        if let Some(max_results) = self.search.max_results {
            validation::validate_positive_number("search.max_results", max_results, 1)?;
        }
        validation::validate_range("scoring.min_score", self.scoring.min_score, 0, 100)?;
        validation::validate_positive_number(
            "scoring.max_description_chars",
            self.scoring.max_description_chars,
            1,
        )?;
        validation::validate_range("profile.gpa", self.profile.gpa, 0.0, 5.0)?;
        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_path("output.raw_file", &self.output.raw_file)?;
        validation::validate_path("output.filtered_file", &self.output.filtered_file)?;

        let valid_formats = ["json", "csv"];
        for format in &self.output.formats {
            if !valid_formats.contains(&format.as_str()) {
                return Err(ScoutError::InvalidConfigValueError {
                    field: "output.formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        valid_formats.join(", ")
                    ),
                });
            }
        }

        Ok(())
    }
}

impl ConfigProvider for ScoutConfig {
    fn search_params(&self) -> &SearchParams {
        &self.search
    }

    fn min_score(&self) -> u8 {
        self.scoring.min_score
    }

    fn job_url_template(&self) -> &str {
        &self.portal.job_url_template
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn raw_file(&self) -> &str {
        &self.output.raw_file
    }

    fn filtered_file(&self) -> &str {
        &self.output.filtered_file
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn favorite_enabled(&self) -> bool {
        self.output.favorite
    }
}

impl Validate for ScoutConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
