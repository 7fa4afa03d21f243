use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Missing credential: environment variable {name} is not set")]
    CredentialMissing { name: String },

    #[error("Portal request failed with status {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Failed to mark job {job_id} as interested: {message}")]
    Favoriting { job_id: String, message: String },

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, ScoutError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Credentials,
    Fetch,
    Favoriting,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ScoutError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ScoutError::CredentialMissing { .. } => ErrorCategory::Credentials,
            ScoutError::Transport { .. } | ScoutError::Http(_) => ErrorCategory::Fetch,
            ScoutError::MalformedResponse { .. } => ErrorCategory::Fetch,
            ScoutError::Favoriting { .. } => ErrorCategory::Favoriting,
            ScoutError::Csv(_) | ScoutError::Io(_) | ScoutError::Serialization(_) => {
                ErrorCategory::Storage
            }
            ScoutError::ConfigError { .. }
            | ScoutError::InvalidConfigValueError { .. }
            | ScoutError::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Favoriting => ErrorSeverity::Low,
            ErrorCategory::Storage => ErrorSeverity::Medium,
            ErrorCategory::Fetch => ErrorSeverity::High,
            ErrorCategory::Credentials | ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// 程序結束碼：只有抓取失敗、缺少憑證與配置錯誤會以非零結束
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Fetch | ErrorCategory::Storage => 1,
            ErrorCategory::Credentials => 2,
            ErrorCategory::Configuration => 3,
            ErrorCategory::Favoriting => 0,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ScoutError::CredentialMissing { .. } => {
                "Export NUWORKS_COOKIE and OPENAI_API_KEY or put them in a .env file"
            }
            ScoutError::Transport { status: 401, .. } | ScoutError::Transport { status: 403, .. } => {
                "The portal session cookie has probably expired; copy a fresh one from the browser"
            }
            ScoutError::Transport { .. } | ScoutError::Http(_) => {
                "Check network access to the portal and retry later"
            }
            ScoutError::MalformedResponse { .. } => {
                "The portal answered with an unexpected body; check portal.results_key and the session cookie"
            }
            ScoutError::Favoriting { .. } => "Favorite the job manually from the listing URL",
            ScoutError::Csv(_) | ScoutError::Io(_) | ScoutError::Serialization(_) => {
                "Check that output.path is writable"
            }
            _ => "Review the configuration file against coop-scout.example.toml",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Credentials => format!("Cannot start: {}", self),
            ErrorCategory::Fetch => format!("Could not fetch any listings: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            _ => self.to_string(),
        }
    }
}
