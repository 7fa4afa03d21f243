use crate::utils::error::{Result, ScoutError};

pub const PORTAL_COOKIE_VAR: &str = "NUWORKS_COOKIE";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Secrets read once at startup and held read-only for the run.
#[derive(Clone)]
pub struct Credentials {
    pub portal_cookie: String,
    pub openai_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("portal_cookie", &"<redacted>")
            .field("openai_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// 讀取環境變數；若有 .env 檔會先載入
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ScoutError::CredentialMissing {
                    name: name.to_string(),
                })
        };

        Ok(Self {
            portal_cookie: require(PORTAL_COOKIE_VAR)?,
            openai_api_key: require(OPENAI_API_KEY_VAR)?,
        })
    }
}
