use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CAMPAIGN_TAG: &str = "DXPO大阪'25";
pub const DEFAULT_LEAD_SOURCE: &str = "QR";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Top-level configuration, built once at startup and handed to the sync driver.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub profile: String,
    pub notion: NotionConfig,
    pub enrichment: EnrichmentConfig,
    pub campaign: CampaignConfig,
    pub http: HttpConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load from `.env` and the process environment.
    ///
    /// The profile comes from the argument, then `LEAD_SYNC_PROFILE`, then
    /// [`DEFAULT_PROFILE`].
    pub fn load(profile: Option<&str>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let profile = profile
            .map(str::to_string)
            .or_else(|| env::var("LEAD_SYNC_PROFILE").ok())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

        Self::from_lookup(&profile, |key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// For any profile other than `default`, `KEY` is first looked up as
    /// `PROFILE_KEY` and falls back to the unscoped `KEY`.
    pub fn from_lookup<F>(profile: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile = match profile.trim() {
            "" => DEFAULT_PROFILE.to_string(),
            other => other.to_ascii_lowercase(),
        };
        let scoped = ProfileLookup {
            profile: &profile,
            lookup: &lookup,
        };

        let notion = NotionConfig {
            api_token: scoped.required("NOTION_API_TOKEN")?,
            database_id: scoped.required("NOTION_DATABASE_ID")?,
            version: scoped.required("NOTION_VERSION")?,
            base_url: scoped
                .get("NOTION_BASE_URL")
                .unwrap_or_else(|| DEFAULT_NOTION_BASE_URL.to_string()),
        };

        let enrichment = EnrichmentConfig {
            api_key: scoped.get("OPENAI_API_KEY"),
            model: scoped
                .get("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: scoped
                .get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        };

        let campaign = CampaignConfig {
            tag: scoped
                .get("LEAD_SYNC_CAMPAIGN_TAG")
                .unwrap_or_else(|| DEFAULT_CAMPAIGN_TAG.to_string()),
            lead_source: scoped
                .get("LEAD_SYNC_LEAD_SOURCE")
                .unwrap_or_else(|| DEFAULT_LEAD_SOURCE.to_string()),
        };

        let timeout_secs = match scoped.get("LEAD_SYNC_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout { value: raw })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let log_level = scoped
            .get("LEAD_SYNC_LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            profile,
            notion,
            enrichment,
            campaign,
            http: HttpConfig {
                timeout: Duration::from_secs(timeout_secs),
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

struct ProfileLookup<'a, F> {
    profile: &'a str,
    lookup: &'a F,
}

impl<F> ProfileLookup<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        if self.profile != DEFAULT_PROFILE {
            let scoped_key = format!("{}_{}", self.profile.to_ascii_uppercase(), key);
            if let Some(value) = non_blank((self.lookup)(&scoped_key)) {
                return Some(value);
            }
        }

        non_blank((self.lookup)(key))
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::Missing {
            key,
            profile: self.profile.to_string(),
        })
    }
}

/// Credentials and target database for the Notion REST API.
#[derive(Clone)]
pub struct NotionConfig {
    pub api_token: String,
    pub database_id: String,
    pub version: String,
    pub base_url: String,
}

impl fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionConfig")
            .field("api_token", &"<redacted>")
            .field("database_id", &self.database_id)
            .field("version", &self.version)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Chat-completion endpoint used to infer industry, department, role and owner.
#[derive(Clone)]
pub struct EnrichmentConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl EnrichmentConfig {
    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl fmt::Debug for EnrichmentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichmentConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Values stamped on every page created during a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignConfig {
    pub tag: String,
    pub lead_source: String,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_CAMPAIGN_TAG.to_string(),
            lead_source: DEFAULT_LEAD_SOURCE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing { key: &'static str, profile: String },
    InvalidTimeout { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing { key, profile } => {
                write!(f, "{key} is not set for profile '{profile}'")
            }
            ConfigError::InvalidTimeout { value } => write!(
                f,
                "LEAD_SYNC_HTTP_TIMEOUT_SECS must be a whole number of seconds, got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
