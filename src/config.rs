use std::env;

use url::{Host, Url};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_SCHOLAR_URL: &str = "https://google.serper.dev/scholar";
pub const DEFAULT_LANGUAGE: &str = "Vietnamese";
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY (or GOOGLE_API_KEY) is not set. Get one at https://aistudio.google.com/apikey")]
    GeminiKeyNotSet,

    #[error("SERPER_API_KEY is not set. Get one at https://serper.dev")]
    SerperKeyNotSet,

    #[error("invalid value for {var} ({value:?}): {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: ApiKey,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct ScholarSettings {
    pub api_key: ApiKey,
    pub url: String,
    /// Country code sent as `gl`.
    pub country: String,
    /// Interface language sent as `hl`.
    pub locale: String,
}

/// A missing key only disables the workflow that needs it; see [`ConfigError`].
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: Option<GeminiSettings>,
    pub scholar: Option<ScholarSettings>,
    /// Target language for translations and synthesized answers.
    pub language: String,
    pub max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let gemini = match var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")) {
            Some(key) => Some(GeminiSettings {
                api_key: ApiKey(key),
                model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: match var("GEMINI_BASE_URL") {
                    Some(url) => validate_base_url("GEMINI_BASE_URL", &url)?,
                    None => DEFAULT_GEMINI_BASE_URL.to_string(),
                },
            }),
            None => None,
        };

        let scholar = match var("SERPER_API_KEY") {
            Some(key) => Some(ScholarSettings {
                api_key: ApiKey(key),
                url: match var("SERPER_BASE_URL") {
                    Some(url) => validate_base_url("SERPER_BASE_URL", &url)?,
                    None => DEFAULT_SCHOLAR_URL.to_string(),
                },
                country: var("SCHOLAR_GL").unwrap_or_else(|| "vn".to_string()),
                locale: var("SCHOLAR_HL").unwrap_or_else(|| "vi".to_string()),
            }),
            None => None,
        };

        let max_retries = match var("ASSISTANT_MAX_RETRIES") {
            Some(raw) => parse_retries("ASSISTANT_MAX_RETRIES", &raw)?,
            None => DEFAULT_MAX_RETRIES,
        };

        Ok(Self {
            gemini,
            scholar,
            language: var("ASSISTANT_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            max_retries,
        })
    }

    pub fn gemini(&self) -> Result<&GeminiSettings, ConfigError> {
        self.gemini.as_ref().ok_or(ConfigError::GeminiKeyNotSet)
    }

    pub fn scholar(&self) -> Result<&ScholarSettings, ConfigError> {
        self.scholar.as_ref().ok_or(ConfigError::SerperKeyNotSet)
    }
}

pub fn parse_retries(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    match raw.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "expected a positive integer".to_string(),
        }),
    }
}

/// API keys travel in headers, so plain HTTP is only accepted for loopback hosts.
fn validate_base_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    let loopback = match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    };

    match url.scheme() {
        "https" => Ok(raw.trim_end_matches('/').to_string()),
        "http" if loopback => Ok(raw.trim_end_matches('/').to_string()),
        "http" => Err(invalid("plain HTTP is only allowed for loopback hosts".to_string())),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}
