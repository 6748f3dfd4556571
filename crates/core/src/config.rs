//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handling never reads process-wide environment variables;
//! binaries read them once and hand the parsed values to [`CoreConfig::new`].

use crate::backend::BackendKind;
use crate::constants::{
    CONVERSATIONS_DIR_NAME, DEFAULT_BACKEND_TIMEOUT_SECS, DEFAULT_DATA_DIR, DEFAULT_GEMINI_BASE_URL,
    DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, DEFAULT_TEMPERATURE,
};
use crate::{CritiqueError, CritiqueResult};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Backend preference: a fixed backend or automatic selection by priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BackendPreference {
    #[default]
    Auto,
    Explicit(BackendKind),
}

impl std::str::FromStr for BackendPreference {
    type Err = CritiqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(BackendPreference::Auto),
            other => other.parse::<BackendKind>().map(BackendPreference::Explicit),
        }
    }
}

/// API keys for the generative text backends. Empty keys count as absent.
#[derive(Clone, Default)]
pub struct Credentials {
    openai: Option<String>,
    gemini: Option<String>,
}

impl Credentials {
    pub fn new(openai: Option<String>, gemini: Option<String>) -> Self {
        fn present(key: Option<String>) -> Option<String> {
            key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
        }

        Self {
            openai: present(openai),
            gemini: present(gemini),
        }
    }

    pub fn key(&self, kind: BackendKind) -> Option<&str> {
        match kind {
            BackendKind::OpenAi => self.openai.as_deref(),
            BackendKind::Gemini => self.gemini.as_deref(),
        }
    }

    /// Names of the backends that have a credential.
    pub fn available(&self) -> BTreeSet<BackendKind> {
        BackendKind::PRIORITY
            .into_iter()
            .filter(|kind| self.key(*kind).is_some())
            .collect()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("openai", &self.openai.as_ref().map(|_| "<redacted>"))
            .field("gemini", &self.gemini.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Endpoint and model of one backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendEndpoint {
    pub base_url: String,
    pub model: String,
}

impl BackendEndpoint {
    pub fn default_for(kind: BackendKind) -> Self {
        match kind {
            BackendKind::OpenAi => Self {
                base_url: DEFAULT_OPENAI_BASE_URL.into(),
                model: DEFAULT_OPENAI_MODEL.into(),
            },
            BackendKind::Gemini => Self {
                base_url: DEFAULT_GEMINI_BASE_URL.into(),
                model: DEFAULT_GEMINI_MODEL.into(),
            },
        }
    }

    /// Applies optional overrides; blank values keep the defaults.
    pub fn with_overrides(mut self, base_url: Option<String>, model: Option<String>) -> Self {
        if let Some(url) = non_blank(base_url) {
            self.base_url = url;
        }
        if let Some(model) = non_blank(model) {
            self.model = model;
        }
        self
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    credentials: Credentials,
    preference: BackendPreference,
    openai: BackendEndpoint,
    gemini: BackendEndpoint,
    temperature: f32,
    backend_timeout: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default endpoints, temperature and timeout.
    pub fn new(
        data_dir: PathBuf,
        credentials: Credentials,
        preference: BackendPreference,
    ) -> Self {
        Self {
            data_dir,
            credentials,
            preference,
            openai: BackendEndpoint::default_for(BackendKind::OpenAi),
            gemini: BackendEndpoint::default_for(BackendKind::Gemini),
            temperature: DEFAULT_TEMPERATURE,
            backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
        }
    }

    pub fn with_endpoint(mut self, kind: BackendKind, endpoint: BackendEndpoint) -> Self {
        match kind {
            BackendKind::OpenAi => self.openai = endpoint,
            BackendKind::Gemini => self.gemini = endpoint,
        }
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> CritiqueResult<Self> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(CritiqueError::Configuration(format!(
                "temperature must be between 0 and 2, got {}",
                temperature
            )));
        }
        self.temperature = temperature;
        Ok(self)
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout.max(Duration::from_secs(1));
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn conversations_dir(&self) -> PathBuf {
        self.data_dir.join(CONVERSATIONS_DIR_NAME)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn preference(&self) -> BackendPreference {
        self.preference
    }

    pub fn endpoint(&self, kind: BackendKind) -> &BackendEndpoint {
        match kind {
            BackendKind::OpenAi => &self.openai,
            BackendKind::Gemini => &self.gemini,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn backend_timeout(&self) -> Duration {
        self.backend_timeout
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the backend preference from an optional string value (`DEFAULT_AI_SERVICE`).
///
/// If `value` is `None` or empty/whitespace, returns [`BackendPreference::Auto`].
pub fn preference_from_env_value(value: Option<String>) -> CritiqueResult<BackendPreference> {
    match non_blank(value) {
        Some(v) => v.parse(),
        None => Ok(BackendPreference::Auto),
    }
}

/// Parse the sampling temperature from an optional string value.
pub fn temperature_from_env_value(value: Option<String>) -> CritiqueResult<f32> {
    match non_blank(value) {
        Some(v) => v.parse::<f32>().map_err(|e| {
            CritiqueError::Configuration(format!("invalid temperature '{}': {}", v, e))
        }),
        None => Ok(DEFAULT_TEMPERATURE),
    }
}

/// Parse the backend timeout (whole seconds) from an optional string value.
pub fn timeout_from_env_value(value: Option<String>) -> CritiqueResult<Duration> {
    match non_blank(value) {
        Some(v) => v.parse::<u64>().map(Duration::from_secs).map_err(|e| {
            CritiqueError::Configuration(format!("invalid backend timeout '{}': {}", v, e))
        }),
        None => Ok(Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS)),
    }
}

/// Resolves a full configuration from named settings, as read from the process environment.
///
/// `lookup` maps a variable name (`OPENAI_API_KEY`, `CRITIQUE_DATA_DIR`, ...) to its value.
/// Binaries pass `|name| std::env::var(name).ok()`.
pub fn config_from_lookup<F>(lookup: F) -> CritiqueResult<CoreConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let data_dir = non_blank(lookup("CRITIQUE_DATA_DIR")).unwrap_or_else(|| DEFAULT_DATA_DIR.into());
    let credentials = Credentials::new(lookup("OPENAI_API_KEY"), lookup("GEMINI_API_KEY"));
    let preference = preference_from_env_value(lookup("DEFAULT_AI_SERVICE"))?;

    let openai = BackendEndpoint::default_for(BackendKind::OpenAi)
        .with_overrides(lookup("OPENAI_BASE_URL"), lookup("OPENAI_MODEL"));
    let gemini = BackendEndpoint::default_for(BackendKind::Gemini)
        .with_overrides(lookup("GEMINI_BASE_URL"), lookup("GEMINI_MODEL"));

    CoreConfig::new(PathBuf::from(data_dir), credentials, preference)
        .with_endpoint(BackendKind::OpenAi, openai)
        .with_endpoint(BackendKind::Gemini, gemini)
        .with_backend_timeout(timeout_from_env_value(lookup("CRITIQUE_BACKEND_TIMEOUT_SECS"))?)
        .with_temperature(temperature_from_env_value(lookup("CRITIQUE_TEMPERATURE"))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_credentials_treat_blank_keys_as_absent() {
        let creds = Credentials::new(Some("  ".into()), Some("g-key".into()));
        assert_eq!(creds.key(BackendKind::OpenAi), None);
        assert_eq!(creds.key(BackendKind::Gemini), Some("g-key"));
        assert_eq!(
            creds.available().into_iter().collect::<Vec<_>>(),
            vec![BackendKind::Gemini]
        );
    }

    #[test]
    fn test_credentials_debug_redacts_keys() {
        let creds = Credentials::new(Some("sk-secret".into()), None);
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_preference_from_env_value() {
        assert_eq!(
            preference_from_env_value(None).unwrap(),
            BackendPreference::Auto
        );
        assert_eq!(
            preference_from_env_value(Some(" AUTO ".into())).unwrap(),
            BackendPreference::Auto
        );
        assert_eq!(
            preference_from_env_value(Some("gemini".into())).unwrap(),
            BackendPreference::Explicit(BackendKind::Gemini)
        );
        assert!(matches!(
            preference_from_env_value(Some("claude".into())),
            Err(CritiqueError::Configuration(_))
        ));
    }

    #[test]
    fn test_temperature_and_timeout_parsing() {
        assert_eq!(temperature_from_env_value(None).unwrap(), 0.7);
        assert_eq!(temperature_from_env_value(Some("0.2".into())).unwrap(), 0.2);
        assert!(temperature_from_env_value(Some("warm".into())).is_err());

        assert_eq!(
            timeout_from_env_value(Some("15".into())).unwrap(),
            Duration::from_secs(15)
        );
        assert!(timeout_from_env_value(Some("-1".into())).is_err());
    }

    #[test]
    fn test_config_validates_temperature_and_clamps_timeout() {
        let cfg = CoreConfig::new(
            PathBuf::from("data"),
            Credentials::default(),
            BackendPreference::Auto,
        );
        assert!(cfg.clone().with_temperature(3.5).is_err());

        let cfg = cfg.with_backend_timeout(Duration::from_millis(10));
        assert_eq!(cfg.backend_timeout(), Duration::from_secs(1));
        assert_eq!(
            cfg.conversations_dir(),
            PathBuf::from("data").join("conversations")
        );
    }

    #[test]
    fn test_endpoint_overrides_ignore_blank_values() {
        let endpoint = BackendEndpoint::default_for(BackendKind::OpenAi)
            .with_overrides(Some(" ".into()), Some("gpt-4o".into()));
        assert_eq!(endpoint.base_url, "https://api.openai.com/v1");
        assert_eq!(endpoint.model, "gpt-4o");
    }

    #[test]
    fn test_config_from_lookup_reads_every_setting() {
        let vars: HashMap<&str, &str> = [
            ("CRITIQUE_DATA_DIR", "/srv/critique"),
            ("OPENAI_API_KEY", "sk-test"),
            ("DEFAULT_AI_SERVICE", "openai"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("GEMINI_BASE_URL", "http://localhost:9000"),
            ("CRITIQUE_TEMPERATURE", "0.1"),
            ("CRITIQUE_BACKEND_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .collect();

        let cfg = config_from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.data_dir(), Path::new("/srv/critique"));
        assert_eq!(cfg.credentials().key(BackendKind::OpenAi), Some("sk-test"));
        assert_eq!(cfg.preference(), BackendPreference::Explicit(BackendKind::OpenAi));
        assert_eq!(cfg.endpoint(BackendKind::OpenAi).model, "gpt-4o");
        assert_eq!(cfg.endpoint(BackendKind::Gemini).base_url, "http://localhost:9000");
        assert_eq!(cfg.endpoint(BackendKind::Gemini).model, "gemini-pro");
        assert_eq!(cfg.temperature(), 0.1);
        assert_eq!(cfg.backend_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let cfg = config_from_lookup(|_| None).unwrap();
        assert_eq!(cfg.data_dir(), Path::new("conversation_data"));
        assert!(cfg.credentials().available().is_empty());
        assert_eq!(cfg.preference(), BackendPreference::Auto);

        assert!(config_from_lookup(|name| {
            (name == "DEFAULT_AI_SERVICE").then(|| "claude".to_string())
        })
        .is_err());
    }
}
