//! Configuration management for the gateway.
//!
//! Settings come from three layers, lowest precedence first: built-in
//! defaults, an optional YAML/TOML file named by `CONFIG_FILE`, and
//! environment variables.

use crate::services::provider::ProviderKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration (host, port)
    pub server: ServerConfig,

    /// Whether to verify SSL certificates for upstream requests
    pub verify_ssl: bool,

    /// Upstream HTTP client timeout in seconds
    pub request_timeout_secs: u64,

    /// Upper bound on a single `/api/chat` invocation in seconds
    pub chat_timeout_secs: u64,

    /// Largest accepted CV upload in bytes
    pub max_upload_bytes: usize,

    /// Per-provider endpoints, models and fallback credentials
    pub providers: ProvidersConfig,

    /// External CV analysis endpoint
    pub cv_analyzer: CvAnalyzerConfig,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Connection settings for one LLM provider.
///
/// Blank fields are filled with the provider's defaults after loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL for the provider's API
    pub api_base: String,

    /// Model requested upstream
    pub model: String,

    /// Fallback credential used when the client does not send its own
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    fn defaults_for(kind: ProviderKind) -> Self {
        Self {
            api_base: kind.default_api_base().to_string(),
            model: kind.default_model().to_string(),
            api_key: None,
        }
    }
}

/// The three fixed providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub groq: ProviderConfig,
    pub gemini: ProviderConfig,
    pub xai: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            groq: ProviderConfig::defaults_for(ProviderKind::Groq),
            gemini: ProviderConfig::defaults_for(ProviderKind::Gemini),
            xai: ProviderConfig::defaults_for(ProviderKind::Xai),
        }
    }
}

impl ProvidersConfig {
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Groq => &self.groq,
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Xai => &self.xai,
        }
    }

    pub fn get_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        match kind {
            ProviderKind::Groq => &mut self.groq,
            ProviderKind::Gemini => &mut self.gemini,
            ProviderKind::Xai => &mut self.xai,
        }
    }
}

/// External CV analysis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CvAnalyzerConfig {
    /// Endpoint receiving the raw CV bytes
    pub url: String,

    /// Bearer credential; falls back to the xAI key when unset
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for CvAnalyzerConfig {
    fn default() -> Self {
        Self {
            url: "https://api.xai.com/v1/cv/analyze".to_string(),
            api_key: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            verify_ssl: true,
            request_timeout_secs: 60,
            chat_timeout_secs: 30,
            max_upload_bytes: 10 * 1024 * 1024,
            providers: ProvidersConfig::default(),
            cv_analyzer: CvAnalyzerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `CONFIG_FILE` (if set) and the environment.
    pub fn from_env() -> Result<Self> {
        let path = env_non_empty("CONFIG_FILE");
        Self::load(path.as_deref())
    }

    /// Load configuration from an optional file, then apply environment overrides.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use workapp_gateway::core::config::AppConfig;
    ///
    /// let config = AppConfig::load(Some("gateway.yaml")).expect("Failed to load config");
    /// ```
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let mut config: AppConfig = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .with_context(|| format!("Failed to load configuration from {:?}", path))?;

        config.apply_env_overrides();
        config.fill_provider_defaults();
        Ok(config)
    }

    /// Override file values with environment variables (env vars take precedence).
    fn apply_env_overrides(&mut self) {
        if let Some(host) = env_non_empty("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("PORT") {
            self.server.port = port;
        }
        if let Some(verify_ssl) = env_non_empty("VERIFY_SSL") {
            self.verify_ssl = str_to_bool(&verify_ssl);
        }
        if let Some(timeout) = env_parse::<u64>("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = timeout;
        }
        if let Some(timeout) = env_parse::<u64>("CHAT_TIMEOUT_SECS") {
            self.chat_timeout_secs = timeout;
        }
        if let Some(limit) = env_parse::<usize>("MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = limit;
        }

        for kind in ProviderKind::ALL {
            let prefix = kind.env_prefix();
            let provider = self.providers.get_mut(kind);
            if let Some(key) = env_non_empty(kind.api_key_env()) {
                provider.api_key = Some(key);
            }
            if let Some(base) = env_non_empty(&format!("{}_API_BASE", prefix)) {
                provider.api_base = base;
            }
            if let Some(model) = env_non_empty(&format!("{}_MODEL", prefix)) {
                provider.model = model;
            }
        }

        if let Some(url) = env_non_empty("CV_ANALYZER_URL") {
            self.cv_analyzer.url = url;
        }
        if let Some(key) = env_non_empty("CV_ANALYZER_API_KEY") {
            self.cv_analyzer.api_key = Some(key);
        }
    }

    fn fill_provider_defaults(&mut self) {
        for kind in ProviderKind::ALL {
            let provider = self.providers.get_mut(kind);
            if provider.api_base.trim().is_empty() {
                provider.api_base = kind.default_api_base().to_string();
            }
            if provider.model.trim().is_empty() {
                provider.model = kind.default_model().to_string();
            }
        }
    }

    /// Credential for the CV analysis service.
    pub fn cv_analyzer_key(&self) -> Option<&str> {
        non_blank(&self.cv_analyzer.api_key).or_else(|| non_blank(&self.providers.xai.api_key))
    }
}

fn non_blank(key: &Option<String>) -> Option<&str> {
    key.as_deref().filter(|k| !k.trim().is_empty())
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_non_empty(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}

/// Convert string to boolean.
///
/// Accepts: "true", "1", "yes", "on" (case-insensitive)
fn str_to_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::Builder;

    const MANAGED_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "VERIFY_SSL",
        "REQUEST_TIMEOUT_SECS",
        "CHAT_TIMEOUT_SECS",
        "MAX_UPLOAD_BYTES",
        "GROQ_API_KEY",
        "GROQ_API_BASE",
        "GROQ_MODEL",
        "GEMINI_API_KEY",
        "GEMINI_API_BASE",
        "GEMINI_MODEL",
        "XAI_API_KEY",
        "XAI_API_BASE",
        "XAI_MODEL",
        "CV_ANALYZER_URL",
        "CV_ANALYZER_API_KEY",
    ];

    fn clear_env() {
        for var in MANAGED_VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_str_to_bool() {
        assert!(str_to_bool("true"));
        assert!(str_to_bool("TRUE"));
        assert!(str_to_bool("1"));
        assert!(str_to_bool("yes"));
        assert!(str_to_bool(" on "));
        assert!(!str_to_bool("false"));
        assert!(!str_to_bool("0"));
        assert!(!str_to_bool("off"));
        assert!(!str_to_bool(""));
        assert!(!str_to_bool("invalid"));
    }

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert!(config.verify_ssl);
        assert_eq!(config.chat_timeout_secs, 30);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.providers.groq.model, "llama3-8b-8192");
        assert_eq!(config.providers.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.providers.xai.api_base, "https://api.x.ai/v1");
        assert!(config.providers.groq.api_key.is_none());
        assert_eq!(config.cv_analyzer.url, "https://api.xai.com/v1/cv/analyze");
    }

    #[test]
    #[serial]
    fn test_load_without_file_uses_defaults() {
        clear_env();
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        clear_env();
        unsafe {
            std::env::set_var("PORT", "9999");
            std::env::set_var("VERIFY_SSL", "false");
            std::env::set_var("GROQ_API_KEY", "gsk_env");
            std::env::set_var("GEMINI_MODEL", "gemini-2.0-flash");
            std::env::set_var("CHAT_TIMEOUT_SECS", "12");
        }

        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.server.port, 9999);
        assert!(!config.verify_ssl);
        assert_eq!(config.providers.groq.api_key.as_deref(), Some("gsk_env"));
        assert_eq!(config.providers.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.chat_timeout_secs, 12);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_empty_env_values_are_ignored() {
        clear_env();
        unsafe {
            std::env::set_var("XAI_API_KEY", "   ");
            std::env::set_var("PORT", "not-a-port");
        }

        let config = AppConfig::load(None).unwrap();
        assert!(config.providers.xai.api_key.is_none());
        assert_eq!(config.server.port, 3000);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_config_from_file() {
        clear_env();
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        let content = r#"
server:
  host: 127.0.0.1
  port: 8080
chat_timeout_secs: 45
providers:
  groq:
    api_base: http://localhost:9000/openai/v1
    model: llama-3.1-70b
cv_analyzer:
  url: http://localhost:9100/analyze
"#;
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.chat_timeout_secs, 45);
        assert_eq!(config.providers.groq.api_base, "http://localhost:9000/openai/v1");
        assert_eq!(config.providers.groq.model, "llama-3.1-70b");
        // Untouched providers keep their defaults
        assert_eq!(config.providers.xai.model, "grok-beta");
        assert_eq!(config.cv_analyzer.url, "http://localhost:9100/analyze");
    }

    #[test]
    #[serial]
    fn test_partial_provider_section_keeps_defaults() {
        clear_env();
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"providers:\n  gemini:\n    model: gemini-2.0-pro\n")
            .unwrap();
        file.flush().unwrap();

        let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.providers.gemini.model, "gemini-2.0-pro");
        assert_eq!(
            config.providers.gemini.api_base,
            "https://generativelanguage.googleapis.com"
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        unsafe {
            std::env::set_var("HOST", "192.168.1.1");
        }
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"server:\n  host: 127.0.0.1\n").unwrap();
        file.flush().unwrap();

        let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");

        clear_env();
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = AppConfig::load(Some("nonexistent_gateway_config.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_cv_analyzer_key_falls_back_to_xai() {
        let mut config = AppConfig::default();
        assert!(config.cv_analyzer_key().is_none());

        config.providers.xai.api_key = Some("xai-key".to_string());
        assert_eq!(config.cv_analyzer_key(), Some("xai-key"));

        config.cv_analyzer.api_key = Some("cv-key".to_string());
        assert_eq!(config.cv_analyzer_key(), Some("cv-key"));

        config.cv_analyzer.api_key = Some("   ".to_string());
        assert_eq!(config.cv_analyzer_key(), Some("xai-key"));
    }

    #[test]
    #[serial]
    fn test_blank_cv_key_in_file_does_not_hide_xai_key() {
        clear_env();
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"cv_analyzer:\n  api_key: \"  \"\nproviders:\n  xai:\n    api_key: xai-file\n")
            .unwrap();
        file.flush().unwrap();

        let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.cv_analyzer_key(), Some("xai-file"));
    }

    #[test]
    fn test_serialization_hides_credentials() {
        let mut config = AppConfig::default();
        config.providers.groq.api_key = Some("secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("llama3-8b-8192"));
    }
}
