//! The closed set of LLM providers and credential resolution.

use crate::core::config::ProviderConfig;
use crate::core::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// One of the three hosted LLM vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    Gemini,
    Xai,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Groq, ProviderKind::Gemini, ProviderKind::Xai];

    /// Wire name, as sent in `provider` and used as the `apiKeys` key.
    pub const fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Xai => "xai",
        }
    }

    /// Human-facing name used in error messages.
    pub const fn display_name(self) -> &'static str {
        match self {
            ProviderKind::Groq => "Groq",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Xai => "xAI",
        }
    }

    pub const fn env_prefix(self) -> &'static str {
        match self {
            ProviderKind::Groq => "GROQ",
            ProviderKind::Gemini => "GEMINI",
            ProviderKind::Xai => "XAI",
        }
    }

    /// Environment variable holding the fallback credential.
    pub const fn api_key_env(self) -> &'static str {
        match self {
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Xai => "XAI_API_KEY",
        }
    }

    pub const fn default_api_base(self) -> &'static str {
        match self {
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::Xai => "https://api.x.ai/v1",
        }
    }

    pub const fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Groq => "llama3-8b-8192",
            ProviderKind::Gemini => "gemini-1.5-flash",
            ProviderKind::Xai => "grok-beta",
        }
    }

    /// Resolve the provider named in a request; absent means Groq.
    pub fn resolve(requested: Option<&str>) -> Result<Self> {
        match requested {
            None => Ok(ProviderKind::Groq),
            Some(name) => name.parse(),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "groq" => Ok(ProviderKind::Groq),
            "gemini" => Ok(ProviderKind::Gemini),
            "xai" => Ok(ProviderKind::Xai),
            other => Err(AppError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Pick the credential for `kind`: the request override first, then the
/// configured fallback. Blank strings count as absent.
pub fn resolve_api_key(
    kind: ProviderKind,
    overrides: Option<&HashMap<String, String>>,
    config: &ProviderConfig,
) -> Result<String> {
    overrides
        .and_then(|keys| keys.get(kind.as_str()))
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .or_else(|| {
            config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
        })
        .map(str::to_string)
        .ok_or(AppError::MissingApiKey(kind))
}
