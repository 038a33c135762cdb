// AI configuration and secrets management
//
// API keys are looked up in:
// 1. System keychain (when built with the `keychain` feature)
// 2. OUTREACH_<PROVIDER>_KEY
// 3. The provider's conventional variable (OPENAI_API_KEY)
//
// Keys are NEVER stored in settings.json

use std::env;
use std::time::Duration;

use crate::settings::{AIProvider, AISettings};

/// Service name for keychain storage
#[cfg(feature = "keychain")]
const KEYCHAIN_SERVICE: &str = "outreach";

/// Source of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Key retrieved from system keychain
    Keychain,
    /// Key retrieved from environment variable
    Environment,
    /// No key found
    None,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Keychain => "keychain",
            KeySource::Environment => "environment",
            KeySource::None => "none",
        }
    }
}

/// Result of key lookup
#[derive(Debug, Clone)]
pub struct KeyLookup {
    pub key: Option<String>,
    pub source: KeySource,
}

/// Get the tool-specific environment variable name for a provider
pub fn env_var_name(provider: &str) -> String {
    format!("OUTREACH_{}_KEY", provider.to_uppercase())
}

/// The variable the provider's own tooling reads
fn conventional_env_var(provider: &str) -> Option<&'static str> {
    match provider.to_lowercase().as_str() {
        "openai" => Some("OPENAI_API_KEY"),
        _ => None,
    }
}

/// Get the keychain account name for a provider
#[cfg(feature = "keychain")]
fn keychain_account(provider: &str) -> String {
    format!("ai/{}", provider.to_lowercase())
}

/// Get an API key for the specified provider
pub fn get_api_key(provider: &str) -> KeyLookup {
    #[cfg(feature = "keychain")]
    {
        if let Ok(entry) = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(provider)) {
            if let Ok(key) = entry.get_password() {
                return KeyLookup {
                    key: Some(key),
                    source: KeySource::Keychain,
                };
            }
        }
    }

    let names = std::iter::once(env_var_name(provider))
        .chain(conventional_env_var(provider).map(String::from));
    for name in names {
        if let Ok(key) = env::var(&name) {
            let key = key.trim();
            if !key.is_empty() {
                return KeyLookup {
                    key: Some(key.to_string()),
                    source: KeySource::Environment,
                };
            }
        }
    }

    KeyLookup {
        key: None,
        source: KeySource::None,
    }
}

/// Check if keychain support is available
pub fn keychain_available() -> bool {
    #[cfg(feature = "keychain")]
    {
        keyring::Entry::new(KEYCHAIN_SERVICE, "test").is_ok()
    }
    #[cfg(not(feature = "keychain"))]
    {
        false
    }
}

// ============================================================================
// Resolved AI Configuration (single source of truth)
// ============================================================================

/// Status of the AI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AIConfigStatus {
    /// Provider, model and (if needed) key are all present
    Ready,
    /// Provider needs an API key and none was found
    MissingKey,
}

impl AIConfigStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::MissingKey => "missing_key",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// The effective AI configuration, fully resolved from settings and the
/// environment. Constructed once per run and passed to the email generator.
#[derive(Debug, Clone)]
pub struct ResolvedAIConfig {
    pub provider: AIProvider,
    /// Effective model (resolved from settings or provider default)
    pub model: String,
    /// Chat-completions base URL, no trailing slash
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// API key (if available and provider needs one)
    pub api_key: Option<String>,
    /// Source of the API key
    pub key_source: KeySource,
    pub status: AIConfigStatus,
    /// Human-readable reason if not ready
    pub blocking_reason: Option<String>,
}

impl ResolvedAIConfig {
    /// Resolve the effective AI configuration from settings, looking up the
    /// API key with [`get_api_key`].
    pub fn from_settings(settings: &AISettings) -> Self {
        let lookup = if settings.provider.needs_api_key() {
            get_api_key(settings.provider.name())
        } else {
            KeyLookup { key: None, source: KeySource::None }
        };
        Self::with_key(settings, lookup)
    }

    /// Resolve with an already looked-up key
    pub fn with_key(settings: &AISettings, lookup: KeyLookup) -> Self {
        let provider = settings.provider;

        let (status, blocking_reason) = if provider.needs_api_key() && lookup.key.is_none() {
            let mut vars = vec![env_var_name(provider.name())];
            vars.extend(conventional_env_var(provider.name()).map(String::from));
            (
                AIConfigStatus::MissingKey,
                Some(format!("No API key found. Set {}", vars.join(" or "))),
            )
        } else {
            (AIConfigStatus::Ready, None)
        };

        Self {
            provider,
            model: settings.effective_model().to_string(),
            endpoint: settings.effective_endpoint().to_string(),
            timeout: Duration::from_secs(settings.timeout_secs.max(1)),
            api_key: lookup.key,
            key_source: lookup.source,
            status,
            blocking_reason,
        }
    }

    /// Provider display name
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

// ============================================================================
// Diagnostics (for `outreach ai doctor`)
// ============================================================================

/// Diagnostic information about AI configuration
#[derive(Debug)]
pub struct AIDiagnostics {
    pub provider: String,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub status: AIConfigStatus,
    pub blocking_reason: Option<String>,
    pub key_present: bool,
    pub key_source: KeySource,
    pub keychain_available: bool,
}

impl AIDiagnostics {
    pub fn from_resolved(config: &ResolvedAIConfig) -> Self {
        Self {
            provider: config.provider_name().to_string(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            timeout_secs: config.timeout.as_secs(),
            status: config.status,
            blocking_reason: config.blocking_reason.clone(),
            key_present: config.api_key.is_some(),
            key_source: config.key_source,
            keychain_available: keychain_available(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "schema_version": 1,
            "status": self.status.as_str(),
            "blocking_reason": self.blocking_reason,
            "provider": self.provider,
            "model": self.model,
            "endpoint": self.endpoint,
            "timeout_secs": self.timeout_secs,
            "key": if self.key_present { "present" } else { "missing" },
            "key_source": self.key_source.as_str(),
            "keychain": if self.keychain_available { "ok" } else { "unavailable" },
        })
    }
}

impl std::fmt::Display for AIDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "AI Doctor")?;
        writeln!(f, "---------")?;
        writeln!(f, "status:          {}", self.status.as_str())?;
        if let Some(reason) = &self.blocking_reason {
            writeln!(f, "blocking_reason: {}", reason)?;
        }
        writeln!(f, "provider:        {}", self.provider)?;
        writeln!(f, "model:           {}", self.model)?;
        writeln!(f, "endpoint:        {}", self.endpoint)?;
        writeln!(f, "timeout:         {}s", self.timeout_secs)?;
        writeln!(f, "key:             {}", if self.key_present { "present" } else { "missing" })?;
        writeln!(f, "key_source:      {}", self.key_source.as_str())?;
        writeln!(f, "keychain:        {}", if self.keychain_available { "ok" } else { "unavailable" })?;
        Ok(())
    }
}
