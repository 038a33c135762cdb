// Application settings
// Loaded from ~/.config/outreach/settings.json (or an explicit path)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that points at an alternative settings file
pub const CONFIG_ENV_VAR: &str = "OUTREACH_CONFIG";

/// AI provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIProvider {
    /// OpenAI API
    #[default]
    #[serde(rename = "openai")]
    OpenAI,
    /// Local OpenAI-compatible server (Ollama, llama.cpp, vLLM)
    Local,
}

impl AIProvider {
    pub fn name(&self) -> &'static str {
        match self {
            AIProvider::OpenAI => "openai",
            AIProvider::Local => "local",
        }
    }

    /// Returns the default model for this provider
    pub fn default_model(&self) -> &'static str {
        match self {
            AIProvider::OpenAI => "gpt-4o",
            AIProvider::Local => "llama3:8b",
        }
    }

    /// Base URL of the chat-completions API
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            AIProvider::OpenAI => "https://api.openai.com/v1",
            AIProvider::Local => "http://localhost:11434/v1",
        }
    }

    pub fn needs_api_key(&self) -> bool {
        matches!(self, AIProvider::OpenAI)
    }
}

/// AI-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AISettings {
    /// Selected AI provider
    pub provider: AIProvider,

    /// Model identifier (empty = provider default)
    pub model: String,

    /// Custom API base URL
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AISettings {
    fn default() -> Self {
        Self {
            provider: AIProvider::OpenAI,
            model: String::new(),
            endpoint: None,
            timeout_secs: 60,
        }
    }
}

impl AISettings {
    /// Get the effective model (user-specified or provider default)
    pub fn effective_model(&self) -> &str {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    /// Get the effective API base URL, without a trailing slash
    pub fn effective_endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(self.provider.default_endpoint())
            .trim_end_matches('/')
    }
}

/// How the pipeline locates its columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    /// Label mode for workbooks, position mode for delimited text
    #[default]
    Auto,
    Label,
    Position,
}

/// Column and output-file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub mode: ModeSetting,

    /// Label mode: header of the description column
    pub description_column: String,

    /// Label mode: header of the output column
    pub output_column: String,

    /// Label mode: optional header of the company-name column
    pub name_column: Option<String>,

    /// Position mode: header used when the table has no fifth column
    pub default_output_column: String,

    /// Inserted before the extension of the output file
    pub output_suffix: String,

    /// Worksheet to read (workbooks only; default = first sheet)
    pub sheet: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            mode: ModeSetting::Auto,
            description_column: "D".to_string(),
            output_column: "E".to_string(),
            name_column: None,
            default_output_column: "Custom Email".to_string(),
            output_suffix: "_updated".to_string(),
            sheet: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ai: AISettings,
    pub pipeline: PipelineSettings,
}

impl Settings {
    /// Default settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("outreach");
        config_dir.join("settings.json")
    }

    /// Load settings from `explicit`, `$OUTREACH_CONFIG`, or the default path.
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV_VAR) {
                Some(p) if !p.is_empty() => PathBuf::from(p),
                _ => Self::config_path(),
            },
        };
        Self::load_from(&path)
    }

    /// Load settings from disk, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No settings file at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}", path.display(), e);
                    log::warn!("Using default settings");
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring lines that start with `//`
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }
}
