//! # Configuration
//!
//! Settings come from an optional `comesol.toml`, then environment variables
//! override individual keys:
//!
//! - `COMESOL_SUPABASE_URL`: project URL
//! - `COMESOL_SUPABASE_ANON_KEY`: project anon key
//! - `COMESOL_OAUTH_REDIRECT`: default return URL for OAuth sign-in
//! - `COMESOL_CORS_ORIGINS`: comma-separated origins, or "*" for all
//! - `COMESOL_RATE_LIMIT`: requests per second (0 disables)
//!
//! ```toml
//! [backend]
//! kind = "supabase"
//! supabase_url = "https://xyz.supabase.co"
//! anon_key = "..."
//!
//! [server]
//! port = 8080
//! cors_origins = ["http://localhost:5173"]
//! ```

use crate::backend::{Backend, MemoryBackend, SupabaseBackend};
use crate::service::RegistrationService;
use comesol_core::CadastroError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// File read when no `--config` is given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "comesol.toml";

/// Account seeded into the in-memory backend.
pub const DEMO_EMAIL: &str = "demo@comesol.local";
/// Password of the seeded account.
pub const DEMO_PASSWORD: &str = "comesol";

const DEFAULT_RATE_LIMIT: u32 = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// SECTIONS
// =============================================================================

/// Which backend adapter to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted Supabase project.
    #[default]
    Supabase,
    /// In-process tables with one demo account.
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supabase => write!(f, "supabase"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// `[backend]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub supabase_url: Option<String>,
    pub anon_key: Option<String>,
    pub oauth_redirect: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            supabase_url: None,
            anon_key: None,
            oauth_redirect: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty means localhost only; `["*"]` allows every origin.
    pub cors_origins: Vec<String>,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub server: ServerConfig,
}

// =============================================================================
// LOADING
// =============================================================================

impl Config {
    /// Load from `path` (or `comesol.toml` if present), then apply the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, CadastroError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CadastroError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CadastroError::IoError(format!("Cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, CadastroError> {
        toml::from_str(text).map_err(|e| CadastroError::Config(e.to_string()))
    }

    /// Override keys from environment variables, read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), CadastroError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("COMESOL_SUPABASE_URL") {
            self.backend.supabase_url = Some(url);
        }
        if let Some(key) = get("COMESOL_SUPABASE_ANON_KEY") {
            self.backend.anon_key = Some(key);
        }
        if let Some(redirect) = get("COMESOL_OAUTH_REDIRECT") {
            self.backend.oauth_redirect = Some(redirect);
        }
        if let Some(origins) = get("COMESOL_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(limit) = get("COMESOL_RATE_LIMIT") {
            self.server.rate_limit = limit.trim().parse().map_err(|_| {
                CadastroError::Config(format!("COMESOL_RATE_LIMIT is not a number: {limit}"))
            })?;
        }
        Ok(())
    }

    /// Build the configured backend adapter.
    pub fn build_backend(&self) -> Result<Arc<dyn Backend>, CadastroError> {
        match self.backend.kind {
            BackendKind::Memory => {
                tracing::info!(email = DEMO_EMAIL, "using in-memory backend");
                Ok(Arc::new(MemoryBackend::with_user(DEMO_EMAIL, DEMO_PASSWORD)))
            }
            BackendKind::Supabase => {
                let url = self.backend.supabase_url.as_deref().ok_or_else(|| {
                    CadastroError::Config("COMESOL_SUPABASE_URL is not set".to_string())
                })?;
                let key = self.backend.anon_key.as_deref().ok_or_else(|| {
                    CadastroError::Config("COMESOL_SUPABASE_ANON_KEY is not set".to_string())
                })?;
                let timeout = Duration::from_secs(self.backend.timeout_secs);
                Ok(Arc::new(SupabaseBackend::new(url, key, timeout)?))
            }
        }
    }

    /// Build the registration service over the configured backend.
    pub fn build_service(&self) -> Result<RegistrationService, CadastroError> {
        let service = RegistrationService::new(self.build_backend()?);
        Ok(match &self.backend.oauth_redirect {
            Some(url) => service.with_oauth_redirect(url.clone()),
            None => service,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
