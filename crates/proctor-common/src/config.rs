//! Application configuration, loaded once at startup from environment
//! variables (and an optional `config.toml`), exposed thereafter as a
//! global.
//!
//! Precedence: env vars > `.env` file > `config.toml` > defaults.

use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global application configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`].
pub fn get() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("config not initialized. Call proctor_common::config::init() first")
}

/// Initialize the global configuration from environment.
///
/// Should be called once at process startup, before any other code reads
/// config.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    let _ = dotenvy::dotenv();

    let cfg = config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("sfu.enabled", true)?
        .set_default("sfu.ice_lite", true)?
        .set_default("sfu.renegotiate_debounce_initial_ms", 200)?
        .set_default("sfu.renegotiate_debounce_screen_ms", 50)?
        .set_default("ai_analysis.enabled", true)?
        .set_default("ai_analysis.min_interval_secs", 2)?
        .set_default("ai_analysis.max_interval_secs", 5)?
        .set_default("incidents.max_per_room", 10_000)?
        .add_source(config::File::with_name("config").required(false))
        .add_source(
            config::Environment::with_prefix("PROCTOR")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = cfg.try_deserialize()?;
    Ok(CONFIG.get_or_init(|| app_config))
}

/// Build a config for tests without touching the process environment or
/// the global [`OnceLock`].
#[cfg(any(test, feature = "test-util"))]
pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        sfu: SfuConfig {
            enabled: true,
            ice_lite: true,
            renegotiate_debounce_initial_ms: 200,
            renegotiate_debounce_screen_ms: 50,
        },
        ai_analysis: AiAnalysisConfig {
            enabled: true,
            min_interval_secs: 2,
            max_interval_secs: 5,
        },
        incidents: IncidentsConfig {
            max_per_room: 10_000,
        },
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sfu: SfuConfig,
    pub ai_analysis: AiAnalysisConfig,
    pub incidents: IncidentsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SfuConfig {
    pub enabled: bool,
    /// Run WebRTC in ICE-lite mode (server never initiates ICE checks).
    pub ice_lite: bool,
    /// Debounce before the first renegotiation offer in a coalescing batch.
    pub renegotiate_debounce_initial_ms: u64,
    /// Shorter debounce used for a lone follow-on screen-share renegotiation.
    pub renegotiate_debounce_screen_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiAnalysisConfig {
    pub enabled: bool,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IncidentsConfig {
    /// Retention cap per room; oldest incidents are dropped first once hit.
    pub max_per_room: usize,
}
