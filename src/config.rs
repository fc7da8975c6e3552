use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub gemini_api_key: String,
    pub gemini_image_model: String,
    pub gemini_image_aspect_ratio: String,
    pub gemini_safety_settings: String,
    pub gemini_timeout_seconds: u64,
    pub firebase_storage_bucket: String,
    pub firebase_api_key: String,
    pub firebase_storage_base_url: String,
    pub http_timeout_seconds: u64,
    pub session_ttl_seconds: u64,
    pub max_body_bytes: usize,
    pub theme_catalog_path: Option<PathBuf>,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_optional_path(name: &str) -> Option<PathBuf> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let path = PathBuf::from(trimmed);
    if path.is_absolute() {
        Some(path)
    } else {
        Some(
            env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(path),
        )
    }
}

pub(crate) fn normalize_gemini_safety_settings(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "permissive".to_string();
    }

    let lowered = trimmed.to_lowercase();
    match lowered.as_str() {
        "permissive" | "off" | "none" => "permissive".to_string(),
        "standard" => "standard".to_string(),
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}'; defaulting to permissive.",
                value
            );
            "permissive".to_string()
        }
    }
}

fn normalize_base_url(value: String) -> String {
    value.trim().trim_end_matches('/').to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        let bind_raw = env_string("BIND_ADDR", "0.0.0.0:8080");
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|err| anyhow!("Invalid BIND_ADDR '{}': {}", bind_raw, err))?;

        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: env_optional_path("LOG_DIR").unwrap_or_else(|| PathBuf::from("logs")),
            bind_addr,
            gemini_api_key: env_string("GEMINI_API_KEY", "").trim().to_string(),
            gemini_image_model: env_string("GEMINI_IMAGE_MODEL", "gemini-2.5-flash-image"),
            gemini_image_aspect_ratio: env_string("GEMINI_IMAGE_ASPECT_RATIO", "9:16"),
            gemini_safety_settings: normalize_gemini_safety_settings(env_string(
                "GEMINI_SAFETY_SETTINGS",
                "permissive",
            )),
            gemini_timeout_seconds: env_u64("GEMINI_TIMEOUT_SECONDS", 90),
            firebase_storage_bucket: env_string("FIREBASE_STORAGE_BUCKET", "").trim().to_string(),
            firebase_api_key: env_string("FIREBASE_API_KEY", "").trim().to_string(),
            firebase_storage_base_url: normalize_base_url(env_string(
                "FIREBASE_STORAGE_BASE_URL",
                "https://firebasestorage.googleapis.com",
            )),
            http_timeout_seconds: env_u64("HTTP_TIMEOUT_SECONDS", 30),
            session_ttl_seconds: env_u64("SESSION_TTL_SECONDS", 1800),
            max_body_bytes: env_usize("MAX_BODY_BYTES", 16 * 1024 * 1024),
            theme_catalog_path: env_optional_path("THEME_CATALOG_PATH"),
        })
    }

    /// Settings that only the HTTP server needs.
    pub fn ensure_serving_credentials(&self) -> Result<()> {
        if self.gemini_api_key.is_empty() {
            return Err(anyhow!("GEMINI_API_KEY is required to serve the booth"));
        }
        if self.firebase_storage_bucket.is_empty() {
            return Err(anyhow!(
                "FIREBASE_STORAGE_BUCKET is required to serve the booth"
            ));
        }
        Ok(())
    }
}
