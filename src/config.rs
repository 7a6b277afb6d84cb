// src/config.rs
use log::{info, warn};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// External base URL used to build OAuth callback URLs.
    pub base_url: String,
    pub redis_url: String,
    pub public_dir: String,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    /// When no API key is configured: strict mode (default) fails the scan,
    /// demo mode answers with a deterministic simulated report.
    pub demo_mode: bool,
    pub scan_timeout: Duration,
    /// Perceived-quality floor for the scanning view. Completion below this
    /// keeps the scanning state up for the remainder.
    pub min_scan_duration: Duration,
    pub google_oauth: Option<OAuthClient>,
    pub kakao_oauth: Option<OAuthClient>,
    pub waitlist_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let google_api_key = non_empty("GOOGLE_API_KEY");
        if google_api_key.is_none() {
            warn!("GOOGLE_API_KEY is not set, analysis requests will fail unless demo mode is on");
        }

        Self {
            bind_addr: var_or("FONDAY_BIND", "0.0.0.0:8080"),
            base_url: var_or("FONDAY_BASE_URL", "http://localhost:8080"),
            redis_url: var_or("REDIS_URL", "redis://127.0.0.1:6379"),
            public_dir: var_or("FONDAY_PUBLIC_DIR", "./public"),
            google_api_key,
            gemini_model: var_or("GEMINI_MODEL", "gemini-1.5-flash"),
            demo_mode: flag("FONDAY_DEMO_MODE"),
            scan_timeout: Duration::from_secs(parse_or("FONDAY_SCAN_TIMEOUT_SECS", 30)),
            min_scan_duration: Duration::from_millis(parse_or("FONDAY_MIN_SCAN_MS", 3200)),
            google_oauth: oauth_client("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            kakao_oauth: oauth_client("KAKAO_CLIENT_ID", "KAKAO_CLIENT_SECRET"),
            waitlist_url: non_empty("FONDAY_WAITLIST_URL"),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    non_empty(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn flag(key: &str) -> bool {
    matches!(
        env::var(key).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn parse_or(key: &str, default: u64) -> u64 {
    match non_empty(key) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("invalid {key} value ({e}), using default: {default}");
            default
        }),
        None => default,
    }
}

// Kakao treats the client secret as optional, so only the id is required.
fn oauth_client(id_key: &str, secret_key: &str) -> Option<OAuthClient> {
    let client_id = non_empty(id_key)?;
    Some(OAuthClient {
        client_id,
        client_secret: env::var(secret_key).unwrap_or_default(),
    })
}
