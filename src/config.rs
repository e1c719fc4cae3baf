use std::{str::FromStr, time::Duration};
use tracing::warn;

/// Runtime settings, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub frontend_url: Option<String>,
    pub max_body_bytes: usize,
    pub completion: CompletionConfig,
    pub generation_timeout: Duration,
    pub token_secret: String,
    pub token_ttl: Duration,
    pub admin: AdminConfig,
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
    pub email: String,
    pub session_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub vercel_token: Option<String>,
    pub netlify_token: Option<String>,
    pub vercel_api_base: String,
    pub netlify_api_base: String,
}

const HOUR: u64 = 60 * 60;
/// Ten years; longer lifetimes are clamped.
const MAX_TTL_HOURS: u64 = 10 * 365 * 24;

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token_secret = get("TOKEN_SECRET").unwrap_or_else(|| {
            warn!("⚠️ TOKEN_SECRET is not set, using an insecure development secret");
            "dev-secret-change-me".to_string()
        });

        Self {
            port: parse_or("PORT", get("PORT"), 5000u16),
            frontend_url: get("FRONTEND_URL"),
            max_body_bytes: parse_or("MAX_BODY_BYTES", get("MAX_BODY_BYTES"), 50 * 1024 * 1024usize),
            completion: CompletionConfig {
                api_key: get("GROK_API_KEY"),
                api_url: get("GROK_API_URL").unwrap_or_else(|| "https://api.x.ai/v1".into()),
                model: get("GROK_MODEL").unwrap_or_else(|| "grok-beta".into()),
                max_tokens: parse_or("GROK_MAX_TOKENS", get("GROK_MAX_TOKENS"), 8000u32),
                temperature: parse_or("GROK_TEMPERATURE", get("GROK_TEMPERATURE"), 0.7f32),
            },
            generation_timeout: Duration::from_secs(parse_or(
                "GENERATION_TIMEOUT_SECS",
                get("GENERATION_TIMEOUT_SECS"),
                120u64,
            )),
            token_secret,
            token_ttl: hours("TOKEN_TTL_HOURS", get("TOKEN_TTL_HOURS"), 168),
            admin: AdminConfig {
                username: get("ADMIN_USERNAME").unwrap_or_else(|| "admin".into()),
                password: get("ADMIN_PASSWORD").unwrap_or_else(|| "admin123".into()),
                email: get("ADMIN_EMAIL").unwrap_or_else(|| "admin@builder.com".into()),
                session_ttl: hours("ADMIN_SESSION_HOURS", get("ADMIN_SESSION_HOURS"), 24),
            },
            deploy: DeployConfig {
                vercel_token: get("VERCEL_TOKEN"),
                netlify_token: get("NETLIFY_TOKEN"),
                vercel_api_base: get("VERCEL_API_BASE").unwrap_or_else(|| "https://api.vercel.com".into()),
                netlify_api_base: get("NETLIFY_API_BASE")
                    .unwrap_or_else(|| "https://api.netlify.com/api/v1".into()),
            },
        }
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(v) => v.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {}={:?}, using default", key, v);
            default
        }),
    }
}

fn hours(key: &str, raw: Option<String>, default: u64) -> Duration {
    let mut value = parse_or(key, raw, default);
    if value > MAX_TTL_HOURS {
        warn!("{}={} is too large, clamping to {} hours", key, value, MAX_TTL_HOURS);
        value = MAX_TTL_HOURS;
    }
    Duration::from_secs(value * HOUR)
}
