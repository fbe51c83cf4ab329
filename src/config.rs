use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub admin_key: String,
    pub slack_webhook_url: Option<String>,
    /// Comma-separated list of webhook URLs notified on application events.
    pub webhook_urls: Vec<String>,
    /// Shared secret for HMAC-signing outgoing webhook payloads.
    pub webhook_signing_secret: Option<String>,
    /// TTL for cached list queries, in seconds.
    /// Set via VENDORA_CACHE_TTL_SECS. Default: 30.
    pub cache_ttl_secs: u64,
    /// Applications pending longer than this are flagged by the consistency
    /// job. Set via VENDORA_STALE_PENDING_DAYS. Default: 7.
    pub stale_pending_days: i64,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let admin_key =
        std::env::var("VENDORA_ADMIN_KEY").unwrap_or_else(|_| "CHANGE_ME_ADMIN_KEY".into());

    if admin_key == "CHANGE_ME_ADMIN_KEY" {
        let env_mode = std::env::var("VENDORA_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "VENDORA_ADMIN_KEY is still the insecure placeholder. \
                 Set a proper key before running in production."
            );
        }
        eprintln!(
            "⚠️  VENDORA_ADMIN_KEY is not set — using insecure placeholder. \
             Set a real key for production."
        );
    }

    Ok(Config {
        port: std::env::var("VENDORA_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/vendora".into()),
        redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
        admin_key,
        slack_webhook_url: std::env::var("VENDORA_SLACK_WEBHOOK_URL").ok(),
        webhook_urls: std::env::var("VENDORA_WEBHOOK_URLS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        webhook_signing_secret: std::env::var("VENDORA_WEBHOOK_SECRET").ok(),
        cache_ttl_secs: std::env::var("VENDORA_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30),
        stale_pending_days: std::env::var("VENDORA_STALE_PENDING_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7),
    })
}
