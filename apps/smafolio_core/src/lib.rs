pub mod auth;
pub mod error;
pub mod forms;
pub mod media;
pub mod models;
pub mod origin;
pub mod serializers;
pub mod urls;
pub mod views;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter};
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use crate::media::MediaStorage;
use crate::models::refresh_token::{Column as RTCol, Entity as RT};

/// Process-wide settings read once at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    /// HMAC key for access and refresh tokens.
    pub secret_key: String,
    pub debug: bool,
    /// Host names accepted in the `Host` header. A leading dot matches any
    /// subdomain, `*` matches everything.
    pub allowed_hosts: Vec<String>,
    pub database_url: String,
    pub media_root: PathBuf,
    pub media_url: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    /// Extra TrueType files the PDF export falls back to for scripts the
    /// bundled Noto Sans does not cover.
    pub export_fonts: Vec<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("SECRET_KEY").context("SECRET_KEY must be set")?;
        let debug = std::env::var("DEBUG").map(|v| v == "on").unwrap_or(false);
        let allowed_hosts = std::env::var("ALLOWED_HOSTS")
            .map(|v| {
                v.split(',')
                    .map(|h| h.trim().to_ascii_lowercase())
                    .filter(|h| !h.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let media_root = std::env::var("MEDIA_ROOT").unwrap_or("media".into()).into();
        let media_url = std::env::var("MEDIA_URL").unwrap_or("/media/".into());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let max_upload_bytes = std::env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(25 * 1024 * 1024);
        let export_fonts = std::env::var("EXPORT_FONTS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            secret_key,
            debug,
            allowed_hosts,
            database_url,
            media_root,
            media_url,
            port,
            max_upload_bytes,
            export_fonts,
        })
    }

    /// Host validation against `allowed_hosts`; any `:port` suffix is ignored.
    pub fn host_allowed(&self, host: &str) -> bool {
        let host = strip_port(host).to_ascii_lowercase();
        if host.is_empty() {
            return false;
        }
        if self.allowed_hosts.is_empty() {
            return self.debug && matches!(host.as_str(), "localhost" | "127.0.0.1" | "[::1]");
        }
        self.allowed_hosts.iter().any(|pattern| {
            if pattern == "*" {
                true
            } else if let Some(domain) = pattern.strip_prefix('.') {
                host == domain || host.ends_with(pattern.as_str())
            } else {
                host == *pattern
            }
        })
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // [::1]:8000
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host)
}

#[derive(Clone, Debug)]
pub struct JwtCfg {
    /// Access token TTL (default 15 min). Override with ACCESS_TTL_SECS.
    pub access_ttl: ChronoDuration,
    /// Refresh token TTL (default 14 days). Override with REFRESH_TTL_SECS.
    pub refresh_ttl: ChronoDuration,
    pub cookie_secure: bool,
    pub cookie_domain: Option<String>,
    pub cookie_name: String,
    /// Janitor tick in seconds (default 3600).
    pub janitor_interval_secs: u64,
    /// How long revoked tokens are kept before hard-delete (default 30 days).
    pub revoked_retention_secs: i64,
}

impl JwtCfg {
    pub fn from_env() -> Self {
        let access_secs = std::env::var("ACCESS_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(900);
        let refresh_secs = std::env::var("REFRESH_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(14 * 86_400);
        let cookie_secure = std::env::var("COOKIE_SECURE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on"))
            .unwrap_or(false);
        let cookie_domain = std::env::var("COOKIE_DOMAIN").ok();
        let cookie_name =
            std::env::var("REFRESH_COOKIE_NAME").unwrap_or("smafolio_refresh".into());
        let janitor_interval_secs = std::env::var("JANITOR_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);
        let revoked_retention_secs = std::env::var("REVOKED_RETENTION_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30 * 24 * 3600);

        Self {
            access_ttl: ChronoDuration::seconds(access_secs),
            refresh_ttl: ChronoDuration::seconds(refresh_secs),
            cookie_secure,
            cookie_domain,
            cookie_name,
            janitor_interval_secs,
            revoked_retention_secs,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt_enc: Arc<EncodingKey>,
    pub jwt_dec: Arc<DecodingKey>,
    pub jwt_cfg: JwtCfg,
    pub settings: Arc<Settings>,
    pub media: MediaStorage,
}

impl AppState {
    pub fn new(db: DatabaseConnection, settings: Settings, jwt_cfg: JwtCfg) -> Self {
        let secret = settings.secret_key.as_bytes();
        let media = MediaStorage::new(settings.media_root.clone(), settings.media_url.clone());
        Self {
            jwt_enc: Arc::new(EncodingKey::from_secret(secret)),
            jwt_dec: Arc::new(DecodingKey::from_secret(secret)),
            db,
            jwt_cfg,
            settings: Arc::new(settings),
            media,
        }
    }
}

/// Ensure DB schema is up-to-date (runs the migration crate).
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<()> {
    use migration::Migrator;
    use sea_orm_migration::migrator::MigratorTrait;
    Migrator::up(db, None).await?;
    Ok(())
}

/// Spawn background janitor: clears expired and stale-revoked refresh tokens.
pub fn spawn_token_janitor(state: AppState) {
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(state.jwt_cfg.janitor_interval_secs));
        loop {
            tick.tick().await;
            match purge_refresh_tokens(&state).await {
                Ok(removed) => info!(removed, "refresh token janitor ran"),
                Err(e) => warn!(error = %e, "refresh token janitor failed"),
            }
        }
    });
}

/// Delete refresh tokens that expired, or were revoked longer ago than the
/// retention window.
pub async fn purge_refresh_tokens(state: &AppState) -> Result<u64, sea_orm::DbErr> {
    let now = Utc::now();
    let cutoff = now - ChronoDuration::seconds(state.jwt_cfg.revoked_retention_secs);
    let res = RT::delete_many()
        .filter(
            Condition::any()
                .add(RTCol::ExpiresAt.lt(now))
                .add(RTCol::RevokedAt.lt(cutoff)),
        )
        .exec(&state.db)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn settings(debug: bool, hosts: &[&str]) -> Settings {
        Settings {
            secret_key: "test".into(),
            debug,
            allowed_hosts: hosts.iter().map(|h| h.to_string()).collect(),
            database_url: "sqlite::memory:".into(),
            media_root: "media".into(),
            media_url: "/media/".into(),
            port: 3000,
            max_upload_bytes: 1024,
            export_fonts: Vec::new(),
        }
    }

    #[rstest]
    #[case("smafolio.app", true)]
    #[case("smafolio.app:8443", true)]
    #[case("www.smafolio.app", true)]
    #[case("evil.example", false)]
    #[case("", false)]
    fn allowed_hosts_match_exact_and_subdomain(#[case] host: &str, #[case] ok: bool) {
        let s = settings(false, &["smafolio.app", ".smafolio.app"]);
        assert_eq!(s.host_allowed(host), ok);
    }

    #[test]
    fn empty_allowed_hosts_only_permits_localhost_in_debug() {
        assert!(settings(true, &[]).host_allowed("localhost:3000"));
        assert!(settings(true, &[]).host_allowed("[::1]:3000"));
        assert!(!settings(true, &[]).host_allowed("example.com"));
        assert!(!settings(false, &[]).host_allowed("localhost"));
    }

    #[test]
    fn wildcard_accepts_any_host() {
        assert!(settings(false, &["*"]).host_allowed("anything.test"));
    }
}
