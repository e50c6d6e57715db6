use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;

use agora_api::storage::S3Settings;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Session lifetime between one hour and one year.
const TOKEN_TTL_HOURS: RangeInclusive<i64> = 1..=24 * 365;
const MAX_UPLOAD_MB: RangeInclusive<usize> = 1..=1024;

pub enum StorageBackend {
    /// Files under `dir`, served back by this process at `/uploads`.
    Disk { dir: PathBuf, public_base: String },
    /// A credentialed S3 (or S3-compatible) bucket.
    S3(S3Settings),
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub secure_cookies: bool,
    pub allowed_origins: Vec<String>,
    pub storage: StorageBackend,
    pub max_upload_bytes: usize,
    pub metadata_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("AGORA_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("AGORA_JWT_SECRET is unset or still a placeholder");
        }

        let port: u16 = parse_or("AGORA_PORT", 8800)?;
        let public_url = var_or("AGORA_PUBLIC_URL", &format!("http://localhost:{port}"));

        let storage = match var_or("AGORA_STORAGE", "disk").as_str() {
            "disk" => StorageBackend::Disk {
                dir: var_or("AGORA_UPLOAD_DIR", "./uploads").into(),
                public_base: format!("{}/uploads", public_url.trim_end_matches('/')),
            },
            "s3" => StorageBackend::S3(s3_from_env()?),
            other => bail!("unknown AGORA_STORAGE backend '{other}' (expected disk or s3)"),
        };

        let allowed_origins = var_or("ALLOWED_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let max_upload_mb = bounded(
            "AGORA_MAX_UPLOAD_MB",
            parse_or("AGORA_MAX_UPLOAD_MB", 10)?,
            MAX_UPLOAD_MB,
        )?;
        let token_ttl_hours = bounded(
            "AGORA_TOKEN_TTL_HOURS",
            parse_or("AGORA_TOKEN_TTL_HOURS", 720)?,
            TOKEN_TTL_HOURS,
        )?;

        Ok(Self {
            host: var_or("AGORA_HOST", "0.0.0.0"),
            port,
            db_path: var_or("AGORA_DB_PATH", "agora.db").into(),
            jwt_secret,
            token_ttl_hours,
            secure_cookies: parse_or("AGORA_SECURE_COOKIES", false)?,
            allowed_origins,
            storage,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            metadata_url: var_or("AGORA_METADATA_URL", "http://169.254.169.254/latest"),
        })
    }
}

fn s3_from_env() -> Result<S3Settings> {
    let bucket = required("S3_BUCKET_NAME")?;
    let region = required("AWS_REGION")?;
    let endpoint = env::var("AGORA_S3_ENDPOINT").ok().filter(|e| !e.is_empty());
    let default_public = match &endpoint {
        Some(endpoint) => format!("{}/{bucket}", endpoint.trim_end_matches('/')),
        None => format!("https://{bucket}.s3.{region}.amazonaws.com"),
    };

    Ok(S3Settings {
        access_key_id: required("AWS_ACCESS_KEY_ID")?,
        secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
        public_base: var_or("AGORA_OBJECT_PUBLIC_URL", &default_public),
        bucket,
        region,
        endpoint,
    })
}

fn required(key: &str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .with_context(|| format!("AGORA_STORAGE=s3 requires {key}"))
}

fn bounded<T>(key: &str, value: T, range: RangeInclusive<T>) -> Result<T>
where
    T: PartialOrd + Display,
{
    if !range.contains(&value) {
        bail!(
            "{key} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        );
    }
    Ok(value)
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key} value '{raw}'")),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
