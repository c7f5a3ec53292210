//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_TAX_RATE` - Sales tax as a fraction (default: 0.18)
//! - `STOREFRONT_MEDIA_DIR` - Upload directory served at `/media` (default: media)
//! - `STOREFRONT_STATIC_DIR` - Asset directory served at `/static`
//!   (default: crates/storefront/static)
//! - `STOREFRONT_LOG_JSON` - Emit JSON logs when set to `1` or `true`
//! - `STORE_NAME` - Shop name used in page titles and emails (default: Tsitsi Store)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM`,
//!   `STORE_INBOX_EMAIL` - Outgoing mail. All of host, username, password and
//!   from address must be set together; without them emails are skipped.
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE` - Error tracking

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use tsitsi_core::pricing::TaxRate;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Fragments of values copied from sample `.env` files, matched case-insensitively.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without trailing slash
    pub base_url: String,
    /// Session secret
    pub session_secret: SecretString,
    /// Shop name shown in titles and emails
    pub store_name: String,
    /// Sales tax applied at checkout
    pub tax_rate: TaxRate,
    /// Where uploaded review and profile pictures are written
    pub media_dir: PathBuf,
    /// Where CSS and other static assets live
    pub static_dir: PathBuf,
    /// Emit JSON logs instead of human-readable text
    pub log_json: bool,
    /// Outgoing mail; `None` disables confirmation and contact emails
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
    /// Store inbox that receives contact form messages
    pub inbox_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("inbox_address", &self.inbox_address)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; the process environment still applies.
        dotenvy::dotenv().ok();

        let database_url = database_url("STOREFRONT_DATABASE_URL")?;
        let host: IpAddr = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port: u16 = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = parse_base_url(&require("STOREFRONT_BASE_URL")?)?;
        let session_secret = SecretPolicy::SESSION.load("STOREFRONT_SESSION_SECRET")?;

        let tax_rate = match env_var("STOREFRONT_TAX_RATE") {
            Some(raw) => TaxRate::parse(&raw).map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_TAX_RATE".to_string(), e.to_string())
            })?,
            None => TaxRate::default(),
        };

        let sentry_sample_rate: f32 = parse_env("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate: f32 = parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            store_name: env_or("STORE_NAME", "Tsitsi Store"),
            tax_rate,
            media_dir: PathBuf::from(env_or("STOREFRONT_MEDIA_DIR", "media")),
            static_dir: PathBuf::from(env_or(
                "STOREFRONT_STATIC_DIR",
                "crates/storefront/static",
            )),
            log_json: parse_flag(env_var("STOREFRONT_LOG_JSON").as_deref()),
            email: EmailConfig::from_env()?,
            sentry_dsn: env_var("SENTRY_DSN"),
            sentry_environment: env_var("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the site is served over HTTPS (controls the `Secure` cookie flag).
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl EmailConfig {
    /// Read SMTP settings. Returns `Ok(None)` when no SMTP variable is set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = env_var("SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port: u16 = parse_env("SMTP_PORT", "587")?;
        let from_address = require("EMAIL_FROM")?;
        let inbox_address =
            env_var("STORE_INBOX_EMAIL").unwrap_or_else(|| from_address.clone());

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: require("SMTP_USERNAME")?,
            smtp_password: SecretPolicy::CREDENTIAL.load("SMTP_PASSWORD")?,
            from_address,
            inbox_address,
        }))
    }
}

// =============================================================================
// Environment helpers
// =============================================================================

/// An environment variable, with blank values treated as unset.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_var(key).unwrap_or_else(|| default.to_string())
}

fn require(key: &str) -> Result<String, ConfigError> {
    env_var(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse `key` (or `default` when unset) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_or(key, default)
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// `primary_key`, falling back to the conventional `DATABASE_URL`.
fn database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    env_var(primary_key)
        .or_else(|| env_var("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes")
    )
}

/// Validate the base URL and strip any trailing slash.
fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".into(), reason);
    let url = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("must use http or https".into()));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

// =============================================================================
// Secret validation
// =============================================================================

/// Rules a secret read from the environment must satisfy.
#[derive(Debug, Clone, Copy)]
struct SecretPolicy {
    min_length: usize,
}

impl SecretPolicy {
    /// Session signing key.
    const SESSION: Self = Self {
        min_length: MIN_SESSION_SECRET_LENGTH,
    };
    /// Credentials for outside services, whose length we do not control.
    const CREDENTIAL: Self = Self { min_length: 1 };

    /// Reject short values, copied placeholders and low-entropy strings.
    fn check(self, key: &str, value: &str) -> Result<(), ConfigError> {
        let insecure = |reason: String| ConfigError::InsecureSecret(key.to_string(), reason);

        let length = value.chars().count();
        if length < self.min_length {
            return Err(insecure(format!(
                "must be at least {} characters (got {length})",
                self.min_length
            )));
        }

        let lower = value.to_lowercase();
        if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
            return Err(insecure(format!(
                "looks like a placeholder (contains '{pattern}')"
            )));
        }

        let entropy = entropy_bits_per_char(value);
        if entropy < MIN_ENTROPY_BITS_PER_CHAR {
            return Err(insecure(format!(
                "too predictable ({entropy:.2} bits/char, need {MIN_ENTROPY_BITS_PER_CHAR:.1}); generate it randomly"
            )));
        }
        Ok(())
    }

    /// Read `key` and check it against this policy.
    fn load(self, key: &str) -> Result<SecretString, ConfigError> {
        let value = require(key)?;
        self.check(key, &value)?;
        Ok(SecretString::from(value))
    }
}

/// Shannon entropy of the character distribution, in bits per character.
#[allow(clippy::cast_precision_loss)]
fn entropy_bits_per_char(value: &str) -> f64 {
    let counts = value.chars().fold(BTreeMap::<char, u32>::new(), |mut acc, c| {
        *acc.entry(c).or_default() += 1;
        acc
    });
    let total = counts.values().sum::<u32>();
    if total == 0 {
        return 0.0;
    }
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / f64::from(total);
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// A config suitable for unit tests; no environment access.
    pub(crate) fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/tsitsi_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            store_name: "Tsitsi Store".to_string(),
            tax_rate: TaxRate::default(),
            media_dir: PathBuf::from("media"),
            static_dir: PathBuf::from("crates/storefront/static"),
            log_json: false,
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_entropy_of_simple_strings() {
        assert!(entropy_bits_per_char("").abs() < f64::EPSILON);
        assert!(entropy_bits_per_char("zzzzzz").abs() < f64::EPSILON);
        assert!((entropy_bits_per_char("ab") - 1.0).abs() < 0.01);
        assert!(entropy_bits_per_char("q7#Lm2!vR9@tK4$w") > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_placeholders_are_rejected() {
        for value in ["your-session-key", "Changeme-later", "insert-random-here"] {
            assert!(matches!(
                SecretPolicy::CREDENTIAL.check("SMTP_PASSWORD", value),
                Err(ConfigError::InsecureSecret(_, _))
            ));
        }
    }

    #[test]
    fn test_repetitive_secret_is_rejected() {
        let result = SecretPolicy::SESSION.check("S", &"ab".repeat(16));
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_session_secret_needs_length() {
        let strong = "q7#Lm2!vR9@tK4$wZ1^nB8&cX3*dF6(h";
        assert!(SecretPolicy::SESSION.check("S", strong).is_ok());
        assert!(SecretPolicy::SESSION.check("S", &strong[..16]).is_err());
        assert!(SecretPolicy::CREDENTIAL.check("S", &strong[..16]).is_ok());
    }

    #[test]
    fn test_parse_base_url() {
        assert_eq!(
            parse_base_url("https://tsitsi.mg/").unwrap(),
            "https://tsitsi.mg"
        );
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("ftp://tsitsi.mg").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("TRUE")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn test_socket_addr_and_https() {
        let mut config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_https());
        config.base_url = "https://tsitsi.mg".to_string();
        assert!(config.is_https());
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.tsitsi.mg".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("super_secret_smtp_password"),
            from_address: "shop@tsitsi.mg".to_string(),
            inbox_address: "hello@tsitsi.mg".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.tsitsi.mg"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }
}
