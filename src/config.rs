use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use super::error::{Error, Result};

/// Longest allowed session lifetime: one hundred years.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 366 * 100;

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub listen_addr: SocketAddr,
    pub database_url: Option<String>,
    pub pool_size: u32,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
    pub allowed_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            listen_addr: SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 1234),
            database_url: None,
            pool_size: 3,
            session_ttl_hours: 24 * 14,
            secure_cookies: false,
            allowed_origins: Vec::new(),
        }
    }
}

fn parse<T: FromStr>(name: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("Failed to parse ${}: {:?}", name, v))),
        None => Ok(default),
    }
}

fn parse_bool(name: &str, value: Option<String>) -> Result<bool> {
    match value.as_ref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(Error::Config(format!("Failed to parse ${}: {:?}", name, v))),
        },
    }
}

impl Settings {
    pub fn from_env() -> Result<Settings> {
        dotenv::dotenv().ok();

        Settings::from_vars(|name| std::env::var(name).ok())
    }

    /// Build settings from a variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();

        let ip = parse("LISTEN_IP", var("LISTEN_IP"), defaults.listen_addr.ip())?;
        let port = parse("PORT", var("PORT"), defaults.listen_addr.port())?;
        let pool_size = parse("DATABASE_POOL_SIZE", var("DATABASE_POOL_SIZE"), defaults.pool_size)?;
        let session_ttl_hours = parse(
            "SESSION_TTL_HOURS",
            var("SESSION_TTL_HOURS"),
            defaults.session_ttl_hours,
        )?;

        if pool_size == 0 {
            return Err(Error::Config("$DATABASE_POOL_SIZE must be at least 1".into()));
        }
        if session_ttl_hours <= 0 || session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(Error::Config(format!(
                "$SESSION_TTL_HOURS must be between 1 and {}",
                MAX_SESSION_TTL_HOURS
            )));
        }

        let allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Settings {
            listen_addr: SocketAddr::new(ip, port),
            database_url: var("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            pool_size,
            session_ttl_hours,
            secure_cookies: parse_bool("SESSION_COOKIE_SECURE", var("SESSION_COOKIE_SECURE"))?,
            allowed_origins,
        })
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| Error::Config("DATABASE_URL must be set!".into()))
    }
}
