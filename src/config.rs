//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through the environment; a `.env`
//! file is loaded before parsing.

use std::time::Duration;

use chrono::FixedOffset;
use clap::Parser;
use url::Url;

use crate::state::ServiceSettings;

pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

/// Email open tracker: hands out tracking pixels and records who opened them.
#[derive(Parser, Debug, Clone)]
#[command(name = "mail-tracker")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address the HTTP server binds to.
    #[arg(long, env = "SERVER_ADDRESS", default_value = DEFAULT_SERVER_ADDRESS)]
    pub server_address: String,

    /// PostgreSQL connection string. Without it records live in memory only.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(
        long,
        env = "DATABASE_MAX_CONNECTIONS",
        default_value_t = DEFAULT_DATABASE_MAX_CONNECTIONS
    )]
    pub database_max_connections: u32,

    /// Externally visible base URL, used to build pixel URLs.
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:8080/")]
    pub public_url: Url,

    /// Offset used to display timestamps, e.g. `+05:30`.
    #[arg(
        long,
        env = "DISPLAY_UTC_OFFSET",
        default_value = "+00:00",
        value_parser = parse_utc_offset
    )]
    pub display_utc_offset: FixedOffset,

    /// Upper bound for a single store call made while handling a request.
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 300)]
    pub store_timeout_ms: u64,

    /// Account created at startup when missing (requires --admin-password).
    #[arg(long, env = "ADMIN_USERNAME", requires = "admin_password")]
    pub admin_username: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true, requires = "admin_username")]
    pub admin_password: Option<String>,
}

impl Config {
    pub fn service_settings(&self) -> Result<ServiceSettings, url::ParseError> {
        ServiceSettings::new(
            &self.public_url,
            self.display_utc_offset,
            Duration::from_millis(self.store_timeout_ms),
        )
    }

    pub fn admin_account(&self) -> Option<(&str, &str)> {
        match (&self.admin_username, &self.admin_password) {
            (Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
            _ => None,
        }
    }
}

/// Parses `Z`, `+HH:MM`, `-HH:MM` or `+HHMM`.
pub fn parse_utc_offset(text: &str) -> Result<FixedOffset, String> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| "invalid offset".to_string());
    }
    let (sign, rest) = if let Some(rest) = text.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = text.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(format!("offset must start with + or -: {text:?}"));
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("offset must look like +HH:MM: {text:?}"));
    }
    let hours: i32 = digits[..2].parse().map_err(|e| format!("{e}"))?;
    let minutes: i32 = digits[2..].parse().map_err(|e| format!("{e}"))?;
    if minutes >= 60 {
        return Err(format!("minutes out of range: {text:?}"));
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("offset out of range: {text:?}"))
}
