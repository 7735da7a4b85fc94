use std::{env, fmt::Display, str::FromStr};

use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use dotenvy::dotenv;
use tracing::warn;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,

    /// Offset applied to the server clock before taking the attendance date.
    pub utc_offset: FixedOffset,

    // Anti-proxy heuristic
    pub enforce_ip_check: bool,
    pub admin_ips: Vec<String>,

    // Rate limiting
    pub rate_submit_per_min: u32,

    pub leave_cache_ttl_secs: u64,

    // Google Sheets roster
    pub sheet_id: Option<String>,
    pub sheet_name: String,
    pub google_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let offset_minutes: i32 = parse_or("ATTENDANCE_UTC_OFFSET_MINUTES", 360);
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| anyhow!("ATTENDANCE_UTC_OFFSET_MINUTES out of range: {offset_minutes}"))?;

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            utc_offset,

            enforce_ip_check: parse_or("ENFORCE_IP_CHECK", false),
            admin_ips: env::var("ADMIN_IPS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),

            rate_submit_per_min: parse_or("RATE_SUBMIT_PER_MIN", 30),

            leave_cache_ttl_secs: parse_or("LEAVE_CACHE_TTL_SECS", 60),

            sheet_id: non_empty_var("GOOGLE_SHEET_ID"),
            sheet_name: env::var("GOOGLE_SHEET_NAME").unwrap_or_else(|_| "Attendance".to_string()),
            google_api_key: non_empty_var("GOOGLE_API_KEY"),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default {default}");
            default
        }),
        Err(_) => default,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
