//! Configuration for Turnstile
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Turnstile - first-come-first-serve claim admission service
#[derive(Parser, Debug, Clone)]
#[command(name = "turnstile")]
#[command(about = "First-come-first-serve claim admission service")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Claim/unclaim attempts allowed per caller per window
    #[arg(long, env = "CLAIM_RATE_LIMIT", default_value = "30")]
    pub claim_rate_limit: u32,

    /// Rate limit window in seconds
    #[arg(long, env = "CLAIM_RATE_WINDOW_SECONDS", default_value = "60")]
    pub claim_rate_window_seconds: u64,

    /// Snapshot cache TTL in seconds
    #[arg(long, env = "SNAPSHOT_TTL_SECONDS", default_value = "5")]
    pub snapshot_ttl_seconds: u64,

    /// Snapshot cache entry limit
    #[arg(long, env = "SNAPSHOT_MAX_ENTRIES", default_value = "10000")]
    pub snapshot_max_entries: usize,

    /// Snapshot cache cleanup interval in seconds
    #[arg(long, env = "SNAPSHOT_CLEANUP_SECONDS", default_value = "60")]
    pub snapshot_cleanup_seconds: u64,

    /// Default page size for post listings
    #[arg(long, env = "LIST_PAGE_SIZE", default_value = "20")]
    pub list_page_size: usize,

    /// Maximum page size a caller may request
    #[arg(long, env = "LIST_PAGE_MAX", default_value = "100")]
    pub list_page_max: usize,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.claim_rate_limit == 0 {
            return Err("CLAIM_RATE_LIMIT must be at least 1".to_string());
        }
        if self.claim_rate_window_seconds == 0 {
            return Err("CLAIM_RATE_WINDOW_SECONDS must be at least 1".to_string());
        }
        if self.list_page_size == 0 || self.list_page_size > self.list_page_max {
            return Err("LIST_PAGE_SIZE must be between 1 and LIST_PAGE_MAX".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_args() -> Args {
        Args::parse_from(["turnstile"])
    }

    #[test]
    fn defaults_validate() {
        assert!(default_args().validate().is_ok());
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let mut args = default_args();
        args.claim_rate_limit = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn page_size_must_not_exceed_max() {
        let mut args = default_args();
        args.list_page_size = args.list_page_max + 1;
        assert!(args.validate().is_err());
    }
}
