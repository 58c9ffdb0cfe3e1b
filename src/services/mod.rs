//! Service layer for Turnstile

pub mod claims;
pub mod notify;
pub mod rate_limit;

pub use claims::{ClaimReceipt, ClaimService, ReleaseReceipt};
pub use notify::{ClaimNotifier, LogNotifier};
pub use rate_limit::RateLimiter;
