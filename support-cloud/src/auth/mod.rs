//! Staff authentication and request throttling

pub mod rate_limit;
pub mod staff_auth;

pub use rate_limit::RateLimiter;
pub use staff_auth::StaffIdentity;
