pub mod csrf;
pub mod email;
pub mod gatekeeper;
pub mod hashing;
pub mod jwt;
pub mod metrics;
pub mod rate_limit;
pub mod redis_cache;
pub mod security;
