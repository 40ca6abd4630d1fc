pub mod rate_limiter;
pub mod resync;
