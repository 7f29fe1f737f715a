pub mod bunny;
pub mod cookies;
pub mod error;
pub mod github;
pub mod rate_limit;
pub mod session;
