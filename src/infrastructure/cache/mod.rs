pub mod price_cache;
pub mod session_cache;
