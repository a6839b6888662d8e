pub mod actors;
pub mod scan_cache;
pub mod services;
