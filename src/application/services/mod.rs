pub mod watch_service;

pub use watch_service::WatchService;
