pub mod bridge_client;
pub mod directory;
pub mod memory_directory;
