pub mod roster_actor;
pub mod scanner_actor;

pub use roster_actor::{RosterActor, RosterCache, RosterConfig, RosterMessage};
pub use scanner_actor::{ScannerActor, ScannerConfig, ScannerMessage};
