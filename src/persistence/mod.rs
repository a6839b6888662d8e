//! Persistence Layer
//!
//! Flat JSON snapshots of the two in-memory caches. There is no database:
//! the caches are rebuilt from the bridge on every cycle, and the files
//! only exist so a restarted daemon has something to display before its
//! first pass completes.

pub mod snapshot;
