//! LOTWATCH Back-Office Monitor Library
//!
//! This library provides the core components for the LOTWATCH position
//! monitoring daemon: the account directory clients, the scanning and
//! roster actors, and the exposure pivots they feed.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
