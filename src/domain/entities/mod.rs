pub mod account;
pub mod position;
