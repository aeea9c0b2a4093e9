pub mod checkpoint;
pub mod command;
pub mod config;
pub mod gate;
pub mod ledger;
pub mod monitor;
pub mod notify;
pub mod source;
