#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]
// TEMPORARILY
#![allow(clippy::uninlined_format_args)]

pub mod aggregator;
pub mod commands;
pub mod db;
pub mod enricher;
pub mod error;
pub mod geo;
pub mod ledger;
pub mod orchestrator;
pub mod profile;
pub mod scheduler;
pub mod settings;
pub mod unixtime;
pub mod user;

#[cfg(test)]
pub(crate) mod testing;

pub static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
