//! Core domain + application logic for the gift suggestion bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the text-generation
//! backend live behind ports (traits) implemented in adapter crates.

pub mod audit;
pub mod budget;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flow;
pub mod logging;
pub mod messaging;
pub mod model;
pub mod session;
pub mod suggestion;

pub use errors::{Error, Result};
