//! Text-generation port.

pub mod client;
pub mod types;
