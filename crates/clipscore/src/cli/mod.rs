//! Command handlers for the `clipscore` binary.

pub mod config;
pub mod interactive;
pub mod models;
pub mod score;
