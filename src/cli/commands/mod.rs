//! Subcommand handlers

pub mod browse;
pub mod config;
pub mod diag;
pub mod favorites;
