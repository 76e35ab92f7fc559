//! Core types, config, errors, and run-state model for Parlance.

pub mod config;
pub mod error;
pub mod markup;
pub mod run;
pub mod types;
