//! `groundwater-forecast` library crate.
//!
//! The binary (`gwf`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the store, model, and chart seams can be swapped in tests
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod forecast;
pub mod io;
pub mod loader;
pub mod math;
pub mod models;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod store;
