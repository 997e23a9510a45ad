//! Model fitting.
//!
//! Responsibilities:
//!
//! - build the trend + yearly-seasonality design for one entity
//! - solve the regularized least squares problem
//! - turn the fit into point estimates with prediction bands
//! - honour cooperative cancellation between fitting stages

pub mod cancel;
pub mod fitter;

pub use cancel::*;
pub use fitter::*;
