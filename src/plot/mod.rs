//! Forecast chart artifacts.
//!
//! The pipeline only sees the `ArtifactSink` trait; the SVG renderer is the
//! production implementation and tests substitute in-memory sinks.

use std::path::{Path, PathBuf};

use crate::domain::ForecastHorizon;

pub mod svg;

pub use svg::*;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to prepare '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to draw chart for `{entity}`: {reason}")]
    Draw { entity: String, reason: String },
    #[error("nothing to draw for `{entity}`")]
    EmptyHorizon { entity: String },
}

/// Persists one forecast as a viewable artifact and returns its location.
pub trait ArtifactSink {
    fn render(&self, entity_id: &str, horizon: &ForecastHorizon) -> Result<PathBuf, RenderError>;
}

impl<S: ArtifactSink + ?Sized> ArtifactSink for &S {
    fn render(&self, entity_id: &str, horizon: &ForecastHorizon) -> Result<PathBuf, RenderError> {
        (**self).render(entity_id, horizon)
    }
}

/// `<entity>_forecast.svg`, with every non-alphanumeric char replaced by `_`.
pub fn artifact_file_name(entity_id: &str) -> String {
    let stem: String = entity_id
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}_forecast.svg")
}

/// Create `dir` (and parents) if needed.
pub fn ensure_dir(dir: &Path) -> Result<(), RenderError> {
    std::fs::create_dir_all(dir).map_err(|source| RenderError::Io {
        path: dir.to_path_buf(),
        source,
    })
}
