//! Command-level error type.
//!
//! Component errors are typed (`StoreError`, `IngestError`, `ForecastError`,
//! ...). At the command boundary they collapse into an `AppError` carrying the
//! process exit code:
//!
//! - `2`: configuration or input error
//! - `4`: store / ingestion / output failure
//!
//! Empty input is not an error at this level: both commands finish with an
//! empty result and exit 0.

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<crate::store::StoreError> for AppError {
    fn from(err: crate::store::StoreError) -> Self {
        Self::runtime(format!("Store error: {err}"))
    }
}

impl From<crate::loader::IngestError> for AppError {
    fn from(err: crate::loader::IngestError) -> Self {
        Self::runtime(format!("Ingestion aborted: {err}"))
    }
}

impl From<crate::pipeline::PipelineError> for AppError {
    fn from(err: crate::pipeline::PipelineError) -> Self {
        Self::runtime(format!("Forecast pipeline aborted: {err}"))
    }
}

impl From<crate::plot::RenderError> for AppError {
    fn from(err: crate::plot::RenderError) -> Self {
        Self::runtime(format!("Output error: {err}"))
    }
}
