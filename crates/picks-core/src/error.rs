use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Upstream timed out")]
    Timeout,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("No candidate pool available from any source")]
    NoPool,

    #[error("Advice service error: {0}")]
    Advice(String),
}
