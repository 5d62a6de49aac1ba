use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error(transparent)]
    Core(#[from] studyai_core::CoreError),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),
}
