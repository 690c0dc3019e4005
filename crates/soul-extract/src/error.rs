use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("path escapes memory root: {0}")]
    PathEscape(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
