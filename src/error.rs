use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("camera error: {0}")]
    Camera(#[from] nokhwa::NokhwaError),

    #[error("camera {0} is not open")]
    DeviceClosed(u32),

    #[error("preview window error: {0}")]
    Preview(#[from] minifb::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CollectError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectError>;
