use thiserror::Error;

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read tile z={zoom} x={x} y={y}: {reason}")]
    TileRead {
        zoom: u32,
        x: u32,
        y: u32,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StitchResult<T> = Result<T, StitchError>;

impl StitchError {
    pub fn invalid(message: impl Into<String>) -> Self {
        StitchError::InvalidArgument(message.into())
    }

    pub fn tile_read(zoom: u32, x: u32, y: u32, reason: impl ToString) -> Self {
        StitchError::TileRead {
            zoom,
            x,
            y,
            reason: reason.to_string(),
        }
    }
}
