use std::path::PathBuf;

/// Failure of a single vision primitive on a given frame.
#[derive(thiserror::Error, Debug)]
pub enum PrimitiveError {
    #[error("{operation}: frame is empty ({width}x{height})")]
    EmptyFrame {
        operation: &'static str,
        width: u32,
        height: u32,
    },
    #[error("{operation}: frame sizes differ ({left:?} vs {right:?})")]
    SizeMismatch {
        operation: &'static str,
        left: (u32, u32),
        right: (u32, u32),
    },
    #[error("template {template:?} does not fit in frame {frame:?}")]
    TemplateTooLarge { template: (u32, u32), frame: (u32, u32) },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Errors surfaced by `process_image`.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("image not found or unreadable: {}", path.display())]
    ImageNotFound {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("processing failed")]
    Processing(#[from] PrimitiveError),
    #[error("cannot read configuration {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration")]
    ConfigParse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("cannot write {}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type ScanResult<T> = Result<T, ScanError>;
