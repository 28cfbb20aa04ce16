pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;

pub use config::ScanConfig;
pub use detection::{HoleDetector, ScanOutput, ScanSummary, process_image};
pub use detection::generators::CandidateGenerator;
pub use error::{PrimitiveError, ScanError, ScanResult};
pub use models::{Circle, DiskSource, HoleRecord, HoleStatus, ReferenceDisk};
pub use pipeline::DebugImages;
