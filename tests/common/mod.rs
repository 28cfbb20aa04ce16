mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from screwhole for tests
pub use screwhole::{
    Circle, DebugImages, DiskSource, HoleDetector, HoleRecord, HoleStatus, ScanConfig, ScanError,
    ScanOutput,
};
