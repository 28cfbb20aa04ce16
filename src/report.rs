use std::fmt::Write as _;

use serde::Serialize;

use crate::detection::{ScanOutput, ScanSummary};
use crate::models::{HoleRecord, ReferenceDisk};

/// Serializable view of a scan, without the image buffers
#[derive(Debug, Serialize)]
pub struct ScanReport<'a> {
    pub image: Option<&'a str>,
    pub disk: &'a ReferenceDisk,
    pub summary: ScanSummary,
    pub holes: &'a [HoleRecord],
}

impl<'a> ScanReport<'a> {
    pub fn new(output: &'a ScanOutput, image: Option<&'a str>) -> Self {
        Self {
            image,
            disk: &output.disk,
            summary: output.summary(),
            holes: &output.holes,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Plain text table, one line per hole
pub fn render_text(output: &ScanOutput) -> String {
    let mut text = String::new();
    let summary = output.summary();
    let d = output.disk.circle;

    let _ = writeln!(text, "=== Screw Hole Report ===");
    let _ = writeln!(
        text,
        "Reference disk: ({}, {}) r={} [{:?}]",
        d.x, d.y, d.radius, output.disk.source
    );
    let _ = writeln!(
        text,
        "Holes: {} ({} filled, {} empty)",
        summary.total, summary.filled, summary.empty
    );

    if output.holes.is_empty() {
        let _ = writeln!(text, "No holes detected.");
        return text;
    }

    let _ = writeln!(
        text,
        "\n{:>4}  {:>12}  {:>6}  {:<6}  {:>7}  {:>7}  {:>4}",
        "id", "position", "radius", "status", "mean", "std", "min"
    );
    for hole in &output.holes {
        let position = format!("({}, {})", hole.position.0, hole.position.1);
        let _ = writeln!(
            text,
            "{:>4}  {:>12}  {:>6}  {:<6}  {:>7.1}  {:>7.1}  {:>4}",
            hole.id,
            position,
            hole.radius,
            hole.status.to_string(),
            hole.mean_intensity,
            hole.std_dev,
            hole.min_value
        );
    }
    text
}
