use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::{CandidateSet, Circle, ReferenceDisk};

/// How candidates that describe the same hole are collapsed.
///
/// Exact `(x, y, radius)` duplicates are always removed. The policy decides
/// what happens to candidates that differ by a few pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Only exact duplicates are removed
    Exact,
    /// Drop a candidate whose center is closer than `center_distance` to an
    /// earlier one and whose radius differs by less than `radius_delta`
    Within { center_distance: f32, radius_delta: i32 },
    /// Drop a candidate whose center is closer to an earlier one than the
    /// smaller of the two radii
    #[default]
    Overlapping,
}

impl DuplicatePolicy {
    fn is_duplicate(&self, kept: &Circle, candidate: &Circle) -> bool {
        match *self {
            DuplicatePolicy::Exact => kept == candidate,
            DuplicatePolicy::Within {
                center_distance,
                radius_delta,
            } => {
                kept.center_distance(candidate) < center_distance
                    && (kept.radius - candidate.radius).abs() < radius_delta
            }
            DuplicatePolicy::Overlapping => {
                kept.center_distance(candidate) < kept.radius.min(candidate.radius) as f32
            }
        }
    }
}

/// Merge generator outputs into one candidate list.
///
/// Order is first-seen across `sets` in the order given. Candidates whose
/// center is not strictly inside the reference disk are dropped.
pub fn fuse(sets: &[CandidateSet], disk: &ReferenceDisk, policy: DuplicatePolicy) -> Vec<Circle> {
    let mut seen = HashSet::new();
    let unique: Vec<Circle> = sets
        .iter()
        .flatten()
        .filter(|c| seen.insert(**c))
        .copied()
        .collect();
    let total = unique.len();

    let inside: Vec<Circle> = unique.into_iter().filter(|c| disk.contains(c.x, c.y)).collect();
    let inside_count = inside.len();

    let mut fused: Vec<Circle> = Vec::with_capacity(inside.len());
    for candidate in inside {
        if !fused.iter().any(|kept| policy.is_duplicate(kept, &candidate)) {
            fused.push(candidate);
        }
    }

    debug!(
        "fusion: {} unique, {} inside disk, {} after {:?} merge",
        total,
        inside_count,
        fused.len(),
        policy
    );
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiskSource;

    fn disk() -> ReferenceDisk {
        ReferenceDisk {
            circle: Circle::new(100, 100, 80),
            source: DiskSource::Hough { threshold: 30 },
        }
    }

    #[test]
    fn test_exact_duplicates_collapse() {
        let sets = vec![vec![Circle::new(50, 50, 8)], vec![Circle::new(50, 50, 8)]];
        let fused = fuse(&sets, &disk(), DuplicatePolicy::Exact);
        assert_eq!(fused, vec![Circle::new(50, 50, 8)]);
    }

    #[test]
    fn test_first_seen_order_is_kept() {
        let sets = vec![
            vec![Circle::new(60, 60, 8), Circle::new(140, 100, 9)],
            vec![Circle::new(100, 130, 7), Circle::new(60, 60, 8)],
        ];
        let fused = fuse(&sets, &disk(), DuplicatePolicy::Exact);
        assert_eq!(
            fused,
            vec![Circle::new(60, 60, 8), Circle::new(140, 100, 9), Circle::new(100, 130, 7)]
        );
    }

    #[test]
    fn test_outside_disk_removed() {
        // (180, 100) sits exactly on the boundary and is excluded
        let sets = vec![vec![
            Circle::new(10, 10, 8),
            Circle::new(180, 100, 8),
            Circle::new(179, 100, 8),
        ]];
        let fused = fuse(&sets, &disk(), DuplicatePolicy::Exact);
        assert_eq!(fused, vec![Circle::new(179, 100, 8)]);
    }

    #[test]
    fn test_exact_keeps_near_duplicates() {
        let sets = vec![vec![Circle::new(80, 80, 8)], vec![Circle::new(81, 80, 8)]];
        assert_eq!(fuse(&sets, &disk(), DuplicatePolicy::Exact).len(), 2);
    }

    #[test]
    fn test_within_merges_close_matches() {
        let policy = DuplicatePolicy::Within {
            center_distance: 3.0,
            radius_delta: 2,
        };
        let sets = vec![
            vec![Circle::new(80, 80, 8)],
            vec![Circle::new(81, 81, 9), Circle::new(80, 80, 12), Circle::new(90, 80, 8)],
        ];
        let fused = fuse(&sets, &disk(), policy);
        assert_eq!(
            fused,
            vec![Circle::new(80, 80, 8), Circle::new(80, 80, 12), Circle::new(90, 80, 8)]
        );
    }

    #[test]
    fn test_overlapping_keeps_first_seen() {
        let sets = vec![
            vec![Circle::new(80, 80, 8), Circle::new(120, 120, 6)],
            vec![Circle::new(84, 82, 10), Circle::new(120, 127, 9)],
        ];
        let fused = fuse(&sets, &disk(), DuplicatePolicy::Overlapping);
        assert_eq!(
            fused,
            vec![Circle::new(80, 80, 8), Circle::new(120, 120, 6), Circle::new(120, 127, 9)]
        );
    }

    #[test]
    fn test_policy_from_json() {
        let policy: DuplicatePolicy = serde_json::from_str(r#"{ "kind": "exact" }"#).unwrap();
        assert_eq!(policy, DuplicatePolicy::Exact);
        let policy: DuplicatePolicy =
            serde_json::from_str(r#"{ "kind": "within", "center_distance": 3.0, "radius_delta": 2 }"#)
                .unwrap();
        assert_eq!(
            policy,
            DuplicatePolicy::Within {
                center_distance: 3.0,
                radius_delta: 2
            }
        );
        assert_eq!(DuplicatePolicy::default(), DuplicatePolicy::Overlapping);
    }
}
