//! Per-run counters exposed for observability.

use log::{info, warn};

/// Counts of entities per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    /// Points.
    pub points: u64,
    /// Ways.
    pub ways: u64,
    /// Relations.
    pub relations: u64,
}

/// Summary of one filter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Distinct entities buffered from the input.
    pub input: KindCounts,
    /// Entities written downstream.
    pub emitted: KindCounts,
    /// Entities emitted only because a completion policy pulled them in.
    pub promoted: KindCounts,
    /// Way point references naming no input point.
    pub dangling_way_refs: u64,
    /// Relation members naming no input entity.
    pub dangling_relation_members: u64,
    /// Relation inclusion scans run before reaching the fixed point.
    pub cascade_scans: u32,
}

impl FilterReport {
    /// Total dangling references seen.
    #[must_use]
    pub const fn dangling_total(&self) -> u64 {
        self.dangling_way_refs + self.dangling_relation_members
    }

    /// Log the summary, warning about reference-integrity problems.
    pub fn log(&self) {
        if self.dangling_way_refs > 0 {
            warn!(
                "dropped {} way point references to points absent from the input",
                self.dangling_way_refs
            );
        }
        if self.dangling_relation_members > 0 {
            warn!(
                "dropped {} relation members referencing entities absent from the input",
                self.dangling_relation_members
            );
        }
        info!(
            "area filter kept {}/{} points, {}/{} ways, {}/{} relations ({} promoted points, {} relation scans)",
            self.emitted.points,
            self.input.points,
            self.emitted.ways,
            self.input.ways,
            self.emitted.relations,
            self.input.relations,
            self.promoted.points,
            self.cascade_scans
        );
    }
}
