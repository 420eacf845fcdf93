//! Blast-beat interval merging
//!
//! Walks labeled windows in track order and reports runs of qualifying
//! windows. The threshold is checked before the current window is looked at,
//! so a run reaching `min_consecutive_hits` is emitted on the following
//! window and the count restarts there. A long run therefore produces one
//! interval per `min_consecutive_hits` windows instead of a single interval.

use crate::labeler::LabeledSection;

/// Detected blast-beat section `[start_index, end_index)` in samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlastBeatInterval {
    pub start_index: usize,
    pub end_index: usize,
}

impl BlastBeatInterval {
    pub fn new(start_index: usize, end_index: usize) -> Self {
        Self {
            start_index,
            end_index,
        }
    }

    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.end_index <= self.start_index
    }
}

/// Merge ordered sections into blast-beat intervals
///
/// A run still below `min_consecutive_hits` when the sections end is dropped.
pub fn merge_blast_beats(
    sections: &[LabeledSection],
    min_consecutive_hits: usize,
) -> Vec<BlastBeatInterval> {
    let mut intervals = Vec::new();
    let mut hits = 0usize;
    let mut run_start = 0usize;

    for (i, section) in sections.iter().enumerate() {
        if hits >= min_consecutive_hits {
            intervals.push(BlastBeatInterval::new(
                sections[run_start].start_index,
                section.start_index,
            ));
            hits = 0;
        }

        if section.qualifies() {
            if hits == 0 {
                run_start = i;
            }
            hits += 1;
        } else {
            hits = 0;
        }
    }

    intervals
}
