use std::ops::Range;

/// Bounds on the units sent in one provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimits {
    pub max_units: usize,
    pub max_chars: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            max_units: 60,
            max_chars: 4000,
        }
    }
}

/// Split `units` into consecutive ranges within `limits`
///
/// Ranges cover every unit exactly once, in order. A unit larger than the
/// character budget gets a range of its own rather than being split.
pub fn chunk_boundaries(units: &[String], limits: ChunkLimits) -> Vec<Range<usize>> {
    let max_units = limits.max_units.max(1);
    let mut boundaries = Vec::new();
    let mut start = 0;
    let mut chars = 0;

    for (index, unit) in units.iter().enumerate() {
        let len = unit.chars().count();
        let count = index - start;

        if count > 0 && (count >= max_units || chars + len > limits.max_chars) {
            boundaries.push(start..index);
            start = index;
            chars = 0;
        }
        chars += len;
    }

    if start < units.len() {
        boundaries.push(start..units.len());
    }

    boundaries
}
