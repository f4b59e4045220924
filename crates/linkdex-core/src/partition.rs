//! Identifier-range partitioning.
//!
//! Splits the 128-bit link id space into contiguous half-open ranges so that
//! independent workers can each walk one range of the graph. Link ids are
//! random, so shards are balanced statistically rather than exactly.
//!
//! The all-ones UUID is the exclusive upper bound of the last range and so
//! belongs to no range. It is never produced by v4 generation, whose version
//! nibble is fixed to `4`.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A half-open id range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdRange {
    pub from: Uuid,
    pub to: Uuid,
}

impl IdRange {
    /// The range covering every generated id.
    #[must_use]
    pub fn full() -> Self {
        Self {
            from: Uuid::nil(),
            to: Uuid::from_u128(u128::MAX),
        }
    }

    /// Whether `from <= id < to`.
    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.from <= id && id < self.to
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.from, self.to)
    }
}

/// Width of every range but the last, which also absorbs the remainder.
fn range_width(parts: NonZeroU32) -> u128 {
    u128::MAX / u128::from(parts.get())
}

/// Split the id space into `parts` contiguous, disjoint ranges in ascending order.
#[must_use]
pub fn ranges(parts: NonZeroU32) -> Vec<IdRange> {
    let width = range_width(parts);
    let n = parts.get();

    (0..n)
        .map(|i| {
            let from = width * u128::from(i);
            let to = if i + 1 == n {
                u128::MAX
            } else {
                width * u128::from(i + 1)
            };
            IdRange {
                from: Uuid::from_u128(from),
                to: Uuid::from_u128(to),
            }
        })
        .collect()
}

/// Index of the range in `ranges(parts)` that owns `id`.
#[must_use]
pub fn range_for(id: Uuid, parts: NonZeroU32) -> u32 {
    let idx = id.as_u128() / range_width(parts);
    // The last range is wider by the remainder, so clamp into it.
    u32::try_from(idx).map_or(parts.get() - 1, |i| i.min(parts.get() - 1))
}
