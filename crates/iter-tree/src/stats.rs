//! Per-iterator cost/size reporting (Statistics), the input the
//! [`crate::and::And`] operator and the shape-level optimizer use to pick a
//! primary child.

/// A possibly-approximate cardinality, mirroring
/// [`quad_store::StoreStats`]'s exact/approximate distinction at the
/// iterator level (`SizeEstimate`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimate {
    /// The estimated (or exact) cardinality. Negative means unknown;
    /// callers fall back to a store-wide estimate.
    pub value: i64,
    /// Whether `value` is exact.
    pub exact: bool,
}

impl SizeEstimate {
    /// An exact, known size.
    pub fn exact(value: u64) -> Self {
        SizeEstimate {
            value: value as i64,
            exact: true,
        }
    }

    /// An approximate size.
    pub fn approximate(value: u64) -> Self {
        SizeEstimate {
            value: value as i64,
            exact: false,
        }
    }

    /// An unknown size (negative, per).
    pub fn unknown() -> Self {
        SizeEstimate { value: -1, exact: false }
    }
}

/// Cost estimates an iterator reports about itself : how
/// expensive one `next` call and one `contains` probe are, in arbitrary
/// backend-relative units, plus its total size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Relative cost of one `contains` probe.
    pub contains_cost: u64,
    /// Relative cost of one `next` call.
    pub next_cost: u64,
    /// Total result cardinality.
    pub size: SizeEstimate,
}

impl Stats {
    /// `contains_cost / next_cost`, the ratio [`crate::and::And`] breaks
    /// primary-child ties with (prefer iterators with higher
    /// `contains_cost/next_cost` ratio). Guards against division by zero.
    pub fn contains_to_next_ratio(&self) -> f64 {
        if self.next_cost == 0 {
            f64::INFINITY
        } else {
            self.contains_cost as f64 / self.next_cost as f64
        }
    }

    /// `next_cost * size`, the key the optimizer ranks candidate primaries
    /// by (Optimizer picks primary by ascending Stats.next_cost
    /// × size).
    pub fn next_cost_times_size(&self) -> u64 {
        let size = if self.size.value < 0 { 0 } else { self.size.value as u64 };
        self.next_cost.saturating_mul(size.max(1))
    }
}
