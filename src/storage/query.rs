//! Query/range planner.
//!
//! Translates the logical listing options (`startKey`, `endKey`, `prefix`,
//! `limit`) into a concrete ordered key range with a bounded result count.

use std::ops::Bound;

/// Results returned by a `list` when no limit is given.
pub const DEFAULT_LIMIT: usize = 1000;
/// Hard cap on any single scan; larger requests are clamped.
pub const MAX_LIMIT: usize = 10_000;

/// Logical listing options as supplied by a caller.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Inclusive lower bound.
    pub start_key: Option<String>,
    /// Exclusive upper bound.
    pub end_key: Option<String>,
    /// When present, takes precedence over `start_key`/`end_key`.
    pub prefix: Option<String>,
    /// Maximum number of results; defaults to [`DEFAULT_LIMIT`].
    pub limit: Option<usize>,
}

/// Concrete scan plan: bounds plus an enforced limit.
#[derive(Debug, Clone)]
pub(crate) struct KeyRange {
    pub lower: Bound<String>,
    pub upper: Bound<String>,
    pub limit: usize,
}

impl KeyRange {
    pub(crate) fn lower_ref(&self) -> Bound<&str> {
        bound_as_str(&self.lower)
    }

    pub(crate) fn upper_ref(&self) -> Bound<&str> {
        bound_as_str(&self.upper)
    }
}

fn bound_as_str(b: &Bound<String>) -> Bound<&str> {
    match b {
        Bound::Included(s) => Bound::Included(s.as_str()),
        Bound::Excluded(s) => Bound::Excluded(s.as_str()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

/// Computes the exclusive upper bound for a prefix scan by incrementing the
/// prefix's last character, so `[prefix, upper)` covers exactly the keys
/// beginning with `prefix` under lexicographic ordering.
///
/// Returns `None` when no finite upper bound exists: the prefix is empty, or
/// its last character has no valid successor code point (`char::MAX`, or the
/// edge of the surrogate gap). Callers treat `None` as "scan to the end of
/// the namespace", which over-approximates only in those degenerate cases.
pub fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let last = prefix.chars().next_back()?;
    let next = char::from_u32(last as u32 + 1)?;
    let mut upper: String = prefix.chars().collect();
    upper.pop();
    upper.push(next);
    Some(upper)
}

impl ScanOptions {
    /// Resolves the logical options into a concrete plan.
    pub(crate) fn plan(&self) -> KeyRange {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

        if let Some(prefix) = self.prefix.as_deref() {
            let upper = match prefix_upper_bound(prefix) {
                Some(u) => Bound::Excluded(u),
                None => Bound::Unbounded,
            };
            return KeyRange {
                lower: Bound::Included(prefix.to_string()),
                upper,
                limit,
            };
        }

        KeyRange {
            lower: self
                .start_key
                .clone()
                .map_or(Bound::Unbounded, Bound::Included),
            upper: self
                .end_key
                .clone()
                .map_or(Bound::Unbounded, Bound::Excluded),
            limit,
        }
    }
}
