//! Gapped dynamic-programming aligners: X-drop extension from a seed
//! ([`extend`]) and banded affine-gap global alignment between two
//! anchored endpoints ([`banded`]).

pub mod banded;
pub mod extend;

/// Direction a DP sweep runs in, relative to increasing sequence index.
/// `Forward` walks indices upward from the anchor; `Backward` walks them
/// downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Sentinel for "invalid"/unreachable DP cells. Kept well clear of
/// `i32::MIN` so that repeated additions of gap penalties never overflow.
pub(crate) const NEG_INF: i32 = i32::MIN / 4;
