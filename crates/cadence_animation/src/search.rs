//! Bounded key search.
//!
//! Keys are sorted by strictly ascending frame. A query returns the pair of
//! key indices bracketing a frame as a half-open interval
//! `key[from].frame <= frame < key[to].frame`. Frames before the first key
//! collapse to `(0, 0)`, frames at or past the last key collapse to
//! `(n - 1, n - 1)`. Fewer than two keys always yields `(0, 0)`.
//!
//! [`frame_bounds_cached`] exploits temporal coherence: playback normally
//! moves a few frames per tick, so the previous bracket (or its neighbour)
//! almost always still holds. Seeks, wraps and direction changes fall back
//! to the O(log n) search.

/// Anything carrying a key frame number.
pub trait Framed {
    fn frame(&self) -> u32;
}

impl Framed for u32 {
    #[inline]
    fn frame(&self) -> u32 {
        *self
    }
}

/// Indices of the two keys surrounding a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyBounds {
    pub from: usize,
    pub to: usize,
}

impl KeyBounds {
    #[inline]
    #[must_use]
    pub const fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// Both indices on the same key (boundary clamp).
    #[inline]
    #[must_use]
    pub const fn collapsed(index: usize) -> Self {
        Self {
            from: index,
            to: index,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_collapsed(&self) -> bool {
        self.from == self.to
    }
}

/// Index of the first key whose frame is not less than `target`, or
/// `keys.len()` if there is none.
#[inline]
pub fn lower_bound<T: Framed>(keys: &[T], target: u32) -> usize {
    keys.partition_point(|k| k.frame() < target)
}

/// Index of the first key whose frame is greater than `target`, or
/// `keys.len()` if there is none.
#[inline]
pub fn upper_bound<T: Framed>(keys: &[T], target: u32) -> usize {
    keys.partition_point(|k| k.frame() <= target)
}

/// Full O(log n) bracket search.
pub fn frame_bounds<T: Framed>(keys: &[T], frame: u32) -> KeyBounds {
    let len = keys.len();
    if len < 2 {
        return KeyBounds::default();
    }
    if frame < keys[0].frame() {
        return KeyBounds::collapsed(0);
    }

    // Last key at or before `frame`; non-zero because keys[0] <= frame.
    let from = upper_bound(keys, frame) - 1;
    if from >= len - 1 {
        KeyBounds::collapsed(len - 1)
    } else {
        KeyBounds::new(from, from + 1)
    }
}

/// Bracket search seeded with the result of the previous query.
///
/// Tests the cached bracket, then the neighbouring bracket in the playback
/// direction, then falls back to [`frame_bounds`]. The result is always
/// identical to what [`frame_bounds`] returns for the same frame.
pub fn frame_bounds_cached<T: Framed>(
    keys: &[T],
    frame: u32,
    playing_in_reverse: bool,
    last: KeyBounds,
) -> KeyBounds {
    let len = keys.len();
    if len < 2 {
        return KeyBounds::default();
    }

    // Hints from a different key set may be out of range; skip straight to
    // the full search for those.
    if last.from < len && last.to < len {
        if bracket_contains(keys, last, frame) {
            return last;
        }

        let adjacent = if playing_in_reverse {
            if last.from >= 1 {
                KeyBounds::new(last.from - 1, last.from)
            } else {
                KeyBounds::collapsed(0)
            }
        } else if last.to + 1 < len {
            KeyBounds::new(last.to, last.to + 1)
        } else {
            KeyBounds::collapsed(len - 1)
        };

        if bracket_contains(keys, adjacent, frame) {
            return adjacent;
        }
    }

    frame_bounds(keys, frame)
}

/// Whether `frame_bounds(keys, frame)` would return exactly `bounds`.
fn bracket_contains<T: Framed>(keys: &[T], bounds: KeyBounds, frame: u32) -> bool {
    let len = keys.len();
    let KeyBounds { from, to } = bounds;

    if from == to {
        (from == 0 && frame < keys[0].frame())
            || (from == len - 1 && frame >= keys[len - 1].frame())
    } else {
        to == from + 1
            && to < len
            && keys[from].frame() <= frame
            && frame < keys[to].frame()
    }
}
