/// A named frame range of a longer recording, e.g. "walk" = frames 0..=30
/// of a motion-capture take.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationClip {
    pub name: String,
    pub start: u32,
    pub end: u32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    /// Number of frames covered, or `None` for an inverted range.
    #[must_use]
    pub fn frame_count(&self) -> Option<u32> {
        self.end.checked_sub(self.start).map(|d| d + 1)
    }
}
