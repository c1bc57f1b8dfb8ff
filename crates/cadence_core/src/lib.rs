//! Cadence Core
//!
//! Foundational types shared by every Cadence crate:
//!
//! - [`NodeHandle`]: non-owning handle into the scene graph's node table
//! - [`TransformState`]: a local translation / rotation / scale triple
//! - [`TransformTarget`]: the seam through which animation output reaches nodes
//! - [`AnimationSettings`]: playback configuration (frame rate, wrap policies)

pub mod settings;
pub mod target;

pub use settings::{AnimationSettings, PlayOnceEnd};
pub use target::{TransformState, TransformTarget};

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a node in the scene graph.
    ///
    /// Animation controllers hold this as a back-reference to the node they
    /// drive. It never keeps the node alive.
    pub struct NodeHandle;
}
