//! Error Types
//!
//! Every failure in the animation core is local and recoverable: the
//! operation that failed leaves all prior state untouched and reports why.
//!
//! - Lookups by animation name fail with [`AnimationError::AnimationNotFound`].
//! - Construction failures (empty or mismatched key sets) are reported before
//!   anything is registered; [`RejectedController`] hands the controller back.
//! - Key set invariant violations (duplicate frames, inverted clip ranges)
//!   fail the single call.

use thiserror::Error;

use cadence_core::NodeHandle;

use crate::controller::{ControllerKind, KeyController};

/// The main error type for the animation core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// No animation set with this name exists in the mixer or buffer.
    #[error("Animation not found: {0}")]
    AnimationNotFound(String),

    /// A key set with zero keys cannot drive a controller.
    #[error("Key set contains no keys")]
    EmptyKeySet,

    /// The key set's key type cannot feed the requested controller kind.
    #[error("Key set is not compatible with {kind:?} controllers")]
    IncompatibleKeySet {
        /// Controller kind that was requested
        kind: ControllerKind,
    },

    /// Keys within one key set must have unique frame numbers.
    #[error("Duplicate key frame: {frame}")]
    DuplicateKeyFrame {
        /// The frame that already holds a key
        frame: u32,
    },

    /// A clip range whose end lies before its start.
    #[error("Invalid clip range: end frame {end} is before start frame {start}")]
    InvalidClipRange {
        /// Requested first frame
        start: u32,
        /// Requested last frame
        end: u32,
    },

    /// The scene graph has no node for this handle.
    #[error("Scene node not found: {0:?}")]
    NodeNotFound(NodeHandle),

    /// The controller manager does not track this mixer.
    #[error("Animation mixer not found")]
    MixerNotFound,
}

/// A controller that [`AnimationMixer::add_controller`] refused.
///
/// Ownership of the controller returns to the caller together with the
/// reason it was rejected.
///
/// [`AnimationMixer::add_controller`]: crate::mixer::AnimationMixer::add_controller
#[derive(Error, Debug)]
#[error("Controller rejected: {reason}")]
pub struct RejectedController {
    pub reason: AnimationError,
    pub controller: Box<KeyController>,
}

/// Alias for `std::result::Result<T, AnimationError>`.
pub type Result<T> = std::result::Result<T, AnimationError>;
