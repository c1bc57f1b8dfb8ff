//! Cadence Scene
//!
//! The node table animations write into. Nodes form a tree; each carries a
//! [`Transform`] and, optionally, a bind pose, an animation buffer and the
//! mixer attached to its subgraph. [`Scene`] implements the animation seams
//! [`TransformTarget`](cadence_core::TransformTarget) and
//! [`AnimatedHierarchy`](cadence_animation::AnimatedHierarchy).

pub mod node;
pub mod scene;
pub mod transform;

pub use cadence_core::NodeHandle;
pub use node::Node;
pub use scene::Scene;
pub use transform::Transform;
