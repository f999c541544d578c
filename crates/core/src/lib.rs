//! # agentflow core
//!
//! Domain types, the renderer seam, and error definitions shared by every
//! agentflow crate. Nothing in here touches the network or spawns processes;
//! the resolver and gateway crates implement against these types.
//!
//! ## Design Philosophy
//!
//! The renderer that evaluates resource definitions is an external program.
//! It is modelled as a trait here so the resolver can be driven by the real
//! subprocess implementation in production and by scripted fakes in tests.

pub mod error;
pub mod format;
pub mod renderer;
pub mod resource;

// Re-export key types at crate root for ergonomics
pub use error::{
    CatalogError, Error, GraphError, NegotiationError, RenderError, Result, WaitError,
};
pub use format::ResponseFormat;
pub use renderer::{RenderOutput, Renderer};
pub use resource::{ActionKind, DependencyMap, ResourceEntry};
