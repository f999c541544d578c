//! # agentflow resolver
//!
//! The request-driven engine behind every route:
//!
//! 1. Stage a per-request copy of the project and its signal files
//! 2. Load the resource catalog and compute the execution order
//! 3. Inject imports into each definition, then evaluate it with the renderer
//! 4. Negotiate the response format from flag files and render the response
//!
//! Completion is observed only through the filesystem; see [`watcher`].

pub mod catalog;
pub mod context;
pub mod definition;
pub mod descriptor;
pub mod driver;
pub mod graph;
pub mod imports;
pub mod negotiate;
pub mod pipeline;
pub mod records;
pub mod watcher;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use catalog::Catalog;
pub use context::{RequestContext, RouteTemplate};
pub use descriptor::{RequestDescriptor, ResponseDescriptor};
pub use driver::{Engine, RunReport, plan};
pub use graph::execution_order;
pub use imports::ImportInjector;
pub use negotiate::{Negotiated, ResponseNegotiator, detect_format};
pub use pipeline::{ResolvedResponse, Resolver};
pub use watcher::{WaitOptions, poll_until, wait_for_file, wait_for_timestamp_change};
