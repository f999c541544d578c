//! Execution order: depth-first post-order over the dependency map.
//!
//! Every id appears after everything it requires and at most once. Ids
//! already in `visited` are skipped, so callers must pass a fresh set per
//! run. Cycles fail fast with the offending path.

use agentflow_core::{DependencyMap, GraphError};
use std::collections::HashSet;

/// Compute the execution order for `root` and its transitive requirements.
///
/// Ids that appear only as requirements (absent from `deps`) are treated as
/// leaves; the driver reports them as missing resources.
pub fn execution_order(
    deps: &DependencyMap,
    root: &str,
    visited: &mut HashSet<String>,
) -> Result<Vec<String>, GraphError> {
    let mut order = Vec::new();
    let mut stack = Vec::new();
    visit(deps, root, visited, &mut stack, &mut order)?;
    Ok(order)
}

fn visit(
    deps: &DependencyMap,
    node: &str,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
    order: &mut Vec<String>,
) -> Result<(), GraphError> {
    if let Some(pos) = stack.iter().position(|n| n == node) {
        let mut cycle = stack[pos..].to_vec();
        cycle.push(node.to_string());
        return Err(GraphError::Cycle { cycle });
    }
    if visited.contains(node) {
        return Ok(());
    }

    stack.push(node.to_string());
    if let Some(requires) = deps.get(node) {
        for dep in requires {
            visit(deps, dep, visited, stack, order)?;
        }
    }
    stack.pop();

    visited.insert(node.to_string());
    order.push(node.to_string());
    Ok(())
}
