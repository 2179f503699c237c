//! Dependency extraction: what a node reads and what it defines.

use std::collections::BTreeSet;

use crate::node::MathNode;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Names the node needs from the scope. Never contains builtins or parameters.
    pub reads: BTreeSet<String>,
    pub defines: Option<String>,
}

/// Extract the dependencies of `node`, ignoring `builtins`.
pub fn extract(node: &dyn MathNode, builtins: &BTreeSet<String>) -> Dependencies {
    let kind = node.kind();
    let params = kind.params();
    let reads = node
        .symbols()
        .iter()
        .filter(|s| !builtins.contains(*s) && !params.contains(*s))
        .cloned()
        .collect();
    Dependencies {
        reads,
        defines: kind.name().map(str::to_string),
    }
}
