//! JSON handoff of a resolved tree.
//!
//! The document is `{"kind": "ScriptTree", "source": ..., "nodes": [...]}`
//! where every node carries its own `kind` tag (`object`, `property`,
//! `atom`). Variable environments and inheritance bookkeeping are not
//! part of the output.

use crate::ast::AbstractNode;
use serde_json::{json, Value};

pub const TREE_KIND: &str = "ScriptTree";

pub fn to_json(source: &str, nodes: &[AbstractNode]) -> Value {
    json!({
        "kind": TREE_KIND,
        "source": source,
        "nodes": nodes,
    })
}

/// Pretty-printed document with a trailing newline.
pub fn to_json_string(source: &str, nodes: &[AbstractNode]) -> Result<String, serde_json::Error> {
    let mut s = serde_json::to_string_pretty(&to_json(source, nodes))?;
    s.push('\n');
    Ok(s)
}
