//! Typed abstract syntax tree.
//!
//! Produced by the builder, rewritten in place by the import, overlay and
//! variable passes, and handed to downstream consumers once resolved. Every
//! container owns its children outright; scope walks pass the enclosing
//! chain down the call stack instead of storing parent links.

use serde::Serialize;
use std::collections::BTreeMap;

/// Variable environment: `$name` -> unparsed value text.
pub type Env = BTreeMap<String, String>;

// ──────────────────────────────────────────────
// Node kinds
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbstractNode {
    Atom(AtomNode),
    Object(ObjectNode),
    Property(PropertyNode),
    Import(ImportNode),
    VariableAccess(VariableAccessNode),
}

/// A single value. `id` is the keyword id of `value`, 0 if it is not one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomNode {
    pub file: String,
    pub line: u32,
    pub id: u32,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectNode {
    pub file: String,
    pub line: u32,
    pub id: u32,
    pub class_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    #[serde(rename = "abstract", skip_serializing_if = "is_false")]
    pub is_abstract: bool,
    /// Header values between the name and the `:`/`{`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<AbstractNode>,
    pub children: Vec<AbstractNode>,
    /// Non-object members contributed by bases, moved to the front of
    /// `children` once the object is fully overlaid.
    #[serde(skip)]
    pub overrides: Vec<AbstractNode>,
    #[serde(skip)]
    pub env: Env,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyNode {
    pub file: String,
    pub line: u32,
    pub id: u32,
    pub name: String,
    pub values: Vec<AbstractNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportNode {
    pub file: String,
    pub line: u32,
    pub target: String,
    pub source: String,
}

/// `$name` reference; `name` keeps the `$`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableAccessNode {
    pub file: String,
    pub line: u32,
    pub name: String,
}

fn is_false(b: &bool) -> bool {
    !*b
}

// ──────────────────────────────────────────────
// Accessors
// ──────────────────────────────────────────────

impl AbstractNode {
    pub fn file(&self) -> &str {
        match self {
            AbstractNode::Atom(n) => &n.file,
            AbstractNode::Object(n) => &n.file,
            AbstractNode::Property(n) => &n.file,
            AbstractNode::Import(n) => &n.file,
            AbstractNode::VariableAccess(n) => &n.file,
        }
    }

    pub fn line(&self) -> u32 {
        match self {
            AbstractNode::Atom(n) => n.line,
            AbstractNode::Object(n) => n.line,
            AbstractNode::Property(n) => n.line,
            AbstractNode::Import(n) => n.line,
            AbstractNode::VariableAccess(n) => n.line,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            AbstractNode::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectNode> {
        match self {
            AbstractNode::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, AbstractNode::Object(_))
    }

    /// Copy for grafting into another tree: objects lose their `bases`
    /// and pending `overrides` at every depth so inheritance is never
    /// applied twice.
    pub fn detached(&self) -> AbstractNode {
        match self {
            AbstractNode::Object(o) => AbstractNode::Object(o.detached()),
            AbstractNode::Property(p) => AbstractNode::Property(PropertyNode {
                values: p.values.iter().map(AbstractNode::detached).collect(),
                ..p.clone()
            }),
            other => other.clone(),
        }
    }
}

impl ObjectNode {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for matching purposes; unnamed objects match as `""`.
    pub(crate) fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn detached(&self) -> ObjectNode {
        ObjectNode {
            file: self.file.clone(),
            line: self.line,
            id: self.id,
            class_name: self.class_name.clone(),
            name: self.name.clone(),
            bases: Vec::new(),
            is_abstract: self.is_abstract,
            values: self.values.iter().map(AbstractNode::detached).collect(),
            children: self.children.iter().map(AbstractNode::detached).collect(),
            overrides: Vec::new(),
            env: self.env.clone(),
        }
    }

    /// Child objects, in order.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectNode> {
        self.children.iter().filter_map(AbstractNode::as_object)
    }

    /// First child object of the given class and name.
    pub fn object(&self, class_name: &str, name: Option<&str>) -> Option<&ObjectNode> {
        self.objects()
            .find(|o| o.class_name == class_name && o.name() == name)
    }

    /// The effective value of a property. Inherited properties are placed
    /// ahead of the object's own, so when a name repeats the last one wins.
    pub fn property(&self, name: &str) -> Option<&PropertyNode> {
        self.children.iter().rev().find_map(|c| match c {
            AbstractNode::Property(p) if p.name == name => Some(p),
            _ => None,
        })
    }

    /// All properties with the given name, in order.
    pub fn properties<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a PropertyNode> + 'a {
        self.children.iter().filter_map(move |c| match c {
            AbstractNode::Property(p) if p.name == name => Some(p),
            _ => None,
        })
    }
}

impl PropertyNode {
    /// Atom texts of the values, in order. Unresolved variables are skipped.
    pub fn texts(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter_map(|v| match v {
                AbstractNode::Atom(a) => Some(a.value.as_str()),
                _ => None,
            })
            .collect()
    }
}
