//! AST builder: concrete node forest -> typed abstract tree.
//!
//! `set` statements are applied eagerly while building: inside an object
//! they write that object's environment, at top level the session-global
//! one. They produce no node.

use crate::ast::{
    AbstractNode, AtomNode, Env, ImportNode, ObjectNode, PropertyNode, VariableAccessNode,
};
use crate::cst::{ConcreteKind, ConcreteNode};
use crate::error::{CompileError, ErrorKind};
use crate::ids::{
    IdTable, ID_AFFECTOR, ID_COMPOSITOR, ID_EMITTER, ID_NONE, ID_PARTICLE_SYSTEM, ID_PASS,
    ID_TEXTURE_SOURCE, ID_TEXTURE_UNIT,
};

/// Chain of enclosing object class ids, innermost first.
struct Ancestors<'a> {
    class_id: u32,
    parent: Option<&'a Ancestors<'a>>,
}

impl<'a> Ancestors<'a> {
    fn any(&self, id: u32) -> bool {
        let mut cur = Some(self);
        while let Some(a) = cur {
            if a.class_id == id {
                return true;
            }
            cur = a.parent;
        }
        false
    }
}

/// Objects of some classes take no instance name when nested in certain
/// others; their first header word is an ordinary value instead.
fn is_name_excluded(class_id: u32, ancestors: Option<&Ancestors<'_>>) -> bool {
    let Some(ancestors) = ancestors else {
        return false;
    };
    match class_id {
        ID_EMITTER | ID_AFFECTOR => ancestors.any(ID_PARTICLE_SYSTEM),
        ID_PASS => ancestors.any(ID_COMPOSITOR),
        ID_TEXTURE_SOURCE => ancestors.any(ID_TEXTURE_UNIT),
        _ => false,
    }
}

enum Built {
    Node(AbstractNode),
    Assign(String, String),
}

pub struct Builder<'a> {
    ids: &'a IdTable,
    globals: &'a mut Env,
}

impl<'a> Builder<'a> {
    pub fn new(ids: &'a IdTable, globals: &'a mut Env) -> Self {
        Builder { ids, globals }
    }

    /// Build a whole file's forest.
    pub fn build(&mut self, nodes: &[ConcreteNode]) -> Result<Vec<AbstractNode>, CompileError> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match self.visit(node, None)? {
                Built::Node(n) => out.push(n),
                Built::Assign(name, value) => {
                    // The first global assignment of a name sticks.
                    self.globals.entry(name).or_insert(value);
                }
            }
        }
        tracing::debug!(nodes = out.len(), "built abstract tree");
        Ok(out)
    }

    fn visit(
        &self,
        node: &ConcreteNode,
        ancestors: Option<&Ancestors<'_>>,
    ) -> Result<Built, CompileError> {
        match node.kind {
            ConcreteKind::Import => {
                if ancestors.is_some() {
                    return Err(unexpected(node)
                        .with_detail("imports are only allowed at the top level"));
                }
                match node.children.as_slice() {
                    [target, source] => Ok(Built::Node(AbstractNode::Import(ImportNode {
                        file: node.file.clone(),
                        line: node.line,
                        target: target.text.clone(),
                        source: source.text.clone(),
                    }))),
                    _ => Err(error(ErrorKind::ImportTargetExpected, node)),
                }
            }
            ConcreteKind::VariableAssign => match node.children.as_slice() {
                [name, value] => Ok(Built::Assign(name.text.clone(), value.text.clone())),
                _ => Err(error(ErrorKind::VariableNameExpected, node)),
            },
            ConcreteKind::Variable if node.children.is_empty() => {
                Ok(Built::Node(variable_access(node)))
            }
            ConcreteKind::Word | ConcreteKind::Quote => {
                if node.has_body() {
                    self.build_object(node, ancestors)
                        .map(|o| Built::Node(AbstractNode::Object(o)))
                } else if !node.children.is_empty() {
                    self.build_property(node)
                        .map(|p| Built::Node(AbstractNode::Property(p)))
                } else {
                    Ok(Built::Node(self.atom(node)))
                }
            }
            _ => Err(unexpected(node)),
        }
    }

    fn build_object(
        &self,
        node: &ConcreteNode,
        ancestors: Option<&Ancestors<'_>>,
    ) -> Result<ObjectNode, CompileError> {
        // Header words are the node's own text followed by its leading
        // children; `abstract` is a prefix, not the class.
        let mut header: Vec<&ConcreteNode> = Vec::with_capacity(node.children.len() + 1);
        header.push(node);
        header.extend(node.children.iter());
        let mut rest = header.into_iter().peekable();

        let mut is_abstract = false;
        if node.text == "abstract" {
            is_abstract = true;
            rest.next();
        }
        let class = match rest.next() {
            Some(c) if c.is_text() => c,
            Some(c) => {
                return Err(error(ErrorKind::ObjectIdentifierExpected, c)
                    .with_detail("expected a class name after 'abstract'"))
            }
            None => return Err(error(ErrorKind::ObjectIdentifierExpected, node)),
        };

        let id = self.ids.id_of(&class.text);
        if id == ID_NONE {
            tracing::warn!(
                class = %class.text,
                file = %class.file,
                line = class.line,
                "unknown object class"
            );
        }

        let mut obj = ObjectNode {
            file: node.file.clone(),
            line: node.line,
            id,
            class_name: class.text.clone(),
            name: None,
            bases: Vec::new(),
            is_abstract,
            values: Vec::new(),
            children: Vec::new(),
            overrides: Vec::new(),
            env: Env::new(),
        };

        if let Some(first) = rest.peek() {
            if first.is_text() && !is_name_excluded(id, ancestors) {
                obj.name = Some(first.text.clone());
                rest.next();
            }
        }

        let scope = Ancestors {
            class_id: id,
            parent: ancestors,
        };
        for part in rest {
            match part.kind {
                ConcreteKind::Variable => obj.values.push(variable_access(part)),
                ConcreteKind::Word | ConcreteKind::Quote => obj.values.push(self.atom(part)),
                ConcreteKind::Colon => {
                    obj.bases
                        .extend(part.children.iter().map(|b| b.text.clone()));
                }
                ConcreteKind::LBrace => {
                    for child in &part.children {
                        match self.visit(child, Some(&scope))? {
                            Built::Node(n) => obj.children.push(n),
                            Built::Assign(name, value) => {
                                obj.env.insert(name, value);
                            }
                        }
                    }
                }
                ConcreteKind::RBrace => {}
                _ => return Err(unexpected(part)),
            }
        }
        Ok(obj)
    }

    fn build_property(&self, node: &ConcreteNode) -> Result<PropertyNode, CompileError> {
        let values = node
            .children
            .iter()
            .map(|c| self.value(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PropertyNode {
            file: node.file.clone(),
            line: node.line,
            id: self.ids.id_of(&node.text),
            name: node.text.clone(),
            values,
        })
    }

    fn value(&self, node: &ConcreteNode) -> Result<AbstractNode, CompileError> {
        match node.kind {
            ConcreteKind::Variable => Ok(variable_access(node)),
            ConcreteKind::Word | ConcreteKind::Quote => Ok(self.atom(node)),
            _ => Err(unexpected(node)),
        }
    }

    fn atom(&self, node: &ConcreteNode) -> AbstractNode {
        AbstractNode::Atom(AtomNode {
            file: node.file.clone(),
            line: node.line,
            id: self.ids.id_of(&node.text),
            value: node.text.clone(),
        })
    }
}

/// Build the leaves of a parsed variable value. Provenance is taken from
/// the reference being replaced.
pub fn build_fragment(
    nodes: &[ConcreteNode],
    ids: &IdTable,
    file: &str,
    line: u32,
) -> Vec<AbstractNode> {
    nodes
        .iter()
        .map(|n| match n.kind {
            ConcreteKind::Variable => AbstractNode::VariableAccess(VariableAccessNode {
                file: file.to_owned(),
                line,
                name: n.text.clone(),
            }),
            _ => AbstractNode::Atom(AtomNode {
                file: file.to_owned(),
                line,
                id: ids.id_of(&n.text),
                value: n.text.clone(),
            }),
        })
        .collect()
}

fn variable_access(node: &ConcreteNode) -> AbstractNode {
    AbstractNode::VariableAccess(VariableAccessNode {
        file: node.file.clone(),
        line: node.line,
        name: node.text.clone(),
    })
}

fn error(kind: ErrorKind, node: &ConcreteNode) -> CompileError {
    CompileError::new(kind, &node.text, &node.file, node.line)
}

fn unexpected(node: &ConcreteNode) -> CompileError {
    error(ErrorKind::UnexpectedToken, node)
}
