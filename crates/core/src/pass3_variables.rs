//! Pass 3: variable expansion.
//!
//! Each `$name` reference is looked up in the environments of its enclosing
//! objects, innermost first, then in the session-global environment. The
//! value text is re-lexed as a fragment (words, quotes and further
//! references only) and spliced in place of the reference; references
//! inside the spliced text are expanded in the same scope.

use crate::ast::{AbstractNode, Env, ObjectNode, VariableAccessNode};
use crate::builder::build_fragment;
use crate::error::{CompileError, ErrorKind};
use crate::ids::IdTable;
use crate::{lexer, parser};

/// Enclosing object environments, innermost first.
struct Scope<'a> {
    env: &'a Env,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    fn lookup(&self, name: &str) -> Option<&'a str> {
        let mut cur = Some(self);
        while let Some(s) = cur {
            if let Some(v) = s.env.get(name) {
                return Some(v.as_str());
            }
            cur = s.parent;
        }
        None
    }
}

struct Resolver<'a> {
    ids: &'a IdTable,
    globals: &'a Env,
    /// Variables whose values are being expanded, outermost first.
    expanding: Vec<String>,
}

/// Expand every variable reference outside abstract objects. An undefined
/// or self-referencing variable aborts the file.
#[tracing::instrument(skip_all)]
pub fn process_variables(
    nodes: &mut Vec<AbstractNode>,
    ids: &IdTable,
    globals: &Env,
) -> Result<(), CompileError> {
    let mut resolver = Resolver {
        ids,
        globals,
        expanding: Vec::new(),
    };
    resolver.resolve_list(nodes, None)
}

impl<'a> Resolver<'a> {
    fn resolve_list(
        &mut self,
        list: &mut Vec<AbstractNode>,
        scope: Option<&Scope<'_>>,
    ) -> Result<(), CompileError> {
        let mut out = Vec::with_capacity(list.len());
        for node in std::mem::take(list) {
            match node {
                AbstractNode::Object(mut obj) => {
                    if !obj.is_abstract {
                        let ObjectNode {
                            env,
                            children,
                            values,
                            ..
                        } = &mut obj;
                        let inner = Scope {
                            env: &*env,
                            parent: scope,
                        };
                        self.resolve_list(values, Some(&inner))?;
                        self.resolve_list(children, Some(&inner))?;
                    }
                    out.push(AbstractNode::Object(obj));
                }
                AbstractNode::Property(mut prop) => {
                    self.resolve_list(&mut prop.values, scope)?;
                    out.push(AbstractNode::Property(prop));
                }
                AbstractNode::VariableAccess(var) => {
                    out.extend(self.expand(&var, scope)?);
                }
                other => out.push(other),
            }
        }
        *list = out;
        Ok(())
    }

    fn expand(
        &mut self,
        var: &VariableAccessNode,
        scope: Option<&Scope<'_>>,
    ) -> Result<Vec<AbstractNode>, CompileError> {
        let globals = self.globals;
        let value = scope
            .and_then(|s| s.lookup(&var.name))
            .or_else(|| globals.get(&var.name).map(String::as_str))
            .ok_or_else(|| {
                CompileError::new(ErrorKind::UndefinedVariable, &var.name, &var.file, var.line)
            })?;

        if self.expanding.contains(&var.name) {
            let mut chain = self.expanding.clone();
            chain.push(var.name.clone());
            return Err(CompileError::new(
                ErrorKind::RecursiveVariable,
                &var.name,
                &var.file,
                var.line,
            )
            .with_detail(chain.join(" -> ")));
        }

        // Value text has no location of its own; report at the reference.
        let at_reference = |e: CompileError| CompileError {
            line: var.line,
            ..e
        };
        let tokens = lexer::lex(value, &var.file).map_err(at_reference)?;
        let cst = parser::parse_fragment(tokens).map_err(at_reference)?;
        let mut nodes = build_fragment(&cst, self.ids, &var.file, var.line);

        self.expanding.push(var.name.clone());
        let nested = self.resolve_list(&mut nodes, scope);
        self.expanding.pop();
        nested?;

        tracing::debug!(variable = %var.name, nodes = nodes.len(), "expanded variable");
        Ok(nodes)
    }
}
