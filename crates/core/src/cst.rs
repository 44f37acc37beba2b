//! Concrete syntax tree: the untyped node forest produced by the parser and
//! consumed by the AST builder.
//!
//! An object header such as `pass P : Base { ... }` becomes one node whose
//! text is the first word and whose children are, in order, the remaining
//! header words, a `:` node owning the base names, the `{` node owning the
//! body, and a trailing `}` node.

use crate::lexer::{Brace, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcreteKind {
    Word,
    Quote,
    Variable,
    VariableAssign,
    Import,
    Colon,
    LBrace,
    RBrace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteNode {
    pub text: String,
    pub file: String,
    pub line: u32,
    pub kind: ConcreteKind,
    pub children: Vec<ConcreteNode>,
}

impl ConcreteNode {
    pub fn new(kind: ConcreteKind, text: impl Into<String>, file: &str, line: u32) -> Self {
        ConcreteNode {
            text: text.into(),
            file: file.to_owned(),
            line,
            kind,
            children: Vec::new(),
        }
    }

    /// Leaf node for a word, quote or variable token.
    pub fn leaf(token: &Token) -> Self {
        let kind = match token.kind {
            TokenKind::Quote => ConcreteKind::Quote,
            TokenKind::Variable => ConcreteKind::Variable,
            TokenKind::Colon => ConcreteKind::Colon,
            TokenKind::Brace(Brace::Open) => ConcreteKind::LBrace,
            TokenKind::Brace(Brace::Close) => ConcreteKind::RBrace,
            TokenKind::Word | TokenKind::Newline => ConcreteKind::Word,
        };
        ConcreteNode::new(kind, token.lexeme.clone(), &token.file, token.line)
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, ConcreteKind::Word | ConcreteKind::Quote)
    }

    /// True when the node ends in a `{ ... }` body, i.e. it is an object.
    pub fn has_body(&self) -> bool {
        let n = self.children.len();
        n >= 2
            && self.children[n - 1].kind == ConcreteKind::RBrace
            && self.children[n - 2].kind == ConcreteKind::LBrace
    }
}
