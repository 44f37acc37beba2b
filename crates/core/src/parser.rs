/// Concrete parser: tokens -> untyped node forest.
/// Nodes carry provenance (file, line of their first token). Statements are
/// not classified here beyond `import`, `set` and brace structure; telling
/// objects from properties is the AST builder's job.
use crate::cst::{ConcreteKind, ConcreteNode};
use crate::error::{CompileError, ErrorKind};
use crate::lexer::{Brace, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting a statement.
    Ready,
    /// After a statement's leading word, collecting header words, an
    /// optional `: base...` clause and possibly a `{`.
    ObjectHeader,
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    roots: Vec<ConcreteNode>,
    /// Nodes still receiving children, innermost last. A node is attached
    /// to its parent when it is popped.
    open: Vec<ConcreteNode>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            roots: Vec::new(),
            open: Vec::new(),
        }
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn at(&self, pos: usize) -> Option<&Token> {
        self.tokens.get(pos)
    }

    /// Position of the first non-newline token at or after `pos`.
    fn skip_newlines(&self, mut pos: usize) -> usize {
        while self.at(pos).is_some_and(Token::is_newline) {
            pos += 1;
        }
        pos
    }

    fn attach(&mut self, node: ConcreteNode) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    /// Pop the innermost open node into its parent.
    fn close(&mut self) {
        if let Some(node) = self.open.pop() {
            self.attach(node);
        }
    }

    fn top_kind(&self) -> Option<ConcreteKind> {
        self.open.last().map(|n| n.kind)
    }

    fn unexpected(&self, token: &Token) -> CompileError {
        CompileError::new(ErrorKind::UnexpectedToken, &token.lexeme, &token.file, token.line)
    }

    fn run(mut self) -> Result<Vec<ConcreteNode>, CompileError> {
        let mut state = State::Ready;

        while self.pos < self.tokens.len() {
            let token = self.cur().clone();
            match state {
                State::Ready => match token.kind {
                    TokenKind::Newline => {}
                    TokenKind::Word if token.lexeme == "import" => {
                        let node = self.parse_import(&token)?;
                        self.attach(node);
                    }
                    TokenKind::Word if token.lexeme == "set" => {
                        let node = self.parse_set(&token)?;
                        self.attach(node);
                    }
                    TokenKind::Word | TokenKind::Variable => {
                        self.open.push(ConcreteNode::leaf(&token));
                        state = State::ObjectHeader;
                    }
                    TokenKind::Brace(Brace::Close) => {
                        // Only an object body can be closed from here.
                        if self.top_kind() != Some(ConcreteKind::LBrace) {
                            return Err(self.unexpected(&token));
                        }
                        self.close_body(&token);
                    }
                    _ => return Err(self.unexpected(&token)),
                },
                State::ObjectHeader => match token.kind {
                    TokenKind::Newline => {
                        // A header continues only if a `{` follows, possibly
                        // on a later line. Otherwise this was a property.
                        let next = self.skip_newlines(self.pos + 1);
                        let opens_body = self
                            .at(next)
                            .is_some_and(|t| t.kind == TokenKind::Brace(Brace::Open));
                        if !opens_body {
                            self.close();
                            state = State::Ready;
                        }
                    }
                    TokenKind::Colon => {
                        let node = self.parse_bases(&token)?;
                        self.attach(node);
                    }
                    TokenKind::Brace(Brace::Open) => {
                        self.open.push(ConcreteNode::leaf(&token));
                        state = State::Ready;
                    }
                    TokenKind::Brace(Brace::Close) => {
                        // `}` right after a one-line property: end the
                        // property, then the enclosing body.
                        self.close();
                        if self.top_kind() != Some(ConcreteKind::LBrace) {
                            return Err(self.unexpected(&token));
                        }
                        self.close_body(&token);
                        state = State::Ready;
                    }
                    TokenKind::Word | TokenKind::Quote | TokenKind::Variable => {
                        self.attach(ConcreteNode::leaf(&token));
                    }
                },
            }
            self.pos += 1;
        }

        if state == State::ObjectHeader {
            self.close();
        }
        if let Some(unclosed) = self.open.iter().rev().find(|n| n.kind == ConcreteKind::LBrace) {
            return Err(CompileError::new(
                ErrorKind::UnexpectedToken,
                "{",
                &unclosed.file,
                unclosed.line,
            )
            .with_detail("missing closing '}'"));
        }
        while !self.open.is_empty() {
            self.close();
        }
        Ok(self.roots)
    }

    /// Close a `{ ... }` body: the `{` goes into its header, the header gets
    /// the trailing `}`, and the header itself is closed.
    fn close_body(&mut self, rbrace: &Token) {
        self.close();
        self.attach(ConcreteNode::leaf(rbrace));
        self.close();
    }

    /// `: base1 base2 ...` -- at least one base name is required. Leaves
    /// `pos` on the last base token.
    fn parse_bases(&mut self, colon: &Token) -> Result<ConcreteNode, CompileError> {
        let mut node = ConcreteNode::leaf(colon);
        let mut j = self.skip_newlines(self.pos + 1);
        if !self.at(j).is_some_and(Token::is_text) {
            return Err(CompileError::new(
                ErrorKind::ObjectIdentifierExpected,
                &colon.lexeme,
                &colon.file,
                colon.line,
            )
            .with_detail("expected at least one base object after ':'"));
        }
        while let Some(t) = self.at(j).filter(|t| t.is_text()) {
            node.children.push(ConcreteNode::leaf(t));
            j += 1;
        }
        self.pos = j - 1;
        Ok(node)
    }

    /// `import <target> from <source>`
    fn parse_import(&mut self, kw: &Token) -> Result<ConcreteNode, CompileError> {
        let mut node = ConcreteNode::new(ConcreteKind::Import, &kw.lexeme, &kw.file, kw.line);

        let target = match self.at(self.pos + 1) {
            Some(t) if t.is_text() => ConcreteNode::leaf(t),
            _ => {
                return Err(CompileError::new(
                    ErrorKind::ImportTargetExpected,
                    &kw.lexeme,
                    &kw.file,
                    kw.line,
                ))
            }
        };
        match self.at(self.pos + 2) {
            Some(t) if t.kind == TokenKind::Word && t.lexeme == "from" => {}
            _ => {
                return Err(CompileError::new(
                    ErrorKind::ImportSourceExpected,
                    &kw.lexeme,
                    &kw.file,
                    kw.line,
                )
                .with_detail("expected 'from'"))
            }
        }
        let source = match self.at(self.pos + 3) {
            Some(t) if t.is_text() => ConcreteNode::leaf(t),
            _ => {
                return Err(CompileError::new(
                    ErrorKind::ImportSourceExpected,
                    &kw.lexeme,
                    &kw.file,
                    kw.line,
                ))
            }
        };
        node.children.push(target);
        node.children.push(source);
        self.pos += 3;
        self.expect_statement_end(kw)?;
        Ok(node)
    }

    /// `set $name <value>`
    fn parse_set(&mut self, kw: &Token) -> Result<ConcreteNode, CompileError> {
        let mut node =
            ConcreteNode::new(ConcreteKind::VariableAssign, &kw.lexeme, &kw.file, kw.line);

        let name = match self.at(self.pos + 1) {
            Some(t) if t.kind == TokenKind::Variable => ConcreteNode::leaf(t),
            _ => {
                return Err(CompileError::new(
                    ErrorKind::VariableNameExpected,
                    &kw.lexeme,
                    &kw.file,
                    kw.line,
                ))
            }
        };
        let value = match self.at(self.pos + 2) {
            Some(t) if t.is_text() => ConcreteNode::leaf(t),
            _ => {
                return Err(CompileError::new(
                    ErrorKind::VariableValueExpected,
                    &kw.lexeme,
                    &kw.file,
                    kw.line,
                )
                .with_detail(format!("no value given for {}", name.text)))
            }
        };
        node.children.push(name);
        node.children.push(value);
        self.pos += 2;
        self.expect_statement_end(kw)?;
        Ok(node)
    }

    /// After an `import`/`set` statement only a newline, a closing brace or
    /// the end of input may follow on the same line.
    fn expect_statement_end(&self, kw: &Token) -> Result<(), CompileError> {
        match self.at(self.pos + 1) {
            None => Ok(()),
            Some(t) if t.is_newline() || t.kind == TokenKind::Brace(Brace::Close) => Ok(()),
            Some(t) => Err(CompileError::new(
                ErrorKind::FewerParametersExpected,
                &kw.lexeme,
                &t.file,
                t.line,
            )
            .with_detail(format!("unexpected '{}' after '{}' statement", t.lexeme, kw.lexeme))),
        }
    }
}

/// Parse a full script into a concrete node forest.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<ConcreteNode>, CompileError> {
    let nodes = Parser::new(tokens).run()?;
    tracing::debug!(nodes = nodes.len(), "parsed concrete tree");
    Ok(nodes)
}

/// Parse a variable value: bare words, quoted strings and variable
/// references only. Newlines are ignored; anything else is an error.
pub fn parse_fragment(tokens: Vec<Token>) -> Result<Vec<ConcreteNode>, CompileError> {
    let mut nodes = Vec::with_capacity(tokens.len());
    for token in &tokens {
        match token.kind {
            TokenKind::Newline => {}
            TokenKind::Word | TokenKind::Quote | TokenKind::Variable => {
                nodes.push(ConcreteNode::leaf(token));
            }
            TokenKind::Brace(_) | TokenKind::Colon => {
                return Err(CompileError::new(
                    ErrorKind::UnexpectedToken,
                    &token.lexeme,
                    &token.file,
                    token.line,
                )
                .with_detail("variable values cannot contain object syntax"));
            }
        }
    }
    Ok(nodes)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
