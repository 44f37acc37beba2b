use crate::error::{CompileError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brace {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Brace(Brace),
    Colon,
    /// `$name`, lexeme keeps the leading `$`
    Variable,
    Word,
    /// Quoted string, lexeme is the content without quotes and with `\"` resolved
    Quote,
    Newline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub lexeme: String,
    pub file: String,
    pub line: u32,
    pub kind: TokenKind,
}

impl Token {
    pub fn is_newline(&self) -> bool {
        self.kind == TokenKind::Newline
    }

    /// Word or quoted string: the token kinds that can name things.
    pub fn is_text(&self) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::Quote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    LineComment,
    BlockComment,
    Word,
    Quote,
    Variable,
    PossibleCommentStart,
}

fn is_newline(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn is_whitespace(c: char) -> bool {
    !is_newline(c) && c.is_whitespace()
}

fn is_punct(c: char) -> bool {
    c == '{' || c == '}' || c == ':'
}

struct Lexer<'a> {
    file: &'a str,
    tokens: Vec<Token>,
    lexeme: String,
    lexeme_line: u32,
}

impl<'a> Lexer<'a> {
    fn push(&mut self, kind: TokenKind, lexeme: String, line: u32) {
        if kind == TokenKind::Newline
            && self.tokens.last().is_some_and(|t| t.kind == TokenKind::Newline)
        {
            return;
        }
        self.tokens.push(Token {
            lexeme,
            file: self.file.to_owned(),
            line,
            kind,
        });
    }

    fn start(&mut self, c: char, line: u32) {
        self.lexeme.clear();
        self.lexeme.push(c);
        self.lexeme_line = line;
    }

    /// Emit the in-progress word or variable.
    fn flush(&mut self, state: State) {
        if self.lexeme.is_empty() {
            return;
        }
        let lexeme = std::mem::take(&mut self.lexeme);
        // A lone `$` is an ordinary word.
        let kind = if state == State::Variable && lexeme.len() > 1 {
            TokenKind::Variable
        } else {
            TokenKind::Word
        };
        self.push(kind, lexeme, self.lexeme_line);
    }

    fn punct(&mut self, c: char, line: u32) {
        let kind = match c {
            '{' => TokenKind::Brace(Brace::Open),
            '}' => TokenKind::Brace(Brace::Close),
            _ => TokenKind::Colon,
        };
        self.push(kind, c.to_string(), line);
    }
}

/// Tokenize a script. `file` is the logical source name used in diagnostics.
///
/// Comments are dropped, runs of newlines collapse into one `Newline`
/// token, and `{`, `}` and `:` are always single-character tokens. The
/// only lexical error is a quote left open at end of input, reported at
/// the line of the opening quote.
pub fn lex(src: &str, file: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = src.chars().collect();
    let mut lx = Lexer {
        file,
        tokens: Vec::new(),
        lexeme: String::new(),
        lexeme_line: 1,
    };
    let mut state = State::Ready;
    let mut line: u32 = 1;
    let mut quote_line: u32 = 1;
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];
        let next = chars.get(pos + 1).copied();
        let mut consumed = 1;

        match state {
            State::Ready => {
                if c == '"' {
                    lx.lexeme.clear();
                    lx.lexeme_line = line;
                    quote_line = line;
                    state = State::Quote;
                } else if c == '$' {
                    lx.start(c, line);
                    state = State::Variable;
                } else if is_newline(c) {
                    lx.push(TokenKind::Newline, c.to_string(), line);
                } else if is_punct(c) {
                    lx.punct(c, line);
                } else if c == '/' {
                    lx.start(c, line);
                    state = State::PossibleCommentStart;
                } else if !is_whitespace(c) {
                    lx.start(c, line);
                    state = State::Word;
                }
            }
            State::LineComment => {
                if is_newline(c) {
                    lx.push(TokenKind::Newline, c.to_string(), line);
                    state = State::Ready;
                }
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    consumed = 2;
                    state = State::Ready;
                }
            }
            State::PossibleCommentStart => match c {
                '/' => {
                    lx.lexeme.clear();
                    state = State::LineComment;
                }
                '*' => {
                    lx.lexeme.clear();
                    state = State::BlockComment;
                }
                _ => {
                    // Not a comment after all: the `/` starts a word and
                    // `c` is handled as a word character.
                    state = State::Word;
                    continue;
                }
            },
            State::Word | State::Variable => {
                if is_newline(c) {
                    lx.flush(state);
                    lx.push(TokenKind::Newline, c.to_string(), line);
                    state = State::Ready;
                } else if is_whitespace(c) {
                    lx.flush(state);
                    state = State::Ready;
                } else if is_punct(c) {
                    lx.flush(state);
                    lx.punct(c, line);
                    state = State::Ready;
                } else if c == '/' && next == Some('/') {
                    lx.flush(state);
                    consumed = 2;
                    state = State::LineComment;
                } else if c == '/' && next == Some('*') {
                    lx.flush(state);
                    consumed = 2;
                    state = State::BlockComment;
                } else {
                    lx.lexeme.push(c);
                }
            }
            State::Quote => {
                if c == '\\' {
                    match next {
                        Some('"') => lx.lexeme.push('"'),
                        Some(other) => {
                            lx.lexeme.push('\\');
                            lx.lexeme.push(other);
                        }
                        None => lx.lexeme.push('\\'),
                    }
                    consumed = 2;
                } else if c == '"' {
                    let lexeme = std::mem::take(&mut lx.lexeme);
                    lx.push(TokenKind::Quote, lexeme, lx.lexeme_line);
                    state = State::Ready;
                } else {
                    lx.lexeme.push(c);
                }
            }
        }

        // Line tracking looks at every consumed character; CRLF counts once.
        for k in pos..(pos + consumed).min(chars.len()) {
            let ch = chars[k];
            let prev = if k > 0 { Some(chars[k - 1]) } else { None };
            if ch == '\r' || (ch == '\n' && prev != Some('\r')) {
                line += 1;
            }
        }
        pos += consumed;
    }

    match state {
        State::Word | State::Variable | State::PossibleCommentStart => lx.flush(state),
        State::Quote => {
            return Err(CompileError::new(ErrorKind::UnterminatedQuote, "\"", file, quote_line)
                .with_detail(format!("quote opened at {}:{} is never closed", file, quote_line)));
        }
        _ => {}
    }

    tracing::debug!(file, tokens = lx.tokens.len(), "tokenized");
    Ok(lx.tokens)
}
