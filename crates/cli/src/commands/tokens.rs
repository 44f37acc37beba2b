use std::fs;
use std::path::Path;
use std::process;

use mscript_core::lexer::{Brace, Token, TokenKind};
use serde_json::json;

use crate::{report_diagnostic, report_error, OutputFormat};

fn kind_label(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Brace(Brace::Open) => "lbrace",
        TokenKind::Brace(Brace::Close) => "rbrace",
        TokenKind::Colon => "colon",
        TokenKind::Variable => "variable",
        TokenKind::Word => "word",
        TokenKind::Quote => "quote",
        TokenKind::Newline => "newline",
    }
}

fn render_text(tokens: &[Token]) -> String {
    let mut out = String::new();
    for t in tokens {
        let lexeme = if t.is_newline() { "" } else { t.lexeme.as_str() };
        out.push_str(&format!("{:>4}  {:<8} {}\n", t.line, kind_label(t.kind), lexeme));
    }
    out
}

pub(crate) fn cmd_tokens(file: &Path, output: OutputFormat, quiet: bool) {
    let text = match fs::read_to_string(file) {
        Ok(t) => t,
        Err(e) => {
            report_error(
                &format!("cannot read {}: {}", file.display(), e),
                output,
                quiet,
            );
            process::exit(1);
        }
    };

    let tokens = match mscript_core::lex(&text, &file.display().to_string()) {
        Ok(tokens) => tokens,
        Err(e) => {
            report_diagnostic(&e, output, quiet);
            process::exit(1);
        }
    };
    tracing::debug!(count = tokens.len(), "lexed");

    match output {
        OutputFormat::Text => print!("{}", render_text(&tokens)),
        OutputFormat::Json => {
            let items: Vec<_> = tokens
                .iter()
                .map(|t| json!({ "line": t.line, "kind": kind_label(t.kind), "lexeme": t.lexeme }))
                .collect();
            let pretty = serde_json::to_string_pretty(&items)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_rows_show_line_kind_and_lexeme() {
        let tokens = mscript_core::lex("pass {\n}", "t").unwrap();
        let text = render_text(&tokens);
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows[0], "   1  word     pass");
        assert_eq!(rows[1], "   1  lbrace   {");
        assert_eq!(rows[2].trim_end(), "   1  newline");
        assert_eq!(rows[3], "   2  rbrace   }");
    }
}
