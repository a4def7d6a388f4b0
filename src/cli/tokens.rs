//! Token dump for debugging paths

use super::CliError;
use crate::{Lexer, TokenKind, output::format_number};

/// One line per token: its character offset and kind.
pub fn describe_tokens(path: &str) -> Result<Vec<String>, CliError> {
    let tokens = Lexer::tokenize(path)?;
    Ok(tokens
        .iter()
        .map(|token| {
            let kind = match &token.kind {
                TokenKind::EndOfInput => "EndOfInput".to_string(),
                TokenKind::Keyword(k) => format!("Keyword({k:?})"),
                TokenKind::KeywordOrIdentifier(k, text) => {
                    format!("KeywordOrIdentifier({k:?}, {text:?})")
                }
                TokenKind::Identifier(name) => format!("Identifier({name:?})"),
                TokenKind::NamedVariable(name) => format!("NamedVariable({name:?})"),
                TokenKind::StringLiteral(s) => format!("StringLiteral({s:?})"),
                TokenKind::IntegerLiteral(n) => format!("IntegerLiteral({n})"),
                TokenKind::DecimalLiteral(d) => format!("DecimalLiteral({})", format_number(d)),
            };
            format!("{:>4}  {kind}", token.start)
        })
        .collect())
}
