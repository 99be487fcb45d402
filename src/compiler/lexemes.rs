//! Lexeme stream format.
//!
//! A lexeme file is a whitespace-separated list of integer codes. Identifier
//! (code 2) and number (code 3) lexemes are followed by their payload word:
//!
//! ```text
//! 29 2 x 18 2 x 20 3 42 19
//! ```

use std::str::SplitWhitespace;

use thiserror::Error;

use super::lexer::{IDENTIFIER_LEN, NUMBER_LEN, TokenKind};

const IDENT_CODE: i32 = 2;
const NUMBER_CODE: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexemeError {
    #[error("malformed lexeme #{position}: '{text}' is not a lexeme code")]
    Malformed { position: usize, text: String },
    #[error("unknown lexeme code #{position}: {code}")]
    UnknownCode { position: usize, code: i32 },
    #[error("lexeme #{position} is missing its payload")]
    MissingPayload { position: usize },
    #[error("identifier too large: {text}")]
    IdentifierTooLong { text: String },
    #[error("illegal identifier: {text}")]
    IllegalIdentifier { text: String },
    #[error("number too large: {text}")]
    NumberTooLarge { text: String },
}

/// The parser's view of its input: one token at a time.
///
/// `Ok(None)` marks the end of the stream.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Option<TokenKind>, LexemeError>;
}

/// Encode tokens as lexeme text.
pub fn encode<'a>(tokens: impl IntoIterator<Item = &'a TokenKind>) -> String {
    let words: Vec<String> = tokens
        .into_iter()
        .map(|kind| match kind {
            TokenKind::Ident(name) => format!("{} {}", IDENT_CODE, name),
            TokenKind::Number(value) => format!("{} {}", NUMBER_CODE, value),
            other => other.code().to_string(),
        })
        .collect();
    let mut text = words.join(" ");
    text.push('\n');
    text
}

/// Reads tokens from lexeme text.
pub struct LexemeReader<'a> {
    words: SplitWhitespace<'a>,
    position: usize,
}

impl<'a> LexemeReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            words: text.split_whitespace(),
            position: 0,
        }
    }

    /// Read every remaining token.
    pub fn read_all(mut self) -> Result<Vec<TokenKind>, LexemeError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn payload(&mut self) -> Result<&'a str, LexemeError> {
        self.words.next().ok_or(LexemeError::MissingPayload {
            position: self.position,
        })
    }
}

impl TokenSource for LexemeReader<'_> {
    fn next_token(&mut self) -> Result<Option<TokenKind>, LexemeError> {
        let Some(word) = self.words.next() else {
            return Ok(None);
        };
        self.position += 1;
        let position = self.position;

        let code: i32 = word.parse().map_err(|_| LexemeError::Malformed {
            position,
            text: word.to_string(),
        })?;

        let kind = match code {
            IDENT_CODE => parse_identifier(self.payload()?)?,
            NUMBER_CODE => parse_number(self.payload()?)?,
            _ => TokenKind::from_code(code).ok_or(LexemeError::UnknownCode { position, code })?,
        };
        Ok(Some(kind))
    }
}

fn parse_identifier(text: &str) -> Result<TokenKind, LexemeError> {
    let mut chars = text.chars();
    let well_formed = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric());
    if !well_formed {
        return Err(LexemeError::IllegalIdentifier {
            text: text.to_string(),
        });
    }
    if text.len() > IDENTIFIER_LEN {
        return Err(LexemeError::IdentifierTooLong {
            text: text.to_string(),
        });
    }
    Ok(TokenKind::Ident(text.to_string()))
}

fn parse_number(text: &str) -> Result<TokenKind, LexemeError> {
    if text.is_empty() || text.len() > NUMBER_LEN || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(LexemeError::NumberTooLarge {
            text: text.to_string(),
        });
    }
    text.parse()
        .map(TokenKind::Number)
        .map_err(|_| LexemeError::NumberTooLarge {
            text: text.to_string(),
        })
}

/// An in-memory token source, used when scanning and compiling in one pass.
pub struct TokenList {
    tokens: std::vec::IntoIter<TokenKind>,
}

impl TokenList {
    pub fn new(tokens: Vec<TokenKind>) -> Self {
        Self {
            tokens: tokens.into_iter(),
        }
    }
}

impl TokenSource for TokenList {
    fn next_token(&mut self) -> Result<Option<TokenKind>, LexemeError> {
        Ok(self.tokens.next())
    }
}
