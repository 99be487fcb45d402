use std::fmt;

use thiserror::Error;

/// Maximum length of an identifier.
pub const IDENTIFIER_LEN: usize = 11;

/// Maximum number of digits in a number literal.
pub const NUMBER_LEN: usize = 5;

/// Token kinds for PL/0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Null,

    // Literals
    Ident(String),
    Number(i32),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Odd,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Become, // :=

    // Delimiters
    LParen,
    RParen,
    Comma,
    Semi,
    Period,

    // Keywords
    Begin,
    End,
    If,
    Then,
    While,
    Do,
    Call,
    Const,
    Var,
    Procedure,
    Write,
    Read,
    Else,
}

impl TokenKind {
    /// Numeric lexeme code used in lexeme files.
    pub fn code(&self) -> i32 {
        match self {
            TokenKind::Null => 1,
            TokenKind::Ident(_) => 2,
            TokenKind::Number(_) => 3,
            TokenKind::Plus => 4,
            TokenKind::Minus => 5,
            TokenKind::Star => 6,
            TokenKind::Slash => 7,
            TokenKind::Odd => 8,
            TokenKind::Eq => 9,
            TokenKind::NotEq => 10,
            TokenKind::Lt => 11,
            TokenKind::Le => 12,
            TokenKind::Gt => 13,
            TokenKind::Ge => 14,
            TokenKind::LParen => 15,
            TokenKind::RParen => 16,
            TokenKind::Comma => 17,
            TokenKind::Semi => 18,
            TokenKind::Period => 19,
            TokenKind::Become => 20,
            TokenKind::Begin => 21,
            TokenKind::End => 22,
            TokenKind::If => 23,
            TokenKind::Then => 24,
            TokenKind::While => 25,
            TokenKind::Do => 26,
            TokenKind::Call => 27,
            TokenKind::Const => 28,
            TokenKind::Var => 29,
            TokenKind::Procedure => 30,
            TokenKind::Write => 31,
            TokenKind::Read => 32,
            TokenKind::Else => 33,
        }
    }

    /// Token kind for a code that carries no payload.
    ///
    /// Returns `None` for unknown codes and for identifier/number codes.
    pub fn from_code(code: i32) -> Option<Self> {
        let kind = match code {
            1 => TokenKind::Null,
            4 => TokenKind::Plus,
            5 => TokenKind::Minus,
            6 => TokenKind::Star,
            7 => TokenKind::Slash,
            8 => TokenKind::Odd,
            9 => TokenKind::Eq,
            10 => TokenKind::NotEq,
            11 => TokenKind::Lt,
            12 => TokenKind::Le,
            13 => TokenKind::Gt,
            14 => TokenKind::Ge,
            15 => TokenKind::LParen,
            16 => TokenKind::RParen,
            17 => TokenKind::Comma,
            18 => TokenKind::Semi,
            19 => TokenKind::Period,
            20 => TokenKind::Become,
            21 => TokenKind::Begin,
            22 => TokenKind::End,
            23 => TokenKind::If,
            24 => TokenKind::Then,
            25 => TokenKind::While,
            26 => TokenKind::Do,
            27 => TokenKind::Call,
            28 => TokenKind::Const,
            29 => TokenKind::Var,
            30 => TokenKind::Procedure,
            31 => TokenKind::Write,
            32 => TokenKind::Read,
            33 => TokenKind::Else,
            _ => return None,
        };
        Some(kind)
    }

    fn keyword(ident: &str) -> Option<Self> {
        let kind = match ident {
            "begin" => TokenKind::Begin,
            "call" => TokenKind::Call,
            "const" => TokenKind::Const,
            "do" => TokenKind::Do,
            "else" => TokenKind::Else,
            "end" => TokenKind::End,
            "if" => TokenKind::If,
            "odd" => TokenKind::Odd,
            "procedure" => TokenKind::Procedure,
            "then" => TokenKind::Then,
            "read" => TokenKind::Read,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            "write" => TokenKind::Write,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Ident(name) => return f.write_str(name),
            TokenKind::Number(value) => return write!(f, "{}", value),
            TokenKind::Null => "null",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Odd => "odd",
            TokenKind::Eq => "=",
            TokenKind::NotEq => "<>",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::Become => ":=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Semi => ";",
            TokenKind::Period => ".",
            TokenKind::Begin => "begin",
            TokenKind::End => "end",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::Call => "call",
            TokenKind::Const => "const",
            TokenKind::Var => "var",
            TokenKind::Procedure => "procedure",
            TokenKind::Write => "write",
            TokenKind::Read => "read",
            TokenKind::Else => "else",
        };
        f.write_str(text)
    }
}

/// Source location information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A token with its kind and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unknown character: {ch}")]
    UnknownCharacter { ch: char, span: Span },
    #[error("identifier too large: {text}")]
    IdentifierTooLong { text: String, span: Span },
    #[error("number too large: {text}")]
    NumberTooLarge { text: String, span: Span },
    #[error("identifiers cannot begin with a digit: {text}")]
    IllegalIdentifier { text: String, span: Span },
    #[error("unterminated comment")]
    UnterminatedComment { span: Span },
}

impl ScanError {
    pub fn span(&self) -> Span {
        match self {
            ScanError::UnknownCharacter { span, .. }
            | ScanError::IdentifierTooLong { span, .. }
            | ScanError::NumberTooLarge { span, .. }
            | ScanError::IllegalIdentifier { span, .. }
            | ScanError::UnterminatedComment { span } => *span,
        }
    }
}

/// The scanner for PL/0 source code.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Scan the whole source, stopping at the first error.
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, ScanError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token?);
        }
        Ok(tokens)
    }

    /// Scan the whole source, collecting every error instead of stopping.
    pub fn scan_tokens_lenient(&mut self) -> (Vec<Token>, Vec<ScanError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        while let Some(token) = self.next_token() {
            match token {
                Ok(token) => tokens.push(token),
                Err(e) => errors.push(e),
            }
        }
        (tokens, errors)
    }

    fn next_token(&mut self) -> Option<Result<Token, ScanError>> {
        if let Err(e) = self.skip_whitespace_and_comments() {
            return Some(Err(e));
        }

        let span = Span::new(self.line, self.column);
        let (_, ch) = self.peek()?;

        let kind = match ch {
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            ',' => self.single(TokenKind::Comma),
            '.' => self.single(TokenKind::Period),
            ';' => self.single(TokenKind::Semi),
            '=' => self.single(TokenKind::Eq),
            '/' => self.single(TokenKind::Slash),
            '<' => {
                self.advance();
                if self.match_char('>') {
                    TokenKind::NotEq
                } else if self.match_char('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                self.advance();
                if self.match_char('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            ':' => {
                self.advance();
                if self.match_char('=') {
                    TokenKind::Become
                } else {
                    return Some(Err(ScanError::UnknownCharacter { ch: ':', span }));
                }
            }
            '0'..='9' => match self.scan_number(span) {
                Ok(kind) => kind,
                Err(e) => return Some(Err(e)),
            },
            c if c.is_ascii_alphabetic() => match self.scan_identifier(span) {
                Ok(kind) => kind,
                Err(e) => return Some(Err(e)),
            },
            _ => {
                self.advance();
                return Some(Err(ScanError::UnknownCharacter { ch, span }));
            }
        };

        Some(Ok(Token::new(kind, span)))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next().map(|(_, c)| c)
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((_, ch)) = result {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        result
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek().map(|(_, c)| c) == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ScanError> {
        loop {
            match self.peek() {
                Some((_, c)) if c.is_whitespace() => {
                    self.advance();
                }
                Some((_, '/')) if self.peek_next() == Some('*') => {
                    let span = Span::new(self.line, self.column);
                    self.advance(); // '/'
                    self.advance(); // '*'
                    loop {
                        match self.advance() {
                            None => return Err(ScanError::UnterminatedComment { span }),
                            Some((_, '*')) => {
                                if self.match_char('/') {
                                    break;
                                }
                            }
                            Some(_) => {}
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Consume a run of alphanumeric characters and return it.
    fn take_word(&mut self) -> &'a str {
        let start = self.peek().map(|(i, _)| i).unwrap_or(self.source.len());
        while let Some((_, ch)) = self.peek() {
            if ch.is_ascii_alphanumeric() {
                self.advance();
            } else {
                break;
            }
        }
        let end = self.peek().map(|(i, _)| i).unwrap_or(self.source.len());
        &self.source[start..end]
    }

    fn scan_number(&mut self, span: Span) -> Result<TokenKind, ScanError> {
        let word = self.take_word();
        let text = word.to_string();

        if !word.chars().all(|c| c.is_ascii_digit()) {
            return Err(ScanError::IllegalIdentifier { text, span });
        }
        if word.len() > NUMBER_LEN {
            return Err(ScanError::NumberTooLarge { text, span });
        }
        word.parse()
            .map(TokenKind::Number)
            .map_err(|_| ScanError::NumberTooLarge { text, span })
    }

    fn scan_identifier(&mut self, span: Span) -> Result<TokenKind, ScanError> {
        let ident = self.take_word();

        if let Some(keyword) = TokenKind::keyword(ident) {
            return Ok(keyword);
        }
        if ident.len() > IDENTIFIER_LEN {
            return Err(ScanError::IdentifierTooLong {
                text: ident.to_string(),
                span,
            });
        }
        Ok(TokenKind::Ident(ident.to_string()))
    }
}
