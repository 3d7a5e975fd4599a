use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::Location;

/// The closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // punctuation and operators
    Plus,
    Minus,
    Times,
    Divide,
    Modulo,
    Dot,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Assign,
    Colon,
    Result,
    PlusAssign,
    MinusAssign,
    TimesAssign,
    DivideAssign,
    ModuloAssign,
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Semicolon,
    Comma,
    NewLine,
    // keywords
    In,
    Or,
    And,
    Not,
    Class,
    Function,
    Reference,
    Break,
    Continue,
    Return,
    Null,
    True,
    False,
    If,
    Elseif,
    Else,
    For,
    Remove,
    Include,
    Import,
    Super,
    // atoms
    Number,
    String,
    Identifier,
    Eos,
    Error,
}

/// Keyword table used to reclassify identifiers after lexing.
pub static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("in", TokenKind::In);
    m.insert("or", TokenKind::Or);
    m.insert("and", TokenKind::And);
    m.insert("not", TokenKind::Not);
    m.insert("class", TokenKind::Class);
    m.insert("function", TokenKind::Function);
    m.insert("reference", TokenKind::Reference);
    m.insert("break", TokenKind::Break);
    m.insert("continue", TokenKind::Continue);
    m.insert("return", TokenKind::Return);
    m.insert("null", TokenKind::Null);
    m.insert("true", TokenKind::True);
    m.insert("false", TokenKind::False);
    m.insert("if", TokenKind::If);
    m.insert("elseif", TokenKind::Elseif);
    m.insert("else", TokenKind::Else);
    m.insert("for", TokenKind::For);
    m.insert("remove", TokenKind::Remove);
    m.insert("include", TokenKind::Include);
    m.insert("import", TokenKind::Import);
    m.insert("super", TokenKind::Super);

    m
});

/// One lexical token. String tokens hold the decoded text as their lexeme;
/// every other kind keeps the source text verbatim.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub location: Option<Location>,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            location,
        }
    }

    /// A token fabricated by the parser (lowered `true`, implicit `_`, ...).
    /// It borrows the location of the construct it was derived from.
    pub fn synthetic(kind: TokenKind, lexeme: impl Into<String>, origin: &Token) -> Self {
        Self::new(kind, lexeme, origin.location.clone())
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Semicolon | TokenKind::Comma | TokenKind::NewLine
        )
    }
}

// Location is deliberately ignored: a printed and re-parsed tree must
// compare equal even though every token moved.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.lexeme == other.lexeme
    }
}

impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eos => f.write_str("end of input"),
            TokenKind::NewLine => f.write_str("\\n"),
            _ => f.write_str(&self.lexeme),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table() {
        assert_eq!(KEYWORDS.get("for"), Some(&TokenKind::For));
        assert_eq!(KEYWORDS.get("reference"), Some(&TokenKind::Reference));
        assert_eq!(KEYWORDS.get("fortune"), None);
    }

    #[test]
    fn test_equality_ignores_location() {
        let a = Token::new(
            TokenKind::Identifier,
            "x",
            Some(Location::new("a.viv", 1, 1)),
        );
        let b = Token::new(
            TokenKind::Identifier,
            "x",
            Some(Location::new("b.viv", 9, 4)),
        );

        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_minds_lexeme() {
        let a = Token::new(TokenKind::Number, "1", None);
        let b = Token::new(TokenKind::Number, "1.0", None);

        assert_ne!(a, b);
    }
}
