//! Token definitions using logos

use std::fmt;

use logos::Logos;

use crate::common::Span;

/// A token with its kind and source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Whether this is the word `keyword`, in any case
    pub fn is_word(&self, keyword: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(word) if word.eq_ignore_ascii_case(keyword))
    }
}

/// Token kinds. Keywords are not reserved: every word is an identifier and
/// the parser decides from context.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
#[logos(skip r"![^\n]*")]
pub enum TokenKind {
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[0-9]+", |lex| lex.slice().to_string())]
    Int(String),

    #[regex(r"[0-9]+\.[0-9]*([eEdD][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    Real(String),

    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); s[1..s.len() - 1].to_string() })]
    #[regex(r"'[^']*'", |lex| { let s = lex.slice(); s[1..s.len() - 1].to_string() })]
    Str(String),

    /// `.and.`, `.eq.`, or a defined operator such as `.cross.`
    #[regex(r"\.[a-zA-Z]+\.", |lex| lex.slice().to_ascii_lowercase())]
    Dotted(String),

    #[token("..")]
    DotDot,
    #[token("::")]
    ColonColon,
    #[token("=>")]
    Arrow,
    #[token("==")]
    EqEq,
    #[token("/=")]
    SlashEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("**")]
    StarStar,
    #[token("//")]
    SlashSlash,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("@")]
    At,
    #[token("%")]
    Percent,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,

    Eof,
}

impl TokenKind {
    /// Spelling of an operator token inside `operator(...)`
    pub fn operator_spelling(&self) -> Option<String> {
        let spelling = match self {
            TokenKind::Dotted(op) => return Some(op.clone()),
            TokenKind::EqEq => "==",
            TokenKind::SlashEq => "/=",
            TokenKind::LtEq => "<=",
            TokenKind::GtEq => ">=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::StarStar => "**",
            TokenKind::SlashSlash => "//",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            _ => return None,
        };
        Some(spelling.to_string())
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier '{name}'"),
            TokenKind::Int(value) | TokenKind::Real(value) => write!(f, "number '{value}'"),
            TokenKind::Str(value) => write!(f, "string \"{value}\""),
            TokenKind::Dotted(op) => write!(f, "'{op}'"),
            TokenKind::DotDot => write!(f, "'..'"),
            TokenKind::ColonColon => write!(f, "'::'"),
            TokenKind::Arrow => write!(f, "'=>'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::SlashEq => write!(f, "'/='"),
            TokenKind::LtEq => write!(f, "'<='"),
            TokenKind::GtEq => write!(f, "'>='"),
            TokenKind::StarStar => write!(f, "'**'"),
            TokenKind::SlashSlash => write!(f, "'//'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::At => write!(f, "'@'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}
