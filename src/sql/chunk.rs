use compact_str::CompactString;
use core::fmt::Write;

use crate::context::ParamId;
use crate::sql::tokens::Token;

/// One chunk of a rendered query fragment.
///
/// - `Token` — keywords, punctuation and operators with automatic spacing
/// - `Ident` — quoted identifiers (aliases, attribute names)
/// - `Raw` — unquoted text (entity names, function names, literals)
/// - `Param` — a parameter placeholder, referenced by handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Token(Token),
    Ident(CompactString),
    Raw(CompactString),
    Param {
        id: ParamId,
        name: Option<CompactString>,
    },
}

impl Chunk {
    pub(crate) fn write(&self, buf: &mut impl Write) {
        match self {
            Chunk::Token(token) => {
                let _ = buf.write_str(token.as_str());
            }
            Chunk::Ident(name) => {
                let _ = buf.write_char('"');
                let _ = buf.write_str(name);
                let _ = buf.write_char('"');
            }
            Chunk::Raw(text) => {
                let _ = buf.write_str(text);
            }
            Chunk::Param { name, .. } => match name {
                Some(name) => {
                    let _ = buf.write_char(':');
                    let _ = buf.write_str(name);
                }
                None => {
                    let _ = buf.write_char('?');
                }
            },
        }
    }

    /// Word-like chunks need a space between each other.
    pub(crate) const fn is_word_like(&self) -> bool {
        match self {
            Chunk::Token(t) => {
                !matches!(
                    t,
                    Token::LParen | Token::RParen | Token::Comma | Token::Dot
                ) && !t.is_operator()
            }
            Chunk::Ident(_) | Chunk::Raw(_) | Chunk::Param { .. } => true,
        }
    }
}

/// Canonical spacing rule between two adjacent chunks.
///
/// Keywords before an opening paren keep a space (`EXISTS (`, `IN (`);
/// function-style names do not (`COUNT(`).
pub(crate) fn chunk_needs_space(current: &Chunk, next: &Chunk) -> bool {
    match (current, next) {
        (_, Chunk::Token(Token::RParen | Token::Comma | Token::Dot)) => false,
        (Chunk::Token(Token::LParen | Token::Dot), _) => false,
        (Chunk::Token(Token::Comma), _) => true,
        (Chunk::Token(t), _) if t.is_operator() => true,
        (_, Chunk::Token(t)) if t.is_operator() => true,
        (Chunk::Token(_), Chunk::Token(Token::LParen)) => true,
        (_, Chunk::Token(Token::LParen)) => false,
        (Chunk::Token(Token::RParen), next) => next.is_word_like(),
        (current, next) => current.is_word_like() && next.is_word_like(),
    }
}

impl From<Token> for Chunk {
    #[inline]
    fn from(value: Token) -> Self {
        Chunk::Token(value)
    }
}
