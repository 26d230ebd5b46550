//! Flat-chunk query-text builder.
//!
//! The renderer assembles output as a list of chunks rather than a string,
//! so spacing stays a single local rule and parameter placeholders survive
//! until the final write, where text and the encountered parameter handles
//! are produced in one pass.

mod chunk;
mod tokens;

use compact_str::CompactString;
use core::fmt::Write;
use smallvec::SmallVec;

pub use chunk::Chunk;
pub use tokens::Token;

use crate::context::ParamId;
use chunk::chunk_needs_space;

/// A query-text fragment with flat chunk storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sql {
    pub(crate) chunks: SmallVec<[Chunk; 8]>,
}

impl Sql {
    /// Creates an empty fragment.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            chunks: SmallVec::new_const(),
        }
    }

    /// Creates a fragment with a single token.
    #[inline]
    pub fn token(t: Token) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Token(t)],
        }
    }

    /// Creates a fragment with a quoted identifier.
    #[inline]
    pub fn ident(name: impl Into<CompactString>) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Ident(name.into())],
        }
    }

    /// Creates a fragment with raw, unquoted text.
    #[inline]
    pub fn raw(text: impl Into<CompactString>) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Raw(text.into())],
        }
    }

    /// Creates a fragment with a parameter placeholder.
    #[inline]
    pub fn param(id: ParamId, name: Option<CompactString>) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Param { id, name }],
        }
    }

    /// Appends another fragment (flat extend).
    #[inline]
    pub fn append(mut self, other: Sql) -> Self {
        if self.chunks.is_empty() {
            return other;
        }
        if other.chunks.is_empty() {
            return self;
        }
        self.chunks.extend(other.chunks);
        self
    }

    /// Pushes a single chunk.
    #[inline]
    pub fn push(mut self, chunk: impl Into<Chunk>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    /// Wraps the fragment in parentheses.
    #[inline]
    pub fn parens(self) -> Self {
        Sql::token(Token::LParen).append(self).push(Token::RParen)
    }

    /// Joins fragments with a separator token, skipping empty parts.
    pub fn join(parts: impl IntoIterator<Item = Sql>, separator: Token) -> Sql {
        let mut result = Sql::empty();
        for part in parts {
            if part.chunks.is_empty() {
                continue;
            }
            if !result.chunks.is_empty() {
                result.chunks.push(Chunk::Token(separator));
            }
            result.chunks.extend(part.chunks);
        }
        result
    }

    /// Function-call fragment: `NAME(args)`.
    pub fn func(name: impl Into<CompactString>, args: Sql) -> Sql {
        Sql::raw(name)
            .push(Token::LParen)
            .append(args)
            .push(Token::RParen)
    }

    /// Renders the fragment to a string.
    pub fn sql(&self) -> String {
        let cap = self.chunks.len().saturating_mul(8).max(64);
        let mut buf = String::with_capacity(cap);
        self.write_to(&mut buf);
        buf
    }

    /// Renders the fragment and collects every parameter handle encountered,
    /// in emission order, in a single pass.
    pub fn build(&self) -> (String, Vec<ParamId>) {
        let cap = self.chunks.len().saturating_mul(8).max(64);
        let mut buf = String::with_capacity(cap);
        let mut params = Vec::new();
        for (i, chunk) in self.chunks.iter().enumerate() {
            if let Chunk::Param { id, .. } = chunk {
                params.push(*id);
            }
            chunk.write(&mut buf);
            if self.needs_space(i) {
                let _ = buf.write_char(' ');
            }
        }
        (buf, params)
    }

    fn write_to(&self, buf: &mut impl Write) {
        for (i, chunk) in self.chunks.iter().enumerate() {
            chunk.write(buf);
            if self.needs_space(i) {
                let _ = buf.write_char(' ');
            }
        }
    }

    fn needs_space(&self, index: usize) -> bool {
        let Some(next) = self.chunks.get(index + 1) else {
            return false;
        };
        chunk_needs_space(&self.chunks[index], next)
    }
}

impl From<Token> for Sql {
    fn from(value: Token) -> Self {
        Sql::token(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_like_chunks_are_space_separated() {
        let sql = Sql::token(Token::Select)
            .push(Chunk::Ident("t0".into()))
            .push(Token::From)
            .append(Sql::raw("Customer"));
        assert_eq!(sql.sql(), "SELECT \"t0\" FROM Customer");
    }

    #[test]
    fn dots_bind_tight() {
        let sql = Sql::ident("t0").push(Token::Dot).push(Chunk::Ident("name".into()));
        assert_eq!(sql.sql(), "\"t0\".\"name\"");
    }

    #[test]
    fn operators_are_spaced() {
        let sql = Sql::ident("t0")
            .push(Token::Dot)
            .push(Chunk::Ident("age".into()))
            .push(Token::Gt)
            .append(Sql::raw("18"));
        assert_eq!(sql.sql(), "\"t0\".\"age\" > 18");
    }

    #[test]
    fn keywords_keep_a_space_before_parens_but_functions_do_not() {
        let exists = Sql::token(Token::Exists).append(Sql::raw("x").parens());
        assert_eq!(exists.sql(), "EXISTS (x)");

        let count = Sql::func("COUNT", Sql::ident("t0"));
        assert_eq!(count.sql(), "COUNT(\"t0\")");
    }

    #[test]
    fn join_skips_empty_parts() {
        let sql = Sql::join(
            [Sql::raw("a"), Sql::empty(), Sql::raw("b")],
            Token::Comma,
        );
        assert_eq!(sql.sql(), "a, b");
    }

    #[test]
    fn build_collects_params_in_emission_order() {
        let p0 = ParamId::test(0);
        let p1 = ParamId::test(1);
        let sql = Sql::param(p0, None)
            .push(Token::Plus)
            .append(Sql::param(p1, Some("min".into())))
            .push(Token::Plus)
            .append(Sql::param(p0, None));
        let (text, params) = sql.build();
        assert_eq!(text, "? + :min + ?");
        assert_eq!(params, vec![p0, p1, p0]);
    }
}
