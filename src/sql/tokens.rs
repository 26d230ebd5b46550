/// Keywords, punctuation and operators emitted by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Select,
    Distinct,
    From,
    As,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    And,
    Or,
    Not,
    In,
    Is,
    Null,
    Empty,
    Member,
    Of,
    Exists,
    Between,
    Like,
    Escape,
    Case,
    When,
    Then,
    Else,
    End,
    New,
    Fetch,
    True,
    LParen,
    RParen,
    Comma,
    Dot,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

impl Token {
    pub const fn as_str(self) -> &'static str {
        match self {
            Token::Select => "SELECT",
            Token::Distinct => "DISTINCT",
            Token::From => "FROM",
            Token::As => "AS",
            Token::Where => "WHERE",
            Token::GroupBy => "GROUP BY",
            Token::Having => "HAVING",
            Token::OrderBy => "ORDER BY",
            Token::Asc => "ASC",
            Token::Desc => "DESC",
            Token::And => "AND",
            Token::Or => "OR",
            Token::Not => "NOT",
            Token::In => "IN",
            Token::Is => "IS",
            Token::Null => "NULL",
            Token::Empty => "EMPTY",
            Token::Member => "MEMBER",
            Token::Of => "OF",
            Token::Exists => "EXISTS",
            Token::Between => "BETWEEN",
            Token::Like => "LIKE",
            Token::Escape => "ESCAPE",
            Token::Case => "CASE",
            Token::When => "WHEN",
            Token::Then => "THEN",
            Token::Else => "ELSE",
            Token::End => "END",
            Token::New => "NEW",
            Token::Fetch => "FETCH",
            Token::True => "TRUE",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Eq => "=",
            Token::Ne => "<>",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
        }
    }

    /// Comparison and arithmetic operators get a space on both sides.
    pub const fn is_operator(self) -> bool {
        matches!(
            self,
            Token::Eq
                | Token::Ne
                | Token::Lt
                | Token::Le
                | Token::Gt
                | Token::Ge
                | Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Percent
        )
    }
}
