use crate::*;
use std::str;

/// Parse a single SELECT statement. Malformed input yields `DbError::Parse`.
pub fn parse(source: &str) -> Result<Query> {
    Parser::new(source).query()
}

/// Token produced by the lexer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Token {
    Id,
    Number,
    StringLit,
    Comma,
    Star,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EndOfFile,
    Unknown,
}

/// Query parser. Keywords are recognised ASCII case-insensitively; comparison
/// operators try their two-character forms before the one-character forms.
struct Parser<'a> {
    /// Source query text.
    source: &'a [u8],
    /// Index into source.
    ix: usize,
    /// Current input byte ( 0 at end of input ).
    cc: u8,
    /// Current token.
    token: Token,
    /// Source index of the start of the current token.
    token_start: usize,
    /// Source slice for the current token ( string literals are in ts ).
    cs: &'a [u8],
    /// Decoded string literal.
    ts: String,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        let source = src.as_bytes();
        let mut result = Self {
            source,
            ix: 0,
            cc: 0,
            token: Token::EndOfFile,
            token_start: 0,
            cs: source,
            ts: String::new(),
        };
        result.read_char();
        result.read_token();
        result
    }

    /// Parse the whole statement; trailing input is an error.
    fn query(&mut self) -> Result<Query> {
        let mut q = Query::default();
        self.read_id(b"SELECT")?;
        if self.token == Token::Star {
            self.read_token();
        } else {
            loop {
                q.select_columns.push(self.id_string()?);
                if self.token != Token::Comma {
                    break;
                }
                self.read_token();
            }
        }
        self.read_id(b"FROM")?;
        loop {
            q.from_tables.push(self.id_string()?);
            if self.token != Token::Comma {
                break;
            }
            self.read_token();
        }
        loop {
            let kind = if self.test_id(b"JOIN") {
                JoinKind::Inner
            } else if self.test_id(b"INNER") {
                self.read_id(b"JOIN")?;
                JoinKind::Inner
            } else if self.test_id(b"LEFT") {
                self.read_id(b"JOIN")?;
                JoinKind::Left
            } else if self.test_id(b"RIGHT") {
                self.read_id(b"JOIN")?;
                JoinKind::Right
            } else if self.test_id(b"FULL") {
                self.read_id(b"JOIN")?;
                JoinKind::Full
            } else {
                break;
            };
            let right_table = self.id_string()?;
            self.read_id(b"ON")?;
            let left_column = self.id_string()?;
            if self.token != Token::Equal {
                return Err(self.err("'=' expected in ON clause"));
            }
            self.read_token();
            let right_column = self.id_string()?;
            q.joins.push(JoinSpec {
                left_table: q.from_tables[0].clone(),
                left_column,
                right_table,
                right_column,
                kind,
            });
        }
        if self.test_id(b"WHERE") {
            let mut connective = if self.test_id(b"NOT") {
                Connective::Not
            } else {
                Connective::And
            };
            loop {
                let p = self.predicate(connective)?;
                q.conditions.push(p);
                connective = if self.test_id(b"AND") {
                    Connective::And
                } else if self.test_id(b"OR") {
                    Connective::Or
                } else {
                    break;
                };
                if self.test_id(b"NOT") {
                    connective = Connective::Not;
                }
            }
        }
        if self.test_id(b"ORDER") {
            self.read_id(b"BY")?;
            loop {
                q.order_by.push(self.id_string()?);
                if self.token != Token::Comma {
                    break;
                }
                self.read_token();
            }
            if self.test_id(b"DESC") {
                q.ascending = false;
            } else {
                self.test_id(b"ASC");
            }
        }
        if self.test_id(b"LIMIT") {
            q.limit = self.int_literal()?;
            if self.test_id(b"OFFSET") {
                let off = self.int_literal()?;
                if off < 0 {
                    return Err(self.err("OFFSET cannot be negative"));
                }
                q.offset = off as usize;
            }
        }
        if self.token != Token::EndOfFile {
            return Err(self.err("unexpected trailing input"));
        }
        Ok(q)
    }

    /// Parse one `column op literal` predicate.
    fn predicate(&mut self, connective: Connective) -> Result<Predicate> {
        let column = self.id_string()?;
        let op = match self.token {
            Token::Equal => CompareOp::Equal,
            Token::NotEqual => CompareOp::NotEqual,
            Token::Less => CompareOp::Less,
            Token::LessEqual => CompareOp::LessEqual,
            Token::Greater => CompareOp::Greater,
            Token::GreaterEqual => CompareOp::GreaterEqual,
            Token::Id if self.cs.eq_ignore_ascii_case(b"LIKE") => CompareOp::Like,
            _ => return Err(self.err("comparison operator expected")),
        };
        self.read_token();
        let value = match self.token {
            Token::Number | Token::Id => tos(self.cs),
            Token::StringLit => self.ts.clone(),
            _ => return Err(self.err("literal expected")),
        };
        self.read_token();
        Ok(Predicate {
            column,
            op,
            value,
            connective,
        })
    }

    /// Current token as an identifier, advancing past it.
    fn id_string(&mut self) -> Result<String> {
        if self.token != Token::Id {
            return Err(self.err("name expected"));
        }
        let result = tos(self.cs);
        self.read_token();
        Ok(result)
    }

    /// Current token as an integer literal, advancing past it.
    fn int_literal(&mut self) -> Result<i64> {
        if self.token != Token::Number {
            return Err(self.err("number expected"));
        }
        let text = tos(self.cs);
        let result = text
            .parse()
            .map_err(|_| self.err("integer literal expected"))?;
        self.read_token();
        Ok(result)
    }

    /// If the current token is the given keyword, advance past it.
    fn test_id(&mut self, kw: &[u8]) -> bool {
        if self.token == Token::Id && self.cs.eq_ignore_ascii_case(kw) {
            self.read_token();
            true
        } else {
            false
        }
    }

    /// The current token must be the given keyword.
    fn read_id(&mut self, kw: &[u8]) -> Result<()> {
        if self.test_id(kw) {
            Ok(())
        } else {
            Err(self.err(&format!("'{}' expected", tos(kw))))
        }
    }

    fn err(&self, msg: &str) -> DbError {
        DbError::Parse(format!("{} near position {}", msg, self.token_start))
    }

    /// Read a byte; 0 signals end of input.
    fn read_char(&mut self) -> u8 {
        let cc = if self.ix >= self.source.len() {
            self.ix = self.source.len() + 1;
            0
        } else {
            let cc = self.source[self.ix];
            self.ix += 1;
            cc
        };
        self.cc = cc;
        cc
    }

    /// Read the next token.
    fn read_token(&mut self) {
        let mut cc = self.cc;
        while cc == b' ' || cc == b'\t' || cc == b'\n' || cc == b'\r' {
            cc = self.read_char();
        }
        self.token_start = self.ix - 1;
        let sc = cc;
        cc = self.read_char();
        self.token = match sc {
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => {
                while cc.is_ascii_alphanumeric() || cc == b'_' {
                    cc = self.read_char();
                }
                self.cs = &self.source[self.token_start..self.ix - 1];
                Token::Id
            }
            b'0'..=b'9' | b'-' => {
                while cc.is_ascii_digit() {
                    cc = self.read_char();
                }
                if cc == b'.' {
                    cc = self.read_char();
                    while cc.is_ascii_digit() {
                        cc = self.read_char();
                    }
                }
                self.cs = &self.source[self.token_start..self.ix - 1];
                Token::Number
            }
            b'\'' => {
                let start = self.ix - 1;
                while cc != b'\'' && cc != 0 {
                    cc = self.read_char();
                }
                self.ts = tos(&self.source[start..self.ix - 1]);
                if cc == b'\'' {
                    self.read_char();
                }
                Token::StringLit
            }
            b',' => Token::Comma,
            b'*' => Token::Star,
            b'=' => Token::Equal,
            b'!' => {
                if cc == b'=' {
                    self.read_char();
                    Token::NotEqual
                } else {
                    Token::Unknown
                }
            }
            b'<' => {
                if cc == b'=' {
                    self.read_char();
                    Token::LessEqual
                } else {
                    Token::Less
                }
            }
            b'>' => {
                if cc == b'=' {
                    self.read_char();
                    Token::GreaterEqual
                } else {
                    Token::Greater
                }
            }
            0 => Token::EndOfFile,
            _ => Token::Unknown,
        };
    }
}

/// Owned text for a token slice.
fn tos(b: &[u8]) -> String {
    str::from_utf8(b).unwrap_or_default().to_string()
}
