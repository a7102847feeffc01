//! Free-text condition parser.
//!
//! Turns a WHERE-like string into an [`Expr`] tree. Bare identifiers become
//! column references; quoted strings and numbers always become parameters,
//! even when their text looks like a column name. Input that is not fully
//! understood is rejected: statement separators, comment markers,
//! subqueries, unterminated strings and any trailing text all fail the whole
//! parse with [`SqlError::Syntax`].
//!
//! Grammar:
//!
//! ```text
//! condition  := or_expr EOF
//! or_expr    := and_expr ("OR" and_expr)*
//! and_expr   := unary ("AND" unary)*
//! unary      := "NOT" unary | "(" or_expr ")" | predicate
//! predicate  := operand cmp operand
//!             | operand ["NOT"] "LIKE" operand
//!             | column "IS" ["NOT"] "NULL"
//!             | column ["NOT"] "IN" "(" literal ("," literal)* ")"
//!             | column ["NOT"] "BETWEEN" literal "AND" literal
//! operand    := column | literal
//! column     := name ("." name)*
//! literal    := 'string' | number | TRUE | FALSE | NULL
//! cmp        := "=" | "!=" | "<>" | "<" | "<=" | ">" | ">="
//! ```

use crate::error::{SqlError, SqlResult};
use crate::ident::Ident;
use crate::qb::expr::{CmpOp, Expr, Operand};
use crate::value::Value;

const MAX_DEPTH: usize = 64;

/// Parse a condition string into an expression tree.
///
/// ```
/// use sqlgen::{Dialect, parse_condition};
///
/// let expr = parse_condition("username = 'admin' OR '1'='1'").unwrap();
/// let (sql, params) = expr.to_sql(&Dialect::default());
/// assert_eq!(sql, "(`username` = ? OR ? = ?)");
/// assert_eq!(params.len(), 3);
/// ```
pub fn parse_condition(input: &str) -> SqlResult<Expr> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    if parser.peek() == &Tok::Eof {
        return Err(SqlError::syntax("empty condition", 0));
    }
    let expr = parser.or_expr()?;
    match parser.peek() {
        Tok::Eof => Ok(expr),
        _ => Err(SqlError::syntax(
            "unexpected trailing input",
            parser.offset(),
        )),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Name(String),
    Str(String),
    Int(i64),
    Float(f64),
    Cmp(CmpOp),
    And,
    Or,
    Not,
    Is,
    Null,
    In,
    Between,
    Like,
    True,
    False,
    LParen,
    RParen,
    Comma,
    Eof,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Name(n) => format!("identifier '{n}'"),
            Tok::Str(_) => "string literal".to_string(),
            Tok::Int(_) | Tok::Float(_) => "number".to_string(),
            Tok::Cmp(op) => format!("'{op}'"),
            Tok::LParen => "'('".to_string(),
            Tok::RParen => "')'".to_string(),
            Tok::Comma => "','".to_string(),
            Tok::Eof => "end of input".to_string(),
            kw => format!("{kw:?}").to_uppercase(),
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.rest().chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek(0)?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn tokenize(mut self) -> SqlResult<Vec<(Tok, usize)>> {
        let mut out = Vec::new();
        loop {
            while self.peek(0).is_some_and(char::is_whitespace) {
                self.bump();
            }
            let start = self.pos;
            let Some(ch) = self.peek(0) else {
                out.push((Tok::Eof, start));
                return Ok(out);
            };

            if self.rest().starts_with("--") || self.rest().starts_with("/*") || ch == '#' {
                return Err(SqlError::syntax("comment markers are not allowed", start));
            }

            let tok = match ch {
                ';' => {
                    return Err(SqlError::syntax(
                        "statement separator ';' is not allowed",
                        start,
                    ));
                }
                '\'' => self.string()?,
                '"' | '`' => {
                    return Err(SqlError::syntax(
                        "quoted identifiers are not supported",
                        start,
                    ));
                }
                '(' => {
                    self.bump();
                    Tok::LParen
                }
                ')' => {
                    self.bump();
                    Tok::RParen
                }
                ',' => {
                    self.bump();
                    Tok::Comma
                }
                '=' => {
                    self.bump();
                    Tok::Cmp(CmpOp::Eq)
                }
                '!' if self.peek(1) == Some('=') => {
                    self.pos += 2;
                    Tok::Cmp(CmpOp::Ne)
                }
                '<' => {
                    self.bump();
                    match self.peek(0) {
                        Some('=') => {
                            self.bump();
                            Tok::Cmp(CmpOp::Lte)
                        }
                        Some('>') => {
                            self.bump();
                            Tok::Cmp(CmpOp::Ne)
                        }
                        _ => Tok::Cmp(CmpOp::Lt),
                    }
                }
                '>' => {
                    self.bump();
                    if self.peek(0) == Some('=') {
                        self.bump();
                        Tok::Cmp(CmpOp::Gte)
                    } else {
                        Tok::Cmp(CmpOp::Gt)
                    }
                }
                '-' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.number()?,
                c if c.is_ascii_digit() => self.number()?,
                c if c == '_' || c.is_ascii_alphabetic() => self.word()?,
                other => {
                    return Err(SqlError::syntax(
                        format!("unexpected character '{other}'"),
                        start,
                    ));
                }
            };
            out.push((tok, start));
        }
    }

    /// Single-quoted literal; `''` is an escaped quote.
    fn string(&mut self) -> SqlResult<Tok> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\'') => {
                    if self.peek(0) == Some('\'') {
                        self.bump();
                        value.push('\'');
                    } else {
                        return Ok(Tok::Str(value));
                    }
                }
                Some(c) => value.push(c),
                None => return Err(SqlError::syntax("unterminated string literal", start)),
            }
        }
    }

    fn number(&mut self) -> SqlResult<Tok> {
        let start = self.pos;
        if self.peek(0) == Some('-') {
            self.bump();
        }
        while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let mut is_float = false;
        if self.peek(0) == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if self
            .peek(0)
            .is_some_and(|c| c == '_' || c == '.' || c.is_ascii_alphanumeric())
        {
            return Err(SqlError::syntax("invalid numeric literal", start));
        }
        let text = &self.input[start..self.pos];
        if is_float {
            text.parse()
                .map(Tok::Float)
                .map_err(|_| SqlError::syntax("invalid numeric literal", start))
        } else {
            text.parse()
                .map(Tok::Int)
                .map_err(|_| SqlError::syntax("integer literal out of range", start))
        }
    }

    /// Identifier or keyword. Dots join qualified names (`u.name`).
    fn word(&mut self) -> SqlResult<Tok> {
        let start = self.pos;
        loop {
            while self
                .peek(0)
                .is_some_and(|c| c == '_' || c.is_ascii_alphanumeric())
            {
                self.bump();
            }
            let continues = self.peek(0) == Some('.')
                && self
                    .peek(1)
                    .is_some_and(|c| c == '_' || c.is_ascii_alphabetic());
            if !continues {
                break;
            }
            self.bump();
        }
        let text = &self.input[start..self.pos];
        let tok = match text.to_ascii_uppercase().as_str() {
            "AND" => Tok::And,
            "OR" => Tok::Or,
            "NOT" => Tok::Not,
            "IS" => Tok::Is,
            "NULL" => Tok::Null,
            "IN" => Tok::In,
            "BETWEEN" => Tok::Between,
            "LIKE" => Tok::Like,
            "TRUE" => Tok::True,
            "FALSE" => Tok::False,
            "SELECT" => {
                return Err(SqlError::syntax("subqueries are not allowed", start));
            }
            _ => Tok::Name(text.to_string()),
        };
        Ok(tok)
    }
}

struct Parser {
    tokens: Vec<(Tok, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        self.tokens.get(self.pos).map_or(&Tok::Eof, |(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or(self.tokens.last())
            .map_or(0, |(_, o)| *o)
    }

    fn next(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Tok) -> SqlResult<()> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {}", tok.describe())))
        }
    }

    fn unexpected(&self, context: &str) -> SqlError {
        SqlError::syntax(
            format!("{context}, found {}", self.peek().describe()),
            self.offset(),
        )
    }

    fn or_expr(&mut self) -> SqlResult<Expr> {
        let mut items = vec![self.and_expr()?];
        while self.eat(&Tok::Or) {
            items.push(self.and_expr()?);
        }
        Ok(collapse(items, Expr::Or))
    }

    fn and_expr(&mut self) -> SqlResult<Expr> {
        let mut items = vec![self.unary()?];
        while self.eat(&Tok::And) {
            items.push(self.unary()?);
        }
        Ok(collapse(items, Expr::And))
    }

    fn unary(&mut self) -> SqlResult<Expr> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(SqlError::syntax("condition nested too deeply", self.offset()));
        }
        let result = if self.eat(&Tok::Not) {
            self.unary().map(Expr::not)
        } else if self.eat(&Tok::LParen) {
            let inner = self.or_expr();
            inner.and_then(|e| self.expect(&Tok::RParen).map(|()| e))
        } else {
            self.predicate()
        };
        self.depth -= 1;
        result
    }

    fn predicate(&mut self) -> SqlResult<Expr> {
        let left_offset = self.offset();
        let left = self.operand()?;

        let negated = self.eat(&Tok::Not);
        match self.next() {
            Tok::Cmp(op) if !negated => {
                let right = self.operand()?;
                Ok(Expr::compare(left, op, right))
            }
            Tok::Like => {
                let right = self.operand()?;
                let like = Expr::compare(left, CmpOp::Like, right);
                Ok(if negated { Expr::not(like) } else { like })
            }
            Tok::Is if !negated => {
                let column = require_column(left, "IS NULL", left_offset)?;
                let negated = self.eat(&Tok::Not);
                self.expect(&Tok::Null)?;
                Ok(if negated {
                    Expr::is_not_null(column)
                } else {
                    Expr::is_null(column)
                })
            }
            Tok::In => {
                let column = require_column(left, "IN", left_offset)?;
                self.expect(&Tok::LParen)?;
                let mut values = vec![self.literal()?];
                while self.eat(&Tok::Comma) {
                    values.push(self.literal()?);
                }
                self.expect(&Tok::RParen)?;
                Ok(if negated {
                    Expr::not_in(column, values)
                } else {
                    Expr::in_list(column, values)
                })
            }
            Tok::Between => {
                let column = require_column(left, "BETWEEN", left_offset)?;
                let from = self.literal()?;
                self.expect(&Tok::And)?;
                let to = self.literal()?;
                let range = Expr::between(column, from, to);
                Ok(if negated { Expr::not(range) } else { range })
            }
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.unexpected("expected comparison operator"))
            }
        }
    }

    fn operand(&mut self) -> SqlResult<Operand> {
        if let Tok::Name(name) = self.peek() {
            let ident = Ident::new(name);
            self.pos += 1;
            return Ok(Operand::Column(ident));
        }
        self.literal().map(Operand::Value)
    }

    fn literal(&mut self) -> SqlResult<Value> {
        let value = match self.peek() {
            Tok::Str(s) => Value::Text(s.clone()),
            Tok::Int(i) => Value::Int(*i),
            Tok::Float(f) => Value::Float(*f),
            Tok::True => Value::Bool(true),
            Tok::False => Value::Bool(false),
            Tok::Null => Value::Null,
            Tok::LParen => {
                return Err(self.unexpected("nested expressions are not allowed here"));
            }
            _ => return Err(self.unexpected("expected a value")),
        };
        self.pos += 1;
        Ok(value)
    }
}

fn collapse(mut items: Vec<Expr>, group: fn(Vec<Expr>) -> Expr) -> Expr {
    if items.len() == 1 {
        items.remove(0)
    } else {
        group(items)
    }
}

fn require_column(operand: Operand, construct: &str, offset: usize) -> SqlResult<Ident> {
    match operand {
        Operand::Column(ident) => Ok(ident),
        Operand::Value(_) => Err(SqlError::syntax(
            format!("{construct} requires a column on the left"),
            offset,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::dialect::Dialect;

    fn render(input: &str) -> (String, Vec<Value>) {
        parse_condition(input)
            .unwrap_or_else(|e| panic!("{input}: {e}"))
            .to_sql(&Dialect::default())
    }

    fn offset_of(input: &str) -> usize {
        match parse_condition(input) {
            Err(SqlError::Syntax { offset, .. }) => offset,
            other => panic!("expected syntax error for {input:?}, got {other:?}"),
        }
    }

    #[test]
    fn quoted_literals_are_never_identifiers() {
        let (sql, params) = render("username = 'admin' OR '1'='1'");
        assert_eq!(sql, "(`username` = ? OR ? = ?)");
        assert_eq!(params, args!["admin", "1", "1"]);
    }

    #[test]
    fn separator_inside_string_is_one_parameter() {
        let (sql, params) = render("id = '1; DROP TABLE users; --'");
        assert_eq!(sql, "`id` = ?");
        assert_eq!(params, args!["1; DROP TABLE users; --"]);
    }

    #[test]
    fn doubled_quote_escape() {
        let (sql, params) = render("name = 'O''Brien'");
        assert_eq!(sql, "`name` = ?");
        assert_eq!(params, args!["O'Brien"]);
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let (sql, params) = render("a = 1 AND b = 2 OR c = 3");
        assert_eq!(sql, "((`a` = ? AND `b` = ?) OR `c` = ?)");
        assert_eq!(params, args![1, 2, 3]);
    }

    #[test]
    fn parentheses_and_not() {
        let (sql, _) = render("NOT (a = 1 OR b <> 2)");
        assert_eq!(sql, "NOT ((`a` = ? OR `b` != ?))");
    }

    #[test]
    fn column_to_column_comparison() {
        let (sql, params) = render("updated_at >= created_at");
        assert_eq!(sql, "`updated_at` >= `created_at`");
        assert!(params.is_empty());
    }

    #[test]
    fn extended_predicates() {
        assert_eq!(render("deleted_at IS NULL").0, "`deleted_at` IS NULL");
        assert_eq!(render("deleted_at is not null").0, "`deleted_at` IS NOT NULL");
        let (sql, params) = render("id IN (1, 2, 'x')");
        assert_eq!(sql, "`id` IN (?, ?, ?)");
        assert_eq!(params, args![1, 2, "x"]);
        assert_eq!(render("id NOT IN (1)").0, "`id` NOT IN (?)");
        assert_eq!(render("name NOT LIKE 'a%'").0, "NOT (`name` LIKE ?)");
        let (sql, params) = render("age BETWEEN 18 AND 65");
        assert_eq!(sql, "(`age` >= ? AND `age` <= ?)");
        assert_eq!(params, args![18, 65]);
    }

    #[test]
    fn literal_kinds() {
        let (_, params) = render("a = -3 AND b = 1.5 AND c = TRUE AND d = NULL");
        assert_eq!(
            params,
            vec![Value::Int(-3), Value::Float(1.5), Value::Bool(true), Value::Null]
        );
    }

    #[test]
    fn qualified_column() {
        assert_eq!(render("u.id = 1").0, "`u`.`id` = ?");
    }

    #[test]
    fn rejects_statement_separator() {
        assert_eq!(offset_of("id = 1; DROP TABLE users"), 6);
    }

    #[test]
    fn rejects_comments() {
        assert_eq!(offset_of("id = 1 -- trailing"), 7);
        assert_eq!(offset_of("id = 1 /* x */"), 7);
        assert_eq!(offset_of("id = 1 # x"), 7);
    }

    #[test]
    fn rejects_unterminated_string() {
        assert_eq!(offset_of("name = 'abc"), 7);
        assert_eq!(offset_of("name = 'it''s"), 7);
    }

    #[test]
    fn rejects_trailing_input() {
        assert_eq!(offset_of("a = 1 b = 2"), 6);
        assert_eq!(offset_of("a = 1)"), 5);
        assert!(parse_condition("a = 'x' 'y'").is_err());
    }

    #[test]
    fn rejects_subqueries() {
        assert!(parse_condition("id IN (SELECT id FROM admins)").is_err());
        assert!(parse_condition("id = (SELECT 1)").is_err());
    }

    #[test]
    fn rejects_incomplete_input() {
        for input in ["", "   ", "a", "a =", "a = 1 AND", "(a = 1", "a IS", "NOT", "a IN ()"] {
            assert!(parse_condition(input).is_err(), "{input:?} should fail");
        }
    }

    #[test]
    fn rejects_null_check_on_literal() {
        assert!(parse_condition("'x' IS NULL").is_err());
    }

    #[test]
    fn rejects_quoted_identifiers_and_unknown_chars() {
        assert!(parse_condition("\"name\" = 1").is_err());
        assert!(parse_condition("`name` = 1").is_err());
        assert!(parse_condition("a = 1 | 2").is_err());
        assert!(parse_condition("a = 1abc").is_err());
    }

    #[test]
    fn rejects_runaway_nesting() {
        let deep = format!("{}a = 1{}", "(".repeat(100), ")".repeat(100));
        assert!(parse_condition(&deep).is_err());
    }
}
