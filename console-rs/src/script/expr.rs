//! Console script lexer, AST and parser.
//!
//! The language is a small, JavaScript-flavoured expression language:
//! numbers, strings, lists, variables, function and method calls, the usual
//! operators, `let` declarations, blocks and `if`/`else`.
//!
//! Operator precedence (lowest → highest):
//!   assign  →  ternary  →  or  →  and  →  bitor  →  bitxor  →  bitand  →
//!   equality  →  relational  →  shift  →  additive  →  multiplicative  →
//!   unary  →  postfix  →  primary
//!
//! Statements end at `;`, at `}`, at end of input, or at a line break.  Binary
//! operators may continue an expression onto the next line, which is what
//! lets the console accumulate `1 +` and `1` into a single unit.
//!
//! [`ParseError::UnexpectedEnd`] is kept distinct from other failures: it is
//! how [`is_complete`] tells "needs more input" apart from "wrong".

use std::fmt;

use super::value::Value;
use crate::console::escape::unescape;
use crate::error::EvalError;

// ── ParseError ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input ended where more was required.
    UnexpectedEnd(String),
    /// Input is malformed.
    Unexpected(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedEnd(msg) | ParseError::Unexpected(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for EvalError {
    fn from(e: ParseError) -> Self {
        EvalError::Syntax(e.to_string())
    }
}

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Num(f64),
    Str(String),
    Ident(String),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Tilde,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,

    Eq,       // ==
    Ne,       // !=
    StrictEq, // ===
    StrictNe, // !==
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,

    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    CaretAssign,

    Question,
    Colon,
    Comma,
    Semi,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eof,
}

/// A token and whether a line break preceded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub newline_before: bool,
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Lexer {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skip whitespace and comments; report whether a line break was crossed.
    fn skip_trivia(&mut self) -> Result<bool, ParseError> {
        let mut newline = false;
        loop {
            match (self.peek(), self.peek2()) {
                (Some('\n' | '\r'), _) => {
                    newline = true;
                    self.pos += 1;
                }
                (Some(c), _) if c.is_whitespace() => self.pos += 1,
                (Some('/'), Some('/')) => {
                    while !matches!(self.peek(), None | Some('\n' | '\r')) {
                        self.pos += 1;
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    loop {
                        match self.advance() {
                            None => {
                                return Err(ParseError::UnexpectedEnd(
                                    "unterminated comment".into(),
                                ))
                            }
                            Some('*') if self.eat('/') => break,
                            Some('\n' | '\r') => newline = true,
                            Some(_) => {}
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    fn read_number(&mut self, first: char) -> Result<Tok, ParseError> {
        let mut s = String::new();
        s.push(first);

        if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            self.pos += 1;
            let mut hex = String::new();
            while let Some(c) = self.peek().filter(char::is_ascii_hexdigit) {
                hex.push(c);
                self.pos += 1;
            }
            return i64::from_str_radix(&hex, 16)
                .map(|n| Tok::Num(n as f64))
                .map_err(|_| ParseError::Unexpected("malformed hexadecimal literal".into()));
        }

        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            s.push(c);
            self.pos += 1;
        }
        if first != '.' && self.peek() == Some('.') {
            s.push('.');
            self.pos += 1;
            while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                s.push(c);
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            s.push('e');
            self.pos += 1;
            if let Some(sign) = self.peek().filter(|c| matches!(c, '+' | '-')) {
                s.push(sign);
                self.pos += 1;
            }
            while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                s.push(c);
                self.pos += 1;
            }
        }

        s.parse()
            .map(Tok::Num)
            .map_err(|_| ParseError::Unexpected(format!("malformed number {s}")))
    }

    fn read_string(&mut self, quote: char) -> Result<Tok, ParseError> {
        let mut raw = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(ParseError::UnexpectedEnd(
                        "unterminated string literal".into(),
                    ))
                }
                Some('\\') => match self.advance() {
                    None => {
                        return Err(ParseError::UnexpectedEnd(
                            "unterminated string literal".into(),
                        ))
                    }
                    // Line continuation.
                    Some('\n') => {}
                    Some('\r') => {
                        self.eat('\n');
                    }
                    Some(c) => {
                        raw.push('\\');
                        raw.push(c);
                    }
                },
                Some(c) if c == quote => break,
                Some('\n' | '\r') => {
                    return Err(ParseError::Unexpected("unterminated string literal".into()))
                }
                Some(c) => raw.push(c),
            }
        }
        Ok(Tok::Str(unescape(&raw)))
    }

    fn read_ident(&mut self, first: char) -> Tok {
        let mut s = String::new();
        s.push(first);
        while let Some(c) = self.peek().filter(|&c| is_ident_char(c)) {
            s.push(c);
            self.pos += 1;
        }
        Tok::Ident(s)
    }

    /// Pick `with_eq` if the next char is `=`, else `plain`.
    fn or_assign(&mut self, with_eq: Tok, plain: Tok) -> Tok {
        if self.eat('=') {
            with_eq
        } else {
            plain
        }
    }

    fn next_tok(&mut self, c: char) -> Result<Tok, ParseError> {
        Ok(match c {
            '0'..='9' => self.read_number(c)?,
            '.' if self.peek().is_some_and(|d| d.is_ascii_digit()) => self.read_number(c)?,
            '"' | '\'' => self.read_string(c)?,
            c if is_ident_start(c) => self.read_ident(c),
            '+' => self.or_assign(Tok::PlusAssign, Tok::Plus),
            '-' => self.or_assign(Tok::MinusAssign, Tok::Minus),
            '*' => self.or_assign(Tok::StarAssign, Tok::Star),
            '/' => self.or_assign(Tok::SlashAssign, Tok::Slash),
            '%' => self.or_assign(Tok::PercentAssign, Tok::Percent),
            '^' => self.or_assign(Tok::CaretAssign, Tok::Caret),
            '!' => {
                if self.eat('=') {
                    self.or_assign(Tok::StrictNe, Tok::Ne)
                } else {
                    Tok::Bang
                }
            }
            '=' => {
                if self.eat('=') {
                    self.or_assign(Tok::StrictEq, Tok::Eq)
                } else {
                    Tok::Assign
                }
            }
            '<' => {
                if self.eat('<') {
                    Tok::Shl
                } else {
                    self.or_assign(Tok::Le, Tok::Lt)
                }
            }
            '>' => {
                if self.eat('>') {
                    Tok::Shr
                } else {
                    self.or_assign(Tok::Ge, Tok::Gt)
                }
            }
            '&' => {
                if self.eat('&') {
                    Tok::And
                } else {
                    Tok::Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    Tok::Or
                } else {
                    Tok::Pipe
                }
            }
            '~' => Tok::Tilde,
            '?' => Tok::Question,
            ':' => Tok::Colon,
            ',' => Tok::Comma,
            ';' => Tok::Semi,
            '.' => Tok::Dot,
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '[' => Tok::LBracket,
            ']' => Tok::RBracket,
            '{' => Tok::LBrace,
            '}' => Tok::RBrace,
            c => return Err(ParseError::Unexpected(format!("illegal character '{c}'"))),
        })
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let newline_before = self.skip_trivia()?;
            let Some(c) = self.advance() else {
                tokens.push(Token {
                    tok: Tok::Eof,
                    newline_before,
                });
                return Ok(tokens);
            };
            let tok = self.next_tok(c)?;
            tokens.push(Token {
                tok,
                newline_before,
            });
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Words that cannot be assigned to.
const RESERVED: &[&str] = &[
    "let", "var", "const", "if", "else", "typeof", "true", "false", "null", "undefined",
];

// ── AST ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitXor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    List(Vec<Expr>),
    /// `{ key: value, ... }`
    Object(Vec<(String, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Assign(String, AssignOp, Box<Expr>),
    /// `name(args)`
    Call(String, Vec<Expr>),
    /// `receiver.name(args)`
    Method(Box<Expr>, String, Vec<Expr>),
    /// `object[key]` and `object.key`
    Index(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Let(Vec<(String, Option<Expr>)>),
    Block(Vec<Stmt>),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    Empty,
}

// ── Parser ────────────────────────────────────────────────────────────────────

/// Deepest nesting of expressions, unary operators and statements.
const MAX_NESTING: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

static EOF: Token = Token {
    tok: Tok::Eof,
    newline_before: false,
};

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn token(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&EOF)
    }

    fn peek(&self) -> &Tok {
        &self.token(0).tok
    }

    fn advance(&mut self) -> Tok {
        let t = self.peek().clone();
        self.pos += 1;
        t
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Ident(w) if w == word)
    }

    /// The error for the current token: end-of-input or malformed.
    fn unexpected(&self, what: &str) -> ParseError {
        match self.peek() {
            Tok::Eof => ParseError::UnexpectedEnd(format!("expected {what} before end of input")),
            tok => ParseError::Unexpected(format!("expected {what}, found {}", describe(tok))),
        }
    }

    fn expect(&mut self, expected: &Tok, what: &str) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::Unexpected("too much recursion".into()));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Tok::Ident(name) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    // ── Statements ────────────────────────────────────────────────────────────

    fn parse_program(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while self.peek() != &Tok::Eof {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        self.nested(Self::parse_statement_kind)
    }

    fn parse_statement_kind(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            Tok::Semi => {
                self.pos += 1;
                Ok(Stmt::Empty)
            }
            Tok::LBrace => {
                self.pos += 1;
                let mut body = Vec::new();
                while !self.eat(&Tok::RBrace) {
                    if self.peek() == &Tok::Eof {
                        return Err(self.unexpected("'}'"));
                    }
                    body.push(self.parse_statement()?);
                }
                Ok(Stmt::Block(body))
            }
            Tok::Ident(w) if matches!(w.as_str(), "let" | "var" | "const") => {
                self.pos += 1;
                let mut decls = Vec::new();
                loop {
                    let name = self.expect_ident("variable name")?;
                    let init = if self.eat(&Tok::Assign) {
                        Some(self.parse_assign()?)
                    } else {
                        None
                    };
                    decls.push((name, init));
                    if !self.eat(&Tok::Comma) {
                        break;
                    }
                }
                self.end_statement()?;
                Ok(Stmt::Let(decls))
            }
            Tok::Ident(w) if w == "if" => {
                self.pos += 1;
                self.expect(&Tok::LParen, "'(' after if")?;
                let cond = self.parse_expr()?;
                self.expect(&Tok::RParen, "')' after condition")?;
                let then = self.parse_statement()?;
                let otherwise = if self.at_keyword("else") {
                    self.pos += 1;
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(Stmt::If(cond, Box::new(then), otherwise))
            }
            _ => {
                let expr = self.parse_expr()?;
                self.end_statement()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn end_statement(&mut self) -> Result<(), ParseError> {
        if self.eat(&Tok::Semi) {
            return Ok(());
        }
        let next = self.token(0);
        if next.newline_before || matches!(next.tok, Tok::Eof | Tok::RBrace) || self.at_keyword("else") {
            Ok(())
        } else {
            Err(self.unexpected("';'"))
        }
    }

    // ── Expressions ───────────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        if let Tok::Ident(name) = self.peek() {
            let op = match self.token(1).tok {
                Tok::Assign => Some(AssignOp::Set),
                Tok::PlusAssign => Some(AssignOp::Add),
                Tok::MinusAssign => Some(AssignOp::Sub),
                Tok::StarAssign => Some(AssignOp::Mul),
                Tok::SlashAssign => Some(AssignOp::Div),
                Tok::PercentAssign => Some(AssignOp::Rem),
                Tok::CaretAssign => Some(AssignOp::BitXor),
                _ => None,
            };
            if let Some(op) = op {
                if RESERVED.contains(&name.as_str()) {
                    return Err(ParseError::Unexpected(format!(
                        "invalid assignment to {name}"
                    )));
                }
                let name = name.clone();
                self.pos += 2;
                let rhs = self.parse_assign()?;
                return Ok(Expr::Assign(name, op, Box::new(rhs)));
            }
        }
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_or()?;
        if self.eat(&Tok::Question) {
            let then = self.parse_assign()?;
            self.expect(&Tok::Colon, "':' in conditional expression")?;
            let otherwise = self.parse_assign()?;
            Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(then),
                Box::new(otherwise),
            ))
        } else {
            Ok(cond)
        }
    }

    /// One left-associative precedence level.
    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, ParseError>,
        op_for: fn(&Tok) -> Option<BinOp>,
    ) -> Result<Expr, ParseError> {
        let mut lhs = next(self)?;
        while let Some(op) = op_for(self.peek()) {
            self.pos += 1;
            let rhs = next(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_and, |t| (t == &Tok::Or).then_some(BinOp::Or))
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_bitor, |t| (t == &Tok::And).then_some(BinOp::And))
    }

    fn parse_bitor(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_bitxor, |t| (t == &Tok::Pipe).then_some(BinOp::BitOr))
    }

    fn parse_bitxor(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_bitand, |t| (t == &Tok::Caret).then_some(BinOp::BitXor))
    }

    fn parse_bitand(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_equality, |t| (t == &Tok::Amp).then_some(BinOp::BitAnd))
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_relational, |t| match t {
            Tok::Eq => Some(BinOp::Eq),
            Tok::Ne => Some(BinOp::Ne),
            Tok::StrictEq => Some(BinOp::StrictEq),
            Tok::StrictNe => Some(BinOp::StrictNe),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_shift, |t| match t {
            Tok::Lt => Some(BinOp::Lt),
            Tok::Le => Some(BinOp::Le),
            Tok::Gt => Some(BinOp::Gt),
            Tok::Ge => Some(BinOp::Ge),
            _ => None,
        })
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_additive, |t| match t {
            Tok::Shl => Some(BinOp::Shl),
            Tok::Shr => Some(BinOp::Shr),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_multiplicative, |t| match t {
            Tok::Plus => Some(BinOp::Add),
            Tok::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::parse_unary, |t| match t {
            Tok::Star => Some(BinOp::Mul),
            Tok::Slash => Some(BinOp::Div),
            Tok::Percent => Some(BinOp::Rem),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Tok::Minus => UnaryOp::Neg,
            Tok::Plus => UnaryOp::Plus,
            Tok::Bang => UnaryOp::Not,
            Tok::Tilde => UnaryOp::BitNot,
            Tok::Ident(w) if w == "typeof" => UnaryOp::TypeOf,
            _ => return self.parse_postfix(),
        };
        self.pos += 1;
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&Tok::Dot) {
                let name = self.expect_ident("property name after '.'")?;
                if self.eat(&Tok::LParen) {
                    let args = self.parse_args()?;
                    expr = Expr::Method(Box::new(expr), name, args);
                } else {
                    expr = Expr::Index(Box::new(expr), Box::new(Expr::Literal(Value::Str(name))));
                }
            } else if self.eat(&Tok::LBracket) {
                let key = self.parse_expr()?;
                self.expect(&Tok::RBracket, "']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(key));
            } else {
                return Ok(expr);
            }
        }
    }

    /// Arguments after an opening `(`, through the closing `)`.
    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.parse_items(&Tok::RParen, "')' after arguments")
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn parse_items(&mut self, close: &Tok, what: &str) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.parse_assign()?);
            if !self.eat(&Tok::Comma) {
                self.expect(close, what)?;
                return Ok(items);
            }
        }
    }

    /// Object literal body after the opening `{`.
    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        let mut fields = Vec::new();
        loop {
            if self.eat(&Tok::RBrace) {
                return Ok(Expr::Object(fields));
            }
            let key = match self.advance() {
                Tok::Ident(k) | Tok::Str(k) => k,
                Tok::Num(n) => super::value::format_number(n),
                Tok::Eof => return Err(ParseError::UnexpectedEnd("expected property name".into())),
                tok => {
                    return Err(ParseError::Unexpected(format!(
                        "expected property name, found {}",
                        describe(&tok)
                    )))
                }
            };
            self.expect(&Tok::Colon, "':' after property name")?;
            fields.push((key, self.parse_assign()?));
            if !self.eat(&Tok::Comma) {
                self.expect(&Tok::RBrace, "'}' after object")?;
                return Ok(Expr::Object(fields));
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.peek().clone();
        match tok {
            Tok::Eof => Err(self.unexpected("expression")),
            Tok::Num(n) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Number(n)))
            }
            Tok::Str(s) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Str(s)))
            }
            Tok::Ident(name) => {
                self.pos += 1;
                let literal = match name.as_str() {
                    "true" => Some(Value::Bool(true)),
                    "false" => Some(Value::Bool(false)),
                    "null" => Some(Value::Null),
                    "undefined" => Some(Value::Undefined),
                    "NaN" => Some(Value::Number(f64::NAN)),
                    "Infinity" => Some(Value::Number(f64::INFINITY)),
                    _ => None,
                };
                if let Some(v) = literal {
                    return Ok(Expr::Literal(v));
                }
                if RESERVED.contains(&name.as_str()) {
                    return Err(ParseError::Unexpected(format!("unexpected keyword {name}")));
                }
                if self.eat(&Tok::LParen) {
                    let args = self.parse_args()?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Tok::LParen => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(&Tok::RParen, "')'")?;
                Ok(inner)
            }
            Tok::LBracket => {
                self.pos += 1;
                Ok(Expr::List(self.parse_items(&Tok::RBracket, "']' after list")?))
            }
            Tok::LBrace => {
                self.pos += 1;
                self.parse_object()
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Num(n) => format!("number {}", super::value::format_number(*n)),
        Tok::Str(s) => format!("string \"{s}\""),
        Tok::Ident(name) => format!("'{name}'"),
        Tok::Eof => "end of input".to_owned(),
        other => format!("{other:?}"),
    }
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Parse console script text into statements.
pub fn parse_program(src: &str) -> Result<Vec<Stmt>, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    Parser::new(tokens).parse_program()
}

/// Parse a single expression, rejecting trailing input.
pub fn parse_expr(src: &str) -> Result<Expr, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    match parser.peek() {
        Tok::Eof => Ok(expr),
        _ => Err(parser.unexpected("end of expression")),
    }
}

/// `false` only when `src` stops short of a complete program.
pub fn is_complete(src: &str) -> bool {
    !matches!(parse_program(src), Err(ParseError::UnexpectedEnd(_)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Expr {
        Expr::Literal(Value::Number(n))
    }

    fn one_expr(src: &str) -> Expr {
        match parse_program(src).expect("parse failed").as_slice() {
            [Stmt::Expr(e)] => e.clone(),
            other => panic!("expected one expression statement, got {other:?}"),
        }
    }

    #[test]
    fn precedence() {
        assert_eq!(
            one_expr("1 + 2 * 3"),
            Expr::Binary(
                BinOp::Add,
                Box::new(num(1.0)),
                Box::new(Expr::Binary(BinOp::Mul, Box::new(num(2.0)), Box::new(num(3.0))))
            )
        );
    }

    #[test]
    fn operator_continues_across_lines() {
        assert_eq!(
            one_expr("\n1 +\n1"),
            Expr::Binary(BinOp::Add, Box::new(num(1.0)), Box::new(num(1.0)))
        );
    }

    #[test]
    fn newline_separates_statements() {
        let stmts = parse_program("x = 1\ny = 2").unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn same_line_needs_semicolon() {
        assert!(matches!(parse_program("1 2"), Err(ParseError::Unexpected(_))));
        assert_eq!(parse_program("1; 2").unwrap().len(), 2);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            one_expr(r#""a\"b\n""#),
            Expr::Literal(Value::Str("a\"b\n".into()))
        );
        assert_eq!(one_expr("'it\\'s'"), Expr::Literal(Value::Str("it's".into())));
    }

    #[test]
    fn calls_methods_and_members() {
        assert_eq!(
            one_expr("f(1, 'x')"),
            Expr::Call("f".into(), vec![num(1.0), Expr::Literal("x".into())])
        );
        assert!(matches!(one_expr("s.trim()"), Expr::Method(_, ref m, _) if m == "trim"));
        assert!(matches!(one_expr("l.length"), Expr::Index(..)));
        assert!(matches!(one_expr("l[0]"), Expr::Index(..)));
    }

    #[test]
    fn hex_and_exponent() {
        assert_eq!(one_expr("0x40"), num(64.0));
        assert_eq!(one_expr("1.5e2"), num(150.0));
        assert_eq!(one_expr(".5"), num(0.5));
    }

    #[test]
    fn compound_assignment() {
        assert_eq!(
            one_expr("flags ^= 0x40"),
            Expr::Assign("flags".into(), AssignOp::BitXor, Box::new(num(64.0)))
        );
    }

    #[test]
    fn let_if_and_blocks() {
        let stmts = parse_program("let a = 1, b\nif (a) { b = 2 } else b = 3").unwrap();
        assert!(matches!(stmts[0], Stmt::Let(ref d) if d.len() == 2));
        assert!(matches!(stmts[1], Stmt::If(_, _, Some(_))));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(one_expr("1 // one\n"), num(1.0));
        assert_eq!(one_expr("/* x */ 2"), num(2.0));
    }

    #[test]
    fn incomplete_inputs() {
        for src in [
            "1 +",
            "\n1 +",
            "f(",
            "[1, 2",
            "\"open",
            "'open\\",
            "if (x)",
            "{ a = 1",
            "/* comment",
            "a ?",
            "let x =",
            "a.",
        ] {
            assert!(!is_complete(src), "{src:?} should be incomplete");
        }
    }

    #[test]
    fn complete_inputs() {
        for src in ["", "1", "\n1 +\n1", "f()", "[]", "x = 'a'", "}", "1 2", "'a\n'"] {
            assert!(is_complete(src), "{src:?} should be complete");
        }
    }

    #[test]
    fn parse_expr_rejects_trailing_tokens() {
        assert!(parse_expr("1 + 2").is_ok());
        assert!(parse_expr("1 + 2;").is_err());
    }

    #[test]
    fn object_literal_in_expression_position() {
        let e = parse_expr("{ hue: 240, 'sat': 0.5 }").unwrap();
        assert!(matches!(e, Expr::Object(ref f) if f.len() == 2 && f[1].0 == "sat"));
        assert!(!is_complete("x = { hue: 240"));
    }

    #[test]
    fn reserved_words_not_assignable() {
        assert!(parse_program("null = 1").is_err());
    }

    #[test]
    fn nesting_is_bounded() {
        let ok = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert!(parse_program(&ok).is_ok());

        let too_much = ParseError::Unexpected("too much recursion".into());
        let parens = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
        assert_eq!(parse_program(&parens), Err(too_much.clone()));
        assert_eq!(parse_program(&"!".repeat(100_000)), Err(too_much.clone()));
        assert_eq!(parse_program(&"{".repeat(1000)), Err(too_much));
        assert!(is_complete(&"[".repeat(100_000)));
    }
}
