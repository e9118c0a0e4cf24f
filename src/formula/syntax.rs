//! Formula lexer and parser
//!
//! ```text
//! program := stmt*
//! stmt    := "if" expr block ("else" (block | if-stmt))?
//!          | "while" expr block
//!          | IDENT "=" expr ";"?
//!          | expr ";"?
//!          | block
//! block   := "{" stmt* "}"
//! expr    := or
//! or      := and ("||" and)*
//! and     := cmp ("&&" cmp)*
//! cmp     := sum (("<" | "<=" | ">" | ">=" | "==" | "!=") sum)?
//! sum     := term (("+" | "-") term)*
//! term    := unary (("*" | "/" | "%") unary)*
//! unary   := ("-" | "!") unary | power
//! power   := primary ("^" unary)?
//! primary := NUMBER | IDENT | IDENT "(" args? ")" | "(" expr ")"
//! ```
//!
//! `#` and `//` start a comment running to the end of the line.
//!
//! Both stages keep going after an error so one compile reports as many
//! problems as possible.
//!
//! The parser, the compiler and the drop of the syntax tree all recurse once
//! per level of the tree, so the parser rejects anything deeper than
//! [`MAX_NESTING`]. Brackets, calls, unary operators, `^`, blocks and
//! `else if` each add a level, and so does every operator in a flat chain
//! such as `1 + 1 + 1`.

use std::fmt;

/// 1-based source position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub pos: Pos,
    pub message: String,
}

impl SyntaxError {
    fn new(pos: Pos, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.pos.line, self.pos.column, self.message)
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    If,
    Else,
    While,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
    AndAnd,
    OrOr,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(s) => write!(f, "{}", s),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Assign => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Caret => write!(f, "^"),
            Token::Bang => write!(f, "!"),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::EqEq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: Pos,
}

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn here(&self) -> Pos {
        Pos::new(self.line, self.column)
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' || (ch == '/' && self.peek(1) == Some('/')) {
                while let Some(c) = self.current() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<f64, String> {
        let mut text = String::new();
        while let Some(c) = self.current().filter(|c| c.is_ascii_digit() || *c == '.') {
            text.push(c);
            self.advance();
        }
        if let Some(e) = self.current().filter(|c| *c == 'e' || *c == 'E') {
            let sign = self.peek(1).filter(|c| *c == '+' || *c == '-');
            let digit_at = if sign.is_some() { 2 } else { 1 };
            if self.peek(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                text.push(e);
                self.advance();
                if let Some(s) = sign {
                    text.push(s);
                    self.advance();
                }
                while let Some(c) = self.current().filter(|c| c.is_ascii_digit()) {
                    text.push(c);
                    self.advance();
                }
            }
        }
        text.parse::<f64>()
            .map_err(|_| format!("malformed number '{}'", text))
    }

    fn read_ident(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.current().filter(|c| c.is_alphanumeric() || *c == '_') {
            s.push(c);
            self.advance();
        }
        s
    }

    /// Tokenize the whole input, ending with `Eof`
    pub fn tokenize(mut self) -> (Vec<Spanned>, Vec<SyntaxError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        loop {
            self.skip_trivia();
            let pos = self.here();
            let Some(ch) = self.current() else {
                tokens.push(Spanned { token: Token::Eof, pos });
                break;
            };

            let token = if ch.is_ascii_digit()
                || (ch == '.' && self.peek(1).is_some_and(|c| c.is_ascii_digit()))
            {
                match self.read_number() {
                    Ok(n) => Token::Number(n),
                    Err(msg) => {
                        errors.push(SyntaxError::new(pos, msg));
                        continue;
                    }
                }
            } else if ch.is_alphabetic() || ch == '_' {
                match self.read_ident().as_str() {
                    "if" => Token::If,
                    "else" => Token::Else,
                    "while" => Token::While,
                    other => Token::Ident(other.to_string()),
                }
            } else {
                self.advance();
                let paired = match (ch, self.current()) {
                    ('<', Some('=')) => Some(Token::Le),
                    ('>', Some('=')) => Some(Token::Ge),
                    ('=', Some('=')) => Some(Token::EqEq),
                    ('!', Some('=')) => Some(Token::Ne),
                    ('&', Some('&')) => Some(Token::AndAnd),
                    ('|', Some('|')) => Some(Token::OrOr),
                    _ => None,
                };
                if let Some(token) = paired {
                    self.advance();
                    token
                } else {
                    match ch {
                        '(' => Token::LParen,
                        ')' => Token::RParen,
                        '{' => Token::LBrace,
                        '}' => Token::RBrace,
                        ',' => Token::Comma,
                        ';' => Token::Semicolon,
                        '=' => Token::Assign,
                        '+' => Token::Plus,
                        '-' => Token::Minus,
                        '*' => Token::Star,
                        '/' => Token::Slash,
                        '%' => Token::Percent,
                        '^' => Token::Caret,
                        '!' => Token::Bang,
                        '<' => Token::Lt,
                        '>' => Token::Gt,
                        _ => {
                            errors.push(SyntaxError::new(pos, format!("unexpected character '{}'", ch)));
                            continue;
                        }
                    }
                }
            };
            tokens.push(Spanned { token, pos });
        }

        (tokens, errors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),
    Var(String),
    Call { name: String, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    Assign { name: String, value: Expr },
    If { cond: Expr, then: Vec<Stmt>, otherwise: Option<Vec<Stmt>> },
    While { cond: Expr, body: Vec<Stmt> },
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Pos,
}

type ParseResult<T> = Result<T, SyntaxError>;

/// Deepest syntax tree a formula may build
pub const MAX_NESTING: usize = 128;

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).map_or(&Token::Eof, |s| &s.token)
    }

    fn peek(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).map_or(&Token::Eof, |s| &s.token)
    }

    fn here(&self) -> Pos {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or_else(Pos::default, |s| s.pos)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(SyntaxError::new(
                self.here(),
                format!("expected '{}', found '{}'", token, self.current()),
            ))
        }
    }

    /// Go one level deeper, failing past [`MAX_NESTING`]
    fn descend(&mut self, message: &str) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(SyntaxError::new(self.here(), message));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `parse` one level deeper
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.descend("expression nested too deeply")?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Parse statements until end of input, recovering after errors
    pub fn parse_program(&mut self) -> (Vec<Stmt>, Vec<SyntaxError>) {
        let mut stmts = Vec::new();
        let mut errors = Vec::new();

        while *self.current() != Token::Eof {
            let start = self.pos;
            // A failed statement may leave chain levels unreleased
            self.depth = 0;
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    errors.push(e);
                    self.synchronize(start);
                }
            }
        }

        (stmts, errors)
    }

    /// Skip to just past the next `;` or to the next `}` or end of input
    fn synchronize(&mut self, start: usize) {
        if self.pos == start {
            self.advance();
        }
        loop {
            match self.current() {
                Token::Eof => return,
                Token::Semicolon => {
                    self.advance();
                    return;
                }
                Token::RBrace => {
                    self.advance();
                    return;
                }
                _ => self.advance(),
            }
        }
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        let pos = self.here();
        match self.current().clone() {
            Token::If => self.parse_if(),
            Token::While => {
                self.advance();
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                Ok(Stmt {
                    kind: StmtKind::While { cond, body },
                    pos,
                })
            }
            Token::LBrace => {
                let body = self.parse_block()?;
                Ok(Stmt {
                    kind: StmtKind::Block(body),
                    pos,
                })
            }
            Token::Ident(name) if *self.peek(1) == Token::Assign => {
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                self.eat(&Token::Semicolon);
                Ok(Stmt {
                    kind: StmtKind::Assign { name, value },
                    pos,
                })
            }
            _ => {
                let expr = self.parse_expr()?;
                self.eat(&Token::Semicolon);
                Ok(Stmt {
                    kind: StmtKind::Expr(expr),
                    pos,
                })
            }
        }
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let pos = self.here();
        self.expect(Token::If)?;
        let cond = self.parse_expr()?;
        let then = self.parse_block()?;

        let otherwise = if self.eat(&Token::Else) {
            if *self.current() == Token::If {
                Some(vec![self.nested(Self::parse_if)?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then,
                otherwise,
            },
            pos,
        })
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(Token::LBrace)?;
        let stmts = self.nested(|p| {
            let mut stmts = Vec::new();
            while !matches!(p.current(), Token::RBrace | Token::Eof) {
                stmts.push(p.parse_stmt()?);
            }
            Ok(stmts)
        })?;
        self.expect(Token::RBrace)?;
        Ok(stmts)
    }

    /// Account for one more operator in a left-leaning chain
    fn link(&mut self) -> ParseResult<()> {
        self.descend("expression has too many operators")
    }

    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, pos: Pos) -> Expr {
        Expr {
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            pos,
        }
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mark = self.depth;
        let mut lhs = self.parse_and()?;
        while *self.current() == Token::OrOr {
            let pos = self.here();
            self.link()?;
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Self::binary(BinaryOp::Or, lhs, rhs, pos);
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mark = self.depth;
        let mut lhs = self.parse_cmp()?;
        while *self.current() == Token::AndAnd {
            let pos = self.here();
            self.link()?;
            self.advance();
            let rhs = self.parse_cmp()?;
            lhs = Self::binary(BinaryOp::And, lhs, rhs, pos);
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> ParseResult<Expr> {
        let lhs = self.parse_sum()?;
        let op = match self.current() {
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            Token::EqEq => BinaryOp::Eq,
            Token::Ne => BinaryOp::Ne,
            _ => return Ok(lhs),
        };
        let pos = self.here();
        self.advance();
        let rhs = self.parse_sum()?;
        Ok(Self::binary(op, lhs, rhs, pos))
    }

    fn parse_sum(&mut self) -> ParseResult<Expr> {
        let mark = self.depth;
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => {
                    self.depth = mark;
                    return Ok(lhs);
                }
            };
            let pos = self.here();
            self.link()?;
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Self::binary(op, lhs, rhs, pos);
        }
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let mark = self.depth;
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => {
                    self.depth = mark;
                    return Ok(lhs);
                }
            };
            let pos = self.here();
            self.link()?;
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Self::binary(op, lhs, rhs, pos);
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current() {
            Token::Minus => UnaryOp::Neg,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_power(),
        };
        let pos = self.here();
        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            pos,
        })
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_primary()?;
        if *self.current() == Token::Caret {
            let pos = self.here();
            self.advance();
            let exp = self.nested(Self::parse_unary)?;
            return Ok(Self::binary(BinaryOp::Pow, base, exp, pos));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let pos = self.here();
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Number(n),
                    pos,
                })
            }
            Token::Ident(name) => {
                self.advance();
                if !self.eat(&Token::LParen) {
                    return Ok(Expr {
                        kind: ExprKind::Var(name),
                        pos,
                    });
                }
                let args = self.nested(|p| {
                    let mut args = Vec::new();
                    if *p.current() != Token::RParen {
                        loop {
                            args.push(p.parse_expr()?);
                            if !p.eat(&Token::Comma) {
                                break;
                            }
                        }
                    }
                    Ok(args)
                })?;
                self.expect(Token::RParen)?;
                Ok(Expr {
                    kind: ExprKind::Call { name, args },
                    pos,
                })
            }
            Token::LParen => {
                self.advance();
                let inner = self.nested(Self::parse_expr)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(SyntaxError::new(
                pos,
                format!("expected an expression, found '{}'", other),
            )),
        }
    }
}

/// Tokenize and parse `source`
pub fn parse(source: &str) -> (Vec<Stmt>, Vec<SyntaxError>) {
    let (tokens, mut errors) = Lexer::new(source).tokenize();
    let (stmts, parse_errors) = Parser::new(tokens).parse_program();
    errors.extend(parse_errors);
    (stmts, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let (toks, errors) = Lexer::new(src).tokenize();
        assert!(errors.is_empty(), "{:?}", errors);
        toks.into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_lexer_numbers() {
        assert_eq!(
            tokens("1 2.5 .5 1e3 2E-2"),
            vec![
                Token::Number(1.0),
                Token::Number(2.5),
                Token::Number(0.5),
                Token::Number(1000.0),
                Token::Number(0.02),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_operators() {
        assert_eq!(
            tokens("<= < == = != ! && ||"),
            vec![
                Token::Le,
                Token::Lt,
                Token::EqEq,
                Token::Assign,
                Token::Ne,
                Token::Bang,
                Token::AndAnd,
                Token::OrOr,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_comments_and_positions() {
        let (toks, _) = Lexer::new("# note\nx // tail\n  y").tokenize();
        assert_eq!(toks[0].token, Token::Ident("x".into()));
        assert_eq!(toks[0].pos, Pos::new(2, 1));
        assert_eq!(toks[1].token, Token::Ident("y".into()));
        assert_eq!(toks[1].pos, Pos::new(3, 3));
    }

    #[test]
    fn test_lexer_keywords() {
        assert_eq!(
            tokens("if else while iffy"),
            vec![
                Token::If,
                Token::Else,
                Token::While,
                Token::Ident("iffy".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_bad_char() {
        let (toks, errors) = Lexer::new("1 @ 2").tokenize();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].pos, Pos::new(1, 3));
        assert_eq!(toks.len(), 3);
    }

    #[test]
    fn test_precedence() {
        let (stmts, errors) = parse("1 + 2 * 3 ^ 2");
        assert!(errors.is_empty());
        let StmtKind::Expr(expr) = &stmts[0].kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Binary { op, rhs, .. } = &expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        let ExprKind::Binary { op, rhs, .. } = &rhs.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Mul);
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Pow, .. }));
    }

    #[test]
    fn test_power_binds_unary_exponent() {
        let (stmts, errors) = parse("2 ^ -1");
        assert!(errors.is_empty());
        let StmtKind::Expr(expr) = &stmts[0].kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Binary { op: BinaryOp::Pow, rhs, .. } = &expr.kind else {
            panic!("expected pow");
        };
        assert!(matches!(rhs.kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_statements() {
        let src = "
            n = 0
            while n < 3 { circle(n, 0, 1); n = n + 1 }
            if n == 3 { line(0, 0, 1, 1, 0) } else if n > 3 { } else { colour(1, 0, 0) }
        ";
        let (stmts, errors) = parse(src);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[0].kind, StmtKind::Assign { .. }));
        assert!(matches!(stmts[1].kind, StmtKind::While { .. }));
        match &stmts[2].kind {
            StmtKind::If {
                otherwise: Some(else_branch),
                ..
            } => assert!(matches!(else_branch[0].kind, StmtKind::If { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_call_arguments() {
        let (stmts, errors) = parse("f() g(1, 2 + 3)");
        assert!(errors.is_empty());
        assert_eq!(stmts.len(), 2);
        match &stmts[1].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Call { name, args },
                ..
            }) => {
                assert_eq!(name, "g");
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_recovery_reports_each_statement() {
        let (stmts, errors) = parse("x = ;\ny = 2;\nz = (1;\n");
        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert_eq!(errors[0].pos.line, 1);
        assert_eq!(errors[1].pos.line, 3);
        assert!(stmts
            .iter()
            .any(|s| matches!(&s.kind, StmtKind::Assign { name, .. } if name == "y")));
    }

    fn single_error(src: &str) -> SyntaxError {
        let (_, errors) = parse(src);
        assert_eq!(errors.len(), 1, "{:?}", errors);
        errors.into_iter().next().unwrap()
    }

    #[test]
    fn test_nesting_within_limit() {
        let src = format!("x = {}1{}", "(".repeat(100), ")".repeat(100));
        let (stmts, errors) = parse(&src);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(stmts.len(), 1);

        let src = format!("x = 1{}", " + 1".repeat(100));
        assert!(parse(&src).1.is_empty());
    }

    #[test]
    fn test_deep_brackets_rejected() {
        let src = format!("circle(0, 0, {}1{})", "(".repeat(3000), ")".repeat(3000));
        let e = single_error(&src);
        assert_eq!(e.message, "expression nested too deeply");
        assert_eq!(e.pos.line, 1);
    }

    #[test]
    fn test_deep_unary_power_and_calls_rejected() {
        for src in [
            format!("x = {}1", "-".repeat(3000)),
            format!("x = {}2", "2 ^ ".repeat(3000)),
            format!("x = {}1{}", "sin(".repeat(3000), ")".repeat(3000)),
        ] {
            assert_eq!(single_error(&src).message, "expression nested too deeply");
        }
    }

    #[test]
    fn test_deep_blocks_rejected() {
        let blocks = format!("{}x = 1{}", "{ ".repeat(3000), " }".repeat(3000));
        assert!(!parse(&blocks).1.is_empty());

        let chain = format!("if x {{ }}{} else {{ }}", " else if x { }".repeat(3000));
        let (_, errors) = parse(&chain);
        assert_eq!(errors[0].message, "expression nested too deeply");
    }

    #[test]
    fn test_long_operator_chain_rejected() {
        for op in ["+", "*", "&&", "||"] {
            let src = format!("x = 1{}", format!(" {} 1", op).repeat(20_000));
            assert_eq!(single_error(&src).message, "expression has too many operators");
        }
    }

    #[test]
    fn test_nesting_released_between_statements() {
        let stmt = format!("x = 1{}; ", " + 1".repeat(100));
        let (stmts, errors) = parse(&stmt.repeat(50));
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(stmts.len(), 50);
    }

    #[test]
    fn test_recovers_after_deep_statement() {
        let src = format!("x = {}1{};\ny = 2", "(".repeat(500), ")".repeat(500));
        let (stmts, errors) = parse(&src);
        assert_eq!(errors.len(), 1);
        assert!(stmts
            .iter()
            .any(|s| matches!(&s.kind, StmtKind::Assign { name, .. } if name == "y")));
    }
}
