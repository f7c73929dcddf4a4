//! A small hand-rolled recursive-descent parser for the reference binary's
//! source syntax, implementing `frst::Parser` so `Importer` and this
//! binary's own file-execution path can turn `.frst` source text into
//! statements.
//!
//! As with [`crate::lexer`], the concrete grammar here is not part of the
//! evaluator's contract: it exists only so the binary runs end to end.

use std::rc::Rc;

use frst::{BinOp, Expr, Stmt, UnOp, Value};

use crate::lexer::{tokenize, Spanned, Token};

pub struct FrstParser;

impl frst::Parser for FrstParser {
    fn parse_module(&self, source: &str, module_name: &str) -> Result<Vec<Stmt>, String> {
        parse_program(source).map_err(|e| format!("module '{module_name}': {e}"))
    }
}

pub fn parse_program(source: &str) -> Result<Vec<Stmt>, String> {
    let tokens = tokenize(source)?;
    let mut p = Parser { tokens, pos: 0 };
    let mut stmts = Vec::new();
    while !p.at(Token::Eof) {
        stmts.push(p.statement()?);
        while p.eat(&Token::Semicolon) {}
    }
    Ok(stmts)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

type PResult<T> = Result<T, String>;

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn line(&self) -> usize {
        self.tokens[self.pos].line
    }

    fn at(&self, t: Token) -> bool {
        *self.peek() == t
    }

    fn at_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s == name)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, t: &Token) -> bool {
        if self.peek() == t {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self, name: &str) -> bool {
        if self.at_ident(name) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, t: Token) -> PResult<()> {
        if self.eat(&t) {
            Ok(())
        } else {
            Err(format!("line {}: expected {:?}, found {:?}", self.line(), t, self.peek()))
        }
    }

    fn expect_ident(&mut self) -> PResult<Rc<str>> {
        match self.advance() {
            Token::Ident(s) => Ok(Rc::from(s.as_str())),
            other => Err(format!("line {}: expected identifier, found {other:?}", self.line())),
        }
    }

    // ---- statements ----

    fn statement(&mut self) -> PResult<Stmt> {
        let export = self.eat_ident("export");
        if self.eat_ident("let") {
            return self.let_statement(export);
        }
        if export {
            return Err(format!("line {}: 'export' must be followed by 'let'", self.line()));
        }
        Ok(Stmt::Expr(self.expr()?))
    }

    fn let_statement(&mut self, export: bool) -> PResult<Stmt> {
        if self.at(Token::LBracket) {
            let (names, rest) = self.array_pattern()?;
            self.expect(Token::Eq)?;
            let value = self.expr()?;
            return Ok(Stmt::array_destructure(names, rest, value, export));
        }
        if self.at(Token::LBrace) {
            let bindings = self.map_pattern()?;
            self.expect(Token::Eq)?;
            let value = self.expr()?;
            return Ok(Stmt::map_destructure(bindings, value, export));
        }
        let name = self.expect_ident()?;
        self.expect(Token::Eq)?;
        let value = self.expr()?;
        Ok(Stmt::define(name, value, export))
    }

    fn array_pattern(&mut self) -> PResult<(Vec<Rc<str>>, Option<Rc<str>>)> {
        self.expect(Token::LBracket)?;
        let mut names = Vec::new();
        let mut rest = None;
        while !self.at(Token::RBracket) {
            if self.eat(&Token::Ellipsis) {
                rest = Some(self.expect_ident()?);
                break;
            }
            names.push(self.expect_ident()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBracket)?;
        Ok((names, rest))
    }

    fn map_pattern(&mut self) -> PResult<Vec<(Value, Rc<str>)>> {
        self.expect(Token::LBrace)?;
        let mut bindings = Vec::new();
        while !self.at(Token::RBrace) {
            let key = self.expect_ident()?;
            let binding_name = if self.eat(&Token::Colon) { self.expect_ident()? } else { Rc::clone(&key) };
            bindings.push((Value::string(key.as_ref()), binding_name));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace)?;
        Ok(bindings)
    }

    // ---- expressions, loosest to tightest ----

    fn expr(&mut self) -> PResult<Expr> {
        if self.at_ident("if") {
            return self.if_expr();
        }
        if self.at_ident("fn") {
            return self.lambda_expr();
        }
        self.or_expr()
    }

    fn if_expr(&mut self) -> PResult<Expr> {
        self.advance(); // "if"
        self.if_body()
    }

    /// Parses everything after the `if`/`elif` keyword: `cond { then } ...`.
    /// `elif` recurses here directly rather than re-reading itself as `if`.
    fn if_body(&mut self) -> PResult<Expr> {
        let cond = self.or_expr()?;
        self.expect(Token::LBrace)?;
        let then_branch = self.expr()?;
        self.expect(Token::RBrace)?;
        let else_branch = if self.eat_ident("elif") {
            Some(Box::new(self.if_body()?))
        } else if self.eat_ident("else") {
            self.expect(Token::LBrace)?;
            let branch = self.expr()?;
            self.expect(Token::RBrace)?;
            Some(Box::new(branch))
        } else {
            None
        };
        Ok(Expr::if_expr(cond, then_branch, else_branch.map(|b| *b)))
    }

    fn lambda_expr(&mut self) -> PResult<Expr> {
        self.advance(); // "fn"
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        let mut vararg = None;
        while !self.at(Token::RParen) {
            if self.eat(&Token::Ellipsis) {
                vararg = Some(self.expect_ident()?);
                break;
            }
            params.push(self.expect_ident()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;
        self.expect(Token::LBrace)?;
        let mut body = Vec::new();
        loop {
            if self.at(Token::RBrace) {
                return Err(format!("line {}: lambda body must end in an expression", self.line()));
            }
            let before = self.pos;
            let stmt = self.statement()?;
            while self.eat(&Token::Semicolon) {}
            if self.at(Token::RBrace) {
                // Reparse the final statement as a bare expression: the
                // grammar doesn't distinguish `expr` from `expr_stmt` until
                // here, where the contract (§4.F) requires the last
                // statement to be `Stmt::Expr`.
                self.pos = before;
                let final_expr = self.expr()?;
                while self.eat(&Token::Semicolon) {}
                self.expect(Token::RBrace)?;
                return Expr::lambda(params, vararg, {
                    body.push(Stmt::Expr(final_expr));
                    body
                })
                .map_err(|e| e.message().to_owned());
            }
            body.push(stmt);
        }
    }

    fn or_expr(&mut self) -> PResult<Expr> {
        let mut lhs = self.and_expr()?;
        while self.eat_ident("or") {
            let rhs = self.and_expr()?;
            lhs = Expr::binop(lhs, BinOp::Or, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> PResult<Expr> {
        let mut lhs = self.equality_expr()?;
        while self.eat_ident("and") {
            let rhs = self.equality_expr()?;
            lhs = Expr::binop(lhs, BinOp::And, rhs);
        }
        Ok(lhs)
    }

    fn equality_expr(&mut self) -> PResult<Expr> {
        let mut lhs = self.relational_expr()?;
        loop {
            let op = if self.eat(&Token::EqEq) {
                BinOp::Eq
            } else if self.eat(&Token::NotEq) {
                BinOp::NotEq
            } else {
                break;
            };
            let rhs = self.relational_expr()?;
            lhs = Expr::binop(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn relational_expr(&mut self) -> PResult<Expr> {
        let mut lhs = self.additive_expr()?;
        loop {
            let op = if self.eat(&Token::Lt) {
                BinOp::Lt
            } else if self.eat(&Token::Le) {
                BinOp::Le
            } else if self.eat(&Token::Gt) {
                BinOp::Gt
            } else if self.eat(&Token::Ge) {
                BinOp::Ge
            } else {
                break;
            };
            let rhs = self.additive_expr()?;
            lhs = Expr::binop(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn additive_expr(&mut self) -> PResult<Expr> {
        let mut lhs = self.multiplicative_expr()?;
        loop {
            let op = if self.eat(&Token::Plus) {
                BinOp::Add
            } else if self.eat(&Token::Minus) {
                BinOp::Sub
            } else {
                break;
            };
            let rhs = self.multiplicative_expr()?;
            lhs = Expr::binop(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn multiplicative_expr(&mut self) -> PResult<Expr> {
        let mut lhs = self.unary_expr()?;
        loop {
            let op = if self.eat(&Token::Star) {
                BinOp::Mul
            } else if self.eat(&Token::Slash) {
                BinOp::Div
            } else if self.eat(&Token::Percent) {
                BinOp::Mod
            } else {
                break;
            };
            let rhs = self.unary_expr()?;
            lhs = Expr::binop(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn unary_expr(&mut self) -> PResult<Expr> {
        if self.eat_ident("not") {
            return Ok(Expr::unop(UnOp::Not, self.unary_expr()?));
        }
        if self.eat(&Token::Minus) {
            return Ok(Expr::unop(UnOp::Neg, self.unary_expr()?));
        }
        self.postfix_expr()
    }

    fn postfix_expr(&mut self) -> PResult<Expr> {
        let mut expr = self.primary_expr()?;
        loop {
            if self.eat(&Token::LParen) {
                let mut args = Vec::new();
                while !self.at(Token::RParen) {
                    args.push(self.expr()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RParen)?;
                expr = Expr::call(expr, args);
            } else if self.eat(&Token::LBracket) {
                let index = self.expr()?;
                self.expect(Token::RBracket)?;
                expr = Expr::index(expr, index);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary_expr(&mut self) -> PResult<Expr> {
        match self.peek().clone() {
            Token::Int(n) => {
                self.advance();
                Ok(Expr::literal(Value::Int(n)))
            }
            Token::Float(f) => {
                self.advance();
                Ok(Expr::literal(Value::Float(f)))
            }
            Token::Str(s) => {
                self.advance();
                Expr::format_string(&s).map_err(|e| e.message().to_owned())
            }
            Token::Ident(name) => {
                self.advance();
                match name.as_str() {
                    "true" => Ok(Expr::literal(Value::Bool(true))),
                    "false" => Ok(Expr::literal(Value::Bool(false))),
                    "null" => Ok(Expr::literal(Value::Null)),
                    _ => Ok(Expr::name_lookup(name.as_str())),
                }
            }
            Token::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.at(Token::RBracket) {
                    items.push(self.expr()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBracket)?;
                Ok(Expr::array_constructor(items))
            }
            Token::LBrace => {
                self.advance();
                let mut pairs = Vec::new();
                while !self.at(Token::RBrace) {
                    let key = self.expr()?;
                    self.expect(Token::Colon)?;
                    let value = self.expr()?;
                    pairs.push((key, value));
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBrace)?;
                Ok(Expr::map_constructor(pairs))
            }
            other => Err(format!("line {}: unexpected token {other:?}", self.line())),
        }
    }
}
