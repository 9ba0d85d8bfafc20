use crate::ast::*;
use crate::lex::{Kw, Span, TokKind, Token};

#[derive(Debug)]
pub struct ParseError {
    pub span: Span,
    pub msg: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.span.line, self.span.col, self.msg)
    }
}
impl std::error::Error for ParseError {}

fn perr(span: Span, msg: impl Into<String>) -> ParseError {
    ParseError {
        span,
        msg: msg.into(),
    }
}

/// Parse a whole program. There is no recovery: the first syntax error
/// aborts, and the later phases never see a partial tree.
pub fn parse(tokens: &[Token]) -> Result<Program, ParseError> {
    let mut p = Parser { tokens, i: 0 };
    let mut decls = Vec::new();
    while !p.at_eof() {
        decls.push(p.parse_decl()?);
    }
    Ok(Program { decls })
}

struct Parser<'a> {
    tokens: &'a [Token],
    i: usize,
}

impl<'a> Parser<'a> {
    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokKind::Eof)
    }

    fn peek(&self) -> &'a Token {
        self.tokens
            .get(self.i)
            .unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn peek_n(&self, n: usize) -> &'a Token {
        self.tokens
            .get(self.i + n)
            .unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn next(&mut self) -> &'a Token {
        let t = self.peek();
        self.i = (self.i + 1).min(self.tokens.len());
        t
    }

    fn eat_if(&mut self, kind: &TokKind) -> bool {
        if &self.peek().kind == kind {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokKind) -> Result<Span, ParseError> {
        let t = self.peek();
        if t.kind == kind {
            let s = t.span;
            self.next();
            Ok(s)
        } else {
            Err(perr(
                t.span,
                format!("expected {:?}, got {:?}", kind, t.kind),
            ))
        }
    }

    fn take_ident(&mut self) -> Result<Id, ParseError> {
        let t = self.peek();
        match &t.kind {
            TokKind::Ident(s) => {
                let id = Id::new(s.clone(), t.span);
                self.next();
                Ok(id)
            }
            _ => Err(perr(
                t.span,
                format!("expected identifier, got {:?}", t.kind),
            )),
        }
    }

    fn starts_type(&self) -> bool {
        matches!(
            self.peek().kind,
            TokKind::Kw(Kw::Int) | TokKind::Kw(Kw::Bool) | TokKind::Kw(Kw::Void) | TokKind::Kw(Kw::Struct)
        )
    }

    fn parse_type(&mut self) -> Result<TypeNode, ParseError> {
        let t = self.peek();
        let node = match t.kind {
            TokKind::Kw(Kw::Int) => TypeNode::Int(t.span),
            TokKind::Kw(Kw::Bool) => TypeNode::Bool(t.span),
            TokKind::Kw(Kw::Void) => TypeNode::Void(t.span),
            TokKind::Kw(Kw::Struct) => {
                self.next();
                return Ok(TypeNode::Struct(self.take_ident()?));
            }
            _ => return Err(perr(t.span, format!("expected a type, got {:?}", t.kind))),
        };
        self.next();
        Ok(node)
    }

    fn parse_decl(&mut self) -> Result<Decl, ParseError> {
        // `struct Id {` opens a struct definition; `struct Id Id` is a
        // variable of struct type.
        if matches!(self.peek().kind, TokKind::Kw(Kw::Struct))
            && matches!(self.peek_n(1).kind, TokKind::Ident(_))
            && matches!(self.peek_n(2).kind, TokKind::LBrace)
        {
            return Ok(Decl::Struct(self.parse_struct_decl()?));
        }

        let ty = self.parse_type()?;
        let id = self.take_ident()?;
        if matches!(self.peek().kind, TokKind::LParen) {
            Ok(Decl::Fn(self.parse_fn_decl(ty, id)?))
        } else {
            self.expect(TokKind::Semi)?;
            Ok(Decl::Var(VarDecl { ty, id }))
        }
    }

    fn parse_struct_decl(&mut self) -> Result<StructDecl, ParseError> {
        self.next(); // struct
        let id = self.take_ident()?;
        self.expect(TokKind::LBrace)?;
        let mut fields = Vec::new();
        while !matches!(self.peek().kind, TokKind::RBrace) {
            let ty = self.parse_type()?;
            let fid = self.take_ident()?;
            self.expect(TokKind::Semi)?;
            fields.push(VarDecl { ty, id: fid });
        }
        self.expect(TokKind::RBrace)?;
        self.expect(TokKind::Semi)?;
        Ok(StructDecl { id, fields })
    }

    fn parse_fn_decl(&mut self, ret: TypeNode, id: Id) -> Result<FnDecl, ParseError> {
        self.expect(TokKind::LParen)?;
        let mut formals = Vec::new();
        if !matches!(self.peek().kind, TokKind::RParen) {
            loop {
                let ty = self.parse_type()?;
                let fid = self.take_ident()?;
                formals.push(FormalDecl { ty, id: fid });
                if !self.eat_if(&TokKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokKind::RParen)?;
        let body = self.parse_block()?;
        Ok(FnDecl {
            ret,
            id,
            formals,
            body,
        })
    }

    /// `{ decls stmts }` — declarations come first, as the grammar requires.
    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.expect(TokKind::LBrace)?;
        let mut decls = Vec::new();
        while self.starts_type() {
            let ty = self.parse_type()?;
            let id = self.take_ident()?;
            self.expect(TokKind::Semi)?;
            decls.push(VarDecl { ty, id });
        }
        let mut stmts = Vec::new();
        while !matches!(self.peek().kind, TokKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokKind::RBrace)?;
        Ok(Block { decls, stmts })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let t = self.peek();
        match &t.kind {
            TokKind::Kw(Kw::Cin) => {
                self.next();
                self.expect(TokKind::Read)?;
                let loc = self.parse_loc()?;
                self.expect(TokKind::Semi)?;
                Ok(Stmt::Read(loc))
            }
            TokKind::Kw(Kw::Cout) => {
                self.next();
                self.expect(TokKind::Write)?;
                let exp = self.parse_exp()?;
                self.expect(TokKind::Semi)?;
                Ok(Stmt::Write(exp))
            }
            TokKind::Kw(Kw::If) => {
                self.next();
                self.expect(TokKind::LParen)?;
                let cond = self.parse_exp()?;
                self.expect(TokKind::RParen)?;
                let then = self.parse_block()?;
                if self.eat_if(&TokKind::Kw(Kw::Else)) {
                    let els = self.parse_block()?;
                    Ok(Stmt::IfElse { cond, then, els })
                } else {
                    Ok(Stmt::If { cond, then })
                }
            }
            TokKind::Kw(Kw::While) => {
                self.next();
                self.expect(TokKind::LParen)?;
                let cond = self.parse_exp()?;
                self.expect(TokKind::RParen)?;
                let body = self.parse_block()?;
                Ok(Stmt::While { cond, body })
            }
            TokKind::Kw(Kw::Repeat) => {
                self.next();
                self.expect(TokKind::LParen)?;
                let count = self.parse_exp()?;
                self.expect(TokKind::RParen)?;
                let body = self.parse_block()?;
                Ok(Stmt::Repeat { count, body })
            }
            TokKind::Kw(Kw::Return) => {
                let span = t.span;
                self.next();
                let exp = if matches!(self.peek().kind, TokKind::Semi) {
                    None
                } else {
                    Some(self.parse_exp()?)
                };
                self.expect(TokKind::Semi)?;
                Ok(Stmt::Return { exp, span })
            }
            TokKind::Ident(_) => {
                if matches!(self.peek_n(1).kind, TokKind::LParen) {
                    let call = self.parse_call()?;
                    self.expect(TokKind::Semi)?;
                    return Ok(Stmt::Call(call));
                }
                let loc = self.parse_loc()?;
                let t = self.peek();
                match t.kind {
                    TokKind::Assign => {
                        self.next();
                        let rhs = self.parse_exp()?;
                        self.expect(TokKind::Semi)?;
                        Ok(Stmt::Assign(Assign { lhs: loc, rhs }))
                    }
                    TokKind::PlusPlus => {
                        self.next();
                        self.expect(TokKind::Semi)?;
                        Ok(Stmt::PostInc(loc))
                    }
                    TokKind::MinusMinus => {
                        self.next();
                        self.expect(TokKind::Semi)?;
                        Ok(Stmt::PostDec(loc))
                    }
                    _ => Err(perr(
                        t.span,
                        format!("expected =, ++, or -- after location, got {:?}", t.kind),
                    )),
                }
            }
            _ => Err(perr(
                t.span,
                format!("expected a statement, got {:?}", t.kind),
            )),
        }
    }

    fn parse_call(&mut self) -> Result<Call, ParseError> {
        let id = self.take_ident()?;
        self.expect(TokKind::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.peek().kind, TokKind::RParen) {
            loop {
                args.push(self.parse_exp()?);
                if !self.eat_if(&TokKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokKind::RParen)?;
        Ok(Call { id, args })
    }

    fn parse_loc(&mut self) -> Result<Loc, ParseError> {
        let mut loc = Loc::Id(self.take_ident()?);
        while self.eat_if(&TokKind::Dot) {
            let field = self.take_ident()?;
            loc = Loc::Dot(Box::new(Dot {
                loc,
                field,
                struct_sym: None,
                bad: false,
            }));
        }
        Ok(loc)
    }

    /// Assignment is an expression and associates to the right; its
    /// left-hand side must be a location.
    fn parse_exp(&mut self) -> Result<Exp, ParseError> {
        let lhs = self.parse_or()?;
        if matches!(self.peek().kind, TokKind::Assign) {
            let span = self.peek().span;
            self.next();
            let loc = match lhs {
                Exp::Loc(l) => l,
                _ => {
                    return Err(perr(
                        span,
                        "left-hand side of assignment is not a variable",
                    ))
                }
            };
            let rhs = self.parse_exp()?;
            return Ok(Exp::Assign(Box::new(Assign { lhs: loc, rhs })));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Exp, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.eat_if(&TokKind::OrOr) {
            let rhs = self.parse_and()?;
            lhs = Exp::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Exp, ParseError> {
        let mut lhs = self.parse_equality()?;
        while self.eat_if(&TokKind::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = Exp::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // equality and relational operators are non-associative: at most one per
    // level, so `a < b < c` is a syntax error at the second `<`
    fn parse_equality(&mut self) -> Result<Exp, ParseError> {
        let lhs = self.parse_relational()?;
        let op = match self.peek().kind {
            TokKind::EqEq => BinOp::Eq,
            TokKind::NotEq => BinOp::NotEq,
            _ => return Ok(lhs),
        };
        self.next();
        let rhs = self.parse_relational()?;
        Ok(Exp::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_relational(&mut self) -> Result<Exp, ParseError> {
        let lhs = self.parse_additive()?;
        let op = match self.peek().kind {
            TokKind::Lt => BinOp::Lt,
            TokKind::Gt => BinOp::Gt,
            TokKind::LtEq => BinOp::LtEq,
            TokKind::GtEq => BinOp::GtEq,
            _ => return Ok(lhs),
        };
        self.next();
        let rhs = self.parse_additive()?;
        Ok(Exp::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_additive(&mut self) -> Result<Exp, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokKind::Plus => BinOp::Plus,
                TokKind::Minus => BinOp::Minus,
                _ => return Ok(lhs),
            };
            self.next();
            let rhs = self.parse_multiplicative()?;
            lhs = Exp::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Exp, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokKind::Star => BinOp::Times,
                TokKind::Slash => BinOp::Divide,
                _ => return Ok(lhs),
            };
            self.next();
            let rhs = self.parse_unary()?;
            lhs = Exp::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Exp, ParseError> {
        match self.peek().kind {
            TokKind::Minus => {
                self.next();
                let e = self.parse_unary()?;
                Ok(Exp::Unary(UnOp::Neg, Box::new(e)))
            }
            TokKind::Not => {
                self.next();
                let e = self.parse_unary()?;
                Ok(Exp::Unary(UnOp::Not, Box::new(e)))
            }
            _ => self.parse_term(),
        }
    }

    fn parse_term(&mut self) -> Result<Exp, ParseError> {
        let t = self.peek();
        match &t.kind {
            TokKind::IntLit(v) => {
                let e = Exp::IntLit(*v, t.span);
                self.next();
                Ok(e)
            }
            TokKind::StrLit(s) => {
                let e = Exp::StrLit(s.clone(), t.span);
                self.next();
                Ok(e)
            }
            TokKind::Kw(Kw::True) => {
                let e = Exp::True(t.span);
                self.next();
                Ok(e)
            }
            TokKind::Kw(Kw::False) => {
                let e = Exp::False(t.span);
                self.next();
                Ok(e)
            }
            TokKind::LParen => {
                self.next();
                let e = self.parse_exp()?;
                self.expect(TokKind::RParen)?;
                Ok(e)
            }
            TokKind::Ident(_) => {
                if matches!(self.peek_n(1).kind, TokKind::LParen) {
                    Ok(Exp::Call(Box::new(self.parse_call()?)))
                } else {
                    Ok(Exp::Loc(self.parse_loc()?))
                }
            }
            _ => Err(perr(
                t.span,
                format!("expected an expression, got {:?}", t.kind),
            )),
        }
    }
}
