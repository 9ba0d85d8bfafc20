//! Type checking: a second walk over function bodies. Each expression's
//! type is computed bottom-up and returned by the checker; `Type::Error`
//! marks an expression that already produced a message, and any node that
//! sees an `Error` operand goes quiet instead of piling on.

use log::debug;

use crate::ast::*;
use crate::lex::Span;
use crate::report::Reporter;
use crate::symtab::{SymKind, Symbols};
use crate::types::Type;

pub fn check(prog: &Program, syms: &Symbols, reporter: &mut Reporter) {
    let mut c = Checker { syms, reporter };
    for decl in &prog.decls {
        if let Decl::Fn(fd) = decl {
            let ret = fd.ret.ty();
            c.block(&fd.body, &ret);
        }
    }
    debug!("type checking done, {} error(s)", c.reporter.error_count());
}

struct Checker<'a> {
    syms: &'a Symbols,
    reporter: &'a mut Reporter,
}

impl<'a> Checker<'a> {
    fn block(&mut self, b: &Block, ret: &Type) {
        for st in &b.stmts {
            self.stmt(st, ret);
        }
    }

    fn stmt(&mut self, st: &Stmt, ret: &Type) {
        match st {
            Stmt::Assign(a) => {
                self.assign(a);
            }
            Stmt::PostInc(loc) | Stmt::PostDec(loc) => {
                let ty = self.loc(loc);
                if !ty.is_error() && !ty.is_int() {
                    self.reporter.fatal(
                        loc.span(),
                        "Arithmetic operator applied to non-numeric operand",
                    );
                }
            }
            Stmt::Read(loc) => {
                let ty = self.loc(loc);
                if ty.is_fn() {
                    self.reporter.fatal(loc.span(), "Attempt to read a function");
                }
                if ty.is_struct() {
                    self.reporter
                        .fatal(loc.span(), "Attempt to read a struct variable");
                }
                if ty.is_struct_def() {
                    self.reporter
                        .fatal(loc.span(), "Attempt to read a struct name");
                }
            }
            Stmt::Write(e) => {
                let ty = self.exp(e);
                if ty.is_fn() {
                    self.reporter.fatal(e.span(), "Attempt to write a function");
                }
                if ty.is_void() {
                    self.reporter.fatal(e.span(), "Attempt to write void");
                }
                if ty.is_struct() {
                    self.reporter
                        .fatal(e.span(), "Attempt to write a struct variable");
                }
                if ty.is_struct_def() {
                    self.reporter
                        .fatal(e.span(), "Attempt to write a struct name");
                }
            }
            Stmt::If { cond, then } => {
                let ty = self.exp(cond);
                if !ty.is_error() && !ty.is_bool() {
                    self.reporter
                        .fatal(cond.span(), "Non-bool expression used as an if condition");
                }
                self.block(then, ret);
            }
            Stmt::IfElse { cond, then, els } => {
                let ty = self.exp(cond);
                if !ty.is_error() && !ty.is_bool() {
                    self.reporter
                        .fatal(cond.span(), "Non-bool expression used as an if condition");
                }
                self.block(then, ret);
                self.block(els, ret);
            }
            Stmt::While { cond, body } => {
                let ty = self.exp(cond);
                if !ty.is_error() && !ty.is_bool() {
                    self.reporter
                        .fatal(cond.span(), "Non-bool expression used as a while condition");
                }
                self.block(body, ret);
            }
            Stmt::Repeat { count, body } => {
                let ty = self.exp(count);
                if !ty.is_error() && !ty.is_int() {
                    self.reporter.fatal(
                        count.span(),
                        "Non-integer expression used as a repeat clause",
                    );
                }
                self.block(body, ret);
            }
            Stmt::Call(c) => {
                self.call(c);
            }
            Stmt::Return { exp, .. } => match exp {
                None => {
                    if !ret.is_void() {
                        self.reporter
                            .fatal(Span { line: 0, col: 0 }, "Missing return value");
                    }
                }
                Some(e) => {
                    let ty = self.exp(e);
                    if ret.is_void() {
                        self.reporter
                            .fatal(e.span(), "Return with a value in a void function");
                    } else if !ty.is_error() && ty != *ret {
                        self.reporter.fatal(e.span(), "Bad return value");
                    }
                }
            },
        }
    }

    fn exp(&mut self, e: &Exp) -> Type {
        match e {
            Exp::IntLit(..) => Type::Int,
            Exp::StrLit(..) => Type::Str,
            Exp::True(_) | Exp::False(_) => Type::Bool,
            Exp::Loc(l) => self.loc(l),
            Exp::Assign(a) => self.assign(a),
            Exp::Call(c) => self.call(c),
            Exp::Unary(UnOp::Neg, inner) => {
                let ty = self.exp(inner);
                if ty.is_error() {
                    return Type::Error;
                }
                if !ty.is_int() {
                    self.reporter.fatal(
                        inner.span(),
                        "Arithmetic operator applied to non-numeric operand",
                    );
                    return Type::Error;
                }
                Type::Int
            }
            Exp::Unary(UnOp::Not, inner) => {
                let ty = self.exp(inner);
                if ty.is_error() {
                    return Type::Error;
                }
                if !ty.is_bool() {
                    self.reporter
                        .fatal(inner.span(), "Logical operator applied to non-bool operand");
                    return Type::Error;
                }
                Type::Bool
            }
            Exp::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs),
        }
    }

    fn binary(&mut self, op: BinOp, lhs: &Exp, rhs: &Exp) -> Type {
        let t1 = self.exp(lhs);
        let t2 = self.exp(rhs);
        if t1.is_error() || t2.is_error() {
            return Type::Error;
        }

        if op.is_arith() {
            let mut ok = true;
            if !t1.is_int() {
                self.reporter.fatal(
                    lhs.span(),
                    "Arithmetic operator applied to non-numeric operand",
                );
                ok = false;
            }
            if !t2.is_int() {
                self.reporter.fatal(
                    rhs.span(),
                    "Arithmetic operator applied to non-numeric operand",
                );
                ok = false;
            }
            return if ok { Type::Int } else { Type::Error };
        }

        if op.is_logical() {
            let mut ok = true;
            if !t1.is_bool() {
                self.reporter
                    .fatal(lhs.span(), "Logical operator applied to non-bool operand");
                ok = false;
            }
            if !t2.is_bool() {
                self.reporter
                    .fatal(rhs.span(), "Logical operator applied to non-bool operand");
                ok = false;
            }
            return if ok { Type::Bool } else { Type::Error };
        }

        if op.is_relational() {
            let mut ok = true;
            if !t1.is_int() {
                self.reporter.fatal(
                    lhs.span(),
                    "Relational operator applied to non-numeric operand",
                );
                ok = false;
            }
            if !t2.is_int() {
                self.reporter.fatal(
                    rhs.span(),
                    "Relational operator applied to non-numeric operand",
                );
                ok = false;
            }
            return if ok { Type::Bool } else { Type::Error };
        }

        // equality: == and !=
        let mut ok = true;
        if t1 != t2 {
            self.reporter.fatal(lhs.span(), "Type mismatch");
            ok = false;
        }
        if t1.is_fn() && t2.is_fn() {
            self.reporter
                .fatal(lhs.span(), "Equality operator applied to functions");
            ok = false;
        }
        if t1.is_void() && t2.is_void() {
            self.reporter
                .fatal(lhs.span(), "Equality operator applied to void functions");
            ok = false;
        }
        if t1.is_struct() && t2.is_struct() {
            self.reporter
                .fatal(lhs.span(), "Equality operator applied to struct variables");
            ok = false;
        }
        if t1.is_struct_def() && t2.is_struct_def() {
            self.reporter
                .fatal(lhs.span(), "Equality operator applied to struct names");
            ok = false;
        }
        if ok {
            Type::Bool
        } else {
            Type::Error
        }
    }

    fn assign(&mut self, a: &Assign) -> Type {
        let t1 = self.loc(&a.lhs);
        let t2 = self.exp(&a.rhs);
        if t1.is_error() || t2.is_error() {
            return Type::Error;
        }

        let span = a.lhs.span();
        let mut ok = true;
        if t1 != t2 {
            self.reporter.fatal(span, "Type mismatch");
            ok = false;
        }
        if t1.is_fn() && t2.is_fn() {
            self.reporter.fatal(span, "Function assignment");
            ok = false;
        }
        if t1.is_struct_def() && t2.is_struct_def() {
            self.reporter.fatal(span, "Struct name assignment");
            ok = false;
        }
        if t1.is_struct() && t2.is_struct() {
            self.reporter.fatal(span, "Struct variable assignment");
            ok = false;
        }
        if ok {
            t1
        } else {
            Type::Error
        }
    }

    fn call(&mut self, c: &Call) -> Type {
        let arg_types: Vec<Type> = c.args.iter().map(|a| self.exp(a)).collect();

        let Some(sym) = c.id.sym else {
            // undeclared callee, already reported
            return Type::Error;
        };
        let SymKind::Fn(fn_sym) = &self.syms.get(sym).kind else {
            self.reporter
                .fatal(c.id.span, "Attempt to call a non-function");
            return Type::Error;
        };

        if fn_sym.num_params != c.args.len() {
            self.reporter
                .fatal(c.id.span, "Function call with wrong number of args");
        } else {
            for ((formal, actual), arg) in fn_sym.params.iter().zip(&arg_types).zip(&c.args) {
                if !actual.is_error() && actual != formal {
                    self.reporter
                        .fatal(arg.span(), "Type of actual does not match type of formal");
                }
            }
        }
        fn_sym.ret.clone()
    }

    fn loc(&mut self, loc: &Loc) -> Type {
        match loc {
            Loc::Id(id) => match id.sym {
                Some(sym) => self.syms.get(sym).ty.clone(),
                None => Type::Error,
            },
            Loc::Dot(d) => {
                if d.bad {
                    return Type::Error;
                }
                match d.field.sym {
                    Some(sym) => self.syms.get(sym).ty.clone(),
                    None => Type::Error,
                }
            }
        }
    }
}
