//! Pretty-print the AST back to C-- source. In names mode each identifier
//! occurrence is annotated with its resolved entry, which is what the
//! name-resolution report emits.

use crate::ast::*;
use crate::symtab::Symbols;

pub fn unparse(prog: &Program) -> String {
    Unparser {
        out: String::new(),
        syms: None,
    }
    .program(prog)
}

pub fn unparse_annotated(prog: &Program, syms: &Symbols) -> String {
    Unparser {
        out: String::new(),
        syms: Some(syms),
    }
    .program(prog)
}

struct Unparser<'a> {
    out: String,
    syms: Option<&'a Symbols>,
}

impl<'a> Unparser<'a> {
    fn program(mut self, prog: &Program) -> String {
        for decl in &prog.decls {
            self.decl(decl, 0);
        }
        self.out
    }

    fn indent(&mut self, n: usize) {
        for _ in 0..n {
            self.out.push(' ');
        }
    }

    fn decl(&mut self, decl: &Decl, ind: usize) {
        match decl {
            Decl::Var(vd) => self.var_decl(vd, ind),
            Decl::Fn(fd) => self.fn_decl(fd, ind),
            Decl::Struct(sd) => self.struct_decl(sd, ind),
        }
    }

    fn var_decl(&mut self, vd: &VarDecl, ind: usize) {
        self.indent(ind);
        self.type_node(&vd.ty);
        self.out.push(' ');
        self.id(&vd.id);
        self.out.push_str(";\n");
    }

    fn fn_decl(&mut self, fd: &FnDecl, ind: usize) {
        self.indent(ind);
        self.type_node(&fd.ret);
        self.out.push(' ');
        self.id(&fd.id);
        self.out.push('(');
        for (i, formal) in fd.formals.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.type_node(&formal.ty);
            self.out.push(' ');
            self.id(&formal.id);
        }
        self.out.push_str(") {\n");
        self.block(&fd.body, ind + 4);
        self.indent(ind);
        self.out.push_str("}\n\n");
    }

    fn struct_decl(&mut self, sd: &StructDecl, ind: usize) {
        self.indent(ind);
        self.out.push_str("struct ");
        self.id(&sd.id);
        self.out.push_str(" {\n");
        for field in &sd.fields {
            self.var_decl(field, ind + 4);
        }
        self.indent(ind);
        self.out.push_str("};\n\n");
    }

    fn type_node(&mut self, ty: &TypeNode) {
        match ty {
            TypeNode::Int(_) => self.out.push_str("int"),
            TypeNode::Bool(_) => self.out.push_str("bool"),
            TypeNode::Void(_) => self.out.push_str("void"),
            TypeNode::Struct(id) => {
                self.out.push_str("struct ");
                self.out.push_str(&id.name);
            }
        }
    }

    fn block(&mut self, b: &Block, ind: usize) {
        for vd in &b.decls {
            self.var_decl(vd, ind);
        }
        for st in &b.stmts {
            self.stmt(st, ind);
        }
    }

    fn stmt(&mut self, st: &Stmt, ind: usize) {
        match st {
            Stmt::Assign(a) => {
                self.indent(ind);
                // no parentheses at statement level
                self.loc(&a.lhs);
                self.out.push_str(" = ");
                self.exp(&a.rhs);
                self.out.push_str(";\n");
            }
            Stmt::PostInc(loc) => {
                self.indent(ind);
                self.loc(loc);
                self.out.push_str("++;\n");
            }
            Stmt::PostDec(loc) => {
                self.indent(ind);
                self.loc(loc);
                self.out.push_str("--;\n");
            }
            Stmt::Read(loc) => {
                self.indent(ind);
                self.out.push_str("cin >> ");
                self.loc(loc);
                self.out.push_str(";\n");
            }
            Stmt::Write(e) => {
                self.indent(ind);
                self.out.push_str("cout << ");
                self.exp(e);
                self.out.push_str(";\n");
            }
            Stmt::If { cond, then } => {
                self.indent(ind);
                self.out.push_str("if (");
                self.exp(cond);
                self.out.push_str(") {\n");
                self.block(then, ind + 4);
                self.indent(ind);
                self.out.push_str("}\n");
            }
            Stmt::IfElse { cond, then, els } => {
                self.indent(ind);
                self.out.push_str("if (");
                self.exp(cond);
                self.out.push_str(") {\n");
                self.block(then, ind + 4);
                self.indent(ind);
                self.out.push_str("}\n");
                self.indent(ind);
                self.out.push_str("else {\n");
                self.block(els, ind + 4);
                self.indent(ind);
                self.out.push_str("}\n");
            }
            Stmt::While { cond, body } => {
                self.indent(ind);
                self.out.push_str("while (");
                self.exp(cond);
                self.out.push_str(") {\n");
                self.block(body, ind + 4);
                self.indent(ind);
                self.out.push_str("}\n");
            }
            Stmt::Repeat { count, body } => {
                self.indent(ind);
                self.out.push_str("repeat (");
                self.exp(count);
                self.out.push_str(") {\n");
                self.block(body, ind + 4);
                self.indent(ind);
                self.out.push_str("}\n");
            }
            Stmt::Call(c) => {
                self.indent(ind);
                self.call(c);
                self.out.push_str(";\n");
            }
            Stmt::Return { exp, .. } => {
                self.indent(ind);
                self.out.push_str("return");
                if let Some(e) = exp {
                    self.out.push(' ');
                    self.exp(e);
                }
                self.out.push_str(";\n");
            }
        }
    }

    fn id(&mut self, id: &Id) {
        self.out.push_str(&id.name);
        if let (Some(syms), Some(sym)) = (self.syms, id.sym) {
            self.out.push('(');
            self.out.push_str(&syms.display(sym));
            self.out.push(')');
        }
    }

    fn loc(&mut self, loc: &Loc) {
        match loc {
            Loc::Id(id) => self.id(id),
            Loc::Dot(d) => {
                self.loc(&d.loc);
                self.out.push('.');
                self.id(&d.field);
            }
        }
    }

    fn call(&mut self, c: &Call) {
        self.id(&c.id);
        self.out.push('(');
        for (i, arg) in c.args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.exp(arg);
        }
        self.out.push(')');
    }

    fn exp(&mut self, e: &Exp) {
        match e {
            Exp::IntLit(v, _) => {
                self.out.push_str(&v.to_string());
            }
            Exp::StrLit(s, _) => {
                self.out.push('"');
                self.out.push_str(s);
                self.out.push('"');
            }
            Exp::True(_) => self.out.push_str("true"),
            Exp::False(_) => self.out.push_str("false"),
            Exp::Loc(l) => self.loc(l),
            Exp::Assign(a) => {
                self.out.push('(');
                self.loc(&a.lhs);
                self.out.push_str(" = ");
                self.exp(&a.rhs);
                self.out.push(')');
            }
            Exp::Call(c) => self.call(c),
            Exp::Unary(op, inner) => {
                self.out.push('(');
                self.out.push(match op {
                    UnOp::Neg => '-',
                    UnOp::Not => '!',
                });
                self.exp(inner);
                self.out.push(')');
            }
            Exp::Binary(op, lhs, rhs) => {
                self.out.push('(');
                self.exp(lhs);
                self.out.push_str(match op {
                    BinOp::Plus => " + ",
                    BinOp::Minus => " - ",
                    BinOp::Times => " * ",
                    BinOp::Divide => " / ",
                    BinOp::And => " && ",
                    BinOp::Or => " || ",
                    BinOp::Eq => " == ",
                    BinOp::NotEq => " != ",
                    BinOp::Lt => " < ",
                    BinOp::Gt => " > ",
                    BinOp::LtEq => " <= ",
                    BinOp::GtEq => " >= ",
                });
                self.exp(rhs);
                self.out.push(')');
            }
        }
    }
}
