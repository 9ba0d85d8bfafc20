//! MIPS code generation for SPIM, as a strict stack machine: every
//! expression leaves exactly one word on top of `$sp`, statements are
//! stack-neutral, and binary operators pop their right operand into `$t1`
//! and their left into `$t0`.
//!
//! The data segment carries the globals and the interned string literals;
//! string labels and control-flow labels share one `.L<k>` counter, so a
//! listing is byte-for-byte reproducible from the same input.

use std::collections::HashMap;

use log::trace;

use crate::ast::*;
use crate::layout::LINKAGE_BYTES;
use crate::symtab::{SymKind, Symbols};
use crate::types::Type;

pub fn generate(prog: &Program, syms: &Symbols) -> String {
    let mut cg = CodeGen {
        syms,
        text: String::new(),
        label_count: 0,
        strings: Vec::new(),
        str_labels: HashMap::new(),
    };

    for decl in &prog.decls {
        if let Decl::Fn(fd) = decl {
            cg.gen_fn(fd);
        }
    }

    let mut out = String::from(".data\n");
    for decl in &prog.decls {
        if let Decl::Var(vd) = decl {
            let Some(id) = vd.id.sym else { continue };
            let sym = syms.get(id);
            let size = match &sym.kind {
                SymKind::Struct { def } => syms.struct_def(*def).map(|d| d.size).unwrap_or(4),
                _ => 4,
            };
            out.push_str(&format!("_{}: .space {}\n", sym.name, size));
        }
    }
    for (label, text) in &cg.strings {
        out.push_str(&format!("{label}: .asciiz \"{text}\"\n"));
    }
    out.push_str("\n.text\n");
    out.push_str(&cg.text);
    out
}

struct FnCx {
    size_params: i32,
    is_main: bool,
}

struct CodeGen<'a> {
    syms: &'a Symbols,
    text: String,
    label_count: usize,
    /// Interned string literals in first-use order.
    strings: Vec<(String, String)>,
    str_labels: HashMap<String, String>,
}

impl<'a> CodeGen<'a> {
    fn emit(&mut self, instr: &str) {
        self.text.push_str("  ");
        self.text.push_str(instr);
        self.text.push('\n');
    }

    fn label(&mut self, name: &str) {
        self.text.push_str(name);
        self.text.push_str(":\n");
    }

    fn new_label(&mut self) -> String {
        let n = self.label_count;
        self.label_count += 1;
        format!(".L{n}")
    }

    fn intern(&mut self, text: &str) -> String {
        if let Some(label) = self.str_labels.get(text) {
            return label.clone();
        }
        let label = self.new_label();
        self.strings.push((label.clone(), text.to_string()));
        self.str_labels.insert(text.to_string(), label.clone());
        label
    }

    fn push(&mut self, reg: &str) {
        self.emit(&format!("sw {reg}, 0($sp)"));
        self.emit("subu $sp, $sp, 4");
    }

    fn pop(&mut self, reg: &str) {
        self.emit(&format!("lw {reg}, 4($sp)"));
        self.emit("addu $sp, $sp, 4");
    }

    fn fn_label(name: &str) -> String {
        if name == "main" {
            "main".to_string()
        } else {
            format!("_{name}")
        }
    }

    fn gen_fn(&mut self, fd: &FnDecl) {
        let Some(id) = fd.id.sym else { return };
        let Some(fs) = self.syms.fn_sym(id) else {
            return;
        };
        let cx = FnCx {
            size_params: fs.size_params,
            is_main: fd.id.name == "main",
        };
        let size_locals = fs.size_locals;
        trace!("emitting fn {}", fd.id.name);

        if cx.is_main {
            self.text.push_str(".globl main\n");
        }
        let label = Self::fn_label(&fd.id.name);
        self.label(&label);

        // prologue: save $ra and the control link, anchor $fp above the
        // parameters, make room for locals
        self.push("$ra");
        self.push("$fp");
        self.emit(&format!("addu $fp, $sp, {}", cx.size_params + LINKAGE_BYTES));
        self.emit(&format!("subu $sp, $sp, {size_locals}"));

        self.gen_block(&fd.body, &cx);
        self.gen_epilogue(&cx);
    }

    /// The function exit sequence; also emitted inline for every `return`.
    /// Restoring `$sp` from the control link pops the frame and the actuals
    /// in one move.
    fn gen_epilogue(&mut self, cx: &FnCx) {
        self.emit(&format!("lw $ra, {}($fp)", -cx.size_params));
        self.emit("move $t0, $fp");
        self.emit(&format!("lw $fp, {}($fp)", -(cx.size_params + 4)));
        self.emit("move $sp, $t0");
        if cx.is_main {
            self.emit("li $v0, 10");
            self.emit("syscall");
        } else {
            self.emit("jr $ra");
        }
    }

    fn gen_block(&mut self, b: &Block, cx: &FnCx) {
        for st in &b.stmts {
            self.gen_stmt(st, cx);
        }
    }

    fn gen_stmt(&mut self, st: &Stmt, cx: &FnCx) {
        match st {
            Stmt::Assign(a) => {
                self.gen_assign(a);
                self.pop("$t0"); // statement discards the value
            }
            Stmt::PostInc(loc) => {
                self.gen_addr(loc);
                self.pop("$t0");
                self.emit("lw $t1, 0($t0)");
                self.emit("add $t1, $t1, 1");
                self.emit("sw $t1, 0($t0)");
            }
            Stmt::PostDec(loc) => {
                self.gen_addr(loc);
                self.pop("$t0");
                self.emit("lw $t1, 0($t0)");
                self.emit("sub $t1, $t1, 1");
                self.emit("sw $t1, 0($t0)");
            }
            Stmt::Read(loc) => {
                self.gen_addr(loc);
                self.emit("li $v0, 5");
                self.emit("syscall");
                self.pop("$t0");
                self.emit("sw $v0, 0($t0)");
            }
            Stmt::Write(e) => {
                let code = if self.exp_type(e).is_str() { 4 } else { 1 };
                self.gen_exp(e);
                self.pop("$a0");
                self.emit(&format!("li $v0, {code}"));
                self.emit("syscall");
            }
            Stmt::If { cond, then } => {
                let end = self.new_label();
                self.gen_exp(cond);
                self.pop("$t0");
                self.emit(&format!("beq $t0, $0, {end}"));
                self.gen_block(then, cx);
                self.label(&end);
            }
            Stmt::IfElse { cond, then, els } => {
                let else_label = self.new_label();
                let end = self.new_label();
                self.gen_exp(cond);
                self.pop("$t0");
                self.emit(&format!("beq $t0, $0, {else_label}"));
                self.gen_block(then, cx);
                self.emit(&format!("j {end}"));
                self.label(&else_label);
                self.gen_block(els, cx);
                self.label(&end);
            }
            Stmt::While { cond, body } => {
                let top = self.new_label();
                let end = self.new_label();
                self.label(&top);
                self.gen_exp(cond);
                self.pop("$t0");
                self.emit(&format!("beq $t0, $0, {end}"));
                self.gen_block(body, cx);
                self.emit(&format!("j {top}"));
                self.label(&end);
            }
            Stmt::Repeat { count, body } => {
                // the counter lives on the stack for the whole loop;
                // statements are stack-neutral so its slot is stable
                let top = self.new_label();
                let end = self.new_label();
                self.gen_exp(count);
                self.label(&top);
                self.emit("lw $t0, 4($sp)");
                self.emit(&format!("blez $t0, {end}"));
                self.gen_block(body, cx);
                self.emit("lw $t0, 4($sp)");
                self.emit("sub $t0, $t0, 1");
                self.emit("sw $t0, 4($sp)");
                self.emit(&format!("j {top}"));
                self.label(&end);
                self.emit("addu $sp, $sp, 4");
            }
            Stmt::Call(c) => {
                self.gen_call(c);
                self.pop("$t0"); // discard the result slot
            }
            Stmt::Return { exp, .. } => {
                if let Some(e) = exp {
                    self.gen_exp(e);
                    self.pop("$v0");
                }
                self.gen_epilogue(cx);
            }
        }
    }

    fn gen_exp(&mut self, e: &Exp) {
        match e {
            Exp::IntLit(v, _) => {
                self.emit(&format!("li $t0, {v}"));
                self.push("$t0");
            }
            Exp::StrLit(s, _) => {
                let label = self.intern(s);
                self.emit(&format!("la $t0, {label}"));
                self.push("$t0");
            }
            Exp::True(_) => {
                self.emit("li $t0, 1");
                self.push("$t0");
            }
            Exp::False(_) => {
                self.emit("li $t0, 0");
                self.push("$t0");
            }
            Exp::Loc(loc) => {
                self.gen_addr(loc);
                self.pop("$t0");
                self.emit("lw $t0, 0($t0)");
                self.push("$t0");
            }
            Exp::Assign(a) => self.gen_assign(a),
            Exp::Call(c) => self.gen_call(c),
            Exp::Unary(UnOp::Neg, inner) => {
                self.gen_exp(inner);
                self.pop("$t0");
                self.emit("neg $t0, $t0");
                self.push("$t0");
            }
            Exp::Unary(UnOp::Not, inner) => {
                self.gen_exp(inner);
                self.pop("$t0");
                self.emit("xori $t0, $t0, 1");
                self.push("$t0");
            }
            Exp::Binary(BinOp::And, lhs, rhs) => {
                // short-circuit: a false left operand is the result
                let short = self.new_label();
                let end = self.new_label();
                self.gen_exp(lhs);
                self.pop("$t0");
                self.emit(&format!("beq $t0, $0, {short}"));
                self.gen_exp(rhs);
                self.emit(&format!("j {end}"));
                self.label(&short);
                self.emit("li $t0, 0");
                self.push("$t0");
                self.label(&end);
            }
            Exp::Binary(BinOp::Or, lhs, rhs) => {
                let short = self.new_label();
                let end = self.new_label();
                self.gen_exp(lhs);
                self.pop("$t0");
                self.emit(&format!("bne $t0, $0, {short}"));
                self.gen_exp(rhs);
                self.emit(&format!("j {end}"));
                self.label(&short);
                self.emit("li $t0, 1");
                self.push("$t0");
                self.label(&end);
            }
            Exp::Binary(op, lhs, rhs) => {
                self.gen_exp(lhs);
                self.gen_exp(rhs);
                self.pop("$t1");
                self.pop("$t0");
                let instr = match op {
                    BinOp::Plus => "add $t0, $t0, $t1",
                    BinOp::Minus => "sub $t0, $t0, $t1",
                    BinOp::Times => "mul $t0, $t0, $t1",
                    BinOp::Divide => "div $t0, $t0, $t1",
                    BinOp::Eq => "seq $t0, $t0, $t1",
                    BinOp::NotEq => "sne $t0, $t0, $t1",
                    BinOp::Lt => "slt $t0, $t0, $t1",
                    BinOp::Gt => "sgt $t0, $t0, $t1",
                    BinOp::LtEq => "sle $t0, $t0, $t1",
                    BinOp::GtEq => "sge $t0, $t0, $t1",
                    BinOp::And | BinOp::Or => unreachable!("handled above"),
                };
                self.emit(instr);
                self.push("$t0");
            }
        }
    }

    /// Address first, value second; the stored value stays on the stack as
    /// the value of the assignment expression.
    fn gen_assign(&mut self, a: &Assign) {
        self.gen_addr(&a.lhs);
        self.gen_exp(&a.rhs);
        self.pop("$t0"); // value
        self.pop("$t1"); // address
        self.emit("sw $t0, 0($t1)");
        self.push("$t0");
    }

    /// Push the address of a location. Codegen only runs on error-free
    /// programs, so every name here carries its resolved entry.
    fn gen_addr(&mut self, loc: &Loc) {
        match loc {
            Loc::Id(id) => {
                let sym = self.syms.get(id.sym.unwrap());
                if sym.is_global {
                    self.emit(&format!("la $t0, _{}", sym.name));
                } else {
                    self.emit(&format!("la $t0, {}($fp)", sym.offset));
                }
                self.push("$t0");
            }
            Loc::Dot(d) => {
                self.gen_addr(&d.loc);
                self.pop("$t0");
                let offset = self.syms.get(d.field.sym.unwrap()).offset;
                self.emit(&format!("addu $t0, $t0, {offset}"));
                self.push("$t0");
            }
        }
    }

    /// Actuals are pushed left to right; the callee's epilogue pops them
    /// along with its frame, and the caller pushes the `$v0` result slot.
    fn gen_call(&mut self, c: &Call) {
        for arg in &c.args {
            self.gen_exp(arg);
        }
        self.emit(&format!("jal {}", Self::fn_label(&c.id.name)));
        self.push("$v0");
    }

    fn exp_type(&self, e: &Exp) -> Type {
        match e {
            Exp::IntLit(..) => Type::Int,
            Exp::StrLit(..) => Type::Str,
            Exp::True(_) | Exp::False(_) => Type::Bool,
            Exp::Loc(l) => self.loc_type(l),
            Exp::Assign(a) => self.loc_type(&a.lhs),
            Exp::Call(c) => self
                .syms
                .fn_sym(c.id.sym.unwrap())
                .map(|f| f.ret.clone())
                .unwrap_or(Type::Error),
            Exp::Unary(UnOp::Neg, _) => Type::Int,
            Exp::Unary(UnOp::Not, _) => Type::Bool,
            Exp::Binary(op, ..) if op.is_arith() => Type::Int,
            Exp::Binary(..) => Type::Bool,
        }
    }

    fn loc_type(&self, loc: &Loc) -> Type {
        match loc {
            Loc::Id(id) => self.syms.get(id.sym.unwrap()).ty.clone(),
            Loc::Dot(d) => self.syms.get(d.field.sym.unwrap()).ty.clone(),
        }
    }
}
