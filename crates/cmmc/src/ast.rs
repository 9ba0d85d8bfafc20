//! The abstract syntax tree for C--.
//!
//! Nodes are built by the parser and are immutable in shape afterwards; the
//! only fields written later are the `sym` slots on [`Id`] and the
//! `struct_sym`/`bad` slots on [`Dot`], each filled exactly once by name
//! resolution.

use crate::lex::Span;
use crate::symtab::SymId;

#[derive(Debug)]
pub struct Program {
    pub decls: Vec<Decl>,
}

#[derive(Debug)]
pub enum Decl {
    Var(VarDecl),
    Fn(FnDecl),
    Struct(StructDecl),
}

#[derive(Debug)]
pub struct VarDecl {
    pub ty: TypeNode,
    pub id: Id,
}

#[derive(Debug)]
pub struct FnDecl {
    pub ret: TypeNode,
    pub id: Id,
    pub formals: Vec<FormalDecl>,
    pub body: Block,
}

#[derive(Debug)]
pub struct FormalDecl {
    pub ty: TypeNode,
    pub id: Id,
}

#[derive(Debug)]
pub struct StructDecl {
    pub id: Id,
    pub fields: Vec<VarDecl>,
}

#[derive(Debug)]
pub enum TypeNode {
    Int(Span),
    Bool(Span),
    Void(Span),
    Struct(Id),
}

impl TypeNode {
    pub fn span(&self) -> Span {
        match self {
            TypeNode::Int(s) | TypeNode::Bool(s) | TypeNode::Void(s) => *s,
            TypeNode::Struct(id) => id.span,
        }
    }

    pub fn ty(&self) -> crate::types::Type {
        match self {
            TypeNode::Int(_) => crate::types::Type::Int,
            TypeNode::Bool(_) => crate::types::Type::Bool,
            TypeNode::Void(_) => crate::types::Type::Void,
            TypeNode::Struct(id) => crate::types::Type::Struct(id.name.clone()),
        }
    }
}

/// Declarations then statements, as in a function body or the braced block
/// of an `if`/`while`/`repeat`.
#[derive(Debug)]
pub struct Block {
    pub decls: Vec<VarDecl>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug)]
pub enum Stmt {
    Assign(Assign),
    PostInc(Loc),
    PostDec(Loc),
    Read(Loc),
    Write(Exp),
    If {
        cond: Exp,
        then: Block,
    },
    IfElse {
        cond: Exp,
        then: Block,
        els: Block,
    },
    While {
        cond: Exp,
        body: Block,
    },
    Repeat {
        count: Exp,
        body: Block,
    },
    Call(Call),
    Return {
        exp: Option<Exp>,
        span: Span,
    },
}

#[derive(Debug)]
pub struct Assign {
    pub lhs: Loc,
    pub rhs: Exp,
}

#[derive(Debug)]
pub struct Call {
    pub id: Id,
    pub args: Vec<Exp>,
}

/// An identifier occurrence. `sym` is the resolved symbol-table entry.
#[derive(Debug)]
pub struct Id {
    pub name: String,
    pub span: Span,
    pub sym: Option<SymId>,
}

impl Id {
    pub fn new(name: String, span: Span) -> Id {
        Id {
            name,
            span,
            sym: None,
        }
    }
}

/// A place an lvalue can name: a plain identifier or a field chain.
#[derive(Debug)]
pub enum Loc {
    Id(Id),
    Dot(Box<Dot>),
}

impl Loc {
    /// Position reported for this location; for a dot-access it is the
    /// right-hand field, as in the diagnostics format.
    pub fn span(&self) -> Span {
        match self {
            Loc::Id(id) => id.span,
            Loc::Dot(d) => d.field.span,
        }
    }
}

/// `loc.field`. `struct_sym` is the StructDef entry of the field's struct
/// type when the field is itself struct-typed (so a chained access higher up
/// can open the right field table); `bad` stops cascading errors along the
/// chain.
#[derive(Debug)]
pub struct Dot {
    pub loc: Loc,
    pub field: Id,
    pub struct_sym: Option<SymId>,
    pub bad: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Plus,
    Minus,
    Times,
    Divide,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl BinOp {
    pub fn is_arith(self) -> bool {
        matches!(self, BinOp::Plus | BinOp::Minus | BinOp::Times | BinOp::Divide)
    }
    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
    pub fn is_equality(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::NotEq)
    }
    pub fn is_relational(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq)
    }
}

#[derive(Debug)]
pub enum Exp {
    IntLit(i32, Span),
    StrLit(String, Span),
    True(Span),
    False(Span),
    Loc(Loc),
    Assign(Box<Assign>),
    Call(Box<Call>),
    Unary(UnOp, Box<Exp>),
    Binary(BinOp, Box<Exp>, Box<Exp>),
}

impl Exp {
    pub fn span(&self) -> Span {
        match self {
            Exp::IntLit(_, s) | Exp::StrLit(_, s) | Exp::True(s) | Exp::False(s) => *s,
            Exp::Loc(l) => l.span(),
            Exp::Assign(a) => a.lhs.span(),
            Exp::Call(c) => c.id.span,
            Exp::Unary(_, e) => e.span(),
            Exp::Binary(_, lhs, _) => lhs.span(),
        }
    }
}
