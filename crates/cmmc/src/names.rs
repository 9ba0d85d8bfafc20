//! Name resolution: a single depth-first walk that fills the symbol tables,
//! links every identifier occurrence to its entry, and reports declaration
//! and use errors. Semantic errors go to the Reporter and never stop the
//! walk; a structural `SymTabError` means a broken internal invariant and is
//! propagated to the driver.

use log::debug;

use crate::ast::*;
use crate::report::Reporter;
use crate::symtab::{Sym, SymKind, SymTabError, SymTable, Symbols};

pub fn resolve(
    prog: &mut Program,
    syms: &mut Symbols,
    reporter: &mut Reporter,
) -> Result<SymTable, SymTabError> {
    let mut r = Resolver { syms, reporter };
    let mut table = SymTable::new();
    for decl in &mut prog.decls {
        match decl {
            Decl::Var(vd) => r.var_decl(vd, &mut table, None)?,
            Decl::Fn(fd) => r.fn_decl(fd, &mut table)?,
            Decl::Struct(sd) => r.struct_decl(sd, &mut table)?,
        }
    }
    debug!(
        "name resolution done, {} error(s)",
        r.reporter.error_count()
    );
    Ok(table)
}

struct Resolver<'a> {
    syms: &'a mut Symbols,
    reporter: &'a mut Reporter,
}

impl<'a> Resolver<'a> {
    /// Resolve one variable declaration into `table`. For struct fields,
    /// `outer` is the program-level table used to validate struct type
    /// names; everywhere else the current table plays that role itself.
    fn var_decl(
        &mut self,
        vd: &mut VarDecl,
        table: &mut SymTable,
        outer: Option<&SymTable>,
    ) -> Result<(), SymTabError> {
        let mut bad = false;
        let mut struct_def = None;

        match &mut vd.ty {
            TypeNode::Void(_) => {
                self.reporter.fatal(vd.id.span, "Non-function declared void");
                bad = true;
            }
            TypeNode::Struct(type_id) => {
                let lookup = match outer {
                    Some(o) => o.lookup_global(&type_id.name)?,
                    None => table.lookup_global(&type_id.name)?,
                };
                match lookup {
                    Some(def) if matches!(self.syms.get(def).kind, SymKind::StructDef(_)) => {
                        type_id.sym = Some(def);
                        struct_def = Some(def);
                    }
                    _ => {
                        self.reporter
                            .fatal(type_id.span, "Invalid name of struct type");
                        bad = true;
                    }
                }
            }
            _ => {}
        }

        if table.lookup_local(&vd.id.name)?.is_some() {
            self.reporter
                .fatal(vd.id.span, "Multiply declared identifier");
            bad = true;
        }

        if !bad {
            let sym = match (&vd.ty, struct_def) {
                (TypeNode::Struct(type_id), Some(def)) => {
                    Sym::struct_var(&vd.id.name, &type_id.name, def)
                }
                _ => Sym::var(&vd.id.name, vd.ty.ty()),
            };
            let id = self.syms.alloc(sym);
            table.add_decl(&vd.id.name, id)?;
            vd.id.sym = Some(id);
        }
        Ok(())
    }

    /// Even a multiply-declared function still gets its formals and body
    /// resolved in a fresh scope, so errors inside it are surfaced.
    fn fn_decl(&mut self, fd: &mut FnDecl, table: &mut SymTable) -> Result<(), SymTabError> {
        let fn_sym = if table.lookup_local(&fd.id.name)?.is_some() {
            self.reporter
                .fatal(fd.id.span, "Multiply declared identifier");
            None
        } else {
            let id = self
                .syms
                .alloc(Sym::func(&fd.id.name, fd.ret.ty(), fd.formals.len()));
            table.add_decl(&fd.id.name, id)?;
            fd.id.sym = Some(id);
            Some(id)
        };

        table.add_scope();

        let mut param_types = Vec::new();
        for formal in &mut fd.formals {
            if let Some(ty) = self.formal_decl(formal, table)? {
                param_types.push(ty);
            }
        }
        if let Some(id) = fn_sym {
            if let Some(f) = self.syms.fn_sym_mut(id) {
                f.params = param_types;
            }
        }

        self.body(&mut fd.body, table)?;
        table.remove_scope()
    }

    fn formal_decl(
        &mut self,
        formal: &mut FormalDecl,
        table: &mut SymTable,
    ) -> Result<Option<crate::types::Type>, SymTabError> {
        let mut bad = false;
        if matches!(formal.ty, TypeNode::Void(_)) {
            self.reporter
                .fatal(formal.id.span, "Non-function declared void");
            bad = true;
        }
        if table.lookup_local(&formal.id.name)?.is_some() {
            self.reporter
                .fatal(formal.id.span, "Multiply declared identifier");
            bad = true;
        }
        if bad {
            return Ok(None);
        }
        let ty = formal.ty.ty();
        let id = self.syms.alloc(Sym::var(&formal.id.name, ty.clone()));
        table.add_decl(&formal.id.name, id)?;
        formal.id.sym = Some(id);
        Ok(Some(ty))
    }

    fn struct_decl(&mut self, sd: &mut StructDecl, table: &mut SymTable) -> Result<(), SymTabError> {
        if table.lookup_local(&sd.id.name)?.is_some() {
            self.reporter
                .fatal(sd.id.span, "Multiply declared identifier");
            return Ok(());
        }

        // the fields get their own single-frame table; struct-typed fields
        // are validated against the enclosing table
        let mut field_table = SymTable::new();
        for field in &mut sd.fields {
            self.var_decl(field, &mut field_table, Some(&*table))?;
        }

        let def = self.syms.alloc(Sym::struct_def(&sd.id.name, field_table));
        table.add_decl(&sd.id.name, def)?;
        sd.id.sym = Some(def);
        Ok(())
    }

    /// Declarations then statements, inside whatever scope the caller set
    /// up (functions share one scope between formals and body).
    fn body(&mut self, b: &mut Block, table: &mut SymTable) -> Result<(), SymTabError> {
        for vd in &mut b.decls {
            self.var_decl(vd, table, None)?;
        }
        for st in &mut b.stmts {
            self.stmt(st, table)?;
        }
        Ok(())
    }

    fn scoped_body(&mut self, b: &mut Block, table: &mut SymTable) -> Result<(), SymTabError> {
        table.add_scope();
        self.body(b, table)?;
        table.remove_scope()
    }

    fn stmt(&mut self, st: &mut Stmt, table: &mut SymTable) -> Result<(), SymTabError> {
        match st {
            Stmt::Assign(a) => self.assign(a, table),
            Stmt::PostInc(loc) | Stmt::PostDec(loc) | Stmt::Read(loc) => self.loc(loc, table),
            Stmt::Write(e) => self.exp(e, table),
            Stmt::If { cond, then } => {
                self.exp(cond, table)?;
                self.scoped_body(then, table)
            }
            Stmt::IfElse { cond, then, els } => {
                self.exp(cond, table)?;
                self.scoped_body(then, table)?;
                self.scoped_body(els, table)
            }
            Stmt::While { cond, body } => {
                self.exp(cond, table)?;
                self.scoped_body(body, table)
            }
            Stmt::Repeat { count, body } => {
                self.exp(count, table)?;
                self.scoped_body(body, table)
            }
            Stmt::Call(c) => self.call(c, table),
            Stmt::Return { exp, .. } => match exp {
                Some(e) => self.exp(e, table),
                None => Ok(()),
            },
        }
    }

    fn exp(&mut self, e: &mut Exp, table: &SymTable) -> Result<(), SymTabError> {
        match e {
            Exp::IntLit(..) | Exp::StrLit(..) | Exp::True(_) | Exp::False(_) => Ok(()),
            Exp::Loc(l) => self.loc(l, table),
            Exp::Assign(a) => self.assign(a, table),
            Exp::Call(c) => self.call(c, table),
            Exp::Unary(_, inner) => self.exp(inner, table),
            Exp::Binary(_, lhs, rhs) => {
                self.exp(lhs, table)?;
                self.exp(rhs, table)
            }
        }
    }

    fn assign(&mut self, a: &mut Assign, table: &SymTable) -> Result<(), SymTabError> {
        self.loc(&mut a.lhs, table)?;
        self.exp(&mut a.rhs, table)
    }

    fn call(&mut self, c: &mut Call, table: &SymTable) -> Result<(), SymTabError> {
        self.id_use(&mut c.id, table)?;
        for arg in &mut c.args {
            self.exp(arg, table)?;
        }
        Ok(())
    }

    fn id_use(&mut self, id: &mut Id, table: &SymTable) -> Result<(), SymTabError> {
        match table.lookup_global(&id.name)? {
            Some(sym) => id.sym = Some(sym),
            None => self.reporter.fatal(id.span, "Undeclared identifier"),
        }
        Ok(())
    }

    fn loc(&mut self, loc: &mut Loc, table: &SymTable) -> Result<(), SymTabError> {
        match loc {
            Loc::Id(id) => self.id_use(id, table),
            Loc::Dot(d) => self.dot(d, table),
        }
    }

    /// Resolve `loc.field`. The left side must name a struct-typed entry;
    /// its definition's field table is where `field` is looked up. A `bad`
    /// chain link suppresses any further messages higher up.
    fn dot(&mut self, d: &mut Dot, table: &SymTable) -> Result<(), SymTabError> {
        self.loc(&mut d.loc, table)?;

        let mut field_table = None;
        match &d.loc {
            Loc::Id(id) => match id.sym {
                // undeclared: already reported, just stop the chain
                None => d.bad = true,
                Some(sym) => match &self.syms.get(sym).kind {
                    SymKind::Struct { def } => {
                        field_table = self.syms.struct_def(*def).map(|sd| &sd.fields);
                    }
                    _ => {
                        self.reporter
                            .fatal(id.span, "Dot-access of non-struct type");
                        d.bad = true;
                    }
                },
            },
            Loc::Dot(inner) => {
                if inner.bad {
                    d.bad = true;
                } else {
                    match inner.struct_sym {
                        Some(def) => {
                            field_table = self.syms.struct_def(def).map(|sd| &sd.fields);
                        }
                        None => {
                            self.reporter
                                .fatal(inner.field.span, "Dot-access of non-struct type");
                            d.bad = true;
                        }
                    }
                }
            }
        }

        if d.bad {
            return Ok(());
        }
        let Some(fields) = field_table else {
            d.bad = true;
            return Ok(());
        };

        match fields.lookup_global(&d.field.name)? {
            None => {
                self.reporter
                    .fatal(d.field.span, "Invalid struct field name");
                d.bad = true;
            }
            Some(field_sym) => {
                d.field.sym = Some(field_sym);
                if let SymKind::Struct { def } = &self.syms.get(field_sym).kind {
                    d.struct_sym = Some(*def);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::lex;
    use crate::parse::parse;

    fn resolve_src(src: &str) -> (Program, Symbols, Reporter) {
        let mut reporter = Reporter::new();
        let toks = lex(src, &mut reporter);
        assert!(!reporter.errored());
        let mut prog = parse(&toks).unwrap();
        let mut syms = Symbols::new();
        resolve(&mut prog, &mut syms, &mut reporter).unwrap();
        (prog, syms, reporter)
    }

    fn messages(reporter: &Reporter) -> Vec<String> {
        reporter.diags().iter().map(|d| d.msg.clone()).collect()
    }

    #[test]
    fn clean_program_resolves_without_errors() {
        let (prog, syms, reporter) = resolve_src(
            "int g;\n\
             struct P { int x; int y; };\n\
             struct P p;\n\
             void main() { int a; a = g; p.x = a; }\n",
        );
        assert!(!reporter.errored());
        let Decl::Fn(f) = &prog.decls[3] else {
            panic!("expected fn")
        };
        let Stmt::Assign(a) = &f.body.stmts[0] else {
            panic!("expected assign")
        };
        let Loc::Id(lhs) = &a.lhs else {
            panic!("expected id lhs")
        };
        assert!(lhs.sym.is_some());
        let Exp::Loc(Loc::Id(rhs)) = &a.rhs else {
            panic!("expected id rhs")
        };
        assert_eq!(syms.get(rhs.sym.unwrap()).name, "g");
    }

    #[test]
    fn undeclared_identifier_is_reported() {
        let (_, _, reporter) = resolve_src("void main() { x = 1; }");
        assert_eq!(messages(&reporter), vec!["Undeclared identifier"]);
        assert_eq!(reporter.diags()[0].span.line, 1);
    }

    #[test]
    fn multiply_declared_identifier_is_reported() {
        let (_, _, reporter) = resolve_src("int x; bool x; void main() { }");
        assert_eq!(messages(&reporter), vec!["Multiply declared identifier"]);
    }

    #[test]
    fn shadowing_in_inner_scope_is_legal() {
        let (_, _, reporter) =
            resolve_src("int x; void main() { int x; if (true) { int x; x = 1; } }");
        assert!(!reporter.errored());
    }

    #[test]
    fn void_variable_is_rejected() {
        let (_, _, reporter) = resolve_src("void v; void main() { }");
        assert_eq!(messages(&reporter), vec!["Non-function declared void"]);
    }

    #[test]
    fn unknown_struct_type_is_rejected() {
        let (_, _, reporter) = resolve_src("struct Nope p; void main() { }");
        assert_eq!(messages(&reporter), vec!["Invalid name of struct type"]);
    }

    #[test]
    fn int_variable_is_not_a_struct_type() {
        let (_, _, reporter) = resolve_src("int t; struct t p; void main() { }");
        assert_eq!(messages(&reporter), vec!["Invalid name of struct type"]);
    }

    #[test]
    fn bad_field_name_is_reported_once() {
        let (_, _, reporter) = resolve_src(
            "struct P { int x; };\n\
             struct P p;\n\
             void main() { p.nope = 1; }\n",
        );
        assert_eq!(messages(&reporter), vec!["Invalid struct field name"]);
    }

    #[test]
    fn dot_access_of_non_struct_is_reported() {
        let (_, _, reporter) = resolve_src("int x; void main() { x.y = 1; }");
        assert_eq!(messages(&reporter), vec!["Dot-access of non-struct type"]);
    }

    #[test]
    fn bad_access_does_not_cascade_through_chains() {
        let (_, _, reporter) = resolve_src(
            "struct P { int x; };\n\
             struct P p;\n\
             void main() { p.nope.deeper = 1; }\n",
        );
        // one error for the bad field, none for the chained access
        assert_eq!(messages(&reporter), vec!["Invalid struct field name"]);
    }

    #[test]
    fn chained_access_through_nested_structs_resolves() {
        let (prog, syms, reporter) = resolve_src(
            "struct Inner { int v; };\n\
             struct Outer { struct Inner in; };\n\
             struct Outer o;\n\
             void main() { o.in.v = 3; }\n",
        );
        assert!(!reporter.errored(), "diags: {:?}", reporter.diags());
        let Decl::Fn(f) = &prog.decls[3] else {
            panic!("expected fn")
        };
        let Stmt::Assign(a) = &f.body.stmts[0] else {
            panic!("expected assign")
        };
        let Loc::Dot(outer) = &a.lhs else {
            panic!("expected dot")
        };
        assert_eq!(syms.get(outer.field.sym.unwrap()).name, "v");
    }

    #[test]
    fn struct_field_namespace_is_separate_from_globals() {
        let (_, _, reporter) = resolve_src(
            "int x;\n\
             struct P { int x; };\n\
             void main() { }\n",
        );
        assert!(!reporter.errored());
    }

    #[test]
    fn duplicate_formal_and_void_formal_are_reported() {
        let (_, _, reporter) = resolve_src("void f(int a, int a, void b) { } void main() { }");
        assert_eq!(
            messages(&reporter),
            vec!["Multiply declared identifier", "Non-function declared void"]
        );
    }

    #[test]
    fn formals_share_the_scope_of_body_locals() {
        let (_, _, reporter) = resolve_src("void f(int a) { int a; } void main() { }");
        assert_eq!(messages(&reporter), vec!["Multiply declared identifier"]);
    }

    #[test]
    fn function_param_types_are_recorded() {
        let (prog, syms, _) = resolve_src("int f(int a, bool b) { return 0; } void main() { }");
        let Decl::Fn(f) = &prog.decls[0] else {
            panic!("expected fn")
        };
        let fs = syms.fn_sym(f.id.sym.unwrap()).unwrap();
        assert_eq!(
            fs.params,
            vec![crate::types::Type::Int, crate::types::Type::Bool]
        );
        assert_eq!(fs.num_params, 2);
        assert_eq!(fs.ret, crate::types::Type::Int);
    }

    #[test]
    fn self_referential_struct_field_is_invalid() {
        let (_, _, reporter) = resolve_src("struct P { struct P next; }; void main() { }");
        assert_eq!(messages(&reporter), vec!["Invalid name of struct type"]);
    }
}
