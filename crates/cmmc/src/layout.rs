//! Storage layout: the walk between checking and emission that decides
//! where every variable lives. Globals are marked for the data segment;
//! parameters and locals get `$fp`-relative offsets; struct definitions get
//! field offsets and a total size. Everything here is deterministic.

use log::debug;

use crate::ast::*;
use crate::symtab::{SymId, SymKind, Symbols};

/// Saved `$ra` and the control link sit between the parameters and the
/// locals in every frame.
pub const LINKAGE_BYTES: i32 = 8;
pub const WORD: i32 = 4;

pub fn layout(prog: &Program, syms: &mut Symbols) {
    for decl in &prog.decls {
        match decl {
            Decl::Struct(sd) => layout_struct(sd, syms),
            Decl::Var(vd) => {
                if let Some(id) = vd.id.sym {
                    syms.get_mut(id).is_global = true;
                }
            }
            Decl::Fn(fd) => layout_fn(fd, syms),
        }
    }
}

/// Size in bytes of one declared variable: a word for scalars, the struct's
/// full size for struct variables.
fn var_size(id: SymId, syms: &Symbols) -> i32 {
    match &syms.get(id).kind {
        SymKind::Struct { def } => syms.struct_def(*def).map(|d| d.size).unwrap_or(WORD),
        _ => WORD,
    }
}

/// Field offsets are assigned in declaration order starting at 0; the
/// struct's size is the sum of its field sizes.
fn layout_struct(sd: &StructDecl, syms: &mut Symbols) {
    let Some(def_id) = sd.id.sym else { return };
    let mut offset = 0;
    for field in &sd.fields {
        let Some(field_id) = field.id.sym else {
            continue;
        };
        let size = var_size(field_id, syms);
        syms.get_mut(field_id).offset = offset;
        offset += size;
    }
    if let Some(def) = syms.struct_def_mut(def_id) {
        def.size = offset;
    }
    debug!("struct {} laid out, {} bytes", sd.id.name, offset);
}

fn layout_fn(fd: &FnDecl, syms: &mut Symbols) {
    // first parameter at 0($fp), the next at -4($fp), and so on
    for (i, formal) in fd.formals.iter().enumerate() {
        if let Some(id) = formal.id.sym {
            syms.get_mut(id).offset = -WORD * i as i32;
        }
    }
    let size_params = WORD * fd.formals.len() as i32;

    let mut cursor = -(size_params + LINKAGE_BYTES);
    let mut size_locals = 0;
    layout_block(&fd.body, syms, &mut cursor, &mut size_locals);

    if let Some(id) = fd.id.sym {
        if let Some(f) = syms.fn_sym_mut(id) {
            f.size_params = size_params;
            f.size_locals = size_locals;
        }
    }
    debug!(
        "fn {}: size_params={} size_locals={}",
        fd.id.name, size_params, size_locals
    );
}

/// Assign descending offsets to a block's locals, then recurse into nested
/// blocks (their locals extend the same frame; slots are not reused).
fn layout_block(b: &Block, syms: &mut Symbols, cursor: &mut i32, size_locals: &mut i32) {
    for vd in &b.decls {
        let Some(id) = vd.id.sym else { continue };
        let size = var_size(id, syms);
        // the recorded offset is the lowest address of the reservation, so
        // field addressing is uniformly base + field offset
        syms.get_mut(id).offset = *cursor - size + WORD;
        *cursor -= size;
        *size_locals += size;
    }
    for st in &b.stmts {
        match st {
            Stmt::If { then, .. } => layout_block(then, syms, cursor, size_locals),
            Stmt::IfElse { then, els, .. } => {
                layout_block(then, syms, cursor, size_locals);
                layout_block(els, syms, cursor, size_locals);
            }
            Stmt::While { body, .. } | Stmt::Repeat { body, .. } => {
                layout_block(body, syms, cursor, size_locals)
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::lex;
    use crate::names::resolve;
    use crate::parse::parse;
    use crate::report::Reporter;

    fn layout_src(src: &str) -> (Program, Symbols) {
        let mut reporter = Reporter::new();
        let toks = lex(src, &mut reporter);
        let mut prog = parse(&toks).unwrap();
        let mut syms = Symbols::new();
        resolve(&mut prog, &mut syms, &mut reporter).unwrap();
        assert!(!reporter.errored(), "diags: {:?}", reporter.diags());
        layout(&prog, &mut syms);
        (prog, syms)
    }

    fn fn_decl<'p>(prog: &'p Program, name: &str) -> &'p FnDecl {
        prog.decls
            .iter()
            .find_map(|d| match d {
                Decl::Fn(f) if f.id.name == name => Some(f),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn globals_are_marked_global() {
        let (prog, syms) = layout_src("int g; void main() { }");
        let Decl::Var(vd) = &prog.decls[0] else {
            panic!("expected var")
        };
        assert!(syms.get(vd.id.sym.unwrap()).is_global);
    }

    #[test]
    fn params_descend_from_zero() {
        let (prog, syms) = layout_src("int f(int a, int b, int c) { return a; } void main() { }");
        let f = fn_decl(&prog, "f");
        let offsets: Vec<i32> = f
            .formals
            .iter()
            .map(|p| syms.get(p.id.sym.unwrap()).offset)
            .collect();
        assert_eq!(offsets, vec![0, -4, -8]);
        let fs = syms.fn_sym(f.id.sym.unwrap()).unwrap();
        assert_eq!(fs.size_params, 12);
    }

    #[test]
    fn first_local_is_below_the_linkage_area() {
        let (prog, syms) = layout_src("void main() { int x; int y; x = 0; y = 0; }");
        let f = fn_decl(&prog, "main");
        let x = syms.get(f.body.decls[0].id.sym.unwrap());
        let y = syms.get(f.body.decls[1].id.sym.unwrap());
        assert_eq!(x.offset, -8);
        assert_eq!(y.offset, -12);
        assert!(!x.is_global);
        let fs = syms.fn_sym(f.id.sym.unwrap()).unwrap();
        assert_eq!(fs.size_locals, 8);
    }

    #[test]
    fn locals_follow_params_in_the_frame() {
        let (prog, syms) = layout_src("int f(int a, int b) { int c; c = 0; return c; } void main() { }");
        let f = fn_decl(&prog, "f");
        let c = syms.get(f.body.decls[0].id.sym.unwrap());
        assert_eq!(c.offset, -16); // -(8 params + 8 linkage)
    }

    #[test]
    fn struct_fields_get_declaration_order_offsets() {
        let (prog, syms) = layout_src(
            "struct P { int x; int y; int z; };\n\
             struct P p;\n\
             void main() { }\n",
        );
        let Decl::Struct(sd) = &prog.decls[0] else {
            panic!("expected struct")
        };
        let offsets: Vec<i32> = sd
            .fields
            .iter()
            .map(|f| syms.get(f.id.sym.unwrap()).offset)
            .collect();
        assert_eq!(offsets, vec![0, 4, 8]);
        let def = syms.struct_def(sd.id.sym.unwrap()).unwrap();
        assert_eq!(def.size, 12);
    }

    #[test]
    fn struct_local_reserves_its_full_size() {
        let (prog, syms) = layout_src(
            "struct P { int x; int y; };\n\
             void main() { struct P p; int after; after = 0; }\n",
        );
        let f = fn_decl(&prog, "main");
        let p = syms.get(f.body.decls[0].id.sym.unwrap());
        let after = syms.get(f.body.decls[1].id.sym.unwrap());
        // p spans [-12, -8]; its base is the low end
        assert_eq!(p.offset, -12);
        assert_eq!(after.offset, -16);
        let fs = syms.fn_sym(f.id.sym.unwrap()).unwrap();
        assert_eq!(fs.size_locals, 12);
    }

    #[test]
    fn nested_struct_fields_accumulate_size() {
        let (prog, syms) = layout_src(
            "struct Inner { int a; int b; };\n\
             struct Outer { int tag; struct Inner in; };\n\
             struct Outer o;\n\
             void main() { }\n",
        );
        let Decl::Struct(outer) = &prog.decls[1] else {
            panic!("expected struct")
        };
        let tag = syms.get(outer.fields[0].id.sym.unwrap());
        let inner = syms.get(outer.fields[1].id.sym.unwrap());
        assert_eq!(tag.offset, 0);
        assert_eq!(inner.offset, 4);
        let def = syms.struct_def(outer.id.sym.unwrap()).unwrap();
        assert_eq!(def.size, 12);
    }

    #[test]
    fn nested_block_locals_extend_the_frame() {
        let (prog, syms) = layout_src(
            "void main() { int a; if (true) { int b; b = 1; } else { int c; c = 2; } a = 0; }",
        );
        let f = fn_decl(&prog, "main");
        let a = syms.get(f.body.decls[0].id.sym.unwrap());
        assert_eq!(a.offset, -8);
        let Stmt::IfElse { then, els, .. } = &f.body.stmts[0] else {
            panic!("expected if-else")
        };
        let b = syms.get(then.decls[0].id.sym.unwrap());
        let c = syms.get(els.decls[0].id.sym.unwrap());
        assert_eq!(b.offset, -12);
        assert_eq!(c.offset, -16);
        let fs = syms.fn_sym(f.id.sym.unwrap()).unwrap();
        assert_eq!(fs.size_locals, 12);
    }
}
