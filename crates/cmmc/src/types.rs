/// The C-- type lattice. `Struct` carries the declared type name; two struct
/// types are equal iff their names are equal. `Error` marks an expression
/// that has already produced a diagnostic, so later phases stay quiet about
/// it. `Str` is only ever produced by a string literal; no declaration can
/// name it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Bool,
    Void,
    Str,
    Fn,
    Struct(String),
    StructDef,
    Error,
}

impl Type {
    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int)
    }
    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }
    pub fn is_str(&self) -> bool {
        matches!(self, Type::Str)
    }
    pub fn is_fn(&self) -> bool {
        matches!(self, Type::Fn)
    }
    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct(_))
    }
    pub fn is_struct_def(&self) -> bool {
        matches!(self, Type::StructDef)
    }
    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Void => write!(f, "void"),
            Type::Str => write!(f, "String"),
            Type::Fn => write!(f, "function"),
            Type::Struct(name) => write!(f, "struct {name}"),
            Type::StructDef => write!(f, "struct-def"),
            Type::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_types_compare_by_name() {
        assert_eq!(
            Type::Struct("Point".into()),
            Type::Struct("Point".into())
        );
        assert_ne!(Type::Struct("Point".into()), Type::Struct("Pair".into()));
        assert_ne!(Type::Struct("Point".into()), Type::StructDef);
    }

    #[test]
    fn display_forms() {
        assert_eq!(Type::Int.to_string(), "int");
        assert_eq!(Type::Str.to_string(), "String");
        assert_eq!(Type::Struct("P".into()).to_string(), "struct P");
    }
}
