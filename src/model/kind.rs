//! Field kind classification and shape (wrapper) analysis.
//!
//! A field type is peeled into at most one `Box` layer (indirection, the
//! star marker in emitted comparisons) and at most one `Option` layer
//! (nilability). Anything deeper is an unsupported shape.

use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Kind {
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    Bool,
    Char,
    Str,
    Vec,
    Map,
    Opt,
    Boxed,
    /// A resolved nested record.
    Struct,
    /// A named type the registry could not resolve to a struct.
    Other,
}

impl Kind {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Kind::I8
                | Kind::I16
                | Kind::I32
                | Kind::I64
                | Kind::I128
                | Kind::Isize
                | Kind::U8
                | Kind::U16
                | Kind::U32
                | Kind::U64
                | Kind::U128
                | Kind::Usize
                | Kind::F32
                | Kind::F64
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::I8 => "i8",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::I128 => "i128",
            Kind::Isize => "isize",
            Kind::U8 => "u8",
            Kind::U16 => "u16",
            Kind::U32 => "u32",
            Kind::U64 => "u64",
            Kind::U128 => "u128",
            Kind::Usize => "usize",
            Kind::F32 => "f32",
            Kind::F64 => "f64",
            Kind::Bool => "bool",
            Kind::Char => "char",
            Kind::Str => "string",
            Kind::Vec => "vec",
            Kind::Map => "map",
            Kind::Opt => "option",
            Kind::Boxed => "box",
            Kind::Struct => "struct",
            Kind::Other => "other",
        }
    }
}

/// Presence guard demanded by a `required` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NilGuard {
    /// `Option` wrapper: reject `None`.
    NoneCheck,
    /// Sequence or keyed-map kinds: reject emptiness.
    EmptyCheck,
}

/// Declared and real kind of one field, plus the innermost named path when
/// the real kind still needs registry resolution.
#[derive(Debug, Clone)]
pub struct Shape {
    pub declared: Kind,
    pub real: Kind,
    pub named: Option<syn::Path>,
}

/// Classify a type by its outermost constructor.
pub fn classify(ty: &syn::Type) -> Kind {
    let path = match ty {
        syn::Type::Path(p) => &p.path,
        syn::Type::Reference(_) => return Kind::Other,
        _ => return Kind::Other,
    };
    let Some(segment) = path.segments.last() else {
        return Kind::Other;
    };
    match segment.ident.to_string().as_str() {
        "i8" => Kind::I8,
        "i16" => Kind::I16,
        "i32" => Kind::I32,
        "i64" => Kind::I64,
        "i128" => Kind::I128,
        "isize" => Kind::Isize,
        "u8" => Kind::U8,
        "u16" => Kind::U16,
        "u32" => Kind::U32,
        "u64" => Kind::U64,
        "u128" => Kind::U128,
        "usize" => Kind::Usize,
        "f32" => Kind::F32,
        "f64" => Kind::F64,
        "bool" => Kind::Bool,
        "char" => Kind::Char,
        "String" | "str" => Kind::Str,
        "Vec" | "VecDeque" => Kind::Vec,
        "HashMap" | "BTreeMap" => Kind::Map,
        "Option" => Kind::Opt,
        "Box" => Kind::Boxed,
        _ => Kind::Other,
    }
}

/// Peel wrappers off a field type, rejecting more than one level of each.
pub fn shape_of(ty: &syn::Type, entity: &str, field: &str) -> Result<Shape> {
    let declared = classify(ty);
    let mut boxes = 0usize;
    let mut options = 0usize;
    let mut current = ty;
    loop {
        match classify(current) {
            Kind::Boxed => {
                boxes += 1;
                if boxes >= 2 {
                    return Err(unsupported(entity, field));
                }
            }
            Kind::Opt => {
                options += 1;
                if options >= 2 {
                    return Err(unsupported(entity, field));
                }
            }
            _ => break,
        }
        current = match generic_inner(current) {
            Some(inner) => inner,
            None => break,
        };
    }
    let real = classify(current);
    let named = match real {
        Kind::Other => match current {
            syn::Type::Path(p) => Some(p.path.clone()),
            _ => None,
        },
        _ => None,
    };
    Ok(Shape { declared, real, named })
}

/// First generic type argument of `Option<T>` / `Box<T>` style paths.
fn generic_inner(ty: &syn::Type) -> Option<&syn::Type> {
    let syn::Type::Path(p) = ty else { return None };
    let segment = p.path.segments.last()?;
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|a| match a {
        syn::GenericArgument::Type(t) => Some(t),
        _ => None,
    })
}

fn unsupported(entity: &str, field: &str) -> Error {
    Error::UnsupportedShape {
        entity: entity.to_string(),
        field: field.to_string(),
    }
}

// ------------------------------- Tests ------------------------------------ //
