//! The field-tree model and its extractor.
//!
//! An [`Entity`] mirrors one record type; each of its [`Node`]s mirrors one
//! field, carrying the parsed rules and, for nested records, the nested
//! record's own field tree. Extraction starts from a [`TypeProbe`] taken
//! inside the bootstrap driver: the probe carries what the language gives
//! at runtime (the canonical type path and the size, the latter forcing a
//! compile-time existence check), and the registry supplies field layout
//! from parsed source.

pub mod kind;
pub mod registry;

use std::path::PathBuf;

use indexmap::IndexSet;

use crate::error::{Error, Result};
use crate::rules::{Class, Operator};
use crate::scan::{self, CustomHook};

use kind::{Kind, NilGuard};
use registry::{Resolved, StructDecl, TypeRegistry};

/// Crate name of the synthesized bootstrap driver. Records resolving into
/// it are not expected to need validators and are skipped.
pub const DRIVER_CRATE: &str = "checkgen_driver";

/// Import keys accumulated on nodes and merged into the entity.
pub const ERRORS_IMPORT: &str = "anyhow";
pub const PATTERN_IMPORT: &str = "regex";

/// A zero-cost stand-in for an instance of the probed type.
#[derive(Debug, Clone, Copy)]
pub struct TypeProbe {
    /// Canonical crate-qualified path as the compiler sees it.
    pub type_name: &'static str,
    pub size: usize,
}

impl TypeProbe {
    pub fn of<T>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            size: std::mem::size_of::<T>(),
        }
    }
}

/// One parsed rule: an operator token and an optional literal value.
/// Unknown tokens are kept verbatim and stay inert downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub operator: String,
    pub value: Option<String>,
}

impl Tag {
    pub fn op(&self) -> Option<Operator> {
        Operator::parse(&self.operator)
    }
}

/// One field of a record, or recursively of a nested record.
#[derive(Debug, Clone)]
pub struct Node {
    /// Type name when the real kind is a nested record, empty otherwise.
    pub entity_name: String,
    pub field: String,
    pub tags: Vec<Tag>,
    pub packages: IndexSet<String>,
    pub kind: Kind,
    pub real_kind: Kind,
    pub module_path: String,
    pub rel_dir: PathBuf,
    pub fields: Vec<Node>,
}

impl Node {
    /// Dereference marker for emitted comparisons: `*` through a box, the
    /// empty marker for plain fields, nothing through an option (no total
    /// dereference exists).
    pub fn star(&self) -> Option<&'static str> {
        match self.kind {
            Kind::Opt => None,
            Kind::Boxed => Some("*"),
            _ => Some(""),
        }
    }

    /// Which presence guard a `required` rule demands for this field.
    pub fn nil_guard(&self) -> Option<NilGuard> {
        if self.kind == Kind::Opt {
            Some(NilGuard::NoneCheck)
        } else if matches!(self.real_kind, Kind::Vec | Kind::Map) {
            Some(NilGuard::EmptyCheck)
        } else {
            None
        }
    }
}

/// One record type, extracted and ready for synthesis.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    /// Owning module path inside the crate, empty for the crate root.
    pub module_path: String,
    /// Destination directory relative to the workspace root.
    pub rel_dir: PathBuf,
    pub packages: IndexSet<String>,
    pub tag: String,
    pub invalid: bool,
    pub fields: Vec<Node>,
    /// Custom hooks resolved late, at synthesis time.
    pub hooks: Vec<CustomHook>,
}

impl Entity {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            module_path: String::new(),
            rel_dir: PathBuf::new(),
            packages: IndexSet::new(),
            tag: scan::DEFAULT_TAG.to_string(),
            invalid: false,
            fields: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn set_tag(&mut self, tag: &str) {
        self.tag = tag.to_string();
    }

    /// A record is worth a validator iff at least one field carries at
    /// least one parsed rule.
    pub fn is_useful(&self) -> bool {
        !self.invalid && self.fields.iter().any(|f| !f.tags.is_empty())
    }

    pub fn add_packages<I, S>(&mut self, packages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for p in packages {
            let p = p.into();
            if !p.trim().is_empty() {
                self.packages.insert(p);
            }
        }
    }

    /// Build this entity's field tree from a probe.
    pub fn parse(&mut self, probe: &TypeProbe, registry: &TypeRegistry) -> Result<()> {
        // a single reference level is accepted, like a single pointer level
        let canonical = probe.type_name.trim_start_matches('&');
        let Some(first) = canonical.split("::").next() else {
            return Err(Error::InvalidEntity);
        };
        if first == DRIVER_CRATE || first == "main" {
            self.invalid = true;
            return Ok(());
        }

        let decl = match registry.resolve(canonical)? {
            Resolved::Struct(decl) => decl,
            Resolved::NotAStruct | Resolved::Unknown => return Err(Error::InvalidEntity),
        };
        self.name = decl.name.clone();
        self.module_path = decl.module_path.clone();
        self.rel_dir = decl.rel_dir.clone();

        let mut visited = vec![canonical.to_string()];
        parse_fields(&mut self.fields, &decl, registry, &self.tag, &mut visited)
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk the public named fields of `decl`, appending one node per field and
/// recursing into nested records. `visited` holds the canonical paths on
/// the current recursion stack; a repeat short-circuits (the node keeps its
/// identity but gets no sub-tree).
fn parse_fields(
    out: &mut Vec<Node>,
    decl: &StructDecl,
    registry: &TypeRegistry,
    tag: &str,
    visited: &mut Vec<String>,
) -> Result<()> {
    let syn::Fields::Named(named) = &decl.item.fields else {
        return Ok(());
    };
    for field in &named.named {
        if !matches!(field.vis, syn::Visibility::Public(_)) {
            continue;
        }
        let Some(ident) = &field.ident else { continue };
        let name = ident.to_string();
        let shape = kind::shape_of(&field.ty, &decl.name, &name)?;

        let mut node = Node {
            entity_name: String::new(),
            field: name,
            tags: Vec::new(),
            packages: IndexSet::new(),
            kind: shape.declared,
            real_kind: shape.real,
            module_path: String::new(),
            rel_dir: PathBuf::new(),
            fields: Vec::new(),
        };

        if let Some(raw) = scan::annotation_value(&field.attrs, tag) {
            node.tags = parse_tag(&raw);
        }
        let star = node.star();
        for t in &node.tags {
            if t.op().map(Operator::class) == Some(Class::Pattern)
                && shape.real == Kind::Str
                && star.is_some()
            {
                node.packages.insert(PATTERN_IMPORT.to_string());
            }
            node.packages.insert(ERRORS_IMPORT.to_string());
        }

        if let Some(path) = &shape.named {
            if let Some(canonical) = registry.canonicalize(decl, path) {
                if let Resolved::Struct(sub) = registry.resolve(&canonical)? {
                    node.real_kind = Kind::Struct;
                    node.entity_name = sub.name.clone();
                    node.module_path = sub.module_path.clone();
                    node.rel_dir = sub.rel_dir.clone();
                    if !visited.contains(&canonical) {
                        visited.push(canonical);
                        parse_fields(&mut node.fields, &sub, registry, tag, visited)?;
                        visited.pop();
                    }
                }
            }
        }
        out.push(node);
    }
    Ok(())
}

/// Split a raw annotation value into ordered tags. An empty or absent value
/// means zero rules, never an error.
pub fn parse_tag(raw: &str) -> Vec<Tag> {
    let raw = raw.trim().trim_matches(';');
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(';')
        .filter_map(|clause| {
            let mut tokens = clause.split_whitespace();
            let operator = tokens.next()?.to_string();
            let value = tokens.next().map(str::to_string);
            Some(Tag { operator, value })
        })
        .collect()
}

// ------------------------------- Tests ------------------------------------ //
