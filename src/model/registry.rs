//! Lazy, file-backed resolution of canonical type paths to struct
//! declarations.
//!
//! Runtime probes hand the extractor canonical paths such as
//! `my_pkg::models::user::User`; this registry maps the module part back to
//! a source file (`src/models/user.rs` or `src/models/user/mod.rs`), parses
//! it once, and looks the item up. Field types are canonicalized through
//! the defining file's `use` declarations before resolution, which is how
//! cross-module nested records are reached.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use quote::ToTokens;

use crate::error::{Error, Result};
use crate::workspace;

/// One parsed module file plus its import map.
struct ModuleSource {
    /// Module path segments inside the crate (empty for the crate root).
    segments: Vec<String>,
    /// Directory of the file, relative to the workspace root.
    rel_dir: PathBuf,
    ast: syn::File,
    /// Leaf identifier to full path segments, from `use` declarations.
    uses: HashMap<String, Vec<String>>,
}

/// A struct declaration the registry resolved.
#[derive(Clone)]
pub struct StructDecl {
    pub name: String,
    /// `models::user` style module path, empty for the crate root.
    pub module_path: String,
    /// Directory holding the defining file, relative to the workspace root.
    pub rel_dir: PathBuf,
    pub item: syn::ItemStruct,
    module: Rc<ModuleRef>,
}

struct ModuleRef {
    segments: Vec<String>,
    uses: HashMap<String, Vec<String>>,
}

pub enum Resolved {
    Struct(StructDecl),
    /// The name resolves, but to an enum, union or alias.
    NotAStruct,
    /// Nothing under that path, or a foreign crate.
    Unknown,
}

pub struct TypeRegistry {
    root: PathBuf,
    /// Crate identifier in path position (`-` folded to `_`).
    package: String,
    cache: RefCell<HashMap<String, Option<Rc<ModuleSource>>>>,
}

impl TypeRegistry {
    pub fn new(root: PathBuf) -> Result<Self> {
        let package = workspace::module_name(&root)?.replace('-', "_");
        Ok(Self {
            root,
            package,
            cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Resolve a canonical `pkg::module::Type` path.
    pub fn resolve(&self, canonical: &str) -> Result<Resolved> {
        let segments: Vec<&str> = canonical.split("::").collect();
        let [first, middle @ .., name] = segments.as_slice() else {
            return Ok(Resolved::Unknown);
        };
        if *first != self.package {
            return Ok(Resolved::Unknown);
        }
        let Some(module) = self.load_module(middle)? else {
            return Ok(Resolved::Unknown);
        };

        for item in &module.ast.items {
            match item {
                syn::Item::Struct(decl) if decl.ident == name => {
                    return Ok(Resolved::Struct(StructDecl {
                        name: decl.ident.to_string(),
                        module_path: module.segments.join("::"),
                        rel_dir: module.rel_dir.clone(),
                        item: decl.clone(),
                        module: Rc::new(ModuleRef {
                            segments: module.segments.clone(),
                            uses: module.uses.clone(),
                        }),
                    }));
                }
                syn::Item::Enum(decl) if decl.ident == name => return Ok(Resolved::NotAStruct),
                syn::Item::Union(decl) if decl.ident == name => return Ok(Resolved::NotAStruct),
                syn::Item::Type(decl) if decl.ident == name => return Ok(Resolved::NotAStruct),
                _ => {}
            }
        }
        Ok(Resolved::Unknown)
    }

    /// Canonicalize a field type path relative to the module that declares
    /// the field. Returns `None` for foreign crates and unresolvable forms.
    pub fn canonicalize(&self, decl: &StructDecl, path: &syn::Path) -> Option<String> {
        let segments: Vec<String> = path
            .segments
            .iter()
            .map(|s| s.ident.to_string())
            .collect();
        if segments.is_empty() || path.segments.iter().any(|s| !s.arguments.is_empty()) {
            return None;
        }
        let current = &decl.module.segments;
        let uses = &decl.module.uses;

        let absolute = |mods: &[String]| -> String {
            let mut all = vec![self.package.clone()];
            all.extend(mods.iter().cloned());
            all.join("::")
        };

        match segments[0].as_str() {
            "crate" => Some(absolute(&segments[1..])),
            "self" => {
                let mut mods = current.clone();
                mods.extend(segments[1..].iter().cloned());
                Some(absolute(&mods))
            }
            "super" => {
                let supers = segments.iter().take_while(|s| *s == "super").count();
                if supers > current.len() {
                    return None;
                }
                let mut mods = current[..current.len() - supers].to_vec();
                mods.extend(segments[supers..].iter().cloned());
                Some(absolute(&mods))
            }
            first if first == self.package => Some(segments.join("::")),
            first => {
                if let Some(mapped) = uses.get(first) {
                    let mut full = mapped.clone();
                    full.extend(segments[1..].iter().cloned());
                    // the mapped path itself may be crate/super/self relative
                    let rendered = full.join("::");
                    let path: syn::Path = syn::parse_str(&rendered).ok()?;
                    if full.first().map(String::as_str) == Some(first) {
                        // direct external path, nothing more to fold
                        return Some(rendered);
                    }
                    return self.canonicalize(decl, &path);
                }
                if segments.len() == 1 {
                    // bare identifier: assume the declaring module
                    let mut mods = current.clone();
                    mods.push(segments[0].clone());
                    Some(absolute(&mods))
                } else {
                    None
                }
            }
        }
    }

    fn load_module(&self, segments: &[&str]) -> Result<Option<Rc<ModuleSource>>> {
        let key = segments.join("::");
        if let Some(cached) = self.cache.borrow().get(&key) {
            return Ok(cached.clone());
        }
        let loaded = self.load_module_uncached(segments)?;
        self.cache.borrow_mut().insert(key, loaded.clone());
        Ok(loaded)
    }

    fn load_module_uncached(&self, segments: &[&str]) -> Result<Option<Rc<ModuleSource>>> {
        let src = self.root.join("src");
        let mut candidates = Vec::new();
        if segments.is_empty() {
            candidates.push(src.join("lib.rs"));
            candidates.push(src.join("main.rs"));
        } else {
            let mut base = src.clone();
            for s in &segments[..segments.len() - 1] {
                base = base.join(s);
            }
            let last = segments[segments.len() - 1];
            candidates.push(base.join(format!("{last}.rs")));
            candidates.push(base.join(last).join("mod.rs"));
        }
        let Some(file) = candidates.into_iter().find(|c| c.is_file()) else {
            return Ok(None);
        };

        let source = fs::read_to_string(&file)?;
        let ast = syn::parse_file(&source).map_err(|source| Error::Parse {
            path: file.clone(),
            source,
        })?;
        let uses = collect_uses(&ast);
        let rel_dir = file
            .parent()
            .unwrap_or(Path::new(""))
            .strip_prefix(&self.root)
            .unwrap_or(Path::new("src"))
            .to_path_buf();
        Ok(Some(Rc::new(ModuleSource {
            segments: segments.iter().map(|s| s.to_string()).collect(),
            rel_dir,
            ast,
            uses,
        })))
    }
}

/// Leaf identifier to full path segments, for every `use` in the file.
fn collect_uses(ast: &syn::File) -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    for item in &ast.items {
        if let syn::Item::Use(u) = item {
            walk_use(&u.tree, &mut Vec::new(), &mut map);
        }
    }
    map
}

fn walk_use(tree: &syn::UseTree, prefix: &mut Vec<String>, map: &mut HashMap<String, Vec<String>>) {
    match tree {
        syn::UseTree::Path(p) => {
            prefix.push(p.ident.to_string());
            walk_use(&p.tree, prefix, map);
            prefix.pop();
        }
        syn::UseTree::Name(n) => {
            let mut full = prefix.clone();
            full.push(n.ident.to_string());
            map.insert(n.ident.to_string(), full);
        }
        syn::UseTree::Rename(r) => {
            let mut full = prefix.clone();
            full.push(r.ident.to_string());
            map.insert(r.rename.to_string(), full);
        }
        syn::UseTree::Group(g) => {
            for tree in &g.items {
                walk_use(tree, prefix, map);
            }
        }
        syn::UseTree::Glob(_) => {}
    }
}

impl std::fmt::Debug for StructDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructDecl")
            .field("name", &self.name)
            .field("module_path", &self.module_path)
            .field("rel_dir", &self.rel_dir)
            .field("item", &self.item.to_token_stream().to_string())
            .finish()
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture(files: &[(&str, &str)]) -> (tempfile::TempDir, TypeRegistry) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"fixture\"\n",
        )
        .unwrap();
        for (rel, src) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, src).unwrap();
        }
        let registry = TypeRegistry::new(dir.path().to_path_buf()).unwrap();
        (dir, registry)
    }

    #[test]
    fn resolves_structs_through_the_module_layout() {
        let (_dir, registry) = fixture(&[
            ("src/lib.rs", "pub mod models;"),
            ("src/models.rs", "pub mod user;"),
            ("src/models/user.rs", "pub struct User { pub id: i64 }"),
        ]);
        let Resolved::Struct(decl) = registry.resolve("fixture::models::user::User").unwrap()
        else {
            panic!("expected a struct");
        };
        assert_eq!(decl.name, "User");
        assert_eq!(decl.module_path, "models::user");
        assert_eq!(decl.rel_dir, Path::new("src/models"));
    }

    #[test]
    fn foreign_crates_and_missing_names_resolve_to_unknown() {
        let (_dir, registry) = fixture(&[("src/lib.rs", "pub struct Root;")]);
        assert!(matches!(
            registry.resolve("serde::Deserialize").unwrap(),
            Resolved::Unknown
        ));
        assert!(matches!(
            registry.resolve("fixture::Ghost").unwrap(),
            Resolved::Unknown
        ));
        assert!(matches!(
            registry.resolve("fixture::Root").unwrap(),
            Resolved::Struct(_)
        ));
    }

    #[test]
    fn enums_resolve_but_are_not_structs() {
        let (_dir, registry) = fixture(&[("src/lib.rs", "pub enum Mode { A, B }")]);
        assert!(matches!(
            registry.resolve("fixture::Mode").unwrap(),
            Resolved::NotAStruct
        ));
    }

    #[test]
    fn field_paths_canonicalize_through_use_declarations() {
        let (_dir, registry) = fixture(&[
            ("src/lib.rs", "pub mod models;"),
            ("src/models.rs", "pub mod address;\npub mod nested;"),
            (
                "src/models/address.rs",
                "pub struct Address { pub id: i64 }",
            ),
            (
                "src/models/nested.rs",
                "use super::address::Address;\npub struct Nested { pub address: Address }",
            ),
        ]);
        let Resolved::Struct(nested) = registry.resolve("fixture::models::nested::Nested").unwrap()
        else {
            panic!("expected a struct");
        };
        let path: syn::Path = syn::parse_str("Address").unwrap();
        assert_eq!(
            registry.canonicalize(&nested, &path).as_deref(),
            Some("fixture::models::address::Address")
        );

        let absolute: syn::Path = syn::parse_str("crate::models::address::Address").unwrap();
        assert_eq!(
            registry.canonicalize(&nested, &absolute).as_deref(),
            Some("fixture::models::address::Address")
        );

        let foreign: syn::Path = syn::parse_str("chrono::DateTime").unwrap();
        assert_eq!(registry.canonicalize(&nested, &foreign), None);
    }

    #[test]
    fn bare_identifiers_fall_back_to_the_declaring_module() {
        let (_dir, registry) = fixture(&[(
            "src/lib.rs",
            "pub struct Inner { pub id: i64 }\npub struct Outer { pub inner: Inner }",
        )]);
        let Resolved::Struct(outer) = registry.resolve("fixture::Outer").unwrap() else {
            panic!("expected a struct");
        };
        let path: syn::Path = syn::parse_str("Inner").unwrap();
        assert_eq!(
            registry.canonicalize(&outer, &path).as_deref(),
            Some("fixture::Inner")
        );
    }
}
