//! The annotation scanner: one static `syn` pass per source file, no
//! execution.
//!
//! Collected per file:
//! - struct declarations (the candidate records), with their doc-comment
//!   block indexed by type name for later override lookup;
//! - methods whose doc comment carries the exact hook marker and whose
//!   signature matches the custom-validator contract.
//!
//! Merging across files: entity and hook lists concatenate, a later file's
//! annotation entry for the same type name wins. Any file that fails to
//! parse fails the whole scan.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;

use crate::error::{Error, Result};

/// Default tag introducing a field rule line: `/// @check: gt 0;lt 100`.
pub const DEFAULT_TAG: &str = "check";
/// Exact marker line promoting a method to a custom validator hook.
pub const HOOK_MARKER: &str = "@ext:check";
/// Type-level directive overriding the destination directory.
pub const PATH_DIRECTIVE: &str = "@path:";
/// Type-level directive overriding the owning module path.
pub const PACKAGE_DIRECTIVE: &str = "@package:";

/// A user-authored validator method spliced into the generated validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomHook {
    pub name: String,
    /// Name of the receiver type the hook is implemented on.
    pub receiver: String,
    /// Rendered return type, kept for the inspect view.
    pub returns: String,
}

/// One discovered record declaration. The defining file is recorded because
/// Rust modules are file-granular.
#[derive(Debug, Clone, Serialize)]
pub struct EntityDecl {
    pub name: String,
    pub file: PathBuf,
}

/// Aggregate output of one scan over the files of a single directory.
#[derive(Debug, Default, Serialize)]
pub struct ScanResult {
    pub hooks: Vec<CustomHook>,
    /// Trimmed doc lines per type name, override directives included.
    pub annotations: HashMap<String, Vec<String>>,
    pub entities: Vec<EntityDecl>,
    /// Directory-level module name of the scanned files.
    pub package: String,
}

impl ScanResult {
    pub fn path_override(&self, entity: &str) -> Option<String> {
        self.directive(entity, PATH_DIRECTIVE)
    }

    pub fn package_override(&self, entity: &str) -> Option<String> {
        self.directive(entity, PACKAGE_DIRECTIVE)
    }

    fn directive(&self, entity: &str, prefix: &str) -> Option<String> {
        let lines = self.annotations.get(entity)?;
        lines.iter().find_map(|line| {
            line.strip_prefix(prefix)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
    }
}

/// Scan a set of source files belonging to one directory.
pub fn scan_files(paths: &[PathBuf]) -> Result<ScanResult> {
    let mut result = ScanResult::default();
    for path in paths {
        let pass = scan_file(path)?;
        result.hooks.extend(pass.hooks);
        for (name, lines) in pass.annotations {
            result.annotations.insert(name, lines);
        }
        result.entities.extend(pass.entities);
    }
    if let Some(first) = paths.first() {
        result.package = first
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
    }
    Ok(result)
}

struct FilePass {
    hooks: Vec<CustomHook>,
    annotations: HashMap<String, Vec<String>>,
    entities: Vec<EntityDecl>,
}

fn scan_file(path: &Path) -> Result<FilePass> {
    let source = fs::read_to_string(path)?;
    let ast = syn::parse_file(&source).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut pass = FilePass {
        hooks: Vec::new(),
        annotations: HashMap::new(),
        entities: Vec::new(),
    };
    for item in &ast.items {
        match item {
            syn::Item::Struct(decl) => visit_struct(decl, path, &mut pass),
            syn::Item::Impl(block) if block.trait_.is_none() => visit_impl(block, &mut pass),
            _ => {}
        }
    }
    Ok(pass)
}

fn visit_struct(decl: &syn::ItemStruct, path: &Path, pass: &mut FilePass) {
    let name = decl.ident.to_string();
    if !decl.generics.params.is_empty() {
        note(&format!("skipping generic struct {name}"));
        return;
    }
    let docs = doc_lines(&decl.attrs);
    if !docs.is_empty() {
        pass.annotations.insert(name.clone(), docs);
    }
    pass.entities.push(EntityDecl {
        name,
        file: path.to_path_buf(),
    });
}

fn visit_impl(block: &syn::ItemImpl, pass: &mut FilePass) {
    let receiver = match &*block.self_ty {
        syn::Type::Path(p) => match p.path.segments.last() {
            Some(segment) => segment.ident.to_string(),
            None => return,
        },
        _ => return,
    };
    for item in &block.items {
        let syn::ImplItem::Fn(method) = item else { continue };
        let docs = doc_lines(&method.attrs);
        if !docs.iter().any(|line| line == HOOK_MARKER) {
            continue;
        }
        match hook_of(&receiver, method) {
            Some(hook) => pass.hooks.push(hook),
            None => note(&format!(
                "custom hook {receiver}::{} skipped: expected signature fn(&self) -> anyhow::Result<()>",
                method.sig.ident
            )),
        }
    }
}

/// Check the custom-validator contract: a receiver and nothing else, and a
/// single `Result` return.
fn hook_of(receiver: &str, method: &syn::ImplItemFn) -> Option<CustomHook> {
    let mut inputs = method.sig.inputs.iter();
    match inputs.next() {
        Some(syn::FnArg::Receiver(_)) => {}
        _ => return None,
    }
    if inputs.next().is_some() {
        return None;
    }
    let syn::ReturnType::Type(_, ty) = &method.sig.output else {
        return None;
    };
    let syn::Type::Path(p) = &**ty else { return None };
    let last = p.path.segments.last()?;
    if last.ident != "Result" {
        return None;
    }
    let rendered: proc_macro2::TokenStream = quote::quote!(#ty);
    Some(CustomHook {
        name: method.sig.ident.to_string(),
        receiver: receiver.to_string(),
        returns: rendered.to_string(),
    })
}

/// Trimmed doc-comment lines of an item.
pub fn doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        let syn::Meta::NameValue(nv) = &attr.meta else { continue };
        let syn::Expr::Lit(lit) = &nv.value else { continue };
        if let syn::Lit::Str(s) = &lit.lit {
            lines.push(s.value().trim().to_string());
        }
    }
    lines
}

/// The raw annotation value of a field under `tag`, if any.
pub fn annotation_value(attrs: &[syn::Attribute], tag: &str) -> Option<String> {
    let marker = format!("@{tag}:");
    doc_lines(attrs)
        .iter()
        .find_map(|line| line.strip_prefix(&marker).map(|v| v.trim().to_string()))
}

fn note(message: &str) {
    eprintln!("{} {message}", "note:".yellow().bold());
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scan_sources(sources: &[(&str, &str)]) -> Result<ScanResult> {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (name, src) in sources {
            let path = dir.path().join(name);
            fs::write(&path, src).unwrap();
            paths.push(path);
        }
        scan_files(&paths)
    }

    #[test]
    fn structs_and_their_doc_blocks_are_discovered() {
        let result = scan_sources(&[(
            "user.rs",
            r#"
/// @path: custom/dir
/// @package: custom::module
pub struct User {
    pub id: i64,
}

pub enum NotARecord { A }
"#,
        )])
        .unwrap();
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].name, "User");
        assert_eq!(result.path_override("User").as_deref(), Some("custom/dir"));
        assert_eq!(
            result.package_override("User").as_deref(),
            Some("custom::module")
        );
        assert_eq!(result.path_override("Ghost"), None);
    }

    #[test]
    fn later_files_win_for_annotations_and_lists_concatenate() {
        let result = scan_sources(&[
            ("a.rs", "/// @path: first\npub struct User;"),
            ("b.rs", "/// @path: second\npub struct User;"),
        ])
        .unwrap();
        assert_eq!(result.entities.len(), 2, "entity lists concatenate");
        assert_eq!(result.path_override("User").as_deref(), Some("second"));
    }

    #[test]
    fn marked_hooks_with_the_right_signature_are_collected() {
        let result = scan_sources(&[(
            "user.rs",
            r#"
pub struct User { pub id: i64 }

impl User {
    /// @ext:check
    pub fn extra_rules(&self) -> anyhow::Result<()> { Ok(()) }

    /// plain method, no marker
    pub fn ignored(&self) -> anyhow::Result<()> { Ok(()) }
}
"#,
        )])
        .unwrap();
        assert_eq!(result.hooks.len(), 1);
        assert_eq!(result.hooks[0].name, "extra_rules");
        assert_eq!(result.hooks[0].receiver, "User");
    }

    #[test]
    fn hooks_with_bad_signatures_are_skipped_not_fatal() {
        let result = scan_sources(&[(
            "user.rs",
            r#"
pub struct User { pub id: i64 }

impl User {
    /// @ext:check
    pub fn takes_arg(&self, limit: i64) -> anyhow::Result<()> { let _ = limit; Ok(()) }

    /// @ext:check
    pub fn wrong_return(&self) -> bool { true }

    /// @ext:check
    pub fn no_receiver() -> anyhow::Result<()> { Ok(()) }
}
"#,
        )])
        .unwrap();
        assert!(result.hooks.is_empty());
        assert_eq!(result.entities.len(), 1, "scan itself continues");
    }

    #[test]
    fn generic_structs_are_not_candidates() {
        let result = scan_sources(&[("w.rs", "pub struct Wrap<T> { pub inner: T }")]).unwrap();
        assert!(result.entities.is_empty());
    }

    #[test]
    fn an_unparsable_file_fails_the_whole_scan() {
        let err = scan_sources(&[
            ("ok.rs", "pub struct User;"),
            ("broken.rs", "pub struct {"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn field_annotation_values_are_extracted_under_the_tag() {
        let file: syn::File = syn::parse_str(
            r#"
pub struct Basic {
    /// @check: gt 0;lt 100
    pub id: i64,
    /// plain docs only
    pub name: String,
}
"#,
        )
        .unwrap();
        let syn::Item::Struct(decl) = &file.items[0] else { panic!("fixture") };
        let fields: Vec<_> = match &decl.fields {
            syn::Fields::Named(n) => n.named.iter().collect(),
            _ => panic!("fixture"),
        };
        assert_eq!(
            annotation_value(&fields[0].attrs, DEFAULT_TAG).as_deref(),
            Some("gt 0;lt 100")
        );
        assert_eq!(annotation_value(&fields[1].attrs, DEFAULT_TAG), None);
    }
}
