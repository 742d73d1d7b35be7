//! Validator rendering: a statement-list builder over plain indented lines,
//! so what the generated validator must contain stays testable apart from
//! how it is laid out.

use crate::error::{Error, Result};
use crate::model::kind::{Kind, NilGuard};
use crate::model::{Entity, Node, ERRORS_IMPORT, PATTERN_IMPORT};
use crate::rules::Operator;

const HEADER: &str = "// Code generated by checkgen. Do not edit.";

pub struct Emitter {
    buf: String,
    indent: usize,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            indent: 0,
        }
    }

    pub fn into_string(self) -> String {
        self.buf
    }

    /// Render one entity's complete validator file.
    pub fn emit_entity(&mut self, entity: &Entity) -> Result<()> {
        if entity.name.is_empty() {
            return Err(Error::Render {
                what: "validator".to_string(),
                detail: "entity has no name".to_string(),
            });
        }

        self.line(HEADER);
        self.blank();
        let mut wrote_import = false;
        if entity.packages.contains(ERRORS_IMPORT) {
            self.line("use anyhow::bail;");
            wrote_import = true;
        }
        if entity.packages.contains(PATTERN_IMPORT) {
            self.line("use regex::Regex;");
            wrote_import = true;
        }
        if wrote_import {
            self.blank();
        }
        if entity.module_path.is_empty() {
            self.line(&format!("use crate::{};", entity.name));
        } else {
            self.line(&format!("use crate::{}::{};", entity.module_path, entity.name));
        }
        self.blank();

        self.open(&format!("impl {}", entity.name));
        self.open("pub fn validate(&self) -> anyhow::Result<()>");
        for field in &entity.fields {
            self.emit_field(field);
        }
        for hook in &entity.hooks {
            self.line(&format!("self.{}()?;", hook.name));
        }
        self.line("Ok(())");
        self.close();
        self.close();
        Ok(())
    }

    /// One field: guards and checks in rule-declaration order.
    fn emit_field(&mut self, field: &Node) {
        let star = field.star();
        for tag in &field.tags {
            let Some(op) = tag.op() else { continue };

            if op == Operator::Required {
                match field.nil_guard() {
                    Some(NilGuard::NoneCheck) => {
                        self.open(&format!("if self.{}.is_none()", field.field));
                        self.line(&format!("bail!(\"{} must not be none\");", field.field));
                        self.close();
                    }
                    Some(NilGuard::EmptyCheck) => {
                        self.open(&format!("if self.{}.is_empty()", field.field));
                        self.line(&format!("bail!(\"{} must not be empty\");", field.field));
                        self.close();
                    }
                    None => {}
                }
            }

            if let Some(expr) =
                op.failure_expr(&field.field, star, tag.value.as_deref(), field.real_kind)
            {
                self.open(&format!("if {expr}"));
                self.line(&format!(
                    "bail!(\"{}\");",
                    op.message(&field.field, tag.value.as_deref())
                ));
                self.close();
            }

            if op == Operator::Required && field.real_kind == Kind::Struct {
                if field.kind == Kind::Opt {
                    self.open(&format!("if let Some(inner) = self.{}.as_ref()", field.field));
                    self.line("inner.validate()?;");
                    self.close();
                } else {
                    self.line(&format!("self.{}.validate()?;", field.field));
                }
            }
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.buf.push_str("    ");
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    fn blank(&mut self) {
        self.buf.push('\n');
    }

    fn open(&mut self, head: &str) {
        self.line(&format!("{head} {{"));
        self.indent += 1;
    }

    fn close(&mut self) {
        self.indent -= 1;
        self.line("}");
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience: render an entity to a complete source string.
pub fn render(entity: &Entity) -> Result<String> {
    let mut emitter = Emitter::new();
    emitter.emit_entity(entity)?;
    Ok(emitter.into_string())
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Tag, TypeProbe};
    use crate::scan::CustomHook;
    use indexmap::IndexSet;
    use std::path::PathBuf;

    fn tag(operator: &str, value: Option<&str>) -> Tag {
        Tag {
            operator: operator.to_string(),
            value: value.map(str::to_string),
        }
    }

    fn node(field: &str, kind: Kind, real: Kind, tags: Vec<Tag>) -> Node {
        Node {
            entity_name: String::new(),
            field: field.to_string(),
            tags,
            packages: IndexSet::new(),
            kind,
            real_kind: real,
            module_path: String::new(),
            rel_dir: PathBuf::new(),
            fields: Vec::new(),
        }
    }

    fn entity(name: &str, fields: Vec<Node>) -> Entity {
        let mut e = Entity::new();
        e.name = name.to_string();
        e.module_path = "models".to_string();
        e.fields = fields;
        e.add_packages([ERRORS_IMPORT]);
        e
    }

    #[test]
    fn rendered_validators_are_well_formed_source() {
        let mut e = entity(
            "Basic",
            vec![
                node("id", Kind::I64, Kind::I64, vec![tag("gt", Some("0")), tag("lt", Some("100"))]),
                node("email", Kind::Str, Kind::Str, vec![tag("email", None)]),
            ],
        );
        e.add_packages([PATTERN_IMPORT]);
        let source = render(&e).unwrap();
        syn::parse_file(&source).expect("generated source parses");
        assert!(source.contains("impl Basic {"));
        assert!(source.contains("pub fn validate(&self) -> anyhow::Result<()> {"));
        assert!(source.contains("if self.id <= 0 {"));
        assert!(source.contains("bail!(\"id must be gt 0\");"));
        assert!(source.contains("if self.id >= 100 {"));
        assert!(source.contains("is_match(&self.email)"));
        assert!(source.contains("use crate::models::Basic;"));
        assert!(source.trim_end().ends_with('}'));
    }

    #[test]
    fn checks_follow_field_then_rule_declaration_order() {
        let e = entity(
            "Basic",
            vec![
                node("id", Kind::I64, Kind::I64, vec![tag("gt", Some("0")), tag("lt", Some("100"))]),
                node("name", Kind::Str, Kind::Str, vec![tag("notEmpty", None)]),
            ],
        );
        let source = render(&e).unwrap();
        let gt = source.find("self.id <= 0").unwrap();
        let lt = source.find("self.id >= 100").unwrap();
        let ne = source.find("self.name.is_empty()").unwrap();
        assert!(gt < lt && lt < ne);
    }

    #[test]
    fn required_direct_record_recurses_without_a_nil_check() {
        let mut address = node("address", Kind::Struct, Kind::Struct, vec![tag("required", None)]);
        address.entity_name = "Address".to_string();
        let source = render(&entity("Nested", vec![address])).unwrap();
        assert!(source.contains("self.address.validate()?;"));
        assert!(!source.contains("self.address.is_none()"));
    }

    #[test]
    fn required_optional_record_guards_before_recursing() {
        let mut addr = node("addr", Kind::Opt, Kind::Struct, vec![tag("required", None)]);
        addr.entity_name = "Address".to_string();
        let source = render(&entity("Nested", vec![addr])).unwrap();
        let guard = source.find("if self.addr.is_none() {").unwrap();
        let recurse = source.find("if let Some(inner) = self.addr.as_ref() {").unwrap();
        assert!(guard < recurse);
        assert!(source.contains("inner.validate()?;"));
        assert!(source.contains("bail!(\"addr must not be none\");"));
    }

    #[test]
    fn required_sequences_get_an_emptiness_guard() {
        let items = node("items", Kind::Vec, Kind::Vec, vec![tag("required", None)]);
        let source = render(&entity("Cart", vec![items])).unwrap();
        assert!(source.contains("if self.items.is_empty() {"));
        assert!(source.contains("bail!(\"items must not be empty\");"));
        assert!(!source.contains("validate()?;"), "no recursion into sequences");
    }

    #[test]
    fn unknown_operators_and_inapplicable_rules_emit_nothing() {
        let e = entity(
            "Basic",
            vec![node("id", Kind::I64, Kind::I64, vec![tag("shouty", None), tag("email", None)])],
        );
        let source = render(&e).unwrap();
        assert!(!source.contains("shouty"));
        assert!(!source.contains("Regex"));
    }

    #[test]
    fn hooks_are_called_after_all_checks_in_order() {
        let mut e = entity(
            "Basic",
            vec![node("id", Kind::I64, Kind::I64, vec![tag("gt", Some("0"))])],
        );
        e.hooks = vec![
            CustomHook {
                name: "tighten".to_string(),
                receiver: "Basic".to_string(),
                returns: "anyhow :: Result < () >".to_string(),
            },
            CustomHook {
                name: "cross_check".to_string(),
                receiver: "Basic".to_string(),
                returns: "anyhow :: Result < () >".to_string(),
            },
        ];
        let source = render(&e).unwrap();
        let check = source.find("self.id <= 0").unwrap();
        let first = source.find("self.tighten()?;").unwrap();
        let second = source.find("self.cross_check()?;").unwrap();
        let done = source.find("Ok(())").unwrap();
        assert!(check < first && first < second && second < done);
    }

    #[test]
    fn entities_without_a_name_refuse_to_render() {
        let mut e = Entity::new();
        e.fields = vec![];
        assert!(matches!(render(&e), Err(Error::Render { .. })));
        // probes exist solely to carry compile-time identity
        let p = TypeProbe::of::<i64>();
        assert_eq!(p.type_name, "i64");
        assert_eq!(p.size, 8);
    }
}
