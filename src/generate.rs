//! The generation entry point: probes in, validator files out.
//!
//! This is what the synthesized bootstrap driver calls. Each probed record
//! is extracted into a field tree, filtered on usefulness, and rendered;
//! nested records are then generated through the same resolve/render cycle,
//! each independently re-resolving its own imports, hooks and overrides.
//! The set of files actually written is run-scoped state, grown
//! monotonically and reported once at the end.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use indexmap::IndexSet;

use crate::emit;
use crate::error::Result;
use crate::model::{Entity, Node, TypeProbe};
use crate::model::registry::TypeRegistry;
use crate::scan;
use crate::workspace;

pub struct Definition {
    root: PathBuf,
    tag: String,
    probes: Vec<TypeProbe>,
    entities: Vec<Entity>,
    created: IndexSet<PathBuf>,
}

impl Definition {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tag: scan::DEFAULT_TAG.to_string(),
            probes: Vec::new(),
            entities: Vec::new(),
            created: IndexSet::new(),
        }
    }

    pub fn set_tag(&mut self, tag: &str) {
        self.tag = tag.to_string();
    }

    /// Register one record type for generation. Instantiating the probe
    /// makes the compiler prove the type exists at its resolved path.
    pub fn probe<T>(&mut self) {
        self.probes.push(TypeProbe::of::<T>());
    }

    /// Extract every probed record and synthesize validators for the
    /// useful ones. Extraction is all-or-nothing; synthesis failures leave
    /// earlier siblings' files in place.
    pub fn run(&mut self) -> Result<()> {
        let registry = TypeRegistry::new(self.root.clone())?;
        for probe in self.probes.clone() {
            let mut entity = Entity::new();
            entity.set_tag(&self.tag);
            entity.parse(&probe, &registry)?;
            if entity.is_useful() {
                self.entities.push(entity);
            }
        }

        let mut entities = std::mem::take(&mut self.entities);
        for entity in &mut entities {
            self.generate(entity)?;
        }
        self.entities = entities;
        Ok(())
    }

    /// Every distinct file written by this run, in creation order.
    pub fn created(&self) -> &IndexSet<PathBuf> {
        &self.created
    }

    pub fn report(&self) {
        for file in &self.created {
            println!("{} {}", "created file:".green(), file.display());
        }
    }

    fn generate(&mut self, entity: &mut Entity) -> Result<()> {
        let field_packages: Vec<String> = entity
            .fields
            .iter()
            .flat_map(|f| f.packages.iter().cloned())
            .collect();
        entity.add_packages(field_packages);

        // second static pass over the record's own directory, now keyed by
        // type name: custom hooks and override directives
        let dir = self.root.join(&entity.rel_dir);
        let files = workspace::scan_files(&dir)?;
        let result = scan::scan_files(&files)?;
        entity.hooks = result
            .hooks
            .iter()
            .filter(|h| h.receiver == entity.name)
            .cloned()
            .collect();
        if let Some(path) = result.path_override(&entity.name) {
            entity.rel_dir = PathBuf::from(path);
        }
        if let Some(module) = result.package_override(&entity.name) {
            entity.module_path = module;
        }

        let out_dir = self.root.join(&entity.rel_dir);
        if !out_dir.exists() {
            fs::create_dir_all(&out_dir)?;
        }
        let file = out_dir.join(format!(
            "{}{}",
            workspace::underscore_name(&entity.name),
            workspace::VALIDATE_SUFFIX
        ));
        let source = emit::render(entity)?;
        if let Err(error) = fs::write(&file, source) {
            let _ = fs::remove_file(&file);
            return Err(error.into());
        }
        self.created.insert(file);

        // nested records each get their own validator file
        for field in entity.fields.clone() {
            if !field.fields.is_empty() && !field.entity_name.is_empty() {
                let mut sub = self.sub_entity(&field);
                self.generate(&mut sub)?;
            }
        }
        Ok(())
    }

    fn sub_entity(&self, field: &Node) -> Entity {
        let mut sub = Entity::new();
        sub.set_tag(&self.tag);
        sub.name = field.entity_name.clone();
        sub.module_path = field.module_path.clone();
        sub.rel_dir = field.rel_dir.clone();
        sub.fields = field.fields.clone();
        sub
    }
}

// ------------------------------- Tests ------------------------------------ //
