//! The phase-ordered orchestrator: scan, then bootstrap. Extraction and
//! synthesis run inside the bootstrap subprocess; this side only scans,
//! launches, waits, and surfaces the captured streams.

use std::ffi::OsStr;
use std::path::PathBuf;

use colored::Colorize;

use crate::bootstrap::{Bootstrap, DriverSpec};
use crate::error::{Error, Result};
use crate::scan;
use crate::workspace;

pub struct Pipeline {
    pub files: Vec<PathBuf>,
    pub tag: String,
    pub bootstrap: Bootstrap,
}

impl Pipeline {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            tag: scan::DEFAULT_TAG.to_string(),
            bootstrap: Bootstrap::default(),
        }
    }

    pub fn run(&self) -> Result<()> {
        let Some(first) = self.files.first() else {
            return Err(Error::Environment("no source files to scan".to_string()));
        };
        let dir = first
            .parent()
            .ok_or_else(|| Error::Environment(format!("{} has no parent", first.display())))?
            .to_path_buf();
        if self.files.iter().any(|f| f.parent() != Some(dir.as_path())) {
            return Err(Error::Environment(
                "source files must all come from one directory".to_string(),
            ));
        }

        let root = workspace::workspace_root(&dir)?;
        let package = workspace::module_name(&root)?;

        let result = scan::scan_files(&self.files)?;

        // the binary crate root is not expected to need validators
        if self
            .files
            .iter()
            .any(|f| f.file_name() == Some(OsStr::new("main.rs")))
        {
            eprintln!(
                "{} {} is a binary crate root, nothing to generate",
                "note:".yellow().bold(),
                dir.display()
            );
            return Ok(());
        }
        if result.entities.is_empty() {
            return Ok(());
        }

        let mut types = Vec::with_capacity(result.entities.len());
        for decl in &result.entities {
            let module = workspace::module_path_for(&decl.file, &root)?;
            if module.is_empty() {
                types.push(decl.name.clone());
            } else {
                types.push(format!("{module}::{}", decl.name));
            }
        }

        let spec = DriverSpec {
            root,
            package,
            tag: self.tag.clone(),
            types,
        };
        let report = self.bootstrap.execute(&spec)?;
        eprint!("{}", report.stderr);
        print!("{}", report.stdout);
        if !report.success() {
            return Err(Error::Subprocess {
                status: report.status,
            });
        }
        Ok(())
    }
}

// ------------------------------- Tests ------------------------------------ //
