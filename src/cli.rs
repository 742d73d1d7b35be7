//! Minimal CLI: generate → validator files | inspect → scan view
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::pipeline::Pipeline;
use crate::scan;
use crate::workspace;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate validator methods for annotated records, or inspect what a scan sees
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// scan one directory and generate validator files for its records
    Generate(GenerateTarget),
    /// scan only, print the result as JSON
    Inspect(InspectTarget),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// a source directory, or a quoted glob of .rs files
    target: String,

    /// field annotation tag to parse
    #[arg(long, default_value = scan::DEFAULT_TAG)]
    tag: String,
}

#[derive(clap::Parser, Debug)]
struct GenerateTarget {
    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::Parser, Debug)]
struct InspectTarget {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                let files = resolve_target(&target.input_settings.target)?;
                if let Some(dir) = files.first().and_then(|f| f.parent()) {
                    println!("{}:", dir.display());
                }
                let mut pipeline = Pipeline::new(files);
                pipeline.tag = target.input_settings.tag.clone();
                pipeline.run()?;
                Ok(())
            }
            Command::Inspect(target) => {
                let files = resolve_target(&target.input_settings.target)?;
                let result = scan::scan_files(&files)?;
                let json = serde_json::to_string_pretty(&result)?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(out, &json)?;
                } else {
                    println!("{json}");
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Resolve the target into absolute source paths: literal directories go
/// through the workspace enumeration, glob patterns are expanded and then
/// filtered the same way.
fn resolve_target(target: &str) -> anyhow::Result<Vec<PathBuf>> {
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    if !has_glob_chars(target) {
        return Ok(workspace::scan_files(Path::new(target))?);
    }

    let mut out = Vec::new();
    for entry in glob::glob(target)? {
        let path = entry?;
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        if name.ends_with(".rs")
            && !name.ends_with(workspace::VALIDATE_SUFFIX)
            && !name.ends_with("_test.rs")
        {
            out.push(std::path::absolute(&path)?);
        }
    }
    if out.is_empty() {
        anyhow::bail!("glob pattern matched no source files: {target}");
    }
    out.sort();
    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn globs_and_directories_resolve_to_the_same_file_set() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["user.rs", "user_validate.rs", "readme.md"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let from_dir = resolve_target(dir.path().to_str().unwrap()).unwrap();
        let from_glob = resolve_target(&format!("{}/*.rs", dir.path().display())).unwrap();
        assert_eq!(from_dir, from_glob);
        assert_eq!(from_dir.len(), 1);
    }

    #[test]
    fn a_glob_matching_nothing_is_an_error() {
        assert!(resolve_target("/definitely/absent/**/*.rs").is_err());
    }
}
