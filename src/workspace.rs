//! Workspace plumbing: file enumeration, root and package-name discovery,
//! module-path mapping, file naming.

use std::fs;
use std::path::{Path, PathBuf};

use convert_case::{Case, Casing};

use crate::error::{Error, Result};

/// Suffix of generated validator files; they are never re-scanned.
pub const VALIDATE_SUFFIX: &str = "_validate.rs";

/// List the ordinary `.rs` files of one directory, absolute and sorted.
/// Previously generated validator files and test files are excluded.
pub fn scan_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = absolute(dir)?;
    let mut out = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".rs")
            && !name.ends_with(VALIDATE_SUFFIX)
            && !name.ends_with("_test.rs")
        {
            out.push(dir.join(name));
        }
    }
    out.sort();
    Ok(out)
}

/// Walk up from `start` to the nearest directory holding a Cargo.toml.
pub fn workspace_root(start: &Path) -> Result<PathBuf> {
    let start = absolute(start)?;
    let mut cur = if start.is_file() { start.parent().map(Path::to_path_buf) } else { Some(start.clone()) };
    while let Some(dir) = cur {
        if dir.join("Cargo.toml").is_file() {
            return Ok(dir);
        }
        cur = dir.parent().map(Path::to_path_buf);
    }
    Err(Error::Environment(format!(
        "no Cargo.toml manifest found above {}",
        start.display()
    )))
}

/// The package identifier of the workspace: `name = "…"` under `[package]`.
pub fn module_name(root: &Path) -> Result<String> {
    let manifest = root.join("Cargo.toml");
    let source = fs::read_to_string(&manifest)?;
    let mut in_package = false;
    for line in source.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_package = line == "[package]";
            continue;
        }
        if !in_package {
            continue;
        }
        if let Some(rest) = line.strip_prefix("name") {
            let rest = rest.trim_start();
            if let Some(value) = rest.strip_prefix('=') {
                let value = value.trim().trim_matches('"');
                if !value.is_empty() {
                    return Ok(value.to_string());
                }
            }
        }
    }
    Err(Error::Environment(format!(
        "cannot resolve the package name from {}",
        manifest.display()
    )))
}

/// Map a source file to its module path inside the crate.
/// `src/models/user.rs` → `models::user`, `src/models/mod.rs` → `models`,
/// `src/lib.rs` and `src/main.rs` → the crate root (empty path).
pub fn module_path_for(file: &Path, root: &Path) -> Result<String> {
    let rel = file.strip_prefix(root).map_err(|_| {
        Error::Environment(format!(
            "{} is outside the workspace root {}",
            file.display(),
            root.display()
        ))
    })?;
    let rel = rel.strip_prefix("src").map_err(|_| {
        Error::Environment(format!("{} is not under src/", file.display()))
    })?;

    let mut segments: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    let last = match segments.pop() {
        Some(l) => l,
        None => return Ok(String::new()),
    };
    match last.as_str() {
        "lib.rs" | "main.rs" | "mod.rs" => {}
        other => match other.strip_suffix(".rs") {
            Some(stem) => segments.push(stem.to_string()),
            None => {
                return Err(Error::Environment(format!(
                    "{} is not a Rust source file",
                    file.display()
                )))
            }
        },
    }
    Ok(segments.join("::"))
}

/// Lower-snake form used for generated file names.
pub fn underscore_name(name: &str) -> String {
    name.to_case(Case::Snake)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_files_skips_generated_and_test_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["user.rs", "user_validate.rs", "user_test.rs", "notes.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let files = scan_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["user.rs"]);
    }

    #[test]
    fn workspace_root_walks_up_to_the_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"fixture\"\n").unwrap();
        let nested = dir.path().join("src").join("models");
        fs::create_dir_all(&nested).unwrap();
        let root = workspace_root(&nested).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn module_name_reads_the_package_section() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"demo-app\"\nversion = \"0.1.0\"\n\n[dependencies]\nname = \"decoy\"\n",
        )
        .unwrap();
        assert_eq!(module_name(dir.path()).unwrap(), "demo-app");
    }

    #[test]
    fn module_paths_follow_file_layout() {
        let root = Path::new("/w");
        let path = |p: &str| module_path_for(&root.join(p), root).unwrap();
        assert_eq!(path("src/models/user.rs"), "models::user");
        assert_eq!(path("src/models/mod.rs"), "models");
        assert_eq!(path("src/lib.rs"), "");
        assert_eq!(path("src/main.rs"), "");
    }

    #[test]
    fn underscore_name_matches_file_naming() {
        assert_eq!(underscore_name("UserProfile"), "user_profile");
        assert_eq!(underscore_name("Basic"), "basic");
    }
}
