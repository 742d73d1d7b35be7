//! Driver synthesis and bootstrap execution.
//!
//! Field layout needs the scanned package linked into a running program, so
//! a throwaway driver crate is synthesized into an isolated temporary
//! directory and run through cargo. The driver path-depends on the scanned
//! package and on this library; its `main` registers one type probe per
//! discovered record (a compile-time existence check at the resolved import
//! path) and invokes the generation entry point. The temporary directory is
//! released on every exit path, including unwinding, by the `TempDir` guard.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use crate::error::{Error, Result};

/// Everything the driver needs to be written down.
#[derive(Debug, Clone)]
pub struct DriverSpec {
    /// Workspace root of the scanned package.
    pub root: PathBuf,
    /// Package name as the manifest spells it.
    pub package: String,
    /// Parse tag forwarded to the generation entry point.
    pub tag: String,
    /// Module-qualified record paths inside the scanned package,
    /// `models::user::User` style.
    pub types: Vec<String>,
}

pub struct SynthesizedDriver {
    pub manifest: String,
    pub main: String,
}

impl DriverSpec {
    /// Render the driver crate and verify the program is well formed.
    /// Verification failure here is fatal: a driver that does not parse
    /// must never reach cargo.
    pub fn synthesize(&self) -> Result<SynthesizedDriver> {
        let main = self.render_main();
        syn::parse_file(&main).map_err(|error| Error::Render {
            what: "bootstrap driver".to_string(),
            detail: error.to_string(),
        })?;
        Ok(SynthesizedDriver {
            manifest: self.render_manifest(),
            main,
        })
    }

    fn render_main(&self) -> String {
        let ident = self.package.replace('-', "_");
        let mut src = String::new();
        src.push_str("fn main() {\n");
        src.push_str(&format!(
            "    let mut definition = checkgen::generate::Definition::new(\"{}\");\n",
            self.root.display()
        ));
        src.push_str(&format!("    definition.set_tag(\"{}\");\n", self.tag));
        for ty in &self.types {
            src.push_str(&format!("    definition.probe::<{ident}::{ty}>();\n"));
        }
        src.push_str("    if let Err(error) = definition.run() {\n");
        src.push_str("        eprintln!(\"{error}\");\n");
        src.push_str("        std::process::exit(1);\n");
        src.push_str("    }\n");
        src.push_str("    definition.report();\n");
        src.push_str("}\n");
        src
    }

    fn render_manifest(&self) -> String {
        // the empty [workspace] table keeps any enclosing workspace from
        // capturing the temporary crate
        format!(
            "[package]\n\
             name = \"checkgen-driver\"\n\
             version = \"0.0.0\"\n\
             edition = \"2024\"\n\
             \n\
             [dependencies]\n\
             checkgen = {{ path = \"{tool}\" }}\n\
             {package} = {{ path = \"{root}\" }}\n\
             \n\
             [workspace]\n",
            tool = env!("CARGO_MANIFEST_DIR"),
            package = self.package,
            root = self.root.display(),
        )
    }
}

/// What the driver run produced, both streams captured separately.
#[derive(Debug)]
pub struct CommandReport {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandReport {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Runs the synthesized driver as one blocking subprocess.
pub struct Bootstrap {
    command: String,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self {
            command: "cargo".to_string(),
        }
    }
}

impl Bootstrap {
    /// Use a build tool other than the `cargo` on PATH.
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn execute(&self, spec: &DriverSpec) -> Result<CommandReport> {
        let driver = spec.synthesize()?;

        let tmp = tempfile::Builder::new().prefix("checkgen-").tempdir()?;
        fs::create_dir(tmp.path().join("src"))?;
        fs::write(tmp.path().join("Cargo.toml"), &driver.manifest)?;
        fs::write(tmp.path().join("src").join("main.rs"), &driver.main)?;

        let output = Command::new(&self.command)
            .arg("run")
            .arg("--quiet")
            .arg("--manifest-path")
            .arg(tmp.path().join("Cargo.toml"))
            .output()?;
        Ok(CommandReport {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
        // tmp drops here: the workspace is gone whatever happened above
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> DriverSpec {
        DriverSpec {
            root: PathBuf::from("/work/demo"),
            package: "dev-target".to_string(),
            tag: "check".to_string(),
            types: vec![
                "models::basic::Basic".to_string(),
                "models::nested::Nested".to_string(),
            ],
        }
    }

    #[test]
    fn the_driver_probes_every_discovered_record() {
        let driver = spec().synthesize().unwrap();
        assert!(driver
            .main
            .contains("definition.probe::<dev_target::models::basic::Basic>();"));
        assert!(driver
            .main
            .contains("definition.probe::<dev_target::models::nested::Nested>();"));
        assert!(driver.main.contains("definition.set_tag(\"check\");"));
        assert!(driver.main.contains("definition.report();"));
        syn::parse_file(&driver.main).expect("driver source is well formed");
    }

    #[test]
    fn the_manifest_links_both_path_dependencies_detached() {
        let driver = spec().synthesize().unwrap();
        assert!(driver.manifest.contains("name = \"checkgen-driver\""));
        assert!(driver.manifest.contains("checkgen = { path = \""));
        assert!(driver.manifest.contains("dev-target = { path = \"/work/demo\" }"));
        assert!(driver.manifest.ends_with("[workspace]\n"));
    }

    #[test]
    fn malformed_type_paths_fail_synthesis_fatally() {
        let mut bad = spec();
        bad.types = vec!["models::not a path".to_string()];
        assert!(matches!(bad.synthesize(), Err(Error::Render { .. })));
    }

    #[test]
    fn nonzero_exits_are_captured_not_panicked() {
        let bootstrap = Bootstrap {
            command: "false".to_string(),
        };
        let report = bootstrap.execute(&spec()).unwrap();
        assert!(!report.success());
    }

    #[test]
    fn the_subprocess_streams_are_captured_separately() {
        let bootstrap = Bootstrap {
            command: "echo".to_string(),
        };
        let report = bootstrap.execute(&spec()).unwrap();
        assert!(report.success());
        assert!(report.stdout.contains("run --quiet --manifest-path"));
        assert!(report.stderr.is_empty());
        assert!(report.stdout.contains("Cargo.toml"));
    }
}
