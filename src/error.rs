use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Everything the pipeline can fail with, one variant per failure class.
/// Malformed field annotations and hook-signature mismatches are not here:
/// the former means "zero rules", the latter is logged and skipped.
#[derive(Debug, Error)]
pub enum Error {
    /// A probe that does not resolve to a struct declaration.
    #[error("invalid entity")]
    InvalidEntity,

    /// More than one level of indirection on a field.
    #[error("{entity}.{field}: at most one pointer level is supported")]
    UnsupportedShape { entity: String, field: String },

    /// A source file that does not parse; fails the whole scan.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },

    /// Workspace-root or package-name discovery failure.
    #[error("{0}")]
    Environment(String),

    /// The synthesized source did not render or verify.
    #[error("failed to render {what}: {detail}")]
    Render { what: String, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The bootstrap driver exited non-zero.
    #[error("bootstrap driver failed: {status}")]
    Subprocess { status: ExitStatus },
}

pub type Result<T> = std::result::Result<T, Error>;
