//! Error types for a build run.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The phase of a build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Validating the configuration and deriving artifact names.
    Plan,
    /// Translating each source unit into an object file.
    Compile,
    /// Combining object files into the output binary.
    Link,
    /// Copying the output binary into the destination directory.
    Publish,
    /// Removing transient artifacts.
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Plan => "plan",
            Phase::Compile => "compile",
            Phase::Link => "link",
            Phase::Publish => "publish",
            Phase::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Renders an exit code, or notes that the process was killed by a signal.
pub(crate) struct ExitCode(pub Option<i32>);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "exit status {}", code),
            None => f.write_str("terminated by signal"),
        }
    }
}

fn toolchain_message(program: &str, source: &io::Error) -> String {
    if source.kind() == io::ErrorKind::NotFound {
        format!(
            "'{}' compiler not found. Please install it and make sure it's in your PATH",
            program
        )
    } else {
        format!("could not run '{}': {}", program, source)
    }
}

/// Errors that terminate a build run.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{}", toolchain_message(program, source))]
    ToolchainMissing {
        program: String,
        phase: Phase,
        #[source]
        source: io::Error,
    },

    #[error("failed to compile {}: {}", unit.display(), ExitCode(*code))]
    CompileFailed { unit: PathBuf, code: Option<i32> },

    #[error("linker failed: {}", ExitCode(*code))]
    LinkFailed { code: Option<i32> },

    #[error("could not publish to {}: {source}", dest.display())]
    PublishFailed {
        dest: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("working directory {} does not exist", path.display())]
    WorkDirMissing { path: PathBuf },

    #[error("no source units were supplied")]
    NoSources,

    #[error(
        "{} and {} both map to {}",
        first.display(),
        second.display(),
        artifact.display()
    )]
    ArtifactCollision {
        first: PathBuf,
        second: PathBuf,
        artifact: PathBuf,
    },

    #[error("could not read manifest {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid manifest {}: {source}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{phase} requested out of order")]
    OutOfOrder { phase: Phase },
}

impl BuildError {
    /// The phase this error belongs to.
    pub fn phase(&self) -> Phase {
        match self {
            BuildError::ToolchainMissing { phase, .. } => *phase,
            BuildError::CompileFailed { .. } => Phase::Compile,
            BuildError::LinkFailed { .. } => Phase::Link,
            BuildError::PublishFailed { .. } => Phase::Publish,
            BuildError::WorkDirMissing { .. }
            | BuildError::NoSources
            | BuildError::ArtifactCollision { .. }
            | BuildError::ManifestRead { .. }
            | BuildError::ManifestParse { .. } => Phase::Plan,
            BuildError::OutOfOrder { phase } => *phase,
        }
    }

    /// One-line terminal message naming the failing phase and its cause.
    pub fn report(&self) -> String {
        format!("Build failed during {}: {}", self.phase(), self)
    }
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_failure_names_unit() {
        let err = BuildError::CompileFailed {
            unit: PathBuf::from("src/Parser.cpp"),
            code: Some(1),
        };
        assert_eq!(err.to_string(), "failed to compile src/Parser.cpp: exit status 1");
        assert_eq!(err.phase(), Phase::Compile);
    }

    #[test]
    fn test_signal_termination_message() {
        let err = BuildError::LinkFailed { code: None };
        assert_eq!(err.to_string(), "linker failed: terminated by signal");
    }

    #[test]
    fn test_missing_toolchain_keeps_phase() {
        let err = BuildError::ToolchainMissing {
            program: "g++".to_string(),
            phase: Phase::Link,
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(err.phase(), Phase::Link);
        assert!(err.to_string().starts_with("'g++' compiler not found"));
    }

    #[test]
    fn test_manifest_failure_reports_plan_phase() {
        let err = BuildError::ManifestRead {
            path: PathBuf::from("pgt-build.json"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let report = err.report();
        assert!(report.starts_with("Build failed during plan: could not read manifest pgt-build.json"));
        assert_eq!(report.matches("pgt-build.json").count(), 1);
    }

    #[test]
    fn test_unrunnable_toolchain_reports_cause() {
        let err = BuildError::ToolchainMissing {
            program: "g++".to_string(),
            phase: Phase::Compile,
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        let message = err.to_string();
        assert_eq!(message, "could not run 'g++': permission denied");
        assert!(!message.contains("PATH"));
    }
}
