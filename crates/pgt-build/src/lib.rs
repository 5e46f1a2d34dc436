//! pgt build orchestrator
//!
//! Compiles an ordered list of source units with an external compiler,
//! links the objects into one executable, publishes a copy into a
//! destination directory and removes every transient file, whether or not
//! the build succeeded.
//!
//! Runs are sequential and blocking. A run owns its working directory;
//! concurrent runs over the same directory are not supported.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod toolchain;

pub use artifacts::{CleanupReport, IntermediateArtifact, OutputBinary, SourceUnit, cleanup};
pub use config::{BuildConfig, ToolchainConfig};
pub use error::{BuildError, Phase, Result};
pub use orchestrator::{BuildReport, BuildRun, Orchestrator, publish};
pub use toolchain::{CommandToolchain, Toolchain, ToolchainError};
