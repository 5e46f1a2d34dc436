//! Build orchestration
//!
//! A run moves through Compile → Link → Publish and always ends with
//! Cleanup. [`BuildRun`] holds the ledger of files the run has created and
//! releases it when cleaned up or dropped, so every exit path removes exactly
//! what was produced.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::artifacts::{CleanupReport, IntermediateArtifact, OutputBinary, cleanup};
use crate::config::BuildConfig;
use crate::error::{BuildError, Phase, Result};
use crate::toolchain::{CommandToolchain, Toolchain, ToolchainError};

#[derive(Debug)]
enum Stage {
    Fresh,
    Compiled,
    Linked(OutputBinary),
    Published { binary: OutputBinary, dest: PathBuf },
    Failed,
    Cleaned,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Number of object files compiled and linked
    pub compiled: usize,
    /// Path of the published copy of the executable
    pub published: PathBuf,
    pub cleanup: CleanupReport,
}

/// State of a single run.
pub struct BuildRun<'a, T: Toolchain + ?Sized> {
    config: &'a BuildConfig,
    toolchain: &'a mut T,
    stage: Stage,
    artifacts: Vec<IntermediateArtifact>,
}

impl<'a, T: Toolchain + ?Sized> BuildRun<'a, T> {
    pub fn new(config: &'a BuildConfig, toolchain: &'a mut T) -> Self {
        Self {
            config,
            toolchain,
            stage: Stage::Fresh,
            artifacts: Vec::new(),
        }
    }

    /// Object files produced so far.
    pub fn artifacts(&self) -> &[IntermediateArtifact] {
        &self.artifacts
    }

    /// The linked executable, once linking succeeded.
    pub fn binary(&self) -> Option<&OutputBinary> {
        match &self.stage {
            Stage::Linked(binary) | Stage::Published { binary, .. } => Some(binary),
            _ => None,
        }
    }

    /// Compile every unit in order, stopping at the first failure.
    ///
    /// Each artifact is recorded as soon as its invocation succeeds, so a
    /// failure on unit k leaves exactly k-1 artifacts scheduled for cleanup.
    pub fn compile(&mut self) -> Result<&[IntermediateArtifact]> {
        if !matches!(self.stage, Stage::Fresh) {
            return Err(BuildError::OutOfOrder {
                phase: Phase::Compile,
            });
        }
        let config = self.config;

        let planned = config.plan().inspect_err(|_| self.stage = Stage::Failed)?;
        tracing::info!("compiling {} source units", planned.len());

        for (entry, name) in planned.into_iter().zip(&config.sources) {
            match self.toolchain.compile(&entry.unit, &entry.artifact) {
                Ok(()) => {
                    tracing::debug!("compiled {}", name.display());
                    self.artifacts.push(entry.artifact);
                }
                Err(ToolchainError::Missing { program, source }) => {
                    self.stage = Stage::Failed;
                    return Err(BuildError::ToolchainMissing {
                        program,
                        phase: Phase::Compile,
                        source,
                    });
                }
                Err(ToolchainError::Failed { code, .. }) => {
                    self.stage = Stage::Failed;
                    return Err(BuildError::CompileFailed {
                        unit: name.clone(),
                        code,
                    });
                }
            }
        }

        self.stage = Stage::Compiled;
        Ok(self.artifacts.as_slice())
    }

    /// Link all compiled artifacts into the output binary. Runs at most once.
    pub fn link(&mut self) -> Result<OutputBinary> {
        if !matches!(self.stage, Stage::Compiled) {
            return Err(BuildError::OutOfOrder { phase: Phase::Link });
        }

        let output = self.config.output_binary();
        tracing::info!(
            "linking {} objects into {}",
            self.artifacts.len(),
            output.path().display()
        );

        match self.toolchain.link(&self.artifacts, &output) {
            Ok(()) => {
                self.stage = Stage::Linked(output.clone());
                Ok(output)
            }
            Err(err) => {
                self.stage = Stage::Failed;
                Err(match err {
                    ToolchainError::Missing { program, source } => BuildError::ToolchainMissing {
                        program,
                        phase: Phase::Link,
                        source,
                    },
                    ToolchainError::Failed { code, .. } => BuildError::LinkFailed { code },
                })
            }
        }
    }

    /// Copy the linked binary into the destination directory.
    ///
    /// If the copy fails the top-level binary is kept on disk, since it is
    /// then the only built copy.
    pub fn publish(&mut self) -> Result<PathBuf> {
        let binary = match std::mem::replace(&mut self.stage, Stage::Failed) {
            Stage::Linked(binary) => binary,
            other => {
                self.stage = other;
                return Err(BuildError::OutOfOrder {
                    phase: Phase::Publish,
                });
            }
        };

        let dest_dir = self.config.dest_path();
        tracing::info!("publishing {} to {}", binary.path().display(), dest_dir.display());

        match publish(&binary, &dest_dir) {
            Ok(dest) => {
                self.stage = Stage::Published {
                    binary,
                    dest: dest.clone(),
                };
                Ok(dest)
            }
            Err(err) => {
                tracing::warn!("keeping unpublished binary at {}", binary.path().display());
                Err(err)
            }
        }
    }

    /// Remove every artifact this run created.
    ///
    /// The top-level binary is removed only once it has been published.
    /// Calling this more than once is harmless.
    pub fn cleanup(&mut self) -> CleanupReport {
        let removable = match std::mem::replace(&mut self.stage, Stage::Cleaned) {
            Stage::Cleaned => return CleanupReport::default(),
            Stage::Published { binary, dest } => {
                tracing::debug!("published copy stays at {}", dest.display());
                Some(binary)
            }
            Stage::Linked(binary) => {
                tracing::warn!("keeping unpublished binary at {}", binary.path().display());
                None
            }
            Stage::Fresh | Stage::Compiled | Stage::Failed => None,
        };

        let artifacts = std::mem::take(&mut self.artifacts);
        tracing::info!("cleaning up {} intermediate artifacts", artifacts.len());
        cleanup(&artifacts, removable.as_ref())
    }
}

impl<T: Toolchain + ?Sized> Drop for BuildRun<'_, T> {
    fn drop(&mut self) {
        if !matches!(self.stage, Stage::Cleaned) {
            self.cleanup();
        }
    }
}

/// Ensure `dest_dir` exists and copy `binary` into it.
///
/// Safe to repeat: an existing directory is reused and an existing copy is
/// overwritten.
pub fn publish(binary: &OutputBinary, dest_dir: &Path) -> Result<PathBuf> {
    let fail = |source: io::Error| BuildError::PublishFailed {
        dest: dest_dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dest_dir).map_err(fail)?;

    let file_name = binary.path().file_name().ok_or_else(|| {
        fail(io::Error::new(
            io::ErrorKind::InvalidInput,
            "output binary has no file name",
        ))
    })?;

    // Copying a file onto itself truncates it.
    let source_dir = match binary.path().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if fs::canonicalize(source_dir).map_err(fail)? == fs::canonicalize(dest_dir).map_err(fail)? {
        return Err(fail(io::Error::new(
            io::ErrorKind::InvalidInput,
            "destination is the directory the binary was linked in",
        )));
    }

    let dest = dest_dir.join(file_name);
    let expected = fs::metadata(binary.path()).map_err(fail)?.len();
    let copied = fs::copy(binary.path(), &dest).map_err(fail)?;
    if copied != expected {
        return Err(fail(io::Error::other(format!(
            "copied {} of {} bytes",
            copied, expected
        ))));
    }

    Ok(dest)
}

/// Drives complete build runs for one configuration.
pub struct Orchestrator<T: Toolchain = CommandToolchain> {
    config: BuildConfig,
    toolchain: T,
}

impl Orchestrator<CommandToolchain> {
    /// Orchestrator that invokes the configured compiler.
    pub fn new(config: BuildConfig) -> Self {
        let toolchain = CommandToolchain::new(config.toolchain.clone(), config.work_root());
        Self { config, toolchain }
    }
}

impl<T: Toolchain> Orchestrator<T> {
    pub fn with_toolchain(config: BuildConfig, toolchain: T) -> Self {
        Self { config, toolchain }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Start a run whose phases are driven by the caller.
    pub fn begin(&mut self) -> BuildRun<'_, T> {
        BuildRun::new(&self.config, &mut self.toolchain)
    }

    /// Compile, link and publish, then clean up whatever the run created.
    pub fn run(&mut self) -> Result<BuildReport> {
        let mut run = self.begin();
        let outcome = execute(&mut run);
        let cleanup = run.cleanup();

        if !cleanup.is_clean() {
            tracing::warn!("{} files could not be removed", cleanup.failed.len());
        }

        let (compiled, published) = outcome?;
        tracing::info!("build finished: {}", published.display());
        Ok(BuildReport {
            compiled,
            published,
            cleanup,
        })
    }
}

fn execute<T: Toolchain + ?Sized>(run: &mut BuildRun<'_, T>) -> Result<(usize, PathBuf)> {
    let compiled = run.compile()?.len();
    run.link()?;
    let published = run.publish()?;
    Ok((compiled, published))
}
