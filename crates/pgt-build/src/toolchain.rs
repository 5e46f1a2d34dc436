//! External compiler and linker invocations.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::artifacts::{IntermediateArtifact, OutputBinary, SourceUnit};
use crate::config::ToolchainConfig;

/// Why a toolchain invocation did not succeed.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// The program could not be started at all.
    #[error("could not run '{program}': {source}")]
    Missing {
        program: String,
        #[source]
        source: io::Error,
    },
    /// The program ran and reported failure.
    #[error("'{program}' failed")]
    Failed { program: String, code: Option<i32> },
}

/// The compiler/linker a build run drives.
///
/// Every call blocks until the external process has exited.
pub trait Toolchain {
    /// Compile `unit` into `artifact`.
    fn compile(
        &mut self,
        unit: &SourceUnit,
        artifact: &IntermediateArtifact,
    ) -> Result<(), ToolchainError>;

    /// Link `artifacts`, in order, into `output`.
    fn link(
        &mut self,
        artifacts: &[IntermediateArtifact],
        output: &OutputBinary,
    ) -> Result<(), ToolchainError>;
}

/// Runs a real compiler driver such as `g++` or `clang++`.
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    config: ToolchainConfig,
    work_dir: PathBuf,
}

impl CommandToolchain {
    /// `work_dir` is the child's working directory, so relative flags such
    /// as `-I.` resolve against the project.
    pub fn new(config: ToolchainConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            work_dir: work_dir.into(),
        }
    }

    /// `<compiler> <compile_flags> -c <unit> -o <artifact>`
    pub fn compile_command(&self, unit: &Path, artifact: &Path) -> Command {
        let mut cmd = Command::new(&self.config.compiler);
        cmd.args(&self.config.compile_flags)
            .arg("-c")
            .arg(unit)
            .arg("-o")
            .arg(artifact)
            .current_dir(&self.work_dir);
        cmd
    }

    /// `<compiler> <link_flags> -o <output> <artifacts...>`
    pub fn link_command(&self, artifacts: &[IntermediateArtifact], output: &Path) -> Command {
        let mut cmd = Command::new(&self.config.compiler);
        cmd.args(&self.config.link_flags)
            .arg("-o")
            .arg(output)
            .args(artifacts.iter().map(IntermediateArtifact::path))
            .current_dir(&self.work_dir);
        cmd
    }

    fn run(&self, mut cmd: Command) -> Result<(), ToolchainError> {
        tracing::debug!("running {}", render(&cmd));

        let status = cmd.status().map_err(|source| ToolchainError::Missing {
            program: self.config.compiler.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ToolchainError::Failed {
                program: self.config.compiler.clone(),
                code: status.code(),
            })
        }
    }
}

impl Toolchain for CommandToolchain {
    fn compile(
        &mut self,
        unit: &SourceUnit,
        artifact: &IntermediateArtifact,
    ) -> Result<(), ToolchainError> {
        self.run(self.compile_command(unit.path(), artifact.path()))
    }

    fn link(
        &mut self,
        artifacts: &[IntermediateArtifact],
        output: &OutputBinary,
    ) -> Result<(), ToolchainError> {
        self.run(self.link_command(artifacts, output.path()))
    }
}

/// Render a command line for logs.
fn render(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_compile_command_line() {
        let toolchain = CommandToolchain::new(ToolchainConfig::default(), ".");
        let cmd = toolchain.compile_command(Path::new("src/main.cpp"), Path::new("src/main.o"));

        assert_eq!(cmd.get_program(), "g++");
        assert_eq!(
            args(&cmd),
            vec!["-std=c++17", "-I.", "-c", "src/main.cpp", "-o", "src/main.o"]
        );
        assert_eq!(cmd.get_current_dir(), Some(Path::new(".")));
    }

    #[test]
    fn test_link_command_line() {
        let toolchain = CommandToolchain::new(ToolchainConfig::default(), ".");
        let artifacts = vec![
            SourceUnit::new("a.cpp").artifact("o"),
            SourceUnit::new("b.cpp").artifact("o"),
        ];
        let cmd = toolchain.link_command(&artifacts, Path::new("pgt"));

        assert_eq!(args(&cmd), vec!["-std=c++17", "-o", "pgt", "a.o", "b.o"]);
    }

    #[test]
    fn test_render_joins_arguments() {
        let toolchain = CommandToolchain::new(ToolchainConfig::default(), ".");
        let cmd = toolchain.compile_command(Path::new("a.cpp"), Path::new("a.o"));
        assert_eq!(render(&cmd), "g++ -std=c++17 -I. -c a.cpp -o a.o");
    }

    #[test]
    fn test_missing_program_is_reported_as_missing() {
        let config = ToolchainConfig {
            compiler: "pgt-build-no-such-compiler".to_string(),
            ..ToolchainConfig::default()
        };
        let mut toolchain = CommandToolchain::new(config, ".");
        let unit = SourceUnit::new("a.cpp");
        let artifact = unit.artifact("o");

        let err = toolchain.compile(&unit, &artifact).unwrap_err();
        assert!(matches!(err, ToolchainError::Missing { .. }));
    }
}
