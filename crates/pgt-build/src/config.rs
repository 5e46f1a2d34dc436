//! Build configuration
//!
//! Everything a run needs is carried by a `BuildConfig` value: the ordered
//! source list, where the run works, where the binary is published and how
//! the toolchain is invoked. Configurations come from `BuildConfig::default()`
//! (the stock pgt build), a JSON manifest, or builder-style setters.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifacts::{OutputBinary, PlannedUnit, SourceUnit, plan_artifacts};
use crate::error::{BuildError, Result};

/// Units of the stock pgt build, in link order.
pub const DEFAULT_SOURCES: &[&str] = &[
    "src/main.cpp",
    "src/Lexer.cpp",
    "src/Parser.cpp",
    "src/Interpreter.cpp",
    "src/Utils.cpp",
    "src/SemanticAnalyzer.cpp",
    "src/CodeGen.cpp",
    "src/GarbageCollector.cpp",
];

/// How the external compiler is invoked.
///
/// The same flags are passed to every compile invocation; the link step
/// uses `link_flags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Compiler driver, also used for linking
    pub compiler: String,
    /// Flags for every `-c` invocation
    pub compile_flags: Vec<String>,
    /// Flags for the link invocation
    pub link_flags: Vec<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: "g++".to_string(),
            compile_flags: vec!["-std=c++17".to_string(), "-I.".to_string()],
            link_flags: vec!["-std=c++17".to_string()],
        }
    }
}

/// Inputs to one build run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Source units, relative to `work_dir`
    pub sources: Vec<PathBuf>,
    /// Directory owned by the run
    pub work_dir: PathBuf,
    /// File name of the linked executable
    pub output: String,
    /// Publish destination, relative to `work_dir`
    pub dest_dir: PathBuf,
    /// Extension given to object files
    pub object_suffix: String,
    pub toolchain: ToolchainConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(PathBuf::from).collect(),
            work_dir: PathBuf::from("."),
            output: "pgt".to_string(),
            dest_dir: PathBuf::from("compile"),
            object_suffix: "o".to_string(),
            toolchain: ToolchainConfig::default(),
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON manifest. Absent fields take their default values.
    pub fn from_manifest(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| BuildError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| BuildError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn sources<I, P>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.output = name.into();
        self
    }

    pub fn dest_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dest_dir = dir.into();
        self
    }

    pub fn object_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.object_suffix = suffix.into();
        self
    }

    pub fn compiler(mut self, compiler: impl Into<String>) -> Self {
        self.toolchain.compiler = compiler.into();
        self
    }

    pub fn compile_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.toolchain.compile_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn link_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.toolchain.link_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// The working directory as an absolute path.
    ///
    /// Every path handed to the toolchain is joined onto this, so children
    /// started inside the working directory see the same files.
    pub fn work_root(&self) -> PathBuf {
        let dir = if self.work_dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.work_dir.as_path()
        };
        std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf())
    }

    /// Source units resolved against the working directory.
    pub fn units(&self) -> Vec<SourceUnit> {
        let root = self.work_root();
        self.sources
            .iter()
            .map(|source| SourceUnit::new(root.join(source)))
            .collect()
    }

    /// Pair every unit with its object file, rejecting collisions and a
    /// missing working directory.
    pub fn plan(&self) -> Result<Vec<PlannedUnit>> {
        if !self.work_root().is_dir() {
            return Err(BuildError::WorkDirMissing {
                path: self.work_dir.clone(),
            });
        }
        plan_artifacts(&self.units(), &self.object_suffix)
    }

    /// Where the linker writes the executable.
    pub fn output_binary(&self) -> OutputBinary {
        OutputBinary::new(self.work_root().join(&self.output))
    }

    /// Where the executable is published.
    pub fn dest_path(&self) -> PathBuf {
        self.work_root().join(&self.dest_dir)
    }
}
