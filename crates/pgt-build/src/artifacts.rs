//! Files that flow through a build run.
//!
//! A [`SourceUnit`] is supplied by the caller and never touched by the build.
//! Each unit maps to exactly one [`IntermediateArtifact`] placed next to it,
//! and all artifacts are linked into a single [`OutputBinary`]. Artifacts and
//! the top-level binary are transient and removed by [`cleanup`].

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};

/// One compilable input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceUnit(PathBuf);

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Derive the object file name: same path, extension replaced by `suffix`.
    pub fn artifact(&self, suffix: &str) -> IntermediateArtifact {
        IntermediateArtifact(self.0.with_extension(suffix))
    }
}

/// The object file produced for one [`SourceUnit`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntermediateArtifact(PathBuf);

impl IntermediateArtifact {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// The linked executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBinary(PathBuf);

impl OutputBinary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// A unit paired with the artifact it compiles to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUnit {
    pub unit: SourceUnit,
    pub artifact: IntermediateArtifact,
}

/// Pair every unit with its artifact, rejecting naming collisions.
///
/// Two units may not share an artifact, and a unit may not be its own
/// artifact (compiling `a.o` with suffix `o` would overwrite the input).
pub fn plan_artifacts(units: &[SourceUnit], suffix: &str) -> Result<Vec<PlannedUnit>> {
    if units.is_empty() {
        return Err(BuildError::NoSources);
    }

    let mut seen: HashMap<PathBuf, &SourceUnit> = HashMap::new();
    let mut planned = Vec::with_capacity(units.len());

    for unit in units {
        let artifact = unit.artifact(suffix);

        if artifact.path() == unit.path() {
            return Err(BuildError::ArtifactCollision {
                first: unit.path().to_path_buf(),
                second: unit.path().to_path_buf(),
                artifact: artifact.path().to_path_buf(),
            });
        }

        if let Some(first) = seen.insert(artifact.path().to_path_buf(), unit) {
            return Err(BuildError::ArtifactCollision {
                first: first.path().to_path_buf(),
                second: unit.path().to_path_buf(),
                artifact: artifact.path().to_path_buf(),
            });
        }

        planned.push(PlannedUnit {
            unit: unit.clone(),
            artifact,
        });
    }

    Ok(planned)
}

/// What a cleanup pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files that were deleted.
    pub removed: Vec<PathBuf>,
    /// Files that were already gone.
    pub missing: Vec<PathBuf>,
    /// Files that could not be deleted.
    pub failed: Vec<PathBuf>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn remove(&mut self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!("removed {}", path.display());
                self.removed.push(path.to_path_buf());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.missing.push(path.to_path_buf());
            }
            Err(e) => {
                tracing::warn!("could not remove {}: {}", path.display(), e);
                self.failed.push(path.to_path_buf());
            }
        }
    }
}

/// Remove the given artifacts and, if present, the top-level binary.
///
/// Removal is best-effort: failures are recorded in the report and logged,
/// never returned.
pub fn cleanup(artifacts: &[IntermediateArtifact], binary: Option<&OutputBinary>) -> CleanupReport {
    let mut report = CleanupReport::default();
    for artifact in artifacts {
        report.remove(artifact.path());
    }
    if let Some(binary) = binary {
        report.remove(binary.path());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(paths: &[&str]) -> Vec<SourceUnit> {
        paths.iter().map(|p| SourceUnit::new(*p)).collect()
    }

    #[test]
    fn test_artifact_replaces_extension() {
        let unit = SourceUnit::new("src/Lexer.cpp");
        assert_eq!(unit.artifact("o").path(), Path::new("src/Lexer.o"));
    }

    #[test]
    fn test_artifact_without_extension() {
        let unit = SourceUnit::new("main");
        assert_eq!(unit.artifact("o").path(), Path::new("main.o"));
    }

    #[test]
    fn test_plan_preserves_order() {
        let planned = plan_artifacts(&units(&["b.cpp", "a.cpp", "c.cpp"]), "o").unwrap();
        let names: Vec<_> = planned.iter().map(|p| p.artifact.path().to_path_buf()).collect();
        assert_eq!(
            names,
            vec![PathBuf::from("b.o"), PathBuf::from("a.o"), PathBuf::from("c.o")]
        );
    }

    #[test]
    fn test_plan_rejects_empty() {
        assert!(matches!(plan_artifacts(&[], "o"), Err(BuildError::NoSources)));
    }

    #[test]
    fn test_plan_rejects_colliding_units() {
        let err = plan_artifacts(&units(&["src/a.cpp", "src/a.c"]), "o").unwrap_err();
        match err {
            BuildError::ArtifactCollision { first, second, artifact } => {
                assert_eq!(first, PathBuf::from("src/a.cpp"));
                assert_eq!(second, PathBuf::from("src/a.c"));
                assert_eq!(artifact, PathBuf::from("src/a.o"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_plan_rejects_duplicate_unit() {
        let err = plan_artifacts(&units(&["a.cpp", "a.cpp"]), "o").unwrap_err();
        assert!(matches!(err, BuildError::ArtifactCollision { .. }));
    }

    #[test]
    fn test_plan_rejects_unit_that_is_its_own_artifact() {
        let err = plan_artifacts(&units(&["prebuilt.o"]), "o").unwrap_err();
        assert!(matches!(err, BuildError::ArtifactCollision { .. }));
    }

    #[test]
    fn test_cleanup_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.o");
        std::fs::write(&present, b"obj").unwrap();

        let artifacts = vec![
            SourceUnit::new(dir.path().join("a.cpp")).artifact("o"),
            SourceUnit::new(dir.path().join("b.cpp")).artifact("o"),
        ];
        let binary = OutputBinary::new(dir.path().join("pgt"));

        let report = cleanup(&artifacts, Some(&binary));

        assert!(report.is_clean());
        assert_eq!(report.removed, vec![present.clone()]);
        assert_eq!(report.missing.len(), 2);
        assert!(!present.exists());
    }

    #[test]
    fn test_cleanup_with_nothing_created() {
        let report = cleanup(&[], None);
        assert!(report.is_clean());
        assert!(report.removed.is_empty());
        assert!(report.missing.is_empty());
    }
}
