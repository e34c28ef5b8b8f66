//! Project manifest and dist directory discovery
//!
//! The package name and version come from `pyproject.toml`, either the
//! `[project]` table or `[tool.poetry]`. Artifacts are the wheels and sdists
//! in the dist directory whose file names start with `<name>-<version>`.

use anyhow::Context;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

const MANIFEST_FILENAME: &str = "pyproject.toml";

static NAME_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\d.]+").expect("name escape pattern is valid"));

static VERSION_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\d.+]+").expect("version escape pattern is valid"));

#[derive(Debug, Deserialize)]
struct PyProject {
    project: Option<NameVersion>,
    tool: Option<ToolTable>,
}

#[derive(Debug, Deserialize)]
struct ToolTable {
    poetry: Option<NameVersion>,
}

#[derive(Debug, Deserialize)]
struct NameVersion {
    name: Option<String>,
    version: Option<String>,
}

/// Name and version of the package being published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectManifest {
    pub name: String,
    pub version: String,
}

impl ProjectManifest {
    /// Read `pyproject.toml` from the project root
    pub async fn load<P: AsRef<Path>>(project_path: P) -> anyhow::Result<Self> {
        let path = project_path.as_ref().join(MANIFEST_FILENAME);
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Invalid {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let pyproject: PyProject = toml::from_str(content)?;

        let tables = [
            pyproject.project,
            pyproject.tool.and_then(|t| t.poetry),
        ];

        for table in tables.into_iter().flatten() {
            if let (Some(name), Some(version)) = (table.name, table.version) {
                return Ok(Self { name, version });
            }
        }

        anyhow::bail!("no package name and version in [project] or [tool.poetry]")
    }

    /// Package name as it appears in artifact file names
    pub fn escaped_name(&self) -> String {
        NAME_ESCAPE.replace_all(&self.name, "_").into_owned()
    }

    /// Version as it appears in artifact file names
    pub fn escaped_version(&self) -> String {
        VERSION_ESCAPE.replace_all(&self.version, "_").into_owned()
    }

    /// File name prefix shared by all artifacts of this release
    pub fn artifact_prefix(&self) -> String {
        format!("{}-{}", self.escaped_name(), self.escaped_version())
    }
}

/// Kind of distribution file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Wheel,
    Sdist,
}

impl ArtifactKind {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        if file_name.ends_with(".whl") {
            Some(Self::Wheel)
        } else if file_name.ends_with(".tar.gz") {
            Some(Self::Sdist)
        } else {
            None
        }
    }

    /// Upload form `filetype` value
    pub fn filetype(self) -> &'static str {
        match self {
            Self::Wheel => "bdist_wheel",
            Self::Sdist => "sdist",
        }
    }

    /// Upload form `pyversion` value
    ///
    /// Wheels carry their python tag as the third-from-last name component.
    pub fn pyversion(self, file_name: &str) -> String {
        match self {
            Self::Sdist => "source".to_string(),
            Self::Wheel => {
                let stem = file_name.trim_end_matches(".whl");
                let parts: Vec<&str> = stem.split('-').collect();
                if parts.len() >= 5 {
                    parts[parts.len() - 3].to_string()
                } else {
                    "py3".to_string()
                }
            }
        }
    }
}

/// `<prefix>-*.whl` or exactly `<prefix>.tar.gz`; neighbouring versions
/// such as `1.0.1` for `1.0` never match
fn belongs_to_release(file_name: &str, prefix: &str) -> bool {
    match ArtifactKind::from_file_name(file_name) {
        Some(ArtifactKind::Wheel) => file_name.starts_with(&format!("{}-", prefix)),
        Some(ArtifactKind::Sdist) => file_name == format!("{}.tar.gz", prefix),
        None => false,
    }
}

/// List the artifacts in `dist_dir` that belong to `manifest`, sorted by name
///
/// A missing dist directory yields an empty list.
pub fn list_dist_artifacts(dist_dir: &Path, manifest: &ProjectManifest) -> anyhow::Result<Vec<PathBuf>> {
    if !dist_dir.exists() {
        return Ok(Vec::new());
    }

    let prefix = manifest.artifact_prefix();
    let mut files = Vec::new();

    for entry in WalkDir::new(dist_dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to read {}", dist_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if belongs_to_release(&file_name, &prefix) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest(name: &str, version: &str) -> ProjectManifest {
        ProjectManifest {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_parse_project_table() {
        let parsed = ProjectManifest::parse(
            r#"
[project]
name = "demo-pkg"
version = "1.2.0"
"#,
        )
        .unwrap();

        assert_eq!(parsed, manifest("demo-pkg", "1.2.0"));
    }

    #[test]
    fn test_parse_poetry_table() {
        let manifest = ProjectManifest::parse(
            r#"
[tool.poetry]
name = "legacy"
version = "0.3.1"
"#,
        )
        .unwrap();

        assert_eq!(manifest.name, "legacy");
        assert_eq!(manifest.version, "0.3.1");
    }

    #[test]
    fn test_parse_without_version_fails() {
        let result = ProjectManifest::parse("[project]\nname = \"demo\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_escaped_name() {
        assert_eq!(manifest("demo-pkg", "1.0").escaped_name(), "demo_pkg");
        assert_eq!(manifest("zope.interface", "1.0").escaped_name(), "zope.interface");
        assert_eq!(manifest("a--b", "1.0+local").artifact_prefix(), "a_b-1.0+local");
    }

    #[test]
    fn test_artifact_kind() {
        assert_eq!(
            ArtifactKind::from_file_name("demo-1.0-py3-none-any.whl"),
            Some(ArtifactKind::Wheel)
        );
        assert_eq!(
            ArtifactKind::from_file_name("demo-1.0.tar.gz"),
            Some(ArtifactKind::Sdist)
        );
        assert_eq!(ArtifactKind::from_file_name("demo-1.0.zip"), None);
    }

    #[test]
    fn test_pyversion() {
        assert_eq!(
            ArtifactKind::Wheel.pyversion("demo-1.0-cp312-cp312-manylinux_2_17_x86_64.whl"),
            "cp312"
        );
        assert_eq!(ArtifactKind::Wheel.pyversion("odd.whl"), "py3");
        assert_eq!(ArtifactKind::Sdist.pyversion("demo-1.0.tar.gz"), "source");
    }

    #[test]
    fn test_list_dist_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let dist = temp_dir.path().join("dist");
        std::fs::create_dir(&dist).unwrap();
        for name in [
            "demo_pkg-1.0.0.tar.gz",
            "demo_pkg-1.0.0-py3-none-any.whl",
            "demo_pkg-0.9.0.tar.gz",
            "other-1.0.0.tar.gz",
            "demo_pkg-1.0.0.txt",
        ] {
            std::fs::write(dist.join(name), b"x").unwrap();
        }

        let files = list_dist_artifacts(&dist, &manifest("demo-pkg", "1.0.0")).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["demo_pkg-1.0.0-py3-none-any.whl", "demo_pkg-1.0.0.tar.gz"]
        );
    }

    #[test]
    fn test_list_ignores_neighbouring_versions() {
        let temp_dir = TempDir::new().unwrap();
        let dist = temp_dir.path().join("dist");
        std::fs::create_dir(&dist).unwrap();
        for name in [
            "demo-1.0.tar.gz",
            "demo-1.0.1.tar.gz",
            "demo-1.0.1-py3-none-any.whl",
            "demo-1.0rc1.tar.gz",
        ] {
            std::fs::write(dist.join(name), b"x").unwrap();
        }

        let files = list_dist_artifacts(&dist, &manifest("demo", "1.0")).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["demo-1.0.tar.gz"]);
    }

    #[test]
    fn test_belongs_to_release() {
        assert!(belongs_to_release("demo-1.0-py3-none-any.whl", "demo-1.0"));
        assert!(belongs_to_release("demo-1.0.tar.gz", "demo-1.0"));
        assert!(!belongs_to_release("demo-1.0.1-py3-none-any.whl", "demo-1.0"));
        assert!(!belongs_to_release("demo-1.0.1.tar.gz", "demo-1.0"));
        assert!(!belongs_to_release("demo-1.0.zip", "demo-1.0"));
    }

    #[test]
    fn test_list_missing_dist_dir() {
        let temp_dir = TempDir::new().unwrap();

        let files = list_dist_artifacts(&temp_dir.path().join("dist"), &manifest("demo", "1.0")).unwrap();

        assert!(files.is_empty());
    }
}
