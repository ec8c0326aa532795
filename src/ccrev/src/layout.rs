//! Build layout detection.
//!
//! Cocos Creator has shipped web builds in two directory conventions:
//!
//! - [`LayoutVersion::LegacyNested`] (2.3.x and earlier): `src/settings.js`,
//!   `src/project.js`, resources under `res/`.
//! - [`LayoutVersion::FlatRoot`] (2.4.x): `settings.<md5>.js` / `main.<md5>.js`
//!   at the root or in `src/`, resources under `assets/`.
//!
//! Each convention lists ordered glob patterns per file category. The first
//! pattern with any match wins and its first match (in name order) is used.

use glob_match::glob_match;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Sibling resource directories probed when a convention's own are missing
const RESOURCE_PROBES: [&str; 4] = ["assets", "res", "src/assets", "src/res"];

/// General project script pattern, used for diagnostics
const PROJECT_FILE_PATTERN: &str = "project*.js";

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error(
        "no supported build layout found under {}: {}",
        .root.display(),
        describe_misses(.attempts)
    )]
    NotFound {
        root: PathBuf,
        attempts: Vec<ConventionMiss>,
    },

    #[error("resource path does not exist: {}", .0.display())]
    ResourceMissing(PathBuf),

    #[error("settings file does not exist: {}", .0.display())]
    SettingsMissing(PathBuf),

    #[error(
        "project file does not exist: {}{}",
        .path.display(),
        describe_candidates(.candidates)
    )]
    ProjectMissing {
        path: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("unknown version hint '{0}' (expected 2.3.x, 2.4.x or 2.4.15)")]
    UnknownVersionHint(String),
}

fn describe_misses(attempts: &[ConventionMiss]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_candidates(candidates: &[PathBuf]) -> String {
    if candidates.is_empty() {
        return String::new();
    }
    let names: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
    format!(" (other project files found: {})", names.join(", "))
}

/// Packaging convention that produced a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayoutVersion {
    LegacyNested,
    FlatRoot,
}

impl LayoutVersion {
    /// Auto-detection order: the narrower convention first
    pub const DETECTION_ORDER: [LayoutVersion; 2] = [Self::LegacyNested, Self::FlatRoot];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LegacyNested => "LegacyNested",
            Self::FlatRoot => "FlatRoot",
        }
    }

    fn patterns(&self) -> ConventionPatterns {
        match self {
            Self::LegacyNested => ConventionPatterns {
                settings: &["src/settings*.js"],
                project: &["src/project*.js"],
                resources: &["res"],
            },
            Self::FlatRoot => ConventionPatterns {
                settings: &["src/settings*.js", "settings*.js", "main*.js"],
                project: &["project*.js", "main*.js", "src/project*.js"],
                resources: &["assets", "res", "src/assets"],
            },
        }
    }
}

impl fmt::Display for LayoutVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Framework version hint given by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionHint {
    V23x,
    V24x,
    V2415,
}

impl VersionHint {
    pub fn layout(&self) -> LayoutVersion {
        match self {
            Self::V23x => LayoutVersion::LegacyNested,
            Self::V24x | Self::V2415 => LayoutVersion::FlatRoot,
        }
    }

    /// Parse a hint token; the empty string means no hint
    pub fn parse_optional(token: &str) -> Result<Option<Self>, LayoutError> {
        if token.trim().is_empty() {
            return Ok(None);
        }
        token.parse().map(Some)
    }
}

impl FromStr for VersionHint {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2.3.x" => Ok(Self::V23x),
            "2.4.x" => Ok(Self::V24x),
            "2.4.15" => Ok(Self::V2415),
            other => Err(LayoutError::UnknownVersionHint(other.to_string())),
        }
    }
}

struct ConventionPatterns {
    settings: &'static [&'static str],
    project: &'static [&'static str],
    resources: &'static [&'static str],
}

/// File category of a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Settings,
    Project,
    Resources,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Settings => "settings",
            Self::Project => "project",
            Self::Resources => "resources",
        })
    }
}

/// Why a convention did not match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionMiss {
    pub version: LayoutVersion,
    pub missing: Vec<Category>,
}

impl fmt::Display for ConventionMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing: Vec<String> = self.missing.iter().map(ToString::to_string).collect();
        write!(f, "{} (missing {})", self.version, missing.join(", "))
    }
}

/// Resolved input paths of a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectLayout {
    pub version: LayoutVersion,
    pub settings_path: PathBuf,
    pub project_path: PathBuf,
    pub resource_path: PathBuf,
}

impl ProjectLayout {
    /// True when the settings script doubles as the project script
    pub fn shares_bootstrap(&self) -> bool {
        self.project_path == self.settings_path
    }

    /// Check that every resolved path still exists
    pub fn validate(&self) -> Result<(), LayoutError> {
        if !self.resource_path.exists() {
            return Err(LayoutError::ResourceMissing(self.resource_path.clone()));
        }

        if !self.settings_path.exists() {
            return Err(LayoutError::SettingsMissing(self.settings_path.clone()));
        }

        if !self.shares_bootstrap() && !self.project_path.exists() {
            let dir = self.project_path.parent().unwrap_or(Path::new("."));
            return Err(LayoutError::ProjectMissing {
                path: self.project_path.clone(),
                candidates: matching_entries(dir, PROJECT_FILE_PATTERN, EntryKind::File),
            });
        }

        Ok(())
    }
}

/// Detect the layout of the build under `root`
///
/// A hinted convention is tried first. When it fails, both conventions are
/// tried in [`LayoutVersion::DETECTION_ORDER`].
pub fn resolve(root: &Path, hint: Option<VersionHint>) -> Result<ProjectLayout, LayoutError> {
    let mut attempts = Vec::new();

    if let Some(hint) = hint {
        match try_convention(root, hint.layout(), true) {
            Ok(layout) => {
                tracing::info!("using hinted {} layout", layout.version);
                layout.validate()?;
                return Ok(layout);
            }
            Err(miss) => {
                tracing::warn!("hinted layout did not match ({}), auto-detecting", miss);
                attempts.push(miss);
            }
        }
    }

    for version in LayoutVersion::DETECTION_ORDER {
        if hint.map(|h| h.layout()) == Some(version) {
            continue;
        }
        match try_convention(root, version, false) {
            Ok(layout) => {
                tracing::info!("detected {} layout", layout.version);
                layout.validate()?;
                return Ok(layout);
            }
            Err(miss) => {
                tracing::debug!("{}", miss);
                attempts.push(miss);
            }
        }
    }

    Err(LayoutError::NotFound {
        root: root.to_path_buf(),
        attempts,
    })
}

/// Match one convention against the tree
///
/// FlatRoot always gets the fallbacks (settings as project, probed resource
/// directories); LegacyNested only when it was hinted.
fn try_convention(
    root: &Path,
    version: LayoutVersion,
    hinted: bool,
) -> Result<ProjectLayout, ConventionMiss> {
    let patterns = version.patterns();
    let lenient = hinted || version == LayoutVersion::FlatRoot;

    let settings = find_first(root, patterns.settings, EntryKind::File);
    let mut project = find_first(root, patterns.project, EntryKind::File);
    let mut resources = find_first(root, patterns.resources, EntryKind::Dir);

    if lenient {
        if project.is_none() {
            if let Some(settings) = &settings {
                tracing::info!("no project script found, using {} for both", settings.display());
                project = Some(settings.clone());
            }
        }
        if resources.is_none() {
            resources = find_first(root, &RESOURCE_PROBES, EntryKind::Dir);
        }
    }

    match (settings, project, resources) {
        (Some(settings_path), Some(project_path), Some(resource_path)) => Ok(ProjectLayout {
            version,
            settings_path,
            project_path,
            resource_path,
        }),
        (settings, project, resources) => {
            let missing = [
                (settings.is_none(), Category::Settings),
                (project.is_none(), Category::Project),
                (resources.is_none(), Category::Resources),
            ]
            .into_iter()
            .filter_map(|(absent, category)| absent.then_some(category))
            .collect();
            Err(ConventionMiss { version, missing })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
}

/// First match of the first pattern that matches anything
fn find_first(root: &Path, patterns: &[&str], kind: EntryKind) -> Option<PathBuf> {
    patterns.iter().find_map(|pattern| {
        let (dir, name) = match pattern.rsplit_once('/') {
            Some((dir, name)) => (root.join(dir), name),
            None => (root.to_path_buf(), *pattern),
        };
        matching_entries(&dir, name, kind).into_iter().next()
    })
}

/// Entries of `dir` whose file name matches `pattern`, sorted by name
fn matching_entries(dir: &Path, pattern: &str, kind: EntryKind) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut matches: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|path| match kind {
            EntryKind::File => path.is_file(),
            EntryKind::Dir => path.is_dir(),
        })
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| glob_match(pattern, n))
                .unwrap_or(false)
        })
        .collect();

    matches.sort();
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn mkdir(root: &Path, rel: &str) {
        fs::create_dir_all(root.join(rel)).unwrap();
    }

    #[test]
    fn test_legacy_nested_layout() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/settings.js");
        touch(root, "src/project.js");
        mkdir(root, "res");

        let layout = resolve(root, None).unwrap();
        assert_eq!(layout.version, LayoutVersion::LegacyNested);
        assert_eq!(layout.settings_path, root.join("src/settings.js"));
        assert_eq!(layout.project_path, root.join("src/project.js"));
        assert_eq!(layout.resource_path, root.join("res"));
    }

    #[test]
    fn test_flat_root_settings_doubles_as_project() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "settingsAbc123.js");
        mkdir(root, "assets");

        let layout = resolve(root, None).unwrap();
        assert_eq!(layout.version, LayoutVersion::FlatRoot);
        assert_eq!(layout.settings_path, root.join("settingsAbc123.js"));
        assert_eq!(layout.project_path, layout.settings_path);
        assert!(layout.shares_bootstrap());
        assert_eq!(layout.resource_path, root.join("assets"));
    }

    #[test]
    fn test_empty_directory_names_both_conventions() {
        let tmp = TempDir::new().unwrap();
        let err = resolve(tmp.path(), None).unwrap_err();

        let LayoutError::NotFound { attempts, .. } = &err else {
            panic!("unexpected error: {}", err);
        };
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].version, LayoutVersion::LegacyNested);
        assert_eq!(attempts[1].version, LayoutVersion::FlatRoot);

        let message = err.to_string();
        assert!(message.contains("LegacyNested"));
        assert!(message.contains("FlatRoot"));
        assert!(message.contains("settings"));
    }

    #[test]
    fn test_flat_build_with_src_settings_is_not_legacy() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "main.1a2b3.js");
        touch(root, "src/settings.4c5d6.js");
        mkdir(root, "assets/main");

        let layout = resolve(root, None).unwrap();
        assert_eq!(layout.version, LayoutVersion::FlatRoot);
        assert_eq!(layout.settings_path, root.join("src/settings.4c5d6.js"));
        assert_eq!(layout.project_path, root.join("main.1a2b3.js"));
        assert_eq!(layout.resource_path, root.join("assets"));
    }

    #[test]
    fn test_pattern_priority_is_not_merged() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "project.b.js");
        touch(root, "project.a.js");
        touch(root, "src/project.0.js");
        touch(root, "settings.js");
        mkdir(root, "res");

        let layout = resolve(root, None).unwrap();
        assert_eq!(layout.version, LayoutVersion::FlatRoot);
        // root pattern outranks src/, first name within it wins
        assert_eq!(layout.project_path, root.join("project.a.js"));
        assert_eq!(layout.resource_path, root.join("res"));
    }

    #[test]
    fn test_hinted_legacy_probes_resources() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/settings.js");
        mkdir(root, "src/assets");

        let layout = resolve(root, Some(VersionHint::V23x)).unwrap();
        assert_eq!(layout.version, LayoutVersion::LegacyNested);
        assert_eq!(layout.project_path, root.join("src/settings.js"));
        assert_eq!(layout.resource_path, root.join("src/assets"));
    }

    #[test]
    fn test_failed_hint_falls_back_to_detection() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "src/settings.js");
        touch(root, "src/project.js");
        mkdir(root, "res");
        // Hinted FlatRoot still matches here through src/ patterns
        let layout = resolve(root, Some(VersionHint::V24x)).unwrap();
        assert_eq!(layout.version, LayoutVersion::FlatRoot);

        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "settings.js");
        mkdir(root, "assets");
        let layout = resolve(root, Some(VersionHint::V23x)).unwrap();
        assert_eq!(layout.version, LayoutVersion::FlatRoot);
    }

    #[test]
    fn test_directories_are_not_scripts() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        mkdir(root, "settings.js");
        mkdir(root, "assets");
        assert!(resolve(root, None).is_err());
    }

    #[test]
    fn test_validate_lists_project_candidates() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "settings.js");
        touch(root, "project.real.js");
        mkdir(root, "assets");

        let layout = ProjectLayout {
            version: LayoutVersion::FlatRoot,
            settings_path: root.join("settings.js"),
            project_path: root.join("project.gone.js"),
            resource_path: root.join("assets"),
        };

        match layout.validate() {
            Err(LayoutError::ProjectMissing { candidates, .. }) => {
                assert_eq!(candidates, vec![root.join("project.real.js")]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_validate_missing_resources() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "settings.js");

        let layout = ProjectLayout {
            version: LayoutVersion::FlatRoot,
            settings_path: root.join("settings.js"),
            project_path: root.join("settings.js"),
            resource_path: root.join("assets"),
        };
        assert!(matches!(
            layout.validate(),
            Err(LayoutError::ResourceMissing(_))
        ));
    }

    #[test]
    fn test_version_hint_tokens() {
        assert_eq!("2.3.x".parse::<VersionHint>().unwrap(), VersionHint::V23x);
        assert_eq!(
            VersionHint::parse_optional("2.4.15").unwrap(),
            Some(VersionHint::V2415)
        );
        assert_eq!(VersionHint::parse_optional("").unwrap(), None);
        assert!("3.0".parse::<VersionHint>().is_err());
    }
}
