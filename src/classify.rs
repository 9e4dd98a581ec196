//! Decides what a directory found during a scan is.
//!
//! Installed software and game data are recognised before project markers,
//! so a game shipping a `Makefile` is never mistaken for a project.

use std::path::Path;

use crate::config::PatternSet;

/// Entries sampled when looking for binary or game-data signatures.
const SAMPLE_ENTRIES: usize = 50;
/// `.dat` files at which a folder counts as game data.
const DAT_THRESHOLD: usize = 5;

const INSTALLED_INDICATORS: &[&str] = &[
    "Uninstall.exe",
    "unins000.exe",
    "unins001.exe",
    "setup.exe",
    "UnityCrashHandler64.exe",
    "UnityPlayer.dll",
    "d3dcompiler_47.dll",
    "opengl32.dll",
    "steam_api*.dll",
    "Galaxy64.dll",
    "tier0.dll",
    "adb.exe",
    "AdbWinApi.dll",
];

/// Markers that define a project root on their own, checked before the
/// configured ones.
const STRONG_MARKERS: &[&str] = &[
    "package.json",
    "Cargo.toml",
    "pom.xml",
    "build.gradle",
    "go.mod",
    "requirements.txt",
    "Gemfile",
    "composer.json",
    "mix.exs",
    "CMakeLists.txt",
    "Makefile",
    ".git",
    ".hg",
    ".svn",
    ".vscode",
    ".idea",
    "*.sln",
    "*.csproj",
    "*.xcodeproj",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderKind {
    /// A project identified by `marker`.
    Project { marker: String },
    /// Looks like installed software; never moved or descended into.
    InstalledProgram,
    /// Looks like game or application data; never moved or descended into.
    AppData,
    /// Nothing special; the scan keeps walking inside it.
    Plain,
}

impl FolderKind {
    /// Whether the scan should stop at this folder.
    pub fn is_protected(&self) -> bool {
        matches!(self, FolderKind::InstalledProgram | FolderKind::AppData)
    }
}

/// Patterns used by [`Classifier::classify`], compiled once per scan.
#[derive(Debug, Clone)]
pub struct Classifier {
    installed: PatternSet,
    strong: PatternSet,
    configured: PatternSet,
}

impl Classifier {
    pub fn new(project_markers: &[String]) -> Self {
        Self {
            installed: PatternSet::new(INSTALLED_INDICATORS),
            strong: PatternSet::new(STRONG_MARKERS),
            configured: PatternSet::new(project_markers),
        }
    }

    pub fn classify(&self, dir: &Path) -> FolderKind {
        let names = entry_names(dir);
        if self.is_installed_software(&names) {
            return FolderKind::InstalledProgram;
        }
        if is_app_data(&names) {
            return FolderKind::AppData;
        }
        self.strong
            .first_match_in(names.as_slice())
            .or_else(|| self.configured.first_match_in(names.as_slice()))
            .map_or(FolderKind::Plain, |marker| FolderKind::Project {
                marker: marker.to_string(),
            })
    }

    fn is_installed_software(&self, names: &[String]) -> bool {
        if names.iter().any(|n| self.installed.is_match(n)) {
            return true;
        }
        let sample = &names[..names.len().min(SAMPLE_ENTRIES)];
        has_extension(sample, "exe") && has_extension(sample, "dll")
    }
}

fn entry_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

fn has_extension(names: &[String], ext: &str) -> bool {
    names.iter().any(|n| extension_of(n).as_deref() == Some(ext))
}

fn is_app_data(names: &[String]) -> bool {
    let sample = &names[..names.len().min(SAMPLE_ENTRIES)];
    let count = |wanted: &[&str]| {
        sample
            .iter()
            .filter(|n| extension_of(n).is_some_and(|e| wanted.contains(&e.as_str())))
            .count()
    };
    count(&["pak", "vpk"]) >= 1 || count(&["dat"]) >= DAT_THRESHOLD
}
