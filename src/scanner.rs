use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::classify::{Classifier, FolderKind};
use crate::config::{Config, PatternSet};
use crate::error::{Error, Result};
use crate::model::{FileItem, Project};

/// Loose files at the root and the projects found below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub root: PathBuf,
    pub files: Vec<FileItem>,
    pub projects: Vec<Project>,
}

impl ScanResult {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Name declared in the project's manifest, if the marker has one.
pub fn extract_internal_name(dir: &Path, marker: &str) -> Option<String> {
    let content = std::fs::read_to_string(dir.join(marker)).ok()?;
    match marker {
        "package.json" => {
            let json: serde_json::Value = serde_json::from_str(&content).ok()?;
            json["name"].as_str().map(str::to_string)
        }
        "Cargo.toml" | "pyproject.toml" => {
            let manifest = match toml::from_str::<toml::Value>(&content) {
                Ok(manifest) => manifest,
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "unparseable manifest");
                    return None;
                }
            };
            ["package", "project"]
                .iter()
                .find_map(|table| manifest.get(table)?.get("name")?.as_str())
                .or_else(|| manifest.get("tool")?.get("poetry")?.get("name")?.as_str())
                .map(str::to_string)
        }
        _ => None,
    }
}

/// Walk `root`, collecting projects (not descended into) and root-level files.
pub fn scan(root: &Path, config: &Config) -> Result<ScanResult> {
    let root = root
        .absolutize()
        .map_err(|e| Error::Scan(format!("{}: {e}", root.display())))?
        .to_path_buf();
    if !root.is_dir() {
        return Err(Error::Scan(format!("not a directory: {}", root.display())));
    }
    std::fs::read_dir(&root).map_err(|e| Error::Scan(format!("{}: {e}", root.display())))?;

    let mut result = ScanResult {
        root: root.clone(),
        ..ScanResult::default()
    };
    let ignore = PatternSet::new(&config.ignore_patterns);
    let classifier = Classifier::new(&config.project_markers);
    let mut walker = WalkDir::new(&root).min_depth(1).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().to_string();
        let is_dir = entry.file_type().is_dir();
        if ignore.is_match(&name) {
            if is_dir {
                walker.skip_current_dir();
            }
            continue;
        }

        if is_dir {
            match classifier.classify(entry.path()) {
                FolderKind::Project { marker } => {
                    tracing::debug!(path = %entry.path().display(), %marker, "project detected");
                    result.projects.push(Project {
                        path: entry.path().to_path_buf(),
                        internal_name: extract_internal_name(entry.path(), &marker),
                        name,
                        type_guess: marker,
                    });
                    walker.skip_current_dir();
                }
                kind if kind.is_protected() => {
                    tracing::debug!(path = %entry.path().display(), ?kind, "leaving protected folder alone");
                    walker.skip_current_dir();
                }
                _ => {}
            }
            continue;
        }

        if entry.depth() == 1 && entry.file_type().is_file() {
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "cannot stat file");
                    continue;
                }
            };
            result.files.push(FileItem {
                path: entry.path().to_path_buf(),
                extension: entry
                    .path()
                    .extension()
                    .map(|e| e.to_string_lossy().to_string()),
                name,
                size: metadata.len(),
                is_dir: false,
                modified: filetime::FileTime::from_last_modification_time(&metadata).unix_seconds(),
                project_root: None,
            });
        }
    }

    tracing::info!(
        root = %root.display(),
        files = result.files.len(),
        projects = result.projects.len(),
        "scan complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use std::fs;

    #[test]
    fn finds_projects_and_root_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("photo.png"), "png").unwrap();
        fs::create_dir_all(root.join("misc/api")).unwrap();
        fs::write(root.join("misc/api/go.mod"), "module api").unwrap();
        fs::write(root.join("misc/notes.txt"), "nested file").unwrap();
        fs::create_dir_all(root.join("tool/src")).unwrap();
        fs::write(root.join("tool/Cargo.toml"), "[package]\nname = \"tool-rs\"\n").unwrap();
        fs::write(root.join("tool/src/package.json"), "{}").unwrap();
        fs::create_dir_all(root.join("node_modules/x")).unwrap();
        fs::write(root.join("node_modules/x/package.json"), "{}").unwrap();

        let result = scan(root, &default_config()).unwrap();

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].name, "photo.png");
        assert_eq!(result.files[0].extension.as_deref(), Some("png"));
        assert_eq!(result.total_bytes(), 3);

        let mut names: Vec<&str> = result.projects.iter().map(|p| p.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["api", "tool"]);
        let tool = result.projects.iter().find(|p| p.name == "tool").unwrap();
        assert_eq!(tool.type_guess, "Cargo.toml");
        assert_eq!(tool.internal_name.as_deref(), Some("tool-rs"));
    }

    #[test]
    fn missing_root_is_a_scan_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan(&dir.path().join("nope"), &default_config()).unwrap_err();
        assert!(matches!(err, Error::Scan(_)));
    }

    #[test]
    fn package_json_name_is_extracted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "web-shop"}"#).unwrap();
        assert_eq!(
            extract_internal_name(dir.path(), "package.json").as_deref(),
            Some("web-shop")
        );
        assert_eq!(extract_internal_name(dir.path(), "go.mod"), None);
    }

    #[test]
    fn installed_software_and_game_data_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let game = root.join("SomeGame");
        fs::create_dir_all(game.join("tools/editor")).unwrap();
        for f in ["Makefile", "Uninstall.exe", "game.exe", "engine.dll"] {
            fs::write(game.join(f), "").unwrap();
        }
        fs::write(game.join("tools/editor/package.json"), "{}").unwrap();
        fs::create_dir_all(root.join("saves")).unwrap();
        fs::write(root.join("saves/Makefile"), "").unwrap();
        fs::write(root.join("saves/world.pak"), "").unwrap();
        fs::create_dir_all(root.join("web")).unwrap();
        fs::write(root.join("web/package.json"), "{}").unwrap();

        let result = scan(root, &default_config()).unwrap();

        let names: Vec<&str> = result.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["web"]);
    }

    #[test]
    fn ignore_patterns_accept_globs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("IMG_0001.jpg"), "").unwrap();
        fs::write(root.join("holiday.jpg"), "").unwrap();
        let mut config = default_config();
        config.ignore_patterns.push("IMG_????.jpg".into());

        let result = scan(root, &config).unwrap();
        let names: Vec<&str> = result.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["holiday.jpg"]);
    }

    #[test]
    fn manifest_names_come_from_the_package_table() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            "[[bin]]\nname = \"cli\"\npath = \"src/main.rs\"\n\n[package]\nname = 'ledger-core'\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        assert_eq!(
            extract_internal_name(dir.path(), "Cargo.toml").as_deref(),
            Some("ledger-core")
        );

        fs::write(
            dir.path().join("pyproject.toml"),
            "[tool.poetry]\nname = \"invoice-bot\"\n",
        )
        .unwrap();
        assert_eq!(
            extract_internal_name(dir.path(), "pyproject.toml").as_deref(),
            Some("invoice-bot")
        );

        fs::write(dir.path().join("Cargo.toml"), "[workspace]\nmembers = [\"a\"]\n").unwrap();
        assert_eq!(extract_internal_name(dir.path(), "Cargo.toml"), None);
    }
}
