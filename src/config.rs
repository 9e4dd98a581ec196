use glob::{MatchOptions, Pattern};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Routes matching loose files to a folder under the scan root.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    /// Glob patterns such as `*.jpg`; see [`PatternSet`].
    pub patterns: Vec<String>,
    /// Destination relative to the scan root, `/`-separated.
    pub destination: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Organisation settings: what to skip, what marks a project, where files go.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Config {
    pub rules: Vec<Rule>,
    pub ignore_patterns: Vec<String>,
    pub project_markers: Vec<String>,
    /// Send files no rule matched to `Files/<EXT>`.
    #[serde(default)]
    pub group_by_extension: bool,
}

impl Default for Config {
    fn default() -> Self {
        default_config()
    }
}

const NAME_MATCH: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Glob patterns (`*`, `?`, `[..]`) compiled once and matched against bare
/// file names, ignoring case.
///
/// Patterns that fail to compile are logged and left out.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<(String, Pattern)>,
}

impl PatternSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .map(AsRef::as_ref)
            .filter_map(|raw| match Pattern::new(raw) {
                Ok(pattern) => Some((raw.to_string(), pattern)),
                Err(e) => {
                    tracing::warn!(pattern = raw, error = %e, "ignoring invalid pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.patterns.iter().any(|(_, p)| p.matches_with(name, NAME_MATCH))
    }

    /// First pattern, in configured order, that matches any of `names`.
    pub fn first_match_in<S: AsRef<str>>(&self, names: &[S]) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, p)| names.iter().any(|n| p.matches_with(n.as_ref(), NAME_MATCH)))
            .map(|(raw, _)| raw.as_str())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn rule(name: &str, patterns: &[&str], destination: &str) -> Rule {
    Rule {
        name: name.to_string(),
        patterns: strings(patterns),
        destination: destination.to_string(),
        active: true,
    }
}

/// Built-in configuration used when nothing has been saved yet.
pub fn default_config() -> Config {
    Config {
        ignore_patterns: strings(&[
            "node_modules", ".git", "target", ".vscode", "dist", "build", "games", "site-packages",
            ".obsidian", ".idea", "venv", ".venv", "__pycache__", "__MACOSX", ".tidyplan",
        ]),
        project_markers: strings(&[
            // Frameworks before the generic language markers.
            "next.config.js",
            "next.config.mjs",
            "remix.config.js",
            "angular.json",
            "vue.config.js",
            "vite.config.js",
            "vite.config.ts",
            "nest-cli.json",
            "manage.py",
            "package.json",
            "Cargo.toml",
            "pyproject.toml",
            "requirements.txt",
            "go.mod",
            "pom.xml",
            "build.gradle",
            "build.gradle.kts",
            "*.sln",
            "Makefile",
            "CMakeLists.txt",
            "composer.json",
            "Gemfile",
            "pubspec.yaml",
            "Package.swift",
            "Dockerfile",
            "docker-compose.yml",
            "mix.exs",
            "Project.toml",
            "index.html",
            ".git",
        ]),
        rules: vec![
            rule(
                "Images",
                &["*.jpg", "*.jpeg", "*.png", "*.gif", "*.svg", "*.webp", "*.bmp", "*.tiff"],
                "Media/Images",
            ),
            rule("Videos", &["*.mp4", "*.mkv", "*.mov", "*.avi", "*.webm"], "Media/Videos"),
            rule("Audio", &["*.mp3", "*.wav", "*.flac", "*.aac", "*.ogg"], "Media/Audio"),
            rule(
                "Documents",
                &["*.pdf", "*.docx", "*.doc", "*.txt", "*.xlsx", "*.pptx", "*.csv", "*.md"],
                "Documents",
            ),
            rule("Installers", &["*.exe", "*.msi"], "Downloads/Installers"),
            rule("Archives", &["*.zip", "*.rar", "*.7z", "*.tar.gz"], "Downloads/Archives"),
            rule("Shortcuts", &["*.lnk", "*.url"], "Shortcuts"),
        ],
        group_by_extension: false,
    }
}

/// Persistence for [`Config`].
pub trait ConfigStore {
    /// Saved config, or the default one when none was saved.
    fn load_config(&self) -> Result<Config>;
    fn save_config(&self, config: &Config) -> Result<()>;
    /// Reveal the config folder in the platform file manager.
    fn open_config_folder(&self) -> Result<()>;

    fn default_config(&self) -> Config {
        default_config()
    }
}

/// Config stored as `config.json` inside a directory.
pub struct FileConfigStore {
    dir: PathBuf,
}

impl FileConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("config.json")
    }
}

impl ConfigStore for FileConfigStore {
    fn load_config(&self) -> Result<Config> {
        let path = self.path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no saved config, using defaults");
            return Ok(default_config());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| Error::Config(e.to_string()))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    fn save_config(&self, config: &Config) -> Result<()> {
        let err = |e: &dyn std::fmt::Display| Error::Config(e.to_string());
        std::fs::create_dir_all(&self.dir).map_err(|e| err(&e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| err(&e))?;
        serde_json::to_writer_pretty(&mut tmp, config).map_err(|e| err(&e))?;
        tmp.write_all(b"\n").map_err(|e| err(&e))?;
        tmp.persist(self.path()).map_err(|e| err(&e))?;
        Ok(())
    }

    fn open_config_folder(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::Config(e.to_string()))?;
        let opener = if cfg!(target_os = "windows") {
            "explorer"
        } else if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        std::process::Command::new(opener)
            .arg(&self.dir)
            .spawn()
            .map_err(|e| Error::Config(format!("failed to launch {opener}: {e}")))?;
        Ok(())
    }
}
