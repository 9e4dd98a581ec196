use std::path::{Path, PathBuf};

use crate::config::{Config, PatternSet};
use crate::error::{Error, Result};
use crate::model::{FileItem, OpType, Operation, Plan, Project};
use crate::resolve::{DestinationIndex, Disambiguation};
use crate::validate::is_absolute_like;

/// Folder (relative to the root) that collects projects of a given marker.
pub fn project_category(marker: &str) -> &'static str {
    match marker {
        "next.config.js" | "next.config.mjs" => "Projects/NextJS",
        "remix.config.js" => "Projects/Remix",
        "angular.json" => "Projects/Angular",
        "vue.config.js" => "Projects/Vue",
        "vite.config.js" | "vite.config.ts" => "Projects/Vite",
        "nest-cli.json" => "Projects/NestJS",
        "manage.py" => "Projects/Django",
        "package.json" => "Projects/Node",
        "Cargo.toml" => "Projects/Rust",
        "pyproject.toml" | "requirements.txt" => "Projects/Python",
        "index.html" => "Projects/Web",
        "go.mod" => "Projects/Go",
        "pom.xml" | "build.gradle" => "Projects/Java",
        "*.sln" => "Projects/DotNet",
        ".git" => "Projects/Git",
        "Makefile" | "CMakeLists.txt" => "Projects/Cpp",
        "composer.json" => "Projects/PHP",
        "Gemfile" => "Projects/Ruby",
        "pubspec.yaml" => "Projects/Flutter",
        "build.gradle.kts" | "Package.swift" => "Projects/Mobile",
        "Dockerfile" | "docker-compose.yml" => "Projects/DevOps",
        "mix.exs" => "Projects/Elixir",
        "Project.toml" => "Projects/Julia",
        _ => "Projects/Other",
    }
}

/// Keep a declared project name usable as a single folder name.
pub fn sanitize_filename(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn join_relative(root: &Path, relative: &str) -> PathBuf {
    relative
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |acc, seg| acc.join(seg))
}

/// Build the move plan for a scan of `root`.
///
/// Destinations are unique within the plan and never point at something that
/// already exists on disk; entries already in place produce no operation.
pub fn generate_plan(
    files: &[FileItem],
    projects: &[Project],
    config: &Config,
    root: &Path,
) -> Result<Plan> {
    if !is_absolute_like(root) {
        return Err(Error::Plan(format!("root must be absolute: {}", root.display())));
    }
    let mut index = DestinationIndex::new();
    let mut operations = Vec::new();

    for project in projects {
        let name = project
            .internal_name
            .as_deref()
            .map(sanitize_filename)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| project.name.clone());
        let candidate = join_relative(root, project_category(&project.type_guess)).join(&name);
        if candidate == project.path {
            continue;
        }
        let destination = index.resolve_with(&candidate, Disambiguation::Append, |p| {
            p != project.path && p.exists()
        });
        if destination == project.path {
            continue;
        }
        operations.push(Operation::new(
            OpType::Move,
            Some(project.path.clone()),
            destination,
            format!("Project detected: {}", project.type_guess),
        ));
    }

    let rules: Vec<_> = config
        .rules
        .iter()
        .filter(|r| r.active)
        .map(|r| (r, PatternSet::new(&r.patterns)))
        .collect();
    for file in files {
        let rule = rules
            .iter()
            .find(|(_, patterns)| patterns.is_match(&file.name))
            .map(|(rule, _)| *rule);
        let (folder, reason) = match (rule, &file.extension) {
            (Some(rule), _) => (join_relative(root, &rule.destination), format!("Rule: {}", rule.name)),
            (None, Some(ext)) if config.group_by_extension && !ext.is_empty() => (
                join_relative(root, "Files").join(ext.to_uppercase()),
                format!("Extension: {}", ext.to_lowercase()),
            ),
            _ => continue,
        };
        let candidate = folder.join(&file.name);
        if candidate == file.path {
            continue;
        }
        let destination = index.resolve_with(&candidate, Disambiguation::BeforeExtension, |p| {
            p != file.path && p.exists()
        });
        if destination == file.path {
            continue;
        }
        operations.push(Operation::new(OpType::Move, Some(file.path.clone()), destination, reason));
    }

    let summary = format!("Planned {} operations", operations.len());
    tracing::info!(operations = operations.len(), "plan generated");
    Ok(Plan::new(summary, operations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Rule, default_config};
    use crate::validate::find_conflicts;
    use std::fs;

    fn file(root: &Path, name: &str) -> FileItem {
        FileItem {
            path: root.join(name),
            name: name.to_string(),
            extension: Path::new(name).extension().map(|e| e.to_string_lossy().to_string()),
            size: 0,
            is_dir: false,
            modified: 0,
            project_root: None,
        }
    }

    fn project(root: &Path, name: &str, marker: &str, internal: Option<&str>) -> Project {
        Project {
            path: root.join(name),
            name: name.to_string(),
            type_guess: marker.to_string(),
            internal_name: internal.map(str::to_string),
        }
    }

    #[test]
    fn projects_go_to_their_category() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let projects = vec![
            project(root, "old-site", "package.json", Some("@acme/shop")),
            project(root, "svc", "go.mod", None),
        ];
        let plan = generate_plan(&[], &projects, &default_config(), root).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.operations[0].destination, root.join("Projects/Node/_acme_shop"));
        assert_eq!(plan.operations[0].reason, "Project detected: package.json");
        assert_eq!(plan.operations[1].destination, root.join("Projects/Go/svc"));
        assert_eq!(plan.summary, "Planned 2 operations");
    }

    #[test]
    fn file_collisions_keep_extension() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Documents")).unwrap();
        fs::write(root.join("Documents/notes.txt"), "existing").unwrap();
        let files = vec![
            file(root, "notes.txt"),
            file(root, "report.pdf"),
            file(root, "REPORT.PDF"),
            file(root, "song.mp3"),
        ];

        let plan = generate_plan(&files, &[], &default_config(), root).unwrap();

        assert_eq!(plan.operations[0].destination, root.join("Documents/notes (1).txt"));
        assert_eq!(plan.operations[1].destination, root.join("Documents/report.pdf"));
        assert_eq!(plan.operations[2].destination, root.join("Documents/REPORT (1).PDF"));
        assert_eq!(plan.operations[3].destination, root.join("Media/Audio/song.mp3"));
        assert_eq!(plan.operations[3].reason, "Rule: Audio");
        assert!(find_conflicts(&plan).is_empty());
    }

    #[test]
    fn unmatched_files_group_by_extension_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let files = vec![file(root, "data.parquet"), file(root, "LICENSE")];

        let plan = generate_plan(&files, &[], &default_config(), root).unwrap();
        assert!(plan.is_empty());

        let mut config = default_config();
        config.group_by_extension = true;
        let plan = generate_plan(&files, &[], &config, root).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.operations[0].destination, root.join("Files/PARQUET/data.parquet"));
        assert_eq!(plan.operations[0].reason, "Extension: parquet");
    }

    #[test]
    fn rules_match_glob_classes_and_single_characters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut config = default_config();
        config.rules.insert(
            0,
            Rule {
                name: "Camera".into(),
                patterns: vec!["IMG_????.jpg".into(), "[Rr]eport.pdf".into()],
                destination: "Camera".into(),
                active: true,
            },
        );
        let files = vec![file(root, "IMG_0001.jpg"), file(root, "report.pdf"), file(root, "IMG_1.jpg")];

        let plan = generate_plan(&files, &[], &config, root).unwrap();
        assert_eq!(plan.operations[0].destination, root.join("Camera/IMG_0001.jpg"));
        assert_eq!(plan.operations[1].destination, root.join("Camera/report.pdf"));
        assert_eq!(plan.operations[2].destination, root.join("Media/Images/IMG_1.jpg"));
        assert_eq!(plan.operations[0].reason, "Rule: Camera");
    }

    #[test]
    fn entries_already_in_place_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let in_place = Project {
            path: root.join("Projects/Rust/tool"),
            name: "tool".into(),
            type_guess: "Cargo.toml".into(),
            internal_name: None,
        };
        let plan = generate_plan(&[], &[in_place], &default_config(), root).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn relative_root_is_a_plan_error() {
        let err = generate_plan(&[], &[], &default_config(), Path::new("desk")).unwrap_err();
        assert!(matches!(err, Error::Plan(_)));
    }
}
