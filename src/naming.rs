use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use crate::error::NamingError;
use crate::model::Project;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Files read (in order) to describe a project to the model.
const CONTEXT_FILES: &[&str] = &[
    "README.md",
    "package.json",
    "Cargo.toml",
    "pyproject.toml",
    "requirements.txt",
    "app.py",
    "main.py",
    "index.html",
    "index.ts",
    "go.mod",
    "Makefile",
    "Pipfile",
    "composer.json",
    "mix.exs",
    ".git/config",
];
const SNIPPET_CHARS: usize = 1000;
const WEAK_CONTEXT: usize = 50;

/// Suggests a folder name for a project.
///
/// `Ok(None)` means the collaborator had nothing to offer; an error is
/// treated the same way by enrichment.
pub trait Namer: Send + Sync {
    fn suggest_name(&self, project: &Project, credential: &str)
    -> Result<Option<String>, NamingError>;
}

/// Adapter turning a closure into a [`Namer`].
pub struct FnNamer<F>(F);

pub fn from_fn<F>(f: F) -> FnNamer<F>
where
    F: Fn(&Project, &str) -> Result<Option<String>, NamingError> + Send + Sync,
{
    FnNamer(f)
}

impl<F> Namer for FnNamer<F>
where
    F: Fn(&Project, &str) -> Result<Option<String>, NamingError> + Send + Sync,
{
    fn suggest_name(
        &self,
        project: &Project,
        credential: &str,
    ) -> Result<Option<String>, NamingError> {
        (self.0)(project, credential)
    }
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Namer backed by an OpenAI-compatible chat-completions endpoint.
pub struct HttpNamer {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
}

impl HttpNamer {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, NamingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| NamingError::new(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }
}

impl Namer for HttpNamer {
    fn suggest_name(
        &self,
        project: &Project,
        credential: &str,
    ) -> Result<Option<String>, NamingError> {
        if credential.is_empty() {
            return Ok(None);
        }
        let context = gather_project_context(&project.path);
        if context.trim().is_empty() {
            return Ok(None);
        }

        let prompt = format!(
            "I have a coding project. Based on the following file snippets, suggest a short, \
             descriptive name for the project folder (kebab-case). Only return the name, \
             nothing else.\n\nContext:\n{context}"
        );
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: "You are a helpful assistant that renames coding projects.".into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: prompt,
                },
            ],
            temperature: 0.3,
        };

        tracing::debug!(project = %project.path.display(), "requesting name suggestion");
        let response: ChatResponse = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential)
            .json(&request)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| NamingError::new(e.to_string()))?;

        Ok(response
            .choices
            .first()
            .and_then(|c| clean_suggestion(&c.message.content)))
    }
}

/// Strip quoting and anything that would let a name escape its parent folder.
pub fn clean_suggestion(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`' | '\n' | '\r'))
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Snippets of the project's descriptive files, or a listing when they are thin.
pub fn gather_project_context(path: &Path) -> String {
    let mut context = String::new();
    for name in CONTEXT_FILES {
        let file = path.join(name);
        if let Ok(content) = std::fs::read_to_string(&file) {
            let snippet: String = content.chars().take(SNIPPET_CHARS).collect();
            let _ = write!(context, "--- File: {name} ---\n{snippet}\n\n");
        }
    }

    if context.len() < WEAK_CONTEXT {
        context.push_str("--- Project Structure ---\n");
        if let Ok(entries) = std::fs::read_dir(path) {
            let mut names: Vec<(String, bool)> = entries
                .flatten()
                .filter_map(|e| {
                    let name = e.file_name().to_string_lossy().to_string();
                    let is_dir = e.file_type().ok()?.is_dir();
                    (!name.starts_with('.')).then_some((name, is_dir))
                })
                .collect();
            names.sort();
            for (name, is_dir) in names {
                let marker = if is_dir { "/" } else { "" };
                let _ = writeln!(context, "{name}{marker}");
            }
        }
    }
    context
}
