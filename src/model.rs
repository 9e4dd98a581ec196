use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Reason prefix the planner gives to project moves.
pub const PROJECT_REASON: &str = "Project detected";
/// Appended to a reason when enrichment renamed the destination.
pub const AI_RENAME_SUFFIX: &str = " + AI Rename";

/// Kind of filesystem action an operation proposes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum OpType {
    Move,
    CreateDir,
    Copy,
    Delete,
    Ignore,
}

impl OpType {
    pub fn as_str(self) -> &'static str {
        match self {
            OpType::Move => "Move",
            OpType::CreateDir => "CreateDir",
            OpType::Copy => "Copy",
            OpType::Delete => "Delete",
            OpType::Ignore => "Ignore",
        }
    }

    /// Whether the operation reads an existing entry and so needs a source.
    pub fn needs_source(self) -> bool {
        matches!(self, OpType::Move | OpType::Copy | OpType::Delete)
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural category of an operation's `reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonKind {
    Project,
    Rule,
    Extension,
    Other,
}

/// A single proposed filesystem action.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Operation {
    /// Stable identifier, unique within a plan.
    pub id: String,
    pub op_type: OpType,
    /// Absolute source path, absent for synthetic entries such as `CreateDir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Absolute destination path.
    pub destination: PathBuf,
    /// Provenance tag ("Project detected: ...", "Rule: ...", "Extension: ...").
    pub reason: String,
}

impl Operation {
    /// Create an operation with a fresh identifier.
    pub fn new(
        op_type: OpType,
        source: Option<PathBuf>,
        destination: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            op_type,
            source,
            destination: destination.into(),
            reason: reason.into(),
        }
    }

    pub fn reason_kind(&self) -> ReasonKind {
        if self.reason.starts_with("Project detected:") {
            ReasonKind::Project
        } else if self.reason.starts_with("Rule:") {
            ReasonKind::Rule
        } else if self.reason.starts_with("Extension:") {
            ReasonKind::Extension
        } else {
            ReasonKind::Other
        }
    }

    /// Project-origin operations with a source are the ones enrichment visits.
    pub fn is_enrichable(&self) -> bool {
        self.reason.starts_with(PROJECT_REASON)
            && self
                .source
                .as_ref()
                .is_some_and(|s| !s.as_os_str().is_empty())
    }

    /// Case-insensitive substring match against source, destination and type.
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let needle = query.to_lowercase();
        let source_hit = self
            .source
            .as_ref()
            .is_some_and(|s| s.to_string_lossy().to_lowercase().contains(&needle));
        source_hit
            || self
                .destination
                .to_string_lossy()
                .to_lowercase()
                .contains(&needle)
            || self.op_type.as_str().to_lowercase().contains(&needle)
    }
}

/// An ordered batch of proposed operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Plan {
    pub summary: String,
    pub operations: Vec<Operation>,
}

impl Plan {
    pub fn new(summary: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            summary: summary.into(),
            operations,
        }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// A copy of this plan with the operation at `index` excised.
    pub fn without(&self, index: usize) -> crate::Result<Plan> {
        if index >= self.operations.len() {
            return Err(crate::Error::IndexOutOfRange {
                index,
                len: self.operations.len(),
            });
        }
        let operations = self
            .operations
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, op)| op.clone())
            .collect();
        Ok(Plan {
            summary: self.summary.clone(),
            operations,
        })
    }

    /// Sanity checks: absolute destinations, sources where required,
    /// unique ids and case-insensitively unique destinations.
    pub fn validate(&self) -> crate::Result<()> {
        crate::validate::check_plan(self)
    }
}

/// A loose file found by a scan.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FileItem {
    pub path: PathBuf,
    pub name: String,
    pub extension: Option<String>,
    pub size: u64,
    pub is_dir: bool,
    /// Seconds since the Unix epoch.
    pub modified: i64,
    pub project_root: Option<PathBuf>,
}

/// A directory recognised as a project by one of its marker files.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Project {
    pub path: PathBuf,
    /// Folder name.
    pub name: String,
    /// Marker that identified the project, e.g. `Cargo.toml`.
    pub type_guess: String,
    /// Name declared inside the project manifest, when there is one.
    #[serde(default)]
    pub internal_name: Option<String>,
}

/// Everything the CLI keeps between invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Session {
    /// Root directory of the last scan.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub files_scanned: usize,
    #[serde(default)]
    pub bytes_scanned: u64,
    #[serde(default)]
    pub projects: Vec<Project>,
    /// Pending plan; absent when nothing is loaded.
    #[serde(default)]
    pub plan: Option<Plan>,
}

/// Generate JSON Schema for the session file.
pub fn generate_schema() -> Result<String> {
    let schema = schemars::schema_for!(Session);
    serde_json::to_string_pretty(&schema).context("failed to serialize schema")
}

/// Load a session, returning an empty one when the file does not exist.
pub fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Ok(Session::default());
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open session {}", path.display()))?;
    let reader = std::io::BufReader::new(file);
    let session = serde_json::from_reader(reader)
        .with_context(|| format!("invalid session file {}", path.display()))?;
    Ok(session)
}

/// Persist a session atomically (write to a temp file, then rename).
pub fn save_session(path: &Path, session: &Session) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, session)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .with_context(|| format!("failed to write session {}", path.display()))?;
    Ok(())
}

/// Create a Plan from a JSON string.
pub fn plan_from_json(json: &str) -> Result<Plan> {
    let plan = serde_json::from_str(json)?;
    Ok(plan)
}
