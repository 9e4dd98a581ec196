use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::model::Operation;

/// Where the `" (N)"` disambiguator goes in the final path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disambiguation {
    /// `Gamma` -> `Gamma (1)`.
    Append,
    /// `notes.txt` -> `notes (1).txt`; falls back to `Append` without an extension.
    BeforeExtension,
}

/// Destinations currently claimed within a plan, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct DestinationIndex {
    used: HashSet<String>,
}

impl DestinationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every operation's destination.
    pub fn build<'a>(operations: impl IntoIterator<Item = &'a Operation>) -> Self {
        let mut index = Self::new();
        for op in operations {
            index.claim(&op.destination);
        }
        index
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().to_lowercase()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.used.contains(&Self::key(path))
    }

    /// Register a destination. Returns false if it was already taken.
    pub fn claim(&mut self, path: &Path) -> bool {
        self.used.insert(Self::key(path))
    }

    /// Vacate a destination so the operation owning it can be rewritten.
    pub fn release(&mut self, path: &Path) -> bool {
        self.used.remove(&Self::key(path))
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// Claim `candidate`, or the first free `candidate (N)` for N = 1, 2, ...
    pub fn resolve(&mut self, candidate: &Path) -> PathBuf {
        self.resolve_with(candidate, Disambiguation::Append, |_| false)
    }

    /// Like [`resolve`](Self::resolve), but a slot also counts as taken when
    /// `occupied` says so (e.g. the path already exists on disk).
    pub fn resolve_with(
        &mut self,
        candidate: &Path,
        style: Disambiguation,
        occupied: impl Fn(&Path) -> bool,
    ) -> PathBuf {
        let mut winner = candidate.to_path_buf();
        let mut n: u64 = 1;
        while self.contains(&winner) || occupied(&winner) {
            winner = disambiguate(candidate, n, style);
            n += 1;
        }
        self.claim(&winner);
        winner
    }
}

/// Split a path string at its last `/` or `\`.
///
/// Returns the parent (without the separator), the separator, and the final
/// segment. Paths are handled as text so Windows-style destinations behave the
/// same on every host.
pub fn split_last_segment(path: &str) -> (Option<(&str, char)>, &str) {
    match path.rfind(['/', '\\']) {
        Some(pos) => {
            let sep = if path[pos..].starts_with('\\') { '\\' } else { '/' };
            (Some((&path[..pos], sep)), &path[pos + 1..])
        }
        None => (None, path),
    }
}

/// Final segment of a destination.
pub fn last_segment(path: &Path) -> String {
    let text = path.to_string_lossy();
    split_last_segment(&text).1.to_string()
}

/// Replace only the final segment of `path`, keeping its parent directory.
pub fn replace_last_segment(path: &Path, name: &str) -> PathBuf {
    let text = path.to_string_lossy();
    match split_last_segment(&text).0 {
        Some((parent, sep)) => PathBuf::from(format!("{parent}{sep}{name}")),
        None => PathBuf::from(name),
    }
}

fn disambiguate(candidate: &Path, n: u64, style: Disambiguation) -> PathBuf {
    let text = candidate.to_string_lossy();
    if style == Disambiguation::BeforeExtension {
        let (_, name) = split_last_segment(&text);
        if let Some(dot) = name.rfind('.')
            && dot > 0
        {
            let split_at = text.len() - name.len() + dot;
            return PathBuf::from(format!("{} ({n}){}", &text[..split_at], &text[split_at..]));
        }
    }
    PathBuf::from(format!("{text} ({n})"))
}
