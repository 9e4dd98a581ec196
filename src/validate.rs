use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::Plan;

/// Two operations claiming the same destination (case-insensitively).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub first: usize,
    pub second: usize,
    pub destination: String,
}

/// Absolute on this host, or a Windows drive/UNC path on any host.
pub fn is_absolute_like(path: &Path) -> bool {
    if path.is_absolute() {
        return true;
    }
    let text = path.to_string_lossy();
    let bytes = text.as_bytes();
    let drive = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/');
    drive || text.starts_with(r"\\")
}

/// Every pair of operations whose destinations collide.
pub fn find_conflicts(plan: &Plan) -> Vec<Conflict> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut conflicts = Vec::new();
    for (i, op) in plan.operations.iter().enumerate() {
        let key = op.destination.to_string_lossy().to_lowercase();
        match seen.get(&key) {
            Some(&first) => conflicts.push(Conflict {
                first,
                second: i,
                destination: op.destination.display().to_string(),
            }),
            None => {
                seen.insert(key, i);
            }
        }
    }
    conflicts
}

/// Structural checks run before a plan is accepted for apply.
pub fn check_plan(plan: &Plan) -> Result<()> {
    let mut ids = HashSet::new();
    for (i, op) in plan.operations.iter().enumerate() {
        if !ids.insert(op.id.as_str()) {
            return Err(Error::Plan(format!("duplicate operation id {} at #{i}", op.id)));
        }
        if !is_absolute_like(&op.destination) {
            return Err(Error::Plan(format!(
                "destination must be absolute: {}",
                op.destination.display()
            )));
        }
        match &op.source {
            Some(src) if !is_absolute_like(src) => {
                return Err(Error::Plan(format!(
                    "source must be absolute: {}",
                    src.display()
                )));
            }
            None if op.op_type.needs_source() => {
                return Err(Error::Plan(format!(
                    "{} operation #{i} has no source",
                    op.op_type
                )));
            }
            _ => {}
        }
    }
    if let Some(c) = find_conflicts(plan).first() {
        return Err(Error::Plan(format!(
            "operations #{} and #{} both target {}",
            c.first, c.second, c.destination
        )));
    }
    Ok(())
}
