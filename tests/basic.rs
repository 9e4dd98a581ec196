use anyhow::Result;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use tidyplan::backend::LocalBackend;
use tidyplan::config::default_config;
use tidyplan::events::{Event, discard};
use tidyplan::model::{OpType, Project};
use tidyplan::naming::from_fn;
use tidyplan::store::PlanStore;

fn node_project(root: &Path, name: &str) -> Result<()> {
    fs::create_dir_all(root.join(name))?;
    fs::write(root.join(name).join("package.json"), "{}")?;
    fs::write(root.join(name).join("index.js"), "console.log(1)")?;
    Ok(())
}

#[test]
fn test_plan_validation() -> Result<()> {
    let plan = tidyplan::model::plan_from_json(
        &json!({
            "summary": "two moves",
            "operations": [
                { "id": "a", "op_type": "Move", "source": "/d/a.txt", "destination": "/d/Documents/a.txt", "reason": "Rule: Documents" },
                { "id": "b", "op_type": "Move", "source": "/d/b.txt", "destination": "/d/Documents/A.TXT", "reason": "Rule: Documents" }
            ]
        })
        .to_string(),
    )?;
    // Destinations compare case-insensitively.
    assert!(plan.validate().is_err());
    Ok(())
}

#[test]
fn test_schema_generation() -> Result<()> {
    let schema = tidyplan::model::generate_schema()?;
    assert!(schema.contains("$schema"));
    assert!(schema.contains("Session"));
    assert!(schema.contains("Operation"));
    Ok(())
}

#[test]
fn test_identical_suggestions_get_numbered() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("desk");
    node_project(&root, "alpha")?;
    node_project(&root, "beta")?;
    let backend = LocalBackend::new(dir.path().join("state"));

    let mut store = PlanStore::new();
    store.scan_and_plan(&backend, &root, &default_config(), &mut discard)?;
    assert_eq!(store.plan().map(|p| p.len()), Some(2));

    let namer = from_fn(|_: &Project, _: &str| Ok(Some("storefront".to_string())));
    let mut events = Vec::new();
    let outcome = store.enrich(&namer, "key", |p| p.exists(), &mut |e| events.push(e))?;
    assert_eq!(outcome.changed, 2);

    let plan = store.plan().expect("plan stays loaded");
    let node = root.join("Projects").join("Node");
    assert_eq!(plan.operations[0].destination, node.join("storefront"));
    assert_eq!(plan.operations[1].destination, node.join("storefront (1)"));
    assert!(plan.operations.iter().all(|op| op.reason.ends_with(" + AI Rename")));
    assert!(plan.validate().is_ok());

    let renamed = events
        .iter()
        .filter(|e| matches!(e, Event::OpRenamed { .. }))
        .count();
    assert_eq!(renamed, 2);
    Ok(())
}

#[test]
fn test_suggestion_already_on_disk_is_numbered() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("desk");
    node_project(&root, "alpha")?;
    fs::create_dir_all(root.join("Projects/Node/storefront"))?;
    let mut backend = LocalBackend::new(dir.path().join("state"));

    let mut store = PlanStore::new();
    store.scan_and_plan(&backend, &root, &default_config(), &mut discard)?;
    let namer = from_fn(|_: &Project, _: &str| Ok(Some("storefront".to_string())));
    store.enrich(&namer, "key", |p| p.exists(), &mut discard)?;

    let node = root.join("Projects").join("Node");
    let plan = store.plan().expect("plan stays loaded");
    assert_eq!(plan.operations[0].destination, node.join("storefront (1)"));

    store.apply(&mut backend, &mut discard)?;
    assert!(node.join("storefront (1)/package.json").exists());
    assert!(!node.join("storefront/package.json").exists());
    Ok(())
}

#[test]
fn test_enriched_plan_applies_and_undoes() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("desk");
    node_project(&root, "alpha")?;
    fs::write(root.join("photo.png"), "png")?;
    let mut backend = LocalBackend::new(dir.path().join("state"));

    let mut store = PlanStore::new();
    store.scan_and_plan(&backend, &root, &default_config(), &mut discard)?;
    let namer = from_fn(|p: &Project, _: &str| Ok(Some(format!("{}-app", p.name))));
    store.enrich(&namer, "key", |p| p.exists(), &mut discard)?;

    let batch = store.apply(&mut backend, &mut discard)?;
    assert_eq!(batch.operations.len(), 2);
    assert!(batch.operations.iter().all(|op| op.op_type == OpType::Move));
    assert!(store.plan().is_none());
    assert!(root.join("Projects/Node/alpha-app/package.json").exists());
    assert!(root.join("Media/Images/photo.png").exists());
    assert!(!root.join("alpha").exists());

    store.undo(&mut backend, &mut discard)?;
    assert!(root.join("alpha/package.json").exists());
    assert!(root.join("photo.png").exists());
    assert!(!store.history().can_undo());
    Ok(())
}

#[test]
fn test_naming_failures_keep_planned_names() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("desk");
    node_project(&root, "alpha")?;
    let backend = LocalBackend::new(dir.path().join("state"));

    let mut store = PlanStore::new();
    store.scan_and_plan(&backend, &root, &default_config(), &mut discard)?;
    let before = store.plan().cloned();

    let namer = from_fn(|_: &Project, _: &str| Err(tidyplan::NamingError::new("401 unauthorized")));
    let outcome = store.enrich(&namer, "bad-key", |p| p.exists(), &mut discard)?;
    assert_eq!(outcome.changed, 0);
    assert_eq!(outcome.failures, 1);
    assert_eq!(store.plan().cloned(), before);
    Ok(())
}
