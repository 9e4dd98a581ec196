//! Directory reorganisation planning with conflict-free AI renaming.
//!
//! A scan produces a [`model::Plan`] of file operations. The plan can be
//! reviewed, filtered and trimmed through [`store::PlanStore`], enriched with
//! suggested project names ([`enrich`]), applied as one undoable batch, and
//! later rolled back from the on-disk journal.

pub mod backend;
pub mod classify;
pub mod cli;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fsops;
pub mod history;
pub mod journal;
pub mod model;
pub mod naming;
pub mod planner;
pub mod reporter;
pub mod resolve;
pub mod scanner;
pub mod store;
pub mod transaction;
pub mod validate;

pub use error::{Error, NamingError, Result};
