//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `actor.rs`: the single owner of the connection pool

pub mod actor;
pub mod models;
pub mod patch;
pub mod schema;

mod patch_impl;

pub use models::{
    DbLighthouseReport, DbLighthouseSummary, DbPwa, DbTask, IndexStamp, PwaListQuery, PwaPage,
    PwaSort,
};
pub use patch::{
    DbPatchable, LighthouseReportCreate, PwaPatch, PwaPatchEnvelope, PwaUpsert, UpsertOutcome,
};
pub use schema::SQLITE_INIT;

pub use actor::{DbActorHandle, spawn};
