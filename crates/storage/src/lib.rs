//! Storage boundary for the study platform.
//!
//! Services depend on the repository traits in [`repository`]; backends
//! are the in-memory double (tests, prototyping) and `SQLite` via sqlx.
//! Live chat changes fan out through [`realtime`].

#![forbid(unsafe_code)]

pub mod realtime;
pub mod repository;
pub mod sqlite;
