//! Domain model and pure logic for the study platform.
//!
//! This crate has no I/O: identifiers, validated entities, answer
//! normalization and the dashboard math all live here so the storage and
//! service layers can stay thin.

#![forbid(unsafe_code)]

pub mod answer;
pub mod metrics;
pub mod model;
pub mod time;

pub use time::Clock;
