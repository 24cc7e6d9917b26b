//! End-to-End Integration Tests
//!
//! These tests exercise the full resolve pipeline (source -> parser ->
//! filter chain -> snapshot -> resolver facade) across the fedmeta crates,
//! using in-memory and filesystem sources.

mod common;

mod batch_resolution;
mod dynamic_resolution;
