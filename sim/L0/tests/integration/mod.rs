//! Integration tests for the scene binding pipeline.
//!
//! These tests drive the whole stack end to end:
//! - Scene → composed description (conversions, deduplication, determinism)
//! - Description → reference engine (compile, bind, per-entity failures)
//! - Binder lifecycle (step, reset, reload, activation gate)
//! - Streamed terrain slots, contacts and runtime mutation

pub mod bind_isolation;
pub mod contacts;
pub mod lifecycle;
pub mod pipeline;
pub mod runtime_mutation;
pub mod terrain_pool;
