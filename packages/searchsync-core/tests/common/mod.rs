//! Common test utilities for searchsync-core
//!
//! Fixtures shared by the integration and property tests.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;
