//! Common test utilities and fixtures for the statekit-core test suite.
//!
//! Shared state shapes, secrets and store doubles used by the integration and
//! property tests.

pub mod fixtures;
