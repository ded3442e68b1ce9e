//! Shared test helpers for `strata-core` integration tests.
//!
//! These helpers provide reusable fixtures and lightweight mocks so the
//! decorator flow tests can focus on behaviour instead of boilerplate.

pub mod tiers;
pub mod widgets;
