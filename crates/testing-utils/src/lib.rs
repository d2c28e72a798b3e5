//! # Notifier Testing Utils
//!
//! Shared testing utilities for the notifier workspace.
//! This crate provides in-memory mock implementations and test data builders
//! that can be used across all other crates in the workspace.
//!
//! ## Features
//!
//! - **Mock Repositories**: In-memory implementations of both repository traits,
//!   with switches for injecting store failures
//! - **Mock Handler**: A recording `SubscriptionHandler` with configurable
//!   endorsement and delivery outcomes
//! - **Test Data Builders**: Builders for notifications and subscriptions
//!
//! ## Usage
//!
//! ```toml
//! [dev-dependencies]
//! notifier-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
