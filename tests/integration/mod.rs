//! Integration test suite for taskdeck.
//!
//! These tests run the pure update loop against scripted and on-disk
//! task data services, executing the resulting commands in-process.
//!
//! # Test Categories
//!
//! - `navigation_flow`: startup ordering, category and task selection
//! - `refresh_cycle`: template refresh followed by a refetch
//! - `local_service`: the local directory backend end to end
//!
//! # CI Compatibility
//!
//! No network access and no terminal are needed.

mod fixtures;

mod local_service;
mod navigation_flow;
mod refresh_cycle;
