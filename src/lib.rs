//! Stageboard - a board-based ticket workflow engine
//!
//! This library provides the core functionality for Stageboard, including:
//! - Database operations and migrations
//! - Data models for projects, boards, stages, groups, users and tickets
//! - Repository layer for data access
//! - The workflow engine: stage ordering, group assignment, assignee
//!   eligibility and the audited ticket lifecycle
//! - CLI command parsing and execution
//!
//! # Example
//!
//! ```no_run
//! use stageboard::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Error: {}", e);
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod config;
pub mod db;
pub mod models;
pub mod repo;
pub mod engine;
pub mod cli;
