//! Advfilter - nested condition trees over form entries
//!
//! This library provides the core functionality for Advfilter, including:
//! - Filter tree normalization, per-request augmentation and pruning
//! - Compilation of trees into entry listing queries
//! - In-memory evaluation for field conditional logic
//! - The field catalogue offered to the filter editor
//! - SQLite storage for forms, entries, users, terms and views
//! - CLI command parsing and execution
//!
//! # Example
//!
//! ```no_run
//! use advfilter::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Error: {}", e);
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod catalogue;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod query;
pub mod repo;
pub mod utils;
