//! Tagscan - incremental file tag rescanner for the Librarian media catalog
//!
//! Revisits catalog entries whose files have not been scanned since the last
//! complete run, re-reads their embedded tags and writes any difference back
//! to the catalog. See [`scanner::Scanner`] for the entry point.

pub mod app_mode;
pub mod cli;
pub mod config;
pub mod db;
pub mod jobs;
pub mod media;
pub mod scanner;
pub mod services;
