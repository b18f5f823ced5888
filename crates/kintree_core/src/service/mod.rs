//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, repository and synchronizer calls into
//!   use-case level APIs.
//! - Keep UI layers decoupled from storage details.

pub mod tree_service;
