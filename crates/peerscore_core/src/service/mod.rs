//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the CLI and other front ends decoupled from storage details.

pub mod account_service;
pub mod rating_service;
pub mod results_service;
pub mod seed;
pub mod transfer;
