//! # CLI Module
//!
//! Command-line access to the document and validator tooling.
//!
//! ```bash
//! # Load a document and compile a validator for every operation
//! swagger-gate check --spec api.yaml
//!
//! # Print the document as JSON, or the rendered UI page
//! swagger-gate render --spec api.yaml
//! swagger-gate render --spec api.yaml --ui --url /docs
//!
//! # Serve the documentation endpoints for a document
//! swagger-gate serve --spec api.yaml --addr 127.0.0.1:8080
//! ```

mod commands;


pub use commands::{check_document, render, run_cli, CheckReport, Cli, Commands};
