//! Error types for the runner module.
//!
//! This submodule isolates derive-macro-affected code to scope lint suppressions
//! narrowly.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use std::io;
use thiserror::Error;

use crate::error::PumpError;

/// Errors raised while filtering a stream through a child process.
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    /// The pump session failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Pump(#[from] PumpError),
    /// Reading the host's input stream failed.
    #[error("failed to read filter input: {0}")]
    #[diagnostic(code(pipepump::runner::input))]
    Input(#[source] io::Error),
    /// Writing the host's output stream failed.
    #[error("failed to write filter output: {0}")]
    #[diagnostic(code(pipepump::runner::output))]
    Output(#[source] io::Error),
}
