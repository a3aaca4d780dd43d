//! Error types for the sweep orchestrator.
//!
//! `SweepError` aborts the whole request (resolution and setup problems).
//! `UnitError` is scoped to one (source, control value) unit; it is
//! recorded in that unit's failure entry and never aborts siblings.

use std::path::PathBuf;

use thiserror::Error;

use crate::metrics::ParseError;
use crate::models::TemplateError;
use crate::probe::ProbeError;
use crate::process::ProcessError;
use crate::sources::SourceError;

/// Fatal errors: nothing in the sweep can proceed.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Sweep setup failed: {message}")]
    Setup { message: String },
}

impl SweepError {
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }
}

/// Per-unit errors, collected rather than propagated.
#[derive(Error, Debug)]
pub enum UnitError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("No pre-encoded artifact matching '{stem}.*' in {dir}")]
    MissingArtifact { stem: String, dir: PathBuf },

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
