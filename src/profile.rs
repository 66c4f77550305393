//! The owner's career profile, read once at startup.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{expand_tilde, PersonaConfig};

/// Immutable profile text for the lifetime of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// Plain-text career summary.
    pub summary: String,
    /// Text extracted from the career profile document.
    pub career: String,
}

impl Profile {
    pub fn new(summary: impl Into<String>, career: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            career: career.into(),
        }
    }

    pub fn load(config: &PersonaConfig) -> Result<Self> {
        let summary = read_text(&expand_tilde(&config.summary_path))?;
        let career = read_text(&expand_tilde(&config.profile_path))?;
        tracing::info!(
            summary_len = summary.len(),
            career_len = career.len(),
            "profile loaded"
        );
        Ok(Self { summary, career })
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profile text at {}", path.display()))
}
