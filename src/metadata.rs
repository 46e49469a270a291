use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::IngestError;

/// Blank metadata skeleton written by [`generate_metadata_template`].
const METADATA_TEMPLATE: &str = r#"# --- Metadata for the associated data file ---
# Please fill out the values for each field.
# Required fields are marked. Others are optional.
# Date format should be YYYY-MM-DD.

# --- Project & Author (Required) ---
research_project_id: "" # e.g., "Frequency Sweep"
author: ""            # e.g., "wkm2109"

# --- Experiment Details (Optional) ---
experiment_type: ""   # e.g., "Data Calibration"
date_conducted: ""    # e.g., "2025-01-15"

# --- Descriptive Metadata (Optional) ---
custom_tags: ""       # e.g., "1.5 mHZ, 2V, simulation, NHP, etc."
"#;

/// Descriptive fields accompanying a data file, loaded from a YAML mapping.
///
/// Only `research_project_id` and `author` are required; everything else is
/// free-form and forwarded to the server as-is via the uploaded file.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub research_project_id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub experiment_type: Option<String>,
    #[serde(default)]
    pub date_conducted: Option<String>,
    #[serde(default)]
    pub custom_tags: Option<String>,
}

impl Metadata {
    pub(crate) fn validate(&self) -> Result<(), IngestError> {
        let mut missing = Vec::new();
        if self
            .research_project_id
            .as_deref()
            .is_none_or(|s| s.trim().is_empty())
        {
            missing.push("research_project_id");
        }
        if self.author.as_deref().is_none_or(|s| s.trim().is_empty()) {
            missing.push("author");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(IngestError::config(format!(
                "metadata is invalid or missing required keys: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Reads and validates a YAML metadata file.
///
/// A missing file is a [`IngestError::LocalFile`]; anything wrong with the
/// content (unreadable, not a mapping, required keys absent or empty) is a
/// [`IngestError::Config`] with the parse failure kept as the error source.
pub fn load_metadata(path: &Path) -> Result<Metadata, IngestError> {
    if !path.exists() {
        return Err(IngestError::local_file(path));
    }

    let text = fs::read_to_string(path).map_err(|e| {
        IngestError::config_with(
            format!("failed to read metadata file {}", path.display()),
            e,
        )
    })?;

    let metadata: Metadata = serde_yaml::from_str(&text).map_err(|e| {
        IngestError::config_with(
            format!("failed to parse metadata YAML {}", path.display()),
            e,
        )
    })?;

    metadata.validate()?;
    Ok(metadata)
}

/// Writes a blank, comment-annotated metadata YAML file to guide the user.
///
/// If `path` already exists and `overwrite` is false this is a no-op that
/// only logs a warning; the existing file is left untouched.
pub fn generate_metadata_template(path: impl AsRef<Path>, overwrite: bool) -> Result<(), IngestError> {
    let path = path.as_ref();

    if path.is_file() && !overwrite {
        warn!(
            "file '{}' already exists; use overwrite=true to replace it",
            path.display()
        );
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                IngestError::config_with(
                    format!("could not create template directory {}", parent.display()),
                    e,
                )
            })?;
        }
    }

    fs::write(path, METADATA_TEMPLATE).map_err(|e| {
        IngestError::config_with(
            format!("could not create template file {}", path.display()),
            e,
        )
    })?;

    info!("metadata template created at {}", path.display());
    Ok(())
}
