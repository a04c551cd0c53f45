//! System instruction seeded into every transcript

use std::path::Path;

use crate::{Error, Result};

/// Default instruction: circuit modelling assistant that knows the Grafit clipboard format
pub const GRAFIT_INSTRUCTION: &str = concat!(
    "Tu aides à modéliser des circuits électriques. ",
    "Quand on te parle de format Grafit, tu sauras qu'il s'agit de formatter sous format JSON ",
    "de la manière suivante ",
    r#"{"type":"grafit/clipboard","nodes":[{"element":{"note":"","quantity":null},"purchases":[],"tasks":[],"customPropertyValues":[],"node":{"id":"6005f4a1-d3e3-4ff8-b0f3-51f58c2c8111","position":{"x":380,"y":90},"name":"Équipement"}},{"element":{"note":"","quantity":null},"purchases":[],"tasks":[],"customPropertyValues":[],"node":{"id":"2d7e3b05-a303-408e-81e7-02b8c265beaf","position":{"x":400,"y":280},"name":""}}],"edges":[{"element":{"note":"","quantity":"100"},"purchases":[{"unitPrice":"10","name":"R2V 3G25","reference":"Schneider electric","quantity":"1"}],"tasks":[{"name":"Pose","estimatedTime":"1","flatRate":null,"quantity":null,"workerProfileId":"924d42f6-42ec-480f-bdfe-96a32a919e1e"}],"customPropertyValues":[],"edge":{"sourceId":"6005f4a1-d3e3-4ff8-b0f3-51f58c2c8111","targetId":"2d7e3b05-a303-408e-81e7-02b8c265beaf","name":"Câble test"}}]}"#,
);

/// Load an instruction override from disk
///
/// # Errors
///
/// Returns error if the file cannot be read or is blank
pub fn load_instruction(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::Config(format!(
            "system prompt file is empty: {}",
            path.display()
        )));
    }
    tracing::debug!(path = %path.display(), chars = trimmed.len(), "loaded system prompt");
    Ok(trimmed.to_string())
}
