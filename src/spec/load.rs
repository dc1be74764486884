use super::build::build_contract;
use super::source_map::SourceMap;
use super::types::Contract;
use anyhow::Context;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// `.json` files are JSON, everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Reads and builds a contract from a file on disk.
pub fn load_contract(path: impl AsRef<Path>) -> anyhow::Result<Contract> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read OpenAPI document {}", path.display()))?;
    load_contract_from_str(&content, DocumentFormat::from_path(path))
        .with_context(|| format!("failed to load OpenAPI document {}", path.display()))
}

/// Builds a contract from document text.
///
/// YAML input also yields source positions for every definition.
pub fn load_contract_from_str(text: &str, format: DocumentFormat) -> anyhow::Result<Contract> {
    let (value, source_map): (serde_json::Value, Option<SourceMap>) = match format {
        DocumentFormat::Yaml => (
            serde_yaml::from_str(text).context("document is not valid YAML")?,
            Some(SourceMap::from_yaml(text)),
        ),
        DocumentFormat::Json => (
            serde_json::from_str(text).context("document is not valid JSON")?,
            None,
        ),
    };
    let contract = build_contract(&value, source_map.as_ref())?;
    Ok(contract)
}
