// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry for user-approved generated tools (`tools/generated/`).
//!
//! Each tool is a source file plus a registry entry carrying the sha-256 of
//! the code at approval time. A hash mismatch at load means the file changed
//! since the user approved it, so the tool must be re-approved before it
//! runs again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolRegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("generated tool not found: {0}")]
    NotFound(String),
    #[error("generated tool {name} changed since approval (expected {expected}, got {actual})")]
    HashMismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

/// One approved generated tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedToolEntry {
    pub name: String,
    pub sha256: String,
    pub approved_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Registry {
    #[serde(default)]
    tools: Vec<GeneratedToolEntry>,
}

/// Store rooted at `tools/generated/`.
pub struct GeneratedToolStore {
    root: PathBuf,
}

impl GeneratedToolStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn registry_path(&self) -> PathBuf {
        self.root.join("registry.json")
    }

    fn code_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.js"))
    }

    /// Register (or re-register) an approved tool, returning its code hash.
    pub fn register(&self, name: &str, code: &str) -> Result<GeneratedToolEntry, ToolRegistryError> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.code_path(name), code)?;

        let entry = GeneratedToolEntry {
            name: name.to_string(),
            sha256: format!("{:x}", Sha256::digest(code.as_bytes())),
            approved_at: Utc::now(),
        };

        let mut registry = self.load_registry()?;
        registry.tools.retain(|t| t.name != name);
        registry.tools.push(entry.clone());
        registry.tools.sort_by(|a, b| a.name.cmp(&b.name));

        let tmp = self.registry_path().with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&registry)?)?;
        fs::rename(&tmp, self.registry_path())?;

        Ok(entry)
    }

    /// Load a tool's code, verifying it still matches its approved hash.
    pub fn load_verified(&self, name: &str) -> Result<String, ToolRegistryError> {
        let registry = self.load_registry()?;
        let entry = registry
            .tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ToolRegistryError::NotFound(name.to_string()))?;

        let path = self.code_path(name);
        if !path.is_file() {
            return Err(ToolRegistryError::NotFound(name.to_string()));
        }
        let code = fs::read_to_string(path)?;
        let actual = format!("{:x}", Sha256::digest(code.as_bytes()));
        if actual != entry.sha256 {
            return Err(ToolRegistryError::HashMismatch {
                name: name.to_string(),
                expected: entry.sha256.clone(),
                actual,
            });
        }
        Ok(code)
    }

    /// All approved tools, sorted by name.
    pub fn entries(&self) -> Result<Vec<GeneratedToolEntry>, ToolRegistryError> {
        Ok(self.load_registry()?.tools)
    }

    fn load_registry(&self) -> Result<Registry, ToolRegistryError> {
        if !self.registry_path().is_file() {
            return Ok(Registry::default());
        }
        Ok(serde_json::from_slice(&fs::read(self.registry_path())?)?)
    }
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
