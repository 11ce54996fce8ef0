// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference resolution: mapping "fix this" to concrete files.

use crate::context::RouterContext;
use std::path::PathBuf;

const KNOWN_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "rs", "py", "go", "java", "rb", "css", "scss", "html",
    "json", "md", "toml", "yaml", "yml", "sql", "sh",
];

const DEICTIC_WORDS: &[&str] = &["this", "that", "these", "those", "it"];

/// Outcome of resolving what a prompt refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceResolution {
    /// Concrete files, in priority order
    Files(Vec<PathBuf>),
    /// The prompt points at something but nothing in context says what
    Ambiguous,
    /// The prompt does not use references
    None,
}

/// Extract explicit file paths mentioned in the prompt.
pub fn explicit_paths(prompt: &str) -> Vec<PathBuf> {
    prompt
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !(c.is_alphanumeric() || c == '/' || c == '.' || c == '_' || c == '-')))
        .filter(|w| {
            w.rsplit_once('.')
                .is_some_and(|(stem, ext)| !stem.is_empty() && KNOWN_EXTENSIONS.contains(&ext))
        })
        .map(PathBuf::from)
        .collect()
}

/// Whether the prompt leans on a deictic word ("fix this", "undo that").
pub(crate) fn has_deictic_reference(prompt_lower: &str) -> bool {
    prompt_lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .any(|w| DEICTIC_WORDS.contains(&w))
}

/// Resolve references by the priority stack: last applied diff, then the
/// open editor, then the last proposed artifact, then explicit paths.
pub fn resolve_references(prompt: &str, ctx: &RouterContext) -> ReferenceResolution {
    let explicit = explicit_paths(prompt);
    let deictic = has_deictic_reference(&prompt.to_lowercase());

    if !deictic {
        return if explicit.is_empty() {
            ReferenceResolution::None
        } else {
            ReferenceResolution::Files(explicit)
        };
    }

    if let Some(files) = &ctx.last_applied_diff {
        if !files.is_empty() {
            return ReferenceResolution::Files(files.clone());
        }
    }
    if let Some(file) = &ctx.last_open_editor {
        return ReferenceResolution::Files(vec![file.clone()]);
    }
    if let Some(files) = &ctx.last_artifact_proposed {
        if !files.is_empty() {
            return ReferenceResolution::Files(files.clone());
        }
    }
    if !explicit.is_empty() {
        return ReferenceResolution::Files(explicit);
    }

    ReferenceResolution::Ambiguous
}

#[cfg(test)]
#[path = "references_tests.rs"]
mod tests;
