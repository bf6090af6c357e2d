// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Path guard error type
#[derive(Error, Debug)]
pub enum PathGuardError {
    /// The resolved path would escape the confinement root
    #[error("path traversal attempt: {0}")]
    PathTraversal(String),

    /// Filesystem error while canonicalizing
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve an untrusted relative path against a confinement root.
///
/// The root is canonicalized first, and symlinks inside the candidate path
/// are resolved before the containment check, so a symlinked directory
/// pointing outside the root is rejected just like a literal `..` escape.
/// Absolute segments are never accepted.
///
/// Every filesystem write performed while expanding untrusted content must
/// go through this function with the job's (or nested extraction's) root.
pub fn safe_join<P: AsRef<Path>>(root: &Path, untrusted: P) -> Result<PathBuf, PathGuardError> {
    let untrusted = untrusted.as_ref();
    let root = fs::canonicalize(root)?;
    let mut resolved = root.clone();

    for component in untrusted.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                // Resolve symlinks as soon as the prefix exists so that the
                // containment check below sees the real location.
                if resolved.exists() {
                    resolved = fs::canonicalize(&resolved)?;
                }
            }
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathGuardError::PathTraversal(
                    untrusted.display().to_string(),
                ));
            }
        }
    }

    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(PathGuardError::PathTraversal(
            untrusted.display().to_string(),
        ))
    }
}
