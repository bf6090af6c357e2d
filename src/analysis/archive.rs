// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::path_guard::{safe_join, PathGuardError};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Per-entry decompressed size cap, a guard against decompression bombs
const MAX_ENTRY_BYTES: u64 = 100 * 1024 * 1024;

/// Type-label substrings that mark a node as an expandable container
const CONTAINER_MARKERS: &[&str] = &[
    "7-zip archive",
    "zip archive",
    "rar archive",
    "tar archive",
    "compressed data",
];

pub fn is_container(file_type: &str) -> bool {
    CONTAINER_MARKERS
        .iter()
        .any(|marker| file_type.contains(marker))
}

pub fn is_debian_package(file_type: &str) -> bool {
    file_type.contains("debian binary package")
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("entry escapes extraction root: {0}")]
    PathTraversal(String),

    #[error("unsupported container format: {0}")]
    Unsupported(String),

    #[error("malformed archive: {0}")]
    Malformed(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Guard(#[from] PathGuardError),
}

/// Expand one container file into `dest`.
///
/// Dispatches on the content-derived type label, never the filename. Every
/// entry path is re-rooted through [`safe_join`]; symlinks and hardlinks
/// are dropped. An entry over the decompressed size cap is skipped, not
/// truncated, and the skip is reported in the returned warnings so the
/// aggregate result records the degradation. Formats that are detected but
/// not expandable here return [`ExtractError::Unsupported`].
pub fn extract_container(
    file: &Path,
    file_type: &str,
    dest: &Path,
) -> Result<Vec<String>, ExtractError> {
    fs::create_dir_all(dest)?;

    if file_type.contains("zip archive") {
        extract_zip(file, dest)
    } else if file_type.contains("tar archive") {
        let reader = File::open(file)?;
        extract_tar_entries(reader, dest)
    } else if file_type.contains("gzip compressed") {
        extract_gzip(file, dest)
    } else if file_type.contains("7-zip archive") {
        extract_sevenz(file, dest)
    } else {
        Err(ExtractError::Unsupported(file_type.to_string()))
    }
}

/// Write one entry to `out_path`, dropping it with a warning if the
/// decompressed stream runs past the cap. Declared entry sizes can lie, so
/// callers that pre-check a header size still go through this backstop.
fn copy_capped<R: Read>(
    reader: R,
    out_path: &Path,
    name: &str,
    warnings: &mut Vec<String>,
) -> Result<(), ExtractError> {
    let mut output = File::create(out_path)?;
    let written = io::copy(&mut reader.take(MAX_ENTRY_BYTES + 1), &mut output)?;

    if written > MAX_ENTRY_BYTES {
        drop(output);
        fs::remove_file(out_path)?;
        warnings.push(format!("entry {name} exceeds extraction size cap, skipped"));
    }
    Ok(())
}

fn extract_zip(file: &Path, dest: &Path) -> Result<Vec<String>, ExtractError> {
    let reader = File::open(file)?;
    let mut archive =
        zip::ZipArchive::new(reader).map_err(|e| ExtractError::Malformed(e.to_string()))?;
    let mut warnings = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ExtractError::Malformed(e.to_string()))?;

        let raw_name = entry.name().to_string();
        let Some(relative) = entry.enclosed_name() else {
            return Err(ExtractError::PathTraversal(raw_name));
        };
        let out_path = safe_join(dest, &relative)?;

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if entry.size() > MAX_ENTRY_BYTES {
            warnings.push(format!(
                "entry {raw_name} exceeds extraction size cap, skipped"
            ));
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        copy_capped(entry.by_ref(), &out_path, &raw_name, &mut warnings)?;
    }

    Ok(warnings)
}

fn extract_tar_entries<R: Read>(reader: R, dest: &Path) -> Result<Vec<String>, ExtractError> {
    let mut archive = tar::Archive::new(reader);
    let mut warnings = Vec::new();

    for entry in archive
        .entries()
        .map_err(|e| ExtractError::Malformed(e.to_string()))?
    {
        let mut entry = entry.map_err(|e| ExtractError::Malformed(e.to_string()))?;
        let entry_type = entry.header().entry_type();

        // Links could point outside the sandbox after later traversal
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            debug!("skipping link entry in tar archive");
            continue;
        }

        let relative = entry
            .path()
            .map_err(|e| ExtractError::Malformed(e.to_string()))?
            .into_owned();
        let out_path = safe_join(dest, &relative)?;

        if entry_type.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if !entry_type.is_file() {
            continue;
        }

        let name = relative.display().to_string();
        if entry.size() > MAX_ENTRY_BYTES {
            warnings.push(format!("entry {name} exceeds extraction size cap, skipped"));
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        copy_capped(entry.by_ref(), &out_path, &name, &mut warnings)?;
    }

    Ok(warnings)
}

fn extract_gzip(file: &Path, dest: &Path) -> Result<Vec<String>, ExtractError> {
    let reader = File::open(file)?;
    let decoder = flate2::read::GzDecoder::new(reader);
    let mut warnings = Vec::new();

    // A bare gzip stream holds one member with no reliable name or size
    let out_path = dest.join("gunzipped");
    copy_capped(decoder, &out_path, "gunzipped", &mut warnings)?;

    Ok(warnings)
}

fn extract_sevenz(file: &Path, dest: &Path) -> Result<Vec<String>, ExtractError> {
    let reader = File::open(file)?;
    let len = reader.metadata()?.len();
    let mut archive = sevenz_rust::SevenZReader::new(reader, len, sevenz_rust::Password::empty())
        .map_err(|e| ExtractError::Malformed(e.to_string()))?;

    let dest = dest.to_path_buf();
    let mut warnings = Vec::new();
    archive
        .for_each_entries(|entry, reader| {
            let name = entry.name();
            if name.is_empty() {
                return Ok(true);
            }

            let out_path = safe_join(&dest, Path::new(name))
                .map_err(|e| sevenz_rust::Error::other(e.to_string()))?;

            if entry.is_directory() {
                fs::create_dir_all(&out_path)
                    .map_err(|e| sevenz_rust::Error::other(e.to_string()))?;
                return Ok(true);
            }

            if entry.size() > MAX_ENTRY_BYTES {
                warnings.push(format!("entry {name} exceeds extraction size cap, skipped"));
                return Ok(true);
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| sevenz_rust::Error::other(e.to_string()))?;
            }
            copy_capped(reader, &out_path, name, &mut warnings)
                .map_err(|e| sevenz_rust::Error::other(e.to_string()))?;

            Ok(true)
        })
        .map_err(|e| ExtractError::Malformed(e.to_string()))?;

    Ok(warnings)
}

/// Expand the `data.tar*` member of a Debian package into `dest`.
///
/// Control members are skipped; only the payload tree is of analytic
/// interest. The produced files join the worklist like any other
/// extraction output.
pub fn extract_debian_package(file: &Path, dest: &Path) -> Result<Vec<String>, ExtractError> {
    fs::create_dir_all(dest)?;

    let reader = File::open(file)?;
    let mut archive = ar::Archive::new(reader);
    let mut found_data = false;
    let mut warnings = Vec::new();

    while let Some(entry) = archive.next_entry() {
        let mut entry = entry.map_err(|e| ExtractError::Malformed(e.to_string()))?;
        let name = String::from_utf8_lossy(entry.header().identifier()).to_string();

        if !name.starts_with("data.tar") {
            continue;
        }
        found_data = true;

        if name.ends_with(".gz") {
            let decoder = flate2::read::GzDecoder::new(&mut entry);
            warnings.extend(extract_tar_entries(decoder, dest)?);
        } else if name == "data.tar" {
            warnings.extend(extract_tar_entries(&mut entry, dest)?);
        } else {
            return Err(ExtractError::Unsupported(format!(
                "debian data member compression: {name}"
            )));
        }
    }

    if !found_data {
        return Err(ExtractError::Malformed(
            "debian package has no data.tar member".to_string(),
        ));
    }

    Ok(warnings)
}

/// Remove execute bits from a freshly extracted file.
///
/// Nothing under the sandbox should ever be runnable in place.
#[cfg(unix)]
pub fn strip_exec_bits(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path)?;
    let mut permissions = metadata.permissions();
    let mode = permissions.mode();
    if mode & 0o111 != 0 {
        permissions.set_mode(mode & !0o111);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn strip_exec_bits(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// List every regular file under an extraction directory, in stable order
pub fn collect_extracted_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
