// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::analysis::entropy::calculate_entropy;
use crate::domain::models::report::PeSummary;
use goblin::pe::PE;

/// Section entropy above this marks a likely packed or encrypted section
const SECTION_ENTROPY_THRESHOLD: f64 = 7.0;

/// Imported API names commonly used for injection and in-memory execution
pub const SUSPICIOUS_IMPORTS: &[&str] = &[
    "CreateRemoteThread",
    "VirtualAlloc",
    "VirtualProtect",
    "WriteProcessMemory",
    "WinExec",
    "ShellExecuteA",
    "ShellExecuteW",
];

/// Structural inspection of a Windows PE image.
///
/// Reports section names whose raw bytes exceed the packing entropy
/// threshold, and any imported API from the injection watchlist. Parse
/// failures bubble up to the caller, which records them as a stage
/// warning rather than failing the whole analysis.
pub fn inspect_pe(data: &[u8]) -> Result<PeSummary, goblin::error::Error> {
    let pe = PE::parse(data)?;
    let mut summary = PeSummary::default();

    for section in &pe.sections {
        let start = section.pointer_to_raw_data as usize;
        let size = section.size_of_raw_data as usize;
        let end = start.saturating_add(size).min(data.len());
        if start >= end {
            continue;
        }

        if calculate_entropy(&data[start..end]) > SECTION_ENTROPY_THRESHOLD {
            let name = String::from_utf8_lossy(&section.name)
                .trim_end_matches('\0')
                .to_string();
            summary.high_entropy_sections.push(name);
        }
    }

    for import in &pe.imports {
        let name = import.name.as_ref();
        if SUSPICIOUS_IMPORTS.contains(&name) && !summary.suspicious_imports.iter().any(|n| n == name)
        {
            summary.suspicious_imports.push(name.to_string());
        }
    }

    Ok(summary)
}
