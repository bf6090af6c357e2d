// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Content-based file type detection.
///
/// Labels are derived from magic bytes, never from the filename, so an
/// archive renamed to `.txt` is still expanded. The wording follows
/// `file(1)` conventions because the rest of the pipeline branches on
/// substrings of the label ("zip archive", "pe32", "debian binary
/// package", ...).

/// Detect a lowercase descriptive type label for raw content
pub fn detect_file_type(data: &[u8]) -> String {
    if data.is_empty() {
        return "empty".to_string();
    }

    if let Some(kind) = infer::get(data) {
        return label_for(kind, data);
    }

    if data.iter().all(|&b| b.is_ascii() && !is_binary_byte(b)) {
        return "ascii text".to_string();
    }
    if std::str::from_utf8(data).is_ok() {
        return "utf-8 unicode text".to_string();
    }

    "data".to_string()
}

fn is_binary_byte(b: u8) -> bool {
    b < 0x09 || (b > 0x0d && b < 0x20) || b == 0x7f
}

fn label_for(kind: infer::Type, data: &[u8]) -> String {
    match kind.extension() {
        "zip" => "zip archive data".to_string(),
        "7z" => "7-zip archive data".to_string(),
        "rar" => "rar archive data".to_string(),
        "tar" => "posix tar archive".to_string(),
        "gz" => "gzip compressed data".to_string(),
        "bz2" => "bzip2 compressed data".to_string(),
        "xz" => "xz compressed data".to_string(),
        "zst" => "zstandard compressed data".to_string(),
        "deb" => "debian binary package".to_string(),
        "rpm" => "rpm package".to_string(),
        "exe" | "dll" => pe_label(data),
        "elf" => "elf executable".to_string(),
        "mach" => "mach-o executable".to_string(),
        "pdf" => "pdf document".to_string(),
        _ => kind.mime_type().to_lowercase(),
    }
}

/// Distinguish PE32 from PE32+ by the optional-header magic.
///
/// Falls back to a plain MS-DOS label when the headers are truncated or
/// inconsistent; the structural stage reports the parse failure in detail.
fn pe_label(data: &[u8]) -> String {
    let pe_offset = match data.get(0x3c..0x40) {
        Some(bytes) => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize,
        None => return "ms-dos executable".to_string(),
    };

    let has_pe_signature = data
        .get(pe_offset..pe_offset + 4)
        .map(|sig| sig == b"PE\0\0")
        .unwrap_or(false);
    if !has_pe_signature {
        return "ms-dos executable".to_string();
    }

    // Optional header starts after the 4-byte signature + 20-byte COFF header
    let magic = data
        .get(pe_offset + 24..pe_offset + 26)
        .map(|bytes| u16::from_le_bytes([bytes[0], bytes[1]]));

    match magic {
        Some(0x010b) => "pe32 executable (ms windows)".to_string(),
        Some(0x020b) => "pe32+ executable (ms windows)".to_string(),
        _ => "ms windows pe executable".to_string(),
    }
}
