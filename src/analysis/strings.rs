// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::analysis::decode_latin1;

/// Fixed keyword table for the suspicious-string heuristic.
///
/// Dynamic-code-execution keywords weigh more than generic download-tool
/// keywords. Weights are preserved constants; they have no documented
/// derivation beyond operational tuning.
pub const KEYWORD_WEIGHTS: &[(&str, u32)] = &[
    ("eval", 2),
    ("base64", 2),
    ("powershell", 3),
    ("cmd.exe", 3),
    ("exec", 2),
    ("wget", 1),
    ("curl", 1),
    // Shows up as a plain string in droppers that resolve it dynamically
    ("createremotethread", 2),
];

/// Accumulate a weighted score from keyword hits in the raw bytes.
///
/// Bytes are decoded permissively and lower-cased; each keyword counts at
/// most once regardless of how often it appears.
pub fn keyword_score(data: &[u8]) -> u32 {
    let text = decode_latin1(data).to_lowercase();
    KEYWORD_WEIGHTS
        .iter()
        .filter(|(keyword, _)| text.contains(keyword))
        .map(|(_, weight)| weight)
        .sum()
}
