// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod archive;
pub mod entropy;
pub mod fetcher;
pub mod hashing;
pub mod iocs;
pub mod pe;
pub mod pipeline;
pub mod signatures;
pub mod sniff;
pub mod strings;

/// Decode raw bytes permissively, one byte per char (latin-1 semantics).
///
/// Undecodable content cannot occur: every byte maps to a char. This is
/// the decoding the string-scanning stages share.
pub(crate) fn decode_latin1(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}
