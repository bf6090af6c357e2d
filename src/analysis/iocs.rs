// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::analysis::decode_latin1;
use crate::domain::models::report::IocSet;
use once_cell::sync::Lazy;
use regex::Regex;

static DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("domain regex"));
static IP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\d{1,3}\.){3}\d{1,3}").expect("ip regex"));
static PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[A-Za-z]:\\\S+)|(?:/\S+)").expect("path regex"));

/// Heuristic indicator extraction over raw bytes.
///
/// Bytes are decoded permissively, then scanned for domain-like tokens,
/// dotted-quad IP-like tokens and absolute filesystem-path-like tokens.
/// Each class is set-deduplicated and lightly filtered. This is an
/// extractor, not a validator: false positives are expected.
pub fn extract_iocs(data: &[u8]) -> IocSet {
    let text = decode_latin1(data);
    let mut iocs = IocSet::default();

    for m in DOMAIN_RE.find_iter(&text) {
        let token = m.as_str();
        // Require a dot and a minimum length to drop version-number noise
        if token.contains('.') && token.len() > 3 {
            iocs.domains.insert(token.to_string());
        }
    }

    for m in IP_RE.find_iter(&text) {
        let token = m.as_str();
        if token.split('.').count() == 4 {
            iocs.ips.insert(token.to_string());
        }
    }

    for m in PATH_RE.find_iter(&text) {
        iocs.file_paths.insert(m.as_str().to_string());
    }

    iocs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(extract_iocs(b"").is_empty());
    }

    #[test]
    fn test_domain_extraction() {
        let iocs = extract_iocs(b"beacon to evil.example.com every minute");
        assert!(iocs.domains.contains("evil.example.com"));
    }

    #[test]
    fn test_short_domain_tokens_filtered() {
        let iocs = extract_iocs(b"x.y ");
        assert!(iocs.domains.is_empty());
    }

    #[test]
    fn test_ip_extraction() {
        let iocs = extract_iocs(b"connect 192.168.10.5:4444");
        assert!(iocs.ips.contains("192.168.10.5"));
    }

    #[test]
    fn test_windows_path_extraction() {
        let iocs = extract_iocs(br"copy to C:\Windows\Temp\payload.dll and run");
        assert!(iocs.file_paths.contains(r"C:\Windows\Temp\payload.dll"));
    }

    #[test]
    fn test_unix_path_extraction() {
        let iocs = extract_iocs(b"drops /usr/local/bin/backdoor on install");
        assert!(iocs.file_paths.contains("/usr/local/bin/backdoor"));
    }

    #[test]
    fn test_deduplication() {
        let iocs = extract_iocs(b"evil.example.com evil.example.com 10.0.0.1 10.0.0.1");
        assert_eq!(iocs.domains.len(), 1);
        assert_eq!(iocs.ips.len(), 1);
    }

    #[test]
    fn test_undecodable_bytes_ignored() {
        let mut data = vec![0xff, 0xfe, 0x00];
        data.extend_from_slice(b" 8.8.8.8 ");
        data.push(0xfd);
        let iocs = extract_iocs(&data);
        assert!(iocs.ips.contains("8.8.8.8"));
    }
}
