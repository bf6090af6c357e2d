// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Calculate Shannon entropy of a byte slice
///
/// Returns a value between 0.0 (no entropy) and 8.0 (maximum entropy).
/// Typical values:
/// - < 4.0: sparse data, English text
/// - 4.0-6.0: typical code/data
/// - 6.0-7.2: compressed or obfuscated
/// - > 7.2: encrypted or packed
pub fn calculate_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut freq = [0usize; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }

    let len = data.len() as f64;
    let mut entropy = 0.0;

    for &count in freq.iter().filter(|&&count| count > 0) {
        let p = count as f64 / len;
        entropy -= p * p.log2();
    }

    entropy
}

/// Whole-file entropy as reported on the result document: rounded to two
/// decimal places, 0.0 for empty input
pub fn file_entropy(data: &[u8]) -> f64 {
    (calculate_entropy(data) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(calculate_entropy(&[]), 0.0);
        assert_eq!(file_entropy(&[]), 0.0);
    }

    #[test]
    fn test_zero_entropy() {
        let data = vec![0u8; 100];
        assert_eq!(calculate_entropy(&data), 0.0);
    }

    #[test]
    fn test_max_entropy() {
        // Uniform distribution over all byte values hits the theoretical max
        let data: Vec<u8> = (0..=255).collect();
        let entropy = calculate_entropy(&data);
        assert!((entropy - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds() {
        for data in [
            b"Hello, World! This is a test string with some text.".to_vec(),
            vec![7u8; 1000],
            (0..2048).map(|i| (i * 31 % 251) as u8).collect(),
        ] {
            let entropy = calculate_entropy(&data);
            assert!((0.0..=8.0).contains(&entropy));
        }
    }

    #[test]
    fn test_permutation_invariance() {
        let data: Vec<u8> = (0..1024).map(|i| (i * 17 % 256) as u8).collect();
        let mut reversed = data.clone();
        reversed.reverse();

        assert_eq!(calculate_entropy(&data), calculate_entropy(&reversed));
    }

    #[test]
    fn test_rounding() {
        let data = b"aab";
        let rounded = file_entropy(data);
        // Raw value is ~0.9183; the reported value carries two decimals
        assert_eq!(rounded, 0.92);
    }
}
