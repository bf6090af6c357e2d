// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fs;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Compiled YARA rule set shared by all pipeline workers.
///
/// Rules are compiled once at startup from every `.yar`/`.yara` file under
/// the configured directory. A file that fails to compile is skipped with a
/// warning so one broken rule never takes signature scanning down with it.
pub struct SignatureSet {
    rules: Option<yara_x::Rules>,
    rule_file_count: usize,
}

impl SignatureSet {
    /// Sentinel reported when no rules were loaded at startup
    pub const NOT_LOADED: &'static str = "no yara rules loaded";
    /// Sentinel reported when rules are loaded but nothing matched
    pub const NO_MATCHES: &'static str = "no matches";

    /// Compile every rule file found under `dir`.
    ///
    /// A missing directory is not an error; the resulting set reports
    /// [`Self::NOT_LOADED`] on every scan.
    pub fn compile_dir(dir: &Path) -> Self {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "signature rules directory not found");
            return Self {
                rules: None,
                rule_file_count: 0,
            };
        }

        let mut compiler = yara_x::Compiler::new();
        let mut count = 0;

        for entry in WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_rule_file = path
                .extension()
                .map(|ext| ext == "yar" || ext == "yara")
                .unwrap_or(false);
            if !is_rule_file {
                continue;
            }

            match Self::compile_rule_file(&mut compiler, path) {
                Ok(()) => count += 1,
                Err(message) => {
                    warn!(file = %path.display(), error = %message, "skipping unparseable rule file");
                }
            }
        }

        if count == 0 {
            info!(dir = %dir.display(), "no signature rules loaded");
            return Self {
                rules: None,
                rule_file_count: 0,
            };
        }

        info!(dir = %dir.display(), rule_files = count, "compiled signature rules");
        Self {
            rules: Some(compiler.build()),
            rule_file_count: count,
        }
    }

    fn compile_rule_file(compiler: &mut yara_x::Compiler, path: &Path) -> Result<(), String> {
        // Validate in a throwaway compiler first: yara-x compilers keep the
        // bad source buffered after a failed add_source, which would poison
        // the shared build.
        let source = fs::read_to_string(path).map_err(|e| e.to_string())?;

        let mut probe = yara_x::Compiler::new();
        probe
            .add_source(source.as_bytes())
            .map_err(|e| e.to_string())?;

        let namespace = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "default".to_string());
        compiler.new_namespace(&namespace);
        compiler
            .add_source(source.as_bytes())
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.rules.is_some()
    }

    pub fn rule_file_count(&self) -> usize {
        self.rule_file_count
    }

    /// Scan raw bytes and return matched rule identifiers.
    ///
    /// The return value is never empty: with no rules loaded, no matches, or
    /// a scan failure, the list carries a single sentinel string instead.
    pub fn scan(&self, data: &[u8]) -> Vec<String> {
        let Some(rules) = &self.rules else {
            return vec![Self::NOT_LOADED.to_string()];
        };

        let mut scanner = yara_x::Scanner::new(rules);
        let results = match scanner.scan(data) {
            Ok(results) => results,
            Err(e) => return vec![format!("yara scan error: {e}")],
        };

        let matches: Vec<String> = results
            .matching_rules()
            .map(|rule| rule.identifier().to_string())
            .collect();

        if matches.is_empty() {
            vec![Self::NO_MATCHES.to_string()]
        } else {
            matches
        }
    }
}
