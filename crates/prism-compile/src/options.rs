use std::path::PathBuf;

use crate::profile::Profile;

/// Options handed to the compiler by the content pipeline or command line.
///
/// This crate consumes these values; it does not own their parsing.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Path of the effect source file (diagnostics only).
    pub source_path: PathBuf,
    /// Path the serialized effect is written to.
    pub output_path: PathBuf,
    /// Target profile.
    pub profile: Profile,
    /// Keep debug info and skip bytecode stripping.
    pub debug: bool,
    /// Semicolon-delimited preprocessor defines (`"A=1;B"`).
    pub defines: String,
}

impl CompileOptions {
    /// Splits the semicolon-delimited defines string into macro pairs.
    ///
    /// A define without `=` gets the value `"1"`; empty segments are skipped.
    pub fn parse_defines(&self) -> Vec<(String, String)> {
        parse_defines(&self.defines)
    }
}

/// See [`CompileOptions::parse_defines`].
pub fn parse_defines(defines: &str) -> Vec<(String, String)> {
    defines
        .split(';')
        .filter_map(|segment| {
            let segment = segment.trim();
            if segment.is_empty() {
                return None;
            }
            Some(match segment.split_once('=') {
                Some((name, value)) => (name.trim().to_owned(), value.trim().to_owned()),
                None => (segment.to_owned(), "1".to_owned()),
            })
        })
        .collect()
}
