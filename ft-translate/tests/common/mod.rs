#![allow(dead_code, unused_imports)]

use std::path::PathBuf;

pub use translate::{
    BlockKind, Diagnostic, DiagnosticKind, HEADER, SourcePathError, TranslateError,
    TranslateOptions, Translation, read_source, translate, translate_file, translate_with_options,
};

pub fn sample_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("samples")
        .join(name)
}

pub fn sample(name: &str) -> String {
    std::fs::read_to_string(sample_path(name)).expect("sample should be readable")
}

/// Translation output with the include header stripped.
pub fn body(source: &str) -> String {
    let translation = translate_with_options(
        source,
        &TranslateOptions {
            emit_header: false,
            ..TranslateOptions::default()
        },
    )
    .expect("translation should succeed");
    translation.output
}

pub fn body_lines(source: &str) -> Vec<String> {
    body(source).lines().map(str::to_string).collect()
}

pub fn translate_err(source: &str) -> TranslateError {
    translate(source).expect_err("translation should fail")
}
