pub mod translator;

pub use translator::{
    BlockKind, Diagnostic, DiagnosticKind, HEADER, Nesting, ScannedLine, SourcePathError,
    TranslateError, TranslateOptions, Translation, find_comment_start, normalize_comment,
    read_source, render_diagnostic, split_comment, split_top_level, translate, translate_file,
    translate_with_options,
};
