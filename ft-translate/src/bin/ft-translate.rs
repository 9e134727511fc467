use std::{env, fs, io, path::Path};

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, info};
use translate::{
    SourcePathError, TranslateOptions, Translation, read_source, render_diagnostic,
    translate_with_options,
};

const BANNER: &str = "// Translated C++ code:";
const DEFAULT_INDENT: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CliConfig {
    source: Option<String>,
    output: Option<String>,
    /// `None` defers to `FT_TRANSLATE_BANNER`.
    banner: Option<bool>,
    /// `None` defers to `FT_TRANSLATE_INDENT`.
    indent: Option<usize>,
    diagnostics: bool,
    repl: bool,
    version: bool,
    help: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    options: TranslateOptions,
    banner: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let cli = match parse_cli_args(&args) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("error: {err}\n");
            print_usage();
            return Err(io::Error::other(err).into());
        }
    };
    if cli.help {
        print_usage();
        return Ok(());
    }
    if cli.version {
        println!("{}", binary_version_text());
        return Ok(());
    }

    init_logging();
    debug!("{}", binary_version_text());
    let settings = resolve_settings(&cli)?;

    if cli.repl {
        return run_repl(&settings);
    }
    let Some(path) = cli.source.as_deref() else {
        print_usage();
        return Err(io::Error::other("missing source path").into());
    };

    let (source, translation) = match translate_path(Path::new(path), &settings.options) {
        Ok(done) => done,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };
    if cli.diagnostics {
        for diagnostic in &translation.diagnostics {
            eprintln!("{}", render_diagnostic(path, &source, diagnostic));
        }
    }

    let text = render_output(&translation, settings.banner);
    match cli.output.as_deref() {
        Some(output_path) => {
            fs::write(output_path, text)?;
            info!("wrote {output_path}");
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn init_logging() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_cli_args(args: &[String]) -> Result<CliConfig, String> {
    let mut cfg = CliConfig::default();
    let mut index = 0usize;

    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => {
                cfg.help = true;
                index += 1;
            }
            "-V" | "--version" => {
                cfg.version = true;
                index += 1;
            }
            "-o" | "--output" => {
                let path = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --output".to_string())?;
                cfg.output = Some(path.clone());
                index += 2;
            }
            "--banner" => {
                cfg.banner = Some(true);
                index += 1;
            }
            "--no-banner" => {
                cfg.banner = Some(false);
                index += 1;
            }
            "--indent" => {
                let raw = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --indent".to_string())?;
                let value = raw
                    .parse::<usize>()
                    .map_err(|_| format!("invalid --indent value '{raw}'"))?;
                cfg.indent = Some(value);
                index += 2;
            }
            "--diagnostics" => {
                cfg.diagnostics = true;
                index += 1;
            }
            "--repl" => {
                cfg.repl = true;
                index += 1;
            }
            value if value.starts_with('-') && value != "-" => {
                return Err(format!("unknown flag '{value}'"));
            }
            path => {
                if cfg.source.is_some() {
                    return Err("multiple source paths provided".to_string());
                }
                cfg.source = Some(path.to_string());
                index += 1;
            }
        }
    }

    if cfg.help || cfg.version {
        return Ok(cfg);
    }
    if cfg.repl {
        if cfg.source.is_some() {
            return Err("repl mode does not accept a source path".to_string());
        }
        if cfg.output.is_some() {
            return Err("repl mode cannot be combined with --output".to_string());
        }
    } else if cfg.source.is_none() {
        return Err("missing source path".to_string());
    }
    Ok(cfg)
}

fn resolve_settings(cli: &CliConfig) -> Result<Settings, Box<dyn std::error::Error>> {
    let indent_width = match cli.indent {
        Some(value) => value,
        None => parse_usize("FT_TRANSLATE_INDENT", DEFAULT_INDENT)?,
    };
    let banner = match cli.banner {
        Some(value) => value,
        None => parse_flag("FT_TRANSLATE_BANNER", true),
    };
    Ok(Settings {
        options: TranslateOptions {
            indent_width,
            ..TranslateOptions::default()
        },
        banner,
    })
}

fn parse_usize(key: &str, default: usize) -> Result<usize, Box<dyn std::error::Error>> {
    match env::var(key) {
        Ok(value) => Ok(value.trim().parse()?),
        Err(_) => Ok(default),
    }
}

fn parse_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|value| flag_value(&value))
        .unwrap_or(default)
}

fn flag_value(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn translate_path(
    path: &Path,
    options: &TranslateOptions,
) -> Result<(String, Translation), SourcePathError> {
    let source = read_source(path)?;
    let translation = translate_with_options(&source, options)?;
    Ok((source, translation))
}

fn render_output(translation: &Translation, banner: bool) -> String {
    if banner {
        format!("{BANNER}\n{}", translation.output)
    } else {
        translation.output.clone()
    }
}

fn print_usage() {
    eprintln!(concat!(
        "Usage: ft-translate [options] <source.f90>\n",
        "       ft-translate --repl\n\n",
        "Options:\n",
        "  -o, --output <PATH>     Write C++ to PATH instead of stdout\n",
        "  --banner, --no-banner   Toggle the leading banner comment (env: FT_TRANSLATE_BANNER)\n",
        "  --indent <N>            Spaces per nesting level (default: 2, env: FT_TRANSLATE_INDENT)\n",
        "  --diagnostics           Show passed-through lines on stderr\n",
        "  --repl                  Translate interactively\n",
        "  -V, --version           Show version with git metadata\n",
        "  -h, --help              Show this help\n"
    ));
}

fn binary_version_text() -> String {
    let binary = env!("CARGO_PKG_NAME");
    let git_tag = option_env!("FT_BUILD_GIT_TAG").unwrap_or("untagged");
    let git_commit = option_env!("FT_BUILD_GIT_COMMIT").unwrap_or("unknown");
    let dirty = option_env!("FT_BUILD_GIT_DIRTY").is_some_and(|value| flag_value(value) == Some(true));

    if dirty {
        format!("{binary} {git_tag} (dirty commit: {git_commit})")
    } else {
        format!("{binary} {git_tag} ({git_commit})")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplAction {
    Continue,
    Translate,
    Clear,
    Break,
}

fn handle_repl_command(line: &str) -> Option<ReplAction> {
    match line {
        ".quit" | ".exit" => Some(ReplAction::Break),
        ".go" => Some(ReplAction::Translate),
        ".clear" => Some(ReplAction::Clear),
        ".help" => {
            println!("commands:");
            println!("  .go        translate the lines entered so far");
            println!("  .clear     discard the lines entered so far");
            println!("  .help      show commands");
            println!("  .quit      quit repl");
            Some(ReplAction::Continue)
        }
        _ if line.starts_with('.') => {
            println!("unknown command: {line}");
            Some(ReplAction::Continue)
        }
        _ => None,
    }
}

fn run_repl(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    println!("ft-translate REPL");
    println!("enter Fortran lines, then .go to translate; .help for commands");
    let mut editor = DefaultEditor::new()?;
    let mut buffer = String::new();
    loop {
        match editor.readline("f90> ") {
            Ok(line) => {
                match handle_repl_command(line.trim()) {
                    Some(ReplAction::Break) => break,
                    Some(ReplAction::Continue) => {}
                    Some(ReplAction::Clear) => buffer.clear(),
                    Some(ReplAction::Translate) => {
                        match translate_with_options(&buffer, &settings.options) {
                            Ok(translation) => {
                                print!("{}", render_output(&translation, settings.banner));
                                for diagnostic in &translation.diagnostics {
                                    println!("warning: {diagnostic}");
                                }
                            }
                            Err(err) => println!("error: {err}"),
                        }
                        buffer.clear();
                    }
                    None => {
                        let _ = editor.add_history_entry(line.as_str());
                        buffer.push_str(&line);
                        buffer.push('\n');
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("bye");
                break;
            }
            Err(err) => {
                return Err(Box::new(io::Error::other(err.to_string())));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ReplAction, flag_value, handle_repl_command, parse_cli_args, render_output};
    use translate::Translation;

    fn s(value: &str) -> String {
        value.to_string()
    }

    #[test]
    fn parse_cli_requires_a_source() {
        let err = parse_cli_args(&[]).expect_err("parse should fail");
        assert!(err.contains("missing source path"));
    }

    #[test]
    fn parse_cli_source_with_output_and_indent() {
        let cfg = parse_cli_args(&[
            s("-o"),
            s("out/main.cpp"),
            s("--indent"),
            s("4"),
            s("--no-banner"),
            s("samples/factorial.f90"),
        ])
        .expect("parse should succeed");
        assert_eq!(cfg.source.as_deref(), Some("samples/factorial.f90"));
        assert_eq!(cfg.output.as_deref(), Some("out/main.cpp"));
        assert_eq!(cfg.indent, Some(4));
        assert_eq!(cfg.banner, Some(false));
        assert!(!cfg.diagnostics);
    }

    #[test]
    fn parse_cli_defers_unset_options_to_env() {
        let cfg = parse_cli_args(&[s("a.f90")]).expect("parse should succeed");
        assert_eq!(cfg.banner, None);
        assert_eq!(cfg.indent, None);
    }

    #[test]
    fn parse_cli_rejects_multiple_sources() {
        let err = parse_cli_args(&[s("a.f90"), s("b.f90")]).expect_err("parse should fail");
        assert!(err.contains("multiple source paths"));
    }

    #[test]
    fn parse_cli_rejects_bad_indent() {
        let err =
            parse_cli_args(&[s("--indent"), s("wide"), s("a.f90")]).expect_err("parse should fail");
        assert!(err.contains("invalid --indent value 'wide'"));
        let err = parse_cli_args(&[s("a.f90"), s("--output")]).expect_err("parse should fail");
        assert!(err.contains("missing value for --output"));
    }

    #[test]
    fn parse_cli_rejects_unknown_flags() {
        let err = parse_cli_args(&[s("--fast"), s("a.f90")]).expect_err("parse should fail");
        assert!(err.contains("unknown flag '--fast'"));
    }

    #[test]
    fn parse_cli_repl_mode() {
        let cfg = parse_cli_args(&[s("--repl")]).expect("parse should succeed");
        assert!(cfg.repl);
        let err = parse_cli_args(&[s("--repl"), s("a.f90")]).expect_err("parse should fail");
        assert!(err.contains("repl mode does not accept a source path"));
    }

    #[test]
    fn parse_cli_help_and_version_need_no_source() {
        assert!(parse_cli_args(&[s("-h")]).expect("parse should succeed").help);
        assert!(parse_cli_args(&[s("--version")]).expect("parse should succeed").version);
    }

    #[test]
    fn flag_values() {
        assert_eq!(flag_value("0"), Some(false));
        assert_eq!(flag_value(" FALSE "), Some(false));
        assert_eq!(flag_value("yes"), Some(true));
        assert_eq!(flag_value("maybe"), None);
    }

    #[test]
    fn banner_is_prepended_when_enabled() {
        let translation = Translation {
            output: "int main() {\n}\n".to_string(),
            diagnostics: Vec::new(),
        };
        assert_eq!(
            render_output(&translation, true),
            "// Translated C++ code:\nint main() {\n}\n"
        );
        assert_eq!(render_output(&translation, false), translation.output);
    }

    #[test]
    fn repl_commands() {
        assert_eq!(handle_repl_command(".go"), Some(ReplAction::Translate));
        assert_eq!(handle_repl_command(".clear"), Some(ReplAction::Clear));
        assert_eq!(handle_repl_command(".quit"), Some(ReplAction::Break));
        assert_eq!(handle_repl_command(".nope"), Some(ReplAction::Continue));
        assert_eq!(handle_repl_command("x = 1"), None);
    }
}
