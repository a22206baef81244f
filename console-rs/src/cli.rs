//! Command-line argument parsing.
//!
//! Usage:
//!   ooconsole [-f[<file>]] [-s<settings>] [-c<cmd>]... [-qdnl]

use std::path::PathBuf;

pub const USAGE: &str = "Usage: ooconsole [-f[<file>]] [-s<settings>] [-c<cmd>]... [-qdnl]";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Config-file specification.
    pub config: ConfigFile,
    /// Settings file override (`-s<file>`).
    pub settings: Option<PathBuf>,
    /// Lines dispatched before the interactive loop (`-c<cmd>`, repeatable).
    pub commands: Vec<String>,
    /// No banner (`-q`).
    pub quiet: bool,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// No colours (`-n`).
    pub no_color: bool,
    /// Evaluate input as Lua (`-l`).
    pub lua: bool,
}

/// How to choose the config file.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum ConfigFile {
    /// Use the platform default location if a file exists there.
    #[default]
    Search,
    /// `-f` with no file argument: use built-in defaults.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        if !arg.starts_with('-') || arg == "-" {
            return Err(format!("unexpected argument: {arg}"));
        }

        // Flag argument: iterate over characters after the leading `-`.
        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,
                'q' => args.quiet = true,
                'n' => args.no_color = true,
                'l' => args.lua = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                        i += 1;
                        args.config = ConfigFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                // -s<file>
                's' => {
                    let file = take_value(&chars, &mut j, argv, &mut i)
                        .ok_or("-s requires a file argument")?;
                    args.settings = Some(PathBuf::from(file));
                }

                // -c<cmd>
                'c' => {
                    let cmd = take_value(&chars, &mut j, argv, &mut i)
                        .ok_or("-c requires a command argument")?;
                    args.commands.push(cmd);
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    Ok(args)
}

/// Value of an option: the rest of this argument, or the next argument.
fn take_value(chars: &[char], j: &mut usize, argv: &[String], i: &mut usize) -> Option<String> {
    if *j + 1 < chars.len() {
        let s: String = chars[*j + 1..].iter().collect();
        *j = chars.len();
        Some(s)
    } else if *i + 1 < argv.len() {
        *i += 1;
        Some(argv[*i].clone())
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn empty_args() {
        let a = parse_argv(&argv(&[])).unwrap();
        assert_eq!(a.config, ConfigFile::Search);
        assert!(a.commands.is_empty());
        assert!(!a.quiet && !a.debug && !a.no_color && !a.lua);
    }

    #[test]
    fn bool_flags() {
        let a = parse_argv(&argv(&["-q", "-d", "-n", "-l"])).unwrap();
        assert!(a.quiet && a.debug && a.no_color && a.lua);
    }

    #[test]
    fn combined_bool_flags() {
        let a = parse_argv(&argv(&["-qdn"])).unwrap();
        assert!(a.quiet && a.debug && a.no_color);
    }

    #[test]
    fn config_skip() {
        let a = parse_argv(&argv(&["-f"])).unwrap();
        assert_eq!(a.config, ConfigFile::Skip);
    }

    #[test]
    fn config_explicit_embedded() {
        let a = parse_argv(&argv(&["-fconsole.toml"])).unwrap();
        assert_eq!(a.config, ConfigFile::Explicit(PathBuf::from("console.toml")));
    }

    #[test]
    fn config_explicit_separate() {
        let a = parse_argv(&argv(&["-f", "console.toml"])).unwrap();
        assert_eq!(a.config, ConfigFile::Explicit(PathBuf::from("console.toml")));
    }

    #[test]
    fn settings_embedded_and_separate() {
        let a = parse_argv(&argv(&["-s/tmp/a.json"])).unwrap();
        assert_eq!(a.settings, Some(PathBuf::from("/tmp/a.json")));
        let a = parse_argv(&argv(&["-s", "b.json"])).unwrap();
        assert_eq!(a.settings, Some(PathBuf::from("b.json")));
    }

    #[test]
    fn commands_repeat_in_order() {
        let a = parse_argv(&argv(&["-c:showM setM", "-c", "1 + 1"])).unwrap();
        assert_eq!(a.commands, vec![":showM setM", "1 + 1"]);
    }

    #[test]
    fn flag_before_value_option() {
        let a = parse_argv(&argv(&["-qc1"])).unwrap();
        assert!(a.quiet);
        assert_eq!(a.commands, vec!["1"]);
    }

    #[test]
    fn missing_values_are_errors() {
        assert!(parse_argv(&argv(&["-c"])).is_err());
        assert!(parse_argv(&argv(&["-s"])).is_err());
    }

    #[test]
    fn positional_rejected() {
        assert!(parse_argv(&argv(&["extra"])).is_err());
    }

    #[test]
    fn unknown_flag() {
        assert!(parse_argv(&argv(&["-z"])).is_err());
    }
}
