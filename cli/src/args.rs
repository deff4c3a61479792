//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "lintd")]
#[command(about = "Lint JavaScript through a supervised lint worker")]
#[command(arg_required_else_help = true)]
#[command(after_help = "Configuration is read from ~/.lintd/config.toml, or from $LINTD_CONFIG.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Print diagnostics for each file
    Lint {
        /// Also run the fix-on-save hook after linting
        #[arg(long)]
        save: bool,
        /// Files to lint
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Apply the worker's fixes to each file
    Fix {
        /// Files to fix
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Commands {
    pub fn files(&self) -> &[PathBuf] {
        match self {
            Commands::Lint { files, .. } | Commands::Fix { files } => files,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    use super::*;

    fn parse(args: &[&str]) -> Result<Commands, ErrorKind> {
        Cli::try_parse_from(std::iter::once("lintd").chain(args.iter().copied()))
            .map(|cli| cli.command)
            .map_err(|e| e.kind())
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_lint_and_fix() {
        assert_eq!(
            parse(&["lint", "a.js", "b.jsx"]),
            Ok(Commands::Lint {
                save: false,
                files: vec![PathBuf::from("a.js"), PathBuf::from("b.jsx")],
            })
        );
        assert_eq!(
            parse(&["lint", "--save", "a.js"]),
            Ok(Commands::Lint {
                save: true,
                files: vec![PathBuf::from("a.js")],
            })
        );
        assert_eq!(
            parse(&["fix", "src/app.js"]),
            Ok(Commands::Fix {
                files: vec![PathBuf::from("src/app.js")],
            })
        );
    }

    #[test]
    fn help_is_handled_by_clap() {
        assert_eq!(parse(&["--help"]), Err(ErrorKind::DisplayHelp));
        assert_eq!(parse(&["fix", "--help"]), Err(ErrorKind::DisplayHelp));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            parse(&[]),
            Err(ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand)
        );
        assert_eq!(parse(&["format", "a.js"]), Err(ErrorKind::InvalidSubcommand));
        assert_eq!(parse(&["fix"]), Err(ErrorKind::MissingRequiredArgument));
        assert_eq!(parse(&["fix", "--save", "a.js"]), Err(ErrorKind::UnknownArgument));
    }

    #[test]
    fn files_accessor_covers_both_commands() {
        let lint = parse(&["lint", "a.js"]).unwrap();
        assert_eq!(lint.files(), [PathBuf::from("a.js")]);
        let fix = parse(&["fix", "b.js", "c.js"]).unwrap();
        assert_eq!(fix.files().len(), 2);
    }
}
