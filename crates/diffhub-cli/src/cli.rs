use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "diffhub",
    about = "diffhub: branch comparison service with ignore-aware diffs and live notifications",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the diffhub server
    Serve(ServeArgs),
    /// Compare two branches of a repository
    Diff(DiffArgs),
    /// List the branches of a repository
    Branches(BranchesArgs),
    /// Report which paths the ignore files exclude
    CheckIgnore(CheckIgnoreArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file; missing file means defaults
    #[arg(long, default_value = "diffhub.toml")]
    pub config: PathBuf,
    /// Override `server.bind_addr`
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct DiffArgs {
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
    /// Old side of the comparison
    pub from: String,
    /// New side of the comparison
    pub into: String,
    /// Unchanged lines around each hunk
    #[arg(short = 'U', long, default_value = "3")]
    pub context: usize,
    #[arg(long, default_value = "git")]
    pub git: PathBuf,
    #[command(flatten)]
    pub ignore: IgnoreFileArgs,
}

#[derive(Args)]
pub struct BranchesArgs {
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
    #[arg(long, default_value = "git")]
    pub git: PathBuf,
}

/// Where the per-directory ignore file name comes from.
#[derive(Args)]
pub struct IgnoreFileArgs {
    /// TOML configuration file read for `diff.ignore_file_name`
    #[arg(long, default_value = "diffhub.toml")]
    pub config: PathBuf,
    /// Override the per-directory ignore file name
    #[arg(long)]
    pub ignore_file: Option<String>,
}

#[derive(Args)]
pub struct CheckIgnoreArgs {
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
    #[command(flatten)]
    pub ignore: IgnoreFileArgs,
    /// Show the deciding rule, and report non-ignored paths too
    #[arg(short = 'e', long)]
    pub explain: bool,
    /// Repository-relative paths; a trailing `/` marks a directory
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_diff() {
        let cli = Cli::try_parse_from([
            "diffhub", "diff", "--repo", "/r", "main", "feature/x", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Diff(args) => {
                assert_eq!(args.repo, PathBuf::from("/r"));
                assert_eq!(args.from, "main");
                assert_eq!(args.into, "feature/x");
                assert_eq!(args.context, 3);
            }
            _ => panic!("expected diff"),
        }
    }

    #[test]
    fn parse_serve_with_bind() {
        let cli = Cli::try_parse_from(["diffhub", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.bind.unwrap().port(), 9000);
                assert_eq!(args.config, PathBuf::from("diffhub.toml"));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn parse_check_ignore() {
        let cli =
            Cli::try_parse_from(["diffhub", "check-ignore", "-e", "a.log", "build/"]).unwrap();
        match cli.command {
            Command::CheckIgnore(args) => {
                assert!(args.explain);
                assert_eq!(args.paths, vec!["a.log", "build/"]);
            }
            _ => panic!("expected check-ignore"),
        }
    }

    #[test]
    fn parse_ignore_file_override() {
        let cli = Cli::try_parse_from([
            "diffhub", "check-ignore", "--ignore-file", ".diffignore", "a.log",
        ])
        .unwrap();
        match cli.command {
            Command::CheckIgnore(args) => {
                assert_eq!(args.ignore.ignore_file.as_deref(), Some(".diffignore"));
                assert_eq!(args.ignore.config, PathBuf::from("diffhub.toml"));
            }
            _ => panic!("expected check-ignore"),
        }
    }

    #[test]
    fn check_ignore_requires_paths() {
        assert!(Cli::try_parse_from(["diffhub", "check-ignore"]).is_err());
    }

    #[test]
    fn global_verbose() {
        let cli = Cli::try_parse_from(["diffhub", "branches", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
