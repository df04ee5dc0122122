use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;

use diffhub_diff::{DiffConfig, DiffGenerator, GitCliRepository};
use diffhub_ignore::{explain, load_rules_from, FsIgnoreSource, IgnoreRule, Verdict};
use diffhub_server::{DiffhubServer, ServiceConfig};
use diffhub_types::{ChangeType, DiffResult, LineType, RequestId};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Diff(args) => cmd_diff(args, cli.format).await,
        Command::Branches(args) => cmd_branches(args, cli.format).await,
        Command::CheckIgnore(args) => cmd_check_ignore(args),
    }
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<ExitCode> {
    let mut config = ServiceConfig::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    println!(
        "{} diffhub server on {} ({} workers)",
        "▶".green().bold(),
        config.server.bind_addr.to_string().bold(),
        config.processor.workers
    );
    DiffhubServer::new(config).serve().await?;
    Ok(ExitCode::SUCCESS)
}

fn generator(git: &Path, config: DiffConfig) -> DiffGenerator {
    DiffGenerator::new(Arc::new(GitCliRepository::with_binary(git)), config)
}

/// `--ignore-file`, else `diff.ignore_file_name` from the config file.
fn ignore_file_name(args: &IgnoreFileArgs) -> anyhow::Result<String> {
    if let Some(name) = &args.ignore_file {
        return Ok(name.clone());
    }
    let config = ServiceConfig::load(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    Ok(config.diff.config.ignore_file_name)
}

async fn cmd_diff(args: DiffArgs, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let config = DiffConfig {
        context_lines: args.context,
        ignore_file_name: ignore_file_name(&args.ignore)?,
        ..DiffConfig::default()
    };
    let result = generator(&args.git, config)
        .generate_diff(RequestId::new(), &args.repo, &args.from, &args.into)
        .await
        .with_context(|| format!("comparing {} with {}", args.from, args.into))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_diff(&result, &args.from, &args.into),
    }
    Ok(ExitCode::SUCCESS)
}

fn print_diff(result: &DiffResult, from: &str, into: &str) {
    if result.is_empty() {
        println!("No changes between {} and {}.", from.yellow(), into.yellow());
        return;
    }
    for file in &result.file_diffs {
        let label = match file.change_type {
            ChangeType::Added => "added".green(),
            ChangeType::Deleted => "deleted".red(),
            ChangeType::Modified => "modified".cyan(),
        };
        println!("{} {} ({label})", "diff".bold(), file.file_path.bold());
        if file.is_binary {
            println!("  Binary files differ");
            continue;
        }
        for line in &file.lines {
            match line.line_type {
                LineType::HunkHeader => println!("{}", line.content.cyan()),
                LineType::Addition => println!("{}", format!("+{}", line.content).green()),
                LineType::Deletion => println!("{}", format!("-{}", line.content).red()),
                LineType::Context => println!(" {}", line.content),
            }
        }
    }
    println!();
    println!(
        "{} {}",
        result.summary().bold(),
        format!("({} modified)", result.total_modifications).dimmed()
    );
}

async fn cmd_branches(args: BranchesArgs, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let branches = generator(&args.git, DiffConfig::default())
        .list_branches(&args.repo)
        .await
        .with_context(|| format!("listing branches of {}", args.repo.display()))?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&branches)?),
        OutputFormat::Text => {
            for branch in &branches {
                println!("  {}", branch.yellow());
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Prints ignored paths. Exits with 1 when none of the paths is ignored.
fn cmd_check_ignore(args: CheckIgnoreArgs) -> anyhow::Result<ExitCode> {
    let source = FsIgnoreSource::new(&args.repo).with_file_name(ignore_file_name(&args.ignore)?);
    let mut any_ignored = false;
    for path in &args.paths {
        let rules = rules_for(&source, path)?;

        let verdict = explain(path, &rules);
        any_ignored |= verdict.is_ignored();
        match (&verdict, args.explain) {
            (Verdict::Unmatched, true) => println!("{}\t{path}", "::".dimmed()),
            (Verdict::Unmatched, false) | (Verdict::Included(_), false) => {}
            (Verdict::Included(rule), true) => println!("{}\t{path}", rule.to_string().green()),
            (Verdict::Ignored(rule), true) => println!("{}\t{path}", rule.to_string().red()),
            (Verdict::ExcludedDirectory { directory, rule }, true) => {
                println!("{} via {directory}/\t{path}", rule.to_string().red())
            }
            (_, false) => println!("{path}"),
        }
    }
    Ok(if any_ignored {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

/// Rules in effect for `path`: those of its parent directory and above.
fn rules_for(source: &FsIgnoreSource, path: &str) -> anyhow::Result<Vec<IgnoreRule>> {
    let trimmed = path.trim_end_matches('/');
    let parent = trimmed.rsplit_once('/').map_or("", |(parent, _)| parent);
    load_rules_from(source, parent).with_context(|| format!("loading ignore rules for {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffhub_ignore::is_ignored;

    #[test]
    fn check_ignore_reads_configured_file_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "*.txt\n").unwrap();
        std::fs::write(dir.path().join(".diffignore"), "*.log\n").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/.diffignore"), "!keep.log\n").unwrap();

        let source = FsIgnoreSource::new(dir.path()).with_file_name(".diffignore");
        let check = |path: &str| is_ignored(path, &rules_for(&source, path).unwrap());
        assert!(check("debug.log"));
        assert!(!check("notes.txt"));
        assert!(!check("sub/keep.log"));
        assert!(check("sub/other.log"));
    }

    #[test]
    fn ignore_file_name_prefers_flag_then_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("diffhub.toml");
        std::fs::write(&config, "[diff]\nignore_file_name = \".diffignore\"\n").unwrap();

        let from_config = IgnoreFileArgs {
            config: config.clone(),
            ignore_file: None,
        };
        assert_eq!(ignore_file_name(&from_config).unwrap(), ".diffignore");

        let flagged = IgnoreFileArgs {
            config,
            ignore_file: Some(".custom".into()),
        };
        assert_eq!(ignore_file_name(&flagged).unwrap(), ".custom");

        let missing = IgnoreFileArgs {
            config: dir.path().join("absent.toml"),
            ignore_file: None,
        };
        assert_eq!(ignore_file_name(&missing).unwrap(), ".gitignore");
    }
}
