//! Promptbook command-line entry point.
//!
//! # Responsibility
//! - Resolve config, database and log locations.
//! - Map subcommands onto `promptbook_core` services.
//! - Translate outcomes into exit codes: 0 ok, 1 error, 2 import with
//!   skipped blocks.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use directories::ProjectDirs;
use log::{error, warn};
use promptbook_core::db::open_db;
use promptbook_core::{
    default_log_level, flush_logging, init_logging, search_entries, AppConfig, DuplicatePolicy,
    Entry, EntryQuery, EntryService, ExportOptions, ImportSummary, SearchQuery,
    SqliteEntryRepository,
};
use std::path::PathBuf;
use std::process::ExitCode;

const DB_FILE_NAME: &str = "promptbook.sqlite3";
const CONFIG_FILE_NAME: &str = "config.toml";
const EXIT_OK: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_PARTIAL_IMPORT: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let dirs = ProjectDirs::from("", "", "promptbook");
    let code = exit_code(run(cli, dirs.as_ref()));
    flush_logging();
    ExitCode::from(code)
}

/// Maps a command outcome onto the process exit code, reporting errors.
fn exit_code(outcome: Result<u8>) -> u8 {
    match outcome {
        Ok(code) => code,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err:#}");
            eprintln!("error: {err:#}");
            EXIT_ERROR
        }
    }
}

/// Runs one parsed command. `dirs` supplies platform defaults for paths the
/// command line and config leave open.
fn run(cli: Cli, dirs: Option<&ProjectDirs>) -> Result<u8> {
    let config_path = cli
        .config
        .clone()
        .or_else(|| dirs.map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME)));
    let mut config = match config_path {
        Some(path) => AppConfig::load(&path)?,
        None => AppConfig::default(),
    };

    start_logging(&cli, &config, dirs);

    let db_path = cli
        .db
        .clone()
        .or_else(|| config.db_path.clone())
        .or_else(|| dirs.map(|dirs| dirs.data_dir().join(DB_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME));
    let mut conn = open_db(&db_path)
        .with_context(|| format!("failed to open database `{}`", db_path.display()))?;

    if let Commands::Import {
        keep_first: true, ..
    } = &cli.command
    {
        config.import.duplicate_policy = DuplicatePolicy::KeepFirst;
    }

    let repo = SqliteEntryRepository::try_new(&mut conn)?;
    let mut service = EntryService::with_options(repo, config.import.clone());

    match cli.command {
        Commands::Import { path, .. } => {
            let summary = service
                .import_file(&path)
                .with_context(|| format!("import of `{}` failed", path.display()))?;
            print_import_summary(&summary);
            if summary.parse_errors.is_empty() {
                Ok(EXIT_OK)
            } else {
                Ok(EXIT_PARTIAL_IMPORT)
            }
        }
        Commands::Query {
            verdict,
            tags,
            text,
            json,
        } => {
            let query = EntryQuery {
                verdict,
                tags,
                text,
            };
            let entries = service.query(&query.to_predicate())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                entries.iter().for_each(print_entry);
                eprintln!("{} entries", entries.len());
            }
            Ok(EXIT_OK)
        }
        Commands::Get { reference, json } => {
            let entry = service.get(&reference)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                print_entry(&entry);
            }
            Ok(EXIT_OK)
        }
        Commands::Search {
            text,
            verdict,
            limit,
            raw,
        } => {
            let mut query = SearchQuery::new(text);
            query.verdict = verdict;
            query.limit = limit;
            query.raw_fts_syntax = raw;
            let hits = search_entries(service.repository().connection(), &query)?;
            for hit in &hits {
                println!("[{}] {}\n    {}", hit.verdict, hit.reference, hit.snippet);
            }
            eprintln!("{} hits", hits.len());
            Ok(EXIT_OK)
        }
        Commands::Tags => {
            for tag in service.tags()? {
                println!("{tag}");
            }
            Ok(EXIT_OK)
        }
        Commands::Export { path, title } => {
            let mut options: ExportOptions = config.export.to_options();
            if let Some(title) = title {
                options.title = title;
            }
            let count = service
                .export_file(&path, &options)
                .with_context(|| format!("export to `{}` failed", path.display()))?;
            println!("exported {count} entries to {}", path.display());
            Ok(EXIT_OK)
        }
    }
}

/// Starts file logging; failures only degrade to stderr output.
fn start_logging(cli: &Cli, config: &AppConfig, dirs: Option<&ProjectDirs>) {
    let level = cli
        .log_level
        .as_deref()
        .or(config.log_level.as_deref())
        .unwrap_or_else(|| default_log_level());
    let log_dir = config
        .log_dir
        .clone()
        .or_else(|| dirs.map(|dirs| dirs.data_dir().join("logs")));

    let Some(log_dir) = log_dir else {
        eprintln!("warning: no log directory available; file logging disabled");
        return;
    };
    if let Err(err) = init_logging(level, &log_dir) {
        eprintln!("warning: file logging disabled: {err}");
    }
}

fn print_import_summary(summary: &ImportSummary) {
    if let Some(title) = summary.title.as_deref() {
        println!("document: {title}");
    }
    println!("stored {} entries", summary.stored.len());
    for reference in &summary.duplicates {
        eprintln!("warning: duplicate reference kept once: {reference}");
    }
    for error in &summary.parse_errors {
        warn!(
            "event=cli_import module=cli status=skipped line={}",
            error.line
        );
        eprintln!("warning: skipped {error}");
    }
}

fn print_entry(entry: &Entry) {
    println!("[{}] {}", entry.verdict, entry.reference);
    println!("    {}", entry.prompt);
    if let Some(rationale) = entry.rationale.as_deref() {
        println!("    note: {rationale}");
    }
    if !entry.tags.is_empty() {
        let tags = entry.tags.iter().cloned().collect::<Vec<_>>();
        println!("    tags: {}", tags.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::{exit_code, run, EXIT_ERROR, EXIT_OK, EXIT_PARTIAL_IMPORT};
    use crate::cli::Cli;
    use clap::Parser;
    use promptbook_core::flush_logging;
    use std::ffi::OsString;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const CLEAN_DOCUMENT: &str = "\
# Test notes

## Good Images and prompts
- [a](https://c.example/1.png)
  a harbor at dusk
  tags: water

## Bad Images or characteristics
- [b](https://c.example/2.png)
  a crowded market
  note: faces melt together
";

    const DOCUMENT_WITH_SKIPPED_BLOCK: &str = "\
## Good Images and prompts
- this bullet has no link
  a lighthouse
- [ok](https://c.example/3.png)
  a forest trail
";

    /// Runs one command against a workspace-local config and database.
    fn run_in(workspace: &Path, args: &[&str]) -> u8 {
        let mut argv: Vec<OsString> = vec!["promptbook".into()];
        argv.push("--config".into());
        argv.push(workspace.join("config.toml").into());
        argv.push("--db".into());
        argv.push(workspace.join("db.sqlite3").into());
        argv.extend(args.iter().map(OsString::from));
        let cli = Cli::try_parse_from(argv).unwrap();
        exit_code(run(cli, None))
    }

    fn write_document(workspace: &TempDir, name: &str, text: &str) -> String {
        let path = workspace.path().join(name);
        fs::write(&path, text).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn clean_import_then_duplicate_import_fails() {
        let workspace = tempfile::tempdir().unwrap();
        let notes = write_document(&workspace, "notes.md", CLEAN_DOCUMENT);

        assert_eq!(run_in(workspace.path(), &["import", &notes]), EXIT_OK);
        assert_eq!(run_in(workspace.path(), &["import", &notes]), EXIT_ERROR);
        assert_eq!(
            run_in(workspace.path(), &["import", "--keep-first", &notes]),
            EXIT_OK
        );
    }

    #[test]
    fn import_with_skipped_blocks_reports_partial_success() {
        let workspace = tempfile::tempdir().unwrap();
        let notes = write_document(&workspace, "notes.md", DOCUMENT_WITH_SKIPPED_BLOCK);

        assert_eq!(
            run_in(workspace.path(), &["import", &notes]),
            EXIT_PARTIAL_IMPORT
        );
        assert_eq!(
            run_in(workspace.path(), &["get", "https://c.example/3.png"]),
            EXIT_OK
        );
    }

    #[test]
    fn missing_input_file_is_an_error() {
        let workspace = tempfile::tempdir().unwrap();
        let missing = workspace.path().join("absent.md");

        assert_eq!(
            run_in(workspace.path(), &["import", &missing.to_string_lossy()]),
            EXIT_ERROR
        );
    }

    #[test]
    fn get_reports_unknown_reference() {
        let workspace = tempfile::tempdir().unwrap();
        let notes = write_document(&workspace, "notes.md", CLEAN_DOCUMENT);
        assert_eq!(run_in(workspace.path(), &["import", &notes]), EXIT_OK);

        assert_eq!(
            run_in(workspace.path(), &["get", "https://c.example/1.png", "--json"]),
            EXIT_OK
        );
        assert_eq!(
            run_in(workspace.path(), &["get", "https://c.example/missing.png"]),
            EXIT_ERROR
        );
    }

    #[test]
    fn query_search_tags_and_export_succeed() {
        let workspace = tempfile::tempdir().unwrap();
        let notes = write_document(&workspace, "notes.md", CLEAN_DOCUMENT);
        assert_eq!(run_in(workspace.path(), &["import", &notes]), EXIT_OK);

        assert_eq!(
            run_in(workspace.path(), &["query", "--verdict", "bad", "--text", "market"]),
            EXIT_OK
        );
        assert_eq!(run_in(workspace.path(), &["search", "harbor"]), EXIT_OK);
        assert_eq!(run_in(workspace.path(), &["tags"]), EXIT_OK);

        let exported = workspace.path().join("out.md");
        assert_eq!(
            run_in(
                workspace.path(),
                &["export", &exported.to_string_lossy(), "--title", "Copy"]
            ),
            EXIT_OK
        );
        let text = fs::read_to_string(&exported).unwrap();
        assert!(text.starts_with("# Copy"));
        assert!(text.contains("https://c.example/2.png"));
    }

    #[test]
    fn export_into_missing_directory_is_an_error() {
        let workspace = tempfile::tempdir().unwrap();
        let target = workspace.path().join("no_such_dir").join("out.md");

        assert_eq!(
            run_in(workspace.path(), &["export", &target.to_string_lossy()]),
            EXIT_ERROR
        );
    }

    #[test]
    fn malformed_config_is_an_error() {
        let workspace = tempfile::tempdir().unwrap();
        fs::write(workspace.path().join("config.toml"), "log_level = [").unwrap();

        assert_eq!(run_in(workspace.path(), &["tags"]), EXIT_ERROR);
    }

    #[test]
    fn configured_log_dir_receives_flushed_events() {
        let workspace = tempfile::tempdir().unwrap();
        let log_dir = workspace.path().join("logs");
        fs::write(
            workspace.path().join("config.toml"),
            format!("log_dir = '{}'\nlog_level = 'info'\n", log_dir.display()),
        )
        .unwrap();
        let notes = write_document(&workspace, "notes.md", DOCUMENT_WITH_SKIPPED_BLOCK);

        assert_eq!(
            run_in(workspace.path(), &["import", &notes]),
            EXIT_PARTIAL_IMPORT
        );
        flush_logging();

        let logged = fs::read_dir(&log_dir)
            .unwrap()
            .map(|file| fs::read_to_string(file.unwrap().path()).unwrap())
            .collect::<String>();
        assert!(logged.contains("event=notes_parse"));
        assert!(logged.contains("event=cli_import"));
    }
}
