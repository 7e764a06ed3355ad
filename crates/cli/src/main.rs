//! `codex-cache` command-line front end.
//!
//! Every command prints its result as JSON on stdout. `health` exits with
//! 0 (healthy), 1 (degraded) or 2 (failed); other failures exit with 2.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use codex_cache_client::HttpSource;
use codex_cache_core::cache::{ClearScope, HealthOptions, StoreRequest};
use codex_cache_core::{AppConfig, DocCache};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codex-cache", version, about = "Disk-backed document cache (store, lookup, clear, health, metrics)")]
struct Cli {
    /// Cache root (overrides the configured `cache_dir`)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a document under a reference
    Store(StoreArgs),
    /// Check whether a reference is cached and fresh
    Lookup {
        reference: String,
    },
    /// Remove entries by scope: all, expired, project <name>, pattern <glob>
    Clear(ClearArgs),
    /// Run health checks; exit code reflects the overall status
    Health(HealthArgs),
    /// Print aggregate metrics and recommendations
    Metrics {
        /// Number of largest entries to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Fetch a document through the cache
    Fetch(FetchArgs),
    /// Rebuild the index from the files on disk
    Rebuild {
        /// TTL for re-adopted files (defaults to `default_ttl_days`)
        #[arg(long)]
        ttl_days: Option<u32>,
    },
}

#[derive(Args)]
struct StoreArgs {
    reference: String,
    /// Origin of the document, e.g. `github`
    #[arg(long)]
    source: String,
    /// File whose contents are stored
    #[arg(long, conflicts_with = "content", required_unless_present = "content")]
    file: Option<PathBuf>,
    /// Inline document text
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    ttl_days: Option<u32>,
}

#[derive(Args)]
struct ClearArgs {
    /// all | expired | project | pattern
    scope: String,
    /// Project name or glob, for the project and pattern scopes
    filter: Option<String>,
    /// Report what would be deleted without deleting it
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct HealthArgs {
    /// Categories to check (repeatable): cache, config, performance, storage, system, all
    #[arg(long = "category")]
    categories: Vec<String>,
    /// Remove orphaned files
    #[arg(long)]
    fix: bool,
}

#[derive(Args)]
struct FetchArgs {
    reference: String,
    #[arg(long)]
    ttl_days: Option<u32>,
    /// Bypass the cache
    #[arg(long)]
    force: bool,
    /// Print only the document content instead of the JSON summary
    #[arg(long)]
    raw: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchSummary<'a> {
    reference: &'a str,
    from_cache: bool,
    entry: &'a codex_cache_core::cache::CacheEntry,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = AppConfig::load().context("loading configuration")?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    let cache = DocCache::open(&config.cache_dir);
    let mut out = std::io::stdout().lock();
    execute(&cache, &config, cli.command, &mut out).await
}

async fn execute(cache: &DocCache, config: &AppConfig, command: Command, out: &mut impl std::io::Write) -> Result<i32> {
    match command {
        Command::Store(args) => {
            let request =
                StoreRequest::new(args.reference, args.source, args.ttl_days.unwrap_or(config.default_ttl_days));
            let entry = match (args.file, args.content) {
                (Some(file), None) => cache.store_file(&request, &file)?,
                (None, Some(content)) => cache.store(&request, content.as_bytes())?,
                _ => bail!("exactly one of --file or --content is required"),
            };
            print_json(out, &entry)?;
        }
        Command::Lookup { reference } => print_json(out, &cache.lookup(&reference)?)?,
        Command::Clear(args) => {
            let scope = ClearScope::parse(&args.scope, args.filter.as_deref())?;
            print_json(out, &cache.clear(&scope, args.dry_run)?)?;
        }
        Command::Health(args) => {
            let options = HealthOptions::parse(&args.categories, args.fix)?;
            let report = cache.health(config, &options)?;
            print_json(out, &report)?;
            return Ok(report.exit_code());
        }
        Command::Metrics { top } => print_json(out, &cache.metrics(config, top)?)?,
        Command::Fetch(args) => {
            let source = HttpSource::from_app_config(config)?;
            let ttl_days = args.ttl_days.unwrap_or(config.default_ttl_days);
            let outcome = cache.get_or_fetch(&source, &args.reference, ttl_days, args.force).await?;
            if args.raw {
                out.write_all(&outcome.content)?;
            } else {
                let summary =
                    FetchSummary { reference: &args.reference, from_cache: outcome.from_cache, entry: &outcome.entry };
                print_json(out, &summary)?;
            }
        }
        Command::Rebuild { ttl_days } => {
            print_json(out, &cache.rebuild_index(ttl_days.unwrap_or(config.default_ttl_days))?)?;
        }
    }
    Ok(0)
}

fn print_json<T: Serialize>(out: &mut impl std::io::Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use codex_cache_core::Error;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_clear_with_filter() {
        let cli = Cli::try_parse_from(["codex-cache", "--cache-dir", "/tmp/c", "clear", "project", "acme", "--dry-run"])
            .unwrap();
        assert_eq!(cli.cache_dir.as_deref(), Some(std::path::Path::new("/tmp/c")));
        let Command::Clear(args) = cli.command else { panic!("expected clear") };
        assert_eq!(args.scope, "project");
        assert_eq!(args.filter.as_deref(), Some("acme"));
        assert!(args.dry_run);
    }

    #[test]
    fn test_store_requires_input() {
        assert!(Cli::try_parse_from(["codex-cache", "store", "@codex/acme/a.md", "--source", "github"]).is_err());
        assert!(
            Cli::try_parse_from([
                "codex-cache", "store", "@codex/acme/a.md", "--source", "github", "--file", "a", "--content", "b"
            ])
            .is_err()
        );
    }

    async fn exec(cache: &DocCache, args: &[&str]) -> (i32, serde_json::Value) {
        let cli = Cli::try_parse_from(std::iter::once("codex-cache").chain(args.iter().copied())).unwrap();
        let mut out = Vec::new();
        let code = execute(cache, &AppConfig::default(), cli.command, &mut out).await.unwrap();
        (code, serde_json::from_slice(&out).unwrap())
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path());

        let (code, entry) =
            exec(&cache, &["store", "@codex/acme/readme.md", "--source", "github", "--content", "# hi"]).await;
        assert_eq!(code, 0);
        assert_eq!(entry["ttlDays"], 7);

        let (_, lookup) = exec(&cache, &["lookup", "@codex/acme/readme.md"]).await;
        assert_eq!(lookup["reason"], "valid");
    }

    #[tokio::test]
    async fn test_health_exit_code_tracks_status() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path());
        exec(&cache, &["store", "@codex/acme/a.md", "--source", "github", "--content", "x"]).await;
        std::fs::write(dir.path().join("codex/acme/orphan.md"), b"o").unwrap();

        let (code, report) = exec(&cache, &["health", "--category", "cache"]).await;
        assert_eq!(report["status"], "degraded");
        assert_eq!(code, 1);

        let (code, report) = exec(&cache, &["health", "--category", "cache", "--fix"]).await;
        assert_eq!(report["fixesApplied"].as_array().unwrap().len(), 1);
        assert_eq!(report["status"], "healthy");
        assert_eq!(code, 0);
        assert!(!dir.path().join("codex/acme/orphan.md").exists());
    }

    #[tokio::test]
    async fn test_health_on_file_root_exits_two() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        std::fs::write(&root, b"not a directory").unwrap();
        let cache = DocCache::open(&root);

        let (code, report) = exec(&cache, &["health", "--category", "cache"]).await;
        assert_eq!(report["status"], "failed");
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path());

        for args in [
            &["rebuild", "--ttl-days", "4294967295"][..],
            &["store", "@codex/acme/a.md", "--source", "github", "--content", "x", "--ttl-days", "4294967295"][..],
        ] {
            let cli = Cli::try_parse_from(std::iter::once("codex-cache").chain(args.iter().copied())).unwrap();
            let err = execute(&cache, &AppConfig::default(), cli.command, &mut Vec::new()).await.unwrap_err();
            assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Validation(_))), "{err:#}");
        }
        assert!(!dir.path().join("codex/acme/a.md").exists());
        assert!(!cache.index_path().exists());
    }

    #[tokio::test]
    async fn test_clear_expired_reports_nothing_on_fresh_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path());
        exec(&cache, &["store", "@codex/acme/a.md", "--source", "github", "--content", "x"]).await;

        let (code, report) = exec(&cache, &["clear", "expired"]).await;
        assert_eq!(code, 0);
        assert_eq!(report["deletedCount"], 0);
    }
}
