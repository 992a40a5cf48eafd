//! repomap CLI - map a repository into a symbol, import and call graph

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use repomap::config::{self, AnalyzerConfig, RepomapConfig};
use repomap::discover::discover;
use repomap::ui::{self, Icons, Spinner};
use repomap::{Analyzer, AnalysisReport};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "repomap")]
#[command(version)]
#[command(about = "Map a repository into a symbol, import and call graph")]
#[command(long_about = r#"
repomap statically analyzes Python, JavaScript, Rust and Go sources and
writes a graph of modules, classes, functions, methods, imports and calls
for documentation generators to consume.

Example usage:
  repomap init --path ./my-project
  repomap analyze --path ./my-project --output graph.json
  repomap analyze --path . --format jsonl --output -
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// One pretty-printed JSON document
    Json,
    /// One JSON record per line
    Jsonl,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a repository and write its graph
    Analyze {
        /// Repository root
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Repository name used in symbol URIs (defaults to directory name)
        #[arg(short, long)]
        repo: Option<String>,

        /// Output file, `-` for stdout
        #[arg(short, long)]
        output: Option<String>,

        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,

        /// Worker threads for parsing and extraction
        #[arg(short, long)]
        workers: Option<usize>,

        /// Give up on unfinished files after this many seconds
        #[arg(long)]
        deadline: Option<u64>,

        /// Extra gitignore-style exclude patterns
        #[arg(short, long)]
        exclude: Vec<String>,

        /// List every diagnostic, not only failures
        #[arg(long)]
        all_diagnostics: bool,
    },

    /// Write a starter repomap.toml
    Init {
        /// Repository root
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Repository name
        #[arg(short, long)]
        repo: Option<String>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// List supported languages and their extensions
    Languages,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Analyze {
            path,
            repo,
            output,
            format,
            workers,
            deadline,
            exclude,
            all_diagnostics,
        } => {
            let file = config::load_config(cli.config.as_deref())?.unwrap_or_default();
            let root = path
                .or_else(|| file.path.as_ref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."));
            let output = output
                .or_else(|| file.output.clone())
                .unwrap_or_else(|| "repomap.json".to_string());

            let mut settings = AnalyzerConfig::default().with_file(&file);
            if repo.is_some() {
                settings.repo = repo;
            }
            if let Some(workers) = workers {
                settings.workers = workers;
            }
            if let Some(secs) = deadline {
                settings.deadline = Some(Duration::from_secs(secs));
            }
            let mut excludes = file.exclude.clone();
            excludes.extend(exclude);

            run_analyze(&root, settings, &excludes, &output, format, all_diagnostics)
        }

        Commands::Init { path, repo, force } => {
            let config_path = cli.config.unwrap_or_else(config::default_config_path);
            let repo = repo.or_else(|| {
                path.canonicalize()
                    .ok()
                    .and_then(|p| p.file_name().map(|s| s.to_string_lossy().to_string()))
            });
            let starter: RepomapConfig =
                config::starter_config(repo, Some(path.to_string_lossy().to_string()));
            config::write_config(&config_path, &starter, force)?;
            ui::success(&format!("Wrote {}", config_path.display()));
            Ok(())
        }

        Commands::Languages => {
            println!("{}", ui::languages_table());
            Ok(())
        }
    }
}

fn run_analyze(
    root: &Path,
    settings: AnalyzerConfig,
    excludes: &[String],
    output: &str,
    format: Format,
    all_diagnostics: bool,
) -> anyhow::Result<()> {
    let to_stdout = output == "-";
    let started = Instant::now();

    if !to_stdout {
        ui::header("Mapping repository");
        ui::path_status(Icons::PACKAGE, "Root", &root.display().to_string());
        ui::status(Icons::GEAR, "Workers", &settings.workers.to_string());
    }

    let inputs = discover(root, excludes)
        .with_context(|| format!("failed to read {}", root.display()))?;
    let analyzer = Analyzer::new(settings)?;

    let spinner = (!to_stdout).then(|| Spinner::new(&format!("Analyzing {} files", inputs.len())));
    let report = analyzer.analyze(root, inputs)?;

    if let Some(spinner) = &spinner {
        spinner.set_message("Writing graph");
    }
    write_report(&report, output, format)?;

    if let Some(spinner) = spinner {
        spinner.finish_with_summary(started.elapsed(), &report.graph.stats());
        print_summary(&report, output, all_diagnostics);
    }
    Ok(())
}

fn write_report(report: &AnalysisReport, output: &str, format: Format) -> anyhow::Result<()> {
    match (output, format) {
        ("-", Format::Json) => println!("{}", report.to_json_pretty()?),
        ("-", Format::Jsonl) => report.write_json_lines(std::io::stdout().lock())?,
        (path, Format::Json) => std::fs::write(path, report.to_json_pretty()?)
            .with_context(|| format!("failed to write {}", path))?,
        (path, Format::Jsonl) => {
            let file = File::create(path).with_context(|| format!("failed to create {}", path))?;
            report.write_json_lines(BufWriter::new(file))?;
        }
    }
    Ok(())
}

fn print_summary(report: &AnalysisReport, output: &str, all_diagnostics: bool) {
    ui::section("Summary");
    println!("{}", ui::summary_table(report));

    let shown: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| all_diagnostics || !matches!(d.kind, repomap::DiagnosticKind::Skipped(_)))
        .collect();
    if !shown.is_empty() {
        ui::section("Diagnostics");
        for diagnostic in shown {
            ui::diagnostic(diagnostic);
        }
    }

    println!();
    if report.completeness.partial {
        ui::warn(&format!("Partial graph: {}", report.completeness));
    } else {
        ui::status(Icons::STATS, "Completeness", &report.completeness.to_string());
    }
    ui::path_status(Icons::FILE, "Graph written to", output);
}
