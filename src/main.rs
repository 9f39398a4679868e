use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::info;

use halflife_core::{HalflifeConfig, ModificationPolicy, OutputFormat};
use halflife_git::GitSource;
use halflife_lifecycle::{run_analysis, AnalysisOptions, PathFilter};

mod render;

const CONFIG_FILE: &str = ".halflife.toml";

#[derive(Parser)]
#[command(
    name = "halflife",
    version,
    about = "Measure how long lines of code survive in a git history",
    long_about = "halflife replays the history of one branch commit by commit, follows every\n\
                   line from the commit that introduced it to the commit that removed it, and\n\
                   reports the code's half-life: the age at which half of all lines are gone.\n\n\
                   Examples:\n  \
                     halflife analyze                     Analyze the repository in the current directory\n  \
                     halflife analyze --pattern '*.rs'    Only track Rust files\n  \
                     halflife analyze --validate          Include sample lines and an event timeline\n  \
                     halflife --format json analyze       Machine-readable output\n  \
                     halflife init                        Write a default .halflife.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .halflife.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable report (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors and hide the progress bar
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a repository's history and report line survival statistics
    #[command(long_about = "Replay a repository's history and report line survival statistics.\n\n\
        Walks the first-parent history of one branch (--branch, else main, else master)\n\
        oldest first. Every non-blank line is tracked by its file and exact content;\n\
        its lifetime runs from the commit that added it to the commit that deleted it,\n\
        or to now if it still exists.\n\n\
        Examples:\n  halflife analyze --path ../project\n  halflife analyze --pattern '*.go' --time-points 50\n  halflife analyze --policy in-place --validate")]
    Analyze {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// File name glob to track, e.g. "*.rs" (default: "*")
        #[arg(long)]
        pattern: Option<String>,

        /// Branch to replay (default: main, then master)
        #[arg(long)]
        branch: Option<String>,

        /// Include sample lines and a lifecycle event timeline
        #[arg(long)]
        validate: bool,

        /// Number of survival-curve samples (default: 100)
        #[arg(long)]
        time_points: Option<usize>,

        /// How an edited line is counted
        #[arg(
            long,
            long_help = "How an edited line is counted.\n\n\
                Policies:\n  \
                  replace   The old line is deleted and a new line is created (default)\n  \
                  in-place  A deleted line directly followed by an added line is recorded\n            \
                            as a modification of the same line"
        )]
        policy: Option<ModificationPolicy>,
    },
    /// Create a default .halflife.toml configuration file
    #[command(long_about = "Create a default .halflife.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .halflife.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# halflife configuration

[analysis]
# File name glob to track
# pattern = "*"
# Extra globs (matched against the full path) that are never tracked
# exclude = ["vendor/*", "*.lock"]
# Branch to replay; main, then master, when unset
# branch = "main"
# Number of evenly spaced survival-curve samples
# time_points = 100
# "replace" counts an edit as delete + create; "in-place" as a modification
# modification_policy = "replace"

[validation]
# Surviving lines sampled by --validate
# sample_count = 5
# Timeline events shown from each end in text output
# timeline_preview = 5
"#;

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!("halflife v{version} - how long does code live?\n");
    println!("Quick start:");
    println!("  halflife analyze              Analyze the repository in the current directory");
    println!("  halflife analyze --validate   Include sample lines and an event timeline");
    println!("  halflife init                 Create a .halflife.toml config file\n");
    println!("Run 'halflife <command> --help' for details.");
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = match (quiet, verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<HalflifeConfig> {
    let path = match explicit {
        Some(path) => path,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if !default_path.exists() {
                return Ok(HalflifeConfig::default());
            }
            default_path
        }
    };
    HalflifeConfig::from_file(path).wrap_err_with(|| format!("loading {}", path.display()))
}

fn progress_bar(quiet: bool) -> Result<Option<ProgressBar>> {
    if quiet || !std::io::stderr().is_terminal() {
        return Ok(None);
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} replaying [{bar:30.cyan/blue}] {pos}/{len} commits ({elapsed})",
        )
        .into_diagnostic()?
        .progress_chars("=> "),
    );
    Ok(Some(pb))
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        cli.format
    };

    match cli.command {
        None => print_welcome(),
        Some(Command::Analyze {
            ref path,
            pattern,
            branch,
            validate,
            time_points,
            policy,
        }) => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(pattern) = pattern {
                config.analysis.pattern = pattern;
            }
            if branch.is_some() {
                config.analysis.branch = branch;
            }
            if let Some(time_points) = time_points {
                config.analysis.time_points = time_points;
            }
            if let Some(policy) = policy {
                config.analysis.modification_policy = policy;
            }
            config.validate()?;

            let filter = PathFilter::from_config(&config.analysis)?;
            let source = GitSource::open(path, config.analysis.branch.as_deref())?;
            info!(
                path = %path.display(),
                branch = source.branch(),
                pattern = %config.analysis.pattern,
                policy = %config.analysis.modification_policy,
                "analyzing"
            );

            let options = AnalysisOptions {
                validate,
                ..AnalysisOptions::from_config(&config, Utc::now().timestamp())
            };

            let progress = progress_bar(cli.quiet)?;
            let result = run_analysis(&source, &filter, &options, |done, total| {
                if let Some(pb) = &progress {
                    pb.set_length(total as u64);
                    pb.set_position(done as u64);
                }
            });
            if let Some(pb) = progress {
                pb.finish_and_clear();
            }
            let analysis = result?;

            let report = render::Report::new(&analysis, config.validation.timeline_preview);
            match format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&analysis).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => print!("{}", report.to_markdown()),
                OutputFormat::Text => print!("{report}"),
            }
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "halflife", &mut std::io::stdout());
        }
    }

    Ok(())
}
