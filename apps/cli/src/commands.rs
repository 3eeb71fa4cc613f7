//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docmine_core::pipeline::{BuildConfig, BuildResult, ProgressReporter};
use docmine_core::{corpus_name, render_display, render_for_prompt};
use docmine_shared::{AppConfig, BuildSettings, Object, TaggingMode, init_config, load_config};
use docmine_storage::CorpusStore;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docmine: turn Word documents into a tagged corpus.
#[derive(Parser)]
#[command(
    name = "docmine",
    version,
    about = "Decompose Word documents into tagged, context-aware text and table objects.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Mine a folder of .doc/.docx files into a corpus.
    Build {
        /// Folder (or single document) to mine.
        input: PathBuf,

        /// Corpus directory (defaults to <output_dir>/<folder name>).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Human-readable corpus name (defaults to the folder name).
        #[arg(short, long)]
        name: Option<String>,

        /// Context radius, in elements on each side.
        #[arg(long)]
        radius: Option<usize>,

        /// JSON array of seed tags.
        #[arg(long)]
        vocabulary: Option<PathBuf>,

        /// Tag texts after all tables have been read.
        #[arg(long)]
        two_pass: bool,

        /// Skip legacy .doc files instead of converting them.
        #[arg(long)]
        no_convert: bool,
    },

    /// Print Objects of an existing corpus.
    Show {
        /// Corpus directory.
        #[arg(long)]
        corpus: PathBuf,

        /// Only this Object.
        #[arg(long)]
        object: Option<u64>,

        /// Only Objects associated with this tag.
        #[arg(long)]
        tag: Option<String>,

        /// Print the language-model rendering instead of the full record.
        #[arg(long)]
        prompt: bool,
    },

    /// List the exported tags of a corpus.
    Tags {
        /// Corpus directory.
        #[arg(long)]
        corpus: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docmine=info",
        1 => "docmine=debug",
        _ => "docmine=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build {
            input,
            out,
            name,
            radius,
            vocabulary,
            two_pass,
            no_convert,
        } => {
            let overrides = BuildOverrides {
                radius,
                vocabulary,
                two_pass,
                no_convert,
            };
            cmd_build(&input, out, name, overrides)
        }
        Command::Show {
            corpus,
            object,
            tag,
            prompt,
        } => cmd_show(&corpus, object, tag.as_deref(), prompt),
        Command::Tags { corpus } => cmd_tags(&corpus),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

/// Flags that override the config file for one build.
struct BuildOverrides {
    radius: Option<usize>,
    vocabulary: Option<PathBuf>,
    two_pass: bool,
    no_convert: bool,
}

impl BuildOverrides {
    fn apply(self, settings: &mut BuildSettings) {
        if let Some(radius) = self.radius {
            settings.context_radius = radius;
        }
        if let Some(path) = self.vocabulary {
            settings.vocabulary_path = Some(path);
        }
        if self.two_pass {
            settings.tagging_mode = TaggingMode::TwoPass;
        }
        if self.no_convert {
            settings.converter_command = None;
        }
    }
}

fn cmd_build(
    input: &Path,
    out: Option<PathBuf>,
    name: Option<String>,
    overrides: BuildOverrides,
) -> Result<()> {
    if !input.exists() {
        return Err(eyre!("input '{}' does not exist", input.display()));
    }

    let config = load_config()?;
    let mut settings = BuildSettings::from(&config);
    overrides.apply(&mut settings);

    let corpus_name = name.unwrap_or_else(|| corpus_name(input));
    let corpus_dir = match out {
        Some(dir) => dir,
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| eyre!("cannot determine working directory: {e}"))?;
            cwd.join(&config.defaults.output_dir).join(&corpus_name)
        }
    };

    let build_config = BuildConfig {
        input: input.to_path_buf(),
        corpus_dir,
        name: corpus_name.clone(),
        settings,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(
        input = %input.display(),
        name = %corpus_name,
        mode = build_config.settings.tagging_mode.as_str(),
        radius = build_config.settings.context_radius,
        "building corpus"
    );

    let reporter = CliProgress::new();
    let result = docmine_core::build_corpus(&build_config, &reporter)?;

    println!();
    println!("  Corpus built successfully!");
    println!("  ID:      {}", result.corpus_id);
    println!("  Name:    {corpus_name}");
    println!("  Files:   {} ({} skipped)", result.file_count, result.skipped);
    println!("  Objects: {}", result.object_count);
    println!("  Tags:    {}", result.tag_count);
    println!("  Path:    {}", result.corpus_path.display());
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_processed(&self, path: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Mining [{current}/{total}] {path}"));
    }

    fn file_skipped(&self, path: &str, reason: &str) {
        self.spinner.println(format!("  skipped {path}: {reason}"));
    }

    fn done(&self, _result: &BuildResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// show / tags
// ---------------------------------------------------------------------------

fn cmd_show(corpus_dir: &Path, object: Option<u64>, tag: Option<&str>, prompt: bool) -> Result<()> {
    let corpus = CorpusStore::new(corpus_dir).read()?;

    let selected: Vec<&Object> = match (object, tag) {
        (Some(id), _) => {
            let found = corpus
                .object(id)
                .ok_or_else(|| eyre!("no object {id} in '{}'", corpus_dir.display()))?;
            vec![found]
        }
        (None, Some(tag)) => corpus.objects_tagged(tag),
        (None, None) => corpus.objects.iter().collect(),
    };

    if selected.is_empty() {
        println!("No matching objects.");
        return Ok(());
    }

    for (i, object) in selected.iter().enumerate() {
        if i > 0 {
            println!("---------------------");
        }
        if prompt {
            print!("{}", render_for_prompt(object));
        } else {
            print!("{}", render_display(object));
        }
    }
    Ok(())
}

fn cmd_tags(corpus_dir: &Path) -> Result<()> {
    let tags = CorpusStore::new(corpus_dir).read_tags()?;
    if tags.is_empty() {
        println!("No tags.");
        return Ok(());
    }

    let width = tags.names().map(|n| n.chars().count()).max().unwrap_or(0);
    for (tag_id, (name, ids)) in tags.associated().enumerate() {
        println!("{tag_id:>5}  {name:<width$}  {} object(s)", ids.len());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
