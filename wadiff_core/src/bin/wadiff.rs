use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use tracing::Level;
use wadiff_core::api::{
    Absence, ColorMode, DiffStrategy, ProgressEvent, RenderOptions, RetrievalPolicy,
    DEFAULT_SHOW_COMMAND,
};
use wadiff_core::context::RunOptions;
use wadiff_core::orchestrator::Orchestrator;
use wadiff_core::range::RevisionExpr;
use wadiff_core::repository::Repository;
use wadiff_core::{telemetry, workspace};
use wadiff_tools::{default_toolchain, ToolSettings};

/// Visual diffs of WAD assets between two revisions of a git repository.
#[derive(Debug, Parser)]
#[command(name = "wadiff", version, about, long_about = None)]
struct Cli {
    /// Revision expression: `R` compares R with the work tree, `A..B` two revisions.
    commit: Option<String>,

    /// Second revision; compares COMMIT with TARGET.
    target: Option<String>,

    /// Repository, or any directory inside it.
    #[arg(short = 'C', long, default_value = ".")]
    repo: Utf8PathBuf,

    /// Asset directory relative to the work tree.
    #[arg(short, long, default_value = ".")]
    dir: Utf8PathBuf,

    /// Case-insensitive regular expression over asset paths.
    #[arg(short, long)]
    pattern: Option<String>,

    /// Artifact directory [default: <work tree>/images]
    #[arg(short, long)]
    out_dir: Option<Utf8PathBuf>,

    /// When the renderer and differencer run.
    #[arg(long, default_value_t = DiffStrategy::PerAsset)]
    strategy: DiffStrategy,

    /// Abort when historical content is missing instead of treating it as empty.
    #[arg(long)]
    strict: bool,

    /// How differences are colored.
    #[arg(long, default_value_t = ColorMode::Full)]
    color_mode: ColorMode,

    /// Animated artifacts alternating between both sides.
    #[arg(short, long)]
    gif: bool,

    /// Show artifacts once they are created.
    #[arg(short, long)]
    show: bool,

    /// Viewer command; words after the program are passed as arguments.
    #[arg(long, env = "WADIFF_SHOW_CMD", default_value = DEFAULT_SHOW_COMMAND)]
    show_cmd: String,

    /// Renderer program [default: wad2image.py]
    #[arg(long, env = "WADIFF_WAD2IMAGE")]
    wad2image: Option<String>,

    /// ImageMagick program [default: magick]
    #[arg(long, env = "WADIFF_MAGICK")]
    magick: Option<String>,

    /// Kill any collaborator that runs longer than this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Verbose output, also requested from the renderer.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines and progress events.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    telemetry::init_tracing(cli.json, level);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("wadiff: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    workspace::install_signal_cleanup().context("failed to install signal cleanup")?;

    let repository = Repository::open(cli.repo.as_std_path())
        .with_context(|| format!("failed to open repository at {}", cli.repo))?;
    let asset_dir = repository
        .scope_for(repository.root().join(cli.dir.as_std_path()))
        .with_context(|| format!("invalid asset directory {}", cli.dir))?;

    let toolchain = default_toolchain(&ToolSettings {
        wad2image: cli.wad2image.map(Into::into),
        magick: cli.magick.map(Into::into),
        timeout: cli.timeout_secs.map(Duration::from_secs),
    });
    let options = RunOptions {
        render: RenderOptions {
            verbose: cli.verbose,
            color_mode: cli.color_mode,
            animated: cli.gif,
            show: cli.show,
            show_command: cli.show_cmd,
        },
        strategy: cli.strategy,
        retrieval: if cli.strict {
            RetrievalPolicy::Strict
        } else {
            RetrievalPolicy::Lenient
        },
        asset_dir,
        name_pattern: cli.pattern,
        out_dir: cli.out_dir.map(Utf8PathBuf::into_std_path_buf),
    };
    let expression = RevisionExpr::from_parts(cli.commit.as_deref(), cli.target.as_deref());
    let json = cli.json;
    let mut progress = |event: &ProgressEvent| {
        if json {
            print_json(event);
        } else {
            print_progress(event);
        }
    };

    let report = Orchestrator::new(&repository, &toolchain)
        .run(&expression, &options, &mut progress)
        .with_context(|| format!("failed to compare assets for '{expression}'"))?;

    if report.succeeded() {
        return Ok(ExitCode::SUCCESS);
    }
    for asset in &report.assets {
        if let Some(error) = &asset.error {
            eprintln!("wadiff: {}: {error}", asset.entry.relative_path);
        }
    }
    if let Some(failure) = &report.failure {
        eprintln!("wadiff: {failure}");
    }
    Ok(ExitCode::FAILURE)
}

fn print_json(event: &ProgressEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(err) => tracing::warn!(error = %err, "failed to encode progress event"),
    }
}

fn print_progress(event: &ProgressEvent) {
    match event {
        ProgressEvent::NoDifferences { range } => println!("No differences found for {range}"),
        ProgressEvent::Asset {
            index,
            total,
            path,
            from,
            to,
        } => println!("[{index}/{total}] {path} ({from} -> {to})"),
        ProgressEvent::Absent {
            path,
            revision,
            absence,
        } => match absence {
            Absence::MissingInWorkspace => println!("    {path} is not in the work tree"),
            Absence::MissingAtRevision => println!("    {path} does not exist at {revision}"),
            Absence::RetrievalFailed { reason } => {
                println!("    {path} could not be read at {revision}: {reason}");
            }
        },
        ProgressEvent::Artifact { path } => println!("    wrote {}", path.display()),
    }
}
