//! Bowtie network engine - command line harness
//!
//! Loads bowtie rows from a JSON file and runs one engine stage:
//! - `structure`: derived nodes and edges
//! - `infer`: posterior marginals under evidence
//! - `paths`: critical paths and control-failure ranking
//! - `discretize`: map a risk value onto levels
//!
//! Payloads go to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};

use bt_common::{BowtieRow, NodeId};
use bt_config::{load_config, ValidationError};
use bt_core::exit_codes::ExitCode;
use bt_core::inference::{discretize_risk_level, Evidence, RiskInput, DEFAULT_LEVELS};
use bt_core::logging::{event_names, generate_run_id, init_logging, LogConfig, LogFormat};
use bt_core::{rows_from_json, BowtieEngine};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

/// Bowtie Bayesian network engine
#[derive(Parser)]
#[command(name = "bt-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Engine configuration file (JSON or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log format on stderr (human or jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    quiet: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the network structure from rows
    Structure(RowArgs),

    /// Posterior marginals under evidence
    Infer(InferArgs),

    /// Rank critical paths and control failures
    Paths(PathsArgs),

    /// Discretize a risk value
    Discretize(DiscretizeArgs),
}

#[derive(Args, Debug)]
struct RowArgs {
    /// JSON file holding an array of bowtie rows
    #[arg(long)]
    rows: PathBuf,

    /// Restrict to rows with this central problem
    #[arg(long)]
    problem: Option<String>,
}

#[derive(Args, Debug)]
struct InferArgs {
    #[command(flatten)]
    input: RowArgs,

    /// Learn CPTs from the rows when there are enough of them
    #[arg(long)]
    use_data: bool,

    /// Evidence as NODE_ID=STATE (repeatable)
    #[arg(long = "evidence", value_name = "ID=STATE")]
    evidence: Vec<String>,

    /// Node ids to query (default: every unobserved node)
    #[arg(long = "query", value_name = "ID")]
    query: Vec<String>,
}

#[derive(Args, Debug)]
struct PathsArgs {
    #[command(flatten)]
    input: RowArgs,

    #[arg(long)]
    use_data: bool,
}

#[derive(Args, Debug)]
struct DiscretizeArgs {
    /// Numeric or textual risk value
    value: String,

    /// Comma-separated level names, lowest first
    #[arg(long, value_delimiter = ',')]
    levels: Vec<String>,
}

/// Failures that end a CLI run.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ValidationError),

    #[error(transparent)]
    Engine(#[from] bt_common::Error),

    #[error("cannot read rows from {path}: {source}")]
    ReadRows {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("rows in {path} are unusable: {source}")]
    ParseRows {
        path: PathBuf,
        source: bt_common::Error,
    },

    #[error("evidence must look like NODE_ID=STATE, got {0:?}")]
    Evidence(String),

    #[error("malformed node id {0:?}")]
    NodeId(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Engine(err) => ExitCode::for_error(err),
            _ => ExitCode::UserError,
        }
    }

    /// Short title for engine-side failures.
    fn headline(&self) -> Option<&'static str> {
        match self {
            CliError::Engine(err) | CliError::ParseRows { source: err, .. } => Some(err.headline()),
            _ => None,
        }
    }
}

type CliResult<T> = Result<T, CliError>;

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(None, cli.global.log_format);
    let level = log_config.level.adjust(cli.global.verbose, cli.global.quiet);
    init_logging(&log_config.with_level(level));

    let run_id = generate_run_id();
    let span = tracing::info_span!("run", run_id = %run_id);
    let _guard = span.enter();
    info!(target: event_names::RUN_STARTED, "starting bt-core");

    let exit_code = match run(&cli) {
        Ok(()) => ExitCode::Clean,
        Err(err) => {
            let code = err.exit_code();
            error!(target: event_names::RUN_FINISHED, exit_code = code.as_i32(), error = %err, "run failed");
            match err.headline() {
                Some(headline) => eprintln!("bt-core: {headline}: {err}"),
                None => eprintln!("bt-core: {err}"),
            }
            code
        }
    };
    if exit_code.is_success() {
        info!(target: event_names::RUN_FINISHED, "run finished");
    }

    drop(_guard);
    std::process::exit(exit_code.as_i32());
}

fn run(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Structure(args) => run_structure(&cli.global, args),
        Commands::Infer(args) => run_infer(&cli.global, args),
        Commands::Paths(args) => run_paths(&cli.global, args),
        Commands::Discretize(args) => run_discretize(args),
    }
}

fn engine(global: &GlobalOpts) -> CliResult<BowtieEngine> {
    let resolved = load_config(global.config.as_deref()).map_err(|err| {
        error!(target: event_names::CONFIG_ERROR, code = err.code(), error = %err, "invalid configuration");
        err
    })?;
    info!(
        target: event_names::CONFIG_LOADED,
        source = %resolved.source,
        path = ?resolved.path,
        "configuration loaded"
    );
    Ok(BowtieEngine::new(resolved.config))
}

fn read_rows(path: &Path) -> CliResult<Vec<BowtieRow>> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadRows {
        path: path.to_path_buf(),
        source,
    })?;
    rows_from_json(&text).map_err(|source| CliError::ParseRows {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_evidence(pairs: &[String]) -> CliResult<Evidence> {
    let mut evidence = Evidence::new();
    for pair in pairs {
        let (id, state) = pair
            .split_once('=')
            .filter(|(id, state)| !id.trim().is_empty() && !state.trim().is_empty())
            .ok_or_else(|| CliError::Evidence(pair.clone()))?;
        evidence.insert(parse_id(id)?, state.trim().to_string());
    }
    Ok(evidence)
}

fn parse_id(raw: &str) -> CliResult<NodeId> {
    NodeId::parse(raw.trim()).ok_or_else(|| CliError::NodeId(raw.to_string()))
}

fn emit<T: Serialize>(payload: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(payload).map_err(bt_common::Error::from)?;
    println!("{text}");
    Ok(())
}

fn run_structure(global: &GlobalOpts, args: &RowArgs) -> CliResult<()> {
    let engine = engine(global)?;
    let rows = read_rows(&args.rows)?;
    let structure = engine.build_structure(&rows, args.problem.as_deref())?;
    emit(&serde_json::json!({
        "summary": structure.summary(),
        "structure": structure,
    }))
}

fn run_infer(global: &GlobalOpts, args: &InferArgs) -> CliResult<()> {
    let engine = engine(global)?;
    let rows = read_rows(&args.input.rows)?;
    let network = engine.fit_rows(&rows, args.input.problem.as_deref(), args.use_data)?;
    let evidence = parse_evidence(&args.evidence)?;
    let query = args
        .query
        .iter()
        .map(|q| parse_id(q))
        .collect::<CliResult<Vec<_>>>()?;
    let query = (!query.is_empty()).then_some(query.as_slice());

    let result = engine.infer(Some(&network), &evidence, query);
    emit(&serde_json::json!({
        "backend": engine.capabilities().backend,
        "parameter_source": network.parameter_source(),
        "result": result,
    }))
}

fn run_paths(global: &GlobalOpts, args: &PathsArgs) -> CliResult<()> {
    let engine = engine(global)?;
    let rows = read_rows(&args.input.rows)?;
    let network = engine.fit_rows(&rows, args.input.problem.as_deref(), args.use_data)?;
    emit(&serde_json::json!({
        "backend": engine.capabilities().backend,
        "critical_paths": engine.find_critical_paths(Some(&network)),
        "control_failures": engine.rank_control_failures(Some(&network)),
    }))
}

fn run_discretize(args: &DiscretizeArgs) -> CliResult<()> {
    let levels: Vec<&str> = if args.levels.is_empty() {
        DEFAULT_LEVELS.to_vec()
    } else {
        args.levels.iter().map(String::as_str).collect()
    };
    let level = discretize_risk_level(RiskInput::from(args.value.as_str()), &levels);
    emit(&serde_json::json!({
        "value": args.value,
        "level": level,
    }))
}
