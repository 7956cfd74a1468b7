//! kairos CLI: temporal logic inference over annotated graphs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use kairos::export::{RunExport, filter_rows, trace_rows, world_rows};
use kairos::interval::Interval;
use kairos::label::Label;
use kairos::program::Program;
use kairos::reasoner::ReasoningOutcome;
use kairos::reasoner::config::{ExecutionMode, ReasonerConfig};

#[derive(Parser)]
#[command(name = "kairos", version, about = "Temporal logic inference over annotated graphs")]
struct Cli {
    /// Reasoner configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the configuration file.
#[derive(clap::Args)]
struct RunArgs {
    /// Program file (JSON).
    #[arg(long)]
    program: PathBuf,

    /// Last timestep to compute.
    #[arg(long)]
    timesteps: Option<usize>,

    /// Ground rules on the rayon thread pool.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for parallel grounding.
    #[arg(long)]
    threads: Option<usize>,

    /// Record a trace entry for every change.
    #[arg(long)]
    atom_trace: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program and print the final worlds.
    Run {
        #[command(flatten)]
        args: RunArgs,

        /// Print the full result (worlds, num_ga, trace) as JSON.
        #[arg(long)]
        json: bool,

        /// Also print the rule trace.
        #[arg(long)]
        trace: bool,
    },

    /// Run a program and list atoms of the given labels within a bound.
    Query {
        #[command(flatten)]
        args: RunArgs,

        /// Labels to report (comma-separated).
        #[arg(long)]
        labels: String,

        /// Lower end of the bound atoms must lie within.
        #[arg(long, default_value = "0")]
        lower: f64,

        /// Upper end of the bound atoms must lie within.
        #[arg(long, default_value = "1")]
        upper: f64,
    },

    /// Load a program and configuration and report any errors.
    Check {
        /// Program file (JSON).
        #[arg(long)]
        program: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ReasonerConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).into_diagnostic()?;
            Ok(ReasonerConfig::from_toml_str(&text)?)
        }
        None => Ok(ReasonerConfig::default()),
    }
}

fn run(config: Option<&PathBuf>, args: &RunArgs) -> Result<ReasoningOutcome> {
    let mut config = load_config(config)?;
    if let Some(t) = args.timesteps {
        config.timesteps = t;
    }
    if args.parallel {
        config.execution = ExecutionMode::Parallel;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    config.atom_trace |= args.atom_trace;

    let program = Program::from_path(&args.program)?;
    let mut reasoner = program.into_reasoner(config)?;
    Ok(reasoner.reason()?)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { args, json, trace } => {
            let outcome = run(cli.config.as_ref(), &args)?;
            if json {
                let export = RunExport::from_outcome(&outcome);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&export).into_diagnostic()?
                );
                return Ok(());
            }

            println!(
                "timesteps: {}{}",
                outcome.timesteps,
                if outcome.converged_early {
                    " (converged early)"
                } else {
                    ""
                }
            );
            if let Some(report) = &outcome.halted {
                println!("halted: {report}");
            }
            println!("num_ga: {:?}", outcome.num_ga);

            let last = outcome.timesteps.saturating_sub(1);
            for row in world_rows(&outcome.interpretation.snapshot(last)) {
                if row.lower == 0.0 && row.upper == 1.0 {
                    continue;
                }
                println!(
                    "  {:<6} {:<16} {:<16} [{}, {}]",
                    row.kind, row.component, row.label, row.lower, row.upper
                );
            }

            if trace {
                println!("trace:");
                for row in trace_rows(&outcome.trace) {
                    println!(
                        "  t={} fp={} {} {} [{}, {}] -> [{}, {}] {} '{}' {}",
                        row.t,
                        row.fp_op,
                        row.component,
                        row.label,
                        row.old_lower,
                        row.old_upper,
                        row.new_lower,
                        row.new_upper,
                        row.triggered_by,
                        row.name,
                        row.message
                    );
                }
            }
        }

        Commands::Query {
            args,
            labels,
            lower,
            upper,
        } => {
            let bound = Interval::closed(lower, upper)?;
            let labels: Vec<Label> = labels
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Label::from)
                .collect();
            let outcome = run(cli.config.as_ref(), &args)?;
            let last = outcome.timesteps.saturating_sub(1);
            let rows = filter_rows(&outcome.interpretation.snapshot(last), &labels, &bound);
            if rows.is_empty() {
                println!("No atoms within {bound}.");
            }
            for row in rows {
                println!(
                    "{:<16} {:<16} [{}, {}]",
                    row.component, row.label, row.lower, row.upper
                );
            }
        }

        Commands::Check { program } => {
            let config = load_config(cli.config.as_ref())?;
            let program = Program::from_path(&program)?;
            let reasoner = program.into_reasoner(config)?;
            println!(
                "ok: {} nodes, {} edges, {} rules, {} facts",
                reasoner.interpretation().graph().node_count(),
                reasoner.interpretation().graph().edge_count(),
                reasoner.rules().len(),
                reasoner.facts().len()
            );
        }
    }

    Ok(())
}
