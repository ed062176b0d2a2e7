mod error;

use clap::{Args, Parser, Subcommand, ValueEnum};
use error::{CliError, CliResult};
use rf_apparatus::Apparatus;
use rf_exec::{DryRun, ExecError, ExecuteOptions, Experiment, execute};
use rf_protocol::Protocol;
use rf_results::ExperimentStore;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rf-cli")]
#[command(about = "reflux - flow chemistry protocol compiler and runner", long_about = None)]
struct Cli {
    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an apparatus file, and optionally a protocol against it
    Validate {
        /// Path to the apparatus YAML file
        apparatus: PathBuf,
        /// Path to a protocol YAML or JSON file
        protocol: Option<PathBuf>,
    },
    /// Print the component and tubing tables of an apparatus
    Summarize {
        /// Path to the apparatus YAML file
        apparatus: PathBuf,
        /// Also describe every connection in prose
        #[arg(long)]
        describe: bool,
    },
    /// Compile a protocol and print its schedule
    Compile {
        /// Path to the apparatus YAML file
        apparatus: PathBuf,
        /// Path to the protocol YAML or JSON file
        protocol: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
        /// Print the procedure timeline instead of the instruction schedule
        #[arg(long)]
        timeline: bool,
    },
    /// Execute a protocol
    Run(RunArgs),
    /// List stored experiments
    Experiments {
        /// Experiment store directory
        dir: PathBuf,
        /// Show the manifest, data and log of one experiment
        #[arg(long)]
        show: Option<String>,
        /// Delete one experiment
        #[arg(long, conflicts_with = "show")]
        delete: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

#[derive(Args)]
struct RunArgs {
    /// Path to the apparatus YAML file
    apparatus: PathBuf,
    /// Path to the protocol YAML or JSON file
    protocol: PathBuf,
    /// Simulate the run without touching devices
    #[arg(long)]
    dry_run: bool,
    /// Fast-forward a dry run by this factor (at least 2)
    #[arg(long, value_name = "N")]
    speed: Option<u32>,
    /// Log device failures instead of stopping the run
    #[arg(long)]
    lenient: bool,
    /// Experiment store directory (defaults to .reflux/experiments next to the protocol)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Do not write sensor data
    #[arg(long)]
    no_data: bool,
    /// Do not write the run log
    #[arg(long)]
    no_log: bool,
    /// Skip the confirmation prompt before a real run
    #[arg(short, long)]
    yes: bool,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate {
            apparatus,
            protocol,
        } => cmd_validate(&apparatus, protocol.as_deref()),
        Commands::Summarize {
            apparatus,
            describe,
        } => cmd_summarize(&apparatus, describe),
        Commands::Compile {
            apparatus,
            protocol,
            format,
            timeline,
        } => cmd_compile(&apparatus, &protocol, format, timeline),
        Commands::Run(args) => cmd_run(&args),
        Commands::Experiments { dir, show, delete } => {
            cmd_experiments(dir, show.as_deref(), delete.as_deref())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_protocol<'a>(path: &Path, apparatus: &'a Apparatus) -> CliResult<Protocol<'a>> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let protocol = if is_json {
        rf_protocol::load_json(path, apparatus)?
    } else {
        rf_protocol::load_yaml(path, apparatus)?
    };
    Ok(protocol)
}

fn cmd_validate(apparatus_path: &Path, protocol_path: Option<&Path>) -> CliResult<()> {
    println!("Validating apparatus: {}", apparatus_path.display());
    let apparatus = rf_apparatus::load_yaml(apparatus_path)?;
    println!(
        "✓ {} is valid ({} components, {} connections)",
        apparatus.name(),
        apparatus.components().len(),
        apparatus.connections().len()
    );

    if let Some(path) = protocol_path {
        println!("Validating protocol: {}", path.display());
        let protocol = load_protocol(path, &apparatus)?;
        let compiled = protocol.compile()?;
        println!(
            "✓ {} compiles ({} procedures, {} instructions, {:.3} s)",
            protocol.name(),
            protocol.procedures().len(),
            compiled.instruction_count(),
            compiled.duration
        );
        if !compiled.warnings.is_empty() {
            println!("  {} warning(s)", compiled.warnings.len());
        }
    }
    Ok(())
}

fn cmd_summarize(apparatus_path: &Path, describe: bool) -> CliResult<()> {
    let apparatus = rf_apparatus::load_yaml(apparatus_path)?;
    println!("{}", apparatus.summary());
    if describe {
        println!("{}", apparatus.describe());
    }
    Ok(())
}

fn cmd_compile(
    apparatus_path: &Path,
    protocol_path: &Path,
    format: Format,
    timeline: bool,
) -> CliResult<()> {
    let apparatus = rf_apparatus::load_yaml(apparatus_path)?;
    let protocol = load_protocol(protocol_path, &apparatus)?;

    if timeline {
        println!("{:<20} {:>10} {:>10}  params", "component", "start", "stop");
        for span in protocol.timeline()? {
            let params = span
                .params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "{:<20} {:>10.3} {:>10.3}  {}",
                span.component, span.start, span.stop, params
            );
        }
        return Ok(());
    }

    let compiled = protocol.compile()?;
    let rendered = match format {
        Format::Yaml => compiled.to_yaml(&apparatus)?,
        Format::Json => compiled.to_json(&apparatus)?,
    };
    println!("{rendered}");
    for warning in &compiled.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

fn dry_run_mode(args: &RunArgs) -> CliResult<DryRun> {
    match (args.dry_run, args.speed) {
        (_, Some(n)) if n < 2 => Err(CliError::InvalidInput(format!(
            "--speed must be at least 2, got {n}"
        ))),
        (_, Some(n)) => Ok(DryRun::FastForward(n)),
        (true, None) => Ok(DryRun::Simulate),
        (false, None) => Ok(DryRun::Off),
    }
}

fn confirm(prompt: &str) -> CliResult<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn cmd_run(args: &RunArgs) -> CliResult<()> {
    let dry_run = dry_run_mode(args)?;
    let apparatus = rf_apparatus::load_yaml(&args.apparatus)?;
    let mut protocol = load_protocol(&args.protocol, &apparatus)?;
    let compiled = protocol.compile()?;

    println!(
        "Protocol {}: {} instructions over {:.3} s",
        protocol.name(),
        compiled.instruction_count(),
        compiled.duration
    );
    if !dry_run.is_dry()
        && !args.yes
        && !confirm(&format!("Run {} on {}?", protocol.name(), apparatus.name()))?
    {
        println!("Aborted");
        return Ok(());
    }

    let store = match &args.data_dir {
        Some(dir) => ExperimentStore::new(dir.clone())?,
        None => ExperimentStore::for_protocol(&args.protocol)?,
    };
    let experiment = Experiment::new(&protocol)?;
    let mut options = ExecuteOptions::dry_run(dry_run);
    if args.lenient {
        options = options.lenient();
    }
    if !args.no_data {
        options.data_file = Some(store.data_path(experiment.id()));
    }
    if !args.no_log {
        options.log_file = Some(store.log_path(experiment.id()));
    }

    println!("Starting experiment {}", experiment.id());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let control = experiment.control();
    let result = runtime.block_on(async {
        let run = execute(&mut protocol, &experiment, &options);
        tokio::pin!(run);
        let mut listening = true;
        loop {
            tokio::select! {
                result = &mut run => break result,
                signal = tokio::signal::ctrl_c(), if listening => {
                    match signal {
                        Ok(()) => {
                            println!("\nCancelling experiment {}", experiment.id());
                            control.cancel();
                        }
                        Err(e) => warn!("Cannot listen for Ctrl-C: {e}"),
                    }
                    listening = false;
                }
            }
        }
    });

    store.save_manifest(&experiment.manifest(compiled.duration, dry_run.is_dry()))?;

    match result {
        Ok(()) => println!("✓ Experiment {} completed", experiment.id()),
        Err(ExecError::Cancelled) => println!("Experiment {} cancelled", experiment.id()),
        Err(e) => return Err(e.into()),
    }
    println!("  Instructions: {}", experiment.executed().len());
    for (sensor, points) in experiment.data() {
        println!("  {sensor}: {} datapoints", points.len());
    }
    println!("  Stored in {}", store.experiment_dir(experiment.id()).display());
    Ok(())
}

fn cmd_experiments(dir: PathBuf, show: Option<&str>, delete: Option<&str>) -> CliResult<()> {
    let store = ExperimentStore::new(dir)?;

    if let Some(id) = delete {
        store.delete(id)?;
        println!("✓ Deleted experiment {id}");
        return Ok(());
    }

    if let Some(id) = show {
        let manifest = store.load_manifest(id)?;
        println!("Experiment {}", manifest.experiment_id);
        println!("  Protocol:  {}", manifest.protocol);
        println!("  Apparatus: {}", manifest.apparatus);
        println!("  Created:   {}", manifest.created);
        if let Some(outcome) = manifest.outcome {
            println!("  Outcome:   {outcome:?}");
        }
        println!("  Duration:  {:.3} s", manifest.duration_s);
        println!("  Dry run:   {}", manifest.dry_run);

        println!("\nInstructions:");
        for record in &manifest.executed {
            println!(
                "  {:>10.3} s  {:<16} {:?}",
                record.eet, record.component, record.kind
            );
        }

        let data = store.load_data(id)?;
        println!("\nDatapoints: {}", data.len());
        for record in data.iter().take(10) {
            println!(
                "  {:>10.3} s  {:<16} {} {}",
                record.eet, record.device, record.value, record.unit
            );
        }

        let log = store.load_log(id)?;
        println!("\nLog:");
        for line in log {
            println!("  [{}] {}", line.level, line.message);
        }
        return Ok(());
    }

    let manifests = store.list()?;
    if manifests.is_empty() {
        println!("No experiments found in {}", store.root().display());
    } else {
        println!("Experiments in {}:", store.root().display());
        for manifest in manifests {
            let outcome = manifest
                .outcome
                .map_or_else(|| "unfinished".to_string(), |o| format!("{o:?}"));
            let dry = if manifest.dry_run { " (dry run)" } else { "" };
            println!(
                "  {}  {}  {}{}",
                manifest.experiment_id, manifest.protocol, outcome, dry
            );
        }
    }
    Ok(())
}
