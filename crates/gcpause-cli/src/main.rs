//! gcpause CLI - collector pause profiling against a simulated host
//!
//! Usage:
//!   gcpause simulate            Run simulated collections and print each pause
//!   gcpause config init         Write the default `.gcpause/config.toml`
//!   gcpause config show         Print the effective configuration
//!   gcpause kinds               List known collector kinds and flags

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use gcpause_core::{
    GcEvent, GcFlags, GcInfo, GcPauseConfig, GcType, OutputFormat, SimulationConfig,
};
use gcpause_profiler::{ChannelScheduler, Profiler, SimulatedCollector};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "gcpause")]
#[command(author, version, about = "Collector pause profiler")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding `.gcpause/config.toml`
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run simulated collections and print each delivered pause
    Simulate {
        /// Number of collections
        #[arg(short = 'n', long)]
        cycles: Option<usize>,

        /// Length of each pause in milliseconds
        #[arg(long)]
        pause_ms: Option<f64>,

        /// Mutator time between collections in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Output format (text, json)
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Warn about pauses longer than this many milliseconds
        #[arg(long)]
        slow_ms: Option<f64>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// List known collector kinds and flags
    Kinds,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write the default configuration file
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Simulate {
            cycles,
            pause_ms,
            interval_ms,
            format,
            slow_ms,
        } => {
            let mut config = load_config(&cli.root)?;
            if let Some(cycles) = cycles {
                config.simulation.cycles = cycles;
            }
            if let Some(pause_ms) = pause_ms {
                config.simulation.pause_ms = pause_ms;
            }
            if let Some(interval_ms) = interval_ms {
                config.simulation.interval_ms = interval_ms;
            }
            if let Some(format) = format {
                config.output.format = format;
            }
            if slow_ms.is_some() {
                config.profiler.slow_pause_ms = slow_ms;
            }
            config.validate()?;
            cmd_simulate(config).await.map(|_| ())
        }
        Commands::Config { action } => cmd_config(&cli.root, action),
        Commands::Kinds => {
            cmd_kinds();
            Ok(())
        }
    }
}

fn load_config(root: &Path) -> Result<GcPauseConfig> {
    GcPauseConfig::load_or_default(root)
        .with_context(|| format!("Failed to load config under {}", root.display()))
}

/// Returns the number of pauses delivered to the observer
async fn cmd_simulate(config: GcPauseConfig) -> Result<u64> {
    let collector = Rc::new(SimulatedCollector::new());
    let (scheduler, mut delivery) = ChannelScheduler::channel();
    let profiler = Profiler::builder(collector.clone(), Rc::new(scheduler))
        .config(config.profiler.clone())
        .build();

    let format = config.output.format;
    let delivered = Rc::new(Cell::new(0u64));
    let counter = delivered.clone();
    profiler.register(Rc::new(
        move |start: DateTime<Utc>, duration_ms: f64, gc_type: GcType, gc_flags: GcFlags| {
            counter.set(counter.get() + 1);
            print_event(format, &GcEvent::new(start, duration_ms, gc_type, gc_flags));
        },
    ));

    info!(
        "Simulating {} collections of {} ms every {} ms",
        config.simulation.cycles, config.simulation.pause_ms, config.simulation.interval_ms
    );

    let mutator = run_mutator(&collector, &config.simulation);
    tokio::pin!(mutator);
    let result = tokio::select! {
        biased;
        res = &mut mutator => res,
        _ = delivery.run() => Ok(()),
    };
    delivery.run_pending();

    info!(
        "{} collections, {} pauses delivered",
        collector.collections(),
        delivered.get()
    );
    result.map(|()| delivered.get())
}

/// Allocate, collect, yield; once per cycle
async fn run_mutator(collector: &SimulatedCollector, sim: &SimulationConfig) -> Result<()> {
    let pause = Duration::try_from_secs_f64(sim.pause_ms / 1000.0)
        .with_context(|| format!("Pause length {} ms is out of range", sim.pause_ms))?;
    let interval = Duration::from_millis(sim.interval_ms);

    for cycle in 0..sim.cycles {
        let kind = GcType(sim.kinds[cycle % sim.kinds.len()]);
        let flags = match sim.forced_every {
            Some(n) if (cycle + 1) % n == 0 => GcFlags::FORCED,
            _ => GcFlags::NONE,
        };

        // Stop-the-world: the pause blocks the loop thread
        collector
            .collect(kind, flags, || std::thread::sleep(pause))
            .with_context(|| format!("Collection {} failed", cycle + 1))?;

        tokio::time::sleep(interval).await;
        tokio::task::yield_now().await;
    }
    Ok(())
}

fn print_event(format: OutputFormat, event: &GcEvent) {
    let info = GcInfo::from(event);
    match format {
        OutputFormat::Text => {
            let kind = info
                .kind
                .clone()
                .unwrap_or_else(|| event.gc_type.code().to_string());
            let forced = if info.forced { " (forced)" } else { "" };
            println!("{} {:.3}{}", kind, info.duration_ms, forced);
        }
        OutputFormat::Json => match serde_json::to_string(&info) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize pause: {}", e),
        },
    }
}

fn cmd_config(root: &Path, action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Init => {
            GcPauseConfig::write_default(root).context("Failed to write default config")?;
            info!("Wrote {}", root.join(".gcpause/config.toml").display());
        }
        ConfigCommands::Show => {
            let config = load_config(root)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn cmd_kinds() {
    println!("Collector kinds:");
    for kind in GcType::KNOWN {
        println!("  {:>2}  {}", kind.code(), kind);
    }
    println!();
    println!("Flags:");
    for (flag, name) in [
        (GcFlags::COMPACTED, "Compacted"),
        (GcFlags::CONSTRUCT_RETAINED_OBJECT_INFOS, "ConstructRetainedObjectInfos"),
        (GcFlags::FORCED, "Forced"),
    ] {
        println!("  {:>2}  {}", flag.bits(), name);
    }
}
