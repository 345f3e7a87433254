use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, Result};
use surge_telemetry::{GpuFamily, GpuMonitor, PowerSnapshot, SpecCatalog};

mod config;
mod logging;
mod record;
mod report;

#[derive(Debug, Parser)]
#[command(
    name = "surge",
    version,
    about = "Resolve GPU power telemetry recordings into watt readings and health verdicts"
)]
struct Cli {
    /// Log level for stderr diagnostics (off, error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a full report for every sample in a recording
    Show {
        /// Recording file; stdin when omitted or "-"
        file: Option<PathBuf>,
    },
    /// Replay a recording as a feed, one compact line per sample
    Watch {
        /// Recording file; stdin when omitted or "-"
        file: Option<PathBuf>,
        /// Delay between samples (e.g. 500ms, 2s)
        #[arg(long, default_value = "500ms", value_parser = humantime::parse_duration)]
        interval: Duration,
        /// Stop after this many samples; 0 replays the whole recording
        #[arg(long, default_value_t = 0)]
        samples: u32,
    },
    /// Inspect the power spec catalog
    Specs {
        #[command(subcommand)]
        command: SpecsCommands,
    },
}

#[derive(Debug, Subcommand)]
enum SpecsCommands {
    /// List catalog entries, user-registered specs first
    List {
        /// Only show specs whose architecture contains this string
        #[arg(long)]
        architecture: Option<String>,
    },
    /// Resolve a device name the way telemetry resolution would
    Lookup { name: String },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    let mut catalog = SpecCatalog::builtin();
    config::UserConfig::load().apply(&mut catalog);

    match cli.command.unwrap_or(Commands::Show { file: None }) {
        Commands::Show { file } => show(&catalog, file.as_deref()),
        Commands::Watch {
            file,
            interval,
            samples,
        } => watch(&catalog, file.as_deref(), interval, samples),
        Commands::Specs { command } => specs(&catalog, command),
    }
}

/// Resolves one record into a snapshot and a refreshed monitor.
fn resolve(
    catalog: &SpecCatalog,
    rec: &record::SampleRecord,
) -> (PowerSnapshot, GpuMonitor) {
    let snapshot = PowerSnapshot::resolve(catalog, rec.to_sample());

    let mut monitor = GpuMonitor::new();
    let mut source = record::RecordSource::new(rec);
    monitor.refresh(catalog, &mut source);

    (snapshot, monitor)
}

fn show(catalog: &SpecCatalog, file: Option<&Path>) -> Result<()> {
    let records = record::load_records(file)?;
    if records.is_empty() {
        bail!("recording contains no samples");
    }

    for (i, rec) in records.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let (snapshot, monitor) = resolve(catalog, rec);
        report::print_report(&snapshot, &monitor);
    }

    Ok(())
}

fn watch(
    catalog: &SpecCatalog,
    file: Option<&Path>,
    interval: Duration,
    samples: u32,
) -> Result<()> {
    let records = record::load_records(file)?;
    if records.is_empty() {
        bail!("recording contains no samples");
    }

    let limit = if samples == 0 {
        records.len()
    } else {
        samples as usize
    };

    for (i, rec) in records.iter().take(limit).enumerate() {
        if i > 0 {
            thread::sleep(interval);
        }
        let (snapshot, monitor) = resolve(catalog, rec);
        println!("{}", report::compact_line(&snapshot, &monitor));
    }

    Ok(())
}

fn specs(catalog: &SpecCatalog, command: SpecsCommands) -> Result<()> {
    match command {
        SpecsCommands::List { architecture } => {
            let filter = architecture.map(|a| a.to_lowercase());
            for spec in catalog.all() {
                if let Some(filter) = &filter {
                    if !spec.architecture.to_lowercase().contains(filter) {
                        continue;
                    }
                }
                println!("{}", report::spec_line(spec));
            }
        }
        SpecsCommands::Lookup { name } => match catalog.lookup(&name) {
            Some(spec) => {
                println!("{}", report::spec_line(spec));
                let family = GpuFamily::from_architecture(&spec.architecture);
                if family != GpuFamily::Unknown {
                    println!(
                        "  {family}, NVLink: {}",
                        if family.supports_nvlink() { "yes" } else { "no" }
                    );
                }
            }
            None => bail!("no spec matches {name:?}"),
        },
    }

    Ok(())
}
