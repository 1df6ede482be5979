//! Storage Planner
//!
//! Command-line front end for the storage decision engine: inspect the disks
//! of this host, list scored layouts, and apply one of them.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storage_planner::apply::{backup_handoff, ops::summarize};
use storage_planner::hardware::{DiskInventory, LsblkProbe, ProcMeminfoProbe, SavedLsblkProbe, ScannerConfig};
use storage_planner::strategy::recommended_index;
use storage_planner::{
    two_disk_recommendations, ApplierSettings, Error, HostInventory, OperationResult,
    StorageRecommendation, Strategy, StrategyApplier, StrategyConfig, StrategyGenerator,
    StrategyId,
};

/// Some steps failed; the others were still attempted
const EXIT_STEPS_FAILED: u8 = 1;
/// Nothing was attempted (bad input, unreadable inventory, refused)
const EXIT_ABORTED: u8 = 2;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Storage Planner - pick and apply a storage layout for this host's disks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Read lsblk JSON from this file instead of probing the host
    #[arg(long, global = true, env = "STORAGE_PLANNER_INPUT")]
    input: Option<PathBuf>,

    /// Use this RAM size (bytes) instead of reading /proc/meminfo
    #[arg(long, global = true, env = "STORAGE_PLANNER_RAM_BYTES")]
    ram_bytes: Option<u64>,

    /// Print plain-data JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "STORAGE_PLANNER_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true, env = "STORAGE_PLANNER_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the disks and system facts
    Discover,

    /// List candidate strategies, best first
    Recommend {
        /// Strategy config (YAML) used for the mount points shown
        #[arg(long, env = "STORAGE_PLANNER_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Apply a strategy
    Apply {
        /// Strategy id (partition, single-disk, hardware-raid, speed-tiered,
        /// mirror, backup, scratch-vault, pool, independent)
        #[arg(long)]
        strategy: StrategyId,

        /// Strategy config (YAML); missing fields take their defaults
        #[arg(long, env = "STORAGE_PLANNER_CONFIG")]
        config: Option<PathBuf>,

        /// Applier settings (YAML): host paths and spin-down timeout
        #[arg(long, env = "STORAGE_PLANNER_SETTINGS")]
        settings: Option<PathBuf>,

        /// Describe every step without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Run steps that destroy existing data (formatting, mirror creation)
        #[arg(long, env = "STORAGE_PLANNER_YES")]
        yes: bool,
    },
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args);
    info!("Storage Planner {}", storage_planner::VERSION);

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            exit_code_for(&e)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let scanner = build_inventory(args);
    let inventory = scanner.snapshot().context("failed to inventory disks")?;

    match &args.command {
        Command::Discover => discover(args, &inventory),
        Command::Recommend { config } => {
            let config = load_config(config.as_ref())?;
            recommend(args, &scanner, &inventory, &config)
        }
        Command::Apply {
            strategy,
            config,
            settings,
            dry_run,
            yes,
        } => {
            let config = load_config(config.as_ref())?;
            let settings = load_settings(settings.as_ref())?;
            let request = ApplyRequest {
                id: *strategy,
                dry_run: *dry_run,
                confirmed: *yes,
            };
            apply(args, &scanner, &inventory, request, &config, settings)
        }
    }
}

/// Planner errors that end the run before any step map to `EXIT_ABORTED`
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<Error>() {
        Some(e) if !e.is_fatal() => ExitCode::from(EXIT_STEPS_FAILED),
        _ => ExitCode::from(EXIT_ABORTED),
    }
}

fn build_inventory(args: &Args) -> DiskInventory {
    let inventory = match &args.input {
        Some(path) => DiskInventory::new(
            ScannerConfig::default(),
            Box::new(SavedLsblkProbe::new(path)),
            Box::new(ProcMeminfoProbe::new()),
        ),
        None => DiskInventory::new(
            ScannerConfig::default(),
            Box::new(LsblkProbe::new()),
            Box::new(ProcMeminfoProbe::new()),
        ),
    };

    match args.ram_bytes {
        Some(bytes) => inventory.with_memory_bytes(bytes),
        None => inventory,
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<StrategyConfig> {
    let config = match path {
        Some(path) => StrategyConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => StrategyConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<ApplierSettings> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_yaml::from_str(&raw).with_context(|| format!("invalid settings in {}", path.display()))
        }
        None => Ok(ApplierSettings::default()),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Commands
// =============================================================================

fn discover(args: &Args, inventory: &HostInventory) -> anyhow::Result<ExitCode> {
    if args.json {
        print_json(inventory)?;
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "RAM: {}   hardware RAID: {}",
        storage_planner::hardware::format_bytes(inventory.system.total_ram_bytes),
        if inventory.system.hardware_raid { "yes" } else { "no" }
    );
    for disk in &inventory.disks {
        let status = if disk.is_os_disk {
            "os"
        } else if disk.removable {
            "removable"
        } else if !disk.is_available {
            "in use"
        } else {
            "available"
        };
        println!(
            "{:<12} {:>10} {:<5} {:<10} {}",
            disk.path,
            storage_planner::hardware::format_bytes(disk.size_bytes),
            disk.disk_type,
            status,
            disk.model
        );
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct RecommendOutput<'a> {
    strategies: &'a [Strategy],
    selected: Option<usize>,
    recommendations: &'a [StorageRecommendation],
}

fn recommend(
    args: &Args,
    scanner: &DiskInventory,
    inventory: &HostInventory,
    config: &StrategyConfig,
) -> anyhow::Result<ExitCode> {
    let generator = StrategyGenerator::new().with_layout(config.clone());
    let strategies = generator.recommend(&inventory.disks, inventory.system);
    let selected = recommended_index(&strategies);
    let ranks = two_disk_recommendations(
        &inventory.disks,
        inventory.system,
        scanner.raid_detector(),
        config,
    );

    if args.json {
        print_json(&RecommendOutput {
            strategies: &strategies,
            selected,
            recommendations: &ranks,
        })?;
        return Ok(ExitCode::SUCCESS);
    }

    for s in &strategies {
        let marker = if s.recommended { "*" } else { " " };
        println!("{} [{:>3}] {:<14} {}", marker, s.score, s.id, s.name);
        println!("        {}", s.description);
        println!("        capacity: {}   protection: {}", s.capacity, s.protection);
        if let Some(warning) = &s.warning {
            println!("        warning: {}", warning);
        }
    }

    if !ranks.is_empty() {
        println!();
        println!("Two-disk ranks:");
        for rec in &ranks {
            let marker = if rec.is_default { "*" } else { " " };
            println!("{} {}. {}", marker, rec.rank, rec.name);
        }
    }
    Ok(ExitCode::SUCCESS)
}

struct ApplyRequest {
    id: StrategyId,
    dry_run: bool,
    /// Destructive steps were confirmed with `--yes`
    confirmed: bool,
}

fn apply(
    args: &Args,
    scanner: &DiskInventory,
    inventory: &HostInventory,
    request: ApplyRequest,
    config: &StrategyConfig,
    settings: ApplierSettings,
) -> anyhow::Result<ExitCode> {
    let ApplyRequest {
        id,
        dry_run,
        confirmed,
    } = request;
    let strategies = StrategyGenerator::new()
        .with_layout(config.clone())
        .recommend(&inventory.disks, inventory.system);
    // Independent disks are only offered through the two-disk ranks
    let strategy = match strategies.iter().find(|s| s.id == id) {
        Some(strategy) => strategy.clone(),
        None => match two_disk_recommendations(
            &inventory.disks,
            inventory.system,
            scanner.raid_detector(),
            config,
        )
        .iter()
        .find(|rec| rec.kind.strategy_id() == id)
        {
            Some(rec) => rec.to_strategy(),
            None => {
                let offered: Vec<String> = strategies.iter().map(|s| s.id.to_string()).collect();
                bail!("strategy '{}' does not apply to this host (offered: {})", id, offered.join(", "));
            }
        },
    };

    let applier = StrategyApplier::system(settings);
    let ops = applier.plan(&strategy, &inventory.disks, Some(config));
    if !args.json {
        println!("{}", summarize(&ops));
        println!();
    }

    let destructive: Vec<String> = ops
        .iter()
        .filter(|op| op.is_destructive())
        .map(|op| op.to_string())
        .collect();
    if !dry_run && !confirmed && !destructive.is_empty() {
        bail!(
            "refusing to run steps that erase data without --yes: {}",
            destructive.join("; ")
        );
    }

    let results = applier.apply(&strategy, &inventory.disks, Some(config), dry_run);
    let handoff = backup_handoff(&strategy, config);

    if args.json {
        #[derive(Serialize)]
        struct ApplyOutput<'a> {
            strategy: StrategyId,
            dry_run: bool,
            results: &'a [OperationResult],
            backup: Option<storage_planner::BackupHandoff>,
        }
        print_json(&ApplyOutput {
            strategy: id,
            dry_run,
            results: &results,
            backup: handoff,
        })?;
    } else {
        for result in &results {
            let status = match (result.success, result.changed) {
                (false, _) => "FAIL",
                (true, true) => " ok ",
                (true, false) => " -- ",
            };
            println!("[{}] {:<28} {}", status, result.step, result.message);
            for event in &result.events {
                println!("         {:<5} {}", event.level, event.message);
            }
            if let Some(error) = &result.error {
                println!("         {}", error);
            }
        }
        if let Some(handoff) = handoff {
            println!();
            println!(
                "Backup: {} -> {} ({})",
                handoff.source, handoff.destination, handoff.schedule
            );
        }
    }

    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        warn!("{} of {} steps failed", failed, results.len());
        return Ok(ExitCode::from(EXIT_STEPS_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let enumeration = anyhow::Error::new(Error::Enumeration("lsblk missing".into()))
            .context("failed to inventory disks");
        assert_eq!(exit_code_for(&enumeration), ExitCode::from(EXIT_ABORTED));

        let tool = anyhow::Error::new(Error::tool_unavailable("mergerfs", "apt install mergerfs"));
        assert_eq!(exit_code_for(&tool), ExitCode::from(EXIT_STEPS_FAILED));

        let refused = anyhow::anyhow!("refusing to run steps that erase data without --yes");
        assert_eq!(exit_code_for(&refused), ExitCode::from(EXIT_ABORTED));
    }

    #[test]
    fn test_apply_args() {
        let args = Args::try_parse_from([
            "storage-planner",
            "--input",
            "lsblk.json",
            "apply",
            "--strategy",
            "scratch_vault",
            "--dry-run",
        ])
        .unwrap();
        match args.command {
            Command::Apply {
                strategy,
                dry_run,
                yes,
                ..
            } => {
                assert_eq!(strategy, StrategyId::ScratchVault);
                assert!(dry_run);
                assert!(!yes);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Args::try_parse_from(["storage-planner", "apply", "--strategy", "raid5"]).is_err());
    }
}
