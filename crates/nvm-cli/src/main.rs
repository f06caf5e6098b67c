//! Demo driver for the NvM stack: registers one block, writes a payload,
//! drains the queue, and reports whether the round trip survived.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use nvm_core::block::{BlockConfig, BlockType};
use nvm_core::crc::CrcKind;
use nvm_core::medium::MediumConfig;
use nvm_runtime::{NvmRuntime, RuntimeConfig};

/// NvM demo driver
#[derive(Parser, Debug)]
#[command(name = "nvm-cli")]
#[command(about = "Exercise the non-volatile memory manager against a simulated medium", long_about = None)]
struct Args {
    /// Block payload size in bytes
    #[arg(long, default_value_t = 64)]
    block_size: u32,

    /// CRC guarding the block: none, 8, 16, or 32
    #[arg(long, default_value = "16")]
    crc: String,

    /// Medium capacity in bytes
    #[arg(long, default_value_t = 4096)]
    capacity: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

fn parse_crc_kind(value: &str) -> Result<CrcKind> {
    match value {
        "none" => Ok(CrcKind::None),
        "8" => Ok(CrcKind::Crc8),
        "16" => Ok(CrcKind::Crc16),
        "32" => Ok(CrcKind::Crc32),
        other => Err(anyhow!("unrecognized --crc value: {other} (expected none, 8, 16, or 32)")),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("installing tracing subscriber")?;

    let crc_kind = parse_crc_kind(&args.crc)?;

    let mut medium_config = MediumConfig::default();
    medium_config.capacity_bytes = args.capacity;

    let runtime = NvmRuntime::start(RuntimeConfig {
        medium: medium_config,
        ..RuntimeConfig::default()
    });
    let handle = runtime.handle();

    handle.register_block(BlockConfig {
        block_id: 1,
        block_size: args.block_size,
        block_type: BlockType::Native,
        crc_kind,
        priority: 5,
        immediate: false,
        write_protected: false,
        primary_offset: 0,
        rom_default: None,
    })?;

    let payload: Vec<u8> = (0..args.block_size).map(|i| i as u8).collect();
    handle.write_block(1, &payload)?;
    handle.poll_once();

    handle.read_block(1)?;
    handle.poll_once();

    let result = handle.get_job_result(1)?;
    info!(?result, "round trip complete");

    let diagnostics = handle.get_diagnostics();
    info!(
        writes = diagnostics.medium.writes,
        erases = diagnostics.medium.erases,
        "medium diagnostics"
    );

    if result == nvm_core::block::JobResult::Ok {
        println!("OK: block round-tripped successfully");
        Ok(())
    } else {
        eprintln!("FAILED: block round trip did not succeed");
        std::process::exit(1);
    }
}
