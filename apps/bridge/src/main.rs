//! # Gripper Bridge
//!
//! 把外部文本命令（WebSocket 或 TCP 行协议）转发给 Modbus 夹爪，并把设备状态推回客户端。
//!
//! ```bash
//! # 默认配置：/dev/ttyUSB0 @ 115200，WebSocket 监听 127.0.0.1:8001
//! gripper-bridge
//!
//! # 指定配置文件并覆盖串口
//! gripper-bridge --config gripper.toml --serial-port COM4
//!
//! # 打印生效配置
//! gripper-bridge print-config
//! ```

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::BridgeConfig;
use gripper_driver::{Bridge, RegisterSession, SharedFlags};
use gripper_transport::ModbusTransport;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const WORKSPACE_CRATES: [&str; 5] = [
    "gripper_bridge",
    "gripper_driver",
    "gripper_interface",
    "gripper_transport",
    "gripper_protocol",
];

/// 夹爪桥接进程
#[derive(Parser, Debug)]
#[command(name = "gripper-bridge")]
#[command(about = "Relay text commands from a socket to a Modbus gripper", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认读取当前目录下的 gripper-bridge.toml，如存在）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 覆盖监听地址（如 0.0.0.0:8001）
    #[arg(long, global = true)]
    listen: Option<String>,

    /// 覆盖串口设备（仅 Modbus RTU）
    #[arg(long, global = true)]
    serial_port: Option<String>,

    /// 输出 debug 级别日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 以 TOML 形式打印生效配置后退出
    PrintConfig,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> =
            WORKSPACE_CRATES.iter().map(|name| format!("{}={}", name, level)).collect();
        EnvFilter::new(format!("warn,{}", directives.join(",")))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<BridgeConfig> {
    let mut config =
        BridgeConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config
        .apply_overrides(cli.listen.clone(), cli.serial_port.clone())
        .context("Invalid command-line override")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn serve(config: BridgeConfig) -> Result<()> {
    info!("Gripper bridge starting...");
    info!("  Model: {}", config.device.model);
    info!("  Device: {} (unit id {})", config.device.transport, config.device.unit_id);
    info!("  Timeout: {} ms", config.device.timeout_ms);
    info!("  Interface: {} on {}", config.interface.kind, config.interface.listen);

    let flags = SharedFlags::new();
    let signal = flags.clone();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down");
        signal.request_shutdown();
    })
    .context("Failed to install signal handler")?;

    let listen = config.listen_addr()?;
    let interface = config
        .interface
        .kind
        .bind(listen)
        .with_context(|| format!("Failed to start {} interface", config.interface.kind))?;

    let session = RegisterSession::new(
        ModbusTransport::new(config.transport_settings()),
        config.session_config(),
    );

    let bridge = Bridge::start(
        config.device.model.codec(),
        session,
        interface,
        flags,
        config.bridge_options(),
    )
    .context("Failed to start bridge")?;

    info!("Gripper bridge started. Press Ctrl+C to stop.");
    bridge.wait();
    bridge.shutdown().context("Bridge did not shut down cleanly")?;
    info!("Gripper bridge stopped");
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Some(Commands::PrintConfig) => {
            print!("{}", config.to_toml()?);
            Ok(())
        },
        None => serve(config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        },
    }
}
