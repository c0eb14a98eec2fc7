use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use provkit_core::convert::hex_to_bytes;
use provkit_core::protocol::{Command as WireCommand, Frame, encode};
use provkit_core::{
    Directory, Hid, SessionEvent, SessionMode, SessionObserver, SessionSnapshot, StopReason,
    ToolConfig, TracingObserver, clean_license, list_ports, probe, start,
};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Serial license provisioning tool", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial port (overrides the config file)
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Baud rate (overrides the config file)
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List serial ports
    Ports,
    /// Request the HID once and print it
    Probe,
    /// Collect HIDs from devices in batch
    Collect {
        /// Append collected HIDs to this file, one per line
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        limits: Limits,
    },
    /// Write licenses to devices in batch
    Provision {
        /// License directory (TOML)
        #[arg(short, long)]
        licenses: PathBuf,
        #[command(flatten)]
        limits: Limits,
    },
    /// Erase the license of one component
    Clean {
        /// Component id in hex
        #[arg(long)]
        component: String,
    },
    /// Build a frame and print it as hex
    Encode {
        /// Command code in hex
        #[arg(long)]
        command: String,
        /// Component id in hex
        #[arg(long, default_value = "0000")]
        component: String,
        /// Data in hex
        #[arg(long, default_value = "")]
        data: String,
    },
    /// Decode a hex frame
    Decode { frame: String },
    /// Write the effective configuration to a file
    InitConfig { path: PathBuf },
}

#[derive(clap::Args, Debug)]
struct Limits {
    /// Cycles without progress before stopping
    #[arg(long)]
    max_no_progress: Option<u32>,
    /// Seconds without progress before stopping
    #[arg(long)]
    timeout: Option<u64>,
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ToolConfig::load_from_file(path)?,
        None => ToolConfig::default(),
    };
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }

    match args.command {
        Commands::Ports => {
            for port in list_ports()? {
                println!("{:<24} {}", port.name, port.kind);
            }
        }
        Commands::Probe => {
            require_port(&config)?;
            let hid = probe(&mut config.connector(), &config.session.read_policy())?;
            println!("{}", hid);
        }
        Commands::Collect { output, limits } => {
            require_port(&config)?;
            limits.apply(&mut config);
            run_batch(&config, SessionMode::CollectHid, output)?;
        }
        Commands::Provision { licenses, limits } => {
            require_port(&config)?;
            limits.apply(&mut config);
            let directory = Directory::load_file(&licenses)?;
            if directory.is_empty() {
                bail!("{} holds no licenses", licenses.display());
            }
            run_batch(&config, SessionMode::ProvisionLicense(Arc::new(directory)), None)?;
        }
        Commands::Clean { component } => {
            require_port(&config)?;
            let component_id = parse_u16(&component)?;
            clean_license(&mut config.connector(), component_id, &config.session.read_policy())?;
            println!("Component {:04X} cleaned", component_id);
        }
        Commands::Encode {
            command,
            component,
            data,
        } => {
            let bytes = encode(parse_u16(&command)?, parse_u16(&component)?, &hex_to_bytes(&data)?)?;
            println!("{}", provkit_core::convert::bytes_to_hex(&bytes));
        }
        Commands::Decode { frame } => {
            let frame = Frame::from_hex(&frame)?;
            let name = WireCommand::from_code(frame.command)
                .map(|c| c.name())
                .unwrap_or("unknown");
            println!("command      0x{:04X} ({})", frame.command, name);
            println!("component_id 0x{:04X}", frame.component_id);
            println!("data_length  {}", frame.data_length());
            println!("data         {}", frame.data_hex());
        }
        Commands::InitConfig { path } => {
            config.save_to_file(&path)?;
            info!(path = %path.display(), "Configuration written");
        }
    }
    Ok(())
}

impl Limits {
    fn apply(&self, config: &mut ToolConfig) {
        if let Some(max) = self.max_no_progress {
            config.session.max_no_progress = max;
        }
        if let Some(secs) = self.timeout {
            config.session.inactivity_timeout_secs = secs;
        }
    }
}

fn require_port(config: &ToolConfig) -> Result<()> {
    if config.serial.port.is_empty() {
        bail!("no serial port given (use --port or [serial] port in the config file)");
    }
    Ok(())
}

fn parse_u16(value: &str) -> Result<u16> {
    let digits = value
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| anyhow!("invalid hex value {:?}: {}", value, e))
}

/// Logs every event and keeps the final snapshot for the summary.
#[derive(Default)]
struct CliObserver {
    last: Mutex<Option<SessionSnapshot>>,
}

impl SessionObserver for CliObserver {
    fn on_event(&self, event: &SessionEvent) {
        TracingObserver.on_event(event);
        if let SessionEvent::Stopped {
            snapshot: Some(snapshot),
            ..
        } = event
            && let Ok(mut last) = self.last.lock()
        {
            *last = Some(snapshot.clone());
        }
    }
}

fn run_batch(config: &ToolConfig, mode: SessionMode, output: Option<PathBuf>) -> Result<()> {
    let observer = Arc::new(CliObserver::default());
    let mut session = provkit_core::ProvisionSession::with_observer(
        config.connector(),
        mode,
        config.session.clone(),
        Arc::clone(&observer),
    );

    if let Some(path) = output {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        session = session.with_recorder(move |hid: &Hid| -> Result<()> {
            writeln!(file, "{}", hid)?;
            file.flush()?;
            Ok(())
        });
    }

    let handle = session.spawn()?;
    let cancel = handle.cancel_token();
    info!("Press Enter to stop");
    thread::spawn(move || {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_ok() {
            cancel.cancel();
        }
    });

    let reason = handle.join();
    let summary = observer.last.lock().ok().and_then(|s| s.clone());
    if let Some(s) = summary {
        println!(
            "Stopped ({}): {} cycles, {} devices done, {} duplicates, {} failed cycles, {} licenses written, {} failed",
            reason,
            s.cycles,
            s.completed,
            s.duplicates,
            s.failed_cycles,
            s.licenses_written,
            s.licenses_failed
        );
    }

    match reason {
        StopReason::Crashed(msg) => bail!("session worker crashed: {}", msg),
        StopReason::User => Ok(()),
        other => {
            warn!("Run ended: {}", other);
            Ok(())
        }
    }
}
