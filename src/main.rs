use clap::{Parser, Subcommand};
use serio::config::{Config, ConfigLoader, LogFormat, LoggingConfig};
use serio::{Context, GuardedPort, Parity};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Deadline-aware serial port I/O.",
    long_about = "Lists serial devices and exchanges data with them while enforcing an open budget, a write timeout and an overall I/O deadline taken from serio.toml or SERIO_* environment variables."
)]
struct Args {
    /// Configuration file. Defaults to SERIO_CONFIG, ./serio.toml, then the platform config dir.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Device name or alias, overriding [port] name.
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Baud rate, overriding [port] baud_rate.
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Parity (none, odd, even, mark, space), overriding [port] parity.
    #[arg(long, global = true)]
    parity: Option<Parity>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available serial devices.
    List,
    /// Print the effective configuration as TOML.
    Config,
    /// Write DATA to the port and print one read of the reply.
    Send {
        /// Payload to write.
        data: String,

        /// Size of the read buffer.
        #[arg(long, default_value_t = 128)]
        read_len: usize,

        /// Append a carriage return and line feed to the payload.
        #[arg(long)]
        crlf: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loader = match args.config {
        Some(ref path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let mut config = loader.into_config();
    if let Some(ref port) = args.port {
        config.port.name = port.clone();
    }
    if let Some(baud) = args.baud {
        config.port.baud_rate = baud;
    }
    if let Some(parity) = args.parity {
        config.port.parity = parity;
    }

    init_tracing(&config.logging);
    debug!(?config, "configuration loaded");

    match args.command {
        Command::List => list(),
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Command::Send {
            data,
            read_len,
            crlf,
        } => {
            let mut payload = data.into_bytes();
            if crlf {
                payload.extend_from_slice(b"\r\n");
            }
            send(&config, &payload, read_len)
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output
    match logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_thread_names(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_thread_names(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn list() -> Result<(), Box<dyn std::error::Error>> {
    let ports = serio::list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

fn send(config: &Config, payload: &[u8], read_len: usize) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = match config.timeouts.open_timeout() {
        Some(budget) => Context::with_timeout(budget),
        None => Context::background(),
    };

    let mut port = GuardedPort::open(&ctx, config.port_configuration()?)?;
    port.set_write_timeout(config.timeouts.write_timeout())?;
    if let Some(deadline) = config
        .timeouts
        .deadline()
        .and_then(|d| Instant::now().checked_add(d))
    {
        port.set_deadline(deadline)?;
    }

    let written = port.write(payload)?;
    info!(written, "payload sent");

    let mut buf = vec![0u8; read_len];
    let n = port.read(&mut buf)?;
    println!("Received: {}", String::from_utf8_lossy(&buf[..n]));

    port.close()?;
    Ok(())
}
