//! Fluid Bridge Host CLI
//!
//! Runs on your PC and talks to the command server over USB serial.
//!
//! ## Usage
//!
//! ```bash
//! # List available serial ports
//! cargo run --features std --bin fluid_host -- --list-ports
//!
//! # Interactive shell (auto-detects the board)
//! cargo run --features std --bin fluid_host
//!
//! # One-shot reads
//! cargo run --features std --bin fluid_host -- --port /dev/ttyACM0 read fs
//! cargo run --features std --bin fluid_host -- print a0
//!
//! # Log all inputs to CSV, 10 Hz, 600 rows
//! cargo run --features std --bin fluid_host -- poll --interval-ms 100 --count 600 --csv flow.csv
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serialport::SerialPort;

use fluid_bridge::domain::Target;
use fluid_bridge::host::{csv_cell, describe, SensorClient};

/// Raspberry Pi (RP2040/RP2350 boards)
const VID_RASPBERRY_PI: u16 = 0x2e8a;
/// Arduino SA
const VID_ARDUINO: u16 = 0x2341;

#[derive(Parser)]
#[command(name = "fluid_host")]
#[command(version)]
#[command(about = "Query analog inputs and the flow sensor over USB serial", long_about = None)]
struct Cli {
    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Serial port (auto-detected when omitted)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (ignored by USB CDC, kept for UART bridges)
    #[arg(short, long, default_value_t = 115_200)]
    baud: u32,

    /// Reply timeout in milliseconds
    #[arg(long, default_value_t = 1_000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send READ and decode the binary frame
    Read {
        /// a0, a1 or fs
        target: String,
    },
    /// Send PRINT and show the text value
    Print {
        /// a0, a1 or fs
        target: String,
    },
    /// READ all targets repeatedly
    Poll {
        /// Pause between rows
        #[arg(short, long, default_value_t = 1_000)]
        interval_ms: u64,
        /// Number of rows, 0 for no limit
        #[arg(short, long, default_value_t = 0)]
        count: u64,
        /// Also write `elapsed_ms,a0,a1,fs` rows to this file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Interactive shell (default)
    Shell,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.list_ports {
        list_ports();
        return Ok(());
    }

    let port_name = match cli.port.clone().or_else(find_device_port) {
        Some(name) => name,
        None => bail!("no device found; use --list-ports or --port <PORT>"),
    };

    // On Windows, COM ports >= 10 need the \\.\COMxx format
    #[cfg(target_os = "windows")]
    let port_name = if port_name.starts_with("COM") && !port_name.starts_with(r"\\") {
        format!(r"\\.\{}", port_name)
    } else {
        port_name
    };

    info!("Opening {} at {} baud", port_name, cli.baud);
    let mut port = serialport::new(&port_name, cli.baud)
        .timeout(Duration::from_millis(cli.timeout_ms))
        .flow_control(serialport::FlowControl::None)
        .open()
        .with_context(|| format!("failed to open {}", port_name))?;

    // CDC devices only start talking once DTR is asserted
    port.write_data_terminal_ready(true)?;
    thread::sleep(Duration::from_millis(100));
    port.clear(serialport::ClearBuffer::Input)?;

    let mut client = SensorClient::new(port);

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Read { target } => {
            let value = client.read(parse_target(&target)?)?;
            println!("{}", value);
        }
        Commands::Print { target } => {
            let value = client.print(parse_target(&target)?)?;
            println!("{}", value);
        }
        Commands::Poll {
            interval_ms,
            count,
            csv,
        } => poll(&mut client, interval_ms, count, csv)?,
        Commands::Shell => shell(&mut client, &port_name)?,
    }

    Ok(())
}

fn parse_target(name: &str) -> Result<Target> {
    Target::from_name(name).ok_or_else(|| anyhow!("unknown target '{}', use a0, a1 or fs", name))
}

fn poll(
    client: &mut SensorClient<Box<dyn SerialPort>>,
    interval_ms: u64,
    count: u64,
    csv: Option<PathBuf>,
) -> Result<()> {
    let mut csv = match csv {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            writeln!(writer, "elapsed_ms,a0,a1,fs")?;
            info!("Writing CSV to {}", path.display());
            Some(writer)
        }
        None => None,
    };

    let start = Instant::now();
    let interval = Duration::from_millis(interval_ms);

    let mut rows = 0u64;
    while count == 0 || rows < count {
        let row = client.poll_all()?;
        let elapsed = start.elapsed().as_millis();

        println!(
            "[{:>8} ms] A0={:<6} A1={:<6} FS={}",
            elapsed,
            csv_cell(&row[0]),
            csv_cell(&row[1]),
            describe(&row[2])
        );

        if let Some(writer) = csv.as_mut() {
            writeln!(
                writer,
                "{},{},{},{}",
                elapsed,
                csv_cell(&row[0]),
                csv_cell(&row[1]),
                csv_cell(&row[2])
            )?;
            writer.flush()?;
        }

        rows += 1;
        thread::sleep(interval);
    }

    Ok(())
}

fn shell(client: &mut SensorClient<Box<dyn SerialPort>>, port_name: &str) -> Result<()> {
    println!("Connected to {}", port_name);
    println!("Type a command (e.g. READ A0, PRINT FS), 'help' or 'exit'\n");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input == "exit" || input == "quit" {
            break;
        }

        if input == "help" {
            print_help();
            continue;
        }

        match client.request_raw(input) {
            Ok(reply) => println!("{}", describe(&reply)),
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn list_ports() {
    println!("Available serial ports:");
    match serialport::available_ports() {
        Ok(ports) => {
            if ports.is_empty() {
                println!("  (none)");
            }
            for port in ports {
                print!("  {}", port.port_name);
                match &port.port_type {
                    serialport::SerialPortType::UsbPort(info) => {
                        println!(" - USB (VID: 0x{:04x}, PID: 0x{:04x})", info.vid, info.pid);
                        if let Some(ref product) = info.product {
                            println!("      Product: {}", product);
                        }
                    }
                    serialport::SerialPortType::BluetoothPort => println!(" - Bluetooth"),
                    serialport::SerialPortType::PciPort => println!(" - PCI"),
                    serialport::SerialPortType::Unknown => println!(" - Unknown"),
                }
            }
        }
        Err(e) => {
            eprintln!("Error listing ports: {}", e);
        }
    }
}

fn find_device_port() -> Option<String> {
    let ports = serialport::available_ports().ok()?;

    ports.into_iter().find_map(|port| match &port.port_type {
        serialport::SerialPortType::UsbPort(info)
            if info.vid == VID_RASPBERRY_PI || info.vid == VID_ARDUINO =>
        {
            Some(port.port_name)
        }
        _ => None,
    })
}

fn print_help() {
    println!("Commands are sent to the device verbatim:");
    println!("  READ A0 | READ A1 | READ FS     - Binary frame reply");
    println!("  PRINT A0 | PRINT A1 | PRINT FS  - Text reply");
    println!("  help                            - Show this help");
    println!("  exit                            - Exit shell");
}
