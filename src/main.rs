//! mudline - A line-based telnet client for Big5 MUD/BBS servers
//!
//! mudline speaks the wire dialect of traditional-Chinese MUDs: Big5
//! text, ANSI color codes, CR+LF line discipline. Server output is
//! decoded and rendered as styled text; each line you type is encoded
//! back to Big5 and sent.
//!
//! # Quick Start
//!
//! ```text
//! mudline mud.example.org 4000
//! mudline                       # host/port from ~/.mudline/config.toml
//! ```
//!
//! Type `quit` or `exit` to disconnect.

mod config;
mod core;
mod ui;

use std::env;
use std::time::Duration;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::core::ansi::{StyleState, TextRun};
use crate::core::net::NetError;
use crate::core::session::{OutputSink, Session};
use crate::ui::{InputReader, StreamRenderer};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commands that end the session instead of going to the server.
const EXIT_COMMANDS: [&str; 2] = ["quit", "exit"];

fn print_version() {
    eprintln!("mudline {}", VERSION);
}

fn print_help() {
    eprintln!("mudline {} - A line-based telnet client for Big5 MUD/BBS servers", VERSION);
    eprintln!();
    eprintln!("Usage: mudline [OPTIONS] [HOST [PORT]]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  HOST                  Server to connect to");
    eprintln!("  PORT                  Server port (default: 23)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Host and port may also come from ~/.mudline/config.toml;");
    eprintln!("command-line values take precedence.");
    eprintln!();
    eprintln!("Commands: type 'quit' or 'exit' to disconnect.");
}

/// Command-line arguments (host/port override the config file)
#[derive(Default)]
struct CliArgs {
    host: Option<String>,
    port: Option<u16>,
}

fn parse_args() -> Result<CliArgs, String> {
    let args: Vec<String> = env::args().collect();
    let mut cli = CliArgs::default();
    let mut positional = Vec::new();

    for arg in &args[1..] {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
            arg => positional.push(arg.to_string()),
        }
    }

    match positional.len() {
        0 => {}
        1 => cli.host = Some(positional.remove(0)),
        2 => {
            cli.host = Some(positional.remove(0));
            let port = positional.remove(0);
            cli.port = Some(
                port.parse()
                    .map_err(|_| format!("Invalid port: {}", port))?,
            );
        }
        _ => return Err("Too many arguments. Use -h for help.".to_string()),
    }

    Ok(cli)
}

fn init_logging() {
    let log_path = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(std::path::PathBuf::from)
        .map(|h| h.join(".mudline").join("mudline.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("mudline.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    // stdout carries the rendered stream, so logs go to a file only
    if let Some(file) = log_file {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("mudline {} starting", VERSION);

    let config = Config::load();
    let host = match cli.host.or_else(|| config.host.clone()) {
        Some(h) => h,
        None => {
            eprintln!("No host given and none configured in ~/.mudline/config.toml");
            eprintln!("Usage: mudline [HOST [PORT]]");
            std::process::exit(1);
        }
    };
    let port = cli.port.or(config.port).unwrap_or(23);

    run_client(&host, port, config.echo_input)
}

fn run_client(host: &str, port: u16, echo_input: bool) -> anyhow::Result<()> {
    let mut renderer = StreamRenderer::new();
    renderer.on_notice(&format!("Connecting to {}:{}...", host, port));

    let mut session = Session::new();
    if let Err(e) = session.start(host, port) {
        renderer.on_notice(&format!("{}", e));
        return Err(e.into());
    }
    renderer.on_notice("Connected.");

    let mut input = InputReader::spawn();
    let idle = Duration::from_millis(10);

    loop {
        let processed = session.process_output(&mut renderer);

        if !session.is_running() {
            // Flush any events that raced with the shutdown
            session.process_output(&mut renderer);
            break;
        }

        while let Some(line) = input.try_read_line() {
            if EXIT_COMMANDS.contains(&line.as_str()) {
                session.stop();
                renderer.on_notice("Disconnected.");
                return Ok(());
            }

            if echo_input && !line.is_empty() {
                renderer.on_run(&TextRun {
                    text: format!("> {}\r\n", line),
                    style: StyleState::default(),
                });
            }

            match session.send_line(&line) {
                Ok(()) => {}
                Err(NetError::WouldBlock) => {
                    renderer.on_notice("Send would block; line may be incomplete, try again.");
                }
                Err(e) => {
                    renderer.on_notice(&format!("Send error: {}", e));
                    return Ok(());
                }
            }
        }

        if input.is_eof() {
            info!("stdin closed, shutting down");
            session.stop();
            break;
        }

        if !processed {
            std::thread::sleep(idle);
        }
    }

    Ok(())
}
