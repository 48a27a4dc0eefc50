use clap::Parser;
use plane::{Command, Controller, DisplaySink, Overrides, TerminalSink, ViewerConfig};
use serial_attitude::port;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Shows a serial attitude sensor as a rotating aircraft.
///
/// Commands on stdin: c (calibrate), t (connect/disconnect), r (refresh ports),
/// map <pitch,roll,yaw> (apply axis mapping), q (quit).
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML file with viewer settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Send the calibration command once connected
    #[arg(long)]
    calibrate: bool,

    #[command(flatten)]
    overrides: Overrides,
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.list_ports {
        for name in port::available_ports()? {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    config.apply(args.overrides);
    let tick = config.tick();

    let mut sink = TerminalSink::stdout();
    let mut controller = Controller::new(config);

    if controller.port().is_none() {
        if let Err(e) = controller.refresh_ports() {
            warn!("Could not list serial ports: {}", e);
        }
    }

    match controller.connect() {
        Ok(()) => {
            if args.calibrate {
                if let Err(e) = controller.calibrate() {
                    sink.notice("Error", &format!("Failed to start calibration: {}", e));
                }
            }
        }
        Err(e) => sink.notice("Connection Error", &format!("Failed to connect:\n{}", e)),
    }

    let mut last_status = controller.status().to_string();
    sink.status(&last_status);

    let commands = spawn_stdin_reader();
    loop {
        for line in commands.try_iter() {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(command) => {
                    if !controller.execute(command, &mut sink) {
                        return Ok(());
                    }
                    last_status = controller.status().to_string();
                }
                Err(e) => sink.notice("Error", &e.to_string()),
            }
        }

        for update in controller.tick() {
            sink.show(&update);
        }

        if controller.status() != last_status {
            last_status = controller.status().to_string();
            sink.status(&last_status);
        }

        thread::sleep(tick);
    }
}
