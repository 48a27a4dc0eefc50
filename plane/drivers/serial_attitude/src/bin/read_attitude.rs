use clap::Parser;
use serial_attitude::port::{self, SerialSettings};
use serial_attitude::{AttitudeReader, AxisMapping, Link, LinkEvent, LinkOptions};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Prints raw and mapped attitude frames from a serial sensor.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Serial port; defaults to the first one found
    #[arg(short, long)]
    port: Option<String>,

    #[arg(short, long, default_value_t = serial_attitude::DEFAULT_BAUD_RATE)]
    baud_rate: u32,

    /// Output sources for pitch,roll,yaw; prefix with '-' to invert
    #[arg(short, long, default_value = "pitch,roll,yaw")]
    mapping: AxisMapping,

    /// Send the calibration command once connected
    #[arg(long)]
    calibrate: bool,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,
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

    let mut settings = SerialSettings::new(&port::select_port(args.port.as_deref())?);
    settings.baud_rate = args.baud_rate;

    let link = Link::open(&settings, args.mapping.shared(), LinkOptions::default())?;
    println!("Connected to {}", link.name());

    if args.calibrate {
        link.calibrate()?;
        println!("Calibrating... keep sensor flat and still");
    }

    loop {
        for event in link.drain() {
            match event {
                LinkEvent::Sample(sample) => {
                    println!(
                        "raw:    pitch: {: >8.1} roll: {: >8.1} yaw: {: >8.1}\n\
                         mapped: pitch: {: >8.1} roll: {: >8.1} yaw: {: >8.1}",
                        sample.raw.pitch,
                        sample.raw.roll,
                        sample.raw.yaw,
                        sample.mapped.pitch,
                        sample.mapped.roll,
                        sample.mapped.yaw,
                    );
                }
                LinkEvent::Disconnected(reason) => {
                    eprintln!("Disconnected: {}", reason);
                    return Ok(());
                }
            }
        }

        thread::sleep(Duration::from_millis(20));
    }
}
