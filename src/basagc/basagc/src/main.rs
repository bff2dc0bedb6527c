extern crate clap;
use crossbeam_channel::bounded; // Shutdown signal from the Ctrl-C handler
use log::{error, info};
use std::str::FromStr;
use std::time::Instant;

use basagc_core::console::ConsoleSink;
use basagc_core::{Computer, ComputerConfig};
use basagc_peripherals::ksp::{field_map, TelemachusPort};
use basagc_peripherals::vagc::DskyServer;

/// Configures command-line interface using clap
fn get_cli_config<'a>() -> clap::ArgMatches<'a> {
    let description = "Apollo-style guidance computer for Kerbal Space Program";
    clap::App::new("basaGC")
        .version("0.1")
        .about(description)
        .arg(
            clap::Arg::with_name("host")
                .long("host")
                .takes_value(true)
                .default_value("127.0.0.1")
                .help("Telemachus host"),
        )
        .arg(
            clap::Arg::with_name("port")
                .long("port")
                .takes_value(true)
                .default_value("8085")
                .help("Telemachus port"),
        )
        .arg(
            clap::Arg::with_name("dsky")
                .long("dsky")
                .takes_value(true)
                .default_value("127.0.0.1:19800")
                .help("Address the DSKY server listens on"),
        )
        .arg(
            clap::Arg::with_name("rate")
                .long("rate")
                .takes_value(true)
                .default_value("4")
                .help("Control loop rate in Hz"),
        )
        .arg(
            clap::Arg::with_name("loss-ticks")
                .long("loss-ticks")
                .takes_value(true)
                .default_value("4")
                .help("Empty telemetry polls before the telemetry loss alarm"),
        )
        .arg(
            clap::Arg::with_name("fuel-threshold")
                .long("fuel-threshold")
                .takes_value(true)
                .default_value("0.1")
                .help("Fuel fraction below which the low fuel alarm is raised"),
        )
        .get_matches()
}

fn parse_arg<T: FromStr>(matches: &clap::ArgMatches, name: &str) -> Option<T> {
    let raw = matches.value_of(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            error!("Invalid value for --{}: {}", name, raw);
            None
        }
    }
}

fn main() {
    env_logger::init();

    // Set up Ctrl-C handler with channel communication
    let (signal_sender, signal_receiver) = bounded(1);
    let handler_result = ctrlc::set_handler(move || {
        if signal_sender.is_full() {
            std::process::exit(-1); // Second Ctrl-C before the loop noticed the first
        }
        let _send_result = signal_sender.send(());
    });

    if let Err(e) = handler_result {
        error!("Signal handler failed: {:?}", e);
        return;
    }

    let cli_matches = get_cli_config();
    let settings = (
        cli_matches.value_of("host"),
        parse_arg::<u16>(&cli_matches, "port"),
        cli_matches.value_of("dsky"),
        parse_arg::<u32>(&cli_matches, "rate"),
        parse_arg::<u32>(&cli_matches, "loss-ticks"),
        parse_arg::<f64>(&cli_matches, "fuel-threshold"),
    );
    let (host, port, dsky_addr, rate, loss_ticks, fuel_threshold) = match settings {
        (Some(h), Some(p), Some(d), Some(r), Some(l), Some(f)) => (h, p, d, r, l, f),
        _ => return,
    };

    let mut config = ComputerConfig::default().with_rate(rate);
    config.loss_polls = loss_ticks;
    config.low_fuel_fraction = fuel_threshold;
    let tick_interval = config.tick_interval;

    let telemachus = match TelemachusPort::new(host, port) {
        Ok(t) => t,
        Err(e) => {
            error!("Telemachus client failed: {}", e);
            return;
        }
    };
    info!("Telemachus datalink at {}", telemachus.url());

    let mut computer = Computer::new(telemachus, field_map(), config);
    let mut dsky = match DskyServer::bind(dsky_addr, computer.keypad()) {
        Ok(d) => d,
        Err(e) => {
            error!("DSKY server failed on {}: {}", dsky_addr, e);
            return;
        }
    };

    // Fixed-rate control loop; the signal is checked between ticks
    let mut next_tick = Instant::now();
    loop {
        if !signal_receiver.is_empty() {
            info!("Shutting down");
            break;
        }

        let now = Instant::now();
        if now < next_tick {
            std::thread::sleep(next_tick - now);
            continue;
        }

        let snapshot = computer.tick(now);
        dsky.refresh(&snapshot);

        // A slow tick pushes the schedule back instead of bursting to catch up
        next_tick += tick_interval;
        if next_tick < now {
            next_tick = now + tick_interval;
        }
    }
}
