//! Baud
//!
//! A lightweight command-line tool for discovering serial ports and watching
//! them connect and disconnect.

mod settings;
mod table;
mod watch_view;

use std::io::{stdout, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use baud_detect::{IdentityDatabase, PortScanner, SystemEnumerator};
use baud_watch::{cancellation, PortWatcher, WatchConfig};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use settings::Settings;
use table::{ListOptions, NO_USB_PORTS};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use watch_view::{ViewMode, WatchView};

#[derive(Parser, Debug)]
#[command(
    name = "baud",
    author,
    version,
    about = "the lightweight cli for discovering and communicating with serial ports"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Load device names from this usb.ids file instead of the bundled catalog
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Disable coloured output, can also use NO_COLOR environment variable
    #[arg(long, global = true, default_value_t = false)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// lists devices connected to serial monitor
    #[command(visible_alias = "l")]
    List {
        /// Show names of connected USB devices (if they contain a VID & PID)
        #[arg(short, long)]
        name: bool,

        /// Show non USB-connected devices
        #[arg(short = 'a', long = "showall")]
        show_all: bool,

        /// Print ports as JSON
        #[arg(long)]
        json: bool,
    },

    /// watches for devices connecting and disconnecting
    #[command(visible_alias = "w")]
    Watch {
        /// Seconds to watch for; 0 watches until interrupted
        #[arg(short, long, default_value_t = 0)]
        duration: u64,

        /// Polling interval in milliseconds (overrides settings)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Print transitions as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// shows the settings file, or writes one with default values
    Config {
        /// Write the current settings to the settings file
        #[arg(long)]
        init: bool,
    },
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "baud=warn,baud_detect=warn,baud_watch=warn",
        1 => "baud=info,baud_detect=info,baud_watch=info",
        _ => "baud=debug,baud_detect=debug,baud_watch=debug",
    };

    // logs go to stderr so they never interleave with tables on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_database(cli: &Cli, settings: &Settings) -> Result<Arc<IdentityDatabase>> {
    match cli.catalog.as_ref().or(settings.catalog_path.as_ref()) {
        Some(path) => {
            let db = IdentityDatabase::from_path(path)
                .with_context(|| format!("failed to load catalog {}", path.display()))?;
            tracing::info!(
                "Loaded {} vendors from {}",
                db.vendor_count(),
                path.display()
            );
            Ok(Arc::new(db))
        }
        None => Ok(IdentityDatabase::bundled()),
    }
}

fn build_scanner(cli: &Cli, settings: &Settings) -> Result<PortScanner> {
    let db = load_database(cli, settings)?;
    Ok(PortScanner::with_enumerator(SystemEnumerator, db).with_config(settings.scanner_config()))
}

fn run_list(scanner: &PortScanner, options: ListOptions, json: bool) -> Result<()> {
    let snapshot = scanner
        .snapshot()
        .context("failed to get serial port list")?;
    let ports = snapshot.sorted();

    if json {
        println!("{}", table::render_json(&ports, options)?);
        return Ok(());
    }

    match table::render_table(&ports, options) {
        Some(rendered) => print!("{}", rendered),
        None => println!("{}", NO_USB_PORTS.truecolor(255, 135, 0)),
    }
    Ok(())
}

async fn run_watch(scanner: PortScanner, config: WatchConfig, mode: ViewMode) -> Result<()> {
    let (event_tx, event_rx) = mpsc::channel(256);
    let (cancel_handle, cancel_token) = cancellation();

    let interrupt = cancel_handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupt received");
            interrupt.cancel();
        }
    });

    let mut watcher = PortWatcher::new(scanner, config);
    let mut view = WatchView::new(stdout(), mode);

    let session = watcher.run(event_tx, cancel_token);
    let render = watch_view::render_events(&mut view, event_rx, &cancel_handle);

    let (outcome, rendered) = tokio::join!(session, render);
    rendered.context("failed to write watch output")?;
    let outcome = outcome?;

    view.finish(outcome)
        .context("failed to write watch output")?;
    watcher.stop();
    Ok(())
}

fn show_config(settings: &Settings, init: bool) -> Result<()> {
    if init {
        let path = settings.save()?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    match Settings::settings_path() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no settings path available"),
    }
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let settings = Settings::load();

    match &cli.command {
        None => {
            println!("(run \"baud help\" for help)");
            Ok(())
        }
        Some(Command::List {
            name,
            show_all,
            json,
        }) => {
            let scanner = build_scanner(&cli, &settings)?;
            let options = ListOptions {
                show_names: *name || settings.show_names,
                show_all: *show_all || settings.show_all,
            };
            run_list(&scanner, options, *json)
        }
        Some(Command::Watch {
            duration,
            interval_ms,
            json,
        }) => {
            let scanner = build_scanner(&cli, &settings)?;
            let interval = interval_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or_else(|| settings.poll_interval());
            let config = WatchConfig::from_secs(*duration).with_interval(interval);
            let mode = if *json {
                ViewMode::Json
            } else if stdout().is_terminal() {
                ViewMode::Interactive
            } else {
                ViewMode::Plain
            };
            run_watch(scanner, config, mode).await
        }
        Some(Command::Config { init }) => show_config(&settings, *init),
    }
}
