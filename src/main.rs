use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod controller;
mod domain;
mod forms;
mod model;
mod session;
mod ui;

use controller::Controller;
use domain::{TadConfig, TadError};
use model::{Model, Status};
use ui::TadUI;

/// A tui based tabular data analyzer and editor.
#[derive(Parser)]
#[command(name = "tad", about = "Tabular data analyzer and editor")]
struct Args {
    /// CSV file to load on startup.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Log verbosity (-v debug, -vv trace), written to tad.log.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.verbose > 0
        && let Err(e) = init_logging(args.verbose)
    {
        eprintln!("Error: could not open tad.log: {e}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn run(args: Args) -> Result<(), TadError> {
    let cfg = TadConfig::default();

    let mut terminal = ratatui::init();
    let size = terminal.size()?;

    let mut model = Model::init(&cfg, size.width as usize, size.height as usize);
    if let Some(path) = args.file {
        model.load_initial(path);
    }

    let ui = TadUI::new(&cfg);
    let controller = Controller::new(&cfg);

    while model.status != Status::Quitting {
        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        }
    }

    Ok(())
}

/// The terminal belongs to the ui, so logs go to a file next to the cwd.
fn init_logging(verbose: u8) -> std::io::Result<()> {
    let level = match verbose {
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("tad={level}").parse().expect("valid directive"));
    let log_file = std::fs::File::create("tad.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}
