use std::process::ExitCode;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};

use crv::auth::FixedCredentials;
use crv::controller::Controller;
use crv::domain::{TVConfig, TVError};
use crv::logging;
use crv::model::{Model, Status};
use crv::ui::TableUI;

fn main() -> ExitCode {
    let config = TVConfig::parse();
    match run(config) {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(config: TVConfig) -> Result<(), TVError> {
    let config = config.expand_path()?;
    let log_path = logging::init(&config)?;
    info!(
        "Starting crv for {}, logging to {}",
        config.path.display(),
        log_path.display()
    );

    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, &config);
    ratatui::restore();
    result
}

fn run_app(terminal: &mut DefaultTerminal, config: &TVConfig) -> Result<(), TVError> {
    let size = terminal.size()?;
    let mut model = Model::init(
        config,
        Box::new(FixedCredentials::demo()),
        size.width as usize,
        size.height as usize,
    );
    let mut ui = TableUI::new();
    let controller = Controller::new(config);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message);
        }
    }

    info!("Bye");
    Ok(())
}
