use std::process;

use forced_choice::config::{ABORT_EXIT_CODE, FAILURE_EXIT_CODE};
use forced_choice::stimuli::StimulusPlan;
use forced_choice::{ExperimentConfig, Session};
use macroquad::prelude::*;
use tracing::{error, info, warn};

mod draw;
mod intake;
mod surface;

use surface::MacroquadSurface;

fn window_conf() -> Conf {
    Conf {
        window_title: "forced_choice".to_owned(),
        fullscreen: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::fmt::init();
    // Window close is handled as ESCAPE by the session.
    prevent_quit();

    let config = ExperimentConfig::default();

    // Broken workbooks should fail before anyone fills in the form.
    let plan = match StimulusPlan::load(&config) {
        Ok(plan) => plan,
        Err(e) => {
            error!("{e}");
            process::exit(FAILURE_EXIT_CODE);
        }
    };

    let Some(participant) = intake::collect_participant().await else {
        info!("intake cancelled");
        process::exit(ABORT_EXIT_CODE);
    };

    let mut session = Session::new(MacroquadSurface::new(), config, participant);
    match session.run(&plan).await {
        Ok(_) => {}
        Err(e) if e.is_abort() => {
            warn!("session aborted by operator");
            process::exit(ABORT_EXIT_CODE);
        }
        Err(e) => {
            error!("session failed: {e}");
            process::exit(FAILURE_EXIT_CODE);
        }
    }
}
