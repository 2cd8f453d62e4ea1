//! Check the stimulus workbooks before a participant arrives.
//!
//! Run from the experiment directory:
//!   preflight
//!
//! Loads exactly what a session loads (all three sets and their optimal
//! references) and reports what it found. Exits non-zero on the first problem.

use std::process;

use forced_choice::config::FAILURE_EXIT_CODE;
use forced_choice::stimuli::StimulusPlan;
use forced_choice::ExperimentConfig;
use tracing::error;

fn main() {
    tracing_subscriber::fmt::init();

    let config = ExperimentConfig::default();
    let plan = match StimulusPlan::load(&config) {
        Ok(plan) => plan,
        Err(e) => {
            error!("{e}");
            process::exit(FAILURE_EXIT_CODE);
        }
    };

    for stimuli in [&plan.practice, &plan.first, &plan.second] {
        let mut missing = 0;
        for row in &stimuli.rows {
            for image in [&row.left_img, &row.right_img] {
                if !config.input_dir.join(image).is_file() {
                    error!("{}: trial {} image not found: {}", stimuli.phase.label(), row.row + 1, image);
                    missing += 1;
                }
            }
        }
        println!(
            "{:<9} {:>4} trials  reference={}  missing images={}",
            stimuli.phase.label(),
            stimuli.rows.len(),
            stimuli
                .reference
                .as_ref()
                .map(|r| r.len().to_string())
                .unwrap_or_else(|| "-".to_owned()),
            missing
        );
        if missing > 0 {
            process::exit(FAILURE_EXIT_CODE);
        }
    }
}
