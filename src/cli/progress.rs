//! Progress display for conversion runs

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::errors::{AppError, Result};

/// Progress bar counting converted routes
///
/// Draws to stderr so it never mixes with command output. Returns a hidden
/// bar when `enabled` is false.
pub fn route_progress_bar(total_routes: usize, enabled: bool) -> Result<ProgressBar> {
    if !enabled {
        return Ok(ProgressBar::hidden());
    }

    let bar = ProgressBar::with_draw_target(
        Some(total_routes as u64),
        ProgressDrawTarget::stderr(),
    );
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} routes ({eta})")
            .map_err(|e| AppError::generic(format!("Progress bar template error: {}", e)))?
            .progress_chars("##-"),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(bar)
}

/// Spinner for steps without a known length
pub fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .map_err(|e| AppError::generic(format!("Spinner template error: {}", e)))?
            .tick_strings(&["◐", "◓", "◑", "◒"]),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}
