use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use owo_colors::OwoColorize;
use rte_core::{ShutdownSignal, TargetList, TargetWatcher};
use tracing::info;

use super::service;
use super::targets::describe;
use crate::config::CliConfig;

/// Print targets as they come and go until Ctrl-C.
pub fn run(config: &CliConfig, interval: Option<u64>) -> Result<()> {
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or(config.session.refresh_interval);

    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_clone = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received Ctrl+C, stopping...");
        shutdown_clone.trigger();
    })?;

    let mut targets = TargetList::new(service(config).target_registry(&config.build.name));
    info!(
        "Watching for {} every {}s",
        config.build.executable,
        interval.as_secs()
    );

    let scans = TargetWatcher::new(interval).run(&mut targets, &shutdown, |_, report| {
        for target in &report.added {
            println!("{} {}", "+".green().bold(), describe(target));
        }
        for target in &report.removed {
            println!("{} {}", "-".red().bold(), describe(target));
        }
    });

    info!("Stopped after {} scans", scans);
    Ok(())
}
