use anyhow::Result;
use owo_colors::OwoColorize;
use rte_core::{Target, TargetList};

use super::service;
use crate::config::CliConfig;

pub fn run(config: &CliConfig) -> Result<()> {
    let mut targets = TargetList::new(service(config).target_registry(&config.build.name));
    targets.refresh();

    if !targets.has_targets() {
        println!("No running {} found", config.build.executable);
        return Ok(());
    }

    for target in targets.targets() {
        println!("{}", describe(target));
    }
    Ok(())
}

pub(crate) fn describe(target: &Target) -> String {
    format!(
        "{:>6}  {}  {}",
        target.id().bold(),
        target.display_name(),
        target.provider().dimmed()
    )
}
