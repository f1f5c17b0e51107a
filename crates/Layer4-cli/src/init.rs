//! mdrun init command
//!
//! Writes the effective settings to `.mdrun/config.json` so they can be edited
//! per project.

use mdrun_foundation::{JsonStore, RunnerConfig, RUNNER_CONFIG_FILE};
use std::path::Path;

/// Initialize the project config under `root`
pub fn init_project(force: bool, root: &Path) -> anyhow::Result<()> {
    let store = JsonStore::project(root);

    if store.exists(RUNNER_CONFIG_FILE) && !force {
        println!(
            "✓ mdrun already initialized ({}).",
            store.file_path(RUNNER_CONFIG_FILE).display()
        );
        println!("  Use --force to overwrite.");
        return Ok(());
    }

    // global settings are folded in so the project file is self-contained
    let config = RunnerConfig::load()?;
    store.save(RUNNER_CONFIG_FILE, &config)?;

    println!(
        "  Created {}",
        store.file_path(RUNNER_CONFIG_FILE).display()
    );
    println!("✓ mdrun initialized.");
    Ok(())
}
