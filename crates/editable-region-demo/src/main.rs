use anyhow::{Context, Result};
use editable_region_config::Config;
use std::{env, path::PathBuf, process};

mod script;

use script::Script;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let program_name = args
        .first()
        .cloned()
        .unwrap_or_else(|| "editable-region-demo".to_string());
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {program_name} <script.toml> [config.toml]");
        process::exit(1);
    }

    let script_path = PathBuf::from(&args[1]);
    let config = match args.get(2) {
        Some(config_path) => {
            log::info!("Using config from CLI argument: {config_path}");
            Config::load_from_path(config_path)?
                .with_context(|| format!("No config file at {config_path}"))?
        }
        None => {
            log::info!("Config path: {}", Config::config_path().display());
            Config::load()?.unwrap_or_else(|| {
                log::info!("No config file found, using defaults");
                Config::default()
            })
        }
    };

    let script = Script::load(&script_path)?;
    log::info!(
        "Replaying {} step(s) over {:?}",
        script.steps.len(),
        script.initial_text
    );
    let transcript = script.run(&config)?;

    println!("{transcript}");
    Ok(())
}
