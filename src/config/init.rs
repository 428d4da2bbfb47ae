use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::{get_config_path, validate_config, Config};
use crate::scoring::model::{AI_TOOLS, LIKERT5};
use crate::scoring::{ScoreModel, ScoringConfig};

/// Prompt user with a message and return their trimmed input.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout()
        .flush()
        .context("Failed to flush stdout")?;
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt user with a message and a default value. Returns default if input is empty.
fn prompt_with_default(message: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}]: ", message, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

/// Prompt user with a yes/no question. Returns bool based on input and default.
fn prompt_yes_no(message: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let input = prompt(&format!("{} [{}]: ", message, hint))?;
    let input = input.to_lowercase();
    if input.is_empty() {
        Ok(default_yes)
    } else {
        Ok(input == "y" || input == "yes")
    }
}

fn describe_model(model: &ScoreModel) {
    println!(
        "  {} fields, totals out of {}",
        model.fields().len(),
        model.total_max()
    );
    for field in model.fields() {
        println!("    {:<18} {}", field.name, field.question);
    }
}

/// Assemble the config the wizard writes.
fn build_config(preset: &str, locations: Vec<String>, data_path: Option<PathBuf>) -> Config {
    let scoring = ScoringConfig {
        preset: (preset != LIKERT5).then(|| preset.to_string()),
        ..Default::default()
    };
    Config {
        data_path,
        locations,
        scoring,
    }
}

/// Run the interactive init wizard to create a config file.
///
/// If `default_path` is Some, uses that as the config file path.
/// Otherwise, prompts the user with the default config path.
pub fn run_init_wizard(default_path: Option<PathBuf>) -> Result<()> {
    println!();
    println!("Judge Tally Configuration Wizard");
    println!("================================");

    // 1. Score model
    println!();
    println!("Available score models:");
    println!();
    println!("{} (default)", LIKERT5);
    describe_model(&ScoreModel::likert5());
    println!();
    println!("{}", AI_TOOLS);
    describe_model(&ScoreModel::ai_tools());
    println!();
    let preset = loop {
        let input = prompt_with_default("Score model", LIKERT5)?;
        if input == LIKERT5 || input == AI_TOOLS {
            break input;
        }
        println!("  Invalid: expected '{}' or '{}'. Try again.", LIKERT5, AI_TOOLS);
    };

    // 2. Locations
    println!();
    println!("Locations are the rooms or sites teams present in. Leave empty to allow any.");
    let mut locations: Vec<String> = Vec::new();
    loop {
        let location = prompt("Location name (empty to finish): ")?;
        if location.is_empty() {
            break;
        }
        if locations.iter().any(|l| crate::teams::same_name(l, &location)) {
            println!("  '{}' is already listed.", location);
            continue;
        }
        locations.push(location);
    }

    // 3. Data file
    println!();
    let default_data = crate::store::get_data_path();
    let data_str = prompt_with_default(
        "Where should evaluations be stored?",
        &default_data.display().to_string(),
    )?;
    let data_path = Some(PathBuf::from(&data_str)).filter(|p| *p != default_data);

    // 4. Config path
    let default_config_path = default_path.unwrap_or_else(get_config_path);
    println!();
    let path_str = prompt_with_default(
        "Where should the config be saved?",
        &default_config_path.display().to_string(),
    )?;
    let config_path = PathBuf::from(&path_str);

    // Check if file already exists
    if config_path.exists() {
        let overwrite = prompt_yes_no(
            &format!(
                "Config already exists at {}. Overwrite?",
                config_path.display()
            ),
            false,
        )?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    // 5. Write config
    let config = build_config(&preset, locations, data_path);
    if let Err(errors) = validate_config(&config) {
        anyhow::bail!("Generated config is invalid: {}", errors.join("; "));
    }

    let yaml = serde_saphyr::to_string(&config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    // Create parent directories
    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(&config_path, &yaml)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!();
    println!("Config written to {}", config_path.display());
    println!("Add teams with `judge-tally teams add` or `judge-tally teams import FILE.csv`.");

    Ok(())
}
