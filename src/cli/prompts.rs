//! Interactive prompts using dialoguer

use anyhow::{bail, Result};
use dialoguer::{theme::ColorfulTheme, Select};

use crate::pipeline::TargetMapping;

/// Pick the outcome column from the table's columns
pub fn select_target_column(columns: &[String]) -> Result<String> {
    if columns.is_empty() {
        bail!("Input has no columns to choose a target from");
    }

    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select the target column")
        .items(columns)
        .default(0)
        .interact()?;
    Ok(columns[idx].clone())
}

/// Pick the EVENT value, then the NON-EVENT value among the rest.
/// Rows with any other value are excluded from the task.
pub fn select_target_mapping(target: &str, unique_values: &[String]) -> Result<TargetMapping> {
    if unique_values.len() < 2 {
        bail!(
            "Target column '{}' has {} distinct value(s); need at least 2",
            target,
            unique_values.len()
        );
    }

    let theme = ColorfulTheme::default();
    let event_idx = Select::with_theme(&theme)
        .with_prompt(format!("Which '{}' value is the EVENT (1)?", target))
        .items(unique_values)
        .default(0)
        .interact()?;
    let event = unique_values[event_idx].clone();

    let remaining: Vec<&String> = unique_values.iter().filter(|v| **v != event).collect();
    let non_event_idx = Select::with_theme(&theme)
        .with_prompt(format!("Which '{}' value is the NON-EVENT (0)?", target))
        .items(&remaining)
        .default(0)
        .interact()?;

    Ok(TargetMapping::new(event, remaining[non_event_idx].clone()))
}
