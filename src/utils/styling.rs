//! Terminal styling for the step-by-step console log

use console::{style, Emoji};
use std::path::Path;
use std::time::Duration;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static DICE: Emoji<'_, '_> = Emoji("🎲 ", "");
pub static MICROBE: Emoji<'_, '_> = Emoji("🦠 ", "");

const CARD_WIDTH: usize = 56;

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
    ┌┬┐┬┌─┐┬─┐┌─┐┌┬┐─┐ ┬
    │││││  ├┬┘│ │ ││┌┴┬┘
    ┴ ┴┴└─┘┴└─└─┘─┴┘┴ └─
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}{}",
        MICROBE,
        style("Microbiome classifier benchmark").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Key settings shown in the configuration card
pub struct ConfigCard<'a> {
    pub input: &'a Path,
    pub target: &'a str,
    pub output_dir: &'a Path,
    pub models: &'a str,
    pub measure: &'a str,
    pub n_evals: usize,
    pub folds: usize,
    pub test_ratio: f64,
    pub normalization: &'a str,
    pub min_prevalence: f64,
    pub seed: u64,
}

fn card_row(icon: &Emoji<'_, '_>, label: &str, value: &str) {
    let text = format!("{}{:<15}{}", icon, label, value);
    let visible = console::measure_text_width(&text);
    let pad = (CARD_WIDTH - 4).saturating_sub(visible);
    println!("    │  {}{}│", text, " ".repeat(pad));
}

/// Print configuration card
pub fn print_config(card: &ConfigCard<'_>) {
    let line = "─".repeat(CARD_WIDTH - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(CARD_WIDTH - 20)
    );
    println!("    ├{}┤", line);
    card_row(&FOLDER, "Input:", &truncate_path(card.input, 34));
    card_row(&TARGET, "Target:", &truncate_string(card.target, 34));
    card_row(&SAVE, "Output:", &truncate_path(card.output_dir, 34));
    println!("    ├{}┤", line);
    card_row(&CHART, "Models:", &truncate_string(card.models, 34));
    card_row(
        &CHART,
        "Tuning:",
        &format!("{} x {}-fold CV on {}", card.n_evals, card.folds, card.measure),
    );
    card_row(&CHART, "Holdout:", &format!("{:.0}%", card.test_ratio * 100.0));
    card_row(
        &MICROBE,
        "Abundance:",
        &format!("{}, prevalence >= {:.0}%", card.normalization, card.min_prevalence * 100.0),
    );
    card_row(&DICE, "Seed:", &card.seed.to_string());
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {}{}", INFO, message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("    {} {}", style("!").yellow().bold(), style(message).yellow());
}

/// Print how long a step took
pub fn print_step_time(elapsed: Duration) {
    println!(
        "    {}",
        style(format!("⏱  {}", format_duration(elapsed))).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {}{}",
        ROCKET,
        style("microdx benchmark complete!").green().bold()
    );
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    match detail {
        Some(info) => println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        ),
        None => println!("      Found {} {}", style(count).yellow().bold(), description),
    }
}

/// Human-readable duration: "850ms", "12.3s" or "2m 05s"
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", elapsed.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let whole = elapsed.as_secs();
        format!("{}m {:02}s", whole / 60, whole % 60)
    }
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    truncate_string(&path.display().to_string(), max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}
