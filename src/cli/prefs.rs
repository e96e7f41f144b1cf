use colored::Colorize;

use crate::error::Result;
use crate::preferences::{load_preferences, parse_bool, preferences_path, save_preferences, Preferences};

fn print(prefs: &Preferences) {
    for (key, enabled) in prefs.entries() {
        let state = if enabled { "on".green() } else { "off".dimmed() };
        println!("{key:<22}{state}");
    }
}

pub fn show() -> Result<()> {
    print(&load_preferences());
    println!("\n{}", preferences_path().display());
    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let mut prefs = load_preferences();
    prefs.set(key, parse_bool(value)?)?;
    save_preferences(&prefs)?;
    print(&prefs);
    Ok(())
}

pub fn reset() -> Result<()> {
    let prefs = Preferences::default();
    save_preferences(&prefs)?;
    println!("Preferences restored to defaults.");
    print(&prefs);
    Ok(())
}
