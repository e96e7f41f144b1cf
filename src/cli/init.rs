use std::path::PathBuf;

use crate::db::{open_data_dir, DB_FILE};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    let data_path = PathBuf::from(&settings.data_dir);
    open_data_dir(&data_path)?;
    save_settings(&settings)?;

    println!("Data dir:   {}", data_path.display());
    println!("Database:   {}", data_path.join(DB_FILE).display());
    println!("Ready. Import a statement with `fintrack import <file>`.");
    Ok(())
}
