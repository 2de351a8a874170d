use anyhow::Result;
use tilescout_core::schema::Database;
use tilescout_resolve::{config, Config};

pub fn show_status(config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let chips = db.chip_count()?;

    println!("\n🛰  tilescout Status\n");
    println!("  Database: {}", config.database_path.display());
    println!("  Chips: {}", chips);
    println!("  Config file: {}", config::config_file_path().display());
    println!("  Thumbnails: {}", config.thumbnail_base);

    if chips == 0 {
        println!("\n  Run `tilescout import <file.ndjson>` to load chips");
    }

    Ok(())
}
