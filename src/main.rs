use anyhow::{Context, Result};

use potable::config::Settings;
use potable::manager::VersionManager;
use potable::ui::cli::{InquireDriver, menu};

fn main() -> Result<()> {
    if let Err(e) = potable::logging::init() {
        eprintln!("logging disabled: {e}");
    }
    let settings = Settings::from_env().context("loading settings")?;
    let manager = VersionManager::open(settings).context("opening version registry")?;
    menu::run(&InquireDriver, &manager)
}
