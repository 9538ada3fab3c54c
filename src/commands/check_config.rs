use anyhow::Result;
use std::path::Path;

use tubethread::config::Config;
use tubethread::error::Error;

pub fn check_config(path: &Path) -> Result<()> {
    let config = Config::from_file(path)
        .and_then(|config| config.validate().map(|()| config))
        .map_err(|e| Error::config(format!("{e:#}")))?;

    tracing::info!(path = %path.display(), "config is valid");

    println!("# {} (valid)", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}
