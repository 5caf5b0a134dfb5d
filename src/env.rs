use std::path::Path;

use tracing::{info, warn};

/// Layers env files so later files override earlier ones. `.secrets.env`
/// carries GEMINI_API_KEY and HONEYCOMB_API_KEY and is never committed.
pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let profile = dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string());

    let profile_file = if profile == "production" {
        "config/prod.env"
    } else {
        "config/dev.env"
    };

    for env_file in ["config/common.env", profile_file, ".secrets.env"] {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}
