//! Startup helpers:
//! - credential provider + warehouse client construction
//! - static asset checks
//!
//! Keeps `main.rs` down to wiring.

use std::{path::Path, sync::Arc};

use anyhow::Result;

use crate::config::Config;
use crate::services::credentials::provider_from_config;
use crate::services::warehouse::{BigQueryWarehouse, Warehouse};

/// Build the warehouse client with the credential provider chosen in configuration.
pub fn init_warehouse(config: &Config) -> Result<Arc<dyn Warehouse>> {
    let credentials = provider_from_config(&config.credentials)
        .map_err(|e| anyhow::anyhow!("Failed to initialize credentials: {}", e))?;

    let warehouse = BigQueryWarehouse::new(&config.warehouse, credentials)
        .map_err(|e| anyhow::anyhow!("Failed to initialize warehouse client: {}", e))?;

    Ok(Arc::new(warehouse))
}

/// Warn (without failing startup) when the logo is missing from the static directory.
pub fn check_static_assets(config: &Config) {
    let logo = Path::new(&config.dashboard.static_dir).join(&config.dashboard.logo_path);
    if logo.exists() {
        tracing::info!("Serving logo from {}", logo.display());
    } else {
        tracing::warn!(
            "Logo {} not found; the header will show a broken image",
            logo.display()
        );
    }
}
