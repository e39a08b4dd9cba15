//! Tag catalog backend selection.
//!
//! # Purpose
//! Builds the [`TagCatalog`] named by `TAGDRIFT_CATALOG_BACKEND`: the vSphere
//! REST adapter in production, or an in-memory catalog (optionally seeded from
//! a YAML fixture) for local runs and tests.
use crate::config::{CatalogBackend, TagdriftConfig};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tagdrift_core::{CatalogFixture, InMemoryCatalog, TagCatalog};

pub mod vsphere;

pub use vsphere::{Credentials, VsphereCatalog};

pub fn build_catalog(config: &TagdriftConfig) -> Result<Arc<dyn TagCatalog>> {
    match config.catalog_backend {
        CatalogBackend::Memory => {
            let catalog = match &config.catalog_fixture {
                Some(path) => InMemoryCatalog::from_fixture(load_fixture(path)?),
                None => InMemoryCatalog::new(),
            };
            Ok(Arc::new(catalog))
        }
        CatalogBackend::Vsphere => {
            let vsphere = config
                .vsphere
                .as_ref()
                .context("VCENTER_URL must be set for the vsphere catalog backend")?;
            let credentials = Credentials::from_secret_dir(&vsphere.secret_path)?;
            Ok(Arc::new(VsphereCatalog::new(vsphere, credentials)?))
        }
    }
}

pub fn load_fixture(path: &Path) -> Result<CatalogFixture> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read catalog fixture {}", path.display()))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("parse catalog fixture {}", path.display()))
}
