use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9090";
pub const DEFAULT_CATEGORY: &str = "k8s-zone";
pub const DEFAULT_VCENTER_SECRET_PATH: &str = "/var/bindings/vsphere";
pub const DEFAULT_VCENTER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogBackend {
    Vsphere,
    Memory,
}

impl FromStr for CatalogBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "vsphere" => Ok(Self::Vsphere),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown catalog backend {other:?} (expected vsphere or memory)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VsphereConfig {
    pub url: String,
    pub insecure: bool,
    // Directory holding `username` and `password` files.
    pub secret_path: PathBuf,
    pub timeout: Duration,
}

// Service configuration sourced from environment variables.
#[derive(Clone)]
pub struct TagdriftConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub debug: bool,
    pub category: String,
    // Slack incoming-webhook URL; it embeds a token, so it is never logged.
    pub webhook_url: String,
    pub catalog_backend: CatalogBackend,
    pub catalog_fixture: Option<PathBuf>,
    pub vsphere: Option<VsphereConfig>,
}

impl fmt::Debug for TagdriftConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagdriftConfig")
            .field("bind_addr", &self.bind_addr)
            .field("metrics_bind", &self.metrics_bind)
            .field("debug", &self.debug)
            .field("category", &self.category)
            .field("webhook_url", &"<redacted>")
            .field("catalog_backend", &self.catalog_backend)
            .field("catalog_fixture", &self.catalog_fixture)
            .field("vsphere", &self.vsphere)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct TagdriftConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    debug: Option<bool>,
    category: Option<String>,
    catalog_backend: Option<String>,
    catalog_fixture: Option<PathBuf>,
    vcenter_url: Option<String>,
    vcenter_insecure: Option<bool>,
    vcenter_secret_path: Option<PathBuf>,
    vcenter_timeout_secs: Option<u64>,
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

impl TagdriftConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bind_addr = match get("TAGDRIFT_BIND") {
            Some(value) => value.parse().with_context(|| "parse TAGDRIFT_BIND")?,
            None => {
                let port = match get("PORT") {
                    Some(value) => value.parse::<u16>().with_context(|| "parse PORT")?,
                    None => DEFAULT_PORT,
                };
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };
        let metrics_bind = get("TAGDRIFT_METRICS_BIND")
            .unwrap_or_else(|| DEFAULT_METRICS_BIND.to_string())
            .parse()
            .with_context(|| "parse TAGDRIFT_METRICS_BIND")?;
        let debug = get("DEBUG").map(|value| parse_flag(&value)).unwrap_or(false);
        let category = get("CATEGORY").unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let webhook_url = get("SLACK_TOKEN").context("SLACK_TOKEN must be set")?;
        reqwest::Url::parse(&webhook_url).with_context(|| "parse SLACK_TOKEN as URL")?;
        let catalog_backend = match get("TAGDRIFT_CATALOG_BACKEND") {
            Some(value) => value.parse()?,
            None => CatalogBackend::Vsphere,
        };
        let catalog_fixture = get("TAGDRIFT_CATALOG_FIXTURE").map(PathBuf::from);

        let vsphere = match get("VCENTER_URL") {
            Some(url) => {
                let timeout_secs = match get("VCENTER_TIMEOUT_SECS") {
                    Some(value) => value
                        .parse::<u64>()
                        .with_context(|| "parse VCENTER_TIMEOUT_SECS")?,
                    None => DEFAULT_VCENTER_TIMEOUT_SECS,
                };
                Some(VsphereConfig {
                    url,
                    insecure: get("VCENTER_INSECURE")
                        .map(|value| parse_flag(&value))
                        .unwrap_or(false),
                    secret_path: get("VCENTER_SECRET_PATH")
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_VCENTER_SECRET_PATH)),
                    timeout: Duration::from_secs(timeout_secs.max(1)),
                })
            }
            None => None,
        };

        let config = Self {
            bind_addr,
            metrics_bind,
            debug,
            category,
            webhook_url,
            catalog_backend,
            catalog_fixture,
            vsphere,
        };
        config.check()?;
        Ok(config)
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("TAGDRIFT_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read TAGDRIFT_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: TagdriftConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse tagdrift config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.debug {
            self.debug = value;
        }
        if let Some(value) = override_cfg.category {
            self.category = value;
        }
        if let Some(value) = override_cfg.catalog_backend {
            self.catalog_backend = value.parse()?;
        }
        if let Some(value) = override_cfg.catalog_fixture {
            self.catalog_fixture = Some(value);
        }
        if let Some(url) = override_cfg.vcenter_url {
            let vsphere = self.vsphere.get_or_insert_with(|| VsphereConfig {
                url: String::new(),
                insecure: false,
                secret_path: PathBuf::from(DEFAULT_VCENTER_SECRET_PATH),
                timeout: Duration::from_secs(DEFAULT_VCENTER_TIMEOUT_SECS),
            });
            vsphere.url = url;
        }
        if let Some(vsphere) = self.vsphere.as_mut() {
            if let Some(value) = override_cfg.vcenter_insecure {
                vsphere.insecure = value;
            }
            if let Some(value) = override_cfg.vcenter_secret_path {
                vsphere.secret_path = value;
            }
            if let Some(value) = override_cfg.vcenter_timeout_secs {
                vsphere.timeout = Duration::from_secs(value.max(1));
            }
        }
        self.check()
    }

    fn check(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            bail!("CATEGORY must not be empty");
        }
        if self.catalog_backend == CatalogBackend::Vsphere && self.vsphere.is_none() {
            bail!("VCENTER_URL must be set for the vsphere catalog backend");
        }
        Ok(())
    }
}
