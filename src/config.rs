//! Engine configuration
//!
//! Every tunable of the memory layer and the grouping layer lives here.
//! Values come from defaults, a TOML document, a config file, or
//! `PHOTONFLAT_*` environment variables (nested keys use `__`, for example
//! `PHOTONFLAT_SLICE__SOFT_GROWTH_LIMIT=40`).

use crate::error::{Error, Result};
use crate::memory::compression::CompressionAlgorithm;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Growth limits for extendable slices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    /// Initial capacity in bytes (0 allocates lazily on first write)
    pub initial_capacity: usize,
    /// Successive extensions within one write before a warning is logged
    pub soft_growth_limit: u32,
    /// Successive extensions within one write before the process aborts
    pub hard_growth_limit: u32,
}

impl SliceConfig {
    pub const DEFAULT_SOFT_GROWTH_LIMIT: u32 = 50;
    pub const DEFAULT_HARD_GROWTH_LIMIT: u32 = 100;
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            soft_growth_limit: Self::DEFAULT_SOFT_GROWTH_LIMIT,
            hard_growth_limit: Self::DEFAULT_HARD_GROWTH_LIMIT,
        }
    }
}

/// Page layout for paged slices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagedConfig {
    /// Size of the open write window in bytes
    pub page_size: usize,
    /// Compression applied when a window is sealed
    pub compression: CompressionAlgorithm,
    /// Zstd level (1..=22)
    pub level: i32,
}

impl PagedConfig {
    pub const DEFAULT_PAGE_SIZE: usize = 64 * 1024;
    pub const DEFAULT_LEVEL: i32 = 3;
}

impl Default for PagedConfig {
    fn default() -> Self {
        Self {
            page_size: Self::DEFAULT_PAGE_SIZE,
            compression: CompressionAlgorithm::Zstd,
            level: Self::DEFAULT_LEVEL,
        }
    }
}

/// Hash aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// Initial capacity of the key set
    pub expected_groups: usize,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            expected_groups: 1024,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub slice: SliceConfig,
    pub paged: PagedConfig,
    pub hash: HashConfig,
}

impl EngineConfig {
    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a config file (any format the `config` crate understands)
    /// with `PHOTONFLAT_*` environment overrides layered on top
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()).required(false))
            .add_source(Self::environment())
            .build()
            .map_err(|e| Error::Config(format!("Failed to load configuration: {}", e)))?;

        Self::finish(settings)
    }

    /// Build from `PHOTONFLAT_*` environment variables only
    pub fn from_env() -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(Self::environment())
            .build()
            .map_err(|e| Error::Config(format!("Failed to read environment: {}", e)))?;

        Self::finish(settings)
    }

    fn environment() -> ::config::Environment {
        ::config::Environment::with_prefix("PHOTONFLAT")
            .separator("__")
            .try_parsing(true)
    }

    fn finish(settings: ::config::Config) -> Result<Self> {
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the memory layer cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.slice.soft_growth_limit >= self.slice.hard_growth_limit {
            return Err(Error::Config(format!(
                "soft_growth_limit ({}) must be below hard_growth_limit ({})",
                self.slice.soft_growth_limit, self.slice.hard_growth_limit
            )));
        }
        if self.paged.page_size == 0 {
            return Err(Error::Config("page_size must be positive".to_string()));
        }
        if !(1..=22).contains(&self.paged.level) {
            return Err(Error::Config(format!(
                "zstd level {} outside 1..=22",
                self.paged.level
            )));
        }
        Ok(())
    }
}
