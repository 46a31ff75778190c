//! Pass options, loadable from a TOML file.
//!
//! ```toml
//! allow_function_pointers = false
//! pointer_space = "override"
//! integration_header = "build/kernels.h"
//!
//! [header]
//! include = "CL/sycl/detail/kernel_desc.hpp"
//! namespaces = ["cl", "sycl", "detail"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid options in '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// What to do with a pointer field whose pointee already names an address
/// space other than the device-global one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerSpacePolicy {
    /// Retag every pointee as global.
    #[default]
    Override,
    /// Keep an explicit address space; untagged pointees become global.
    Preserve,
    /// Report an explicit non-global address space and keep it.
    Reject,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HeaderOptions {
    /// Runtime header that defines `kernel_param_desc_t`.
    pub include: String,
    /// Namespaces the tables are emitted into, outermost first.
    pub namespaces: Vec<String>,
}

impl Default for HeaderOptions {
    fn default() -> Self {
        Self {
            include: "CL/sycl/detail/kernel_desc.hpp".to_string(),
            namespaces: vec!["cl".to_string(), "sycl".to_string(), "detail".to_string()],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutlineOptions {
    /// Relaxed mode: calls through function values are not reported.
    pub allow_function_pointers: bool,
    pub pointer_space: PointerSpacePolicy,
    /// Where to write the integration header, if anywhere.
    pub integration_header: Option<PathBuf>,
    pub header: HeaderOptions,
}

impl OutlineOptions {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
