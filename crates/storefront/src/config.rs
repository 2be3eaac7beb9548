//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `FIGURINE_DATA_DIR` - Directory holding local and remote stores (default: .figurine)
//! - `FIGURINE_CART_KEY` - Local store key for the anonymous cart (default: figurine-cart)
//! - `FIGURINE_FAVORITES_KEY` - Local store key for anonymous favorites (default: figurine-favorites)
//! - `FIGURINE_CATALOG` - Path to a catalog JSON file replacing the bundled one
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (default: development)

use std::path::PathBuf;

use thiserror::Error;

use crate::session::LocalKeys;

const DEFAULT_DATA_DIR: &str = ".figurine";
const DEFAULT_CART_KEY: &str = "figurine-cart";
const DEFAULT_FAVORITES_KEY: &str = "figurine-favorites";
const MAX_KEY_LENGTH: usize = 64;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    /// Root of the file-backed stores
    pub data_dir: PathBuf,
    /// Local store key for the cart
    pub cart_key: String,
    /// Local store key for favorites
    pub favorites_key: String,
    /// Catalog file overriding the bundled catalog
    pub catalog_path: Option<PathBuf>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            cart_key: DEFAULT_CART_KEY.to_string(),
            favorites_key: DEFAULT_FAVORITES_KEY.to_string(),
            catalog_path: None,
            sentry_dsn: None,
            sentry_environment: "development".to_string(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let data_dir = get("FIGURINE_DATA_DIR").map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);
        let cart_key = validate_store_key(
            "FIGURINE_CART_KEY",
            get("FIGURINE_CART_KEY").unwrap_or_else(|| DEFAULT_CART_KEY.to_string()),
        )?;
        let favorites_key = validate_store_key(
            "FIGURINE_FAVORITES_KEY",
            get("FIGURINE_FAVORITES_KEY").unwrap_or_else(|| DEFAULT_FAVORITES_KEY.to_string()),
        )?;
        if cart_key == favorites_key {
            return Err(ConfigError::InvalidEnvVar(
                "FIGURINE_FAVORITES_KEY".to_string(),
                "must differ from FIGURINE_CART_KEY".to_string(),
            ));
        }

        Ok(Self {
            data_dir,
            cart_key,
            favorites_key,
            catalog_path: get("FIGURINE_CATALOG").map(PathBuf::from),
            sentry_dsn: get("SENTRY_DSN"),
            sentry_environment: get("SENTRY_ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
        })
    }

    /// Directory of the local (anonymous) store.
    #[must_use]
    pub fn local_dir(&self) -> PathBuf {
        self.data_dir.join("local")
    }

    /// Directory of the remote document store.
    #[must_use]
    pub fn remote_dir(&self) -> PathBuf {
        self.data_dir.join("remote")
    }

    #[must_use]
    pub fn local_keys(&self) -> LocalKeys {
        LocalKeys {
            cart: self.cart_key.clone(),
            favorites: self.favorites_key.clone(),
        }
    }
}

/// Local keys double as file names, so keep them to `[A-Za-z0-9_-]`.
fn validate_store_key(var_name: &str, value: String) -> Result<String, ConfigError> {
    let value = value.trim().to_string();
    if value.len() > MAX_KEY_LENGTH {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("must be at most {MAX_KEY_LENGTH} characters (got {})", value.len()),
        ));
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("invalid character {c:?}"),
        ));
    }
    Ok(value)
}
