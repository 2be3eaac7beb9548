//! Command implementations and the context they share.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod favorites;

use std::io::Write;

use figurine_core::catalog::{CatalogError, parse_catalog};
use figurine_core::{
    Email, EmailError, IdentityKey, IdentityKeyError, Product, ProductId, calculate_discount,
    calculate_savings, format_price,
};
use figurine_storefront::store::{FileDocumentStore, FileLocalStore, LocalStore};
use figurine_storefront::{
    ConfigError, ConfirmationDialog, Identity, IdentityProvider, ProfileError, Prompt, Session,
    StoreError, Stores, StorefrontConfig,
};
use thiserror::Error;

/// Local store key holding the signed-in identity between runs.
const IDENTITY_KEY: &str = "figurine-identity";

const BUNDLED_CATALOG: &str = include_str!("../../data/catalog.json");

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No product with id {0} in the catalog")]
    UnknownProduct(ProductId),

    #[error("Invalid account key: {0}")]
    InvalidKey(#[from] IdentityKeyError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Everything a command needs: configuration, the catalog, a running
/// session and the dialog gating destructive actions.
pub struct Context {
    pub catalog: Vec<Product>,
    pub session: Session,
    pub dialog: ConfirmationDialog,
    local: FileLocalStore,
}

impl Context {
    /// Load the catalog, open the file stores and restore the saved identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or parsed.
    pub fn open(config: &StorefrontConfig) -> Result<Self, CliError> {
        let catalog = match &config.catalog_path {
            Some(path) => parse_catalog(&std::fs::read_to_string(path)?)?,
            None => parse_catalog(BUNDLED_CATALOG)?,
        };

        let local = FileLocalStore::new(config.local_dir());
        let remote = FileDocumentStore::new(config.remote_dir());
        let identity = restore_identity(&local);
        if let Some(identity) = &identity {
            tracing::debug!(key = %identity.key, "Restored identity");
        }

        let session = Session::start(
            Stores::new(remote, local.clone()),
            config.local_keys(),
            IdentityProvider::with_identity(identity),
        );

        Ok(Self {
            catalog,
            session,
            dialog: ConfirmationDialog::new(),
            local,
        })
    }

    /// Look up a catalog product.
    ///
    /// # Errors
    ///
    /// Returns `CliError::UnknownProduct` if `id` is not in the catalog.
    pub fn product(&self, id: ProductId) -> Result<Product, CliError> {
        self.catalog
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(CliError::UnknownProduct(id))
    }

    /// Remember `identity` for later runs, or forget it.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store cannot be written.
    pub fn save_identity(&self, identity: Option<&Identity>) -> Result<(), CliError> {
        match identity {
            Some(identity) => {
                let json = serde_json::to_string(identity).map_err(StoreError::from)?;
                self.local.set(IDENTITY_KEY, &json)?;
            }
            None => self.local.remove(IDENTITY_KEY)?,
        }
        Ok(())
    }

    /// Wait for pending writes and stop syncing.
    pub async fn close(self) {
        self.session.shutdown().await;
    }
}

fn restore_identity(local: &FileLocalStore) -> Option<Identity> {
    let raw = match local.get(IDENTITY_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read saved identity");
            return None;
        }
    };
    serde_json::from_str(&raw)
        .inspect_err(|e| tracing::error!(error = %e, "Ignoring unreadable saved identity"))
        .ok()
}

/// Build an identity from command-line arguments.
///
/// # Errors
///
/// Returns an error if the key or email is malformed.
pub fn identity_from_args(
    key: &str,
    email: Option<&str>,
    name: Option<String>,
) -> Result<Identity, CliError> {
    let mut identity = Identity::new(IdentityKey::parse(key)?);
    if let Some(email) = email {
        identity = identity.with_email(Email::parse(email)?);
    }
    if let Some(name) = name {
        identity = identity.with_display_name(name);
    }
    Ok(identity)
}

/// Print a confirmation prompt and how to accept it.
pub fn print_prompt(out: &mut impl Write, prompt: &Prompt) -> std::io::Result<()> {
    writeln!(out, "{}", prompt.title)?;
    writeln!(out, "  {}", prompt.description)?;
    writeln!(
        out,
        "  Re-run with --yes to \"{}\" or omit it to {}.",
        prompt.confirm_label,
        prompt.cancel_label.to_lowercase()
    )
}

/// One product per line: id, name, price and badges.
pub fn print_product(out: &mut impl Write, product: &Product) -> std::io::Result<()> {
    let mut badges = Vec::new();
    if product.is_new {
        badges.push("new".to_string());
    }
    if product.on_sale {
        match product.original_price {
            Some(original) => badges.push(format!(
                "sale -{}% (save {})",
                calculate_discount(original, product.price),
                calculate_savings(original, product.price)
            )),
            None => badges.push("sale".to_string()),
        }
    }
    if product.is_limited {
        badges.push("limited".to_string());
    }
    if product.stock == Some(0) {
        badges.push("sold out".to_string());
    }

    write!(
        out,
        "{:>4}  {:<42} {:>10}",
        product.id,
        product.name,
        format_price(product.price)
    )?;
    if badges.is_empty() {
        writeln!(out)
    } else {
        writeln!(out, "  [{}]", badges.join(", "))
    }
}
