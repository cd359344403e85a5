//! Subcommand implementations.

pub mod cart;
pub mod products;
pub mod route;
pub mod session;
pub mod watch;

use shopfront_client::{ApiClient, ClientConfig, ShopContext, StorageArea};
use thiserror::Error;
use tracing::debug;

/// Errors raised by the commands themselves rather than the client.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown role: {0} (expected user, seller or admin)")]
    UnknownRole(String),

    #[error("Product {0} is not in the catalog")]
    UnknownProduct(String),

    #[error("Product {0} is not in the cart")]
    NotInCart(String),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,
}

/// Everything one invocation needs: a tab on the state file, its stores,
/// and a backend client reading the token from the same tab.
pub struct Shell {
    pub config: ClientConfig,
    pub area: StorageArea,
    pub ctx: ShopContext,
    pub api: ApiClient,
}

impl Shell {
    /// Open the state file named by the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the state file
    /// cannot be read.
    pub fn open() -> Result<Self, shopfront_client::ClientError> {
        let config = ClientConfig::from_env()?;
        debug!(state_file = %config.state_file.display(), api_url = %config.api_url, "Opening state");

        let area = StorageArea::open_file(&config.state_file);
        let tab = area.open_tab();
        let ctx = ShopContext::open(tab.clone())?;
        let api = ApiClient::new(&config, tab);

        Ok(Self {
            config,
            area,
            ctx,
            api,
        })
    }
}
