//! TableCRM point-of-sale order composition engine.
//!
//! Lets a cashier build a sale step by step (customer, order parameters,
//! items, confirmation) and submit it to TableCRM. Presentation layers
//! drive everything through [`OrderComposer`].
//!
//! # Example
//!
//! ```no_run
//! use tablecrm_pos::{DraftStore, OrderComposer, PosConfig, TokenStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PosConfig::from_env()?;
//! let tokens = TokenStore::from_config(&config)?;
//! tokens.login("my-access-token")?;
//!
//! let composer = OrderComposer::connect(&config, tokens, DraftStore::new())
//!     .ok_or("not logged in")?;
//! composer.load_reference_data().await;
//! composer.type_phone("+79991234567")?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod composer;
pub mod config;
pub mod draft;
pub mod error;
pub mod resolver;
pub mod session;
pub mod submission;
pub mod telemetry;
pub mod wizard;

pub use api::{ApiError, CommerceApi, TableCrmClient};
pub use composer::OrderComposer;
pub use config::{ConfigError, PosConfig};
pub use error::{SaleError, StorageError, ValidationError};
pub use resolver::Resolution;
pub use session::{DraftStore, FileTokenStorage, MemoryTokenStorage, TokenStorage, TokenStore};
pub use submission::{PendingAction, Submission};
pub use wizard::WizardStep;
