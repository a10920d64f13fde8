//! Client core for the marketplace storefront: role-gated paginated lists,
//! an optimistic cart, and the session context both run under.

pub mod cart;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http_api;
pub mod listing;
pub mod optimistic;
pub mod session;
pub mod storefront;
pub mod transport;
pub mod types;

pub use cart::CartReconciler;
pub use config::{load_settings, Settings};
pub use error::ClientError;
pub use gateway::Gateway;
pub use http_api::HttpStoreApi;
pub use listing::{FetchOutcome, ListQueryController, ListSnapshot};
pub use optimistic::{apply_optimistic, SyncPhase, SyncTracked};
pub use session::{AccessToken, Session, SessionEvent};
pub use storefront::Storefront;
pub use transport::StoreApi;
pub use types::{Editable, Listable};

#[cfg(test)]
#[path = "tests/fake_api.rs"]
pub(crate) mod fake_api;
