use std::sync::Arc;

use shared::{
    domain::{OrderId, ResourceKind, Role},
    protocol::{Order, OrderItem, ProductOption, Registration, User},
};
use tracing::{info, warn};

use crate::{
    cart::CartReconciler,
    config::Settings,
    error::ClientError,
    gateway::Gateway,
    http_api::HttpStoreApi,
    listing::ListQueryController,
    session::{AccessToken, Session},
    transport::StoreApi,
    types::Listable,
};

/// Session, cart and list controllers wired over one API transport.
pub struct Storefront {
    gateway: Gateway,
    cart: CartReconciler,
}

impl Storefront {
    pub fn connect(settings: &Settings) -> Result<Self, ClientError> {
        let api = HttpStoreApi::new(settings)?;
        Ok(Self::with_api(Arc::new(api)))
    }

    pub fn with_api(api: Arc<dyn StoreApi>) -> Self {
        let gateway = Gateway::new(api, Session::new());
        Self {
            cart: CartReconciler::new(gateway.clone()),
            gateway,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        self.gateway.session()
    }

    pub fn cart(&self) -> &CartReconciler {
        &self.cart
    }

    /// Signs in. A cart from an earlier session is dropped once the new
    /// session starts; a failed attempt leaves the current session alone.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let user = self.gateway.login(username, password).await?;
        self.after_sign_in(&user).await;
        Ok(user)
    }

    /// Restores a session from a stored credential.
    pub async fn resume(&self, token: AccessToken) -> Result<User, ClientError> {
        let user = self.gateway.sign_in_with(token).await?;
        self.after_sign_in(&user).await;
        Ok(user)
    }

    /// Self-service sign-up for sellers and buyers. Does not sign in.
    pub async fn register(&self, registration: &Registration) -> Result<(), ClientError> {
        if registration.role == Role::Admin {
            return Err(ClientError::Forbidden {
                role: Role::Admin,
                action: "self-register".to_string(),
            });
        }
        self.gateway.register(registration).await?;
        info!(username = %registration.username, role = %registration.role, "account registered");
        Ok(())
    }

    pub async fn logout(&self) {
        self.gateway.session().end().await;
        self.cart.reset().await;
    }

    /// A list controller for `T`, provided the signed-in role may see it.
    pub async fn list<T: Listable>(&self) -> Result<ListQueryController<T>, ClientError> {
        self.require_listable(T::KIND).await?;
        Ok(ListQueryController::new(self.gateway.clone()))
    }

    /// Completed and cancelled orders of the signed-in seller or buyer.
    pub async fn order_history(&self) -> Result<ListQueryController<Order>, ClientError> {
        self.require_listable(ResourceKind::OrderHistory).await?;
        Ok(ListQueryController::for_kind(
            self.gateway.clone(),
            ResourceKind::OrderHistory,
        ))
    }

    pub async fn order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, ClientError> {
        self.require_listable(ResourceKind::Orders).await?;
        self.gateway.order_items(order_id).await
    }

    /// Products a seller can pick from when stocking inventory.
    pub async fn product_options(&self) -> Result<Vec<ProductOption>, ClientError> {
        self.require_listable(ResourceKind::Inventory).await?;
        self.gateway.product_options().await
    }

    async fn require_listable(&self, kind: ResourceKind) -> Result<(), ClientError> {
        let role = self.gateway.require_role().await?;
        if role.can_list(kind) {
            Ok(())
        } else {
            Err(ClientError::Forbidden {
                role,
                action: format!("list {kind}"),
            })
        }
    }

    async fn after_sign_in(&self, user: &User) {
        info!(username = %user.username, role = %user.role, "signed in");
        if !user.role.owns_cart() {
            return;
        }
        // A cart that fails to load does not block sign-in.
        if let Err(err) = self.cart.load().await {
            warn!("failed to fetch cart after sign-in: {err}");
        }
    }
}

#[cfg(test)]
#[path = "tests/storefront_tests.rs"]
mod tests;
