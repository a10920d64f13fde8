use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{CartLineId, InventoryId, OrderAction, OrderId, ResourceKind, Role},
    error::ApiError,
    protocol::{
        CartLine, CheckoutReceipt, OrderItem, PageResult, ProductOption, Query, Registration,
        User,
    },
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::ClientError,
    session::{AccessToken, Session},
    transport::StoreApi,
};

/// Transport bound to a session: attaches the credential to every call and
/// ends the session when the server rejects it.
#[derive(Clone)]
pub struct Gateway {
    api: Arc<dyn StoreApi>,
    session: Arc<Session>,
}

impl Gateway {
    pub fn new(api: Arc<dyn StoreApi>, session: Arc<Session>) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn require_role(&self) -> Result<Role, ClientError> {
        self.session.role().await.ok_or(ClientError::SignInRequired)
    }

    async fn observe<T>(&self, result: Result<T, ApiError>) -> Result<T, ClientError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                if err.is_unauthorized() {
                    warn!("credential rejected: {}", err.message);
                    self.session.expire().await;
                }
                Err(ClientError::Api(err))
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let issued = self
            .observe(self.api.login(username, password).await)
            .await?;
        let token = AccessToken::new(issued.access_token);
        self.sign_in_with(token).await
    }

    /// Creates an account. Does not sign in.
    pub async fn register(&self, registration: &Registration) -> Result<(), ClientError> {
        // No credential is involved, so a rejection says nothing about the session.
        Ok(self.api.register(registration).await?)
    }

    /// Resumes a session from a previously issued credential.
    pub async fn sign_in_with(&self, token: AccessToken) -> Result<User, ClientError> {
        let user = self.observe(self.api.profile(Some(&token)).await).await?;
        self.session.sign_in(token, user.clone()).await;
        Ok(user)
    }

    pub async fn list_resource(
        &self,
        kind: ResourceKind,
        query: &Query,
    ) -> Result<PageResult<Value>, ClientError> {
        let token = self.session.token().await;
        let result = self.api.list_resource(token.as_ref(), kind, query).await;
        self.observe(result).await
    }

    pub async fn create_resource(
        &self,
        kind: ResourceKind,
        body: Value,
    ) -> Result<(), ClientError> {
        let token = self.session.token().await;
        let result = self.api.create_resource(token.as_ref(), kind, body).await;
        self.observe(result).await
    }

    pub async fn update_resource(
        &self,
        kind: ResourceKind,
        id: Uuid,
        body: Value,
    ) -> Result<(), ClientError> {
        let token = self.session.token().await;
        let result = self
            .api
            .update_resource(token.as_ref(), kind, id, body)
            .await;
        self.observe(result).await
    }

    pub async fn delete_resource(&self, kind: ResourceKind, id: Uuid) -> Result<(), ClientError> {
        let token = self.session.token().await;
        let result = self.api.delete_resource(token.as_ref(), kind, id).await;
        self.observe(result).await
    }

    pub async fn get_cart(&self) -> Result<Vec<CartLine>, ClientError> {
        let token = self.session.token().await;
        let result = self.api.get_cart(token.as_ref()).await;
        self.observe(result).await
    }

    pub async fn add_to_cart(
        &self,
        inventory_id: InventoryId,
        quantity: u32,
    ) -> Result<(), ClientError> {
        let token = self.session.token().await;
        let result = self
            .api
            .add_to_cart(token.as_ref(), inventory_id, quantity)
            .await;
        self.observe(result).await
    }

    pub async fn update_cart_line(
        &self,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<(), ClientError> {
        let token = self.session.token().await;
        let result = self
            .api
            .update_cart_line(token.as_ref(), line_id, quantity)
            .await;
        self.observe(result).await
    }

    pub async fn remove_cart_line(&self, line_id: CartLineId) -> Result<(), ClientError> {
        let token = self.session.token().await;
        let result = self.api.remove_cart_line(token.as_ref(), line_id).await;
        self.observe(result).await
    }

    pub async fn clear_cart(&self) -> Result<(), ClientError> {
        let token = self.session.token().await;
        let result = self.api.clear_cart(token.as_ref()).await;
        self.observe(result).await
    }

    pub async fn checkout(&self) -> Result<CheckoutReceipt, ClientError> {
        let token = self.session.token().await;
        let result = self.api.checkout(token.as_ref()).await;
        self.observe(result).await
    }

    pub async fn order_action(
        &self,
        order_id: OrderId,
        action: OrderAction,
    ) -> Result<(), ClientError> {
        let token = self.session.token().await;
        let result = self
            .api
            .order_action(token.as_ref(), order_id, action)
            .await;
        self.observe(result).await
    }

    pub async fn order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, ClientError> {
        let token = self.session.token().await;
        let result = self.api.order_items(token.as_ref(), order_id).await;
        self.observe(result).await
    }

    pub async fn product_options(&self) -> Result<Vec<ProductOption>, ClientError> {
        let token = self.session.token().await;
        let result = self.api.product_options(token.as_ref()).await;
        self.observe(result).await
    }
}
