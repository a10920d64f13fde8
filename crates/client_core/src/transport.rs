//! Request-transport seam between the client core and the storefront API.

use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{CartLineId, InventoryId, OrderAction, OrderId, ResourceKind},
    error::ApiError,
    protocol::{
        CartLine, CheckoutReceipt, LoginResponse, OrderItem, PageResult, ProductOption, Query,
        Registration, User,
    },
};
use uuid::Uuid;

use crate::session::AccessToken;

/// Logical operations of the remote API. Every call except `login` and
/// `register` receives the current credential when one exists.
#[async_trait]
pub trait StoreApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError>;
    async fn register(&self, registration: &Registration) -> Result<(), ApiError>;
    async fn profile(&self, token: Option<&AccessToken>) -> Result<User, ApiError>;

    async fn list_resource(
        &self,
        token: Option<&AccessToken>,
        kind: ResourceKind,
        query: &Query,
    ) -> Result<PageResult<Value>, ApiError>;
    async fn create_resource(
        &self,
        token: Option<&AccessToken>,
        kind: ResourceKind,
        body: Value,
    ) -> Result<(), ApiError>;
    async fn update_resource(
        &self,
        token: Option<&AccessToken>,
        kind: ResourceKind,
        id: Uuid,
        body: Value,
    ) -> Result<(), ApiError>;
    async fn delete_resource(
        &self,
        token: Option<&AccessToken>,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<(), ApiError>;

    async fn get_cart(&self, token: Option<&AccessToken>) -> Result<Vec<CartLine>, ApiError>;
    async fn add_to_cart(
        &self,
        token: Option<&AccessToken>,
        inventory_id: InventoryId,
        quantity: u32,
    ) -> Result<(), ApiError>;
    async fn update_cart_line(
        &self,
        token: Option<&AccessToken>,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<(), ApiError>;
    async fn remove_cart_line(
        &self,
        token: Option<&AccessToken>,
        line_id: CartLineId,
    ) -> Result<(), ApiError>;
    async fn clear_cart(&self, token: Option<&AccessToken>) -> Result<(), ApiError>;
    async fn checkout(&self, token: Option<&AccessToken>) -> Result<CheckoutReceipt, ApiError>;

    async fn order_action(
        &self,
        token: Option<&AccessToken>,
        order_id: OrderId,
        action: OrderAction,
    ) -> Result<(), ApiError>;
    async fn order_items(
        &self,
        token: Option<&AccessToken>,
        order_id: OrderId,
    ) -> Result<Vec<OrderItem>, ApiError>;

    /// Catalog products a seller can stock.
    async fn product_options(
        &self,
        token: Option<&AccessToken>,
    ) -> Result<Vec<ProductOption>, ApiError>;
}
