use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{CartLineId, InventoryId, OrderAction, OrderId, ResourceKind},
    error::{ApiError, ErrorBody, ErrorCode},
    protocol::{
        AddToCartRequest, CartLine, CartResponse, CheckoutReceipt, LoginResponse, OrderItem,
        PageResult, ProductOption, Query, Registration, UpdateCartLineRequest, User,
    },
};
use tracing::debug;
use uuid::Uuid;

use crate::{config::Settings, error::ClientError, session::AccessToken, transport::StoreApi};

const CART_PATH: &str = "/secured/cart";
const PRODUCT_OPTIONS_PATH: &str = "/secured/seller/products";

/// `StoreApi` over the storefront's JSON/HTTP endpoints.
pub struct HttpStoreApi {
    http: Client,
    api_base: String,
}

impl HttpStoreApi {
    pub fn new(settings: &Settings) -> Result<Self, ClientError> {
        let base = settings.api_base_url()?;
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|err| ClientError::Config(format!("failed to build http client: {err}")))?;
        Ok(Self {
            http,
            api_base: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        token: Option<&AccessToken>,
    ) -> Result<Response, ApiError> {
        let request = match token {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        };
        let response = request
            .send()
            .await
            .map_err(|err| ApiError::transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let fallback = status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or(fallback);
        debug!(status = status.as_u16(), %message, "storefront api returned an error");
        Err(ApiError::new(ErrorCode::from_status(status.as_u16()), message))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        token: Option<&AccessToken>,
    ) -> Result<T, ApiError> {
        self.send(request, token)
            .await?
            .json::<T>()
            .await
            .map_err(|err| ApiError::new(ErrorCode::Internal, format!("invalid response body: {err}")))
    }

    async fn send_ack(
        &self,
        request: RequestBuilder,
        token: Option<&AccessToken>,
    ) -> Result<(), ApiError> {
        self.send(request, token).await.map(|_| ())
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"))
}

#[async_trait]
impl StoreApi for HttpStoreApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = self
            .http
            .post(self.url("/login"))
            .basic_auth(username, Some(password));
        self.send_json(request, None).await
    }

    async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let request = self.http.post(self.url("/register")).json(registration);
        self.send_ack(request, None).await
    }

    async fn profile(&self, token: Option<&AccessToken>) -> Result<User, ApiError> {
        self.send_json(self.http.get(self.url("/secured/profile")), token)
            .await
    }

    async fn list_resource(
        &self,
        token: Option<&AccessToken>,
        kind: ResourceKind,
        query: &Query,
    ) -> Result<PageResult<Value>, ApiError> {
        let request = self
            .http
            .get(self.url(kind.collection_path()))
            .query(&query.to_params());
        self.send_json(request, token).await
    }

    async fn create_resource(
        &self,
        token: Option<&AccessToken>,
        kind: ResourceKind,
        body: Value,
    ) -> Result<(), ApiError> {
        let request = self.http.post(self.url(kind.collection_path())).json(&body);
        self.send_ack(request, token).await
    }

    async fn update_resource(
        &self,
        token: Option<&AccessToken>,
        kind: ResourceKind,
        id: Uuid,
        body: Value,
    ) -> Result<(), ApiError> {
        let request = self
            .http
            .patch(self.url(&format!("{}/{id}", kind.collection_path())))
            .json(&body);
        self.send_ack(request, token).await
    }

    async fn delete_resource(
        &self,
        token: Option<&AccessToken>,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<(), ApiError> {
        let request = self
            .http
            .delete(self.url(&format!("{}/{id}", kind.collection_path())));
        self.send_ack(request, token).await
    }

    async fn get_cart(&self, token: Option<&AccessToken>) -> Result<Vec<CartLine>, ApiError> {
        let cart: CartResponse = self
            .send_json(self.http.get(self.url(CART_PATH)), token)
            .await?;
        Ok(cart.items)
    }

    async fn add_to_cart(
        &self,
        token: Option<&AccessToken>,
        inventory_id: InventoryId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let request = self.http.post(self.url(CART_PATH)).json(&AddToCartRequest {
            product_id: inventory_id,
            quantity,
        });
        self.send_ack(request, token).await
    }

    async fn update_cart_line(
        &self,
        token: Option<&AccessToken>,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let request = self
            .http
            .patch(self.url(&format!("{CART_PATH}/{line_id}")))
            .json(&UpdateCartLineRequest { quantity });
        self.send_ack(request, token).await
    }

    async fn remove_cart_line(
        &self,
        token: Option<&AccessToken>,
        line_id: CartLineId,
    ) -> Result<(), ApiError> {
        let request = self.http.delete(self.url(&format!("{CART_PATH}/{line_id}")));
        self.send_ack(request, token).await
    }

    async fn clear_cart(&self, token: Option<&AccessToken>) -> Result<(), ApiError> {
        self.send_ack(self.http.delete(self.url(CART_PATH)), token)
            .await
    }

    async fn checkout(&self, token: Option<&AccessToken>) -> Result<CheckoutReceipt, ApiError> {
        let response = self
            .send(
                self.http.post(self.url(&format!("{CART_PATH}/checkout"))),
                token,
            )
            .await?;

        if is_json(&response) {
            return response.json::<CheckoutReceipt>().await.map_err(|err| {
                ApiError::new(ErrorCode::Internal, format!("invalid checkout receipt: {err}"))
            });
        }

        let text = response.text().await.unwrap_or_default();
        Ok(CheckoutReceipt {
            order_id: None,
            code: None,
            message: (!text.trim().is_empty()).then_some(text),
        })
    }

    async fn order_action(
        &self,
        token: Option<&AccessToken>,
        order_id: OrderId,
        action: OrderAction,
    ) -> Result<(), ApiError> {
        let path = format!(
            "{}/{order_id}/{}",
            ResourceKind::Orders.collection_path(),
            action.path_segment()
        );
        self.send_ack(self.http.post(self.url(&path)), token).await
    }

    async fn order_items(
        &self,
        token: Option<&AccessToken>,
        order_id: OrderId,
    ) -> Result<Vec<OrderItem>, ApiError> {
        let path = format!("{}/{order_id}/items", ResourceKind::Orders.collection_path());
        self.send_json(self.http.get(self.url(&path)), token).await
    }

    async fn product_options(
        &self,
        token: Option<&AccessToken>,
    ) -> Result<Vec<ProductOption>, ApiError> {
        self.send_json(self.http.get(self.url(PRODUCT_OPTIONS_PATH)), token)
            .await
    }
}

#[cfg(test)]
#[path = "tests/http_api_tests.rs"]
mod tests;
