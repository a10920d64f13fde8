use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use client_core::{ClientError, Settings, Storefront};
use serde_json::{json, Value};
use shared::{
    domain::{InventoryId, Role},
    protocol::{Order, QueryPatch, StoreProduct, User},
};
use tokio::{net::TcpListener, sync::Mutex};
use uuid::Uuid;

// "buyer:pw"
const BUYER_BASIC: &str = "Basic YnV5ZXI6cHc=";
const BUYER_TOKEN: &str = "Bearer buyer-token";

#[derive(Default)]
struct Store {
    products: Vec<Value>,
    cart: Vec<Value>,
    orders: Vec<Value>,
    revoked: bool,
}

type Shared = Arc<Mutex<Store>>;

fn authorized(headers: &HeaderMap, store: &Store) -> bool {
    !store.revoked
        && headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == BUYER_TOKEN)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Unauthorized"}))).into_response()
}

async fn login(headers: HeaderMap) -> Response {
    let ok = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == BUYER_BASIC);
    if ok {
        Json(json!({"access_token": "buyer-token"})).into_response()
    } else {
        unauthorized()
    }
}

async fn profile(State(store): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&headers, &*store.lock().await) {
        return unauthorized();
    }
    Json(json!({
        "id": "5b0b7c8a-3f1e-4d0e-9a55-2f6a7c9e0b11",
        "username": "buyer",
        "role": "BUYER"
    }))
    .into_response()
}

async fn products(State(store): State<Shared>, headers: HeaderMap) -> Response {
    let store = store.lock().await;
    if !authorized(&headers, &store) {
        return unauthorized();
    }
    Json(json!({"result": store.products, "total_record": store.products.len()})).into_response()
}

async fn orders(State(store): State<Shared>, headers: HeaderMap) -> Response {
    let store = store.lock().await;
    if !authorized(&headers, &store) {
        return unauthorized();
    }
    Json(json!({"result": store.orders, "total_record": store.orders.len()})).into_response()
}

async fn cart(State(store): State<Shared>, headers: HeaderMap) -> Response {
    let store = store.lock().await;
    if !authorized(&headers, &store) {
        return unauthorized();
    }
    Json(json!({"items": store.cart})).into_response()
}

async fn add_to_cart(
    State(store): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut store = store.lock().await;
    if !authorized(&headers, &store) {
        return unauthorized();
    }
    let product_id = body["product_id"].clone();
    let quantity = body["quantity"].as_u64().unwrap_or(1);
    if let Some(line) = store
        .cart
        .iter_mut()
        .find(|line| line["product_id"] == product_id)
    {
        let current = line["quantity"].as_u64().unwrap_or(0);
        line["quantity"] = json!(current + quantity);
        return StatusCode::OK.into_response();
    }
    let Some(product) = store
        .products
        .iter()
        .find(|p| p["id"] == product_id)
        .cloned()
    else {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "no such item"}))).into_response();
    };
    store.cart.push(json!({
        "id": Uuid::new_v4(),
        "product_id": product_id,
        "product_name": product["product_name"],
        "price": product["price"],
        "quantity": quantity,
    }));
    StatusCode::CREATED.into_response()
}

async fn update_line(
    State(store): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Response {
    let mut store = store.lock().await;
    if !authorized(&headers, &store) {
        return unauthorized();
    }
    match store.cart.iter_mut().find(|line| line["id"] == json!(id)) {
        Some(line) => {
            line["quantity"] = body["quantity"].clone();
            StatusCode::OK.into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn checkout(State(store): State<Shared>, headers: HeaderMap) -> Response {
    let mut store = store.lock().await;
    if !authorized(&headers, &store) {
        return unauthorized();
    }
    if store.cart.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "cart is empty"}))).into_response();
    }
    let order_id = Uuid::new_v4();
    let items: Vec<Value> = store
        .cart
        .drain(..)
        .map(|line| {
            json!({
                "id": Uuid::new_v4(),
                "name": line["product_name"],
                "price": line["price"],
                "quantity": line["quantity"],
            })
        })
        .collect();
    store.orders.push(json!({
        "id": order_id,
        "status": "PENDING",
        "created_at": "2026-10-19T08:30:00Z",
        "items": items,
    }));
    Json(json!({"order_id": order_id, "code": "ORD-0001"})).into_response()
}

async fn spawn_store(seed_products: Vec<Value>) -> (String, Shared) {
    let store: Shared = Arc::new(Mutex::new(Store {
        products: seed_products,
        ..Store::default()
    }));
    let app = Router::new()
        .route("/login", post(login))
        .route("/secured/profile", get(profile))
        .route("/secured/products", get(products))
        .route("/secured/orders", get(orders))
        .route("/secured/cart", get(cart).post(add_to_cart))
        .route("/secured/cart/checkout", post(checkout))
        .route("/secured/cart/:id", patch(update_line))
        .with_state(store.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (format!("http://{addr}"), store)
}

fn settings_for(base: String) -> Settings {
    Settings {
        api_base: base,
        request_timeout_secs: 5,
    }
}

#[tokio::test]
async fn buyer_browses_fills_cart_and_checks_out() {
    let shirt = Uuid::new_v4();
    let (base, _store) = spawn_store(vec![
        json!({"id": shirt, "product_name": "Linen shirt", "price": 25_000, "quantity": 9}),
        json!({"id": Uuid::new_v4(), "product_name": "Wool scarf", "price": 18_000, "quantity": 3}),
    ])
    .await;
    let storefront = Storefront::connect(&settings_for(base)).expect("storefront");

    let user: User = storefront.login("buyer", "pw").await.expect("login");
    assert_eq!(user.role, Role::Buyer);
    assert!(storefront.cart().is_empty().await);

    let products = storefront.list::<StoreProduct>().await.expect("products");
    products.refetch().await.expect("fetch products");
    assert_eq!(products.total_records().await, 2);

    let cart = storefront.cart();
    cart.add_item(InventoryId(shirt), 1).await.expect("add");
    cart.add_item(InventoryId(shirt), 1).await.expect("add again");
    let lines = cart.lines().await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);

    cart.increment(lines[0].id).await.expect("increment");
    assert_eq!(cart.subtotal().await, 75_000);
    assert_eq!(cart.item_count().await, 3);

    let receipt = cart.checkout().await.expect("checkout");
    assert_eq!(receipt.code.as_deref(), Some("ORD-0001"));
    assert!(cart.is_empty().await);

    let orders = storefront.list::<Order>().await.expect("orders");
    orders.set_query(QueryPatch::page(1)).await.expect("orders page");
    let placed = orders.items().await;
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].items[0].quantity, 3);
}

#[tokio::test]
async fn buyer_cannot_open_admin_lists() {
    let (base, _store) = spawn_store(Vec::new()).await;
    let storefront = Storefront::connect(&settings_for(base)).expect("storefront");
    storefront.login("buyer", "pw").await.expect("login");

    let err = storefront.list::<User>().await.err().expect("forbidden");
    assert!(matches!(err, ClientError::Forbidden { role: Role::Buyer, .. }));
}

#[tokio::test]
async fn revoked_credential_signs_out_and_clears_cart() {
    let shirt = Uuid::new_v4();
    let (base, store) = spawn_store(vec![json!({
        "id": shirt, "product_name": "Linen shirt", "price": 25_000, "quantity": 9
    })])
    .await;
    let storefront = Storefront::connect(&settings_for(base)).expect("storefront");
    storefront.login("buyer", "pw").await.expect("login");
    storefront
        .cart()
        .add_item(InventoryId(shirt), 1)
        .await
        .expect("add");

    store.lock().await.revoked = true;
    let line = storefront.cart().lines().await[0].id;
    let err = storefront
        .cart()
        .increment(line)
        .await
        .expect_err("revoked");
    assert!(err.requires_reauth());
    assert!(!storefront.session().is_signed_in().await);
    assert!(storefront.cart().is_empty().await);

    let err = storefront
        .cart()
        .add_item(InventoryId(shirt), 1)
        .await
        .expect_err("signed out");
    assert!(matches!(err, ClientError::SignInRequired));
}

#[tokio::test]
async fn logout_tears_down_session_and_cart() {
    let shirt = Uuid::new_v4();
    let (base, _store) = spawn_store(vec![json!({
        "id": shirt, "product_name": "Linen shirt", "price": 25_000, "quantity": 9
    })])
    .await;
    let storefront = Storefront::connect(&settings_for(base)).expect("storefront");
    storefront.login("buyer", "pw").await.expect("login");
    storefront
        .cart()
        .add_item(InventoryId(shirt), 2)
        .await
        .expect("add");

    storefront.logout().await;
    assert!(!storefront.session().is_signed_in().await);
    assert!(storefront.cart().is_empty().await);

    // The server still holds the cart; signing back in restores it.
    storefront.login("buyer", "pw").await.expect("login again");
    assert_eq!(storefront.cart().item_count().await, 2);
}

#[tokio::test]
async fn wrong_password_is_reported() {
    let (base, _store) = spawn_store(Vec::new()).await;
    let storefront = Storefront::connect(&settings_for(base)).expect("storefront");

    let err = storefront.login("buyer", "nope").await.expect_err("bad password");
    assert!(err.requires_reauth());
    assert!(!storefront.session().is_signed_in().await);
}
