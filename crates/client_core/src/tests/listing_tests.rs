use super::*;

use std::{sync::Arc, time::Duration};

use serde_json::json;
use shared::{
    domain::{Role, SortOrder},
    error::{ApiError, ErrorCode},
    protocol::{Product, ProductDraft, StoreProduct, User},
};
use uuid::Uuid;

use crate::fake_api::{server_error, signed_in, store_product, FakeStoreApi};

fn seed_products(api: &FakeStoreApi, count: usize) {
    let products = (0..count)
        .map(|i| store_product(&format!("Product {i:02}"), 1_000 + i as u64))
        .collect();
    api.seed(ResourceKind::StoreProducts, products);
}

async fn wait_for_list_calls(api: &FakeStoreApi, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while api.count_of("list_resource") < expected {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("list call was issued");
}

#[tokio::test]
async fn filter_changes_reset_page_but_page_moves_do_not() {
    let (api, gateway) = signed_in(Role::Buyer).await;
    seed_products(&api, 30);
    let controller = ListQueryController::<StoreProduct>::new(gateway);

    controller.set_query(QueryPatch::page(3)).await.expect("page 3");
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.query.page, 3);
    assert_eq!(snapshot.items.len(), 6);
    assert_eq!(snapshot.total_records, 30);
    assert_eq!(snapshot.page_count(), 3);

    controller
        .set_query(QueryPatch::sort("price", SortOrder::Asc))
        .await
        .expect("sort");
    assert_eq!(controller.query().await.page, 1);

    controller.set_query(QueryPatch::page(2)).await.expect("page 2");
    controller.set_query(QueryPatch::size(5)).await.expect("size");
    let query = controller.query().await;
    assert_eq!(query.page, 1);
    assert_eq!(query.size, 5);
    assert_eq!(query.sort_by, "price");
    assert_eq!(controller.items().await.len(), 5);
}

#[tokio::test]
async fn later_query_wins_when_it_resolves_first() {
    let (api, gateway) = signed_in(Role::Buyer).await;
    api.seed(
        ResourceKind::StoreProducts,
        vec![
            store_product("Running shoe", 5_000),
            store_product("Leather bag", 9_000),
            store_product("Canvas bag", 3_000),
        ],
    );
    let controller = Arc::new(ListQueryController::<StoreProduct>::new(gateway));
    let release_shoe = api.gate_next_list();
    let release_bag = api.gate_next_list();

    let shoe = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.set_query(QueryPatch::search("shoe")).await }
    });
    wait_for_list_calls(&api, 1).await;

    let bag = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.set_query(QueryPatch::search("bag")).await }
    });
    wait_for_list_calls(&api, 2).await;

    release_bag.send(()).expect("release bag");
    let bag_outcome = bag.await.expect("join").expect("bag fetch");
    assert_eq!(bag_outcome, FetchOutcome::Committed);

    release_shoe.send(()).expect("release shoe");
    let shoe_outcome = shoe.await.expect("join").expect("shoe fetch");
    assert_eq!(shoe_outcome, FetchOutcome::Superseded);

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.query.search, "bag");
    assert_eq!(snapshot.total_records, 2);
    assert!(snapshot
        .items
        .iter()
        .all(|item| item.product_name.ends_with("bag")));
    assert!(!snapshot.loading);
}

#[tokio::test]
async fn earlier_query_resolving_first_is_discarded() {
    let (api, gateway) = signed_in(Role::Buyer).await;
    api.seed(
        ResourceKind::StoreProducts,
        vec![
            store_product("Running shoe", 5_000),
            store_product("Leather bag", 9_000),
        ],
    );
    let controller = Arc::new(ListQueryController::<StoreProduct>::new(gateway));
    let release_shoe = api.gate_next_list();
    let release_bag = api.gate_next_list();

    let shoe = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.set_query(QueryPatch::search("shoe")).await }
    });
    wait_for_list_calls(&api, 1).await;
    let bag = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.set_query(QueryPatch::search("bag")).await }
    });
    wait_for_list_calls(&api, 2).await;

    release_shoe.send(()).expect("release shoe");
    let shoe_outcome = shoe.await.expect("join").expect("shoe fetch");
    assert_eq!(shoe_outcome, FetchOutcome::Superseded);
    assert!(controller.items().await.is_empty());
    assert!(controller.is_loading().await);

    release_bag.send(()).expect("release bag");
    bag.await.expect("join").expect("bag fetch");

    let items = controller.items().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_name, "Leather bag");
    assert!(!controller.is_loading().await);
}

#[tokio::test]
async fn stale_refetch_does_not_overwrite_newer_search() {
    let (api, gateway) = signed_in(Role::Buyer).await;
    seed_products(&api, 3);
    let controller = Arc::new(ListQueryController::<StoreProduct>::new(gateway));
    api.fail_next("list_resource", server_error("boom"));

    // The failing call returns before the second is issued, so it is still current.
    let err = controller
        .set_query(QueryPatch::search("Product"))
        .await
        .expect_err("first fetch fails");
    assert!(matches!(err, ClientError::Api(_)));

    let release = api.gate_next_list();
    let pending = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.refetch().await }
    });
    wait_for_list_calls(&api, 2).await;
    controller
        .set_query(QueryPatch::search("Product 01"))
        .await
        .expect("newer fetch");
    release.send(()).expect("release");
    assert_eq!(
        pending.await.expect("join").expect("stale fetch"),
        FetchOutcome::Superseded
    );
    assert_eq!(controller.items().await.len(), 1);
}

#[tokio::test]
async fn failed_fetch_keeps_previous_page_visible() {
    let (api, gateway) = signed_in(Role::Buyer).await;
    seed_products(&api, 4);
    let controller = ListQueryController::<StoreProduct>::new(gateway);
    controller.refetch().await.expect("initial fetch");
    let before = controller.items().await;
    assert_eq!(before.len(), 4);

    api.fail_next("list_resource", server_error("database unavailable"));
    let err = controller
        .set_query(QueryPatch::search("Product 02"))
        .await
        .expect_err("fetch fails");
    assert!(matches!(err, ClientError::Api(ApiError { code: ErrorCode::Internal, .. })));

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.items, before);
    assert_eq!(snapshot.total_records, 4);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.query.search, "Product 02");

    // No automatic retry; a manual refetch recovers.
    assert_eq!(api.count_of("list_resource"), 2);
    controller.refetch().await.expect("manual refetch");
    assert_eq!(controller.items().await.len(), 1);
}

#[tokio::test]
async fn refetch_twice_yields_identical_results() {
    let (api, gateway) = signed_in(Role::Buyer).await;
    seed_products(&api, 15);
    let controller = ListQueryController::<StoreProduct>::new(gateway);

    controller.refetch().await.expect("first");
    let first = controller.snapshot().await;
    controller.refetch().await.expect("second");
    let second = controller.snapshot().await;

    assert_eq!(first.items, second.items);
    assert_eq!(first.total_records, second.total_records);
    assert_eq!(first.query, second.query);
}

#[tokio::test]
async fn oversized_server_page_is_truncated_to_page_size() {
    let (api, gateway) = signed_in(Role::Buyer).await;
    seed_products(&api, 20);
    api.return_oversize_pages();
    let controller = ListQueryController::<StoreProduct>::new(gateway);

    controller.set_query(QueryPatch::size(5)).await.expect("fetch");
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.items.len(), 5);
    assert_eq!(snapshot.total_records, 20);
}

#[tokio::test]
async fn role_without_access_is_rejected_without_a_request() {
    let (api, gateway) = signed_in(Role::Seller).await;
    let controller = ListQueryController::<User>::new(gateway);
    let calls_before = api.call_count();

    let err = controller.refetch().await.expect_err("sellers cannot list users");
    assert!(matches!(err, ClientError::Forbidden { role: Role::Seller, .. }));
    assert_eq!(api.call_count(), calls_before);
}

#[tokio::test]
async fn signed_out_list_requires_sign_in() {
    let (api, gateway) = signed_in(Role::Admin).await;
    gateway.session().end().await;
    let controller = ListQueryController::<User>::new(gateway);
    let calls_before = api.call_count();

    let err = controller.refetch().await.expect_err("no session");
    assert!(matches!(err, ClientError::SignInRequired));
    assert_eq!(api.call_count(), calls_before);
}

#[tokio::test]
async fn rejected_credential_ends_session() {
    let (api, gateway) = signed_in(Role::Buyer).await;
    let mut events = gateway.session().subscribe();
    let controller = ListQueryController::<StoreProduct>::new(gateway.clone());
    api.fail_next(
        "list_resource",
        ApiError::new(ErrorCode::Unauthorized, "token expired"),
    );

    let err = controller.refetch().await.expect_err("401");
    assert!(err.requires_reauth());
    assert!(!gateway.session().is_signed_in().await);
    assert_eq!(
        events.recv().await.expect("event"),
        crate::session::SessionEvent::Expired
    );
}

#[tokio::test]
async fn delete_refetches_current_page() {
    let (api, gateway) = signed_in(Role::Admin).await;
    let alice = Uuid::new_v4();
    api.seed(
        ResourceKind::Users,
        vec![
            json!({"id": alice, "username": "alice", "role": "BUYER"}),
            json!({"id": Uuid::new_v4(), "username": "bob", "role": "SELLER"}),
        ],
    );
    let controller = ListQueryController::<User>::new(gateway);
    controller.refetch().await.expect("initial");
    assert_eq!(controller.total_records().await, 2);

    let outcome = controller
        .delete(shared::domain::UserId(alice))
        .await
        .expect("delete");
    assert_eq!(outcome, FetchOutcome::Committed);
    let items = controller.items().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].username, "bob");
    assert_eq!(
        api.calls()[api.calls().len() - 2..],
        ["delete_resource", "list_resource"]
    );
}

#[tokio::test]
async fn created_product_appears_after_refetch() {
    let (api, gateway) = signed_in(Role::Admin).await;
    let controller = ListQueryController::<Product>::new(gateway);
    controller.refetch().await.expect("empty catalog");
    assert!(controller.items().await.is_empty());

    let draft = ProductDraft {
        name: "Espresso beans".into(),
        description: "Dark roast, 1kg".into(),
        category: Some("coffee".into()),
    };
    controller.create(&draft).await.expect("create");

    let items = controller.items().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Espresso beans");
    assert_eq!(
        api.calls()[api.calls().len() - 2..],
        ["create_resource", "list_resource"]
    );

    let renamed = ProductDraft {
        name: "Espresso beans (decaf)".into(),
        ..draft
    };
    controller.update(items[0].id, &renamed).await.expect("update");
    assert_eq!(controller.items().await[0].name, "Espresso beans (decaf)");
}

#[tokio::test]
async fn seller_moves_order_through_workflow() {
    let (api, gateway) = signed_in(Role::Seller).await;
    let order_id = Uuid::new_v4();
    api.seed(
        ResourceKind::Orders,
        vec![json!({"id": order_id, "status": "PENDING", "items": []})],
    );
    let controller = ListQueryController::<Order>::new(gateway);
    controller.refetch().await.expect("orders");

    controller
        .apply_order_action(OrderId(order_id), OrderAction::Confirm)
        .await
        .expect("confirm");
    assert_eq!(
        controller.items().await[0].status,
        shared::domain::OrderStatus::Confirmed
    );

    let err = controller
        .apply_order_action(OrderId(order_id), OrderAction::Complete)
        .await
        .expect_err("sellers cannot complete");
    assert!(matches!(err, ClientError::InvalidOrderAction { .. }));
    assert_eq!(api.count_of("order_action"), 1);
}

#[tokio::test]
async fn unknown_order_is_rejected_locally() {
    let (api, gateway) = signed_in(Role::Buyer).await;
    let controller = ListQueryController::<Order>::new(gateway);
    controller.refetch().await.expect("orders");

    let missing = OrderId::new();
    let err = controller
        .apply_order_action(missing, OrderAction::Cancel)
        .await
        .expect_err("not on page");
    assert!(matches!(err, ClientError::UnknownOrder(id) if id == missing));
    assert_eq!(api.count_of("order_action"), 0);
}
