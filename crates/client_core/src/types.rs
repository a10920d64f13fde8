//! Binds the catalog records in `shared::protocol` to the resource kinds they are listed under.

use std::fmt::Display;

use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{InventoryId, OrderId, ProductId, ResourceKind, UserId},
    protocol::{
        InventoryDraft, InventoryItem, Order, Product, ProductDraft, StoreProduct, User,
        UserDraft,
    },
};
use uuid::Uuid;

pub trait Listable: DeserializeOwned + Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Display + Into<Uuid> + Send + Sync;
    const KIND: ResourceKind;

    fn id(&self) -> Self::Id;
}

/// Records that can be created or edited through a form submission.
pub trait Editable: Listable {
    type Draft: Serialize + Send + Sync;
}

impl Listable for User {
    type Id = UserId;
    const KIND: ResourceKind = ResourceKind::Users;

    fn id(&self) -> UserId {
        self.id
    }
}

impl Editable for User {
    type Draft = UserDraft;
}

impl Listable for Product {
    type Id = ProductId;
    const KIND: ResourceKind = ResourceKind::AdminProducts;

    fn id(&self) -> ProductId {
        self.id
    }
}

impl Editable for Product {
    type Draft = ProductDraft;
}

impl Listable for StoreProduct {
    type Id = InventoryId;
    const KIND: ResourceKind = ResourceKind::StoreProducts;

    fn id(&self) -> InventoryId {
        self.id
    }
}

impl Listable for InventoryItem {
    type Id = InventoryId;
    const KIND: ResourceKind = ResourceKind::Inventory;

    fn id(&self) -> InventoryId {
        self.id
    }
}

impl Editable for InventoryItem {
    type Draft = InventoryDraft;
}

impl Listable for Order {
    type Id = OrderId;
    const KIND: ResourceKind = ResourceKind::Orders;

    fn id(&self) -> OrderId {
        self.id
    }
}
