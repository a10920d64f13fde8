use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    CartLineId, InventoryId, OrderId, OrderItemId, OrderStatus, ProductId, ResourceKind, Role,
    SortOrder, UserId,
};

/// Search, sort and page window for a paginated list request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub search: String,
    pub sort_by: String,
    pub order: SortOrder,
    pub page: u32,
    pub size: u32,
}

impl Query {
    pub fn new(sort_by: impl Into<String>, order: SortOrder, size: u32) -> Self {
        Self {
            search: String::new(),
            sort_by: sort_by.into(),
            order,
            page: 1,
            size: size.max(1),
        }
    }

    /// Default query used by each storefront view.
    pub fn default_for(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Users | ResourceKind::AdminProducts => {
                Self::new("name", SortOrder::Asc, 10)
            }
            ResourceKind::StoreProducts => Self::new("products.name", SortOrder::Desc, 12),
            ResourceKind::Inventory => Self::new("products.name", SortOrder::Asc, 10),
            ResourceKind::Orders | ResourceKind::OrderHistory => {
                Self::new("created_at", SortOrder::Desc, 10)
            }
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.size)
    }

    /// Merges `patch` into the query. Any changed field other than `page`
    /// sends the query back to page 1. Returns true when something changed.
    pub fn apply(&mut self, patch: QueryPatch) -> bool {
        let mut filter_changed = false;

        if let Some(search) = patch.search {
            if search != self.search {
                self.search = search;
                filter_changed = true;
            }
        }
        if let Some(sort_by) = patch.sort_by {
            if sort_by != self.sort_by {
                self.sort_by = sort_by;
                filter_changed = true;
            }
        }
        if let Some(order) = patch.order {
            if order != self.order {
                self.order = order;
                filter_changed = true;
            }
        }
        if let Some(size) = patch.size {
            let size = size.max(1);
            if size != self.size {
                self.size = size;
                filter_changed = true;
            }
        }

        let previous_page = self.page;
        if filter_changed {
            self.page = 1;
        } else if let Some(page) = patch.page {
            self.page = page.max(1);
        }

        filter_changed || self.page != previous_page
    }

    /// Query-string pairs in the storefront API's parameter names.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("search", self.search.clone()),
            ("sort_by", self.sort_by.clone()),
            ("order", self.order.as_str().to_string()),
            ("page", self.page.to_string()),
            ("size", self.size.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPatch {
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl QueryPatch {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    pub fn search(search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            ..Self::default()
        }
    }

    pub fn sort(sort_by: impl Into<String>, order: SortOrder) -> Self {
        Self {
            sort_by: Some(sort_by.into()),
            order: Some(order),
            ..Self::default()
        }
    }

    pub fn size(size: u32) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    #[serde(rename = "result", default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(rename = "total_record", default)]
    pub total_records: u64,
}

impl<T> PageResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_records: 0,
        }
    }

    pub fn page_count(&self, size: u32) -> u64 {
        let size = u64::from(size.max(1));
        self.total_records.div_ceil(size)
    }
}

impl<T> Default for PageResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    #[serde(alias = "productId", alias = "product_id")]
    pub inventory_id: InventoryId,
    #[serde(alias = "name")]
    pub product_name: String,
    #[serde(alias = "price")]
    pub unit_price: u64,
    pub quantity: u32,
    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl CartLine {
    pub fn line_total(&self) -> u64 {
        self.unit_price.saturating_mul(u64::from(self.quantity))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartResponse {
    #[serde(default)]
    pub items: Vec<CartLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: InventoryId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCartLineRequest {
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDraft {
    pub name: String,
    pub username: String,
    pub address: String,
    pub phone: String,
    pub password: String,
    pub role: Role,
}

/// Self-service sign-up. Only sellers and buyers may register this way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Catalog entry offered when a seller stocks a new inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: ProductId,
    pub name: String,
}

/// A seller's stocked product as listed in the buyer storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProduct {
    pub id: InventoryId,
    #[serde(alias = "name")]
    pub product_name: String,
    pub price: u64,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryId,
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub product_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_image: Option<String>,
    pub price: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryDraft {
    pub product_id: ProductId,
    pub price: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub name: String,
    pub price: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub status: OrderStatus,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}
