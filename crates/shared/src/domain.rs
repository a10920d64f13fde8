use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Uuid {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ProductId);
id_newtype!(InventoryId);
id_newtype!(CartLineId);
id_newtype!(OrderId);
id_newtype!(OrderItemId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Seller,
    Buyer,
}

impl Role {
    /// Resource kinds a signed-in user with this role may page through.
    pub fn listable_kinds(self) -> &'static [ResourceKind] {
        match self {
            Role::Admin => &[ResourceKind::Users, ResourceKind::AdminProducts],
            Role::Seller => &[
                ResourceKind::Inventory,
                ResourceKind::Orders,
                ResourceKind::OrderHistory,
            ],
            Role::Buyer => &[
                ResourceKind::StoreProducts,
                ResourceKind::Orders,
                ResourceKind::OrderHistory,
            ],
        }
    }

    pub fn can_list(self, kind: ResourceKind) -> bool {
        self.listable_kinds().contains(&kind)
    }

    pub fn owns_cart(self) -> bool {
        self == Role::Buyer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Admin => "ADMIN",
            Role::Seller => "SELLER",
            Role::Buyer => "BUYER",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Users,
    AdminProducts,
    StoreProducts,
    Inventory,
    Orders,
    /// Completed and cancelled orders.
    OrderHistory,
}

impl ResourceKind {
    pub fn collection_path(self) -> &'static str {
        match self {
            ResourceKind::Users => "/secured/admin",
            ResourceKind::AdminProducts => "/secured/admin/products",
            ResourceKind::StoreProducts => "/secured/products",
            ResourceKind::Inventory => "/secured/seller/inventory",
            ResourceKind::Orders => "/secured/orders",
            ResourceKind::OrderHistory => "/secured/orders/history",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::Users => "users",
            ResourceKind::AdminProducts => "admin_products",
            ResourceKind::StoreProducts => "store_products",
            ResourceKind::Inventory => "inventory",
            ResourceKind::Orders => "orders",
            ResourceKind::OrderHistory => "order_history",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    ReadyToPickup,
    Cancelled,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Confirm,
    Ready,
    Cancel,
    Complete,
}

impl OrderAction {
    pub fn path_segment(self) -> &'static str {
        match self {
            OrderAction::Confirm => "confirm",
            OrderAction::Ready => "ready",
            OrderAction::Cancel => "cancel",
            OrderAction::Complete => "complete",
        }
    }

    pub fn target_status(self) -> OrderStatus {
        match self {
            OrderAction::Confirm => OrderStatus::Confirmed,
            OrderAction::Ready => OrderStatus::ReadyToPickup,
            OrderAction::Cancel => OrderStatus::Cancelled,
            OrderAction::Complete => OrderStatus::Done,
        }
    }
}

impl OrderStatus {
    /// Actions `role` may take on an order currently in this status.
    pub fn available_actions(self, role: Role) -> &'static [OrderAction] {
        match (role, self) {
            (Role::Seller, OrderStatus::Pending) => &[OrderAction::Confirm, OrderAction::Cancel],
            (Role::Seller, OrderStatus::Confirmed) => &[OrderAction::Ready, OrderAction::Cancel],
            (Role::Buyer, OrderStatus::Pending) => &[OrderAction::Cancel],
            (Role::Buyer, OrderStatus::ReadyToPickup) => &[OrderAction::Complete],
            _ => &[],
        }
    }

    pub fn allows(self, role: Role, action: OrderAction) -> bool {
        self.available_actions(role).contains(&action)
    }
}
