use shared::{
    domain::{CartLineId, OrderAction, OrderId, OrderStatus, Role},
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// A mutation was attempted with no active session. Never hits the network.
    #[error("sign in required")]
    SignInRequired,
    #[error("{role} is not allowed to {action}")]
    Forbidden { role: Role, action: String },
    #[error("order {order_id} is {status:?}; {role} cannot {action:?} it")]
    InvalidOrderAction {
        order_id: OrderId,
        status: OrderStatus,
        role: Role,
        action: OrderAction,
    },
    #[error("order {0} is not on the current page")]
    UnknownOrder(OrderId),
    #[error("cart line {0} is not in the cart")]
    UnknownCartLine(CartLineId),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    /// True for both the local "no session" condition and a server-side credential rejection.
    pub fn requires_reauth(&self) -> bool {
        match self {
            ClientError::SignInRequired => true,
            ClientError::Api(err) => err.code == ErrorCode::Unauthorized,
            _ => false,
        }
    }
}
