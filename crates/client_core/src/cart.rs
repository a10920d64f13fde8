use std::collections::HashMap;

use shared::{
    domain::{CartLineId, InventoryId, Role},
    protocol::{CartLine, CheckoutReceipt},
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::{
    error::ClientError,
    gateway::Gateway,
    optimistic::{apply_optimistic, SyncPhase, SyncTracked},
};

#[derive(Debug, Clone, Default)]
pub struct CartState {
    /// Session epoch the lines were loaded under.
    epoch: Option<u64>,
    lines: Vec<CartLine>,
    phases: HashMap<CartLineId, SyncPhase>,
}

impl CartState {
    fn line(&self, id: CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == id)
    }

    fn set_quantity(&mut self, id: CartLineId, quantity: u32) {
        if let Some(line) = self.lines.iter_mut().find(|line| line.id == id) {
            line.quantity = quantity;
        }
    }
}

impl SyncTracked for CartState {
    type Key = CartLineId;
    type Fresh = Vec<CartLine>;

    fn mark(&mut self, keys: &[CartLineId], phase: SyncPhase) {
        for key in keys {
            if phase == SyncPhase::Confirmed {
                self.phases.remove(key);
            } else {
                self.phases.insert(*key, phase);
            }
        }
    }

    fn adopt(&mut self, fresh: Vec<CartLine>) {
        self.lines = fresh;
        self.phases.clear();
    }

    fn restore(&mut self, keys: &[CartLineId], before: &Self) {
        for key in keys {
            let Some(position) = before.lines.iter().position(|line| line.id == *key) else {
                self.lines.retain(|line| line.id != *key);
                continue;
            };
            let previous = before.lines[position].clone();
            match self.lines.iter_mut().find(|line| line.id == *key) {
                Some(line) => *line = previous,
                None => {
                    let at = position.min(self.lines.len());
                    self.lines.insert(at, previous);
                }
            }
        }
    }
}

/// The signed-in buyer's cart with optimistic line edits.
pub struct CartReconciler {
    gateway: Gateway,
    state: Mutex<CartState>,
}

impl CartReconciler {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            state: Mutex::new(CartState::default()),
        }
    }

    pub async fn lines(&self) -> Vec<CartLine> {
        self.live().await.lines.clone()
    }

    pub async fn is_empty(&self) -> bool {
        self.live().await.lines.is_empty()
    }

    /// Computed from the live lines on every call.
    pub async fn subtotal(&self) -> u64 {
        self.live()
            .await
            .lines
            .iter()
            .fold(0u64, |acc, line| acc.saturating_add(line.line_total()))
    }

    pub async fn item_count(&self) -> u64 {
        self.live()
            .await
            .lines
            .iter()
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    /// `None` when the line is not in the cart.
    pub async fn line_phase(&self, id: CartLineId) -> Option<SyncPhase> {
        let state = self.live().await;
        state.line(id)?;
        Some(
            state
                .phases
                .get(&id)
                .copied()
                .unwrap_or(SyncPhase::Confirmed),
        )
    }

    /// Replaces the local cart with the server's copy.
    pub async fn load(&self) -> Result<(), ClientError> {
        self.require_buyer().await?;
        let fresh = self.gateway.get_cart().await?;
        debug!(lines = fresh.len(), "cart loaded");
        self.live().await.adopt(fresh);
        Ok(())
    }

    /// Local teardown on logout.
    pub async fn reset(&self) {
        *self.state.lock().await = CartState::default();
    }

    /// The cart state, emptied first if it was loaded under a session that
    /// has since ended or expired.
    async fn live(&self) -> MutexGuard<'_, CartState> {
        let epoch = self.gateway.session().epoch().await;
        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            if !state.lines.is_empty() {
                debug!("dropping cart from an ended session");
            }
            *state = CartState {
                epoch,
                ..CartState::default()
            };
        }
        state
    }

    pub async fn add_item(
        &self,
        inventory_id: InventoryId,
        quantity: u32,
    ) -> Result<(), ClientError> {
        self.require_buyer().await?;
        let quantity = quantity.max(1);
        self.gateway.add_to_cart(inventory_id, quantity).await?;
        // The server merges repeated adds into one line, so take its quantity.
        let fresh = self.gateway.get_cart().await?;
        self.live().await.adopt(fresh);
        info!(%inventory_id, quantity, "added to cart");
        Ok(())
    }

    pub async fn increment(&self, line_id: CartLineId) -> Result<(), ClientError> {
        let current = self.quantity_of(line_id).await?;
        self.set_line_quantity(line_id, current.saturating_add(1))
            .await
    }

    /// No-op at quantity 1.
    pub async fn decrement(&self, line_id: CartLineId) -> Result<(), ClientError> {
        let current = self.quantity_of(line_id).await?;
        if current <= 1 {
            debug!(%line_id, "decrement at floor ignored");
            return Ok(());
        }
        self.set_line_quantity(line_id, current - 1).await
    }

    pub async fn remove(&self, line_id: CartLineId) -> Result<(), ClientError> {
        self.quantity_of(line_id).await?;
        apply_optimistic(
            &self.state,
            &[line_id],
            |cart| cart.lines.retain(|line| line.id != line_id),
            self.gateway.remove_cart_line(line_id),
            || self.gateway.get_cart(),
        )
        .await
    }

    pub async fn clear(&self) -> Result<(), ClientError> {
        let keys: Vec<CartLineId> = {
            let state = self.live().await;
            state.lines.iter().map(|line| line.id).collect()
        };
        apply_optimistic(
            &self.state,
            &keys,
            |cart| cart.lines.clear(),
            self.gateway.clear_cart(),
            || self.gateway.get_cart(),
        )
        .await
    }

    /// Places the order. Nothing changes locally until the server confirms.
    pub async fn checkout(&self) -> Result<CheckoutReceipt, ClientError> {
        self.require_buyer().await?;
        match self.gateway.checkout().await {
            Ok(receipt) => {
                let mut state = self.live().await;
                state.lines.clear();
                state.phases.clear();
                drop(state);
                info!(order_id = ?receipt.order_id, "checkout confirmed");
                Ok(receipt)
            }
            Err(err) => {
                warn!("checkout failed; cart left unchanged: {err}");
                Err(err)
            }
        }
    }

    async fn set_line_quantity(&self, line_id: CartLineId, quantity: u32) -> Result<(), ClientError> {
        apply_optimistic(
            &self.state,
            &[line_id],
            |cart| cart.set_quantity(line_id, quantity),
            self.gateway.update_cart_line(line_id, quantity),
            || self.gateway.get_cart(),
        )
        .await
    }

    async fn quantity_of(&self, line_id: CartLineId) -> Result<u32, ClientError> {
        self.live()
            .await
            .line(line_id)
            .map(|line| line.quantity)
            .ok_or(ClientError::UnknownCartLine(line_id))
    }

    async fn require_buyer(&self) -> Result<(), ClientError> {
        let role = self.gateway.require_role().await?;
        if role == Role::Buyer {
            Ok(())
        } else {
            Err(ClientError::Forbidden {
                role,
                action: "use a cart".to_string(),
            })
        }
    }
}

#[cfg(test)]
#[path = "tests/cart_tests.rs"]
mod tests;
