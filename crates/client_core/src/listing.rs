use shared::{
    domain::{OrderAction, OrderId, ResourceKind},
    protocol::{Order, PageResult, Query, QueryPatch},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    error::ClientError,
    gateway::Gateway,
    types::{Editable, Listable},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response belonged to the latest issued query and is now visible.
    Committed,
    /// A newer query was issued while this one was in flight; its result was dropped.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct ListSnapshot<T> {
    pub query: Query,
    pub items: Vec<T>,
    pub total_records: u64,
    pub loading: bool,
}

impl<T> ListSnapshot<T> {
    pub fn page_count(&self) -> u64 {
        let size = u64::from(self.query.size.max(1));
        self.total_records.div_ceil(size)
    }
}

struct ListState<T> {
    query: Query,
    items: Vec<T>,
    total_records: u64,
    loading: bool,
    generation: u64,
}

/// Query state and latest page for one paginated remote resource.
pub struct ListQueryController<T: Listable> {
    gateway: Gateway,
    kind: ResourceKind,
    state: Mutex<ListState<T>>,
}

impl<T: Listable> ListQueryController<T> {
    pub fn new(gateway: Gateway) -> Self {
        Self::with_query(gateway, Query::default_for(T::KIND))
    }

    pub fn with_query(gateway: Gateway, query: Query) -> Self {
        Self::build(gateway, T::KIND, query)
    }

    /// A controller over another collection with the same record shape,
    /// such as order history.
    pub(crate) fn for_kind(gateway: Gateway, kind: ResourceKind) -> Self {
        Self::build(gateway, kind, Query::default_for(kind))
    }

    fn build(gateway: Gateway, kind: ResourceKind, query: Query) -> Self {
        Self {
            gateway,
            kind,
            state: Mutex::new(ListState {
                query,
                items: Vec::new(),
                total_records: 0,
                loading: false,
                generation: 0,
            }),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub async fn snapshot(&self) -> ListSnapshot<T> {
        let state = self.state.lock().await;
        ListSnapshot {
            query: state.query.clone(),
            items: state.items.clone(),
            total_records: state.total_records,
            loading: state.loading,
        }
    }

    pub async fn query(&self) -> Query {
        self.state.lock().await.query.clone()
    }

    pub async fn items(&self) -> Vec<T> {
        self.state.lock().await.items.clone()
    }

    pub async fn total_records(&self) -> u64 {
        self.state.lock().await.total_records
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    /// Merges `patch` into the query and fetches. Anything other than a
    /// page-only change goes back to page 1.
    pub async fn set_query(&self, patch: QueryPatch) -> Result<FetchOutcome, ClientError> {
        self.ensure_visible().await?;
        let (generation, query) = {
            let mut state = self.state.lock().await;
            state.query.apply(patch);
            Self::begin_fetch(&mut state)
        };
        self.run_fetch(generation, query).await
    }

    /// Re-issues the current query unchanged.
    pub async fn refetch(&self) -> Result<FetchOutcome, ClientError> {
        self.ensure_visible().await?;
        let (generation, query) = {
            let mut state = self.state.lock().await;
            Self::begin_fetch(&mut state)
        };
        self.run_fetch(generation, query).await
    }

    pub async fn delete(&self, id: T::Id) -> Result<FetchOutcome, ClientError> {
        self.ensure_visible().await?;
        self.gateway.delete_resource(self.kind, id.into()).await?;
        info!(kind = %self.kind, %id, "deleted record");
        self.refetch().await
    }

    async fn ensure_visible(&self) -> Result<(), ClientError> {
        let role = self.gateway.require_role().await?;
        if role.can_list(self.kind) {
            Ok(())
        } else {
            Err(ClientError::Forbidden {
                role,
                action: format!("list {}", self.kind),
            })
        }
    }

    fn begin_fetch(state: &mut ListState<T>) -> (u64, Query) {
        state.generation += 1;
        state.loading = true;
        (state.generation, state.query.clone())
    }

    async fn run_fetch(&self, generation: u64, query: Query) -> Result<FetchOutcome, ClientError> {
        let result = match self.gateway.list_resource(self.kind, &query).await {
            Ok(page) => decode_page::<T>(self.kind, page, query.size),
            Err(err) => Err(err),
        };

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(
                kind = %self.kind,
                generation,
                latest = state.generation,
                "discarding superseded list response"
            );
            return Ok(FetchOutcome::Superseded);
        }

        state.loading = false;
        match result {
            Ok(page) => {
                debug!(
                    kind = %self.kind,
                    page = query.page,
                    items = page.items.len(),
                    total = page.total_records,
                    "list page committed"
                );
                state.items = page.items;
                state.total_records = page.total_records;
                Ok(FetchOutcome::Committed)
            }
            Err(err) => {
                warn!(kind = %self.kind, "list fetch failed; keeping previous page: {err}");
                Err(err)
            }
        }
    }
}

impl<T: Editable> ListQueryController<T> {
    pub async fn create(&self, draft: &T::Draft) -> Result<FetchOutcome, ClientError> {
        self.ensure_visible().await?;
        let body = serde_json::to_value(draft)
            .map_err(|err| ClientError::decode(format!("{} draft", self.kind), err))?;
        self.gateway.create_resource(self.kind, body).await?;
        info!(kind = %self.kind, "created record");
        self.refetch().await
    }

    pub async fn update(&self, id: T::Id, draft: &T::Draft) -> Result<FetchOutcome, ClientError> {
        self.ensure_visible().await?;
        let body = serde_json::to_value(draft)
            .map_err(|err| ClientError::decode(format!("{} draft", self.kind), err))?;
        self.gateway.update_resource(self.kind, id.into(), body).await?;
        info!(kind = %self.kind, %id, "updated record");
        self.refetch().await
    }
}

impl ListQueryController<Order> {
    /// Moves an order on the current page through its status workflow.
    pub async fn apply_order_action(
        &self,
        order_id: OrderId,
        action: OrderAction,
    ) -> Result<FetchOutcome, ClientError> {
        self.ensure_visible().await?;
        let role = self.gateway.require_role().await?;
        let status = {
            let state = self.state.lock().await;
            state
                .items
                .iter()
                .find(|order| order.id == order_id)
                .map(|order| order.status)
                .ok_or(ClientError::UnknownOrder(order_id))?
        };

        if !status.allows(role, action) {
            return Err(ClientError::InvalidOrderAction {
                order_id,
                status,
                role,
                action,
            });
        }

        self.gateway.order_action(order_id, action).await?;
        info!(%order_id, ?action, to = ?action.target_status(), "order status changed");
        self.refetch().await
    }
}

fn decode_page<T: Listable>(
    kind: ResourceKind,
    page: PageResult<serde_json::Value>,
    size: u32,
) -> Result<PageResult<T>, ClientError> {
    let mut raw_items = page.items;
    let limit = size as usize;
    if raw_items.len() > limit {
        warn!(
            kind = %kind,
            returned = raw_items.len(),
            size,
            "server returned more items than the page size; truncating"
        );
        raw_items.truncate(limit);
    }

    let items = raw_items
        .into_iter()
        .map(serde_json::from_value::<T>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ClientError::decode(format!("{} page", kind), err))?;

    Ok(PageResult {
        items,
        total_records: page.total_records,
    })
}

#[cfg(test)]
#[path = "tests/listing_tests.rs"]
mod tests;
