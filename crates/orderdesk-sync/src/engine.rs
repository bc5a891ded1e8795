//! The sync engine: three synchronised collections plus every operation the
//! user can trigger on them.

use std::sync::Arc;

use chrono::{Local, Utc};
use orderdesk_shared::constants::{
    FIELD_ATTACHMENT, FIELD_COMMENTS, FIELD_CUSTOMER_ID, FIELD_DATE, FIELD_STATUS, ORDER_DATE_FORMAT,
};
use orderdesk_shared::{CollectionKind, DocId, Fields, RemoteError};
use orderdesk_store::{
    BlobStore, Customer, Entity, Order, OrderStatus, Product, RemoteCollection, SqliteStore,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::attachments::{self, Attachment};
use crate::collection::{CollectionSync, LoadOutcome};
use crate::config::{DeleteGuard, SyncConfig};
use crate::drafts::{CustomerDraft, OrderDraft, ProductDraft};
use crate::error::{Result, SyncError};
use crate::events::{ViewBus, ViewEvent};
use crate::filter::{self, OrderFilter};

/// Remote handles for the three collections.
#[derive(Clone)]
pub struct Remotes {
    pub customers: Arc<dyn RemoteCollection>,
    pub products: Arc<dyn RemoteCollection>,
    pub orders: Arc<dyn RemoteCollection>,
}

impl Remotes {
    pub fn sqlite(store: &Arc<SqliteStore>) -> Self {
        Self {
            customers: Arc::new(store.collection(CollectionKind::Customers)),
            products: Arc::new(store.collection(CollectionKind::Products)),
            orders: Arc::new(store.collection(CollectionKind::Orders)),
        }
    }
}

pub struct SyncEngine {
    customers: Arc<CollectionSync<Customer>>,
    products: Arc<CollectionSync<Product>>,
    orders: Arc<CollectionSync<Order>>,
    blobs: Arc<dyn BlobStore>,
    bus: ViewBus,
    config: SyncConfig,
    shutdown: watch::Sender<bool>,
    pumps: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncEngine {
    pub fn new(remotes: Remotes, blobs: Arc<dyn BlobStore>, config: SyncConfig) -> Result<Self> {
        let bus = ViewBus::new();
        let page_size = config.effective_page_size();
        let policy = config.policy;

        let customers = CollectionSync::new(remotes.customers, page_size, policy, bus.clone())?;
        let products = CollectionSync::new(remotes.products, page_size, policy, bus.clone())?;
        let orders = CollectionSync::new(remotes.orders, page_size, policy, bus.clone())?;

        Ok(Self {
            customers: Arc::new(customers),
            products: Arc::new(products),
            orders: Arc::new(orders),
            blobs,
            bus,
            config,
            shutdown: watch::channel(false).0,
            pumps: Mutex::new(Vec::new()),
        })
    }

    /// Subscribe to all three collections, then load their first pages.
    ///
    /// Subscriptions are opened first so that writes landing between the
    /// fetch and the subscription still reach the mirrors.
    pub async fn start(&self) -> Result<()> {
        let interval = self.config.resync_interval;

        let changes = self.customers.subscribe().await?;
        let pump = self
            .customers
            .clone()
            .spawn_pump(changes, self.shutdown.subscribe(), interval);
        self.pumps.lock().push(pump);

        let changes = self.products.subscribe().await?;
        let pump = self
            .products
            .clone()
            .spawn_pump(changes, self.shutdown.subscribe(), interval);
        self.pumps.lock().push(pump);

        let changes = self.orders.subscribe().await?;
        let pump = self
            .orders
            .clone()
            .spawn_pump(changes, self.shutdown.subscribe(), interval);
        self.pumps.lock().push(pump);

        let (customers, products, orders) = tokio::join!(
            self.customers.load_first(),
            self.products.load_first(),
            self.orders.load_first(),
        );
        info!(
            customers = self.customers.len(),
            products = self.products.len(),
            orders = self.orders.len(),
            policy = ?self.config.policy,
            "Sync engine started"
        );

        customers?;
        products?;
        orders?;
        Ok(())
    }

    /// Stop every change pump and wait for it to finish.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let pumps = std::mem::take(&mut *self.pumps.lock());
        for pump in pumps {
            if let Err(e) = pump.await {
                warn!(error = %e, "Change pump ended abnormally");
            }
        }
        info!("Sync engine stopped");
    }

    // -----------------------------------------------------------------------
    // View surface
    // -----------------------------------------------------------------------

    pub fn customers(&self) -> &Arc<CollectionSync<Customer>> {
        &self.customers
    }

    pub fn products(&self) -> &Arc<CollectionSync<Product>> {
        &self.products
    }

    pub fn orders(&self) -> &Arc<CollectionSync<Order>> {
        &self.orders
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.bus.subscribe()
    }

    pub fn set_active_view(&self, collection: CollectionKind) {
        debug!(%collection, "Active view switched");
        self.bus.set_active(collection);
    }

    pub fn active_view(&self) -> CollectionKind {
        self.bus.active()
    }

    pub async fn load_more(&self, collection: CollectionKind) -> Result<LoadOutcome> {
        match collection {
            CollectionKind::Customers => self.customers.load_more().await,
            CollectionKind::Products => self.products.load_more().await,
            CollectionKind::Orders => self.orders.load_more().await,
        }
    }

    pub fn has_more(&self, collection: CollectionKind) -> bool {
        match collection {
            CollectionKind::Customers => self.customers.has_more(),
            CollectionKind::Products => self.products.has_more(),
            CollectionKind::Orders => self.orders.has_more(),
        }
    }

    pub fn len(&self, collection: CollectionKind) -> usize {
        match collection {
            CollectionKind::Customers => self.customers.len(),
            CollectionKind::Products => self.products.len(),
            CollectionKind::Orders => self.orders.len(),
        }
    }

    /// Loaded orders passing `filter`, in mirror order.
    pub fn filter_orders(&self, filter: &OrderFilter) -> Vec<Order> {
        let orders = self.orders.snapshot();
        self.customers
            .with_mirror(|customers| filter::filter_orders(&orders, filter, |id| customers.get(id)))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub async fn save_customer(&self, draft: CustomerDraft) -> Result<DocId> {
        let customer = draft.into_customer()?;
        let id = self
            .write(&self.customers, "save customer", customer.id.clone(), customer.to_fields()?)
            .await?;
        info!(id = %id, "Customer saved");
        Ok(id)
    }

    pub async fn save_product(&self, draft: ProductDraft) -> Result<DocId> {
        let product = draft.into_product()?;
        let id = self
            .write(&self.products, "save product", product.id.clone(), product.to_fields()?)
            .await?;
        info!(id = %id, "Product saved");
        Ok(id)
    }

    /// Create or replace an order, uploading `attachment` first if given.
    ///
    /// The search blob is rebuilt from the linked customer as currently
    /// loaded. Date, status and comments left unset in the draft keep their
    /// stored values. When editing an order that is not loaded, those fields
    /// and the attachment are left out of a merge into the stored document.
    pub async fn save_order(
        &self,
        draft: OrderDraft,
        attachment: Option<Attachment>,
    ) -> Result<DocId> {
        let existing = draft.id.as_ref().and_then(|id| self.orders.get(id));
        let editing_unloaded = draft.id.is_some() && existing.is_none();
        let unset: Vec<&'static str> = [
            (FIELD_DATE, draft.date.is_none()),
            (FIELD_STATUS, draft.status.is_none()),
            (FIELD_COMMENTS, draft.comments.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, unset)| unset.then_some(field))
        .collect();
        let clear_attachment = draft.clear_attachment;

        let now = Local::now().naive_local().format(ORDER_DATE_FORMAT).to_string();
        let mut order = draft.into_order(existing.as_ref(), &now)?;

        let customer = self.customers.get(&order.customer_id);
        if customer.is_none() {
            warn!(customer = %order.customer_id, "Order customer not loaded, search text omits it");
        }
        order.search_blob = Some(Order::compose_search_text(
            customer.as_ref(),
            &order.comments,
            &order.items,
        ));

        let keep_attachment = attachment.is_none() && !clear_attachment;
        order.attachment_url = match attachment {
            Some(attachment) => {
                let uploaded = attachments::upload(
                    self.blobs.as_ref(),
                    &attachment,
                    self.config.max_attachment_size,
                    Utc::now(),
                )
                .await;
                uploaded.map_err(|e| self.report(e))?
            }
            None if keep_attachment => existing
                .map(|o| o.attachment_url)
                .unwrap_or_default(),
            None => String::new(),
        };

        let mut fields = order.to_fields()?;
        if editing_unloaded {
            for field in unset {
                fields.remove(field);
            }
            if keep_attachment {
                fields.remove(FIELD_ATTACHMENT);
            }
            self.orders
                .remote()
                .update(&order.id, fields)
                .await
                .map_err(|source| self.remote_failed("save order", source))?;
            info!(id = %order.id, "Order merged");
            return Ok(order.id);
        }

        let id = self.write(&self.orders, "save order", order.id.clone(), fields).await?;
        info!(id = %id, items = order.items.len(), total = order.total(), "Order saved");
        Ok(id)
    }

    /// Change only the status field of an order.
    pub async fn set_order_status(&self, id: &DocId, status: OrderStatus) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert(FIELD_STATUS.into(), status.stored_value().into());
        self.orders
            .remote()
            .update(id, fields)
            .await
            .map_err(|source| self.remote_failed("update order status", source))?;
        info!(id = %id, %status, "Order status changed");
        Ok(())
    }

    pub async fn delete_order(&self, id: &DocId) -> Result<()> {
        self.delete(&self.orders, "delete order", id).await
    }

    pub async fn delete_product(&self, id: &DocId) -> Result<()> {
        self.delete(&self.products, "delete product", id).await
    }

    /// Delete a customer unless an order still references it.
    ///
    /// With [`DeleteGuard::LoadedWindow`] only loaded orders are inspected,
    /// so a reference beyond the loaded pages goes unnoticed.
    pub async fn delete_customer(&self, id: &DocId) -> Result<()> {
        let referencing = self
            .orders
            .with_mirror(|orders| orders.iter().filter(|o| o.customer_id == *id).count());
        if referencing > 0 {
            return Err(self.report(SyncError::CustomerReferenced {
                customer: id.clone(),
                orders: referencing,
            }));
        }

        if self.config.delete_guard == DeleteGuard::RemoteCheck {
            let referenced = self
                .orders
                .remote()
                .exists_where(FIELD_CUSTOMER_ID, id.as_str())
                .await
                .map_err(|source| self.remote_failed("check customer orders", source))?;
            if referenced {
                return Err(self.report(SyncError::CustomerReferencedRemotely(id.clone())));
            }
        }

        self.delete(&self.customers, "delete customer", id).await
    }

    async fn write<T: Entity>(
        &self,
        collection: &CollectionSync<T>,
        action: &'static str,
        id: DocId,
        fields: Fields,
    ) -> Result<DocId> {
        let remote = collection.remote();
        let result = if id.is_empty() {
            remote.add(fields).await
        } else {
            remote.set(&id, fields).await.map(|()| id)
        };
        result.map_err(|source| self.remote_failed(action, source))
    }

    async fn delete<T: Entity>(
        &self,
        collection: &CollectionSync<T>,
        action: &'static str,
        id: &DocId,
    ) -> Result<()> {
        collection
            .remote()
            .delete(id)
            .await
            .map_err(|source| self.remote_failed(action, source))?;
        info!(collection = %T::KIND, id = %id, "Document deleted");
        Ok(())
    }

    fn remote_failed(&self, action: &'static str, source: RemoteError) -> SyncError {
        self.report(SyncError::Remote { action, source })
    }

    /// Log `error` and surface it to the user.
    fn report(&self, error: SyncError) -> SyncError {
        warn!(error = %error, "Operation failed");
        self.bus.notice(error.to_string());
        error
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
