//! Per-order cache of validated operation maps.
//!
//! The registry is an ordinary value: construct one, wrap it in an `Arc` and
//! hand it to whatever serves scans. Maps are built on first request from the
//! order's edge records and served from cache until invalidated.
//!
//! Each order has its own slot lock, held across fetch, build, validate and
//! insert, so one order is never built twice concurrently while other orders
//! stay available.

use crate::config::OpflowConfig;
use crate::errors::FlowError;
use crate::flow::{EdgeRecord, OperationMap, load_records};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Supplies the edge records of a production order.
pub trait OrderDataProvider: Send + Sync {
    /// Fetch the routing records for `order_id`.
    fn fetch_edges(&self, order_id: &str) -> anyhow::Result<Vec<EdgeRecord>>;
}

/// Reads `<dir>/<order_id>.json`, a JSON array of edge records.
#[derive(Debug, Clone)]
pub struct JsonDirProvider {
    dir: PathBuf,
}

impl JsonDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path the records of `order_id` are read from.
    pub fn order_path(&self, order_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", order_id))
    }
}

impl OrderDataProvider for JsonDirProvider {
    fn fetch_edges(&self, order_id: &str) -> anyhow::Result<Vec<EdgeRecord>> {
        if order_id.is_empty() || order_id.contains(['/', '\\']) || order_id.starts_with('.') {
            anyhow::bail!("Invalid order id '{}'", order_id);
        }
        load_records(&self.order_path(order_id))
    }
}

type Slot = Arc<Mutex<Option<Arc<OperationMap>>>>;

/// Cache of validated maps keyed by production order.
pub struct MapRegistry {
    provider: Arc<dyn OrderDataProvider>,
    config: Arc<OpflowConfig>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl MapRegistry {
    pub fn new(provider: Arc<dyn OrderDataProvider>, config: Arc<OpflowConfig>) -> Self {
        Self {
            provider,
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Configuration maps are built with.
    pub fn config(&self) -> &OpflowConfig {
        &self.config
    }

    fn slot(&self, order_id: &str) -> Result<Slot, FlowError> {
        let mut slots = self.slots.lock().map_err(|_| FlowError::LockPoisoned)?;
        Ok(slots.entry(order_id.to_string()).or_default().clone())
    }

    /// Get the map for an order, building it on a cache miss.
    ///
    /// An invalid map is never cached; the caller gets
    /// [`FlowError::InvalidOperationMap`] and should halt whatever needed routing.
    pub fn get(&self, order_id: &str) -> Result<Arc<OperationMap>, FlowError> {
        let slot = self.slot(order_id)?;
        let built = self.fill(order_id, &slot);
        if built.is_err() {
            self.discard_if_empty(order_id, &slot)?;
        }
        built
    }

    fn fill(&self, order_id: &str, slot: &Slot) -> Result<Arc<OperationMap>, FlowError> {
        let mut cached = slot.lock().map_err(|_| FlowError::LockPoisoned)?;

        if let Some(map) = cached.as_ref() {
            tracing::debug!(order_id, "operation map cache hit");
            return Ok(Arc::clone(map));
        }

        tracing::debug!(order_id, "operation map cache miss, fetching edge records");
        let records = self
            .provider
            .fetch_edges(order_id)
            .map_err(|source| FlowError::FetchFailed {
                order_id: order_id.to_string(),
                source,
            })?;

        let map = Arc::new(self.build(order_id, &records)?);
        *cached = Some(Arc::clone(&map));
        Ok(map)
    }

    /// Drop the entry for a failed order unless another caller has filled or
    /// is filling it. Must be called without holding the slot lock.
    fn discard_if_empty(&self, order_id: &str, slot: &Slot) -> Result<(), FlowError> {
        let mut slots = self.slots.lock().map_err(|_| FlowError::LockPoisoned)?;
        let same_entry = slots
            .get(order_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot));
        // A held lock means another caller is building into this entry
        let empty = matches!(slot.try_lock(), Ok(guard) if guard.is_none());
        if same_entry && empty {
            slots.remove(order_id);
        }
        Ok(())
    }

    /// Build from supplied records and replace any cached entry.
    pub fn install(&self, order_id: &str, records: &[EdgeRecord]) -> Result<Arc<OperationMap>, FlowError> {
        let map = Arc::new(self.build(order_id, records)?);
        let slot = self.slot(order_id)?;
        let mut cached = slot.lock().map_err(|_| FlowError::LockPoisoned)?;
        *cached = Some(Arc::clone(&map));
        Ok(map)
    }

    fn build(&self, order_id: &str, records: &[EdgeRecord]) -> Result<OperationMap, FlowError> {
        let map = OperationMap::build(
            order_id,
            records,
            &self.config.classification,
            &self.config.terminal,
        );

        if !map.is_valid() {
            tracing::warn!(
                order_id,
                errors = ?map.validation_errors(),
                "rejecting invalid operation map"
            );
            return Err(FlowError::InvalidOperationMap {
                order_id: order_id.to_string(),
                errors: map.validation_errors().to_vec(),
            });
        }

        for warning in map.validation_warnings() {
            tracing::warn!(order_id, "{}", warning);
        }
        tracing::info!(
            order_id,
            records = records.len(),
            operations = map.graph().len(),
            "operation map built"
        );
        Ok(map)
    }

    /// Drop the cached map so the next `get` rebuilds from fresh records.
    ///
    /// Returns whether an entry was cached.
    pub fn invalidate(&self, order_id: &str) -> Result<bool, FlowError> {
        let removed = self
            .slots
            .lock()
            .map_err(|_| FlowError::LockPoisoned)?
            .remove(order_id);

        let was_cached = match removed {
            Some(slot) => slot.lock().map_err(|_| FlowError::LockPoisoned)?.is_some(),
            None => false,
        };
        if was_cached {
            tracing::info!(order_id, "operation map invalidated");
        }
        Ok(was_cached)
    }

    /// Orders with a cached map.
    pub fn cached_orders(&self) -> Result<Vec<String>, FlowError> {
        let slots = self.slots.lock().map_err(|_| FlowError::LockPoisoned)?;
        let mut orders = Vec::new();
        for (order_id, slot) in slots.iter() {
            // Waits out an in-flight build, whose entry is still empty
            if slot.lock().map_err(|_| FlowError::LockPoisoned)?.is_some() {
                orders.push(order_id.clone());
            }
        }
        orders.sort();
        Ok(orders)
    }

    /// Drop every cached map.
    pub fn clear(&self) -> Result<(), FlowError> {
        self.slots
            .lock()
            .map_err(|_| FlowError::LockPoisoned)?
            .clear();
        Ok(())
    }
}
