//! Locally persisted estimation cart.
//!
//! The whole cart is one JSON array under a single key. Every read re-parses
//! storage; anything absent or unparsable reads as an empty cart. Mutations
//! are written immediately and announced on a broadcast channel so views can
//! refresh without polling.

use crate::domain::model::CartItem;
use crate::domain::ports::KeyValueStore;
use crate::utils::error::{EstimatorError, Result};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub const DEFAULT_CART_KEY: &str = "estimation_cart";

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    Added { index: usize, item: CartItem },
    Removed { index: usize, item: CartItem },
    Cleared,
}

#[derive(Clone)]
pub struct CartStore {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    events: broadcast::Sender<CartEvent>,
}

impl CartStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage,
            key: key.into(),
            events,
        }
    }

    pub fn with_default_key(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::new(storage, DEFAULT_CART_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get_cart(&self) -> Vec<CartItem> {
        read_cart(self.storage.as_ref(), &self.key)
    }

    pub fn add_to_cart(&self, item: CartItem) -> Result<Vec<CartItem>> {
        if item.quantity == 0 {
            return Err(EstimatorError::validation(
                "quantity",
                "quantity must be at least 1",
            ));
        }
        // serde_json 會把 NaN/inf 寫成 null，之後整個購物車讀不回來
        if !item.amount.is_finite() || item.amount < 0.0 {
            return Err(EstimatorError::validation(
                "amount",
                "amount must be a finite, non-negative number",
            ));
        }

        let mut cart = self.get_cart();
        cart.push(item.clone());
        self.save(&cart)?;

        let index = cart.len() - 1;
        info!("🛒 Added '{}' to cart at position {}", item.title, index + 1);
        self.publish(CartEvent::Added { index, item });
        Ok(cart)
    }

    /// Out-of-range indices leave the cart (and storage) untouched.
    pub fn remove_from_cart(&self, index: usize) -> Result<Vec<CartItem>> {
        let mut cart = self.get_cart();
        if index >= cart.len() {
            debug!(
                "🛒 Ignoring removal of position {} from a cart of {}",
                index,
                cart.len()
            );
            return Ok(cart);
        }

        let item = cart.remove(index);
        self.save(&cart)?;

        info!("🛒 Removed '{}' from cart", item.title);
        self.publish(CartEvent::Removed { index, item });
        Ok(cart)
    }

    pub fn clear_cart(&self) -> Result<()> {
        self.storage.remove(&self.key)?;
        info!("🛒 Cart cleared");
        self.publish(CartEvent::Cleared);
        Ok(())
    }

    pub fn total(&self) -> f64 {
        cart_total(&self.get_cart())
    }

    pub fn subscribe(&self) -> CartSubscription {
        CartSubscription {
            receiver: self.events.subscribe(),
            storage: Arc::clone(&self.storage),
            key: self.key.clone(),
        }
    }

    fn save(&self, cart: &[CartItem]) -> Result<()> {
        let serialized = serde_json::to_string(cart)?;
        self.storage.set(&self.key, &serialized)
    }

    fn publish(&self, event: CartEvent) {
        if self.events.send(event).is_err() {
            debug!("🛒 Cart changed (no subscribers)");
        }
    }
}

pub fn cart_total(items: &[CartItem]) -> f64 {
    items.iter().map(|item| item.amount).sum()
}

fn read_cart(storage: &dyn KeyValueStore, key: &str) -> Vec<CartItem> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("⚠️ Could not read cart '{}', treating as empty: {}", key, e);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Option<Vec<CartItem>>>(&raw) {
        Ok(items) => items.unwrap_or_default(),
        Err(e) => {
            warn!("⚠️ Stored cart '{}' is malformed, treating as empty: {}", key, e);
            Vec::new()
        }
    }
}

/// Read-only view of cart changes. Never writes storage.
pub struct CartSubscription {
    receiver: broadcast::Receiver<CartEvent>,
    storage: Arc<dyn KeyValueStore>,
    key: String,
}

impl CartSubscription {
    /// Waits for the next mutation and returns it with the cart as re-read
    /// from storage. `None` once every store handle is gone.
    pub async fn changed(&mut self) -> Option<(Option<CartEvent>, Vec<CartItem>)> {
        let event = match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("🛒 Cart subscriber skipped {} events, resyncing", skipped);
                None
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        };
        Some((event, self.current()))
    }

    pub fn current(&self) -> Vec<CartItem> {
        read_cart(self.storage.as_ref(), &self.key)
    }
}
