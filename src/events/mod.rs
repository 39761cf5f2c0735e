use chrono::NaiveDate;
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::Material;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the loop is gone.
    /// Domain writes are already committed by the time events go out.
    pub async fn send_or_log(&self, event: Event) {
        let kind = event.kind();
        if let Err(e) = self.send(event).await {
            warn!(event = kind, error = %e, "Dropping domain event");
        }
    }
}

/// Domain events emitted after successful writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    ProductSlugChanged {
        product_id: Uuid,
        old_slug: String,
        new_slug: String,
    },
    ProductImagesChanged {
        product_id: Uuid,
        image_count: usize,
    },

    CategoryChanged(Uuid),
    CategoryDeleted(Uuid),
    CollectionChanged(Uuid),
    CollectionDeleted(Uuid),

    MarketChanged {
        market_id: Uuid,
        prices_regenerated: u64,
    },
    MarketDeleted(Uuid),

    MaterialRateSet {
        material: Material,
        rate_date: NaiveDate,
        rate_per_gram: Decimal,
        products_repriced: u64,
    },

    CmsPageChanged(Uuid),
    CmsPagePublished {
        page_id: Uuid,
        published: bool,
    },
    CmsPageDeleted(Uuid),

    PromotionChanged(Uuid),

    UserRegistered(Uuid),
    OrderPlaced {
        order_id: Uuid,
        user_id: Uuid,
        total: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    PathsRevalidated {
        paths: Vec<String>,
        entries_removed: usize,
    },
}

impl Event {
    /// Stable, low-cardinality name used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Event::ProductCreated(_) => "product_created",
            Event::ProductUpdated(_) => "product_updated",
            Event::ProductDeleted(_) => "product_deleted",
            Event::ProductSlugChanged { .. } => "product_slug_changed",
            Event::ProductImagesChanged { .. } => "product_images_changed",
            Event::CategoryChanged(_) => "category_changed",
            Event::CategoryDeleted(_) => "category_deleted",
            Event::CollectionChanged(_) => "collection_changed",
            Event::CollectionDeleted(_) => "collection_deleted",
            Event::MarketChanged { .. } => "market_changed",
            Event::MarketDeleted(_) => "market_deleted",
            Event::MaterialRateSet { .. } => "material_rate_set",
            Event::CmsPageChanged(_) => "cms_page_changed",
            Event::CmsPagePublished { .. } => "cms_page_published",
            Event::CmsPageDeleted(_) => "cms_page_deleted",
            Event::PromotionChanged(_) => "promotion_changed",
            Event::UserRegistered(_) => "user_registered",
            Event::OrderPlaced { .. } => "order_placed",
            Event::OrderStatusChanged { .. } => "order_status_changed",
            Event::PathsRevalidated { .. } => "paths_revalidated",
        }
    }
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("lustre_events_total", 1, "kind" => event.kind());

        match &event {
            Event::MaterialRateSet {
                material,
                rate_date,
                rate_per_gram,
                products_repriced,
            } => {
                info!(
                    %material,
                    %rate_date,
                    %rate_per_gram,
                    products_repriced,
                    "Material rate set"
                );
            }
            Event::OrderPlaced {
                order_id,
                user_id,
                total,
            } => {
                info!(%order_id, %user_id, %total, "Order placed");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, old_status, new_status, "Order status changed");
            }
            Event::ProductSlugChanged {
                product_id,
                old_slug,
                new_slug,
            } => {
                info!(%product_id, old_slug, new_slug, "Product slug changed");
            }
            Event::PathsRevalidated {
                paths,
                entries_removed,
            } => {
                debug!(?paths, entries_removed, "Paths revalidated");
            }
            other => {
                debug!(event = ?other, "Event received");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_survives_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        sender.send_or_log(Event::ProductDeleted(Uuid::new_v4())).await;
        assert!(sender.send(Event::MarketDeleted(Uuid::nil())).await.is_err());
    }

    #[tokio::test]
    async fn events_are_delivered_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let first = Uuid::new_v4();
        sender.send_or_log(Event::ProductCreated(first)).await;
        sender.send_or_log(Event::ProductDeleted(first)).await;

        assert_eq!(rx.recv().await, Some(Event::ProductCreated(first)));
        assert_eq!(rx.recv().await.map(|e| e.kind()), Some("product_deleted"));
    }
}
