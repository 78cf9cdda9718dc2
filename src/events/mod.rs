use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Domain events emitted after a mutation commits. Delivery is best-effort;
/// the mutation they describe has already been persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),
    OrderCompleted(Uuid),

    // Payment events
    PaymentRecorded {
        order_id: Uuid,
        payment_id: Uuid,
        amount: Decimal,
    },

    // Inventory events
    InventoryDecremented {
        product_id: Uuid,
        quantity: i32,
    },
    InventoryRestocked {
        product_id: Uuid,
        quantity: i32,
    },

    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),

    // Tenant events
    WarehouseCreated(Uuid),
    EmployeeCreated(Uuid),
    EmployeeBlocked(Uuid),
    EmployeeUnblocked(Uuid),
}

/// Thin wrapper over the event channel's sending half.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a bounded event channel, returning the wrapped sender and the
/// receiving half for whatever processor the caller wires up.
pub fn event_channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_round_trip_through_the_channel() {
        let (sender, mut rx) = event_channel(4);
        let order_id = Uuid::new_v4();

        sender.send(Event::OrderCreated(order_id)).await.unwrap();
        match rx.recv().await {
            Some(Event::OrderCreated(id)) => assert_eq!(id, order_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_dropped() {
        let (sender, rx) = event_channel(1);
        drop(rx);
        assert!(sender.send(Event::OrderCompleted(Uuid::new_v4())).await.is_err());
    }
}
