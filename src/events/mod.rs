use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

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

    /// Sends an event, logging instead of failing when the receiver is gone.
    ///
    /// Events are published after the database commit, so a closed channel must
    /// not turn a completed operation into an error.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("{}", e);
        }
    }
}

/// Domain events published after a manufacturing transaction commits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    WorkOrderCreated(i64),
    WorkOrderUpdated(i64),
    WorkOrderSubmitted(i64),
    WorkOrderCancelled(i64),
    WorkOrderStatusChanged {
        work_order_id: i64,
        status: String,
    },
    WorkOrderProgressed {
        work_order_id: i64,
        produced_qty: Decimal,
        material_transferred_for_manufacturing: Decimal,
    },
    StockEntrySubmitted {
        stock_entry_id: i64,
        work_order_id: Option<i64>,
        purpose: String,
    },
    StockEntryCancelled {
        stock_entry_id: i64,
        work_order_id: Option<i64>,
        purpose: String,
    },
    TimesheetCreated {
        timesheet_id: i64,
        work_order_id: Option<i64>,
    },
    TimesheetSubmitted {
        timesheet_id: i64,
        work_order_id: Option<i64>,
    },
    TimesheetCancelled {
        timesheet_id: i64,
        work_order_id: Option<i64>,
    },
    SalesOrderSubmitted(i64),
    ManufacturingSettingsUpdated,
}

/// Background loop that drains the event channel.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::WorkOrderStatusChanged {
                work_order_id,
                status,
            } => {
                info!(work_order_id, status = %status, "Work order status changed");
            }
            Event::WorkOrderProgressed {
                work_order_id,
                produced_qty,
                material_transferred_for_manufacturing,
            } => {
                info!(
                    work_order_id,
                    produced_qty = %produced_qty,
                    transferred = %material_transferred_for_manufacturing,
                    "Work order progressed"
                );
            }
            Event::StockEntryCancelled {
                stock_entry_id,
                work_order_id,
                purpose,
            } => {
                warn!(
                    stock_entry_id,
                    ?work_order_id,
                    purpose = %purpose,
                    "Stock entry cancelled"
                );
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender.send(Event::WorkOrderSubmitted(7)).await.unwrap();
        assert_eq!(rx.recv().await, Some(Event::WorkOrderSubmitted(7)));
    }

    #[tokio::test]
    async fn send_or_log_tolerates_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender.send(Event::WorkOrderCreated(1)).await.is_err());
        sender.send_or_log(Event::WorkOrderCreated(1)).await;
    }
}
