use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entities::{sales_order, sales_order_item, work_order, DocStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{master_data::get_item, round},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewSalesOrderItem {
    #[validate(length(min = 1))]
    pub item_code: String,
    pub qty: Decimal,
    pub warehouse: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewSalesOrder {
    #[validate(length(min = 1, max = 140))]
    pub customer: String,
    #[validate(length(min = 1))]
    pub company: String,
    #[validate]
    pub items: Vec<NewSalesOrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrderDetail {
    #[serde(flatten)]
    pub sales_order: sales_order::Model,
    pub items: Vec<sales_order_item::Model>,
}

/// Just enough of a sales order to drive work orders against it.
#[derive(Clone)]
pub struct SalesOrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl SalesOrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, new_order), fields(customer = %new_order.customer))]
    pub async fn create(&self, new_order: NewSalesOrder) -> Result<SalesOrderDetail, ServiceError> {
        new_order.validate()?;
        if new_order.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Sales Order must have at least one item".to_string(),
            ));
        }
        if let Some(row) = new_order.items.iter().find(|r| r.qty <= Decimal::ZERO) {
            return Err(ServiceError::InvalidInput(format!(
                "Quantity for item {} must be positive",
                row.item_code
            )));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let header = sales_order::ActiveModel {
            customer: Set(new_order.customer.clone()),
            company: Set(new_order.company.clone()),
            docstatus: Set(DocStatus::Draft.code()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(new_order.items.len());
        for (idx, row) in new_order.items.iter().enumerate() {
            get_item(&txn, &row.item_code).await?;
            let created = sales_order_item::ActiveModel {
                sales_order_id: Set(header.id),
                idx: Set(idx as i32 + 1),
                item_code: Set(row.item_code.clone()),
                warehouse: Set(row.warehouse.clone()),
                qty: Set(row.qty),
                stock_qty: Set(row.qty),
                work_order_qty: Set(Decimal::ZERO),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            items.push(created);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(sales_order_id = header.id, "Sales order created");
        Ok(SalesOrderDetail {
            sales_order: header,
            items,
        })
    }

    #[instrument(skip(self))]
    pub async fn submit(&self, sales_order_id: i64) -> Result<SalesOrderDetail, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let detail = load_detail(&txn, sales_order_id).await?;

        if detail.sales_order.doc_status() != Some(DocStatus::Draft) {
            return Err(ServiceError::InvalidOperation(format!(
                "Sales Order {} is not a draft and cannot be submitted",
                sales_order_id
            )));
        }

        let mut header: sales_order::ActiveModel = detail.sales_order.into();
        header.docstatus = Set(DocStatus::Submitted.code());
        let header = header.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.sales_orders.submitted", 1);
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::SalesOrderSubmitted(sales_order_id))
                .await;
        }

        Ok(SalesOrderDetail {
            sales_order: header,
            items: detail.items,
        })
    }

    pub async fn get(&self, sales_order_id: i64) -> Result<SalesOrderDetail, ServiceError> {
        load_detail(&*self.db, sales_order_id).await
    }
}

async fn load_detail<C>(conn: &C, sales_order_id: i64) -> Result<SalesOrderDetail, ServiceError>
where
    C: ConnectionTrait,
{
    let sales_order = sales_order::Entity::find_by_id(sales_order_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Sales Order {}", sales_order_id)))?;

    let items = sales_order_item::Entity::find()
        .filter(sales_order_item::Column::SalesOrderId.eq(sales_order_id))
        .order_by_asc(sales_order_item::Column::Idx)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(SalesOrderDetail { sales_order, items })
}

/// Σ qty of submitted work orders raised against the sales order item.
pub(crate) async fn refresh_work_order_qty<C>(
    conn: &C,
    sales_order_item_id: i64,
) -> Result<sales_order_item::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let row = sales_order_item::Entity::find_by_id(sales_order_item_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Sales Order Item {}", sales_order_item_id))
        })?;

    let ordered: Decimal = work_order::Entity::find()
        .filter(work_order::Column::SalesOrderItemId.eq(sales_order_item_id))
        .filter(work_order::Column::Docstatus.eq(DocStatus::Submitted.code()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .iter()
        .map(|wo| wo.qty)
        .sum();

    let mut model: sales_order_item::ActiveModel = row.into();
    model.work_order_qty = Set(round(ordered));
    model.update(conn).await.map_err(ServiceError::db_error)
}
