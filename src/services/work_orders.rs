use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entities::{
        bom, sales_order, sales_order_item, stock_entry, stock_entry_detail, timesheet,
        timesheet_detail, work_order, work_order_item, work_order_operation, DocStatus,
        OperationStatus, StockEntryPurpose, WorkOrderStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        bins::{update_planned_qty, update_reserved_qty_for_production},
        boms::{default_bom_for, load_bom_detail, BomDetail},
        master_data::{get_item, validate_production_item, validate_warehouse},
        round, sales_orders,
        settings::ManufacturingSettingsService,
        timesheets, with_allowance,
    },
};

/// Arguments for building a work order from an item's BOM.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewWorkOrderArgs {
    #[validate(length(min = 1, max = 140))]
    pub production_item: String,
    pub qty: Decimal,
    #[validate(length(min = 1))]
    pub company: String,
    /// Defaults to the item's default BOM
    pub bom_id: Option<i64>,
    pub sales_order_id: Option<i64>,
    pub sales_order_item_id: Option<i64>,
    pub source_warehouse: Option<String>,
    pub wip_warehouse: Option<String>,
    pub fg_warehouse: Option<String>,
    pub scrap_warehouse: Option<String>,
    #[serde(default)]
    pub skip_transfer: bool,
    pub planned_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub additional_operating_cost: Decimal,
}

impl NewWorkOrderArgs {
    pub fn new(production_item: impl Into<String>, qty: Decimal, company: impl Into<String>) -> Self {
        Self {
            production_item: production_item.into(),
            qty,
            company: company.into(),
            bom_id: None,
            sales_order_id: None,
            sales_order_item_id: None,
            source_warehouse: None,
            wip_warehouse: None,
            fg_warehouse: None,
            scrap_warehouse: None,
            skip_transfer: false,
            planned_start_date: None,
            additional_operating_cost: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredItemDraft {
    pub item_code: String,
    pub source_warehouse: Option<String>,
    pub required_qty: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDraft {
    pub operation: String,
    pub workstation: String,
    pub time_in_mins: Decimal,
    pub hour_rate: Decimal,
    pub planned_operating_cost: Decimal,
}

/// An unsaved work order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrderDraft {
    pub production_item: String,
    pub company: String,
    pub qty: Decimal,
    pub bom_id: i64,
    pub sales_order_id: Option<i64>,
    pub sales_order_item_id: Option<i64>,
    pub source_warehouse: Option<String>,
    pub wip_warehouse: Option<String>,
    pub fg_warehouse: Option<String>,
    pub scrap_warehouse: Option<String>,
    pub skip_transfer: bool,
    pub planned_start_date: DateTime<Utc>,
    pub additional_operating_cost: Decimal,
    pub planned_operating_cost: Decimal,
    pub required_items: Vec<RequiredItemDraft>,
    pub operations: Vec<OperationDraft>,
}

/// Editable fields of a draft work order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct WorkOrderChanges {
    pub qty: Option<Decimal>,
    pub planned_start_date: Option<DateTime<Utc>>,
    pub source_warehouse: Option<String>,
    pub wip_warehouse: Option<String>,
    pub fg_warehouse: Option<String>,
    pub scrap_warehouse: Option<String>,
    pub skip_transfer: Option<bool>,
    pub additional_operating_cost: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrderDetail {
    #[serde(flatten)]
    pub work_order: work_order::Model,
    pub required_items: Vec<work_order_item::Model>,
    pub operations: Vec<work_order_operation::Model>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum StopAction {
    Stopped,
    Resumed,
}

/// Required raw materials scaled from the BOM batch size to `qty`.
pub fn required_items_for_qty(
    bom: &BomDetail,
    qty: Decimal,
    default_source_warehouse: Option<&str>,
) -> Vec<RequiredItemDraft> {
    bom.items
        .iter()
        .map(|row| RequiredItemDraft {
            item_code: row.item_code.clone(),
            source_warehouse: row
                .source_warehouse
                .clone()
                .or_else(|| default_source_warehouse.map(str::to_string)),
            required_qty: round(row.stock_qty / bom.bom.quantity * qty),
            rate: row.rate,
        })
        .collect()
}

/// Operation times scale linearly with quantity; cost is hour rate × hours.
pub fn operations_for_qty(bom: &BomDetail, qty: Decimal) -> Vec<OperationDraft> {
    bom.operations
        .iter()
        .map(|op| {
            let time_in_mins = round(op.time_in_mins / bom.bom.quantity * qty);
            OperationDraft {
                operation: op.operation.clone(),
                workstation: op.workstation.clone(),
                time_in_mins,
                hour_rate: op.hour_rate,
                planned_operating_cost: round(op.hour_rate * time_in_mins / Decimal::from(60)),
            }
        })
        .collect()
}

/// Actual cost wins over planned once any has been logged.
pub fn total_operating_cost(planned: Decimal, actual: Decimal, additional: Decimal) -> Decimal {
    let variable = if actual.is_zero() { planned } else { actual };
    additional + variable
}

pub fn derive_status(
    docstatus: DocStatus,
    qty: Decimal,
    produced_qty: Decimal,
    transferred_qty: Decimal,
) -> WorkOrderStatus {
    match docstatus {
        DocStatus::Draft => WorkOrderStatus::Draft,
        DocStatus::Cancelled => WorkOrderStatus::Cancelled,
        DocStatus::Submitted => {
            if produced_qty >= qty {
                WorkOrderStatus::Completed
            } else if produced_qty > Decimal::ZERO || transferred_qty > Decimal::ZERO {
                WorkOrderStatus::InProcess
            } else {
                WorkOrderStatus::NotStarted
            }
        }
    }
}

#[derive(Clone)]
pub struct WorkOrderService {
    db: Arc<DatabaseConnection>,
    settings: Arc<ManufacturingSettingsService>,
    event_sender: Option<EventSender>,
}

impl WorkOrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        settings: Arc<ManufacturingSettingsService>,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            db,
            settings,
            event_sender,
        }
    }

    /// Builds an unsaved work order from the item's default BOM.
    #[instrument(skip(self))]
    pub async fn new_from_bom(&self, args: NewWorkOrderArgs) -> Result<WorkOrderDraft, ServiceError> {
        args.validate()?;
        let db = &*self.db;

        let item = get_item(db, &args.production_item).await?;
        let bom_id = match args.bom_id {
            Some(id) => id,
            None => {
                let mut default = default_bom_for(db, &item.item_code).await?;
                if default.is_none() {
                    if let Some(template) = &item.variant_of {
                        default = default_bom_for(db, template).await?;
                    }
                }
                default
                    .map(|b| b.id)
                    .ok_or_else(|| {
                        ServiceError::ValidationError(format!(
                            "No default BOM exists for Item {}",
                            item.item_code
                        ))
                    })?
            }
        };
        let bom = load_bom_detail(db, bom_id).await?;
        let settings = self.settings.current(db).await?;

        let mut draft = WorkOrderDraft {
            production_item: item.item_code,
            company: args.company,
            qty: args.qty,
            bom_id,
            sales_order_id: args.sales_order_id,
            sales_order_item_id: args.sales_order_item_id,
            source_warehouse: args.source_warehouse,
            wip_warehouse: args.wip_warehouse.or(settings.default_wip_warehouse),
            fg_warehouse: args.fg_warehouse.or(settings.default_fg_warehouse),
            scrap_warehouse: args.scrap_warehouse.or(settings.default_scrap_warehouse),
            skip_transfer: args.skip_transfer,
            planned_start_date: args.planned_start_date.unwrap_or_else(Utc::now),
            additional_operating_cost: args.additional_operating_cost,
            planned_operating_cost: Decimal::ZERO,
            required_items: Vec::new(),
            operations: Vec::new(),
        };
        apply_bom(&mut draft, &bom);

        Ok(draft)
    }

    /// Recomputes operations and planned operating cost from the draft's BOM and qty.
    #[instrument(skip(self, draft), fields(bom_id = draft.bom_id, qty = %draft.qty))]
    pub async fn set_work_order_operations(
        &self,
        draft: &mut WorkOrderDraft,
    ) -> Result<(), ServiceError> {
        let bom = load_bom_detail(&*self.db, draft.bom_id).await?;
        draft.operations = operations_for_qty(&bom, draft.qty);
        draft.planned_operating_cost = draft
            .operations
            .iter()
            .map(|op| op.planned_operating_cost)
            .sum();
        Ok(())
    }

    /// Validates and persists a draft work order.
    #[instrument(skip(self, draft), fields(item = %draft.production_item, qty = %draft.qty))]
    pub async fn insert(&self, mut draft: WorkOrderDraft) -> Result<WorkOrderDetail, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        self.validate_draft(&txn, &mut draft, None).await?;
        let fg_warehouse = required_fg_warehouse(&draft)?;

        let header = work_order::ActiveModel {
            production_item: Set(draft.production_item.clone()),
            company: Set(draft.company.clone()),
            qty: Set(draft.qty),
            bom_id: Set(draft.bom_id),
            sales_order_id: Set(draft.sales_order_id),
            sales_order_item_id: Set(draft.sales_order_item_id),
            source_warehouse: Set(draft.source_warehouse.clone()),
            wip_warehouse: Set(draft.wip_warehouse.clone()),
            fg_warehouse: Set(fg_warehouse),
            scrap_warehouse: Set(draft.scrap_warehouse.clone()),
            skip_transfer: Set(draft.skip_transfer),
            produced_qty: Set(Decimal::ZERO),
            material_transferred_for_manufacturing: Set(Decimal::ZERO),
            status: Set(WorkOrderStatus::Draft.to_string()),
            docstatus: Set(DocStatus::Draft.code()),
            planned_start_date: Set(draft.planned_start_date),
            actual_start_date: Set(None),
            actual_end_date: Set(None),
            planned_operating_cost: Set(draft.planned_operating_cost),
            actual_operating_cost: Set(Decimal::ZERO),
            additional_operating_cost: Set(draft.additional_operating_cost),
            total_operating_cost: Set(total_operating_cost(
                draft.planned_operating_cost,
                Decimal::ZERO,
                draft.additional_operating_cost,
            )),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let (required_items, operations) = write_children(&txn, header.id, &draft).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.work_orders.created", 1);
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::WorkOrderCreated(header.id)).await;
        }
        info!(work_order_id = header.id, "Work order created");

        Ok(WorkOrderDetail {
            work_order: header,
            required_items,
            operations,
        })
    }

    /// Applies changes to a draft work order, rebuilding BOM-derived rows.
    #[instrument(skip(self))]
    pub async fn save(
        &self,
        work_order_id: i64,
        changes: WorkOrderChanges,
    ) -> Result<WorkOrderDetail, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let detail = load_detail(&txn, work_order_id).await?;

        if detail.work_order.doc_status() != Some(DocStatus::Draft) {
            return Err(ServiceError::InvalidOperation(format!(
                "Work Order {} is not a draft and cannot be edited",
                work_order_id
            )));
        }

        let mut draft = draft_from_detail(&detail);
        if let Some(qty) = changes.qty {
            draft.qty = qty;
        }
        if let Some(date) = changes.planned_start_date {
            draft.planned_start_date = date;
        }
        if let Some(wh) = changes.source_warehouse {
            draft.source_warehouse = Some(wh);
        }
        if let Some(wh) = changes.wip_warehouse {
            draft.wip_warehouse = Some(wh);
        }
        if let Some(wh) = changes.fg_warehouse {
            draft.fg_warehouse = Some(wh);
        }
        if let Some(wh) = changes.scrap_warehouse {
            draft.scrap_warehouse = Some(wh);
        }
        if let Some(skip) = changes.skip_transfer {
            draft.skip_transfer = skip;
        }
        if let Some(cost) = changes.additional_operating_cost {
            draft.additional_operating_cost = cost;
        }

        let bom = load_bom_detail(&txn, draft.bom_id).await?;
        apply_bom(&mut draft, &bom);
        self.validate_draft(&txn, &mut draft, Some(work_order_id))
            .await?;
        let fg_warehouse = required_fg_warehouse(&draft)?;

        let mut header: work_order::ActiveModel = detail.work_order.into();
        header.qty = Set(draft.qty);
        header.planned_start_date = Set(draft.planned_start_date);
        header.source_warehouse = Set(draft.source_warehouse.clone());
        header.wip_warehouse = Set(draft.wip_warehouse.clone());
        header.fg_warehouse = Set(fg_warehouse);
        header.scrap_warehouse = Set(draft.scrap_warehouse.clone());
        header.skip_transfer = Set(draft.skip_transfer);
        header.sales_order_item_id = Set(draft.sales_order_item_id);
        header.planned_operating_cost = Set(draft.planned_operating_cost);
        header.additional_operating_cost = Set(draft.additional_operating_cost);
        header.total_operating_cost = Set(total_operating_cost(
            draft.planned_operating_cost,
            Decimal::ZERO,
            draft.additional_operating_cost,
        ));
        let header = header.update(&txn).await.map_err(ServiceError::db_error)?;

        work_order_item::Entity::delete_many()
            .filter(work_order_item::Column::WorkOrderId.eq(work_order_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        work_order_operation::Entity::delete_many()
            .filter(work_order_operation::Column::WorkOrderId.eq(work_order_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        let (required_items, operations) = write_children(&txn, work_order_id, &draft).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::WorkOrderUpdated(work_order_id)).await;
        }

        Ok(WorkOrderDetail {
            work_order: header,
            required_items,
            operations,
        })
    }

    /// Draft → Not Started: reserves raw material, plans the finished good and
    /// opens a draft timesheet for the operations.
    #[instrument(skip(self))]
    pub async fn submit(&self, work_order_id: i64) -> Result<WorkOrderDetail, ServiceError> {
        let start = std::time::Instant::now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let detail = load_detail(&txn, work_order_id).await?;

        if detail.work_order.doc_status() != Some(DocStatus::Draft) {
            return Err(ServiceError::InvalidOperation(format!(
                "Work Order {} is not a draft and cannot be submitted",
                work_order_id
            )));
        }
        if !detail.work_order.skip_transfer && detail.work_order.wip_warehouse.is_none() {
            return Err(ServiceError::ValidationError(
                "Work-in-Progress Warehouse is required before Submit".to_string(),
            ));
        }

        let mut draft = draft_from_detail(&detail);
        self.validate_draft(&txn, &mut draft, Some(work_order_id))
            .await?;

        let status = derive_status(
            DocStatus::Submitted,
            detail.work_order.qty,
            detail.work_order.produced_qty,
            detail.work_order.material_transferred_for_manufacturing,
        );
        let mut header: work_order::ActiveModel = detail.work_order.into();
        header.docstatus = Set(DocStatus::Submitted.code());
        header.status = Set(status.to_string());
        header.sales_order_item_id = Set(draft.sales_order_item_id);
        let header = header.update(&txn).await.map_err(ServiceError::db_error)?;

        refresh_stock_counters(&txn, &header, &detail.required_items).await?;
        if let Some(so_item_id) = header.sales_order_item_id {
            sales_orders::refresh_work_order_qty(&txn, so_item_id).await?;
        }

        let timesheet = if detail.operations.is_empty() {
            None
        } else {
            timesheets::create_draft_for_work_order(&txn, &header, &detail.operations).await?
        };

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.work_orders.submitted", 1);
        histogram!(
            "manufacturing.work_orders.submit_duration_ms",
            start.elapsed().as_millis() as f64
        );
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::WorkOrderSubmitted(work_order_id)).await;
            if let Some(ts) = &timesheet {
                sender
                    .send_or_log(Event::TimesheetCreated {
                        timesheet_id: ts.id,
                        work_order_id: Some(work_order_id),
                    })
                    .await;
            }
        }
        info!(work_order_id, status = %header.status, "Work order submitted");

        Ok(WorkOrderDetail {
            work_order: header,
            required_items: detail.required_items,
            operations: detail.operations,
        })
    }

    /// Cancels a submitted work order and releases its reservations.
    #[instrument(skip(self))]
    pub async fn cancel(&self, work_order_id: i64) -> Result<WorkOrderDetail, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let detail = load_detail(&txn, work_order_id).await?;
        let wo = &detail.work_order;

        if wo.doc_status() != Some(DocStatus::Submitted) {
            return Err(ServiceError::InvalidOperation(format!(
                "Work Order {} is not submitted and cannot be cancelled",
                work_order_id
            )));
        }
        if wo.is_stopped() {
            return Err(ServiceError::InvalidOperation(
                "Stopped Work Order cannot be cancelled, Unstop it first to cancel".to_string(),
            ));
        }

        let submitted_entries = stock_entry::Entity::find()
            .filter(stock_entry::Column::WorkOrderId.eq(work_order_id))
            .filter(stock_entry::Column::Docstatus.eq(DocStatus::Submitted.code()))
            .count(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if submitted_entries > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot cancel Work Order {}: {} submitted Stock Entries reference it",
                work_order_id, submitted_entries
            )));
        }

        let submitted_timesheets = timesheet::Entity::find()
            .filter(timesheet::Column::WorkOrderId.eq(work_order_id))
            .filter(timesheet::Column::Docstatus.eq(DocStatus::Submitted.code()))
            .count(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if submitted_timesheets > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot cancel Work Order {}: {} submitted Timesheets reference it",
                work_order_id, submitted_timesheets
            )));
        }

        let removed = timesheets::delete_drafts_for_work_order(&txn, work_order_id).await?;

        let mut header: work_order::ActiveModel = detail.work_order.clone().into();
        header.docstatus = Set(DocStatus::Cancelled.code());
        header.status = Set(WorkOrderStatus::Cancelled.to_string());
        let header = header.update(&txn).await.map_err(ServiceError::db_error)?;

        refresh_stock_counters(&txn, &header, &detail.required_items).await?;
        if let Some(so_item_id) = header.sales_order_item_id {
            sales_orders::refresh_work_order_qty(&txn, so_item_id).await?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.work_orders.cancelled", 1);
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::WorkOrderCancelled(work_order_id)).await;
        }
        info!(
            work_order_id,
            draft_timesheets_removed = removed,
            "Work order cancelled"
        );

        Ok(WorkOrderDetail {
            work_order: header,
            required_items: detail.required_items,
            operations: detail.operations,
        })
    }

    /// Stops or resumes a submitted work order.
    #[instrument(skip(self))]
    pub async fn stop_unstop(
        &self,
        work_order_id: i64,
        action: StopAction,
    ) -> Result<WorkOrderDetail, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let detail = load_detail(&txn, work_order_id).await?;
        let wo = &detail.work_order;

        if wo.doc_status() != Some(DocStatus::Submitted) {
            return Err(ServiceError::InvalidOperation(format!(
                "Work Order {} is not submitted",
                work_order_id
            )));
        }

        let status = match action {
            StopAction::Stopped => {
                if wo.work_order_status() == Some(WorkOrderStatus::Completed) {
                    return Err(ServiceError::InvalidOperation(format!(
                        "Completed Work Order {} cannot be stopped",
                        work_order_id
                    )));
                }
                WorkOrderStatus::Stopped
            }
            StopAction::Resumed => {
                if !wo.is_stopped() {
                    return Err(ServiceError::InvalidOperation(format!(
                        "Work Order {} is not stopped",
                        work_order_id
                    )));
                }
                derive_status(
                    DocStatus::Submitted,
                    wo.qty,
                    wo.produced_qty,
                    wo.material_transferred_for_manufacturing,
                )
            }
        };

        let mut header: work_order::ActiveModel = detail.work_order.clone().into();
        header.status = Set(status.to_string());
        let header = header.update(&txn).await.map_err(ServiceError::db_error)?;

        refresh_stock_counters(&txn, &header, &detail.required_items).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.work_orders.status_changed", 1);
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::WorkOrderStatusChanged {
                    work_order_id,
                    status: header.status.clone(),
                })
                .await;
        }
        info!(work_order_id, status = %header.status, "Work order status changed");

        Ok(WorkOrderDetail {
            work_order: header,
            required_items: detail.required_items,
            operations: detail.operations,
        })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, work_order_id: i64) -> Result<WorkOrderDetail, ServiceError> {
        load_detail(&*self.db, work_order_id).await
    }

    /// Shared save/submit validation; resolves the linked sales order item.
    async fn validate_draft<C>(
        &self,
        conn: &C,
        draft: &mut WorkOrderDraft,
        existing_id: Option<i64>,
    ) -> Result<(), ServiceError>
    where
        C: ConnectionTrait,
    {
        if draft.qty <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Quantity to Manufacture must be greater than 0".to_string(),
            ));
        }

        let item = validate_production_item(conn, &draft.production_item).await?;

        let bom = bom::Entity::find_by_id(draft.bom_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("BOM {} not found", draft.bom_id))
            })?;
        if !bom.is_active || bom.docstatus != DocStatus::Submitted.code() {
            return Err(ServiceError::ValidationError(format!(
                "BOM {} must be active and submitted",
                bom.id
            )));
        }
        if bom.item != item.item_code && item.variant_of.as_deref() != Some(bom.item.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "BOM {} does not belong to Item {}",
                bom.id, item.item_code
            )));
        }

        required_fg_warehouse(draft)?;
        for wh in [
            &draft.source_warehouse,
            &draft.wip_warehouse,
            &draft.fg_warehouse,
            &draft.scrap_warehouse,
        ]
        .into_iter()
        .flatten()
        {
            validate_warehouse(conn, wh, &draft.company).await?;
        }
        for row in &draft.required_items {
            let wh = row.source_warehouse.as_deref().ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Source warehouse is mandatory for item {}",
                    row.item_code
                ))
            })?;
            validate_warehouse(conn, wh, &draft.company).await?;
        }

        if draft.sales_order_id.is_some() {
            self.validate_against_sales_order(conn, draft, item.variant_of.as_deref(), existing_id)
                .await?;
        }

        draft.planned_operating_cost = draft
            .operations
            .iter()
            .map(|op| op.planned_operating_cost)
            .sum();

        Ok(())
    }

    /// Already ordered against the sales order + this qty may not exceed the
    /// sales order qty plus the configured allowance.
    async fn validate_against_sales_order<C>(
        &self,
        conn: &C,
        draft: &mut WorkOrderDraft,
        template: Option<&str>,
        existing_id: Option<i64>,
    ) -> Result<(), ServiceError>
    where
        C: ConnectionTrait,
    {
        let Some(so_id) = draft.sales_order_id else {
            return Ok(());
        };

        let so = sales_order::Entity::find_by_id(so_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::ValidationError(format!("Sales Order {} not found", so_id)))?;
        if so.doc_status() != Some(DocStatus::Submitted) {
            return Err(ServiceError::ValidationError(format!(
                "Sales Order {} must be submitted",
                so_id
            )));
        }

        let so_items = sales_order_item::Entity::find()
            .filter(sales_order_item::Column::SalesOrderId.eq(so_id))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;

        let matches_item = |code: &str| code == draft.production_item || Some(code) == template;
        let so_item = match draft.sales_order_item_id {
            Some(id) => so_items.iter().find(|row| row.id == id),
            None => so_items.iter().find(|row| matches_item(&row.item_code)),
        }
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Item {} not found in Sales Order {}",
                draft.production_item, so_id
            ))
        })?;

        let lines: Vec<&sales_order_item::Model> = so_items
            .iter()
            .filter(|row| row.item_code == so_item.item_code)
            .collect();
        let so_qty: Decimal = lines.iter().map(|row| row.stock_qty).sum();

        // Orders for sibling variants of a template line count against it too.
        let mut others = work_order::Entity::find()
            .filter(work_order::Column::SalesOrderId.eq(so_id))
            .filter(
                work_order::Column::SalesOrderItemId.is_in(lines.iter().map(|row| row.id)),
            )
            .filter(work_order::Column::Docstatus.lt(DocStatus::Cancelled.code()));
        if let Some(id) = existing_id {
            others = others.filter(work_order::Column::Id.ne(id));
        }
        let already_ordered: Decimal = others
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
            .iter()
            .map(|wo| wo.qty)
            .sum();

        let settings = self.settings.current(conn).await?;
        let allowed = with_allowance(so_qty, settings.overproduction_percentage_for_sales_order);
        let total = already_ordered + draft.qty;

        if total > allowed {
            warn!(
                sales_order_id = so_id,
                total = %total,
                allowed = %allowed,
                "Work order exceeds sales order quantity"
            );
            counter!("manufacturing.work_orders.over_production_rejected", 1);
            return Err(ServiceError::OverProduction(format!(
                "Cannot produce more Item {} than Sales Order quantity {} (requested {} in total)",
                draft.production_item, so_qty, total
            )));
        }

        draft.sales_order_item_id = Some(so_item.id);
        Ok(())
    }
}

fn apply_bom(draft: &mut WorkOrderDraft, bom: &BomDetail) {
    draft.required_items =
        required_items_for_qty(bom, draft.qty, draft.source_warehouse.as_deref());
    draft.operations = operations_for_qty(bom, draft.qty);
    draft.planned_operating_cost = draft
        .operations
        .iter()
        .map(|op| op.planned_operating_cost)
        .sum();
}

fn required_fg_warehouse(draft: &WorkOrderDraft) -> Result<String, ServiceError> {
    draft.fg_warehouse.clone().ok_or_else(|| {
        ServiceError::ValidationError("Target warehouse is mandatory".to_string())
    })
}

fn draft_from_detail(detail: &WorkOrderDetail) -> WorkOrderDraft {
    let wo = &detail.work_order;
    WorkOrderDraft {
        production_item: wo.production_item.clone(),
        company: wo.company.clone(),
        qty: wo.qty,
        bom_id: wo.bom_id,
        sales_order_id: wo.sales_order_id,
        sales_order_item_id: wo.sales_order_item_id,
        source_warehouse: wo.source_warehouse.clone(),
        wip_warehouse: wo.wip_warehouse.clone(),
        fg_warehouse: Some(wo.fg_warehouse.clone()),
        scrap_warehouse: wo.scrap_warehouse.clone(),
        skip_transfer: wo.skip_transfer,
        planned_start_date: wo.planned_start_date,
        additional_operating_cost: wo.additional_operating_cost,
        planned_operating_cost: wo.planned_operating_cost,
        required_items: detail
            .required_items
            .iter()
            .map(|row| RequiredItemDraft {
                item_code: row.item_code.clone(),
                source_warehouse: Some(row.source_warehouse.clone()),
                required_qty: row.required_qty,
                rate: row.rate,
            })
            .collect(),
        operations: detail
            .operations
            .iter()
            .map(|op| OperationDraft {
                operation: op.operation.clone(),
                workstation: op.workstation.clone(),
                time_in_mins: op.time_in_mins,
                hour_rate: op.hour_rate,
                planned_operating_cost: op.planned_operating_cost,
            })
            .collect(),
    }
}

async fn write_children<C>(
    conn: &C,
    work_order_id: i64,
    draft: &WorkOrderDraft,
) -> Result<(Vec<work_order_item::Model>, Vec<work_order_operation::Model>), ServiceError>
where
    C: ConnectionTrait,
{
    let mut items = Vec::with_capacity(draft.required_items.len());
    for (idx, row) in draft.required_items.iter().enumerate() {
        let source_warehouse = row.source_warehouse.clone().ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Source warehouse is mandatory for item {}",
                row.item_code
            ))
        })?;
        let created = work_order_item::ActiveModel {
            work_order_id: Set(work_order_id),
            idx: Set(idx as i32 + 1),
            item_code: Set(row.item_code.clone()),
            source_warehouse: Set(source_warehouse),
            required_qty: Set(row.required_qty),
            transferred_qty: Set(Decimal::ZERO),
            consumed_qty: Set(Decimal::ZERO),
            rate: Set(row.rate),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;
        items.push(created);
    }

    let mut operations = Vec::with_capacity(draft.operations.len());
    for (idx, op) in draft.operations.iter().enumerate() {
        let created = work_order_operation::ActiveModel {
            work_order_id: Set(work_order_id),
            idx: Set(idx as i32 + 1),
            operation: Set(op.operation.clone()),
            workstation: Set(op.workstation.clone()),
            time_in_mins: Set(op.time_in_mins),
            hour_rate: Set(op.hour_rate),
            planned_operating_cost: Set(op.planned_operating_cost),
            completed_qty: Set(Decimal::ZERO),
            status: Set(OperationStatus::Pending.to_string()),
            actual_operation_time: Set(Decimal::ZERO),
            actual_operating_cost: Set(Decimal::ZERO),
            actual_start_time: Set(None),
            actual_end_time: Set(None),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;
        operations.push(created);
    }

    Ok((items, operations))
}

pub(crate) async fn load_work_order<C>(
    conn: &C,
    work_order_id: i64,
) -> Result<work_order::Model, ServiceError>
where
    C: ConnectionTrait,
{
    work_order::Entity::find_by_id(work_order_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Work Order {}", work_order_id)))
}

pub(crate) async fn load_detail<C>(
    conn: &C,
    work_order_id: i64,
) -> Result<WorkOrderDetail, ServiceError>
where
    C: ConnectionTrait,
{
    let work_order = load_work_order(conn, work_order_id).await?;

    let required_items = work_order_item::Entity::find()
        .filter(work_order_item::Column::WorkOrderId.eq(work_order_id))
        .order_by_asc(work_order_item::Column::Idx)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let operations = work_order_operation::Entity::find()
        .filter(work_order_operation::Column::WorkOrderId.eq(work_order_id))
        .order_by_asc(work_order_operation::Column::Idx)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(WorkOrderDetail {
        work_order,
        required_items,
        operations,
    })
}

/// Recomputes reservation for every required item and planned qty for the finished good.
async fn refresh_stock_counters<C>(
    conn: &C,
    wo: &work_order::Model,
    required_items: &[work_order_item::Model],
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    for row in required_items {
        update_reserved_qty_for_production(conn, &row.item_code, &row.source_warehouse).await?;
    }
    update_planned_qty(conn, &wo.production_item, &wo.fg_warehouse).await?;
    Ok(())
}

/// Rebuilds transferred/produced quantities from submitted stock entries and
/// refreshes the bins they affect.
pub(crate) async fn update_work_order_qty<C>(
    conn: &C,
    work_order_id: i64,
) -> Result<work_order::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let detail = load_detail(conn, work_order_id).await?;
    let wo = &detail.work_order;

    let entries = stock_entry::Entity::find()
        .filter(stock_entry::Column::WorkOrderId.eq(work_order_id))
        .filter(stock_entry::Column::Docstatus.eq(DocStatus::Submitted.code()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let transfers: Vec<&stock_entry::Model> = entries
        .iter()
        .filter(|e| {
            e.stock_entry_purpose() == Some(StockEntryPurpose::MaterialTransferForManufacture)
        })
        .collect();
    let manufactures: Vec<&stock_entry::Model> = entries
        .iter()
        .filter(|e| e.stock_entry_purpose() == Some(StockEntryPurpose::Manufacture))
        .collect();

    let transferred: Decimal = transfers.iter().map(|e| e.fg_completed_qty).sum();
    let produced: Decimal = manufactures.iter().map(|e| e.fg_completed_qty).sum();

    let entry_ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
    let details = if entry_ids.is_empty() {
        Vec::new()
    } else {
        stock_entry_detail::Entity::find()
            .filter(stock_entry_detail::Column::StockEntryId.is_in(entry_ids))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
    };

    let transfer_ids: Vec<i64> = transfers.iter().map(|e| e.id).collect();
    let manufacture_ids: Vec<i64> = manufactures.iter().map(|e| e.id).collect();

    for row in &detail.required_items {
        let raw_rows = details
            .iter()
            .filter(|d| d.item_code == row.item_code && !d.is_finished_item && !d.is_scrap_item);
        let transferred_qty: Decimal = raw_rows
            .clone()
            .filter(|d| transfer_ids.contains(&d.stock_entry_id))
            .map(|d| d.qty)
            .sum();
        let consumed_qty: Decimal = raw_rows
            .filter(|d| manufacture_ids.contains(&d.stock_entry_id) && d.s_warehouse.is_some())
            .map(|d| d.qty)
            .sum();

        if transferred_qty != row.transferred_qty || consumed_qty != row.consumed_qty {
            let mut model: work_order_item::ActiveModel = row.clone().into();
            model.transferred_qty = Set(round(transferred_qty));
            model.consumed_qty = Set(round(consumed_qty));
            model.update(conn).await.map_err(ServiceError::db_error)?;
        }
    }

    let status = if wo.is_stopped() {
        WorkOrderStatus::Stopped
    } else {
        derive_status(
            wo.doc_status().unwrap_or(DocStatus::Submitted),
            wo.qty,
            produced,
            transferred,
        )
    };
    let actual_start_date = entries.iter().map(|e| e.posting_date).min();
    let actual_end_date = if produced >= wo.qty {
        manufactures.iter().map(|e| e.posting_date).max()
    } else {
        None
    };

    let mut header: work_order::ActiveModel = wo.clone().into();
    header.material_transferred_for_manufacturing = Set(round(transferred));
    header.produced_qty = Set(round(produced));
    header.status = Set(status.to_string());
    header.actual_start_date = Set(actual_start_date);
    header.actual_end_date = Set(actual_end_date);
    let header = header.update(conn).await.map_err(ServiceError::db_error)?;

    let required_items = work_order_item::Entity::find()
        .filter(work_order_item::Column::WorkOrderId.eq(work_order_id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    refresh_stock_counters(conn, &header, &required_items).await?;

    Ok(header)
}

/// Rolls submitted timesheet logs into each operation and the work order's
/// actual operating cost.
pub(crate) async fn update_operations_from_timesheets<C>(
    conn: &C,
    work_order_id: i64,
) -> Result<work_order::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let detail = load_detail(conn, work_order_id).await?;
    let wo = &detail.work_order;

    let submitted_ids: Vec<i64> = timesheet::Entity::find()
        .filter(timesheet::Column::WorkOrderId.eq(work_order_id))
        .filter(timesheet::Column::Docstatus.eq(DocStatus::Submitted.code()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|ts| ts.id)
        .collect();

    let logs = if submitted_ids.is_empty() {
        Vec::new()
    } else {
        timesheet_detail::Entity::find()
            .filter(timesheet_detail::Column::TimesheetId.is_in(submitted_ids))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
    };

    let mut actual_operating_cost = Decimal::ZERO;
    for op in &detail.operations {
        let op_logs: Vec<&timesheet_detail::Model> = logs
            .iter()
            .filter(|log| log.operation_id == Some(op.id))
            .collect();

        let completed_qty: Decimal = op_logs.iter().map(|l| l.completed_qty).sum();
        let hours: Decimal = op_logs.iter().map(|l| l.hours).sum();
        let cost: Decimal = op_logs.iter().map(|l| l.costing_amount).sum();
        let status = operation_status(completed_qty, wo.qty);

        actual_operating_cost += cost;

        let mut model: work_order_operation::ActiveModel = op.clone().into();
        model.completed_qty = Set(round(completed_qty));
        model.actual_operation_time = Set(round(hours * Decimal::from(60)));
        model.actual_operating_cost = Set(round(cost));
        model.status = Set(status.to_string());
        model.actual_start_time = Set(op_logs.iter().map(|l| l.from_time).min());
        model.actual_end_time = Set(op_logs.iter().map(|l| l.to_time).max());
        model.update(conn).await.map_err(ServiceError::db_error)?;
    }

    let mut header: work_order::ActiveModel = wo.clone().into();
    header.actual_operating_cost = Set(round(actual_operating_cost));
    header.total_operating_cost = Set(total_operating_cost(
        wo.planned_operating_cost,
        round(actual_operating_cost),
        wo.additional_operating_cost,
    ));
    header.update(conn).await.map_err(ServiceError::db_error)
}

pub fn operation_status(completed_qty: Decimal, qty: Decimal) -> OperationStatus {
    if completed_qty >= qty {
        OperationStatus::Completed
    } else if completed_qty > Decimal::ZERO {
        OperationStatus::WorkInProgress
    } else {
        OperationStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{bom_item, bom_operation};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn bom_detail(quantity: Decimal) -> BomDetail {
        let now = Utc::now();
        BomDetail {
            bom: bom::Model {
                id: 1,
                item: "_Test FG Item".into(),
                company: "_Test Company".into(),
                quantity,
                is_active: true,
                is_default: true,
                with_operations: true,
                docstatus: 1,
                operating_cost: Decimal::ZERO,
                raw_material_cost: Decimal::ZERO,
                scrap_material_cost: Decimal::ZERO,
                created_at: now,
                updated_at: now,
            },
            items: vec![bom_item::Model {
                id: 1,
                bom_id: 1,
                idx: 1,
                item_code: "_Test Item".into(),
                qty: dec!(2),
                stock_qty: dec!(2),
                rate: dec!(10),
                source_warehouse: None,
            }],
            operations: vec![bom_operation::Model {
                id: 1,
                bom_id: 1,
                idx: 1,
                operation: "_Test Operation 1".into(),
                workstation: "_Test Workstation 1".into(),
                time_in_mins: dec!(60),
                hour_rate: dec!(100),
            }],
            scrap_items: vec![],
        }
    }

    #[test]
    fn planned_operating_cost_doubles_with_qty() {
        let bom = bom_detail(dec!(1));
        let one = operations_for_qty(&bom, dec!(1));
        let two = operations_for_qty(&bom, dec!(2));
        assert_eq!(one[0].time_in_mins, dec!(60));
        assert_eq!(one[0].planned_operating_cost, dec!(100));
        assert_eq!(
            two[0].planned_operating_cost,
            one[0].planned_operating_cost * dec!(2)
        );
    }

    #[test]
    fn required_qty_scales_from_bom_batch() {
        let bom = bom_detail(dec!(4));
        let rows = required_items_for_qty(&bom, dec!(10), Some("_Test Warehouse - _TC"));
        assert_eq!(rows[0].required_qty, dec!(5));
        assert_eq!(rows[0].source_warehouse.as_deref(), Some("_Test Warehouse - _TC"));
    }

    #[rstest]
    #[case(DocStatus::Draft, dec!(0), dec!(0), WorkOrderStatus::Draft)]
    #[case(DocStatus::Submitted, dec!(0), dec!(0), WorkOrderStatus::NotStarted)]
    #[case(DocStatus::Submitted, dec!(0), dec!(4), WorkOrderStatus::InProcess)]
    #[case(DocStatus::Submitted, dec!(4), dec!(4), WorkOrderStatus::InProcess)]
    #[case(DocStatus::Submitted, dec!(10), dec!(10), WorkOrderStatus::Completed)]
    #[case(DocStatus::Cancelled, dec!(0), dec!(0), WorkOrderStatus::Cancelled)]
    fn status_follows_quantities(
        #[case] docstatus: DocStatus,
        #[case] produced: Decimal,
        #[case] transferred: Decimal,
        #[case] expected: WorkOrderStatus,
    ) {
        assert_eq!(derive_status(docstatus, dec!(10), produced, transferred), expected);
    }

    #[test]
    fn total_operating_cost_prefers_actual() {
        assert_eq!(total_operating_cost(dec!(100), dec!(0), dec!(5)), dec!(105));
        assert_eq!(total_operating_cost(dec!(100), dec!(80), dec!(5)), dec!(85));
    }

    #[test]
    fn operation_status_thresholds() {
        assert_eq!(operation_status(dec!(0), dec!(2)), OperationStatus::Pending);
        assert_eq!(operation_status(dec!(1), dec!(2)), OperationStatus::WorkInProgress);
        assert_eq!(operation_status(dec!(2), dec!(2)), OperationStatus::Completed);
    }
}
