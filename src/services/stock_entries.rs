use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    entities::{
        stock_entry, stock_entry_detail, warehouse, work_order, DocStatus, StockEntryPurpose,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        boms::load_bom_detail,
        master_data::{get_item, validate_warehouse},
        non_negative, round,
        settings::ManufacturingSettingsService,
        stock_ledger::{cancel_voucher_movements, post_movement, Movement},
        with_allowance,
        work_orders::{load_detail, load_work_order, update_work_order_qty},
    },
};

pub const VOUCHER_TYPE: &str = "Stock Entry";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntryRowDraft {
    pub item_code: String,
    pub qty: Decimal,
    pub s_warehouse: Option<String>,
    pub t_warehouse: Option<String>,
    /// Used as-is for receipts and scrap; outgoing rows are valued on submit
    #[serde(default)]
    pub basic_rate: Decimal,
    #[serde(default)]
    pub is_finished_item: bool,
    #[serde(default)]
    pub is_scrap_item: bool,
    pub bom_id: Option<i64>,
}

/// An unsaved stock entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockEntryDraft {
    pub purpose: StockEntryPurpose,
    pub company: String,
    pub work_order_id: Option<i64>,
    pub bom_id: Option<i64>,
    pub fg_completed_qty: Decimal,
    pub from_warehouse: Option<String>,
    pub to_warehouse: Option<String>,
    pub posting_date: DateTime<Utc>,
    /// Operating cost share absorbed by the finished good
    pub additional_costs: Decimal,
    pub items: Vec<StockEntryRowDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockEntryDetail {
    #[serde(flatten)]
    pub stock_entry: stock_entry::Model,
    pub items: Vec<stock_entry_detail::Model>,
}

/// Finished-good rate: consumed material plus operating cost, less recovered scrap.
pub fn finished_good_rate(
    raw_material_value: Decimal,
    additional_costs: Decimal,
    scrap_value: Decimal,
    fg_qty: Decimal,
) -> Decimal {
    if fg_qty <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round(non_negative(raw_material_value + additional_costs - scrap_value) / fg_qty)
}

/// Scrap generated by producing `fg_qty` against a BOM batch of `bom_quantity`.
pub fn scrap_qty(fg_qty: Decimal, scrap_stock_qty: Decimal, bom_quantity: Decimal) -> Decimal {
    round(fg_qty * scrap_stock_qty / bom_quantity)
}

#[derive(Clone)]
pub struct StockEntryService {
    db: Arc<DatabaseConnection>,
    settings: Arc<ManufacturingSettingsService>,
    event_sender: Option<EventSender>,
}

impl StockEntryService {
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

    /// Builds a transfer or manufacture entry for a submitted work order.
    /// `qty` defaults to whatever is still outstanding for the purpose.
    #[instrument(skip(self))]
    pub async fn make_stock_entry(
        &self,
        work_order_id: i64,
        purpose: StockEntryPurpose,
        qty: Option<Decimal>,
    ) -> Result<StockEntryDraft, ServiceError> {
        if !purpose.is_work_order_purpose() {
            return Err(ServiceError::InvalidInput(format!(
                "Stock Entry purpose {} cannot be made from a Work Order",
                purpose
            )));
        }

        let db = &*self.db;
        let detail = load_detail(db, work_order_id).await?;
        let wo = &detail.work_order;
        ensure_open(wo)?;

        let fg_qty = match qty {
            Some(q) if q <= Decimal::ZERO => {
                return Err(ServiceError::InvalidInput(format!(
                    "Quantity must be positive, got: {}",
                    q
                )))
            }
            Some(q) => q,
            None => match purpose {
                StockEntryPurpose::MaterialTransferForManufacture => {
                    non_negative(wo.qty - wo.material_transferred_for_manufacturing)
                }
                _ => non_negative(wo.qty - wo.produced_qty),
            },
        };
        if fg_qty.is_zero() {
            return Err(ServiceError::InvalidOperation(format!(
                "Nothing left to {} for Work Order {}",
                purpose, work_order_id
            )));
        }

        let per_unit = |required: Decimal| round(required / wo.qty * fg_qty);
        let mut items = Vec::new();

        let (from_warehouse, to_warehouse, additional_costs) = match purpose {
            StockEntryPurpose::MaterialTransferForManufacture => {
                if wo.skip_transfer {
                    return Err(ServiceError::InvalidOperation(format!(
                        "Work Order {} skips material transfer",
                        work_order_id
                    )));
                }
                let wip = wo.wip_warehouse.clone().ok_or_else(|| {
                    ServiceError::ValidationError(
                        "Work-in-Progress Warehouse is required".to_string(),
                    )
                })?;
                for row in &detail.required_items {
                    items.push(StockEntryRowDraft {
                        item_code: row.item_code.clone(),
                        qty: per_unit(row.required_qty),
                        s_warehouse: Some(row.source_warehouse.clone()),
                        t_warehouse: Some(wip.clone()),
                        basic_rate: Decimal::ZERO,
                        is_finished_item: false,
                        is_scrap_item: false,
                        bom_id: None,
                    });
                }
                (wo.source_warehouse.clone(), Some(wip), Decimal::ZERO)
            }
            _ => {
                for row in &detail.required_items {
                    let source = if wo.skip_transfer {
                        row.source_warehouse.clone()
                    } else {
                        wo.wip_warehouse.clone().ok_or_else(|| {
                            ServiceError::ValidationError(
                                "Work-in-Progress Warehouse is required".to_string(),
                            )
                        })?
                    };
                    items.push(StockEntryRowDraft {
                        item_code: row.item_code.clone(),
                        qty: per_unit(row.required_qty),
                        s_warehouse: Some(source),
                        t_warehouse: None,
                        basic_rate: Decimal::ZERO,
                        is_finished_item: false,
                        is_scrap_item: false,
                        bom_id: None,
                    });
                }

                items.push(StockEntryRowDraft {
                    item_code: wo.production_item.clone(),
                    qty: fg_qty,
                    s_warehouse: None,
                    t_warehouse: Some(wo.fg_warehouse.clone()),
                    basic_rate: Decimal::ZERO,
                    is_finished_item: true,
                    is_scrap_item: false,
                    bom_id: Some(wo.bom_id),
                });

                let bom = load_bom_detail(db, wo.bom_id).await?;
                if !bom.scrap_items.is_empty() {
                    let scrap_warehouse = match &wo.scrap_warehouse {
                        Some(wh) => Some(wh.clone()),
                        None => self.settings.current(db).await?.default_scrap_warehouse,
                    }
                    .ok_or_else(|| {
                        ServiceError::ValidationError(
                            "Scrap Warehouse is required for BOMs with scrap items".to_string(),
                        )
                    })?;
                    for scrap in &bom.scrap_items {
                        items.push(StockEntryRowDraft {
                            item_code: scrap.item_code.clone(),
                            qty: scrap_qty(fg_qty, scrap.stock_qty, bom.bom.quantity),
                            s_warehouse: None,
                            t_warehouse: Some(scrap_warehouse.clone()),
                            basic_rate: scrap.rate,
                            is_finished_item: false,
                            is_scrap_item: true,
                            bom_id: None,
                        });
                    }
                }

                let additional = round(wo.total_operating_cost / wo.qty * fg_qty);
                let from = if wo.skip_transfer {
                    wo.source_warehouse.clone()
                } else {
                    wo.wip_warehouse.clone()
                };
                (from, Some(wo.fg_warehouse.clone()), additional)
            }
        };

        Ok(StockEntryDraft {
            purpose,
            company: wo.company.clone(),
            work_order_id: Some(work_order_id),
            bom_id: Some(wo.bom_id),
            fg_completed_qty: fg_qty,
            from_warehouse,
            to_warehouse,
            posting_date: Utc::now(),
            additional_costs,
            items,
        })
    }

    /// Validates rows against the entry's purpose and saves it as a draft.
    #[instrument(skip(self, draft), fields(purpose = %draft.purpose, work_order_id = ?draft.work_order_id))]
    pub async fn insert(&self, draft: StockEntryDraft) -> Result<StockEntryDetail, ServiceError> {
        validate_rows(&draft)?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        for row in &draft.items {
            get_item(&txn, &row.item_code).await?;
            for wh in [&row.s_warehouse, &row.t_warehouse].into_iter().flatten() {
                validate_warehouse(&txn, wh, &draft.company).await?;
            }
        }
        if let Some(wo_id) = draft.work_order_id {
            load_work_order(&txn, wo_id).await?;
        }

        let header = stock_entry::ActiveModel {
            purpose: Set(draft.purpose.to_string()),
            company: Set(draft.company.clone()),
            work_order_id: Set(draft.work_order_id),
            bom_id: Set(draft.bom_id),
            fg_completed_qty: Set(draft.fg_completed_qty),
            from_warehouse: Set(draft.from_warehouse.clone()),
            to_warehouse: Set(draft.to_warehouse.clone()),
            posting_date: Set(draft.posting_date),
            total_outgoing_value: Set(Decimal::ZERO),
            total_incoming_value: Set(Decimal::ZERO),
            total_additional_costs: Set(draft.additional_costs),
            docstatus: Set(DocStatus::Draft.code()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(draft.items.len());
        for (idx, row) in draft.items.iter().enumerate() {
            let created = stock_entry_detail::ActiveModel {
                stock_entry_id: Set(header.id),
                idx: Set(idx as i32 + 1),
                item_code: Set(row.item_code.clone()),
                qty: Set(row.qty),
                s_warehouse: Set(row.s_warehouse.clone()),
                t_warehouse: Set(row.t_warehouse.clone()),
                basic_rate: Set(row.basic_rate),
                basic_amount: Set(round(row.qty * row.basic_rate)),
                is_finished_item: Set(row.is_finished_item),
                is_scrap_item: Set(row.is_scrap_item),
                bom_id: Set(row.bom_id),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            items.push(created);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.stock_entries.created", 1);
        info!(stock_entry_id = header.id, "Stock entry created");

        Ok(StockEntryDetail {
            stock_entry: header,
            items,
        })
    }

    /// Posts the entry to the stock ledger and rolls its quantities into the work order.
    #[instrument(skip(self))]
    pub async fn submit(&self, stock_entry_id: i64) -> Result<StockEntryDetail, ServiceError> {
        let start = std::time::Instant::now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let detail = load_entry(&txn, stock_entry_id).await?;
        let entry = &detail.stock_entry;

        if entry.doc_status() != Some(DocStatus::Draft) {
            return Err(ServiceError::InvalidOperation(format!(
                "Stock Entry {} is not a draft and cannot be submitted",
                stock_entry_id
            )));
        }
        let purpose = entry.stock_entry_purpose().ok_or_else(|| {
            ServiceError::InternalError(format!("Unknown stock entry purpose {}", entry.purpose))
        })?;

        if let Some(wo_id) = entry.work_order_id {
            let wo = load_work_order(&txn, wo_id).await?;
            ensure_open(&wo)?;
            if purpose.is_work_order_purpose() {
                self.check_over_production(&txn, &wo, entry, purpose).await?;
            }
            if purpose == StockEntryPurpose::Manufacture {
                self.check_operations_completed(&txn, &wo, entry.fg_completed_qty)
                    .await?;
            }
        }

        let mut rates: Vec<Decimal> = detail.items.iter().map(|row| row.basic_rate).collect();
        let mut total_outgoing = Decimal::ZERO;
        let mut consumed_value = Decimal::ZERO;

        for (i, row) in detail.items.iter().enumerate() {
            let Some(source) = row.s_warehouse.as_deref() else {
                continue;
            };
            let sle = post_movement(
                &txn,
                Movement {
                    item_code: &row.item_code,
                    warehouse: source,
                    qty: -row.qty,
                    incoming_rate: Decimal::ZERO,
                    voucher_type: VOUCHER_TYPE,
                    voucher_id: entry.id,
                    voucher_detail_id: row.id,
                    posting_date: entry.posting_date,
                },
            )
            .await?;
            let value = -sle.stock_value_difference;
            rates[i] = round(value / row.qty);
            total_outgoing += value;
            if row.t_warehouse.is_none() {
                consumed_value += value;
            }
        }

        let scrap_value: Decimal = detail
            .items
            .iter()
            .zip(&rates)
            .filter(|(row, _)| row.is_scrap_item)
            .map(|(row, rate)| row.qty * rate)
            .sum();

        let mut total_incoming = Decimal::ZERO;
        for (i, row) in detail.items.iter().enumerate() {
            let Some(target) = row.t_warehouse.as_deref() else {
                continue;
            };
            if row.is_finished_item {
                rates[i] = finished_good_rate(
                    consumed_value,
                    entry.total_additional_costs,
                    scrap_value,
                    row.qty,
                );
            }
            post_movement(
                &txn,
                Movement {
                    item_code: &row.item_code,
                    warehouse: target,
                    qty: row.qty,
                    incoming_rate: rates[i],
                    voucher_type: VOUCHER_TYPE,
                    voucher_id: entry.id,
                    voucher_detail_id: row.id,
                    posting_date: entry.posting_date,
                },
            )
            .await?;
            total_incoming += row.qty * rates[i];
        }

        let mut items = Vec::with_capacity(detail.items.len());
        for (row, rate) in detail.items.iter().zip(rates) {
            let mut model: stock_entry_detail::ActiveModel = row.clone().into();
            model.basic_rate = Set(rate);
            model.basic_amount = Set(round(row.qty * rate));
            items.push(model.update(&txn).await.map_err(ServiceError::db_error)?);
        }

        let mut header: stock_entry::ActiveModel = entry.clone().into();
        header.docstatus = Set(DocStatus::Submitted.code());
        header.total_outgoing_value = Set(round(total_outgoing));
        header.total_incoming_value = Set(round(total_incoming));
        let header = header.update(&txn).await.map_err(ServiceError::db_error)?;

        let progressed = match header.work_order_id {
            Some(wo_id) => Some(update_work_order_qty(&txn, wo_id).await?),
            None => None,
        };

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.stock_entries.submitted", 1);
        histogram!(
            "manufacturing.stock_entries.submit_duration_ms",
            start.elapsed().as_millis() as f64
        );
        self.publish_submitted(&header, purpose, progressed.as_ref(), false)
            .await;
        info!(
            stock_entry_id,
            purpose = %purpose,
            outgoing = %header.total_outgoing_value,
            incoming = %header.total_incoming_value,
            "Stock entry submitted"
        );

        Ok(StockEntryDetail {
            stock_entry: header,
            items,
        })
    }

    /// Reverses the entry's ledger postings and recomputes the work order.
    #[instrument(skip(self))]
    pub async fn cancel(&self, stock_entry_id: i64) -> Result<StockEntryDetail, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let detail = load_entry(&txn, stock_entry_id).await?;
        let entry = &detail.stock_entry;

        if entry.doc_status() != Some(DocStatus::Submitted) {
            return Err(ServiceError::InvalidOperation(format!(
                "Stock Entry {} is not submitted and cannot be cancelled",
                stock_entry_id
            )));
        }
        let purpose = entry.stock_entry_purpose().ok_or_else(|| {
            ServiceError::InternalError(format!("Unknown stock entry purpose {}", entry.purpose))
        })?;
        if let Some(wo_id) = entry.work_order_id {
            ensure_open(&load_work_order(&txn, wo_id).await?)?;
        }

        let reversed = cancel_voucher_movements(&txn, VOUCHER_TYPE, stock_entry_id).await?;

        let mut header: stock_entry::ActiveModel = entry.clone().into();
        header.docstatus = Set(DocStatus::Cancelled.code());
        let header = header.update(&txn).await.map_err(ServiceError::db_error)?;

        let progressed = match header.work_order_id {
            Some(wo_id) => Some(update_work_order_qty(&txn, wo_id).await?),
            None => None,
        };

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.stock_entries.cancelled", 1);
        self.publish_submitted(&header, purpose, progressed.as_ref(), true)
            .await;
        info!(stock_entry_id, reversed, "Stock entry cancelled");

        Ok(StockEntryDetail {
            stock_entry: header,
            items: detail.items,
        })
    }

    /// Receives `qty` of an item into a warehouse at `rate`.
    #[instrument(skip(self))]
    pub async fn make_material_receipt(
        &self,
        item_code: &str,
        warehouse_name: &str,
        qty: Decimal,
        rate: Decimal,
    ) -> Result<StockEntryDetail, ServiceError> {
        let wh = warehouse::Entity::find_by_id(warehouse_name.to_string())
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("Warehouse {} not found", warehouse_name))
            })?;

        let draft = StockEntryDraft {
            purpose: StockEntryPurpose::MaterialReceipt,
            company: wh.company,
            work_order_id: None,
            bom_id: None,
            fg_completed_qty: Decimal::ZERO,
            from_warehouse: None,
            to_warehouse: Some(wh.name.clone()),
            posting_date: Utc::now(),
            additional_costs: Decimal::ZERO,
            items: vec![StockEntryRowDraft {
                item_code: item_code.to_string(),
                qty,
                s_warehouse: None,
                t_warehouse: Some(wh.name),
                basic_rate: rate,
                is_finished_item: false,
                is_scrap_item: false,
                bom_id: None,
            }],
        };

        let saved = self.insert(draft).await?;
        self.submit(saved.stock_entry.id).await
    }

    pub async fn get(&self, stock_entry_id: i64) -> Result<StockEntryDetail, ServiceError> {
        load_entry(&*self.db, stock_entry_id).await
    }

    /// Submitted quantity for this purpose plus this entry may not exceed the
    /// work order qty plus the configured allowance.
    async fn check_over_production<C>(
        &self,
        conn: &C,
        wo: &work_order::Model,
        entry: &stock_entry::Model,
        purpose: StockEntryPurpose,
    ) -> Result<(), ServiceError>
    where
        C: ConnectionTrait,
    {
        let already: Decimal = stock_entry::Entity::find()
            .filter(stock_entry::Column::WorkOrderId.eq(wo.id))
            .filter(stock_entry::Column::Purpose.eq(purpose.to_string()))
            .filter(stock_entry::Column::Docstatus.eq(DocStatus::Submitted.code()))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
            .iter()
            .map(|e| e.fg_completed_qty)
            .sum();

        let settings = self.settings.current(conn).await?;
        let allowed = with_allowance(wo.qty, settings.overproduction_percentage_for_work_order);
        let total = already + entry.fg_completed_qty;

        if total > allowed {
            warn!(
                work_order_id = wo.id,
                total = %total,
                allowed = %allowed,
                "Stock entry exceeds work order quantity"
            );
            counter!("manufacturing.stock_entries.over_production_rejected", 1);
            return Err(ServiceError::StockOverProduction(format!(
                "{} quantity ({}) cannot be greater than planned quantity ({}) in Work Order {}",
                purpose, total, wo.qty, wo.id
            )));
        }

        Ok(())
    }

    /// Every operation must have logged at least the quantity being manufactured.
    async fn check_operations_completed<C>(
        &self,
        conn: &C,
        wo: &work_order::Model,
        fg_qty: Decimal,
    ) -> Result<(), ServiceError>
    where
        C: ConnectionTrait,
    {
        let detail = load_detail(conn, wo.id).await?;
        if detail.operations.is_empty() {
            return Ok(());
        }

        let settings = self.settings.current(conn).await?;
        let total = wo.produced_qty + fg_qty;
        for op in &detail.operations {
            let completed = with_allowance(
                op.completed_qty,
                settings.overproduction_percentage_for_work_order,
            );
            if total > completed {
                return Err(ServiceError::OperationsNotComplete(format!(
                    "Row #{}: Operation {} is not completed for {} qty of finished goods in Work Order {}",
                    op.idx, op.operation, total, wo.id
                )));
            }
        }

        Ok(())
    }

    async fn publish_submitted(
        &self,
        entry: &stock_entry::Model,
        purpose: StockEntryPurpose,
        work_order: Option<&work_order::Model>,
        cancelled: bool,
    ) {
        let Some(sender) = &self.event_sender else {
            return;
        };
        let event = if cancelled {
            Event::StockEntryCancelled {
                stock_entry_id: entry.id,
                work_order_id: entry.work_order_id,
                purpose: purpose.to_string(),
            }
        } else {
            Event::StockEntrySubmitted {
                stock_entry_id: entry.id,
                work_order_id: entry.work_order_id,
                purpose: purpose.to_string(),
            }
        };
        sender.send_or_log(event).await;

        if let Some(wo) = work_order {
            sender
                .send_or_log(Event::WorkOrderProgressed {
                    work_order_id: wo.id,
                    produced_qty: wo.produced_qty,
                    material_transferred_for_manufacturing: wo
                        .material_transferred_for_manufacturing,
                })
                .await;
        }
    }
}

fn ensure_open(wo: &work_order::Model) -> Result<(), ServiceError> {
    if wo.doc_status() != Some(DocStatus::Submitted) {
        return Err(ServiceError::InvalidOperation(format!(
            "Work Order {} must be submitted",
            wo.id
        )));
    }
    if wo.is_stopped() {
        return Err(ServiceError::InvalidOperation(format!(
            "Transaction not allowed against stopped Work Order {}",
            wo.id
        )));
    }
    Ok(())
}

fn validate_rows(draft: &StockEntryDraft) -> Result<(), ServiceError> {
    if draft.items.is_empty() {
        return Err(ServiceError::ValidationError(
            "Stock Entry must have at least one item".to_string(),
        ));
    }
    if draft.purpose.is_work_order_purpose() {
        if draft.work_order_id.is_none() {
            return Err(ServiceError::ValidationError(format!(
                "Work Order is required for {}",
                draft.purpose
            )));
        }
        if draft.fg_completed_qty <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "For Quantity must be greater than zero".to_string(),
            ));
        }
    }

    for (idx, row) in draft.items.iter().enumerate() {
        let row_no = idx + 1;
        if row.qty <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Row {}: quantity for {} must be positive",
                row_no, row.item_code
            )));
        }

        let (needs_source, needs_target) = match draft.purpose {
            StockEntryPurpose::MaterialReceipt => (false, true),
            StockEntryPurpose::MaterialIssue => (true, false),
            StockEntryPurpose::MaterialTransfer
            | StockEntryPurpose::MaterialTransferForManufacture => (true, true),
            StockEntryPurpose::Manufacture => {
                let produced = row.is_finished_item || row.is_scrap_item;
                (!produced, produced)
            }
        };

        if needs_source != row.s_warehouse.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Row {}: source warehouse {} for {} in a {} entry",
                row_no,
                if needs_source { "is required" } else { "is not allowed" },
                row.item_code,
                draft.purpose
            )));
        }
        if needs_target != row.t_warehouse.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Row {}: target warehouse {} for {} in a {} entry",
                row_no,
                if needs_target { "is required" } else { "is not allowed" },
                row.item_code,
                draft.purpose
            )));
        }
        if row.s_warehouse.is_some() && row.s_warehouse == row.t_warehouse {
            return Err(ServiceError::ValidationError(format!(
                "Row {}: source and target warehouse cannot be the same",
                row_no
            )));
        }
    }

    Ok(())
}

async fn load_entry<C>(conn: &C, stock_entry_id: i64) -> Result<StockEntryDetail, ServiceError>
where
    C: ConnectionTrait,
{
    let stock_entry = stock_entry::Entity::find_by_id(stock_entry_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Stock Entry {}", stock_entry_id)))?;

    let items = stock_entry_detail::Entity::find()
        .filter(stock_entry_detail::Column::StockEntryId.eq(stock_entry_id))
        .order_by_asc(stock_entry_detail::Column::Idx)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(StockEntryDetail { stock_entry, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn receipt(rows: Vec<StockEntryRowDraft>) -> StockEntryDraft {
        StockEntryDraft {
            purpose: StockEntryPurpose::MaterialReceipt,
            company: "_Test Company".into(),
            work_order_id: None,
            bom_id: None,
            fg_completed_qty: Decimal::ZERO,
            from_warehouse: None,
            to_warehouse: None,
            posting_date: Utc::now(),
            additional_costs: Decimal::ZERO,
            items: rows,
        }
    }

    fn row(s: Option<&str>, t: Option<&str>) -> StockEntryRowDraft {
        StockEntryRowDraft {
            item_code: "_Test Item".into(),
            qty: dec!(5),
            s_warehouse: s.map(Into::into),
            t_warehouse: t.map(Into::into),
            basic_rate: dec!(100),
            is_finished_item: false,
            is_scrap_item: false,
            bom_id: None,
        }
    }

    #[test]
    fn finished_good_absorbs_costs_less_scrap() {
        assert_eq!(
            finished_good_rate(dec!(1000), dec!(200), dec!(100), dec!(10)),
            dec!(110)
        );
        assert_eq!(finished_good_rate(dec!(10), dec!(0), dec!(0), dec!(0)), dec!(0));
    }

    #[test]
    fn scrap_follows_bom_ratio() {
        assert_eq!(scrap_qty(dec!(2), dec!(1), dec!(1)), dec!(2));
        assert_eq!(scrap_qty(dec!(4), dec!(1), dec!(2)), dec!(2));
    }

    #[test]
    fn receipt_rows_need_target_only() {
        assert!(validate_rows(&receipt(vec![row(None, Some("_Test Warehouse - _TC"))])).is_ok());
        assert_matches!(
            validate_rows(&receipt(vec![row(Some("_Test Warehouse - _TC"), None)])),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            validate_rows(&receipt(vec![])),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn work_order_purpose_requires_work_order() {
        let mut draft = receipt(vec![row(Some("A"), Some("B"))]);
        draft.purpose = StockEntryPurpose::MaterialTransferForManufacture;
        draft.fg_completed_qty = dec!(1);
        assert_matches!(
            validate_rows(&draft),
            Err(ServiceError::ValidationError(msg)) if msg.contains("Work Order is required")
        );
    }
}
