use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    entities::{timesheet, timesheet_detail, work_order, work_order_operation, DocStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        round,
        work_orders::{load_detail, load_work_order, update_operations_from_timesheets},
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimeLogDraft {
    pub operation_id: Option<i64>,
    pub workstation: Option<String>,
    pub from_time: DateTime<Utc>,
    pub to_time: DateTime<Utc>,
    pub hours: Decimal,
    pub completed_qty: Decimal,
    pub costing_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimesheetDraft {
    pub company: String,
    pub work_order_id: Option<i64>,
    pub time_logs: Vec<TimeLogDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimesheetDetail {
    #[serde(flatten)]
    pub timesheet: timesheet::Model,
    pub time_logs: Vec<timesheet_detail::Model>,
}

/// One log per operation that still has quantity to complete, laid end to end
/// from the work order's planned start.
pub fn time_logs_for_operations(
    wo: &work_order::Model,
    operations: &[work_order_operation::Model],
) -> Vec<TimeLogDraft> {
    let mut from_time = wo.planned_start_date;
    let mut logs = Vec::new();

    for op in operations.iter().filter(|op| op.completed_qty < wo.qty) {
        let seconds = (op.time_in_mins * Decimal::from(60))
            .round()
            .to_i64()
            .unwrap_or_default();
        let to_time = from_time + Duration::seconds(seconds);

        logs.push(TimeLogDraft {
            operation_id: Some(op.id),
            workstation: Some(op.workstation.clone()),
            from_time,
            to_time,
            hours: round(op.time_in_mins / Decimal::from(60)),
            completed_qty: wo.qty - op.completed_qty,
            costing_rate: op.hour_rate,
        });
        from_time = to_time;
    }

    logs
}

#[derive(Clone)]
pub struct TimesheetService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl TimesheetService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Builds an unsaved timesheet for the operations still pending on a work order.
    #[instrument(skip(self))]
    pub async fn make_timesheet(
        &self,
        work_order_id: i64,
        company: Option<String>,
    ) -> Result<TimesheetDraft, ServiceError> {
        let detail = load_detail(&*self.db, work_order_id).await?;
        if detail.work_order.doc_status() != Some(DocStatus::Submitted) {
            return Err(ServiceError::InvalidOperation(format!(
                "Work Order {} must be submitted",
                work_order_id
            )));
        }

        Ok(TimesheetDraft {
            company: company.unwrap_or_else(|| detail.work_order.company.clone()),
            work_order_id: Some(work_order_id),
            time_logs: time_logs_for_operations(&detail.work_order, &detail.operations),
        })
    }

    #[instrument(skip(self, draft), fields(work_order_id = ?draft.work_order_id))]
    pub async fn insert(&self, draft: TimesheetDraft) -> Result<TimesheetDetail, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let detail = persist(&txn, &draft).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.timesheets.created", 1);
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::TimesheetCreated {
                    timesheet_id: detail.timesheet.id,
                    work_order_id: detail.timesheet.work_order_id,
                })
                .await;
        }
        Ok(detail)
    }

    /// Submits the timesheet and rolls its logs into the work order operations.
    #[instrument(skip(self))]
    pub async fn submit(&self, timesheet_id: i64) -> Result<TimesheetDetail, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let detail = load_timesheet(&txn, timesheet_id).await?;

        if detail.timesheet.doc_status() != Some(DocStatus::Draft) {
            return Err(ServiceError::InvalidOperation(format!(
                "Timesheet {} is not a draft and cannot be submitted",
                timesheet_id
            )));
        }

        if let Some(wo_id) = detail.timesheet.work_order_id {
            let wo = load_work_order(&txn, wo_id).await?;
            if wo.doc_status() != Some(DocStatus::Submitted) {
                return Err(ServiceError::InvalidOperation(format!(
                    "Work Order {} must be submitted",
                    wo_id
                )));
            }
            check_logged_qty(&txn, &wo, &detail.time_logs).await?;
        }

        let mut header: timesheet::ActiveModel = detail.timesheet.clone().into();
        header.docstatus = Set(DocStatus::Submitted.code());
        let header = header.update(&txn).await.map_err(ServiceError::db_error)?;

        if let Some(wo_id) = header.work_order_id {
            update_operations_from_timesheets(&txn, wo_id).await?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.timesheets.submitted", 1);
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::TimesheetSubmitted {
                    timesheet_id,
                    work_order_id: header.work_order_id,
                })
                .await;
        }
        info!(timesheet_id, hours = %header.total_hours, "Timesheet submitted");

        Ok(TimesheetDetail {
            timesheet: header,
            time_logs: detail.time_logs,
        })
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, timesheet_id: i64) -> Result<TimesheetDetail, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let detail = load_timesheet(&txn, timesheet_id).await?;

        if detail.timesheet.doc_status() != Some(DocStatus::Submitted) {
            return Err(ServiceError::InvalidOperation(format!(
                "Timesheet {} is not submitted and cannot be cancelled",
                timesheet_id
            )));
        }

        let mut header: timesheet::ActiveModel = detail.timesheet.clone().into();
        header.docstatus = Set(DocStatus::Cancelled.code());
        let header = header.update(&txn).await.map_err(ServiceError::db_error)?;

        if let Some(wo_id) = header.work_order_id {
            update_operations_from_timesheets(&txn, wo_id).await?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.timesheets.cancelled", 1);
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::TimesheetCancelled {
                    timesheet_id,
                    work_order_id: header.work_order_id,
                })
                .await;
        }
        info!(timesheet_id, "Timesheet cancelled");

        Ok(TimesheetDetail {
            timesheet: header,
            time_logs: detail.time_logs,
        })
    }

    pub async fn get(&self, timesheet_id: i64) -> Result<TimesheetDetail, ServiceError> {
        load_timesheet(&*self.db, timesheet_id).await
    }

    /// Timesheets raised against a work order, oldest first.
    pub async fn list_for_work_order(
        &self,
        work_order_id: i64,
    ) -> Result<Vec<timesheet::Model>, ServiceError> {
        timesheet::Entity::find()
            .filter(timesheet::Column::WorkOrderId.eq(work_order_id))
            .order_by_asc(timesheet::Column::Id)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}

/// Logged quantity per operation may not push it past the work order qty.
async fn check_logged_qty<C>(
    conn: &C,
    wo: &work_order::Model,
    logs: &[timesheet_detail::Model],
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let mut per_operation: HashMap<i64, Decimal> = HashMap::new();
    for log in logs {
        if let Some(op_id) = log.operation_id {
            *per_operation.entry(op_id).or_default() += log.completed_qty;
        }
    }

    for (op_id, logged) in per_operation {
        let op = work_order_operation::Entity::find_by_id(op_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Work Order Operation {}", op_id)))?;

        if op.completed_qty + logged > wo.qty {
            warn!(
                work_order_id = wo.id,
                operation = %op.operation,
                "Logged quantity exceeds work order quantity"
            );
            return Err(ServiceError::OverProductionLogged(format!(
                "Row {}: Completed Qty cannot be more than {} for operation {}",
                op.idx,
                wo.qty - op.completed_qty,
                op.operation
            )));
        }
    }

    Ok(())
}

async fn persist<C>(conn: &C, draft: &TimesheetDraft) -> Result<TimesheetDetail, ServiceError>
where
    C: ConnectionTrait,
{
    if draft.time_logs.is_empty() {
        return Err(ServiceError::ValidationError(
            "Timesheet must have at least one time log".to_string(),
        ));
    }

    let operations = match draft.work_order_id {
        Some(wo_id) => load_detail(conn, wo_id).await?.operations,
        None => Vec::new(),
    };

    for (idx, log) in draft.time_logs.iter().enumerate() {
        if log.to_time < log.from_time {
            return Err(ServiceError::ValidationError(format!(
                "Row {}: To Time cannot be before From Time",
                idx + 1
            )));
        }
        if log.hours < Decimal::ZERO || log.completed_qty < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!(
                "Row {}: hours and completed qty cannot be negative",
                idx + 1
            )));
        }
        if let Some(op_id) = log.operation_id {
            if !operations.iter().any(|op| op.id == op_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Row {}: operation {} does not belong to the Work Order",
                    idx + 1,
                    op_id
                )));
            }
        }
    }

    let total_hours: Decimal = draft.time_logs.iter().map(|l| l.hours).sum();
    let total_costing_amount: Decimal = draft
        .time_logs
        .iter()
        .map(|l| round(l.hours * l.costing_rate))
        .sum();

    let header = timesheet::ActiveModel {
        company: Set(draft.company.clone()),
        work_order_id: Set(draft.work_order_id),
        docstatus: Set(DocStatus::Draft.code()),
        total_hours: Set(round(total_hours)),
        total_costing_amount: Set(round(total_costing_amount)),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;

    let mut time_logs = Vec::with_capacity(draft.time_logs.len());
    for (idx, log) in draft.time_logs.iter().enumerate() {
        let created = timesheet_detail::ActiveModel {
            timesheet_id: Set(header.id),
            idx: Set(idx as i32 + 1),
            operation_id: Set(log.operation_id),
            workstation: Set(log.workstation.clone()),
            from_time: Set(log.from_time),
            to_time: Set(log.to_time),
            hours: Set(log.hours),
            completed_qty: Set(log.completed_qty),
            costing_rate: Set(log.costing_rate),
            costing_amount: Set(round(log.hours * log.costing_rate)),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;
        time_logs.push(created);
    }

    Ok(TimesheetDetail {
        timesheet: header,
        time_logs,
    })
}

async fn load_timesheet<C>(conn: &C, timesheet_id: i64) -> Result<TimesheetDetail, ServiceError>
where
    C: ConnectionTrait,
{
    let timesheet = timesheet::Entity::find_by_id(timesheet_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Timesheet {}", timesheet_id)))?;

    let time_logs = timesheet_detail::Entity::find()
        .filter(timesheet_detail::Column::TimesheetId.eq(timesheet_id))
        .order_by_asc(timesheet_detail::Column::Idx)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(TimesheetDetail {
        timesheet,
        time_logs,
    })
}

/// Opens a draft timesheet when a work order with operations is submitted.
pub(crate) async fn create_draft_for_work_order<C>(
    conn: &C,
    wo: &work_order::Model,
    operations: &[work_order_operation::Model],
) -> Result<Option<timesheet::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let time_logs = time_logs_for_operations(wo, operations);
    if time_logs.is_empty() {
        return Ok(None);
    }

    let draft = TimesheetDraft {
        company: wo.company.clone(),
        work_order_id: Some(wo.id),
        time_logs,
    };
    Ok(Some(persist(conn, &draft).await?.timesheet))
}

pub(crate) async fn delete_drafts_for_work_order<C>(
    conn: &C,
    work_order_id: i64,
) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    let drafts: Vec<i64> = timesheet::Entity::find()
        .filter(timesheet::Column::WorkOrderId.eq(work_order_id))
        .filter(timesheet::Column::Docstatus.eq(DocStatus::Draft.code()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|ts| ts.id)
        .collect();

    if drafts.is_empty() {
        return Ok(0);
    }

    timesheet_detail::Entity::delete_many()
        .filter(timesheet_detail::Column::TimesheetId.is_in(drafts.clone()))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let removed = timesheet::Entity::delete_many()
        .filter(timesheet::Column::Id.is_in(drafts))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(removed.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn work_order(qty: Decimal) -> work_order::Model {
        let now = Utc::now();
        work_order::Model {
            id: 7,
            production_item: "_Test FG Item 2".into(),
            company: "_Test Company".into(),
            qty,
            bom_id: 1,
            sales_order_id: None,
            sales_order_item_id: None,
            source_warehouse: None,
            wip_warehouse: Some("Work In Progress - _TC".into()),
            fg_warehouse: "_Test Warehouse 1 - _TC".into(),
            scrap_warehouse: None,
            skip_transfer: false,
            produced_qty: Decimal::ZERO,
            material_transferred_for_manufacturing: Decimal::ZERO,
            status: "Not Started".into(),
            docstatus: 1,
            planned_start_date: now,
            actual_start_date: None,
            actual_end_date: None,
            planned_operating_cost: Decimal::ZERO,
            actual_operating_cost: Decimal::ZERO,
            additional_operating_cost: Decimal::ZERO,
            total_operating_cost: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    fn operation(id: i64, time_in_mins: Decimal, completed_qty: Decimal) -> work_order_operation::Model {
        work_order_operation::Model {
            id,
            work_order_id: 7,
            idx: id as i32,
            operation: format!("_Test Operation {}", id),
            workstation: "_Test Workstation 1".into(),
            time_in_mins,
            hour_rate: dec!(100),
            planned_operating_cost: Decimal::ZERO,
            completed_qty,
            status: "Pending".into(),
            actual_operation_time: Decimal::ZERO,
            actual_operating_cost: Decimal::ZERO,
            actual_start_time: None,
            actual_end_time: None,
        }
    }

    #[test]
    fn logs_run_back_to_back() {
        let wo = work_order(dec!(1));
        let ops = vec![operation(1, dec!(60), dec!(0)), operation(2, dec!(30), dec!(0))];
        let logs = time_logs_for_operations(&wo, &ops);

        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].hours, dec!(1));
        assert_eq!(logs[0].to_time, logs[1].from_time);
        assert_eq!(logs[1].to_time - logs[1].from_time, Duration::minutes(30));
        assert_eq!(logs[1].costing_rate, dec!(100));
    }

    #[test]
    fn completed_operations_are_skipped() {
        let wo = work_order(dec!(2));
        let ops = vec![operation(1, dec!(60), dec!(2)), operation(2, dec!(60), dec!(1))];
        let logs = time_logs_for_operations(&wo, &ops);

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].operation_id, Some(2));
        assert_eq!(logs[0].completed_qty, dec!(1));
    }
}
