//! Operation time logging against work orders.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use stateset_manufacturing::{
    entities::{DocStatus, OperationStatus},
    errors::ServiceError,
    services::timesheets::{TimeLogDraft, TimesheetDetail, TimesheetDraft},
};

use common::*;

async fn draft_timesheet(app: &TestApp, work_order_id: i64) -> TimesheetDetail {
    let timesheets = &app.state.services.timesheets;
    let listed = timesheets
        .list_for_work_order(work_order_id)
        .await
        .expect("list timesheets");
    assert_eq!(listed.len(), 1, "expected exactly one timesheet");
    timesheets.get(listed[0].id).await.expect("load timesheet")
}

fn log_for(operation_id: i64, hours: rust_decimal::Decimal, completed: rust_decimal::Decimal) -> TimeLogDraft {
    let from_time = Utc::now();
    TimeLogDraft {
        operation_id: Some(operation_id),
        workstation: Some(WORKSTATION.to_string()),
        from_time,
        to_time: from_time + Duration::hours(1),
        hours,
        completed_qty: completed,
        costing_rate: dec!(100),
    }
}

#[tokio::test]
async fn submit_opens_draft_timesheet_for_operations() {
    let app = TestApp::new().await;
    let wo = app
        .submitted_work_order(FG_ITEM_WITH_OPERATIONS, dec!(2))
        .await;

    let ts = draft_timesheet(&app, wo.work_order.id).await;
    assert_eq!(ts.timesheet.docstatus, DocStatus::Draft.code());
    assert_eq!(ts.timesheet.total_hours, dec!(2));
    assert_eq!(ts.timesheet.total_costing_amount, dec!(200));

    assert_eq!(ts.time_logs.len(), 1);
    let log = &ts.time_logs[0];
    assert_eq!(log.operation_id, Some(wo.operations[0].id));
    assert_eq!(log.completed_qty, dec!(2));
    assert_eq!(log.hours, dec!(2));
    assert_eq!(log.to_time - log.from_time, Duration::minutes(120));
}

#[tokio::test]
async fn work_order_without_operations_gets_no_timesheet() {
    let app = TestApp::new().await;
    let wo = app.submitted_work_order(FG_ITEM, dec!(1)).await;

    let listed = app
        .state
        .services
        .timesheets
        .list_for_work_order(wo.work_order.id)
        .await
        .expect("list timesheets");
    assert!(listed.is_empty());
}

#[tokio::test]
async fn submitted_timesheet_completes_operations_and_costs_them() {
    let app = TestApp::new().await;
    let wo = app
        .submitted_work_order(FG_ITEM_WITH_OPERATIONS, dec!(2))
        .await;
    let id = wo.work_order.id;
    let ts = draft_timesheet(&app, id).await;

    app.state
        .services
        .timesheets
        .submit(ts.timesheet.id)
        .await
        .expect("submit timesheet");

    let updated = app.work_order(id).await;
    let op = &updated.operations[0];
    assert_eq!(op.completed_qty, dec!(2));
    assert_eq!(op.status, OperationStatus::Completed.to_string());
    assert_eq!(op.actual_operation_time, dec!(120));
    assert_eq!(op.actual_operating_cost, dec!(200));
    assert!(op.actual_start_time.is_some());
    assert_eq!(updated.work_order.actual_operating_cost, dec!(200));
    assert_eq!(updated.work_order.total_operating_cost, dec!(200));
}

#[tokio::test]
async fn partial_log_leaves_operation_in_progress() {
    let app = TestApp::new().await;
    let wo = app
        .submitted_work_order(FG_ITEM_WITH_OPERATIONS, dec!(2))
        .await;
    let id = wo.work_order.id;
    let timesheets = &app.state.services.timesheets;

    let partial = timesheets
        .insert(TimesheetDraft {
            company: COMPANY.to_string(),
            work_order_id: Some(id),
            time_logs: vec![log_for(wo.operations[0].id, dec!(1.5), dec!(1))],
        })
        .await
        .expect("insert partial timesheet");
    timesheets
        .submit(partial.timesheet.id)
        .await
        .expect("submit partial timesheet");

    let updated = app.work_order(id).await;
    assert_eq!(updated.operations[0].completed_qty, dec!(1));
    assert_eq!(
        updated.operations[0].status,
        OperationStatus::WorkInProgress.to_string()
    );
    // Actual cost replaces the planned figure once logged.
    assert_eq!(updated.work_order.total_operating_cost, dec!(150));

    // The draft opened on submit still logs the full 2 units.
    let auto = timesheets
        .list_for_work_order(id)
        .await
        .expect("list timesheets")
        .into_iter()
        .find(|ts| ts.docstatus == DocStatus::Draft.code())
        .expect("draft timesheet");
    assert_matches!(
        timesheets.submit(auto.id).await,
        Err(ServiceError::OverProductionLogged(_))
    );
}

#[tokio::test]
async fn logging_more_than_work_order_qty_is_rejected() {
    let app = TestApp::new().await;
    let wo = app
        .submitted_work_order(FG_ITEM_WITH_OPERATIONS, dec!(2))
        .await;
    let timesheets = &app.state.services.timesheets;

    let excessive = timesheets
        .insert(TimesheetDraft {
            company: COMPANY.to_string(),
            work_order_id: Some(wo.work_order.id),
            time_logs: vec![log_for(wo.operations[0].id, dec!(3), dec!(3))],
        })
        .await
        .expect("insert timesheet");

    let err = timesheets.submit(excessive.timesheet.id).await.unwrap_err();
    assert!(err.is_over_production());
    assert_matches!(err, ServiceError::OverProductionLogged(ref msg) if msg.contains(OPERATION));

    let unchanged = app.work_order(wo.work_order.id).await;
    assert_eq!(unchanged.operations[0].completed_qty, dec!(0));
}

#[tokio::test]
async fn nothing_to_log_once_operations_are_complete() {
    let app = TestApp::new().await;
    let wo = app
        .submitted_work_order(FG_ITEM_WITH_OPERATIONS, dec!(1))
        .await;
    let id = wo.work_order.id;
    let timesheets = &app.state.services.timesheets;
    let ts = draft_timesheet(&app, id).await;
    timesheets.submit(ts.timesheet.id).await.expect("submit");

    let draft = timesheets
        .make_timesheet(id, None)
        .await
        .expect("make timesheet");
    assert!(draft.time_logs.is_empty());
    assert_matches!(
        timesheets.insert(draft).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn cancel_reverts_operation_progress() {
    let app = TestApp::new().await;
    let wo = app
        .submitted_work_order(FG_ITEM_WITH_OPERATIONS, dec!(2))
        .await;
    let id = wo.work_order.id;
    let timesheets = &app.state.services.timesheets;
    let ts = draft_timesheet(&app, id).await;
    timesheets.submit(ts.timesheet.id).await.expect("submit");

    let cancelled = timesheets.cancel(ts.timesheet.id).await.expect("cancel");
    assert_eq!(cancelled.timesheet.docstatus, DocStatus::Cancelled.code());

    let reverted = app.work_order(id).await;
    let op = &reverted.operations[0];
    assert_eq!(op.completed_qty, dec!(0));
    assert_eq!(op.status, OperationStatus::Pending.to_string());
    assert!(op.actual_start_time.is_none());
    assert_eq!(reverted.work_order.actual_operating_cost, dec!(0));
    assert_eq!(reverted.work_order.total_operating_cost, dec!(200));

    assert_matches!(
        timesheets.cancel(ts.timesheet.id).await,
        Err(ServiceError::InvalidOperation(_))
    );
}

#[tokio::test]
async fn draft_work_order_cannot_be_timed() {
    let app = TestApp::new().await;
    let wo = app
        .draft_work_order(FG_ITEM_WITH_OPERATIONS, dec!(1))
        .await;

    assert_matches!(
        app.state
            .services
            .timesheets
            .make_timesheet(wo.work_order.id, None)
            .await,
        Err(ServiceError::InvalidOperation(_))
    );
}

#[tokio::test]
async fn time_logs_are_validated() {
    let app = TestApp::new().await;
    let wo = app
        .submitted_work_order(FG_ITEM_WITH_OPERATIONS, dec!(1))
        .await;
    let timesheets = &app.state.services.timesheets;

    let mut backwards = log_for(wo.operations[0].id, dec!(1), dec!(1));
    backwards.to_time = backwards.from_time - Duration::minutes(5);
    assert_matches!(
        timesheets
            .insert(TimesheetDraft {
                company: COMPANY.to_string(),
                work_order_id: Some(wo.work_order.id),
                time_logs: vec![backwards],
            })
            .await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("To Time")
    );

    assert_matches!(
        timesheets
            .insert(TimesheetDraft {
                company: COMPANY.to_string(),
                work_order_id: Some(wo.work_order.id),
                time_logs: vec![log_for(wo.operations[0].id + 100, dec!(1), dec!(1))],
            })
            .await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("does not belong")
    );
}
