//! Material transfer and manufacture entries raised from work orders.

mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use stateset_manufacturing::{
    config::ManufacturingConfig,
    entities::{DocStatus, StockEntryPurpose, WorkOrderStatus},
    errors::ServiceError,
};

use common::*;

#[tokio::test]
async fn transfer_moves_material_into_wip_and_releases_reservation() {
    let app = TestApp::new().await;
    let wo = app.submitted_work_order(FG_ITEM, dec!(2)).await;
    let id = wo.work_order.id;
    app.stock_raw_materials(&wo).await;

    let entry = app.transfer(id, dec!(1)).await;
    assert_eq!(entry.stock_entry.docstatus, DocStatus::Submitted.code());
    assert_eq!(entry.stock_entry.to_warehouse.as_deref(), Some(WIP));

    let stores = app.bin(RAW_ITEM, STORES).await;
    assert_eq!(stores.actual_qty, dec!(95));
    assert_eq!(stores.reserved_qty_for_production, dec!(5));
    assert_eq!(app.bin(RAW_ITEM, WIP).await.actual_qty, dec!(5));
    assert_eq!(app.bin(RAW_ITEM, WIP).await.valuation_rate, dec!(100));

    let progressed = app.work_order(id).await;
    assert_eq!(
        progressed.work_order.material_transferred_for_manufacturing,
        dec!(1)
    );
    assert_eq!(
        progressed.work_order.status,
        WorkOrderStatus::InProcess.to_string()
    );
    assert!(progressed.work_order.actual_start_date.is_some());
    assert_eq!(progressed.required_items[0].transferred_qty, dec!(5));

    app.transfer(id, dec!(1)).await;
    assert_eq!(
        app.bin(RAW_ITEM, STORES).await.reserved_qty_for_production,
        dec!(0)
    );
    assert_eq!(
        app.bin(RAW_ITEM_2, STORES).await.reserved_qty_for_production,
        dec!(0)
    );
}

#[tokio::test]
async fn default_qty_is_what_remains_to_transfer() {
    let app = TestApp::new().await;
    let wo = app.submitted_work_order(FG_ITEM, dec!(3)).await;
    let id = wo.work_order.id;
    app.stock_raw_materials(&wo).await;
    app.transfer(id, dec!(1)).await;

    let service = &app.state.services.stock_entries;
    let draft = service
        .make_stock_entry(id, StockEntryPurpose::MaterialTransferForManufacture, None)
        .await
        .expect("make transfer");
    assert_eq!(draft.fg_completed_qty, dec!(2));
    assert_eq!(draft.items[0].qty, dec!(10));

    app.transfer(id, dec!(2)).await;
    assert_matches!(
        service
            .make_stock_entry(id, StockEntryPurpose::MaterialTransferForManufacture, None)
            .await,
        Err(ServiceError::InvalidOperation(msg)) if msg.contains("Nothing left")
    );
}

#[tokio::test]
async fn manufacture_completes_order_and_values_finished_good() {
    let app = TestApp::new().await;
    let wo = app.submitted_work_order(FG_ITEM, dec!(2)).await;
    let id = wo.work_order.id;
    app.stock_raw_materials(&wo).await;
    app.transfer(id, dec!(2)).await;

    let entry = app.manufacture(id, dec!(2)).await;

    // (10 x 100 + 4 x 50) / 2
    let finished = entry
        .items
        .iter()
        .find(|row| row.is_finished_item)
        .expect("finished good row");
    assert_eq!(finished.basic_rate, dec!(600));
    assert_eq!(entry.stock_entry.total_outgoing_value, dec!(1200));
    assert_eq!(entry.stock_entry.total_incoming_value, dec!(1200));

    let fg_bin = app.bin(FG_ITEM, FG).await;
    assert_eq!(fg_bin.actual_qty, dec!(2));
    assert_eq!(fg_bin.valuation_rate, dec!(600));
    assert_eq!(fg_bin.planned_qty, dec!(0));
    assert_eq!(app.bin(RAW_ITEM, WIP).await.actual_qty, dec!(0));

    let done = app.work_order(id).await;
    assert_eq!(done.work_order.produced_qty, dec!(2));
    assert_eq!(done.work_order.status, WorkOrderStatus::Completed.to_string());
    assert!(done.work_order.actual_end_date.is_some());
    assert_eq!(done.required_items[0].consumed_qty, dec!(10));
    assert_eq!(done.required_items[1].consumed_qty, dec!(4));
}

#[tokio::test]
async fn partial_manufacture_lowers_planned_qty_by_produced() {
    let app = TestApp::new().await;
    let baseline = app.bin(FG_ITEM, FG).await;
    let wo = app.submitted_work_order(FG_ITEM, dec!(10)).await;
    let id = wo.work_order.id;
    app.stock_raw_materials(&wo).await;
    assert_eq!(
        app.bin(FG_ITEM, FG).await.planned_qty,
        baseline.planned_qty + dec!(10)
    );

    app.transfer(id, dec!(4)).await;
    app.manufacture(id, dec!(4)).await;

    let fg_bin = app.bin(FG_ITEM, FG).await;
    assert_eq!(fg_bin.planned_qty, baseline.planned_qty + dec!(6));
    assert_eq!(fg_bin.actual_qty, baseline.actual_qty + dec!(4));
    assert_eq!(fg_bin.projected_qty, fg_bin.expected_projected_qty());

    let progressed = app.work_order(id).await;
    assert_eq!(progressed.work_order.produced_qty, dec!(4));
    assert_eq!(
        progressed.work_order.status,
        WorkOrderStatus::InProcess.to_string()
    );
}

#[tokio::test]
async fn manufacture_beyond_work_order_qty_is_rejected() {
    let app = TestApp::new().await;
    let wo = app.submitted_work_order(FG_ITEM, dec!(2)).await;
    let id = wo.work_order.id;
    app.stock_raw_materials(&wo).await;
    app.transfer(id, dec!(2)).await;

    let err = app
        .try_stock_entry(id, StockEntryPurpose::Manufacture, dec!(3))
        .await
        .unwrap_err();
    assert!(err.is_over_production());
    assert_matches!(err, ServiceError::StockOverProduction(ref msg) if msg.contains("planned quantity"));

    let unchanged = app.work_order(id).await;
    assert_eq!(unchanged.work_order.produced_qty, dec!(0));
    assert_eq!(app.bin(FG_ITEM, FG).await.actual_qty, dec!(0));
}

#[tokio::test]
async fn over_production_allowance_raises_the_limit() {
    let app = TestApp::with_settings(ManufacturingConfig {
        overproduction_percentage_for_work_order: dec!(50),
        ..default_settings()
    })
    .await;
    let wo = app.submitted_work_order(FG_ITEM, dec!(2)).await;
    let id = wo.work_order.id;
    app.stock_raw_materials(&wo).await;

    app.transfer(id, dec!(3)).await;
    app.manufacture(id, dec!(3)).await;

    let done = app.work_order(id).await;
    assert_eq!(done.work_order.produced_qty, dec!(3));
    assert_eq!(done.work_order.status, WorkOrderStatus::Completed.to_string());

    assert_matches!(
        app.try_stock_entry(id, StockEntryPurpose::MaterialTransferForManufacture, dec!(1))
            .await,
        Err(ServiceError::StockOverProduction(_))
    );
}

#[tokio::test]
async fn cancelling_manufacture_restores_stock_and_progress() {
    let app = TestApp::new().await;
    let wo = app.submitted_work_order(FG_ITEM, dec!(2)).await;
    let id = wo.work_order.id;
    app.stock_raw_materials(&wo).await;
    app.transfer(id, dec!(2)).await;
    let entry = app.manufacture(id, dec!(2)).await;

    let cancelled = app
        .state
        .services
        .stock_entries
        .cancel(entry.stock_entry.id)
        .await
        .expect("cancel manufacture");
    assert_eq!(cancelled.stock_entry.docstatus, DocStatus::Cancelled.code());

    assert_eq!(app.bin(FG_ITEM, FG).await.actual_qty, dec!(0));
    assert_eq!(app.bin(FG_ITEM, FG).await.planned_qty, dec!(2));
    assert_eq!(app.bin(RAW_ITEM, WIP).await.actual_qty, dec!(10));

    let reopened = app.work_order(id).await;
    assert_eq!(reopened.work_order.produced_qty, dec!(0));
    assert_eq!(
        reopened.work_order.status,
        WorkOrderStatus::InProcess.to_string()
    );
    assert!(reopened.work_order.actual_end_date.is_none());
    assert_eq!(reopened.required_items[0].consumed_qty, dec!(0));
}

#[tokio::test]
async fn cancelling_transfer_restores_reservation() {
    let app = TestApp::new().await;
    let wo = app.submitted_work_order(FG_ITEM, dec!(2)).await;
    let id = wo.work_order.id;
    app.stock_raw_materials(&wo).await;
    let entry = app.transfer(id, dec!(2)).await;
    assert_eq!(
        app.bin(RAW_ITEM, STORES).await.reserved_qty_for_production,
        dec!(0)
    );

    app.state
        .services
        .stock_entries
        .cancel(entry.stock_entry.id)
        .await
        .expect("cancel transfer");

    let stores = app.bin(RAW_ITEM, STORES).await;
    assert_eq!(stores.reserved_qty_for_production, dec!(10));
    assert_eq!(stores.actual_qty, dec!(100));
    assert_eq!(
        app.work_order(id).await.work_order.status,
        WorkOrderStatus::NotStarted.to_string()
    );
}

#[tokio::test]
async fn scrap_is_received_and_lowers_finished_good_rate() {
    let app = TestApp::new().await;
    let service = &app.state.services.work_orders;

    let mut args = app.work_order_args(FG_ITEM_WITH_SCRAP, dec!(4));
    args.skip_transfer = true;
    let created = service
        .insert(service.new_from_bom(args).await.expect("draft"))
        .await
        .expect("insert");
    let wo = service.submit(created.work_order.id).await.expect("submit");
    let id = wo.work_order.id;
    app.stock_raw_materials(&wo).await;
    assert_eq!(
        app.bin(RAW_ITEM, STORES).await.reserved_qty_for_production,
        dec!(4)
    );

    let entry = app.manufacture(id, dec!(4)).await;

    // 4 finished goods x 0.5 scrap per BOM unit
    let scrap = entry
        .items
        .iter()
        .find(|row| row.is_scrap_item)
        .expect("scrap row");
    assert_eq!(scrap.item_code, SCRAP_ITEM);
    assert_eq!(scrap.qty, dec!(2));
    assert_eq!(scrap.t_warehouse.as_deref(), Some(SCRAP));
    assert_eq!(app.bin(SCRAP_ITEM, SCRAP).await.actual_qty, dec!(2));

    // (4 x 100 - 2 x 10) / 4
    let finished = entry
        .items
        .iter()
        .find(|row| row.is_finished_item)
        .expect("finished good row");
    assert_eq!(finished.basic_rate, dec!(95));

    // Skipping the transfer consumes straight from the source warehouse.
    assert_eq!(app.bin(RAW_ITEM, STORES).await.actual_qty, dec!(96));
    assert_eq!(
        app.bin(RAW_ITEM, STORES).await.reserved_qty_for_production,
        dec!(0)
    );
}

#[tokio::test]
async fn partial_manufacture_posts_scrap_for_its_own_qty() {
    let app = TestApp::new().await;
    let service = &app.state.services.work_orders;

    let mut args = app.work_order_args(FG_ITEM_WITH_SCRAP, dec!(4));
    args.skip_transfer = true;
    let created = service
        .insert(service.new_from_bom(args).await.expect("draft"))
        .await
        .expect("insert");
    let wo = service.submit(created.work_order.id).await.expect("submit");
    app.stock_raw_materials(&wo).await;

    let entry = app.manufacture(wo.work_order.id, dec!(1)).await;
    let scrap = entry
        .items
        .iter()
        .find(|row| row.is_scrap_item)
        .expect("scrap row");
    assert_eq!(scrap.qty, dec!(0.5));
    assert_eq!(app.bin(SCRAP_ITEM, SCRAP).await.actual_qty, dec!(0.5));
}

#[tokio::test]
async fn manufacture_requires_completed_operations() {
    let app = TestApp::new().await;
    let wo = app
        .submitted_work_order(FG_ITEM_WITH_OPERATIONS, dec!(2))
        .await;
    let id = wo.work_order.id;
    app.stock_raw_materials(&wo).await;
    app.transfer(id, dec!(2)).await;

    assert_matches!(
        app.try_stock_entry(id, StockEntryPurpose::Manufacture, dec!(2))
            .await,
        Err(ServiceError::OperationsNotComplete(msg)) if msg.contains(OPERATION)
    );

    let timesheets = &app.state.services.timesheets;
    let draft = timesheets
        .list_for_work_order(id)
        .await
        .expect("list timesheets")
        .into_iter()
        .next()
        .expect("draft timesheet created on submit");
    timesheets.submit(draft.id).await.expect("submit timesheet");

    let entry = app.manufacture(id, dec!(2)).await;

    // (2 x 100 material + 200 operating cost) / 2
    let finished = entry
        .items
        .iter()
        .find(|row| row.is_finished_item)
        .expect("finished good row");
    assert_eq!(entry.stock_entry.total_additional_costs, dec!(200));
    assert_eq!(finished.basic_rate, dec!(200));
}

#[tokio::test]
async fn missing_stock_rolls_back_the_entry() {
    let app = TestApp::new().await;
    let wo = app.submitted_work_order(FG_ITEM, dec!(1)).await;
    let id = wo.work_order.id;

    assert_matches!(
        app.try_stock_entry(id, StockEntryPurpose::MaterialTransferForManufacture, dec!(1))
            .await,
        Err(ServiceError::InsufficientStock(msg)) if msg.contains(RAW_ITEM)
    );

    let unchanged = app.work_order(id).await;
    assert_eq!(
        unchanged.work_order.material_transferred_for_manufacturing,
        dec!(0)
    );
    assert_eq!(app.bin(RAW_ITEM, WIP).await.actual_qty, dec!(0));
    assert_eq!(
        app.bin(RAW_ITEM, STORES).await.reserved_qty_for_production,
        dec!(5)
    );
}

#[tokio::test]
async fn receipts_blend_into_moving_average() {
    let app = TestApp::new().await;

    app.receive(RAW_ITEM, STORES_1, dec!(10), dec!(100)).await;
    app.receive(RAW_ITEM, STORES_1, dec!(10), dec!(200)).await;

    let stores = app.bin(RAW_ITEM, STORES_1).await;
    assert_eq!(stores.actual_qty, dec!(20));
    assert_eq!(stores.valuation_rate, dec!(150));
    assert_eq!(stores.stock_value, dec!(3000));
}

#[tokio::test]
async fn entries_follow_document_lifecycle() {
    let app = TestApp::new().await;
    let wo = app.submitted_work_order(FG_ITEM, dec!(1)).await;
    app.stock_raw_materials(&wo).await;
    let service = &app.state.services.stock_entries;

    let draft = service
        .make_stock_entry(
            wo.work_order.id,
            StockEntryPurpose::MaterialTransferForManufacture,
            None,
        )
        .await
        .expect("make transfer");
    let saved = service.insert(draft).await.expect("insert");
    let entry_id = saved.stock_entry.id;

    assert_matches!(
        service.cancel(entry_id).await,
        Err(ServiceError::InvalidOperation(_))
    );
    service.submit(entry_id).await.expect("submit");
    assert_matches!(
        service.submit(entry_id).await,
        Err(ServiceError::InvalidOperation(_))
    );
    assert_eq!(
        service.get(entry_id).await.expect("get").stock_entry.docstatus,
        DocStatus::Submitted.code()
    );
}

#[tokio::test]
async fn receipt_into_unknown_warehouse_fails() {
    let app = TestApp::new().await;

    assert_matches!(
        app.state
            .services
            .stock_entries
            .make_material_receipt(RAW_ITEM, "_Test Warehouse 2 - _TC", dec!(1), dec!(1))
            .await,
        Err(ServiceError::ValidationError(_))
    );
}
