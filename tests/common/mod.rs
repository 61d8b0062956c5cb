#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use stateset_manufacturing::{
    build_router,
    config::{AppConfig, ManufacturingConfig},
    db,
    entities::{bin, StockEntryPurpose},
    events::{self, EventSender},
    services::{
        boms::{BomDetail, NewBom, NewBomItem, NewBomOperation, NewBomScrapItem},
        master_data::NewItem,
        stock_entries::StockEntryDetail,
        work_orders::{NewWorkOrderArgs, WorkOrderDetail},
    },
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const COMPANY: &str = "_Test Company";
pub const OTHER_COMPANY: &str = "_Test Company 1";

pub const STORES: &str = "_Test Warehouse - _TC";
pub const STORES_1: &str = "_Test Warehouse 1 - _TC";
pub const WIP: &str = "Work In Progress - _TC";
pub const FG: &str = "Finished Goods - _TC";
pub const SCRAP: &str = "Scrap - _TC";
pub const OTHER_COMPANY_STORES: &str = "_Test Warehouse - _TC1";

pub const FG_ITEM: &str = "_Test FG Item";
pub const FG_ITEM_WITH_OPERATIONS: &str = "_Test FG Item 2";
pub const FG_ITEM_WITH_SCRAP: &str = "_Test FG Item With Scrap";
pub const RAW_ITEM: &str = "_Test Item";
pub const RAW_ITEM_2: &str = "_Test Item Home Desktop 100";
pub const SCRAP_ITEM: &str = "_Test Scrap Item";
pub const TEMPLATE_ITEM: &str = "_Test Variant Item";
pub const VARIANT_ITEM: &str = "_Test Variant Item-S";

pub const WORKSTATION: &str = "_Test Workstation 1";
pub const OPERATION: &str = "_Test Operation 1";

/// Application state over a throwaway SQLite file, seeded with the standard
/// manufacturing fixtures.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(default_settings()).await
    }

    pub async fn with_settings(settings: ManufacturingConfig) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("manufacturing_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.manufacturing = settings;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = build_router(state.clone());

        let app = Self {
            router,
            state,
            _dir: dir,
            _event_task: event_task,
        };
        app.seed().await;
        app
    }

    async fn seed(&self) {
        let master = &self.state.services.master_data;

        for (name, company) in [
            (STORES, COMPANY),
            (STORES_1, COMPANY),
            (WIP, COMPANY),
            (FG, COMPANY),
            (SCRAP, COMPANY),
            (OTHER_COMPANY_STORES, OTHER_COMPANY),
        ] {
            master
                .create_warehouse(name, company)
                .await
                .expect("seed warehouse");
        }

        for code in [
            FG_ITEM,
            FG_ITEM_WITH_OPERATIONS,
            FG_ITEM_WITH_SCRAP,
            RAW_ITEM,
            RAW_ITEM_2,
            SCRAP_ITEM,
        ] {
            master
                .create_item(NewItem::stock(code))
                .await
                .expect("seed item");
        }

        let mut template = NewItem::stock(TEMPLATE_ITEM);
        template.has_variants = true;
        master.create_item(template).await.expect("seed template");

        let mut variant = NewItem::stock(VARIANT_ITEM);
        variant.variant_of = Some(TEMPLATE_ITEM.to_string());
        master.create_item(variant).await.expect("seed variant");

        master
            .create_workstation(WORKSTATION, dec!(100))
            .await
            .expect("seed workstation");

        // 1 FG = 5 x _Test Item + 2 x _Test Item Home Desktop 100
        self.create_bom(
            FG_ITEM,
            bom_rows(&[(RAW_ITEM, dec!(5), dec!(100)), (RAW_ITEM_2, dec!(2), dec!(50))]),
            vec![],
            vec![],
        )
        .await;
        self.create_bom(
            TEMPLATE_ITEM,
            bom_rows(&[(RAW_ITEM, dec!(1), dec!(100))]),
            vec![],
            vec![],
        )
        .await;
        self.create_bom(
            FG_ITEM_WITH_OPERATIONS,
            bom_rows(&[(RAW_ITEM, dec!(1), dec!(100))]),
            vec![NewBomOperation {
                operation: OPERATION.to_string(),
                workstation: WORKSTATION.to_string(),
                time_in_mins: dec!(60),
                hour_rate: None,
            }],
            vec![],
        )
        .await;
        self.create_bom(
            FG_ITEM_WITH_SCRAP,
            bom_rows(&[(RAW_ITEM, dec!(1), dec!(100))]),
            vec![],
            vec![NewBomScrapItem {
                item_code: SCRAP_ITEM.to_string(),
                stock_qty: dec!(0.5),
                rate: dec!(10),
            }],
        )
        .await;
    }

    pub async fn create_bom(
        &self,
        item: &str,
        items: Vec<NewBomItem>,
        operations: Vec<NewBomOperation>,
        scrap_items: Vec<NewBomScrapItem>,
    ) -> BomDetail {
        self.state
            .services
            .boms
            .create_bom(NewBom {
                item: item.to_string(),
                company: COMPANY.to_string(),
                quantity: dec!(1),
                is_default: true,
                items,
                operations,
                scrap_items,
            })
            .await
            .expect("seed bom")
    }

    /// Work order arguments drawing raw material from the default stores.
    pub fn work_order_args(&self, item: &str, qty: Decimal) -> NewWorkOrderArgs {
        let mut args = NewWorkOrderArgs::new(item, qty, COMPANY);
        args.source_warehouse = Some(STORES.to_string());
        args
    }

    pub async fn draft_work_order(&self, item: &str, qty: Decimal) -> WorkOrderDetail {
        let service = &self.state.services.work_orders;
        let draft = service
            .new_from_bom(self.work_order_args(item, qty))
            .await
            .expect("build work order");
        service.insert(draft).await.expect("insert work order")
    }

    pub async fn submitted_work_order(&self, item: &str, qty: Decimal) -> WorkOrderDetail {
        let created = self.draft_work_order(item, qty).await;
        self.state
            .services
            .work_orders
            .submit(created.work_order.id)
            .await
            .expect("submit work order")
    }

    pub async fn receive(&self, item: &str, warehouse: &str, qty: Decimal, rate: Decimal) {
        self.state
            .services
            .stock_entries
            .make_material_receipt(item, warehouse, qty, rate)
            .await
            .expect("material receipt");
    }

    /// Receives every raw material of the work order into its source warehouse.
    pub async fn stock_raw_materials(&self, work_order: &WorkOrderDetail) {
        for row in &work_order.required_items {
            self.receive(&row.item_code, &row.source_warehouse, dec!(100), row.rate)
                .await;
        }
    }

    pub async fn try_stock_entry(
        &self,
        work_order_id: i64,
        purpose: StockEntryPurpose,
        qty: Decimal,
    ) -> Result<StockEntryDetail, stateset_manufacturing::errors::ServiceError> {
        let service = &self.state.services.stock_entries;
        let draft = service
            .make_stock_entry(work_order_id, purpose, Some(qty))
            .await?;
        let saved = service.insert(draft).await?;
        service.submit(saved.stock_entry.id).await
    }

    pub async fn transfer(&self, work_order_id: i64, qty: Decimal) -> StockEntryDetail {
        self.try_stock_entry(
            work_order_id,
            StockEntryPurpose::MaterialTransferForManufacture,
            qty,
        )
        .await
        .expect("material transfer")
    }

    pub async fn manufacture(&self, work_order_id: i64, qty: Decimal) -> StockEntryDetail {
        self.try_stock_entry(work_order_id, StockEntryPurpose::Manufacture, qty)
            .await
            .expect("manufacture")
    }

    pub async fn bin(&self, item: &str, warehouse: &str) -> bin::Model {
        self.state
            .services
            .bins
            .get_bin(item, warehouse)
            .await
            .expect("load bin")
    }

    pub async fn work_order(&self, id: i64) -> WorkOrderDetail {
        self.state
            .services
            .work_orders
            .get(id)
            .await
            .expect("load work order")
    }

    /// Sends a JSON request through the full router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn default_settings() -> ManufacturingConfig {
    ManufacturingConfig {
        default_wip_warehouse: Some(WIP.to_string()),
        default_fg_warehouse: Some(FG.to_string()),
        default_scrap_warehouse: Some(SCRAP.to_string()),
        ..Default::default()
    }
}

pub fn bom_rows(rows: &[(&str, Decimal, Decimal)]) -> Vec<NewBomItem> {
    rows.iter()
        .map(|(item_code, qty, rate)| NewBomItem {
            item_code: item_code.to_string(),
            qty: *qty,
            rate: *rate,
            source_warehouse: None,
        })
        .collect()
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&body).expect("response is json")
}

/// Decimals travel as strings in JSON responses.
pub fn json_decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
