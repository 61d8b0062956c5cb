pub mod bins;
pub mod common;
pub mod settings;
pub mod stock_entries;
pub mod timesheets;
pub mod work_orders;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::ManufacturingConfig;
use crate::events::EventSender;
use crate::services::{
    bins::BinService, boms::BomService, master_data::MasterDataService,
    sales_orders::SalesOrderService, settings::ManufacturingSettingsService,
    stock_entries::StockEntryService, timesheets::TimesheetService,
    work_orders::WorkOrderService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub settings: Arc<ManufacturingSettingsService>,
    pub master_data: Arc<MasterDataService>,
    pub boms: Arc<BomService>,
    pub bins: Arc<BinService>,
    pub sales_orders: Arc<SalesOrderService>,
    pub work_orders: Arc<WorkOrderService>,
    pub stock_entries: Arc<StockEntryService>,
    pub timesheets: Arc<TimesheetService>,
}

impl AppServices {
    /// Wires every service onto one connection pool and event channel.
    pub fn new(
        db: Arc<DatabaseConnection>,
        defaults: ManufacturingConfig,
        event_sender: Option<EventSender>,
    ) -> Self {
        let settings = Arc::new(ManufacturingSettingsService::new(
            db.clone(),
            defaults,
            event_sender.clone(),
        ));

        Self {
            master_data: Arc::new(MasterDataService::new(db.clone())),
            boms: Arc::new(BomService::new(db.clone())),
            bins: Arc::new(BinService::new(db.clone())),
            sales_orders: Arc::new(SalesOrderService::new(db.clone(), event_sender.clone())),
            work_orders: Arc::new(WorkOrderService::new(
                db.clone(),
                settings.clone(),
                event_sender.clone(),
            )),
            stock_entries: Arc::new(StockEntryService::new(
                db.clone(),
                settings.clone(),
                event_sender.clone(),
            )),
            timesheets: Arc::new(TimesheetService::new(db, event_sender)),
            settings,
        }
    }
}
