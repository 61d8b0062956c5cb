use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseConnection, EntityTrait,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::{validate_percentage, ManufacturingConfig},
    entities::manufacturing_settings::{self, Entity as SettingsEntity, SETTINGS_ROW_ID},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Partial update of the manufacturing settings row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateSettingsRequest {
    #[validate(custom = "validate_percentage")]
    pub overproduction_percentage_for_work_order: Option<Decimal>,
    #[validate(custom = "validate_percentage")]
    pub overproduction_percentage_for_sales_order: Option<Decimal>,
    pub allow_production_on_holidays: Option<bool>,
    pub default_wip_warehouse: Option<String>,
    pub default_fg_warehouse: Option<String>,
    pub default_scrap_warehouse: Option<String>,
}

#[derive(Clone)]
pub struct ManufacturingSettingsService {
    db: Arc<DatabaseConnection>,
    defaults: ManufacturingConfig,
    event_sender: Option<EventSender>,
}

impl ManufacturingSettingsService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        defaults: ManufacturingConfig,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            db,
            defaults,
            event_sender,
        }
    }

    /// Returns the settings row, seeding it from configuration on first use.
    #[instrument(skip(self))]
    pub async fn get(&self) -> Result<manufacturing_settings::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let settings = self.current(&txn).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(settings)
    }

    /// Reads the settings row through the caller's connection or transaction.
    pub(crate) async fn current<C>(
        &self,
        conn: &C,
    ) -> Result<manufacturing_settings::Model, ServiceError>
    where
        C: ConnectionTrait,
    {
        if let Some(settings) = SettingsEntity::find_by_id(SETTINGS_ROW_ID)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
        {
            return Ok(settings);
        }

        let seeded = manufacturing_settings::ActiveModel {
            id: Set(SETTINGS_ROW_ID),
            overproduction_percentage_for_work_order: Set(self
                .defaults
                .overproduction_percentage_for_work_order),
            overproduction_percentage_for_sales_order: Set(self
                .defaults
                .overproduction_percentage_for_sales_order),
            allow_production_on_holidays: Set(self.defaults.allow_production_on_holidays),
            default_wip_warehouse: Set(self.defaults.default_wip_warehouse.clone()),
            default_fg_warehouse: Set(self.defaults.default_fg_warehouse.clone()),
            default_scrap_warehouse: Set(self.defaults.default_scrap_warehouse.clone()),
            updated_at: Set(Utc::now()),
        };

        seeded.insert(conn).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        request: UpdateSettingsRequest,
    ) -> Result<manufacturing_settings::Model, ServiceError> {
        request.validate()?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let current = self.current(&txn).await?;

        let mut settings: manufacturing_settings::ActiveModel = current.into();
        if let Some(pct) = request.overproduction_percentage_for_work_order {
            settings.overproduction_percentage_for_work_order = Set(pct);
        }
        if let Some(pct) = request.overproduction_percentage_for_sales_order {
            settings.overproduction_percentage_for_sales_order = Set(pct);
        }
        if let Some(allow) = request.allow_production_on_holidays {
            settings.allow_production_on_holidays = Set(allow);
        }
        if let Some(wh) = request.default_wip_warehouse {
            settings.default_wip_warehouse = Set(Some(wh).filter(|w| !w.is_empty()));
        }
        if let Some(wh) = request.default_fg_warehouse {
            settings.default_fg_warehouse = Set(Some(wh).filter(|w| !w.is_empty()));
        }
        if let Some(wh) = request.default_scrap_warehouse {
            settings.default_scrap_warehouse = Set(Some(wh).filter(|w| !w.is_empty()));
        }
        settings.updated_at = Set(Utc::now());

        let updated = settings.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.settings.updated", 1);
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::ManufacturingSettingsUpdated)
                .await;
        }

        info!(
            wo_pct = %updated.overproduction_percentage_for_work_order,
            so_pct = %updated.overproduction_percentage_for_sales_order,
            "Manufacturing settings updated"
        );
        Ok(updated)
    }
}
