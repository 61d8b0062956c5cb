use chrono::{NaiveDate, Utc};
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
    entities::{item, warehouse, workstation},
    errors::ServiceError,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewItem {
    #[validate(length(min = 1, max = 140))]
    pub item_code: String,
    pub item_name: Option<String>,
    pub stock_uom: Option<String>,
    #[serde(default = "default_true")]
    pub is_stock_item: bool,
    #[serde(default)]
    pub has_variants: bool,
    pub variant_of: Option<String>,
    pub end_of_life: Option<NaiveDate>,
    #[serde(default)]
    pub valuation_rate: Decimal,
}

impl NewItem {
    pub fn stock(item_code: impl Into<String>) -> Self {
        Self {
            item_code: item_code.into(),
            item_name: None,
            stock_uom: None,
            is_stock_item: true,
            has_variants: false,
            variant_of: None,
            end_of_life: None,
            valuation_rate: Decimal::ZERO,
        }
    }
}

/// Changes to an item's availability for production.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub disabled: Option<bool>,
    /// `Some(None)` clears the end-of-life date
    pub end_of_life: Option<Option<NaiveDate>>,
    pub has_variants: Option<bool>,
    pub valuation_rate: Option<Decimal>,
}

fn default_true() -> bool {
    true
}

/// Items, warehouses and workstations referenced by manufacturing documents.
#[derive(Clone)]
pub struct MasterDataService {
    db: Arc<DatabaseConnection>,
}

impl MasterDataService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create_item(&self, new_item: NewItem) -> Result<item::Model, ServiceError> {
        new_item.validate()?;
        let db = &*self.db;

        if item::Entity::find_by_id(new_item.item_code.clone())
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .is_some()
        {
            return Err(ServiceError::ValidationError(format!(
                "Item {} already exists",
                new_item.item_code
            )));
        }

        if let Some(template) = &new_item.variant_of {
            let template = get_item(db, template).await?;
            if !template.has_variants {
                return Err(ServiceError::ValidationError(format!(
                    "Item {} is not a template and cannot have variants",
                    template.item_code
                )));
            }
        }

        let model = item::ActiveModel {
            item_name: Set(new_item
                .item_name
                .unwrap_or_else(|| new_item.item_code.clone())),
            item_code: Set(new_item.item_code),
            stock_uom: Set(new_item.stock_uom.unwrap_or_else(|| "Nos".to_string())),
            is_stock_item: Set(new_item.is_stock_item),
            disabled: Set(false),
            end_of_life: Set(new_item.end_of_life),
            has_variants: Set(new_item.has_variants),
            variant_of: Set(new_item.variant_of),
            valuation_rate: Set(new_item.valuation_rate),
            ..Default::default()
        };

        let created = model.insert(db).await.map_err(ServiceError::db_error)?;
        info!(item_code = %created.item_code, "Item created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        item_code: &str,
        update: ItemUpdate,
    ) -> Result<item::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let existing = get_item(&txn, item_code).await?;

        let mut model: item::ActiveModel = existing.into();
        if let Some(disabled) = update.disabled {
            model.disabled = Set(disabled);
        }
        if let Some(end_of_life) = update.end_of_life {
            model.end_of_life = Set(end_of_life);
        }
        if let Some(has_variants) = update.has_variants {
            model.has_variants = Set(has_variants);
        }
        if let Some(rate) = update.valuation_rate {
            model.valuation_rate = Set(rate);
        }

        let updated = model.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(updated)
    }

    pub async fn get_item(&self, item_code: &str) -> Result<item::Model, ServiceError> {
        get_item(&*self.db, item_code).await
    }

    #[instrument(skip(self))]
    pub async fn create_warehouse(
        &self,
        name: &str,
        company: &str,
    ) -> Result<warehouse::Model, ServiceError> {
        if name.trim().is_empty() || company.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "Warehouse name and company are required".to_string(),
            ));
        }

        let model = warehouse::ActiveModel {
            name: Set(name.to_string()),
            company: Set(company.to_string()),
            disabled: Set(false),
        };
        model.insert(&*self.db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn create_workstation(
        &self,
        name: &str,
        hour_rate: Decimal,
    ) -> Result<workstation::Model, ServiceError> {
        if hour_rate < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!(
                "Hour rate cannot be negative, got: {}",
                hour_rate
            )));
        }

        let model = workstation::ActiveModel {
            name: Set(name.to_string()),
            hour_rate: Set(hour_rate),
        };
        model.insert(&*self.db).await.map_err(ServiceError::db_error)
    }
}

pub(crate) async fn get_item<C>(conn: &C, item_code: &str) -> Result<item::Model, ServiceError>
where
    C: ConnectionTrait,
{
    item::Entity::find_by_id(item_code.to_string())
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Item {}", item_code)))
}

/// Rejects items that cannot be manufactured: disabled, past end of life, or templates.
pub(crate) fn check_production_item(
    item: &item::Model,
    today: NaiveDate,
) -> Result<(), ServiceError> {
    if item.disabled {
        return Err(ServiceError::ValidationError(format!(
            "Item {} is disabled",
            item.item_code
        )));
    }

    if item.is_end_of_life(today) {
        return Err(ServiceError::ValidationError(format!(
            "Item {} has reached its end of life on {}",
            item.item_code,
            item.end_of_life.map(|d| d.to_string()).unwrap_or_default()
        )));
    }

    if item.has_variants {
        return Err(ServiceError::ItemHasVariant(format!(
            "Item {} is a template, please select one of its variants",
            item.item_code
        )));
    }

    Ok(())
}

pub(crate) async fn validate_production_item<C>(
    conn: &C,
    item_code: &str,
) -> Result<item::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let item = get_item(conn, item_code).await?;
    check_production_item(&item, Utc::now().date_naive())?;
    Ok(item)
}

/// Checks the warehouse exists, is enabled and belongs to `company`.
pub(crate) async fn validate_warehouse<C>(
    conn: &C,
    name: &str,
    company: &str,
) -> Result<warehouse::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let wh = warehouse::Entity::find_by_id(name.to_string())
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::ValidationError(format!("Warehouse {} not found", name)))?;

    if wh.disabled {
        return Err(ServiceError::ValidationError(format!(
            "Warehouse {} is disabled",
            name
        )));
    }

    if wh.company != company {
        return Err(ServiceError::ValidationError(format!(
            "Warehouse {} does not belong to company {}",
            name, company
        )));
    }

    Ok(wh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn template() -> item::Model {
        item::Model {
            item_code: "_Test Variant Item".into(),
            item_name: "_Test Variant Item".into(),
            stock_uom: "Nos".into(),
            is_stock_item: true,
            disabled: false,
            end_of_life: None,
            has_variants: false,
            variant_of: None,
            valuation_rate: Decimal::ZERO,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn production_item_checks() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut item = template();
        assert!(check_production_item(&item, today).is_ok());

        item.has_variants = true;
        assert_matches!(
            check_production_item(&item, today),
            Err(ServiceError::ItemHasVariant(_))
        );

        item.has_variants = false;
        item.end_of_life = NaiveDate::from_ymd_opt(2024, 2, 28);
        assert_matches!(
            check_production_item(&item, today),
            Err(ServiceError::ValidationError(msg)) if msg.contains("end of life")
        );

        item.end_of_life = None;
        item.disabled = true;
        assert_matches!(
            check_production_item(&item, today),
            Err(ServiceError::ValidationError(msg)) if msg.contains("disabled")
        );
    }
}
