use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_code: String,
    pub item_name: String,
    pub stock_uom: String,
    pub is_stock_item: bool,
    pub disabled: bool,
    pub end_of_life: Option<NaiveDate>,
    pub has_variants: bool,
    /// Template this item is a variant of
    pub variant_of: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub valuation_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// An item is usable until the day before its end-of-life date.
    pub fn is_end_of_life(&self, today: NaiveDate) -> bool {
        self.end_of_life.map(|eol| eol <= today).unwrap_or(false)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bin::Entity")]
    Bins,
    #[sea_orm(has_many = "super::bom::Entity")]
    Boms,
}

impl Related<super::bin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bins.def()
    }
}

impl Related<super::bom::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Boms.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        if insert {
            if let ActiveValue::NotSet = self.created_at {
                self.created_at = ActiveValue::Set(now);
            }
        }
        self.updated_at = ActiveValue::Set(now);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(end_of_life: Option<NaiveDate>) -> Model {
        Model {
            item_code: "_Test FG Item".into(),
            item_name: "_Test FG Item".into(),
            stock_uom: "Nos".into(),
            is_stock_item: true,
            disabled: false,
            end_of_life,
            has_variants: false,
            variant_of: None,
            valuation_rate: Decimal::ZERO,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn end_of_life_is_inclusive_of_today() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(item(Some(today)).is_end_of_life(today));
        assert!(item(NaiveDate::from_ymd_opt(2024, 5, 31)).is_end_of_life(today));
        assert!(!item(NaiveDate::from_ymd_opt(2024, 6, 2)).is_end_of_life(today));
        assert!(!item(None).is_end_of_life(today));
    }
}
