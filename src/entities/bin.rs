use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};

/// Stock counters for one item in one warehouse.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bins")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub item_code: String,
    pub warehouse: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub actual_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub ordered_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub indented_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub planned_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub reserved_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub reserved_qty_for_production: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub projected_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub valuation_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub stock_value: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// projected = actual + ordered + indented + planned - reserved - reserved for production
pub fn projected_qty(
    actual: Decimal,
    ordered: Decimal,
    indented: Decimal,
    planned: Decimal,
    reserved: Decimal,
    reserved_for_production: Decimal,
) -> Decimal {
    actual + ordered + indented + planned - reserved - reserved_for_production
}

impl Model {
    pub fn expected_projected_qty(&self) -> Decimal {
        projected_qty(
            self.actual_qty,
            self.ordered_qty,
            self.indented_qty,
            self.planned_qty,
            self.reserved_qty,
            self.reserved_qty_for_production,
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemCode",
        to = "super::item::Column::ItemCode"
    )]
    Item,
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::Warehouse",
        to = "super::warehouse::Column::Name"
    )]
    Warehouse,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        self.updated_at = ActiveValue::Set(Utc::now());
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn projected_qty_reduces_to_actual_minus_reserved_plus_planned() {
        assert_eq!(
            projected_qty(dec!(100), dec!(0), dec!(0), dec!(10), dec!(0), dec!(2)),
            dec!(108)
        );
        assert_eq!(
            projected_qty(dec!(5), dec!(3), dec!(1), dec!(0), dec!(4), dec!(0)),
            dec!(5)
        );
    }
}
