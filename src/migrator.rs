use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_master_data_tables::Migration),
            Box::new(m20240301_000002_create_bom_tables::Migration),
            Box::new(m20240301_000003_create_order_tables::Migration),
            Box::new(m20240301_000004_create_stock_and_timesheet_tables::Migration),
        ]
    }
}

/// Quantity/amount column: DECIMAL(16, 4) NOT NULL DEFAULT 0
fn amount<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .decimal_len(16, 4)
        .not_null()
        .default(0)
        .to_owned()
}

fn id_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

mod m20240301_000001_create_master_data_tables {
    use super::amount;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_master_data_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Items::ItemCode)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Items::ItemName).string().not_null())
                        .col(ColumnDef::new(Items::StockUom).string().not_null())
                        .col(
                            ColumnDef::new(Items::IsStockItem)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Items::Disabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Items::EndOfLife).date().null())
                        .col(
                            ColumnDef::new(Items::HasVariants)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Items::VariantOf).string().null())
                        .col(amount(Items::ValuationRate))
                        .col(
                            ColumnDef::new(Items::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouses::Name)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Warehouses::Company).string().not_null())
                        .col(
                            ColumnDef::new(Warehouses::Disabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Workstations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Workstations::Name)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(amount(Workstations::HourRate))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ManufacturingSettings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ManufacturingSettings::Id)
                                .integer()
                                .not_null()
                                .primary_key(),
                        )
                        .col(amount(
                            ManufacturingSettings::OverproductionPercentageForWorkOrder,
                        ))
                        .col(amount(
                            ManufacturingSettings::OverproductionPercentageForSalesOrder,
                        ))
                        .col(
                            ColumnDef::new(ManufacturingSettings::AllowProductionOnHolidays)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ManufacturingSettings::DefaultWipWarehouse)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ManufacturingSettings::DefaultFgWarehouse)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ManufacturingSettings::DefaultScrapWarehouse)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ManufacturingSettings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ManufacturingSettings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Workstations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Items {
        Table,
        ItemCode,
        ItemName,
        StockUom,
        IsStockItem,
        Disabled,
        EndOfLife,
        HasVariants,
        VariantOf,
        ValuationRate,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Warehouses {
        Table,
        Name,
        Company,
        Disabled,
    }

    #[derive(DeriveIden)]
    enum Workstations {
        Table,
        Name,
        HourRate,
    }

    #[derive(DeriveIden)]
    enum ManufacturingSettings {
        Table,
        Id,
        OverproductionPercentageForWorkOrder,
        OverproductionPercentageForSalesOrder,
        AllowProductionOnHolidays,
        DefaultWipWarehouse,
        DefaultFgWarehouse,
        DefaultScrapWarehouse,
        UpdatedAt,
    }
}

mod m20240301_000002_create_bom_tables {
    use super::{amount, id_col};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_bom_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Boms::Table)
                        .if_not_exists()
                        .col(id_col(Boms::Id))
                        .col(ColumnDef::new(Boms::Item).string().not_null())
                        .col(ColumnDef::new(Boms::Company).string().not_null())
                        .col(amount(Boms::Quantity))
                        .col(
                            ColumnDef::new(Boms::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Boms::IsDefault)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Boms::WithOperations)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Boms::Docstatus)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(amount(Boms::OperatingCost))
                        .col(amount(Boms::RawMaterialCost))
                        .col(amount(Boms::ScrapMaterialCost))
                        .col(
                            ColumnDef::new(Boms::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Boms::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_boms_item")
                        .table(Boms::Table)
                        .col(Boms::Item)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BomItems::Table)
                        .if_not_exists()
                        .col(id_col(BomItems::Id))
                        .col(ColumnDef::new(BomItems::BomId).big_integer().not_null())
                        .col(ColumnDef::new(BomItems::Idx).integer().not_null())
                        .col(ColumnDef::new(BomItems::ItemCode).string().not_null())
                        .col(amount(BomItems::Qty))
                        .col(amount(BomItems::StockQty))
                        .col(amount(BomItems::Rate))
                        .col(ColumnDef::new(BomItems::SourceWarehouse).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bom_items_bom")
                                .from(BomItems::Table, BomItems::BomId)
                                .to(Boms::Table, Boms::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BomOperations::Table)
                        .if_not_exists()
                        .col(id_col(BomOperations::Id))
                        .col(
                            ColumnDef::new(BomOperations::BomId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BomOperations::Idx).integer().not_null())
                        .col(ColumnDef::new(BomOperations::Operation).string().not_null())
                        .col(
                            ColumnDef::new(BomOperations::Workstation)
                                .string()
                                .not_null(),
                        )
                        .col(amount(BomOperations::TimeInMins))
                        .col(amount(BomOperations::HourRate))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bom_operations_bom")
                                .from(BomOperations::Table, BomOperations::BomId)
                                .to(Boms::Table, Boms::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BomScrapItems::Table)
                        .if_not_exists()
                        .col(id_col(BomScrapItems::Id))
                        .col(
                            ColumnDef::new(BomScrapItems::BomId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BomScrapItems::ItemCode).string().not_null())
                        .col(amount(BomScrapItems::StockQty))
                        .col(amount(BomScrapItems::Rate))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bom_scrap_items_bom")
                                .from(BomScrapItems::Table, BomScrapItems::BomId)
                                .to(Boms::Table, Boms::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BomScrapItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BomOperations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BomItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Boms::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Boms {
        Table,
        Id,
        Item,
        Company,
        Quantity,
        IsActive,
        IsDefault,
        WithOperations,
        Docstatus,
        OperatingCost,
        RawMaterialCost,
        ScrapMaterialCost,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum BomItems {
        Table,
        Id,
        BomId,
        Idx,
        ItemCode,
        Qty,
        StockQty,
        Rate,
        SourceWarehouse,
    }

    #[derive(DeriveIden)]
    enum BomOperations {
        Table,
        Id,
        BomId,
        Idx,
        Operation,
        Workstation,
        TimeInMins,
        HourRate,
    }

    #[derive(DeriveIden)]
    enum BomScrapItems {
        Table,
        Id,
        BomId,
        ItemCode,
        StockQty,
        Rate,
    }
}

mod m20240301_000003_create_order_tables {
    use super::{amount, id_col};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SalesOrders::Table)
                        .if_not_exists()
                        .col(id_col(SalesOrders::Id))
                        .col(ColumnDef::new(SalesOrders::Customer).string().not_null())
                        .col(ColumnDef::new(SalesOrders::Company).string().not_null())
                        .col(
                            ColumnDef::new(SalesOrders::Docstatus)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SalesOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SalesOrderItems::Table)
                        .if_not_exists()
                        .col(id_col(SalesOrderItems::Id))
                        .col(
                            ColumnDef::new(SalesOrderItems::SalesOrderId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesOrderItems::Idx).integer().not_null())
                        .col(
                            ColumnDef::new(SalesOrderItems::ItemCode)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesOrderItems::Warehouse).string().null())
                        .col(amount(SalesOrderItems::Qty))
                        .col(amount(SalesOrderItems::StockQty))
                        .col(amount(SalesOrderItems::WorkOrderQty))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_order_items_sales_order")
                                .from(SalesOrderItems::Table, SalesOrderItems::SalesOrderId)
                                .to(SalesOrders::Table, SalesOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WorkOrders::Table)
                        .if_not_exists()
                        .col(id_col(WorkOrders::Id))
                        .col(
                            ColumnDef::new(WorkOrders::ProductionItem)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkOrders::Company).string().not_null())
                        .col(amount(WorkOrders::Qty))
                        .col(ColumnDef::new(WorkOrders::BomId).big_integer().not_null())
                        .col(
                            ColumnDef::new(WorkOrders::SalesOrderId)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::SalesOrderItemId)
                                .big_integer()
                                .null(),
                        )
                        .col(ColumnDef::new(WorkOrders::SourceWarehouse).string().null())
                        .col(ColumnDef::new(WorkOrders::WipWarehouse).string().null())
                        .col(ColumnDef::new(WorkOrders::FgWarehouse).string().not_null())
                        .col(ColumnDef::new(WorkOrders::ScrapWarehouse).string().null())
                        .col(
                            ColumnDef::new(WorkOrders::SkipTransfer)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(amount(WorkOrders::ProducedQty))
                        .col(amount(WorkOrders::MaterialTransferredForManufacturing))
                        .col(ColumnDef::new(WorkOrders::Status).string().not_null())
                        .col(
                            ColumnDef::new(WorkOrders::Docstatus)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::PlannedStartDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::ActualStartDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::ActualEndDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(amount(WorkOrders::PlannedOperatingCost))
                        .col(amount(WorkOrders::ActualOperatingCost))
                        .col(amount(WorkOrders::AdditionalOperatingCost))
                        .col(amount(WorkOrders::TotalOperatingCost))
                        .col(
                            ColumnDef::new(WorkOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_orders_sales_order")
                                .from(WorkOrders::Table, WorkOrders::SalesOrderId)
                                .to(SalesOrders::Table, SalesOrders::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_work_orders_production_item")
                        .table(WorkOrders::Table)
                        .col(WorkOrders::ProductionItem)
                        .col(WorkOrders::FgWarehouse)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_work_orders_sales_order_item")
                        .table(WorkOrders::Table)
                        .col(WorkOrders::SalesOrderItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WorkOrderItems::Table)
                        .if_not_exists()
                        .col(id_col(WorkOrderItems::Id))
                        .col(
                            ColumnDef::new(WorkOrderItems::WorkOrderId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkOrderItems::Idx).integer().not_null())
                        .col(ColumnDef::new(WorkOrderItems::ItemCode).string().not_null())
                        .col(
                            ColumnDef::new(WorkOrderItems::SourceWarehouse)
                                .string()
                                .not_null(),
                        )
                        .col(amount(WorkOrderItems::RequiredQty))
                        .col(amount(WorkOrderItems::TransferredQty))
                        .col(amount(WorkOrderItems::ConsumedQty))
                        .col(amount(WorkOrderItems::Rate))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_order_items_work_order")
                                .from(WorkOrderItems::Table, WorkOrderItems::WorkOrderId)
                                .to(WorkOrders::Table, WorkOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_work_order_items_item_warehouse")
                        .table(WorkOrderItems::Table)
                        .col(WorkOrderItems::ItemCode)
                        .col(WorkOrderItems::SourceWarehouse)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WorkOrderOperations::Table)
                        .if_not_exists()
                        .col(id_col(WorkOrderOperations::Id))
                        .col(
                            ColumnDef::new(WorkOrderOperations::WorkOrderId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderOperations::Idx)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderOperations::Operation)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderOperations::Workstation)
                                .string()
                                .not_null(),
                        )
                        .col(amount(WorkOrderOperations::TimeInMins))
                        .col(amount(WorkOrderOperations::HourRate))
                        .col(amount(WorkOrderOperations::PlannedOperatingCost))
                        .col(amount(WorkOrderOperations::CompletedQty))
                        .col(
                            ColumnDef::new(WorkOrderOperations::Status)
                                .string()
                                .not_null(),
                        )
                        .col(amount(WorkOrderOperations::ActualOperationTime))
                        .col(amount(WorkOrderOperations::ActualOperatingCost))
                        .col(
                            ColumnDef::new(WorkOrderOperations::ActualStartTime)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderOperations::ActualEndTime)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_order_operations_work_order")
                                .from(
                                    WorkOrderOperations::Table,
                                    WorkOrderOperations::WorkOrderId,
                                )
                                .to(WorkOrders::Table, WorkOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WorkOrderOperations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WorkOrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WorkOrders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SalesOrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SalesOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SalesOrders {
        Table,
        Id,
        Customer,
        Company,
        Docstatus,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum SalesOrderItems {
        Table,
        Id,
        SalesOrderId,
        Idx,
        ItemCode,
        Warehouse,
        Qty,
        StockQty,
        WorkOrderQty,
    }

    #[derive(DeriveIden)]
    enum WorkOrders {
        Table,
        Id,
        ProductionItem,
        Company,
        Qty,
        BomId,
        SalesOrderId,
        SalesOrderItemId,
        SourceWarehouse,
        WipWarehouse,
        FgWarehouse,
        ScrapWarehouse,
        SkipTransfer,
        ProducedQty,
        MaterialTransferredForManufacturing,
        Status,
        Docstatus,
        PlannedStartDate,
        ActualStartDate,
        ActualEndDate,
        PlannedOperatingCost,
        ActualOperatingCost,
        AdditionalOperatingCost,
        TotalOperatingCost,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum WorkOrderItems {
        Table,
        Id,
        WorkOrderId,
        Idx,
        ItemCode,
        SourceWarehouse,
        RequiredQty,
        TransferredQty,
        ConsumedQty,
        Rate,
    }

    #[derive(DeriveIden)]
    enum WorkOrderOperations {
        Table,
        Id,
        WorkOrderId,
        Idx,
        Operation,
        Workstation,
        TimeInMins,
        HourRate,
        PlannedOperatingCost,
        CompletedQty,
        Status,
        ActualOperationTime,
        ActualOperatingCost,
        ActualStartTime,
        ActualEndTime,
    }
}

mod m20240301_000004_create_stock_and_timesheet_tables {
    use super::{amount, id_col};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_stock_and_timesheet_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Bins::Table)
                        .if_not_exists()
                        .col(id_col(Bins::Id))
                        .col(ColumnDef::new(Bins::ItemCode).string().not_null())
                        .col(ColumnDef::new(Bins::Warehouse).string().not_null())
                        .col(amount(Bins::ActualQty))
                        .col(amount(Bins::OrderedQty))
                        .col(amount(Bins::IndentedQty))
                        .col(amount(Bins::PlannedQty))
                        .col(amount(Bins::ReservedQty))
                        .col(amount(Bins::ReservedQtyForProduction))
                        .col(amount(Bins::ProjectedQty))
                        .col(amount(Bins::ValuationRate))
                        .col(amount(Bins::StockValue))
                        .col(
                            ColumnDef::new(Bins::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bins_item_warehouse")
                        .table(Bins::Table)
                        .col(Bins::ItemCode)
                        .col(Bins::Warehouse)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockEntries::Table)
                        .if_not_exists()
                        .col(id_col(StockEntries::Id))
                        .col(ColumnDef::new(StockEntries::Purpose).string().not_null())
                        .col(ColumnDef::new(StockEntries::Company).string().not_null())
                        .col(
                            ColumnDef::new(StockEntries::WorkOrderId)
                                .big_integer()
                                .null(),
                        )
                        .col(ColumnDef::new(StockEntries::BomId).big_integer().null())
                        .col(amount(StockEntries::FgCompletedQty))
                        .col(ColumnDef::new(StockEntries::FromWarehouse).string().null())
                        .col(ColumnDef::new(StockEntries::ToWarehouse).string().null())
                        .col(
                            ColumnDef::new(StockEntries::PostingDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(amount(StockEntries::TotalOutgoingValue))
                        .col(amount(StockEntries::TotalIncomingValue))
                        .col(amount(StockEntries::TotalAdditionalCosts))
                        .col(
                            ColumnDef::new(StockEntries::Docstatus)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockEntries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockEntries::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_entries_work_order")
                        .table(StockEntries::Table)
                        .col(StockEntries::WorkOrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockEntryDetails::Table)
                        .if_not_exists()
                        .col(id_col(StockEntryDetails::Id))
                        .col(
                            ColumnDef::new(StockEntryDetails::StockEntryId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockEntryDetails::Idx).integer().not_null())
                        .col(
                            ColumnDef::new(StockEntryDetails::ItemCode)
                                .string()
                                .not_null(),
                        )
                        .col(amount(StockEntryDetails::Qty))
                        .col(ColumnDef::new(StockEntryDetails::SWarehouse).string().null())
                        .col(ColumnDef::new(StockEntryDetails::TWarehouse).string().null())
                        .col(amount(StockEntryDetails::BasicRate))
                        .col(amount(StockEntryDetails::BasicAmount))
                        .col(
                            ColumnDef::new(StockEntryDetails::IsFinishedItem)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(StockEntryDetails::IsScrapItem)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(StockEntryDetails::BomId)
                                .big_integer()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_entry_details_stock_entry")
                                .from(StockEntryDetails::Table, StockEntryDetails::StockEntryId)
                                .to(StockEntries::Table, StockEntries::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockLedgerEntries::Table)
                        .if_not_exists()
                        .col(id_col(StockLedgerEntries::Id))
                        .col(
                            ColumnDef::new(StockLedgerEntries::ItemCode)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::Warehouse)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::PostingDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::VoucherType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::VoucherId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::VoucherDetailId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(amount(StockLedgerEntries::ActualQty))
                        .col(amount(StockLedgerEntries::QtyAfterTransaction))
                        .col(amount(StockLedgerEntries::IncomingRate))
                        .col(amount(StockLedgerEntries::ValuationRate))
                        .col(amount(StockLedgerEntries::StockValueDifference))
                        .col(
                            ColumnDef::new(StockLedgerEntries::IsCancelled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ledger_entries_voucher")
                        .table(StockLedgerEntries::Table)
                        .col(StockLedgerEntries::VoucherType)
                        .col(StockLedgerEntries::VoucherId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ledger_entries_item_warehouse")
                        .table(StockLedgerEntries::Table)
                        .col(StockLedgerEntries::ItemCode)
                        .col(StockLedgerEntries::Warehouse)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Timesheets::Table)
                        .if_not_exists()
                        .col(id_col(Timesheets::Id))
                        .col(ColumnDef::new(Timesheets::Company).string().not_null())
                        .col(
                            ColumnDef::new(Timesheets::WorkOrderId)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Timesheets::Docstatus)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(amount(Timesheets::TotalHours))
                        .col(amount(Timesheets::TotalCostingAmount))
                        .col(
                            ColumnDef::new(Timesheets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Timesheets::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TimesheetDetails::Table)
                        .if_not_exists()
                        .col(id_col(TimesheetDetails::Id))
                        .col(
                            ColumnDef::new(TimesheetDetails::TimesheetId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TimesheetDetails::Idx).integer().not_null())
                        .col(
                            ColumnDef::new(TimesheetDetails::OperationId)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TimesheetDetails::Workstation)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TimesheetDetails::FromTime)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TimesheetDetails::ToTime)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(amount(TimesheetDetails::Hours))
                        .col(amount(TimesheetDetails::CompletedQty))
                        .col(amount(TimesheetDetails::CostingRate))
                        .col(amount(TimesheetDetails::CostingAmount))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_timesheet_details_timesheet")
                                .from(TimesheetDetails::Table, TimesheetDetails::TimesheetId)
                                .to(Timesheets::Table, Timesheets::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TimesheetDetails::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Timesheets::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockLedgerEntries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockEntryDetails::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockEntries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Bins::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Bins {
        Table,
        Id,
        ItemCode,
        Warehouse,
        ActualQty,
        OrderedQty,
        IndentedQty,
        PlannedQty,
        ReservedQty,
        ReservedQtyForProduction,
        ProjectedQty,
        ValuationRate,
        StockValue,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockEntries {
        Table,
        Id,
        Purpose,
        Company,
        WorkOrderId,
        BomId,
        FgCompletedQty,
        FromWarehouse,
        ToWarehouse,
        PostingDate,
        TotalOutgoingValue,
        TotalIncomingValue,
        TotalAdditionalCosts,
        Docstatus,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockEntryDetails {
        Table,
        Id,
        StockEntryId,
        Idx,
        ItemCode,
        Qty,
        #[sea_orm(iden = "s_warehouse")]
        SWarehouse,
        #[sea_orm(iden = "t_warehouse")]
        TWarehouse,
        BasicRate,
        BasicAmount,
        IsFinishedItem,
        IsScrapItem,
        BomId,
    }

    #[derive(DeriveIden)]
    enum StockLedgerEntries {
        Table,
        Id,
        ItemCode,
        Warehouse,
        PostingDate,
        VoucherType,
        VoucherId,
        VoucherDetailId,
        ActualQty,
        QtyAfterTransaction,
        IncomingRate,
        ValuationRate,
        StockValueDifference,
        IsCancelled,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Timesheets {
        Table,
        Id,
        Company,
        WorkOrderId,
        Docstatus,
        TotalHours,
        TotalCostingAmount,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum TimesheetDetails {
        Table,
        Id,
        TimesheetId,
        Idx,
        OperationId,
        Workstation,
        FromTime,
        ToTime,
        Hours,
        CompletedQty,
        CostingRate,
        CostingAmount,
    }
}
