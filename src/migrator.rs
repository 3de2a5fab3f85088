use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_catalog_tables::Migration),
            Box::new(m20240301_000002_create_grn_tables::Migration),
            Box::new(m20240301_000003_create_inventory_movements_table::Migration),
        ]
    }
}

mod m20240301_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Products::Sku)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::Unit)
                                .string()
                                .not_null()
                                .default("unit"),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
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
                        .name("idx_products_name")
                        .table(Products::Table)
                        .col(Products::Name)
                        .to_owned(),
                )
                .await?;

            // On-hand rows are keyed by product; `version` backs the optimistic lock
            manager
                .create_table(
                    Table::create()
                        .table(InventoryOnHand::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryOnHand::ProductId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryOnHand::QtyOnHand)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryOnHand::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(InventoryOnHand::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryOnHand::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Sku,
        Name,
        Unit,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum InventoryOnHand {
        Table,
        ProductId,
        QtyOnHand,
        Version,
        UpdatedAt,
    }
}

mod m20240301_000002_create_grn_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_grn_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(GrnDrafts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(GrnDrafts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(GrnDrafts::GrnNumber).string().not_null())
                        .col(ColumnDef::new(GrnDrafts::ReceivedDate).date().not_null())
                        .col(ColumnDef::new(GrnDrafts::Notes).text().null())
                        .col(
                            ColumnDef::new(GrnDrafts::Status)
                                .string_len(32)
                                .not_null()
                                .default("DRAFT"),
                        )
                        .col(ColumnDef::new(GrnDrafts::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(GrnDrafts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(GrnDrafts::PostedBy).string().null())
                        .col(
                            ColumnDef::new(GrnDrafts::PostedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(GrnDrafts::PostRequestId).uuid().null())
                        .col(ColumnDef::new(GrnDrafts::LinesProcessed).integer().null())
                        .col(ColumnDef::new(GrnDrafts::ProductsUpdated).integer().null())
                        .col(ColumnDef::new(GrnDrafts::MovementsInserted).integer().null())
                        .col(ColumnDef::new(GrnDrafts::ReviewedBy).string().null())
                        .col(
                            ColumnDef::new(GrnDrafts::ReviewedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_grn_drafts_grn_number")
                        .table(GrnDrafts::Table)
                        .col(GrnDrafts::GrnNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_grn_drafts_status")
                        .table(GrnDrafts::Table)
                        .col(GrnDrafts::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(GrnDraftLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(GrnDraftLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(GrnDraftLines::GrnId).uuid().not_null())
                        .col(ColumnDef::new(GrnDraftLines::LineNo).integer().not_null())
                        .col(ColumnDef::new(GrnDraftLines::ProductId).uuid().not_null())
                        .col(ColumnDef::new(GrnDraftLines::ProductName).string().not_null())
                        .col(ColumnDef::new(GrnDraftLines::Sku).string().not_null())
                        .col(
                            ColumnDef::new(GrnDraftLines::QtyExpected)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GrnDraftLines::QtyReceived)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GrnDraftLines::Variance)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(GrnDraftLines::DiscrepancyReason)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(GrnDraftLines::OtherReason).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_grn_draft_lines_grn_id")
                                .from(GrnDraftLines::Table, GrnDraftLines::GrnId)
                                .to(GrnDrafts::Table, GrnDrafts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_grn_draft_lines_grn_line_no")
                        .table(GrnDraftLines::Table)
                        .col(GrnDraftLines::GrnId)
                        .col(GrnDraftLines::LineNo)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(GrnDraftLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(GrnDrafts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum GrnDrafts {
        Table,
        Id,
        GrnNumber,
        ReceivedDate,
        Notes,
        Status,
        CreatedBy,
        CreatedAt,
        PostedBy,
        PostedAt,
        PostRequestId,
        LinesProcessed,
        ProductsUpdated,
        MovementsInserted,
        ReviewedBy,
        ReviewedAt,
    }

    #[derive(DeriveIden)]
    enum GrnDraftLines {
        Table,
        Id,
        GrnId,
        LineNo,
        ProductId,
        ProductName,
        Sku,
        QtyExpected,
        QtyReceived,
        Variance,
        DiscrepancyReason,
        OtherReason,
    }
}

mod m20240301_000003_create_inventory_movements_table {

    use super::m20240301_000002_create_grn_tables::GrnDrafts;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_inventory_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryMovements::ProductId).uuid().not_null())
                        .col(ColumnDef::new(InventoryMovements::GrnId).uuid().not_null())
                        .col(ColumnDef::new(InventoryMovements::LineNo).integer().not_null())
                        .col(
                            ColumnDef::new(InventoryMovements::MovementType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::QuantityDelta)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::StockBefore)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::StockAfter)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::CreatedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_movements_grn_id")
                                .from(InventoryMovements::Table, InventoryMovements::GrnId)
                                .to(GrnDrafts::Table, GrnDrafts::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_movements_product_id")
                        .table(InventoryMovements::Table)
                        .col(InventoryMovements::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_movements_grn_id")
                        .table(InventoryMovements::Table)
                        .col(InventoryMovements::GrnId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryMovements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryMovements {
        Table,
        Id,
        ProductId,
        GrnId,
        LineNo,
        MovementType,
        QuantityDelta,
        StockBefore,
        StockAfter,
        CreatedBy,
        CreatedAt,
    }
}
