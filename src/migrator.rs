use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_garments_table::Migration),
            Box::new(m20240601_000002_create_rental_contracts_table::Migration),
        ]
    }
}

mod m20240601_000001_create_garments_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_garments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Garments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Garments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Garments::Name).string().not_null())
                        .col(ColumnDef::new(Garments::Code).string().not_null())
                        .col(ColumnDef::new(Garments::Category).string_len(32).not_null())
                        .col(ColumnDef::new(Garments::Size).string().not_null())
                        .col(ColumnDef::new(Garments::Color).string().not_null())
                        .col(
                            ColumnDef::new(Garments::Description)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Garments::RentalPrice)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Garments::Status)
                                .string_len(32)
                                .not_null()
                                .default("available"),
                        )
                        .col(
                            ColumnDef::new(Garments::Photos)
                                .text()
                                .not_null()
                                .default("[]"),
                        )
                        .col(
                            ColumnDef::new(Garments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Garments::UpdatedAt)
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
                        .name("idx_garments_code")
                        .table(Garments::Table)
                        .col(Garments::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_garments_status")
                        .table(Garments::Table)
                        .col(Garments::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Garments::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Garments {
        Table,
        Id,
        Name,
        Code,
        Category,
        Size,
        Color,
        Description,
        RentalPrice,
        Status,
        Photos,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_rental_contracts_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_rental_contracts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // garment_id is a plain reference: history survives item deletion
            manager
                .create_table(
                    Table::create()
                        .table(RentalContracts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RentalContracts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RentalContracts::GarmentId).uuid().not_null())
                        .col(
                            ColumnDef::new(RentalContracts::GarmentName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::CustomerName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::CustomerNationalId)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::CustomerPhone)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::CustomerAddress)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::PickupDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::ReturnDue)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::AgreedPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::Deposit)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::AmountPaid)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::PaymentMethod)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::DamageNotes)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::Remarks)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::Status)
                                .string_len(32)
                                .not_null()
                                .default("active"),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RentalContracts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, column) in [
                ("idx_rental_contracts_garment_id", RentalContracts::GarmentId),
                ("idx_rental_contracts_status", RentalContracts::Status),
                (
                    "idx_rental_contracts_customer_national_id",
                    RentalContracts::CustomerNationalId,
                ),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(RentalContracts::Table)
                            .col(column)
                            .to_owned(),
                    )
                    .await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RentalContracts::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum RentalContracts {
        Table,
        Id,
        GarmentId,
        GarmentName,
        CustomerName,
        CustomerNationalId,
        CustomerPhone,
        CustomerAddress,
        PickupDate,
        ReturnDue,
        AgreedPrice,
        Deposit,
        AmountPaid,
        PaymentMethod,
        DamageNotes,
        Remarks,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}
