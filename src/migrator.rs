use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_profiles_table::Migration),
            Box::new(m20240301_000002_create_shipments_table::Migration),
            Box::new(m20240301_000003_create_tracking_events_table::Migration),
            Box::new(m20240301_000004_create_payment_options_table::Migration),
            Box::new(m20240301_000005_create_quotes_table::Migration),
            Box::new(m20240301_000006_create_payment_proofs_table::Migration),
        ]
    }
}

mod m20240301_000001_create_profiles_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_profiles_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Profiles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Profiles::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Profiles::Email).string().not_null())
                        .col(ColumnDef::new(Profiles::FullName).string().null())
                        .col(ColumnDef::new(Profiles::Phone).string().null())
                        .col(ColumnDef::new(Profiles::CompanyName).string().null())
                        .col(ColumnDef::new(Profiles::Address).string().null())
                        .col(ColumnDef::new(Profiles::City).string().null())
                        .col(ColumnDef::new(Profiles::State).string().null())
                        .col(ColumnDef::new(Profiles::PostalCode).string().null())
                        .col(ColumnDef::new(Profiles::Country).string().null())
                        .col(
                            ColumnDef::new(Profiles::UserType)
                                .string()
                                .not_null()
                                .default("client"),
                        )
                        .col(
                            ColumnDef::new(Profiles::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Profiles::UpdatedAt)
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
                        .name("idx_profiles_user_type")
                        .table(Profiles::Table)
                        .col(Profiles::UserType)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Profiles::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Profiles {
        Table,
        Id,
        Email,
        FullName,
        Phone,
        CompanyName,
        Address,
        City,
        State,
        PostalCode,
        Country,
        UserType,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_shipments_table {
    use super::m20240301_000001_create_profiles_table::Profiles;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_shipments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Shipments::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Shipments::TrackingNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Shipments::CustomerId).uuid().null())
                        .col(ColumnDef::new(Shipments::SenderName).string().not_null())
                        .col(ColumnDef::new(Shipments::SenderEmail).string().null())
                        .col(ColumnDef::new(Shipments::SenderPhone).string().null())
                        .col(ColumnDef::new(Shipments::SenderAddress).string().not_null())
                        .col(ColumnDef::new(Shipments::SenderCity).string().not_null())
                        .col(ColumnDef::new(Shipments::SenderState).string().null())
                        .col(ColumnDef::new(Shipments::SenderPostalCode).string().null())
                        .col(ColumnDef::new(Shipments::SenderCountry).string().not_null())
                        .col(ColumnDef::new(Shipments::RecipientName).string().not_null())
                        .col(ColumnDef::new(Shipments::RecipientEmail).string().null())
                        .col(ColumnDef::new(Shipments::RecipientPhone).string().null())
                        .col(
                            ColumnDef::new(Shipments::RecipientAddress)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Shipments::RecipientCity).string().not_null())
                        .col(ColumnDef::new(Shipments::RecipientState).string().null())
                        .col(
                            ColumnDef::new(Shipments::RecipientPostalCode)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::RecipientCountry)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Shipments::PackageType).string().not_null())
                        .col(
                            ColumnDef::new(Shipments::WeightKg)
                                .decimal_len(10, 3)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Shipments::LengthCm).decimal_len(10, 2).null())
                        .col(ColumnDef::new(Shipments::WidthCm).decimal_len(10, 2).null())
                        .col(ColumnDef::new(Shipments::HeightCm).decimal_len(10, 2).null())
                        .col(
                            ColumnDef::new(Shipments::DeclaredValue)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Shipments::PackageDescription).text().null())
                        .col(ColumnDef::new(Shipments::ServiceType).string().not_null())
                        .col(
                            ColumnDef::new(Shipments::DeliveryInstructions)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::SignatureRequired)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Shipments::InsuranceRequired)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Shipments::Status)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Shipments::BaseCost)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Shipments::WeightCost)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Shipments::InsuranceCost)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Shipments::SignatureCost)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Shipments::TaxAmount)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Shipments::TotalCost)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Shipments::EstimatedDeliveryDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::ActualDeliveryDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Shipments::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(Shipments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipments_customer_id")
                                .from(Shipments::Table, Shipments::CustomerId)
                                .to(Profiles::Table, Profiles::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_customer_id")
                        .table(Shipments::Table)
                        .col(Shipments::CustomerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_status")
                        .table(Shipments::Table)
                        .col(Shipments::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_created_at")
                        .table(Shipments::Table)
                        .col(Shipments::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Shipments {
        Table,
        Id,
        TrackingNumber,
        CustomerId,
        SenderName,
        SenderEmail,
        SenderPhone,
        SenderAddress,
        SenderCity,
        SenderState,
        SenderPostalCode,
        SenderCountry,
        RecipientName,
        RecipientEmail,
        RecipientPhone,
        RecipientAddress,
        RecipientCity,
        RecipientState,
        RecipientPostalCode,
        RecipientCountry,
        PackageType,
        WeightKg,
        LengthCm,
        WidthCm,
        HeightCm,
        DeclaredValue,
        PackageDescription,
        ServiceType,
        DeliveryInstructions,
        SignatureRequired,
        InsuranceRequired,
        Status,
        BaseCost,
        WeightCost,
        InsuranceCost,
        SignatureCost,
        TaxAmount,
        TotalCost,
        EstimatedDeliveryDate,
        ActualDeliveryDate,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_tracking_events_table {
    use super::m20240301_000002_create_shipments_table::Shipments;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_tracking_events_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TrackingEvents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TrackingEvents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TrackingEvents::ShipmentId).uuid().not_null())
                        .col(ColumnDef::new(TrackingEvents::Sequence).integer().not_null())
                        .col(ColumnDef::new(TrackingEvents::EventType).string().not_null())
                        .col(ColumnDef::new(TrackingEvents::EventDescription).text().null())
                        .col(ColumnDef::new(TrackingEvents::Location).string().null())
                        .col(ColumnDef::new(TrackingEvents::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(TrackingEvents::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_tracking_events_shipment_id")
                                .from(TrackingEvents::Table, TrackingEvents::ShipmentId)
                                .to(Shipments::Table, Shipments::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One row per position: concurrent appends to the same shipment conflict here.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tracking_events_shipment_sequence")
                        .table(TrackingEvents::Table)
                        .col(TrackingEvents::ShipmentId)
                        .col(TrackingEvents::Sequence)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TrackingEventPayments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TrackingEventPayments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TrackingEventPayments::TrackingEventId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(TrackingEventPayments::Amount)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TrackingEventPayments::PaymentMethods)
                                .text()
                                .not_null()
                                .default("[]"),
                        )
                        .col(
                            ColumnDef::new(TrackingEventPayments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_tracking_event_payments_event_id")
                                .from(
                                    TrackingEventPayments::Table,
                                    TrackingEventPayments::TrackingEventId,
                                )
                                .to(TrackingEvents::Table, TrackingEvents::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TrackingEventPayments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TrackingEvents::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum TrackingEvents {
        Table,
        Id,
        ShipmentId,
        Sequence,
        EventType,
        EventDescription,
        Location,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum TrackingEventPayments {
        Table,
        Id,
        TrackingEventId,
        Amount,
        PaymentMethods,
        CreatedAt,
    }
}

mod m20240301_000004_create_payment_options_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_payment_options_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PaymentOptions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentOptions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentOptions::MethodType).string().not_null())
                        .col(ColumnDef::new(PaymentOptions::DisplayName).string().not_null())
                        .col(ColumnDef::new(PaymentOptions::Details).text().not_null())
                        .col(
                            ColumnDef::new(PaymentOptions::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(PaymentOptions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentOptions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PaymentOptions {
        Table,
        Id,
        MethodType,
        DisplayName,
        Details,
        IsActive,
        CreatedAt,
    }
}

mod m20240301_000005_create_quotes_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_quotes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Quotes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Quotes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Quotes::OriginCity).string().not_null())
                        .col(ColumnDef::new(Quotes::OriginCountry).string().not_null())
                        .col(ColumnDef::new(Quotes::DestinationCity).string().not_null())
                        .col(ColumnDef::new(Quotes::DestinationCountry).string().not_null())
                        .col(ColumnDef::new(Quotes::PackageType).string().not_null())
                        .col(ColumnDef::new(Quotes::WeightKg).decimal_len(10, 3).not_null())
                        .col(ColumnDef::new(Quotes::LengthCm).decimal_len(10, 2).null())
                        .col(ColumnDef::new(Quotes::WidthCm).decimal_len(10, 2).null())
                        .col(ColumnDef::new(Quotes::HeightCm).decimal_len(10, 2).null())
                        .col(
                            ColumnDef::new(Quotes::DeclaredValue)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Quotes::ServiceType).string().not_null())
                        .col(
                            ColumnDef::new(Quotes::SignatureRequired)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Quotes::InsuranceRequired)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Quotes::BaseCost).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Quotes::EstimatedCost)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotes::EstimatedDeliveryDays)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Quotes::ContactEmail).string().not_null())
                        .col(ColumnDef::new(Quotes::ContactName).string().null())
                        .col(
                            ColumnDef::new(Quotes::Status)
                                .string()
                                .not_null()
                                .default("quoted"),
                        )
                        .col(
                            ColumnDef::new(Quotes::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotes::CreatedAt)
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
                        .name("idx_quotes_created_at")
                        .table(Quotes::Table)
                        .col(Quotes::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Quotes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Quotes {
        Table,
        Id,
        OriginCity,
        OriginCountry,
        DestinationCity,
        DestinationCountry,
        PackageType,
        WeightKg,
        LengthCm,
        WidthCm,
        HeightCm,
        DeclaredValue,
        ServiceType,
        SignatureRequired,
        InsuranceRequired,
        BaseCost,
        EstimatedCost,
        EstimatedDeliveryDays,
        ContactEmail,
        ContactName,
        Status,
        ExpiresAt,
        CreatedAt,
    }
}

mod m20240301_000006_create_payment_proofs_table {
    use super::m20240301_000002_create_shipments_table::Shipments;
    use super::m20240301_000003_create_tracking_events_table::TrackingEvents;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_payment_proofs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PaymentProofs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentProofs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentProofs::ShipmentId).uuid().not_null())
                        .col(
                            ColumnDef::new(PaymentProofs::TrackingEventId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentProofs::PayerEmail).string().not_null())
                        .col(
                            ColumnDef::new(PaymentProofs::PaymentMethod)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentProofs::Amount).decimal_len(12, 2).null())
                        .col(ColumnDef::new(PaymentProofs::Reference).string().not_null())
                        .col(ColumnDef::new(PaymentProofs::Note).text().null())
                        .col(
                            ColumnDef::new(PaymentProofs::Status)
                                .string()
                                .not_null()
                                .default("pending_review"),
                        )
                        .col(
                            ColumnDef::new(PaymentProofs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentProofs::ReviewedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(PaymentProofs::ReviewedBy).uuid().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payment_proofs_shipment_id")
                                .from(PaymentProofs::Table, PaymentProofs::ShipmentId)
                                .to(Shipments::Table, Shipments::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payment_proofs_tracking_event_id")
                                .from(PaymentProofs::Table, PaymentProofs::TrackingEventId)
                                .to(TrackingEvents::Table, TrackingEvents::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_proofs_status")
                        .table(PaymentProofs::Table)
                        .col(PaymentProofs::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentProofs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PaymentProofs {
        Table,
        Id,
        ShipmentId,
        TrackingEventId,
        PayerEmail,
        PaymentMethod,
        Amount,
        Reference,
        Note,
        Status,
        CreatedAt,
        ReviewedAt,
        ReviewedBy,
    }
}
