use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Company {
    Table,
    Id,
    Name,
    Domain,
    Industry,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Contact {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Phone,
    CompanyId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Deal {
    Table,
    Id,
    Title,
    Amount,
    Stage,
    CompanyId,
    ContactId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DealStageEnum {
    #[sea_orm(iden = "deal_stage")]
    Table,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

const DEAL_STAGE_VALUES: &[&str] = &[
    "LEAD",
    "QUALIFIED",
    "NEGOTIATION",
    "CLOSED_WON",
    "CLOSED_LOST",
];

fn timestamp_col<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::cust("now()"))
        .to_owned()
}

fn uuid_pk<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .uuid()
        .not_null()
        .primary_key()
        .default(Expr::cust("gen_random_uuid()"))
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let create_enum_sql = format!(
            "DO $$ BEGIN IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = 'deal_stage') THEN CREATE TYPE deal_stage AS ENUM ({}); END IF; END $$;",
            DEAL_STAGE_VALUES
                .iter()
                .map(|v| format!("'{}'", v))
                .collect::<Vec<_>>()
                .join(", ")
        );
        manager
            .get_connection()
            .execute_unprepared(&create_enum_sql)
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Company::Table)
                    .if_not_exists()
                    .col(&mut uuid_pk(Company::Id))
                    .col(ColumnDef::new(Company::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Company::Domain).string_len(256))
                    .col(ColumnDef::new(Company::Industry).string_len(128))
                    .col(&mut timestamp_col(Company::CreatedAt))
                    .col(&mut timestamp_col(Company::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_company_name")
                    .table(Company::Table)
                    .col(Company::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Contact::Table)
                    .if_not_exists()
                    .col(&mut uuid_pk(Contact::Id))
                    .col(ColumnDef::new(Contact::FirstName).string_len(128).not_null())
                    .col(ColumnDef::new(Contact::LastName).string_len(128).not_null())
                    .col(ColumnDef::new(Contact::Email).string_len(320).not_null())
                    .col(ColumnDef::new(Contact::Phone).string_len(64))
                    .col(ColumnDef::new(Contact::CompanyId).uuid())
                    .col(&mut timestamp_col(Contact::CreatedAt))
                    .col(&mut timestamp_col(Contact::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contact_company")
                            .from(Contact::Table, Contact::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_contact_email")
                    .table(Contact::Table)
                    .col(Contact::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Deal::Table)
                    .if_not_exists()
                    .col(&mut uuid_pk(Deal::Id))
                    .col(ColumnDef::new(Deal::Title).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Deal::Amount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Deal::Stage)
                            .custom(DealStageEnum::Table)
                            .not_null()
                            .default(Expr::cust("'LEAD'::deal_stage")),
                    )
                    .col(ColumnDef::new(Deal::CompanyId).uuid())
                    .col(ColumnDef::new(Deal::ContactId).uuid())
                    .col(&mut timestamp_col(Deal::CreatedAt))
                    .col(&mut timestamp_col(Deal::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_company")
                            .from(Deal::Table, Deal::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_contact")
                            .from(Deal::Table, Deal::ContactId)
                            .to(Contact::Table, Contact::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_deal_company", Deal::CompanyId),
            ("idx_deal_contact", Deal::ContactId),
            ("idx_deal_stage", Deal::Stage),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Deal::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Deal::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contact::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Company::Table).if_exists().to_owned())
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS deal_stage;")
            .await?;
        Ok(())
    }
}
