use sea_orm_migration::prelude::*;

const UP_SQL: &str = r#"
ALTER TABLE deal DROP CONSTRAINT IF EXISTS deal_amount_non_negative;
ALTER TABLE deal ADD CONSTRAINT deal_amount_non_negative CHECK (amount >= 0);
CREATE INDEX IF NOT EXISTS idx_deal_created_at ON deal (created_at DESC);
"#;

const DOWN_SQL: &str = r#"
DROP INDEX IF EXISTS idx_deal_created_at;
ALTER TABLE deal DROP CONSTRAINT IF EXISTS deal_amount_non_negative;
"#;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(UP_SQL)
            .await
            .map(|_| ())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await
            .map(|_| ())
    }
}
