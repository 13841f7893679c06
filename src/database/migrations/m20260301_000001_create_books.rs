use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Books::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Books::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Books::Title).string().not_null())
                    .col(ColumnDef::new(Books::Author).string().not_null())
                    .col(ColumnDef::new(Books::Publisher).string().not_null())
                    .col(
                        ColumnDef::new(Books::FirstPublishYear)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Books::ImageFile).string())
                    .col(self.create_timestamp_column(manager, Books::CreatedAt))
                    .col(self.create_timestamp_column(manager, Books::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_books_author")
                    .table(Books::Table)
                    .col(Books::Author)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_books_title")
                    .table(Books::Table)
                    .col(Books::Title)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Books::Table).to_owned())
            .await
    }
}

impl Migration {
    // Timestamps are native on PostgreSQL and TEXT on SQLite
    fn create_timestamp_column(&self, manager: &SchemaManager, column: impl IntoIden) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.timestamp_with_time_zone().not_null(),
            _ => col.string().not_null(),
        };
        col
    }
}

#[derive(DeriveIden)]
enum Books {
    Table,
    Id,
    Title,
    Author,
    Publisher,
    FirstPublishYear,
    ImageFile,
    CreatedAt,
    UpdatedAt,
}
