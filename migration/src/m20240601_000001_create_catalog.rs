use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_auto(Categories::Id))
                    .col(string_len(Categories::Name, 150))
                    .col(text_null(Categories::Description))
                    .col(string_len_uniq(Categories::Url, 160))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genres::Table)
                    .if_not_exists()
                    .col(pk_auto(Genres::Id))
                    .col(string_len(Genres::Name, 100))
                    .col(text(Genres::Description))
                    .col(string_len_uniq(Genres::Url, 160))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Actors::Table)
                    .if_not_exists()
                    .col(pk_auto(Actors::Id))
                    .col(string_len(Actors::Name, 100))
                    .col(integer(Actors::Age).default(0))
                    .col(text(Actors::Description))
                    .col(string(Actors::Image))
                    .check(Expr::col(Actors::Age).gte(0))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Actors::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Categories::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Categories {
    Table,
    Id,
    Name,
    Description,
    Url,
}

#[derive(DeriveIden)]
pub enum Genres {
    Table,
    Id,
    Name,
    Description,
    Url,
}

#[derive(DeriveIden)]
pub enum Actors {
    Table,
    Id,
    Name,
    Age,
    Description,
    Image,
}
