use sea_orm_migration::{prelude::*, schema::*};

use super::m20240601_000001_create_catalog::Categories;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(string_len(Movies::Title, 100))
                    .col(string_len(Movies::Tagline, 100).default(""))
                    .col(text(Movies::Description))
                    .col(string(Movies::Poster))
                    .col(integer(Movies::Year).default(2020))
                    .col(string_len(Movies::Country, 30))
                    .col(string_len_null(Movies::WorldPremiere, 10))
                    .col(big_integer(Movies::Budget).default(0))
                    .col(big_integer(Movies::FeesInUsa).default(0))
                    .col(big_integer(Movies::FeesInWorld).default(0))
                    .col(integer_null(Movies::CategoryId))
                    .col(string_len_uniq(Movies::Url, 130))
                    .col(boolean(Movies::Draft).default(false))
                    .check(Expr::col(Movies::Year).gte(0))
                    .check(Expr::col(Movies::Budget).gte(0))
                    .check(Expr::col(Movies::FeesInUsa).gte(0))
                    .check(Expr::col(Movies::FeesInWorld).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movies_category_id")
                            .from(Movies::Table, Movies::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_draft")
                    .table(Movies::Table)
                    .col(Movies::Draft)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Movies {
    Table,
    Id,
    Title,
    Tagline,
    Description,
    Poster,
    Year,
    Country,
    WorldPremiere,
    Budget,
    FeesInUsa,
    FeesInWorld,
    CategoryId,
    Url,
    Draft,
}
