use sea_orm_migration::{prelude::*, schema::*};

use super::m20240601_000002_create_movies::Movies;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MovieShots::Table)
                    .if_not_exists()
                    .col(pk_auto(MovieShots::Id))
                    .col(string_len(MovieShots::Title, 100))
                    .col(text(MovieShots::Description))
                    .col(string(MovieShots::Image))
                    .col(integer(MovieShots::MovieId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_shots_movie_id")
                            .from(MovieShots::Table, MovieShots::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MovieShots::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum MovieShots {
    Table,
    Id,
    Title,
    Description,
    Image,
    MovieId,
}
