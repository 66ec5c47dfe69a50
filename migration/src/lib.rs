pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_catalog;
mod m20240601_000002_create_movies;
mod m20240601_000003_create_movie_links;
mod m20240601_000004_create_movie_shots;
mod m20240601_000005_create_ratings;
mod m20240601_000006_create_reviews;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_catalog::Migration),
            Box::new(m20240601_000002_create_movies::Migration),
            Box::new(m20240601_000003_create_movie_links::Migration),
            Box::new(m20240601_000004_create_movie_shots::Migration),
            Box::new(m20240601_000005_create_ratings::Migration),
            Box::new(m20240601_000006_create_reviews::Migration),
        ]
    }
}
