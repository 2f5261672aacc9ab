pub use sea_orm_migration::prelude::*;

mod m20260815_000001_create_user_table;
mod m20260815_000002_create_genre_table;
mod m20260815_000003_create_platform_table;
mod m20260815_000004_create_game_table;
mod m20260815_000005_create_game_platform_table;
mod m20260815_000006_create_game_review_table;
mod m20260815_000007_create_wishlist_table;
mod m20260815_000008_create_owned_table;
mod m20260815_000009_seed_genres;
mod m20260815_000010_seed_platforms;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260815_000001_create_user_table::Migration),
            Box::new(m20260815_000002_create_genre_table::Migration),
            Box::new(m20260815_000003_create_platform_table::Migration),
            Box::new(m20260815_000004_create_game_table::Migration),
            Box::new(m20260815_000005_create_game_platform_table::Migration),
            Box::new(m20260815_000006_create_game_review_table::Migration),
            Box::new(m20260815_000007_create_wishlist_table::Migration),
            Box::new(m20260815_000008_create_owned_table::Migration),
            Box::new(m20260815_000009_seed_genres::Migration),
            Box::new(m20260815_000010_seed_platforms::Migration),
        ]
    }
}
