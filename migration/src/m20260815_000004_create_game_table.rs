use sea_orm_migration::prelude::*;

/// Creates the `game` table. Title uniqueness is enforced here rather than by
/// a pre-insert existence check alone, so concurrent creates cannot race past
/// each other.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Game {
    Table,
    Id,
    Title,
    Description,
    GenreId,
    Price,
    CreatorId,
    CreationDate,
    ImageFilename,
}

#[derive(DeriveIden)]
enum Genre {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Game::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Game::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Game::Title)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Game::Description).text().not_null())
                    .col(ColumnDef::new(Game::GenreId).integer().not_null())
                    .col(ColumnDef::new(Game::Price).integer().not_null())
                    .col(ColumnDef::new(Game::CreatorId).integer().not_null())
                    .col(
                        ColumnDef::new(Game::CreationDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Game::ImageFilename).string_len(64).null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_genre_id")
                            .from(Game::Table, Game::GenreId)
                            .to(Genre::Table, Genre::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_creator_id")
                            .from(Game::Table, Game::CreatorId)
                            .to(User::Table, User::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Game::Table).to_owned())
            .await
    }
}
