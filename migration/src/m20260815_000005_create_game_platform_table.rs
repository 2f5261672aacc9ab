use sea_orm_migration::prelude::*;

/// Creates the `game_platform` association table. The composite primary key
/// rules out duplicate platform rows for a game.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum GamePlatform {
    Table,
    GameId,
    PlatformId,
}

#[derive(DeriveIden)]
enum Game {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Platform {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GamePlatform::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GamePlatform::GameId).integer().not_null())
                    .col(
                        ColumnDef::new(GamePlatform::PlatformId)
                            .integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_game_platform")
                            .col(GamePlatform::GameId)
                            .col(GamePlatform::PlatformId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_platform_game_id")
                            .from(GamePlatform::Table, GamePlatform::GameId)
                            .to(Game::Table, Game::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_platform_platform_id")
                            .from(GamePlatform::Table, GamePlatform::PlatformId)
                            .to(Platform::Table, Platform::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GamePlatform::Table).to_owned())
            .await
    }
}
