use sea_orm_migration::prelude::*;

/// Creates the `owned` association table.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Owned {
    Table,
    GameId,
    UserId,
}

#[derive(DeriveIden)]
enum Game {
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
                    .table(Owned::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Owned::GameId).integer().not_null())
                    .col(ColumnDef::new(Owned::UserId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_owned")
                            .col(Owned::GameId)
                            .col(Owned::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_owned_game_id")
                            .from(Owned::Table, Owned::GameId)
                            .to(Game::Table, Game::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_owned_user_id")
                            .from(Owned::Table, Owned::UserId)
                            .to(User::Table, User::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Owned::Table).to_owned())
            .await
    }
}
