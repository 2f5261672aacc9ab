use sea_orm_migration::prelude::*;

/// Creates the `wishlist` association table.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Wishlist {
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
                    .table(Wishlist::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Wishlist::GameId).integer().not_null())
                    .col(ColumnDef::new(Wishlist::UserId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_wishlist")
                            .col(Wishlist::GameId)
                            .col(Wishlist::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wishlist_game_id")
                            .from(Wishlist::Table, Wishlist::GameId)
                            .to(Game::Table, Game::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wishlist_user_id")
                            .from(Wishlist::Table, Wishlist::UserId)
                            .to(User::Table, User::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Wishlist::Table).to_owned())
            .await
    }
}
