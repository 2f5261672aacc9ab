use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[rustfmt::skip]
const GENRES: &[(i32, &str)] = &[
    (1,  "Action"),
    (2,  "Adventure"),
    (3,  "RPG"),
    (4,  "Strategy"),
    (5,  "Simulation"),
    (6,  "Sports"),
    (7,  "Racing"),
    (8,  "Puzzle"),
    (9,  "Horror"),
    (10, "Platformer"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = manager.get_database_backend();

        for (id, name) in GENRES {
            let sql = if backend == sea_orm::DatabaseBackend::Postgres {
                format!(
                    "INSERT INTO genre (id, name) VALUES ({id}, '{name}') \
                     ON CONFLICT (id) DO NOTHING"
                )
            } else {
                format!("INSERT OR IGNORE INTO genre (id, name) VALUES ({id}, '{name}')")
            };
            db.execute(sea_orm::Statement::from_string(backend, sql))
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(GenreIden::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GenreIden {
    #[sea_orm(iden = "genre")]
    Table,
}
