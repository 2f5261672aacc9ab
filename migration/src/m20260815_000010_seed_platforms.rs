use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[rustfmt::skip]
const PLATFORMS: &[(i32, &str)] = &[
    (1, "PC"),
    (2, "macOS"),
    (3, "Linux"),
    (4, "PlayStation 5"),
    (5, "Xbox Series X"),
    (6, "Nintendo Switch"),
    (7, "iOS"),
    (8, "Android"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = manager.get_database_backend();

        for (id, name) in PLATFORMS {
            let sql = if backend == sea_orm::DatabaseBackend::Postgres {
                format!(
                    "INSERT INTO platform (id, name) VALUES ({id}, '{name}') \
                     ON CONFLICT (id) DO NOTHING"
                )
            } else {
                format!("INSERT OR IGNORE INTO platform (id, name) VALUES ({id}, '{name}')")
            };
            db.execute(sea_orm::Statement::from_string(backend, sql))
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(PlatformIden::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PlatformIden {
    #[sea_orm(iden = "platform")]
    Table,
}
