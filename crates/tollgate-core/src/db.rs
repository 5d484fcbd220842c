use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;

use crate::config::AuthConfig;
use crate::migrations::Migrator;

/// Initialize the database connection from config.
pub async fn connect(config: &AuthConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opts = ConnectOptions::new(&config.database_url);
    opts.max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(config.is_dev());

    SeaDatabase::connect(opts).await
}

/// Connect and bring the schema up to date.
pub async fn connect_and_migrate(config: &AuthConfig) -> Result<DatabaseConnection, DbErr> {
    let db = connect(config).await?;

    tracing::info!("Running pending database migrations...");
    Migrator::up(&db, None).await?;
    tracing::info!("Migrations complete.");

    Ok(db)
}
