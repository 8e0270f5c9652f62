use sea_orm::DatabaseConnection;
use tracing::info;

/// Creates or alters tables to match the entities under `db::entities`.
/// Runs at startup or through the `migrate` subcommand, never per request.
pub async fn sync_schema(db: &DatabaseConnection) -> anyhow::Result<()> {
    info!("syncing database schema from entities");
    db.get_schema_registry("loyalty_vault::db::entities::*")
        .sync(db)
        .await?;
    Ok(())
}
