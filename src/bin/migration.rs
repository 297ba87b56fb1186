use fleetmatch_api::{config, db};
use migrations::Migrator;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info};

const USAGE: &str = "usage: migration [up|down|fresh|status]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let pool = db::establish_connection_from_app_config(&cfg).await?;

    info!("Running migration command '{}'", command);
    let result = match command.as_str() {
        "up" => Migrator::up(&pool, None).await,
        // rolls back the most recent migration only
        "down" => Migrator::down(&pool, Some(1)).await,
        "fresh" => Migrator::fresh(&pool).await,
        "status" => Migrator::status(&pool).await,
        other => {
            error!("Unknown migration command '{}'", other);
            anyhow::bail!("{}", USAGE);
        }
    };

    if let Err(e) = result {
        error!("Migration command '{}' failed: {}", command, e);
        return Err(e.into());
    }

    info!("Migration command '{}' completed", command);
    Ok(())
}
