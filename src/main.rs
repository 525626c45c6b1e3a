use sqlx::postgres::PgPoolOptions;
use stack_sampling::config::Config;
use stack_sampling::db::Repository;
use stack_sampling::reconcile;
use stack_sampling::service::SamplingService;
use stack_sampling::submission::SessionInput;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,stack_sampling=debug,sqlx=warn")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load("config/config.yaml").map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration: {}\n\n\
             Make sure:\n\
             1. config/config.yaml exists\n\
             2. All required environment variables are set (check .env.example)\n\
             3. Create a .env file if needed",
            e
        )
    })?;
    info!("Configuration loaded");

    let connection_string = config.database.connection_string();
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&connection_string)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to connect to database: {}\n\n\
                 Host: {}:{}\n\
                 Database: {}\n\
                 User: {}",
                e,
                config.database.host,
                config.database.port,
                config.database.name,
                config.database.user
            )
        })?;

    info!(
        "Connected to database: {}@{}:{}/{}",
        config.database.user, config.database.host, config.database.port, config.database.name
    );

    let repository = Repository::new(pool);
    repository.run_migrations().await?;

    let service = SamplingService::from_config(repository, &config);

    let submissions: Vec<String> = std::env::args().skip(1).collect();
    if submissions.is_empty() {
        return list_sessions(&service).await;
    }

    let mut failures = 0;
    for path in &submissions {
        let input = match SessionInput::load(path) {
            Ok(input) => input,
            Err(e) => {
                error!("Skipping {}: {}", path, e);
                failures += 1;
                continue;
            }
        };

        if let Err(e) = service.save_submission(&input).await {
            error!("Session {} from {} was not saved: {}", input.session_id, path, e);
            failures += 1;
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} submissions failed", failures, submissions.len());
    }

    Ok(())
}

async fn list_sessions(service: &SamplingService<Repository>) -> anyhow::Result<()> {
    let records = service.load_all().await?;
    let ids = reconcile::session_ids(&records);

    info!("{} stored sessions", ids.len());
    for id in ids {
        let rows = reconcile::session_rows(&records, &id);
        let draws = rows
            .iter()
            .map(|r| r.draw_number)
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        let mut parameters: Vec<String> = Vec::new();
        for row in &rows {
            let name = row.parameter().to_string();
            if !parameters.contains(&name) {
                parameters.push(name);
            }
        }
        info!(
            "{}: {} draws, {} rows ({})",
            id,
            draws,
            rows.len(),
            parameters.join(", ")
        );
    }

    Ok(())
}
