use anyhow::Result;
use backpacks::commands::SharedBackpacks;
use backpacks::item::ItemCatalog;
use backpacks::network::{self, ChannelPanel, Writers};
use backpacks::permissions::PermissionTable;
use backpacks::storage::FileBackpackRepository;
use backpacks::{Backpacks, Config};
use std::sync::Arc;
use tokio::sync::Mutex;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;
    let repository = FileBackpackRepository::new(&config.data_dir)?;
    let writers = Writers::default();
    let addr = config.bind_addr.clone();

    let backpacks = Backpacks::new(
        config,
        Box::new(repository),
        Box::new(ItemCatalog::with_defaults()),
        Box::new(ChannelPanel::new(Arc::clone(&writers))),
        Box::new(PermissionTable::new()),
    )?;
    let state: SharedBackpacks = Arc::new(Mutex::new(backpacks));

    network::start_server(&addr, state, writers).await?;
    Ok(())
}
