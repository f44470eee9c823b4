use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use router_engine::config::Config;
use router_engine::module::Registry;
use router_engine::routes::{codec, parser};
use router_engine::{RouterResult, RouteService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // Initialize logging; RUST_LOG directives refine the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(config.log_level).into())
                .from_env_lossy(),
        )
        .init();
    tracing::info!("Router engine starting...");
    if let Some(path) = &config.config_path {
        tracing::info!("Loaded configuration from: {}", path.display());
    }

    let service = Arc::new(RouteService::new());
    let mut registry = Registry::new();
    registry.register(service.clone());
    registry.run()?;

    if let Err(e) = seed_table(&service, &config) {
        tracing::error!("Failed to load routes: {}", e);
        registry.shutdown();
        return Err(e.into());
    }

    for address in &config.lookups {
        resolve(&service, address);
    }

    if config.dump {
        let routes = service.get_all_routes()?;
        println!("{}", serde_json::to_string_pretty(&routes)?);
    }

    if !config.once {
        tracing::info!("Routing table ready, press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown requested");
    }

    registry.shutdown();
    Ok(())
}

/// Install configured static routes and any imported routes
fn seed_table(service: &RouteService, config: &Config) -> RouterResult<()> {
    let mut static_routes = Vec::with_capacity(config.routes.len());
    for route in &config.routes {
        match route.to_entry() {
            Ok(entry) => static_routes.push(entry),
            Err(e) => tracing::error!("Skipping static route {}: {}", route.destination, e),
        }
    }
    let ids = service.add_routes(static_routes)?;
    tracing::info!("Installed {} static route(s)", ids.len());

    if let Some(path) = &config.import_file {
        let routes = parser::load_route_dump(path)?;
        tracing::info!("Importing {} route(s) from {}", routes.len(), path.display());
        service.add_routes(routes)?;
    }

    if config.import_kernel {
        match parser::get_kernel_routes() {
            Ok(routes) => {
                tracing::info!("Importing {} kernel route(s)", routes.len());
                service.add_routes(routes)?;
            }
            Err(e) => tracing::warn!("Kernel route import failed: {}", e),
        }
    }

    tracing::info!("Routing table holds {} route(s)", service.table()?.len());
    Ok(())
}

fn resolve(service: &RouteService, address: &str) {
    let destination = match codec::parse_dotted(address) {
        Ok(bits) => codec::decode(bits),
        Err(e) => {
            tracing::warn!("Cannot resolve {}: {}", address, e);
            println!("{}: {}", address, e.user_message());
            return;
        }
    };

    match service.default_lookup(destination) {
        Ok(route) => println!("{} -> {}", destination, route),
        Err(e) => {
            tracing::warn!("Lookup for {} failed: {}", destination, e);
            println!("{}: {}", destination, e.user_message());
        }
    }
}
