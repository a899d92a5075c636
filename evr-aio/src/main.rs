use std::{error::Error, path::PathBuf, sync::Arc};

use clap::Parser;
use evr_core::{
    event_router::{EventRouter, EventRouterApi},
    ComponentApi,
};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Config;

mod config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,
}

struct Running {
    id: String,
    handle: JoinHandle<()>,
}

fn spawn(component: Box<dyn ComponentApi>, router: &Arc<EventRouter>) -> Running {
    let id = component.id().to_string();
    let router = Arc::clone(router);
    let handle = tokio::spawn(async move {
        if let Err(e) = component.run(router).await {
            error!("{} stopped, {e}", component.id());
        }
    });
    Running { id, handle }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = Config::from_path(&cli.config)?;
    config.sort_transformers();

    let collectors: Vec<_> = config
        .collectors
        .into_iter()
        .map(|c| c.into_component())
        .collect();
    let transformers: Vec<_> = config
        .transformers
        .into_iter()
        .map(|t| t.into_component())
        .collect();
    let dispatchers: Vec<_> = config
        .dispatchers
        .into_iter()
        .map(|d| d.into_component())
        .collect();

    let mut router = EventRouter::new();
    for component in collectors.iter().chain(&transformers).chain(&dispatchers) {
        router.register_component(component.as_ref());
    }
    let router = Arc::new(router);

    let dispatchers: Vec<_> = dispatchers.into_iter().map(|d| spawn(d, &router)).collect();
    let transformers: Vec<_> = transformers.into_iter().map(|t| spawn(t, &router)).collect();
    let collectors: Vec<_> = collectors.into_iter().map(|c| spawn(c, &router)).collect();

    drain(&router, collectors, transformers, dispatchers).await?;

    info!("all events are processed");
    Ok(())
}

/// Waits for the collectors, then closes and awaits the pipeline front to
/// back. `transformers` must already be in upstream-first order.
async fn drain(
    router: &EventRouter,
    collectors: Vec<Running>,
    transformers: Vec<Running>,
    dispatchers: Vec<Running>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    for collector in collectors {
        collector.handle.await?;
    }
    for transformer in transformers {
        router.close(&transformer.id).await?;
        transformer.handle.await?;
    }
    for dispatcher in &dispatchers {
        router.close(&dispatcher.id).await?;
    }
    for dispatcher in dispatchers {
        dispatcher.handle.await?;
    }
    Ok(())
}
