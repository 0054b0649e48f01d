//! Scripted session against the to-do store.
//!
//! Run with `--metrics` to print the Prometheus text output at the end.

use statecraft_runtime::metrics::MetricsExporter;
use statecraft_runtime::StoreConfig;
use std::sync::Arc;
use std::time::Duration;
use todo::{add_item, open_store, refresh, selectors, InMemoryDataSource, TodoAction, TodoEnvironment, TodoState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_items(state: &TodoState) {
    for item in &state.items {
        let status = if item.done { "✓" } else { " " };
        println!("  [{status}] {} ({})", item.title, item.id);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo=info,statecraft_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let exporter = if std::env::args().any(|arg| arg == "--metrics") {
        let mut exporter = MetricsExporter::new();
        exporter.install()?;
        Some(exporter)
    } else {
        None
    };

    println!("=== Todo Session ===\n");

    let source = Arc::new(InMemoryDataSource::default().with_latency(Duration::from_millis(50)));
    let env = TodoEnvironment::new(source);
    let store = open_store(env, StoreConfig::default()).await?;

    store
        .subscribe(selectors::incomplete_count, |left| println!("  -> {left} item(s) left"))
        .detach();

    println!("Loading items...");
    store.ready().await;
    print_items(&store.snapshot());

    println!("\nAdding items...");
    let dog = add_item(&store, "Walk dog").await?;
    let docs = add_item(&store, "Write docs").await?;
    print_items(&store.snapshot());

    println!("\nAdding an item without a title...");
    if let Err(error) = add_item(&store, "  ").await {
        println!("  rejected: {error}");
    }

    println!("\nFinishing 'Walk dog' and removing 'Write docs'...");
    store.send(TodoAction::ToggleDone { id: dog }).await?;
    store.send(TodoAction::Delete { id: docs }).await?;
    print_items(&store.snapshot());

    println!("\nRefreshing...");
    let total = refresh(&store, Duration::from_secs(5)).await?;
    println!("  {total} item(s) after refresh");

    println!("\nLogging out...");
    store.send(TodoAction::Logout).await?;

    println!("\nFinal state:");
    println!("{}", serde_json::to_string_pretty(&*store.snapshot())?);

    store.close().await?;

    if let Some(text) = exporter.as_ref().and_then(MetricsExporter::render) {
        println!("\n=== Metrics ===\n{text}");
    }

    println!("\n=== Session Complete ===");
    Ok(())
}
