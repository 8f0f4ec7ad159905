//! TabSync demo: two simulated browsers sharing an in-memory document store.
//!
//! Walks through snapshot mirroring, remote tab close, send-tab and device
//! takeover, printing what each device sees.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tabsync::app::App;
use tabsync::database::connection::Database;
use tabsync::managers::tab_manager::{TabManager, TabManagerTrait};
use tabsync::store::memory::MemoryStore;
use tabsync::store::DocumentStore;
use tabsync::types::config::StoreConfig;
use tabsync::types::device::short_device_id;
use tabsync::types::errors::StoreError;
use tabsync::types::settings::SyncSettings;
use tracing_subscriber::EnvFilter;

const DEMO_CONFIG: &str = r#"{"apiKey":"demo-key","projectId":"tabsync-demo"}"#;

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

/// Lets debounce windows elapse and queued commands drain.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(400)).await;
}

async fn device(
    store: &Arc<MemoryStore>,
    settings: &SyncSettings,
) -> Result<(App, Arc<TabManager>), Box<dyn Error>> {
    let db = Arc::new(Database::open_in_memory()?);
    let tabs = Arc::new(TabManager::new());
    let shared = Arc::clone(store);
    let factory = move |_: &StoreConfig| -> Result<Arc<dyn DocumentStore>, StoreError> {
        Ok(shared.clone() as Arc<dyn DocumentStore>)
    };
    let mut app = App::new(db, tabs.clone(), Box::new(factory), settings.clone());
    app.configure(DEMO_CONFIG).await?;
    Ok((app, tabs))
}

async fn print_devices(viewer: &App) -> Result<(), Box<dyn Error>> {
    for device in viewer.list_devices().await? {
        let short_id = short_device_id(&device.device_id);
        println!(
            "  • {} ({}…): {} tab(s)",
            device.device.device_name, short_id, device.device.tab_count
        );
        for tab in &device.device.tabs {
            println!("      [{}] {}", tab.id, tab.url);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tabsync=warn")))
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 TabSync v{} - Demo Mode                   ║", env!("CARGO_PKG_VERSION"));
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let store = Arc::new(MemoryStore::new());
    let settings = SyncSettings {
        debounce_ms: 100,
        ..SyncSettings::default()
    };

    section("Setup");
    let (mut laptop, laptop_tabs) = device(&store, &settings).await?;
    let (mut desktop, desktop_tabs) = device(&store, &settings).await?;
    let laptop_id = laptop.register_device(Some("Laptop".into())).await?;
    let desktop_id = desktop.register_device(Some("Desktop".into())).await?;
    println!("  Laptop state: {:?}", laptop.status()?);
    println!("  Desktop state: {:?}", desktop.status()?);
    println!();

    section("Snapshot mirroring");
    laptop_tabs.open_tab("https://docs.rs", true);
    let news = laptop_tabs.open_tab("https://news.ycombinator.com", false);
    laptop_tabs.open_tab("https://crates.io", false);
    settle().await;
    print_devices(&desktop).await?;
    println!();

    section("Remote close");
    desktop.close_remote_tab(&laptop_id, news.id).await?;
    settle().await;
    println!("  Laptop now has {} tab(s)", laptop_tabs.tab_count());
    print_devices(&desktop).await?;
    println!();

    section("Send tab");
    laptop
        .send_tab(&desktop_id, "https://blog.rust-lang.org", Some("Rust Blog".into()), true)
        .await?;
    settle().await;
    for tab in desktop_tabs.get_all_tabs() {
        println!("  Desktop tab [{}] {} (active: {})", tab.id, tab.url, tab.active);
    }
    println!();

    section("Device takeover");
    laptop.shutdown();
    let (mut reinstalled, reinstalled_tabs) = device(&store, &settings).await?;
    reinstalled_tabs.open_tab("https://github.com", true);
    reinstalled.select_device(&laptop_id).await?;
    settle().await;
    print_devices(&desktop).await?;
    println!();

    reinstalled.shutdown();
    desktop.shutdown();

    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ Demo complete");
    println!("═══════════════════════════════════════════════════════════════");
    Ok(())
}
