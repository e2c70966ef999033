use std::env;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use promptrelay::models::QueueItem;
use promptrelay::monitor::{MonitorConfig, ResiliencyMonitor};
use promptrelay::notify::{HttpNotifier, LogNotifier, Notifier};
use promptrelay::scheduler::SchedulerClient;
use promptrelay::settings::SettingsClient;
use promptrelay::sites::SiteRegistry;
use promptrelay::surface::cdp::CdpSurface;
use promptrelay::surface::chrome::{connect_or_launch, open_site, ChromeOptions};
use promptrelay::surface::Surface;

const DEFAULT_SETTINGS_PATH: &str = "relay_settings.json";
const DEFAULT_DATA_DIR: &str = "./relay_data";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let site = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| "chatgpt".to_string());
    let headless = args.contains(&"--headless".to_string());

    let settings_path =
        env::var("RELAY_SETTINGS").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
    let settings = SettingsClient::spawn(&settings_path);

    let notifier: Arc<dyn Notifier> = match env::var("RELAY_NOTIFY_ENDPOINT") {
        Ok(endpoint) => Arc::new(HttpNotifier::new(&endpoint, "relay")),
        Err(_) => Arc::new(LogNotifier),
    };

    let registry = Arc::new(SiteRegistry::builtin(settings.clone()));
    let handler = registry
        .get(&site)
        .ok_or_else(|| format!("unknown site '{}', expected one of {:?}", site, registry.sites()))?;

    // One dedicated debug port per site keeps profiles isolated when both
    // surfaces are driven from the same machine.
    let debug_port = match site.as_str() {
        "claude" => 9223,
        _ => 9222,
    };
    let options = ChromeOptions {
        debug_port,
        user_data_dir: format!("{}/{}", DEFAULT_DATA_DIR, site),
        headless,
    };

    let browser = connect_or_launch(&options).await?;
    let page = open_site(&browser, &handler.profile().base_url).await?;
    let surface: Arc<dyn Surface> = Arc::new(CdpSurface::new(page));

    handler.inject_controls(surface.as_ref()).await?;
    let monitor = ResiliencyMonitor::new(MonitorConfig::default());
    monitor.start(surface.clone(), handler.clone());

    let scheduler = SchedulerClient::spawn(
        surface.clone(),
        registry.clone(),
        &site,
        settings.clone(),
        notifier.clone(),
    );

    let auto_send = settings.auto_send_enabled().await;
    info!(
        "relay ready on {} (auto-send {}). Lines are enqueued; :start :pause :reset :drop N :status :quit",
        site,
        if auto_send { "on" } else { "off" }
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        match line.as_str() {
            ":quit" => break,
            ":start" => scheduler.start().await,
            ":pause" => scheduler.pause().await,
            ":reset" => scheduler.reset().await,
            ":status" => {
                let snap = scheduler.snapshot().await;
                info!(
                    "{} queued, {}",
                    snap.items.len(),
                    if snap.running { "running" } else { "idle" }
                );
                for (i, item) in snap.items.iter().enumerate() {
                    info!("  [{}] {} {}", i, item.glyph, item.preview);
                }
            }
            other if other.starts_with(":drop ") => {
                match other[6..].trim().parse::<usize>() {
                    Ok(index) => scheduler.dequeue(index).await,
                    Err(_) => warn!("usage: :drop <index>"),
                }
            }
            payload => {
                let glyph = payload.chars().next().unwrap_or('●').to_string();
                let item = QueueItem {
                    text: payload.to_string(),
                    glyph,
                    auto_send,
                };
                if let Err(e) = scheduler.enqueue(item).await {
                    warn!("{}", e);
                }
            }
        }
    }

    monitor.stop();
    info!("relay shutting down");
    Ok(())
}
