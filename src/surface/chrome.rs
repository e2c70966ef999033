//! Browser bootstrap: attach to an already-running Chrome on its debug port
//! when one is there, otherwise launch a fresh instance with an isolated
//! profile directory.

use std::path::PathBuf;

use chromiumoxide::browser::HeadlessMode;
use chromiumoxide::handler::Handler;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tracing::{info, warn};

use crate::error::SurfaceError;

pub struct ChromeOptions {
    pub debug_port: u16,
    pub user_data_dir: String,
    pub headless: bool,
}

pub async fn connect_or_launch(opts: &ChromeOptions) -> Result<Browser, SurfaceError> {
    let (browser, mut handler) = match try_connect(opts.debug_port).await {
        Some(pair) => pair,
        None => {
            info!(
                "no debugger at port {}, launching chrome ({})",
                opts.debug_port, opts.user_data_dir
            );
            clear_stale_lock(&opts.user_data_dir);
            Browser::launch(browser_config(opts)?)
                .await
                .map_err(|e| SurfaceError::Connection(e.to_string()))?
        }
    };

    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                warn!("browser handler ended: {}", e);
                break;
            }
        }
    });

    Ok(browser)
}

/// Reuse an open tab already on the site before paying for a new one.
pub async fn open_site(browser: &Browser, base_url: &str) -> Result<Page, SurfaceError> {
    let host = base_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');

    let pages = browser
        .pages()
        .await
        .map_err(|e| SurfaceError::Connection(e.to_string()))?;
    for page in &pages {
        if let Ok(Some(url)) = page.url().await {
            if url.contains(host) {
                info!("attaching to existing tab at {}", url);
                page.activate()
                    .await
                    .map_err(|e| SurfaceError::Connection(e.to_string()))?;
                return Ok(page.clone());
            }
        }
    }

    info!("opening new tab at {}", base_url);
    browser
        .new_page(base_url)
        .await
        .map_err(|e| SurfaceError::Connection(e.to_string()))
}

async fn try_connect(port: u16) -> Option<(Browser, Handler)> {
    let version_url = format!("http://127.0.0.1:{}/json/version", port);
    let resp = reqwest::get(&version_url).await.ok()?;
    let json = resp.json::<serde_json::Value>().await.ok()?;
    let ws_url = json.get("webSocketDebuggerUrl")?.as_str()?;
    info!("found existing chrome at port {}, connecting", port);
    Browser::connect(ws_url).await.ok()
}

fn browser_config(opts: &ChromeOptions) -> Result<BrowserConfig, SurfaceError> {
    let headless = if opts.headless {
        HeadlessMode::New
    } else {
        HeadlessMode::False
    };
    let port_arg = format!("--remote-debugging-port={}", opts.debug_port);
    BrowserConfig::builder()
        .user_data_dir(PathBuf::from(&opts.user_data_dir))
        .headless_mode(headless)
        .disable_default_args()
        .arg("--no-first-run")
        .arg("--password-store=basic")
        .arg("--use-mock-keychain")
        .arg("--no-default-browser-check")
        .arg("--disable-session-crashed-bubble")
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--no-sandbox")
        .arg("--disable-infobars")
        .arg("--disable-component-update")
        .arg(&port_arg)
        .window_size(1280, 800)
        .build()
        .map_err(SurfaceError::Connection)
}

/// Chrome refuses to start over a profile whose previous owner died without
/// releasing its singleton lock.
fn clear_stale_lock(data_dir: &str) {
    let lock_path = format!("{}/SingletonLock", data_dir);
    if std::path::Path::new(&lock_path).exists() {
        info!("clearing stale browser lock at {}", lock_path);
        let _ = std::fs::remove_file(lock_path);
    }
}
