use serde_json::{Map, Value};
use tracing::{error, info, warn};

use envirophat_poll::board::EnviroPhat;
use envirophat_poll::config::resolve_defaults;
use envirophat_poll::plugin::{plugin_info, PollAdapter};

/// Standalone poller: stands in for the host framework's timer so the plugin
/// can be exercised on a bench. Batches go to stdout as JSON lines; storage
/// and retry scheduling stay the host's job.
#[tokio::main]
async fn main() {
    envirophat_poll::init_tracing();

    let metadata = plugin_info();
    info!(
        "[envirophat] {} v{} starting up...",
        metadata["name"].as_str().unwrap_or_default(),
        metadata["version"].as_str().unwrap_or_default()
    );

    // Resolve the configuration category: schema defaults, then overrides
    // from the JSON file named by CONFIG_PATH ({"rgbSensor": "false", ...}).
    let mut category = resolve_defaults();
    if let Ok(path) = std::env::var("CONFIG_PATH") {
        match load_overrides(&path) {
            Ok(overrides) => {
                apply_overrides(&mut category, overrides);
                info!("[config] applied overrides from {}", path);
            }
            Err(e) => {
                error!("[config] failed to load overrides from {}: {}", path, e);
                std::process::exit(1);
            }
        }
    }

    let bus_path =
        std::env::var("I2C_BUS").unwrap_or_else(|_| EnviroPhat::DEFAULT_BUS_PATH.to_string());
    let board = match EnviroPhat::open(&bus_path) {
        Ok(board) => board,
        Err(e) => {
            error!("[envirophat] failed to open board on {}: {}", bus_path, e);
            std::process::exit(1);
        }
    };
    info!("[envirophat] board ready on {}", bus_path);

    let mut adapter = PollAdapter::new(board);
    let handle = adapter.init(&category);

    let mut ticker = tokio::time::interval(handle.config().poll_interval);
    info!("[poll] polling every {:?}", handle.config().poll_interval);

    loop {
        ticker.tick().await;
        match adapter.poll(&handle) {
            Ok(batch) => {
                for reading in &batch {
                    match reading.to_json() {
                        Ok(line) => println!("{}", line),
                        Err(e) => error!("[poll] failed to serialize reading: {}", e),
                    }
                }
            }
            // The error is already logged with channel detail by the adapter;
            // keep the timer running like the host would
            Err(e) => error!("[poll] {}", e),
        }
    }
}

fn load_overrides(path: &str) -> Result<Map<String, Value>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let overrides: Map<String, Value> = serde_json::from_str(&content)?;
    Ok(overrides)
}

fn apply_overrides(category: &mut Map<String, Value>, overrides: Map<String, Value>) {
    for (key, value) in overrides {
        match category.get_mut(&key).and_then(Value::as_object_mut) {
            Some(item) => {
                item.insert("value".to_string(), value);
            }
            None => warn!("[config] unknown option '{}' ignored", key),
        }
    }
}
