use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::board::{BoardDriver, PressureUnit};
use crate::config::{changed_keys, config_schema, PluginConfig};
use crate::errors::{DriverResult, PluginError, PollResult};
use crate::readings::{AxisValues, Channel, Reading, ReadingValues, RgbValues, WeatherValues};

/// Signal to the host framework that the polling cycle must be torn down
/// and re-established after a reconfigure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restart {
    Yes,
    No,
}

impl Restart {
    pub fn as_str(self) -> &'static str {
        match self {
            Restart::Yes => "yes",
            Restart::No => "no",
        }
    }
}

/// Configuration snapshot held between lifecycle calls.
///
/// Each init/reconfigure produces a fresh deep copy of the resolved category
/// plus its parsed form; old and new handles never share storage.
#[derive(Debug, Clone)]
pub struct Handle {
    category: Map<String, Value>,
    config: PluginConfig,
    restart: Restart,
}

impl Handle {
    fn new(category: &Map<String, Value>, restart: Restart) -> Self {
        Self {
            category: category.clone(),
            config: PluginConfig::parse(category),
            restart,
        }
    }

    /// The resolved configuration document this handle was built from.
    pub fn category(&self) -> &Map<String, Value> {
        &self.category
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn restart(&self) -> Restart {
        self.restart
    }
}

/// Static plugin metadata handed to the host at registration time.
pub fn plugin_info() -> Value {
    json!({
        "name": "Enviro pHAT Poll Plugin",
        "version": env!("CARGO_PKG_VERSION"),
        "mode": "poll",
        "type": "south",
        "interface": "1.0",
        "config": config_schema(),
    })
}

/// The sensor poll adapter: reshapes board readings into timestamped, keyed
/// records for the host framework.
///
/// The board driver is injected at construction. All lifecycle calls are
/// synchronous and assumed non-overlapping; the adapter holds no locks and
/// no state beyond the driver itself.
pub struct PollAdapter<D> {
    driver: D,
}

impl<D: BoardDriver> PollAdapter<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    /// Snapshot the resolved category into a new handle.
    ///
    /// No validation happens here; malformed values surface only through
    /// behavior (a flag that isn't "true" leaves its channel disabled).
    pub fn init(&self, category: &Map<String, Value>) -> Handle {
        info!("[init] Enviro pHAT poll plugin initialized");
        Handle::new(category, Restart::No)
    }

    /// Read every enabled channel in fixed order and return the batch.
    ///
    /// The timestamp is captured once and shared by all records of the call;
    /// each record gets its own random key. The first driver failure aborts
    /// the whole batch: earlier readings are discarded and the retrieval
    /// error is returned alone. Retry scheduling belongs to the host.
    pub fn poll(&mut self, handle: &Handle) -> PollResult<Vec<Reading>> {
        let config = handle.config();
        let timestamp = Utc::now();
        let mut batch = Vec::new();

        for channel in Channel::ALL {
            let settings = config.channel(channel);
            if !settings.enabled {
                continue;
            }

            let values = self.read_channel(channel).map_err(|source| {
                error!("[poll] {} channel read failed: {}", channel, source);
                PluginError::Retrieval { channel, source }
            })?;

            batch.push(Reading::new(
                format!("{}{}", config.asset_prefix, settings.asset_name),
                timestamp,
                values,
            ));
        }

        Ok(batch)
    }

    fn read_channel(&mut self, channel: Channel) -> DriverResult<ReadingValues> {
        match channel {
            Channel::Rgb => {
                let [r, g, b] = self.driver.rgb()?;
                Ok(ReadingValues::Rgb(RgbValues { r, g, b }))
            }
            Channel::Magnetometer => {
                let [x, y, z] = self.driver.magnetometer()?;
                Ok(ReadingValues::Axes(AxisValues { x, y, z }))
            }
            Channel::Accelerometer => {
                let [x, y, z] = self.driver.accelerometer()?.map(round2);
                Ok(ReadingValues::Axes(AxisValues { x, y, z }))
            }
            Channel::Weather => {
                let altitude = self.driver.altitude()?;
                let temperature = self.driver.temperature()?;
                let pressure = self.driver.pressure(PressureUnit::Hectopascals)?;
                Ok(ReadingValues::Weather(WeatherValues {
                    altitude,
                    temperature,
                    pressure,
                }))
            }
        }
    }

    /// Replace the handle with a deep copy of the new category.
    ///
    /// Restart is signaled only when the poll interval changed; every other
    /// option takes effect through the new handle without one. No driver I/O
    /// happens here.
    pub fn reconfigure(&self, handle: &Handle, new_category: &Map<String, Value>) -> Handle {
        debug!(
            "[reconfigure] old config {:?} new config {:?}",
            handle.category(),
            new_category
        );
        let changed = changed_keys(handle.category(), new_category);
        let restart = if changed.contains("pollInterval") {
            Restart::Yes
        } else {
            Restart::No
        };
        info!(
            "[reconfigure] changed options {:?}, restart={}",
            changed,
            restart.as_str()
        );
        Handle::new(new_category, restart)
    }

    /// The driver library exposes nothing to release; dropping the handle is
    /// the whole cleanup.
    pub fn shutdown(&self, handle: Handle) {
        drop(handle);
        info!("[shutdown] Enviro pHAT poll plugin shut down");
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve_defaults;
    use crate::errors::DriverError;
    use std::collections::HashSet;

    /// Scripted board that records call counts and can fail one channel.
    #[derive(Default)]
    struct MockBoard {
        rgb_calls: u32,
        mag_calls: u32,
        accel_calls: u32,
        weather_calls: u32,
        fail: Option<Channel>,
    }

    impl MockBoard {
        fn failing(channel: Channel) -> Self {
            Self {
                fail: Some(channel),
                ..Self::default()
            }
        }

        fn fail_if(&self, channel: Channel) -> DriverResult<()> {
            if self.fail == Some(channel) {
                Err(DriverError::NotReady {
                    chip: "mock",
                    reason: "scripted failure".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    impl BoardDriver for MockBoard {
        fn rgb(&mut self) -> DriverResult<[f64; 3]> {
            self.rgb_calls += 1;
            self.fail_if(Channel::Rgb)?;
            Ok([120.0, 64.0, 31.0])
        }

        fn magnetometer(&mut self) -> DriverResult<[f64; 3]> {
            self.mag_calls += 1;
            self.fail_if(Channel::Magnetometer)?;
            Ok([-1520.0, 312.0, 4890.0])
        }

        fn accelerometer(&mut self) -> DriverResult<[f64; 3]> {
            self.accel_calls += 1;
            self.fail_if(Channel::Accelerometer)?;
            Ok([1.234, 5.678, 9.1011])
        }

        fn altitude(&mut self) -> DriverResult<f64> {
            self.weather_calls += 1;
            self.fail_if(Channel::Weather)?;
            Ok(30.5)
        }

        fn temperature(&mut self) -> DriverResult<f64> {
            self.fail_if(Channel::Weather)?;
            Ok(21.2)
        }

        fn pressure(&mut self, unit: PressureUnit) -> DriverResult<f64> {
            assert_eq!(unit, PressureUnit::Hectopascals);
            self.fail_if(Channel::Weather)?;
            Ok(1008.7)
        }
    }

    fn category_with(overrides: &[(&str, &str)]) -> Map<String, Value> {
        let mut category = resolve_defaults();
        for (key, value) in overrides {
            let item = category
                .get_mut(*key)
                .and_then(Value::as_object_mut)
                .expect("known option");
            item.insert("value".to_string(), Value::String((*value).to_string()));
        }
        category
    }

    #[test]
    fn test_plugin_info_is_idempotent() {
        let first = plugin_info();
        assert_eq!(first["mode"], "poll");
        assert_eq!(first["type"], "south");
        assert_eq!(first["interface"], "1.0");
        assert_eq!(first["config"]["rgbSensor"]["default"], "true");
        assert_eq!(first, plugin_info());
    }

    #[test]
    fn test_poll_reads_all_enabled_channels_in_order() {
        let mut adapter = PollAdapter::new(MockBoard::default());
        let handle = adapter.init(&category_with(&[]));

        let batch = adapter.poll(&handle).unwrap();

        assert_eq!(batch.len(), 4);
        let assets: Vec<&str> = batch.iter().map(|r| r.asset.as_str()).collect();
        assert_eq!(
            assets,
            vec!["e_rgb", "e_magnetometer", "e_accelerometer", "e_weather"]
        );
        assert_eq!(
            batch[0].readings,
            ReadingValues::Rgb(RgbValues {
                r: 120.0,
                g: 64.0,
                b: 31.0
            })
        );
        assert_eq!(
            batch[3].readings,
            ReadingValues::Weather(WeatherValues {
                altitude: 30.5,
                temperature: 21.2,
                pressure: 1008.7
            })
        );
    }

    #[test]
    fn test_accelerometer_values_round_to_two_decimals() {
        let mut adapter = PollAdapter::new(MockBoard::default());
        let handle = adapter.init(&category_with(&[
            ("rgbSensor", "false"),
            ("magnetometerSensor", "false"),
            ("weatherSensor", "false"),
        ]));

        let batch = adapter.poll(&handle).unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch[0].readings,
            ReadingValues::Axes(AxisValues {
                x: 1.23,
                y: 5.68,
                z: 9.1
            })
        );
    }

    #[test]
    fn test_disabled_channel_never_touches_the_driver() {
        let mut adapter = PollAdapter::new(MockBoard::default());
        let handle = adapter.init(&category_with(&[("magnetometerSensor", "false")]));

        let batch = adapter.poll(&handle).unwrap();

        assert_eq!(batch.len(), 3);
        assert!(!batch.iter().any(|r| r.asset == "e_magnetometer"));
        assert_eq!(adapter.driver.mag_calls, 0);
        assert_eq!(adapter.driver.rgb_calls, 1);
        assert_eq!(adapter.driver.accel_calls, 1);
        assert_eq!(adapter.driver.weather_calls, 1);
    }

    #[test]
    fn test_flag_other_than_true_counts_as_disabled() {
        let mut adapter = PollAdapter::new(MockBoard::default());
        let handle = adapter.init(&category_with(&[("rgbSensor", "TRUE")]));

        let batch = adapter.poll(&handle).unwrap();

        assert!(!batch.iter().any(|r| r.asset == "e_rgb"));
        assert_eq!(adapter.driver.rgb_calls, 0);
    }

    #[test]
    fn test_all_channels_disabled_yields_empty_batch() {
        let mut adapter = PollAdapter::new(MockBoard::default());
        let handle = adapter.init(&category_with(&[
            ("rgbSensor", "false"),
            ("magnetometerSensor", "false"),
            ("accelerometerSensor", "false"),
            ("weatherSensor", "false"),
        ]));

        assert!(adapter.poll(&handle).unwrap().is_empty());
    }

    #[test]
    fn test_asset_names_use_prefix_and_configured_names() {
        let mut adapter = PollAdapter::new(MockBoard::default());
        let handle = adapter.init(&category_with(&[
            ("assetNamePrefix", "lab1/"),
            ("weatherSensorName", "bmp280"),
        ]));

        let batch = adapter.poll(&handle).unwrap();
        assert_eq!(batch[0].asset, "lab1/rgb");
        assert_eq!(batch[3].asset, "lab1/bmp280");
    }

    #[test]
    fn test_batch_shares_one_timestamp_with_distinct_keys() {
        let mut adapter = PollAdapter::new(MockBoard::default());
        let handle = adapter.init(&category_with(&[]));

        let batch = adapter.poll(&handle).unwrap();

        assert!(batch.iter().all(|r| r.timestamp == batch[0].timestamp));
        let keys: HashSet<_> = batch.iter().map(|r| r.key).collect();
        assert_eq!(keys.len(), batch.len());
    }

    #[test]
    fn test_driver_failure_aborts_the_whole_batch() {
        let mut adapter = PollAdapter::new(MockBoard::failing(Channel::Magnetometer));
        let handle = adapter.init(&category_with(&[]));

        let err = adapter.poll(&handle).unwrap_err();
        let PluginError::Retrieval { channel, .. } = err;
        assert_eq!(channel, Channel::Magnetometer);

        // rgb was read first but its reading is discarded with the batch;
        // channels after the failure are never attempted
        assert_eq!(adapter.driver.rgb_calls, 1);
        assert_eq!(adapter.driver.mag_calls, 1);
        assert_eq!(adapter.driver.accel_calls, 0);
        assert_eq!(adapter.driver.weather_calls, 0);
    }

    #[test]
    fn test_init_handles_are_equal_but_independent() {
        let adapter = PollAdapter::new(MockBoard::default());
        let mut category = category_with(&[]);

        let first = adapter.init(&category);
        let second = adapter.init(&category);
        assert_eq!(first.category(), second.category());
        assert_eq!(first.config(), second.config());

        // Mutating the caller's document must not leak into either handle
        category.remove("rgbSensor");
        assert!(first.category().contains_key("rgbSensor"));
        assert!(second.category().contains_key("rgbSensor"));
    }

    #[test]
    fn test_reconfigure_interval_change_requests_restart() {
        let adapter = PollAdapter::new(MockBoard::default());
        let handle = adapter.init(&category_with(&[("pollInterval", "1000")]));

        let new_handle =
            adapter.reconfigure(&handle, &category_with(&[("pollInterval", "2000")]));

        assert_eq!(new_handle.restart(), Restart::Yes);
        assert_eq!(new_handle.restart().as_str(), "yes");
        assert_eq!(
            new_handle.config().poll_interval,
            std::time::Duration::from_millis(2000)
        );
    }

    #[test]
    fn test_reconfigure_other_changes_do_not_request_restart() {
        let adapter = PollAdapter::new(MockBoard::default());
        let handle = adapter.init(&category_with(&[]));

        let new_handle =
            adapter.reconfigure(&handle, &category_with(&[("assetNamePrefix", "x_")]));

        assert_eq!(new_handle.restart(), Restart::No);
        assert_eq!(new_handle.restart().as_str(), "no");
        assert_eq!(new_handle.config().asset_prefix, "x_");
    }

    #[test]
    fn test_reconfigure_takes_effect_on_next_poll() {
        let mut adapter = PollAdapter::new(MockBoard::default());
        let handle = adapter.init(&category_with(&[]));

        let new_handle =
            adapter.reconfigure(&handle, &category_with(&[("weatherSensor", "false")]));
        let batch = adapter.poll(&new_handle).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(adapter.driver.weather_calls, 0);
    }
}
