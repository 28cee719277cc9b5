use std::collections::BTreeSet;
use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::readings::Channel;

/// Poll interval used when the option is absent or unparseable.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

const DEFAULT_ASSET_PREFIX: &str = "e_";

/// Declared configuration category: option name to descriptor.
///
/// Boolean options carry their effective value as the literal strings
/// "true"/"false"; the host stores and round-trips them as strings.
pub fn config_schema() -> Value {
    json!({
        "plugin": {
            "description": "Enviro pHAT Poll Plugin",
            "type": "string",
            "default": "envirophat",
            "readonly": "true"
        },
        "pollInterval": {
            "description": "Interval between calls to the poll entry point, in milliseconds",
            "type": "integer",
            "default": "1000",
            "order": "1",
            "displayName": "Poll Interval"
        },
        "assetNamePrefix": {
            "description": "Prefix of asset name",
            "type": "string",
            "default": "e_",
            "order": "2",
            "displayName": "Asset Name Prefix"
        },
        "rgbSensor": {
            "description": "Enable RGB sensor",
            "type": "boolean",
            "default": "true",
            "order": "3",
            "displayName": "RGB Sensor"
        },
        "rgbSensorName": {
            "description": "Asset name of RGB sensor",
            "type": "string",
            "default": "rgb",
            "order": "4",
            "displayName": "RGB Sensor Name"
        },
        "magnetometerSensor": {
            "description": "Enable magnetometer sensor",
            "type": "boolean",
            "default": "true",
            "order": "5",
            "displayName": "Magnetometer Sensor"
        },
        "magnetometerSensorName": {
            "description": "Asset name of magnetometer sensor",
            "type": "string",
            "default": "magnetometer",
            "order": "6",
            "displayName": "Magnetometer Sensor Name"
        },
        "accelerometerSensor": {
            "description": "Enable accelerometer sensor",
            "type": "boolean",
            "default": "true",
            "order": "7",
            "displayName": "Accelerometer Sensor"
        },
        "accelerometerSensorName": {
            "description": "Asset name of accelerometer sensor",
            "type": "string",
            "default": "accelerometer",
            "order": "8",
            "displayName": "Accelerometer Sensor Name"
        },
        "weatherSensor": {
            "description": "Enable weather sensor",
            "type": "boolean",
            "default": "true",
            "order": "9",
            "displayName": "Weather Sensor"
        },
        "weatherSensorName": {
            "description": "Asset name of weather sensor",
            "type": "string",
            "default": "weather",
            "order": "10",
            "displayName": "Weather Sensor Name"
        }
    })
}

/// Materializes the resolved document the host would hand to init: every
/// schema item gains a `value` equal to its default.
pub fn resolve_defaults() -> Map<String, Value> {
    let mut resolved = Map::new();
    if let Value::Object(schema) = config_schema() {
        for (name, mut item) in schema {
            let default = item
                .get("default")
                .cloned()
                .unwrap_or_else(|| Value::String(String::new()));
            if let Some(obj) = item.as_object_mut() {
                obj.insert("value".to_string(), default);
            }
            resolved.insert(name, item);
        }
    }
    resolved
}

/// Option keys whose `value` differs between two resolved documents.
pub fn changed_keys(old: &Map<String, Value>, new: &Map<String, Value>) -> BTreeSet<String> {
    let mut changed = BTreeSet::new();
    for key in old.keys().chain(new.keys()) {
        let old_value = old.get(key).and_then(|item| item.get("value"));
        let new_value = new.get(key).and_then(|item| item.get("value"));
        if old_value != new_value {
            changed.insert(key.clone());
        }
    }
    changed
}

/// Runtime settings for one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub enabled: bool,
    pub asset_name: String,
}

/// Typed snapshot of one resolved configuration category.
///
/// Parsed once per init/reconfigure; poll never re-examines the document.
/// There is no validation step: an enable flag is on only when its value is
/// exactly "true", and a bad interval falls back to the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    pub asset_prefix: String,
    pub poll_interval: Duration,
    channels: [ChannelConfig; 4],
}

impl PluginConfig {
    pub fn parse(category: &Map<String, Value>) -> Self {
        let value_of = |key: &str| -> Option<&str> {
            category
                .get(key)
                .and_then(|item| item.get("value"))
                .and_then(Value::as_str)
        };

        let asset_prefix = value_of("assetNamePrefix")
            .unwrap_or(DEFAULT_ASSET_PREFIX)
            .to_string();

        let interval_ms = value_of("pollInterval")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        let channels = Channel::ALL.map(|channel| ChannelConfig {
            enabled: value_of(channel.enable_key()) == Some("true"),
            asset_name: value_of(channel.name_key())
                .unwrap_or(channel.as_str())
                .to_string(),
        });

        Self {
            asset_prefix,
            poll_interval: Duration::from_millis(interval_ms),
            channels,
        }
    }

    pub fn channel(&self, channel: Channel) -> &ChannelConfig {
        &self.channels[channel as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_value(category: &mut Map<String, Value>, key: &str, value: &str) {
        let item = category
            .get_mut(key)
            .and_then(Value::as_object_mut)
            .expect("known option");
        item.insert("value".to_string(), Value::String(value.to_string()));
    }

    #[test]
    fn test_defaults_enable_everything() {
        let config = PluginConfig::parse(&resolve_defaults());

        assert_eq!(config.asset_prefix, "e_");
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        for channel in Channel::ALL {
            assert!(config.channel(channel).enabled);
            assert_eq!(config.channel(channel).asset_name, channel.as_str());
        }
    }

    #[test]
    fn test_enable_flag_is_exact_string_comparison() {
        let mut category = resolve_defaults();
        set_value(&mut category, "rgbSensor", "false");
        set_value(&mut category, "magnetometerSensor", "TRUE");
        set_value(&mut category, "accelerometerSensor", "");

        let config = PluginConfig::parse(&category);
        assert!(!config.channel(Channel::Rgb).enabled);
        assert!(!config.channel(Channel::Magnetometer).enabled);
        assert!(!config.channel(Channel::Accelerometer).enabled);
        assert!(config.channel(Channel::Weather).enabled);
    }

    #[test]
    fn test_bad_interval_falls_back_to_default() {
        let mut category = resolve_defaults();
        set_value(&mut category, "pollInterval", "not-a-number");

        let config = PluginConfig::parse(&category);
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
    }

    #[test]
    fn test_missing_options_degrade_instead_of_erroring() {
        let config = PluginConfig::parse(&Map::new());

        assert_eq!(config.asset_prefix, "e_");
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        // No flag present means no channel reads "true"
        for channel in Channel::ALL {
            assert!(!config.channel(channel).enabled);
        }
    }

    #[test]
    fn test_changed_keys_compares_values_only() {
        let old = resolve_defaults();
        let mut new = resolve_defaults();
        set_value(&mut new, "pollInterval", "2000");
        set_value(&mut new, "weatherSensorName", "bmp280");

        let changed = changed_keys(&old, &new);
        assert_eq!(
            changed.iter().cloned().collect::<Vec<_>>(),
            vec!["pollInterval".to_string(), "weatherSensorName".to_string()]
        );
        assert!(changed_keys(&old, &old).is_empty());
    }

    #[test]
    fn test_schema_keeps_display_order() {
        let schema = config_schema();
        let keys: Vec<&String> = schema.as_object().expect("object schema").keys().collect();
        assert_eq!(keys[0], "plugin");
        assert_eq!(keys[1], "pollInterval");
        assert_eq!(keys[2], "assetNamePrefix");
        assert_eq!(keys.last().map(|k| k.as_str()), Some("weatherSensorName"));
    }
}
