use serde_json::{Map, Value};

pub type SettingsMap = Map<String, Value>;

/// Name of the field every settings schema must declare.
pub const ENABLED_KEY: &str = "enabled";

/// Builds a schema out of key/value pairs, prepending `enabled: true`.
pub fn schema<I, K>(fields: I) -> SettingsMap
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    let mut map = SettingsMap::new();
    map.insert(ENABLED_KEY.to_string(), Value::Bool(true));
    for (key, value) in fields {
        map.insert(key.into(), value);
    }
    map
}

/// The persisted settings document of one module.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettingsRecord {
    values: SettingsMap,
}

impl SettingsRecord {
    pub fn from_defaults(defaults: &SettingsMap) -> Self {
        Self {
            values: defaults.clone(),
        }
    }

    /// Merge a stored document with the declared defaults.
    ///
    /// Stored values win. Keys the defaults declare but the stored document
    /// lacks are back-filled, as are stored values whose JSON type differs
    /// from the default's. Extra stored keys are carried along untouched.
    pub fn merge(stored: Option<Value>, defaults: &SettingsMap) -> Self {
        let mut values = match stored {
            Some(Value::Object(map)) => map,
            Some(other) => {
                tracing::warn!("Discarding malformed settings record: {}", other);
                SettingsMap::new()
            }
            None => SettingsMap::new(),
        };

        for (key, default) in defaults {
            match values.get(key) {
                Some(current) if same_kind(current, default) => {}
                Some(current) => {
                    tracing::warn!(
                        "Settings key '{}' holds {}, expected the type of {}; using default",
                        key,
                        current,
                        default
                    );
                    values.insert(key.clone(), default.clone());
                }
                None => {
                    values.insert(key.clone(), default.clone());
                }
            }
        }

        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn enabled(&self) -> bool {
        self.values
            .get(ENABLED_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Null, Value::Null)
            | (Value::Bool(_), Value::Bool(_))
            | (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
            | (Value::Array(_), Value::Array(_))
            | (Value::Object(_), Value::Object(_))
    )
}
