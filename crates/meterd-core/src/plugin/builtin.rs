//! Plugins compiled into the `meterd` binary.

use chrono::Utc;

use crate::plugin::{
    Input, InputError, InputRegistry, Processor, ProcessorError, ProcessorRegistry, RegistryError,
};
use crate::sample::{FieldValue, Sample};

/// Register every built-in processor.
pub fn register_builtins(registry: &mut ProcessorRegistry) {
    registry.register("identity", Identity::DESCRIPTION, |_| Ok(Box::new(Identity)));
    registry.register("count-multiplier", CountMultiplier::DESCRIPTION, |_| {
        Ok(Box::new(CountMultiplier))
    });
    registry.register("add-tag", AddTag::DESCRIPTION, |options| {
        Ok(Box::new(AddTag::from_options(options)?))
    });
}

/// Register every built-in input.
pub fn register_builtin_inputs(registry: &mut InputRegistry) {
    registry.register("counter", Counter::DESCRIPTION, |options| {
        Ok(Box::new(Counter::from_options(options)?))
    });
}

/// Passes every sample through unchanged.
#[derive(Debug, Default)]
pub struct Identity;

impl Identity {
    const DESCRIPTION: &'static str = "Pass samples through unchanged";
}

impl Processor for Identity {
    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn apply(&mut self, sample: Sample) -> Result<Vec<Sample>, ProcessorError> {
        Ok(vec![sample])
    }
}

/// Doubles the `count` field.
#[derive(Debug, Default)]
pub struct CountMultiplier;

impl CountMultiplier {
    const DESCRIPTION: &'static str = "Multiply the count field by 2";
    const FIELD: &'static str = "count";
}

impl Processor for CountMultiplier {
    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn apply(&mut self, mut sample: Sample) -> Result<Vec<Sample>, ProcessorError> {
        let doubled = match sample.field(Self::FIELD) {
            Some(FieldValue::Integer(v)) => v
                .checked_mul(2)
                .map(FieldValue::Integer)
                .ok_or_else(|| ProcessorError::new(format!("{} overflows when doubled", v)))?,
            Some(FieldValue::Float(v)) => FieldValue::Float(v * 2.0),
            Some(other) => {
                return Err(ProcessorError::new(format!(
                    "field {:?} has type {}, expected integer or float",
                    Self::FIELD,
                    other.type_name()
                )));
            }
            None => {
                return Err(ProcessorError::new(format!(
                    "sample {:?} has no {:?} field",
                    sample.name(),
                    Self::FIELD
                )));
            }
        };
        sample.add_field(Self::FIELD, doubled);
        Ok(vec![sample])
    }
}

/// Sets one tag on every sample.
#[derive(Debug)]
pub struct AddTag {
    key: String,
    value: String,
}

impl AddTag {
    const DESCRIPTION: &'static str = "Add a fixed tag to every sample";
    const SAMPLE_CONFIG: &'static str = "key = \"source\"\nvalue = \"execd\"\n";

    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    fn from_options(options: &toml::Table) -> Result<Self, RegistryError> {
        let get = |name: &str| -> Result<String, RegistryError> {
            match options.get(name) {
                Some(toml::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
                Some(_) => Err(invalid(
                    "add-tag",
                    format!("option {name:?} must be a non-empty string"),
                )),
                None => Err(invalid("add-tag", format!("missing option {name:?}"))),
            }
        };
        Ok(Self::new(get("key")?, get("value")?))
    }
}

fn invalid(plugin: &str, message: String) -> RegistryError {
    RegistryError::InvalidOptions {
        plugin: plugin.to_string(),
        message,
    }
}

impl Processor for AddTag {
    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn sample_config(&self) -> &str {
        Self::SAMPLE_CONFIG
    }

    fn apply(&mut self, mut sample: Sample) -> Result<Vec<Sample>, ProcessorError> {
        sample.add_tag(self.key.clone(), self.value.clone());
        Ok(vec![sample])
    }
}

/// Emits one sample per gather whose `count` field goes 1, 2, 3...
#[derive(Debug)]
pub struct Counter {
    measurement: String,
    count: i64,
}

impl Counter {
    const DESCRIPTION: &'static str = "Emit an increasing count on every gather";
    const SAMPLE_CONFIG: &'static str = "measurement = \"counter\"\n";
    const DEFAULT_MEASUREMENT: &'static str = "counter";

    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            count: 0,
        }
    }

    fn from_options(options: &toml::Table) -> Result<Self, RegistryError> {
        match options.get("measurement") {
            None => Ok(Self::new(Self::DEFAULT_MEASUREMENT)),
            Some(toml::Value::String(s)) if !s.is_empty() => Ok(Self::new(s.clone())),
            Some(_) => Err(invalid(
                "counter",
                "option \"measurement\" must be a non-empty string".to_string(),
            )),
        }
    }
}

impl Input for Counter {
    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn sample_config(&self) -> &str {
        Self::SAMPLE_CONFIG
    }

    fn gather(&mut self) -> Result<Vec<Sample>, InputError> {
        self.count = self
            .count
            .checked_add(1)
            .ok_or_else(|| InputError::new("count overflowed"))?;
        Ok(vec![
            Sample::new(self.measurement.clone(), Utc::now()).with_field("count", self.count),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn registry() -> ProcessorRegistry {
        let mut registry = ProcessorRegistry::new();
        register_builtins(&mut registry);
        registry
    }

    fn sample() -> Sample {
        Sample::new("test", Utc.timestamp_opt(1_700_000_000, 0).unwrap()).with_tag("city", "Toronto")
    }

    #[test]
    fn builtins_are_registered() {
        let registry = registry();
        let names: Vec<&str> = registry.list().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["add-tag", "count-multiplier", "identity"]);
    }

    #[test]
    fn identity_passes_through() {
        let mut p = registry().create("identity", &toml::Table::new()).unwrap();
        let input = sample().with_field("count", 1i64);
        assert_eq!(p.apply(input.clone()).unwrap(), vec![input]);
    }

    #[test]
    fn count_multiplier_doubles_integer_and_float() {
        let mut p = CountMultiplier;
        let out = p.apply(sample().with_field("count", 21i64)).unwrap();
        assert_eq!(out[0].field("count"), Some(&FieldValue::Integer(42)));
        assert_eq!(out[0].tag("city"), Some("Toronto"));

        let out = p.apply(sample().with_field("count", 1.5)).unwrap();
        assert_eq!(out[0].field("count"), Some(&FieldValue::Float(3.0)));
    }

    #[test]
    fn count_multiplier_rejects_missing_or_wrong_type() {
        let mut p = CountMultiplier;
        assert!(p.apply(sample().with_field("other", 1i64)).is_err());
        let err = p.apply(sample().with_field("count", "many")).unwrap_err();
        assert!(err.to_string().contains("string"), "got: {err}");
        assert!(p.apply(sample().with_field("count", i64::MAX)).is_err());
    }

    #[test]
    fn add_tag_from_options() {
        let options: toml::Table = toml::from_str("key = \"hi\"\nvalue = \"mom\"").unwrap();
        let mut p = registry().create("add-tag", &options).unwrap();
        let out = p.apply(sample().with_field("count", 1i64)).unwrap();
        assert_eq!(out[0].tag("hi"), Some("mom"));
        assert!(p.sample_config().contains("key"));
    }

    #[test]
    fn add_tag_requires_options() {
        let err = registry().create("add-tag", &toml::Table::new()).err().unwrap();
        assert!(matches!(err, RegistryError::InvalidOptions { .. }));
        assert!(err.to_string().contains("key"));

        let options: toml::Table = toml::from_str("key = \"hi\"\nvalue = 3").unwrap();
        assert!(registry().create("add-tag", &options).is_err());
    }

    fn inputs() -> InputRegistry {
        let mut inputs = InputRegistry::new();
        register_builtin_inputs(&mut inputs);
        inputs
    }

    #[test]
    fn counter_counts_up_from_one() {
        let mut input = inputs().create("counter", &toml::Table::new()).unwrap();
        let counts: Vec<_> = (0..3)
            .map(|_| {
                let batch = input.gather().unwrap();
                assert_eq!(batch.len(), 1);
                assert_eq!(batch[0].name(), "counter");
                batch[0].field("count").and_then(FieldValue::as_i64)
            })
            .collect();
        assert_eq!(counts, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn counter_measurement_option() {
        let options: toml::Table = toml::from_str("measurement = \"ticks\"").unwrap();
        let mut input = inputs().create("counter", &options).unwrap();
        assert_eq!(input.gather().unwrap()[0].name(), "ticks");

        let options: toml::Table = toml::from_str("measurement = 1").unwrap();
        let err = inputs().create("counter", &options).err().unwrap();
        assert!(matches!(err, RegistryError::InvalidOptions { ref plugin, .. } if plugin == "counter"));
    }
}
