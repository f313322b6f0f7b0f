use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A raw numeric input as it arrives from a record source.
///
/// Backends hand out numbers, but form submissions frequently arrive as
/// strings ("0.5", "12") and unmeasured values as `null`. Anything that does
/// not parse as a finite number is treated as missing by the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Number(f64),
    Text(String),
    Null,
}

impl InputValue {
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            InputValue::Number(n) => *n,
            InputValue::Text(s) => s.trim().parse::<f64>().ok()?,
            InputValue::Null => return None,
        };
        value.is_finite().then_some(value)
    }

    /// False for numbers JSON cannot represent (NaN, infinities)
    pub fn is_storable(&self) -> bool {
        match self {
            InputValue::Number(n) => n.is_finite(),
            InputValue::Text(_) | InputValue::Null => true,
        }
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        InputValue::Number(value)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,       // store or team
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub entity: Option<String>,      // owner of a measurement, e.g. a player id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    /// Top-level fields of flat backend rows (`{"price": 1.0, ...}`)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            inputs: BTreeMap::new(),
            tags: Vec::new(),
            group: None,
            entity: None,
            recorded_at: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, key: &str, value: impl Into<InputValue>) -> Self {
        self.inputs.insert(key.to_string(), value.into());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn with_entity(mut self, entity: &str) -> Self {
        self.entity = Some(entity.to_string());
        self
    }

    pub fn recorded(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(at);
        self
    }

    /// Look up a numeric input, falling back to flat top-level fields.
    /// Unparseable or non-finite values count as missing.
    pub fn input(&self, key: &str) -> Option<f64> {
        if let Some(value) = self.inputs.get(key) {
            return value.as_f64();
        }
        match self.extra.get(key)? {
            serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
            serde_json::Value::String(s) => InputValue::Text(s.clone()).as_f64(),
            _ => None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Key that groups measurements belonging to the same participant
    pub fn entity_key(&self) -> &str {
        self.entity.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Int(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn deserialize_opt_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_string_ids() {
        let json = r#"[
            {"id": 7, "name": "Pils", "inputs": {"price": 1.0}},
            {"id": "abc", "name": "Korn", "entity": 12}
        ]"#;
        let records: Vec<Record> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].id, "7");
        assert_eq!(records[1].id, "abc");
        assert_eq!(records[1].entity.as_deref(), Some("12"));
    }

    #[test]
    fn test_string_inputs_parse() {
        let record = Record::new("1", "Bench")
            .with_input("kilograms", "82.5")
            .with_input("repetitions", " 5 ");
        assert_eq!(record.input("kilograms"), Some(82.5));
        assert_eq!(record.input("repetitions"), Some(5.0));
    }

    #[test]
    fn test_malformed_input_is_missing() {
        let record = Record::new("1", "Bench")
            .with_input("kilograms", "heavy")
            .with_input("seconds", "NaN");
        assert_eq!(record.input("kilograms"), None);
        assert_eq!(record.input("seconds"), None);
        assert_eq!(record.input("absent"), None);
    }

    #[test]
    fn test_flat_backend_row() {
        // Shape served by the beverage backend
        let json = r#"{
            "id": 3, "name": "Hausmarke", "type": "bier", "volume": 0.5,
            "price": "0.89", "store": "Netto", "alcohol_content": 4.9,
            "created_at": "2024-05-01T10:00:00"
        }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.input("volume"), Some(0.5));
        assert_eq!(record.input("price"), Some(0.89));
        assert_eq!(record.input("store"), None);
        assert!(record.inputs.is_empty());
    }

    #[test]
    fn test_inputs_take_precedence_over_flat_fields() {
        let json = r#"{"id": 1, "name": "x", "price": 9.0, "inputs": {"price": 2.0}}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.input("price"), Some(2.0));
    }

    #[test]
    fn test_has_tag_case_insensitive() {
        let record = Record::new("1", "Squat").with_tag("Maximalkraft");
        assert!(record.has_tag("maximalkraft"));
        assert!(!record.has_tag("ausdauer"));
    }

    #[test]
    fn test_entity_key_falls_back_to_name() {
        let record = Record::new("1", "Lena");
        assert_eq!(record.entity_key(), "Lena");
        let record = record.with_entity("42");
        assert_eq!(record.entity_key(), "42");
    }

    #[test]
    fn test_null_input_is_missing() {
        let json = r#"[{"id": 1, "name": "A", "inputs": {"price": null, "volume": 0.5}}]"#;
        let records: Vec<Record> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].inputs.get("price"), Some(&InputValue::Null));
        assert_eq!(records[0].input("price"), None);
        assert_eq!(records[0].input("volume"), Some(0.5));
    }

    #[test]
    fn test_null_flat_field_is_missing() {
        let record: Record = serde_json::from_str(r#"{"id": 1, "name": "A", "price": null}"#).unwrap();
        assert_eq!(record.input("price"), None);
    }

    #[test]
    fn test_non_finite_numbers_not_storable() {
        assert!(!InputValue::Number(f64::INFINITY).is_storable());
        assert!(!InputValue::Number(f64::NAN).is_storable());
        assert!(InputValue::Number(0.5).is_storable());
        assert!(InputValue::Text("inf".to_string()).is_storable());
        assert!(InputValue::Null.is_storable());
        assert_eq!(InputValue::Number(f64::NEG_INFINITY).as_f64(), None);
    }
}
