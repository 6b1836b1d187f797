use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The six primitive shapes a schema property can take.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl PropertyType {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Number => "number",
            PropertyType::Integer => "integer",
            PropertyType::Boolean => "boolean",
            PropertyType::Array => "array",
            PropertyType::Object => "object",
        }
    }

    /// Parses the lowercase type keyword. Unknown keywords map to `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "string" => Some(PropertyType::String),
            "number" => Some(PropertyType::Number),
            "integer" => Some(PropertyType::Integer),
            "boolean" => Some(PropertyType::Boolean),
            "array" => Some(PropertyType::Array),
            "object" => Some(PropertyType::Object),
            _ => None,
        }
    }
}

/// Recognized string formats. Absence means "no format".
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    Email,
    Uri,
    Date,
    DateTime,
    Password,
}

/// Optional descriptive metadata shared by every property shape.
///
/// `None` means the field is absent from the serialized schema and the
/// consumer's own default applies; `Some("")` is an intentionally empty
/// value. Clearing always produces `None`, never the zero value.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct PropertyMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Representation mode of an object-typed property.
///
/// An object with no named properties is an open mapping from arbitrary
/// string keys to typed scalar values; one with at least one named property
/// is structured. The two modes are mutually exclusive and switching is
/// destructive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectMode {
    KeyValue,
    Structured,
}

/// One field's shape: type, descriptive metadata, default, and
/// variant-specific constraints.
///
/// Modeled as a sum type so illegal states (an enum on a boolean, `items`
/// on a string) are unrepresentable.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaProperty {
    String {
        #[serde(flatten)]
        meta: PropertyMeta,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<StringFormat>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
        #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
        allowed: Vec<String>,
    },
    Number {
        #[serde(flatten)]
        meta: PropertyMeta,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<f64>,
    },
    Integer {
        #[serde(flatten)]
        meta: PropertyMeta,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<i64>,
    },
    Boolean {
        #[serde(flatten)]
        meta: PropertyMeta,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<bool>,
    },
    Array {
        #[serde(flatten)]
        meta: PropertyMeta,
        items: Box<SchemaProperty>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Vec<Value>>,
    },
    Object {
        #[serde(flatten)]
        meta: PropertyMeta,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        properties: BTreeMap<String, SchemaProperty>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Map<String, Value>>,
    },
}

impl Default for SchemaProperty {
    fn default() -> Self {
        Self::new(PropertyType::String)
    }
}

impl SchemaProperty {
    /// Constructs a fresh property of the given type with no carried-over
    /// metadata, default, or constraints. Type changes always go through
    /// this constructor so a property cannot keep stale constraints from a
    /// previous type.
    pub fn new(ty: PropertyType) -> Self {
        let meta = PropertyMeta::default();
        match ty {
            PropertyType::String => SchemaProperty::String {
                meta,
                format: None,
                default: None,
                allowed: Vec::new(),
            },
            PropertyType::Number => SchemaProperty::Number {
                meta,
                default: None,
            },
            PropertyType::Integer => SchemaProperty::Integer {
                meta,
                default: None,
            },
            PropertyType::Boolean => SchemaProperty::Boolean {
                meta,
                default: None,
            },
            PropertyType::Array => SchemaProperty::Array {
                meta,
                items: Box::new(SchemaProperty::new(PropertyType::String)),
                default: None,
            },
            PropertyType::Object => SchemaProperty::Object {
                meta,
                properties: BTreeMap::new(),
                default: None,
            },
        }
    }

    pub fn property_type(&self) -> PropertyType {
        match self {
            SchemaProperty::String { .. } => PropertyType::String,
            SchemaProperty::Number { .. } => PropertyType::Number,
            SchemaProperty::Integer { .. } => PropertyType::Integer,
            SchemaProperty::Boolean { .. } => PropertyType::Boolean,
            SchemaProperty::Array { .. } => PropertyType::Array,
            SchemaProperty::Object { .. } => PropertyType::Object,
        }
    }

    pub fn meta(&self) -> &PropertyMeta {
        match self {
            SchemaProperty::String { meta, .. }
            | SchemaProperty::Number { meta, .. }
            | SchemaProperty::Integer { meta, .. }
            | SchemaProperty::Boolean { meta, .. }
            | SchemaProperty::Array { meta, .. }
            | SchemaProperty::Object { meta, .. } => meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut PropertyMeta {
        match self {
            SchemaProperty::String { meta, .. }
            | SchemaProperty::Number { meta, .. }
            | SchemaProperty::Integer { meta, .. }
            | SchemaProperty::Boolean { meta, .. }
            | SchemaProperty::Array { meta, .. }
            | SchemaProperty::Object { meta, .. } => meta,
        }
    }

    /// Classifies an object property's representation mode. Non-object
    /// properties have no mode.
    pub fn object_mode(&self) -> Option<ObjectMode> {
        match self {
            SchemaProperty::Object { properties, .. } => {
                if properties.is_empty() {
                    Some(ObjectMode::KeyValue)
                } else {
                    Some(ObjectMode::Structured)
                }
            }
            _ => None,
        }
    }

    /// Whether an explicit default override is set.
    pub fn has_default(&self) -> bool {
        match self {
            SchemaProperty::String { default, .. } => default.is_some(),
            SchemaProperty::Number { default, .. } => default.is_some(),
            SchemaProperty::Integer { default, .. } => default.is_some(),
            SchemaProperty::Boolean { default, .. } => default.is_some(),
            SchemaProperty::Array { default, .. } => default.is_some(),
            SchemaProperty::Object { default, .. } => default.is_some(),
        }
    }

    /// The explicit default override as an untyped value, if set.
    pub fn default_value(&self) -> Option<Value> {
        match self {
            SchemaProperty::String { default, .. } => {
                default.as_ref().map(|s| Value::String(s.clone()))
            }
            SchemaProperty::Number { default, .. } => default.map(number_value),
            SchemaProperty::Integer { default, .. } => default.map(Value::from),
            SchemaProperty::Boolean { default, .. } => default.map(Value::Bool),
            SchemaProperty::Array { default, .. } => {
                default.as_ref().map(|items| Value::Array(items.clone()))
            }
            SchemaProperty::Object { default, .. } => {
                default.as_ref().map(|map| Value::Object(map.clone()))
            }
        }
    }

    /// Removes the default override entirely so a consumer's own default
    /// applies again.
    pub fn clear_default(&mut self) {
        match self {
            SchemaProperty::String { default, .. } => *default = None,
            SchemaProperty::Number { default, .. } => *default = None,
            SchemaProperty::Integer { default, .. } => *default = None,
            SchemaProperty::Boolean { default, .. } => *default = None,
            SchemaProperty::Array { default, .. } => *default = None,
            SchemaProperty::Object { default, .. } => *default = None,
        }
    }

    /// The value used wherever a concrete value is needed: the explicit
    /// default override when present, otherwise the type's zero value.
    pub fn effective_default(&self) -> Value {
        self.default_value()
            .unwrap_or_else(|| default_for(self.property_type()))
    }
}

/// Canonical zero value per type: `''`, `0`, `0`, `false`, `[]`, `{}`.
pub fn default_for(ty: PropertyType) -> Value {
    match ty {
        PropertyType::String => Value::String(String::new()),
        PropertyType::Number | PropertyType::Integer => Value::from(0),
        PropertyType::Boolean => Value::Bool(false),
        PropertyType::Array => Value::Array(Vec::new()),
        PropertyType::Object => Value::Object(Map::new()),
    }
}

/// Best-effort value conversion when a declared type changes underneath an
/// existing value. Only string sources convert; every other combination
/// passes through unchanged.
pub fn coerce(value: &Value, target: PropertyType) -> Value {
    match (value, target) {
        (Value::String(raw), PropertyType::Number) => {
            number_value(raw.trim().parse::<f64>().unwrap_or(0.0))
        }
        (Value::String(raw), PropertyType::Integer) => {
            Value::from(raw.trim().parse::<i64>().unwrap_or(0))
        }
        (Value::String(raw), PropertyType::Boolean) => {
            Value::Bool(raw.trim().eq_ignore_ascii_case("true"))
        }
        _ => value.clone(),
    }
}

/// Collapses integral floats so `"3"` coerced to number round-trips as `3`,
/// not `3.0`, in the serialized document.
pub(crate) fn number_value(raw: f64) -> Value {
    if raw.is_finite() && raw.fract() == 0.0 && raw.abs() <= i64::MAX as f64 {
        Value::from(raw as i64)
    } else {
        serde_json::Number::from_f64(raw)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from(0))
    }
}

/// Infers a property type from a parsed runtime value.
pub fn infer_type(value: &Value) -> PropertyType {
    match value {
        Value::Number(_) => PropertyType::Number,
        Value::Bool(_) => PropertyType::Boolean,
        Value::Array(_) => PropertyType::Array,
        Value::Object(_) => PropertyType::Object,
        _ => PropertyType::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_are_stable_under_coercion() {
        for ty in [
            PropertyType::String,
            PropertyType::Number,
            PropertyType::Integer,
            PropertyType::Boolean,
            PropertyType::Array,
            PropertyType::Object,
        ] {
            let zero = default_for(ty);
            assert_eq!(coerce(&zero, ty), zero, "coercion must fix {ty:?} zero");
        }
    }

    #[test]
    fn string_coercions_follow_parse_rules() {
        assert_eq!(
            coerce(&Value::String("2.5".into()), PropertyType::Number),
            serde_json::json!(2.5)
        );
        assert_eq!(
            coerce(&Value::String("3".into()), PropertyType::Number),
            serde_json::json!(3)
        );
        assert_eq!(
            coerce(&Value::String("nope".into()), PropertyType::Integer),
            serde_json::json!(0)
        );
        assert_eq!(
            coerce(&Value::String("TRUE".into()), PropertyType::Boolean),
            Value::Bool(true)
        );
        assert_eq!(
            coerce(&Value::String("yes".into()), PropertyType::Boolean),
            Value::Bool(false)
        );
        // Non-string sources pass through unchanged.
        assert_eq!(
            coerce(&serde_json::json!(7), PropertyType::Boolean),
            serde_json::json!(7)
        );
    }

    #[test]
    fn fresh_property_carries_no_constraints() {
        let prop = SchemaProperty::new(PropertyType::Array);
        match &prop {
            SchemaProperty::Array { items, default, .. } => {
                assert_eq!(items.property_type(), PropertyType::String);
                assert!(default.is_none());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(prop.meta().title.is_none());
    }

    #[test]
    fn object_mode_tracks_named_properties() {
        let mut prop = SchemaProperty::new(PropertyType::Object);
        assert_eq!(prop.object_mode(), Some(ObjectMode::KeyValue));

        if let SchemaProperty::Object { properties, .. } = &mut prop {
            properties.insert("host".into(), SchemaProperty::new(PropertyType::String));
        }
        assert_eq!(prop.object_mode(), Some(ObjectMode::Structured));

        if let SchemaProperty::Object { properties, .. } = &mut prop {
            properties.remove("host");
        }
        assert_eq!(prop.object_mode(), Some(ObjectMode::KeyValue));
    }

    #[test]
    fn clearing_default_yields_absent_not_zero() {
        let mut prop = SchemaProperty::String {
            meta: PropertyMeta::default(),
            format: None,
            default: Some("web".into()),
            allowed: Vec::new(),
        };
        prop.clear_default();
        assert!(!prop.has_default());
        assert_eq!(prop.default_value(), None);
        // The serialized schema omits the key entirely.
        let doc = serde_yaml::to_string(&prop).unwrap();
        assert!(!doc.contains("default"));
    }

    #[test]
    fn serialized_form_is_tagged_by_type() {
        let prop = SchemaProperty::new(PropertyType::Boolean);
        let doc = serde_yaml::to_string(&prop).unwrap();
        assert!(doc.contains("type: boolean"));
    }
}
