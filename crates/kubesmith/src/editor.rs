use serde_json::{Map, Value};

use crate::schema::{
    ObjectMode, PropertyMeta, PropertyType, SchemaProperty, StringFormat, coerce, default_for,
    infer_type,
};

/// One `(key, value, type)` triple managed while an object property is in
/// key-value mode.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyValueEntry {
    pub key: String,
    pub value: Value,
    pub value_type: PropertyType,
}

/// A per-field edit session over a working copy of one [`SchemaProperty`].
///
/// Mutations accumulate on the working copy; [`PropertyEditor::commit`]
/// folds derived state back in and returns the canonical property. Owners
/// must overwrite their previous copy with the committed value, never merge.
/// Several mutations between commits coalesce into a single snapshot by
/// construction.
#[derive(Clone, Debug)]
pub struct PropertyEditor {
    property: SchemaProperty,
    kv_entries: Vec<KeyValueEntry>,
}

impl Default for PropertyEditor {
    fn default() -> Self {
        Self::new(PropertyType::String)
    }
}

impl PropertyEditor {
    /// Starts a session on a fresh property of the given type.
    pub fn new(ty: PropertyType) -> Self {
        Self::open(SchemaProperty::new(ty))
    }

    /// Starts a session on an existing property. For an object in key-value
    /// mode the entry list is derived from the stored default mapping.
    pub fn open(property: SchemaProperty) -> Self {
        let kv_entries = match &property {
            SchemaProperty::Object {
                properties,
                default,
                ..
            } if properties.is_empty() => default
                .as_ref()
                .map(|map| {
                    map.iter()
                        .map(|(key, value)| KeyValueEntry {
                            key: key.clone(),
                            value: value.clone(),
                            value_type: infer_type(value),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        Self {
            property,
            kv_entries,
        }
    }

    /// The working copy as currently accumulated. Prefer [`commit`] for the
    /// canonical emission.
    ///
    /// [`commit`]: PropertyEditor::commit
    pub fn property(&self) -> &SchemaProperty {
        &self.property
    }

    pub fn property_type(&self) -> PropertyType {
        self.property.property_type()
    }

    pub fn object_mode(&self) -> Option<ObjectMode> {
        self.property.object_mode()
    }

    // ---- type transitions -------------------------------------------------

    /// Changes the property type. Default, enum, items, and nested
    /// properties are always reset; title and description carry over.
    pub fn set_type(&mut self, ty: PropertyType) {
        if ty == self.property.property_type() {
            return;
        }
        let meta = self.property.meta().clone();
        self.property = SchemaProperty::new(ty);
        *self.property.meta_mut() = meta;
        self.kv_entries.clear();
    }

    // ---- descriptive metadata ---------------------------------------------

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.property.meta_mut().title = Some(title.into());
    }

    pub fn clear_title(&mut self) {
        self.property.meta_mut().title = None;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.property.meta_mut().description = Some(description.into());
    }

    pub fn clear_description(&mut self) {
        self.property.meta_mut().description = None;
    }

    /// Sets the string format. No-op on non-string properties.
    pub fn set_format(&mut self, value: Option<StringFormat>) {
        if let SchemaProperty::String { format, .. } = &mut self.property {
            *format = value;
        }
    }

    // ---- default ----------------------------------------------------------

    /// Sets the default override, coercing string inputs to the property's
    /// type. Values that cannot be shaped to the type are ignored.
    pub fn set_default(&mut self, value: Value) {
        let coerced = coerce(&value, self.property.property_type());
        match (&mut self.property, coerced) {
            (SchemaProperty::String { default, .. }, Value::String(s)) => *default = Some(s),
            (SchemaProperty::Number { default, .. }, Value::Number(n)) => {
                *default = n.as_f64();
            }
            (SchemaProperty::Integer { default, .. }, Value::Number(n)) => {
                *default = n.as_i64();
            }
            (SchemaProperty::Boolean { default, .. }, Value::Bool(b)) => *default = Some(b),
            (SchemaProperty::Array { default, .. }, Value::Array(items)) => {
                *default = Some(items);
            }
            (SchemaProperty::Object { default, .. }, Value::Object(map)) => {
                *default = Some(map);
            }
            _ => {}
        }
    }

    /// Removes the default override entirely ("no override"), never writes
    /// the type's zero value.
    pub fn clear_default(&mut self) {
        self.property.clear_default();
    }

    // ---- enum (string only) -----------------------------------------------

    /// The current enum option list. Empty for non-string properties.
    pub fn enum_options(&self) -> &[String] {
        match &self.property {
            SchemaProperty::String { allowed, .. } => allowed,
            _ => &[],
        }
    }

    /// Adds an enum value. Returns `false` without surfacing an error when
    /// the trimmed input is empty or already present.
    pub fn add_enum_value(&mut self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return false;
        }
        match &mut self.property {
            SchemaProperty::String { allowed, .. } => {
                if allowed.iter().any(|existing| existing == trimmed) {
                    return false;
                }
                allowed.push(trimmed.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn remove_enum_value(&mut self, value: &str) -> bool {
        match &mut self.property {
            SchemaProperty::String { allowed, .. } => {
                let before = allowed.len();
                allowed.retain(|existing| existing != value);
                allowed.len() != before
            }
            _ => false,
        }
    }

    // ---- array items ------------------------------------------------------

    /// Declared element type of an array property.
    pub fn item_type(&self) -> Option<PropertyType> {
        match &self.property {
            SchemaProperty::Array { items, .. } => Some(items.property_type()),
            _ => None,
        }
    }

    /// Changes the shared element type. Existing items are cleared, not
    /// coerced.
    pub fn set_item_type(&mut self, ty: PropertyType) {
        if let SchemaProperty::Array { items, default, .. } = &mut self.property {
            if items.property_type() != ty {
                *items = Box::new(SchemaProperty::new(ty));
                *default = None;
            }
        }
    }

    /// The current ordered item list.
    pub fn items(&self) -> &[Value] {
        match &self.property {
            SchemaProperty::Array {
                default: Some(items),
                ..
            } => items,
            _ => &[],
        }
    }

    /// Appends the element type's zero value.
    pub fn add_item(&mut self) {
        if let SchemaProperty::Array { items, default, .. } = &mut self.property {
            let zero = default_for(items.property_type());
            default.get_or_insert_with(Vec::new).push(zero);
        }
    }

    pub fn update_item(&mut self, index: usize, value: Value) {
        if let SchemaProperty::Array {
            items,
            default: Some(existing),
            ..
        } = &mut self.property
        {
            if let Some(slot) = existing.get_mut(index) {
                *slot = coerce(&value, items.property_type());
            }
        }
    }

    pub fn remove_item(&mut self, index: usize) {
        if let SchemaProperty::Array {
            default: Some(existing),
            ..
        } = &mut self.property
        {
            if index < existing.len() {
                existing.remove(index);
            }
        }
    }

    // ---- object: key-value mode -------------------------------------------

    /// The working `(key, value, type)` triples while in key-value mode.
    pub fn kv_entries(&self) -> &[KeyValueEntry] {
        &self.kv_entries
    }

    pub fn add_pair(&mut self) {
        if self.object_mode() == Some(ObjectMode::KeyValue) {
            self.kv_entries.push(KeyValueEntry {
                key: String::new(),
                value: default_for(PropertyType::String),
                value_type: PropertyType::String,
            });
        }
    }

    pub fn set_pair_key(&mut self, index: usize, key: impl Into<String>) {
        if let Some(entry) = self.kv_entries.get_mut(index) {
            entry.key = key.into();
        }
    }

    pub fn set_pair_value(&mut self, index: usize, value: Value) {
        if let Some(entry) = self.kv_entries.get_mut(index) {
            entry.value = coerce(&value, entry.value_type);
        }
    }

    /// Retypes one pair, coercing its current value to the new type.
    pub fn set_pair_type(&mut self, index: usize, ty: PropertyType) {
        if let Some(entry) = self.kv_entries.get_mut(index) {
            entry.value = coerce(&entry.value, ty);
            entry.value_type = ty;
        }
    }

    pub fn remove_pair(&mut self, index: usize) {
        if index < self.kv_entries.len() {
            self.kv_entries.remove(index);
        }
    }

    // ---- object: structured mode ------------------------------------------

    /// Named sub-properties while in structured mode.
    pub fn structured_properties(&self) -> Option<&std::collections::BTreeMap<String, SchemaProperty>> {
        match &self.property {
            SchemaProperty::Object { properties, .. } => Some(properties),
            _ => None,
        }
    }

    /// Adds a named sub-property. Adding the first one flips the object into
    /// structured mode and discards any key-value pairs (destructive, not a
    /// conversion). Returns `false` when the trimmed name is empty or taken.
    pub fn add_property(&mut self, name: &str, ty: PropertyType) -> bool {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return false;
        }
        if let SchemaProperty::Object {
            properties,
            default,
            ..
        } = &mut self.property
        {
            if properties.contains_key(trimmed) {
                return false;
            }
            if properties.is_empty() {
                // Entering structured mode discards the open mapping.
                *default = None;
                self.kv_entries.clear();
            }
            properties.insert(trimmed.to_string(), SchemaProperty::new(ty));
            true
        } else {
            false
        }
    }

    /// Moves a sub-property's schema from the old key to the new key,
    /// carrying forward its previously set title override.
    pub fn rename_property(&mut self, old: &str, new: &str) -> bool {
        let trimmed = new.trim();
        if trimmed.is_empty() || trimmed == old {
            return false;
        }
        if let SchemaProperty::Object { properties, .. } = &mut self.property {
            if properties.contains_key(trimmed) {
                return false;
            }
            match properties.remove(old) {
                Some(schema) => {
                    properties.insert(trimmed.to_string(), schema);
                    true
                }
                None => false,
            }
        } else {
            false
        }
    }

    /// Retypes a named sub-property. The sub-property's default, enum,
    /// items, and nested properties reset; its title and description carry
    /// over.
    pub fn set_property_type(&mut self, name: &str, ty: PropertyType) -> bool {
        if let SchemaProperty::Object { properties, .. } = &mut self.property {
            if let Some(existing) = properties.get_mut(name) {
                if existing.property_type() != ty {
                    let meta = existing.meta().clone();
                    *existing = SchemaProperty::new(ty);
                    *existing.meta_mut() = meta;
                }
                return true;
            }
        }
        false
    }

    /// Replaces a named sub-property wholesale (e.g. from a nested editor's
    /// committed snapshot).
    pub fn replace_property(&mut self, name: &str, schema: SchemaProperty) -> bool {
        if let SchemaProperty::Object { properties, .. } = &mut self.property {
            if let Some(slot) = properties.get_mut(name) {
                *slot = schema;
                return true;
            }
        }
        false
    }

    /// Removes a named sub-property. Removing the last one leaves an empty
    /// `properties` map, which flips the object back to key-value mode on
    /// the next classification.
    pub fn remove_property(&mut self, name: &str) -> bool {
        if let SchemaProperty::Object { properties, .. } = &mut self.property {
            properties.remove(name).is_some()
        } else {
            false
        }
    }

    // ---- emission ----------------------------------------------------------

    /// Folds derived state back into the working copy and returns the
    /// canonical property. Empty-string keys are dropped silently while
    /// folding key-value pairs; an entry list that folds to nothing leaves
    /// the default absent.
    pub fn commit(&mut self) -> SchemaProperty {
        if self.property.object_mode() == Some(ObjectMode::KeyValue) {
            let mut map = Map::new();
            for entry in &self.kv_entries {
                let key = entry.key.trim();
                if key.is_empty() {
                    continue;
                }
                map.insert(key.to_string(), entry.value.clone());
            }
            if let SchemaProperty::Object { default, .. } = &mut self.property {
                *default = if map.is_empty() { None } else { Some(map) };
            }
        }
        self.property.clone()
    }
}
