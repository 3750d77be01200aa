use std::collections::BTreeMap;

use nv_core::COLLABORATOR_IMPORT;
use serde_json::Map;

use super::*;

/// Key-value game storage. The narration keeps its own ledgers here under
/// reserved keys so they travel with every snapshot.
pub trait Storage {
    fn get_variable(&self, key: &str) -> Option<Value>;
    fn set_variable(&mut self, key: &str, value: Value);
    fn remove_variable(&mut self, key: &str);
    fn export(&self) -> Value;
    fn import(&mut self, snapshot: Value) -> Result<(), NarrationError>;
}

/// Scene graph seen from the narration: a set of named elements.
pub trait Canvas {
    fn show(&mut self, alias: &str, element: Value);
    fn remove(&mut self, alias: &str);
    fn export(&self) -> Value;
    fn import(&mut self, snapshot: Value) -> Result<(), NarrationError>;
}

pub trait Sound {
    fn play(&mut self, channel: &str, sound: Value);
    fn stop(&mut self, channel: &str);
    fn export(&self) -> Value;
    fn import(&mut self, snapshot: Value) -> Result<(), NarrationError>;
}

fn object_snapshot(
    owner: &str,
    snapshot: Value,
) -> Result<BTreeMap<String, Value>, NarrationError> {
    match snapshot {
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Null => Ok(BTreeMap::new()),
        other => Err(NarrationError::new(
            COLLABORATOR_IMPORT,
            format!(
                "{} snapshot must be an object, got {}.",
                owner,
                json_kind(&other)
            ),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn export_map(entries: &BTreeMap<String, Value>) -> Value {
    Value::Object(
        entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<Map<String, Value>>(),
    )
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStorage {
    variables: BTreeMap<String, Value>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_variable(&self, key: &str) -> Option<Value> {
        self.variables.get(key).cloned()
    }

    fn set_variable(&mut self, key: &str, value: Value) {
        self.variables.insert(key.to_string(), value);
    }

    fn remove_variable(&mut self, key: &str) {
        self.variables.remove(key);
    }

    fn export(&self) -> Value {
        export_map(&self.variables)
    }

    fn import(&mut self, snapshot: Value) -> Result<(), NarrationError> {
        self.variables = object_snapshot("storage", snapshot)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryCanvas {
    elements: BTreeMap<String, Value>,
}

impl MemoryCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(&self, alias: &str) -> Option<&Value> {
        self.elements.get(alias)
    }
}

impl Canvas for MemoryCanvas {
    fn show(&mut self, alias: &str, element: Value) {
        self.elements.insert(alias.to_string(), element);
    }

    fn remove(&mut self, alias: &str) {
        self.elements.remove(alias);
    }

    fn export(&self) -> Value {
        export_map(&self.elements)
    }

    fn import(&mut self, snapshot: Value) -> Result<(), NarrationError> {
        self.elements = object_snapshot("canvas", snapshot)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySound {
    channels: BTreeMap<String, Value>,
}

impl MemorySound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playing(&self, channel: &str) -> Option<&Value> {
        self.channels.get(channel)
    }
}

impl Sound for MemorySound {
    fn play(&mut self, channel: &str, sound: Value) {
        self.channels.insert(channel.to_string(), sound);
    }

    fn stop(&mut self, channel: &str) {
        self.channels.remove(channel);
    }

    fn export(&self) -> Value {
        export_map(&self.channels)
    }

    fn import(&mut self, snapshot: Value) -> Result<(), NarrationError> {
        self.channels = object_snapshot("sound", snapshot)?;
        Ok(())
    }
}

#[cfg(test)]
mod collaborators_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_storage_export_import_roundtrip() {
        let mut storage = MemoryStorage::new();
        storage.set_variable("gold", json!(10));
        storage.set_variable("name", json!("Ada"));
        storage.remove_variable("name");
        let exported = storage.export();
        assert_eq!(exported, json!({"gold": 10}));

        let mut restored = MemoryStorage::new();
        restored.import(exported).expect("import should pass");
        assert_eq!(restored, storage);
    }

    #[test]
    fn import_rejects_non_object_snapshots() {
        let mut canvas = MemoryCanvas::new();
        let error = canvas.import(json!([1, 2])).expect_err("array should fail");
        assert_eq!(error.code, COLLABORATOR_IMPORT);
        assert!(error.message.contains("array"));

        let mut sound = MemorySound::new();
        sound.play("bgm", json!("rain.ogg"));
        sound.import(Value::Null).expect("null clears channels");
        assert!(sound.playing("bgm").is_none());
    }
}
