use crate::strings::blank_to_none;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One file's worth of exiftool output, keyed by bare tag name.
///
/// Keys printed with a group prefix (`-G`, e.g. `EXIF:DateTimeOriginal`)
/// are stored under their bare name; the first occurrence wins so the
/// group order chosen by exiftool is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct TagBag {
    values: Map<String, Value>,
}

impl From<Map<String, Value>> for TagBag {
    fn from(map: Map<String, Value>) -> Self {
        let mut bag = TagBag::default();
        for (key, value) in map {
            bag.insert_if_absent(&key, value);
        }
        bag
    }
}

impl From<TagBag> for Map<String, Value> {
    fn from(bag: TagBag) -> Self {
        bag.values
    }
}

impl TagBag {
    /// Builds a bag from either a flat tag object or exiftool's `-g` output,
    /// where each top-level key is a group holding an object of tags.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(map) = value else {
            return None;
        };
        let grouped = !map.is_empty()
            && map
                .iter()
                .all(|(key, v)| v.is_object() || key == "SourceFile");
        if !grouped {
            return Some(Self::from(map));
        }

        let mut bag = TagBag::default();
        for (key, value) in map {
            match value {
                Value::Object(group) => {
                    for (tag, v) in group {
                        bag.insert_if_absent(&tag, v);
                    }
                }
                other => bag.insert_if_absent(&key, other),
            }
        }
        Some(bag)
    }

    pub fn get(&self, tag: &str) -> Option<&Value> {
        self.values.get(tag)
    }

    /// The trimmed text of a string tag, `None` when missing or blank.
    pub fn get_str(&self, tag: &str) -> Option<&str> {
        blank_to_none(self.values.get(tag).and_then(Value::as_str))
    }

    pub fn remove(&mut self, tag: &str) -> Option<Value> {
        self.values.remove(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.get_str("MIMEType")
    }

    pub fn is_video(&self) -> bool {
        self.mime_type()
            .map(|mime| mime.to_ascii_lowercase().starts_with("video/"))
            .unwrap_or(false)
    }

    fn insert_if_absent(&mut self, key: &str, value: Value) {
        let name = bare_tag_name(key);
        if !self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
        }
    }
}

fn bare_tag_name(key: &str) -> &str {
    key.rsplit(':').next().unwrap_or(key)
}
