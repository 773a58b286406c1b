use indexmap::IndexMap;
#[cfg(feature = "json")]
use serde::de::DeserializeOwned;

use crate::upload::UploadedFile;

/// One decoded value.
///
/// A name seen once maps to a `Text` or `File`; a name seen again turns into a
/// `List` in stream order. Bracketed names such as `user[email]` or `tags[]`
/// build nested `Map`s and `List`s. A value already stored under a name is
/// never dropped when a bracketed name needs a container there: it becomes the
/// container's first entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    File(UploadedFile),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Value::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up `key` in a `Map` value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    fn empty_for(segment: &KeySegment<'_>) -> Value {
        match segment {
            KeySegment::Push => Value::List(Vec::new()),
            KeySegment::Key(_) => Value::Map(IndexMap::new()),
        }
    }

    fn append(&mut self, value: Value) {
        if let Value::List(items) = self {
            items.push(value);
            return;
        }

        let first = std::mem::replace(self, Value::List(Vec::new()));
        *self = Value::List(vec![first, value]);
    }

    /// Turns this value into a `Map`, keeping list items under their index and
    /// a scalar under `"0"`.
    fn make_map(&mut self) -> &mut IndexMap<String, Value> {
        if !matches!(self, Value::Map(_)) {
            let map = match std::mem::replace(self, Value::Map(IndexMap::new())) {
                Value::List(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| (idx.to_string(), item))
                    .collect(),
                scalar => std::iter::once(("0".to_owned(), scalar)).collect(),
            };
            *self = Value::Map(map);
        }

        match self {
            Value::Map(map) => map,
            _ => unreachable!("value was just turned into a map"),
        }
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a UploadedFile>) {
        match self {
            Value::Text(_) => {}
            Value::File(file) => out.push(file),
            Value::List(items) => items.iter().for_each(|item| item.collect_files(out)),
            Value::Map(map) => map.values().for_each(|item| item.collect_files(out)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeySegment<'a> {
    /// `[]`
    Push,
    /// `[key]`
    Key(&'a str),
}

/// Splits `a[b][]` into `a` and its bracket segments. Names with an unclosed
/// bracket, or starting with one, are plain names. Text after the last `]` is
/// ignored.
fn parse_key(name: &str) -> (&str, Vec<KeySegment<'_>>) {
    let open = match name.find('[') {
        Some(idx) if idx > 0 => idx,
        _ => return (name, Vec::new()),
    };

    let mut segments = Vec::new();
    let mut rest = &name[open..];

    while let Some(inner) = rest.strip_prefix('[') {
        let close = match inner.find(']') {
            Some(close) => close,
            None if segments.is_empty() => return (name, Vec::new()),
            None => break,
        };

        segments.push(match &inner[..close] {
            "" => KeySegment::Push,
            key => KeySegment::Key(key),
        });
        rest = &inner[close + 1..];
    }

    (&name[..open], segments)
}

fn insert(map: &mut IndexMap<String, Value>, key: &str, segments: &[KeySegment<'_>], value: Value) {
    match segments.split_first() {
        None => match map.get_mut(key) {
            Some(existing) => existing.append(value),
            None => {
                map.insert(key.to_owned(), value);
            }
        },
        Some((segment, rest)) => {
            let slot = map.entry(key.to_owned()).or_insert_with(|| Value::empty_for(segment));
            insert_nested(slot, segment, rest, value);
        }
    }
}

fn insert_nested(slot: &mut Value, segment: &KeySegment<'_>, rest: &[KeySegment<'_>], value: Value) {
    match segment {
        KeySegment::Key(key) => insert(slot.make_map(), key, rest, value),
        KeySegment::Push => {
            if !matches!(slot, Value::List(_) | Value::Map(_)) {
                let scalar = std::mem::replace(slot, Value::List(Vec::new()));
                *slot = Value::List(vec![scalar]);
            }

            match slot {
                Value::List(items) => match rest.split_first() {
                    None => items.push(value),
                    Some((next, rest)) => {
                        let mut child = Value::empty_for(next);
                        insert_nested(&mut child, next, rest, value);
                        items.push(child);
                    }
                },
                Value::Map(map) => {
                    let key = map.len().to_string();
                    insert(map, &key, rest, value);
                }
                _ => {}
            }
        }
    }
}

/// The decoded fields of one request body, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    values: IndexMap<String, Value>,
    file_count: usize,
}

impl FormData {
    pub fn new() -> FormData {
        FormData::default()
    }

    /// Adds a value under `name`, appending to anything already stored there.
    ///
    /// # Examples
    ///
    /// ```
    /// use formdec::{FormData, Value};
    ///
    /// let mut form = FormData::new();
    /// form.add_value("tag", Value::Text("a".to_owned()));
    /// form.add_value("tag", Value::Text("b".to_owned()));
    /// form.add_value("user[name]", Value::Text("ann".to_owned()));
    ///
    /// assert_eq!(form.get("tag").and_then(|v| v.as_list()).map(|l| l.len()), Some(2));
    /// assert_eq!(form.get("user").and_then(|v| v.get("name")).and_then(|v| v.as_text()), Some("ann"));
    /// ```
    pub fn add_value(&mut self, name: &str, value: Value) {
        let (key, segments) = parse_key(name);
        insert(&mut self.values, key, &segments, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The first text value stored under `name`.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            Value::Text(text) => Some(text),
            Value::List(items) => items.iter().find_map(Value::as_text),
            _ => None,
        }
    }

    /// The first file stored under `name`.
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        match self.values.get(name)? {
            Value::File(file) => Some(file),
            Value::List(items) => items.iter().find_map(Value::as_file),
            _ => None,
        }
    }

    /// Every file in the form, nested ones included, in stream order.
    pub fn files(&self) -> Vec<&UploadedFile> {
        let mut out = Vec::new();
        self.values.values().for_each(|value| value.collect_files(&mut out));
        out
    }

    /// Number of file fields seen while decoding, including files dropped by
    /// [`DecodeLimits::max_file_count`](crate::DecodeLimits::max_file_count).
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub(crate) fn record_file(&mut self) {
        self.file_count += 1;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.values.iter()
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.values
    }

    /// Parses the first text value under `name` as JSON.
    ///
    /// # Optional
    ///
    /// This requires the optional `json` feature to be enabled.
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    pub fn json<T: DeserializeOwned>(&self, name: &str) -> crate::Result<Option<T>> {
        self.text(name)
            .map(|text| serde_json::from_str(text).map_err(crate::Error::DecodeJson))
            .transpose()
    }
}

impl<'a> IntoIterator for &'a FormData {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
