use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Key assigned by the remote store when a record is appended.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value stored under each key of the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "isDone", default)]
    pub is_done: bool,
}

impl ItemRecord {
    pub fn new_task(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_done: false,
        }
    }
}

/// Partial update merged into an existing record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "isDone", default, skip_serializing_if = "Option::is_none")]
    pub is_done: Option<bool>,
}

impl ItemPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            is_done: None,
        }
    }

    pub fn set_done(is_done: bool) -> Self {
        Self {
            name: None,
            is_done: Some(is_done),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_done.is_none()
    }

    pub fn apply_to(&self, record: &mut ItemRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(is_done) = self.is_done {
            record.is_done = is_done;
        }
    }
}

/// Row rendered by the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub is_done: bool,
}

/// Full contents of the collection at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: BTreeMap<ItemId, ItemRecord>,
}

impl Snapshot {
    pub fn new(records: BTreeMap<ItemId, ItemRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &ItemId) -> Option<&ItemRecord> {
        self.records.get(id)
    }

    /// Rows in key order. Push keys sort by creation time.
    pub fn into_items(self) -> Vec<Item> {
        self.records
            .into_iter()
            .map(|(id, record)| Item {
                id,
                name: record.name,
                is_done: record.is_done,
            })
            .collect()
    }
}

impl FromIterator<(ItemId, ItemRecord)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (ItemId, ItemRecord)>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}
