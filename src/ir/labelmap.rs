//! Labelmap reader/writer and category-list derivation.
//!
//! A labelmap is a JSON array of `{object_id, object_name, ...}` entries.
//! Object id 0 is the background sentinel. The category list derived from
//! it is built once per run and shared by every manifest of that run.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ids::CategoryId;
use super::model::Category;
use crate::error::DatasetError;

/// One labelmap entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelmapEntry {
    pub object_id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard_shortcut: Option<String>,

    pub object_name: String,
}

impl LabelmapEntry {
    fn numbered(id: u64, name: impl Into<String>) -> Self {
        Self {
            object_id: id,
            label_id: Some(id),
            keyboard_shortcut: Some(id.to_string()),
            object_name: name.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labelmap {
    pub entries: Vec<LabelmapEntry>,
}

impl Labelmap {
    /// Background at 0 followed by `names` numbered from 1.
    pub fn from_category_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut entries = vec![LabelmapEntry::numbered(0, "background")];
        entries.extend(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| LabelmapEntry::numbered(i as u64 + 1, name.as_ref())),
        );
        Self { entries }
    }

    /// Object id to name, sorted by id. A later entry with the same id
    /// replaces an earlier one.
    pub fn names_by_id(&self) -> BTreeMap<u64, &str> {
        self.entries
            .iter()
            .map(|entry| (entry.object_id, entry.object_name.as_str()))
            .collect()
    }

    /// Derives the run's category list.
    ///
    /// Sorted by object id; id 0 is always `background`/`background`, every
    /// other id gets its labelmap name and `supercategory`.
    pub fn categories(&self, supercategory: &str) -> Vec<Category> {
        self.names_by_id()
            .into_iter()
            .map(|(id, name)| {
                if id == 0 {
                    Category::background()
                } else {
                    Category::new(id, name, supercategory)
                }
            })
            .collect()
    }

    /// The id of the entry named `name`, if any.
    pub fn id_of(&self, name: &str) -> Option<CategoryId> {
        self.names_by_id()
            .into_iter()
            .find(|(_, entry_name)| *entry_name == name)
            .map(|(id, _)| CategoryId::new(id))
    }
}

/// Reads a labelmap JSON file.
pub fn read_labelmap(path: &Path) -> Result<Labelmap, DatasetError> {
    let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| DatasetError::LabelmapParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a labelmap JSON file.
pub fn write_labelmap(path: &Path, labelmap: &Labelmap) -> Result<(), DatasetError> {
    let file = File::create(path).map_err(|e| DatasetError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, labelmap).map_err(|source| {
        DatasetError::JsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().map_err(|e| DatasetError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_sorted_with_background() {
        let labelmap: Labelmap = serde_json::from_str(
            r#"[
                {"object_id": 2, "object_name": "bacterial_spot"},
                {"object_id": 0, "object_name": "bg"},
                {"object_id": 1, "object_name": "healthy", "label_id": 1}
            ]"#,
        )
        .unwrap();

        let categories = labelmap.categories("java_plum_leaf");
        assert_eq!(categories.len(), 3);
        assert_eq!(categories[0], Category::background());
        assert_eq!(categories[1], Category::new(1u64, "healthy", "java_plum_leaf"));
        assert_eq!(categories[2].name, "bacterial_spot");
    }

    #[test]
    fn test_duplicate_id_last_wins() {
        let labelmap: Labelmap = serde_json::from_str(
            r#"[{"object_id": 1, "object_name": "old"}, {"object_id": 1, "object_name": "new"}]"#,
        )
        .unwrap();
        let categories = labelmap.categories("leaf");
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "new");
    }

    #[test]
    fn test_from_category_names() {
        let labelmap = Labelmap::from_category_names(&["healthy", "dry"]);
        assert_eq!(labelmap.entries.len(), 3);
        assert_eq!(labelmap.entries[2].keyboard_shortcut.as_deref(), Some("2"));
        assert_eq!(labelmap.id_of("dry"), Some(CategoryId::new(2)));
        assert_eq!(labelmap.id_of("sooty_mold"), None);

        let json = serde_json::to_string(&labelmap).unwrap();
        assert!(json.starts_with(r#"[{"object_id":0,"label_id":0,"keyboard_shortcut":"0","object_name":"background"}"#));
    }
}
