#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "#item,x,y,width,height,label\n";

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// A dataset tree under a temporary root, laid out the way conversion
/// expects it.
pub struct DatasetTree {
    pub dir: tempfile::TempDir,
}

impl DatasetTree {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn category(&self, category: &str) -> PathBuf {
        self.root().join("java_plums").join(category)
    }

    /// Writes `images/<name>` as a BMP, whatever the extension says.
    /// imagesize sniffs the header, not the extension.
    pub fn image(&self, category: &str, name: &str, width: u32, height: u32) -> &Self {
        write_bmp(&self.category(category).join("images").join(name), width, height);
        self
    }

    pub fn csv(&self, category: &str, stem: &str, body: &str) -> &Self {
        let path = self.category(category).join("csv").join(format!("{stem}.csv"));
        fs::create_dir_all(path.parent().unwrap()).expect("create csv dir");
        fs::write(path, body).expect("write csv");
        self
    }

    pub fn split(&self, category: &str, split: &str, body: &str) -> &Self {
        let path = self
            .category(category)
            .join("sets")
            .join(format!("{split}.txt"));
        fs::create_dir_all(path.parent().unwrap()).expect("create sets dir");
        fs::write(path, body).expect("write split file");
        self
    }

    /// Standard labelmap: background plus the given names from 1.
    pub fn labelmap(&self, names: &[&str]) -> &Self {
        let mut entries = vec![serde_json::json!({"object_id": 0, "object_name": "background"})];
        for (i, name) in names.iter().enumerate() {
            entries.push(serde_json::json!({"object_id": i + 1, "object_name": name}));
        }
        let path = self.root().join("java_plums").join("labelmap.json");
        fs::create_dir_all(path.parent().unwrap()).expect("create dataset dir");
        fs::write(path, serde_json::to_string_pretty(&entries).unwrap()).expect("write labelmap");
        self
    }

    pub fn read_json(&self, relative: &str) -> serde_json::Value {
        let text = fs::read_to_string(self.root().join(relative))
            .unwrap_or_else(|e| panic!("read {relative}: {e}"));
        serde_json::from_str(&text).expect("parse json")
    }
}
