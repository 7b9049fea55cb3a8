//! Test helpers for composing filter inputs on disk.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// Temporary directory with UTF-8 path helpers.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.path(name);
        write_utf8(&path, contents.as_bytes());
        path
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path.as_std_path(), contents).expect("write fixture");
}

/// A way crossing the `left=0,right=1,bottom=0,top=1` box plus a relation
/// around it, as JSON lines.
pub(super) const CROSSING_WAY: &str = concat!(
    "{\"type\":\"point\",\"id\":1,\"location\":{\"x\":0.5,\"y\":0.5}}\n",
    "{\"type\":\"point\",\"id\":2,\"location\":{\"x\":5.0,\"y\":5.0}}\n",
    "{\"type\":\"way\",\"id\":10,\"point_ids\":[1,2],\"tags\":{\"highway\":\"path\"}}\n",
    "{\"type\":\"relation\",\"id\":20,\"members\":[{\"kind\":\"way\",\"id\":10,\"role\":\"\"}]}\n",
);

pub(super) fn box_options(extra: &[&str]) -> Vec<String> {
    ["left=0", "right=1", "bottom=0", "top=1"]
        .iter()
        .chain(extra)
        .map(|assignment| (*assignment).to_owned())
        .collect()
}
