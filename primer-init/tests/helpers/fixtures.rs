//! Fixture trees written into temporary folders

use std::fs;
use std::path::Path;

/// Write one file, creating parent directories
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        write_file(root, rel, content);
    }
}

/// `count` documentation files, each carrying one distinct requirement
pub fn write_notes(root: &Path, count: usize) {
    for i in 0..count {
        write_file(
            root,
            &format!("docs/note_{:02}.md", i),
            &format!("# Note {}\n\nThe ingest service must accept batch {}.\n", i, i),
        );
    }
}
