use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Write};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::images::StagedImage;

pub const DEFAULT_DOCUMENT_NAME: &str = "export.md";
pub const DEFAULT_IMAGE_DIR: &str = "images";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// In-memory folder tree serialized into a single zip blob.
///
/// Writing the same file path twice keeps the last content.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    directories: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage one page: `<folder>/<document_name>` plus `<folder>/<image_dir>/*`.
    pub fn add_page(
        &mut self,
        folder: &str,
        document_name: &str,
        markdown: &str,
        image_dir: &str,
        images: &[StagedImage],
    ) {
        let folder = folder.trim_matches('/');
        self.add_file(&join(folder, document_name), markdown.as_bytes().to_vec());
        if images.is_empty() {
            return;
        }
        let image_folder = join(folder, image_dir);
        for staged in images {
            self.add_file(&join(&image_folder, &staged.filename), staged.image.bytes.clone());
        }
    }

    /// Store `bytes` at `path`. Empty, `.` and `..` components are dropped so
    /// no entry can land outside the archive root.
    pub fn add_file(&mut self, path: &str, bytes: Vec<u8>) {
        let path = path
            .split('/')
            .filter(|part| !matches!(*part, "" | "." | ".."))
            .collect::<Vec<_>>()
            .join("/");
        if path.is_empty() {
            return;
        }
        let mut parent = path.as_str();
        while let Some((dir, _)) = parent.rsplit_once('/') {
            self.directories.insert(format!("{dir}/"));
            parent = dir;
        }
        self.files.insert(path, bytes);
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn finish(self) -> Result<Vec<u8>, ArchiveError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for dir in &self.directories {
            zip.add_directory(dir.as_str(), options)?;
        }
        for (path, bytes) in &self.files {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(bytes)?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

fn join(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_directories_are_recorded() {
        let mut builder = ArchiveBuilder::new();
        builder.add_file("a/b/export.md", b"x".to_vec());
        assert_eq!(
            builder.directories.iter().cloned().collect::<Vec<_>>(),
            vec!["a/".to_string(), "a/b/".to_string()]
        );
    }

    #[test]
    fn rewriting_a_path_keeps_last_content() {
        let mut builder = ArchiveBuilder::new();
        builder.add_file("a/export.md", b"one".to_vec());
        builder.add_file("a/export.md", b"two".to_vec());
        assert_eq!(builder.file_count(), 1);
        assert_eq!(builder.files["a/export.md"], b"two".to_vec());
    }

    #[test]
    fn dot_components_stay_inside_the_root() {
        let mut builder = ArchiveBuilder::new();
        builder.add_file("../export.md", b"up".to_vec());
        builder.add_file("a/./../b//image.png", b"img".to_vec());
        builder.add_file("..", b"none".to_vec());
        assert_eq!(builder.file_count(), 2);
        assert_eq!(builder.files["export.md"], b"up".to_vec());
        assert_eq!(builder.files["a/b/image.png"], b"img".to_vec());
        assert!(builder.directories.iter().all(|dir| !dir.contains("..")));
    }
}
