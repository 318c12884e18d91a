//! Rebuilds [`crate::tags`] from the tags exiftool finds in a set of sample files.
//!
//! ```no_run
//! # use exiftool_async::{ExifTool, ExifToolError};
//! # use exiftool_async::mktags::{self, DEFAULT_MIN_VALUES};
//! # async fn run() -> Result<(), ExifToolError> {
//! let exiftool = ExifTool::new().await?;
//! let files = mktags::find_files("test-images", &["jpg"]);
//! let collector = mktags::sample(&exiftool, &files, 8).await;
//! std::fs::write("src/tags.rs", mktags::render(&collector, DEFAULT_MIN_VALUES))?;
//! exiftool.end().await;
//! # Ok(())
//! # }
//! ```

mod collector;
mod render;

pub use collector::{ObservedTag, TagCollector, ValueType};
pub use render::render;

use crate::exiftool::ExifTool;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A tag must be seen in more than this many files to get a field.
pub const DEFAULT_MIN_VALUES: usize = 10;

/// Reads every file with [`ExifTool::read_grouped`], at most `concurrency`
/// at a time, and collects the tags found.
///
/// Files that can't be read are logged and skipped.
pub async fn sample<P: AsRef<Path>>(
    exiftool: &ExifTool,
    files: &[P],
    concurrency: usize,
) -> TagCollector {
    let total = files.len();
    let mut reads = stream::iter(files.iter().map(|file| async move {
        let file = file.as_ref();
        (file, exiftool.read_grouped(file).await)
    }))
    .buffer_unordered(concurrency.max(1));

    let mut collector = TagCollector::default();
    let mut done = 0;
    while let Some((file, result)) = reads.next().await {
        done += 1;
        match result.and_then(|grouped| grouped.ensure_ok()) {
            Ok(grouped) => collector.add_grouped(&grouped),
            Err(err) => log::warn!("Skipping {}: {err}", file.display()),
        }
        if done % 100 == 0 || done == total {
            log::info!("Read {done}/{total} files, {} unique tags", collector.len());
        }
    }
    collector
}

/// Files under `root` whose extension matches one of `extensions`, ignoring case. Sorted.
pub fn find_files<S: AsRef<str>>(root: impl AsRef<Path>, extensions: &[S]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_extension(path, extensions))
        .collect();
    files.sort();
    files
}

fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.as_ref().trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}
