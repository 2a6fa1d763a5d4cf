use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::{info, warn};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::{error::Result, models::ProcessedImage, utils::check_storage};

pub const ARCHIVE_NAME: &str = "processed-images.zip";

/// File names for `results`, in order. Repeated names get a `-2`, `-3`, ...
/// suffix before the extension so nothing is overwritten.
pub fn output_file_names(results: &[ProcessedImage]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    results
        .iter()
        .map(|result| {
            let name = result.file_name();
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                name
            } else {
                let stem = name.trim_end_matches(".jpg");
                format!("{}-{}.jpg", stem, count)
            }
        })
        .collect()
}

fn payload_size(results: &[ProcessedImage]) -> u64 {
    results.iter().map(|r| r.data.len() as u64).sum()
}

/// `dir/name`, or the first `-2`, `-3`, ... variant that does not exist yet.
fn free_path(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    if !path.exists() {
        return path;
    }

    let stem = name.trim_end_matches(".jpg");
    let free = (2..)
        .map(|n| dir.join(format!("{}-{}.jpg", stem, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(path);
    warn!("{} already exists, writing {} instead", name, free.display());
    free
}

pub fn save_single(result: &ProcessedImage, dir: &Path) -> Result<PathBuf> {
    check_storage(dir, result.data.len() as u64)?;
    let path = free_path(dir, &result.file_name());
    fs::write(&path, &result.data)?;
    info!("Saved {}", path.display());
    Ok(path)
}

pub fn save_all(results: &[ProcessedImage], dir: &Path) -> Result<Vec<PathBuf>> {
    check_storage(dir, payload_size(results))?;

    let mut paths = Vec::with_capacity(results.len());
    for result in results {
        let path = free_path(dir, &result.file_name());
        fs::write(&path, &result.data)?;
        paths.push(path);
    }

    info!(count = paths.len(), "Saved images to {}", dir.display());
    Ok(paths)
}

/// Bundle every result into one zip at `path`. The archive is written to a
/// temporary file next to `path` and only moved into place once complete.
pub fn write_archive(results: &[ProcessedImage], path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    check_storage(dir, payload_size(results))?;

    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = ZipWriter::new(temp.as_file_mut());
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for (result, name) in results.iter().zip(output_file_names(results)) {
            writer.start_file(name, options)?;
            writer.write_all(&result.data)?;
        }
        writer.finish()?;
    }
    temp.persist(path).map_err(|e| e.error)?;

    info!(entries = results.len(), "Wrote archive {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SizePreset;
    use std::io::Read;

    fn result(label: &str, width: u32, height: u32, payload: &[u8]) -> ProcessedImage {
        ProcessedImage {
            size: SizePreset::new(label, width, height),
            data: payload.to_vec(),
            width,
            height,
        }
    }

    #[test]
    fn duplicate_names_get_suffixes() {
        let results = [
            result("Half Page", 300, 600, b"a"),
            result("Half Page", 300, 600, b"b"),
            result("Leaderboard", 728, 90, b"c"),
            result("half  page", 300, 600, b"d"),
        ];
        assert_eq!(
            output_file_names(&results),
            [
                "half-page-300x600.jpg",
                "half-page-300x600-2.jpg",
                "leaderboard-728x90.jpg",
                "half-page-300x600-3.jpg",
            ]
        );
    }

    #[test]
    fn save_single_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = result("Medium Rectangle", 300, 250, b"jpeg bytes");

        let path = save_single(&image, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("medium-rectangle-300x250.jpg"));
        assert_eq!(fs::read(&path).unwrap(), b"jpeg bytes");
    }

    #[test]
    fn save_all_writes_every_result() {
        let dir = tempfile::tempdir().unwrap();
        let results = [
            result("Leaderboard", 728, 90, b"one"),
            result("Wide Skyscraper", 160, 600, b"two"),
        ];

        let paths = save_all(&results, dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(fs::read(dir.path().join("leaderboard-728x90.jpg")).unwrap(), b"one");
        assert_eq!(
            fs::read(dir.path().join("wide-skyscraper-160x600.jpg")).unwrap(),
            b"two"
        );
    }

    #[test]
    fn existing_files_are_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("leaderboard-728x90.jpg");
        fs::write(&existing, b"keep me").unwrap();

        let first = save_single(&result("Leaderboard", 728, 90, b"new"), dir.path()).unwrap();
        assert_eq!(first, dir.path().join("leaderboard-728x90-2.jpg"));

        let results = [
            result("Leaderboard", 728, 90, b"a"),
            result("Leaderboard", 728, 90, b"b"),
        ];
        let paths = save_all(&results, dir.path()).unwrap();
        assert_eq!(
            paths,
            [
                dir.path().join("leaderboard-728x90-3.jpg"),
                dir.path().join("leaderboard-728x90-4.jpg"),
            ]
        );
        assert_eq!(fs::read(&existing).unwrap(), b"keep me");
        assert_eq!(fs::read(&first).unwrap(), b"new");
    }

    #[test]
    fn archive_contains_one_entry_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ARCHIVE_NAME);
        let results = [
            result("Leaderboard", 728, 90, b"one"),
            result("Half Page", 300, 600, b"two"),
        ];

        write_archive(&results, &path).unwrap();

        let mut archive = zip::ZipArchive::new(fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);

        let mut contents = String::new();
        archive
            .by_name("half-page-300x600.jpg")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "two");

        // Only the archive is left behind; the temporary file was renamed.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
