// Filesystem helpers for a download run: the timestamped run directory,
// extension normalization, and optional ZIP archiving of the results.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Create `base/Download/<date>_<H-M-S>/` and return it. Every run gets
/// its own directory so reruns never overwrite earlier results.
pub fn provision_download_dir(base: &Path) -> io::Result<PathBuf> {
    let download_root = base.join("Download");
    fs::create_dir_all(&download_root)?;

    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let stamp_format = format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = now
        .format(&stamp_format)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let run_dir = download_root.join(stamp);
    fs::create_dir(&run_dir)?;
    Ok(run_dir)
}

/// Rename every finished file in `dir` to carry `extension`. In-flight
/// staging files (`.part`) are left alone.
pub fn normalize_extensions(dir: &Path, extension: &str) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(".part") || name.ends_with(&format!(".{}", extension)) {
            continue;
        }
        let renamed = path.with_extension(extension);
        fs::rename(&path, &renamed)?;
    }
    Ok(())
}

/// Pack everything under `dir` into `<dir>.zip`, then remove the directory.
/// Returns the archive path.
pub fn create_zip_archive(dir: &Path) -> io::Result<PathBuf> {
    let zip_path = dir.with_extension("zip");
    info!("creating archive {:?}", zip_path);

    let file = File::create(&zip_path)?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut buffer = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        writer.start_file(relative.to_string_lossy(), options)?;
        let mut source = File::open(entry.path())?;
        buffer.clear();
        source.read_to_end(&mut buffer)?;
        writer.write_all(&buffer)?;
    }
    writer.finish()?;

    if let Err(e) = fs::remove_dir_all(dir) {
        warn!("could not remove archived directory {:?}: {}", dir, e);
    }

    Ok(zip_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn provisions_a_fresh_run_directory_per_call() {
        let base = tempdir().unwrap();
        let run = provision_download_dir(base.path()).unwrap();
        assert!(run.is_dir());
        assert!(run.starts_with(base.path().join("Download")));
    }

    #[test]
    fn normalizes_extensions_but_skips_staging_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("song.m4a"), b"audio").unwrap();
        fs::write(dir.path().join("done.mp3"), b"audio").unwrap();
        fs::write(dir.path().join("busy.m4a.part"), b"partial").unwrap();

        normalize_extensions(dir.path(), "mp3").unwrap();

        assert!(dir.path().join("song.mp3").is_file());
        assert!(dir.path().join("done.mp3").is_file());
        assert!(dir.path().join("busy.m4a.part").is_file());
        assert!(!dir.path().join("song.m4a").exists());
    }

    #[test]
    fn archives_directory_contents_and_removes_the_directory() {
        let base = tempdir().unwrap();
        let dir = base.path().join("run");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("clip.mp4"), b"video bytes").unwrap();
        fs::write(dir.join("track.mp3"), b"audio bytes").unwrap();

        let zip_path = create_zip_archive(&dir).unwrap();

        assert!(zip_path.is_file());
        assert_eq!(zip_path, base.path().join("run.zip"));
        assert!(!dir.exists());

        let archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["clip.mp4", "track.mp3"]);
    }
}
