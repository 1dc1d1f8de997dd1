use anyhow::Context;
use image::{ImageFormat, RgbImage};
use privacy::OutputSink;
use std::fs;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "student_";
const FILE_SUFFIX: &str = ".jpg";

/// Writes crops as `student_{index:03}.jpg` into one directory.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{index:03}{FILE_SUFFIX}"))
    }

    /// Highest index among the crops already in the directory, 0 when there
    /// are none. New indices continue after it, so gaps left by skipped
    /// detections are never reused.
    pub fn last_index(&self) -> anyhow::Result<usize> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list output directory {}", self.dir.display()))?;

        let mut last = 0;
        for entry in entries {
            let name = entry?.file_name();
            if let Some(index) = parse_index(&name.to_string_lossy()) {
                last = last.max(index);
            }
        }
        Ok(last)
    }
}

fn parse_index(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}

impl OutputSink for DirectorySink {
    fn accept(&mut self, index: usize, crop: &RgbImage) -> anyhow::Result<()> {
        let path = self.path_for(index);
        crop.save_with_format(&path, ImageFormat::Jpeg)
            .with_context(|| format!("Failed to write crop {}", path.display()))?;
        tracing::info!(path = %path.display(), "Saved student crop");
        Ok(())
    }
}
