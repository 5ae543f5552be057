use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use engine_logging::engine_debug;

use crate::fetch::Fetcher;
use crate::AssembleError;

/// Bytes written per `write` call while saving a download.
pub const CHUNK_SIZE: usize = 128;

/// Rewrites an image file in place.
pub trait ImageTransform: Send + Sync {
    fn apply(&self, path: &Path) -> Result<(), AssembleError>;
}

/// ImageMagick `convert`: fixed width, grayscale, recompressed.
#[derive(Debug, Clone)]
pub struct MagickTransform {
    program: PathBuf,
    width: u32,
    quality: u8,
}

impl Default for MagickTransform {
    fn default() -> Self {
        Self::new("convert")
    }
}

impl MagickTransform {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            width: 800,
            quality: 60,
        }
    }

    pub fn args(&self, path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![path.into()];
        args.extend(
            [
                "-resize".to_string(),
                format!("{}x", self.width),
                "-set".to_string(),
                "colorspace".to_string(),
                "Gray".to_string(),
                "-separate".to_string(),
                "-average".to_string(),
                "-quality".to_string(),
                format!("{}%", self.quality),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(path.into());
        args
    }
}

impl ImageTransform for MagickTransform {
    fn apply(&self, path: &Path) -> Result<(), AssembleError> {
        let program = self.program.display().to_string();
        let status = Command::new(&self.program)
            .args(self.args(path))
            .status()
            .map_err(|source| AssembleError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(AssembleError::ImageTransform {
                program,
                code: status.code(),
            });
        }
        Ok(())
    }
}

pub struct ImageProcessor {
    transform: Box<dyn ImageTransform>,
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new(MagickTransform::default())
    }
}

impl ImageProcessor {
    pub fn new(transform: impl ImageTransform + 'static) -> Self {
        Self {
            transform: Box::new(transform),
        }
    }

    /// Saves `url` to `target`, then transforms the file in place.
    pub fn fetch_and_process(
        &self,
        fetcher: &Fetcher,
        url: &str,
        target: &Path,
    ) -> Result<(), AssembleError> {
        engine_debug!("Downloading {} to {:?}", url, target);
        let response = fetcher.get(url, &[])?;

        let mut file = File::create(target)?;
        for chunk in response.chunks(CHUNK_SIZE) {
            file.write_all(chunk)?;
        }
        file.flush()?;
        drop(file);

        engine_debug!("Resizing and resampling {:?}", target);
        self.transform.apply(target)
    }
}
