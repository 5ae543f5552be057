use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use engine_logging::engine_debug;

use crate::AssembleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionReport {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
}

impl ConversionReport {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Turns the rendered index page into the final document.
///
/// The produced file sits next to the index, named after it with
/// [`DocumentConverter::output_extension`].
pub trait DocumentConverter: Send + Sync {
    fn output_extension(&self) -> &str;

    fn convert(&self, index_html: &Path) -> Result<ConversionReport, AssembleError>;

    fn expected_output(&self, index_html: &Path) -> PathBuf {
        index_html.with_extension(self.output_extension())
    }
}

#[derive(Debug, Clone)]
pub struct KindlegenConverter {
    program: PathBuf,
    show_output: bool,
}

impl Default for KindlegenConverter {
    fn default() -> Self {
        Self::new("kindlegen/kindlegen")
    }
}

impl KindlegenConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            show_output: false,
        }
    }

    /// Let kindlegen write to the terminal instead of discarding its output.
    pub fn show_output(mut self, show: bool) -> Self {
        self.show_output = show;
        self
    }
}

impl DocumentConverter for KindlegenConverter {
    fn output_extension(&self) -> &str {
        "mobi"
    }

    fn convert(&self, index_html: &Path) -> Result<ConversionReport, AssembleError> {
        engine_debug!("Running {:?} on {:?}", self.program, index_html);

        let (stdout, stderr) = if self.show_output {
            (Stdio::inherit(), Stdio::inherit())
        } else {
            (Stdio::null(), Stdio::null())
        };

        let status = Command::new(&self.program)
            .arg("-verbose")
            .arg(index_html)
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .map_err(|source| AssembleError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        Ok(ConversionReport {
            exit_code: status.code(),
        })
    }
}
