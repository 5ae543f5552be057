use std::path::{Path, PathBuf};

use engine_logging::{engine_info, engine_warn};

use crate::convert::DocumentConverter;
use crate::fetch::Fetcher;
use crate::filename::{image_filename, output_filename, COVER_FILENAME};
use crate::image::ImageProcessor;
use crate::issue::IssueContext;
use crate::persist::{ensure_output_dir, move_file, AtomicFileWriter};
use crate::render::{RenderContext, Renderer, INDEX_FILENAME, TEMPLATE_NAMES};
use crate::AssembleError;

pub const CONTEXT_DUMP_FILENAME: &str = "context.json";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Leading part of the generated output filename.
    pub prefix: String,
    /// Where the issue was scraped from; named when nothing was found there.
    pub source_url: String,
    pub output_dir: PathBuf,
    /// Replaces the generated `{prefix}_{date}.{ext}` path entirely.
    pub output_override: Option<PathBuf>,
}

impl PipelineSettings {
    pub fn new(prefix: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            source_url: source_url.into(),
            output_dir: PathBuf::from("."),
            output_override: None,
        }
    }

    pub fn output_path(&self, date: &str, extension: &str) -> PathBuf {
        match &self.output_override {
            Some(path) => path.clone(),
            None => self
                .output_dir
                .join(output_filename(&self.prefix, date, extension)),
        }
    }
}

/// Turns a scraped issue into the final document, strictly in sequence.
pub struct Pipeline {
    fetcher: Fetcher,
    images: ImageProcessor,
    renderer: Box<dyn Renderer>,
    converter: Box<dyn DocumentConverter>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        fetcher: Fetcher,
        images: ImageProcessor,
        renderer: impl Renderer + 'static,
        converter: impl DocumentConverter + 'static,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            images,
            renderer: Box::new(renderer),
            converter: Box::new(converter),
            settings,
        }
    }

    /// Renders `issue` into `tempdir`, converts it and moves the result to its
    /// final path, which is returned.
    ///
    /// `tempdir` must exist and belong to this run alone; it is left in place.
    pub fn assemble(&self, issue: &IssueContext, tempdir: &Path) -> Result<PathBuf, AssembleError> {
        engine_info!("Generating magazine in {:?}", tempdir);
        let writer = AtomicFileWriter::new(tempdir.to_path_buf());

        writer.write(CONTEXT_DUMP_FILENAME, serde_json::to_string_pretty(issue)?)?;

        if issue.articles.is_empty() {
            return Err(AssembleError::EmptyContent {
                source_url: self.settings.source_url.clone(),
            });
        }

        let context = RenderContext::new(issue, tempdir);

        self.images
            .fetch_and_process(&self.fetcher, &issue.cover, &tempdir.join(COVER_FILENAME))?;

        for name in TEMPLATE_NAMES {
            let rendered = self.renderer.render(name, &context)?;
            writer.write(name, rendered)?;
        }

        for article in &issue.articles {
            let Some(url) = &article.image else {
                continue;
            };
            let target = tempdir.join(image_filename(article.idx));
            self.images.fetch_and_process(&self.fetcher, url, &target)?;
        }

        let index = tempdir.join(INDEX_FILENAME);
        let report = self.converter.convert(&index)?;
        let produced = self.converter.expected_output(&index);
        if !report.success() {
            engine_warn!("Converter exited with {:?}", report.exit_code);
        }
        if !produced.exists() {
            return Err(AssembleError::ConversionFailed {
                code: report.exit_code,
                expected: produced,
            });
        }

        let target = self
            .settings
            .output_path(&issue.date, self.converter.output_extension());
        engine_info!("Saving output to {:?}", target);
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_output_dir(parent)?;
        }
        move_file(&produced, &target)?;

        Ok(target)
    }
}
