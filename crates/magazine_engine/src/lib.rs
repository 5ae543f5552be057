//! Magazine engine: cached fetching, image processing and issue assembly.
mod cache;
mod convert;
mod fetch;
mod filename;
mod image;
mod issue;
mod persist;
mod pipeline;
mod render;
mod site;
mod types;
mod widont;

pub use cache::{
    cache_key, CacheSettings, CacheStore, DiskCacheStore, KeyedCache, MemoryCacheStore,
    DEFAULT_MAX_AGE,
};
pub use convert::{ConversionReport, DocumentConverter, KindlegenConverter};
pub use fetch::{CachedResponse, FetchSettings, Fetcher, ReqwestTransport, Transport};
pub use filename::{image_filename, output_filename, COVER_FILENAME, IMAGE_EXTENSION};
pub use image::{ImageProcessor, ImageTransform, MagickTransform, CHUNK_SIZE};
pub use issue::{group_by_subsection, group_runs, Article, GroupedSection, IssueContext};
pub use persist::{ensure_output_dir, move_file, AtomicFileWriter, PersistError};
pub use pipeline::{Pipeline, PipelineSettings, CONTEXT_DUMP_FILENAME};
pub use render::{
    MaudRenderer, RenderContext, Renderer, INDEX_FILENAME, STYLE_FILENAME, TEMPLATE_NAMES,
    TOC_FILENAME,
};
pub use site::{ManifestSite, ManifestSource, Site};
pub use types::{AssembleError, FailureKind, FetchError};
pub use widont::widont;
