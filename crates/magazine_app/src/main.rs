use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use engine_logging::{engine_info, Verbosity};
use magazine_engine::{
    CacheSettings, FetchSettings, Fetcher, ImageProcessor, KindlegenConverter, MagickTransform,
    ManifestSite, ManifestSource, MaudRenderer, Pipeline, PipelineSettings, ReqwestTransport, Site,
};

/// Convert a web-published magazine issue into a single e-book file
#[derive(Parser, Debug)]
#[command(name = "magazine-to-ebook")]
#[command(version)]
#[command(about = "Convert a magazine issue into an e-book", long_about = None)]
struct Args {
    /// Issue manifest: URL or local JSON file
    #[arg(long, value_name = "URL|PATH")]
    manifest: String,

    /// Site name; selects the cache directory
    #[arg(long, default_value = "magazine", value_name = "NAME")]
    name: String,

    /// Prefix of the generated output filename
    #[arg(long, default_value = "magazine", value_name = "PREFIX")]
    prefix: String,

    /// Output file (default: <PREFIX>_<DATE>.mobi)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Directory for the generated output file
    #[arg(long, default_value = ".", value_name = "DIR")]
    output_dir: PathBuf,

    /// Cache root (default: the platform cache directory)
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Path to the kindlegen binary
    #[arg(long, default_value = "kindlegen/kindlegen", value_name = "PATH")]
    kindlegen: PathBuf,

    /// Path to ImageMagick's convert binary
    #[arg(long, default_value = "convert", value_name = "PATH")]
    convert: PathBuf,

    /// Increase verbosity (-v info, -vv debug and converter output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let verbosity = Verbosity::from_count(args.verbose);
    engine_logging::initialize(verbosity);

    let site = ManifestSite::new(&args.name, &args.prefix, ManifestSource::parse(&args.manifest));

    let mut cache = CacheSettings::default();
    if let Some(root) = args.cache_dir {
        cache.root = root;
    }
    let transport =
        ReqwestTransport::new(FetchSettings::default()).context("Failed to build HTTP client")?;
    let fetcher = Fetcher::new(cache.open(site.name()), transport);

    let issue = site
        .scrape(&fetcher)
        .with_context(|| format!("Failed to read issue from {}", site.base_url()))?;
    engine_info!(
        "Issue {} with {} articles",
        issue.date,
        issue.articles.len()
    );

    let mut settings = PipelineSettings::new(site.prefix(), site.base_url());
    settings.output_dir = args.output_dir;
    settings.output_override = args.output;

    let pipeline = Pipeline::new(
        fetcher,
        ImageProcessor::new(MagickTransform::new(args.convert)),
        MaudRenderer,
        KindlegenConverter::new(args.kindlegen).show_output(verbosity.shows_subprocess_output()),
        settings,
    );

    let tempdir = tempfile::Builder::new()
        .prefix("magazine-")
        .tempdir()
        .context("Failed to create temporary directory")?;
    let output = pipeline
        .assemble(&issue, tempdir.path())
        .context("Failed to assemble issue")?;

    println!("{}", output.display());
    Ok(())
}
