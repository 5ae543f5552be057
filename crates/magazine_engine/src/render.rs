//! Markup generation for the converter input.
//!
//! The engine only fixes what a renderer receives ([`RenderContext`]) and
//! which files it must produce ([`TEMPLATE_NAMES`]). [`MaudRenderer`] is the
//! built-in implementation.

use std::path::Path;

use maud::{html, Markup, PreEscaped, DOCTYPE};
use serde::Serialize;

use crate::filename::{image_filename, COVER_FILENAME};
use crate::issue::{group_by_subsection, GroupedSection, IssueContext};
use crate::widont::widont;
use crate::AssembleError;

pub const INDEX_FILENAME: &str = "index.html";
pub const TOC_FILENAME: &str = "toc.html";
pub const STYLE_FILENAME: &str = "style.css";

/// Rendered in this order, each written to the temp dir under its own name.
pub const TEMPLATE_NAMES: [&str; 3] = [INDEX_FILENAME, TOC_FILENAME, STYLE_FILENAME];

/// Issue variables plus the fields derived for one run.
///
/// Serializes flat: every issue field (including site-specific ones) sits next
/// to `grouped` and `tempdir`, which is what file-based template engines expect.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext<'a> {
    #[serde(flatten)]
    pub issue: &'a IssueContext,
    pub grouped: Vec<GroupedSection<'a>>,
    pub tempdir: &'a Path,
}

impl<'a> RenderContext<'a> {
    pub fn new(issue: &'a IssueContext, tempdir: &'a Path) -> Self {
        Self {
            issue,
            grouped: group_by_subsection(&issue.articles),
            tempdir,
        }
    }
}

pub trait Renderer: Send + Sync {
    fn render(&self, name: &str, context: &RenderContext<'_>) -> Result<String, AssembleError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MaudRenderer;

impl Renderer for MaudRenderer {
    fn render(&self, name: &str, context: &RenderContext<'_>) -> Result<String, AssembleError> {
        match name {
            INDEX_FILENAME => Ok(index(context).into_string()),
            TOC_FILENAME => Ok(toc(context).into_string()),
            STYLE_FILENAME => Ok(STYLESHEET.to_string()),
            other => Err(AssembleError::Render(format!("unknown template {other}"))),
        }
    }
}

fn anchor(idx: u32) -> String {
    format!("article-{idx}")
}

/// Escapes plain text, then glues its last two words together.
fn widont_text(text: &str) -> Markup {
    let escaped = html! { (text) }.into_string();
    PreEscaped(widont(&escaped))
}

fn index(context: &RenderContext<'_>) -> Markup {
    let issue = context.issue;
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (issue.title()) }
                link rel="stylesheet" type="text/css" href=(STYLE_FILENAME);
            }
            body {
                div.cover {
                    img src=(COVER_FILENAME) alt="Cover";
                    p.date { (issue.date) }
                }
                p.contents { a href=(TOC_FILENAME) { "Contents" } }
                @for section in &context.grouped {
                    h1.subsection { (section.label) }
                    @for article in &section.articles {
                        div.article id=(anchor(article.idx)) {
                            h2 { (widont_text(&article.title)) }
                            @if let Some(byline) = &article.byline {
                                p.byline { (byline) }
                            }
                            @if article.image.is_some() {
                                img.lead src=(image_filename(article.idx)) alt="";
                            }
                            div.body { (PreEscaped(widont(&article.body))) }
                        }
                    }
                }
            }
        }
    }
}

fn toc(context: &RenderContext<'_>) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "Contents" }
                link rel="stylesheet" type="text/css" href=(STYLE_FILENAME);
            }
            body {
                h1 { (context.issue.title()) }
                @for section in &context.grouped {
                    h2 { (section.label) }
                    ul {
                        @for article in &section.articles {
                            li {
                                a href=(format!("{INDEX_FILENAME}#{}", anchor(article.idx))) {
                                    (article.title)
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

const STYLESHEET: &str = "\
body { font-family: serif; }
.cover { text-align: center; page-break-after: always; }
.cover img { width: 100%; }
.contents { page-break-after: always; }
h1.subsection { page-break-before: always; font-size: 1.4em; text-transform: uppercase; }
.article { page-break-before: always; }
.article h2 { font-size: 1.2em; margin-bottom: 0.2em; }
.byline { font-style: italic; margin-top: 0; }
img.lead { width: 100%; margin: 0.5em 0; }
.body p { text-indent: 1em; margin: 0; }
";
