//! Style collection for captured snapshots

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, Url};
use thiserror::Error;

use crate::core::CaptureError;
use crate::data::StyleRecord;
use crate::dom::Element;

/// Marks style elements injected by the restorer. They are never captured.
pub const STYLE_MARKER_ATTR: &str = "data-prepaint-style";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Unexpected status {status}")]
    Status { status: u16 },
}

/// Fetches stylesheet text for inlining
#[async_trait]
pub trait StylesheetFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

#[derive(Clone, Debug, Default)]
pub struct HttpStylesheetFetcher {
    client: Client,
}

impl HttpStylesheetFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl StylesheetFetcher for HttpStylesheetFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| FetchError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|err| FetchError::Request(err.to_string()))
    }
}

/// Fetcher that never reaches the network; every sheet stays URL-only
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFetch;

#[async_trait]
impl StylesheetFetcher for NoFetch {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        Err(FetchError::Request(format!("fetching disabled for {url}")))
    }
}

/// A style source found in the document head, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StyleSource {
    Inline(String),
    External(Url),
}

fn is_stylesheet_link(el: &Element) -> bool {
    el.tag == "link"
        && el.attr("rel").is_some_and(|rel| {
            rel.split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("stylesheet"))
        })
}

/// Active styling in `head`, skipping restorer-injected elements.
/// Hrefs that cannot be resolved against `base` are dropped.
pub(crate) fn style_sources(head: &Element, base: &Url) -> Vec<StyleSource> {
    head.element_children()
        .filter(|el| !el.has_attr(STYLE_MARKER_ATTR))
        .filter_map(|el| {
            if el.tag == "style" {
                return Some(StyleSource::Inline(el.text_content()));
            }
            if !is_stylesheet_link(el) {
                return None;
            }
            let href = el.attr("href")?;
            match base.join(href) {
                Ok(url) => Some(StyleSource::External(url)),
                Err(err) => {
                    tracing::debug!(href, error = %err, "Skipping unresolvable stylesheet");
                    None
                }
            }
        })
        .collect()
}

/// Style records in document order plus the sheets that could not be inlined
#[derive(Debug, Default)]
pub(crate) struct CollectedStyles {
    pub records: Vec<StyleRecord>,
    pub failures: Vec<CaptureError>,
}

/// Resolve style sources into records. Same-origin sheets are fetched
/// concurrently when `inline` is set; results keep document order. A failed
/// fetch keeps the sheet by reference.
pub(crate) async fn collect_styles(
    sources: Vec<StyleSource>,
    base: &Url,
    inline: bool,
    fetcher: &dyn StylesheetFetcher,
) -> CollectedStyles {
    let origin = base.origin();
    let resolved = sources.into_iter().map(|source| {
        let origin = origin.clone();
        async move {
            match source {
                StyleSource::Inline(text) => (StyleRecord::inline(text), None),
                StyleSource::External(url) => {
                    if !inline || url.origin() != origin {
                        return (StyleRecord::external(url.as_str(), None), None);
                    }
                    match fetcher.fetch(&url).await {
                        Ok(content) => (StyleRecord::external(url.as_str(), Some(content)), None),
                        Err(err) => (
                            StyleRecord::external(url.as_str(), None),
                            Some(CaptureError::StyleCollect {
                                href: url.to_string(),
                                reason: err.to_string(),
                            }),
                        ),
                    }
                }
            }
        }
    });

    let mut collected = CollectedStyles::default();
    for (record, failure) in join_all(resolved).await {
        collected.records.push(record);
        collected.failures.extend(failure);
    }
    collected
}
