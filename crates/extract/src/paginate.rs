// ABOUTME: Multi-page aggregation for paginated listings: discovers the page count and walks every page.
// ABOUTME: Records are accumulated in ascending page order; the first failing page aborts the run.

//! Listing aggregation.
//!
//! A listing is fetched at its own URL as page 1. The page count is the
//! largest numeric label under the parser's pagination selector (1 when
//! there is none). Pages `2..=count` are fetched at the listing URL with the
//! page parameter set, parsed with the same [`ListingParser`], and appended in
//! page order.
//!
//! Documents are parsed and emptied of records between awaits, so only
//! records are held across suspension points.

use futures::stream::{self, StreamExt, TryStreamExt};
use scraper::ElementRef;
use tracing::{debug, instrument, trace};
use url::Url;

use crate::document::Page;
use crate::error::Result;
use crate::extractors::compiled::QueryCache;
use crate::extractors::select::Accessor;
use crate::numeric::parse_unsigned;
use crate::resource::{FetchResult, PageFetcher};

/// Query parameter carrying the page index.
pub const DEFAULT_PAGE_PARAM: &str = "page";

/// Knobs for one aggregation run.
#[derive(Debug, Clone)]
pub struct PaginationOptions {
    /// Read page 1 only, ignoring any pagination labels.
    pub single_page: bool,
    pub page_param: String,
    /// Pages fetched at once. Output order does not depend on it.
    pub concurrency: usize,
    /// Upper bound on the page count taken from the labels.
    pub max_pages: Option<u64>,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            single_page: false,
            page_param: DEFAULT_PAGE_PARAM.to_string(),
            concurrency: 1,
            max_pages: None,
        }
    }
}

/// A page-specific parser for one kind of listing.
pub trait ListingParser {
    type Record;

    /// Reads every record on one listing page.
    fn parse_page(&self, page: &Page, accessor: &Accessor<'_>) -> Result<Vec<Self::Record>>;

    /// Selector for the page-number labels of the pagination region.
    fn pagination_selector(&self) -> &str;
}

/// Largest numeric pagination label below `root`, or 1 if there is none.
///
/// Labels without any digit ("Next", an ellipsis) are skipped. A label that
/// has digits but does not read as a number is a `MalformedNumber` error, so
/// a garbled last label cannot shorten the walk.
pub fn discover_page_count(accessor: &Accessor<'_>, root: ElementRef<'_>, selector: &str) -> Result<u64> {
    let query = accessor.cache().get_or_compile(selector)?;
    let mut count = 1;
    for label in query.evaluate(root) {
        let Some(text) = query.value_of(&label) else {
            continue;
        };
        if !text.chars().any(|c| c.is_ascii_digit()) {
            trace!(label = %text, "skipping pagination label without a page number");
            continue;
        }
        let n = parse_unsigned(&text).map_err(|e| e.in_selector(selector))?;
        count = count.max(n);
    }
    Ok(count)
}

/// The listing URL with the page parameter set to `page`.
///
/// Any existing value of the parameter is replaced and the fragment dropped.
pub fn page_url(listing: &Url, param: &str, page: u64) -> Url {
    let kept: Vec<(String, String)> = listing
        .query_pairs()
        .filter(|(k, _)| k != param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = listing.clone();
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(param, &page.to_string());
    url
}

/// Fetches every page of a listing and concatenates their records.
///
/// Fails with the first page error, tagged with its page index; no partial
/// result is returned.
#[instrument(skip(fetcher, cache, listing, parser, opts), fields(listing = %listing))]
pub async fn aggregate<F, P>(
    fetcher: &F,
    cache: &QueryCache,
    listing: &Url,
    parser: &P,
    opts: &PaginationOptions,
) -> Result<Vec<P::Record>>
where
    F: PageFetcher,
    P: ListingParser,
{
    let accessor = Accessor::new(cache);

    let first = fetcher.fetch_page(listing).await.map_err(|e| e.with_page(1))?;
    let (mut records, discovered) = read_page(&first, &accessor, parser, !opts.single_page)
        .map_err(|e| e.with_page(1))?;

    let last = match opts.max_pages {
        Some(cap) => discovered.min(cap),
        None => discovered,
    };
    if last <= 1 {
        debug!(records = records.len(), "single-page listing");
        return Ok(records);
    }
    debug!(pages = last, concurrency = opts.concurrency, "walking listing pages");

    let rest: Vec<Vec<P::Record>> = stream::iter(2..=last)
        .map(|index| {
            let url = page_url(listing, &opts.page_param, index);
            fetch_listing_page(fetcher, &accessor, url, parser, index)
        })
        .buffered(opts.concurrency.max(1))
        .try_collect()
        .await?;

    for batch in rest {
        records.extend(batch);
    }
    debug!(records = records.len(), pages = last, "listing aggregated");
    Ok(records)
}

async fn fetch_listing_page<F, P>(
    fetcher: &F,
    accessor: &Accessor<'_>,
    url: Url,
    parser: &P,
    index: u64,
) -> Result<Vec<P::Record>>
where
    F: PageFetcher,
    P: ListingParser,
{
    let fetched = fetcher.fetch_page(&url).await.map_err(|e| e.with_page(index))?;
    let (records, _) = read_page(&fetched, accessor, parser, false).map_err(|e| e.with_page(index))?;
    trace!(page = index, records = records.len(), "parsed listing page");
    Ok(records)
}

/// Parses one fetched page into records and, if asked, its page count.
fn read_page<P: ListingParser>(
    fetched: &FetchResult,
    accessor: &Accessor<'_>,
    parser: &P,
    discover: bool,
) -> Result<(Vec<P::Record>, u64)> {
    let page = Page::from_fetch(fetched)?;
    let records = parser.parse_page(&page, accessor)?;
    let count = if discover {
        discover_page_count(accessor, page.root(), parser.pagination_selector())?
    } else {
        1
    };
    Ok((records, count))
}
