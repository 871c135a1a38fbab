// ABOUTME: Main library entry point for the curse-extract structured extraction engine.
// ABOUTME: Re-exports the public API: Client, Accessor, Field, QueryCache, Page, aggregation and the value parsers.

//! curse-extract - selector-driven structured extraction for modding-site pages.
//!
//! Page-specific parsers describe each record field as a selector and read it
//! through an [`Accessor`], which compiles selectors once into a shared
//! [`QueryCache`] and returns typed values: text, absolute URLs, integers
//! with thousands separators, and Unix timestamps. Paginated listings are
//! walked with [`aggregate`].
//!
//! # Example
//!
//! ```no_run
//! use curse_extract::{Client, ExtractError, Field};
//!
//! const NAME: Field = Field::required("Name", "section.atf h1 > a > span");
//! const DOWNLOADS: Field = Field::optional("Downloads", "ul.cf-details li.downloads");
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ExtractError> {
//!     let client = Client::builder().build()?;
//!     let page = client.page_str("https://mods.example.com/projects/taam").await?;
//!     let acc = client.accessor();
//!     let name = acc.read_string(page.root(), &NAME)?;
//!     let downloads = acc.read_unsigned(page.root(), &DOWNLOADS)?;
//!     println!("{:?} {:?}", name, downloads);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod document;
pub mod error;
pub mod extractors;
pub mod numeric;
pub mod options;
pub mod paginate;
pub mod resource;
pub mod urls;

pub use crate::client::Client;
pub use crate::document::Page;
pub use crate::error::{ErrorCode, ExtractError, Result};
pub use crate::extractors::compiled::{
    CompiledQuery, Nodes, QueryCache, QueryCompiler, SelectorCompiler, Target,
};
pub use crate::extractors::fields::{Field, Presence};
pub use crate::extractors::select::Accessor;
pub use crate::numeric::{leading_field, parse_signed, parse_unix_timestamp, parse_unsigned};
pub use crate::options::{ClientBuilder, Options, DEFAULT_USER_AGENT};
pub use crate::paginate::{
    aggregate, discover_page_count, page_url, ListingParser, PaginationOptions, DEFAULT_PAGE_PARAM,
};
pub use crate::resource::{FetchOptions, FetchResult, PageFetcher, DEFAULT_MAX_BODY_SIZE};
pub use crate::urls::{normalize, resolve, resolve_str};
