// src/services/listing.rs

//! FIA documents page scraper.
//!
//! Each championship page carries a season selector; the last option points
//! at the current season's page, whose first event block holds the
//! documents of the ongoing race weekend.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Category, CategoryConfig, FetcherConfig, Item, Listing};
use crate::services::ListingFetcher;
use crate::utils::http::{create_async_client, fetch_text};
use crate::utils::{normalize_whitespace, resolve_url, title_case};

const SEASON_OPTION: &str = "select#facetapi_select_facet_form_2 option";
const DOCUMENT_LIST: &str = "div.decision-document-list";
const EVENT: &str = "ul.event-wrapper";
const EVENT_TITLE: &str = ".event-title";
const DOCUMENT_ROW: &str = "ul.document-row-wrapper li.document-row";
const ROW_LINK: &str = "a";
const ROW_TITLE: &str = ".title";
const ROW_PUBLISHED: &str = ".published";

/// `dd.mm.yy HH:MM`, with dots or spaces between date parts.
static PUBLISHED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[.\s/-](\d{1,2})[.\s/-](\d{2,4})\s+(\d{1,2}):(\d{2})")
        .expect("published date pattern is valid")
});

/// Listing fetcher for fia.com championship document pages.
pub struct FiaListingFetcher {
    client: Client,
    base_url: Url,
    source_tz: Tz,
}

impl FiaListingFetcher {
    /// Create a fetcher with its own HTTP client.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = create_async_client(config)?;
        Self::with_client(config, client)
    }

    /// Create a fetcher that reuses an existing client.
    pub fn with_client(config: &FetcherConfig, client: Client) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let source_tz = config.source_tz()?;

        Ok(Self {
            client,
            base_url,
            source_tz,
        })
    }

    /// URL of the current season page, or the championship page itself when
    /// it has no season selector.
    fn season_url(&self, championship_html: &str, championship_url: &str) -> Result<String> {
        let document = Html::parse_document(championship_html);
        let option_sel = parse_selector(SEASON_OPTION)?;

        let latest = document
            .select(&option_sel)
            .filter_map(|opt| opt.value().attr("value"))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .last();

        Ok(match latest {
            Some(value) => resolve_url(&self.base_url, value),
            None => championship_url.to_string(),
        })
    }
}

#[async_trait]
impl ListingFetcher for FiaListingFetcher {
    async fn fetch(&self, category: &CategoryConfig) -> Result<Listing> {
        let key = category.category.key();

        let championship_html = fetch_text(&self.client, &category.listing_url)
            .await
            .map_err(|e| AppError::fetch(key, e))?;
        let season_url = self
            .season_url(&championship_html, &category.listing_url)
            .map_err(|e| AppError::fetch(key, e))?;
        log::debug!("{key}: season page {season_url}");

        let html = if season_url == category.listing_url {
            championship_html
        } else {
            fetch_text(&self.client, &season_url)
                .await
                .map_err(|e| AppError::fetch(key, e))?
        };

        parse_listing(&html, category.category, &self.base_url, self.source_tz)
            .map_err(|e| AppError::fetch(key, e))
    }
}

/// Parse the documents of the most recent event on a season page.
///
/// A page without any event block yields an empty listing. A page without
/// the document list container is a layout change and an error.
pub fn parse_listing(
    html: &str,
    category: Category,
    base_url: &Url,
    source_tz: Tz,
) -> Result<Listing> {
    let document = Html::parse_document(html);
    let list_sel = parse_selector(DOCUMENT_LIST)?;
    let event_sel = parse_selector(EVENT)?;
    let event_title_sel = parse_selector(EVENT_TITLE)?;
    let row_sel = parse_selector(DOCUMENT_ROW)?;
    let link_sel = parse_selector(ROW_LINK)?;
    let title_sel = parse_selector(ROW_TITLE)?;
    let published_sel = parse_selector(ROW_PUBLISHED)?;

    let list = document
        .select(&list_sel)
        .next()
        .ok_or_else(|| AppError::validation("document list not found on page"))?;

    let Some(event) = list.select(&event_sel).next() else {
        log::info!("{category}: no event on the documents page");
        return Ok(Listing::default());
    };

    let event_title = event
        .select(&event_title_sel)
        .next()
        .map(|el| title_case(&normalize_whitespace(&element_text(&el))))
        .filter(|t| !t.is_empty());

    let mut items = Vec::new();
    for row in event.select(&row_sel) {
        let Some(link) = row.select(&link_sel).next() else {
            continue;
        };
        match parse_row(&link, &title_sel, &published_sel, category, base_url, source_tz) {
            Some(item) => items.push(item),
            None => log::warn!(
                "{category}: skipping unparseable document row: {}",
                normalize_whitespace(&element_text(&row))
            ),
        }
    }

    Ok(Listing { event_title, items })
}

fn parse_row(
    link: &ElementRef,
    title_sel: &Selector,
    published_sel: &Selector,
    category: Category,
    base_url: &Url,
    source_tz: Tz,
) -> Option<Item> {
    let title = normalize_whitespace(&element_text(&link.select(title_sel).next()?));
    if title.is_empty() {
        return None;
    }

    let href = link.value().attr("href")?;
    let href = resolve_url(base_url, href);

    let published = element_text(&link.select(published_sel).next()?);
    let published_at = parse_published(&published, source_tz)?;

    Some(Item::new(category, published_at, title, href))
}

/// Parse `Published on 01.05.24 12:00 CET` into UTC.
///
/// The site labels every time "CET" but shows local Paris time, so summer
/// times are CEST. An ambiguous time in the autumn fold resolves to the
/// earlier instant.
pub fn parse_published(text: &str, source_tz: Tz) -> Option<DateTime<Utc>> {
    let caps = PUBLISHED_RE.captures(text)?;
    let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();

    let (day, month, mut year, hour, minute) = (num(1)?, num(2)?, num(3)?, num(4)?, num(5)?);
    if year < 100 {
        year += 2000;
    }

    let naive = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?
        .and_hms_opt(hour, minute, 0)?;
    source_tz
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
