// src/sites/selector.rs

//! Configuration-driven site adapter.
//!
//! Offers are anchors whose `href` matches a regex (first capture group is
//! the id), the description is the first element matching a CSS selector,
//! and the last page is detected either from a "next" control or from the
//! page numbers in the navigation links.

use std::collections::HashMap;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Candidate, ListingPage, Pagination, SearchFilter, SiteConfig};
use crate::sites::SiteAdapter;
use crate::utils::{fill_template, normalize_whitespace};

enum PageSignal {
    NextLink(Selector),
    PageNumbers(Regex),
}

/// Adapter driven entirely by a [`SiteConfig`].
pub struct SelectorSite {
    name: String,
    search_template: String,
    detail_template: String,
    base_url: Url,
    offer_link: Regex,
    anchors: Selector,
    description: Selector,
    signal: PageSignal,
}

impl SelectorSite {
    /// Compile the site's patterns and bake the search filter into its
    /// search URL template.
    pub fn new(site: &SiteConfig, filter: &SearchFilter) -> Result<Self> {
        let price_min = filter.price_min.to_string();
        let price_max = filter.price_max.to_string();
        let surface_min = filter.surface_min.to_string();
        let furnished = if filter.furnished { "1" } else { "0" };

        let search_template = fill_template(
            &site.search_url,
            &[
                ("price_min", &price_min),
                ("price_max", &price_max),
                ("surface_min", &surface_min),
                ("furnished", furnished),
            ],
        );
        let base_url = Url::parse(&fill_template(&search_template, &[("page", "1")]))?;

        let offer_link = Regex::new(&site.offer_link_pattern)?;
        if offer_link.captures_len() < 2 {
            return Err(AppError::validation(format!(
                "{}: offer_link_pattern needs a capture group for the offer id",
                site.name
            )));
        }

        let signal = match &site.pagination {
            Pagination::NextLink { selector } => PageSignal::NextLink(parse_selector(selector)?),
            Pagination::PageNumbers { link_pattern } => {
                let re = Regex::new(link_pattern)?;
                if re.captures_len() < 2 {
                    return Err(AppError::validation(format!(
                        "{}: pagination link_pattern needs a capture group for the page number",
                        site.name
                    )));
                }
                PageSignal::PageNumbers(re)
            }
        };

        Ok(Self {
            name: site.name.clone(),
            search_template,
            detail_template: site.detail_url.clone(),
            base_url,
            offer_link,
            anchors: parse_selector("a[href]")?,
            description: parse_selector(&site.description_selector)?,
            signal,
        })
    }

    /// Offer id carried by an href, matched raw first and then as a
    /// same-host path.
    fn offer_id(&self, href: &str) -> Option<String> {
        if let Some(id) = first_capture(&self.offer_link, href) {
            return Some(id);
        }
        let resolved = self.base_url.join(href).ok()?;
        if resolved.host_str() != self.base_url.host_str() {
            return None;
        }
        first_capture(&self.offer_link, resolved.path())
    }

    fn is_last_page(&self, document: &Html, page: u32) -> bool {
        match &self.signal {
            PageSignal::NextLink(next) => document.select(next).next().is_none(),
            PageSignal::PageNumbers(link) => !document
                .select(&self.anchors)
                .filter_map(|a| a.value().attr("href"))
                .filter_map(|href| first_capture(link, href))
                .filter_map(|n| n.parse::<u32>().ok())
                .any(|n| n > page),
        }
    }
}

impl SiteAdapter for SelectorSite {
    fn name(&self) -> &str {
        &self.name
    }

    fn search_url(&self, page: u32) -> String {
        fill_template(&self.search_template, &[("page", &page.to_string())])
    }

    fn parse_listing_page(&self, body: &[u8], page: u32) -> Result<ListingPage> {
        let document = Html::parse_document(&String::from_utf8_lossy(body));

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for anchor in document.select(&self.anchors) {
            let Some(id) = anchor.value().attr("href").and_then(|h| self.offer_id(h)) else {
                continue;
            };
            let title = normalize_whitespace(&anchor.text().collect::<String>());

            match positions.get(&id) {
                // Image links often come first with an empty text.
                Some(&i) => {
                    if candidates[i].title.is_empty() && !title.is_empty() {
                        candidates[i].title = title;
                    }
                }
                None => {
                    positions.insert(id.clone(), candidates.len());
                    candidates.push(Candidate::new(title, id));
                }
            }
        }

        Ok(ListingPage {
            candidates,
            is_last_page: self.is_last_page(&document, page),
        })
    }

    fn detail_url(&self, id: &str) -> String {
        fill_template(&self.detail_template, &[("id", id)])
    }

    fn parse_detail_page(&self, body: &[u8]) -> Result<String> {
        let document = Html::parse_document(&String::from_utf8_lossy(body));
        let container = document.select(&self.description).next().ok_or_else(|| {
            AppError::parse(
                &self.name,
                "description container not found on detail page",
            )
        })?;
        Ok(normalize_whitespace(
            &container.text().collect::<Vec<_>>().join(" "),
        ))
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
