//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable enabling debug (dry-run) mode.
pub const DEBUG_ENV: &str = "FLATWATCH_DEBUG";

/// Environment variable overriding every site's worker budget.
pub const POOL_SIZE_ENV: &str = "FLATWATCH_POOL_SIZE";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Price/surface/furnished filter substituted into search URLs
    #[serde(default)]
    pub search: SearchFilter,

    /// Textual exclusion rules
    #[serde(default)]
    pub rules: ExclusionRules,

    /// Ledger location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Viewer launched for accepted offers
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Dry run: no ledger writes, no notifications, counts only
    #[serde(default)]
    pub debug: bool,

    /// Listing sites to poll
    #[serde(default = "defaults::sites")]
    pub sites: Vec<SiteConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply `FLATWATCH_DEBUG` and `FLATWATCH_POOL_SIZE` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply environment-style overrides from an arbitrary lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(DEBUG_ENV) {
            if is_truthy(&value) {
                self.debug = true;
            }
        }

        if let Some(value) = lookup(POOL_SIZE_ENV) {
            match value.trim().parse::<usize>() {
                Ok(size) if size > 0 => {
                    for site in &mut self.sites {
                        site.workers = size;
                    }
                }
                _ => log::warn!("Ignoring invalid {}={:?}", POOL_SIZE_ENV, value),
            }
        }
    }

    /// Sites that are switched on.
    pub fn enabled_sites(&self) -> impl Iterator<Item = &SiteConfig> {
        self.sites.iter().filter(|s| s.enabled)
    }

    /// Look up a site by name.
    pub fn site(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.name == name)
    }

    /// Validate configuration values for basic sanity.
    ///
    /// Regexes and selectors are checked when the classifier and the site
    /// adapters are built from this config.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.search.price_min > self.search.price_max {
            return Err(AppError::validation(
                "search.price_min must not exceed search.price_max",
            ));
        }
        if self.sites.is_empty() {
            return Err(AppError::validation("No sites defined"));
        }

        let mut names = HashSet::new();
        for site in &self.sites {
            site.validate()?;
            if !names.insert(site.name.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate site name '{}'",
                    site.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            search: SearchFilter::default(),
            rules: ExclusionRules::default(),
            storage: StorageConfig::default(),
            notify: NotifyConfig::default(),
            debug: false,
            sites: defaults::sites(),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Outbound HTTP settings shared by every site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept header
    #[serde(default = "defaults::accept")]
    pub accept: String,

    /// Accept-Language header
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Accept-Encoding header
    #[serde(default = "defaults::accept_encoding")]
    pub accept_encoding: String,

    /// Per-attempt timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Fixed pause between two attempts of the same request
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            accept: defaults::accept(),
            accept_language: defaults::accept_language(),
            accept_encoding: defaults::accept_encoding(),
            timeout_secs: defaults::timeout(),
            retry_delay_ms: defaults::retry_delay(),
        }
    }
}

/// Search filter applied through the sites' search URL templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(default = "defaults::price_min")]
    pub price_min: u32,

    #[serde(default = "defaults::price_max")]
    pub price_max: u32,

    /// Minimum surface in square metres
    #[serde(default = "defaults::surface_min")]
    pub surface_min: u32,

    #[serde(default = "defaults::furnished")]
    pub furnished: bool,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            price_min: defaults::price_min(),
            price_max: defaults::price_max(),
            surface_min: defaults::surface_min(),
            furnished: defaults::furnished(),
        }
    }
}

/// Patterns used by the text classifier.
///
/// Every list is joined into a single case-insensitive alternation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusionRules {
    /// Agency, sublet and shared-flat signatures (regex fragments, substring match)
    #[serde(default = "defaults::agency_patterns")]
    pub agency_patterns: Vec<String>,

    /// Words meaning "elevator"
    #[serde(default = "defaults::elevator_terms")]
    pub elevator_terms: Vec<String>,

    /// Words that negate a directly following elevator mention
    #[serde(default = "defaults::negation_terms")]
    pub negation_terms: Vec<String>,

    /// Ground floor / first floor phrasings (regex fragments)
    #[serde(default = "defaults::low_floor_patterns")]
    pub low_floor_patterns: Vec<String>,

    /// Words meaning "floor"
    #[serde(default = "defaults::floor_terms")]
    pub floor_terms: Vec<String>,

    /// Spelled-out ordinals of floor 2 and above
    #[serde(default = "defaults::high_floor_ordinals")]
    pub high_floor_ordinals: Vec<String>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            agency_patterns: defaults::agency_patterns(),
            elevator_terms: defaults::elevator_terms(),
            negation_terms: defaults::negation_terms(),
            low_floor_patterns: defaults::low_floor_patterns(),
            floor_terms: defaults::floor_terms(),
            high_floor_ordinals: defaults::high_floor_ordinals(),
        }
    }
}

/// Ledger storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one accepted and one rejected list per site
    #[serde(default = "defaults::ledger_dir")]
    pub ledger_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ledger_dir: defaults::ledger_dir(),
        }
    }
}

/// Viewer settings for accepted offers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Launch the viewer (otherwise accepted offers are only logged)
    #[serde(default = "defaults::notify_enabled")]
    pub enabled: bool,

    /// Program invoked with the detail URL as its only argument
    #[serde(default = "defaults::viewer")]
    pub command: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::notify_enabled(),
            command: defaults::viewer(),
        }
    }
}

/// How a site signals that a search page is the last one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pagination {
    /// Last page when no element matches the "next page" selector.
    NextLink { selector: String },

    /// Last page when no navigation link (href matching `link_pattern`,
    /// page number in its first capture group) points past the current page.
    PageNumbers { link_pattern: String },
}

/// Immutable per-site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Short name, also used as the ledger file prefix
    pub name: String,

    #[serde(default = "defaults::site_enabled")]
    pub enabled: bool,

    /// Search page template: `{page}`, `{price_min}`, `{price_max}`,
    /// `{surface_min}`, `{furnished}`
    pub search_url: String,

    /// Detail page template: `{id}`
    pub detail_url: String,

    /// Page ceiling (inclusive)
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Concurrent detail fetches for this site
    #[serde(default = "defaults::workers")]
    pub workers: usize,

    /// Regex matched against every `href`; first capture group is the offer id
    pub offer_link_pattern: String,

    /// CSS selector of the description container on detail pages
    pub description_selector: String,

    /// Last-page signal
    pub pagination: Pagination,
}

impl SiteConfig {
    /// Validate a single site entry.
    pub fn validate(&self) -> Result<()> {
        let valid_name = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_name {
            return Err(AppError::validation(format!(
                "Site name '{}' must be non-empty and use only [A-Za-z0-9_-]",
                self.name
            )));
        }
        if !self.search_url.contains("{page}") {
            return Err(AppError::validation(format!(
                "{}: search_url has no {{page}} placeholder",
                self.name
            )));
        }
        if !self.detail_url.contains("{id}") {
            return Err(AppError::validation(format!(
                "{}: detail_url has no {{id}} placeholder",
                self.name
            )));
        }
        if self.max_pages == 0 {
            return Err(AppError::validation(format!(
                "{}: max_pages must be > 0",
                self.name
            )));
        }
        if self.workers == 0 {
            return Err(AppError::validation(format!(
                "{}: workers must be > 0",
                self.name
            )));
        }
        Ok(())
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::{Pagination, SiteConfig};

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".into()
    }
    pub fn accept() -> String {
        "text/html".into()
    }
    pub fn accept_language() -> String {
        "en-US".into()
    }
    pub fn accept_encoding() -> String {
        "identity".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn retry_delay() -> u64 {
        1000
    }

    // Search defaults
    pub fn price_min() -> u32 {
        600
    }
    pub fn price_max() -> u32 {
        800
    }
    pub fn surface_min() -> u32 {
        20
    }
    pub fn furnished() -> bool {
        true
    }

    // Rule defaults
    pub fn agency_patterns() -> Vec<String> {
        [
            "foncia",
            "coloc",
            "flat ?share",
            "shared (?:flat|apartment)",
            "sous[- ]lo",
            "sub-?let",
            "sub-?lease",
        ]
        .map(String::from)
        .to_vec()
    }
    pub fn elevator_terms() -> Vec<String> {
        ["ascenseur", "elevator", "lift"].map(String::from).to_vec()
    }
    pub fn negation_terms() -> Vec<String> {
        ["no", "not", "without", "sans", "pas d'", "pas de"]
            .map(String::from)
            .to_vec()
    }
    pub fn low_floor_patterns() -> Vec<String> {
        [
            "ground[- ]floor",
            "first floor",
            "1st floor",
            "rez[- ]de[- ]chauss[ée]e",
            "rdc",
            "1er [ée]tage",
            "premier [ée]tage",
        ]
        .map(String::from)
        .to_vec()
    }
    pub fn floor_terms() -> Vec<String> {
        ["floor", "étage", "etage"].map(String::from).to_vec()
    }
    pub fn high_floor_ordinals() -> Vec<String> {
        [
            "second",
            "third",
            "fourth",
            "fifth",
            "sixth",
            "seventh",
            "eighth",
            "ninth",
            "tenth",
            "deuxi[èe]me",
            "troisi[èe]me",
            "quatri[èe]me",
            "cinqui[èe]me",
            "sixi[èe]me",
            "septi[èe]me",
            "huiti[èe]me",
            "neuvi[èe]me",
            "dixi[èe]me",
        ]
        .map(String::from)
        .to_vec()
    }

    // Storage defaults
    pub fn ledger_dir() -> PathBuf {
        PathBuf::from("ledger")
    }

    // Notify defaults
    pub fn notify_enabled() -> bool {
        true
    }
    pub fn viewer() -> String {
        "firefox".into()
    }

    // Site defaults
    pub fn site_enabled() -> bool {
        true
    }
    pub fn max_pages() -> u32 {
        41
    }
    pub fn workers() -> usize {
        8
    }

    pub fn sites() -> Vec<SiteConfig> {
        vec![
            SiteConfig {
                name: "leboncoin".to_string(),
                enabled: true,
                search_url: concat!(
                    "https://www.leboncoin.fr/recherche/?category=10&locations=Paris",
                    "&real_estate_type=2&price={price_min}-{price_max}",
                    "&square={surface_min}-max&furnished={furnished}&page={page}"
                )
                .to_string(),
                detail_url: "https://www.leboncoin.fr/locations/{id}.htm/".to_string(),
                max_pages: 41,
                workers: 35,
                offer_link_pattern: r"^/locations/(\d+)".to_string(),
                description_selector: r#"div[data-qa-id="adview_description_container"]"#
                    .to_string(),
                pagination: Pagination::PageNumbers {
                    link_pattern: r"[?&]page=(\d+)".to_string(),
                },
            },
            SiteConfig {
                name: "pap".to_string(),
                enabled: true,
                search_url: concat!(
                    "https://www.pap.fr/annonce/location-appartement-paris-75-g439",
                    "-a-partir-de-{surface_min}-m2-entre-{price_min}-et-{price_max}-euros",
                    "?meuble={furnished}&page={page}"
                )
                .to_string(),
                detail_url: "https://www.pap.fr/annonces/appartement-r{id}".to_string(),
                max_pages: 20,
                workers: 8,
                offer_link_pattern: r"^/annonces/appartement-[a-z0-9-]*r(\d+)$".to_string(),
                description_selector: "div.item-description".to_string(),
                pagination: Pagination::NextLink {
                    selector: "li.next a".to_string(),
                },
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.sites[0].workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_missing_page_placeholder() {
        let mut config = Config::default();
        config.sites[0].search_url = "https://example.com/search".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_site_names() {
        let mut config = Config::default();
        let dup = config.sites[0].clone();
        config.sites.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unsafe_site_name() {
        let mut config = Config::default();
        config.sites[0].name = "../etc".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_enable_debug_and_pool_size() {
        let env: HashMap<&str, &str> = [(DEBUG_ENV, "yes"), (POOL_SIZE_ENV, "4")].into();
        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert!(config.debug);
        assert!(config.sites.iter().all(|s| s.workers == 4));
    }

    #[test]
    fn overrides_ignore_invalid_pool_size() {
        let mut config = Config::default();
        let before: Vec<usize> = config.sites.iter().map(|s| s.workers).collect();
        config.apply_overrides(|k| (k == POOL_SIZE_ENV).then(|| "zero".to_string()));

        let after: Vec<usize> = config.sites.iter().map(|s| s.workers).collect();
        assert_eq!(before, after);
        assert!(!config.debug);
    }

    #[test]
    fn parses_site_from_toml() {
        let config: Config = toml::from_str(
            r#"
            debug = true

            [search]
            price_max = 900

            [[sites]]
            name = "example"
            search_url = "https://example.com/search?p={page}"
            detail_url = "https://example.com/offer/{id}"
            workers = 3
            offer_link_pattern = '^/offer/(\d+)$'
            description_selector = "div.description"

            [sites.pagination]
            kind = "next_link"
            selector = "a.next"
            "#,
        )
        .unwrap();

        assert!(config.debug);
        assert_eq!(config.search.price_max, 900);
        assert_eq!(config.search.price_min, 600);
        assert_eq!(config.sites.len(), 1);
        assert_eq!(config.sites[0].max_pages, 41);
        assert_eq!(
            config.sites[0].pagination,
            Pagination::NextLink {
                selector: "a.next".to_string()
            }
        );
        assert!(config.validate().is_ok());
    }
}
