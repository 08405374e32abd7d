//! Site metadata with runtime overrides.
//!
//! [`SiteConfig`] holds the static defaults from the `[site]` section of
//! `folio.toml`. Editors can override most values at runtime through a
//! [`SettingsSource`] (typically the content database). [`DynamicSiteConfig`]
//! merges the two and caches the result for a short time.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::Deserialize;

/// How long a merged configuration is reused before the source is queried again.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Site metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub description: String,
    pub url: String,
    pub author: String,
    pub email: String,
    pub location: String,
    pub timezone: String,
    pub seo: SeoConfig,
    pub links: SiteLinks,
    pub nav_items: Vec<NavItem>,
    pub nav_menu_items: Vec<NavItem>,
    pub socials: Vec<SocialLink>,
    pub skills: Vec<String>,
    pub bio: Bio,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Folio".to_owned(),
            description: String::new(),
            url: "http://localhost:4321/".to_owned(),
            author: String::new(),
            email: String::new(),
            location: String::new(),
            timezone: "UTC".to_owned(),
            seo: SeoConfig::default(),
            links: SiteLinks::default(),
            nav_items: Vec::new(),
            nav_menu_items: Vec::new(),
            socials: Vec::new(),
            skills: Vec::new(),
            bio: Bio::default(),
        }
    }
}

impl SiteConfig {
    /// `mailto:` link for the contact email.
    #[must_use]
    pub fn email_link(&self) -> String {
        format!("mailto:{}", self.email)
    }
}

/// Search engine metadata.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SeoConfig {
    pub author: String,
    pub title: String,
    pub keywords: Vec<String>,
    pub works_for: Organization,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub name: String,
    pub url: String,
}

/// Profile links. Entries beyond the three well-known ones are kept in `other`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SiteLinks {
    pub github: String,
    pub linkedin: String,
    pub twitter: String,
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct NavItem {
    pub label: String,
    pub href: String,
    #[serde(default)]
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SocialLink {
    pub name: String,
    pub url: String,
    /// Icon name; also identifies well-known networks (`github`, `linkedin`, `twitter`).
    pub icon: String,
    /// Shown in the page footer.
    #[serde(default)]
    pub footer: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Bio {
    pub short: String,
    pub long: String,
    pub quote: String,
    pub fun_fact: String,
}

/// Where a stored navigation entry is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavPlacement {
    Header,
    Menu,
    Both,
}

impl NavPlacement {
    fn in_header(self) -> bool {
        matches!(self, Self::Header | Self::Both)
    }

    fn in_menu(self) -> bool {
        matches!(self, Self::Menu | Self::Both)
    }
}

/// Navigation entry as stored by the settings source.
#[derive(Debug, Clone, PartialEq)]
pub struct NavEntry {
    pub item: NavItem,
    pub placement: NavPlacement,
}

/// Runtime overrides loaded from a [`SettingsSource`].
///
/// Empty values never override static defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteOverrides {
    /// Key/value settings (`site_name`, `seo_keywords`, `email`, ...).
    pub settings: HashMap<String, String>,
    /// Bio entries (`short`, `long`, `quote`, `funFact`).
    pub bio: HashMap<String, String>,
    /// Social links in display order.
    pub socials: Vec<SocialLink>,
    /// Navigation entries in display order.
    pub nav: Vec<NavEntry>,
    /// Skill names in display order.
    pub skills: Vec<String>,
}

impl SiteOverrides {
    fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn bio_entry(&self, key: &str) -> Option<&str> {
        self.bio.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    fn social_url(&self, icon: &str) -> Option<&str> {
        self.socials
            .iter()
            .find(|s| s.icon == icon)
            .map(|s| s.url.as_str())
            .filter(|url| !url.is_empty())
    }

    /// Merge these overrides over `base`.
    #[must_use]
    pub fn apply(&self, base: &SiteConfig) -> SiteConfig {
        let text = |key: &str, fallback: &str| self.setting(key).unwrap_or(fallback).to_owned();
        let bio = |key: &str, fallback: &str| self.bio_entry(key).unwrap_or(fallback).to_owned();
        let link = |icon: &str, fallback: &str| self.social_url(icon).unwrap_or(fallback).to_owned();

        let keywords = match self.setting("seo_keywords") {
            Some(list) => list.split(',').map(|k| k.trim().to_owned()).collect(),
            None => base.seo.keywords.clone(),
        };

        let (nav_items, nav_menu_items) = if self.nav.is_empty() {
            (base.nav_items.clone(), base.nav_menu_items.clone())
        } else {
            let pick = |keep: fn(NavPlacement) -> bool| -> Vec<NavItem> {
                self.nav
                    .iter()
                    .filter(|entry| keep(entry.placement))
                    .map(|entry| entry.item.clone())
                    .collect()
            };
            (pick(NavPlacement::in_header), pick(NavPlacement::in_menu))
        };

        SiteConfig {
            name: text("site_name", &base.name),
            description: text("site_description", &base.description),
            url: text("site_url", &base.url),
            author: text("author", &base.author),
            email: text("email", &base.email),
            location: text("location", &base.location),
            timezone: text("timezone", &base.timezone),
            seo: SeoConfig {
                author: text("author", &base.seo.author),
                title: text("seo_title", &base.seo.title),
                keywords,
                works_for: Organization {
                    name: text("works_for_name", &base.seo.works_for.name),
                    url: text("works_for_url", &base.seo.works_for.url),
                },
            },
            links: SiteLinks {
                github: link("github", &base.links.github),
                linkedin: link("linkedin", &base.links.linkedin),
                twitter: link("twitter", &base.links.twitter),
                other: base.links.other.clone(),
            },
            nav_items,
            nav_menu_items,
            socials: if self.socials.is_empty() {
                base.socials.clone()
            } else {
                self.socials.clone()
            },
            skills: if self.skills.is_empty() {
                base.skills.clone()
            } else {
                self.skills.clone()
            },
            bio: Bio {
                short: bio("short", &base.bio.short),
                long: bio("long", &base.bio.long),
                quote: bio("quote", &base.bio.quote),
                fun_fact: bio("funFact", &base.bio.fun_fact),
            },
        }
    }
}

/// Error returned by a [`SettingsSource`].
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Provider of runtime site overrides.
pub trait SettingsSource: Send + Sync {
    /// Load the current overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self) -> Result<SiteOverrides, SourceError>;
}

impl<F> SettingsSource for F
where
    F: Fn() -> Result<SiteOverrides, SourceError> + Send + Sync,
{
    fn load(&self) -> Result<SiteOverrides, SourceError> {
        self()
    }
}

struct CachedSite {
    loaded_at: Instant,
    config: Arc<SiteConfig>,
}

/// Site configuration merged from static defaults and a [`SettingsSource`].
///
/// A merged configuration is reused for the TTL (60 seconds by default). When
/// the source fails, the static defaults are returned and nothing is cached,
/// so the next call retries.
pub struct DynamicSiteConfig<S> {
    defaults: Arc<SiteConfig>,
    source: S,
    ttl: Duration,
    cached: RwLock<Option<CachedSite>>,
}

impl<S: SettingsSource> DynamicSiteConfig<S> {
    #[must_use]
    pub fn new(defaults: SiteConfig, source: S) -> Self {
        Self {
            defaults: Arc::new(defaults),
            source,
            ttl: DEFAULT_TTL,
            cached: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Static defaults.
    #[must_use]
    pub fn defaults(&self) -> &SiteConfig {
        &self.defaults
    }

    /// Current site configuration.
    pub fn get(&self) -> Arc<SiteConfig> {
        if let Ok(guard) = self.cached.read()
            && let Some(cached) = guard.as_ref()
            && cached.loaded_at.elapsed() < self.ttl
        {
            return Arc::clone(&cached.config);
        }

        match self.source.load() {
            Ok(overrides) => {
                let config = Arc::new(overrides.apply(&self.defaults));
                if let Ok(mut guard) = self.cached.write() {
                    *guard = Some(CachedSite {
                        loaded_at: Instant::now(),
                        config: Arc::clone(&config),
                    });
                }
                tracing::debug!("Loaded site settings");
                config
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load site settings, using static defaults");
                Arc::clone(&self.defaults)
            }
        }
    }

    /// Drop the cached configuration so the next [`get`](Self::get) reloads.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.cached.write() {
            *guard = None;
        }
    }
}
