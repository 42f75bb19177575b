use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A routable view: the fragment `route` that selects it and the `source` its content is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
	pub route: String,
	pub source: String,
}

impl PageEntry {
	pub fn new(route: impl Into<String>, source: impl Into<String>) -> Self {
		Self {
			route: route.into(),
			source: source.into(),
		}
	}
}

/// The two pages every registry must carry: home and 404.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
	pub index: PageEntry,
	pub noroute: PageEntry,
}

/// Page key → [`PageEntry`] table, in configuration order.
///
/// Reverse lookups by route walk this order, so with duplicate routes the first page wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRegistry {
	defaults: Option<Defaults>,
	pages: IndexMap<String, PageEntry>,
}

impl PageRegistry {
	#[must_use]
	pub fn new(defaults: Defaults) -> Self {
		Self {
			defaults: Some(defaults),
			pages: IndexMap::new(),
		}
	}

	/// A registry with nothing in it. Route resolution against it always fails.
	#[must_use]
	pub fn empty() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_page(mut self, key: impl Into<String>, entry: PageEntry) -> Self {
		self.insert(key, entry);
		self
	}

	pub fn insert(&mut self, key: impl Into<String>, entry: PageEntry) -> Option<PageEntry> {
		self.pages.insert(key.into(), entry)
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.defaults.is_none() && self.pages.is_empty()
	}

	#[must_use]
	pub fn defaults(&self) -> Option<&Defaults> {
		self.defaults.as_ref()
	}

	#[must_use]
	pub fn index(&self) -> Option<&PageEntry> {
		self.defaults.as_ref().map(|d| &d.index)
	}

	#[must_use]
	pub fn noroute(&self) -> Option<&PageEntry> {
		self.defaults.as_ref().map(|d| &d.noroute)
	}

	pub fn get(&self, key: &str) -> Option<&PageEntry> {
		self.pages.get(key)
	}

	pub fn pages(&self) -> impl Iterator<Item = (&str, &PageEntry)> {
		self.pages.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// First page (in configuration order) whose `route` is exactly `route`.
	pub fn page_for_route(&self, route: &str) -> Option<&PageEntry> {
		self.pages.values().find(|page| page.route == route)
	}

	/// Whether `source` belongs to any page, the two defaults included.
	pub fn knows_source(&self, source: &str) -> bool {
		self.pages.values().chain(self.defaults.iter().flat_map(|d| [&d.index, &d.noroute])).any(|page| page.source == source)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn registry() -> PageRegistry {
		PageRegistry::new(Defaults {
			index: PageEntry::new("", "home.html"),
			noroute: PageEntry::new("404", "404.html"),
		})
	}

	#[test]
	fn empty_registry() {
		assert!(PageRegistry::empty().is_empty());
		assert!(!registry().is_empty());
		assert!(PageRegistry::empty().index().is_none());
	}

	#[test]
	fn first_route_match_wins() {
		let registry = registry()
			.with_page("about", PageEntry::new("about", "about.html"))
			.with_page("about-again", PageEntry::new("about", "about-2.html"));
		assert_eq!(registry.page_for_route("about").map(|p| p.source.as_str()), Some("about.html"));
		assert!(registry.page_for_route("team").is_none());
	}

	#[test]
	fn known_sources_include_defaults() {
		let registry = registry().with_page("about", PageEntry::new("about", "about.html"));
		assert!(registry.knows_source("about.html"));
		assert!(registry.knows_source("home.html"));
		assert!(registry.knows_source("404.html"));
		assert!(!registry.knows_source("secret.html"));
	}
}
