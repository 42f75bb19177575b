//! Configuration as read from the settings document.
//!
//! ```json
//! {
//!   "app-selectors": { "links": ["nav a"], "nav-items": "nav a", "content": "#content" },
//!   "container-selector": "#app",
//!   "default-content-selector": "#app noscript",
//!   "use-default-content": true,
//!   "view-directory": "views",
//!   "anchor-attribute": "id",
//!   "views": {
//!     "defaults": {
//!       "index": { "route": "", "source": "home.html" },
//!       "noroute": { "route": "404", "source": "404.html" }
//!     },
//!     "about": { "route": "about", "source": "about.html" }
//!   }
//! }
//! ```

use crate::{
	error::SettingsError,
	registry::{Defaults, PageEntry, PageRegistry},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppSelectors {
	/// Selectors whose matches are bound as navigation links after each render.
	#[serde(default)]
	pub links: Vec<String>,
	#[serde(default)]
	pub nav_items: String,
	/// The region of the shadow document that views are reconciled into.
	pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Views {
	pub defaults: Defaults,
	#[serde(flatten)]
	pub pages: IndexMap<String, PageEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
	pub app_selectors: AppSelectors,
	pub container_selector: String,
	pub default_content_selector: String,
	#[serde(default = "default_true")]
	pub use_default_content: bool,
	#[serde(default)]
	pub view_directory: String,
	#[serde(default)]
	pub anchor_attribute: Option<String>,
	pub views: Views,
}

fn default_true() -> bool {
	true
}

impl Settings {
	/// # Errors
	///
	/// Iff `json` is not a valid settings document.
	pub fn from_json(json: &str) -> Result<Self, SettingsError> {
		Ok(serde_json::from_str(json)?)
	}

	#[must_use]
	pub fn registry(&self) -> PageRegistry {
		let mut registry = PageRegistry::new(self.views.defaults.clone());
		for (key, page) in &self.views.pages {
			registry.insert(key.clone(), page.clone());
		}
		registry
	}
}

/// Runtime view of [`Settings`] plus the values that come from the host rather than the settings document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub selectors: AppSelectors,
	pub container_selector: String,
	pub default_content_selector: String,
	pub use_default_content: bool,
	pub view_directory: String,
	pub anchor_attribute: String,
	/// Path of the hosting page. Prefixes every assembled URL and view request.
	pub base_path: String,
	/// Stop before touching history or the live document.
	pub debug: bool,
}

impl Config {
	pub const DEFAULT_ANCHOR_ATTRIBUTE: &'static str = "id";
	pub const ACTIVE_CLASS: &'static str = "active";

	#[must_use]
	pub fn from_settings(settings: &Settings, base_path: impl Into<String>) -> Self {
		Self {
			selectors: settings.app_selectors.clone(),
			container_selector: settings.container_selector.clone(),
			default_content_selector: settings.default_content_selector.clone(),
			use_default_content: settings.use_default_content,
			view_directory: settings.view_directory.clone(),
			anchor_attribute: settings
				.anchor_attribute
				.as_deref()
				.filter(|attribute| !attribute.is_empty())
				.unwrap_or(Self::DEFAULT_ANCHOR_ATTRIBUTE)
				.to_owned(),
			base_path: base_path.into(),
			debug: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SETTINGS: &str = r##"{
		"app-selectors": { "links": ["nav a", "a.internal"], "nav-items": "nav a", "content": "#content" },
		"container-selector": "#app",
		"default-content-selector": "#app noscript",
		"use-default-content": false,
		"view-directory": "views",
		"views": {
			"defaults": {
				"index": { "route": "", "source": "home.html" },
				"noroute": { "route": "404", "source": "404.html" }
			},
			"contact": { "route": "contact", "source": "contact.html" },
			"about": { "route": "about", "source": "about.html" }
		}
	}"##;

	#[test]
	fn parses_kebab_case_document() {
		let settings = Settings::from_json(SETTINGS).unwrap();
		assert_eq!(settings.app_selectors.links, ["nav a", "a.internal"]);
		assert_eq!(settings.app_selectors.nav_items, "nav a");
		assert!(!settings.use_default_content);
		assert_eq!(settings.views.defaults.noroute.source, "404.html");
	}

	#[test]
	fn registry_keeps_configuration_order() {
		let registry = Settings::from_json(SETTINGS).unwrap().registry();
		let keys: Vec<_> = registry.pages().map(|(key, _)| key).collect();
		assert_eq!(keys, ["contact", "about"]);
		assert_eq!(registry.index().unwrap().source, "home.html");
	}

	#[test]
	fn anchor_attribute_defaults_to_id() {
		let settings = Settings::from_json(SETTINGS).unwrap();
		let config = Config::from_settings(&settings, "/site/");
		assert_eq!(config.anchor_attribute, "id");
		assert_eq!(config.base_path, "/site/");
	}

	#[test]
	fn missing_defaults_are_rejected() {
		let json = r#"{
			"app-selectors": { "content": "main" },
			"container-selector": "main",
			"default-content-selector": "main",
			"views": { "about": { "route": "about", "source": "about.html" } }
		}"#;
		assert!(matches!(Settings::from_json(json), Err(SettingsError::Json(_))));
	}
}
