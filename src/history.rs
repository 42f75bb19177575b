//! Canonical URLs and the history bookkeeping that keeps them in step with navigation.

use crate::{
	registry::PageRegistry,
	route::{RouteComponents, ROUTE_PREFIX},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// The unit recorded in navigation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
	pub page: String,
	pub url: String,
	pub anchor: String,
}

/// Browser-style history storage.
pub trait History {
	fn push_state(&mut self, state: &PageState, title: &str, url: &str);
	fn replace_state(&mut self, state: &PageState, title: &str, url: &str);
}

/// What [`HistorySync::synchronize`] did to the [`History`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
	Replaced,
	Pushed,
	Unchanged,
}

/// Builds the canonical URL for `components`.
///
/// The home view gets no route segment, so its URL is just `base_path` plus anchor and query.
#[must_use]
pub fn assemble_url(components: &RouteComponents, registry: &PageRegistry, base_path: &str) -> String {
	let mut url = String::from(base_path);
	if registry.index().map_or(true, |index| components.view != index.route) {
		url.push_str(ROUTE_PREFIX);
		url.push_str(&components.view);
	}
	if !components.anchor.is_empty() {
		url.push('#');
		url.push_str(&components.anchor);
	}
	if !components.query.is_empty() {
		url.push('?');
		url.push_str(&components.query);
	}
	url
}

/// Tracks the current [`PageState`] and decides between replacing and pushing history entries.
#[derive(Debug, Default)]
pub struct HistorySync {
	current: Option<PageState>,
}

impl HistorySync {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn current(&self) -> Option<&PageState> {
		self.current.as_ref()
	}

	/// Records the state for `components`.
	///
	/// The very first state replaces the current entry. After that a new entry is pushed only if the URL changed.
	#[instrument(skip(self, registry, history))]
	pub fn synchronize(
		&mut self,
		components: &RouteComponents,
		active_view: &str,
		registry: &PageRegistry,
		base_path: &str,
		history: &mut dyn History,
		title: &str,
	) -> HistoryAction {
		let url = assemble_url(components, registry, base_path);
		let state = PageState {
			page: active_view.to_owned(),
			url,
			anchor: components.anchor.clone(),
		};

		let action = match &self.current {
			None => {
				history.replace_state(&state, title, &state.url);
				HistoryAction::Replaced
			}
			Some(previous) if previous.url != state.url => {
				history.push_state(&state, title, &state.url);
				HistoryAction::Pushed
			}
			Some(_) => HistoryAction::Unchanged,
		};
		debug!(?action, url = %state.url, "Synchronized history.");

		self.current = Some(state);
		action
	}
}

/// One [`MemoryHistory`] entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
	pub state: Option<PageState>,
	pub title: String,
	pub url: String,
}

/// In-memory [`History`] with a cursor, for headless hosts.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
	entries: Vec<HistoryEntry>,
	index: usize,
}

impl MemoryHistory {
	/// Starts with a single stateless entry for `url`, like a freshly loaded page.
	#[must_use]
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			entries: vec![HistoryEntry {
				state: None,
				title: String::new(),
				url: url.into(),
			}],
			index: 0,
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	#[must_use]
	pub fn current(&self) -> &HistoryEntry {
		&self.entries[self.index]
	}

	#[must_use]
	pub fn entries(&self) -> &[HistoryEntry] {
		&self.entries
	}

	/// Moves the cursor by `delta` entries, clamped to the stack. Returns the new current entry.
	pub fn go(&mut self, delta: isize) -> &HistoryEntry {
		let target = self.index.saturating_add_signed(delta).min(self.entries.len() - 1);
		self.index = target;
		self.current()
	}
}

impl Default for MemoryHistory {
	fn default() -> Self {
		Self::new("/")
	}
}

impl History for MemoryHistory {
	fn push_state(&mut self, state: &PageState, title: &str, url: &str) {
		self.entries.truncate(self.index + 1);
		self.entries.push(HistoryEntry {
			state: Some(state.clone()),
			title: title.to_owned(),
			url: url.to_owned(),
		});
		self.index = self.entries.len() - 1;
	}

	fn replace_state(&mut self, state: &PageState, title: &str, url: &str) {
		self.entries[self.index] = HistoryEntry {
			state: Some(state.clone()),
			title: title.to_owned(),
			url: url.to_owned(),
		};
	}
}
