//! Fragment parsing and content source resolution.

use crate::{
	error::{ErrorLog, ViewError},
	registry::PageRegistry,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{instrument, trace};

/// Marks a fragment as a route rather than a plain in-page anchor.
pub const ROUTE_PREFIX: &str = "#/";

/// Bytes `encodeURI` escapes besides non-ASCII ones.
const URI: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'%')
	.add(b'<')
	.add(b'>')
	.add(b'[')
	.add(b'\\')
	.add(b']')
	.add(b'^')
	.add(b'`')
	.add(b'{')
	.add(b'|')
	.add(b'}');

fn view_cleaner() -> &'static Regex {
	static CLEANER: OnceLock<Regex> = OnceLock::new();
	CLEANER.get_or_init(|| Regex::new(r"^#/|[#?/].*").expect("valid view pattern"))
}

fn anchor_pattern() -> &'static Regex {
	static ANCHOR: OnceLock<Regex> = OnceLock::new();
	ANCHOR.get_or_init(|| Regex::new(r"#[A-Za-z0-9_\-]+").expect("valid anchor pattern"))
}

fn query_pattern() -> &'static Regex {
	static QUERY: OnceLock<Regex> = OnceLock::new();
	QUERY.get_or_init(|| Regex::new(r"\?.*").expect("valid query pattern"))
}

/// Escapes like ECMAScript's `encodeURI`.
#[must_use]
pub fn encode_uri(value: &str) -> String {
	utf8_percent_encode(value, URI).to_string()
}

/// Structured form of one navigation's fragment.
///
/// `view`, `anchor` and `query` are URI-escaped. `anchor` has no leading `#` and `query` no leading `?`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteComponents {
	pub view: String,
	pub anchor: String,
	pub query: String,
	/// Content source for `view`. Never empty: unknown views resolve to the 404 source.
	pub request_source: String,
}

/// Splits `raw` (a `location.hash` value, `#` included) into [`RouteComponents`].
///
/// Returns [`None`] iff `registry` is empty or lacks its defaults, which callers must treat as fatal.
#[instrument(skip(registry))]
pub fn parse_fragment(raw: &str, registry: &PageRegistry) -> Option<RouteComponents> {
	if registry.is_empty() {
		return None;
	}
	let defaults = registry.defaults()?;

	let view = if raw.starts_with(ROUTE_PREFIX) {
		view_cleaner().replace_all(raw, "").into_owned()
	} else {
		defaults.index.route.clone()
	};

	let anchor = anchor_pattern().find(raw).map_or("", |m| &m.as_str()[1..]);
	let query = query_pattern().find(raw).map_or("", |m| &m.as_str()[1..]);

	let request_source = if let Some(page) = registry.page_for_route(&view) {
		page.source.clone()
	} else if view == defaults.index.route {
		defaults.index.source.clone()
	} else {
		defaults.noroute.source.clone()
	};
	trace!(view, anchor, query, request_source, "Parsed fragment.");

	Some(RouteComponents {
		view: encode_uri(&view),
		anchor: encode_uri(anchor),
		query: encode_uri(query),
		request_source,
	})
}

/// Clamps a requested content source to the sources `registry` knows about.
///
/// An absent or empty `page` means the home page and anything unknown becomes the 404 source.
/// An empty registry is recorded in `error_log` and yields [`None`], after which loading must not proceed.
pub fn resolve_requested_page(page: Option<&str>, registry: &PageRegistry, error_log: &mut ErrorLog) -> Option<String> {
	let defaults = match registry.defaults() {
		Some(defaults) if !registry.is_empty() => defaults,
		_ => {
			error_log.push(ViewError::InvalidPage("empty page registry"));
			return None;
		}
	};

	let page = page.filter(|page| !page.is_empty()).unwrap_or(&defaults.index.source);
	if registry.knows_source(page) {
		Some(page.to_owned())
	} else {
		trace!(page, "Unknown page source; substituting the 404 source.");
		Some(defaults.noroute.source.clone())
	}
}
