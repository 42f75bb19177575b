//! The router's private copy of the content it controls.
//!
//! Synchronization is one-way: views are reconciled into the shadow document, which is then materialized into the live
//! document as a whole new container. Nothing is ever read back from the live document after hydration.

use crate::{
	dom::Dom,
	error::Error,
	markup,
	tree::{NodeId, NodeKind, Tree},
};
use tracing::{debug, instrument, trace, trace_span};

/// Outcome of [`ShadowStore::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
	/// The target already had the new content. Nothing was touched.
	Unchanged,
	/// The target was swapped for this node.
	Replaced(NodeId),
}

#[derive(Debug, Default)]
pub struct ShadowStore {
	document: Option<Tree>,
	default_snapshot: Option<Tree>,
}

impl ShadowStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether the store has a document to reconcile into.
	#[must_use]
	pub fn is_hydrated(&self) -> bool {
		self.document.is_some()
	}

	#[must_use]
	pub fn document(&self) -> Option<&Tree> {
		self.document.as_ref()
	}

	/// The default content as parsed during hydration, kept to serve the home view without parsing again.
	#[must_use]
	pub fn default_snapshot(&self) -> Option<&Tree> {
		self.default_snapshot.as_ref()
	}

	/// Parses the page's embedded default content into the shadow document.
	///
	/// A `NOSCRIPT` container is read as its raw text, anything else as its markup.
	/// `default_content` is then removed from the live document, unless it is the `container` itself.
	///
	/// # Errors
	///
	/// [`Error::Init`] if either node is missing, [`Error::Dom`] if removal fails.
	#[instrument(skip(self, dom))]
	pub fn hydrate_from_default<D: Dom>(&mut self, dom: &mut D, container: Option<&D::Node>, default_content: Option<&D::Node>) -> Result<(), Error> {
		let (Some(container), Some(default_content)) = (container, default_content) else {
			return Err(Error::Init("container or default content not found"));
		};

		let markup = if dom.tag_name(default_content).eq_ignore_ascii_case("noscript") {
			dom.first_child_value(default_content).unwrap_or_default()
		} else {
			dom.inner_html(default_content)
		};
		let document = markup::parse(&markup);
		debug!(nodes = document.len(), "Hydrated shadow document from default content.");

		if !dom.is_same_node(container, default_content) {
			dom.remove(default_content)?;
		}

		self.default_snapshot = Some(document.clone());
		self.document = Some(document);
		Ok(())
	}

	/// Replaces the children of the node at `selector` with deep copies of `content_root`'s children.
	///
	/// The target itself is swapped for a fresh node with the same tag and attributes, so everything below it is new.
	/// If its children already equal the new ones, nothing happens.
	///
	/// # Errors
	///
	/// [`Error::Init`] before hydration, [`Error::Update`] if no node matches `selector`.
	#[instrument(skip(self, content))]
	pub fn reconcile(&mut self, selector: &str, content: &Tree, content_root: NodeId) -> Result<Reconciled, Error> {
		let document = self.document.as_mut().ok_or(Error::Init("shadow document not hydrated"))?;
		let old = document
			.select(selector)
			.map_err(|_| Error::Update(selector.to_owned()))?
			.ok_or_else(|| Error::Update(selector.to_owned()))?;

		if document.children_eq(old, content, content_root) {
			trace!("Content unchanged.");
			return Ok(Reconciled::Unchanged);
		}

		let new = document.shallow_copy(old).ok_or_else(|| Error::Update(selector.to_owned()))?;
		for &child in content.children(content_root) {
			if let Some(copy) = document.import(content, child) {
				document.append_child(new, copy);
			}
		}
		if !document.replace(old, new) {
			return Err(Error::Update(selector.to_owned()));
		}

		debug!(?old, ?new, "Reconciled content.");
		Ok(Reconciled::Replaced(new))
	}

	/// Builds a new live container: an empty clone of `container` holding deep copies of every shadow child.
	///
	/// The caller splices it into the live document in place of `container`.
	///
	/// # Errors
	///
	/// [`Error::Init`] before hydration, [`Error::Dom`] if the live document refuses a node.
	#[instrument(skip(self, dom))]
	pub fn materialize<D: Dom>(&self, dom: &mut D, container: &D::Node) -> Result<D::Node, Error> {
		let document = self.document.as_ref().ok_or(Error::Init("shadow document not hydrated"))?;
		let new_container = dom.clone_empty(container)?;
		for &child in document.children(document.root()) {
			let node = build(dom, document, child)?;
			dom.append_child(&new_container, &node)?;
		}
		Ok(new_container)
	}
}

fn build<D: Dom>(dom: &mut D, document: &Tree, id: NodeId) -> Result<D::Node, Error> {
	let span = trace_span!("build", ?id);
	let _enter = span.enter();

	Ok(match document.kind(id) {
		Some(NodeKind::Element { tag, attributes }) => {
			let element = dom.create_element(tag)?;
			for attribute in attributes {
				dom.set_attribute(&element, &attribute.name, &attribute.value)?;
			}
			for &child in document.children(id) {
				let child = build(dom, document, child)?;
				dom.append_child(&element, &child)?;
			}
			element
		}
		Some(NodeKind::Text(text)) => dom.create_text(text),
		Some(NodeKind::Comment(comment)) => dom.create_comment(comment),
		None => return Err(Error::Init("dangling shadow node")),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::headless::HeadlessDocument;

	const PAGE: &str = r##"<header id="top">Site</header><div id="app"><noscript><nav><a href="#/">Home</a></nav><main id="content"><h1>Home</h1></main><footer>f</footer></noscript></div>"##;

	fn hydrated() -> (ShadowStore, HeadlessDocument) {
		let mut dom = HeadlessDocument::parse(PAGE);
		let container = dom.query_selector("#app").unwrap();
		let default_content = dom.query_selector("#app noscript").unwrap();
		let mut store = ShadowStore::new();
		store.hydrate_from_default(&mut dom, container.as_ref(), default_content.as_ref()).unwrap();
		(store, dom)
	}

	#[test]
	fn hydration_reads_noscript_text_and_removes_it() {
		let (store, dom) = hydrated();
		let document = store.document().unwrap();
		assert!(document.select("#content").unwrap().is_some());
		assert!(dom.query_selector("noscript").unwrap().is_none());
		assert!(dom.query_selector("#app").unwrap().is_some());
		assert!(store.default_snapshot().unwrap().subtree_eq(store.default_snapshot().unwrap().root(), document, document.root()));
	}

	#[test]
	fn hydration_keeps_a_default_container() {
		let mut dom = HeadlessDocument::parse(r#"<div id="app"><main id="content">x</main></div>"#);
		let app = dom.query_selector("#app").unwrap();
		let mut store = ShadowStore::new();
		store.hydrate_from_default(&mut dom, app.as_ref(), app.as_ref()).unwrap();
		assert!(dom.query_selector("#app").unwrap().is_some());
		assert_eq!(store.document().unwrap().inner_html(store.document().unwrap().root()), r#"<main id="content">x</main>"#);
	}

	#[test]
	fn hydration_needs_both_nodes() {
		let mut dom = HeadlessDocument::parse("<div></div>");
		let mut store = ShadowStore::new();
		assert!(matches!(store.hydrate_from_default(&mut dom, None, None), Err(Error::Init(_))));
		assert!(!store.is_hydrated());
	}

	#[test]
	fn identical_content_is_a_no_op() {
		let (mut store, _) = hydrated();
		let content = markup::parse("<h1>About</h1>");

		let first = store.reconcile("#content", &content, content.root()).unwrap();
		let Reconciled::Replaced(node) = first else {
			panic!("expected a replacement");
		};
		assert_eq!(store.reconcile("#content", &content, content.root()).unwrap(), Reconciled::Unchanged);
		assert_eq!(store.document().unwrap().select("#content").unwrap(), Some(node));
	}

	#[test]
	fn replacement_leaves_siblings_alone() {
		let (mut store, _) = hydrated();
		let document = store.document().unwrap();
		let before: Vec<_> = document.children(document.root()).to_vec();
		let old = document.select("#content").unwrap().unwrap();

		let content = markup::parse("<h1>About</h1><p>Us</p>");
		let Reconciled::Replaced(new) = store.reconcile("#content", &content, content.root()).unwrap() else {
			panic!("expected a replacement");
		};

		let document = store.document().unwrap();
		let after = document.children(document.root());
		assert_eq!(before.len(), after.len());
		let changed: Vec<_> = before.iter().zip(after).filter(|(a, b)| a != b).collect();
		assert_eq!(changed, [(&old, &new)]);
		assert_eq!(document.attribute(new, "id"), Some("content"));
		assert_eq!(document.inner_html(new), "<h1>About</h1><p>Us</p>");
	}

	#[test]
	fn missing_target_is_an_update_error() {
		let (mut store, _) = hydrated();
		let content = markup::parse("x");
		assert!(matches!(store.reconcile("#missing", &content, content.root()), Err(Error::Update(selector)) if selector == "#missing"));
	}

	#[test]
	fn materialize_copies_into_a_fresh_container() {
		let (store, mut dom) = hydrated();
		let app = dom.query_selector("#app").unwrap().unwrap();
		let fresh = store.materialize(&mut dom, &app).unwrap();
		assert!(!dom.is_same_node(&app, &fresh));
		assert_eq!(dom.attribute(&fresh, "id").as_deref(), Some("app"));
		assert_eq!(dom.inner_html(&fresh), store.document().unwrap().inner_html(store.document().unwrap().root()));
	}
}
