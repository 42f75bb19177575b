//! Collaborators that run without a browser, backed by [`Tree`].
//!
//! There is no layout, so [`HeadlessDocument`] reports a node's document order position as its offset.

use crate::{
	dom::Dom,
	error::DomError,
	listeners::{Listeners, Subscription},
	location::{Location, NavigationSink},
	markup,
	tree::{NodeId, Tree},
};
use core::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct HeadlessDocument {
	tree: Tree,
	title: String,
	scroll: (f64, f64),
	bound_links: Vec<NodeId>,
}

impl HeadlessDocument {
	#[must_use]
	pub fn new(tree: Tree) -> Self {
		Self {
			tree,
			title: String::new(),
			scroll: (0.0, 0.0),
			bound_links: Vec::new(),
		}
	}

	/// A document whose body holds `markup`.
	#[must_use]
	pub fn parse(markup: &str) -> Self {
		Self::new(markup::parse(markup))
	}

	#[must_use]
	pub fn with_title(mut self, title: impl Into<String>) -> Self {
		self.title = title.into();
		self
	}

	#[must_use]
	pub fn tree(&self) -> &Tree {
		&self.tree
	}

	#[must_use]
	pub fn scroll_position(&self) -> (f64, f64) {
		self.scroll
	}

	/// Every link handed to [`Dom::bind_link`], oldest first.
	#[must_use]
	pub fn bound_links(&self) -> &[NodeId] {
		&self.bound_links
	}

	fn missing(node: NodeId) -> DomError {
		DomError::new(format_args!("{:?} is not part of this document", node))
	}
}

impl Dom for HeadlessDocument {
	type Node = NodeId;

	fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
		self.tree.select(selector).map_err(DomError::new)
	}

	fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
		self.tree.select_all(selector).map_err(DomError::new)
	}

	fn tag_name(&self, node: &NodeId) -> String {
		self.tree.tag(*node).map(str::to_ascii_uppercase).unwrap_or_default()
	}

	fn inner_html(&self, node: &NodeId) -> String {
		self.tree.inner_html(*node)
	}

	fn first_child_value(&self, node: &NodeId) -> Option<String> {
		let first = *self.tree.children(*node).first()?;
		self.tree.text(first).map(str::to_owned)
	}

	fn is_same_node(&self, a: &NodeId, b: &NodeId) -> bool {
		a == b
	}

	fn attributes(&self, node: &NodeId) -> Vec<(String, String)> {
		self.tree.attributes(*node).iter().map(|a| (a.name.clone(), a.value.clone())).collect()
	}

	fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
		self.tree.attribute(*node, name).map(str::to_owned)
	}

	fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
		if self.tree.tag(*node).is_none() {
			return Err(DomError::new(format_args!("{:?} is not an element", node)));
		}
		self.tree.set_attribute(*node, name, value);
		Ok(())
	}

	fn set_class(&mut self, node: &NodeId, class: &str, on: bool) {
		self.tree.toggle_class(*node, class, on);
	}

	fn create_element(&mut self, tag: &str) -> Result<NodeId, DomError> {
		if tag.is_empty() || !tag.chars().all(|c| c.is_alphanumeric() || c == '-') {
			return Err(DomError::new(format_args!("invalid element name {:?}", tag)));
		}
		Ok(self.tree.create_element(tag))
	}

	fn create_text(&mut self, text: &str) -> NodeId {
		self.tree.create_text(text)
	}

	fn create_comment(&mut self, comment: &str) -> NodeId {
		self.tree.create_comment(comment)
	}

	fn clone_empty(&mut self, node: &NodeId) -> Result<NodeId, DomError> {
		self.tree.shallow_copy(*node).ok_or_else(|| Self::missing(*node))
	}

	fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), DomError> {
		for node in [parent, child] {
			if !self.tree.contains(*node) {
				return Err(Self::missing(*node));
			}
		}
		self.tree.append_child(*parent, *child);
		Ok(())
	}

	fn remove(&mut self, node: &NodeId) -> Result<(), DomError> {
		if self.tree.parent(*node).is_none() {
			return Err(DomError::new(format_args!("{:?} has no parent", node)));
		}
		self.tree.remove(*node);
		Ok(())
	}

	fn replace(&mut self, old: &NodeId, new: &NodeId) -> Result<(), DomError> {
		if self.tree.replace(*old, *new) {
			Ok(())
		} else {
			Err(DomError::new(format_args!("can't replace {:?} with {:?}", old, new)))
		}
	}

	fn bind_link(&mut self, link: &NodeId, _sink: &NavigationSink) {
		trace!(?link, "Bound link.");
		self.bound_links.push(*link);
	}

	#[allow(clippy::cast_precision_loss)]
	fn offset_top(&self, node: &NodeId) -> f64 {
		self.tree.descendants(self.tree.root()).position(|n| n == *node).map_or(0.0, |position| (position + 1) as f64)
	}

	fn scroll_to(&mut self, x: f64, y: f64) {
		self.scroll = (x, y);
	}

	fn title(&self) -> String {
		self.title.clone()
	}
}

#[derive(Debug)]
struct LocationState {
	hash: String,
	host: String,
	pathname: String,
}

/// A [`Location`] whose fragment is changed with [`MemoryLocation::set_hash`].
///
/// Clones share state, so a clone kept outside the router can drive it.
#[derive(Debug, Clone)]
pub struct MemoryLocation {
	state: Rc<RefCell<LocationState>>,
	watchers: Listeners<String>,
}

impl MemoryLocation {
	pub fn new(host: impl Into<String>, pathname: impl Into<String>) -> Self {
		Self {
			state: Rc::new(RefCell::new(LocationState {
				hash: String::new(),
				host: host.into(),
				pathname: pathname.into(),
			})),
			watchers: Listeners::new(),
		}
	}

	#[must_use]
	pub fn with_hash(self, hash: impl Into<String>) -> Self {
		self.state.borrow_mut().hash = hash.into();
		self
	}

	/// Changes the fragment and notifies watchers, like following an in-page link would. Setting the same value is silent.
	pub fn set_hash(&self, hash: impl Into<String>) {
		let hash = hash.into();
		{
			let mut state = self.state.borrow_mut();
			if state.hash == hash {
				return;
			}
			state.hash.clone_from(&hash);
		}
		self.watchers.emit(&hash);
	}
}

impl Location for MemoryLocation {
	fn hash(&self) -> String {
		self.state.borrow().hash.clone()
	}

	fn host(&self) -> String {
		self.state.borrow().host.clone()
	}

	fn pathname(&self) -> String {
		self.state.borrow().pathname.clone()
	}

	fn watch_fragment(&mut self, sink: NavigationSink) -> Subscription {
		self.watchers.subscribe(move |hash: &String| {
			if sink.unbounded_send(hash.clone()).is_err() {
				trace!("Navigation sink closed.");
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::{channel::mpsc, FutureExt as _, StreamExt as _};

	#[test]
	fn fragment_changes_reach_the_sink_while_watched() {
		let mut location = MemoryLocation::new("example.com", "/").with_hash("#/");
		let (sink, mut inbox) = mpsc::unbounded();

		let watch = location.watch_fragment(sink);
		location.set_hash("#/about");
		location.set_hash("#/about");
		drop(watch);
		location.set_hash("#/team");

		assert_eq!(inbox.next().now_or_never(), Some(Some("#/about".to_owned())));
		assert_eq!(location.hash(), "#/team");
	}

	#[test]
	fn document_operations() {
		let mut dom = HeadlessDocument::parse(r#"<div id="a"><p>x</p></div><div id="b"></div>"#);
		let a = dom.query_selector("#a").unwrap().unwrap();
		let b = dom.query_selector("#b").unwrap().unwrap();
		assert_eq!(dom.tag_name(&a), "DIV");
		assert!(dom.offset_top(&a) < dom.offset_top(&b));

		let fresh = dom.clone_empty(&a).unwrap();
		assert_eq!(dom.inner_html(&fresh), "");
		dom.replace(&a, &fresh).unwrap();
		assert_eq!(dom.query_selector("#a").unwrap(), Some(fresh));
		assert!(dom.remove(&a).is_err());
		assert!(dom.query_selector("a:hover").is_err());
	}
}
