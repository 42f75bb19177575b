use crate::{error::DomError, location::NavigationSink};
use core::fmt::Debug;

/// The live, user-visible document.
///
/// The router only ever reads from it during [hydration](`crate::shadow::ShadowStore::hydrate_from_default`),
/// and writes to it by splicing in a freshly [materialized](`crate::shadow::ShadowStore::materialize`) container.
pub trait Dom {
	type Node: Clone + Debug;

	/// # Errors
	///
	/// Iff `selector` is invalid.
	fn query_selector(&self, selector: &str) -> Result<Option<Self::Node>, DomError>;

	/// # Errors
	///
	/// Iff `selector` is invalid.
	fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Node>, DomError>;

	/// The element's tag name (upper case for HTML elements, like `Element.tagName`).
	fn tag_name(&self, node: &Self::Node) -> String;

	fn inner_html(&self, node: &Self::Node) -> String;

	/// `node.firstChild.nodeValue`, if any.
	fn first_child_value(&self, node: &Self::Node) -> Option<String>;

	fn is_same_node(&self, a: &Self::Node, b: &Self::Node) -> bool;

	fn attributes(&self, node: &Self::Node) -> Vec<(String, String)>;

	fn attribute(&self, node: &Self::Node, name: &str) -> Option<String> {
		self.attributes(node).into_iter().find(|(n, _)| n == name).map(|(_, value)| value)
	}

	/// # Errors
	///
	/// Iff `node` is not an element.
	fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str) -> Result<(), DomError>;

	fn set_class(&mut self, node: &Self::Node, class: &str, on: bool);

	/// # Errors
	///
	/// Iff `tag` is not a valid element name.
	fn create_element(&mut self, tag: &str) -> Result<Self::Node, DomError>;

	fn create_text(&mut self, text: &str) -> Self::Node;

	fn create_comment(&mut self, comment: &str) -> Self::Node;

	/// `node.cloneNode()`: same tag and attributes, no children.
	///
	/// # Errors
	///
	/// Iff the node can't be cloned.
	fn clone_empty(&mut self, node: &Self::Node) -> Result<Self::Node, DomError>;

	/// # Errors
	///
	/// Iff `child` can't be inserted below `parent`.
	fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), DomError>;

	/// Removes `node` from its parent.
	///
	/// # Errors
	///
	/// Iff `node` has no parent.
	fn remove(&mut self, node: &Self::Node) -> Result<(), DomError>;

	/// Puts `new` in place of `old` within `old`'s parent.
	///
	/// # Errors
	///
	/// Iff `old` has no parent.
	fn replace(&mut self, old: &Self::Node, new: &Self::Node) -> Result<(), DomError>;

	/// Routes activations of `link` back into the router through `sink`.
	fn bind_link(&mut self, link: &Self::Node, sink: &NavigationSink);

	/// Vertical offset of `node` used as anchor scroll target.
	fn offset_top(&self, node: &Self::Node) -> f64;

	fn scroll_to(&mut self, x: f64, y: f64);

	fn title(&self) -> String;
}
