//! An owned node tree with generational identity.
//!
//! Nodes live in an arena owned by their [`Tree`]. A [`NodeId`] stays valid until its node is [removed](`Tree::remove`);
//! slots are recycled afterwards, but with a new generation, so a stale id never aliases a newer node.
//!
//! Text and attribute values are stored decoded and escaped again on serialization, except for the text of raw text
//! elements like `script`, which is written back verbatim.

use crate::selector::{Selector, SelectorError};
use core::fmt::{self, Debug, Formatter, Write as _};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
	index: u32,
	generation: u32,
}

impl Debug for NodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "NodeId({}v{})", self.index, self.generation)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
	pub name: String,
	pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
	Element { tag: String, attributes: Vec<Attribute> },
	Text(String),
	Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
	kind: NodeKind,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
	generation: u32,
	node: Option<NodeData>,
}

/// Elements whose text content is not markup (`noscript` as in a scripting-enabled browser).
pub const RAW_TEXT_ELEMENTS: &[&str] = &["iframe", "noembed", "noframes", "noscript", "script", "style", "xmp"];

const VOID_ELEMENTS: &[&str] = &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];

#[derive(Debug, Clone)]
pub struct Tree {
	slots: Vec<Slot>,
	free: Vec<u32>,
	root: NodeId,
}

impl Tree {
	/// Creates a tree consisting of a single `root_tag` element.
	#[must_use]
	pub fn new(root_tag: &str) -> Self {
		let mut tree = Self {
			slots: Vec::new(),
			free: Vec::new(),
			root: NodeId { index: 0, generation: 0 },
		};
		tree.root = tree.create_element(root_tag);
		tree
	}

	#[must_use]
	pub fn root(&self) -> NodeId {
		self.root
	}

	/// Number of live nodes, detached ones included.
	#[must_use]
	pub fn len(&self) -> usize {
		self.slots.len() - self.free.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn data(&self, id: NodeId) -> Option<&NodeData> {
		self.slots.get(id.index as usize).filter(|slot| slot.generation == id.generation).and_then(|slot| slot.node.as_ref())
	}

	fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
		self.slots.get_mut(id.index as usize).filter(|slot| slot.generation == id.generation).and_then(|slot| slot.node.as_mut())
	}

	#[must_use]
	pub fn contains(&self, id: NodeId) -> bool {
		self.data(id).is_some()
	}

	pub fn create(&mut self, kind: NodeKind) -> NodeId {
		let node = NodeData {
			kind,
			parent: None,
			children: Vec::new(),
		};
		if let Some(index) = self.free.pop() {
			let slot = &mut self.slots[index as usize];
			slot.node = Some(node);
			NodeId { index, generation: slot.generation }
		} else {
			let index = u32::try_from(self.slots.len()).expect("node tree exceeded u32::MAX slots");
			self.slots.push(Slot { generation: 0, node: Some(node) });
			NodeId { index, generation: 0 }
		}
	}

	pub fn create_element(&mut self, tag: &str) -> NodeId {
		self.create(NodeKind::Element {
			tag: tag.to_owned(),
			attributes: Vec::new(),
		})
	}

	pub fn create_text(&mut self, text: &str) -> NodeId {
		self.create(NodeKind::Text(text.to_owned()))
	}

	pub fn create_comment(&mut self, comment: &str) -> NodeId {
		self.create(NodeKind::Comment(comment.to_owned()))
	}

	#[must_use]
	pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
		self.data(id).map(|data| &data.kind)
	}

	#[must_use]
	pub fn tag(&self, id: NodeId) -> Option<&str> {
		match self.kind(id)? {
			NodeKind::Element { tag, .. } => Some(tag),
			_ => None,
		}
	}

	#[must_use]
	pub fn attributes(&self, id: NodeId) -> &[Attribute] {
		match self.kind(id) {
			Some(NodeKind::Element { attributes, .. }) => attributes,
			_ => &[],
		}
	}

	#[must_use]
	pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
		self.attributes(id).iter().find(|a| a.name == name).map(|a| a.value.as_str())
	}

	/// Sets or overwrites `name`. Does nothing on non-elements.
	pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
		if let Some(NodeData {
			kind: NodeKind::Element { attributes, .. },
			..
		}) = self.data_mut(id)
		{
			match attributes.iter_mut().find(|a| a.name == name) {
				Some(attribute) => value.clone_into(&mut attribute.value),
				None => attributes.push(Attribute {
					name: name.to_owned(),
					value: value.to_owned(),
				}),
			}
		}
	}

	pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
		if let Some(NodeData {
			kind: NodeKind::Element { attributes, .. },
			..
		}) = self.data_mut(id)
		{
			attributes.retain(|a| a.name != name);
		}
	}

	/// Adds or removes `class` from the element's `class` attribute.
	pub fn toggle_class(&mut self, id: NodeId, class: &str, on: bool) {
		let current = self.attribute(id, "class").unwrap_or("");
		let has = current.split_ascii_whitespace().any(|c| c == class);
		if has == on {
			return;
		}
		let updated = if on {
			current.split_ascii_whitespace().chain([class]).collect::<Vec<_>>().join(" ")
		} else {
			current.split_ascii_whitespace().filter(|c| *c != class).collect::<Vec<_>>().join(" ")
		};
		self.set_attribute(id, "class", &updated);
	}

	/// The text of a text or comment node.
	#[must_use]
	pub fn text(&self, id: NodeId) -> Option<&str> {
		match self.kind(id)? {
			NodeKind::Text(text) | NodeKind::Comment(text) => Some(text),
			NodeKind::Element { .. } => None,
		}
	}

	#[must_use]
	pub fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.data(id)?.parent
	}

	#[must_use]
	pub fn children(&self, id: NodeId) -> &[NodeId] {
		self.data(id).map_or(&[], |data| &data.children)
	}

	/// Appends `child` to `parent`, detaching it from its previous parent first.
	pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
		if !self.contains(parent) || !self.contains(child) || parent == child {
			return;
		}
		self.detach(child);
		if let Some(data) = self.data_mut(child) {
			data.parent = Some(parent);
		}
		if let Some(data) = self.data_mut(parent) {
			data.children.push(child);
		}
	}

	/// Unlinks `id` from its parent. The subtree stays alive.
	pub fn detach(&mut self, id: NodeId) {
		let Some(parent) = self.parent(id) else {
			return;
		};
		if let Some(data) = self.data_mut(parent) {
			data.children.retain(|&child| child != id);
		}
		if let Some(data) = self.data_mut(id) {
			data.parent = None;
		}
	}

	/// Detaches `id` and frees its whole subtree. The root cannot be removed.
	pub fn remove(&mut self, id: NodeId) {
		if id == self.root || !self.contains(id) {
			return;
		}
		self.detach(id);
		let mut stack = vec![id];
		while let Some(next) = stack.pop() {
			let slot = &mut self.slots[next.index as usize];
			if let Some(data) = slot.node.take() {
				slot.generation = slot.generation.wrapping_add(1);
				self.free.push(next.index);
				stack.extend(data.children);
			}
		}
	}

	/// Puts `new` where `old` is within `old`'s parent, then removes `old`.
	///
	/// Returns `false` (and changes nothing) if `old` has no parent.
	pub fn replace(&mut self, old: NodeId, new: NodeId) -> bool {
		let Some(parent) = self.parent(old) else {
			return false;
		};
		if !self.contains(new) || new == old {
			return false;
		}
		self.detach(new);
		if let Some(data) = self.data_mut(parent) {
			if let Some(position) = data.children.iter().position(|&child| child == old) {
				data.children[position] = new;
			}
		}
		if let Some(data) = self.data_mut(new) {
			data.parent = Some(parent);
		}
		if let Some(data) = self.data_mut(old) {
			data.parent = None;
		}
		self.remove(old);
		true
	}

	/// A detached copy of `id` with the same tag and attributes (or text) but no children.
	pub fn shallow_copy(&mut self, id: NodeId) -> Option<NodeId> {
		let kind = self.kind(id)?.clone();
		Some(self.create(kind))
	}

	/// Deep-copies `source`'s node `id` into this tree, detached.
	pub fn import(&mut self, source: &Tree, id: NodeId) -> Option<NodeId> {
		let copy = self.create(source.kind(id)?.clone());
		for &child in source.children(id) {
			if let Some(child_copy) = self.import(source, child) {
				self.append_child(copy, child_copy);
			}
		}
		Some(copy)
	}

	/// A new tree rooted at a deep copy of `id`.
	#[must_use]
	pub fn subtree(&self, id: NodeId) -> Option<Tree> {
		let mut tree = Self {
			slots: Vec::new(),
			free: Vec::new(),
			root: NodeId { index: 0, generation: 0 },
		};
		tree.root = tree.import(self, id)?;
		Some(tree)
	}

	/// Structural equality in the sense of `Node.isEqualNode`: same kind, tag, attribute set and equal children.
	#[must_use]
	pub fn subtree_eq(&self, id: NodeId, other: &Tree, other_id: NodeId) -> bool {
		match (self.kind(id), other.kind(other_id)) {
			(Some(NodeKind::Element { tag: t_1, attributes: a_1 }), Some(NodeKind::Element { tag: t_2, attributes: a_2 })) => {
				t_1.eq_ignore_ascii_case(t_2) && a_1.len() == a_2.len() && a_1.iter().all(|a| a_2.contains(a)) && self.children_eq(id, other, other_id)
			}
			(Some(NodeKind::Text(t_1)), Some(NodeKind::Text(t_2))) | (Some(NodeKind::Comment(t_1)), Some(NodeKind::Comment(t_2))) => t_1 == t_2,
			_ => false,
		}
	}

	/// Whether the child lists of `id` and `other_id` are pairwise [structurally equal](`Tree::subtree_eq`).
	#[must_use]
	pub fn children_eq(&self, id: NodeId, other: &Tree, other_id: NodeId) -> bool {
		let (c_1, c_2) = (self.children(id), other.children(other_id));
		c_1.len() == c_2.len() && c_1.iter().zip(c_2).all(|(&a, &b)| self.subtree_eq(a, other, b))
	}

	/// Descendants of `id` in document order, `id` itself excluded.
	#[must_use]
	pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
		Descendants {
			tree: self,
			stack: self.children(id).iter().rev().copied().collect(),
		}
	}

	/// First descendant of the root matching `selector`.
	///
	/// # Errors
	///
	/// Iff `selector` can't be parsed.
	pub fn select(&self, selector: &str) -> Result<Option<NodeId>, SelectorError> {
		let selector = Selector::parse(selector)?;
		Ok(self.select_parsed(&selector))
	}

	#[must_use]
	pub fn select_parsed(&self, selector: &Selector) -> Option<NodeId> {
		self.descendants(self.root).find(|&node| selector.matches(self, node))
	}

	/// All descendants of the root matching `selector`, in document order.
	///
	/// # Errors
	///
	/// Iff `selector` can't be parsed.
	pub fn select_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
		let selector = Selector::parse(selector)?;
		Ok(self.descendants(self.root).filter(|&node| selector.matches(self, node)).collect())
	}

	/// Serialized markup of `id`'s children.
	#[must_use]
	pub fn inner_html(&self, id: NodeId) -> String {
		let mut html = String::new();
		for &child in self.children(id) {
			self.write_html(&mut html, child);
		}
		html
	}

	#[must_use]
	pub fn outer_html(&self, id: NodeId) -> String {
		let mut html = String::new();
		self.write_html(&mut html, id);
		html
	}

	fn write_html(&self, html: &mut String, id: NodeId) {
		match self.kind(id) {
			None => (),
			Some(NodeKind::Text(text)) => {
				let raw = self.parent(id).and_then(|parent| self.tag(parent)).map_or(false, |tag| RAW_TEXT_ELEMENTS.iter().any(|raw| tag.eq_ignore_ascii_case(raw)));
				if raw {
					html.push_str(text);
				} else {
					for c in text.chars() {
						match c {
							'&' => html.push_str("&amp;"),
							'<' => html.push_str("&lt;"),
							'>' => html.push_str("&gt;"),
							c => html.push(c),
						}
					}
				}
			}
			Some(NodeKind::Comment(comment)) => {
				let _ = write!(html, "<!--{}-->", comment);
			}
			Some(NodeKind::Element { tag, attributes }) => {
				let tag = tag.to_ascii_lowercase();
				html.push('<');
				html.push_str(&tag);
				for Attribute { name, value } in attributes {
					let _ = write!(html, " {}=\"{}\"", name, value.replace('&', "&amp;").replace('"', "&quot;"));
				}
				html.push('>');
				if VOID_ELEMENTS.contains(&tag.as_str()) {
					return;
				}
				for &child in self.children(id) {
					self.write_html(html, child);
				}
				let _ = write!(html, "</{}>", tag);
			}
		}
	}
}

pub struct Descendants<'a> {
	tree: &'a Tree,
	stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
	type Item = NodeId;

	fn next(&mut self) -> Option<Self::Item> {
		let next = self.stack.pop()?;
		self.stack.extend(self.tree.children(next).iter().rev());
		Some(next)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn list(items: &[&str]) -> (Tree, NodeId) {
		let mut tree = Tree::new("body");
		let ul = tree.create_element("ul");
		tree.append_child(tree.root(), ul);
		for item in items {
			let li = tree.create_element("li");
			let text = tree.create_text(item);
			tree.append_child(li, text);
			tree.append_child(ul, li);
		}
		(tree, ul)
	}

	#[test]
	fn serializes_markup() {
		let (mut tree, ul) = list(&["a", "b"]);
		tree.set_attribute(ul, "class", "x");
		let br = tree.create_element("BR");
		tree.append_child(ul, br);
		assert_eq!(tree.inner_html(tree.root()), r#"<ul class="x"><li>a</li><li>b</li><br></ul>"#);
	}

	#[test]
	fn removed_ids_are_not_reused() {
		let (mut tree, ul) = list(&["a"]);
		let before = tree.len();
		tree.remove(ul);
		assert!(!tree.contains(ul));
		assert_eq!(tree.len(), before - 3);

		let replacement = tree.create_element("ul");
		assert_ne!(replacement, ul);
		assert!(tree.contains(replacement));
		assert!(!tree.contains(ul));
	}

	#[test]
	fn replace_keeps_position_and_siblings() {
		let (mut tree, ul) = list(&["a", "b", "c"]);
		let children = tree.children(ul).to_vec();
		let new = tree.create_element("li");
		assert!(tree.replace(children[1], new));
		assert_eq!(tree.children(ul), [children[0], new, children[2]]);
		assert!(!tree.contains(children[1]));
		assert_eq!(tree.parent(new), Some(ul));
		assert!(!tree.replace(tree.root(), new));
	}

	#[test]
	fn structural_equality_across_trees() {
		let (a, ul_a) = list(&["a", "b"]);
		let (b, ul_b) = list(&["a", "b"]);
		let (c, ul_c) = list(&["a", "c"]);
		assert!(a.subtree_eq(ul_a, &b, ul_b));
		assert!(!a.subtree_eq(ul_a, &c, ul_c));
		assert!(a.children_eq(a.root(), &b, b.root()));
	}

	#[test]
	fn attribute_order_does_not_matter() {
		let mut a = Tree::new("div");
		a.set_attribute(a.root(), "id", "x");
		a.set_attribute(a.root(), "class", "y");
		let mut b = Tree::new("DIV");
		b.set_attribute(b.root(), "class", "y");
		b.set_attribute(b.root(), "id", "x");
		assert!(a.subtree_eq(a.root(), &b, b.root()));
		b.set_attribute(b.root(), "id", "z");
		assert!(!a.subtree_eq(a.root(), &b, b.root()));
	}

	#[test]
	fn import_and_subtree_copy_deeply() {
		let (a, ul) = list(&["a", "b"]);
		let copy = a.subtree(ul).unwrap();
		assert_eq!(copy.tag(copy.root()), Some("ul"));
		assert!(a.subtree_eq(ul, &copy, copy.root()));
	}

	#[test]
	fn toggles_classes() {
		let mut tree = Tree::new("a");
		let root = tree.root();
		tree.toggle_class(root, "active", true);
		tree.toggle_class(root, "active", true);
		assert_eq!(tree.attribute(root, "class"), Some("active"));
		tree.set_attribute(root, "class", "nav active item");
		tree.toggle_class(root, "active", false);
		assert_eq!(tree.attribute(root, "class"), Some("nav item"));
	}

	#[test]
	fn descendants_in_document_order() {
		let (tree, ul) = list(&["a", "b"]);
		let tags: Vec<_> = tree.descendants(tree.root()).map(|id| tree.tag(id).map_or_else(|| tree.text(id).unwrap().to_owned(), str::to_owned)).collect();
		assert_eq!(tags, ["ul", "li", "a", "li", "b"]);
		assert_eq!(tree.select_all("li").unwrap().len(), 2);
		assert_eq!(tree.select("ul").unwrap(), Some(ul));
	}
}
