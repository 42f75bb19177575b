//! Markup text to [`Tree`], using [`tl`].

use crate::tree::{NodeId, Tree, RAW_TEXT_ELEMENTS};
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::{Captures, Regex};
use std::{borrow::Cow, sync::OnceLock};
use tracing::{trace, warn};

fn character_reference() -> &'static Regex {
	static REFERENCE: OnceLock<Regex> = OnceLock::new();
	REFERENCE.get_or_init(|| Regex::new(r"&(?:#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z][A-Za-z0-9]*);").expect("valid character reference pattern"))
}

/// Resolves character references like an HTML parser would. Unknown or malformed references are kept as written.
#[must_use]
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
	character_reference().replace_all(raw, |captures: &Captures<'_>| {
		let reference = &captures[0];
		unescape_with(reference, resolve_html5_entity).map_or_else(|_| reference.to_owned(), Cow::into_owned)
	})
}

/// Parses `markup` the way a browser's `DOMParser` would hand back its `<body>`.
///
/// If the markup contains a `body` element, that element becomes the root. Otherwise every top-level node is adopted
/// by a synthetic `body` root. Like in a scripting-enabled browser, `noscript` content is kept as a single raw text node.
/// Character references in text and attribute values are decoded, except within raw text elements.
#[must_use]
pub fn parse(markup: &str) -> Tree {
	let mut tree = Tree::new("body");
	let root = tree.root();

	let dom = match tl::parse(markup, tl::ParserOptions::default()) {
		Ok(dom) => dom,
		Err(error) => {
			warn!("Failed to parse markup ({}); keeping it as text.", error);
			let text = tree.create_text(markup);
			tree.append_child(root, text);
			return tree;
		}
	};
	let parser = dom.parser();

	match find_body(dom.children(), parser) {
		Some(body) => {
			copy_attributes(&mut tree, root, body);
			for handle in child_handles(body) {
				convert(&mut tree, root, handle, parser, false);
			}
		}
		None => {
			for handle in dom.children() {
				convert(&mut tree, root, *handle, parser, false);
			}
		}
	}

	trace!(nodes = tree.len(), "Parsed markup.");
	tree
}

fn child_handles(tag: &tl::HTMLTag<'_>) -> Vec<tl::NodeHandle> {
	tag.children().top().iter().copied().collect()
}

fn find_body<'p, 'buf>(handles: &[tl::NodeHandle], parser: &'p tl::Parser<'buf>) -> Option<&'p tl::HTMLTag<'buf>> {
	for handle in handles {
		let Some(tl::Node::Tag(tag)) = handle.get(parser) else {
			continue;
		};
		if tag.name().as_utf8_str().eq_ignore_ascii_case("body") {
			return Some(tag);
		}
		if let Some(body) = find_body(&child_handles(tag), parser) {
			return Some(body);
		}
	}
	None
}

fn copy_attributes(tree: &mut Tree, element: NodeId, tag: &tl::HTMLTag<'_>) {
	let attributes = tag.attributes();
	for (name, value) in attributes.iter() {
		let value = value.map(|v| decode_entities(&v).into_owned()).unwrap_or_default();
		tree.set_attribute(element, &name, &value);
	}
	// `tl` keeps these two apart from the rest.
	for name in ["id", "class"] {
		if tree.attribute(element, name).is_some() {
			continue;
		}
		if let Some(value) = attributes.get(name) {
			let value = value.map(|v| decode_entities(&v.as_utf8_str()).into_owned()).unwrap_or_default();
			tree.set_attribute(element, name, &value);
		}
	}
}

fn convert(tree: &mut Tree, parent: NodeId, handle: tl::NodeHandle, parser: &tl::Parser<'_>, raw_text: bool) {
	let Some(node) = handle.get(parser) else {
		return;
	};

	match node {
		tl::Node::Tag(tag) => {
			let name = tag.name().as_utf8_str().to_ascii_lowercase();
			// Doctype and other declarations.
			if name.starts_with('!') {
				return;
			}

			let element = tree.create_element(&name);
			copy_attributes(tree, element, tag);
			let raw_children = RAW_TEXT_ELEMENTS.contains(&name.as_str());
			for child in child_handles(tag) {
				convert(tree, element, child, parser, raw_children);
			}

			if name == "noscript" {
				let raw = tree.inner_html(element);
				for child in tree.children(element).to_vec() {
					tree.remove(child);
				}
				if !raw.is_empty() {
					let text = tree.create_text(&raw);
					tree.append_child(element, text);
				}
			}

			tree.append_child(parent, element);
		}
		tl::Node::Raw(bytes) => {
			let raw = bytes.as_utf8_str();
			let text = if raw_text { tree.create_text(&raw) } else { tree.create_text(&decode_entities(&raw)) };
			tree.append_child(parent, text);
		}
		tl::Node::Comment(bytes) => {
			let raw = bytes.as_utf8_str();
			let raw: &str = &raw;
			let text = raw.strip_prefix("<!--").unwrap_or(raw);
			let text = text.strip_suffix("-->").unwrap_or(text);
			let comment = tree.create_comment(text);
			tree.append_child(parent, comment);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fragment_is_wrapped_in_body() {
		let tree = parse(r#"<main id="content"><h1>About</h1><p class="lead">Hi</p></main>"#);
		assert_eq!(tree.tag(tree.root()), Some("body"));
		let main = tree.select("#content").unwrap().unwrap();
		assert_eq!(tree.parent(main), Some(tree.root()));
		assert_eq!(tree.inner_html(main), r#"<h1>About</h1><p class="lead">Hi</p>"#);
	}

	#[test]
	fn body_of_a_full_document_becomes_root() {
		let tree = parse(r#"<!DOCTYPE html><html><head><title>x</title></head><body class="page"><div id="content">x</div></body></html>"#);
		assert_eq!(tree.tag(tree.root()), Some("body"));
		assert_eq!(tree.attribute(tree.root(), "class"), Some("page"));
		assert_eq!(tree.inner_html(tree.root()), r#"<div id="content">x</div>"#);
	}

	#[test]
	fn noscript_content_is_raw_text() {
		let tree = parse(r#"<div id="app"><noscript><main id="content">Home</main></noscript></div>"#);
		let noscript = tree.select("noscript").unwrap().unwrap();
		let children = tree.children(noscript);
		assert_eq!(children.len(), 1);
		assert_eq!(tree.text(children[0]), Some(r#"<main id="content">Home</main>"#));
		assert_eq!(tree.select("#content").unwrap(), None);
	}

	#[test]
	fn character_references_are_decoded() {
		let tree = parse(r#"<p title="a &amp; b">Tom &amp; Jerry &copy; &#169; &#xA9; &bogus; 1 & 2</p><a href="?a=1&amp;b=2">x</a>"#);
		let p = tree.select("p").unwrap().unwrap();
		assert_eq!(tree.text(tree.children(p)[0]), Some("Tom & Jerry © © © &bogus; 1 & 2"));
		assert_eq!(tree.attribute(p, "title"), Some("a & b"));
		assert_eq!(tree.outer_html(p), r#"<p title="a &amp; b">Tom &amp; Jerry © © © &amp;bogus; 1 &amp; 2</p>"#);

		let a = tree.select("a").unwrap().unwrap();
		assert_eq!(tree.attribute(a, "href"), Some("?a=1&b=2"));

		let again = parse(&tree.outer_html(p));
		assert!(again.subtree_eq(again.select("p").unwrap().unwrap(), &tree, p));
	}

	#[test]
	fn raw_text_elements_are_left_alone() {
		let tree = parse("<script>if (a &amp;&amp; b) {}</script>");
		let script = tree.select("script").unwrap().unwrap();
		assert_eq!(tree.text(tree.children(script)[0]), Some("if (a &amp;&amp; b) {}"));
		assert_eq!(tree.inner_html(script), "if (a &amp;&amp; b) {}");
	}

	#[test]
	fn noscript_keeps_markup_escaped() {
		let tree = parse(r#"<noscript><p>Tom &amp; Jerry</p></noscript>"#);
		let noscript = tree.select("noscript").unwrap().unwrap();
		let raw = tree.text(tree.children(noscript)[0]).unwrap();
		assert_eq!(raw, "<p>Tom &amp; Jerry</p>");
		assert_eq!(tree.inner_html(noscript), raw);

		let hydrated = parse(raw);
		let p = hydrated.select("p").unwrap().unwrap();
		assert_eq!(hydrated.text(hydrated.children(p)[0]), Some("Tom & Jerry"));
	}

	#[test]
	fn text_is_kept() {
		let tree = parse("plain <b>bold</b> text");
		assert_eq!(tree.inner_html(tree.root()), "plain <b>bold</b> text");
	}
}
