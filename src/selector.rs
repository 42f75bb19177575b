//! The small subset of CSS selectors that configuration uses to address regions of a [`Tree`].
//!
//! Supported: `*`, type selectors, `#id`, `.class`, `[attr]`, `[attr=value]` (value optionally quoted),
//! compounds of those, descendant (whitespace) and child (`>`) combinators and comma-separated groups.

use crate::tree::{NodeId, Tree};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid selector {selector:?}: {reason}")]
pub struct SelectorError {
	pub selector: String,
	pub reason: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
	Descendant,
	Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeSelector {
	name: String,
	value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
	tag: Option<String>,
	id: Option<String>,
	classes: Vec<String>,
	attributes: Vec<AttributeSelector>,
}

/// `compounds[i]` and `compounds[i + 1]` are joined by `combinators[i]`. The last compound is the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
	compounds: Vec<Compound>,
	combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
	source: String,
	groups: Vec<Complex>,
}

impl Selector {
	/// # Errors
	///
	/// Iff `selector` is empty or uses syntax outside the supported subset.
	pub fn parse(selector: &str) -> Result<Self, SelectorError> {
		let error = |reason| SelectorError {
			selector: selector.to_owned(),
			reason,
		};

		let mut groups = Vec::new();
		for group in split_outside_brackets(selector, ',') {
			groups.push(parse_complex(group).map_err(error)?);
		}
		if groups.is_empty() {
			return Err(error("empty selector"));
		}

		Ok(Self {
			source: selector.to_owned(),
			groups,
		})
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.source
	}

	#[must_use]
	pub fn matches(&self, tree: &Tree, node: NodeId) -> bool {
		self.groups.iter().any(|complex| complex.matches(tree, node))
	}
}

impl Compound {
	fn matches(&self, tree: &Tree, node: NodeId) -> bool {
		let Some(tag) = tree.tag(node) else {
			return false;
		};
		if let Some(expected) = &self.tag {
			if !expected.eq_ignore_ascii_case(tag) {
				return false;
			}
		}
		if let Some(id) = &self.id {
			if tree.attribute(node, "id") != Some(id.as_str()) {
				return false;
			}
		}
		if !self.classes.is_empty() {
			let class_list = tree.attribute(node, "class").unwrap_or("");
			if !self.classes.iter().all(|class| class_list.split_ascii_whitespace().any(|c| c == class)) {
				return false;
			}
		}
		self.attributes.iter().all(|attribute| match (tree.attribute(node, &attribute.name), &attribute.value) {
			(None, _) => false,
			(Some(_), None) => true,
			(Some(actual), Some(expected)) => actual == expected,
		})
	}
}

impl Complex {
	fn matches(&self, tree: &Tree, node: NodeId) -> bool {
		let last = self.compounds.len() - 1;
		self.compounds[last].matches(tree, node) && self.matches_left_of(last, tree, node)
	}

	fn matches_left_of(&self, index: usize, tree: &Tree, node: NodeId) -> bool {
		if index == 0 {
			return true;
		}
		let left = &self.compounds[index - 1];
		match self.combinators[index - 1] {
			Combinator::Child => tree.parent(node).map_or(false, |parent| left.matches(tree, parent) && self.matches_left_of(index - 1, tree, parent)),
			Combinator::Descendant => {
				let mut ancestor = tree.parent(node);
				while let Some(candidate) = ancestor {
					if left.matches(tree, candidate) && self.matches_left_of(index - 1, tree, candidate) {
						return true;
					}
					ancestor = tree.parent(candidate);
				}
				false
			}
		}
	}
}

fn split_outside_brackets(input: &str, separator: char) -> Vec<&str> {
	let mut parts = Vec::new();
	let mut depth = 0_usize;
	let mut quote = None;
	let mut start = 0;
	for (i, c) in input.char_indices() {
		match (quote, c) {
			(Some(q), c) if c == q => quote = None,
			(Some(_), _) => (),
			(None, '"' | '\'') => quote = Some(c),
			(None, '[') => depth += 1,
			(None, ']') => depth = depth.saturating_sub(1),
			(None, c) if c == separator && depth == 0 => {
				parts.push(input[start..i].trim());
				start = i + c.len_utf8();
			}
			_ => (),
		}
	}
	parts.push(input[start..].trim());
	parts.retain(|part| !part.is_empty());
	parts
}

fn parse_complex(input: &str) -> Result<Complex, &'static str> {
	let mut compounds = Vec::new();
	let mut combinators = Vec::new();
	let mut pending = None;

	// `>` may be written without surrounding whitespace.
	let spaced = input.replace('>', " > ");
	for token in split_outside_brackets(&spaced, ' ') {
		if token == ">" {
			if compounds.is_empty() || pending.is_some() {
				return Err("misplaced `>`");
			}
			pending = Some(Combinator::Child);
			continue;
		}
		if !compounds.is_empty() {
			combinators.push(pending.take().unwrap_or(Combinator::Descendant));
		}
		compounds.push(parse_compound(token)?);
	}

	if compounds.is_empty() {
		return Err("empty selector");
	}
	if pending.is_some() {
		return Err("dangling `>`");
	}
	Ok(Complex { compounds, combinators })
}

fn is_ident_char(c: char) -> bool {
	c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn take_ident<'a>(input: &'a str) -> (&'a str, &'a str) {
	let end = input.find(|c| !is_ident_char(c)).unwrap_or(input.len());
	input.split_at(end)
}

fn parse_compound(mut input: &str) -> Result<Compound, &'static str> {
	let mut compound = Compound::default();

	if let Some(rest) = input.strip_prefix('*') {
		input = rest;
	} else {
		let (tag, rest) = take_ident(input);
		if !tag.is_empty() {
			compound.tag = Some(tag.to_owned());
		}
		input = rest;
	}

	while let Some(c) = input.chars().next() {
		input = &input[c.len_utf8()..];
		match c {
			'#' | '.' => {
				let (name, rest) = take_ident(input);
				if name.is_empty() {
					return Err("expected a name after `#` or `.`");
				}
				if c == '#' {
					compound.id = Some(name.to_owned());
				} else {
					compound.classes.push(name.to_owned());
				}
				input = rest;
			}
			'[' => {
				let end = input.find(']').ok_or("unclosed `[`")?;
				let (body, rest) = (&input[..end], &input[end + 1..]);
				let attribute = match body.split_once('=') {
					None => AttributeSelector {
						name: body.trim().to_owned(),
						value: None,
					},
					Some((name, value)) => {
						let value = value.trim();
						let value = value
							.strip_prefix('"')
							.and_then(|v| v.strip_suffix('"'))
							.or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
							.unwrap_or(value);
						AttributeSelector {
							name: name.trim().to_owned(),
							value: Some(value.to_owned()),
						}
					}
				};
				if attribute.name.is_empty() || !attribute.name.chars().all(is_ident_char) {
					return Err("invalid attribute name");
				}
				compound.attributes.push(attribute);
				input = rest;
			}
			_ => return Err("unsupported selector syntax"),
		}
	}

	Ok(compound)
}
