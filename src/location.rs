//! Where navigations come from.

use crate::listeners::Subscription;
use futures::channel::mpsc::UnboundedSender;
use tracing::trace;

/// Receives fragments to navigate to, one per navigation.
pub type NavigationSink = UnboundedSender<String>;

/// The page's current location.
pub trait Location {
	/// The fragment, `#` included (or empty).
	fn hash(&self) -> String;
	fn host(&self) -> String;
	fn pathname(&self) -> String;

	/// Forwards every future fragment change to `sink` until the returned handle is dropped.
	fn watch_fragment(&mut self, sink: NavigationSink) -> Subscription;
}

/// Host and fragment of an activated link element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
	pub host: String,
	pub hash: String,
}

/// Something that asked for a navigation, usually a DOM event.
pub trait NavigationTrigger {
	/// The event's `type`, e.g. `"click"`.
	fn event_type(&self) -> &str;

	/// The link the event was dispatched to, if it was dispatched to one.
	fn link(&self) -> Option<LinkTarget>;

	fn prevent_default(&self);
}

const WATCHED_EVENTS: &[&str] = &["click"];

/// The fragment to route to for `trigger`.
///
/// Clicks on same-host links are taken over: their default action is prevented and the link's fragment is used.
/// Anything else routes to `location_hash`.
pub fn effective_fragment(trigger: Option<&dyn NavigationTrigger>, location_host: &str, location_hash: String) -> String {
	if let Some(trigger) = trigger.filter(|trigger| WATCHED_EVENTS.contains(&trigger.event_type())) {
		if let Some(link) = trigger.link().filter(|link| link.host == location_host) {
			trace!(hash = %link.hash, "Intercepted same-host link.");
			trigger.prevent_default();
			return link.hash;
		}
	}
	location_hash
}

#[cfg(test)]
mod tests {
	use super::*;
	use core::cell::Cell;

	struct Click {
		event_type: &'static str,
		link: Option<LinkTarget>,
		prevented: Cell<bool>,
	}

	impl NavigationTrigger for Click {
		fn event_type(&self) -> &str {
			self.event_type
		}

		fn link(&self) -> Option<LinkTarget> {
			self.link.clone()
		}

		fn prevent_default(&self) {
			self.prevented.set(true);
		}
	}

	fn click(event_type: &'static str, host: &str, hash: &str) -> Click {
		Click {
			event_type,
			link: Some(LinkTarget {
				host: host.to_owned(),
				hash: hash.to_owned(),
			}),
			prevented: Cell::new(false),
		}
	}

	#[test]
	fn same_host_click_is_intercepted() {
		let trigger = click("click", "example.com", "#/about");
		assert_eq!(effective_fragment(Some(&trigger), "example.com", "#/".to_owned()), "#/about");
		assert!(trigger.prevented.get());
	}

	#[test]
	fn foreign_click_is_left_alone() {
		let trigger = click("click", "elsewhere.org", "#/about");
		assert_eq!(effective_fragment(Some(&trigger), "example.com", "#/".to_owned()), "#/");
		assert!(!trigger.prevented.get());
	}

	#[test]
	fn other_events_and_non_links_use_the_location() {
		let trigger = click("keydown", "example.com", "#/about");
		assert_eq!(effective_fragment(Some(&trigger), "example.com", "#/team".to_owned()), "#/team");
		assert!(!trigger.prevented.get());

		let trigger = Click {
			event_type: "click",
			link: None,
			prevented: Cell::new(false),
		};
		assert_eq!(effective_fragment(Some(&trigger), "example.com", "#/team".to_owned()), "#/team");
		assert_eq!(effective_fragment(None, "example.com", "#/team".to_owned()), "#/team");
	}
}
