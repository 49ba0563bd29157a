//! In-app message model.
//!
//! A [`Message`] is immutable once constructed. Equality and hashing use only
//! the identity-bearing fields (`id`, `queue_id`), so two deliveries of the
//! same queued message compare equal even if their free-form properties
//! differ.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::PageRule;

/// Where a modal message is anchored on screen.
///
/// Unknown values fall back to [`MessagePosition::Center`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessagePosition {
    /// Anchored to the top edge.
    Top,
    /// Centered (default).
    #[default]
    Center,
    /// Anchored to the bottom edge.
    Bottom,
}

impl From<String> for MessagePosition {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            _ => Self::Center,
        }
    }
}

impl From<MessagePosition> for String {
    fn from(value: MessagePosition) -> Self {
        match value {
            MessagePosition::Top => "top",
            MessagePosition::Center => "center",
            MessagePosition::Bottom => "bottom",
        }
        .to_string()
    }
}

/// Gist-specific delivery properties (`properties.gist`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistProperties {
    /// Inline container id. `None` for modal messages.
    #[serde(default, alias = "elementId")]
    pub element_id: Option<String>,
    /// Route predicate. `None` means the message may show on any route.
    ///
    /// Every accepted key (`route_rule`, `routeRule`, `routeRuleApple`) is
    /// read as a [`PageRule`] glob, not a regular expression: a rule such as
    /// `^(.*home.*)$` only matches that literal route.
    #[serde(default, alias = "routeRuleApple", alias = "routeRule")]
    pub route_rule: Option<PageRule>,
    /// Persistent messages log their view on close instead of on display.
    #[serde(default)]
    pub persistent: bool,
    /// Modal anchor.
    #[serde(default)]
    pub position: MessagePosition,
    /// Campaign the message belongs to.
    #[serde(default, alias = "campaignId")]
    pub campaign_id: Option<String>,
}

/// Message properties: the `gist` block plus renderer-specific extras.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageProperties {
    /// Delivery properties consumed by the state machine.
    #[serde(default)]
    pub gist: GistProperties,
    /// Everything else, passed through untouched to renderers.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An in-app message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(alias = "messageId")]
    id: String,
    #[serde(default, alias = "instanceId")]
    instance_id: Option<String>,
    #[serde(default, alias = "queueId")]
    queue_id: Option<String>,
    #[serde(default)]
    priority: Option<i64>,
    #[serde(default)]
    properties: MessageProperties,
}

impl Message {
    /// Create a modal message with no queue id, priority or page rule.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            instance_id: None,
            queue_id: None,
            priority: None,
            properties: MessageProperties::default(),
        }
    }

    /// Set the queue id.
    #[must_use]
    pub fn with_queue_id(mut self, queue_id: impl Into<String>) -> Self {
        self.queue_id = Some(queue_id.into());
        self
    }

    /// Set the instance id.
    #[must_use]
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    /// Set the priority (lower shows first).
    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Route the message to an inline container.
    #[must_use]
    pub fn with_element_id(mut self, element_id: impl Into<String>) -> Self {
        self.properties.gist.element_id = Some(element_id.into());
        self
    }

    /// Restrict the message to routes matching `rule`.
    #[must_use]
    pub fn with_page_rule(mut self, rule: PageRule) -> Self {
        self.properties.gist.route_rule = Some(rule);
        self
    }

    /// Mark the message persistent.
    #[must_use]
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.properties.gist.persistent = persistent;
        self
    }

    /// Set the modal anchor.
    #[must_use]
    pub fn with_position(mut self, position: MessagePosition) -> Self {
        self.properties.gist.position = position;
        self
    }

    /// Message template id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Delivery instance id. `None` if the gateway did not send one.
    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    /// Queue id. `None` for messages that never enter the shown queue.
    pub fn queue_id(&self) -> Option<&str> {
        self.queue_id.as_deref()
    }

    /// Priority, lower is more urgent. `None` sorts after every defined value.
    pub fn priority(&self) -> Option<i64> {
        self.priority
    }

    /// Inline container id. `None` for modal messages.
    pub fn element_id(&self) -> Option<&str> {
        self.properties.gist.element_id.as_deref()
    }

    /// Route predicate. `None` if the message may show anywhere.
    pub fn page_rule(&self) -> Option<&PageRule> {
        self.properties.gist.route_rule.as_ref()
    }

    /// Whether the message is persistent.
    pub fn is_persistent(&self) -> bool {
        self.properties.gist.persistent
    }

    /// Modal anchor.
    pub fn position(&self) -> MessagePosition {
        self.properties.gist.position
    }

    /// Is this an inline (embedded) message?
    pub fn is_inline(&self) -> bool {
        self.element_id().is_some()
    }

    /// True if the message has no page rule or its rule matches `route`.
    ///
    /// A message with a page rule never matches an unknown route.
    pub fn matches_route(&self, route: Option<&str>) -> bool {
        match (self.page_rule(), route) {
            (None, _) => true,
            (Some(rule), Some(route)) => rule.matches(route),
            (Some(_), None) => false,
        }
    }

    /// Full property block.
    pub fn properties(&self) -> &MessageProperties {
        &self.properties
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.queue_id == other.queue_id
    }
}

impl Eq for Message {}

impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.queue_id.hash(state);
    }
}
