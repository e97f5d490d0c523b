//! Queue payloads.

/// A tagged message delivered through a component queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Tag matched by `wait` conditions.
    pub tag: String,
    /// Numeric payload.
    pub value: f64,
}

impl Message {
    pub fn new(tag: impl Into<String>, value: f64) -> Self {
        Self {
            tag: tag.into(),
            value,
        }
    }

    /// A message that carries only a tag.
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::new(tag, 0.0)
    }
}

/// Messages pushed into one queue during the same discrete instant.
///
/// A `pop` always yields a whole batch; whatever the consumer does not hand
/// back with `unpop` is consumed.
pub type Batch = Vec<Message>;
