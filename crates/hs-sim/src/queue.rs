//! Per-component message queues with instant batching.

use std::collections::VecDeque;

use hs_model::{Batch, Message};

#[derive(Debug, Clone)]
struct Slot {
    /// Instant the batch was filled in. Batches handed back with `unpop`
    /// carry `None` and never absorb new messages.
    instant: Option<u64>,
    messages: Batch,
}

/// FIFO of message batches.
///
/// Messages pushed during the same discrete instant form one batch and are
/// popped together.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    slots: VecDeque<Slot>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, joining the tail batch if it was filled in the
    /// same instant.
    pub(crate) fn push(&mut self, instant: u64, message: Message) {
        match self.slots.back_mut() {
            Some(slot) if slot.instant == Some(instant) => slot.messages.push(message),
            _ => self.slots.push_back(Slot {
                instant: Some(instant),
                messages: vec![message],
            }),
        }
    }

    /// Remove and return the head batch.
    pub(crate) fn pop(&mut self) -> Option<Batch> {
        self.slots.pop_front().map(|slot| slot.messages)
    }

    /// Put unconsumed messages back at the head.
    pub(crate) fn unpop(&mut self, batch: Batch) {
        if !batch.is_empty() {
            self.slots.push_front(Slot {
                instant: None,
                messages: batch,
            });
        }
    }

    pub fn head(&self) -> Option<&[Message]> {
        self.slots.front().map(|slot| slot.messages.as_slice())
    }

    /// Whether the head batch holds a message with `tag` (any message when
    /// `tag` is `None`).
    pub fn head_matches(&self, tag: Option<&str>) -> bool {
        match (self.head(), tag) {
            (None, _) => false,
            (Some(head), None) => !head.is_empty(),
            (Some(head), Some(tag)) => head.iter().any(|m| m.tag == tag),
        }
    }

    /// Total number of queued messages.
    pub fn len(&self) -> usize {
        self.slots.iter().map(|s| s.messages.len()).sum()
    }

    pub fn batch_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn batches_follow_instants(gaps in prop::collection::vec(0u64..3, 1..40)) {
            let mut q = Queue::new();
            let mut instant = 1;
            let mut instants = Vec::new();
            for (i, gap) in gaps.iter().enumerate() {
                instant += gap;
                instants.push(instant);
                q.push(instant, Message::new("m", i as f64));
            }
            instants.dedup();
            prop_assert_eq!(q.batch_count(), instants.len());
            prop_assert_eq!(q.len(), gaps.len());

            let mut order = Vec::new();
            while let Some(batch) = q.pop() {
                order.extend(batch.iter().map(|m| m.value));
            }
            let expected: Vec<f64> = (0..gaps.len()).map(|i| i as f64).collect();
            prop_assert_eq!(order, expected);
        }
    }

    #[test]
    fn same_instant_pushes_share_a_batch() {
        let mut q = Queue::new();
        q.push(1, Message::new("a", 1.0));
        q.push(1, Message::new("b", 2.0));
        q.push(2, Message::new("c", 3.0));

        assert_eq!(q.batch_count(), 2);
        assert_eq!(q.len(), 3);
        let first = q.pop().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].tag, "b");
        assert_eq!(q.pop().unwrap()[0].tag, "c");
        assert!(q.pop().is_none());
    }

    #[test]
    fn unpop_restores_head_without_merging() {
        let mut q = Queue::new();
        q.push(1, Message::tag("a"));
        q.push(1, Message::tag("b"));
        let mut batch = q.pop().unwrap();
        batch.remove(0);
        q.unpop(batch);
        q.push(1, Message::tag("late"));

        assert_eq!(q.batch_count(), 2);
        assert_eq!(q.head().unwrap().len(), 1);
        assert!(q.head_matches(Some("b")));
        assert!(!q.head_matches(Some("late")));
    }

    #[test]
    fn empty_unpop_is_ignored() {
        let mut q = Queue::new();
        q.unpop(Vec::new());
        assert!(q.is_empty());
        assert!(!q.head_matches(None));
    }
}
