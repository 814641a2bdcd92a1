//! Bounded per-agent conversation memory.

use std::collections::VecDeque;

use outbreak_contracts::message::Message;

/// The most recent `capacity` messages an agent has seen or produced.
///
/// Owned by exactly one worker, so no locking.
#[derive(Debug, Clone)]
pub struct AgentMemory {
    capacity: usize,
    messages: VecDeque<Message>,
}

impl AgentMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            messages: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Append a message, evicting the oldest when full.
    pub fn append(&mut self, message: Message) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Put `messages` in front of everything already remembered.
    ///
    /// If the result exceeds capacity the oldest entries are dropped, so a
    /// long preamble loses its head first.
    pub fn prepend(&mut self, messages: Vec<Message>) {
        let mut combined: VecDeque<Message> = messages.into();
        combined.append(&mut self.messages);
        while combined.len() > self.capacity {
            combined.pop_front();
        }
        self.messages = combined;
    }

    /// Copy of the memory, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbreak_contracts::message::MessageRole;

    fn msg(role: MessageRole, content: &str, step: u64) -> Message {
        Message::new(role, content, step)
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut memory = AgentMemory::new(3);
        for i in 0..5 {
            memory.append(msg(MessageRole::User, &format!("m{}", i), i));
        }
        let contents: Vec<_> = memory.snapshot().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_prepend_goes_before_existing() {
        let mut memory = AgentMemory::new(4);
        memory.append(msg(MessageRole::User, "live", 1));
        memory.prepend(vec![msg(MessageRole::User, "v1", 0), msg(MessageRole::Assistant, "v2", 0)]);
        let contents: Vec<_> = memory.snapshot().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["v1", "v2", "live"]);
    }

    #[test]
    fn test_prepend_overflow_drops_oldest() {
        let mut memory = AgentMemory::new(2);
        memory.append(msg(MessageRole::User, "live", 1));
        memory.prepend(vec![msg(MessageRole::User, "v1", 0), msg(MessageRole::Assistant, "v2", 0)]);
        let contents: Vec<_> = memory.snapshot().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["v2", "live"]);
    }
}
