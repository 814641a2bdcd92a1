//! Per-agent FIFO mailboxes and the directory that addresses them.
//!
//! A mailbox has many producers (peers, the injection scheduler, initial
//! task delivery) and exactly one consumer (its owning worker). `put` never
//! blocks and never fails; `receive` waits up to a timeout and reports
//! "nothing arrived" as `None` rather than as an error.
//!
//! Counters and the last-dequeue instant are updated under the same lock as
//! the queue, so a snapshot is always self-consistent.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{self, Instant};

use outbreak_contracts::{
    agent::{AgentId, AgentIdentity},
    error::{OutbreakError, OutbreakResult},
    message::Message,
};

#[derive(Debug, Default)]
struct MailboxState {
    queue: VecDeque<Message>,
    enqueued: u64,
    dequeued: u64,
    last_dequeued_at: Option<Instant>,
}

/// Point-in-time view of one mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxSnapshot {
    pub pending: usize,
    pub enqueued: u64,
    pub dequeued: u64,
    pub last_dequeued_at: Option<Instant>,
}

/// Unbounded FIFO queue owned by one agent.
#[derive(Debug)]
pub struct Mailbox {
    owner: AgentId,
    state: Mutex<MailboxState>,
    notify: Notify,
}

impl Mailbox {
    pub fn new(owner: AgentId) -> Self {
        Self {
            owner,
            state: Mutex::new(MailboxState::default()),
            notify: Notify::new(),
        }
    }

    pub fn owner(&self) -> &AgentId {
        &self.owner
    }

    /// Enqueue `message` at the tail and wake the consumer.
    pub fn put(&self, message: Message) {
        {
            let mut state = self.lock();
            state.queue.push_back(message);
            state.enqueued += 1;
        }
        self.notify.notify_one();
    }

    /// Dequeue the head message if there is one.
    pub fn try_receive(&self) -> Option<Message> {
        let mut state = self.lock();
        let message = state.queue.pop_front()?;
        state.dequeued += 1;
        state.last_dequeued_at = Some(Instant::now());
        Some(message)
    }

    /// Dequeue the head message, waiting up to `timeout` for one to arrive.
    pub async fn receive(&self, timeout: Duration) -> Option<Message> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before checking so a concurrent `put` is not missed.
            let notified = self.notify.notified();
            if let Some(message) = self.try_receive() {
                return Some(message);
            }
            if time::timeout_at(deadline, notified).await.is_err() {
                return self.try_receive();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn snapshot(&self) -> MailboxSnapshot {
        let state = self.lock();
        MailboxSnapshot {
            pending: state.queue.len(),
            enqueued: state.enqueued,
            dequeued: state.dequeued,
            last_dequeued_at: state.last_dequeued_at,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MailboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Aggregate view across every mailbox in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectorySnapshot {
    pub total_enqueued: u64,
    pub total_dequeued: u64,
    pub pending: usize,
    pub latest_dequeue: Option<Instant>,
}

impl DirectorySnapshot {
    pub fn all_empty(&self) -> bool {
        self.pending == 0
    }
}

/// Maps agent ids to mailboxes. Cheap to clone; every clone shares the same
/// mailboxes.
#[derive(Debug, Clone, Default)]
pub struct MailboxDirectory {
    mailboxes: Arc<BTreeMap<AgentId, Arc<Mailbox>>>,
}

impl MailboxDirectory {
    /// One mailbox per agent. Duplicate ids are a configuration error.
    pub fn new(agents: &[AgentIdentity]) -> OutbreakResult<Self> {
        let mut mailboxes = BTreeMap::new();
        for agent in agents {
            let mailbox = Arc::new(Mailbox::new(agent.id.clone()));
            if mailboxes.insert(agent.id.clone(), mailbox).is_some() {
                return Err(OutbreakError::ConfigError {
                    reason: format!("duplicate agent id '{}'", agent.id),
                });
            }
        }
        Ok(Self {
            mailboxes: Arc::new(mailboxes),
        })
    }

    pub fn get(&self, id: &AgentId) -> Option<&Arc<Mailbox>> {
        self.mailboxes.get(id)
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.mailboxes.contains_key(id)
    }

    /// Put `message` into its receiver's mailbox.
    pub fn deliver(&self, message: Message) -> OutbreakResult<()> {
        let receiver = message.receiver.clone().ok_or_else(|| OutbreakError::UnknownAgent {
            agent: "<none>".to_string(),
        })?;
        let mailbox = self
            .mailboxes
            .get(&receiver)
            .ok_or_else(|| OutbreakError::UnknownAgent {
                agent: receiver.to_string(),
            })?;
        mailbox.put(message);
        Ok(())
    }

    pub fn snapshot(&self) -> DirectorySnapshot {
        self.mailboxes
            .values()
            .map(|m| m.snapshot())
            .fold(DirectorySnapshot::default(), |mut acc, s| {
                acc.total_enqueued += s.enqueued;
                acc.total_dequeued += s.dequeued;
                acc.pending += s.pending;
                acc.latest_dequeue = acc.latest_dequeue.max(s.last_dequeued_at);
                acc
            })
    }

    pub fn len(&self) -> usize {
        self.mailboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mailboxes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbreak_contracts::{agent::AgentRole, message::MessageRole};

    fn msg(text: &str, to: &str) -> Message {
        Message::new(MessageRole::User, text, 0).to_receiver(AgentId::new(to))
    }

    #[tokio::test]
    async fn test_fifo_order_is_preserved() {
        let mailbox = Mailbox::new(AgentId::new("Bohr"));
        mailbox.put(msg("first", "Bohr"));
        mailbox.put(msg("second", "Bohr"));

        let a = mailbox.receive(Duration::from_millis(10)).await.unwrap();
        let b = mailbox.receive(Duration::from_millis(10)).await.unwrap();
        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_times_out_with_none() {
        let mailbox = Mailbox::new(AgentId::new("Bohr"));
        let before = Instant::now();
        assert!(mailbox.receive(Duration::from_millis(100)).await.is_none());
        assert!(before.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_wakes_on_put() {
        let mailbox = Arc::new(Mailbox::new(AgentId::new("Bohr")));
        let producer = Arc::clone(&mailbox);
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(20)).await;
            producer.put(msg("late", "Bohr"));
        });

        let received = mailbox.receive(Duration::from_secs(5)).await.unwrap();
        assert_eq!(received.content, "late");
    }

    #[tokio::test]
    async fn test_counters_track_put_and_receive() {
        let mailbox = Mailbox::new(AgentId::new("Bohr"));
        mailbox.put(msg("a", "Bohr"));
        mailbox.put(msg("b", "Bohr"));
        mailbox.try_receive().unwrap();

        let snap = mailbox.snapshot();
        assert_eq!(snap.enqueued, 2);
        assert_eq!(snap.dequeued, 1);
        assert_eq!(snap.pending, 1);
        assert!(snap.last_dequeued_at.is_some());
    }

    #[test]
    fn test_directory_rejects_duplicate_ids() {
        let agents = vec![
            AgentIdentity::new("Bohr", AgentRole::Specialist),
            AgentIdentity::new("Bohr", AgentRole::Executor),
        ];
        assert!(matches!(
            MailboxDirectory::new(&agents),
            Err(OutbreakError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_directory_delivery_and_snapshot() {
        let agents = vec![
            AgentIdentity::new("Atlas", AgentRole::Coordinator),
            AgentIdentity::new("Bohr", AgentRole::Specialist),
        ];
        let directory = MailboxDirectory::new(&agents).unwrap();

        directory.deliver(msg("hi", "Bohr")).unwrap();
        directory.deliver(msg("task", "Atlas")).unwrap();
        let err = directory.deliver(msg("lost", "Nobody")).unwrap_err();
        assert!(matches!(err, OutbreakError::UnknownAgent { .. }));

        directory.get(&AgentId::new("Atlas")).unwrap().try_receive().unwrap();

        let snap = directory.snapshot();
        assert_eq!(snap.total_enqueued, 2);
        assert_eq!(snap.total_dequeued, 1);
        assert_eq!(snap.pending, 1);
        assert!(!snap.all_empty());
        assert!(snap.latest_dequeue.is_some());
    }
}
