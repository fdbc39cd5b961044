//! # Alarm registry - ordered collection of pending requests.
//!
//! Single source of truth for every admitted SCHEDULE, WATCH and CANCEL.
//! The registry itself is a plain data structure; exclusive/shared access is
//! provided by [`SyncCore`](super::sync::SyncCore).
//!
//! ## Ordering
//! Entries are kept totally ordered by `(rank, key, kind)`:
//! ```text
//! [ WATCH t=1 | WATCH t=4 | SCHED id=2 | SCHED id=5 | CANCEL id=5 | SCHED id=9 ]
//!   rank 0, by type         rank 1, by id; a CANCEL sits right after its target
//! ```
//! SCHEDULE entries are therefore ascending by id, and WATCH/CANCEL entries
//! never disturb that order.
//!
//! ## Rules
//! - `insert`, `find_by`, `remove_by` perform at most one linear scan
//! - A SCHEDULE whose id matches an existing SCHEDULE replaces it in place and
//!   records the replaced entry's type as `previous_type`
//! - Entries are never partially linked: every mutation is a single `Vec` operation

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::requests::{MessageId, MessageType, RequestKind};

/// A SCHEDULE entry as held by the registry.
#[derive(Debug, Clone)]
pub(crate) struct Alarm {
    pub id: MessageId,
    pub message_type: MessageType,
    /// Type of the entry this one replaced; equals `message_type` if none.
    pub previous_type: MessageType,
    /// Absolute fire time.
    pub deadline: Instant,
    /// Used to recompute the deadline in periodic mode.
    pub period: Duration,
    pub text: Arc<str>,
    /// Set once the type-changed notice was shown.
    pub change_acknowledged: bool,
}

impl Alarm {
    /// True if the entry changed type by replacement and the notice is still owed.
    pub fn change_pending(&self) -> bool {
        self.previous_type != self.message_type && !self.change_acknowledged
    }
}

/// Payload of a registry entry.
#[derive(Debug, Clone)]
pub(crate) enum EntryBody {
    Schedule(Alarm),
    Watch { message_type: MessageType },
    Cancel { id: MessageId },
}

/// A registry entry: payload plus bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    /// Admission sequence number (monotonic per registry).
    pub seq: u64,
    /// Not yet processed by the dispatcher.
    pub fresh: bool,
    pub body: EntryBody,
}

impl Entry {
    pub fn new(seq: u64, body: EntryBody) -> Self {
        Self {
            seq,
            fresh: true,
            body,
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self.body {
            EntryBody::Schedule(_) => RequestKind::Schedule,
            EntryBody::Watch { .. } => RequestKind::Watch,
            EntryBody::Cancel { .. } => RequestKind::Cancel,
        }
    }

    pub fn message_type(&self) -> Option<MessageType> {
        match &self.body {
            EntryBody::Schedule(a) => Some(a.message_type),
            EntryBody::Watch { message_type } => Some(*message_type),
            EntryBody::Cancel { .. } => None,
        }
    }

    pub fn id(&self) -> Option<MessageId> {
        match &self.body {
            EntryBody::Schedule(a) => Some(a.id),
            EntryBody::Watch { .. } => None,
            EntryBody::Cancel { id } => Some(*id),
        }
    }

    pub fn as_schedule(&self) -> Option<&Alarm> {
        match &self.body {
            EntryBody::Schedule(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_schedule_mut(&mut self) -> Option<&mut Alarm> {
        match &mut self.body {
            EntryBody::Schedule(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_schedule_with_id(&self, id: MessageId) -> bool {
        matches!(&self.body, EntryBody::Schedule(a) if a.id == id)
    }

    pub fn is_schedule_of_type(&self, message_type: MessageType) -> bool {
        matches!(&self.body, EntryBody::Schedule(a) if a.message_type == message_type)
    }

    pub fn is_watch_of_type(&self, message_type: MessageType) -> bool {
        matches!(&self.body, EntryBody::Watch { message_type: t } if *t == message_type)
    }

    pub fn is_cancel_for(&self, id: MessageId) -> bool {
        matches!(&self.body, EntryBody::Cancel { id: c } if *c == id)
    }

    /// Position key of the total order.
    fn order_key(&self) -> (u8, u32, u8) {
        match &self.body {
            EntryBody::Watch { message_type } => (0, *message_type, 0),
            EntryBody::Schedule(a) => (1, a.id, 0),
            EntryBody::Cancel { id } => (1, *id, 1),
        }
    }
}

/// Result of [`AlarmRegistry::insert`].
#[derive(Debug)]
pub(crate) enum Inserted {
    /// A new link was created at `position`.
    Linked { position: usize },
    /// A SCHEDULE with the same id was replaced at `position`.
    Replaced { position: usize, previous: Alarm },
}

/// Ordered collection of pending requests.
#[derive(Debug, Default)]
pub(crate) struct AlarmRegistry {
    entries: Vec<Entry>,
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Links `entry` at its ordered position, or replaces a SCHEDULE with the same id.
    ///
    /// On replacement the new entry inherits the link position and gets
    /// `previous_type` set to the replaced entry's type.
    pub fn insert(&mut self, mut entry: Entry) -> Inserted {
        let key = entry.order_key();
        let replace_id = match &entry.body {
            EntryBody::Schedule(a) => Some(a.id),
            _ => None,
        };

        let is_twin = |e: &Entry| replace_id.is_some_and(|id| e.is_schedule_with_id(id));
        let slot = self
            .entries
            .iter()
            .position(|current| is_twin(current) || current.order_key() > key);

        let outcome = match slot {
            Some(position) if is_twin(&self.entries[position]) => {
                if let (EntryBody::Schedule(new), EntryBody::Schedule(old)) =
                    (&mut entry.body, &self.entries[position].body)
                {
                    new.previous_type = old.message_type;
                }
                let replaced = std::mem::replace(&mut self.entries[position], entry);
                match replaced.body {
                    EntryBody::Schedule(previous) => Inserted::Replaced { position, previous },
                    _ => Inserted::Linked { position },
                }
            }
            Some(position) => {
                self.entries.insert(position, entry);
                Inserted::Linked { position }
            }
            None => {
                self.entries.push(entry);
                Inserted::Linked {
                    position: self.entries.len() - 1,
                }
            }
        };
        debug_assert!(self.is_ordered(), "registry order broken by insert");
        outcome
    }

    /// Returns the first entry matching `pred`.
    pub fn find_by(&self, pred: impl Fn(&Entry) -> bool) -> Option<&Entry> {
        self.entries.iter().find(|e| pred(e))
    }

    /// Returns the first entry matching `pred`, mutably.
    pub fn find_by_mut(&mut self, pred: impl Fn(&Entry) -> bool) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| pred(e))
    }

    /// Unlinks and returns the first entry matching `pred`.
    pub fn remove_by(&mut self, pred: impl Fn(&Entry) -> bool) -> Option<Entry> {
        let position = self.entries.iter().position(pred)?;
        Some(self.entries.remove(position))
    }

    /// Number of SCHEDULE entries of `message_type`.
    pub fn schedule_count(&self, message_type: MessageType) -> usize {
        self.entries
            .iter()
            .filter(|e| e.is_schedule_of_type(message_type))
            .count()
    }

    /// SCHEDULE entry of `message_type` with the earliest deadline (lowest id on ties).
    pub fn nearest_schedule(&self, message_type: MessageType) -> Option<&Alarm> {
        self.entries
            .iter()
            .filter_map(Entry::as_schedule)
            .filter(|a| a.message_type == message_type)
            .min_by_key(|a| a.deadline)
    }

    /// Types that currently have a WATCH entry.
    pub fn watched_types(&self) -> Vec<MessageType> {
        self.entries
            .iter()
            .filter_map(|e| match e.body {
                EntryBody::Watch { message_type } => Some(message_type),
                _ => None,
            })
            .collect()
    }

    /// True if the collection respects its total order.
    pub fn is_ordered(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| w[0].order_key() < w[1].order_key())
    }
}
