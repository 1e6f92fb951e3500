//! Rule-group configuration snapshot.
//!
//! A single-slot mailbox holding the latest refresh outcome. The refresher
//! owns the only `GroupsPublisher`; request handlers hold `GroupsSnapshot`
//! clones and read without waiting for the writer.

use std::sync::Arc;

use tokio::sync::watch;

use super::RefreshError;
use crate::models::RuleGroup;

#[derive(Debug, Clone)]
enum Slot {
    /// No refresh has completed yet.
    Empty,
    Published(Arc<Vec<RuleGroup>>),
    Failed(RefreshError),
}

/// Write side of the mailbox. Not `Clone`: there is one writer.
pub struct GroupsPublisher {
    tx: watch::Sender<Slot>,
}

/// Read side of the mailbox.
#[derive(Clone)]
pub struct GroupsSnapshot {
    rx: watch::Receiver<Slot>,
}

pub fn groups_channel() -> (GroupsPublisher, GroupsSnapshot) {
    let (tx, rx) = watch::channel(Slot::Empty);
    (GroupsPublisher { tx }, GroupsSnapshot { rx })
}

impl GroupsPublisher {
    /// Replace the slot with a freshly fetched configuration.
    pub fn publish(&self, groups: Vec<RuleGroup>) {
        self.tx.send_replace(Slot::Published(Arc::new(groups)));
    }

    /// Replace the slot with the error of a failed refresh.
    pub fn publish_error(&self, err: RefreshError) {
        self.tx.send_replace(Slot::Failed(err));
    }

    pub fn subscribe(&self) -> GroupsSnapshot {
        GroupsSnapshot {
            rx: self.tx.subscribe(),
        }
    }
}

impl GroupsSnapshot {
    /// Latest published configuration.
    ///
    /// Returns the stored error if the last refresh failed and an empty
    /// list if nothing has been published yet. Never waits.
    pub fn latest(&self) -> Result<Vec<RuleGroup>, RefreshError> {
        match &*self.rx.borrow() {
            Slot::Empty => Ok(Vec::new()),
            Slot::Published(groups) => Ok(groups.as_ref().clone()),
            Slot::Failed(err) => Err(err.clone()),
        }
    }
}
