//! Bounded POSIX Message Queue
//!
//! The harness creates the settings queue before any stage process starts,
//! publishes one record per filter unit (blocking when the bounded queue is
//! at capacity), and unlinks the well-known queue names between runs so the
//! next run starts from a clean namespace. A queue that is already absent
//! during unlink is fine; any other failure surfaces.

use nix::errno::Errno;
use nix::mqueue::{mq_close, mq_open, mq_receive, mq_send, mq_unlink, MQ_OFlag, MqAttr, MqdT};
use nix::sys::stat::Mode;
use std::ffi::CString;
use thiserror::Error;

/// Maximum number of outstanding messages on the settings queue
pub const SETTINGS_QUEUE_CAPACITY: i64 = 10;

/// Errors from queue creation, transfer and removal
#[derive(Debug, Error)]
pub enum QueueError {
    /// The name does not satisfy POSIX queue naming rules
    #[error("{name:?} is not a valid queue name: {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// `mq_open` with `O_CREAT` failed
    #[error("failed to create queue {name}: {source}")]
    Create {
        /// Queue name
        name: String,
        /// Underlying errno
        source: Errno,
    },

    /// `mq_send` failed
    #[error("failed to publish to queue {name}: {source}")]
    Send {
        /// Queue name
        name: String,
        /// Underlying errno
        source: Errno,
    },

    /// `mq_receive` failed
    #[error("failed to receive from queue {name}: {source}")]
    Receive {
        /// Queue name
        name: String,
        /// Underlying errno
        source: Errno,
    },

    /// `mq_close` failed
    #[error("failed to close queue {name}: {source}")]
    Close {
        /// Queue name
        name: String,
        /// Underlying errno
        source: Errno,
    },

    /// `mq_unlink` failed for a reason other than absence
    #[error("failed to remove queue {name}: {source}")]
    Unlink {
        /// Queue name
        name: String,
        /// Underlying errno
        source: Errno,
    },
}

fn queue_name_cstr(name: &str) -> Result<CString, QueueError> {
    if !name.starts_with('/') || name.len() < 2 || name[1..].contains('/') {
        return Err(QueueError::InvalidName {
            name: name.to_string(),
            reason: "must be \"/name\" with no further slashes".to_string(),
        });
    }
    CString::new(name).map_err(|_| QueueError::InvalidName {
        name: name.to_string(),
        reason: "contains a NUL byte".to_string(),
    })
}

/// An open bounded message queue created by the harness.
///
/// The descriptor is closed on drop; the queue object itself stays in the
/// system namespace until [`unlink_queue`] removes it.
pub struct SettingsQueue {
    mqd: Option<MqdT>,
    name: String,
    msg_size: usize,
}

impl SettingsQueue {
    /// Create the queue with the given bounds and open it read-write.
    ///
    /// Opening an existing queue of the same name succeeds and keeps that
    /// queue's attributes.
    pub fn create(name: &str, capacity: i64, msg_size: usize) -> Result<Self, QueueError> {
        let cname = queue_name_cstr(name)?;
        let attr = MqAttr::new(0, capacity as _, msg_size as _, 0);
        let mqd = mq_open(
            cname.as_c_str(),
            MQ_OFlag::O_CREAT | MQ_OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
            Some(&attr),
        )
        .map_err(|e| QueueError::Create {
            name: name.to_string(),
            source: e,
        })?;
        Ok(Self {
            mqd: Some(mqd),
            name: name.to_string(),
            msg_size,
        })
    }

    /// Queue name, e.g. `/settings`.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self) -> &MqdT {
        // Some for the whole lifetime of a live queue; only close() and
        // drop take the descriptor, and both consume the value.
        self.mqd.as_ref().expect("queue descriptor already closed")
    }

    /// Publish one message, blocking while the queue is at capacity.
    pub fn send(&self, payload: &[u8]) -> Result<(), QueueError> {
        mq_send(self.handle(), payload, 0).map_err(|e| QueueError::Send {
            name: self.name.clone(),
            source: e,
        })
    }

    /// Receive one message, blocking while the queue is empty.
    pub fn recv(&self) -> Result<Vec<u8>, QueueError> {
        let mut buf = vec![0u8; self.msg_size];
        let mut priority = 0u32;
        let received = mq_receive(self.handle(), &mut buf, &mut priority).map_err(|e| {
            QueueError::Receive {
                name: self.name.clone(),
                source: e,
            }
        })?;
        buf.truncate(received);
        Ok(buf)
    }

    /// Close the descriptor. The queue object stays until unlinked.
    pub fn close(mut self) -> Result<(), QueueError> {
        match self.mqd.take() {
            Some(mqd) => mq_close(mqd).map_err(|e| QueueError::Close {
                name: self.name.clone(),
                source: e,
            }),
            None => Ok(()),
        }
    }
}

impl Drop for SettingsQueue {
    fn drop(&mut self) {
        if let Some(mqd) = self.mqd.take() {
            let _ = mq_close(mqd);
        }
    }
}

/// Remove a named queue object. Returns whether it existed.
pub fn unlink_queue(name: &str) -> Result<bool, QueueError> {
    let cname = queue_name_cstr(name)?;
    match mq_unlink(cname.as_c_str()) {
        Ok(()) => Ok(true),
        Err(Errno::ENOENT) => Ok(false),
        Err(e) => Err(QueueError::Unlink {
            name: name.to_string(),
            source: e,
        }),
    }
}
