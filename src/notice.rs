//! Transient user notifications (message + severity).
//!
//! Every user-visible failure or confirmation funnels through one queue so
//! the presentation layer has a single place to drain.

use std::collections::VecDeque;
use tracing::{info, warn};

use crate::error::Error;

/// How prominently a notice should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A single transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
}

/// Bounded FIFO of pending notices. Oldest notices are dropped on overflow.
#[derive(Debug)]
pub struct NoticeQueue {
    pending: VecDeque<Notice>,
    capacity: usize,
}

impl NoticeQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Queue a notice and mirror it to the log.
    pub fn push(&mut self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        match severity {
            Severity::Warning | Severity::Error => warn!(severity = severity.as_str(), "{}", message),
            Severity::Info | Severity::Success => info!(severity = severity.as_str(), "{}", message),
        }
        if self.pending.len() >= self.capacity {
            self.pending.pop_front();
        }
        self.pending.push_back(Notice { message, severity });
    }

    /// Queue a notice for an error, unless the error is silent.
    pub fn push_error(&mut self, err: &Error) {
        if err.is_user_visible() {
            self.push(err.to_string(), err.severity());
        }
    }

    /// Take every pending notice in arrival order.
    pub fn drain(&mut self) -> Vec<Notice> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
