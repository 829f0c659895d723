// src/core/history.rs
//
// Fixed-capacity history of per-chunk classifications, oldest first.

use std::collections::VecDeque;

use crate::detection::DetectionWindow;

/// Number of classified chunks retained by the detector
pub const HISTORY_CAPACITY: usize = 100;

/// Ring buffer of [`DetectionWindow`]s with explicit eviction.
///
/// Storage is allocated once at construction and never grows.
#[derive(Debug, Clone)]
pub struct WindowHistory {
    windows: VecDeque<DetectionWindow>,
    capacity: usize,
}

impl Default for WindowHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl WindowHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            windows: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a window, returning the evicted oldest entry when full.
    pub fn push(&mut self, window: DetectionWindow) -> Option<DetectionWindow> {
        if self.capacity == 0 {
            return Some(window);
        }
        let evicted = if self.windows.len() >= self.capacity {
            self.windows.pop_front()
        } else {
            None
        };
        self.windows.push_back(window);
        evicted
    }

    /// Iterate in arrival order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &DetectionWindow> + '_ {
        self.windows.iter()
    }

    /// Windows whose timestamp lies within `span` seconds before `now`
    pub fn recent(&self, now: f64, span: f64) -> impl Iterator<Item = &DetectionWindow> + '_ {
        self.windows.iter().filter(move |w| now - w.timestamp <= span)
    }

    pub fn oldest(&self) -> Option<&DetectionWindow> {
        self.windows.front()
    }

    pub fn newest(&self) -> Option<&DetectionWindow> {
        self.windows.back()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.windows.clear();
    }
}
