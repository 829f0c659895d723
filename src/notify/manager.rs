// src/notify/manager.rs
//
// Fan-out to every configured notifier, plus a background dispatcher so
// the detection loop never waits on the network.

use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

use super::{Notifier, NtfyNotifier};
use crate::config::NotificationsConfig;
use crate::detection::DetectionEvent;

#[derive(Default)]
pub struct NotificationManager {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotificationManager {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    /// Build the notifiers named in the configuration
    pub fn from_config(config: &NotificationsConfig) -> Result<Self> {
        let mut manager = Self::default();
        if config.ntfy.enabled {
            manager.add(Box::new(NtfyNotifier::new(&config.ntfy)?));
            log::info!("Added ntfy notifier for topic {}", config.ntfy.topic);
        }
        Ok(manager)
    }

    pub fn add(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    /// Send to every enabled notifier concurrently; name → delivered
    pub fn notify_all(&self, event: &DetectionEvent, is_test: bool) -> BTreeMap<String, bool> {
        let enabled: Vec<&dyn Notifier> = self
            .notifiers
            .iter()
            .map(|n| n.as_ref())
            .filter(|n| n.is_enabled())
            .collect();

        if enabled.is_empty() {
            log::warn!("No enabled notifiers configured");
            return BTreeMap::new();
        }

        let results: BTreeMap<String, bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = enabled
                .iter()
                .map(|notifier| {
                    let handle = scope.spawn(move || notifier.notify_with_retry(event, is_test));
                    (notifier.name().to_string(), handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(name, handle)| {
                    let delivered = handle.join().unwrap_or_else(|_| {
                        log::error!("Notifier {} panicked", name);
                        false
                    });
                    (name, delivered)
                })
                .collect()
        });

        let successful = results.values().filter(|&&ok| ok).count();
        log::info!("Notification summary: {}/{} successful", successful, results.len());
        results
    }
}

/// Delivers events on a worker thread.
///
/// Dropping the dispatcher (or calling [`Dispatcher::shutdown`]) closes the
/// queue and waits for pending deliveries to finish.
pub struct Dispatcher {
    sender: Option<Sender<DetectionEvent>>,
    worker: Option<JoinHandle<usize>>,
}

impl Dispatcher {
    pub fn spawn(manager: NotificationManager) -> Self {
        let (sender, receiver) = mpsc::channel::<DetectionEvent>();
        let worker = std::thread::spawn(move || {
            let mut delivered = 0;
            for event in receiver {
                let results = manager.notify_all(&event, event.is_test());
                if results.values().any(|&ok| ok) {
                    delivered += 1;
                }
            }
            delivered
        });

        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Queue an event; returns immediately
    pub fn dispatch(&self, event: DetectionEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                log::error!("Notification worker stopped; event dropped");
            }
        }
    }

    /// Close the queue and wait; returns how many events reached at
    /// least one notifier.
    pub fn shutdown(mut self) -> usize {
        self.finish()
    }

    fn finish(&mut self) -> usize {
        self.sender.take();
        self.worker
            .take()
            .and_then(|worker| worker.join().ok())
            .unwrap_or(0)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.finish();
    }
}
