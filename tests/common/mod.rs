// Shared helpers for acceptance tests
//
// Store and transport wrappers append to one EventLog so tests can assert the
// relative order of store calls and network fetches within a single request.

#![allow(dead_code)]

use async_trait::async_trait;
use scriptcache::storage::{KeyValueStore, MemoryStore, StoreError};
use scriptcache::transport::{FetchError, Transport};
use std::io;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Get(String),
    Set(String),
    Remove(String),
    Fetch(String),
}

#[derive(Debug, Default, Clone)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    /// Events touching `key` or fetching any URL, probe traffic excluded
    pub fn for_key(&self, key: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| match event {
                Event::Get(k) | Event::Set(k) | Event::Remove(k) => k == key,
                Event::Fetch(_) => true,
            })
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::Fetch(_)))
            .count()
    }
}

/// MemoryStore that reports every call to an EventLog
pub struct LoggedStore {
    pub inner: MemoryStore,
    log: EventLog,
}

impl LoggedStore {
    pub fn new(inner: MemoryStore, log: EventLog) -> Self {
        Self { inner, log }
    }
}

impl KeyValueStore for LoggedStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.log.push(Event::Get(key.to_string()));
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.log.push(Event::Set(key.to_string()));
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.log.push(Event::Remove(key.to_string()));
        self.inner.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.keys()
    }
}

/// Transport wrapper that reports fetches to an EventLog
pub struct LoggedTransport<T> {
    inner: T,
    log: EventLog,
}

impl<T> LoggedTransport<T> {
    pub fn new(inner: T, log: EventLog) -> Self {
        Self { inner, log }
    }
}

#[async_trait]
impl<T: Transport> Transport for LoggedTransport<T> {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.log.push(Event::Fetch(url.to_string()));
        self.inner.get_text(url).await
    }
}

/// In-memory log sink for asserting on emitted diagnostics
#[derive(Debug, Default, Clone)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Install a WARN-and-above fmt subscriber for the current thread
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
