//! Test doubles and common utilities for controller contract tests
//!
//! This module provides minimal test doubles that record how the controller
//! drives them without implementing real functionality.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zonepop_core::controller::{NamedProvider, NamedSource};
use zonepop_core::error::{Error, Result};
use zonepop_core::traits::{EndpointSource, Provider};
use zonepop_core::Endpoint;

/// A source returning a fixed list, or failing, and counting calls
pub struct MockSource {
    endpoints: Vec<Endpoint>,
    failure: Option<String>,
    partial: bool,
    call_count: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints,
            failure: None,
            partial: false,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source that always fails with the given message
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// A source that fails but still hands back its endpoints
    pub fn failing_with_partial(message: &str, endpoints: Vec<Endpoint>) -> Self {
        Self {
            failure: Some(message.to_string()),
            partial: true,
            ..Self::new(endpoints)
        }
    }

    /// Get the number of times endpoints() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Create a new MockSource that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            endpoints: other.endpoints.clone(),
            failure: other.failure.clone(),
            partial: other.partial,
            call_count: Arc::clone(&other.call_count),
        }
    }

    pub fn named(self, name: &str) -> NamedSource {
        NamedSource::new(name, Box::new(self))
    }
}

#[async_trait::async_trait]
impl EndpointSource for MockSource {
    async fn endpoints(&self) -> Result<Vec<Endpoint>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            None => Ok(self.endpoints.clone()),
            Some(message) if self.partial => Err(Error::partial(
                self.endpoints.clone(),
                Error::Other(message.clone()),
            )),
            Some(message) => Err(Error::Other(message.clone())),
        }
    }
}

/// A provider recording every endpoint set it receives
pub struct MockProvider {
    failure: Option<String>,
    call_count: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Vec<Endpoint>>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            failure: None,
            call_count: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A provider that always fails with the given message
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Get the number of times update_endpoints() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Endpoint sets received, one entry per call
    pub fn received(&self) -> Vec<Vec<Endpoint>> {
        self.received.lock().unwrap().clone()
    }

    /// Create a new MockProvider that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            failure: other.failure.clone(),
            call_count: Arc::clone(&other.call_count),
            received: Arc::clone(&other.received),
        }
    }

    pub fn named(self, name: &str) -> NamedProvider {
        NamedProvider::new(name, Box::new(self))
    }
}

#[async_trait::async_trait]
impl Provider for MockProvider {
    async fn update_endpoints(&self, endpoints: &[Endpoint]) -> Result<()> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(endpoints.to_vec());
        match &self.failure {
            None => Ok(()),
            Some(message) => Err(Error::Other(message.clone())),
        }
    }
}

/// Endpoint with one IPv4 address
pub fn endpoint(hostname: &str, ipv4: &str) -> Endpoint {
    Endpoint::new(hostname).with_ipv4(ipv4).with_ttl(60)
}
