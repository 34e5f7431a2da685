//! Test doubles shared by the unit tests of this crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use apiprobe_domain::{CapturedResponse, TestRequest};

use crate::ports::{Clock, HttpTransport, TransportError};

type Handler = dyn Fn(&TestRequest) -> Result<CapturedResponse, TransportError> + Send + Sync;

/// Transport that answers from a closure and records what it saw.
pub struct MockTransport {
    handler: Box<Handler>,
    delay: Mutex<Option<Box<dyn Fn(&TestRequest) -> Duration + Send + Sync>>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    timeouts: Mutex<Vec<Duration>>,
    urls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn with_handler(
        handler: impl Fn(&TestRequest) -> Result<CapturedResponse, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            timeouts: Mutex::new(Vec::new()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn responding(status: u16, body: &str) -> Self {
        let body = body.to_string();
        Self::with_handler(move |_| {
            Ok(CapturedResponse::text(status, &body, Duration::from_millis(1)))
        })
    }

    pub fn failing(error: TransportError) -> Self {
        Self::with_handler(move |_| Err(error.clone()))
    }

    /// Delays every response by `delay`.
    pub fn delayed(self, delay: Duration) -> Self {
        self.delayed_by(move |_| delay)
    }

    /// Delays each response by a per-request amount.
    pub fn delayed_by(
        self,
        delay: impl Fn(&TestRequest) -> Duration + Send + Sync + 'static,
    ) -> Self {
        *self.delay.lock() = Some(Box::new(delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(
        &self,
        request: &TestRequest,
        timeout: Duration,
    ) -> Result<CapturedResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.timeouts.lock().push(timeout);
        self.urls.lock().push(request.url.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delay.lock().as_ref().map(|d| d(request));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = (self.handler)(request);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Clock reading the system time.
pub struct UtcClock;

impl Clock for UtcClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn utc_clock() -> Arc<dyn Clock> {
    Arc::new(UtcClock)
}
