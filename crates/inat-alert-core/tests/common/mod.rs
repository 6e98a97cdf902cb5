//! Test doubles and common utilities for contract tests
//!
//! Each double records how it was called so tests can assert on side
//! effects without touching the network.

#![allow(dead_code)]

use inat_alert_core::traits::{CheckScheduler, CountSource, DailyTime, FilterSet, JobHandle, NotificationTransport};
use inat_alert_core::{
    ControlSurface, CountChecker, EmailErrorCategory, Error, Notifier, ParameterStore, Result,
    SubscriptionState,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use uuid::Uuid;

pub const UNSUBSCRIBE_URL: &str = "http://localhost:5000/unsubscribe";

/// Scripted reply of the count API
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// 2xx with `total_results`
    Total(u64),
    /// Network error or non-2xx status
    TransportFailure,
    /// 2xx without `total_results`
    MissingField,
}

/// A CountSource that answers from a script
///
/// When the script runs out, the last reply repeats.
pub struct ScriptedCountSource {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Reply>,
    queries: Mutex<Vec<FilterSet>>,
    call_count: AtomicUsize,
}

impl ScriptedCountSource {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(Reply::TransportFailure),
            queries: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Append replies to the script
    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Number of queries made
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Filters of every query made
    pub fn queries(&self) -> Vec<FilterSet> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CountSource for ScriptedCountSource {
    async fn total_results(&self, filters: &FilterSet) -> Result<u64> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(filters.clone());

        let reply = {
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.replies.lock().unwrap().pop_front() {
                *last = next;
            }
            *last
        };

        match reply {
            Reply::Total(total) => Ok(total),
            Reply::TransportFailure => Err(Error::transport("HTTP error: 503 Service Unavailable")),
            Reply::MissingField => Err(Error::format("missing total_results")),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A CountSource with a fixed total per taxon
///
/// Queries for the gated taxon block until [`GatedCountSource::release`] is
/// called, which lets a test hold a check mid-flight.
pub struct GatedCountSource {
    totals: HashMap<String, u64>,
    gated_taxon: String,
    entered: Notify,
    gate: Semaphore,
}

impl GatedCountSource {
    pub fn new(totals: &[(&str, u64)], gated_taxon: &str) -> Self {
        Self {
            totals: totals
                .iter()
                .map(|(taxon, total)| (taxon.to_string(), *total))
                .collect(),
            gated_taxon: gated_taxon.to_string(),
            entered: Notify::new(),
            gate: Semaphore::new(0),
        }
    }

    /// Wait until a query for the gated taxon is blocked
    pub async fn wait_until_blocked(&self) {
        self.entered.notified().await;
    }

    /// Let one blocked query through
    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait::async_trait]
impl CountSource for GatedCountSource {
    async fn total_results(&self, filters: &FilterSet) -> Result<u64> {
        if filters.taxon_name == self.gated_taxon {
            self.entered.notify_one();
            self.gate
                .acquire()
                .await
                .expect("gate is never closed")
                .forget();
        }

        self.totals
            .get(&filters.taxon_name)
            .copied()
            .ok_or_else(|| Error::transport(format!("no total for '{}'", filters.taxon_name)))
    }

    fn source_name(&self) -> &'static str {
        "gated"
    }
}

/// A NotificationTransport that records every delivered body
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    failure: Mutex<Option<EmailErrorCategory>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery fail with `category`
    pub fn fail_with(&self, category: EmailErrorCategory) {
        *self.failure.lock().unwrap() = Some(category);
    }

    /// Bodies passed to deliver(), including failed attempts
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl NotificationTransport for RecordingTransport {
    async fn deliver(&self, html_body: &str) -> Result<()> {
        self.sent.lock().unwrap().push(html_body.to_string());
        match *self.failure.lock().unwrap() {
            Some(category) => Err(Error::email(category, "simulated failure")),
            None => Ok(()),
        }
    }

    fn transport_name(&self) -> &'static str {
        "recording"
    }
}

/// Scheduler call, as seen by RecordingScheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerCall {
    ArmInterval(Duration),
    ArmCron(DailyTime),
    Disarm(JobHandle),
    RearmCron,
}

/// A CheckScheduler that never fires, only records
#[derive(Default)]
pub struct RecordingScheduler {
    calls: Mutex<Vec<SchedulerCall>>,
    armed: Mutex<Option<JobHandle>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SchedulerCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Currently armed job
    pub fn armed(&self) -> Option<JobHandle> {
        *self.armed.lock().unwrap()
    }

    fn arm(&self) -> JobHandle {
        let handle = JobHandle::new(Uuid::new_v4());
        *self.armed.lock().unwrap() = Some(handle);
        handle
    }
}

#[async_trait::async_trait]
impl CheckScheduler for RecordingScheduler {
    async fn arm_interval(&self, period: Duration) -> Result<JobHandle> {
        self.calls.lock().unwrap().push(SchedulerCall::ArmInterval(period));
        Ok(self.arm())
    }

    async fn arm_cron(&self, at: DailyTime) -> Result<JobHandle> {
        self.calls.lock().unwrap().push(SchedulerCall::ArmCron(at));
        Ok(self.arm())
    }

    async fn disarm(&self, handle: JobHandle) -> Result<()> {
        self.calls.lock().unwrap().push(SchedulerCall::Disarm(handle));
        let mut armed = self.armed.lock().unwrap();
        if *armed == Some(handle) {
            *armed = None;
        }
        Ok(())
    }

    async fn rearm_cron(&self) -> Result<JobHandle> {
        self.calls.lock().unwrap().push(SchedulerCall::RearmCron);
        Ok(self.arm())
    }
}

/// Fully wired core with test doubles
pub struct Harness {
    pub store: ParameterStore,
    pub source: Arc<ScriptedCountSource>,
    pub transport: Arc<RecordingTransport>,
    pub scheduler: Arc<RecordingScheduler>,
    pub checker: Arc<CountChecker>,
    pub control: ControlSurface,
}

impl Harness {
    /// Build a subscribed harness, as the daemon does at startup
    pub async fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        let source = Arc::new(ScriptedCountSource::new(replies));
        let transport = Arc::new(RecordingTransport::new());
        let scheduler = Arc::new(RecordingScheduler::new());

        let startup_job = scheduler
            .arm_interval(Duration::from_secs(15))
            .await
            .expect("recording scheduler never fails");
        let store = ParameterStore::new(SubscriptionState::Subscribed(startup_job));

        let notifier = Notifier::new(transport.clone(), UNSUBSCRIBE_URL);
        let checker = Arc::new(CountChecker::new(source.clone(), notifier, store.clone()));
        let control = ControlSurface::new(store.clone(), checker.clone(), scheduler.clone());

        Self {
            store,
            source,
            transport,
            scheduler,
            checker,
            control,
        }
    }
}

/// Filters used by most scenarios
pub fn monarch() -> FilterSet {
    FilterSet::new(true, true, true, "Danaus plexippus")
}

/// Update body matching [`monarch`]
pub fn monarch_body() -> serde_json::Value {
    serde_json::json!({
        "acc": true,
        "identified": true,
        "photos": true,
        "taxon_name": "Danaus plexippus"
    })
}
