#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use faultline::{
    ErrorRecord, Fields, Report, Reporter,
    transport::{HttpClient, HttpRequest, HttpResponse},
};

#[derive(Debug, thiserror::Error)]
#[error("{0} is unavailable")]
pub struct Unavailable(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

/// Shared, ordered log of `<name>:start` / `<name>:end` entries.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::default()
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

pub struct RecordingReporter {
    name: String,
    behavior: Behavior,
    setter_behavior: Behavior,
    delay: Duration,
    journal: Journal,
    reports: Mutex<Vec<(String, Fields)>>,
    setter_calls: Mutex<Vec<String>>,
    disposed: AtomicUsize,
}

impl RecordingReporter {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_owned(),
            behavior: Behavior::Succeed,
            setter_behavior: Behavior::Succeed,
            delay: Duration::ZERO,
            journal: Arc::clone(journal),
            reports: Mutex::default(),
            setter_calls: Mutex::default(),
            disposed: AtomicUsize::new(0),
        }
    }

    pub fn behaving(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn setters_behaving(mut self, behavior: Behavior) -> Self {
        self.setter_behavior = behavior;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    pub fn reports(&self) -> Vec<(String, Fields)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn setter_calls(&self) -> Vec<String> {
        self.setter_calls.lock().unwrap().clone()
    }

    pub fn dispose_count(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    fn log(&self, event: &str) {
        let entry = format!("{}:{event}", self.name);
        self.journal.lock().unwrap().push(entry);
    }

    fn setter(&self, call: String) -> Result<(), Report> {
        self.setter_calls.lock().unwrap().push(call);
        match self.setter_behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(Unavailable(self.name.clone()).into()),
            Behavior::Panic => panic!("{} setter exploded", self.name),
        }
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn report_with_context(
        &self,
        record: &ErrorRecord,
        extra: &Fields,
    ) -> Result<(), Report> {
        self.log("start");
        let report = (record.message(), extra.clone());
        self.reports.lock().unwrap().push(report);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.log("end");

        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(Unavailable(self.name.clone()).into()),
            Behavior::Panic => panic!("{} exploded", self.name),
        }
    }

    fn identify_user(&self, id: &str) -> Result<(), Report> {
        self.setter(format!("identify_user:{id}"))
    }

    fn set_user_properties(&self, properties: &Fields) -> Result<(), Report> {
        self.setter(format!("set_user_properties:{}", properties.len()))
    }

    fn clear_user(&self) -> Result<(), Report> {
        self.setter("clear_user".to_owned())
    }

    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Answers each request with the next scripted status, then with 200.
pub struct ScriptedClient {
    statuses: Mutex<VecDeque<u16>>,
    requests: Mutex<Vec<HttpRequest>>,
    closed: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(statuses: impl IntoIterator<Item = u16>) -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            requests: Mutex::default(),
            closed: AtomicUsize::new(0),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Report> {
        self.requests.lock().unwrap().push(request.clone());
        let status = self.statuses.lock().unwrap().pop_front().unwrap_or(200);
        Ok(HttpResponse { status })
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn fields(pairs: &[(&str, serde_json::Value)]) -> Fields {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), value.clone()))
        .collect()
}

pub fn record() -> ErrorRecord {
    ErrorRecord::from_message(
        "profile view failed to build",
        "#0 build_profile\n#1 build_app",
    )
}
