//! Mock download client for tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::downloadclient::{
    AddJobRequest, DownloadClient, DownloadClientError, HistoryItem, Job, JobStatus,
};
use crate::gateway::GatewayError;

/// Configurable in-memory download client.
///
/// `add_job` assigns `mock-nzo-N` ids and appends a queued job; tests mutate
/// the queue and history to simulate client-side progress.
pub struct MockDownloadClient {
    id: String,
    remove_completed: bool,
    remove_failed: bool,
    jobs: Mutex<Vec<Job>>,
    history: Mutex<Vec<HistoryItem>>,
    added: Mutex<Vec<AddJobRequest>>,
    cancelled: Mutex<Vec<(String, bool)>>,
    fail_add: AtomicBool,
    fail_queries: AtomicBool,
    next_id: AtomicU32,
}

impl MockDownloadClient {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            remove_completed: false,
            remove_failed: false,
            jobs: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
            added: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            fail_add: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
            next_id: AtomicU32::new(1),
        }
    }

    pub fn with_remove_completed(mut self, remove: bool) -> Self {
        self.remove_completed = remove;
        self
    }

    /// Replace the active queue.
    pub fn set_jobs(&self, jobs: Vec<Job>) {
        *self.jobs.lock().unwrap() = jobs;
    }

    /// Update one job's observed state.
    pub fn set_job_state(&self, external_id: &str, status: JobStatus, progress: f64) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.external_id == external_id) {
            job.status = status;
            job.progress = progress;
        }
    }

    /// Mark a job completed with an output path.
    pub fn complete_job(&self, external_id: &str, output_path: &str) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.external_id == external_id) {
            job.status = JobStatus::Completed;
            job.progress = 100.0;
            job.output_path = Some(output_path.to_string());
        }
    }

    /// Replace the history list.
    pub fn set_history(&self, history: Vec<HistoryItem>) {
        *self.history.lock().unwrap() = history;
    }

    /// Make `add_job` fail.
    pub fn fail_add(&self, fail: bool) {
        self.fail_add.store(fail, Ordering::SeqCst);
    }

    /// Make `get_jobs`/`get_history` fail with a network error.
    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn added_jobs(&self) -> Vec<AddJobRequest> {
        self.added.lock().unwrap().clone()
    }

    pub fn cancelled_jobs(&self) -> Vec<(String, bool)> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadClient for MockDownloadClient {
    fn id(&self) -> &str {
        &self.id
    }

    fn remove_completed(&self) -> bool {
        self.remove_completed
    }

    fn remove_failed(&self) -> bool {
        self.remove_failed
    }

    async fn add_job(&self, request: &AddJobRequest) -> Result<String, DownloadClientError> {
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(DownloadClientError::Rejected(
                "mock rejected job".to_string(),
            ));
        }
        self.added.lock().unwrap().push(request.clone());

        let external_id = format!("mock-nzo-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.jobs.lock().unwrap().push(Job {
            external_id: external_id.clone(),
            title: request.title.clone(),
            progress: 0.0,
            status: JobStatus::Queued,
            size_bytes: 0,
            output_path: None,
        });
        Ok(external_id)
    }

    async fn get_jobs(&self) -> Result<Vec<Job>, DownloadClientError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(DownloadClientError::Gateway(GatewayError::Network(
                "mock connection refused".to_string(),
            )));
        }
        Ok(self.jobs.lock().unwrap().clone())
    }

    async fn get_history(&self, limit: u32) -> Result<Vec<HistoryItem>, DownloadClientError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(DownloadClientError::Gateway(GatewayError::Network(
                "mock connection refused".to_string(),
            )));
        }
        let history = self.history.lock().unwrap();
        Ok(history.iter().take(limit as usize).cloned().collect())
    }

    async fn cancel(
        &self,
        external_id: &str,
        delete_data: bool,
    ) -> Result<(), DownloadClientError> {
        self.cancelled
            .lock()
            .unwrap()
            .push((external_id.to_string(), delete_data));
        self.jobs
            .lock()
            .unwrap()
            .retain(|j| j.external_id != external_id);
        Ok(())
    }
}
