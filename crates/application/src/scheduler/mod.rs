//! Task scheduler.
//!
//! Accepts single-case and whole-suite execution requests, queues them
//! (optionally by priority and start time) and dispatches them to a fixed
//! number of workers. Task state lives in an arena keyed by task id; worker
//! handles live in a separate map under the same key.

mod queue;

pub use queue::{QueuedTask, TaskQueue};

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use apiprobe_domain::{
    parse_id, QueueStatus, Task, TaskOutcome, TaskPayload, TaskPriority, TaskScheduleConfig,
    TaskStatus, TaskStatusInfo, TestCase, TestSuite,
};

use crate::error::{SchedulerError, SchedulerResult};
use crate::ports::Clock;
use crate::runner::{AbortOnDrop, TestRunner};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle callback, invoked with a snapshot of the task.
pub type TaskCallback = Arc<dyn Fn(&Task) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    on_start: Vec<TaskCallback>,
    on_complete: Vec<TaskCallback>,
    on_error: Vec<TaskCallback>,
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Start,
    Complete,
    Error,
}

impl Event {
    const fn name(self) -> &'static str {
        match self {
            Self::Start => "on_task_start",
            Self::Complete => "on_task_complete",
            Self::Error => "on_task_error",
        }
    }
}

struct Inner {
    runner: TestRunner,
    clock: Arc<dyn Clock>,
    config: TaskScheduleConfig,
    tasks: Mutex<HashMap<String, Task>>,
    handles: Mutex<HashMap<String, JoinHandle<()>>>,
    queue: TaskQueue,
    callbacks: RwLock<Callbacks>,
    workers: Arc<Semaphore>,
}

/// Schedules and executes test tasks.
pub struct TaskScheduler {
    inner: Arc<Inner>,
    shutdown: watch::Sender<bool>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("config", &self.inner.config)
            .field("queue_size", &self.inner.queue.len())
            .finish_non_exhaustive()
    }
}

impl TaskScheduler {
    /// Creates a stopped scheduler.
    ///
    /// A `worker_threads` of 0 is treated as 1.
    #[must_use]
    pub fn new(runner: TestRunner, config: TaskScheduleConfig, clock: Arc<dyn Clock>) -> Self {
        let workers = config.worker_threads.max(1);
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                runner,
                clock,
                queue: TaskQueue::new(config.max_queue_size, config.enable_priority),
                config,
                tasks: Mutex::new(HashMap::new()),
                handles: Mutex::new(HashMap::new()),
                callbacks: RwLock::new(Callbacks::default()),
                workers: Arc::new(Semaphore::new(workers)),
            }),
            shutdown,
            dispatcher: Mutex::new(None),
        }
    }

    /// Starts the dispatch loop. Calling it while running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NoRuntime`] outside a Tokio runtime.
    pub fn start(&self) -> SchedulerResult<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let mut dispatcher = self.dispatcher.lock();
        if dispatcher.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Task scheduler already running");
            return Ok(());
        }

        self.shutdown.send_replace(false);
        let shutdown = self.shutdown.subscribe();
        let inner = Arc::clone(&self.inner);
        *dispatcher = Some(runtime.spawn(dispatch_loop(inner, shutdown)));
        info!(
            workers = self.inner.config.worker_threads.max(1),
            max_queue_size = self.inner.config.max_queue_size,
            enable_priority = self.inner.config.enable_priority,
            "Task scheduler started"
        );
        Ok(())
    }

    /// Stops the dispatch loop and waits for in-flight tasks to finish.
    ///
    /// Queued tasks stay pending and run after the next [`start`](Self::start).
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);
        let dispatcher = self.dispatcher.lock().take();
        if let Some(handle) = dispatcher {
            match tokio::time::timeout(STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Dispatcher ended abnormally"),
                Err(_) => warn!("Dispatcher did not stop in time"),
            }
        }

        let in_flight: Vec<_> = self.inner.handles.lock().drain().collect();
        for (task_id, handle) in in_flight {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(task_id, error = %e, "Worker ended abnormally");
                }
            }
        }
        info!("Task scheduler stopped");
    }

    /// Returns true while the dispatch loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.dispatcher
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Submits one test case and returns the task id.
    ///
    /// When the queue is full the task is recorded as `error` and its id is
    /// still returned.
    pub fn submit_test_case(
        &self,
        case: TestCase,
        base_url: Option<String>,
        priority: TaskPriority,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> String {
        self.submit(TaskPayload::TestCase(case), base_url, priority, scheduled_at)
    }

    /// Submits a whole suite and returns the task id.
    ///
    /// When the queue is full the task is recorded as `error` and its id is
    /// still returned.
    pub fn submit_test_suite(
        &self,
        suite: TestSuite,
        base_url: Option<String>,
        priority: TaskPriority,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> String {
        self.submit(TaskPayload::TestSuite(suite), base_url, priority, scheduled_at)
    }

    fn submit(
        &self,
        payload: TaskPayload,
        base_url: Option<String>,
        priority: TaskPriority,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> String {
        let now = self.inner.clock.now();
        let task = Task::new(payload, base_url, priority, scheduled_at, now);
        let task_id = task.id.clone();
        let label = task.payload.label().to_string();
        self.inner.tasks.lock().insert(task_id.clone(), task);

        let entry = QueuedTask {
            task_id: task_id.clone(),
            priority,
            scheduled_at,
        };
        match self.inner.queue.push(entry) {
            Ok(()) => {
                info!(task_id, label, priority = priority.0, ?scheduled_at, "Task submitted");
            }
            Err(e) => {
                warn!(task_id, label, error = %e, "Task rejected");
                if let Some(task) = self.inner.tasks.lock().get_mut(&task_id) {
                    task.fail(e.to_string(), now);
                }
            }
        }
        task_id
    }

    /// Returns a status snapshot; `None` for unknown or malformed ids.
    #[must_use]
    pub fn get_task_status(&self, task_id: &str) -> Option<TaskStatusInfo> {
        let id = parse_id(task_id).ok()?;
        self.inner.tasks.lock().get(&id).map(TaskStatusInfo::from)
    }

    /// Returns a full copy of the task.
    #[must_use]
    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        let id = parse_id(task_id).ok()?;
        self.inner.tasks.lock().get(&id).cloned()
    }

    /// Returns the result once the task has completed.
    #[must_use]
    pub fn get_task_result(&self, task_id: &str) -> Option<TaskOutcome> {
        let id = parse_id(task_id).ok()?;
        let tasks = self.inner.tasks.lock();
        let task = tasks.get(&id)?;
        if task.status == TaskStatus::Completed {
            task.result.clone()
        } else {
            None
        }
    }

    /// Cancels a pending or running task.
    ///
    /// Returns false for unknown ids and tasks already in a terminal state.
    /// A running task is aborted at its next await point.
    pub fn cancel_task(&self, task_id: &str) -> bool {
        let Ok(id) = parse_id(task_id) else {
            return false;
        };
        {
            let mut tasks = self.inner.tasks.lock();
            let Some(task) = tasks.get_mut(&id) else {
                return false;
            };
            if task.is_terminal() {
                return false;
            }
            task.cancel(self.inner.clock.now());
        }

        self.inner.queue.remove(&id);
        if let Some(handle) = self.inner.handles.lock().remove(&id) {
            handle.abort();
        }
        info!(task_id = %id, "Task cancelled");
        true
    }

    /// Removes a terminal task and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotFound`] for unknown ids and
    /// [`SchedulerError::TaskActive`] for pending or running tasks.
    pub fn delete_task(&self, task_id: &str) -> SchedulerResult<Task> {
        let id = parse_id(task_id).map_err(|_| SchedulerError::NotFound(task_id.to_string()))?;
        let mut tasks = self.inner.tasks.lock();
        match tasks.get(&id).map(Task::is_terminal) {
            None => Err(SchedulerError::NotFound(id)),
            Some(false) => Err(SchedulerError::TaskActive(id)),
            Some(true) => tasks.remove(&id).ok_or(SchedulerError::NotFound(id)),
        }
    }

    /// Drops terminal tasks completed more than `older_than` ago.
    ///
    /// Returns the number of tasks removed.
    pub fn purge_finished(&self, older_than: chrono::Duration) -> usize {
        let cutoff = self.inner.clock.now() - older_than;
        let mut tasks = self.inner.tasks.lock();
        let before = tasks.len();
        tasks.retain(|_, task| {
            !(task.is_terminal() && task.completed_at.is_some_and(|at| at < cutoff))
        });
        let purged = before - tasks.len();
        if purged > 0 {
            debug!(purged, "Purged finished tasks");
        }
        purged
    }

    /// Returns scheduler-wide counters.
    #[must_use]
    pub fn get_queue_status(&self) -> QueueStatus {
        let (total, running, pending) = {
            let tasks = self.inner.tasks.lock();
            let count = |status: TaskStatus| tasks.values().filter(|t| t.status == status).count();
            (tasks.len(), count(TaskStatus::Running), count(TaskStatus::Pending))
        };
        QueueStatus {
            queue_size: self.inner.queue.len(),
            max_queue_size: self.inner.queue.capacity(),
            total_tasks: total,
            running_tasks: running,
            pending_tasks: pending,
            worker_threads: self.inner.config.worker_threads.max(1),
            is_running: self.is_running(),
        }
    }

    /// Registers a handler called when a task starts running.
    pub fn on_task_start(&self, callback: impl Fn(&Task) + Send + Sync + 'static) {
        self.inner.callbacks.write().on_start.push(Arc::new(callback));
    }

    /// Registers a handler called when a task completes.
    pub fn on_task_complete(&self, callback: impl Fn(&Task) + Send + Sync + 'static) {
        self.inner.callbacks.write().on_complete.push(Arc::new(callback));
    }

    /// Registers a handler called when a task fails.
    pub fn on_task_error(&self, callback: impl Fn(&Task) + Send + Sync + 'static) {
        self.inner.callbacks.write().on_error.push(Arc::new(callback));
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

async fn dispatch_loop(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    let poll = inner.config.poll_interval();
    debug!(?poll, "Dispatch loop started");

    loop {
        if *shutdown.borrow() {
            break;
        }
        inner.reap_finished();

        let permit = tokio::select! {
            permit = Arc::clone(&inner.workers).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        };

        let Some(entry) = inner.queue.pop_eligible(inner.clock.now()) else {
            drop(permit);
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                () = inner.queue.notified() => {}
                () = tokio::time::sleep(poll) => {}
            }
            continue;
        };

        let task_id = entry.task_id;
        let worker = Arc::clone(&inner);
        let worker_id = task_id.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            worker.run_task(&worker_id).await;
            worker.handles.lock().remove(&worker_id);
        });
        if !handle.is_finished() {
            inner.handles.lock().insert(task_id, handle);
        }
    }

    debug!("Dispatch loop exited");
}

impl Inner {
    fn reap_finished(&self) {
        self.handles.lock().retain(|_, handle| !handle.is_finished());
    }

    async fn run_task(&self, task_id: &str) {
        let snapshot = {
            let mut tasks = self.tasks.lock();
            let Some(task) = tasks.get_mut(task_id) else {
                return;
            };
            if task.status != TaskStatus::Pending {
                debug!(task_id, status = %task.status, "Skipping task that is no longer pending");
                return;
            }
            task.mark_running(self.clock.now());
            task.clone()
        };
        info!(task_id, label = snapshot.payload.label(), "Task started");
        self.fire(Event::Start, &snapshot);

        let runner = self.runner.clone();
        let payload = snapshot.payload.clone();
        let base_url = snapshot.base_url.clone();
        let execution = tokio::spawn(async move {
            match payload {
                TaskPayload::TestCase(case) => TaskOutcome::TestCase(
                    runner.execute_test_case(&case, base_url.as_deref()).await,
                ),
                TaskPayload::TestSuite(suite) => TaskOutcome::TestSuite(
                    runner.execute_test_suite(&suite, base_url.as_deref()).await,
                ),
            }
        });
        // cancelling this worker must also stop the execution it spawned
        let _guard = AbortOnDrop(execution.abort_handle());
        let outcome = execution.await;
        self.settle(task_id, outcome);
    }

    /// Records how a running task ended and fires the matching callbacks.
    fn settle(&self, task_id: &str, outcome: Result<TaskOutcome, JoinError>) {
        let now = self.clock.now();
        let (event, finished) = {
            let mut tasks = self.tasks.lock();
            let Some(task) = tasks.get_mut(task_id) else {
                return;
            };
            if task.status == TaskStatus::Cancelled {
                return;
            }
            let event = match outcome {
                Ok(outcome) => {
                    task.complete(outcome, now);
                    Event::Complete
                }
                Err(e) => {
                    task.fail(format!("task execution failed: {e}"), now);
                    Event::Error
                }
            };
            (event, task.clone())
        };

        match event {
            Event::Complete => info!(task_id, "Task completed"),
            _ => error!(
                task_id,
                error = finished.error.as_deref().unwrap_or_default(),
                "Task failed"
            ),
        }
        self.fire(event, &finished);
    }

    fn fire(&self, event: Event, task: &Task) {
        let handlers = {
            let callbacks = self.callbacks.read();
            match event {
                Event::Start => callbacks.on_start.clone(),
                Event::Complete => callbacks.on_complete.clone(),
                Event::Error => callbacks.on_error.clone(),
            }
        };
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(task))).is_err() {
                error!(task_id = %task.id, callback = event.name(), "Task callback panicked");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::client::TestHttpClient;
    use crate::test_support::{utc_clock, MockTransport};
    use apiprobe_domain::{ExecutionConfig, TestStatus};
    use pretty_assertions::assert_eq;

    fn scheduler_with(transport: MockTransport, config: TaskScheduleConfig) -> TaskScheduler {
        let client = TestHttpClient::new(Arc::new(transport), ExecutionConfig::default());
        TaskScheduler::new(TestRunner::new(client), config, utc_clock())
    }

    fn scheduler(config: TaskScheduleConfig) -> TaskScheduler {
        scheduler_with(MockTransport::responding(200, "ok"), config)
    }

    fn fast_config() -> TaskScheduleConfig {
        TaskScheduleConfig {
            poll_interval_ms: 10,
            ..TaskScheduleConfig::default()
        }
    }

    fn case(id: &str) -> TestCase {
        TestCase::new("GET", "/health").with_id(id)
    }

    async fn wait_terminal(scheduler: &TaskScheduler, task_id: &str) -> TaskStatusInfo {
        for _ in 0..300 {
            if let Some(info) = scheduler.get_task_status(task_id) {
                if info.status.is_terminal() {
                    return info;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {task_id} did not finish");
    }

    #[tokio::test]
    async fn test_submitted_case_completes() {
        let scheduler = scheduler(fast_config());
        scheduler.start().unwrap();

        let id = scheduler.submit_test_case(
            case("health"),
            Some("http://api.test".to_string()),
            TaskPriority::NORMAL,
            None,
        );
        let info = wait_terminal(&scheduler, &id).await;
        assert_eq!(info.status, TaskStatus::Completed);

        match scheduler.get_task_result(&id).unwrap() {
            TaskOutcome::TestCase(result) => assert_eq!(result.status, TestStatus::Passed),
            TaskOutcome::TestSuite(_) => panic!("expected a case result"),
        }
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_suite_task_completes_even_when_cases_fail() {
        let scheduler = scheduler(fast_config());
        scheduler.start().unwrap();

        let suite = TestSuite::new("mixed")
            .with_case(case("ok"))
            .with_case(case("bad").expecting_status(404));
        let id = scheduler.submit_test_suite(
            suite,
            Some("http://api.test".to_string()),
            TaskPriority::NORMAL,
            None,
        );
        wait_terminal(&scheduler, &id).await;

        let Some(TaskOutcome::TestSuite(result)) = scheduler.get_task_result(&id) else {
            panic!("expected a suite result");
        };
        assert_eq!(result.counts().passed, 1);
        assert_eq!(result.counts().failed, 1);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_scheduled_task_does_not_start_early() {
        let scheduler = scheduler(fast_config());
        scheduler.start().unwrap();

        let scheduled_at = Utc::now() + chrono::Duration::seconds(1);
        let id = scheduler.submit_test_case(
            case("later"),
            Some("http://api.test".to_string()),
            TaskPriority::NORMAL,
            Some(scheduled_at),
        );

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(scheduler.get_task_status(&id).unwrap().status, TaskStatus::Pending);

        let info = wait_terminal(&scheduler, &id).await;
        assert_eq!(info.status, TaskStatus::Completed);
        assert!(info.started_at.unwrap() >= scheduled_at);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_delayed_task_does_not_block_due_tasks() {
        let scheduler = scheduler(TaskScheduleConfig {
            worker_threads: 1,
            ..fast_config()
        });
        scheduler.start().unwrap();

        let later = scheduler.submit_test_case(
            case("later"),
            Some("http://api.test".to_string()),
            TaskPriority::NORMAL,
            Some(Utc::now() + chrono::Duration::seconds(30)),
        );
        let now = scheduler.submit_test_case(
            case("now"),
            Some("http://api.test".to_string()),
            TaskPriority::NORMAL,
            None,
        );

        assert_eq!(wait_terminal(&scheduler, &now).await.status, TaskStatus::Completed);
        assert_eq!(scheduler.get_task_status(&later).unwrap().status, TaskStatus::Pending);
        assert!(scheduler.cancel_task(&later));
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_cancel_before_pickup() {
        let scheduler = scheduler(fast_config());
        let id = scheduler.submit_test_case(
            case("c"),
            Some("http://api.test".to_string()),
            TaskPriority::NORMAL,
            None,
        );

        assert!(scheduler.cancel_task(&id));
        assert_eq!(scheduler.get_task_status(&id).unwrap().status, TaskStatus::Cancelled);
        assert!(scheduler.get_task_result(&id).is_none());
        assert!(!scheduler.cancel_task(&id));

        scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(scheduler.get_task_status(&id).unwrap().status, TaskStatus::Cancelled);
        assert_eq!(scheduler.get_queue_status().queue_size, 0);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_cancel_running_task() {
        let transport = MockTransport::responding(200, "").delayed(Duration::from_secs(10));
        let scheduler = scheduler_with(transport, fast_config());
        scheduler.start().unwrap();

        let id = scheduler.submit_test_case(
            case("slow"),
            Some("http://api.test".to_string()),
            TaskPriority::NORMAL,
            None,
        );
        for _ in 0..100 {
            if scheduler.get_task_status(&id).unwrap().status == TaskStatus::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(scheduler.cancel_task(&id));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(scheduler.get_task_status(&id).unwrap().status, TaskStatus::Cancelled);
        assert!(scheduler.get_task_result(&id).is_none());
        assert_eq!(scheduler.get_queue_status().running_tasks, 0);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_queue_full_records_error() {
        let scheduler = scheduler(TaskScheduleConfig {
            max_queue_size: 1,
            ..fast_config()
        });
        let first = scheduler.submit_test_case(case("1"), None, TaskPriority::NORMAL, None);
        let second = scheduler.submit_test_case(case("2"), None, TaskPriority::NORMAL, None);

        assert_eq!(scheduler.get_task_status(&first).unwrap().status, TaskStatus::Pending);
        let rejected = scheduler.get_task_status(&second).unwrap();
        assert_eq!(rejected.status, TaskStatus::Error);
        assert!(rejected.error.unwrap().contains("queue is full"));
        assert_eq!(scheduler.get_queue_status().total_tasks, 2);
    }

    #[tokio::test]
    async fn test_priority_order_with_single_worker() {
        let scheduler = scheduler(TaskScheduleConfig {
            worker_threads: 1,
            enable_priority: true,
            ..fast_config()
        });
        let order = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&order);
        scheduler.on_task_start(move |task| seen.lock().push(task.payload.label().to_string()));

        let base = Some("http://api.test".to_string());
        let ids = [
            scheduler.submit_test_case(case("low"), base.clone(), TaskPriority::LOW, None),
            scheduler.submit_test_case(case("high"), base.clone(), TaskPriority::HIGH, None),
            scheduler.submit_test_case(case("normal"), base, TaskPriority::NORMAL, None),
        ];
        scheduler.start().unwrap();
        for id in &ids {
            wait_terminal(&scheduler, id).await;
        }

        assert_eq!(*order.lock(), vec!["high", "normal", "low"]);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_panicking_callback_does_not_break_worker() {
        let scheduler = scheduler(fast_config());
        let completed = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&completed);
        scheduler.on_task_start(|_| panic!("callback failure"));
        scheduler.on_task_complete(move |task| seen.lock().push(task.id.clone()));
        scheduler.start().unwrap();

        let id = scheduler.submit_test_case(
            case("p"),
            Some("http://api.test".to_string()),
            TaskPriority::NORMAL,
            None,
        );
        assert_eq!(wait_terminal(&scheduler, &id).await.status, TaskStatus::Completed);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*completed.lock(), vec![id]);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let scheduler = scheduler(fast_config());
        assert!(scheduler.get_task_status("not-a-uuid").is_none());
        assert!(scheduler.get_task_status(&apiprobe_domain::generate_id()).is_none());
        assert!(scheduler.get_task_result("not-a-uuid").is_none());
        assert!(!scheduler.cancel_task("not-a-uuid"));
        assert!(matches!(
            scheduler.delete_task("not-a-uuid"),
            Err(SchedulerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_purge() {
        let scheduler = scheduler(fast_config());
        let active = scheduler.submit_test_case(case("a"), None, TaskPriority::NORMAL, None);
        assert!(matches!(
            scheduler.delete_task(&active),
            Err(SchedulerError::TaskActive(_))
        ));

        assert!(scheduler.cancel_task(&active));
        let removed = scheduler.delete_task(&active).unwrap();
        assert_eq!(removed.status, TaskStatus::Cancelled);
        assert!(scheduler.get_task_status(&active).is_none());

        let old = scheduler.submit_test_case(case("b"), None, TaskPriority::NORMAL, None);
        scheduler.cancel_task(&old);
        assert_eq!(scheduler.purge_finished(chrono::Duration::hours(1)), 0);
        assert_eq!(scheduler.purge_finished(chrono::Duration::seconds(-1)), 1);
        assert_eq!(scheduler.get_queue_status().total_tasks, 0);
    }

    #[tokio::test]
    async fn test_queue_status_and_lifecycle() {
        let scheduler = scheduler(fast_config());
        let status = scheduler.get_queue_status();
        assert!(!status.is_running);
        assert_eq!(status.worker_threads, 3);
        assert_eq!(status.max_queue_size, 100);

        scheduler.submit_test_case(
            case("q"),
            None,
            TaskPriority::NORMAL,
            Some(Utc::now() + chrono::Duration::hours(1)),
        );
        assert_eq!(scheduler.get_queue_status().queue_size, 1);
        assert_eq!(scheduler.get_queue_status().pending_tasks, 1);

        scheduler.start().unwrap();
        scheduler.start().unwrap();
        assert!(scheduler.is_running());
        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let scheduler = scheduler(fast_config());
        assert_eq!(scheduler.start(), Err(SchedulerError::NoRuntime));
    }

    #[tokio::test]
    async fn test_failed_execution_moves_task_to_error() {
        let scheduler = scheduler(fast_config());
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&errors);
        scheduler.on_task_error(move |task| seen.lock().push(task.id.clone()));

        let id = scheduler.submit_test_case(case("boom"), None, TaskPriority::NORMAL, None);
        scheduler
            .inner
            .tasks
            .lock()
            .get_mut(&id)
            .unwrap()
            .mark_running(Utc::now());
        let execution: JoinHandle<TaskOutcome> = tokio::spawn(async { panic!("adapter bug") });
        let failure = execution.await.unwrap_err();
        scheduler.inner.settle(&id, Err(failure));

        let info = scheduler.get_task_status(&id).unwrap();
        assert_eq!(info.status, TaskStatus::Error);
        assert!(info.error.unwrap().contains("task execution failed"));
        assert!(scheduler.get_task_result(&id).is_none());
        assert_eq!(*errors.lock(), vec![id]);
    }

    #[tokio::test]
    async fn test_panicking_transport_completes_with_error_case() {
        let transport = MockTransport::with_handler(|_| panic!("adapter bug"));
        let scheduler = scheduler_with(transport, fast_config());
        let errors = Arc::new(Mutex::new(0_usize));
        let seen = Arc::clone(&errors);
        scheduler.on_task_error(move |_| *seen.lock() += 1);
        scheduler.start().unwrap();

        let id = scheduler.submit_test_case(
            case("boom"),
            Some("http://api.test".to_string()),
            TaskPriority::NORMAL,
            None,
        );
        assert_eq!(wait_terminal(&scheduler, &id).await.status, TaskStatus::Completed);
        let Some(TaskOutcome::TestCase(result)) = scheduler.get_task_result(&id) else {
            panic!("expected a case result");
        };
        assert_eq!(result.status, TestStatus::Error);
        assert_eq!(*errors.lock(), 0);
        scheduler.stop().await;
    }
}
