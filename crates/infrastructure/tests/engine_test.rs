//! End-to-end tests: runner and scheduler over the real HTTP transport.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use apiprobe_application::{Clock, TaskScheduler, TestHttpClient, TestRunner};
use apiprobe_domain::{
    CaseAssertion, ExecutionConfig, TaskOutcome, TaskPriority, TaskScheduleConfig, TaskStatus,
    TestCase, TestStatus, TestSuite,
};
use apiprobe_infrastructure::{ManualClock, ReqwestTransport, SystemClock};

async fn users_api() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_json(json!({"total": 2, "users": [{"name": "ada"}, {"name": "alan"}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 3})))
        .mount(&server)
        .await;
    server
}

fn runner(config: ExecutionConfig) -> TestRunner {
    let transport = Arc::new(ReqwestTransport::new().unwrap());
    TestRunner::new(TestHttpClient::new(transport, config))
}

fn users_suite(base_url: &str) -> TestSuite {
    TestSuite::new("users")
        .with_base_url(base_url)
        .with_case(
            TestCase::new("GET", "/users")
                .with_id("list")
                .with_assertion(
                    CaseAssertion::new("json_path", json!(2)).with_field_path("$.total"),
                )
                .with_assertion(
                    CaseAssertion::new("json_path", json!("alan"))
                        .with_field_path("$.users[1].name"),
                )
                .with_assertion(
                    CaseAssertion::new("header_value", json!("application/json"))
                        .with_field_path("content-type"),
                ),
        )
        .with_case(
            TestCase::new("POST", "/users")
                .with_id("create")
                .with_body(json!({"name": "grace"})),
        )
}

async fn wait_for_terminal(scheduler: &TaskScheduler, task_id: &str) -> TaskStatus {
    for _ in 0..200 {
        if let Some(info) = scheduler.get_task_status(task_id) {
            if info.status.is_terminal() {
                return info.status;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("task {task_id} did not finish");
}

#[tokio::test]
async fn test_suite_against_live_server() {
    let server = users_api().await;
    let result = runner(ExecutionConfig::default())
        .execute_test_suite(&users_suite(&server.uri()), None)
        .await;

    let statuses: Vec<_> = result.test_results().iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![TestStatus::Passed, TestStatus::Failed]);
    assert_eq!(result.total(), 2);
    assert!((result.success_rate() - 50.0).abs() < f64::EPSILON);

    let create = &result.test_results()[1];
    assert_eq!(create.response.as_ref().unwrap().status, 201);
    assert!(create.assertions[0]
        .message
        .as_deref()
        .unwrap()
        .contains("201"));
}

#[tokio::test]
async fn test_unreachable_host_is_an_error_result() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let suite = TestSuite::new("down").with_case(TestCase::new("GET", "/health"));

    let result = runner(ExecutionConfig::default())
        .execute_test_suite(&suite, Some(&format!("http://127.0.0.1:{port}")))
        .await;

    assert_eq!(result.test_results()[0].status, TestStatus::Error);
    assert!(!result.all_passed());
}

#[tokio::test]
async fn test_scheduler_runs_suite_over_http() {
    let server = users_api().await;
    let scheduler = TaskScheduler::new(
        runner(ExecutionConfig::default()),
        TaskScheduleConfig::default(),
        SystemClock::shared(),
    );
    scheduler.start().unwrap();

    let task_id = scheduler.submit_test_suite(
        users_suite(&server.uri()),
        None,
        TaskPriority::NORMAL,
        None,
    );

    assert_eq!(wait_for_terminal(&scheduler, &task_id).await, TaskStatus::Completed);
    match scheduler.get_task_result(&task_id).unwrap() {
        TaskOutcome::TestSuite(result) => assert_eq!(result.counts().passed, 1),
        TaskOutcome::TestCase(_) => panic!("expected a suite outcome"),
    }

    scheduler.stop().await;
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn test_scheduled_task_waits_for_the_clock() {
    let server = users_api().await;
    let clock = ManualClock::new(Utc::now());
    let config = TaskScheduleConfig {
        poll_interval_ms: 10,
        ..TaskScheduleConfig::default()
    };
    let scheduler = TaskScheduler::new(
        runner(ExecutionConfig::default()),
        config,
        Arc::new(clock.clone()),
    );
    scheduler.start().unwrap();

    let case = TestCase::new("GET", "/users").with_id("later");
    let task_id = scheduler.submit_test_case(
        case,
        Some(server.uri()),
        TaskPriority::NORMAL,
        Some(clock.now() + chrono::Duration::hours(1)),
    );

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        scheduler.get_task_status(&task_id).unwrap().status,
        TaskStatus::Pending
    );

    clock.advance(chrono::Duration::hours(2));
    assert_eq!(wait_for_terminal(&scheduler, &task_id).await, TaskStatus::Completed);
    assert!(scheduler.get_task_result(&task_id).unwrap().all_passed());

    scheduler.stop().await;
}
