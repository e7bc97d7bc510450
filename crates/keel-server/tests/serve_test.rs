//! Integration tests for the newline-delimited command loop.

use std::sync::Arc;

use keel_command::{CommandSettings, CommandType, Dispatcher, Reply, ReplyStatus};
use keel_server::{ServeSummary, serve};
use keel_test_utils::{Fault, InMemoryStore, init_test_logging};
use tokio::io::{AsyncReadExt, BufReader};

async fn run(store: &Arc<InMemoryStore>, input: &str, max_concurrency: usize) -> (ServeSummary, Vec<Reply>) {
    init_test_logging();
    let dispatcher = Arc::new(Dispatcher::new(store.clone(), CommandSettings::default()).unwrap());
    let (writer, mut reader) = tokio::io::duplex(64 * 1024);

    let summary = serve(
        dispatcher,
        BufReader::new(input.as_bytes()),
        writer,
        max_concurrency,
    )
    .await
    .unwrap();

    let mut out = String::new();
    reader.read_to_string(&mut out).await.unwrap();
    let replies = out
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (summary, replies)
}

#[tokio::test]
async fn every_command_line_gets_one_reply() {
    let store = Arc::new(InMemoryStore::new());
    store.seed_organization("org-1");

    let input = concat!(
        r#"{"id":"cmd-1","type":"ENVIRONMENT","payload":{"id":"env-1","cockpit_id":"c-env","organization_id":"org-1","name":"Prod"}}"#,
        "\n\n",
        r#"{"id":"cmd-2","type":"DELETE_ENVIRONMENT","payload":{"id":"unknown"}}"#,
        "\n",
        r#"{"id":"cmd-3","type":"HELLO","payload":{}}"#,
        "\n",
    );

    let (summary, mut replies) = run(&store, input, 1).await;

    assert_eq!(summary, ServeSummary { dispatched: 3, skipped: 0 });
    replies.sort_by(|a, b| a.command_id.cmp(&b.command_id));
    let statuses: Vec<ReplyStatus> = replies.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [ReplyStatus::Succeeded, ReplyStatus::Succeeded, ReplyStatus::Error]
    );
    assert_eq!(store.all_environments().len(), 1);
}

#[tokio::test]
async fn unreadable_lines_are_skipped() {
    let store = Arc::new(InMemoryStore::new());
    let input = "not json\n{\"type\":\"ORGANIZATION\"}\n{\"id\":\"cmd-9\",\"type\":\"ORGANIZATION\",\"payload\":{\"cockpit_id\":\"c\",\"name\":\"Acme\"}}\n";

    let (summary, replies) = run(&store, input, 4).await;

    assert_eq!(summary, ServeSummary { dispatched: 1, skipped: 2 });
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].command_id, "cmd-9");
    assert!(replies[0].is_success());
}

#[tokio::test]
async fn concurrent_commands_all_reply() {
    let store = Arc::new(InMemoryStore::new());
    let input: String = (0..20)
        .map(|i| {
            format!(
                "{{\"id\":\"cmd-{i}\",\"type\":\"ORGANIZATION\",\"payload\":{{\"cockpit_id\":\"c-{i}\",\"name\":\"Org {i}\"}}}}\n"
            )
        })
        .collect();

    let (summary, replies) = run(&store, &input, 4).await;

    assert_eq!(summary.dispatched, 20);
    assert_eq!(replies.len(), 20);
    assert!(replies.iter().all(Reply::is_success));
    assert_eq!(store.all_organizations().len(), 20);
}

#[tokio::test]
async fn panicking_command_still_gets_an_error_reply() {
    let store = Arc::new(InMemoryStore::new());
    store.seed_organization("org-1");
    store.seed_environment("org-1", "abc", "env-42");
    store.seed_started_api("abc", "api-1");
    store.inject_panic(Fault::StopApi);

    let input = concat!(
        r#"{"id":"cmd-1","type":"DELETE_ENVIRONMENT","payload":{"id":"env-42"}}"#,
        "\n",
        r#"{"id":"cmd-2","type":"ORGANIZATION","payload":{"cockpit_id":"c","name":"Acme"}}"#,
        "\n",
    );

    let (summary, mut replies) = run(&store, input, 2).await;

    assert_eq!(summary, ServeSummary { dispatched: 2, skipped: 0 });
    replies.sort_by(|a, b| a.command_id.cmp(&b.command_id));
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].command_id, "cmd-1");
    assert_eq!(replies[0].command_type, CommandType::DeleteEnvironment);
    assert_eq!(replies[0].status, ReplyStatus::Error);
    assert!(replies[1].is_success());
    assert_eq!(store.all_environments().len(), 1);
}
