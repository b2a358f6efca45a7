use super::*;
use crate::error::Error;
use crate::host::{HostService, RemoteHost};
use crate::logs::demux::encode_frame;
use crate::logs::{LogMessage, LogPosition};
use crate::models::{Container, ContainerAction, ContainerState, StdType};
use crate::proto;
use crate::runtime::fake::FakeRuntime;
use crate::runtime::RuntimeClient;
use crate::store::ContainerStore;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Server};

struct Harness {
    runtime: Arc<FakeRuntime>,
    store: Arc<ContainerStore>,
    client: Arc<AgentClient>,
    url: String,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.store.shutdown();
    }
}

async fn start() -> Harness {
    let runtime = Arc::new(FakeRuntime::new("host-a"));
    runtime.add_container(Container::new("web", "web", ContainerState::Running));

    let store = ContainerStore::builder(Arc::clone(&runtime) as Arc<dyn RuntimeClient>)
        .build()
        .await
        .unwrap();
    runtime.wait_for_subscriptions(1).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = AgentServer::new(Arc::clone(&store), "1.2.3").into_service();
    tokio::spawn(async move {
        Server::builder()
            .add_service(service)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
    });

    let url = format!("http://{}", addr);
    let client = AgentClient::builder()
        .endpoint(url.clone())
        .connect_timeout(Duration::from_secs(2))
        .backoff(Duration::from_millis(10), Duration::from_millis(50))
        .build();
    Harness {
        runtime,
        store,
        client: Arc::new(client),
        url,
    }
}

fn frames(lines: &[(StdType, &str)]) -> Vec<u8> {
    lines
        .iter()
        .flat_map(|(stream, line)| encode_frame(*stream, format!("{}\n", line).as_bytes()))
        .collect()
}

#[tokio::test]
async fn test_host_info() {
    let h = start().await;
    let host = h.client.host_info().await.unwrap();
    assert_eq!(host.id, "host-a");
    assert_eq!(host.agent_version, "1.2.3");
    assert_eq!(host.runtime_version, "24.0.7");
    assert_eq!(host.cpu_cores, 4);
}

#[tokio::test]
async fn test_find_and_list() {
    let h = start().await;
    let web = h.client.find_container("web").await.unwrap();
    assert_eq!(web.state, ContainerState::Running);
    assert_eq!(web.host, "host-a");

    let err = h.client.find_container("missing").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(ref id) if id == "missing"));

    assert_eq!(h.client.list_containers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_container_action() {
    let h = start().await;
    h.client
        .container_action("web", ContainerAction::Restart)
        .await
        .unwrap();
    assert_eq!(
        h.runtime.actions(),
        vec![(ContainerAction::Restart, "web".to_string())]
    );

    let err = h
        .client
        .container_action("missing", ContainerAction::Stop)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = h
        .client
        .container_action("bad-id", ContainerAction::Restart)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(ref id) if id == "bad-id"));

    h.runtime.fail_actions(true);
    let err = h
        .client
        .container_action("web", ContainerAction::Stop)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("cannot stop container"));
}

#[tokio::test]
async fn test_unknown_action_is_invalid_argument() {
    let h = start().await;
    let channel = Channel::from_shared(h.url.clone())
        .unwrap()
        .connect()
        .await
        .unwrap();
    let mut raw = proto::AgentServiceClient::new(channel);

    for action in [0, 42] {
        let status = raw
            .container_action(proto::ContainerActionRequest {
                container_id: "web".to_string(),
                action,
            })
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }
    assert!(h.runtime.actions().is_empty());
}

#[tokio::test]
async fn test_stream_logs_positions() {
    let h = start().await;
    h.runtime.set_logs(
        "web",
        frames(&[
            (StdType::STDOUT, "2024-03-01T10:00:00Z booting"),
            (StdType::STDERR, r#"2024-03-01T10:00:01Z {"level":"warn","msg":"slow"}"#),
            (StdType::STDOUT, "2024-03-01T10:00:02Z ready"),
        ]),
    );

    let events = h
        .client
        .stream_logs("web", None, StdType::ALL)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(events.len(), 3);
    assert_eq!(
        events.iter().map(|e| e.position).collect::<Vec<_>>(),
        vec![LogPosition::Start, LogPosition::Middle, LogPosition::End]
    );
    assert_eq!(events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(events[0].message, LogMessage::Simple("booting".to_string()));
    assert_eq!(events[0].timestamp, 1_709_287_200);
    assert_eq!(events[1].stream, StdType::STDERR);
    assert_eq!(events[1].level.as_deref(), Some("warn"));
    assert!(matches!(events[1].message, LogMessage::Complex(_)));
    assert!(events.iter().all(|e| e.container_id == "web"));
}

#[tokio::test]
async fn test_stream_logs_since_reaches_runtime() {
    let h = start().await;
    h.client
        .stream_logs("web", None, StdType::ALL)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    let since = Utc.timestamp_opt(1_709_287_200, 0).unwrap();
    h.client
        .stream_logs("web", Some(since), StdType::STDOUT)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    // no since means "from now", which the runtime resolves itself
    assert_eq!(h.runtime.follow_requests(), vec![None, Some(since)]);
}

#[tokio::test]
async fn test_stream_logs_unknown_container() {
    let h = start().await;
    let err = h
        .client
        .stream_logs("missing", None, StdType::ALL)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_logs_between_dates_drops_events_outside_window() {
    let h = start().await;
    h.runtime.set_logs(
        "web",
        frames(&[
            (StdType::STDOUT, "2024-03-01T09:59:00Z too early"),
            (StdType::STDOUT, "2024-03-01T10:00:05Z inside"),
            (StdType::STDOUT, "2024-03-01T10:05:00Z too late"),
        ]),
    );

    let since = Utc.timestamp_opt(1_709_287_200, 0).unwrap();
    let until = Utc.timestamp_opt(1_709_287_260, 0).unwrap();
    let events = h
        .client
        .logs_between_dates("web", since, until, StdType::ALL)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, LogMessage::Simple("inside".to_string()));
}

#[tokio::test]
async fn test_logs_between_dates_empty_window_is_empty_stream() {
    let h = start().await;
    h.runtime.set_logs(
        "web",
        frames(&[(StdType::STDOUT, "2024-03-01T09:00:00Z long ago")]),
    );

    let since = Utc.timestamp_opt(1_709_287_200, 0).unwrap();
    let until = Utc.timestamp_opt(1_709_287_260, 0).unwrap();
    let events = h
        .client
        .logs_between_dates("web", since, until, StdType::ALL)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_logs_between_dates_rejects_inverted_range() {
    let h = start().await;
    let since = Utc.timestamp_opt(1_709_287_260, 0).unwrap();
    let until = Utc.timestamp_opt(1_709_287_200, 0).unwrap();
    let err = h
        .client
        .logs_between_dates("web", since, until, StdType::ALL)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn test_raw_bytes_are_chunked() {
    let h = start().await;
    let payload: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
    h.runtime.set_logs("web", payload.clone());

    let since = Utc.timestamp_opt(0, 0).unwrap();
    let mut chunks = h
        .client
        .stream_raw_bytes("web", since, Utc::now(), StdType::ALL)
        .await
        .unwrap();

    let mut received = Vec::new();
    let mut sizes = Vec::new();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.unwrap();
        sizes.push(chunk.len());
        received.extend_from_slice(&chunk);
    }
    assert_eq!(received, payload);
    assert!(sizes.iter().all(|size| *size <= 1024));
    assert!(sizes.len() >= 3);
}

#[tokio::test]
async fn test_event_and_start_subscriptions() {
    let h = start().await;
    let mut events = h.client.stream_events().await.unwrap();
    let mut started = h.client.stream_container_started().await.unwrap();

    h.runtime
        .add_container(Container::new("worker", "worker", ContainerState::Running));
    h.runtime.emit("worker", "start");

    let event = tokio::time::timeout(Duration::from_secs(2), events.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(event.actor_id, "worker");
    assert_eq!(event.name, "start");
    assert_eq!(event.host, "host-a");

    let container = tokio::time::timeout(Duration::from_secs(2), started.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(container.id, "worker");
}

#[tokio::test]
async fn test_remote_host_tags_containers_with_its_id() {
    let h = start().await;
    let remote = RemoteHost::new("edge-1", Arc::clone(&h.client));

    let host = remote.host().await.unwrap();
    assert_eq!(host.id, "edge-1");
    assert_eq!(host.endpoint.as_deref(), Some(h.url.as_str()));
    assert!(host.available);

    let containers = remote.list_containers().await.unwrap();
    assert!(containers.iter().all(|c| c.host == "edge-1"));

    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(8);
    remote.subscribe_events(cancel.clone(), tx).await.unwrap();
    h.runtime.emit("web", "restart");

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.host, "edge-1");
    assert_eq!(event.name, "restart");
    cancel.cancel();
}

#[tokio::test]
async fn test_remote_subscription_fails_fast_when_agent_is_down() {
    let client = AgentClient::builder()
        .endpoint("http://127.0.0.1:1")
        .connect_timeout(Duration::from_millis(200))
        .build();
    let remote = RemoteHost::new("edge-1", Arc::new(client));
    let (tx, _rx) = mpsc::channel(8);
    let err = remote
        .subscribe_stats(CancellationToken::new(), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unavailable(_)));
}
