//! Behavioural tests for the TCP transport against a loopback controller.

#[path = "common/fake_controller.rs"]
mod fake_controller;
#[path = "common/upload_sink.rs"]
mod upload_sink;

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8Path;
use esxcloud::messages::ControllerRequest;
use esxcloud::rpc::{Credentials, EventLoop};
use esxcloud::test_support::loopback_config;
use esxcloud::{
    Cloud, CloudConfig, EsxCloud, EsxCloudError, LoopManager, RequestCorrelator, RpcClient,
    RpcError, TcpTransport,
};
use serde_json::json;

use fake_controller::{Behaviour, fake_controller};
use upload_sink::{closed_port, split_upload, upload_sink};

async fn connected(transport: &TcpTransport) -> RpcClient<TcpTransport> {
    let manager = LoopManager::new(transport.clone());
    RpcClient::connect(transport.clone(), &manager, Arc::new(RequestCorrelator::new()))
        .await
        .expect("transport loop starts")
}

fn delete_vm(name: &str) -> ControllerRequest {
    ControllerRequest::DeleteVm {
        name: name.to_owned(),
    }
}

#[tokio::test]
async fn responses_are_routed_to_their_callers() {
    let (endpoint, _controller) = fake_controller(Behaviour::Echo).await;
    let transport = TcpTransport::new(endpoint, None);
    let rpc = connected(&transport).await;

    let first = rpc
        .call(delete_vm("vm-1"), None)
        .await
        .expect("first call");
    let second = rpc
        .call(delete_vm("vm-2"), None)
        .await
        .expect("second call");

    assert_eq!(first, json!({ "type": "delete_vm", "name": "vm-1" }));
    assert_eq!(second, json!({ "type": "delete_vm", "name": "vm-2" }));
    assert_eq!(transport.pending_requests(), 0);
}

#[tokio::test]
async fn credentials_are_presented_before_requests() {
    let (endpoint, controller) = fake_controller(Behaviour::Hangup).await;
    let credentials = Credentials {
        user: String::from("director"),
        password: String::from("s3cret"),
    };
    let transport = TcpTransport::new(endpoint, Some(credentials));
    let rpc = connected(&transport).await;

    rpc.call(delete_vm("vm-1"), Some(Duration::from_secs(5)))
        .await
        .expect_err("controller hangs up");

    let frames = controller.await.expect("controller task");
    assert_eq!(
        frames.first(),
        Some(&json!({ "kind": "connect", "user": "director", "password": "s3cret" }))
    );
    assert_eq!(
        frames.get(1).and_then(|frame| frame.get("payload")),
        Some(&json!({ "type": "delete_vm", "name": "vm-1" }))
    );
}

#[tokio::test]
async fn controller_failure_is_reported_as_rejection() {
    let (endpoint, _controller) = fake_controller(Behaviour::Reject).await;
    let transport = TcpTransport::new(endpoint, None);
    let rpc = connected(&transport).await;

    let err = rpc
        .call(delete_vm("vm-1"), None)
        .await
        .expect_err("rejected");

    assert!(
        matches!(err, RpcError::Rejected { ref detail, .. } if detail == "refused"),
        "unexpected: {err}"
    );
}

#[tokio::test]
async fn hangup_fails_in_flight_requests_and_stops_the_loop() {
    let (endpoint, controller) = fake_controller(Behaviour::Hangup).await;
    let transport = TcpTransport::new(endpoint, None);
    let rpc = connected(&transport).await;

    let err = rpc
        .call(delete_vm("vm-1"), Some(Duration::from_secs(5)))
        .await
        .expect_err("hangup");
    controller.await.expect("controller task");

    assert!(matches!(err, RpcError::Transport { .. }), "unexpected: {err}");
    assert_eq!(transport.pending_requests(), 0);
    assert!(!transport.is_running());
}

#[tokio::test]
async fn unreachable_controller_fails_bootstrap() {
    let transport = TcpTransport::new(format!("127.0.0.1:{}", closed_port().await), None);
    let manager = LoopManager::new(transport.clone());

    let result =
        RpcClient::connect(transport, &manager, Arc::new(RequestCorrelator::new())).await;

    assert!(matches!(result, Err(RpcError::Bootstrap { .. })));
}

#[tokio::test]
async fn driver_creates_a_stemcell_end_to_end() {
    let (endpoint, _controller) = fake_controller(Behaviour::Echo).await;
    let (upload_port, sink) = upload_sink().await;
    let mq_port = endpoint
        .rsplit(':')
        .next()
        .and_then(|port| port.parse().ok())
        .expect("controller port");
    let config = CloudConfig {
        mq_port,
        ..loopback_config(upload_port)
    };
    let mut image = tempfile::NamedTempFile::new().expect("temp image");
    image.write_all(b"image").expect("write image");
    let path = Utf8Path::from_path(image.path()).expect("utf8 path");

    let cloud = EsxCloud::from_config(&config)
        .await
        .expect("driver connects");
    let stemcell = cloud.create_stemcell(path).await.expect("stemcell");

    let received = sink.await.expect("upload sink");
    assert_eq!(split_upload(&received).0, stemcell.as_str());
    assert_eq!(cloud.transport().pending_requests(), 0);
}

#[tokio::test]
async fn driver_reports_invalid_configuration() {
    let config = CloudConfig {
        esxmgr_host: String::new(),
        ..loopback_config(1)
    };

    let err = EsxCloud::from_config(&config).await.expect_err("invalid");

    assert!(matches!(err, EsxCloudError::Config(ref message) if message.contains("esxmgr_host")));
}

#[tokio::test]
async fn late_response_is_discarded_after_timeout() {
    let (endpoint, _controller) =
        fake_controller(Behaviour::DelayFirst(Duration::from_millis(300))).await;
    let transport = TcpTransport::new(endpoint.clone(), None);
    let rpc = connected(&transport).await;

    let err = rpc
        .call(delete_vm("vm-slow"), Some(Duration::from_millis(100)))
        .await
        .expect_err("first call times out");
    assert!(
        matches!(err, RpcError::Timeout { operation: "delete_vm", .. }),
        "unexpected: {err}"
    );
    assert_eq!(transport.pending_requests(), 0);

    let second = rpc
        .call(delete_vm("vm-next"), Some(Duration::from_secs(5)))
        .await
        .expect("second call");

    assert_eq!(second, json!({ "type": "delete_vm", "name": "vm-next" }));
    assert_eq!(transport.pending_requests(), 0);
    assert_eq!(transport.endpoint(), endpoint);
}
