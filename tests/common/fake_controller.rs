//! Minimal controller speaking the newline-delimited JSON protocol.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// How the fake controller treats incoming requests.
#[derive(Clone, Copy, Debug)]
pub enum Behaviour {
    /// Reply to every request with success and echo the payload.
    Echo,
    /// Reply to every request with a failure detail.
    Reject,
    /// Close the connection on the first request without replying.
    Hangup,
    /// Hold the first reply for the given delay, then echo as usual.
    DelayFirst(Duration),
}

/// Serves one connection and returns every frame it received.
pub async fn fake_controller(behaviour: Behaviour) -> (String, JoinHandle<Vec<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind controller");
    let endpoint = listener
        .local_addr()
        .expect("controller address")
        .to_string();
    let handle = tokio::spawn(async move {
        let (socket, _) = listener
            .accept()
            .await
            .expect("accept controller connection");
        let (read_half, mut write_half) = socket.into_split();
        let mut lines = BufReader::new(read_half).lines();
        let mut frames = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            let frame: Value = serde_json::from_str(&line).expect("frame is json");
            let is_request = frame.get("kind") == Some(&json!("request"));
            let id = frame.get("id").cloned().unwrap_or(Value::Null);
            let payload = frame.get("payload").cloned().unwrap_or(Value::Null);
            frames.push(frame);
            if !is_request {
                continue;
            }
            let reply = match behaviour {
                Behaviour::DelayFirst(delay) if frames.len() == 1 => {
                    tokio::time::sleep(delay).await;
                    json!({ "id": id, "success": true, "result": payload })
                }
                Behaviour::Echo | Behaviour::DelayFirst(_) => {
                    json!({ "id": id, "success": true, "result": payload })
                }
                Behaviour::Reject => json!({ "id": id, "success": false, "result": "refused" }),
                Behaviour::Hangup => break,
            };
            let mut bytes = serde_json::to_vec(&reply).expect("encode reply");
            bytes.push(b'\n');
            write_half.write_all(&bytes).await.expect("write reply");
        }
        frames
    });
    (endpoint, handle)
}
