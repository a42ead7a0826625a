//! Loopback listener standing in for the controller's upload port.

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accepts one upload and returns every byte received before the client
/// closed the connection.
pub async fn upload_sink() -> (u16, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind upload sink");
    let port = listener.local_addr().expect("sink address").port();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept upload");
        let mut received = Vec::new();
        socket
            .read_to_end(&mut received)
            .await
            .expect("read upload");
        received
    });
    (port, handle)
}

/// Returns a port nothing is listening on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("address").port()
}

/// Splits an upload into its trimmed destination name and body.
pub fn split_upload(received: &[u8]) -> (String, &[u8]) {
    let (header, body) = received.split_at(esxcloud::upload::NAME_FIELD_LEN);
    let name = String::from_utf8(header.to_vec()).expect("utf8 header");
    (name.trim_end().to_owned(), body)
}
