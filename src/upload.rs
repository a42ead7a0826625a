//! Raw bulk upload of stemcell images to the controller host.
//!
//! The controller listens on a fixed port for uploads. A client writes the
//! destination name space-padded into a fixed 256-byte header, streams the
//! file body in 4096-byte chunks and closes the connection. Nothing is read
//! back: the protocol has no acknowledgement, so the uploader waits a settle
//! period after closing before reporting success.
//!
//! TODO: replace the settle delay with an acknowledgement once the controller
//! sends one.

use std::time::Duration;

use camino::Utf8Path;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::util::open_ambient;

/// Width of the destination-name header.
pub const NAME_FIELD_LEN: usize = 256;

/// Size of each body chunk written to the socket.
pub const CHUNK_SIZE: usize = 4096;

/// Port the controller accepts uploads on.
pub const DEFAULT_FILE_UPLOAD_PORT: u16 = 9090;

/// Delay after closing before the upload is considered received.
pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_secs(5);

/// Errors raised while uploading a file.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum UploadError {
    /// Raised when the destination name does not fit the fixed header.
    #[error("upload name '{name}' is {len} bytes; the header holds {NAME_FIELD_LEN}")]
    NameTooLong {
        /// Requested destination name.
        name: String,
        /// Length of the name in bytes.
        len: usize,
    },
    /// Raised when the local file cannot be opened or read.
    #[error("failed to read upload source `{path}`: {message}")]
    Source {
        /// Local path of the file.
        path: String,
        /// Underlying error message.
        message: String,
    },
    /// Raised when the controller's upload port refuses the connection.
    #[error("failed to connect to upload endpoint {endpoint}: {message}")]
    Connect {
        /// `host:port` of the upload endpoint.
        endpoint: String,
        /// Underlying error message.
        message: String,
    },
    /// Raised when writing to the connection fails part-way.
    #[error("upload to {endpoint} interrupted: {message}")]
    Stream {
        /// `host:port` of the upload endpoint.
        endpoint: String,
        /// Underlying error message.
        message: String,
    },
}

/// Encodes `name` into the fixed-width, space-padded header.
///
/// # Errors
///
/// Returns [`UploadError::NameTooLong`] when `name` exceeds
/// [`NAME_FIELD_LEN`] bytes.
pub fn encode_name(name: &str) -> Result<[u8; NAME_FIELD_LEN], UploadError> {
    let too_long = || UploadError::NameTooLong {
        name: name.to_owned(),
        len: name.len(),
    };
    let mut header = [b' '; NAME_FIELD_LEN];
    header
        .get_mut(..name.len())
        .ok_or_else(too_long)?
        .copy_from_slice(name.as_bytes());
    Ok(header)
}

/// Streams files to the controller's upload port.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileUploader {
    host: String,
    port: u16,
    settle_time: Duration,
}

impl FileUploader {
    /// Creates an uploader targeting `host:port` with the default settle time.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            settle_time: DEFAULT_SETTLE_TIME,
        }
    }

    /// Overrides the post-upload settle time.
    #[must_use]
    pub const fn with_settle_time(mut self, settle_time: Duration) -> Self {
        self.settle_time = settle_time;
        self
    }

    /// Returns the `host:port` uploads are sent to.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Uploads `source` under the destination `name` and returns the number
    /// of body bytes sent. Completes only after the settle time has elapsed.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError`] when the name does not fit, the file cannot be
    /// read, or the connection fails.
    pub async fn upload(&self, name: &str, source: &Utf8Path) -> Result<u64, UploadError> {
        let header = encode_name(name)?;
        let endpoint = self.endpoint();
        let source_error = |message: String| UploadError::Source {
            path: source.to_string(),
            message,
        };
        let stream_error = |err: std::io::Error| UploadError::Stream {
            endpoint: endpoint.clone(),
            message: err.to_string(),
        };

        let mut file =
            tokio::fs::File::from_std(open_ambient(source).map_err(source_error)?.into_std());

        info!(name, source = %source, endpoint = %endpoint, "uploading file");
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|err| UploadError::Connect {
                endpoint: endpoint.clone(),
                message: err.to_string(),
            })?;

        stream.write_all(&header).await.map_err(stream_error)?;

        let mut buffer = vec![0_u8; CHUNK_SIZE];
        let mut sent: u64 = 0;
        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|err| source_error(err.to_string()))?;
            let Some(chunk) = buffer.get(..read).filter(|chunk| !chunk.is_empty()) else {
                break;
            };
            stream.write_all(chunk).await.map_err(stream_error)?;
            sent += u64::try_from(chunk.len()).unwrap_or(u64::MAX);
        }

        stream.flush().await.map_err(stream_error)?;
        stream.shutdown().await.map_err(stream_error)?;
        drop(stream);

        debug!(name, settle = ?self.settle_time, "waiting for upload to settle");
        sleep(self.settle_time).await;
        info!(name, bytes = sent, "upload complete");
        Ok(sent)
    }
}
