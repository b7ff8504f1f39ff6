use chrono::Local;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

/// Value of the fixed `Server` header.
pub const SERVER_NAME: &str = "filehttpd";

/// `Date` layout, rendered in the server's local time zone.
const DATE_FORMAT: &str = "%a %b %d %H:%M:%S %:z %Y";

/// Renders a response into a single buffer.
///
/// Header order is fixed: status line, `Allow` (if any), `Date`, `Server`,
/// `Connection: Closed`, then `Content-Length`/`Content-Type` and the body
/// when one is present.
pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        resp.version,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    if let Some(methods) = &resp.allow {
        let joined = methods
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        push_header(&mut buf, "Allow", &joined);
    }

    push_header(&mut buf, "Date", &Local::now().format(DATE_FORMAT).to_string());
    push_header(&mut buf, "Server", SERVER_NAME);
    push_header(&mut buf, "Connection", "Closed");

    match (&resp.body, resp.content_length()) {
        (Some(body), Some(length)) => {
            push_header(&mut buf, "Content-Length", &length.to_string());
            push_header(
                &mut buf,
                "Content-Type",
                resp.content_type.as_deref().unwrap_or("application/octet-stream"),
            );
            buf.extend_from_slice(b"\r\n");
            buf.extend_from_slice(body);
        }
        _ => buf.extend_from_slice(b"\r\n"),
    }

    buf
}

fn push_header(buf: &mut Vec<u8>, key: &str, value: &str) {
    buf.extend_from_slice(key.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
            written: 0,
        }
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
