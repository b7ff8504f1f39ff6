use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::http::parser::{ParseError, parse_http_request};
use crate::http::request::Request;
use crate::http::writer::ResponseWriter;
use crate::resource::Dispatcher;

/// One client connection: a single request, a single response, then close.
pub struct Connection<S = TcpStream> {
    stream: S,
    buffer: BytesMut,
    at_eof: bool,
    state: ConnectionState,
    dispatcher: Dispatcher,
}

pub enum ConnectionState {
    Reading,
    Processing(Result<Request, ParseError>),
    Writing(ResponseWriter),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, dispatcher: Dispatcher) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            at_eof: false,
            state: ConnectionState::Reading,
            dispatcher,
        }
    }

    /// Drives the connection to completion and closes the stream on every
    /// path. Close failures are swallowed; only transport errors from the
    /// request itself are returned.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let result = self.drive().await;
        self.close().await;
        result
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        loop {
            match &mut self.state {
                ConnectionState::Reading => match self.read_request().await? {
                    Some(parsed) => {
                        self.state = ConnectionState::Processing(parsed);
                    }
                    None => {
                        self.state = ConnectionState::Closed;
                    }
                },

                ConnectionState::Processing(parsed) => {
                    let response = self.dispatcher.handle(parsed).await;
                    let writer = ResponseWriter::new(&response);
                    self.state = ConnectionState::Writing(writer);
                }

                ConnectionState::Writing(writer) => {
                    writer.write_to_stream(&mut self.stream).await?;
                    // No keep-alive: one exchange per connection.
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Reads until the parser can decide. Returns `None` if the peer closed
    /// without sending anything.
    pub async fn read_request(&mut self) -> anyhow::Result<Option<Result<Request, ParseError>>> {
        loop {
            match parse_http_request(&self.buffer, self.at_eof) {
                Ok((request, _consumed)) => return Ok(Some(Ok(request))),

                Err(e) if e.is_malformed() || self.at_eof => return Ok(Some(Err(e))),

                Err(_) => {
                    // Need more data → fall through to read
                }
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;

            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                self.at_eof = true;
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::trace!(error = %e, "Ignoring error while closing connection");
        }
        self.state = ConnectionState::Closed;
    }
}
