//! Response body produced by the middleware

use bytes::{Bytes, BytesMut};
use http_body::{Body, Frame, SizeHint};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

const CHUNK_SIZE: usize = 64 * 1024;

/// Body of a static response
#[derive(Default)]
pub enum StaticBody {
    #[default]
    Empty,
    /// Small generated documents (redirects, error pages).
    Full(Bytes),
    /// A byte window of an open file, streamed in chunks.
    File {
        file: File,
        remaining: u64,
        buf: BytesMut,
    },
}

impl StaticBody {
    pub fn empty() -> Self {
        StaticBody::Empty
    }

    pub fn full(bytes: impl Into<Bytes>) -> Self {
        StaticBody::Full(bytes.into())
    }

    /// Stream `len` bytes from the file's current position
    pub fn file(file: File, len: u64) -> Self {
        StaticBody::File {
            file,
            remaining: len,
            buf: BytesMut::new(),
        }
    }
}

impl std::fmt::Debug for StaticBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaticBody::Empty => f.write_str("StaticBody::Empty"),
            StaticBody::Full(b) => f.debug_tuple("StaticBody::Full").field(&b.len()).finish(),
            StaticBody::File { remaining, .. } => f
                .debug_struct("StaticBody::File")
                .field("remaining", remaining)
                .finish(),
        }
    }
}

impl Body for StaticBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        match self.get_mut() {
            StaticBody::Empty => Poll::Ready(None),
            StaticBody::Full(bytes) => {
                if bytes.is_empty() {
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Ok(Frame::data(std::mem::take(bytes)))))
            }
            StaticBody::File {
                file,
                remaining,
                buf,
            } => {
                if *remaining == 0 {
                    return Poll::Ready(None);
                }

                let want = (*remaining).min(CHUNK_SIZE as u64) as usize;
                if buf.len() < want {
                    buf.resize(want, 0);
                }

                let mut read_buf = ReadBuf::new(&mut buf[..want]);
                ready!(Pin::new(file).poll_read(cx, &mut read_buf))?;
                let n = read_buf.filled().len();

                if n == 0 {
                    // file shrank underneath us
                    *remaining = 0;
                    return Poll::Ready(Some(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "file ended before the advertised length",
                    ))));
                }

                *remaining -= n as u64;
                let chunk = buf.split_to(n).freeze();
                Poll::Ready(Some(Ok(Frame::data(chunk))))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            StaticBody::Empty => true,
            StaticBody::Full(bytes) => bytes.is_empty(),
            StaticBody::File { remaining, .. } => *remaining == 0,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            StaticBody::Empty => SizeHint::with_exact(0),
            StaticBody::Full(bytes) => SizeHint::with_exact(bytes.len() as u64),
            StaticBody::File { remaining, .. } => SizeHint::with_exact(*remaining),
        }
    }
}
