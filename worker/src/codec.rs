//! Message framing for the worker's stdio pipes.
//!
//! Each message is `Content-Length: N\r\n\r\n{json}`. The length prefix keeps
//! message boundaries intact regardless of payload size (whole files travel
//! through here), and a configurable ceiling keeps a misbehaving worker from
//! forcing an unbounded allocation.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Default frame ceiling (64 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Reads length-prefixed frames from an async reader.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    max_frame_bytes: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_frame_bytes(reader, DEFAULT_MAX_FRAME_BYTES)
    }

    pub fn with_max_frame_bytes(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_frame_bytes,
        }
    }

    /// Read the next frame body as raw bytes.
    ///
    /// Returns `Ok(None)` on EOF before any header byte (clean shutdown).
    /// Errors here leave the stream position undefined; callers should stop reading.
    pub async fn read_frame_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(content_length) = self.read_headers().await? else {
            return Ok(None);
        };

        if content_length > self.max_frame_bytes {
            bail!(
                "Content-Length {content_length} exceeds maximum {}",
                self.max_frame_bytes
            );
        }

        let mut body = vec![0u8; content_length];
        self.reader
            .read_exact(&mut body)
            .await
            .context("reading frame body")?;
        Ok(Some(body))
    }

    /// Read the next frame and parse it as JSON.
    pub async fn read_frame(&mut self) -> Result<Option<serde_json::Value>> {
        match self.read_frame_bytes().await? {
            Some(body) => {
                let value = serde_json::from_slice(&body).context("parsing frame body")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn read_headers(&mut self) -> Result<Option<usize>> {
        let mut content_length: Option<usize> = None;
        let mut line = String::new();
        let mut saw_any_header_bytes = false;

        loop {
            line.clear();
            let bytes_read = self
                .reader
                .read_line(&mut line)
                .await
                .context("reading header line")?;

            if bytes_read == 0 {
                // EOF is clean only before the first header byte.
                if !saw_any_header_bytes {
                    return Ok(None);
                }
                bail!("unexpected EOF while reading headers");
            }
            saw_any_header_bytes = true;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }

            if let Some((key, value)) = trimmed.split_once(':')
                && key.trim().eq_ignore_ascii_case("Content-Length")
            {
                let len: usize = value
                    .trim()
                    .parse()
                    .context("invalid Content-Length value")?;
                content_length = Some(len);
            }
        }

        match content_length {
            Some(len) => Ok(Some(len)),
            None => bail!("missing Content-Length header"),
        }
    }
}

/// Writes length-prefixed JSON frames to an async writer.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_frame<T: Serialize + ?Sized>(&mut self, msg: &T) -> Result<()> {
        let body = serde_json::to_vec(msg).context("serializing frame")?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        self.writer
            .write_all(header.as_bytes())
            .await
            .context("writing frame header")?;
        self.writer
            .write_all(&body)
            .await
            .context("writing frame body")?;
        self.writer.flush().await.context("flushing frame")?;

        Ok(())
    }
}
