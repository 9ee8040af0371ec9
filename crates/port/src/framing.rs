//! Length-delimited JSON framing over any `AsyncRead + AsyncWrite` (§6).
//!
//! In production the underlying stream is the worker's stdin/stdout, but
//! framing is generic so tests can drive it over an in-memory duplex pipe.
//! Each frame on the wire is a 4-byte big-endian length prefix followed by
//! that many bytes of UTF-8 JSON, via `tokio_util`'s `LengthDelimitedCodec`
//! — the same framing primitive the teacher's `stream-hub` Cargo.toml
//! already pulls in `tokio-util` for, unused there.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use crate::protocol::{decode_command, Command, CommandDecodeError, Envelope};

fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_type::<u32>()
        .new_codec()
}

/// Reads framed inbound commands off `reader`.
pub struct CommandReader<R> {
    inner: FramedRead<R, LengthDelimitedCodec>,
}

impl<R: AsyncRead + Unpin> CommandReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: FramedRead::new(reader, codec()),
        }
    }

    /// Reads the next frame and decodes it as a [`Command`]. Returns
    /// `Ok(None)` when the underlying stream has ended (host closed the
    /// port). A frame that fails to decode surfaces as
    /// `Err(CommandDecodeError)` so the caller can reply with
    /// `error{code:"BAD_PAYLOAD"}` (§7) without tearing down the loop.
    pub async fn next_command(&mut self) -> anyhow::Result<Option<Result<Command, CommandDecodeError>>> {
        match self.inner.next().await {
            Some(Ok(bytes)) => Ok(Some(decode_command(&bytes))),
            Some(Err(err)) => Err(err.into()),
            None => Ok(None),
        }
    }
}

/// Writes framed outbound events onto `writer`.
pub struct EventWriter<W> {
    inner: FramedWrite<W, LengthDelimitedCodec>,
}

impl<W: AsyncWrite + Unpin> EventWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: FramedWrite::new(writer, codec()),
        }
    }

    pub async fn send(&mut self, envelope: &Envelope) -> anyhow::Result<()> {
        let json = serde_json::to_vec(envelope)?;
        self.inner.send(Bytes::from(json)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;
    use crate::protocol::{AckPayload, Event};

    #[tokio::test]
    async fn round_trips_a_command_through_the_codec() {
        let (client, server) = duplex(4096);
        let (_read_half, mut write_half) = tokio::io::split(client);
        let mut reader = CommandReader::new(tokio::io::split(server).0);

        let mut writer = FramedWrite::new(&mut write_half, codec());
        let payload = br#"{"type":"shutdown","req_id":"z"}"#;
        writer.send(Bytes::from(payload.to_vec())).await.unwrap();

        let command = reader.next_command().await.unwrap().unwrap().unwrap();
        assert_eq!(command.req_id(), Some("z"));
    }

    #[tokio::test]
    async fn writes_a_length_delimited_event_frame() {
        let (a, b) = duplex(4096);
        let (read_half, _write_unused) = tokio::io::split(a);
        let (_read_unused, write_half) = tokio::io::split(b);

        let mut writer = EventWriter::new(write_half);
        let envelope = Envelope::new(
            Event::Ack(AckPayload::ok("shutdown")),
            Some("r1".to_string()),
        );
        writer.send(&envelope).await.unwrap();

        let mut reader = FramedRead::new(read_half, codec());
        let frame = reader.next().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(value["type"], "ack");
        assert_eq!(value["req_id"], "r1");
    }
}
