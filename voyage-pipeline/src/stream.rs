//! Bridge between async downloads and blocking decoders.
//!
//! The decompressors and the XML reader are synchronous, so they run on a
//! blocking task and pull downloaded chunks through a bounded channel. The
//! channel doubles as backpressure: the download pauses while the consumer
//! is behind.

use std::io::{self, Read};

use bytes::{Buf, Bytes};
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::error::Result;

/// Blocking `Read` over a channel of downloaded chunks. A transport error
/// pushed into the channel surfaces as a read error; a closed channel is
/// end of stream.
pub(crate) struct ChannelReader {
    rx: mpsc::Receiver<io::Result<Bytes>>,
    current: Bytes,
}

impl ChannelReader {
    pub(crate) fn new(rx: mpsc::Receiver<io::Result<Bytes>>) -> ChannelReader {
        ChannelReader {
            rx,
            current: Bytes::new(),
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.current.is_empty() {
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => self.current = chunk,
                Some(Err(e)) => return Err(e),
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        Ok(n)
    }
}

/// Forwards a response body into the chunk channel. Stops early when the
/// consumer hangs up (it reports its own error); a transport error is
/// relayed to the consumer and returned.
pub(crate) async fn pump_body(
    response: reqwest::Response,
    tx: mpsc::Sender<io::Result<Bytes>>,
) -> Result<()> {
    let mut body = response.bytes_stream();
    while let Some(next) = body.next().await {
        match next {
            Ok(chunk) => {
                if tx.send(Ok(chunk)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                let relay = io::Error::other(format!("download failed: {e}"));
                let _ = tx.send(Err(relay)).await;
                return Err(e.into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chunks_reassemble_in_order() {
        let (tx, rx) = mpsc::channel(4);
        for part in [&b"hel"[..], b"lo ", b"world"] {
            tx.send(Ok(Bytes::copy_from_slice(part))).await.unwrap();
        }
        drop(tx);

        let content = tokio::task::spawn_blocking(move || {
            let mut reader = ChannelReader::new(rx);
            let mut out = String::new();
            reader.read_to_string(&mut out).map(|_| out)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(content, "hello world");
    }

    #[tokio::test]
    async fn relayed_error_surfaces_as_read_error() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Ok(Bytes::from_static(b"partial"))).await.unwrap();
        tx.send(Err(io::Error::other("connection reset")))
            .await
            .unwrap();
        drop(tx);

        let err = tokio::task::spawn_blocking(move || {
            let mut reader = ChannelReader::new(rx);
            let mut out = String::new();
            reader.read_to_string(&mut out).err()
        })
        .await
        .unwrap()
        .unwrap();
        assert!(err.to_string().contains("connection reset"));
    }
}
