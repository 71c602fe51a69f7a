//! Server-sent-event decoding and the chunk pump shared by HTTP providers.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ChunkStream, ProviderError};
use crate::domain::StreamChunk;

/// Splits a byte stream into complete `data:` payloads.
///
/// Lines may be split across network reads; partial lines are buffered
/// until their newline arrives.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed raw bytes, returning the `data:` payloads of every completed line.
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(data) = line.trim().strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
        payloads
    }
}

/// Spawn a task that reads `response` and pushes parsed chunks into a
/// single-slot channel.
///
/// `parse` maps one `data:` payload to a chunk, or `None` to skip it. The
/// pump ends after a terminal chunk, on a transport error, at end of body,
/// or as soon as the consumer drops the returned stream. Ending drops
/// `response`, which releases the connection.
pub(crate) fn pump_chunks<F>(
    provider: &'static str,
    label: &'static str,
    response: reqwest::Response,
    mut parse: F,
) -> ChunkStream
where
    F: FnMut(&str) -> Option<StreamChunk> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let mut body = Box::pin(response.bytes_stream());
        let mut decoder = SseDecoder::default();

        loop {
            let next = tokio::select! {
                next = body.next() => next,
                _ = tx.closed() => {
                    tracing::debug!(provider, "Stream consumer gone, closing upstream");
                    return;
                }
            };

            let bytes = match next {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => {
                    let _ = tx
                        .send(Err(ProviderError::transport(provider, label, &e)))
                        .await;
                    return;
                }
                None => return,
            };

            for payload in decoder.feed(&bytes) {
                let Some(chunk) = parse(&payload) else {
                    continue;
                };
                let done = chunk.done;
                if tx.send(Ok(chunk)).await.is_err() || done {
                    return;
                }
            }
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_extracts_data_lines() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.feed(b"event: ping\ndata: {\"a\":1}\n\ndata: [DONE]\n");
        assert_eq!(payloads, vec!["{\"a\":1}", "[DONE]"]);
    }

    #[test]
    fn test_decoder_buffers_partial_lines() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: {\"text\":\"Hel").is_empty());
        let payloads = decoder.feed(b"lo\"}\r\n");
        assert_eq!(payloads, vec!["{\"text\":\"Hello\"}"]);
    }

    #[test]
    fn test_decoder_handles_split_utf8() {
        let mut decoder = SseDecoder::default();
        let text = "data: caf\u{e9}\n".as_bytes();
        let (head, tail) = text.split_at(text.len() - 2);
        assert!(decoder.feed(head).is_empty());
        assert_eq!(decoder.feed(tail), vec!["caf\u{e9}"]);
    }
}
