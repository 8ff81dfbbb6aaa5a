//! SSE relay for the scraper's streaming endpoint.
//!
//! Wraps the upstream byte stream, reassembles complete lines across chunk
//! boundaries, and re-emits each `data:` record with its own `\n\n`
//! terminator. The terminal `{"status":"complete","result":{"images":[..]}}`
//! record has its image list replaced by deduplicated [`ImageRecord`]s on the
//! way through. Anything that does not parse is forwarded verbatim.
//!
//! [`ImageRecord`]: crate::types::ImageRecord

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::pipeline::dedupe_urls;

const DATA_PREFIX: &str = "data:";

/// Incremental UTF-8 decoder.
///
/// Holds back a multi-byte sequence split across chunks until the rest
/// arrives. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `chunk` (plus any held-back bytes) as is complete.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    out.push_str(text);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // Incomplete sequence at the end; wait for more bytes
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Bytes still waiting for the rest of their character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Stream adapter turning upstream SSE bytes into re-framed, patched records.
///
/// Ends when upstream ends or fails. An unterminated trailing line is
/// dropped in both cases; upstream errors are logged, not forwarded.
pub struct SseRelay<E> {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>,
    decoder: Utf8Decoder,
    buffer: String,
    ready: VecDeque<Bytes>,
    finished: bool,
}

impl<E: Display + 'static> SseRelay<E> {
    pub fn new(upstream: impl Stream<Item = Result<Bytes, E>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(upstream),
            decoder: Utf8Decoder::new(),
            buffer: String::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    /// Move every complete line out of the buffer; keep the partial tail.
    fn drain_complete_lines(&mut self) {
        let Some(last_newline) = self.buffer.rfind('\n') else {
            return;
        };
        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);

        for line in complete.lines() {
            if let Some(record) = relay_line(line) {
                self.ready.push_back(record);
            }
        }
    }
}

impl<E: Display + 'static> Stream for SseRelay<E> {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(record) = this.ready.pop_front() {
                return Poll::Ready(Some(record));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let text = this.decoder.decode(&bytes);
                    this.buffer.push_str(&text);
                    this.drain_complete_lines();
                }
                Poll::Ready(Some(Err(e))) => {
                    warn!(error = %e, "Upstream stream failed, closing relay");
                    this.buffer.clear();
                    this.finished = true;
                }
                Poll::Ready(None) => {
                    if !this.buffer.trim().is_empty() || this.decoder.pending_len() > 0 {
                        debug!(
                            dropped_bytes = this.buffer.len() + this.decoder.pending_len(),
                            "Dropping unterminated trailing line"
                        );
                    }
                    this.buffer.clear();
                    this.finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Re-frame one complete line.
///
/// Blank lines are dropped since every record gets its own separator.
/// Other field lines (`event:`, `id:`, comments) keep a single newline so
/// they stay attached to the record that follows.
fn relay_line(line: &str) -> Option<Bytes> {
    if line.is_empty() {
        return None;
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Some(Bytes::from(format!("{}\n", line)));
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    let framed = match serde_json::from_str::<Value>(payload) {
        Ok(mut value) => {
            if let Some(removed) = patch_complete_record(&mut value) {
                debug!(removed, "Deduplicated images in completion record");
            }
            format!("data: {}\n\n", value)
        }
        Err(_) => format!("{}\n\n", line),
    };
    Some(Bytes::from(framed))
}

/// Replace `result.images` of a completion record with deduplicated records.
///
/// Returns the number of duplicates removed, or `None` if the payload is not
/// a completion record carrying a list of URL strings.
pub fn patch_complete_record(value: &mut Value) -> Option<usize> {
    if value.get("status").and_then(Value::as_str) != Some("complete") {
        return None;
    }
    let images = value.get_mut("result")?.get_mut("images")?;
    let urls = images
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect::<Option<Vec<String>>>()?;

    let deduped = dedupe_urls(&urls);
    *images = serde_json::to_value(&deduped.images).ok()?;
    Some(deduped.removed_count)
}

/// How a [`pump`] run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpOutcome {
    pub records: usize,
    /// The receiving side went away before upstream finished
    pub downstream_closed: bool,
}

/// Copy relayed records into `tx` until upstream ends or `tx` is closed.
///
/// Both ends are released when this returns: the relay (and with it the
/// upstream connection) is dropped here, and `tx` is dropped so the
/// receiver sees end-of-stream.
pub async fn pump<E: Display + 'static>(
    mut relay: SseRelay<E>,
    tx: mpsc::Sender<Bytes>,
) -> PumpOutcome {
    let mut records = 0;
    while let Some(record) = relay.next().await {
        if tx.send(record).await.is_err() {
            debug!(records, "Downstream closed, stopping relay");
            return PumpOutcome {
                records,
                downstream_closed: true,
            };
        }
        records += 1;
    }
    PumpOutcome {
        records,
        downstream_closed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&[u8]]) -> Vec<Result<Bytes, String>> {
        parts.iter().map(|p| Ok(Bytes::copy_from_slice(p))).collect()
    }

    async fn relay_to_string(input: Vec<Result<Bytes, String>>) -> String {
        let relay = SseRelay::new(futures::stream::iter(input));
        let out: Vec<Bytes> = relay.collect().await;
        out.iter()
            .map(|b| String::from_utf8(b.to_vec()).unwrap())
            .collect()
    }

    fn data_payloads(output: &str) -> Vec<Value> {
        output
            .split("\n\n")
            .filter_map(|record| record.strip_prefix("data: "))
            .map(|json| serde_json::from_str(json).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn line_split_across_chunks_is_reassembled() {
        let out = relay_to_string(chunks(&[
            b"data: {\"status\":\"progr",
            b"ess\",\"found\":3}\n\n",
        ]))
        .await;

        assert_eq!(out, "data: {\"status\":\"progress\",\"found\":3}\n\n");
        let payloads = data_payloads(&out);
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["found"], 3);
    }

    #[tokio::test]
    async fn completion_record_images_are_deduplicated() {
        let out = relay_to_string(chunks(&[
            b"data: {\"status\":\"progress\"}\n\n",
            b"data: {\"status\":\"complete\",\"result\":{\"images\":[\"https://x.com/img-300x200.jpg\",\"https://x.com/img.jpg\",\"https://x.com/b.png\"]}}\n\n",
        ]))
        .await;

        let payloads = data_payloads(&out);
        assert_eq!(payloads.len(), 2);

        let images = payloads[1]["result"]["images"].as_array().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0]["id"], 1);
        assert_eq!(images[0]["src"], "https://x.com/img-300x200.jpg");
        assert_eq!(images[1]["id"], 2);
        assert_eq!(images[1]["name"], "b.png");
    }

    #[tokio::test]
    async fn other_payloads_keep_their_shape_and_key_order() {
        let out = relay_to_string(chunks(&[b"data: {\"z\":1,\"a\":{\"images\":[\"x\"]}}\n\n"])).await;
        assert_eq!(out, "data: {\"z\":1,\"a\":{\"images\":[\"x\"]}}\n\n");
    }

    #[tokio::test]
    async fn malformed_json_is_forwarded_verbatim() {
        let out = relay_to_string(chunks(&[
            b"data: {not json\n\n",
            b"data: {\"status\":\"progress\"}\n\n",
        ]))
        .await;

        assert_eq!(
            out,
            "data: {not json\n\ndata: {\"status\":\"progress\"}\n\n"
        );
    }

    #[tokio::test]
    async fn non_string_image_lists_are_left_alone() {
        let line = "data: {\"status\":\"complete\",\"result\":{\"images\":[1,2]}}\n\n";
        let out = relay_to_string(chunks(&[line.as_bytes()])).await;
        assert_eq!(out, line);
    }

    #[tokio::test]
    async fn field_lines_stay_attached_to_their_record() {
        let out = relay_to_string(chunks(&[b"event: progress\r\ndata: {\"n\":1}\r\n\r\n"])).await;
        assert_eq!(out, "event: progress\ndata: {\"n\":1}\n\n");
    }

    #[tokio::test]
    async fn unterminated_tail_is_dropped() {
        let out = relay_to_string(chunks(&[
            b"data: {\"n\":1}\n\n",
            b"data: {\"n\":2",
        ]))
        .await;
        assert_eq!(out, "data: {\"n\":1}\n\n");
    }

    #[tokio::test]
    async fn upstream_error_closes_without_partial_record() {
        let input = vec![
            Ok(Bytes::from_static(b"data: {\"n\":1}\n\ndata: {\"n\"")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b":2}\n\n")),
        ];
        let out = relay_to_string(input).await;
        assert_eq!(out, "data: {\"n\":1}\n\n");
    }

    #[tokio::test]
    async fn multibyte_character_split_across_chunks() {
        let line = "data: {\"title\":\"café ☕\"}\n\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let out = relay_to_string(chunks(&[&line[..split], &line[split..]])).await;
        assert_eq!(data_payloads(&out)[0]["title"], "café ☕");
    }

    #[test]
    fn decoder_replaces_invalid_sequences() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"ok\xFFok"), "ok\u{FFFD}ok");
        assert_eq!(decoder.decode(&[0xE2, 0x98]), "");
        assert_eq!(decoder.pending_len(), 2);
        assert_eq!(decoder.decode(&[0x95]), "☕");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[tokio::test]
    async fn pump_forwards_everything_then_closes() {
        let relay = SseRelay::new(futures::stream::iter(chunks(&[
            b"data: {\"n\":1}\n\ndata: {\"n\":2}\n\n",
        ])));
        let (tx, mut rx) = mpsc::channel(8);

        let outcome = pump(relay, tx).await;
        assert_eq!(
            outcome,
            PumpOutcome {
                records: 2,
                downstream_closed: false
            }
        );
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"data: {\"n\":1}\n\n"));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"data: {\"n\":2}\n\n"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn pump_stops_when_downstream_goes_away() {
        let upstream = futures::stream::iter(
            (0..100).map(|n| Ok::<_, String>(Bytes::from(format!("data: {{\"n\":{}}}\n\n", n)))),
        );
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let outcome = pump(SseRelay::new(upstream), tx).await;
        assert!(outcome.downstream_closed);
        assert_eq!(outcome.records, 0);
    }
}
