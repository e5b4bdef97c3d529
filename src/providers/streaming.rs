use std::collections::VecDeque;
use std::convert::Infallible;
use std::fmt::Display;
use std::pin::Pin;

use axum::body::Bytes;
use futures_util::StreamExt;
use tokio_stream::Stream;

/// 按行切分后的上游 body。错误不向下游传播，因此 Error 为 Infallible。
pub type LineStream = Pin<Box<dyn Stream<Item = Result<Bytes, Infallible>> + Send>>;

/// 将任意分块的字节流重组为以 `\n` 结尾的行，分隔符保留在行内。
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let (line, tail) = rest.split_at(pos + 1);
            if self.pending.is_empty() {
                lines.push(Bytes::copy_from_slice(line));
            } else {
                self.pending.extend_from_slice(line);
                lines.push(Bytes::from(std::mem::take(&mut self.pending)));
            }
            rest = tail;
        }
        self.pending.extend_from_slice(rest);
        lines
    }

    /// Bytes seen since the last newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Relays complete lines in arrival order.
///
/// Ends at end of data, dropping an unterminated final fragment. A read error
/// ends the stream the same way; headers are already on the wire by then.
pub fn line_stream<S, E>(upstream: S) -> LineStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = (Box::pin(upstream), LineSplitter::default(), VecDeque::new());
    let lines = futures_util::stream::unfold(
        state,
        |(mut upstream, mut splitter, mut ready)| async move {
            loop {
                if let Some(line) = ready.pop_front() {
                    return Some((Ok(line), (upstream, splitter, ready)));
                }
                match upstream.next().await {
                    Some(Ok(chunk)) => ready.extend(splitter.push(&chunk)),
                    Some(Err(e)) => {
                        tracing::warn!("upstream body read failed, ending relay: {}", e);
                        return None;
                    }
                    None => {
                        tracing::debug!("upstream body finished");
                        if splitter.pending_len() > 0 {
                            tracing::debug!(
                                bytes = splitter.pending_len(),
                                "dropping unterminated trailing line"
                            );
                        }
                        return None;
                    }
                }
            }
        },
    );
    Box::pin(lines)
}
