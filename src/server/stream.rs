use axum::body::{ Body, Bytes };
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Split text into alternating word and whitespace runs, each run its own
/// token. Lossless: concatenating the tokens reconstructs the input exactly.
pub fn chunk_words(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_whitespace = None;

    for ch in text.chars() {
        let ws = ch.is_whitespace();
        if in_whitespace != Some(ws) && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        in_whitespace = Some(ws);
        current.push(ch);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Response body that emits the reply one token at a time with a fixed
/// inter-chunk delay, simulating incremental generation. A spawned task
/// feeds the channel so the delay never blocks the handler; a dropped
/// receiver (client went away) stops the feed.
pub fn chunked_body(text: String, delay: Duration) -> Body {
    let tokens = chunk_words(&text);
    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(32);

    tokio::spawn(async move {
        for token in tokens {
            if tx.send(Ok(Bytes::from(token))).await.is_err() {
                return;
            }
            tokio::time::sleep(delay).await;
        }
    });

    Body::from_stream(ReceiverStream::new(rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_lossless(text: &str) {
        assert_eq!(chunk_words(text).concat(), text);
    }

    #[test]
    fn chunking_is_lossless() {
        assert_lossless("");
        assert_lossless("single");
        assert_lossless("I have a headache");
        assert_lossless("  leading and trailing  ");
        assert_lossless("line one\n\nline two\n- bullet\t indented");
        assert_lossless("h\u{e9}llo   w\u{f6}rld \u{1f44b}");
    }

    #[test]
    fn whitespace_runs_are_their_own_tokens() {
        let tokens = chunk_words("a  b\nc");
        assert_eq!(tokens, vec!["a", "  ", "b", "\n", "c"]);
    }

    #[tokio::test]
    async fn body_concatenates_to_the_full_text() {
        let text = "Thank you for sharing your symptoms.\n\n1. How long?";
        let body = chunked_body(text.to_string(), Duration::from_millis(1));
        let collected = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(collected, text.as_bytes());
    }

    #[tokio::test]
    async fn empty_reply_yields_an_empty_body() {
        let body = chunked_body(String::new(), Duration::from_millis(0));
        let collected = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert!(collected.is_empty());
    }
}
