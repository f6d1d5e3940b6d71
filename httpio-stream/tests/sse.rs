use std::io;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use httpio_stream::{SseCallbacks, SseEvent, StreamError, StreamOptions, stream_sse};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

fn chunked(chunks: &[&'static str]) -> impl AsyncRead + Unpin {
    let items: Vec<io::Result<Bytes>> = chunks.iter().map(|c| Ok(Bytes::from(*c))).collect();
    StreamReader::new(futures::stream::iter(items))
}

#[tokio::test]
async fn events_across_chunks_with_crlf() {
    let mut events = Vec::new();
    let mut handler = SseCallbacks::new(|event| {
        events.push(event);
        Ok(())
    });
    stream_sse(
        chunked(&["id: 1\r\nevent: chat\r\nda", "ta: hel", "lo\r\n\r\ndata: bye\r\n\r\n"]),
        &StreamOptions::sse(),
        &mut handler,
    )
    .await
    .unwrap();
    drop(handler);

    assert_eq!(
        events,
        vec![
            SseEvent {
                id: "1".into(),
                event: "chat".into(),
                data: "hello".into(),
                retry: 0,
            },
            SseEvent {
                id: String::new(),
                event: "message".into(),
                data: "bye".into(),
                retry: 0,
            },
        ]
    );
}

#[tokio::test]
async fn final_event_without_blank_line_is_dispatched() {
    let mut events = Vec::new();
    let mut handler = SseCallbacks::new(|event: SseEvent| {
        events.push(event.data);
        Ok(())
    });
    stream_sse(
        &b": comment\ndata: tail"[..],
        &StreamOptions::sse(),
        &mut handler,
    )
    .await
    .unwrap();
    drop(handler);
    assert_eq!(events, vec!["tail"]);
}

#[tokio::test]
async fn lifecycle_hooks_wrap_the_stream() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (open_log, event_log, close_log) = (log.clone(), log.clone(), log.clone());
    let mut handler = SseCallbacks::new(move |event: SseEvent| {
        event_log.lock().unwrap().push(format!("event:{}", event.data));
        Ok(())
    })
    .on_open(move || {
        open_log.lock().unwrap().push("open".to_owned());
        Ok(())
    })
    .on_close(move || close_log.lock().unwrap().push("close".to_owned()));

    stream_sse(&b"data: a\n\ndata: b\n\n"[..], &StreamOptions::sse(), &mut handler)
        .await
        .unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["open", "event:a", "event:b", "close"]);
}

#[tokio::test]
async fn handler_error_stops_stream_and_still_closes() {
    let closed = Arc::new(Mutex::new(false));
    let flag = closed.clone();
    let mut seen = 0;
    let mut handler = SseCallbacks::new(|_event| {
        seen += 1;
        Err(io::Error::other("enough").into())
    })
    .on_close(move || *flag.lock().unwrap() = true);

    let err = stream_sse(
        &b"data: 1\n\ndata: 2\n\n"[..],
        &StreamOptions::sse(),
        &mut handler,
    )
    .await
    .unwrap_err();
    drop(handler);

    assert_eq!(seen, 1);
    assert!(err.handler_error::<io::Error>().is_some());
    assert!(*closed.lock().unwrap());
}

#[tokio::test]
async fn failing_open_hook_prevents_reading() {
    let mut events = 0;
    let mut handler = SseCallbacks::new(|_event| {
        events += 1;
        Ok(())
    })
    .on_open(|| Err("not ready".into()));

    let err = stream_sse(&b"data: x\n\n"[..], &StreamOptions::sse(), &mut handler)
        .await
        .unwrap_err();
    drop(handler);
    assert!(matches!(err, StreamError::Handler(_)));
    assert_eq!(events, 0);
}

#[tokio::test]
async fn oversized_line_is_rejected() {
    let mut handler = SseCallbacks::new(|_event| Ok(()));
    let body = format!("data: {}\n\n", "x".repeat(64));
    let options = StreamOptions::sse().with_max_line_length(32);
    let err = stream_sse(body.as_bytes(), &options, &mut handler)
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::LineTooLong { limit: 32 }));
}

#[tokio::test]
async fn plain_closure_is_a_handler() {
    let mut count = 0;
    let mut handler = |_event: SseEvent| -> Result<(), httpio_stream::BoxError> {
        count += 1;
        Ok(())
    };
    stream_sse(&b"data: a\n\ndata: b\n\n"[..], &StreamOptions::sse(), &mut handler)
        .await
        .unwrap();
    assert_eq!(count, 2);
}
