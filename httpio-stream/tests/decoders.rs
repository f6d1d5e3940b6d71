use std::io;

use bytes::Bytes;
use httpio_stream::{Delimiter, StreamError, StreamOptions, stream_into, stream_json, stream_lines, stream_raw};
use serde::Deserialize;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

/// A reader that hands out `chunks` one read at a time.
fn chunked(chunks: &[&'static str]) -> impl AsyncRead + Unpin {
    let items: Vec<io::Result<Bytes>> = chunks.iter().map(|c| Ok(Bytes::from(*c))).collect();
    StreamReader::new(futures::stream::iter(items))
}

#[derive(Debug)]
struct Stop;

impl std::fmt::Display for Stop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("stop")
    }
}

impl std::error::Error for Stop {}

#[tokio::test]
async fn raw_forwards_every_chunk() {
    let mut seen = Vec::new();
    stream_raw(chunked(&["ab", "cde", "f"]), &StreamOptions::new(), |chunk| {
        seen.push(chunk.to_vec());
        Ok::<_, Stop>(())
    })
    .await
    .unwrap();
    assert_eq!(seen.concat(), b"abcdef");
    assert!(seen.iter().all(|chunk| !chunk.is_empty()));
}

#[tokio::test]
async fn raw_respects_buffer_size() {
    let mut sizes = Vec::new();
    let options = StreamOptions::new().with_buffer_size(3);
    stream_raw(&b"0123456789"[..], &options, |chunk| {
        sizes.push(chunk.len());
        Ok::<_, Stop>(())
    })
    .await
    .unwrap();
    assert_eq!(sizes, vec![3, 3, 3, 1]);
}

#[tokio::test]
async fn handler_error_stops_the_stream_and_is_returned() {
    let mut calls = 0;
    let err = stream_lines(chunked(&["a\nb\nc\n"]), &StreamOptions::new(), |_| {
        calls += 1;
        if calls == 2 {
            Err(Stop)
        } else {
            Ok(())
        }
    })
    .await
    .unwrap_err();
    assert_eq!(calls, 2);
    assert!(err.handler_error::<Stop>().is_some());
}

#[tokio::test]
async fn lines_split_across_chunk_boundaries() {
    let mut lines = Vec::new();
    stream_lines(chunked(&["fir", "st\r\nsec", "ond\nthird"]), &StreamOptions::new(), |line| {
        lines.push(String::from_utf8(line.to_vec()).unwrap());
        Ok::<_, Stop>(())
    })
    .await
    .unwrap();
    assert_eq!(lines, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn lines_with_custom_delimiter() {
    let mut lines = Vec::new();
    let options = StreamOptions::new().with_delimiter("\r\n\r\n");
    stream_lines(chunked(&["one\r\n", "\r\ntwo\r\n\r", "\n"]), &options, |line| {
        lines.push(String::from_utf8(line.to_vec()).unwrap());
        Ok::<_, Stop>(())
    })
    .await
    .unwrap();
    assert_eq!(lines, vec!["one", "two"]);
}

#[tokio::test]
async fn empty_sequence_delimiter_falls_back_to_newline() {
    let mut lines = Vec::new();
    let mut options = StreamOptions::new();
    options.delimiter = Delimiter::Sequence(Vec::new());
    stream_lines(chunked(&["a\r\nb", "\n", "c"]), &options, |line| {
        lines.push(String::from_utf8(line.to_vec()).unwrap());
        Ok::<_, Stop>(())
    })
    .await
    .unwrap();
    assert_eq!(lines, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn ndjson_skips_blank_lines_and_keeps_raw_payloads() {
    let mut values = Vec::new();
    let input = "{\"a\":1}\n\n[1, 2]\n  \n\"text\"\n";
    stream_json(input.as_bytes(), &StreamOptions::new(), |raw| {
        values.push(raw.get().to_owned());
        Ok::<_, Stop>(())
    })
    .await
    .unwrap();
    assert_eq!(values, vec!["{\"a\":1}", "[1, 2]", "\"text\""]);
}

#[tokio::test]
async fn malformed_ndjson_reports_the_line() {
    let err = stream_json(
        "{\"ok\":true}\n{broken\n".as_bytes(),
        &StreamOptions::new(),
        |_| Ok::<_, Stop>(()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StreamError::Json { line: 2, .. }));
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
}

#[tokio::test]
async fn typed_decoding_builds_a_fresh_value_per_line() {
    let mut users = Vec::new();
    let input = "{\"id\":1,\"name\":\"ada\"}\n{\"id\":2,\"name\":\"linus\"}\n";
    stream_into(chunked(&[input]), &StreamOptions::new(), |user: User| {
        users.push(user);
        Ok::<_, Stop>(())
    })
    .await
    .unwrap();
    assert_eq!(
        users,
        vec![
            User { id: 1, name: "ada".into() },
            User { id: 2, name: "linus".into() },
        ]
    );
}

#[tokio::test]
async fn typed_decoding_fails_on_type_mismatch() {
    let err = stream_into(
        "{\"id\":\"one\",\"name\":\"ada\"}\n".as_bytes(),
        &StreamOptions::new(),
        |_: User| Ok::<_, Stop>(()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StreamError::Json { line: 1, .. }));
}

#[tokio::test]
async fn read_errors_surface_as_io() {
    let items: Vec<io::Result<Bytes>> = vec![
        Ok(Bytes::from("partial\n")),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
    ];
    let reader = StreamReader::new(futures::stream::iter(items));
    let mut lines = 0;
    let err = stream_lines(reader, &StreamOptions::new(), |_| {
        lines += 1;
        Ok::<_, Stop>(())
    })
    .await
    .unwrap_err();
    assert_eq!(lines, 1);
    assert!(matches!(err, StreamError::Io(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
}
