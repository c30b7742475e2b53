//! AWS event-stream framing for `invoke-with-response-stream`.
//!
//! Every message on the wire is laid out as
//!
//! ```text
//! [total length u32][headers length u32][prelude crc u32][headers][payload][message crc u32]
//! ```
//!
//! with big-endian integers and CRC-32 checksums.  [`EventStreamCodec`] frames
//! raw bytes into [`Message`]s; [`completion_chunks`] turns the messages of a
//! Bedrock response into [`CompletionChunk`]s.

use base64::Engine;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::future;
use futures::stream::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, Encoder, FramedRead};

use crate::types::CompletionChunk;
use crate::{Error, Result};

const PRELUDE_LEN: usize = 12;
const CRC_LEN: usize = 4;
const MIN_MESSAGE_LEN: usize = PRELUDE_LEN + CRC_LEN;
const MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

/// Header carrying the message type (`event`, `exception` or `error`).
pub const MESSAGE_TYPE_HEADER: &str = ":message-type";
/// Header carrying the event type of an `event` message.
pub const EVENT_TYPE_HEADER: &str = ":event-type";
/// Header carrying the exception name of an `exception` message.
pub const EXCEPTION_TYPE_HEADER: &str = ":exception-type";
/// Header carrying the content type of the payload.
pub const CONTENT_TYPE_HEADER: &str = ":content-type";

/// A typed event-stream header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Bool(bool),
    Byte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    ByteArray(Bytes),
    String(String),
    Timestamp(i64),
    Uuid([u8; 16]),
}

impl HeaderValue {
    /// The string value, if this is a string header.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn type_tag(&self) -> u8 {
        match self {
            HeaderValue::Bool(true) => 0,
            HeaderValue::Bool(false) => 1,
            HeaderValue::Byte(_) => 2,
            HeaderValue::Int16(_) => 3,
            HeaderValue::Int32(_) => 4,
            HeaderValue::Int64(_) => 5,
            HeaderValue::ByteArray(_) => 6,
            HeaderValue::String(_) => 7,
            HeaderValue::Timestamp(_) => 8,
            HeaderValue::Uuid(_) => 9,
        }
    }
}

/// One framed event-stream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    headers: Vec<(String, HeaderValue)>,
    payload: Bytes,
}

impl Message {
    /// Creates a message.
    pub fn new(headers: Vec<(String, HeaderValue)>, payload: impl Into<Bytes>) -> Self {
        Self {
            headers,
            payload: payload.into(),
        }
    }

    /// An `event` message of the given event type with a JSON payload.
    pub fn event(event_type: &str, payload: impl Into<Bytes>) -> Self {
        Self::new(
            vec![
                string_header(MESSAGE_TYPE_HEADER, "event"),
                string_header(EVENT_TYPE_HEADER, event_type),
                string_header(CONTENT_TYPE_HEADER, "application/json"),
            ],
            payload,
        )
    }

    /// A `chunk` event wrapping a completion chunk the way Bedrock does.
    pub fn chunk(chunk: &CompletionChunk) -> Result<Self> {
        let inner = serde_json::to_vec(chunk)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(inner);
        let payload = serde_json::to_vec(&serde_json::json!({ "bytes": encoded }))?;
        Ok(Self::event("chunk", payload))
    }

    /// An `exception` message.
    pub fn exception(exception_type: &str, message: &str) -> Self {
        let payload = serde_json::json!({ "message": message }).to_string();
        Self::new(
            vec![
                string_header(MESSAGE_TYPE_HEADER, "exception"),
                string_header(EXCEPTION_TYPE_HEADER, exception_type),
                string_header(CONTENT_TYPE_HEADER, "application/json"),
            ],
            payload,
        )
    }

    /// All headers in wire order.
    pub fn headers(&self) -> &[(String, HeaderValue)] {
        &self.headers
    }

    /// Looks up a header by name.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Looks up a string header by name.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header(name).and_then(HeaderValue::as_str)
    }

    /// The raw payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

fn string_header(name: &str, value: &str) -> (String, HeaderValue) {
    (name.to_string(), HeaderValue::String(value.to_string()))
}

/// Frames and unframes event-stream messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventStreamCodec;

impl Decoder for EventStreamCodec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        if src.len() < PRELUDE_LEN {
            return Ok(None);
        }
        let total_len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        let headers_len = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;
        let prelude_crc = u32::from_be_bytes([src[8], src[9], src[10], src[11]]);
        if crc32fast::hash(&src[..8]) != prelude_crc {
            return Err(Error::streaming("event stream prelude checksum mismatch", None));
        }
        if !(MIN_MESSAGE_LEN..=MAX_MESSAGE_LEN).contains(&total_len)
            || headers_len > total_len - MIN_MESSAGE_LEN
        {
            return Err(Error::streaming(
                format!("invalid event stream frame: total {total_len}, headers {headers_len}"),
                None,
            ));
        }
        if src.len() < total_len {
            src.reserve(total_len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total_len).freeze();
        let body_end = total_len - CRC_LEN;
        let message_crc = u32::from_be_bytes([
            frame[body_end],
            frame[body_end + 1],
            frame[body_end + 2],
            frame[body_end + 3],
        ]);
        if crc32fast::hash(&frame[..body_end]) != message_crc {
            return Err(Error::streaming("event stream message checksum mismatch", None));
        }
        let headers_end = PRELUDE_LEN + headers_len;
        let headers = parse_headers(&frame[PRELUDE_LEN..headers_end])?;
        let payload = frame.slice(headers_end..body_end);
        Ok(Some(Message { headers, payload }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => Err(Error::streaming(
                format!("event stream ended inside a frame ({} bytes left)", src.len()),
                None,
            )),
        }
    }
}

impl Encoder<Message> for EventStreamCodec {
    type Error = Error;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<()> {
        let mut headers = BytesMut::new();
        for (name, value) in &message.headers {
            encode_header(name, value, &mut headers)?;
        }
        let total_len = MIN_MESSAGE_LEN + headers.len() + message.payload.len();
        if total_len > MAX_MESSAGE_LEN {
            return Err(Error::streaming(
                format!("event stream message too large: {total_len} bytes"),
                None,
            ));
        }
        let start = dst.len();
        dst.reserve(total_len);
        dst.put_u32(total_len as u32);
        dst.put_u32(headers.len() as u32);
        let prelude_crc = crc32fast::hash(&dst[start..start + 8]);
        dst.put_u32(prelude_crc);
        dst.put_slice(&headers);
        dst.put_slice(&message.payload);
        let message_crc = crc32fast::hash(&dst[start..]);
        dst.put_u32(message_crc);
        Ok(())
    }
}

fn take<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if buf.len() < n {
        return Err(Error::streaming("truncated event stream header", None));
    }
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

fn parse_headers(mut buf: &[u8]) -> Result<Vec<(String, HeaderValue)>> {
    let mut headers = Vec::new();
    while !buf.is_empty() {
        let name_len = take(&mut buf, 1)?[0] as usize;
        let name = std::str::from_utf8(take(&mut buf, name_len)?)?.to_string();
        let value = match take(&mut buf, 1)?[0] {
            0 => HeaderValue::Bool(true),
            1 => HeaderValue::Bool(false),
            2 => HeaderValue::Byte(take(&mut buf, 1)?.get_i8()),
            3 => HeaderValue::Int16(take(&mut buf, 2)?.get_i16()),
            4 => HeaderValue::Int32(take(&mut buf, 4)?.get_i32()),
            5 => HeaderValue::Int64(take(&mut buf, 8)?.get_i64()),
            6 => {
                let len = take(&mut buf, 2)?.get_u16() as usize;
                HeaderValue::ByteArray(Bytes::copy_from_slice(take(&mut buf, len)?))
            }
            7 => {
                let len = take(&mut buf, 2)?.get_u16() as usize;
                HeaderValue::String(std::str::from_utf8(take(&mut buf, len)?)?.to_string())
            }
            8 => HeaderValue::Timestamp(take(&mut buf, 8)?.get_i64()),
            9 => {
                let mut uuid = [0u8; 16];
                uuid.copy_from_slice(take(&mut buf, 16)?);
                HeaderValue::Uuid(uuid)
            }
            other => {
                return Err(Error::streaming(
                    format!("unknown event stream header type {other} for {name}"),
                    None,
                ));
            }
        };
        headers.push((name, value));
    }
    Ok(headers)
}

fn encode_header(name: &str, value: &HeaderValue, dst: &mut BytesMut) -> Result<()> {
    let name_len = u8::try_from(name.len())
        .map_err(|_| Error::streaming(format!("header name too long: {name}"), None))?;
    dst.put_u8(name_len);
    dst.put_slice(name.as_bytes());
    dst.put_u8(value.type_tag());
    match value {
        HeaderValue::Bool(_) => {}
        HeaderValue::Byte(b) => dst.put_i8(*b),
        HeaderValue::Int16(v) => dst.put_i16(*v),
        HeaderValue::Int32(v) => dst.put_i32(*v),
        HeaderValue::Int64(v) | HeaderValue::Timestamp(v) => dst.put_i64(*v),
        HeaderValue::ByteArray(bytes) => {
            let len = u16::try_from(bytes.len())
                .map_err(|_| Error::streaming(format!("header {name} too long"), None))?;
            dst.put_u16(len);
            dst.put_slice(bytes);
        }
        HeaderValue::String(s) => {
            let len = u16::try_from(s.len())
                .map_err(|_| Error::streaming(format!("header {name} too long"), None))?;
            dst.put_u16(len);
            dst.put_slice(s.as_bytes());
        }
        HeaderValue::Uuid(uuid) => dst.put_slice(uuid),
    }
    Ok(())
}

#[derive(serde::Deserialize)]
struct ChunkPayload {
    bytes: String,
}

/// Interprets one Bedrock response-stream message.
///
/// `chunk` events yield their decoded [`CompletionChunk`].  Other events are
/// skipped.  Exceptions and errors become the matching [`Error`].
pub fn interpret_message(message: &Message) -> Result<Option<CompletionChunk>> {
    match message.header_str(MESSAGE_TYPE_HEADER) {
        Some("event") => {
            if message.header_str(EVENT_TYPE_HEADER) != Some("chunk") {
                return Ok(None);
            }
            let payload: ChunkPayload = serde_json::from_slice(message.payload())?;
            let bytes = base64::engine::general_purpose::STANDARD.decode(payload.bytes)?;
            let chunk: CompletionChunk = serde_json::from_slice(&bytes)?;
            Ok(Some(chunk))
        }
        Some("exception") => {
            let text = exception_message(message.payload());
            Err(Error::from_aws(
                500,
                message.header_str(EXCEPTION_TYPE_HEADER),
                text,
                None,
            ))
        }
        Some("error") => {
            let code = message.header_str(":error-code").unwrap_or("UnknownError");
            let text = message.header_str(":error-message").unwrap_or("");
            Err(Error::streaming(format!("{code}: {text}"), None))
        }
        other => Err(Error::streaming(
            format!("unexpected event stream message type {other:?}"),
            None,
        )),
    }
}

fn exception_message(payload: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(payload)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("Message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(payload).into_owned())
}

/// Decodes a Bedrock response stream into completion chunks.
pub fn completion_chunks<R>(reader: R) -> impl Stream<Item = Result<CompletionChunk>> + Send
where
    R: AsyncRead + Send + Unpin + 'static,
{
    FramedRead::new(reader, EventStreamCodec).filter_map(|message| {
        future::ready(match message {
            Ok(message) => interpret_message(&message).transpose(),
            Err(err) => Some(Err(err)),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(message: Message) -> Vec<u8> {
        let mut buf = BytesMut::new();
        EventStreamCodec.encode(message, &mut buf).unwrap();
        buf.to_vec()
    }

    fn chunk(text: &str) -> Message {
        Message::chunk(&CompletionChunk {
            completion: text.to_string(),
            stop_reason: None,
            stop: None,
        })
        .unwrap()
    }

    #[test]
    fn decode_a_whole_frame() {
        let bytes = encode(Message::event("chunk", "{}"));
        let mut buf = BytesMut::from(&bytes[..]);
        let message = EventStreamCodec.decode(&mut buf).unwrap().unwrap();
        assert!(buf.is_empty());
        assert_eq!(message.header_str(MESSAGE_TYPE_HEADER), Some("event"));
        assert_eq!(message.header_str(EVENT_TYPE_HEADER), Some("chunk"));
        assert_eq!(message.payload().as_ref(), b"{}");
    }

    #[test]
    fn decode_waits_for_the_rest_of_a_frame() {
        let bytes = encode(chunk("Hi"));
        let mut buf = BytesMut::from(&bytes[..5]);
        assert!(EventStreamCodec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&bytes[5..bytes.len() - 1]);
        assert!(EventStreamCodec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&bytes[bytes.len() - 1..]);
        assert!(EventStreamCodec.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn message_checksum_mismatch_is_an_error() {
        let mut bytes = encode(chunk("Hi"));
        let idx = bytes.len() - 6;
        bytes[idx] ^= 0xff;
        let mut buf = BytesMut::from(&bytes[..]);
        let err = EventStreamCodec.decode(&mut buf).unwrap_err();
        assert!(err.is_streaming());
    }

    #[test]
    fn prelude_checksum_mismatch_is_an_error() {
        let mut bytes = encode(chunk("Hi"));
        bytes[9] ^= 0xff;
        let mut buf = BytesMut::from(&bytes[..]);
        assert!(EventStreamCodec.decode(&mut buf).unwrap_err().is_streaming());
    }

    #[test]
    fn every_header_type_survives_framing() {
        let headers = vec![
            ("t".to_string(), HeaderValue::Bool(true)),
            ("f".to_string(), HeaderValue::Bool(false)),
            ("b".to_string(), HeaderValue::Byte(-3)),
            ("s".to_string(), HeaderValue::Int16(-300)),
            ("i".to_string(), HeaderValue::Int32(70_000)),
            ("l".to_string(), HeaderValue::Int64(-5_000_000_000)),
            ("y".to_string(), HeaderValue::ByteArray(Bytes::from_static(b"\x00\x01"))),
            ("str".to_string(), HeaderValue::String("value".to_string())),
            ("ts".to_string(), HeaderValue::Timestamp(1_700_000_000_000)),
            ("u".to_string(), HeaderValue::Uuid([7; 16])),
        ];
        let message = Message::new(headers, "payload");
        let mut buf = BytesMut::from(&encode(message.clone())[..]);
        assert_eq!(EventStreamCodec.decode(&mut buf).unwrap(), Some(message));
    }

    #[test]
    fn chunk_event_yields_completion() {
        let chunk = interpret_message(&chunk("Hello")).unwrap().unwrap();
        assert_eq!(chunk.completion, "Hello");
    }

    #[test]
    fn unrelated_events_are_skipped() {
        assert!(interpret_message(&Message::event("metadata", "{}"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn exception_maps_to_error() {
        let err = interpret_message(&Message::exception(
            "throttlingException",
            "Too many requests",
        ))
        .unwrap_err();
        assert!(err.is_throttling());
        assert!(err.to_string().contains("Too many requests"));

        let err = interpret_message(&Message::exception("modelErrorException", "bad output"))
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(err.to_string(), "ModelErrorException: bad output");
    }

    #[tokio::test]
    async fn chunks_from_split_reads() {
        let mut bytes = encode(chunk("Hi "));
        bytes.extend(encode(Message::event("metadata", "{}")));
        bytes.extend(encode(chunk("there")));
        let (a, rest) = bytes.split_at(7);
        let (b, c) = rest.split_at(40);
        let reader = tokio_test::io::Builder::new().read(a).read(b).read(c).build();
        let chunks: Vec<_> = completion_chunks(reader).collect().await;
        let texts: Vec<_> = chunks
            .into_iter()
            .map(|c| c.unwrap().completion)
            .collect();
        assert_eq!(texts, vec!["Hi ", "there"]);
    }

    #[tokio::test]
    async fn truncated_stream_is_an_error() {
        let bytes = encode(chunk("Hi"));
        let reader = tokio_test::io::Builder::new()
            .read(&bytes[..bytes.len() - 3])
            .build();
        let results: Vec<_> = completion_chunks(reader).collect().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].as_ref().unwrap_err().is_streaming());
    }
}
