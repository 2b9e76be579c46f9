//! Socket.IO text framing for the four protocol events.
//!
//! An event travels as `42["name",payload]`: `4` is the Engine.IO message
//! packet, `2` the Socket.IO event packet. A non-root namespace is written as
//! `42/chat,[...]`. An acknowledgement id (`4213[...]`) is accepted on decode
//! and dropped.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use snafu::{ResultExt, Snafu};

use crate::chat::events::{
    AI_MESSAGE_EVENT, HISTORY_EVENT, Inbound, JOIN_EVENT, MESSAGE_EVENT, Outbound,
};

pub const EVENT_PACKET_PREFIX: &str = "42";
pub const ROOT_NAMESPACE: &str = "/";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CodecError {
    #[snafu(display("frame is not a Socket.IO event packet: {frame}"))]
    NotAnEventPacket { stage: &'static str, frame: String },
    #[snafu(display("frame for namespace '{found}' arrived on '{expected}'"))]
    WrongNamespace {
        stage: &'static str,
        expected: String,
        found: String,
    },
    #[snafu(display("event packet body is not valid JSON on `{stage}`: {source}"))]
    InvalidJson {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("event packet body must be an array starting with the event name"))]
    MissingEventName { stage: &'static str },
    #[snafu(display("unknown event '{name}'"))]
    UnknownEvent { stage: &'static str, name: String },
    #[snafu(display("payload of '{event}' does not match the protocol on `{stage}`: {source}"))]
    InvalidPayload {
        stage: &'static str,
        event: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to encode '{event}' on `{stage}`: {source}"))]
    Encode {
        stage: &'static str,
        event: &'static str,
        source: serde_json::Error,
    },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Encodes and decodes the protocol events of one namespace.
///
/// Frames addressed to any other namespace are rejected on decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCodec {
    namespace: String,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(ROOT_NAMESPACE)
    }
}

impl FrameCodec {
    /// Binds the codec to `namespace`; a blank value is the root namespace and
    /// a missing leading `/` is added.
    pub fn new(namespace: impl AsRef<str>) -> Self {
        let namespace = namespace.as_ref().trim();
        let namespace = if namespace.is_empty() {
            ROOT_NAMESPACE.to_string()
        } else if namespace.starts_with('/') {
            namespace.to_string()
        } else {
            format!("/{namespace}")
        };
        Self { namespace }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn encode_outbound(&self, event: &Outbound) -> CodecResult<String> {
        match event {
            Outbound::Join(payload) => self.encode_event(JOIN_EVENT, payload),
            Outbound::Message(payload) => self.encode_event(MESSAGE_EVENT, payload),
        }
    }

    pub fn decode_outbound(&self, frame: &str) -> CodecResult<Outbound> {
        let (name, payload) = self.split_event(frame)?;
        match name.as_str() {
            JOIN_EVENT => Ok(Outbound::Join(decode_payload(JOIN_EVENT, payload)?)),
            MESSAGE_EVENT => Ok(Outbound::Message(decode_payload(MESSAGE_EVENT, payload)?)),
            _ => UnknownEventSnafu {
                stage: "decode-outbound",
                name,
            }
            .fail(),
        }
    }

    pub fn encode_inbound(&self, event: &Inbound) -> CodecResult<String> {
        match event {
            Inbound::History(entries) => self.encode_event(HISTORY_EVENT, entries),
            Inbound::AiMessage(payload) => self.encode_event(AI_MESSAGE_EVENT, payload),
        }
    }

    pub fn decode_inbound(&self, frame: &str) -> CodecResult<Inbound> {
        let (name, payload) = self.split_event(frame)?;
        match name.as_str() {
            HISTORY_EVENT => Ok(Inbound::History(decode_payload_or_default(
                HISTORY_EVENT,
                payload,
            )?)),
            AI_MESSAGE_EVENT => Ok(Inbound::AiMessage(decode_payload_or_default(
                AI_MESSAGE_EVENT,
                payload,
            )?)),
            _ => UnknownEventSnafu {
                stage: "decode-inbound",
                name,
            }
            .fail(),
        }
    }

    fn encode_event<T: Serialize>(&self, name: &'static str, payload: &T) -> CodecResult<String> {
        let body = serde_json::to_string(&(name, payload)).context(EncodeSnafu {
            stage: "encode-event",
            event: name,
        })?;
        if self.namespace == ROOT_NAMESPACE {
            Ok(format!("{EVENT_PACKET_PREFIX}{body}"))
        } else {
            Ok(format!("{EVENT_PACKET_PREFIX}{},{body}", self.namespace))
        }
    }

    fn split_event(&self, frame: &str) -> CodecResult<(String, Value)> {
        let Some(rest) = frame.strip_prefix(EVENT_PACKET_PREFIX) else {
            return NotAnEventPacketSnafu {
                stage: "split-event-prefix",
                frame: frame.to_string(),
            }
            .fail();
        };

        let (namespace, rest) = if rest.starts_with('/') {
            match rest.split_once(',') {
                Some((namespace, body)) => (namespace, body),
                None => {
                    return NotAnEventPacketSnafu {
                        stage: "split-event-namespace",
                        frame: frame.to_string(),
                    }
                    .fail();
                }
            }
        } else {
            (ROOT_NAMESPACE, rest)
        };
        if namespace != self.namespace {
            return WrongNamespaceSnafu {
                stage: "split-event-namespace",
                expected: self.namespace.clone(),
                found: namespace.to_string(),
            }
            .fail();
        }
        let body = rest.trim_start_matches(|ch: char| ch.is_ascii_digit());

        let value: Value = serde_json::from_str(body).context(InvalidJsonSnafu {
            stage: "split-event-json",
        })?;
        let Value::Array(mut items) = value else {
            return MissingEventNameSnafu {
                stage: "split-event-array",
            }
            .fail();
        };
        let payload = if items.len() > 1 {
            items.swap_remove(1)
        } else {
            Value::Null
        };
        let Some(Value::String(name)) = items.into_iter().next() else {
            return MissingEventNameSnafu {
                stage: "split-event-name",
            }
            .fail();
        };
        Ok((name, payload))
    }
}

fn decode_payload<T: DeserializeOwned>(event: &'static str, payload: Value) -> CodecResult<T> {
    serde_json::from_value(payload).context(InvalidPayloadSnafu {
        stage: "decode-payload",
        event,
    })
}

fn decode_payload_or_default<T>(event: &'static str, payload: Value) -> CodecResult<T>
where
    T: DeserializeOwned + Default,
{
    // Servers may omit the payload entirely; treat that as an empty one.
    if payload.is_null() {
        return Ok(T::default());
    }
    decode_payload(event, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::events::{AiMessagePayload, HistoryEntry, JoinPayload, MessagePayload};

    fn root() -> FrameCodec {
        FrameCodec::default()
    }

    #[test]
    fn outbound_events_use_event_packets() {
        let join = Outbound::Join(JoinPayload {
            room: "room_abc".to_string(),
        });
        assert_eq!(
            root().encode_outbound(&join).expect("encode join"),
            r#"42["join",{"room":"room_abc"}]"#
        );

        let message = Outbound::Message(MessagePayload {
            room: "room_abc".to_string(),
            message: "hi".to_string(),
        });
        assert_eq!(
            root().encode_outbound(&message).expect("encode message"),
            r#"42["message",{"room":"room_abc","message":"hi"}]"#
        );
        assert_eq!(
            root()
                .decode_outbound(r#"42["message",{"room":"room_abc","message":"hi"}]"#)
                .expect("decode message"),
            message
        );
    }

    #[test]
    fn namespaced_codec_prefixes_and_checks_frames() {
        let codec = FrameCodec::new("/ilmagent");
        let frame = codec
            .encode_inbound(&Inbound::AiMessage(AiMessagePayload::text("x")))
            .expect("encode reply");
        assert_eq!(frame, r#"42/ilmagent,["ai_message",{"message":"x"}]"#);
        assert_eq!(
            codec.decode_inbound(&frame).expect("decode own namespace"),
            Inbound::AiMessage(AiMessagePayload::text("x"))
        );

        assert!(matches!(
            root().decode_inbound(&frame),
            Err(CodecError::WrongNamespace { .. })
        ));
        assert!(matches!(
            codec.decode_inbound(r#"42["ai_message",{"message":"x"}]"#),
            Err(CodecError::WrongNamespace { .. })
        ));
    }

    #[test]
    fn namespace_is_normalized() {
        assert_eq!(FrameCodec::new("  ").namespace(), "/");
        assert_eq!(FrameCodec::new("chat").namespace(), "/chat");
        assert_eq!(FrameCodec::new(" /ilmagent ").namespace(), "/ilmagent");
    }

    #[test]
    fn history_tolerates_missing_and_null_slots() {
        let decoded = root()
            .decode_inbound(r#"42["history",[{"user":"a","ai":"b"},{"ai":"c"},{"user":"d","ai":null}]]"#)
            .expect("decode history");
        assert_eq!(
            decoded,
            Inbound::History(vec![
                HistoryEntry::new(Some("a"), Some("b")),
                HistoryEntry::new(None, Some("c")),
                HistoryEntry::new(Some("d"), None),
            ])
        );
    }

    #[test]
    fn ai_message_without_message_field_is_valid() {
        assert_eq!(
            root().decode_inbound(r#"42["ai_message",{}]"#).expect("decode empty object"),
            Inbound::AiMessage(AiMessagePayload::empty())
        );
        assert_eq!(
            root().decode_inbound(r#"42["ai_message"]"#).expect("decode missing payload"),
            Inbound::AiMessage(AiMessagePayload::empty())
        );
        assert_eq!(
            root()
                .encode_inbound(&Inbound::AiMessage(AiMessagePayload::text("hello!")))
                .expect("encode reply"),
            r#"42["ai_message",{"message":"hello!"}]"#
        );
    }

    #[test]
    fn ack_id_is_skipped() {
        assert_eq!(
            FrameCodec::new("/ilmagent")
                .decode_inbound(r#"42/ilmagent,7["ai_message",{"message":"x"}]"#)
                .expect("decode"),
            Inbound::AiMessage(AiMessagePayload::text("x"))
        );
    }

    #[test]
    fn malformed_frames_are_rejected() {
        let codec = root();
        assert!(matches!(
            codec.decode_inbound("2"),
            Err(CodecError::NotAnEventPacket { .. })
        ));
        assert!(matches!(
            codec.decode_inbound("42/ilmagent"),
            Err(CodecError::NotAnEventPacket { .. })
        ));
        assert!(matches!(
            codec.decode_inbound("42{not json"),
            Err(CodecError::InvalidJson { .. })
        ));
        assert!(matches!(
            codec.decode_inbound(r#"42[1,2]"#),
            Err(CodecError::MissingEventName { .. })
        ));
        assert!(matches!(
            codec.decode_inbound(r#"42["typing",{}]"#),
            Err(CodecError::UnknownEvent { .. })
        ));
        assert!(matches!(
            codec.decode_inbound(r#"42["history",{"user":"a"}]"#),
            Err(CodecError::InvalidPayload { .. })
        ));
    }
}
