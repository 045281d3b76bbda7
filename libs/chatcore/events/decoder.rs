use crate::domain::User;
use crate::events::event::{ChatEvent, DecodeError, DomainEvent};
use chatsocket::{ChatSocketError, DecodedFrame, FrameDecoder, ServerErrorFrame, WsMessage};

impl From<DecodeError> for ChatSocketError {
    fn from(err: DecodeError) -> Self {
        ChatSocketError::Decode(err.to_string())
    }
}

/// Wire format of the chat backend
///
/// Server error frames are recognised before event decoding; health checks
/// are split out so the transport can authenticate the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatFrameDecoder;

impl FrameDecoder for ChatFrameDecoder {
    type Event = ChatEvent;
    type User = User;

    fn decode(&self, message: &WsMessage) -> chatsocket::Result<DecodedFrame<ChatEvent, User>> {
        let text = message.text_payload()?;

        if let Some(error) = ServerErrorFrame::parse(&text) {
            return Ok(DecodedFrame::ServerError(error));
        }

        let event = ChatEvent::decode(&text)?;
        match &event.event {
            DomainEvent::HealthCheck { connection_id, me } => Ok(DecodedFrame::HealthCheck {
                connection_id: connection_id.clone(),
                user: me.clone(),
                event,
            }),
            _ => Ok(DecodedFrame::Event(event)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> chatsocket::Result<DecodedFrame<ChatEvent, User>> {
        ChatFrameDecoder.decode(&WsMessage::Text(text.to_string()))
    }

    #[test]
    fn test_server_error_frame() {
        match decode(r#"{"error":{"code":40,"message":"JWT expired","StatusCode":401}}"#) {
            Ok(DecodedFrame::ServerError(error)) => {
                assert!(error.is_token_expired());
                assert_eq!(error.message, "JWT expired");
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_health_check_is_split_out() {
        match decode(r#"{"type":"health.check","connection_id":"abc","me":{"id":"alice"}}"#) {
            Ok(DecodedFrame::HealthCheck {
                connection_id,
                user,
                event,
            }) => {
                assert_eq!(connection_id, "abc");
                assert_eq!(user.map(|u| u.id).as_deref(), Some("alice"));
                assert!(matches!(event.event, DomainEvent::HealthCheck { .. }));
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_binary_frames_are_utf8_json() {
        let frame = WsMessage::Binary(br#"{"type":"channel.truncated"}"#.to_vec());
        match ChatFrameDecoder.decode(&frame) {
            Ok(DecodedFrame::Event(event)) => assert_eq!(event.event.raw_type(), "channel.truncated"),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_malformed_frame_is_decode_error() {
        assert!(matches!(decode("{oops"), Err(ChatSocketError::Decode(_))));
        assert!(matches!(
            decode(r#"{"type":"typing.start"}"#),
            Err(ChatSocketError::Decode(_))
        ));
    }
}
