use std::collections::HashMap;
use std::{fmt, io};

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::ser::Formatter;

use crate::error::VoteError;

// ════════════════════════════════════════════════════════════════
//  Vote
// ════════════════════════════════════════════════════════════════

/// Тело HTTP-запроса голосования в том виде, как оно пришло.
///
/// Ключи `name`/`vote` сравниваются без учёта регистра, при повторах
/// побеждает последний. `null` оставляет поле как есть, лишние ключи
/// игнорируются. Валидация — в `VoteMessage::try_from`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteRequest {
    pub name: String,
    pub vote: String,
}

impl VoteRequest {
    /// Декодировать тело запроса. Тело `null` даёт пустой запрос.
    pub fn from_slice(body: &[u8]) -> Result<Self, VoteError> {
        let req: Option<VoteRequest> = serde_json::from_slice(body).map_err(VoteError::Decode)?;
        Ok(req.unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for VoteRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(VoteRequestVisitor)
    }
}

struct VoteRequestVisitor;

impl<'de> Visitor<'de> for VoteRequestVisitor {
    type Value = VoteRequest;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object with string fields `name` and `vote`")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<VoteRequest, A::Error> {
        let mut req = VoteRequest::default();
        while let Some(key) = map.next_key::<String>()? {
            let slot = if key.eq_ignore_ascii_case("name") {
                Some(&mut req.name)
            } else if key.eq_ignore_ascii_case("vote") {
                Some(&mut req.vote)
            } else {
                None
            };
            match slot {
                Some(slot) => {
                    if let Some(value) = map.next_value::<Option<String>>()? {
                        *slot = value;
                    }
                }
                None => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(req)
    }
}

/// Validated vote, immutable once built. Both fields are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteMessage {
    name: String,
    vote: String,
}

impl VoteMessage {
    pub fn new(name: impl Into<String>, vote: impl Into<String>) -> Result<Self, VoteError> {
        let name = name.into();
        let vote = vote.into();
        if name.is_empty() {
            return Err(VoteError::MissingField("name"));
        }
        if vote.is_empty() {
            return Err(VoteError::MissingField("vote"));
        }
        Ok(Self { name, vote })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vote(&self) -> &str {
        &self.vote
    }

    /// JSON payload for transport: `{"name":…,"vote":…}`, HTML-safe.
    pub fn to_payload(&self) -> Result<Vec<u8>, VoteError> {
        let mut out = Vec::with_capacity(self.name.len() + self.vote.len() + 20);
        let mut ser = serde_json::Serializer::with_formatter(&mut out, HtmlSafeFormatter);
        self.serialize(&mut ser).map_err(VoteError::Encode)?;
        Ok(out)
    }

    /// Разобрать payload, пришедший из топика, с той же валидацией.
    pub fn from_payload(bytes: &[u8]) -> Result<Self, VoteError> {
        VoteRequest::from_slice(bytes)?.try_into()
    }
}

/// Compact JSON with `<`, `>`, `&`, U+2028 and U+2029 written as `\uXXXX`,
/// the way web-facing JSON encoders emit strings.
struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            let escaped = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

impl TryFrom<VoteRequest> for VoteMessage {
    type Error = VoteError;

    fn try_from(req: VoteRequest) -> Result<Self, Self::Error> {
        VoteMessage::new(req.name, req.vote)
    }
}

// ════════════════════════════════════════════════════════════════
//  Pub/Sub messages
// ════════════════════════════════════════════════════════════════

/// Сообщение для публикации: байты + атрибуты.
///
/// Сериализуется в REST-форму Pub/Sub (`data` в base64).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl OutboundMessage {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, attributes: HashMap::new() }
    }
}

/// Сообщение, доставленное подписчику.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubSubMessage {
    #[serde(default, with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
}

impl PubSubMessage {
    pub fn from_data(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into(), ..Self::default() }
    }
}

/// Push-подписка оборачивает сообщение в конверт.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushEnvelope {
    pub message: PubSubMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

/// Входящая доставка: push-конверт или «голое» сообщение `{"data": …}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InboundDelivery {
    Push(PushEnvelope),
    Bare(PubSubMessage),
}

impl InboundDelivery {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn into_message(self) -> PubSubMessage {
        match self {
            InboundDelivery::Push(envelope) => envelope.message,
            InboundDelivery::Bare(message) => message,
        }
    }

    pub fn subscription(&self) -> Option<&str> {
        match self {
            InboundDelivery::Push(envelope) => envelope.subscription.as_deref(),
            InboundDelivery::Bare(_) => None,
        }
    }
}

/// serde adapter: `Vec<u8>` ⇄ standard base64 string (`null` → empty).
pub mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_null_fields_decode_empty() {
        let req = VoteRequest::from_slice(br#"{"name":null}"#).unwrap();
        assert_eq!(req, VoteRequest::default());

        let req = VoteRequest::from_slice(b"null").unwrap();
        assert_eq!(req, VoteRequest::default());
    }

    #[test]
    fn keys_match_case_insensitively_and_last_wins() {
        let req = VoteRequest::from_slice(br#"{"Name":"Alice","VOTE":"yes"}"#).unwrap();
        assert_eq!(req, VoteRequest { name: "Alice".into(), vote: "yes".into() });

        let req = VoteRequest::from_slice(br#"{"name":"a","name":"Bob","vote":"y"}"#).unwrap();
        assert_eq!(req.name, "Bob");

        let req = VoteRequest::from_slice(br#"{"name":"Bob","Name":null,"vote":"y"}"#).unwrap();
        assert_eq!(req.name, "Bob");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let req = VoteRequest::from_slice(br#"{"name":"Alice","vote":"yes","extra":1}"#).unwrap();
        assert_eq!(req.name, "Alice");
        assert_eq!(req.vote, "yes");
    }

    #[test]
    fn wrong_types_and_garbage_fail_decode() {
        assert!(matches!(
            VoteRequest::from_slice(br#"{"name":42,"vote":"yes"}"#),
            Err(VoteError::Decode(_))
        ));
        assert!(matches!(VoteRequest::from_slice(b"{\"name\":"), Err(VoteError::Decode(_))));
        assert!(matches!(VoteRequest::from_slice(b""), Err(VoteError::Decode(_))));
        assert!(matches!(VoteRequest::from_slice(b"[1,2]"), Err(VoteError::Decode(_))));
    }

    #[test]
    fn validation_names_first_missing_field() {
        let err = VoteMessage::new("", "").unwrap_err();
        assert!(matches!(err, VoteError::MissingField("name")));

        let err = VoteMessage::new("Alice", "").unwrap_err();
        assert!(matches!(err, VoteError::MissingField("vote")));
    }

    #[test]
    fn payload_keeps_field_order() {
        let msg = VoteMessage::new("Alice", "yes").unwrap();
        let payload = msg.to_payload().unwrap();
        assert_eq!(payload, br#"{"name":"Alice","vote":"yes"}"#);
        assert_eq!(VoteMessage::from_payload(&payload).unwrap(), msg);
    }

    #[test]
    fn payload_escapes_html_characters() {
        let msg = VoteMessage::new("<b>Tom & Jerry</b>", "yes\u{2028}").unwrap();
        let payload = msg.to_payload().unwrap();
        assert_eq!(
            payload,
            br#"{"name":"\u003cb\u003eTom \u0026 Jerry\u003c/b\u003e","vote":"yes\u2028"}"#
        );
        assert_eq!(VoteMessage::from_payload(&payload).unwrap(), msg);
    }

    #[test]
    fn outbound_data_is_base64() {
        let msg = OutboundMessage::new(b"hello".to_vec());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({ "data": "aGVsbG8=" }));
    }

    #[test]
    fn push_envelope_and_bare_message() {
        let push = br#"{
            "message": {"data": "aGVsbG8=", "messageId": "42", "attributes": {"k": "v"}},
            "subscription": "projects/p/subscriptions/s"
        }"#;
        let delivery = InboundDelivery::from_slice(push).unwrap();
        assert_eq!(delivery.subscription(), Some("projects/p/subscriptions/s"));
        let message = delivery.into_message();
        assert_eq!(message.data, b"hello");
        assert_eq!(message.message_id.as_deref(), Some("42"));
        assert_eq!(message.attributes.get("k").map(String::as_str), Some("v"));

        let bare = InboundDelivery::from_slice(br#"{"data": "aGVsbG8="}"#).unwrap();
        assert_eq!(bare.into_message().data, b"hello");

        let empty = InboundDelivery::from_slice(br#"{"message": {}}"#).unwrap();
        assert!(empty.into_message().data.is_empty());
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(InboundDelivery::from_slice(br#"{"data": "%%%"}"#).is_err());
    }
}
