use rmp_serde::{decode, encode};
use thiserror::Error;

use crate::{Element, WireMessage};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("encode error: {0}")]
    Encode(#[from] encode::Error),
    #[error("decode error: {0}")]
    Decode(#[from] decode::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected <{expected}>, found <{found}>")]
    UnexpectedTag { expected: String, found: String },
    #[error("<{tag}> is missing required attribute `{attribute}`")]
    MissingAttribute { tag: String, attribute: String },
    #[error("<{tag}> attribute `{attribute}` has invalid value {value:?}")]
    InvalidAttribute {
        tag: String,
        attribute: String,
        value: String,
    },
}

pub fn serialize_element(element: &Element) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(element)?)
}

pub fn deserialize_element(bytes: &[u8]) -> Result<Element, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_element_json(element: &Element) -> Result<String, WireError> {
    Ok(serde_json::to_string(element)?)
}

pub fn deserialize_element_json(json: &str) -> Result<Element, WireError> {
    Ok(serde_json::from_str(json)?)
}

/// Encode a typed message straight to network bytes.
pub fn serialize_message<M: WireMessage>(message: &M) -> Result<Vec<u8>, WireError> {
    serialize_element(&message.to_element())
}

/// Decode network bytes into a typed message, checking the tag.
pub fn deserialize_message<M: WireMessage>(bytes: &[u8]) -> Result<M, WireError> {
    M::from_element(&deserialize_element(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_survives_msgpack_and_json() {
        let el = Element::new("updateCurrentStop").with("unit", "unit:7");

        let bytes = serialize_element(&el).unwrap();
        assert_eq!(deserialize_element(&bytes).unwrap(), el);

        let json = serialize_element_json(&el).unwrap();
        assert_eq!(deserialize_element_json(&json).unwrap(), el);
    }

    #[test]
    fn typed_decode_checks_the_tag() {
        use crate::{LoginMessage, ObjectId, UpdateCurrentStopMessage};

        let msg = UpdateCurrentStopMessage::new(&ObjectId::new("unit:7"));
        let bytes = serialize_message(&msg).unwrap();
        assert_eq!(deserialize_message::<UpdateCurrentStopMessage>(&bytes).unwrap(), msg);
        assert!(matches!(
            deserialize_message::<LoginMessage>(&bytes),
            Err(WireError::UnexpectedTag { .. })
        ));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            deserialize_element(&[0xc1, 0x00, 0xff]),
            Err(WireError::Decode(_))
        ));
    }

    #[test]
    fn json_without_attributes_uses_empty_bag() {
        let el = deserialize_element_json(r#"{"tag":"login"}"#).unwrap();
        assert_eq!(el.tag, "login");
        assert!(el.attributes.is_empty());
        assert!(el.children.is_empty());
    }
}
