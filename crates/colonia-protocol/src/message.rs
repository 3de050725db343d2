//! Command and reply messages.
//!
//! Each message type owns a static tag and converts to and from an
//! [`Element`]. Messages carry identifiers only, never object state.

use std::fmt;
use std::str::FromStr;

use crate::{Element, Identified, ObjectId, PlayerId, WireError};

/// A message that travels as a tagged attribute-bag element.
pub trait WireMessage: Sized {
    /// Element tag; also the dispatch key on the server.
    const TAG: &'static str;

    fn to_element(&self) -> Element;

    fn from_element(element: &Element) -> Result<Self, WireError>;
}

/// Asks the server to advance a unit to its next trade-route stop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateCurrentStopMessage {
    unit: ObjectId,
}

impl UpdateCurrentStopMessage {
    const UNIT_TAG: &'static str = "unit";

    /// Client-side constructor from a live unit.
    pub fn new(unit: &impl Identified) -> Self {
        Self {
            unit: unit.object_id().clone(),
        }
    }

    pub fn unit(&self) -> &ObjectId {
        &self.unit
    }
}

impl WireMessage for UpdateCurrentStopMessage {
    const TAG: &'static str = "updateCurrentStop";

    fn to_element(&self) -> Element {
        Element::new(Self::TAG).with(Self::UNIT_TAG, &self.unit)
    }

    /// No ownership check happens here; that is deferred to handling.
    fn from_element(element: &Element) -> Result<Self, WireError> {
        element.expect_tag(Self::TAG)?;
        Ok(Self {
            unit: element.required_id(Self::UNIT_TAG)?,
        })
    }
}

/// Claims a player slot by name, or reclaims it with a token after a drop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginMessage {
    pub user_name: String,
    pub token: Option<String>,
}

impl WireMessage for LoginMessage {
    const TAG: &'static str = "login";

    fn to_element(&self) -> Element {
        Element::new(Self::TAG)
            .with("userName", &self.user_name)
            .with_opt("token", self.token.as_ref())
    }

    fn from_element(element: &Element) -> Result<Self, WireError> {
        element.expect_tag(Self::TAG)?;
        Ok(Self {
            user_name: element.required("userName")?.to_owned(),
            token: element.get("token").map(str::to_owned),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginAcceptedMessage {
    pub player: PlayerId,
    pub user_name: String,
    pub token: String,
}

impl WireMessage for LoginAcceptedMessage {
    const TAG: &'static str = "loginAccepted";

    fn to_element(&self) -> Element {
        Element::new(Self::TAG)
            .with("player", self.player.0)
            .with("userName", &self.user_name)
            .with("token", &self.token)
    }

    fn from_element(element: &Element) -> Result<Self, WireError> {
        element.expect_tag(Self::TAG)?;
        Ok(Self {
            player: PlayerId(element.required_parsed("player")?),
            user_name: element.required("userName")?.to_owned(),
            token: element.required("token")?.to_owned(),
        })
    }
}

/// Why a request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Identifier did not resolve to a live object.
    Lookup,
    /// Identifier resolved but belongs to someone else.
    Authorization,
    /// Request could not be decoded.
    Malformed,
    /// No handler is registered for the tag.
    UnknownCommand,
    /// Game rules refused the request.
    Rejected,
    /// The connection has not logged in.
    NotLoggedIn,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Lookup => "lookup",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Malformed => "malformed",
            ErrorKind::UnknownCommand => "unknownCommand",
            ErrorKind::Rejected => "rejected",
            ErrorKind::NotLoggedIn => "notLoggedIn",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lookup" => Ok(ErrorKind::Lookup),
            "authorization" => Ok(ErrorKind::Authorization),
            "malformed" => Ok(ErrorKind::Malformed),
            "unknownCommand" => Ok(ErrorKind::UnknownCommand),
            "rejected" => Ok(ErrorKind::Rejected),
            "notLoggedIn" => Ok(ErrorKind::NotLoggedIn),
            _ => Err(()),
        }
    }
}

/// Server reply to a refused request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorMessage {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorMessage {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl WireMessage for ErrorMessage {
    const TAG: &'static str = "error";

    fn to_element(&self) -> Element {
        Element::new(Self::TAG)
            .with("kind", self.kind)
            .with("message", &self.message)
    }

    fn from_element(element: &Element) -> Result<Self, WireError> {
        element.expect_tag(Self::TAG)?;
        Ok(Self {
            kind: element.required_parsed("kind")?,
            message: element.get("message").unwrap_or_default().to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_stop_carries_only_the_unit_id() {
        let unit = ObjectId::new("unit:42");
        let msg = UpdateCurrentStopMessage::new(&unit);
        let el = msg.to_element();

        assert_eq!(el.tag, "updateCurrentStop");
        assert_eq!(el.attributes.len(), 1);
        assert_eq!(el.get("unit"), Some("unit:42"));
        assert_eq!(UpdateCurrentStopMessage::from_element(&el).unwrap(), msg);
    }

    #[test]
    fn update_stop_without_unit_is_malformed() {
        let el = Element::new(UpdateCurrentStopMessage::TAG);
        assert!(matches!(
            UpdateCurrentStopMessage::from_element(&el),
            Err(WireError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn update_stop_rejects_foreign_tag() {
        let el = Element::new("login").with("unit", "unit:1");
        assert!(matches!(
            UpdateCurrentStopMessage::from_element(&el),
            Err(WireError::UnexpectedTag { .. })
        ));
    }

    #[test]
    fn error_message_kind_parses() {
        let msg = ErrorMessage::new(ErrorKind::Authorization, "not yours");
        let decoded = ErrorMessage::from_element(&msg.to_element()).unwrap();
        assert_eq!(decoded.kind, ErrorKind::Authorization);
        assert_eq!(decoded.message, "not yours");
    }

    #[test]
    fn login_token_is_optional() {
        let el = Element::new("login").with("userName", "Hernan");
        let msg = LoginMessage::from_element(&el).unwrap();
        assert_eq!(msg.user_name, "Hernan");
        assert_eq!(msg.token, None);
    }
}
