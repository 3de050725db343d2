//! Tag-keyed command dispatch.

use std::collections::HashMap;

use colonia_core::{Game, GameError};
use colonia_protocol::{
    Element, ErrorKind, ErrorMessage, NativeTradeMessage, UpdateCurrentStopMessage, WireError,
};
use thiserror::Error;

use crate::command::{Caller, ServerCommand};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed request: {0}")]
    Malformed(#[from] WireError),
    #[error("unknown command <{0}>")]
    UnknownCommand(String),
    #[error(transparent)]
    Rejected(#[from] GameError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Malformed(_) => ErrorKind::Malformed,
            DispatchError::UnknownCommand(_) => ErrorKind::UnknownCommand,
            DispatchError::Rejected(e) if e.is_lookup_failure() => ErrorKind::Lookup,
            DispatchError::Rejected(e) if e.is_authorization_failure() => {
                ErrorKind::Authorization
            }
            DispatchError::Rejected(_) => ErrorKind::Rejected,
        }
    }

    pub fn to_message(&self) -> ErrorMessage {
        ErrorMessage::new(self.kind(), self.to_string())
    }
}

type Handler = fn(&Element, &mut Game, Caller) -> Result<Option<Element>, DispatchError>;

/// Decoding happens before the game is touched, so a malformed request
/// never reaches a handler.
fn run<C: ServerCommand>(
    element: &Element,
    game: &mut Game,
    caller: Caller,
) -> Result<Option<Element>, DispatchError> {
    let command = C::from_element(element)?;
    Ok(command.handle(game, caller)?)
}

pub struct Dispatcher {
    handlers: HashMap<&'static str, Handler>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher
            .register::<UpdateCurrentStopMessage>()
            .register::<NativeTradeMessage>();
        dispatcher
    }
}

impl Dispatcher {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<C: ServerCommand>(&mut self) -> &mut Self {
        self.handlers.insert(C::TAG, run::<C>);
        self
    }

    pub fn handles(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    pub fn dispatch(
        &self,
        element: &Element,
        game: &mut Game,
        caller: Caller,
    ) -> Result<Option<Element>, DispatchError> {
        let handler = self
            .handlers
            .get(element.tag.as_str())
            .ok_or_else(|| DispatchError::UnknownCommand(element.tag.clone()))?;
        handler(element, game, caller)
    }
}
