//! Attribute-bag elements.
//!
//! Every message and every serialized game object is a tagged element whose
//! fields are string attributes. The tag is a static per-type constant and is
//! what the server dispatches on.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ObjectId, WireError};

/// A tagged element carrying string attributes and nested elements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, name: &str, value: impl Display) -> Self {
        self.set(name, value);
        self
    }

    /// Builder-style attribute setter that skips `None`.
    pub fn with_opt<T: Display>(mut self, name: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.set(name, value);
        }
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Display) {
        self.attributes.insert(name.to_owned(), value.to_string());
    }

    /// Raw attribute value, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Fails with `UnexpectedTag` unless this element carries `tag`.
    pub fn expect_tag(&self, tag: &str) -> Result<(), WireError> {
        if self.tag == tag {
            Ok(())
        } else {
            Err(WireError::UnexpectedTag {
                expected: tag.to_owned(),
                found: self.tag.clone(),
            })
        }
    }

    /// A required attribute. Absence is a parse error, never a silent default.
    pub fn required(&self, name: &str) -> Result<&str, WireError> {
        self.get(name).ok_or_else(|| WireError::MissingAttribute {
            tag: self.tag.clone(),
            attribute: name.to_owned(),
        })
    }

    pub fn required_id(&self, name: &str) -> Result<ObjectId, WireError> {
        let raw = self.required(name)?;
        if raw.is_empty() {
            return Err(self.invalid(name, raw));
        }
        Ok(ObjectId::new(raw))
    }

    /// An optional reference. Absent (or empty) decodes to `None`.
    pub fn optional_id(&self, name: &str) -> Option<ObjectId> {
        self.get(name)
            .filter(|raw| !raw.is_empty())
            .map(ObjectId::new)
    }

    pub fn required_parsed<T: FromStr>(&self, name: &str) -> Result<T, WireError> {
        let raw = self.required(name)?;
        raw.parse().map_err(|_| self.invalid(name, raw))
    }

    /// A typed optional attribute. Absent decodes to `None`; present but
    /// unparsable is still an error.
    pub fn optional_parsed<T: FromStr>(&self, name: &str) -> Result<Option<T>, WireError> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| self.invalid(name, raw)),
        }
    }

    pub fn parsed_or<T: FromStr>(&self, name: &str, default: T) -> Result<T, WireError> {
        Ok(self.optional_parsed(name)?.unwrap_or(default))
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, WireError> {
        self.parsed_or(name, default)
    }

    pub fn int_or(&self, name: &str, default: i32) -> Result<i32, WireError> {
        self.parsed_or(name, default)
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    fn invalid(&self, name: &str, raw: &str) -> WireError {
        WireError::InvalidAttribute {
            tag: self.tag.clone(),
            attribute: name.to_owned(),
            value: raw.to_owned(),
        }
    }
}
