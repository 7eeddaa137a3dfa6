//! Typed message attributes and their wire binding.
//!
//! Only string and binary values exist; anything else is unrepresentable
//! by construction. [`validate`] enforces the remaining wire constraints
//! and must run before [`bind`] — publishers never bind unvalidated input.

use std::collections::HashMap;

use bytes::Bytes;
use pubsub_middleware::{WireAttribute, WireAttributeMap};

use crate::{Error, Result};

/// Transport limit on attribute key length
const MAX_KEY_LEN: usize = 256;

/// Keys under this prefix are reserved for the transport itself
const RESERVED_KEY_PREFIX: &str = "transport.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    Binary(Bytes),
}

pub type AttributeMap = HashMap<String, AttributeValue>;

/// Check an attribute mapping against the transport's wire constraints:
/// non-empty keys of bounded length outside the reserved namespace, and
/// non-empty values.
pub fn validate(attributes: &AttributeMap) -> Result<()> {
    for (key, value) in attributes {
        if key.is_empty() {
            return Err(Error::Validation("empty attribute key".to_string()));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(Error::Validation(format!(
                "attribute key {:.32}... exceeds {} characters",
                key, MAX_KEY_LEN
            )));
        }
        if key.to_ascii_lowercase().starts_with(RESERVED_KEY_PREFIX) {
            return Err(Error::Validation(format!(
                "attribute key {} uses the reserved {} prefix",
                key, RESERVED_KEY_PREFIX
            )));
        }
        let empty = match value {
            AttributeValue::String(s) => s.is_empty(),
            AttributeValue::Binary(b) => b.is_empty(),
        };
        if empty {
            return Err(Error::Validation(format!("attribute {} has an empty value", key)));
        }
    }
    Ok(())
}

/// Transform validated attributes into the transport's typed wire map.
/// Binary values are carried base64-encoded.
pub fn bind(attributes: &AttributeMap) -> WireAttributeMap {
    attributes
        .iter()
        .map(|(key, value)| {
            let wire = match value {
                AttributeValue::String(s) => WireAttribute::string(s.clone()),
                AttributeValue::Binary(b) => {
                    WireAttribute::binary(pubsub_codec::encode_text(b))
                }
            };
            (key.clone(), wire)
        })
        .collect()
}
