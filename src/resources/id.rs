//! `random_id`: random identifiers in several encodings.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{count, empty_import, from_state, to_state, Keepers, ResourceHandler, ResourceKind};
use crate::error::ProviderError;
use crate::random;
use crate::schema::{Attribute, Schema, Validator};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdModel {
    #[serde(default)]
    keepers: Keepers,
    byte_length: i64,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    b64_url: Option<String>,
    #[serde(default)]
    b64_std: Option<String>,
    #[serde(default)]
    hex: Option<String>,
    #[serde(default)]
    dec: Option<String>,
}

impl IdModel {
    fn encode(keepers: Keepers, prefix: Option<String>, bytes: &[u8]) -> Self {
        let p = prefix.as_deref().unwrap_or_default();
        let b64_url = URL_SAFE_NO_PAD.encode(bytes);
        Self {
            keepers,
            byte_length: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
            b64_url: Some(format!("{}{}", p, b64_url)),
            b64_std: Some(format!("{}{}", p, STANDARD.encode(bytes))),
            hex: Some(format!("{}{}", p, hex::encode(bytes))),
            dec: Some(format!("{}{}", p, to_decimal(bytes))),
            id: Some(b64_url),
            prefix,
        }
    }
}

/// Decimal digits of a big-endian unsigned integer of any width.
fn to_decimal(bytes: &[u8]) -> String {
    let mut number: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
    let mut digits = Vec::new();
    while !number.is_empty() {
        let mut remainder = 0u32;
        let mut quotient = Vec::with_capacity(number.len());
        for byte in &number {
            let acc = (remainder << 8) | u32::from(*byte);
            let q = acc / 10;
            remainder = acc % 10;
            if !quotient.is_empty() || q != 0 {
                quotient.push(q as u8);
            }
        }
        digits.push(char::from(b'0' + remainder as u8));
        number = quotient;
    }
    if digits.is_empty() {
        return "0".to_string();
    }
    digits.iter().rev().collect()
}

/// `random_id`
pub struct IdResource;

impl ResourceHandler for IdResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Id
    }

    fn schema(&self) -> Schema {
        let output = |description: &str| {
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description(description)
        };
        Schema::v0()
            .with_description(
                "The resource random_id generates random numbers that are intended to be used as \
                 unique identifiers for other resources.",
            )
            .with_attribute("keepers", Attribute::keepers())
            .with_attribute(
                "byte_length",
                Attribute::required_int64()
                    .requires_replace()
                    .with_validator(Validator::AtLeast(1))
                    .with_description("The number of random bytes to produce. The minimum value is 1."),
            )
            .with_attribute(
                "prefix",
                Attribute::optional_string()
                    .requires_replace()
                    .with_description(
                        "Arbitrary string to prefix the output value with. This string is supplied \
                         as-is, meaning it is not guaranteed to be URL-safe or base64 encoded.",
                    ),
            )
            .with_attribute("id", output("The generated id presented in base64 without additional transformations."))
            .with_attribute(
                "b64_url",
                output("The generated id presented in base64, using the URL-friendly character set."),
            )
            .with_attribute(
                "b64_std",
                output("The generated id presented in base64 without additional transformations."),
            )
            .with_attribute("hex", output("The generated id presented in padded hexadecimal digits."))
            .with_attribute("dec", output("The generated id presented in non-padded decimal digits."))
    }

    fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let model: IdModel = from_state(planned)?;
        let length = count(self.kind(), "byte_length", model.byte_length)?;
        let mut rng = random::secure_rng(self.kind().type_name())?;
        let bytes = random::random_bytes(&mut rng, length);
        debug!(byte_length = length, "Generated random id");
        to_state(&IdModel::encode(model.keepers, model.prefix, &bytes))
    }

    fn import(&self, id: &str) -> Result<Value, ProviderError> {
        let (prefix, encoded) = match id.split_once(',') {
            Some((prefix, encoded)) => (Some(prefix.to_string()), encoded),
            None => (None, id),
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| ProviderError::Import(format!("Error decoding ID: {}", e)))?;
        if bytes.is_empty() {
            return Err(empty_import(self.kind()));
        }
        to_state(&IdModel::encode(None, prefix, &bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_decimal() {
        assert_eq!(to_decimal(&[]), "0");
        assert_eq!(to_decimal(&[0, 0]), "0");
        assert_eq!(to_decimal(&[7]), "7");
        assert_eq!(to_decimal(&[1, 0]), "256");
        assert_eq!(to_decimal(&[0xff; 8]), u64::MAX.to_string());
        assert_eq!(to_decimal(&[0x01, 0, 0, 0, 0, 0, 0, 0, 0]), "18446744073709551616");
    }

    #[test]
    fn test_create() {
        let state = IdResource
            .create(json!({"byte_length": 4, "prefix": "srv-"}))
            .unwrap();
        let id = state["id"].as_str().unwrap();
        let bytes = URL_SAFE_NO_PAD.decode(id).unwrap();
        assert_eq!(bytes.len(), 4);
        assert_eq!(state["b64_url"], format!("srv-{}", id));
        assert_eq!(state["hex"], format!("srv-{}", hex::encode(&bytes)));
        assert_eq!(state["b64_std"], format!("srv-{}", STANDARD.encode(&bytes)));
        let dec = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(state["dec"], format!("srv-{}", dec));
    }

    #[test]
    fn test_import_with_prefix() {
        let state = IdResource.import("app-,AQID").unwrap();
        assert_eq!(state["id"], "AQID");
        assert_eq!(state["prefix"], "app-");
        assert_eq!(state["byte_length"], 3);
        assert_eq!(state["hex"], "app-010203");
        assert_eq!(state["dec"], "app-66051");
    }

    #[test]
    fn test_import_without_prefix() {
        let state = IdResource.import("AQID").unwrap();
        assert_eq!(state["prefix"], Value::Null);
        assert_eq!(state["b64_url"], "AQID");
        assert_eq!(state["b64_std"], "AQID");
    }

    #[test]
    fn test_import_invalid() {
        assert!(matches!(IdResource.import("***"), Err(ProviderError::Import(_))));
    }

    #[test]
    fn test_import_empty() {
        assert!(matches!(IdResource.import(""), Err(ProviderError::Import(_))));
        assert!(matches!(IdResource.import("app-,"), Err(ProviderError::Import(_))));
    }
}
