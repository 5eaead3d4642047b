//! aptos-tx: Transaction structures for the Aptos fullnode REST API
//!
//! Provides the JSON shapes the fullnode expects for entry-function payloads,
//! unsigned transaction requests and Ed25519 signatures, plus the signer seam
//! an external wallet plugs into.

pub mod payload;
pub mod request;
pub mod signer;

pub use payload::*;
pub use request::*;
pub use signer::*;

/// Serde helper for `u64` fields the REST API renders as decimal strings.
///
/// Deserialization also accepts plain JSON numbers.
pub mod u64_string {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        struct U64Visitor;

        impl<'de> Visitor<'de> for U64Visitor {
            type Value = u64;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a u64 as a number or decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
                Ok(v)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
                u64::try_from(v).map_err(|_| E::custom(format!("negative value {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
                v.trim()
                    .parse()
                    .map_err(|_| E::custom(format!("invalid u64 string '{}'", v)))
            }
        }

        deserializer.deserialize_any(U64Visitor)
    }
}
