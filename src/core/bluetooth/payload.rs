//! Outbound payloads for a managed connection
//! Converts what the host wants to send into the bytes written to the socket.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::bluetooth::error::BridgeError;

/// Named text encodings accepted by `write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "UTF-8")]
    Utf8,
    /// Big-endian with a byte order mark
    #[serde(rename = "UTF-16")]
    Utf16,
    #[serde(rename = "UTF-16BE")]
    Utf16Be,
    #[serde(rename = "UTF-16LE")]
    Utf16Le,
    #[serde(rename = "US-ASCII")]
    Ascii,
    #[serde(rename = "ISO-8859-1")]
    Latin1,
}

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16 => "UTF-16",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf16Le => "UTF-16LE",
            Self::Ascii => "US-ASCII",
            Self::Latin1 => "ISO-8859-1",
        }
    }

    pub fn encode(self, text: &str) -> Result<Vec<u8>, BridgeError> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Utf16 => {
                let mut bytes = vec![0xFE, 0xFF];
                bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
                Ok(bytes)
            }
            Self::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            Self::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            Self::Ascii => Self::encode_single_byte(text, 0x7F, self),
            Self::Latin1 => Self::encode_single_byte(text, 0xFF, self),
        }
    }

    fn encode_single_byte(text: &str, max: u32, encoding: Self) -> Result<Vec<u8>, BridgeError> {
        text.chars()
            .map(|c| {
                u8::try_from(c as u32)
                    .ok()
                    .filter(|b| u32::from(*b) <= max)
                    .ok_or_else(|| {
                        BridgeError::InvalidArgument(format!(
                            "character {c:?} cannot be encoded as {}",
                            encoding.name()
                        ))
                    })
            })
            .collect()
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = BridgeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_uppercase().replace('_', "-").as_str() {
            "UTF-8" | "UTF8" => Ok(Self::Utf8),
            "UTF-16" | "UTF16" => Ok(Self::Utf16),
            "UTF-16BE" => Ok(Self::Utf16Be),
            "UTF-16LE" => Ok(Self::Utf16Le),
            "US-ASCII" | "ASCII" => Ok(Self::Ascii),
            "ISO-8859-1" | "LATIN1" | "LATIN-1" => Ok(Self::Latin1),
            _ => Err(BridgeError::InvalidArgument(format!(
                "unsupported encoding: {name}"
            ))),
        }
    }
}

/// Data handed to `write`.
#[derive(Debug, Clone, PartialEq)]
pub enum WritePayload {
    /// Written as-is
    Bytes(Vec<u8>),
    Text { text: String, encoding: TextEncoding },
    /// 4 bytes, big-endian
    Integer(i32),
    /// 8 bytes, big-endian
    Double(f64),
}

impl WritePayload {
    /// Text in the default encoding (UTF-8).
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            encoding: TextEncoding::default(),
        }
    }

    pub fn text_with(text: impl Into<String>, encoding: TextEncoding) -> Self {
        Self::Text {
            text: text.into(),
            encoding,
        }
    }

    /// Builds a payload from a host JSON value. Strings are text, integers
    /// that fit 32 bits are integers, other numbers are doubles and arrays of
    /// bytes are raw data. `force_string` sends numbers as their text form.
    pub fn from_json(
        data: &Value,
        encoding: TextEncoding,
        force_string: bool,
    ) -> Result<Self, BridgeError> {
        match data {
            Value::String(text) => Ok(Self::text_with(text.clone(), encoding)),
            Value::Number(number) if force_string => {
                Ok(Self::text_with(number.to_string(), encoding))
            }
            Value::Number(number) => {
                if let Some(int) = number.as_i64().and_then(|n| i32::try_from(n).ok()) {
                    Ok(Self::Integer(int))
                } else if let Some(double) = number.as_f64() {
                    Ok(Self::Double(double))
                } else {
                    Err(BridgeError::InvalidArgument(format!("unsupported number: {number}")))
                }
            }
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| {
                            BridgeError::InvalidArgument(format!("not a byte value: {item}"))
                        })
                })
                .collect::<Result<Vec<u8>, _>>()
                .map(Self::Bytes),
            other => Err(BridgeError::InvalidArgument(format!(
                "Unknown data-type: {other}"
            ))),
        }
    }

    /// The bytes transmitted for this payload.
    pub fn into_bytes(self) -> Result<Vec<u8>, BridgeError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Text { text, encoding } => encoding.encode(&text),
            Self::Integer(value) => Ok(value.to_be_bytes().to_vec()),
            Self::Double(value) => Ok(value.to_be_bytes().to_vec()),
        }
    }
}

impl From<Vec<u8>> for WritePayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&str> for WritePayload {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}
