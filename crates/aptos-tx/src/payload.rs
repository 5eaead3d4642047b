//! Entry-function payloads
//!
//! The fullnode JSON API takes every argument as a JSON value; `u64`
//! arguments must be decimal strings and addresses hex strings.

use serde::{Deserialize, Serialize};

/// Call of a public entry function in a published Move module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFunctionPayload {
    /// `<address>::<module>::<function>`
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<serde_json::Value>,
}

impl EntryFunctionPayload {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            type_arguments: Vec::new(),
            arguments: Vec::new(),
        }
    }

    pub fn type_arg(mut self, type_tag: impl Into<String>) -> Self {
        self.type_arguments.push(type_tag.into());
        self
    }

    /// Append a `u64` argument (encoded as a decimal string)
    pub fn u64_arg(mut self, value: u64) -> Self {
        self.arguments
            .push(serde_json::Value::String(value.to_string()));
        self
    }

    /// Append an `address` argument
    pub fn address_arg(mut self, address: impl Into<String>) -> Self {
        self.arguments.push(serde_json::Value::String(address.into()));
        self
    }

    /// Append a `String` / `vector<u8>` argument
    pub fn string_arg(mut self, value: impl Into<String>) -> Self {
        self.arguments.push(serde_json::Value::String(value.into()));
        self
    }

    /// Entry function name without module path
    pub fn function_name(&self) -> &str {
        self.function.rsplit("::").next().unwrap_or(&self.function)
    }
}

/// Transaction payload as tagged by the REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionPayload {
    EntryFunctionPayload(EntryFunctionPayload),
}

impl From<EntryFunctionPayload> for TransactionPayload {
    fn from(payload: EntryFunctionPayload) -> Self {
        Self::EntryFunctionPayload(payload)
    }
}
