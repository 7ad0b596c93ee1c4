// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait and registry.
//!
//! Every dispatchable operation implements [`Tool`]. The [`ToolRegistry`] is
//! the fixed set of supported operation names; anything not registered is
//! rejected as unsupported.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mnemo_core::MnemoError;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// A named operation invoked with JSON arguments.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique operation name used in the request envelope.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments object.
    fn parameters_schema(&self) -> Value;

    /// Run the operation. `arguments` is always a JSON value, `{}` when absent.
    async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError>;
}

/// Decode tool arguments, mapping serde errors to `InvalidArgument`.
///
/// `null` is treated as an empty object so tools without required fields
/// accept a bare call.
pub fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, MnemoError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| MnemoError::InvalidArgument(format!("invalid arguments for {tool}: {e}")))
}

/// Registry of available tools, indexed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool under its `name()`, replacing any previous entry.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Sorted tool names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `{name, description, parameters}` for every tool, sorted by name.
    pub fn tool_definitions(&self) -> Vec<Value> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "parameters": t.parameters_schema(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the message argument"
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"]
            })
        }

        async fn invoke(&self, arguments: Value) -> Result<Value, MnemoError> {
            #[derive(Deserialize)]
            struct Args {
                message: String,
            }
            let args: Args = parse_args(self.name(), arguments)?;
            Ok(json!({"message": args.message}))
        }
    }

    #[tokio::test]
    async fn registry_lookup_and_invoke() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("missing").is_none());

        let tool = registry.get("echo").unwrap();
        let out = tool.invoke(json!({"message": "hi"})).await.unwrap();
        assert_eq!(out["message"], "hi");
    }

    #[tokio::test]
    async fn missing_argument_names_the_field() {
        let err = EchoTool.invoke(json!({})).await.unwrap_err();
        assert_eq!(err.kind(), mnemo_core::ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("missing field `message`"), "{err}");

        let err = EchoTool.invoke(Value::Null).await.unwrap_err();
        assert!(err.to_string().contains("missing field `message`"), "{err}");
    }

    #[test]
    fn definitions_are_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let defs = registry.tool_definitions();
        assert_eq!(defs[0]["name"], "echo");
        assert_eq!(defs[0]["parameters"]["required"][0], "message");
    }
}
