//! The tool registry: name-keyed map from schema to async executor.
//!
//! Grounded on `langgraph-prebuilt`'s `Tool`/`ToolRegistry` trait-based
//! tool system, generalized to the parameter schema and dual-dialect
//! emission the core needs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::result::ToolResult;
use super::schema::ToolSchema;
use crate::{Result, ToolingError};

/// An external capability invoked by an agent through the registry.
/// Implementors describe themselves via `schema()` and do the work in
/// `call()`; the registry handles validation and failure-wrapping.
#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;

    /// Perform the work. Arguments have already passed `validate` by the
    /// time this runs. Implementations should return `Err` rather than
    /// panic; the registry converts any `Err` into a failed `ToolResult`.
    async fn call(&self, args: Value) -> Result<Value>;
}

/// Maps a tool name to its schema + executor. Construction-time
/// registration only; concurrent `execute` calls are supported by virtue
/// of `Tool: Send + Sync` and `Arc` sharing.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `tool`. Fails if a tool with the same name already exists.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.schema().name;
        if self.tools.contains_key(&name) {
            return Err(ToolingError::General(format!(
                "tool already registered: {name}"
            )));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self, category: Option<&str>) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|t| t.schema())
            .filter(|s| category.map(|c| s.category.as_deref() == Some(c)).unwrap_or(true))
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Checks `args` against the declared schema: every required parameter
    /// present, every present value type-compatible, every enum-restricted
    /// value within its enum. Does not invoke the executor.
    pub fn validate(&self, name: &str, args: &Value) -> (bool, Option<String>) {
        let Some(tool) = self.get(name) else {
            return (false, Some(format!("unknown tool: {name}")));
        };
        let schema = tool.schema();
        let obj = args.as_object();

        for param in &schema.parameters {
            let value = obj.and_then(|o| o.get(&param.name));
            match value {
                None => {
                    if param.required {
                        return (
                            false,
                            Some(format!("missing required parameter: {}", param.name)),
                        );
                    }
                }
                Some(v) => {
                    if !param.kind.accepts(v) {
                        return (
                            false,
                            Some(format!(
                                "parameter {} has wrong type: expected {:?}",
                                param.name, param.kind
                            )),
                        );
                    }
                    if let Some(enum_values) = &param.enum_values {
                        if !enum_values.contains(v) {
                            return (
                                false,
                                Some(format!("parameter {} not in allowed values", param.name)),
                            );
                        }
                    }
                }
            }
        }
        (true, None)
    }

    /// Validates first; on invalid args returns a failure result without
    /// invoking the executor. Catches any executor error and returns
    /// `{success:false, error}` rather than propagating.
    pub async fn execute(&self, name: &str, args: Value) -> ToolResult {
        let (ok, error) = self.validate(name, &args);
        if !ok {
            return ToolResult::failure(error.unwrap_or_else(|| "invalid arguments".to_string()));
        }
        // `get` cannot be None here: `validate` already confirmed the tool exists.
        let tool = self.get(name).expect("validated tool must be registered");
        match tool.call(args).await {
            Ok(value) => ToolResult::success(value),
            Err(err) => ToolResult::failure(err.to_string()),
        }
    }

    pub fn to_function_schemas(&self, category: Option<&str>) -> Vec<Value> {
        self.list(category)
            .iter()
            .map(|s| s.to_function_schema())
            .collect()
    }

    pub fn to_mcp_schemas(&self, category: Option<&str>) -> Vec<Value> {
        self.list(category)
            .iter()
            .map(|s| s.to_mcp_schema())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::{ParameterKind, ToolParameter};

    struct EmissionCalculator;

    #[async_trait]
    impl Tool for EmissionCalculator {
        fn schema(&self) -> ToolSchema {
            ToolSchema::new("calc_emissions", "estimate emissions for a waste stream")
                .with_parameters(vec![
                    ToolParameter::new("waste_type", ParameterKind::String).required(),
                    ToolParameter::new("mass_kg", ParameterKind::Number).required(),
                ])
                .with_category("emissions")
        }

        async fn call(&self, args: Value) -> Result<Value> {
            let mass = args["mass_kg"].as_f64().unwrap_or(0.0);
            Ok(serde_json::json!({ "co2e_kg": mass * 0.5 }))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EmissionCalculator)).unwrap();
        registry
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = registry();
        let err = registry.register(Arc::new(EmissionCalculator)).unwrap_err();
        assert!(matches!(err, ToolingError::General(_)));
    }

    #[tokio::test]
    async fn missing_required_parameter_rejected_without_invoking_executor() {
        let registry = registry();
        let result = registry
            .execute("calc_emissions", serde_json::json!({}))
            .await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("missing required parameter: waste_type")
        );
    }

    #[tokio::test]
    async fn valid_args_invoke_executor() {
        let registry = registry();
        let result = registry
            .execute(
                "calc_emissions",
                serde_json::json!({ "waste_type": "plastic", "mass_kg": 10.0 }),
            )
            .await;
        assert!(result.success);
        assert_eq!(result.payload.unwrap()["co2e_kg"], serde_json::json!(5.0));
    }

    #[test]
    fn schema_emission_round_trips_shape() {
        let registry = registry();
        let function_schemas = registry.to_function_schemas(None);
        let mcp_schemas = registry.to_mcp_schemas(None);
        assert_eq!(function_schemas.len(), 1);
        assert_eq!(mcp_schemas.len(), 1);
        assert_eq!(function_schemas[0]["function"]["name"], "calc_emissions");
        assert_eq!(mcp_schemas[0]["name"], "calc_emissions");
    }
}
