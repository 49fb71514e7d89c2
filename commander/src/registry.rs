//! Capability Registry: symbolic action names bound to callable actions and
//! the handler that owns them.
//!
//! A registry is an explicit value built once at startup and passed into the
//! pipeline. Nothing is global, so independent pipelines (tests included)
//! never share entries. Registration never overwrites: a duplicate
//! capability name or a conflicting handler profile is an error.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use jsonschema::{Draft, Validator};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Named arguments passed to an action.
pub type ActionArgs = Map<String, Value>;

/// A side-effecting capability. Actions take boolean/string parameters and
/// keep no state of their own.
pub type Action = Arc<dyn Fn(&ActionArgs) -> Result<String> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("capability `{0}` is already registered")]
    DuplicateCapability(String),
    #[error("handler `{0}` is already registered with a different system message")]
    ConflictingHandler(String),
    #[error("invalid parameter schema for `{name}`: {message}")]
    InvalidParameters { name: String, message: String },
}

/// The handler (agent) that owns one or more capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerProfile {
    pub name: String,
    pub system_message: String,
}

impl HandlerProfile {
    pub fn new(name: impl Into<String>, system_message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_message: system_message.into(),
        }
    }
}

/// A registered capability.
#[derive(Clone)]
pub struct Capability {
    pub name: String,
    pub handler: String,
    pub description: String,
    /// JSON Schema for the action's arguments.
    pub parameters: Value,
    validator: Arc<Validator>,
    action: Action,
}

impl Capability {
    /// Check `args` against the parameter schema, returning every violation.
    pub fn check_args(&self, args: &ActionArgs) -> Result<(), Vec<String>> {
        let instance = Value::Object(args.clone());
        let errors: Vec<String> = self
            .validator
            .iter_errors(&instance)
            .map(|err| err.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn invoke(&self, args: &ActionArgs) -> Result<String> {
        (self.action)(args)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("handler", &self.handler)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    handlers: BTreeMap<String, HandlerProfile>,
    capabilities: BTreeMap<String, Capability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameterless action under `name`, owned by `handler`.
    pub fn register<F>(
        &mut self,
        action: F,
        handler: &HandlerProfile,
        name: &str,
        description: &str,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&ActionArgs) -> Result<String> + Send + Sync + 'static,
    {
        self.register_with_parameters(
            action,
            handler,
            name,
            description,
            json!({ "type": "object", "properties": {}, "additionalProperties": false }),
        )
    }

    /// Register an action whose arguments must satisfy `parameters` (JSON Schema).
    pub fn register_with_parameters<F>(
        &mut self,
        action: F,
        handler: &HandlerProfile,
        name: &str,
        description: &str,
        parameters: Value,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&ActionArgs) -> Result<String> + Send + Sync + 'static,
    {
        if self.capabilities.contains_key(name) {
            return Err(RegistryError::DuplicateCapability(name.to_string()));
        }
        if self
            .handlers
            .get(&handler.name)
            .is_some_and(|existing| existing != handler)
        {
            return Err(RegistryError::ConflictingHandler(handler.name.clone()));
        }

        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&parameters)
            .map_err(|err| RegistryError::InvalidParameters {
                name: name.to_string(),
                message: err.to_string(),
            })?;

        self.handlers
            .entry(handler.name.clone())
            .or_insert_with(|| handler.clone());
        self.capabilities.insert(
            name.to_string(),
            Capability {
                name: name.to_string(),
                handler: handler.name.clone(),
                description: description.to_string(),
                parameters,
                validator: Arc::new(validator),
                action: Arc::new(action),
            },
        );
        Ok(())
    }

    pub fn contains_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn handler(&self, name: &str) -> Option<&HandlerProfile> {
        self.handlers.get(name)
    }

    pub fn capability(&self, name: &str) -> Option<&Capability> {
        self.capabilities.get(name)
    }

    /// Handler names in sorted order.
    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn handlers(&self) -> impl Iterator<Item = &HandlerProfile> {
        self.handlers.values()
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.values()
    }

    /// Capabilities owned by `handler`, sorted by name.
    pub fn capabilities_of<'a>(&'a self, handler: &'a str) -> impl Iterator<Item = &'a Capability> {
        self.capabilities
            .values()
            .filter(move |capability| capability.handler == handler)
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_action(_: &ActionArgs) -> Result<String> {
        Ok("done".to_string())
    }

    #[test]
    fn register_indexes_capability_and_handler() {
        let handler = HandlerProfile::new("open_camera_agent", "You open the camera.");
        let mut registry = CapabilityRegistry::new();
        registry
            .register(ok_action, &handler, "open_camera", "Open the camera")
            .expect("register");

        assert!(registry.contains_handler("open_camera_agent"));
        assert!(!registry.contains_handler("open_camera"));
        let capability = registry.capability("open_camera").expect("capability");
        assert_eq!(capability.handler, "open_camera_agent");
        assert_eq!(capability.invoke(&ActionArgs::new()).expect("invoke"), "done");
    }

    #[test]
    fn duplicate_capability_is_rejected_and_first_binding_kept() {
        let handler = HandlerProfile::new("open_camera_agent", "You open the camera.");
        let mut registry = CapabilityRegistry::new();
        registry
            .register(ok_action, &handler, "open_camera", "Open the camera")
            .expect("register");

        let err = registry
            .register(
                |_: &ActionArgs| Ok("other".to_string()),
                &handler,
                "open_camera",
                "Open it again",
            )
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateCapability("open_camera".to_string()));
        let kept = registry.capability("open_camera").expect("capability");
        assert_eq!(kept.description, "Open the camera");
    }

    #[test]
    fn conflicting_handler_profile_is_rejected() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(
                ok_action,
                &HandlerProfile::new("camera_agent", "first"),
                "open_camera",
                "Open",
            )
            .expect("register");
        let err = registry
            .register(
                ok_action,
                &HandlerProfile::new("camera_agent", "second"),
                "close_camera",
                "Close",
            )
            .unwrap_err();
        assert_eq!(err, RegistryError::ConflictingHandler("camera_agent".to_string()));
        assert!(registry.capability("close_camera").is_none());
    }

    #[test]
    fn one_handler_may_own_several_capabilities() {
        let handler = HandlerProfile::new("camera_agent", "You manage the camera window.");
        let mut registry = CapabilityRegistry::new();
        registry
            .register(ok_action, &handler, "minimize_camera", "Minimize")
            .expect("register");
        registry
            .register(ok_action, &handler, "restore_camera", "Restore")
            .expect("register");

        let owned: Vec<&str> = registry
            .capabilities_of("camera_agent")
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(owned, vec!["minimize_camera", "restore_camera"]);
        assert_eq!(registry.handler_names().count(), 1);
    }

    #[test]
    fn parameter_schema_is_enforced() {
        let handler = HandlerProfile::new("framing_agent", "You toggle framing.");
        let mut registry = CapabilityRegistry::new();
        registry
            .register_with_parameters(
                ok_action,
                &handler,
                "set_automatic_framing",
                "Set automatic framing",
                json!({
                    "type": "object",
                    "properties": { "desired_state": { "type": "boolean" } },
                    "required": ["desired_state"]
                }),
            )
            .expect("register");
        let capability = registry.capability("set_automatic_framing").expect("capability");

        let mut args = ActionArgs::new();
        assert!(capability.check_args(&args).is_err());
        args.insert("desired_state".to_string(), Value::Null);
        assert!(capability.check_args(&args).is_err());
        args.insert("desired_state".to_string(), Value::Bool(true));
        assert!(capability.check_args(&args).is_ok());
    }

    #[test]
    fn invalid_parameter_schema_is_rejected() {
        let handler = HandlerProfile::new("agent", "msg");
        let mut registry = CapabilityRegistry::new();
        let err = registry
            .register_with_parameters(ok_action, &handler, "broken", "Broken", json!({ "type": 12 }))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidParameters { .. }));
        assert!(registry.is_empty());
        assert!(!registry.contains_handler("agent"));
    }

    #[test]
    fn registries_are_independent() {
        let handler = HandlerProfile::new("open_camera_agent", "You open the camera.");
        let mut first = CapabilityRegistry::new();
        first
            .register(ok_action, &handler, "open_camera", "Open")
            .expect("register");
        let second = CapabilityRegistry::new();
        assert!(second.capability("open_camera").is_none());
    }
}
