//! Built-in camera capabilities.
//!
//! Each action reports the change it applies to the camera app. The actions
//! are stateless: they validate their arguments and return a confirmation.

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use tracing::info;

use crate::registry::{ActionArgs, CapabilityRegistry, HandlerProfile, RegistryError};

type ActionFn = fn(&ActionArgs) -> Result<String>;

pub fn open_camera(_: &ActionArgs) -> Result<String> {
    info!(action = "open_camera", "camera opened");
    Ok("Camera opened".to_string())
}

pub fn close_camera(_: &ActionArgs) -> Result<String> {
    info!(action = "close_camera", "camera closed");
    Ok("Camera closed".to_string())
}

pub fn minimize_camera(_: &ActionArgs) -> Result<String> {
    info!(action = "minimize_camera", "camera minimized");
    Ok("Camera minimized".to_string())
}

pub fn restore_camera(_: &ActionArgs) -> Result<String> {
    info!(action = "restore_camera", "camera restored");
    Ok("Camera restored".to_string())
}

pub fn set_automatic_framing(args: &ActionArgs) -> Result<String> {
    let desired = desired_state(args)?;
    info!(action = "set_automatic_framing", desired, "automatic framing set");
    Ok(format!("Automatic framing set to {}", on_off(desired)))
}

pub fn set_background_effects(args: &ActionArgs) -> Result<String> {
    let desired = desired_state(args)?;
    info!(action = "set_background_effects", desired, "background effects set");
    Ok(format!("Background effects set to {}", on_off(desired)))
}

pub fn set_blur_type(args: &ActionArgs) -> Result<String> {
    let blur_type = args
        .get("blur_type")
        .and_then(Value::as_str)
        .context("blur_type must be a string")?;
    if !matches!(blur_type, "standard" | "portrait") {
        return Err(anyhow!("unsupported blur type {blur_type:?}"));
    }
    info!(action = "set_blur_type", blur_type, "blur type set");
    Ok(format!("Blur type set to {blur_type}"))
}

fn desired_state(args: &ActionArgs) -> Result<bool> {
    args.get("desired_state")
        .and_then(Value::as_bool)
        .context("desired_state must be true or false")
}

fn on_off(state: bool) -> &'static str {
    if state { "on" } else { "off" }
}

/// System message for a handler that toggles one on/off setting.
fn toggle_handler_message(feature: &str, function: &str) -> String {
    format!(
        "You control the {feature} setting of the camera.\n\
         Read the desired state from the message: \"to on\", \"enable\" or \"activate\" means \
         desired_state=true; \"to off\", \"disable\" or \"deactivate\" means desired_state=false.\n\
         Call {function} with desired_state set explicitly to true or false, never null.\n\
         Act only on the {feature} part of the message and ignore other settings.\n\
         After the call, reply with one short sentence saying what was done."
    )
}

fn single_function_message(function: &str) -> String {
    format!("You can execute the following functions: {function}")
}

fn desired_state_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "desired_state": { "type": "boolean" } },
        "required": ["desired_state"],
        "additionalProperties": false
    })
}

/// Registry with the camera handlers, one handler per capability.
pub fn camera_registry() -> Result<CapabilityRegistry, RegistryError> {
    let mut registry = CapabilityRegistry::new();

    let window_actions: [(ActionFn, &str, &str); 4] = [
        (open_camera, "open_camera", "Open the camera"),
        (close_camera, "close_camera", "Close the camera"),
        (minimize_camera, "minimize_camera", "Minimize the camera"),
        (restore_camera, "restore_camera", "Restore the camera"),
    ];
    for (action, function, description) in window_actions {
        let handler = HandlerProfile::new(format!("{function}_agent"), single_function_message(function));
        registry.register(action, &handler, function, description)?;
    }

    registry.register_with_parameters(
        set_automatic_framing,
        &HandlerProfile::new(
            "set_automatic_framing_agent",
            toggle_handler_message("automatic framing", "set_automatic_framing"),
        ),
        "set_automatic_framing",
        "Set automatic framing to on or off",
        desired_state_schema(),
    )?;
    registry.register_with_parameters(
        set_background_effects,
        &HandlerProfile::new(
            "set_background_effects_agent",
            toggle_handler_message("background effects", "set_background_effects"),
        ),
        "set_background_effects",
        "Set background effects to on or off",
        desired_state_schema(),
    )?;
    registry.register_with_parameters(
        set_blur_type,
        &HandlerProfile::new("set_blur_type_agent", single_function_message("set_blur_type")),
        "set_blur_type",
        "Set blur type to standard or portrait",
        json!({
            "type": "object",
            "properties": { "blur_type": { "enum": ["standard", "portrait"] } },
            "required": ["blur_type"],
            "additionalProperties": false
        }),
    )?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> ActionArgs {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn camera_registry_has_one_handler_per_capability() {
        let registry = camera_registry().expect("registry");
        let handlers: Vec<&str> = registry.handler_names().collect();
        assert_eq!(
            handlers,
            vec![
                "close_camera_agent",
                "minimize_camera_agent",
                "open_camera_agent",
                "restore_camera_agent",
                "set_automatic_framing_agent",
                "set_background_effects_agent",
                "set_blur_type_agent",
            ]
        );
        for handler in registry.handler_names() {
            assert_eq!(registry.capabilities_of(handler).count(), 1);
        }
    }

    #[test]
    fn toggles_require_explicit_state() {
        assert!(set_automatic_framing(&ActionArgs::new()).is_err());
        assert!(set_automatic_framing(&args(json!({ "desired_state": null }))).is_err());
        assert_eq!(
            set_automatic_framing(&args(json!({ "desired_state": false }))).expect("action"),
            "Automatic framing set to off"
        );
        assert_eq!(
            set_background_effects(&args(json!({ "desired_state": true }))).expect("action"),
            "Background effects set to on"
        );
    }

    #[test]
    fn blur_type_accepts_known_values_only() {
        assert_eq!(
            set_blur_type(&args(json!({ "blur_type": "portrait" }))).expect("action"),
            "Blur type set to portrait"
        );
        assert!(set_blur_type(&args(json!({ "blur_type": "heavy" }))).is_err());
    }

    #[test]
    fn framing_schema_rejects_null_state() {
        let registry = camera_registry().expect("registry");
        let capability = registry.capability("set_automatic_framing").expect("capability");
        assert!(capability.check_args(&args(json!({ "desired_state": null }))).is_err());
        assert!(capability.check_args(&args(json!({ "desired_state": true }))).is_ok());
    }
}
