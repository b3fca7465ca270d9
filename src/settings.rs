use crate::drag::MouseButton;
use crate::keys::virtual_key_from_string;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown key name '{0}'")]
    UnknownKey(String),
    #[error("unknown mouse button '{0}'")]
    UnknownButton(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Key that has to be held for a press to start a drag.
    #[serde(default = "default_modifier")]
    pub modifier: String,
    /// Button that moves the window under the cursor.
    #[serde(default = "default_move_button")]
    pub move_button: String,
    /// Button that resizes the window under the cursor.
    #[serde(default = "default_resize_button")]
    pub resize_button: String,
    /// When enabled the logger runs at debug level and every recognized
    /// mouse event is logged from the dispatcher thread.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional file that receives the log output instead of stdout.
    #[serde(default)]
    pub log_file: Option<String>,
}

fn default_modifier() -> String {
    "Alt".into()
}

fn default_move_button() -> String {
    "left".into()
}

fn default_resize_button() -> String {
    "right".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            modifier: default_modifier(),
            move_button: default_move_button(),
            resize_button: default_resize_button(),
            debug_logging: false,
            log_file: None,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the configured names into the bindings used while intercepting.
    pub fn bindings(&self) -> Result<DragBindings, ConfigError> {
        let modifier = virtual_key_from_string(&self.modifier)
            .ok_or_else(|| ConfigError::UnknownKey(self.modifier.clone()))?;
        let move_button = self.move_button.parse::<MouseButton>()?;
        let resize_button = self.resize_button.parse::<MouseButton>()?;
        if move_button == resize_button {
            tracing::warn!(
                button = %move_button,
                "move and resize share a button; resizing only applies to windows that cannot be moved"
            );
        }
        Ok(DragBindings {
            modifier,
            move_button,
            resize_button,
        })
    }
}

/// The resolved modifier key and button bindings. Fixed for as long as
/// interception is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragBindings {
    pub modifier: u32,
    pub move_button: MouseButton,
    pub resize_button: MouseButton,
}

impl Default for DragBindings {
    fn default() -> Self {
        Self {
            modifier: crate::keys::VK_MENU,
            move_button: MouseButton::Left,
            resize_button: MouseButton::Right,
        }
    }
}

impl DragBindings {
    pub fn is_bound(&self, button: MouseButton) -> bool {
        button == self.move_button || button == self.resize_button
    }
}
