//! Key and button binding tables.
//!
//! Button numbers follow the X11 convention: 1 left, 2 middle, 3 right, 4/5 vertical
//! scroll and 6/7 horizontal scroll. Scroll events are matched as press/release pairs
//! of buttons 4 to 7.

use std::fmt;

use novade_core::config::BindingsConfig;
use tracing::debug;

use super::keysym::{Keysym, Modifiers};
use crate::actions::{Action, Target};

const BTN_LEFT: u32 = 0x110;
const BTN_RIGHT: u32 = 0x111;
const BTN_MIDDLE: u32 = 0x112;

/// Maps an evdev button code to its X11 button number. Extra buttons follow the
/// scroll buttons, starting at 8.
pub fn button_number(code: u32) -> u32 {
    match code {
        BTN_LEFT => 1,
        BTN_MIDDLE => 2,
        BTN_RIGHT => 3,
        other => other.saturating_sub(BTN_LEFT) + 5,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonContext {
    /// Anywhere; transparent over windows.
    Global,
    /// Over a panel surface; consuming.
    Panel,
    /// Over the empty desktop; consuming.
    Desktop,
}

impl ButtonContext {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "global" | "" => Some(ButtonContext::Global),
            "panel" => Some(ButtonContext::Panel),
            "desktop" | "root" => Some(ButtonContext::Desktop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyBinding {
    pub modifiers: Modifiers,
    pub keysym: Keysym,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonBinding {
    pub modifiers: Modifiers,
    pub button: u32,
    pub context: ButtonContext,
    pub action: Action,
}

/// A binding entry that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingConfigError {
    pub index: usize,
    pub message: String,
}

impl fmt::Display for BindingConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding #{}: {}", self.index, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingTables {
    keys: Vec<KeyBinding>,
    buttons: Vec<ButtonBinding>,
}

impl BindingTables {
    /// Builds the tables from configuration. Invalid entries are skipped and returned
    /// so the caller can report them.
    pub fn from_config(config: &BindingsConfig) -> (Self, Vec<BindingConfigError>) {
        let mut tables = Self::default();
        let mut errors = Vec::new();

        for (index, entry) in config.keys.iter().enumerate() {
            let parsed = Modifiers::parse_names(entry.modifiers.as_slice())
                .map_err(|m| format!("unknown modifier '{m}'"))
                .and_then(|modifiers| {
                    let keysym = Keysym::from_name(&entry.key)
                        .ok_or_else(|| format!("unknown key '{}'", entry.key))?;
                    let action = Action::parse(&entry.action, Target::Focused).map_err(|e| e.to_string())?;
                    Ok(KeyBinding { modifiers, keysym, action })
                });
            match parsed {
                Ok(binding) => tables.keys.push(binding),
                Err(message) => errors.push(BindingConfigError { index, message }),
            }
        }

        for (index, entry) in config.buttons.iter().enumerate() {
            let parsed = Modifiers::parse_names(entry.modifiers.as_slice())
                .map_err(|m| format!("unknown modifier '{m}'"))
                .and_then(|modifiers| {
                    let context = ButtonContext::from_name(&entry.context)
                        .ok_or_else(|| format!("unknown context '{}'", entry.context))?;
                    let target = match context {
                        ButtonContext::Panel => Target::Focused,
                        _ => Target::UnderPointer,
                    };
                    let action = Action::parse(&entry.action, target).map_err(|e| e.to_string())?;
                    Ok(ButtonBinding {
                        modifiers,
                        button: entry.button,
                        context,
                        action,
                    })
                });
            match parsed {
                Ok(binding) => tables.buttons.push(binding),
                Err(message) => errors.push(BindingConfigError { index, message }),
            }
        }

        debug!(keys = tables.keys.len(), buttons = tables.buttons.len(), "bindings loaded");
        (tables, errors)
    }

    pub fn add_key(&mut self, binding: KeyBinding) {
        self.keys.push(binding);
    }

    pub fn add_button(&mut self, binding: ButtonBinding) {
        self.buttons.push(binding);
    }

    pub fn keys(&self) -> &[KeyBinding] {
        &self.keys
    }

    pub fn buttons(&self) -> &[ButtonBinding] {
        &self.buttons
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.buttons.clear();
    }

    /// Matches the stripped modifier mask against either the active or the level-0
    /// keysym.
    pub fn match_key(&self, modifiers: Modifiers, keysym: Keysym, level0: Keysym) -> Option<&KeyBinding> {
        let modifiers = modifiers.stripped();
        self.keys.iter().find(|b| {
            b.modifiers.stripped() == modifiers && (b.keysym == keysym || b.keysym == level0)
        })
    }

    pub fn match_button(
        &self,
        context: ButtonContext,
        modifiers: Modifiers,
        button: u32,
    ) -> Option<&ButtonBinding> {
        let modifiers = modifiers.stripped();
        self.buttons.iter().find(|b| {
            b.context == context && b.button == button && b.modifiers.stripped() == modifiers
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novade_core::config::{ButtonBindingConfig, KeyBindingConfig};
    use pretty_assertions::assert_eq;

    fn config() -> BindingsConfig {
        BindingsConfig {
            keys: vec![
                KeyBindingConfig {
                    modifiers: vec!["super".into()],
                    key: "Return".into(),
                    action: "spawn foot".into(),
                },
                KeyBindingConfig {
                    modifiers: vec!["super".into(), "shift".into()],
                    key: "q".into(),
                    action: "quit".into(),
                },
                KeyBindingConfig {
                    modifiers: vec!["hyper".into()],
                    key: "x".into(),
                    action: "quit".into(),
                },
            ],
            buttons: vec![ButtonBindingConfig {
                modifiers: vec![],
                button: 4,
                context: "desktop".into(),
                action: "view 2".into(),
            }],
        }
    }

    #[test]
    fn test_invalid_entries_are_reported() {
        let (tables, errors) = BindingTables::from_config(&config());
        assert_eq!(tables.keys().len(), 2);
        assert_eq!(tables.buttons().len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].index, 2);
    }

    #[test]
    fn test_match_uses_level0_keysym() {
        let (tables, _) = BindingTables::from_config(&config());
        let shifted_q = Keysym(u32::from('Q'));
        let level0_q = Keysym(u32::from('q'));
        let hit = tables
            .match_key(Modifiers::LOGO | Modifiers::SHIFT | Modifiers::NUM_LOCK, shifted_q, level0_q)
            .expect("binding should match through the level-0 keysym");
        assert_eq!(hit.action, Action::Quit);
        assert!(tables.match_key(Modifiers::LOGO, shifted_q, level0_q).is_none());
    }

    #[test]
    fn test_button_match_respects_context() {
        let (tables, _) = BindingTables::from_config(&config());
        assert!(tables.match_button(ButtonContext::Desktop, Modifiers::empty(), 4).is_some());
        assert!(tables.match_button(ButtonContext::Global, Modifiers::empty(), 4).is_none());
    }

    #[test]
    fn test_button_numbers() {
        assert_eq!(button_number(0x110), 1);
        assert_eq!(button_number(0x112), 2);
        assert_eq!(button_number(0x111), 3);
        assert_eq!(button_number(0x113), 8);
    }
}
