//! Typed window property table.
//!
//! Built-in properties are resolved through [`WindowProperty`]. Names the table does
//! not know are handed to a [`PropertyFallback`], which lets the policy engine attach
//! its own per-window values.

use std::collections::HashMap;
use std::fmt;

use novade_core::types::Rect;
use serde::Serialize;

use super::{WindowFlags, WindowId};
use crate::compositor::Compositor;
use crate::error::WindowError;
use crate::policy::Notification;
use crate::tags::Tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WindowProperty {
    AppId,
    Title,
    Pid,
    Geometry,
    Output,
    Tags,
    Floating,
    Fullscreen,
    Maximized,
    Minimized,
    Hidden,
    Urgent,
    Focus,
    Visible,
}

impl WindowProperty {
    pub const ALL: [WindowProperty; 14] = [
        WindowProperty::AppId,
        WindowProperty::Title,
        WindowProperty::Pid,
        WindowProperty::Geometry,
        WindowProperty::Output,
        WindowProperty::Tags,
        WindowProperty::Floating,
        WindowProperty::Fullscreen,
        WindowProperty::Maximized,
        WindowProperty::Minimized,
        WindowProperty::Hidden,
        WindowProperty::Urgent,
        WindowProperty::Focus,
        WindowProperty::Visible,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WindowProperty::AppId => "app_id",
            WindowProperty::Title => "title",
            WindowProperty::Pid => "pid",
            WindowProperty::Geometry => "geometry",
            WindowProperty::Output => "output",
            WindowProperty::Tags => "tags",
            WindowProperty::Floating => "floating",
            WindowProperty::Fullscreen => "fullscreen",
            WindowProperty::Maximized => "maximized",
            WindowProperty::Minimized => "minimized",
            WindowProperty::Hidden => "hidden",
            WindowProperty::Urgent => "urgent",
            WindowProperty::Focus => "focus",
            WindowProperty::Visible => "visible",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Properties only the compositor or the client may change.
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            WindowProperty::AppId
                | WindowProperty::Title
                | WindowProperty::Pid
                | WindowProperty::Output
                | WindowProperty::Focus
                | WindowProperty::Visible
        )
    }
}

impl fmt::Display for WindowProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PropertyValue {
    None,
    Bool(bool),
    Int(i64),
    Text(String),
    Rect(Rect),
    Tags(Tags),
}

impl PropertyValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::None => "none",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "int",
            PropertyValue::Text(_) => "text",
            PropertyValue::Rect(_) => "rect",
            PropertyValue::Tags(_) => "tags",
        }
    }
}

impl From<Option<String>> for PropertyValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(PropertyValue::None, PropertyValue::Text)
    }
}

/// Handles property names the built-in table does not know.
pub trait PropertyFallback: fmt::Debug {
    fn get(&self, window: WindowId, name: &str) -> Option<PropertyValue>;

    /// Returns `false` if the name is not accepted.
    fn set(&mut self, window: WindowId, name: &str, value: PropertyValue) -> bool;

    /// Drops everything stored for a destroyed window.
    fn forget(&mut self, window: WindowId);
}

/// Default fallback: accepts any name and keeps values per window.
#[derive(Debug, Default)]
pub struct CustomProperties {
    values: HashMap<WindowId, HashMap<String, PropertyValue>>,
}

impl CustomProperties {
    pub fn window_count(&self) -> usize {
        self.values.len()
    }
}

impl PropertyFallback for CustomProperties {
    fn get(&self, window: WindowId, name: &str) -> Option<PropertyValue> {
        self.values.get(&window)?.get(name).cloned()
    }

    fn set(&mut self, window: WindowId, name: &str, value: PropertyValue) -> bool {
        self.values
            .entry(window)
            .or_default()
            .insert(name.to_string(), value);
        true
    }

    fn forget(&mut self, window: WindowId) {
        self.values.remove(&window);
    }
}

impl Compositor {
    pub fn get_window_property(&self, id: WindowId, name: &str) -> Result<PropertyValue, WindowError> {
        let window = self.windows.get(id).ok_or(WindowError::NotFound(id))?;
        let Some(property) = WindowProperty::from_name(name) else {
            return self
                .property_fallback
                .get(id, name)
                .ok_or_else(|| WindowError::UnknownProperty { name: name.to_string() });
        };

        let value = match property {
            WindowProperty::AppId => window.app_id.clone().into(),
            WindowProperty::Title => window.title.clone().into(),
            WindowProperty::Pid => window
                .pid
                .map_or(PropertyValue::None, |pid| PropertyValue::Int(i64::from(pid))),
            WindowProperty::Geometry => PropertyValue::Rect(window.geometry),
            WindowProperty::Output => window
                .output
                .and_then(|o| self.outputs.get(o))
                .map_or(PropertyValue::None, |o| PropertyValue::Text(o.name.clone())),
            WindowProperty::Tags => PropertyValue::Tags(window.tags),
            WindowProperty::Floating => PropertyValue::Bool(window.floating),
            WindowProperty::Fullscreen => PropertyValue::Bool(window.flags.contains(WindowFlags::FULLSCREEN)),
            WindowProperty::Maximized => PropertyValue::Bool(window.flags.contains(WindowFlags::MAXIMIZED)),
            WindowProperty::Minimized => PropertyValue::Bool(window.flags.contains(WindowFlags::MINIMIZED)),
            WindowProperty::Hidden => PropertyValue::Bool(window.flags.contains(WindowFlags::HIDDEN)),
            WindowProperty::Urgent => PropertyValue::Bool(window.flags.contains(WindowFlags::URGENT)),
            WindowProperty::Focus => PropertyValue::Bool(self.focus.focused == Some(id)),
            WindowProperty::Visible => PropertyValue::Bool(!window.banned),
        };
        Ok(value)
    }

    /// Writes a property. Built-in properties go through the same operations as user
    /// actions, so they mark pending state and notify like any other change.
    pub fn set_window_property(
        &mut self,
        id: WindowId,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), WindowError> {
        if !self.windows.contains_key(id) {
            return Err(WindowError::NotFound(id));
        }
        let Some(property) = WindowProperty::from_name(name) else {
            if self.property_fallback.set(id, name, value) {
                return Ok(());
            }
            return Err(WindowError::UnknownProperty { name: name.to_string() });
        };
        if property.is_read_only() {
            return Err(WindowError::ReadOnlyProperty { name: name.to_string() });
        }

        let type_error = |expected| WindowError::PropertyType {
            name: name.to_string(),
            expected,
        };
        match (property, value) {
            (WindowProperty::Geometry, PropertyValue::Rect(rect)) => self.resize_window(id, rect),
            (WindowProperty::Geometry, _) => Err(type_error("rect")),
            (WindowProperty::Tags, PropertyValue::Tags(tags)) => self.set_window_tags(id, tags),
            (WindowProperty::Tags, _) => Err(type_error("tags")),
            (property, PropertyValue::Bool(on)) => match property {
                WindowProperty::Floating => self.set_floating(id, on),
                WindowProperty::Fullscreen => self.set_fullscreen(id, on),
                WindowProperty::Maximized => self.set_maximized(id, on),
                WindowProperty::Minimized => self.set_minimized(id, on),
                WindowProperty::Hidden => self.set_hidden(id, on),
                WindowProperty::Urgent => self.set_urgent(id, on),
                _ => Err(type_error("bool")),
            },
            _ => Err(type_error("bool")),
        }
    }

    /// Forwards a change to the policy engine as a property notification.
    pub(crate) fn notify_property(&mut self, window: WindowId, property: WindowProperty) {
        if self.windows.get(window).map_or(false, |w| w.managed) {
            self.notify(Notification::PropertyChanged { window, property });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_names_round_trip() {
        for property in WindowProperty::ALL {
            assert_eq!(WindowProperty::from_name(property.name()), Some(property));
        }
        assert_eq!(WindowProperty::from_name("opacity"), None);
    }

    #[test]
    fn test_read_only_properties() {
        assert!(WindowProperty::Title.is_read_only());
        assert!(WindowProperty::Visible.is_read_only());
        assert!(!WindowProperty::Urgent.is_read_only());
    }

    #[test]
    fn test_custom_properties_are_per_window() {
        let mut store = CustomProperties::default();
        let a = WindowId::default();
        assert!(store.set(a, "opacity", PropertyValue::Int(80)));
        assert_eq!(store.get(a, "opacity"), Some(PropertyValue::Int(80)));
        assert_eq!(store.get(a, "missing"), None);
        store.forget(a);
        assert_eq!(store.get(a, "opacity"), None);
        assert_eq!(store.window_count(), 0);
    }
}
