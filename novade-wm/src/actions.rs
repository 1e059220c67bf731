//! Actions triggered by bindings or requested by the policy engine.
//!
//! Binding actions run immediately from the input handler. Actions returned by policy
//! callbacks are queued and drained by the refresh pass, at most
//! `general.max_policy_actions_per_cycle` per cycle.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::backend::BackendRequest;
use crate::compositor::Compositor;
use crate::diagnostics::DiagnosticSource;
use crate::error::{ActionError, CompositorError, OutputError};
use crate::tags::Tags;
use crate::window::WindowId;

/// How a boolean window state should change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
    Flip,
}

impl Toggle {
    pub fn apply(self, current: bool) -> bool {
        match self {
            Toggle::On => true,
            Toggle::Off => false,
            Toggle::Flip => !current,
        }
    }
}

/// The window an action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Focused,
    UnderPointer,
    Window(WindowId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Spawn(Vec<String>),
    Close(Target),
    Quit,
    View(Tags),
    ToggleView(Tags),
    Tag(Target, Tags),
    ToggleTag(Target, Tags),
    Floating(Target, Toggle),
    Fullscreen(Target, Toggle),
    Maximized(Target, Toggle),
    Minimize(Target),
    Raise(Target),
    Focus(WindowId),
    FocusNext,
    FocusPrev,
    MoveToOutput(Target, String),
    BeginMove(Target),
    BeginResize(Target),
    SwitchVt(u32),
}

impl Action {
    /// Parses a binding action such as `spawn foot --server` or `view 3`. Window
    /// actions apply to `target`.
    pub fn parse(text: &str, target: Target) -> Result<Action, ActionError> {
        let mut words = text.split_whitespace();
        let name = words.next().ok_or_else(|| ActionError::Unknown(String::new()))?;
        let rest: Vec<String> = words.map(str::to_string).collect();

        let arg = || {
            rest.first().cloned().ok_or_else(|| ActionError::MissingArgument {
                action: name.to_string(),
            })
        };
        let number = |range: std::ops::RangeInclusive<u32>| -> Result<u32, ActionError> {
            let value = arg()?;
            value
                .parse::<u32>()
                .ok()
                .filter(|n| range.contains(n))
                .ok_or(ActionError::InvalidArgument {
                    action: name.to_string(),
                    value,
                })
        };
        let tag = || number(1..=crate::tags::MAX_TAGS).map(|n| Tags::single(n).unwrap_or_default());

        let action = match name {
            "spawn" if rest.is_empty() => {
                return Err(ActionError::MissingArgument { action: name.into() })
            }
            "spawn" => Action::Spawn(rest.clone()),
            "close" => Action::Close(target),
            "quit" => Action::Quit,
            "view" => Action::View(tag()?),
            "toggle-view" => Action::ToggleView(tag()?),
            "tag" => Action::Tag(target, tag()?),
            "toggle-tag" => Action::ToggleTag(target, tag()?),
            "toggle-floating" => Action::Floating(target, Toggle::Flip),
            "toggle-fullscreen" => Action::Fullscreen(target, Toggle::Flip),
            "toggle-maximized" => Action::Maximized(target, Toggle::Flip),
            "minimize" => Action::Minimize(target),
            "raise" => Action::Raise(target),
            "focus-next" => Action::FocusNext,
            "focus-prev" => Action::FocusPrev,
            "move-to-output" => Action::MoveToOutput(target, arg()?),
            "move" => Action::BeginMove(target),
            "resize" => Action::BeginResize(target),
            "vt" => Action::SwitchVt(number(1..=12)?),
            other => return Err(ActionError::Unknown(other.to_string())),
        };
        Ok(action)
    }
}

/// Per-cycle bounded queue of policy-requested actions.
#[derive(Debug)]
pub(crate) struct ActionQueue {
    queue: VecDeque<Action>,
    limit: usize,
    accepted: usize,
}

impl ActionQueue {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            limit: limit.max(1),
            accepted: 0,
        }
    }

    /// Returns `false` if the per-cycle limit is reached and the action was dropped.
    pub(crate) fn push(&mut self, action: Action) -> bool {
        if self.accepted >= self.limit {
            return false;
        }
        self.accepted += 1;
        self.queue.push_back(action);
        true
    }

    pub(crate) fn pop(&mut self) -> Option<Action> {
        self.queue.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn reset_cycle(&mut self) {
        self.accepted = self.queue.len();
    }
}

impl Compositor {
    fn resolve_target(&self, target: Target) -> Option<WindowId> {
        match target {
            Target::Focused => self.focus.focused,
            Target::UnderPointer => self.window_under_pointer(),
            Target::Window(id) => self.windows.contains_key(id).then_some(id),
        }
    }

    /// Runs one action. Window actions without a resolvable target are no-ops.
    pub fn perform(&mut self, action: Action) -> Result<(), CompositorError> {
        debug!(?action, "performing action");
        match action {
            Action::Spawn(argv) => {
                self.spawn(&argv, true)?;
            }
            Action::Quit => {
                info!("quit requested");
                self.quit_requested = true;
            }
            Action::View(tags) => self.view_tags(None, tags)?,
            Action::ToggleView(tags) => self.toggle_view_tags(None, tags)?,
            Action::FocusNext => self.focus_next(),
            Action::FocusPrev => self.focus_prev(),
            Action::Focus(id) => {
                if self.is_window_visible(id) {
                    self.focus_window(id);
                }
            }
            Action::SwitchVt(vt) => self.backend_requests.push(BackendRequest::SwitchVt(vt)),
            Action::Close(target) => {
                if let Some(id) = self.resolve_target(target) {
                    self.close_window(id)?;
                }
            }
            Action::Tag(target, tags) => {
                if let Some(id) = self.resolve_target(target) {
                    self.set_window_tags(id, tags)?;
                }
            }
            Action::ToggleTag(target, tags) => {
                if let Some(id) = self.resolve_target(target) {
                    self.toggle_window_tags(id, tags)?;
                }
            }
            Action::Floating(target, toggle) => {
                if let Some(id) = self.resolve_target(target) {
                    let current = self.windows.get(id).map_or(false, |w| w.floating);
                    self.set_floating(id, toggle.apply(current))?;
                }
            }
            Action::Fullscreen(target, toggle) => {
                if let Some(id) = self.resolve_target(target) {
                    let current = self.windows.get(id).map_or(false, |w| w.is_fullscreen());
                    self.set_fullscreen(id, toggle.apply(current))?;
                }
            }
            Action::Maximized(target, toggle) => {
                if let Some(id) = self.resolve_target(target) {
                    let current = self
                        .windows
                        .get(id)
                        .map_or(false, |w| w.flags.contains(crate::window::WindowFlags::MAXIMIZED));
                    self.set_maximized(id, toggle.apply(current))?;
                }
            }
            Action::Minimize(target) => {
                if let Some(id) = self.resolve_target(target) {
                    self.set_minimized(id, true)?;
                }
            }
            Action::Raise(target) => {
                if let Some(id) = self.resolve_target(target) {
                    self.raise_window(id)?;
                }
            }
            Action::MoveToOutput(target, name) => {
                if let Some(id) = self.resolve_target(target) {
                    let output = self
                        .outputs
                        .by_name(&name)
                        .ok_or(OutputError::UnknownName(name))?;
                    self.move_window_to_output(id, output)?;
                }
            }
            Action::BeginMove(target) => {
                if let Some(id) = self.resolve_target(target) {
                    self.begin_move_grab(id);
                }
            }
            Action::BeginResize(target) => {
                if let Some(id) = self.resolve_target(target) {
                    self.begin_resize_grab(id);
                }
            }
        }
        Ok(())
    }

    /// Queues actions requested by the policy engine.
    pub(crate) fn queue_actions(&mut self, actions: Vec<Action>) {
        for action in actions {
            if !self.actions.push(action) {
                self.diagnostics.record(
                    DiagnosticSource::Policy,
                    "policy action limit reached for this cycle, dropping request",
                );
                break;
            }
        }
    }

    /// Drains the action queue. Returns how many actions ran.
    pub(crate) fn perform_queued_actions(&mut self) -> usize {
        let mut count = 0;
        while let Some(action) = self.actions.pop() {
            count += 1;
            if let Err(err) = self.perform(action) {
                self.diagnostics
                    .record(DiagnosticSource::Policy, format!("policy action failed: {err}"));
            }
        }
        count
    }

    pub fn queued_action_count(&self) -> usize {
        self.actions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_spawn_keeps_arguments() {
        let action = Action::parse("spawn foot --server", Target::Focused).unwrap();
        assert_eq!(action, Action::Spawn(vec!["foot".into(), "--server".into()]));
    }

    #[test]
    fn test_parse_tag_actions() {
        assert_eq!(
            Action::parse("view 3", Target::Focused),
            Ok(Action::View(Tags::single(3).unwrap()))
        );
        assert_eq!(
            Action::parse("tag 2", Target::UnderPointer),
            Ok(Action::Tag(Target::UnderPointer, Tags::single(2).unwrap()))
        );
        assert_eq!(
            Action::parse("view 0", Target::Focused),
            Err(ActionError::InvalidArgument {
                action: "view".into(),
                value: "0".into()
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Action::parse("spawn", Target::Focused),
            Err(ActionError::MissingArgument { action: "spawn".into() })
        );
        assert_eq!(
            Action::parse("explode", Target::Focused),
            Err(ActionError::Unknown("explode".into()))
        );
        assert!(Action::parse("vt 13", Target::Focused).is_err());
    }

    #[test]
    fn test_toggle_apply() {
        assert!(Toggle::Flip.apply(false));
        assert!(!Toggle::Flip.apply(true));
        assert!(Toggle::On.apply(true));
        assert!(!Toggle::Off.apply(true));
    }

    #[test]
    fn test_queue_limit_per_cycle() {
        let mut queue = ActionQueue::new(2);
        assert!(queue.push(Action::FocusNext));
        assert!(queue.push(Action::FocusPrev));
        assert!(!queue.push(Action::Quit));
        assert_eq!(queue.pop(), Some(Action::FocusNext));
        queue.reset_cycle();
        assert!(queue.push(Action::Quit), "a new cycle accepts actions again");
        assert_eq!(queue.len(), 2);
    }
}
