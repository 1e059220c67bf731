// novade-wm/tests/window_manager.rs

mod common;

use std::collections::HashSet;

use common::*;
use novade_core::types::{Point, Rect, Size};
use novade_wm::input::InputEvent;
use novade_wm::input::bindings::{ButtonBinding, ButtonContext};
use novade_wm::input::Modifiers;
use novade_wm::protocol::AxisOrientation;
use novade_wm::{Action, Compositor, Tags, WindowId};
use pretty_assertions::assert_eq;

fn assert_visibility_invariant(c: &Compositor) {
    for window in c.windows().filter(|w| w.is_mapped()) {
        let id = window.id();
        let output_tags = window
            .output()
            .and_then(|o| c.outputs().get(o))
            .map(|o| o.active_tags())
            .unwrap_or(Tags::EMPTY);
        let info = window.info();
        let expected = !info.hidden && !info.minimized && window.tags().intersects(output_tags);
        assert_eq!(render_enabled(c, id), expected, "render state of {id:?}");
        assert_eq!(window.is_banned(), !expected, "ban state of {id:?}");
    }
}

#[test]
fn visibility_matches_tags_and_flags_after_every_refresh() {
    let mut c = compositor();
    add_output(&mut c, "A", 0);
    let (a, _) = map_window(&mut c, "a");
    let (b, _) = map_window(&mut c, "b");
    let (d, _) = map_window(&mut c, "d");
    c.refresh();
    assert_visibility_invariant(&c);

    c.set_window_tags(b, Tags::single(2).unwrap()).unwrap();
    c.set_minimized(d, true).unwrap();
    c.refresh();
    assert_visibility_invariant(&c);
    assert!(render_enabled(&c, a));
    assert!(!render_enabled(&c, b));

    c.view_tags(None, Tags::single(2).unwrap()).unwrap();
    c.refresh();
    assert_visibility_invariant(&c);
    assert!(render_enabled(&c, b));
    assert!(!render_enabled(&c, a));
}

#[test]
fn visibility_pass_is_idempotent() {
    let mut c = compositor();
    add_output(&mut c, "A", 0);
    let (a, _) = map_window(&mut c, "a");
    map_window(&mut c, "b");
    c.set_hidden(a, true).unwrap();

    let first = c.run_visibility_pass();
    assert!(!first.is_empty());
    let second = c.run_visibility_pass();
    assert!(second.is_empty(), "second pass changed {second:?}");
}

#[test]
fn windows_appear_once_in_stacking_and_focus() {
    let mut c = compositor();
    add_output(&mut c, "A", 0);
    let (a, _) = map_window(&mut c, "a");
    let (b, _) = map_window(&mut c, "b");
    c.raise_window(a).unwrap();
    c.raise_window(a).unwrap();
    c.focus_window(a);
    c.focus_window(b);
    c.focus_window(a);
    // A duplicate map is normalized into unmap + map.
    c.map_window(b).unwrap();
    c.refresh();

    let stacking: Vec<WindowId> = c.stacking().to_vec();
    let unique: HashSet<WindowId> = stacking.iter().copied().collect();
    assert_eq!(stacking.len(), unique.len());
    assert_eq!(stacking.len(), 2);

    let focus: Vec<WindowId> = c.focus_state().stack().iter().collect();
    let unique: HashSet<WindowId> = focus.iter().copied().collect();
    assert_eq!(focus.len(), unique.len());
}

#[test]
fn moving_between_outputs_round_trips() {
    let mut c = compositor();
    let a = add_output(&mut c, "A", 0);
    let b = add_output(&mut c, "B", 1920);
    let (id, _) = map_window(&mut c, "term");
    c.refresh();
    let original = geometry(&c, id);
    assert_eq!(c.window(id).unwrap().output(), Some(a));

    c.move_window_to_output(id, b).unwrap();
    c.refresh();
    assert_eq!(geometry(&c, id), original.translate(1920, 0));

    c.move_window_to_output(id, a).unwrap();
    c.refresh();
    assert_eq!(geometry(&c, id), original);
}

#[test]
fn destroy_without_unmap_matches_unmap_then_destroy() {
    let mut direct = compositor();
    add_output(&mut direct, "A", 0);
    let mut orderly = compositor();
    add_output(&mut orderly, "A", 0);
    let baseline = direct.scene().len();

    let (x, _) = map_window(&mut direct, "x");
    direct.refresh();
    direct.destroy_window(x).unwrap();
    direct.refresh();

    let (y, _) = map_window(&mut orderly, "y");
    orderly.refresh();
    orderly.unmap_window(y).unwrap();
    orderly.destroy_window(y).unwrap();
    orderly.refresh();

    for c in [&direct, &orderly] {
        assert_eq!(c.window_count(), 0);
        assert!(c.stacking().is_empty());
        assert!(c.focus_state().stack().is_empty());
        assert_eq!(c.focused_window(), None);
        assert_eq!(c.graveyard_len(), 0);
        assert_eq!(c.scene().len(), baseline);
    }
}

#[test]
fn map_on_active_output_then_migrate_on_disable() {
    let mut c = compositor();
    let a = add_output(&mut c, "A", 0);
    let b = add_output(&mut c, "B", 1920);
    c.set_active_output(b);

    let (id, _) = map_window(&mut c, "term");
    c.refresh();
    let placed = geometry(&c, id);
    assert_eq!(c.window(id).unwrap().output(), Some(b));
    assert!(placed.x >= 1920);

    c.set_output_enabled(b, false).unwrap();
    c.refresh();
    let migrated = geometry(&c, id);
    assert_eq!(c.window(id).unwrap().output(), Some(a));
    assert_eq!(migrated.x + migrated.width, 1920);
    assert_eq!(migrated.y, placed.y);
    assert_eq!(migrated.size(), placed.size());
}

#[test]
fn toggling_away_the_only_tag_drops_focus() {
    let mut c = compositor();
    add_output(&mut c, "A", 0);
    let (id, probe) = map_window(&mut c, "term");
    c.refresh();
    assert_eq!(c.focused_window(), Some(id));

    let tags = c.window(id).unwrap().tags();
    c.toggle_view_tags(None, tags).unwrap();
    assert_eq!(c.focused_window(), None);
    assert!(!probe.log().keyboard_focus);

    c.refresh();
    assert_eq!(c.focused_window(), None);
    assert!(c.window(id).unwrap().is_banned());
}

#[test]
fn configure_requests_coalesce_before_ack() {
    let mut c = compositor();
    add_output(&mut c, "A", 0);
    let (id, probe) = map_window(&mut c, "term");
    c.refresh();
    let sent = probe.log().configures.len();

    c.configure_request(id, Size::new(640, 480)).unwrap();
    c.configure_request(id, Size::new(800, 600)).unwrap();
    assert_eq!(
        c.window(id).unwrap().configure_state().requested(),
        Some(Size::new(800, 600))
    );

    c.refresh();
    let log = probe.log();
    assert_eq!(log.configures.len(), sent + 1);
    assert_eq!(log.last_configure().map(|(_, size)| size), Some(Size::new(800, 600)));
    assert_eq!(c.window(id).unwrap().configure_state().outstanding_count(), 1);
}

#[test]
fn scroll_over_desktop_runs_desktop_bindings_only() {
    let mut c = compositor();
    add_output(&mut c, "A", 0);
    let (id, probe) = map_window(&mut c, "term");
    c.refresh();
    let window = geometry(&c, id);

    c.bindings_mut().add_button(ButtonBinding {
        modifiers: Modifiers::empty(),
        button: 4,
        context: ButtonContext::Desktop,
        action: Action::View(Tags::single(3).unwrap()),
    });

    // Empty desktop corner.
    c.handle_input(InputEvent::PointerMotion {
        position: Point::new(5, 5),
    });
    assert!(!window.contains_point(Point::new(5, 5)));
    c.handle_input(InputEvent::Axis {
        orientation: AxisOrientation::Vertical,
        delta: -10.0,
    });

    let output = c.active_output().unwrap();
    assert_eq!(c.outputs().get(output).unwrap().active_tags(), Tags::single(3).unwrap());
    assert!(probe.log().axes.is_empty());
    assert!(probe.log().buttons.is_empty());
}

#[test]
fn scroll_over_window_is_forwarded_not_bound() {
    let mut c = compositor();
    add_output(&mut c, "A", 0);
    let (id, probe) = map_window(&mut c, "term");
    c.refresh();
    let center = {
        let g = c.window(id).unwrap().content_geometry();
        Point::new(g.x + g.width / 2, g.y + g.height / 2)
    };

    c.bindings_mut().add_button(ButtonBinding {
        modifiers: Modifiers::empty(),
        button: 4,
        context: ButtonContext::Desktop,
        action: Action::View(Tags::single(3).unwrap()),
    });
    c.handle_input(InputEvent::PointerMotion { position: center });
    c.handle_input(InputEvent::Axis {
        orientation: AxisOrientation::Vertical,
        delta: -10.0,
    });

    let output = c.active_output().unwrap();
    assert_eq!(c.outputs().get(output).unwrap().active_tags(), Tags::single(1).unwrap());
    assert_eq!(probe.log().axes, vec![(AxisOrientation::Vertical, -10.0)]);
}

#[test]
fn failing_policy_falls_back_to_defaults() {
    let policy = RecordingPolicy::failing();
    let mut c = compositor_with(Box::new(policy.clone()));
    add_output(&mut c, "A", 0);
    let (a, _) = map_window(&mut c, "a");
    let (b, _) = map_window(&mut c, "b");
    c.refresh();

    assert!(c.window(a).unwrap().is_mapped());
    assert_eq!(c.focused_window(), Some(b));
    assert!(!c.diagnostics().is_empty());
    assert!(c.diagnostics_text().contains("scripted failure"));
    assert!(policy.entries().iter().any(|e| e == "arrange"));
}

#[test]
fn policy_arrangement_tiles_visible_windows() {
    let policy = RecordingPolicy::default();
    let mut c = compositor_with(Box::new(policy));
    add_output(&mut c, "A", 0);
    let (a, _) = map_window(&mut c, "a");
    let (b, _) = map_window(&mut c, "b");
    c.refresh();

    let area = Rect::new(0, 0, 1920, 1080);
    let ga = geometry(&c, a);
    let gb = geometry(&c, b);
    assert_eq!(ga.width + gb.width, area.width);
    assert!(!ga.intersects(&gb));
}

#[test]
fn shutdown_tears_down_windows_before_policy() {
    let policy = RecordingPolicy::default();
    let mut c = compositor_with(Box::new(policy.clone()));
    add_output(&mut c, "A", 0);
    map_window(&mut c, "a");
    map_window(&mut c, "b");
    c.refresh();

    c.shutdown();
    let entries = policy.entries();
    let position = |needle: &str| entries.iter().rposition(|e| e == needle).unwrap();
    let last_window = position("window-destroyed");
    let output = position("output-removed A");
    let shutdown = position("shutdown");
    let detached = position("detached");
    assert!(last_window < output);
    assert!(output < shutdown);
    assert!(shutdown < detached);
    assert_eq!(c.window_count(), 0);
}

#[test]
fn maximize_announces_geometry_change() {
    let policy = RecordingPolicy::default();
    let mut c = compositor_with(Box::new(policy.clone()));
    add_output(&mut c, "A", 0);
    let (a, _) = map_window(&mut c, "a");
    map_window(&mut c, "b");
    c.refresh();
    let tiled = geometry(&c, a);
    assert_eq!(tiled.width, 960);
    policy.clear();

    c.set_maximized(a, true).unwrap();
    c.refresh();
    assert_eq!(geometry(&c, a), Rect::new(0, 0, 1920, 1080));
    assert_eq!(policy.geometry_changes(a), 1);

    policy.clear();
    c.set_maximized(a, false).unwrap();
    c.refresh();
    assert_ne!(geometry(&c, a), Rect::new(0, 0, 1920, 1080));
    assert!(policy.geometry_changes(a) >= 1);
}

#[test]
fn tiling_announces_geometry_of_every_rearranged_window() {
    let policy = RecordingPolicy::default();
    let mut c = compositor_with(Box::new(policy.clone()));
    add_output(&mut c, "A", 0);
    let (a, _) = map_window(&mut c, "a");
    let (b, _) = map_window(&mut c, "b");
    c.refresh();
    assert!(policy.geometry_changes(a) >= 1);
    assert!(policy.geometry_changes(b) >= 1);

    policy.clear();
    let (d, _) = map_window(&mut c, "d");
    c.refresh();
    for id in [a, b, d] {
        assert_eq!(geometry(&c, id).width, 640);
        assert!(policy.geometry_changes(id) >= 1, "no geometry change for {id:?}");
    }

    // A pass with nothing to re-tile stays quiet.
    policy.clear();
    c.refresh();
    assert_eq!(policy.geometry_changes(a), 0);
}

#[test]
fn one_refresh_settles_a_focus_change() {
    let mut c = compositor();
    add_output(&mut c, "A", 0);
    let (a, _) = map_window(&mut c, "a");
    let (b, _) = map_window(&mut c, "b");
    c.refresh();
    assert!(!c.needs_refresh());

    c.focus_window(a);
    c.refresh();
    let appearance = c.config().appearance.clone();
    assert_eq!(border_color(&c, a), appearance.border_color_focused);
    assert_eq!(border_color(&c, b), appearance.border_color_normal);
    assert!(c.window(a).unwrap().is_activated());
    assert!(!c.needs_refresh());
}

#[test]
fn moving_between_outputs_keeps_tag_membership() {
    let mut c = compositor();
    let a = add_output(&mut c, "A", 0);
    let b = add_output(&mut c, "B", 1920);
    let (id, _) = map_window(&mut c, "term");
    let two = Tags::single(2).unwrap();
    c.set_window_tags(id, two).unwrap();
    c.refresh();

    c.move_window_to_output(id, b).unwrap();
    c.refresh();
    assert_eq!(c.window(id).unwrap().tags(), two);

    c.move_window_to_output(id, a).unwrap();
    c.refresh();
    assert_eq!(c.window(id).unwrap().tags(), two);
}
