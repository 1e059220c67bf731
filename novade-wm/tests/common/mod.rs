// novade-wm/tests/common/mod.rs

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use novade_core::config::WmConfig;
use novade_core::types::{Color, Point, Rect, Size};
use novade_wm::backend::headless::{HeadlessSurface, SurfaceProbe};
use novade_wm::error::PolicyError;
use novade_wm::policy::{ArrangeQuery, KeyCombo, Placement, PlacementQuery};
use novade_wm::scene::NodeKind;
use novade_wm::{
    Action, Compositor, NoopPolicy, Notification, OutputDescriptor, OutputId, PolicyEngine, WindowId,
};

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn compositor() -> Compositor {
    init_test_logging();
    Compositor::new(WmConfig::default(), Box::new(NoopPolicy)).expect("compositor starts")
}

pub fn compositor_with(policy: Box<dyn PolicyEngine>) -> Compositor {
    init_test_logging();
    Compositor::new(WmConfig::default(), policy).expect("compositor starts")
}

pub fn add_output(c: &mut Compositor, name: &str, x: i32) -> OutputId {
    c.add_output(OutputDescriptor::new(name, Size::new(1920, 1080)).at(Point::new(x, 0)))
        .expect("output added")
}

/// Creates, commits and maps a toplevel. Returns its id and a probe into what the
/// client received.
pub fn map_window(c: &mut Compositor, app_id: &str) -> (WindowId, SurfaceProbe) {
    let surface = HeadlessSurface::new(app_id);
    let probe = surface.probe();
    let id = c.create_window(Box::new(surface));
    c.commit_window(id, Size::default()).expect("initial commit");
    c.map_window(id).expect("map");
    (id, probe)
}

pub fn geometry(c: &Compositor, id: WindowId) -> Rect {
    c.window(id).expect("window exists").geometry()
}

/// Whether the window's scene subtree is enabled, i.e. it would be drawn.
pub fn render_enabled(c: &Compositor, id: WindowId) -> bool {
    c.window(id)
        .and_then(|w| w.scene())
        .map_or(false, |s| c.scene().is_effectively_enabled(s.tree()))
}

/// Color of the first border rect of a mapped window.
pub fn border_color(c: &Compositor, id: WindowId) -> Color {
    let window = c.window(id).expect("window exists");
    let node = window
        .scene()
        .and_then(|s| s.decorations().nodes().next())
        .expect("window has decorations");
    match c.scene().node(node).map(|n| n.kind()) {
        Some(NodeKind::Rect { color, .. }) => *color,
        other => panic!("unexpected border node {other:?}"),
    }
}

/// Records notifications and lifecycle calls; optionally fails every callback.
#[derive(Debug, Clone, Default)]
pub struct RecordingPolicy {
    pub log: Rc<RefCell<Vec<String>>>,
    pub fail: bool,
}

impl RecordingPolicy {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// How many `Geometry` property changes were announced for `id`.
    pub fn geometry_changes(&self, id: WindowId) -> usize {
        let entry = format!("property Geometry {id:?}");
        self.log.borrow().iter().filter(|e| **e == entry).count()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    fn record(&self, entry: String) -> Result<(), PolicyError> {
        self.log.borrow_mut().push(entry);
        if self.fail {
            return Err(PolicyError::Script("scripted failure".into()));
        }
        Ok(())
    }
}

impl PolicyEngine for RecordingPolicy {
    fn name(&self) -> &str {
        "recording"
    }

    fn notify(&mut self, notification: &Notification) -> Result<Vec<Action>, PolicyError> {
        let entry = match notification {
            Notification::WindowDestroyed(_) => "window-destroyed".to_string(),
            Notification::OutputRemoved { name, .. } => format!("output-removed {name}"),
            Notification::Shutdown => "shutdown".to_string(),
            Notification::PropertyChanged { window, property } => format!("property {property:?} {window:?}"),
            other => format!("{other:?}"),
        };
        self.record(entry)?;
        Ok(Vec::new())
    }

    fn place_window(&mut self, _query: &PlacementQuery) -> Result<Placement, PolicyError> {
        self.record("place".into())?;
        Ok(Placement::default())
    }

    fn match_key(&mut self, _combo: &KeyCombo) -> Result<Option<Vec<Action>>, PolicyError> {
        self.record("key".into())?;
        Ok(None)
    }

    fn arrange(&mut self, query: &ArrangeQuery) -> Result<Vec<(WindowId, Rect)>, PolicyError> {
        self.record("arrange".into())?;
        let area = query.usable_area;
        let count = query.windows.len() as i32;
        let width = area.width / count.max(1);
        Ok(query
            .windows
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, Rect::new(area.x + i as i32 * width, area.y, width, area.height)))
            .collect())
    }

    fn shutdown(&mut self) {
        self.log.borrow_mut().push("detached".into());
    }
}
