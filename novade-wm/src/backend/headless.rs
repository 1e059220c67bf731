//! Headless backend: virtual outputs from the configuration and in-memory surfaces.
//!
//! Nothing is drawn. [`HeadlessSurface`] records every call the compositor makes on
//! it, which makes it the client of choice for tests.

use std::cell::RefCell;
use std::rc::Rc;

use calloop::channel::Sender;
use novade_core::config::HeadlessConfig;
use novade_core::types::{Point, Size};
use tracing::{debug, info};

use super::{Backend, BackendEvent};
use crate::error::BackendError;
use crate::output::OutputDescriptor;
use crate::protocol::{
    AxisOrientation, ButtonState, DecorationMode, KeyState, Region, Serial, SizeHints,
    SurfaceHandle, SurfaceKey,
};

/// Everything the compositor sent to one headless surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceLog {
    pub configures: Vec<(Serial, Size)>,
    pub decoration_mode: Option<DecorationMode>,
    pub scale: Option<f64>,
    pub activated: bool,
    pub suspended: bool,
    pub fullscreen: bool,
    pub maximized: bool,
    pub keyboard_focus: bool,
    pub keyboard_enters: usize,
    pub keys: Vec<(u32, KeyState)>,
    pub motions: Vec<Point>,
    pub buttons: Vec<(u32, ButtonState)>,
    pub axes: Vec<(AxisOrientation, f64)>,
    pub closed: bool,
    next_serial: Serial,
}

impl SurfaceLog {
    pub fn last_configure(&self) -> Option<(Serial, Size)> {
        self.configures.last().copied()
    }
}

/// Read access to a surface's log after the surface was handed to the compositor.
#[derive(Debug, Clone)]
pub struct SurfaceProbe(Rc<RefCell<SurfaceLog>>);

impl SurfaceProbe {
    pub fn log(&self) -> SurfaceLog {
        self.0.borrow().clone()
    }
}

#[derive(Debug)]
pub struct HeadlessSurface {
    app_id: Option<String>,
    title: Option<String>,
    pid: Option<u32>,
    token: Option<String>,
    hints: SizeHints,
    decoration: Option<DecorationMode>,
    input_region: Option<Region>,
    log: Rc<RefCell<SurfaceLog>>,
}

impl HeadlessSurface {
    pub fn new(app_id: &str) -> Self {
        Self {
            app_id: Some(app_id.to_string()),
            title: None,
            pid: None,
            token: None,
            hints: SizeHints::default(),
            decoration: None,
            input_region: None,
            log: Rc::new(RefCell::new(SurfaceLog::default())),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_size_hints(mut self, hints: SizeHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_decoration(mut self, mode: DecorationMode) -> Self {
        self.decoration = Some(mode);
        self
    }

    pub fn with_input_region(mut self, region: Region) -> Self {
        self.input_region = Some(region);
        self
    }

    pub fn log(&self) -> SurfaceLog {
        self.log.borrow().clone()
    }

    pub fn probe(&self) -> SurfaceProbe {
        SurfaceProbe(Rc::clone(&self.log))
    }
}

impl SurfaceHandle for HeadlessSurface {
    fn app_id(&self) -> Option<String> {
        self.app_id.clone()
    }

    fn title(&self) -> Option<String> {
        self.title.clone()
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn activation_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn size_hints(&self) -> SizeHints {
        self.hints
    }

    fn preferred_decoration(&self) -> Option<DecorationMode> {
        self.decoration
    }

    fn input_region(&self) -> Option<Region> {
        self.input_region.clone()
    }

    fn send_configure(&mut self, size: Size) -> Serial {
        let mut log = self.log.borrow_mut();
        log.next_serial = log.next_serial.wrapping_add(1);
        let serial = log.next_serial;
        log.configures.push((serial, size));
        serial
    }

    fn set_decoration_mode(&mut self, mode: DecorationMode) {
        self.log.borrow_mut().decoration_mode = Some(mode);
    }

    fn set_preferred_scale(&mut self, scale: f64) {
        self.log.borrow_mut().scale = Some(scale);
    }

    fn set_activated(&mut self, activated: bool) {
        self.log.borrow_mut().activated = activated;
    }

    fn set_suspended(&mut self, suspended: bool) {
        self.log.borrow_mut().suspended = suspended;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.log.borrow_mut().fullscreen = fullscreen;
    }

    fn set_maximized(&mut self, maximized: bool) {
        self.log.borrow_mut().maximized = maximized;
    }

    fn keyboard_enter(&mut self) {
        let mut log = self.log.borrow_mut();
        log.keyboard_focus = true;
        log.keyboard_enters += 1;
    }

    fn keyboard_leave(&mut self) {
        self.log.borrow_mut().keyboard_focus = false;
    }

    fn send_key(&mut self, keycode: u32, state: KeyState) {
        self.log.borrow_mut().keys.push((keycode, state));
    }

    fn send_pointer_motion(&mut self, local: Point) {
        self.log.borrow_mut().motions.push(local);
    }

    fn send_button(&mut self, button: u32, state: ButtonState) {
        self.log.borrow_mut().buttons.push((button, state));
    }

    fn send_axis(&mut self, orientation: AxisOrientation, delta: f64) {
        self.log.borrow_mut().axes.push((orientation, delta));
    }

    fn close(&mut self) {
        self.log.borrow_mut().closed = true;
    }
}

/// Backend with virtual outputs and no real clients.
#[derive(Debug)]
pub struct HeadlessBackend {
    outputs: Vec<OutputDescriptor>,
    events: Option<Sender<BackendEvent>>,
    next_key: u64,
}

impl HeadlessBackend {
    pub fn new(outputs: Vec<OutputDescriptor>) -> Self {
        Self {
            outputs,
            events: None,
            next_key: 0,
        }
    }

    pub fn from_config(config: &HeadlessConfig) -> Self {
        let outputs = config
            .outputs
            .iter()
            .map(|o| {
                let desc = OutputDescriptor::new(o.name.clone(), Size::new(o.width, o.height))
                    .at(Point::new(o.x, o.y))
                    .with_scale(o.scale);
                if o.enabled {
                    desc
                } else {
                    desc.disabled()
                }
            })
            .collect();
        Self::new(outputs)
    }

    /// The event channel, once [`Backend::init`] ran.
    pub fn sender(&self) -> Option<Sender<BackendEvent>> {
        self.events.clone()
    }

    /// Allocates a surface key unique within this backend.
    pub fn next_surface_key(&mut self) -> SurfaceKey {
        self.next_key += 1;
        SurfaceKey(self.next_key)
    }

    pub fn send(&self, event: BackendEvent) -> Result<(), BackendError> {
        let events = self.events.as_ref().ok_or(BackendError::ChannelClosed)?;
        events.send(event).map_err(|_| BackendError::ChannelClosed)
    }
}

impl Backend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn init(&mut self, events: Sender<BackendEvent>) -> Result<Vec<OutputDescriptor>, BackendError> {
        if self.outputs.is_empty() {
            return Err(BackendError::NoOutputs(self.name().to_string()));
        }
        self.events = Some(events);
        info!(outputs = self.outputs.len(), "headless backend started");
        Ok(self.outputs.clone())
    }

    fn switch_vt(&mut self, vt: u32) -> Result<(), BackendError> {
        debug!(vt, "headless backend cannot switch virtual terminals");
        Err(BackendError::VtUnsupported(self.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novade_core::config::HeadlessOutputConfig;

    #[test]
    fn test_surface_records_configures_with_fresh_serials() {
        let mut surface = HeadlessSurface::new("app");
        let probe = surface.probe();
        let a = surface.send_configure(Size::new(10, 10));
        let b = surface.send_configure(Size::new(20, 20));
        assert_ne!(a, b);
        assert_eq!(probe.log().last_configure(), Some((b, Size::new(20, 20))));
    }

    #[test]
    fn test_from_config_maps_outputs() {
        let config = HeadlessConfig {
            outputs: vec![HeadlessOutputConfig {
                name: "HEADLESS-2".into(),
                width: 800,
                height: 600,
                x: 1920,
                y: 0,
                scale: 1.0,
                enabled: false,
            }],
        };
        let backend = HeadlessBackend::from_config(&config);
        assert_eq!(backend.outputs[0].position, Some(Point::new(1920, 0)));
        assert!(!backend.outputs[0].enabled);
    }

    #[test]
    fn test_init_without_outputs_fails() {
        let (sender, _channel) = calloop::channel::channel();
        let mut backend = HeadlessBackend::new(Vec::new());
        assert!(matches!(backend.init(sender), Err(BackendError::NoOutputs(_))));
    }
}
