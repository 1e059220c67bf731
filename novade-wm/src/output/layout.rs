//! The shared layout space all outputs are placed into.

use novade_core::types::{Point, Rect};
use slotmap::SlotMap;
use tracing::debug;

use super::{Output, OutputDescriptor, OutputId};
use crate::error::OutputError;
use crate::tags::Tags;

/// Registry of outputs in layout order.
///
/// Layout order is insertion order. It decides auto-placement of new outputs and
/// which output takes over the windows of a disabled one.
#[derive(Debug, Default)]
pub struct OutputLayout {
    outputs: SlotMap<OutputId, Output>,
    order: Vec<OutputId>,
    bounds: Rect,
    active: Option<OutputId>,
}

impl OutputLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an output and returns its id. The layout bounds are recomputed.
    pub fn insert(&mut self, desc: &OutputDescriptor, tags: Tags) -> Result<OutputId, OutputError> {
        if desc.mode.width <= 0 || desc.mode.height <= 0 {
            return Err(OutputError::InvalidMode {
                name: desc.name.clone(),
                width: desc.mode.width,
                height: desc.mode.height,
            });
        }
        if self.by_name(&desc.name).is_some() {
            return Err(OutputError::DuplicateName(desc.name.clone()));
        }

        let position = desc.position.unwrap_or_else(|| self.next_free_position());
        let id = self
            .outputs
            .insert_with_key(|id| Output::new(id, desc, position, tags));
        self.order.push(id);
        if self.active.is_none() && desc.enabled {
            self.active = Some(id);
        }
        self.recompute_bounds();
        debug!(name = %desc.name, ?position, "output added to layout");
        Ok(id)
    }

    /// Detaches the output from layout order without freeing it.
    pub(crate) fn detach(&mut self, id: OutputId) {
        self.order.retain(|o| *o != id);
        if let Some(output) = self.outputs.get_mut(id) {
            output.enabled = false;
        }
        if self.active == Some(id) {
            self.active = self.fallback(id);
        }
        self.recompute_bounds();
    }

    /// Frees a detached output.
    pub(crate) fn remove(&mut self, id: OutputId) -> Option<Output> {
        self.order.retain(|o| *o != id);
        let output = self.outputs.remove(id);
        self.recompute_bounds();
        output
    }

    fn next_free_position(&self) -> Point {
        let right = self
            .enabled()
            .map(|o| o.geometry().right())
            .max()
            .unwrap_or(0);
        Point::new(right, 0)
    }

    pub fn get(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(id)
    }

    pub fn get_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        self.outputs.get_mut(id)
    }

    pub fn contains(&self, id: OutputId) -> bool {
        self.outputs.contains_key(id)
    }

    pub fn by_name(&self, name: &str) -> Option<OutputId> {
        self.outputs.iter().find(|(_, o)| o.name == name).map(|(id, _)| id)
    }

    /// All outputs still in the layout, in layout order.
    pub fn iter(&self) -> impl Iterator<Item = &Output> {
        self.order.iter().filter_map(|id| self.outputs.get(*id))
    }

    pub fn ids(&self) -> Vec<OutputId> {
        self.order.clone()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Output> {
        self.iter().filter(|o| o.enabled)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Union of all enabled output geometries.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub(crate) fn recompute_bounds(&mut self) {
        self.bounds = self
            .enabled()
            .fold(Rect::default(), |acc, o| acc.union(&o.geometry()));
    }

    pub fn active(&self) -> Option<OutputId> {
        self.active
    }

    pub(crate) fn set_active(&mut self, id: OutputId) {
        if self.outputs.get(id).map_or(false, |o| o.enabled) {
            self.active = Some(id);
        }
    }

    /// Enabled output under `point`.
    pub fn output_at(&self, point: Point) -> Option<OutputId> {
        self.enabled()
            .find(|o| o.geometry().contains_point(point))
            .map(|o| o.id)
    }

    /// The output that takes over from `excluded`: the first enabled output in
    /// layout order. Always the same answer for the same layout.
    pub fn fallback(&self, excluded: OutputId) -> Option<OutputId> {
        self.enabled().find(|o| o.id != excluded).map(|o| o.id)
    }

    /// The output a new window lands on when nothing else decides.
    pub fn default_target(&self) -> Option<OutputId> {
        self.active
            .filter(|id| self.outputs.get(*id).map_or(false, |o| o.enabled))
            .or_else(|| self.enabled().next().map(|o| o.id))
    }

    /// Enabled output whose geometry overlaps `rect` the most.
    pub fn output_for_rect(&self, rect: &Rect) -> Option<OutputId> {
        self.enabled()
            .filter_map(|o| {
                o.geometry()
                    .intersection(rect)
                    .map(|i| (o.id, i.width as i64 * i.height as i64))
            })
            .max_by_key(|(_, area)| *area)
            .map(|(id, _)| id)
    }
}
