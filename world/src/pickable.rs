//! Pointer reactions shared by everything the player can click or hover.

use glam::Vec3;
use tactica_core::{Diagnostics, Event, PickTarget};

use crate::{grid::HIGHLIGHT_LIFT, Grid, Unit};

/// Scene object that reacts to pointer interactions.
///
/// For every pointer interaction each pickable receives exactly one call:
/// the hit object gets `picked`/`hovered` and every other object gets
/// `unpicked`/`unhovered`.
pub trait Pickable {
    /// Mesh identity used to match pick hits against this object.
    fn target(&self) -> PickTarget;

    /// The pointer clicked this object at `point`.
    fn picked(&mut self, point: Vec3, diagnostics: &Diagnostics, out_events: &mut Vec<Event>);

    /// The pointer clicked somewhere else.
    fn unpicked(&mut self, diagnostics: &Diagnostics, out_events: &mut Vec<Event>);

    /// The pointer moved over this object at `point`.
    fn hovered(&mut self, point: Vec3, diagnostics: &Diagnostics, out_events: &mut Vec<Event>);

    /// The pointer moved somewhere else.
    fn unhovered(&mut self, diagnostics: &Diagnostics, out_events: &mut Vec<Event>);
}

impl Pickable for Grid {
    fn target(&self) -> PickTarget {
        PickTarget::Grid
    }

    fn picked(&mut self, point: Vec3, diagnostics: &Diagnostics, out_events: &mut Vec<Event>) {
        let position = self.resolve(point);
        diagnostics.emit(format_args!("Picked grid: {}", position.cell()));
        out_events.push(Event::CellPicked { position });
    }

    fn unpicked(&mut self, _diagnostics: &Diagnostics, _out_events: &mut Vec<Event>) {}

    fn hovered(&mut self, point: Vec3, _diagnostics: &Diagnostics, out_events: &mut Vec<Event>) {
        let position = self.resolve(point);
        let lifted = position.normalised_world_position() + Vec3::Y * HIGHLIGHT_LIFT;
        let _ = self.set_highlight(Some(lifted));
        out_events.push(Event::CellHovered { position });
    }

    fn unhovered(&mut self, _diagnostics: &Diagnostics, out_events: &mut Vec<Event>) {
        if self.set_highlight(None) {
            out_events.push(Event::CellUnhovered);
        }
    }
}

impl Pickable for Unit {
    fn target(&self) -> PickTarget {
        PickTarget::Unit(self.id())
    }

    fn picked(&mut self, _point: Vec3, diagnostics: &Diagnostics, out_events: &mut Vec<Event>) {
        if self.select(out_events) {
            diagnostics.emit(format_args!("Selected {}", self.name()));
        }
    }

    fn unpicked(&mut self, _diagnostics: &Diagnostics, _out_events: &mut Vec<Event>) {}

    fn hovered(&mut self, _point: Vec3, _diagnostics: &Diagnostics, _out_events: &mut Vec<Event>) {
    }

    fn unhovered(&mut self, _diagnostics: &Diagnostics, _out_events: &mut Vec<Event>) {}
}
