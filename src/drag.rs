//! Drag controller: relocates one item, possibly across quadrants.
//!
//! The controller owns no board state. Each move takes the current snapshot and
//! returns the next one for the caller to commit.

use crate::geometry::{classify, sub_rect, Bounds, Footprint, Point};
use crate::model::Quadrant;
use crate::store::Contents;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub quadrant: Quadrant,
    pub index: usize,
    /// Pointer offset from the item's top-left corner, fixed for the whole drag.
    pub offset: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Listener change the caller must apply after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listen {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn begin(
        &mut self,
        contents: &Contents,
        quadrant: Quadrant,
        index: usize,
        pointer: Point,
    ) -> Option<Listen> {
        let item = contents.item(quadrant, index)?;
        let was_dragging = self.is_dragging();
        self.state = DragState::Dragging(DragSession {
            quadrant,
            index,
            offset: pointer.offset_from(item.position),
        });
        info!(%quadrant, index, "drag started");
        if was_dragging {
            None
        } else {
            Some(Listen::Subscribe)
        }
    }

    /// Moves the grabbed item under `pointer`. Returns the next snapshot, or `None`
    /// when nothing should change (idle, no layout, or the item is gone).
    pub fn drag_to(
        &mut self,
        contents: &Contents,
        pointer: Point,
        bounds: Option<Bounds>,
        footprint: Footprint,
    ) -> Option<Contents> {
        let DragState::Dragging(session) = self.state else {
            return None;
        };
        let bounds = bounds?;
        let item = contents.item(session.quadrant, session.index)?;

        let candidate = pointer.offset_from(session.offset);
        let target = classify(pointer, bounds);
        let position = sub_rect(target, bounds).clamp_item(candidate, footprint);

        if target == session.quadrant {
            return Some(contents.update_at(session.quadrant, session.index, |item| {
                item.position = position;
            }));
        }

        let mut moved = item.clone();
        moved.position = position;
        let next = contents.move_across(session.quadrant, session.index, target, moved);
        let index = next.get(target).len().saturating_sub(1);
        debug!(from = %session.quadrant, to = %target, index, "drag crossed quadrant");
        self.state = DragState::Dragging(DragSession {
            quadrant: target,
            index,
            offset: session.offset,
        });
        Some(next)
    }

    pub fn release(&mut self) -> Option<Listen> {
        self.end("drag released")
    }

    pub fn cancel(&mut self) -> Option<Listen> {
        self.end("drag canceled")
    }

    fn end(&mut self, message: &str) -> Option<Listen> {
        match std::mem::take(&mut self.state) {
            DragState::Idle => None,
            DragState::Dragging(session) => {
                info!(quadrant = %session.quadrant, index = session.index, "{}", message);
                Some(Listen::Unsubscribe)
            }
        }
    }
}
