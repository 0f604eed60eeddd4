//! Terminal layout of the board and hit testing.
//!
//! One terminal cell covers `CELL_WIDTH` x `CELL_HEIGHT` board units; the board's
//! measured bounds are its cell size scaled by those factors.

use crate::geometry::{Bounds, Footprint, Point};
use crate::model::{AxisKey, Item, Quadrant};
use crate::store::Contents;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::Rect;

pub const CELL_WIDTH: f32 = 10.0;
pub const CELL_HEIGHT: f32 = 20.0;
const MIN_ITEM_CELLS: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemPart {
    Body,
    Delete,
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hit {
    Item {
        quadrant: Quadrant,
        index: usize,
        part: ItemPart,
    },
    Title(AxisKey),
    Board(Point),
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLayout {
    pub board: Rect,
    pub labels: [(AxisKey, Rect); 4],
}

impl BoardLayout {
    /// Splits `area` into the board plus one gutter per axis label. The board keeps an
    /// even number of columns and rows so both midlines fall on a cell boundary and a
    /// cell never straddles two quadrants.
    pub fn compute(area: Rect, label_width: u16) -> BoardLayout {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(label_width),
                Constraint::Min(0),
                Constraint::Length(label_width),
            ])
            .split(rows[1]);
        let board = Rect {
            width: cols[1].width & !1,
            height: cols[1].height & !1,
            ..cols[1]
        };
        let mid_row = board.y + board.height / 2;
        let side = |x: u16| Rect {
            x,
            y: mid_row.min(board.bottom().saturating_sub(1)),
            width: label_width,
            height: 1,
        };
        let edge = |y: u16| Rect {
            x: board.x,
            y,
            width: board.width,
            height: 1,
        };
        BoardLayout {
            board,
            labels: [
                (AxisKey::X1, side(cols[0].x)),
                (AxisKey::X2, side(cols[2].x)),
                (AxisKey::Y1, edge(rows[0].y)),
                (AxisKey::Y2, edge(rows[2].y)),
            ],
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::measured(
            self.board.width as f32 * CELL_WIDTH,
            self.board.height as f32 * CELL_HEIGHT,
        )
    }

    /// Board point of a terminal cell's top-left corner. Cells outside the board map
    /// to points outside the bounds.
    pub fn to_board(&self, col: u16, row: u16) -> Point {
        Point::new(
            (col as f32 - self.board.x as f32) * CELL_WIDTH,
            (row as f32 - self.board.y as f32) * CELL_HEIGHT,
        )
    }

    pub fn to_cell(&self, point: Point) -> (u16, u16) {
        let col = (point.x / CELL_WIDTH).floor().max(0.0) as u16;
        let row = (point.y / CELL_HEIGHT).floor().max(0.0) as u16;
        (
            self.board.x.saturating_add(col),
            self.board.y.saturating_add(row),
        )
    }

    /// Cells an item occupies, clipped to the board.
    pub fn item_rect(&self, item: &Item, footprint: Footprint) -> Rect {
        let (col, row) = self.to_cell(item.position);
        let width = ((footprint.width / CELL_WIDTH).ceil() as u16).max(MIN_ITEM_CELLS);
        let height = ((footprint.height / CELL_HEIGHT).ceil() as u16).max(MIN_ITEM_CELLS);
        Rect {
            x: col,
            y: row,
            width,
            height,
        }
        .intersection(self.board)
    }

    pub fn delete_cell(rect: Rect) -> (u16, u16) {
        (rect.right().saturating_sub(1), rect.y)
    }

    pub fn toggle_cell(rect: Rect) -> (u16, u16) {
        (rect.x.saturating_add(1), rect.y.saturating_add(1))
    }

    pub fn hit_test(&self, contents: &Contents, footprint: Footprint, col: u16, row: u16) -> Hit {
        for (axis, rect) in self.labels {
            if contains(rect, col, row) {
                return Hit::Title(axis);
            }
        }
        if !contains(self.board, col, row) {
            return Hit::Outside;
        }
        // Later items are drawn on top, so they win.
        for quadrant in Quadrant::ALL.into_iter().rev() {
            for (index, item) in contents.get(quadrant).iter().enumerate().rev() {
                let rect = self.item_rect(item, footprint);
                if !contains(rect, col, row) {
                    continue;
                }
                let part = if (col, row) == Self::delete_cell(rect) {
                    ItemPart::Delete
                } else if item.is_todo && (col, row) == Self::toggle_cell(rect) {
                    ItemPart::Toggle
                } else {
                    ItemPart::Body
                };
                return Hit::Item {
                    quadrant,
                    index,
                    part,
                };
            }
        }
        Hit::Board(self.to_board(col, row))
    }
}

pub fn contains(rect: Rect, col: u16, row: u16) -> bool {
    col >= rect.x && col < rect.right() && row >= rect.y && row < rect.bottom()
}
