use crate::editor::Commit;
use crate::geometry::Point;
use crate::store::Contents;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const OPEN_TODO_GLYPH: &str = "□ ";
pub const DONE_TODO_GLYPH: &str = "☑ ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quadrant {
    A,
    B,
    C,
    D,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Quadrant::A, Quadrant::B, Quadrant::C, Quadrant::D];

    pub fn index(self) -> usize {
        match self {
            Quadrant::A => 0,
            Quadrant::B => 1,
            Quadrant::C => 2,
            Quadrant::D => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quadrant::A => "A",
            Quadrant::B => "B",
            Quadrant::C => "C",
            Quadrant::D => "D",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Axis label positions: x1 left, x2 right, y1 top, y2 bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AxisKey {
    X1,
    X2,
    Y1,
    Y2,
}

impl AxisKey {
    pub const ALL: [AxisKey; 4] = [AxisKey::X1, AxisKey::X2, AxisKey::Y1, AxisKey::Y2];

    pub fn label(self) -> &'static str {
        match self {
            AxisKey::X1 => "x1",
            AxisKey::X2 => "x2",
            AxisKey::Y1 => "y1",
            AxisKey::Y2 => "y2",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Titles {
    pub x1: String,
    pub x2: String,
    pub y1: String,
    pub y2: String,
}

impl Default for Titles {
    fn default() -> Self {
        Titles {
            x1: "1".into(),
            x2: "2".into(),
            y1: "3".into(),
            y2: "4".into(),
        }
    }
}

impl Titles {
    pub fn get(&self, axis: AxisKey) -> &str {
        match axis {
            AxisKey::X1 => &self.x1,
            AxisKey::X2 => &self.x2,
            AxisKey::Y1 => &self.y1,
            AxisKey::Y2 => &self.y2,
        }
    }

    fn slot_mut(&mut self, axis: AxisKey) -> &mut String {
        match axis {
            AxisKey::X1 => &mut self.x1,
            AxisKey::X2 => &mut self.x2,
            AxisKey::Y1 => &mut self.y1,
            AxisKey::Y2 => &mut self.y2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid color {0:?} (use #rrggbb)")]
pub struct ParseColorError(pub String);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let digits = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16);
        match digits.len() {
            6 => Ok(Rgb(
                channel(0..2).map_err(|_| err())?,
                channel(2..4).map_err(|_| err())?,
                channel(4..6).map_err(|_| err())?,
            )),
            // #rgb shorthand doubles each digit
            3 => {
                let short = |i: usize| channel(i..i + 1).map(|v| v * 17).map_err(|_| err());
                Ok(Rgb(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.hex()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub text: String,
    pub color: Rgb,
    pub font_size: u16,
    pub position: Point,
    pub is_todo: bool,
    pub completed: bool,
}

impl Item {
    /// Text as shown on the board, with the to-do glyph derived from the flags.
    pub fn display_text(&self) -> String {
        match (self.is_todo, self.completed) {
            (true, false) => format!("{}{}", OPEN_TODO_GLYPH, self.text),
            (true, true) => format!("{}{}", DONE_TODO_GLYPH, self.text),
            (false, _) => self.text.clone(),
        }
    }

    pub fn toggle_completed(&mut self) -> bool {
        if !self.is_todo {
            return false;
        }
        self.completed = !self.completed;
        true
    }
}

/// Splits a leading to-do glyph off typed text. `Some(completed)` when a glyph was
/// present.
pub fn split_todo_prefix(text: &str) -> (Option<bool>, &str) {
    if let Some(rest) = text.strip_prefix(OPEN_TODO_GLYPH) {
        (Some(false), rest)
    } else if let Some(rest) = text.strip_prefix(DONE_TODO_GLYPH) {
        (Some(true), rest)
    } else {
        (None, text)
    }
}

#[derive(Debug, Clone)]
pub struct Board {
    pub titles: Titles,
    pub contents: Contents,
    title_max_len: usize,
}

impl Board {
    pub fn new(titles: Titles, title_max_len: usize) -> Self {
        let mut board = Board {
            titles: Titles::default(),
            contents: Contents::default(),
            title_max_len,
        };
        for axis in AxisKey::ALL {
            board.set_title(axis, titles.get(axis));
        }
        board
    }

    pub fn title_max_len(&self) -> usize {
        self.title_max_len
    }

    pub fn set_title(&mut self, axis: AxisKey, text: &str) {
        let capped: String = text.chars().take(self.title_max_len).collect();
        *self.titles.slot_mut(axis) = capped;
    }

    pub fn replace_quadrant(&mut self, quadrant: Quadrant, items: Vec<Item>) {
        self.contents = self.contents.replace_quadrant(quadrant, items);
    }

    pub fn append_item(&mut self, quadrant: Quadrant, item: Item) {
        self.contents = self.contents.append_item(quadrant, item);
    }

    pub fn remove_item(&mut self, quadrant: Quadrant, index: usize) {
        self.contents = self.contents.remove_at(quadrant, index);
    }

    /// Applies an editor save through the two named store operations.
    pub fn apply(&mut self, commit: Commit) {
        match commit {
            Commit::Append { quadrant, item } => self.append_item(quadrant, item),
            Commit::Replace { quadrant, items } => self.replace_quadrant(quadrant, items),
            Commit::Unchanged => {}
        }
    }

    /// Installs a snapshot produced by the drag controller.
    pub fn commit(&mut self, contents: Contents) {
        self.contents = contents;
    }

    pub fn toggle_todo(&mut self, quadrant: Quadrant, index: usize) -> bool {
        let mut toggled = false;
        self.contents = self.contents.update_at(quadrant, index, |item| {
            toggled = item.toggle_completed();
        });
        debug!(%quadrant, index, toggled, "toggle to-do");
        toggled
    }
}
