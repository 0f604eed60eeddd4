//! Editor overlay state machine.
//!
//! ```text
//! Closed        -> OpenForCreate   (click on empty board)
//! Closed        -> OpenForEdit     (double click on an item)
//! Open*         -> Open*           (re-open discards the previous session)
//! OpenForCreate -> Closed          (save: append item)
//! OpenForEdit   -> Closed          (save: merge fields, keep position)
//! Open*         -> Closed          (cancel)
//! ```

use crate::geometry::{classify, sub_rect, Bounds, Footprint, Point};
use crate::model::{split_todo_prefix, Item, Quadrant, Rgb};
use crate::store::Contents;
use tracing::debug;

pub const MIN_FONT_SIZE: u16 = 8;
pub const MAX_FONT_SIZE: u16 = 72;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EditorError {
    #[error("editor is not open")]
    NotOpen,
    #[error("text is required")]
    EmptyText,
    #[error("invalid color {0:?} (use #rrggbb)")]
    InvalidColor(String),
    #[error("font size must be a number between 8 and 72: {0:?}")]
    InvalidFontSize(String),
}

/// Field values a brand-new item starts with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemDefaults {
    pub color: Rgb,
    pub font_size: u16,
}

impl Default for ItemDefaults {
    fn default() -> Self {
        ItemDefaults {
            color: Rgb::BLACK,
            font_size: 16,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldValue {
    pub value: String,
    pub cursor: usize,
    max_chars: Option<usize>,
}

impl FieldValue {
    pub fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
            max_chars: None,
        }
    }

    pub fn capped(value: &str, max_chars: usize) -> Self {
        let value: String = value.chars().take(max_chars).collect();
        FieldValue {
            cursor: value.len(),
            value,
            max_chars: Some(max_chars),
        }
    }

    pub fn move_left(&mut self) {
        if let Some((idx, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(ch) = self.value[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    pub fn backspace(&mut self) {
        if let Some((prev, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.value.drain(prev..self.cursor);
            self.cursor = prev;
        }
    }

    pub fn insert_char(&mut self, ch: char) {
        if let Some(max) = self.max_chars {
            if self.value.chars().count() >= max {
                return;
            }
        }
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FormField {
    Text,
    Color,
    FontSize,
    Todo,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemForm {
    pub text: FieldValue,
    pub color: FieldValue,
    pub font_size: FieldValue,
    pub is_todo: bool,
    pub field: FormField,
    completed: bool,
}

struct ParsedForm {
    text: String,
    color: Rgb,
    font_size: u16,
    is_todo: bool,
    completed: bool,
    /// A glyph typed at the start of the text decides completion.
    completion_typed: bool,
}

impl ItemForm {
    pub fn new(defaults: &ItemDefaults) -> Self {
        ItemForm {
            text: FieldValue::new(""),
            color: FieldValue::new(&defaults.color.hex()),
            font_size: FieldValue::new(&defaults.font_size.to_string()),
            is_todo: false,
            field: FormField::Text,
            completed: false,
        }
    }

    pub fn from_item(item: &Item) -> Self {
        ItemForm {
            text: FieldValue::new(&item.text),
            color: FieldValue::new(&item.color.hex()),
            font_size: FieldValue::new(&item.font_size.to_string()),
            is_todo: item.is_todo,
            field: FormField::Text,
            completed: item.completed,
        }
    }

    pub fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Text => FormField::Color,
            FormField::Color => FormField::FontSize,
            FormField::FontSize => FormField::Todo,
            FormField::Todo => FormField::Text,
        };
    }

    pub fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Text => FormField::Todo,
            FormField::Color => FormField::Text,
            FormField::FontSize => FormField::Color,
            FormField::Todo => FormField::FontSize,
        };
    }

    /// The text field under the cursor; `None` when the checkbox is focused.
    pub fn active_field_mut(&mut self) -> Option<&mut FieldValue> {
        match self.field {
            FormField::Text => Some(&mut self.text),
            FormField::Color => Some(&mut self.color),
            FormField::FontSize => Some(&mut self.font_size),
            FormField::Todo => None,
        }
    }

    pub fn toggle_todo(&mut self) {
        self.is_todo = !self.is_todo;
    }

    fn parse(&self) -> Result<ParsedForm, EditorError> {
        let (typed_todo, text) = split_todo_prefix(&self.text.value);
        if text.trim().is_empty() {
            return Err(EditorError::EmptyText);
        }
        let color = self
            .color
            .value
            .parse::<Rgb>()
            .map_err(|_| EditorError::InvalidColor(self.color.value.clone()))?;
        let font_size = self
            .font_size
            .value
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|size| (MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(size))
            .ok_or_else(|| EditorError::InvalidFontSize(self.font_size.value.clone()))?;
        let (is_todo, completed) = match typed_todo {
            Some(done) => (true, done),
            None => (self.is_todo, self.is_todo && self.completed),
        };
        Ok(ParsedForm {
            text: text.to_string(),
            color,
            font_size,
            is_todo,
            completed,
            completion_typed: typed_todo.is_some(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub enum Editor {
    #[default]
    Closed,
    OpenForCreate {
        position: Point,
        quadrant: Quadrant,
        form: ItemForm,
    },
    OpenForEdit {
        quadrant: Quadrant,
        index: usize,
        position: Point,
        form: ItemForm,
    },
}

impl Editor {
    pub fn is_open(&self) -> bool {
        !matches!(self, Editor::Closed)
    }

    pub fn position(&self) -> Option<Point> {
        match self {
            Editor::Closed => None,
            Editor::OpenForCreate { position, .. } | Editor::OpenForEdit { position, .. } => {
                Some(*position)
            }
        }
    }

    pub fn form(&self) -> Option<&ItemForm> {
        match self {
            Editor::Closed => None,
            Editor::OpenForCreate { form, .. } | Editor::OpenForEdit { form, .. } => Some(form),
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut ItemForm> {
        match self {
            Editor::Closed => None,
            Editor::OpenForCreate { form, .. } | Editor::OpenForEdit { form, .. } => Some(form),
        }
    }

    /// Opens for a new item at `point`. Does nothing when the board has no layout.
    pub fn open_create(
        &mut self,
        point: Point,
        bounds: Option<Bounds>,
        defaults: &ItemDefaults,
        footprint: Footprint,
    ) -> bool {
        let Some(bounds) = bounds else {
            return false;
        };
        let quadrant = classify(point, bounds);
        let position = sub_rect(quadrant, bounds).clamp_item(point, footprint);
        debug!(%quadrant, x = position.x, y = position.y, "editor open for create");
        *self = Editor::OpenForCreate {
            position,
            quadrant,
            form: ItemForm::new(defaults),
        };
        true
    }

    pub fn open_edit(&mut self, contents: &Contents, quadrant: Quadrant, index: usize) -> bool {
        let Some(item) = contents.item(quadrant, index) else {
            return false;
        };
        debug!(%quadrant, index, "editor open for edit");
        *self = Editor::OpenForEdit {
            quadrant,
            index,
            position: item.position,
            form: ItemForm::from_item(item),
        };
        true
    }

    pub fn cancel(&mut self) {
        if self.is_open() {
            debug!("editor canceled");
        }
        *self = Editor::Closed;
    }

    /// Commits the open session. On a validation error the session stays open so the
    /// user can correct the form.
    pub fn save(&mut self, contents: &Contents) -> Result<Commit, EditorError> {
        let commit = match self {
            Editor::Closed => return Err(EditorError::NotOpen),
            Editor::OpenForCreate {
                position,
                quadrant,
                form,
            } => {
                let parsed = form.parse()?;
                Commit::Append {
                    quadrant: *quadrant,
                    item: Item {
                        text: parsed.text,
                        color: parsed.color,
                        font_size: parsed.font_size,
                        position: *position,
                        is_todo: parsed.is_todo,
                        completed: parsed.completed,
                    },
                }
            }
            Editor::OpenForEdit {
                quadrant,
                index,
                form,
                ..
            } => {
                let parsed = form.parse()?;
                let mut items = contents.get(*quadrant).to_vec();
                match items.get_mut(*index) {
                    Some(item) => {
                        item.text = parsed.text;
                        item.color = parsed.color;
                        item.font_size = parsed.font_size;
                        // The checkbox may have been clicked on the board while the
                        // form was open; that wins unless the form changed the kind.
                        if parsed.completion_typed || !(parsed.is_todo && item.is_todo) {
                            item.completed = parsed.completed;
                        }
                        item.is_todo = parsed.is_todo;
                        Commit::Replace {
                            quadrant: *quadrant,
                            items,
                        }
                    }
                    None => Commit::Unchanged,
                }
            }
        };
        debug!(?commit, "editor saved");
        *self = Editor::Closed;
        Ok(commit)
    }
}

/// Store change produced by a save.
#[derive(Clone, Debug, PartialEq)]
pub enum Commit {
    Append { quadrant: Quadrant, item: Item },
    Replace { quadrant: Quadrant, items: Vec<Item> },
    /// The edited item no longer exists.
    Unchanged,
}

impl Commit {
    pub fn apply_to(self, contents: &Contents) -> Contents {
        match self {
            Commit::Append { quadrant, item } => contents.append_item(quadrant, item),
            Commit::Replace { quadrant, items } => contents.replace_quadrant(quadrant, items),
            Commit::Unchanged => contents.clone(),
        }
    }
}
