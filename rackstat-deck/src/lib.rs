//! Slide-deck document model and the placeholder renderer that fills it.
//!
//! A [`Presentation`] is an ordered list of slides, each an ordered list of shapes. A shape
//! is a text container, a table whose cells are text containers, or an opaque shape the
//! renderer never touches. Decks are stored as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod placeholder;
pub mod render;
pub mod style;

pub use placeholder::PlaceholderMap;
pub use render::{Diagnostic, Location, RenderError, RenderOutcome, TemplateRenderer};
pub use style::{DATE_KEY, SUBSTITUTION_FONT, Style};

/// File extension of saved decks.
pub const DECK_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("failed to read deck {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write deck {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("deck {path} is not a valid document")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(default)]
    pub slides: Vec<Slide>,
}

impl Presentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DeckError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| DeckError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| DeckError::Format {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DeckError> {
        let path = path.as_ref();
        let write_error = |source| DeckError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let payload = serde_json::to_string_pretty(self).map_err(|source| DeckError::Format {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, payload).map_err(write_error)
    }

    pub fn add_slide(&mut self, slide: Slide) -> &mut Slide {
        self.slides.push(slide);
        let last = self.slides.len() - 1;
        &mut self.slides[last]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

impl Slide {
    pub fn with_layout<S: Into<String>>(layout: S) -> Self {
        Self {
            layout: Some(layout.into()),
            shapes: Vec::new(),
        }
    }

    pub fn push(&mut self, shape: Shape) -> &mut Self {
        self.shapes.push(shape);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Text(TextShape),
    Table(TableShape),
    /// Pictures, charts and anything else carried through untouched.
    Other(OtherShape),
}

impl Shape {
    pub fn text<S: Into<String>>(name: S, frame: TextFrame) -> Self {
        Shape::Text(TextShape {
            name: name.into(),
            frame,
        })
    }

    pub fn table<S: Into<String>>(name: S, table: Table) -> Self {
        Shape::Table(TableShape {
            name: name.into(),
            table,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Shape::Text(shape) => &shape.name,
            Shape::Table(shape) => &shape.name,
            Shape::Other(shape) => &shape.name,
        }
    }

    pub fn is_text_container(&self) -> bool {
        matches!(self, Shape::Text(_))
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Shape::Table(_))
    }

    pub fn text_frame(&self) -> Option<&TextFrame> {
        match self {
            Shape::Text(shape) => Some(&shape.frame),
            _ => None,
        }
    }

    pub fn table_ref(&self) -> Option<&Table> {
        match self {
            Shape::Table(shape) => Some(&shape.table),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextShape {
    #[serde(default)]
    pub name: String,
    pub frame: TextFrame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableShape {
    #[serde(default)]
    pub name: String,
    pub table: Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherShape {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size_pt: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default)]
    pub style: RunStyle,
}

impl Run {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default)]
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

/// Text container: paragraphs of styled runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextFrame {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

impl TextFrame {
    pub fn from_text(text: &str) -> Self {
        let mut frame = Self::default();
        frame.set_text(text);
        frame
    }

    /// Full text, paragraphs joined by `\n`.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replaces the content with one single-run paragraph per line.
    ///
    /// Run styling is discarded; the first paragraph's alignment carries over to every line.
    pub fn set_text(&mut self, text: &str) {
        let alignment = self.paragraphs.first().and_then(|p| p.alignment);
        self.paragraphs = text
            .split('\n')
            .map(|line| Paragraph {
                alignment,
                runs: if line.is_empty() {
                    Vec::new()
                } else {
                    vec![Run::new(line)]
                },
            })
            .collect();
    }

    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.paragraphs
            .iter_mut()
            .flat_map(|paragraph| paragraph.runs.iter_mut())
    }
}

/// Grid of cells; every row is expected to hold `columns` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: usize,
    #[serde(default)]
    pub rows: Vec<Vec<TextFrame>>,
}

impl Table {
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        let columns = rows.first().map(|row| row.len()).unwrap_or(0);
        Self {
            columns,
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| TextFrame::from_text(cell)).collect())
                .collect(),
        }
    }

    /// `(rows, columns)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows.len(), self.columns)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&TextFrame> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }
}
