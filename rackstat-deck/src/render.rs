use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{DATE_KEY, PlaceholderMap, Presentation, Shape, Style, Table, TextFrame};

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("token pattern must compile"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("{location}: table row {row} has {found} cells, expected {expected}")]
    RaggedTable {
        location: Location,
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// Position of a text container inside the deck, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub slide: usize,
    pub shape: usize,
    pub cell: Option<(usize, usize)>,
}

impl Location {
    fn shape(slide: usize, shape: usize) -> Self {
        Self {
            slide,
            shape,
            cell: None,
        }
    }

    fn cell(self, row: usize, column: usize) -> Self {
        Self {
            cell: Some((row, column)),
            ..self
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slide {}, shape {}", self.slide + 1, self.shape + 1)?;
        if let Some((row, column)) = self.cell {
            write!(f, ", cell [{},{}]", row + 1, column + 1)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A `{key}` token with no value; the token stays in the text.
    Unresolved { location: Location, key: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Unresolved { location, key } => {
                write!(f, "{location}: {key}에 대한 데이터를 찾을 수 없습니다.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub location: Location,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    pub substitutions: Vec<Substitution>,
    pub diagnostics: Vec<Diagnostic>,
    /// Text containers whose text changed and were restyled.
    pub restyled: usize,
}

/// Fills `{key}` tokens across a deck from a [`PlaceholderMap`].
pub struct TemplateRenderer<'a> {
    values: &'a PlaceholderMap,
}

impl<'a> TemplateRenderer<'a> {
    pub fn new(values: &'a PlaceholderMap) -> Self {
        Self { values }
    }

    /// Substitutes every resolvable token in place.
    ///
    /// The deck structure is checked before anything is touched, so an error leaves the deck
    /// unmodified.
    pub fn render(&self, deck: &mut Presentation) -> Result<RenderOutcome, RenderError> {
        check_structure(deck)?;

        let mut outcome = RenderOutcome::default();
        for (slide_idx, slide) in deck.slides.iter_mut().enumerate() {
            debug!(slide = slide_idx + 1, shapes = slide.shapes.len(), "rendering slide");
            for (shape_idx, shape) in slide.shapes.iter_mut().enumerate() {
                let location = Location::shape(slide_idx, shape_idx);
                match shape {
                    Shape::Text(text) => self.render_frame(&mut text.frame, location, &mut outcome),
                    Shape::Table(table) => {
                        self.render_table(&mut table.table, location, &mut outcome)
                    }
                    Shape::Other(_) => {}
                }
            }
        }

        info!(
            substitutions = outcome.substitutions.len(),
            unresolved = outcome.diagnostics.len(),
            restyled = outcome.restyled,
            "template rendered"
        );
        Ok(outcome)
    }

    fn render_table(&self, table: &mut Table, location: Location, outcome: &mut RenderOutcome) {
        for (row_idx, row) in table.rows.iter_mut().enumerate() {
            for (column_idx, cell) in row.iter_mut().enumerate() {
                self.render_frame(cell, location.cell(row_idx, column_idx), outcome);
            }
        }
    }

    fn render_frame(&self, frame: &mut TextFrame, location: Location, outcome: &mut RenderOutcome) {
        let original = frame.text();
        let keys: Vec<&str> = TOKEN_PATTERN
            .captures_iter(&original)
            .filter_map(|captures| captures.get(1))
            .map(|key| key.as_str())
            .collect();
        if keys.is_empty() {
            return;
        }

        let mut updated = original.clone();
        let mut resolved: Vec<&str> = Vec::new();
        for key in keys {
            match self.values.get(key) {
                Some(value) => {
                    updated = updated.replace(&format!("{{{key}}}"), value);
                    debug!(%location, key, value, "placeholder substituted");
                    resolved.push(key);
                    outcome.substitutions.push(Substitution {
                        location,
                        key: key.to_string(),
                        value: value.to_string(),
                    });
                }
                None => {
                    warn!(%location, key, "no data for placeholder");
                    outcome.diagnostics.push(Diagnostic::Unresolved {
                        location,
                        key: key.to_string(),
                    });
                }
            }
        }

        if updated == original {
            return;
        }
        frame.set_text(&updated);
        if let Some(key) = style_key(&resolved) {
            Style::for_key(key).apply(frame);
            outcome.restyled += 1;
        }
    }
}

/// Key whose style governs a container: the date when it was filled here, else the first key.
fn style_key<'k>(resolved: &[&'k str]) -> Option<&'k str> {
    resolved
        .iter()
        .copied()
        .find(|key| *key == DATE_KEY)
        .or_else(|| resolved.first().copied())
}

fn check_structure(deck: &Presentation) -> Result<(), RenderError> {
    for (slide_idx, slide) in deck.slides.iter().enumerate() {
        for (shape_idx, shape) in slide.shapes.iter().enumerate() {
            let Some(table) = shape.table_ref() else {
                continue;
            };
            if let Some((row, cells)) = table
                .rows
                .iter()
                .enumerate()
                .find(|(_, cells)| cells.len() != table.columns)
            {
                return Err(RenderError::RaggedTable {
                    location: Location::shape(slide_idx, shape_idx),
                    row: row + 1,
                    found: cells.len(),
                    expected: table.columns,
                });
            }
        }
    }
    Ok(())
}
