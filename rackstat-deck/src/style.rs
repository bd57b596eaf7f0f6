use crate::{Alignment, TextFrame};

/// Font family of every substituted value.
pub const SUBSTITUTION_FONT: &str = "Pretendard Light";

/// Placeholder key of the report date.
pub const DATE_KEY: &str = "date";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub alignment: Alignment,
    pub font_name: &'static str,
    pub font_size_pt: f32,
}

impl Style {
    /// The date sits right-aligned in small print; every data value is centred.
    pub fn for_key(key: &str) -> Self {
        if key == DATE_KEY {
            Self {
                alignment: Alignment::Right,
                font_name: SUBSTITUTION_FONT,
                font_size_pt: 7.0,
            }
        } else {
            Self {
                alignment: Alignment::Center,
                font_name: SUBSTITUTION_FONT,
                font_size_pt: 9.0,
            }
        }
    }

    pub fn apply(&self, frame: &mut TextFrame) {
        for paragraph in frame.paragraphs.iter_mut() {
            paragraph.alignment = Some(self.alignment);
            for run in paragraph.runs.iter_mut() {
                run.style.font_name = Some(self.font_name.to_string());
                run.style.font_size_pt = Some(self.font_size_pt);
            }
        }
    }
}
