use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SizeParseError {
    #[error("empty size value")]
    Empty,
    #[error("invalid size value `{0}`")]
    Invalid(String),
}

/// Parses `"1.5tb"`, `"500 GB"`, `"512mb"` or a bare number into gigabytes.
pub fn parse_size(raw: &str) -> Result<f64, SizeParseError> {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return Err(SizeParseError::Empty);
    }

    let (number, factor) = if let Some(number) = value.strip_suffix("tb") {
        (number, 1024.0)
    } else if let Some(number) = value.strip_suffix("gb") {
        (number, 1.0)
    } else if let Some(number) = value.strip_suffix("mb") {
        (number, 1.0 / 1024.0)
    } else {
        (value.as_str(), 1.0)
    };

    let invalid = || SizeParseError::Invalid(raw.trim().to_string());
    let number = number.trim().parse::<f64>().map_err(|_| invalid())?;
    // `nan` and `inf` parse as floats but are not sizes.
    if !number.is_finite() {
        return Err(invalid());
    }
    Ok(number * factor)
}
