//! Single-record delimited text format for scalar sequences.
//!
//! Values are written with `f64`'s shortest round-trip representation, so
//! parsing a formatted record reproduces the original values exactly.

use crate::core::errors::RecordError;

pub const DELIMITER: char = ',';

/// Format values as one record, terminated by a newline.
pub fn format_record(values: &[f64]) -> String {
    let mut line = values
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string());
    line.push('\n');
    line
}

/// Parse the single record in `contents`.
///
/// An empty first line is the empty sequence. Blank trailing lines are
/// allowed; any further non-blank line is an error. Field positions in
/// errors are 1-based.
pub fn parse_record(contents: &str) -> Result<Vec<f64>, RecordError> {
    let mut lines = contents.lines();
    let record = lines.next().ok_or(RecordError::Missing)?;
    if let Some(offset) = lines.position(|line| !line.trim().is_empty()) {
        return Err(RecordError::ExtraRecord { line: offset + 2 });
    }
    if record.trim().is_empty() {
        return Ok(Vec::new());
    }
    record
        .split(DELIMITER)
        .enumerate()
        .map(|(i, field)| {
            field
                .trim()
                .parse::<f64>()
                .map_err(|_| RecordError::InvalidField {
                    position: i + 1,
                    field: field.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_values_with_delimiter() {
        assert_eq!(format_record(&[1.5, -2.0, 0.0]), "1.5,-2,0\n");
        assert_eq!(format_record(&[]), "\n");
    }

    #[test]
    fn round_trips_mixed_values() {
        let values = vec![1.5, -2.0, 0.0, 1000000.25, 1.5, 0.1 + 0.2, 1e-12, 6.02e23];
        assert_eq!(parse_record(&format_record(&values)).expect("parse"), values);
    }

    #[test]
    fn round_trips_empty_sequence() {
        assert_eq!(parse_record(&format_record(&[])).expect("parse"), Vec::<f64>::new());
    }

    #[test]
    fn accepts_crlf_and_padding() {
        assert_eq!(parse_record("1, 2 ,3\r\n").expect("parse"), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn reports_offending_field_position() {
        assert_eq!(
            parse_record("1.0,abc,3\n"),
            Err(RecordError::InvalidField {
                position: 2,
                field: "abc".to_string(),
            })
        );
        assert_eq!(
            parse_record("1.0,,3\n"),
            Err(RecordError::InvalidField {
                position: 2,
                field: String::new(),
            })
        );
    }

    #[test]
    fn rejects_missing_and_extra_records() {
        assert_eq!(parse_record(""), Err(RecordError::Missing));
        assert_eq!(
            parse_record("1,2\n\n3,4\n"),
            Err(RecordError::ExtraRecord { line: 3 })
        );
        assert_eq!(parse_record("1,2\n\n").expect("parse"), vec![1.0, 2.0]);
    }
}
