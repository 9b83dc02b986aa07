//! Training set text format.
//!
//! ```text
//! training_set: {
//! dimensions: {count: 2, x_size: 1, y_size: 1},
//! x:
//! [ [0x00]
//! , [0x01]
//! ],
//! y:
//! [ [0x00]
//! , [0x01]
//! ]
//! }
//! ```

use super::scanner::Scanner;
use crate::buffers::element_count;
use crate::context::Context;
use crate::error::{BackpropError, Result};
use crate::training_set::{TrainingSet, TrainingSetDimensions};
use log::warn;
use std::fs;
use std::path::Path;

fn format_bytes(out: &mut String, bytes: &[u8]) {
    out.push('[');
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&format!("0x{:02X}", byte));
    }
    out.push(']');
}

fn format_records<'a, I>(out: &mut String, records: I)
where
    I: Iterator<Item = &'a [u8]>,
{
    out.push_str("[ ");
    for (i, record) in records.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        format_bytes(out, record);
        out.push('\n');
    }
    out.push(']');
}

pub fn format_training_set(training_set: &TrainingSet) -> String {
    let mut out = String::from("training_set: {\n");
    out.push_str(&training_set.dimensions().to_string());
    out.push_str(", \nx:\n");
    format_records(&mut out, training_set.iter().map(|(x, _)| x));
    out.push_str(",\ny:\n");
    format_records(&mut out, training_set.iter().map(|(_, y)| y));
    out.push_str("\n}\n");
    out
}

pub fn save_training_set<P: AsRef<Path>>(training_set: &TrainingSet, path: P) -> Result<()> {
    fs::write(path, format_training_set(training_set))?;
    Ok(())
}

fn parse_dimensions(scanner: &mut Scanner<'_>) -> Result<TrainingSetDimensions> {
    scanner.expect("training_set")?;
    scanner.expect(":")?;
    scanner.expect("{")?;
    scanner.expect("dimensions")?;
    scanner.expect(":")?;
    scanner.expect("{")?;
    let count = scanner.field_usize("count")?;
    scanner.expect(",")?;
    let x_size = scanner.field_usize("x_size")?;
    scanner.expect(",")?;
    let y_size = scanner.field_usize("y_size")?;
    scanner.expect("}")?;
    Ok(TrainingSetDimensions::new(count, x_size, y_size))
}

/// Parse `count` records of `size` bytes each into one flat vector.
fn parse_records(
    scanner: &mut Scanner<'_>,
    key: &str,
    dims: TrainingSetDimensions,
    size: usize,
) -> Result<Vec<u8>> {
    scanner.expect(key)?;
    scanner.expect(":")?;
    let records = scanner.list(|s| s.list(Scanner::hex_byte))?;

    if records.len() != dims.count || records.iter().any(|r| r.len() != size) {
        let actual = TrainingSetDimensions::new(
            records.len(),
            if key == "x" { records.first().map_or(0, Vec::len) } else { dims.x_size },
            if key == "y" { records.first().map_or(0, Vec::len) } else { dims.y_size },
        );
        return Err(BackpropError::DimensionMismatch {
            expected: dims,
            actual,
        });
    }

    let len = element_count(dims.count, size)?;
    let mut flat = Vec::new();
    if flat.try_reserve_exact(len).is_err() {
        return Err(BackpropError::Allocation { bytes: len });
    }
    for record in records {
        flat.extend_from_slice(&record);
    }
    Ok(flat)
}

fn parse_document(text: &str) -> Result<(TrainingSetDimensions, Vec<u8>, Vec<u8>)> {
    let mut scanner = Scanner::new(text);
    let dims = parse_dimensions(&mut scanner)?;
    scanner.expect(",")?;
    let x = parse_records(&mut scanner, "x", dims, dims.x_size)?;
    scanner.expect(",")?;
    let y = parse_records(&mut scanner, "y", dims, dims.y_size)?;
    scanner.expect("}")?;
    Ok((dims, x, y))
}

/// Parse a training set document into a newly allocated set.
pub fn parse_training_set(ctx: &Context, text: &str) -> Result<TrainingSet> {
    let (dims, x, y) = parse_document(text)?;
    let mut training_set = TrainingSet::with_dimensions(ctx, dims)?;
    training_set.x_mut().copy_from_slice(&x);
    training_set.y_mut().copy_from_slice(&y);
    Ok(training_set)
}

/// Parse a training set document into an existing set of the same dimensions.
///
/// On any error, including a dimension mismatch, the set is left unchanged.
pub fn parse_training_set_into(training_set: &mut TrainingSet, text: &str) -> Result<()> {
    let (dims, x, y) = parse_document(text)?;
    if dims != training_set.dimensions() {
        warn!(
            "rejected training set: file has {}, destination has {}",
            dims,
            training_set.dimensions()
        );
        return Err(BackpropError::DimensionMismatch {
            expected: training_set.dimensions(),
            actual: dims,
        });
    }
    training_set.x_mut().copy_from_slice(&x);
    training_set.y_mut().copy_from_slice(&y);
    Ok(())
}

pub fn load_training_set<P: AsRef<Path>>(ctx: &Context, path: P) -> Result<TrainingSet> {
    let text = fs::read_to_string(path)?;
    parse_training_set(ctx, &text)
}

/// Read only the dimensions header of a training set file.
pub fn load_training_set_dimensions<P: AsRef<Path>>(path: P) -> Result<TrainingSetDimensions> {
    let text = fs::read_to_string(path)?;
    parse_dimensions(&mut Scanner::new(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor_set(ctx: &Context) -> TrainingSet {
        TrainingSet::from_pairs(
            ctx,
            &[
                (&[0x00][..], &[0x00][..]),
                (&[0x01][..], &[0x01][..]),
                (&[0x02][..], &[0x01][..]),
                (&[0x03][..], &[0x00][..]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_format_layout() {
        let ctx = Context::new(0);
        let set = TrainingSet::from_pairs(&ctx, &[(&[0x0a, 0xff][..], &[0x01][..])]).unwrap();
        assert_eq!(
            format_training_set(&set),
            "training_set: {\ndimensions: {count: 1, x_size: 2, y_size: 1}, \nx:\n[ [0x0A, 0xFF]\n],\ny:\n[ [0x01]\n]\n}\n"
        );
    }

    #[test]
    fn test_parse_formatted_set() {
        let ctx = Context::new(0);
        let set = xor_set(&ctx);
        let parsed = parse_training_set(&ctx, &format_training_set(&set)).unwrap();

        assert_eq!(parsed.dimensions(), set.dimensions());
        assert_eq!(parsed.x(), set.x());
        assert_eq!(parsed.y(), set.y());
    }

    #[test]
    fn test_parse_into_rejects_other_dimensions() {
        let ctx = Context::new(0);
        let text = format_training_set(&xor_set(&ctx));
        let mut dest = TrainingSet::new(&ctx, 3, 1, 1).unwrap();

        assert!(matches!(
            parse_training_set_into(&mut dest, &text),
            Err(BackpropError::DimensionMismatch { .. })
        ));
        assert!(dest.x().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_huge_declared_count_is_rejected_before_allocating() {
        let ctx = Context::new(0);
        let text = "training_set: {dimensions: {count: 4000000000000000, x_size: 1, y_size: 1}, x: [[0x00]], y: [[0x00]]}";
        assert!(matches!(
            parse_training_set(&ctx, text),
            Err(BackpropError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_record_count_must_match_header() {
        let ctx = Context::new(0);
        let text = "training_set: {\ndimensions: {count: 2, x_size: 1, y_size: 1},\nx:\n[ [0x00]\n],\ny:\n[ [0x00]\n, [0x01]\n]\n}";
        assert!(matches!(
            parse_training_set(&ctx, text),
            Err(BackpropError::DimensionMismatch { .. })
        ));
    }
}
