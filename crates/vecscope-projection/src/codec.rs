//! Flat text format spoken with external reducers.
//!
//! Vectors go out as `v11,v12,...;v21,v22,...`, a center as `c1,c2,...`.
//! Points come back as one or more lines, each a JSON array of `[x, y]`
//! pairs; the lines are concatenated in order.

use vecscope_core::{EmbeddingVector, Point2, Result, VecscopeError};

pub fn serialize_vectors(vectors: &[EmbeddingVector]) -> String {
    vectors
        .iter()
        .map(|v| serialize_center(v))
        .collect::<Vec<_>>()
        .join(";")
}

pub fn serialize_center(center: &EmbeddingVector) -> String {
    center
        .as_slice()
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn parse_points(output: &str) -> Result<Vec<Point2>> {
    let mut points = Vec::new();
    for (line_no, line) in output.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let rows: Vec<Vec<f64>> = serde_json::from_str(line).map_err(|e| {
            VecscopeError::ProjectionFailed(format!(
                "malformed reducer output on line {}: {e}",
                line_no + 1
            ))
        })?;
        for row in rows {
            match row.as_slice() {
                [x, y] if x.is_finite() && y.is_finite() => points.push([*x, *y]),
                other => {
                    return Err(VecscopeError::ProjectionFailed(format!(
                        "expected a finite [x, y] pair, got {other:?}"
                    )))
                }
            }
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: &[f32]) -> EmbeddingVector {
        EmbeddingVector::new(values.to_vec()).unwrap()
    }

    #[test]
    fn vectors_are_semicolon_separated_rows() {
        let text = serialize_vectors(&[vector(&[1.0, 2.5]), vector(&[-3.0, 0.0])]);
        assert_eq!(text, "1,2.5;-3,0");
    }

    #[test]
    fn center_is_comma_separated() {
        assert_eq!(serialize_center(&vector(&[0.5, 1.0, -2.0])), "0.5,1,-2");
    }

    #[test]
    fn output_lines_are_concatenated() {
        let points = parse_points("[[1, 2], [3.5, -4]]\n\n[[5, 6]]\n").unwrap();
        assert_eq!(points, vec![[1.0, 2.0], [3.5, -4.0], [5.0, 6.0]]);
    }

    #[test]
    fn empty_output_parses_to_nothing() {
        assert!(parse_points("").unwrap().is_empty());
        assert!(parse_points("  \n").unwrap().is_empty());
    }

    #[test]
    fn bad_output_is_a_projection_failure() {
        for bad in ["not json", "[[1, 2, 3]]", "[[1]]", "[[NaN, 1]]", "{\"x\": 1}"] {
            assert!(
                matches!(parse_points(bad), Err(VecscopeError::ProjectionFailed(_))),
                "accepted {bad:?}"
            );
        }
    }
}
