/// Parses a serialized lattice matrix into rows.
///
/// Accepts JSON nested arrays (`[[a, b, c], ...]`) and the whitespace
/// separated form numpy prints (`[[a b c]\n [d e f]]`). Rows must be
/// non-empty and of equal length.
pub fn parse_lattice_matrix(raw: &str) -> Option<Vec<Vec<f64>>> {
    let rows = serde_json::from_str::<Vec<Vec<f64>>>(raw)
        .ok()
        .or_else(|| parse_bracketed_rows(raw))?;

    let width = rows.first()?.len();
    if width == 0 || rows.iter().any(|row| row.len() != width) {
        return None;
    }
    Some(rows)
}

fn parse_bracketed_rows(raw: &str) -> Option<Vec<Vec<f64>>> {
    let inner = raw.trim().strip_prefix('[')?.strip_suffix(']')?.trim();

    let mut rows = Vec::new();
    for chunk in inner.split(']') {
        let chunk = chunk.trim().trim_start_matches(',').trim();
        if chunk.is_empty() {
            continue;
        }
        let values = chunk.strip_prefix('[')?;
        let row = values
            .split(|ch: char| ch == ',' || ch.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| token.parse::<f64>().ok())
            .collect::<Option<Vec<f64>>>()?;
        rows.push(row);
    }
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::parse_lattice_matrix;

    #[test]
    fn json_matrices_parse() {
        assert_eq!(
            parse_lattice_matrix("[[5.65, 0, 0], [0, 5.65, 0], [0, 0, 5.65]]"),
            Some(vec![
                vec![5.65, 0.0, 0.0],
                vec![0.0, 5.65, 0.0],
                vec![0.0, 0.0, 5.65],
            ])
        );
    }

    #[test]
    fn numpy_printed_matrices_parse() {
        assert_eq!(
            parse_lattice_matrix("[[ 5.65  0.    0.  ]\n [ 0.    5.65  0.  ]\n [ 0.    0.    5.65]]"),
            Some(vec![
                vec![5.65, 0.0, 0.0],
                vec![0.0, 5.65, 0.0],
                vec![0.0, 0.0, 5.65],
            ])
        );
    }

    #[test]
    fn ragged_or_garbled_matrices_are_rejected() {
        assert_eq!(parse_lattice_matrix("[[1, 2], [3]]"), None);
        assert_eq!(parse_lattice_matrix("[[1 2] [x 4]]"), None);
        assert_eq!(parse_lattice_matrix("[]"), None);
        assert_eq!(parse_lattice_matrix("cubic"), None);
    }
}
