use tracing::warn;

/// Column delimiter convention of one CLI's tabular output.
///
/// The container engine is driven with an explicit tab-joined format
/// template (values may contain spaces); the orchestrator prints
/// whitespace-aligned columns. Getting this wrong silently corrupts
/// records, so each call site states it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Whitespace,
}

/// Split fixed-column CLI output into rows of string cells.
///
/// Rows with fewer than `min_columns` cells are dropped (and logged) rather
/// than producing half-filled records. An input of only a header row (or
/// nothing at all) decodes to an empty list, which callers treat as
/// success-and-empty, never as failure.
pub fn parse_rows(
    output: &str,
    delimiter: Delimiter,
    skip_header: bool,
    min_columns: usize,
) -> Vec<Vec<String>> {
    let mut rows = Vec::new();

    for (index, line) in output.lines().enumerate() {
        if skip_header && index == 0 {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let cells: Vec<String> = match delimiter {
            Delimiter::Tab => line.split('\t').map(|c| c.trim().to_string()).collect(),
            Delimiter::Whitespace => line.split_whitespace().map(str::to_string).collect(),
        };

        if cells.len() < min_columns {
            warn!(
                line = %line,
                expected = min_columns,
                got = cells.len(),
                "skipping short tabular row"
            );
            continue;
        }

        rows.push(cells);
    }

    rows
}

/// Rejoin the token tail starting at `from` (free-text trailing columns).
pub fn tail(cells: &[String], from: usize) -> String {
    if from >= cells.len() {
        return String::new();
    }
    cells[from..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_rows_preserve_spaces_inside_cells() {
        let output = "ID\tNAME\tSTATUS\nabc123\tweb front\tUp 2 hours\n";
        let rows = parse_rows(output, Delimiter::Tab, true, 3);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], "web front");
        assert_eq!(rows[0][2], "Up 2 hours");
    }

    #[test]
    fn test_whitespace_rows_collapse_runs() {
        let output = "node-1   Ready    control-plane   12d   v1.29.1\n";
        let rows = parse_rows(output, Delimiter::Whitespace, false, 5);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], vec!["node-1", "Ready", "control-plane", "12d", "v1.29.1"]);
    }

    #[test]
    fn test_header_only_is_empty_not_error() {
        let output = "CONTAINER ID\tNAMES\tIMAGE\n";
        let rows = parse_rows(output, Delimiter::Tab, true, 3);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_short_rows_are_dropped() {
        let output = "a\tb\tc\nonly-one-cell\nx\ty\tz\n";
        let rows = parse_rows(output, Delimiter::Tab, false, 3);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_tail_rejoins_free_text() {
        let cells: Vec<String> = ["2m", "Normal", "Pulled", "pod/web", "Container", "image", "pulled"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tail(&cells, 4), "Container image pulled");
        assert_eq!(tail(&cells, 99), "");
    }
}
