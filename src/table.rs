//! Elastic text table for CLI output. Columns size to their widest cell;
//! numeric columns right-align so values and ranks line up.

use std::fmt::Write as _;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }
    for width in &mut widths {
        *width = (*width).max(1);
    }

    // A column right-aligns when every non-empty cell in it looks numeric.
    let right_align: Vec<bool> = (0..column_count)
        .map(|idx| {
            let mut any = false;
            let all = rows.iter().all(|row| match row.get(idx) {
                Some(cell) if !cell.is_empty() => {
                    any = true;
                    looks_numeric(cell)
                }
                _ => true,
            });
            any && all
        })
        .collect();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &right_align));
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
    let separator_widths: Vec<usize> = widths.iter().map(|w| (*w).max(3)).collect();
    let _ = writeln!(
        output,
        "{}",
        format_row(&separator, &separator_widths, &right_align)
    );
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &right_align));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize], right_align: &[bool]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        if idx >= widths.len() {
            break;
        }
        let sanitized: String = value
            .chars()
            .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
            .collect();
        let padding = widths[idx].saturating_sub(sanitized.chars().count());
        let cell = if right_align.get(idx).copied().unwrap_or(false) {
            format!("{}{}", " ".repeat(padding), sanitized)
        } else {
            format!("{}{}", sanitized, " ".repeat(padding))
        };
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

/// Digits with optional separators, sign, and percent — the shapes the
/// rank/stats commands emit.
fn looks_numeric(cell: &str) -> bool {
    let trimmed = cell.trim().trim_start_matches(['-', '+']);
    !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | ',' | '%' | ' '))
}
