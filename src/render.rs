// src/render.rs

//! Minimal plain-text table output.

/// Render rows as left-aligned columns separated by two spaces.
///
/// With `headers` given, they become the first line. Trailing whitespace is
/// trimmed from every line.
pub fn plain_table(headers: Option<&[String]>, rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = Vec::new();
    let measure = |widths: &mut Vec<usize>, row: &[String]| {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            if i == widths.len() {
                widths.push(len);
            } else if len > widths[i] {
                widths[i] = len;
            }
        }
    };
    if let Some(headers) = headers {
        measure(&mut widths, headers);
    }
    for row in rows {
        measure(&mut widths, row);
    }

    let mut out = String::new();
    let mut emit = |out: &mut String, row: &[String]| {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            line.push_str(cell);
            let pad = widths.get(i).copied().unwrap_or(0).saturating_sub(cell.chars().count());
            line.extend(std::iter::repeat_n(' ', pad));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    };
    if let Some(headers) = headers {
        emit(&mut out, headers);
    }
    for row in rows {
        emit(&mut out, row);
    }
    out
}

/// A `-- title ----…` banner padded with dashes to `width` characters.
pub fn banner(title: &str, width: usize) -> String {
    let mut line = format!("-- {title} ");
    let len = line.chars().count();
    if len < width {
        line.extend(std::iter::repeat_n('-', width - len));
    }
    line
}
