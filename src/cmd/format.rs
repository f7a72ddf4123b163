/*!
format.rs

Human-readable output helpers for the `termroute` CLI.

Public API Summary:
  - StyleOptions::detect() -> StyleOptions   (NO_COLOR, COLUMNS)
  - color(role, text, &StyleOptions) -> String
  - box_header(title, subtitle_opt, &StyleOptions) -> String
  - table(headers, rows, &StyleOptions) -> String
  - truncate_ellipsis(s, max_chars) -> String

Helpers return strings and never print. JSON output paths must not use them.
*/

use std::borrow::Cow;

/* -------------------------------------------------------------------------- */
/* Style Options                                                              */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub term_width: usize,
}

impl StyleOptions {
    pub fn detect() -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);
        Self {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            term_width: width,
        }
    }

    #[cfg(test)]
    pub fn plain(term_width: usize) -> Self {
        Self {
            use_color: false,
            term_width,
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Color                                                                      */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Accent,
    Success,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Secondary => "38;5;250",
        Role::Accent => "38;5;213",
        Role::Success => "38;5;82",
        Role::Error => "38;5;196",
        Role::Dim => "2",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

/* -------------------------------------------------------------------------- */
/* Box Header                                                                 */
/* -------------------------------------------------------------------------- */

/// One-line boxed title; the subtitle is dimmed and the line is truncated to
/// the terminal width.
pub fn box_header(title: &str, subtitle: Option<&str>, style: &StyleOptions) -> String {
    let max_inner = style.term_width.saturating_sub(4).max(10);
    let plain = match subtitle {
        Some(sub) => format!("{title}  {sub}"),
        None => title.to_string(),
    };
    let plain = truncate_ellipsis(&plain, max_inner);
    let inner_len = display_width(&plain);

    // Color after truncation so escape codes never get cut.
    let styled = match subtitle {
        Some(_) if plain.starts_with(title) && plain.len() > title.len() => format!(
            "{}{}",
            color(Role::Primary, title, style),
            color(Role::Secondary, &plain[title.len()..], style)
        ),
        _ => color(Role::Primary, &plain, style),
    };

    let hline = "─".repeat(inner_len + 2);
    format!("┌{hline}┐\n│ {styled} │\n└{hline}┘")
}

/* -------------------------------------------------------------------------- */
/* Table Rendering                                                            */
/* -------------------------------------------------------------------------- */

const MIN_COL_WIDTH: usize = 3;

pub fn table(headers: &[&str], rows: &[Vec<String>], style: &StyleOptions) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();

    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    // Shrink the widest columns first until the table fits.
    let total: usize = widths.iter().sum::<usize>() + (cols - 1) * 2;
    if total > style.term_width {
        let mut overflow = total - style.term_width;
        let mut order: Vec<usize> = (0..cols).collect();
        order.sort_by(|a, b| widths[*b].cmp(&widths[*a]));
        for idx in order {
            if overflow == 0 {
                break;
            }
            if widths[idx] > MIN_COL_WIDTH {
                let shrink = (widths[idx] - MIN_COL_WIDTH).min(overflow);
                widths[idx] -= shrink;
                overflow -= shrink;
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    let head: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| color(Role::Accent, fit(h, widths[i]), style))
        .collect();
    lines.push(head.join("  "));
    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    lines.push(color(Role::Dim, sep.join("  "), style));

    for row in rows {
        let cells: Vec<String> = (0..cols)
            .map(|c| fit(row.get(c).map(String::as_str).unwrap_or(""), widths[c]))
            .collect();
        lines.push(cells.join("  ").trim_end().to_string());
    }
    lines.join("\n")
}

fn fit(s: &str, width: usize) -> String {
    let cut = truncate_ellipsis(s, width);
    let len = display_width(&cut);
    format!("{cut}{}", " ".repeat(width.saturating_sub(len)))
}

/* -------------------------------------------------------------------------- */
/* Text Helpers                                                               */
/* -------------------------------------------------------------------------- */

pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for n in chars.by_ref() {
                if n.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(c);
    }
    Cow::Owned(buf)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}
