use std::collections::BTreeSet;
use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::app::{Notice, NoticeKind};
use crate::config::Config;
use crate::datetime::format_date;
use crate::i18n::{self, Label};
use crate::state::Language;
use crate::task::Priority;
use crate::transform::DueDateStatus;
use crate::view::{ListViewModel, TaskRow};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);
        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, model))]
    pub fn print_list(&mut self, model: &ListViewModel) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let language = model.language;

        if model.rows.is_empty() {
            writeln!(out, "{}", i18n::text(language, Label::NoTasks))?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            String::new(),
            i18n::text(language, Label::Priority).to_string(),
            i18n::text(language, Label::Task).to_string(),
            i18n::text(language, Label::Category).to_string(),
            i18n::text(language, Label::Dates).to_string(),
            String::new(),
        ];

        let rows = model
            .rows
            .iter()
            .map(|row| self.row_cells(row))
            .collect();

        write_table(&mut out, headers, rows)?;
        writeln!(
            out,
            "{} {}/{} ({})",
            i18n::text(language, Label::Page),
            model.page,
            model.total_pages,
            model.total_matches
        )?;
        Ok(())
    }

    pub fn print_categories(
        &mut self,
        categories: &BTreeSet<String>,
        language: Language,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if categories.is_empty() {
            writeln!(out, "{}", i18n::text(language, Label::NoCategory))?;
        }
        for category in categories {
            writeln!(out, "{category}")?;
        }
        Ok(())
    }

    pub fn print_notice(&mut self, notice: &Notice) -> anyhow::Result<()> {
        let code = match notice.kind {
            NoticeKind::Success => "32",
            NoticeKind::Error => "31",
        };
        writeln!(io::stdout().lock(), "{}", self.paint(&notice.message, code))?;
        Ok(())
    }

    pub fn print_line(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(io::stdout().lock(), "{text}")?;
        Ok(())
    }

    fn row_cells(&self, row: &TaskRow) -> Vec<String> {
        let id = self.paint(&row.id.short(), "33");
        let status = String::from(if row.completed { "[x]" } else { "[ ]" });

        let priority = match row.priority {
            Some(Priority::High) => self.paint(row.priority_label, "31"),
            _ => row.priority_label.to_string(),
        };

        let text = if row.completed {
            self.paint(&row.text, "9")
        } else {
            row.text.clone()
        };

        let mut dates = match (row.start_date, row.end_date) {
            (Some(_), Some(_)) => format!(
                "{} - {}",
                format_date(row.start_date),
                format_date(row.end_date)
            ),
            (Some(_), None) => format_date(row.start_date),
            (None, _) => format_date(row.end_date),
        };
        let badge = match row.due {
            DueDateStatus::Overdue => self.paint(row.due_label, "31"),
            DueDateStatus::DueSoon => self.paint(row.due_label, "33"),
            DueDateStatus::Normal | DueDateStatus::None => String::new(),
        };
        if !badge.is_empty() {
            dates = format!("{dates} {badge}");
        }

        let subtasks = if row.subtasks.is_empty() {
            String::new()
        } else {
            format!("{}/{}", row.completed_subtasks(), row.subtasks.len())
        };

        vec![
            id,
            status,
            priority,
            text,
            row.category_label.clone(),
            dates,
            subtasks,
        ]
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    write_cells(&mut writer, &headers, &widths)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        write_cells(&mut writer, &row, &widths)?;
    }

    Ok(())
}

fn write_cells<W: Write>(writer: &mut W, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            format!("{cell}{}", " ".repeat(width.saturating_sub(visible)))
        })
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", line.trim_end())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_pads_by_display_width() {
        let mut out = Vec::new();
        write_table(
            &mut out,
            vec!["ID".into(), "Task".into()],
            vec![
                vec!["\x1b[33mab\x1b[0m".into(), "Sắp đến hạn".into()],
                vec!["c".into(), "x".into()],
            ],
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID Task");
        assert_eq!(lines[1].trim_end(), "-- -----------");
        assert_eq!(strip_ansi(lines[2]), "ab Sắp đến hạn");
        assert_eq!(lines[3], "c  x");
    }
}
