use std::io::{self, IsTerminal, Stdout, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::filter::Filter;
use crate::preferences::Theme;
use crate::task::Task;
use crate::view::View;

#[derive(Debug, Clone, Copy)]
struct Palette {
    index: &'static str,
    id: &'static str,
    done: &'static str,
    finished_text: &'static str,
    active_filter: &'static str,
}

const LIGHT: Palette = Palette {
    index: "90",
    id: "34",
    done: "32",
    finished_text: "9;90",
    active_filter: "1;34",
};

const DARK: Palette = Palette {
    index: "37",
    id: "96",
    done: "92",
    finished_text: "9;37",
    active_filter: "1;96",
};

/// [`View`] that prints plain-text tables to a writer.
#[derive(Debug)]
pub struct TerminalView<W> {
    out: W,
    color: bool,
    theme: Theme,
}

impl TerminalView<Stdout> {
    pub fn stdout(cfg: &Config) -> anyhow::Result<Self> {
        let color = color_enabled(cfg)? && io::stdout().is_terminal();
        Ok(Self::new(io::stdout(), color))
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            theme: Theme::default(),
        }
    }

    /// Writes a free-form line (confirmations, help, shell prompts).
    pub fn message(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    pub fn prompt(&mut self, text: &str) -> anyhow::Result<()> {
        write!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn palette(&self) -> Palette {
        match self.theme {
            Theme::Light => LIGHT,
            Theme::Dark => DARK,
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

impl<W: Write> View for TerminalView<W> {
    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    fn render_list(&mut self, tasks: &[&Task]) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(self.out, "No tasks.")?;
            return Ok(());
        }

        let palette = self.palette();
        let headers = vec![
            "#".to_string(),
            "ID".to_string(),
            "Done".to_string(),
            "Text".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for (idx, task) in tasks.iter().enumerate() {
            let index = self.paint(&(idx + 1).to_string(), palette.index);
            let id = self.paint(task.short_id(), palette.id);
            let (done, text) = if task.completed {
                (
                    self.paint("[x]", palette.done),
                    self.paint(&task.text, palette.finished_text),
                )
            } else {
                ("[ ]".to_string(), task.text.clone())
            };
            rows.push(vec![index, id, done, text]);
        }

        write_table(&mut self.out, headers, rows)
    }

    fn render_count(&mut self, remaining: usize) -> anyhow::Result<()> {
        let noun = if remaining == 1 { "item" } else { "items" };
        writeln!(self.out, "{remaining} {noun} left")?;
        Ok(())
    }

    fn render_filter_active(&mut self, filter: Filter) -> anyhow::Result<()> {
        let palette = self.palette();
        let labels: Vec<String> = Filter::VARIANTS
            .iter()
            .map(|f| {
                if *f == filter {
                    self.paint(&format!("[{f}]"), palette.active_filter)
                } else {
                    f.to_string()
                }
            })
            .collect();
        writeln!(self.out, "Filter: {}", labels.join(" "))?;
        Ok(())
    }

    fn apply_theme(&mut self, theme: Theme) -> anyhow::Result<()> {
        self.theme = theme;
        Ok(())
    }
}

fn color_enabled(cfg: &Config) -> anyhow::Result<bool> {
    Ok(cfg.get_bool("color")?.unwrap_or(true))
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
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let last = column_count.saturating_sub(1);
    let mut header_line = String::new();
    let mut rule_line = String::new();
    for idx in 0..column_count {
        if idx == last {
            header_line.push_str(&headers[idx]);
            rule_line.push_str(&"-".repeat(widths[idx]));
        } else {
            header_line.push_str(&format!("{:width$} ", headers[idx], width = widths[idx]));
            rule_line.push_str(&format!("{:-<width$} ", "", width = widths[idx]));
        }
    }
    writeln!(writer, "{header_line}")?;
    writeln!(writer, "{rule_line}")?;

    for row in rows {
        let mut line = String::new();
        for (idx, cell) in row.iter().enumerate() {
            line.push_str(cell);
            if idx != last {
                let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                let padding = widths[idx].saturating_sub(visible_width);
                line.push_str(&" ".repeat(padding + 1));
            }
        }
        writeln!(writer, "{line}")?;
    }

    Ok(())
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

    fn rendered<F>(color: bool, draw: F) -> String
    where
        F: FnOnce(&mut TerminalView<Vec<u8>>) -> anyhow::Result<()>,
    {
        let mut view = TerminalView::new(Vec::new(), color);
        draw(&mut view).expect("render");
        String::from_utf8(view.into_inner()).expect("utf8 output")
    }

    #[test]
    fn renders_an_aligned_table() {
        let a = Task::with_id("aaaaaaaa-1111", "buy milk", false);
        let b = Task::with_id("bbbbbbbb-2222", "walk the dog", true);
        let out = rendered(false, |v| v.render_list(&[&a, &b]));

        assert_eq!(
            out,
            "# ID       Done Text\n\
             - -------- ---- ------------\n\
             1 aaaaaaaa [ ]  buy milk\n\
             2 bbbbbbbb [x]  walk the dog\n"
        );
    }

    #[test]
    fn empty_list_says_so() {
        assert_eq!(rendered(false, |v| v.render_list(&[])), "No tasks.\n");
    }

    #[test]
    fn count_wording_is_pluralised() {
        assert_eq!(rendered(false, |v| v.render_count(1)), "1 item left\n");
        assert_eq!(rendered(false, |v| v.render_count(0)), "0 items left\n");
        assert_eq!(rendered(false, |v| v.render_count(3)), "3 items left\n");
    }

    #[test]
    fn active_filter_is_bracketed() {
        assert_eq!(
            rendered(false, |v| v.render_filter_active(Filter::Active)),
            "Filter: all [active] completed\n"
        );
    }

    #[test]
    fn theme_selects_the_palette() {
        let task = Task::with_id("abc", "x", false);
        let light = rendered(true, |v| v.render_list(&[&task]));
        let dark = rendered(true, |v| {
            v.apply_theme(Theme::Dark)?;
            v.render_list(&[&task])
        });

        assert!(light.contains("\x1b[34mabc\x1b[0m"));
        assert!(dark.contains("\x1b[96mabc\x1b[0m"));
    }

    #[test]
    fn wide_characters_keep_columns_aligned() {
        let a = Task::with_id("1", "日本", false);
        let b = Task::with_id("2", "ab", false);
        let out = rendered(false, |v| v.render_list(&[&a, &b]));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[2], "1 1  [ ]  日本");
        assert_eq!(lines[3], "2 2  [ ]  ab");
    }

    #[test]
    fn color_setting_uses_the_config_boolean_parser() {
        let mut cfg = Config::default();
        assert!(color_enabled(&cfg).expect("default"));

        cfg.apply_overrides(vec![("color".to_string(), "y".to_string())]);
        assert!(color_enabled(&cfg).expect("short yes"));
        cfg.apply_overrides(vec![("color".to_string(), "no".to_string())]);
        assert!(!color_enabled(&cfg).expect("no"));

        cfg.apply_overrides(vec![("color".to_string(), "sepia".to_string())]);
        let err = color_enabled(&cfg).expect_err("not a boolean");
        assert!(err.to_string().contains("invalid color setting: sepia"));
    }
}
