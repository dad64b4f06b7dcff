//! Contract between the state core and whatever draws it.

use crate::filter::Filter;
use crate::preferences::Theme;
use crate::task::Task;

/// Presentation surface. The controller calls these after every gesture; a
/// view keeps no task state of its own.
pub trait View {
    fn render_list(&mut self, tasks: &[&Task]) -> anyhow::Result<()>;

    fn render_count(&mut self, remaining: usize) -> anyhow::Result<()>;

    fn render_filter_active(&mut self, filter: Filter) -> anyhow::Result<()>;

    fn apply_theme(&mut self, theme: Theme) -> anyhow::Result<()>;
}

/// A user action forwarded from the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    Add(String),
    Toggle(String),
    Delete(String),
    EditCommit(String, String),
    EditCancel(String),
    FilterSelect(Filter),
    ClearCompleted,
    ThemeToggle,
    ThemeSelect(Theme),
}
