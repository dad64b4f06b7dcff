use tracing::{debug, instrument};

use crate::preferences::PreferenceStore;
use crate::repository::TaskRepository;
use crate::store::PersistentStore;
use crate::view::{Gesture, View};

/// What a gesture did to the stored state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added(String),
    Updated,
    Ignored,
}

/// Wires a [`TaskRepository`] and a [`PreferenceStore`] to a [`View`]:
/// every gesture mutates, persists, then re-renders.
#[derive(Debug)]
pub struct Controller<S, V> {
    tasks: TaskRepository<S>,
    prefs: PreferenceStore<S>,
    view: V,
}

impl<S: PersistentStore + Clone, V: View> Controller<S, V> {
    /// Loads both components from `store` and applies the stored theme. Does
    /// not render; call [`Controller::refresh`] for the initial paint.
    pub fn open(store: S, view: V) -> anyhow::Result<Self> {
        let tasks = TaskRepository::load(store.clone());
        let prefs = PreferenceStore::load(store);
        Self::from_parts(tasks, prefs, view)
    }
}

impl<S: PersistentStore, V: View> Controller<S, V> {
    pub fn from_parts(
        tasks: TaskRepository<S>,
        prefs: PreferenceStore<S>,
        mut view: V,
    ) -> anyhow::Result<Self> {
        view.apply_theme(prefs.theme())?;
        Ok(Self { tasks, prefs, view })
    }

    #[instrument(skip(self))]
    pub fn handle(&mut self, gesture: Gesture) -> anyhow::Result<Outcome> {
        let outcome = match gesture {
            Gesture::Add(text) => match self.tasks.add(&text)? {
                Some(id) => Outcome::Added(id),
                None => Outcome::Ignored,
            },
            Gesture::Toggle(id) => changed(self.tasks.toggle(&id)?),
            Gesture::Delete(id) => changed(self.tasks.remove(&id)?),
            Gesture::EditCommit(id, text) => changed(self.tasks.edit(&id, &text)?),
            Gesture::EditCancel(id) => {
                debug!(id = %id, "edit cancelled");
                Outcome::Ignored
            }
            Gesture::FilterSelect(filter) => {
                self.tasks.set_filter(filter);
                Outcome::Updated
            }
            Gesture::ClearCompleted => changed(self.tasks.clear_completed()? > 0),
            Gesture::ThemeToggle => {
                let theme = self.prefs.toggle()?;
                self.view.apply_theme(theme)?;
                Outcome::Updated
            }
            Gesture::ThemeSelect(theme) => {
                self.prefs.set(theme)?;
                self.view.apply_theme(theme)?;
                Outcome::Updated
            }
        };

        self.refresh()?;
        Ok(outcome)
    }

    pub fn refresh(&mut self) -> anyhow::Result<()> {
        let visible = self.tasks.visible_list();
        self.view.render_list(&visible)?;
        self.view.render_count(self.tasks.remaining_count())?;
        self.view.render_filter_active(self.tasks.filter())
    }

    pub fn tasks(&self) -> &TaskRepository<S> {
        &self.tasks
    }

    pub fn prefs(&self) -> &PreferenceStore<S> {
        &self.prefs
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }
}

fn changed(flag: bool) -> Outcome {
    if flag { Outcome::Updated } else { Outcome::Ignored }
}
