use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use tracing::{debug, instrument};

use crate::store::PersistentStore;

pub const THEME_KEY: &str = "brighttodo.theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Anything other than the literal `"dark"` reads as light.
    pub fn from_storage(value: Option<&str>) -> Self {
        match value {
            Some("dark") => Self::Dark,
            _ => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(anyhow!("unknown theme: {other} (expected light or dark)")),
        }
    }
}

/// Cached theme preference mirrored to [`THEME_KEY`].
#[derive(Debug)]
pub struct PreferenceStore<S> {
    store: S,
    theme: Theme,
}

impl<S: PersistentStore> PreferenceStore<S> {
    pub fn load(store: S) -> Self {
        let stored = store.get(THEME_KEY);
        let theme = Theme::from_storage(stored.as_deref());
        debug!(stored = ?stored, theme = %theme, "loaded theme preference");
        Self { store, theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    #[instrument(skip(self))]
    pub fn set(&mut self, theme: Theme) -> anyhow::Result<()> {
        self.store
            .set(THEME_KEY, theme.as_str())
            .context("failed to persist theme")?;
        self.theme = theme;
        Ok(())
    }

    pub fn toggle(&mut self) -> anyhow::Result<Theme> {
        let next = self.theme.next();
        self.set(next)?;
        Ok(next)
    }
}
