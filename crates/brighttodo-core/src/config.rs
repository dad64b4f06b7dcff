use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const RC_ENV_VAR: &str =
  "BRIGHTTODORC";

const RC_FILE_NAME: &str =
  ".brighttodorc";

const DEFAULTS: [(&str, &str); 3] = [
  ("data.location", "~/.brighttodo"),
  ("default.command", "list"),
  ("color", "on")
];

/// Settings from the rc file, its
/// includes and command-line
/// overrides, in that order of
/// precedence (last wins).
#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      map:          DEFAULTS
        .iter()
        .map(|(k, v)| {
          (k.to_string(), v.to_string())
        })
        .collect(),
      loaded_files: vec![]
    }
  }
}

/// One meaningful line of an rc
/// file.
#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Include(&'a str),
  Setting(&'a str, &'a str)
}

/// `None` for blank and comment-only
/// lines.
fn parse_rc_line(
  raw: &str
) -> Option<Result<RcLine<'_>, ()>> {
  let line = raw
    .split_once('#')
    .map_or(raw, |(before, _)| before)
    .trim();

  if line.is_empty() {
    return None;
  }
  if let Some(path) =
    line.strip_prefix("include ")
  {
    return Some(Ok(RcLine::Include(
      path.trim()
    )));
  }

  Some(
    line
      .split_once('=')
      .map(|(k, v)| {
        RcLine::Setting(
          k.trim(),
          v.trim()
        )
      })
      .ok_or(())
  )
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    match resolve_rc_path(rc_override)
    {
      | Some(path) => {
        info!(rc = %path.display(), "loading rc file");
        cfg.load_file(&path)?;
      }
      | None => {
        debug!(
          "no rc file found; using \
           defaults"
        );
      }
    }

    Ok(cfg)
  }

  /// Applies `key=value` pairs on
  /// top of the file settings. A
  /// leading `rc.` is optional.
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// Reads a yes/no setting. A value
  /// that is neither is an error
  /// rather than a silent `false`.
  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| {
        parse_bool(v).ok_or_else(|| {
          anyhow!(
            "invalid {key} setting: \
             {v} (expected on/off)"
          )
        })
      })
      .transpose()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map_or_else(
        || PathBuf::from("."),
        Path::to_path_buf
      );

    for (idx, raw) in
      text.lines().enumerate()
    {
      let parsed = match parse_rc_line(
        raw
      ) {
        | None => continue,
        | Some(Ok(parsed)) => parsed,
        | Some(Err(())) => {
          return Err(anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            idx + 1,
            raw
          ));
        }
      };

      match parsed {
        | RcLine::Setting(key, value) => {
          trace!(key, value, "loaded config key");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
        | RcLine::Include("") => {
          return Err(anyhow!(
            "include path cannot be \
             empty ({}:{})",
            path.display(),
            idx + 1
          ));
        }
        | RcLine::Include(target) => {
          let include =
            base_dir.join(expand_tilde(
              Path::new(target)
            ));
          if self
            .loaded_files
            .contains(&include)
          {
            warn!(include = %include.display(), "include cycle; skipping");
          } else if include.exists() {
            self.load_file(&include)?;
          } else {
            warn!(include = %include.display(), "include file does not exist; skipping");
          }
        }
      }
    }

    Ok(())
  }
}

/// `--data` wins over
/// `data.location`. The directory is
/// created when missing.
#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = match override_dir {
    | Some(path) => path.to_path_buf(),
    | None => {
      let location = cfg
        .get("data.location")
        .ok_or_else(|| {
          anyhow!(
            "data.location is not set"
          )
        })?;
      expand_tilde(Path::new(
        &location
      ))
    }
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

/// `--config`, then `$BRIGHTTODORC`
/// (`/dev/null` disables the rc
/// file), then `~/.brighttodorc` if
/// it exists.
fn resolve_rc_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(from_env) =
    std::env::var(RC_ENV_VAR)
  {
    return (from_env != "/dev/null")
      .then(|| PathBuf::from(from_env));
  }

  let home = dirs::home_dir();
  if home.is_none() {
    warn!(
      "cannot determine home \
       directory; skipping rc file"
    );
  }
  home
    .map(|home| home.join(RC_FILE_NAME))
    .filter(|candidate| {
      candidate.exists()
    })
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  if let Ok(rest) =
    path.strip_prefix("~")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::{
    Config,
    RcLine,
    parse_rc_line,
    resolve_data_dir
  };

  #[test]
  fn defaults_without_rc_values() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("rc");
    fs::write(&rc, "")
      .expect("write rc");

    let cfg = Config::load(Some(&rc))
      .expect("load");
    assert_eq!(
      cfg.get("default.command")
        .as_deref(),
      Some("list")
    );
    assert_eq!(
      cfg.get_bool("color")
        .expect("valid bool"),
      Some(true)
    );
    assert_eq!(cfg.loaded_files, vec![
      rc
    ]);
  }

  #[test]
  fn rc_lines_classify() {
    assert_eq!(
      parse_rc_line("  # only a comment"),
      None
    );
    assert_eq!(
      parse_rc_line("color = off # x"),
      Some(Ok(RcLine::Setting(
        "color", "off"
      )))
    );
    assert_eq!(
      parse_rc_line("include  a.rc "),
      Some(Ok(RcLine::Include("a.rc")))
    );
    assert_eq!(
      parse_rc_line("color on"),
      Some(Err(()))
    );
  }

  #[test]
  fn reads_keys_comments_and_includes()
  {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("rc");
    let extra =
      temp.path().join("extra.rc");
    fs::write(
      &rc,
      "# settings\ncolor = off  # \
       no ansi\ninclude extra.rc\n\n"
    )
    .expect("write rc");
    fs::write(
      &extra,
      "data.location=/tmp/todos\n"
    )
    .expect("write include");

    let cfg = Config::load(Some(&rc))
      .expect("load");
    assert_eq!(
      cfg.get_bool("color")
        .expect("valid bool"),
      Some(false)
    );
    assert_eq!(
      cfg.get("data.location")
        .as_deref(),
      Some("/tmp/todos")
    );
    assert_eq!(
      cfg.loaded_files.len(),
      2
    );
  }

  #[test]
  fn self_include_does_not_recurse() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("rc");
    fs::write(
      &rc,
      "include rc\ncolor=off\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(&rc))
      .expect("load");
    assert_eq!(
      cfg.get("color").as_deref(),
      Some("off")
    );
  }

  #[test]
  fn rejects_lines_without_equals() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("rc");
    fs::write(&rc, "color on\n")
      .expect("write rc");

    let err = Config::load(Some(&rc))
      .expect_err("bad line");
    assert!(
      err
        .to_string()
        .contains("invalid config line")
    );
  }

  #[test]
  fn booleans_accept_short_forms_and_reject_the_rest()
  {
    let mut cfg = Config::default();
    for (raw, expected) in [
      ("y", true),
      ("Yes", true),
      ("1", true),
      ("n", false),
      ("OFF", false)
    ] {
      cfg.apply_overrides(vec![(
        "color".to_string(),
        raw.to_string()
      )]);
      assert_eq!(
        cfg.get_bool("color")
          .expect("valid bool"),
        Some(expected),
        "{raw}"
      );
    }

    cfg.apply_overrides(vec![(
      "color".to_string(),
      "sometimes".to_string()
    )]);
    assert!(
      cfg.get_bool("color").is_err()
    );
    assert_eq!(
      cfg.get_bool("missing")
        .expect("absent key"),
      None
    );
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![
      (
        "rc.color".to_string(),
        "off".to_string()
      ),
      (
        "default.command".to_string(),
        "shell".to_string()
      ),
    ]);
    assert_eq!(
      cfg.get("color").as_deref(),
      Some("off")
    );
    assert_eq!(
      cfg.get("default.command")
        .as_deref(),
      Some("shell")
    );
  }

  #[test]
  fn data_dir_override_is_created() {
    let temp =
      tempdir().expect("tempdir");
    let dir = temp.path().join("data");
    let resolved = resolve_data_dir(
      &Config::default(),
      Some(&dir)
    )
    .expect("resolve");
    assert_eq!(resolved, dir);
    assert!(dir.is_dir());
  }
}
