use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::config::Config;
use crate::controller::{Controller, Outcome};
use crate::filter::Filter;
use crate::preferences::Theme;
use crate::render::TerminalView;
use crate::repository::TaskRepository;
use crate::store::PersistentStore;
use crate::view::Gesture;

const MIN_ID_PREFIX: usize = 4;

const HELP: &str = "\
Commands (any unique prefix works):
  add <text...>              add a task to the top of the list
  toggle <task>              mark done / not done
  delete <task>              remove a task
  edit <task> <text...>      replace the text (blank text keeps the old one)
  cancel <task>              leave edit mode without changing anything
  clear-completed            remove every finished task
  list [all|active|completed]
  filter <all|active|completed>
  theme [toggle|light|dark]
  config                     show the effective configuration
  shell                      interactive session, one command per line
  help | version | quit

<task> is a list position (1, 2, ...), a full id or an id prefix.
Settings can be overridden ahead of the command: todo rc.color=off list";

pub type TermController<S, W> = Controller<S, TerminalView<W>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Quit,
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "toggle",
        "delete",
        "edit",
        "cancel",
        "clear-completed",
        "list",
        "filter",
        "theme",
        "config",
        "shell",
        "help",
        "version",
        "quit",
        "exit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Maps a user-typed task reference to an id: an exact id wins, then a
/// 1-based position in the visible list, then a unique id prefix. Anything
/// else is returned unchanged so the repository treats it as a miss.
pub fn resolve_task_ref<S: PersistentStore>(tasks: &TaskRepository<S>, token: &str) -> String {
    if tasks.contains(token) {
        return token.to_string();
    }

    let visible = tasks.visible_list();
    if let Ok(position) = token.parse::<usize>()
        && position >= 1
        && let Some(task) = visible.get(position - 1)
    {
        debug!(position, id = %task.id, "resolved task by position");
        return task.id.clone();
    }

    if token.chars().count() >= MIN_ID_PREFIX {
        let mut matches = tasks.tasks().iter().filter(|t| t.id.starts_with(token));
        if let Some(task) = matches.next()
            && matches.next().is_none()
        {
            debug!(prefix = %token, id = %task.id, "resolved task by id prefix");
            return task.id.clone();
        }
    }

    debug!(token = %token, "task reference did not resolve");
    token.to_string()
}

#[instrument(skip(controller, cfg, inv, input))]
pub fn dispatch<S, W, R>(
    controller: &mut TermController<S, W>,
    cfg: &Config,
    inv: Invocation,
    input: R,
) -> anyhow::Result<()>
where
    S: PersistentStore,
    W: Write,
    R: BufRead,
{
    debug!(command = %inv.command, args = ?inv.command_args, "dispatching command");

    if inv.command == "shell" {
        return run_shell(controller, cfg, input);
    }

    apply(controller, cfg, &inv)?;
    Ok(())
}

/// Reads commands from `input` until EOF or `quit`. A failing command is
/// reported and the session carries on.
#[instrument(skip_all)]
pub fn run_shell<S, W, R>(
    controller: &mut TermController<S, W>,
    cfg: &Config,
    mut input: R,
) -> anyhow::Result<()>
where
    S: PersistentStore,
    W: Write,
    R: BufRead,
{
    info!("starting shell session");
    controller.refresh()?;

    let mut line = String::new();
    loop {
        controller.view_mut().prompt("> ")?;
        line.clear();
        let read = input.read_line(&mut line).context("failed to read command")?;
        if read == 0 {
            controller.view_mut().message("")?;
            break;
        }

        let result = Invocation::from_line(&line).and_then(|inv| match inv {
            Some(inv) if inv.command == "shell" => {
                controller.view_mut().message("already in the shell")?;
                Ok(Step::Continue)
            }
            Some(inv) => apply(controller, cfg, &inv),
            None => Ok(Step::Continue),
        });

        match result {
            Ok(Step::Continue) => {}
            Ok(Step::Quit) => break,
            Err(err) => {
                warn!(error = %err, "shell command failed");
                controller.view_mut().message(&format!("error: {err:#}"))?;
            }
        }
    }

    info!("shell session ended");
    Ok(())
}

fn apply<S, W>(
    controller: &mut TermController<S, W>,
    cfg: &Config,
    inv: &Invocation,
) -> anyhow::Result<Step>
where
    S: PersistentStore,
    W: Write,
{
    let args = &inv.command_args;
    match inv.command.as_str() {
        "add" => {
            if let Outcome::Added(id) = controller.handle(Gesture::Add(inv.text_after(0)))? {
                let short: String = id.chars().take(8).collect();
                controller
                    .view_mut()
                    .message(&format!("Created task {short}."))?;
            }
        }
        "toggle" => {
            let id = required_task(controller, args, "toggle")?;
            controller.handle(Gesture::Toggle(id))?;
        }
        "delete" => {
            let id = required_task(controller, args, "delete")?;
            controller.handle(Gesture::Delete(id))?;
        }
        "edit" => {
            let id = required_task(controller, args, "edit")?;
            let text = inv.text_after(1);
            controller.handle(Gesture::EditCommit(id, text))?;
        }
        "cancel" => {
            let id = required_task(controller, args, "cancel")?;
            controller.handle(Gesture::EditCancel(id))?;
        }
        "clear-completed" => {
            controller.handle(Gesture::ClearCompleted)?;
        }
        "list" => match parse_filter_args(args)? {
            Some(filter) => {
                controller.handle(Gesture::FilterSelect(filter))?;
            }
            None => controller.refresh()?,
        },
        "filter" => {
            let filter = parse_filter_args(args)?
                .ok_or_else(|| anyhow!("filter requires one of: all, active, completed"))?;
            controller.handle(Gesture::FilterSelect(filter))?;
        }
        "theme" => cmd_theme(controller, args)?,
        "config" => cmd_config(controller, cfg)?,
        "help" => controller.view_mut().message(HELP)?,
        "version" => controller
            .view_mut()
            .message(env!("CARGO_PKG_VERSION"))?,
        "quit" | "exit" => return Ok(Step::Quit),
        other => return Err(anyhow!("unknown command: {other}")),
    }

    Ok(Step::Continue)
}

fn required_task<S, W>(
    controller: &TermController<S, W>,
    args: &[String],
    command: &str,
) -> anyhow::Result<String>
where
    S: PersistentStore,
    W: Write,
{
    let token = args
        .first()
        .ok_or_else(|| anyhow!("{command} requires a task reference"))?;
    Ok(resolve_task_ref(controller.tasks(), token))
}

fn parse_filter_args(args: &[String]) -> anyhow::Result<Option<Filter>> {
    let value = match args {
        [] => return Ok(None),
        [flag, value] if flag == "--filter" || flag == "-f" => value.as_str(),
        [single] => single.strip_prefix("--filter=").unwrap_or(single),
        _ => return Err(anyhow!("expected a single filter name, got: {}", args.join(" "))),
    };
    value.parse::<Filter>().map(Some)
}

fn cmd_theme<S, W>(controller: &mut TermController<S, W>, args: &[String]) -> anyhow::Result<()>
where
    S: PersistentStore,
    W: Write,
{
    let gesture = match args.first().map(String::as_str) {
        None => {
            let current = controller.prefs().theme();
            return controller.view_mut().message(&format!("Theme: {current}"));
        }
        Some("toggle") => Gesture::ThemeToggle,
        Some(name) => Gesture::ThemeSelect(name.parse::<Theme>()?),
    };

    controller.handle(gesture)?;
    let current = controller.prefs().theme();
    controller
        .view_mut()
        .message(&format!("Theme set to {current}."))
}

fn cmd_config<S, W>(controller: &mut TermController<S, W>, cfg: &Config) -> anyhow::Result<()>
where
    S: PersistentStore,
    W: Write,
{
    let mut entries: Vec<(&String, &String)> = cfg.iter().collect();
    entries.sort();
    for (key, value) in entries {
        controller.view_mut().message(&format!("{key} = {value}"))?;
    }
    for file in &cfg.loaded_files {
        controller
            .view_mut()
            .message(&format!("# loaded {}", file.display()))?;
    }
    Ok(())
}
