//! Terminal color preset picker.
//!
//! Sets, lists, and picks terminal color presets, or browses them
//! interactively when no command is given. Presets live in
//! `presets.toml` in the config directory, next to `config.toml` and the
//! `favorites` file.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Any error
//! - 2: Unable to determine the current preset
//!
//! # Environment Variables
//!
//! - `DEBUG`: When set, enables debug output to stderr showing signals,
//!   ranks, and per-preset scores.
//! - `RUST_LOG`: Overrides `DEBUG` with a full filter directive.

use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::process::{self, Command};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use prism::Error;
use prism::config::{Bound, Config};
use prism::interactive::{Key, MENU_HELP, Menu, Outcome};
use prism::logs;
use prism::osc::{apply_colors, query_colors};
use prism::presets::load_presets;
use prism::select::{Preset, PresetSelector, Signals};
use prism::services::SystemSignals;
use prism::store::{FileStore, History, Paths};
use prism::terminal::RawTerminal;

/// The terminal did not report colors matching any preset.
#[derive(Debug, thiserror::Error)]
#[error("cannot determine current preset")]
struct Undetermined;

#[derive(Parser, Debug)]
#[command(name = "prism", version, about = "Pick terminal color presets")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Browse presets interactively (default)
    Interactive,
    /// Set the color preset
    Set(SetArgs),
    /// List color presets
    List(ListArgs),
    /// Edit the config file
    Edit(EditArgs),
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct Pick {
    /// Specify a color preset
    #[arg(short, long)]
    preset: Option<String>,
    /// Pick a random favorite
    #[arg(short, long)]
    random: bool,
    /// Pick a smart-random favorite
    #[arg(short, long)]
    smart: bool,
    /// Switch between light/dark
    #[arg(short, long)]
    light_dark: bool,
}

#[derive(Args, Debug)]
struct SetArgs {
    #[command(flatten)]
    pick: Pick,
    /// Animate the preset transition
    #[arg(short, long)]
    animate: bool,
    /// Allow repeats for --random/--smart
    #[arg(short = 'R', long)]
    allow_repeat: bool,
    /// Simulate the given time for --smart
    #[arg(short, long, value_parser = parse_time)]
    time: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct Show {
    /// List only the current preset
    #[arg(short, long)]
    current: bool,
    /// List only favorite presets
    #[arg(short, long)]
    favorites: bool,
    /// List 24h of `set --smart` choices
    #[arg(short, long)]
    smart: bool,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[command(flatten)]
    show: Show,
    /// Show brightness and contrast info
    #[arg(short, long)]
    verbose: bool,
    /// Show scores for `set --smart`
    #[arg(short = 'S', long, conflicts_with = "smart")]
    scores: bool,
    /// Simulate the given time for --scores and --smart
    #[arg(short, long, value_parser = parse_time)]
    time: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
struct EditArgs {
    /// Edit the favorites file
    #[arg(short, long)]
    favorites: bool,
}

/// Parse RFC 3339, or `YYYY-MM-DD HH:MM[:SS]` in local time.
fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(time) = DateTime::parse_from_rfc3339(s) {
        return Ok(time.with_timezone(&Utc));
    }
    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .ok_or_else(|| format!("{s}: expected RFC 3339 or YYYY-MM-DD HH:MM[:SS]"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|time| time.with_timezone(&Utc))
        .ok_or_else(|| format!("{s}: no such local time"))
}

/// Everything loaded from the config directory.
struct Session<'a> {
    config: &'a Config,
    signals: &'a dyn Signals,
    store: FileStore,
    selector: PresetSelector<'a>,
}

fn with_session<T>(paths: Paths, f: impl FnOnce(&Session) -> Result<T>) -> Result<T> {
    let config = Config::load(&paths.config("config.toml"))?;
    let presets = load_presets(&paths.config("presets.toml"))?;
    debug!("loaded {} presets", presets.len());
    let signals = SystemSignals::new(&config);
    let session = Session {
        config: &config,
        signals: &signals,
        store: FileStore::new(paths),
        selector: PresetSelector::new(presets, &config, &signals),
    };
    f(&session)
}

impl<'a> Session<'a> {
    /// The preset whose foreground and background the terminal reports.
    fn current(&self) -> Result<&Preset> {
        let (fg, bg) = query_colors().map_err(|err| {
            debug!("terminal query failed: {err:#}");
            Undetermined
        })?;
        debug!("fg={fg} bg={bg}");
        self.selector
            .presets()
            .find(|preset| preset.colors().foreground() == fg && preset.colors().background() == bg)
            .ok_or_else(|| Undetermined.into())
    }

    fn preset(&self, name: &str) -> Result<&Preset> {
        Ok(self
            .selector
            .get(name)
            .ok_or_else(|| Error::UnknownPreset(name.to_string()))?)
    }

    /// Favorites that name existing presets, in name order.
    fn favorites(&self) -> Result<Vec<&Preset>> {
        let mut favorites = Vec::new();
        for name in self.store.favorites()? {
            match self.selector.get(&name) {
                Some(preset) => favorites.push(preset),
                None => warn!("{name}: unknown preset in favorites"),
            }
        }
        Ok(favorites)
    }

    /// A selector over the favorites, or over every preset if there are none.
    fn smart_pool(&self) -> Result<PresetSelector<'a>> {
        let favorites = self.favorites()?;
        let pool: Vec<Preset> = if favorites.is_empty() {
            self.selector.presets().cloned().collect()
        } else {
            favorites.into_iter().cloned().collect()
        };
        Ok(PresetSelector::new(pool, self.config, self.signals))
    }

    fn set(&self, args: &SetArgs) -> Result<()> {
        let mut rng = rand::thread_rng();
        let pick = &args.pick;
        let name = if let Some(name) = &pick.preset {
            self.preset(name)?.name().to_string()
        } else if pick.light_dark {
            let current = self.current()?;
            self.selector
                .light_dark_alternate(current.name())
                .ok_or_else(|| anyhow!("{}: does not have a light/dark version", current.name()))?
                .to_string()
        } else if pick.random {
            let current = if args.allow_repeat {
                None
            } else {
                Some(self.current()?.name())
            };
            let pool = self.smart_pool()?;
            let options: Vec<&str> = pool
                .presets()
                .map(Preset::name)
                .filter(|&name| Some(name) != current)
                .collect();
            options
                .choose(&mut rng)
                .ok_or_else(|| anyhow!("need at least 2 favorites to pick a new random preset"))?
                .to_string()
        } else if pick.smart {
            let time = args.time.unwrap_or_else(Utc::now);
            let pool = self.smart_pool()?;
            let mut history = self.store.smart_history()?;
            let choice = pool.smart_choice(&mut history, time, !args.allow_repeat, &mut rng)?;
            self.store.set_smart_history(&history)?;
            choice.name().to_string()
        } else {
            // With no arguments, reset the colors (useful if out of sync).
            self.current()?.name().to_string()
        };

        println!("setting preset to {name}");
        let target = self.preset(&name)?;
        if args.animate {
            let start = self.current()?;
            let sleep = self.config.count("animation", "sleep", &[Bound::Ge(0.0)])?;
            let sleep = Duration::from_millis(u64::try_from(sleep)?);
            for frame in self.selector.animation_frames(start.name(), &name)? {
                apply_colors(&frame)?;
                print!(".");
                io::stdout().flush()?;
                thread::sleep(sleep);
            }
            println!();
        }
        apply_colors(target.colors())
    }

    fn list(&self, args: &ListArgs) -> Result<()> {
        let mut rng = rand::thread_rng();
        let time = args.time.unwrap_or_else(Utc::now);

        let (presets, lines): (Vec<&Preset>, Vec<String>) = if args.show.current {
            let current = self.current()?;
            (vec![current], vec![current.name().to_string()])
        } else if args.show.favorites {
            let favorites = self.favorites()?;
            let lines = favorites.iter().map(|p| p.name().to_string()).collect();
            (favorites, lines)
        } else if args.show.smart {
            let pool = self.smart_pool()?;
            let date = time.with_timezone(&Local).date_naive();
            let midnight = Local
                .from_local_datetime(&date.and_time(NaiveTime::MIN))
                .earliest()
                .ok_or_else(|| anyhow!("{date}: no local midnight"))?;
            let mut presets = Vec::new();
            let mut lines = Vec::new();
            for hour in 0..24 {
                let at = midnight + TimeDelta::hours(hour);
                let choice = pool.smart_choice(
                    &mut History::default(),
                    at.with_timezone(&Utc),
                    false,
                    &mut rng,
                )?;
                presets.push(self.preset(choice.name())?);
                lines.push(format!("{}: {}", at.format("%Y-%m-%d %H:%M"), choice.name()));
            }
            (presets, lines)
        } else {
            let presets: Vec<&Preset> = self.selector.presets().collect();
            let lines = presets.iter().map(|p| p.name().to_string()).collect();
            (presets, lines)
        };

        // Simple case: just print the lines.
        if !(args.verbose || args.scores) {
            for line in lines {
                println!("{line}");
            }
            return Ok(());
        }

        let pad = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
        let mut rows: Vec<(f64, Vec<String>)> = lines
            .iter()
            .zip(&presets)
            .map(|(line, preset)| {
                let mut items = vec![format!("{line:pad$}")];
                if args.verbose {
                    items.push(format!("brightness={:.3}", preset.brightness()));
                    items.push(format!("contrast={:.3}", preset.contrast()));
                }
                (0.0, items)
            })
            .collect();
        if args.scores {
            let scores = self.selector.smart_scores(&presets, time, &mut rng)?;
            for ((total, items), (_, score)) in rows.iter_mut().zip(scores) {
                *total = score.total();
                items.push(format!("sun={:06.3}", score.sun));
                items.push(format!("display={:06.3}", score.display));
                items.push(format!("random={:06.3}", score.random));
                items.push(format!("total={:06.3}", score.total()));
            }
            rows.sort_by(|a, b| b.0.total_cmp(&a.0));
        }
        for (_, items) in rows {
            println!("{}", items.join("  "));
        }
        Ok(())
    }

    fn interactive(&self) -> Result<()> {
        if !io::stdin().is_terminal() {
            bail!("interactive mode requires a tty");
        }
        let current = match self.current() {
            Ok(preset) => Some(preset.name()),
            Err(err) => {
                debug!("{err:#}");
                None
            }
        };
        let mut menu = Menu::new(&self.selector, current, self.store.favorites()?)?;
        let mut rng = rand::thread_rng();
        print!("{MENU_HELP}");
        let mut terminal = RawTerminal::open()?;
        let result = self.browse(&mut menu, &mut terminal, &mut rng);
        terminal.restore()?;
        println!();
        result
    }

    fn browse(
        &self,
        menu: &mut Menu<'_, '_>,
        terminal: &mut RawTerminal,
        rng: &mut impl Rng,
    ) -> Result<()> {
        loop {
            print!("\r\x1b[2K{}", menu.status());
            io::stdout().flush()?;
            let Some(byte) = terminal.read_byte()? else {
                return Ok(());
            };
            let Some(key) = Key::from_byte(byte) else {
                continue;
            };
            match menu.dispatch(key, rng) {
                Outcome::Changed => apply_colors(self.preset(menu.current())?.colors())?,
                Outcome::FavoritesChanged => self.store.set_favorites(menu.favorites())?,
                Outcome::Unchanged => {}
                Outcome::Quit => return Ok(()),
            }
        }
    }
}

fn edit(paths: &Paths, args: &EditArgs) -> Result<()> {
    let editor = env::var_os("VISUAL")
        .or_else(|| env::var_os("EDITOR"))
        .filter(|editor| !editor.is_empty())
        .ok_or_else(|| anyhow!("must set the VISUAL or EDITOR environment variable"))?;
    let path = paths.config(if args.favorites { "favorites" } else { "config.toml" });
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let status = Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("Failed to run {}", editor.to_string_lossy()))?;
    if !status.success() {
        bail!("{}: editor exited with {status}", editor.to_string_lossy());
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let paths = Paths::platform()?;
    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Interactive => with_session(paths, |session| session.interactive()),
        Commands::Set(args) => with_session(paths, |session| session.set(&args)),
        Commands::List(args) => with_session(paths, |session| session.list(&args)),
        Commands::Edit(args) => edit(&paths, &args),
    }
}

fn main() {
    logs::init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("prism: {err:#}");
        process::exit(if err.is::<Undetermined>() { 2 } else { 1 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_time() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).single();
        assert_eq!(parse_time("2024-06-01T12:30:00+02:00").ok(), expected);
        assert_eq!(parse_time("2024-06-01T10:30:00Z").ok(), expected);

        let local = parse_time("2024-06-01 12:30").expect("local time");
        assert_eq!(local, parse_time("2024-06-01 12:30:00").expect("local time"));
        assert_eq!(
            local.with_timezone(&Local).naive_local().to_string(),
            "2024-06-01 12:30:00"
        );

        assert!(parse_time("noon").is_err());
        assert!(parse_time("2024-13-01 12:30").is_err());
    }

    #[test]
    fn test_set_options_are_exclusive() {
        assert!(Cli::try_parse_from(["prism", "set", "-p", "nord", "-s"]).is_err());
        assert!(Cli::try_parse_from(["prism", "set", "-r", "-l"]).is_err());
        let cli = Cli::try_parse_from(["prism", "set", "-s", "-a", "-R", "-t", "2024-06-01 12:00"])
            .expect("valid");
        let Some(Commands::Set(args)) = cli.command else {
            panic!("expected set");
        };
        assert!(args.pick.smart && args.animate && args.allow_repeat);
        assert!(args.time.is_some());
    }

    #[test]
    fn test_interactive_is_the_default() {
        let cli = Cli::try_parse_from(["prism"]).expect("valid");
        assert!(cli.command.is_none());
        let cli = Cli::try_parse_from(["prism", "interactive"]).expect("valid");
        assert!(matches!(cli.command, Some(Commands::Interactive)));
        assert!(Cli::try_parse_from(["prism", "interactive", "-s"]).is_err());
    }

    #[test]
    fn test_list_smart_rejects_scores() {
        assert!(Cli::try_parse_from(["prism", "list", "-s", "-S"]).is_err());
        assert!(Cli::try_parse_from(["prism", "list", "-c", "-f"]).is_err());
        assert!(Cli::try_parse_from(["prism", "list", "-f", "-v", "-S"]).is_ok());
    }
}
