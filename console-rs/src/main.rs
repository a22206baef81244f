use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use ooconsole::cli::{self, ConfigFile};
use ooconsole::config::Config;
use ooconsole::console::{
    Category, Console, Evaluator, JsonFileSettings, MemorySettings, MessageSink, SettingsStore,
};
use ooconsole::logging;
use ooconsole::script::ScriptEvaluator;
use ooconsole::terminal::{parse_color, TerminalSink};

type Session = Console<Box<dyn Evaluator>, TerminalSink, Box<dyn SettingsStore>>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("ooconsole: {e}");
            eprintln!("{}", cli::USAGE);
            std::process::exit(1);
        }
    };

    let config = match &args.config {
        ConfigFile::Search => Config::load(None),
        ConfigFile::Skip => Ok(Config::default()),
        ConfigFile::Explicit(path) => Config::load(Some(path)),
    };
    let config = config.unwrap_or_else(|e| {
        eprintln!("ooconsole: warning: {e}");
        Config::default()
    });

    let (stdin_tty, stdout_tty, stderr_tty) = unsafe {
        (
            libc::isatty(libc::STDIN_FILENO) != 0,
            libc::isatty(libc::STDOUT_FILENO) != 0,
            libc::isatty(libc::STDERR_FILENO) != 0,
        )
    };

    let level = if args.debug { "debug" } else { config.log_level.as_str() };
    logging::init(level, stderr_tty);

    // ── Evaluator ─────────────────────────────────────────────────────────────
    let evaluator = match make_evaluator(args.lua) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("ooconsole: {e}");
            std::process::exit(1);
        }
    };

    // ── Settings ──────────────────────────────────────────────────────────────
    let settings: Box<dyn SettingsStore> = match args.settings.clone().or_else(|| config.settings_path()) {
        Some(path) => match JsonFileSettings::open(&path) {
            Ok(s) => {
                info!(path = %path.display(), "using settings file");
                Box::new(s)
            }
            Err(e) => {
                eprintln!("ooconsole: {e}");
                std::process::exit(1);
            }
        },
        None => {
            warn!("no settings location; macros will not be saved");
            Box::new(MemorySettings::new())
        }
    };

    // ── Output ────────────────────────────────────────────────────────────────
    let color = config.color && !args.no_color && stdout_tty;
    let mut sink = TerminalSink::stdout(color);
    for (category, name) in &config.colors {
        match parse_color(name) {
            Some(c) => sink.set_foreground(category, c),
            None => warn!(%category, colour = %name, "unrecognised colour in config"),
        }
    }

    let mut console: Session = Console::new(evaluator, sink, settings);

    if !args.quiet {
        let ver = env!("CARGO_PKG_VERSION");
        console
            .sink_mut()
            .emit(Category::General, &format!("ooconsole {ver}"), None);
        console.sink_mut().emit(
            Category::General,
            "Type :showM <name> to see a macro, :setM <name> <body> to define one.",
            None,
        );
    }

    // ── Startup commands (-c<cmd>) ────────────────────────────────────────────
    for cmd in &args.commands {
        run_line(&mut console, cmd);
    }

    // ── Main loop ─────────────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if stdin_tty {
            let prompt = if console.is_accumulating() {
                &config.continuation_prompt
            } else {
                &config.prompt
            };
            let mut out = std::io::stdout();
            let _ = write!(out, "{prompt}");
            let _ = out.flush();
        }

        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => run_line(&mut console, &line),
                Ok(None) => break,
                Err(e) => {
                    eprintln!("ooconsole: {e}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                // Ctrl-C abandons a pending unit; on an empty buffer it quits.
                if console.reset_buffer().is_empty() {
                    println!();
                    break;
                }
                println!();
            }
        }
    }
}

fn make_evaluator(lua: bool) -> Result<Box<dyn Evaluator>, String> {
    if lua {
        #[cfg(feature = "lua")]
        {
            return ooconsole::lua::LuaEvaluator::new()
                .map(|e| Box::new(e) as Box<dyn Evaluator>)
                .map_err(|e| format!("cannot start Lua: {e}"));
        }
        #[cfg(not(feature = "lua"))]
        {
            return Err("-l: built without Lua support".to_owned());
        }
    }
    Ok(Box::new(ScriptEvaluator::new()))
}

/// Dispatch one line, printing any evaluation error and carrying on.
fn run_line(console: &mut Session, line: &str) {
    if let Err(e) = console.dispatch(line) {
        console
            .sink_mut()
            .emit(Category::from("error"), &e.to_string(), None);
    }
}
