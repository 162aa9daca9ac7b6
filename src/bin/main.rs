//! Patternlock CLI - drive the lock widget and session from a terminal
//!
//!   patternlock status                   → session + lock status as JSON
//!   patternlock login [--role <r>] [--email <e>]  → mail an OTP, read it from stdin, sign in
//!   patternlock logout                   → clear the login, keep the pattern
//!   patternlock set <ids>                → draw and save a lock pattern (proprietor)
//!   patternlock unlock <ids>             → draw a pattern against the stored one
//!   patternlock trace <x,y> <x,y> ...    → raw drag through a set-mode widget
//!   patternlock replay                   → JSON pointer events on stdin, one per line
//!
//! Node ids are drawn by dragging across the node centres in order,
//! e.g. `patternlock set 0,1,2,4`.
//!
//! Configuration (environment or `.env`):
//!   PATTERNLOCK_ROOT         data root (default: platform local data dir)
//!   PATTERNLOCK_APP          app directory name (default: patternlock)
//!   PATTERNLOCK_PROPRIETOR   proprietor email
//!   PATTERNLOCK_LOG_JSON=1   JSON logs on stderr

use anyhow::{anyhow, bail, Context, Result};
use patternlock::logging::{init_logging, DEFAULT_FILTER, VERBOSE_FILTER};
use patternlock::core::pattern::parse_ids;
use patternlock::session::today;
use patternlock::{
    shutdown_on_ctrl_c, AppConfig, FileStore, LockScreen, LockService, LogMailer, LoginFlow,
    PatternLock, Point, PointerEvent, Release, Role, Session, Shutdown, Signatory,
};
use serde_json::{json, Value};
use std::env;
use std::future::Future;
use std::io::{self, BufRead, IsTerminal};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::debug;

const SIGNATORIES_FILE: &str = "signatories.json";

fn main() {
    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);
    init_logging(if opts.verbose { VERBOSE_FILTER } else { DEFAULT_FILTER });

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("patternlock {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("status") => cmd_status(),
        Some("login") => cmd_login(&opts),
        Some("logout") => cmd_logout(),
        Some("set") => cmd_set(&opts),
        Some("unlock") => cmd_unlock(&opts),
        Some("trace") => cmd_trace(&opts),
        Some("replay") => cmd_replay(),
        Some(cmd) => Err(anyhow!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = opts.pretty || io::stdout().is_terminal();
    match result {
        Ok(output) => println!("{}", render(&output, pretty)),
        Err(e) => {
            eprintln!("{}", render(&json!({"error": format!("{e:#}")}), pretty));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    let out = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    out.unwrap_or_else(|_| value.to_string())
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    positional: Vec<String>,
    role: Option<String>,
    email: Option<String>,
    pretty: bool,
    verbose: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        load_dotenv();

        let mut opts = ParsedArgs::default();
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--pretty" => opts.pretty = true,
                "--verbose" | "-v" => opts.verbose = true,
                "--role" | "-r" => {
                    if i + 1 < args.len() {
                        opts.role = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--email" | "-e" => {
                    if i + 1 < args.len() {
                        opts.email = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                _ if opts.command.is_none() => opts.command = Some(arg.clone()),
                _ => opts.positional.push(arg.clone()),
            }
            i += 1;
        }
        opts
    }
}

/// Load `.env` from the working directory without overriding real variables.
fn load_dotenv() {
    let Ok(contents) = std::fs::read_to_string(".env") else { return };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"');
            if !value.is_empty() && env::var(key.trim()).is_err() {
                env::set_var(key.trim(), value);
            }
        }
    }
}

fn print_usage() {
    println!(
        r#"patternlock - pattern lock and session tool

USAGE:
    patternlock <command> [args] [--pretty] [--verbose]

COMMANDS:
    status                 Show session and lock status
    login [--role <r>] [--email <e>]
                           Sign in with an emailed OTP (role: proprietor or a signatory
                           email; email defaults to the role's registered address)
    logout                 Clear the login (keeps the lock pattern)
    set <ids>              Draw and save a new lock pattern, e.g. 0,1,2,4
    unlock <ids>           Draw a pattern and check it against the stored one
    trace <x,y> ...        Drag through the given points and report the result
    replay                 Read JSON pointer events from stdin

ENVIRONMENT:
    PATTERNLOCK_ROOT, PATTERNLOCK_APP, PATTERNLOCK_PROPRIETOR, PATTERNLOCK_LOG_JSON, RUST_LOG
"#
    );
}

// =============================================================================
// Context
// =============================================================================

struct Ctx {
    config: AppConfig,
    store: FileStore,
    session: Session,
}

impl Ctx {
    /// Load the session and drop it if it was not created today.
    fn load() -> Result<Self> {
        let config = AppConfig::from_env();
        let store = FileStore::for_app(&config);
        let session = Session::load_for_day(&store, today()).context("loading session")?;
        debug!(path = %store.path().display(), "session store");
        Ok(Self { config, store, session })
    }

    fn screen(&self) -> LockScreen {
        LockScreen::new(self.session.clone(), self.config.proprietor_email.clone())
    }
}

// =============================================================================
// Commands
// =============================================================================

fn cmd_status() -> Result<Value> {
    let ctx = Ctx::load()?;
    let screen = ctx.screen();
    Ok(json!({
        "session": ctx.session,
        "active": ctx.session.is_active_on(today()),
        "lock": screen.status(),
        "store": ctx.store.path().display().to_string(),
    }))
}

fn cmd_login(opts: &ParsedArgs) -> Result<Value> {
    let mut ctx = Ctx::load()?;
    let role = Role::parse(opts.role.as_deref().unwrap_or("proprietor"));
    let mut flow = LoginFlow::new(ctx.config.proprietor_email.clone())
        .with_signatories(load_signatories(&ctx.config)?);

    let rt = tokio::runtime::Runtime::new()?;
    let email = match &opts.email {
        Some(email) => email.clone(),
        None => flow.resolve_email(&role)?,
    };
    let email = rt.block_on(flow.request_otp(&role, &email, &LogMailer))?;
    eprintln!("OTP sent to {email}. Enter code:");

    for line in io::stdin().lock().lines() {
        let line = line?;
        if flow.verify(&line, today(), &mut ctx.session)? {
            ctx.session.save(&ctx.store)?;
            return Ok(json!({"logged_in": true, "email": email}));
        }
        eprintln!("Incorrect OTP. Please try again:");
    }
    flow.back();
    Ok(json!({"logged_in": false}))
}

fn load_signatories(config: &AppConfig) -> Result<Vec<Signatory>> {
    let path = config.data_dir().join(SIGNATORIES_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn cmd_logout() -> Result<Value> {
    let mut ctx = Ctx::load()?;
    ctx.session.logout();
    ctx.session.save(&ctx.store)?;
    Ok(json!({"logged_out": true}))
}

fn cmd_set(opts: &ParsedArgs) -> Result<Value> {
    let ctx = Ctx::load()?;
    let mut screen = ctx.screen();
    let mut widget = screen.pattern_setter(ctx.config.lock.clone())?;
    match draw_ids(&mut widget, ids_arg(opts)?)? {
        Release::Accepted(pattern) => {
            screen.save_pattern(pattern.clone(), &ctx.store)?;
            Ok(json!({"saved": pattern}))
        }
        Release::TooShort { len, .. } => bail!(
            "Pattern too short: {len} nodes, use at least {}",
            widget.config().min_nodes
        ),
        other => bail!("unexpected release: {other:?}"),
    }
}

fn cmd_unlock(opts: &ParsedArgs) -> Result<Value> {
    let ctx = Ctx::load()?;
    let mut screen = ctx.screen();
    let mut widget = screen.unlocker(ctx.config.lock.clone())?;
    let release = draw_ids(&mut widget, ids_arg(opts)?)?;
    let unlocked = match &release {
        Release::Accepted(pattern) => screen.unlock(pattern),
        _ => false,
    };
    Ok(json!({"unlocked": unlocked, "release": release_json(&release)}))
}

fn cmd_trace(opts: &ParsedArgs) -> Result<Value> {
    let config = AppConfig::from_env();
    let mut widget = PatternLock::set(config.lock)?;
    let points = opts
        .positional
        .iter()
        .map(|raw| parse_point(raw))
        .collect::<Result<Vec<_>>>()?;
    let (first, rest) = points.split_first().ok_or_else(|| anyhow!("trace needs at least one point"))?;

    if !widget.pointer_down(*first) {
        bail!("({}, {}) is outside the widget", first.x, first.y);
    }
    for p in rest {
        widget.pointer_move(*p);
    }
    let trace = widget.trace().to_vec();
    let segments = widget.segments().len();
    let release = widget.pointer_up(Instant::now());
    Ok(json!({"trace": trace, "segments": segments, "release": release_json(&release)}))
}

/// Drive a LockService from stdin. Verifies against the stored pattern when
/// there is one, otherwise runs in set mode without saving.
fn cmd_replay() -> Result<Value> {
    let ctx = Ctx::load()?;
    let lock = match ctx.session.lock_pattern.clone() {
        Some(stored) => PatternLock::verify(ctx.config.lock.clone(), stored)?,
        None => PatternLock::set(ctx.config.lock.clone())?,
    };
    let mode = lock.mode().as_str();

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        let shutdown = Shutdown::new();
        let run = replay(lock, io::BufReader::new(io::stdin()), &shutdown);
        shutdown_on_ctrl_c(shutdown);
        run.await
    });
    // the stdin reader may still be parked in a read after Ctrl+C
    rt.shutdown_background();
    let (releases, interrupted) = result?;

    Ok(json!({"mode": mode, "releases": releases, "interrupted": interrupted}))
}

/// Feed newline-delimited JSON events from `input` through a LockService.
/// Ends at EOF, or on shutdown without waiting for `input`. Returns the
/// release outcomes and whether shutdown cut it short.
fn replay<R>(
    lock: PatternLock,
    input: R,
    shutdown: &Shutdown,
) -> impl Future<Output = Result<(Vec<Value>, bool)>>
where
    R: BufRead + Send + 'static,
{
    let mut interrupt = shutdown.subscribe();
    let service_stop = shutdown.subscribe();

    async move {
        let (tx, rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let handle = LockService::new(lock).with_outcomes(out_tx).spawn(rx, service_stop);

        let reader = tokio::task::spawn_blocking(move || -> Result<()> {
            for line in input.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let event: PointerEvent = serde_json::from_str(&line)
                    .with_context(|| format!("bad event: {line}"))?;
                if tx.send(event).is_err() {
                    break;
                }
            }
            Ok(())
        });

        let mut releases = Vec::new();
        while let Some(release) = out_rx.recv().await {
            releases.push(release_json(&release));
        }
        handle.await?;

        let interrupted = interrupt.try_recv().is_ok();
        if !interrupted {
            reader.await??;
        }
        Ok((releases, interrupted))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn ids_arg(opts: &ParsedArgs) -> Result<Vec<u8>> {
    let ids = parse_ids(&opts.positional.join(","))?;
    if ids.is_empty() {
        bail!("no node ids given");
    }
    Ok(ids)
}

/// Press on the first node, drag over the others, release.
fn draw_ids(widget: &mut PatternLock, ids: Vec<u8>) -> Result<Release> {
    let centres = ids
        .iter()
        .map(|id| widget.grid().center(*id).ok_or_else(|| anyhow!("no node {id} on this grid")))
        .collect::<Result<Vec<Point>>>()?;
    widget.pointer_down(centres[0]);
    for p in &centres[1..] {
        widget.pointer_move(*p);
    }
    Ok(widget.pointer_up(Instant::now()))
}

fn parse_point(raw: &str) -> Result<Point> {
    let (x, y) = raw.split_once(',').ok_or_else(|| anyhow!("point must be x,y: '{raw}'"))?;
    Ok(Point::new(x.trim().parse()?, y.trim().parse()?))
}

fn release_json(release: &Release) -> Value {
    match release {
        Release::NotDragging => json!({"result": "not_dragging"}),
        Release::TooShort { len, warn } => json!({"result": "too_short", "len": len, "warn": warn}),
        Release::Accepted(pattern) => json!({"result": "accepted", "pattern": pattern}),
        Release::Mismatch => json!({"result": "mismatch"}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patternlock::LockConfig;
    use std::io::{Cursor, Read};
    use std::time::Duration;

    /// Input that never yields, like a terminal nobody types into.
    struct Stalled;

    impl Read for Stalled {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            loop {
                std::thread::park();
            }
        }
    }

    #[test]
    fn replay_reads_until_eof() {
        let lock = PatternLock::set(LockConfig::fast_test()).unwrap();
        let input = Cursor::new(
            [
                r#"{"type":"down","x":12,"y":12}"#,
                "",
                r#"{"type":"move","x":84,"y":12}"#,
                r#"{"type":"move","x":156,"y":12}"#,
                r#"{"type":"move","x":84,"y":84}"#,
                r#"{"type":"up"}"#,
            ]
            .join("\n"),
        );
        let rt = tokio::runtime::Runtime::new().unwrap();
        let shutdown = Shutdown::new();
        let (releases, interrupted) = rt.block_on(replay(lock, input, &shutdown)).unwrap();

        assert!(!interrupted);
        assert_eq!(releases, vec![json!({"result": "accepted", "pattern": [0, 1, 2, 4]})]);
    }

    #[test]
    fn replay_stops_on_shutdown_with_stalled_input() {
        let lock = PatternLock::set(LockConfig::fast_test()).unwrap();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let shutdown = Shutdown::new();
        let run = replay(lock, io::BufReader::new(Stalled), &shutdown);

        let result = rt.block_on(async {
            let run = tokio::spawn(run);
            tokio::time::sleep(Duration::from_millis(20)).await;
            shutdown.trigger().await;
            tokio::time::timeout(Duration::from_secs(2), run).await
        });
        rt.shutdown_background();

        let (releases, interrupted) = result.expect("replay kept waiting on input").unwrap().unwrap();
        assert!(interrupted);
        assert!(releases.is_empty());
    }

    #[test]
    fn ids_accept_mixed_separators() {
        let opts = ParsedArgs { positional: vec!["0-1".into(), "2 4".into()], ..Default::default() };
        assert_eq!(ids_arg(&opts).unwrap(), vec![0, 1, 2, 4]);
        assert!(ids_arg(&ParsedArgs::default()).is_err());
    }
}
