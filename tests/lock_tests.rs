//! Integration Tests: pattern lock, session persistence and the lock screen
//!
//! These tests verify:
//! 1. The recognizer scenarios end to end through the public API
//! 2. Session state survives a restart through FileStore
//! 3. Daily expiry and logout keep the lock pattern
//! 4. The lock screen flow: proprietor sets, anyone unlocks
//! 5. LockService drives the widget from a channel with timed resets

use once_cell::sync::Lazy;
use patternlock::{
    AppConfig, FileStore, KeyValueStore, LockConfig, LockError, LockScreen, LockService,
    Pattern, PatternLock, Phase, Point, PointerEvent, Release, Session, Settle, Shutdown,
};
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner())
}

const OWNER: &str = "owner@example.com";

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).expect("date")
}

fn centre(lock: &PatternLock, id: u8) -> Point {
    lock.grid().center(id).expect("node")
}

fn draw(lock: &mut PatternLock, ids: &[u8], now: Instant) -> Release {
    assert!(lock.pointer_down(centre(lock, ids[0])));
    for id in &ids[1..] {
        let p = centre(lock, *id);
        lock.pointer_move(p);
    }
    lock.pointer_up(now)
}

// =============================================================================
// Recognizer
// =============================================================================

/// Test: Set mode accepts a four-node drag and fires the callback once
#[test]
fn set_mode_accepts_and_reports() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut lock = PatternLock::set(LockConfig::default())
        .expect("lock")
        .on_complete(move |p| sink.lock().unwrap().push(p.ids().to_vec()));

    let now = Instant::now();
    // (12,12) → 0, (84,12) → 1, (156,12) → 2, (84,84) → 4
    lock.pointer_down(Point::new(12.0, 12.0));
    lock.pointer_move(Point::new(84.0, 12.0));
    lock.pointer_move(Point::new(156.0, 12.0));
    lock.pointer_move(Point::new(84.0, 84.0));
    let release = lock.pointer_up(now);

    assert_eq!(release, Release::Accepted(Pattern::new(vec![0, 1, 2, 4]).unwrap()));
    assert_eq!(*seen.lock().unwrap(), vec![vec![0, 1, 2, 4]]);
    assert_eq!(lock.phase(), Phase::Settled(Settle::Success));
    assert_eq!(lock.trace(), &[0, 1, 2, 4]);

    assert!(!lock.poll(now + Duration::from_millis(499)));
    assert!(lock.poll(now + Duration::from_millis(500)));
    assert_eq!(lock.phase(), Phase::Idle);
    assert!(lock.trace().is_empty());
}

/// Test: A too-short drag in set mode warns and fires nothing
#[test]
fn set_mode_too_short() {
    let fired = Arc::new(Mutex::new(0));
    let count = fired.clone();
    let mut lock = PatternLock::set(LockConfig::default())
        .expect("lock")
        .on_complete(move |_| *count.lock().unwrap() += 1);

    let release = draw(&mut lock, &[0, 1], Instant::now());
    assert_eq!(release, Release::TooShort { len: 2, warn: true });
    assert_eq!(*fired.lock().unwrap(), 0);
    assert_eq!(lock.phase(), Phase::Idle);
}

/// Test: Verify mode mismatch shows the error state for the error delay
#[test]
fn verify_mode_mismatch_then_resets() {
    let stored = Pattern::new(vec![0, 1, 2, 5]).unwrap();
    let mut lock = PatternLock::verify(LockConfig::default(), stored).expect("lock");
    let now = Instant::now();

    assert_eq!(draw(&mut lock, &[0, 1, 2, 4], now), Release::Mismatch);
    assert!(lock.is_error());
    assert_eq!(lock.next_deadline(), Some(now + Duration::from_millis(800)));

    // moves without a press are ignored while settled
    lock.pointer_move(centre(&lock, 8));
    assert!(lock.is_error());

    assert!(lock.poll(now + Duration::from_millis(800)));
    assert_eq!(lock.phase(), Phase::Idle);
    assert!(lock.trace().is_empty());
    assert!(lock.segments().is_empty());
}

/// Test: A new press cancels the pending error reset
#[test]
fn pointer_down_cancels_pending_reset() {
    let stored = Pattern::new(vec![0, 1, 2, 5]).unwrap();
    let mut lock = PatternLock::verify(LockConfig::default(), stored).expect("lock");
    let now = Instant::now();

    assert_eq!(draw(&mut lock, &[3, 4, 5, 8], now), Release::Mismatch);
    lock.pointer_down(centre(&lock, 0));
    assert!(lock.is_dragging());
    assert_eq!(lock.next_deadline(), None);

    // the stale deadline must not clear the new drag
    assert!(!lock.poll(now + Duration::from_secs(2)));
    assert_eq!(lock.trace(), &[0]);
}

/// Test: Points between nodes never register a hit
#[test]
fn gaps_do_not_hit() {
    let mut lock = PatternLock::set(LockConfig::default()).expect("lock");
    lock.pointer_down(Point::new(48.0, 48.0));
    assert!(lock.is_dragging());
    assert!(lock.trace().is_empty());
    assert_eq!(lock.pointer_move(Point::new(120.0, 48.0)), None);
    assert_eq!(lock.pointer_move(Point::new(84.0, 84.0)), Some(4));
    assert_eq!(lock.pointer_move(Point::new(90.0, 90.0)), None);
    assert_eq!(lock.trace(), &[4]);
}

/// Test: Pointer events deserialize from host JSON
#[test]
fn host_events_from_json() {
    let mut lock = PatternLock::set(LockConfig::default()).expect("lock");
    let now = Instant::now();
    let events: Vec<PointerEvent> = serde_json::from_str(
        r#"[
            {"type": "down", "x": 12.0, "y": 12.0},
            {"type": "move", "x": 12.0, "y": 84.0},
            {"type": "move", "x": 12.0, "y": 156.0},
            {"type": "move", "x": 84.0, "y": 156.0},
            {"type": "leave"}
        ]"#,
    )
    .expect("events");

    let releases: Vec<Release> = events.into_iter().filter_map(|e| lock.handle(e, now)).collect();
    assert_eq!(releases, vec![Release::Accepted(Pattern::new(vec![0, 3, 6, 7]).unwrap())]);
}

// =============================================================================
// Session + FileStore
// =============================================================================

/// Test: Session round-trips through the file store across a restart
#[test]
fn session_survives_restart() {
    let dir = TempDir::new().expect("tempdir");

    {
        let store = FileStore::in_dir(dir.path());
        let mut session = Session::default();
        session.record_login(OWNER, day(4));
        session.set_lock_pattern(Pattern::new(vec![2, 4, 6, 8]).unwrap());
        session.save(&store).expect("save");
    }

    let store = FileStore::in_dir(dir.path());
    let session = Session::load(&store).expect("load");
    assert_eq!(session.login_date, Some(day(4)));
    assert_eq!(session.user_email.as_deref(), Some(OWNER));
    assert_eq!(session.lock_pattern, Some(Pattern::new(vec![2, 4, 6, 8]).unwrap()));
    assert_eq!(store.get("lockPattern").unwrap().as_deref(), Some("[2,4,6,8]"));
    assert_eq!(store.get("loginDate").unwrap().as_deref(), Some("2024-03-04"));
}

/// Test: Next-day expiry and logout clear the login but keep the pattern
#[test]
fn expiry_and_logout_keep_pattern() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::in_dir(dir.path());

    let mut session = Session::default();
    session.record_login(OWNER, day(4));
    session.set_lock_pattern(Pattern::new(vec![0, 1, 2, 3]).unwrap());
    session.save(&store).unwrap();

    let mut reloaded = Session::load(&store).unwrap();
    assert!(reloaded.is_active_on(day(4)));
    assert!(!reloaded.expire_if_stale(day(4)));
    assert!(reloaded.expire_if_stale(day(5)));
    reloaded.save(&store).unwrap();

    let after = Session::load(&store).unwrap();
    assert!(after.login_date.is_none());
    assert!(after.user_email.is_none());
    assert!(after.lock_pattern.is_some());

    let mut again = after.clone();
    again.record_login(OWNER, day(5));
    again.logout();
    again.save(&store).unwrap();
    assert_eq!(store.get("userEmail").unwrap(), None);
    assert!(Session::load(&store).unwrap().lock_pattern.is_some());
}

/// Test: A hand-edited bad pattern loads as no pattern
#[test]
fn corrupt_pattern_is_ignored() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::in_dir(dir.path());
    store.put("lockPattern", "[1,1,2,3]").unwrap();
    store.put("userEmail", OWNER).unwrap();

    let session = Session::load(&store).unwrap();
    assert!(session.lock_pattern.is_none());
    assert_eq!(session.user_email.as_deref(), Some(OWNER));
}

/// Test: AppConfig reads its root and proprietor from the environment
#[test]
fn app_config_from_env() {
    let _guard = lock_env();
    let dir = TempDir::new().expect("tempdir");
    std::env::set_var("PATTERNLOCK_ROOT", dir.path());
    std::env::set_var("PATTERNLOCK_APP", "till");
    std::env::set_var("PATTERNLOCK_PROPRIETOR", OWNER);

    let config = AppConfig::from_env();
    assert_eq!(config.proprietor_email, OWNER);
    assert_eq!(config.data_dir(), dir.path().join("till").join("data"));

    let built = AppConfig::new("till").with_root(dir.path()).with_proprietor(OWNER);
    assert_eq!(built.data_dir(), config.data_dir());
    assert_eq!(built.proprietor_email, config.proprietor_email);

    let store = FileStore::for_app(&config);
    store.put("userEmail", OWNER).unwrap();
    assert!(dir.path().join("till").join("data").join("local-storage.json").exists());

    std::env::remove_var("PATTERNLOCK_ROOT");
    std::env::remove_var("PATTERNLOCK_APP");
    std::env::remove_var("PATTERNLOCK_PROPRIETOR");
}

// =============================================================================
// Lock screen
// =============================================================================

/// Test: Proprietor sets a pattern, restart locks, staff unlocks
#[test]
fn lock_screen_end_to_end() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::in_dir(dir.path());
    let now = Instant::now();

    let mut owner = Session::default();
    owner.record_login(OWNER, day(9));
    let mut screen = LockScreen::new(owner, OWNER);
    assert!(!screen.is_locked());

    let mut setter = screen.pattern_setter(LockConfig::default()).expect("setter");
    let Release::Accepted(pattern) = draw(&mut setter, &[6, 4, 2, 5, 8], now) else {
        panic!("pattern not accepted");
    };
    screen.save_pattern(pattern, &store).expect("save");

    // a signatory signs in on the same terminal
    let mut staff = Session::load(&store).unwrap();
    staff.record_login("staff@example.com", day(9));
    let mut screen = LockScreen::new(staff, OWNER);
    assert!(screen.is_locked());
    assert!(!screen.status().can_manage);
    assert!(matches!(screen.lock(), Err(LockError::NotProprietor)));

    let mut unlocker = screen.unlocker(LockConfig::default()).expect("unlocker");
    assert_eq!(draw(&mut unlocker, &[6, 4, 2, 5], now), Release::Mismatch);
    unlocker.reset();
    let Release::Accepted(drawn) = draw(&mut unlocker, &[6, 4, 2, 5, 8], now) else {
        panic!("unlock drag not accepted");
    };
    assert!(screen.unlock(&drawn));
    assert!(!screen.is_locked());
}

/// Test: A pattern drawn under a stricter minimum relocks after a restart,
/// and a minimum below the stored-pattern floor is refused up front
#[test]
fn custom_minimum_pattern_survives_restart() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::in_dir(dir.path());
    let mut owner = Session::default();
    owner.record_login(OWNER, day(9));
    let mut screen = LockScreen::new(owner, OWNER);

    assert!(matches!(
        screen.pattern_setter(LockConfig::default().with_min_nodes(3)),
        Err(LockError::InvalidPattern(_))
    ));

    let mut setter = screen.pattern_setter(LockConfig::default().with_min_nodes(5)).expect("setter");
    let Release::Accepted(pattern) = draw(&mut setter, &[0, 1, 2, 5, 8], Instant::now()) else {
        panic!("pattern not accepted");
    };
    screen.save_pattern(pattern.clone(), &store).expect("save");

    let reloaded = Session::load(&FileStore::in_dir(dir.path())).expect("load");
    assert_eq!(reloaded.lock_pattern, Some(pattern));
    assert!(LockScreen::new(reloaded, OWNER).is_locked());
}

/// Test: An email left behind with a broken login date loses proprietor rights
#[test]
fn stale_email_cannot_manage_pattern() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::in_dir(dir.path());
    store.put("loginDate", "not-a-date").unwrap();
    store.put("userEmail", OWNER).unwrap();

    let session = Session::load_for_day(&store, day(9)).expect("load");
    assert!(session.user_email.is_none());
    assert_eq!(store.get("userEmail").unwrap(), None);
    assert_eq!(store.get("loginDate").unwrap(), None);

    let screen = LockScreen::new(session, OWNER);
    assert!(!screen.status().can_manage);
    assert!(matches!(screen.pattern_setter(LockConfig::default()), Err(LockError::NotProprietor)));

    // yesterday's login is dropped the same way
    let mut yesterday = Session::default();
    yesterday.record_login(OWNER, day(8));
    yesterday.save(&store).unwrap();
    let session = Session::load_for_day(&store, day(9)).expect("load");
    assert!(!LockScreen::new(session, OWNER).can_manage_pattern());
}

// =============================================================================
// LockService
// =============================================================================

/// Test: Service resolves releases and auto-resets on its own timer
#[test]
fn service_runs_timed_reset() {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    rt.block_on(async {
        let stored = Pattern::new(vec![0, 1, 2, 5]).unwrap();
        let lock = PatternLock::verify(LockConfig::fast_test(), stored).unwrap();
        let grid = lock.grid().clone();
        let at = |id| grid.center(id).unwrap();

        let shutdown = Shutdown::new();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = LockService::new(lock).with_outcomes(out_tx).spawn(rx, shutdown.subscribe());

        for event in [
            PointerEvent::Down(at(3)),
            PointerEvent::Move(at(4)),
            PointerEvent::Move(at(5)),
            PointerEvent::Move(at(8)),
            PointerEvent::Up,
        ] {
            tx.send(event).unwrap();
        }
        assert_eq!(out_rx.recv().await, Some(Release::Mismatch));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.trigger().await;
        let lock = handle.await.expect("join");
        assert_eq!(lock.phase(), Phase::Idle);
        assert!(lock.trace().is_empty());
    });
}
