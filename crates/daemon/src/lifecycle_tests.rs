// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atari_core::Config;

fn paths_in(dir: &Path) -> StatePaths {
    let mut paths = StatePaths::resolve(dir, &Config::default());
    // Keep everything inside the temp dir regardless of ATARI_STATE_DIR.
    paths.state_dir = dir.to_path_buf();
    paths.lock_path = dir.join("lock");
    paths.socket_path = dir.join("atari.sock");
    paths
}

#[test]
fn lock_records_pid_and_excludes_second_holder() {
    let dir = tempfile::tempdir().unwrap();
    let lock_path = dir.path().join("lock");

    let guard = acquire_lock(&lock_path).unwrap();
    assert_eq!(read_lock_pid(&lock_path), Some(std::process::id()));

    match acquire_lock(&lock_path) {
        Err(LifecycleError::AlreadyRunning { pid }) => {
            assert_eq!(pid, std::process::id().to_string());
        }
        other => panic!("expected AlreadyRunning, got {other:?}"),
    }

    guard.release();
    assert!(!lock_path.exists());
    // Re-acquirable after release.
    let guard = acquire_lock(&lock_path).unwrap();
    guard.release();
}

#[test]
fn our_own_pid_exists_and_bogus_does_not() {
    assert!(process_exists(std::process::id()));
    // PID far above any default pid_max.
    assert!(!process_exists(4_000_000));
}

#[test]
fn cleanup_removes_files_of_dead_process() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());
    std::fs::write(&paths.lock_path, "4000000\n").unwrap();
    std::fs::write(&paths.socket_path, "").unwrap();

    cleanup_stale(&paths);
    assert!(!paths.lock_path.exists());
    assert!(!paths.socket_path.exists());
}

#[test]
fn cleanup_keeps_files_of_live_process() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());
    std::fs::write(&paths.lock_path, format!("{}\n", std::process::id())).unwrap();
    std::fs::write(&paths.socket_path, "").unwrap();

    cleanup_stale(&paths);
    assert!(paths.lock_path.exists());
    assert!(paths.socket_path.exists());
}

#[test]
fn cleanup_removes_unreadable_lock() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());
    std::fs::write(&paths.lock_path, "not a pid\n").unwrap();

    cleanup_stale(&paths);
    assert!(!paths.lock_path.exists());
}

#[tokio::test]
async fn bind_socket_replaces_stale_file_and_sets_mode() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("atari.sock");
    std::fs::write(&socket_path, "stale").unwrap();

    let _listener = bind_socket(&socket_path).unwrap();
    assert!(socket_path.exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&socket_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn meta_roundtrips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daemon.json");
    let meta = DaemonMeta {
        socket_path: PathBuf::from("/p/.atari/atari.sock"),
        lock_path: PathBuf::from("/p/.atari/lock"),
        log_path: PathBuf::from("/p/.atari/daemon.log"),
        start_time_ms: 123,
        pid: 42,
    };
    meta.write(&path).unwrap();
    assert_eq!(DaemonMeta::read(&path).unwrap(), meta);
}

#[test]
fn state_snapshot_roundtrips_and_tolerates_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    assert!(load_state_snapshot(&path).is_none());

    let mut snapshot = StateSnapshot::default();
    snapshot.stats.completed = 3;
    save_state_snapshot(&path, &snapshot);
    let back = load_state_snapshot(&path).unwrap();
    assert_eq!(back.stats.completed, 3);

    std::fs::write(&path, "not json").unwrap();
    assert!(load_state_snapshot(&path).is_none());
}
