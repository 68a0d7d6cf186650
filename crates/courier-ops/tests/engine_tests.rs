use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use courier_core::{
    ConflictPolicy, EngineConfig, OperationKind, OperationState, ValidationError,
};
use courier_ops::{Engine, Entry, EntryKind, FileSystem, OperationEvent, Survey};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// In-memory filesystem where every source is a plain file.
#[derive(Default)]
struct FakeFileSystem {
    failing: HashSet<PathBuf>,
    written: Mutex<HashSet<PathBuf>>,
    copies: AtomicUsize,
    gate: Option<Gate>,
}

/// Blocks the `at`-th copy until the test releases it.
struct Gate {
    at: usize,
    reached: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

struct GateHandle {
    reached: mpsc::Receiver<()>,
    release: mpsc::Sender<()>,
}

impl GateHandle {
    async fn wait_reached(self) -> Self {
        tokio::task::spawn_blocking(move || {
            self.reached.recv().unwrap();
            self
        })
        .await
        .unwrap()
    }

    fn release(&self) {
        self.release.send(()).unwrap();
    }
}

impl FakeFileSystem {
    fn failing(paths: &[PathBuf]) -> Self {
        Self {
            failing: paths.iter().cloned().collect(),
            ..Self::default()
        }
    }

    fn gated(at: usize) -> (Self, GateHandle) {
        let (reached_tx, reached_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let fs = Self {
            gate: Some(Gate {
                at,
                reached: Mutex::new(reached_tx),
                release: Mutex::new(release_rx),
            }),
            ..Self::default()
        };
        (
            fs,
            GateHandle {
                reached: reached_rx,
                release: release_tx,
            },
        )
    }

    fn failing_on(mut self, paths: &[PathBuf]) -> Self {
        self.failing.extend(paths.iter().cloned());
        self
    }

    fn touch(&self, entry: &Entry, target: &Path) -> io::Result<()> {
        if self.failing.contains(&entry.path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.written.lock().unwrap().insert(target.to_path_buf());
        Ok(())
    }
}

impl FileSystem for FakeFileSystem {
    fn count(&self, sources: &[PathBuf], _recursive: bool, cancel: &CancellationToken) -> Survey {
        let mut survey = Survey::default();
        if cancel.is_cancelled() {
            survey.interrupted = true;
            return survey;
        }
        survey.entries = sources
            .iter()
            .enumerate()
            .map(|(i, path)| Entry::root(path.clone(), i, EntryKind::File))
            .collect();
        survey
    }

    fn exists(&self, path: &Path) -> bool {
        self.written.lock().unwrap().contains(path)
    }

    fn ensure_dir(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn copy(&self, entry: &Entry, target: &Path) -> io::Result<()> {
        let n = self.copies.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.touch(entry, target);
        if let Some(gate) = &self.gate {
            if n == gate.at {
                gate.reached.lock().unwrap().send(()).unwrap();
                gate.release.lock().unwrap().recv().unwrap();
            }
        }
        result
    }

    fn rename(&self, entry: &Entry, target: &Path) -> io::Result<()> {
        self.touch(entry, target)
    }

    fn delete(&self, entry: &Entry) -> io::Result<()> {
        if self.failing.contains(&entry.path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        Ok(())
    }

    fn trash(&self, entry: &Entry) -> io::Result<()> {
        self.delete(entry)
    }
}

fn files(prefix: &str, n: usize) -> Vec<PathBuf> {
    (0..n)
        .map(|i| PathBuf::from(format!("/{prefix}/file{i:02}.txt")))
        .collect()
}

fn fake_engine(fs: FakeFileSystem) -> Engine {
    Engine::with_file_system(Arc::new(fs), EngineConfig::default())
}

#[tokio::test]
async fn test_copy_with_permission_errors_attempts_everything() {
    let sources = files("src", 10);
    let failing = vec![sources[1].clone(), sources[4].clone(), sources[8].clone()];
    let mut engine = fake_engine(FakeFileSystem::failing(&failing));

    let id = engine
        .submit(OperationKind::Copy, sources, Some(PathBuf::from("/dst")))
        .unwrap();
    let op = engine.wait_for(id).await.unwrap();

    assert_eq!(op.state(), OperationState::Failure);
    assert_eq!(op.done(), 10);
    assert_eq!(op.total(), Some(10));
    let paths: Vec<_> = op.errors().iter().map(|e| e.path.clone()).collect();
    assert_eq!(paths, failing);
    assert!(op.errors().iter().all(|e| e.message == "Permission denied"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_after_four_items() {
    let (fs, gate) = FakeFileSystem::gated(4);
    let mut engine = fake_engine(fs);

    let id = engine
        .submit(OperationKind::Copy, files("src", 10), Some(PathBuf::from("/dst")))
        .unwrap();
    let gate = gate.wait_reached().await;
    assert!(engine.cancel(id));
    gate.release();

    let op = engine.wait_for(id).await.unwrap();
    assert_eq!(op.state(), OperationState::Cancelled);
    assert_eq!(op.done(), 4);
    assert_eq!(op.total(), Some(10));
    assert!(op.errors().is_empty());
    assert!(op.done_time().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_after_failed_item_ends_as_failure() {
    let sources = files("src", 10);
    let (fs, gate) = FakeFileSystem::gated(3);
    let fs = fs.failing_on(&[sources[0].clone()]);
    let mut engine = fake_engine(fs);

    let id = engine
        .submit(OperationKind::Copy, sources.clone(), Some(PathBuf::from("/dst")))
        .unwrap();
    let gate = gate.wait_reached().await;
    assert!(engine.cancel(id));
    gate.release();

    let op = engine.wait_for(id).await.unwrap();
    assert_eq!(op.state(), OperationState::Failure);
    assert_eq!(op.done(), 3);
    assert_eq!(op.total(), Some(10));
    assert_eq!(op.errors().len(), 1);
    assert_eq!(op.errors()[0].path, sources[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_is_idempotent() {
    let (fs, gate) = FakeFileSystem::gated(1);
    let mut engine = fake_engine(fs);

    let id = engine
        .submit(OperationKind::Copy, files("src", 3), Some(PathBuf::from("/dst")))
        .unwrap();
    let gate = gate.wait_reached().await;
    assert!(engine.cancel(id));
    assert!(!engine.cancel(id));
    gate.release();

    let op = engine.wait_for(id).await.unwrap();
    assert_eq!(op.state(), OperationState::Cancelled);
    assert_eq!(op.done(), 1);

    // Terminal operations ignore further requests.
    assert!(!engine.cancel(id));
    assert_eq!(engine.get(id).unwrap().state(), OperationState::Cancelled);
}

#[tokio::test]
async fn test_move_into_own_subdirectory_is_rejected() {
    let mut engine = fake_engine(FakeFileSystem::default());
    let err = engine
        .submit(
            OperationKind::Move,
            vec![PathBuf::from("/data/photos")],
            Some(PathBuf::from("/data/photos/sorted")),
        )
        .unwrap_err();

    assert!(matches!(err, ValidationError::DestinationInsideSource { .. }));
    assert!(engine.is_empty());
}

#[tokio::test]
async fn test_delete_of_nothing_is_rejected() {
    let mut engine = fake_engine(FakeFileSystem::default());
    let err = engine
        .submit(OperationKind::Delete, Vec::new(), None)
        .unwrap_err();

    assert_eq!(err, ValidationError::EmptySources);
    assert!(engine.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_operations_do_not_mix() {
    let quick = files("quick", 3);
    let slow = files("slow", 5);
    let mut engine = fake_engine(FakeFileSystem::failing(&[slow[2].clone()]));

    let a = engine
        .submit(OperationKind::Copy, quick, Some(PathBuf::from("/dst-a")))
        .unwrap();
    let b = engine
        .submit(OperationKind::Move, slow, Some(PathBuf::from("/dst-b")))
        .unwrap();
    engine.wait_all().await;

    let first = engine.get(a).unwrap();
    assert_eq!(first.state(), OperationState::Successful);
    assert_eq!(first.done(), 3);
    assert!(first.errors().is_empty());

    let second = engine.get(b).unwrap();
    assert_eq!(second.state(), OperationState::Failure);
    assert_eq!(second.done(), 5);
    assert_eq!(second.errors().len(), 1);
    assert_eq!(second.errors()[0].path, PathBuf::from("/slow/file02.txt"));
}

#[tokio::test]
async fn test_invariants_hold_after_every_event() {
    let config = EngineConfig::builder()
        .progress_batch(1u64)
        .build()
        .unwrap();
    let sources = files("src", 6);
    let fs = FakeFileSystem::failing(&[sources[3].clone()]);
    let mut engine = Engine::with_file_system(Arc::new(fs), config);

    engine
        .submit(OperationKind::Copy, sources, Some(PathBuf::from("/dst")))
        .unwrap();
    engine
        .submit(OperationKind::Delete, files("old", 4), None)
        .unwrap();

    let mut last_done = std::collections::HashMap::new();
    while engine.has_active() {
        let event = engine.next_event().await.unwrap();
        assert!(engine.apply(event));

        for op in engine.snapshot() {
            if let Some(total) = op.total() {
                assert!(op.done() <= total);
            }
            let previous = last_done.insert(op.id(), op.done()).unwrap_or(0);
            assert!(op.done() >= previous);
            assert_eq!(op.done_time().is_some(), op.is_terminal());
            if op.state() == OperationState::Successful {
                assert_eq!(Some(op.done()), op.total());
                assert!(op.errors().is_empty());
            }
        }
    }

    let order = engine.snapshot();
    assert!(order.iter().all(|op| op.is_terminal()));
    for pair in order.windows(2) {
        assert!(pair[0].done_time() >= pair[1].done_time());
    }
}

#[tokio::test]
async fn test_progress_is_coalesced_and_finished_sent_once() {
    let config = EngineConfig::builder()
        .progress_batch(16u64)
        .progress_interval_ms(60_000u64)
        .build()
        .unwrap();
    let mut engine = Engine::with_file_system(Arc::new(FakeFileSystem::default()), config);
    let id = engine
        .submit(OperationKind::Copy, files("bulk", 100), Some(PathBuf::from("/dst")))
        .unwrap();

    let mut started = 0;
    let mut progress = Vec::new();
    let mut finished = Vec::new();
    while engine.has_active() {
        let event = engine.next_event().await.unwrap();
        assert_eq!(event.id(), id);
        match &event {
            OperationEvent::Started { total, .. } => {
                assert_eq!(*total, 100);
                started += 1;
            }
            OperationEvent::Progress { done, .. } => progress.push(*done),
            OperationEvent::Finished { state, done, .. } => finished.push((*state, *done)),
        }
        assert!(engine.apply(event));
    }

    // Nothing else is queued once the operation is terminal.
    assert_eq!(engine.drain(), 0);

    assert_eq!(started, 1);
    assert_eq!(progress, vec![16, 32, 48, 64, 80, 96]);
    assert_eq!(finished, vec![(OperationState::Successful, 100)]);
    assert!(progress.iter().all(|done| *done <= finished[0].1));

    let op = engine.get(id).unwrap();
    assert_eq!(Some(op.done()), op.total());
}

#[tokio::test]
async fn test_overlapping_sources_are_rejected_before_any_work() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    create_tree(root);
    let mut engine = Engine::new(EngineConfig::default());

    let err = engine
        .submit(
            OperationKind::Delete,
            vec![root.join("src"), root.join("src/docs")],
            None,
        )
        .unwrap_err();

    assert!(matches!(err, ValidationError::OverlappingSources { .. }));
    assert!(engine.is_empty());
    assert!(root.join("src/docs/a.txt").exists());
}

#[tokio::test]
async fn test_events_after_finish_are_discarded() {
    let mut engine = fake_engine(FakeFileSystem::default());
    let id = engine
        .submit(OperationKind::Trash, files("junk", 2), None)
        .unwrap();
    engine.wait_for(id).await.unwrap();

    let applied = engine.apply(OperationEvent::Progress {
        id,
        done: 1,
        current: None,
        errors: Vec::new(),
    });
    assert!(!applied);

    let op = engine.get(id).unwrap();
    assert_eq!(op.state(), OperationState::Successful);
    assert_eq!(op.done(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_worker_cap_queues_and_cancels_pending() {
    let (fs, gate) = FakeFileSystem::gated(1);
    let config = EngineConfig::builder()
        .max_workers(1usize)
        .build()
        .unwrap();
    let mut engine = Engine::with_file_system(Arc::new(fs), config);

    let running = engine
        .submit(OperationKind::Copy, files("a", 2), Some(PathBuf::from("/dst")))
        .unwrap();
    let gate = gate.wait_reached().await;
    let queued = engine
        .submit(OperationKind::Copy, files("b", 2), Some(PathBuf::from("/dst")))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.drain();
    assert_eq!(engine.get(queued).unwrap().state(), OperationState::Pending);

    assert!(engine.cancel(queued));
    let op = engine.wait_for(queued).await.unwrap();
    assert_eq!(op.state(), OperationState::Cancelled);
    assert_eq!(op.done(), 0);

    gate.release();
    let op = engine.wait_for(running).await.unwrap();
    assert_eq!(op.state(), OperationState::Successful);
}

#[tokio::test]
async fn test_clear_finished_keeps_ids_unique() {
    let mut engine = fake_engine(FakeFileSystem::default());
    let first = engine
        .submit(OperationKind::Delete, files("a", 1), None)
        .unwrap();
    engine.wait_all().await;
    assert_eq!(engine.clear_finished(), 1);
    assert!(engine.is_empty());

    let second = engine
        .submit(OperationKind::Delete, files("a", 1), None)
        .unwrap();
    assert_ne!(first, second);
}

fn create_tree(root: &Path) {
    fs::create_dir_all(root.join("src/docs/nested")).unwrap();
    fs::write(root.join("src/readme.md"), "readme").unwrap();
    fs::write(root.join("src/docs/a.txt"), "a").unwrap();
    fs::write(root.join("src/docs/nested/b.txt"), "b").unwrap();
}

#[tokio::test]
async fn test_copy_move_delete_on_disk() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    create_tree(root);
    let mut engine = Engine::new(EngineConfig::default());

    let copy = engine
        .submit(
            OperationKind::Copy,
            vec![root.join("src")],
            Some(root.join("backup")),
        )
        .unwrap();
    let op = engine.wait_for(copy).await.unwrap();
    assert_eq!(op.state(), OperationState::Successful);
    assert_eq!(op.total(), Some(6));
    assert_eq!(
        fs::read_to_string(root.join("backup/src/docs/nested/b.txt")).unwrap(),
        "b"
    );

    let moved = engine
        .submit(
            OperationKind::Move,
            vec![root.join("src/docs")],
            Some(root.join("archive")),
        )
        .unwrap();
    let op = engine.wait_for(moved).await.unwrap();
    assert_eq!(op.state(), OperationState::Successful);
    assert!(root.join("archive/docs/a.txt").exists());
    assert!(!root.join("src/docs").exists());

    let delete = engine
        .submit(OperationKind::Delete, vec![root.join("backup")], None)
        .unwrap();
    let op = engine.wait_for(delete).await.unwrap();
    assert_eq!(op.state(), OperationState::Successful);
    assert!(!root.join("backup").exists());
    assert!(root.join("src/readme.md").exists());
}

#[tokio::test]
async fn test_copy_conflicts_follow_policy() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    create_tree(root);
    fs::create_dir_all(root.join("out")).unwrap();
    fs::write(root.join("out/readme.md"), "old").unwrap();
    let source = vec![root.join("src/readme.md")];

    let mut engine = Engine::new(EngineConfig::default());
    let id = engine
        .submit(OperationKind::Copy, source.clone(), Some(root.join("out")))
        .unwrap();
    assert_eq!(
        engine.wait_for(id).await.unwrap().state(),
        OperationState::Successful
    );
    assert_eq!(fs::read_to_string(root.join("out/readme.md")).unwrap(), "old");
    assert_eq!(
        fs::read_to_string(root.join("out/readme (1).md")).unwrap(),
        "readme"
    );

    let config = EngineConfig::builder()
        .conflict_policy(ConflictPolicy::Skip)
        .build()
        .unwrap();
    let mut engine = Engine::new(config);
    let id = engine
        .submit(OperationKind::Copy, source.clone(), Some(root.join("out")))
        .unwrap();
    let op = engine.wait_for(id).await.unwrap();
    assert_eq!(op.state(), OperationState::Successful);
    assert_eq!(op.done(), 1);
    assert!(!root.join("out/readme (2).md").exists());

    let config = EngineConfig::builder()
        .conflict_policy(ConflictPolicy::Overwrite)
        .build()
        .unwrap();
    let mut engine = Engine::new(config);
    let id = engine
        .submit(OperationKind::Copy, source, Some(root.join("out")))
        .unwrap();
    engine.wait_for(id).await.unwrap();
    assert_eq!(
        fs::read_to_string(root.join("out/readme.md")).unwrap(),
        "readme"
    );
}

#[tokio::test]
async fn test_missing_source_fails_but_others_proceed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    create_tree(root);

    let mut engine = Engine::new(EngineConfig::default());
    let id = engine
        .submit(
            OperationKind::Copy,
            vec![root.join("missing.txt"), root.join("src/readme.md")],
            Some(root.join("out")),
        )
        .unwrap();
    let op = engine.wait_for(id).await.unwrap();

    assert_eq!(op.state(), OperationState::Failure);
    assert_eq!(op.errors().len(), 1);
    assert_eq!(op.errors()[0].path, root.join("missing.txt"));
    assert!(root.join("out/readme.md").exists());
}
