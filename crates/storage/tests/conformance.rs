use replan_storage::conformance::run_conformance_suite;
use replan_storage::{FileStorage, MemoryStorage};

#[tokio::test]
async fn memory_storage_conformance() {
    let report = run_conformance_suite(|| async { MemoryStorage::new() }).await;
    assert!(report.total > 0);
    assert!(report.failed == 0, "{report}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_storage_conformance() {
    let report = run_conformance_suite(|| async {
        FileStorage::temporary().expect("create temporary file storage")
    })
    .await;
    assert!(report.failed == 0, "{report}");
}

#[tokio::test]
async fn file_storage_survives_reopen() {
    use replan_core::{CanonicalSchedule, Category, DayRecord};
    use replan_storage::ScheduleStorage;
    use time::macros::date;

    let dir = tempfile::tempdir().unwrap();
    let schedule = CanonicalSchedule::new(
        date!(2026 - 03 - 16),
        vec![DayRecord::new(date!(2026 - 03 - 16), "Easy run", Category::Active)],
    )
    .unwrap();
    {
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.initialize_schedule("plan-a", schedule.clone()).await.unwrap();
    }
    let storage = FileStorage::open(dir.path()).unwrap();
    let record = storage.get_schedule("plan-a").await.unwrap();
    assert_eq!(record.schedule, schedule);
    assert_eq!(storage.list_schedules().await.unwrap(), vec!["plan-a".to_string()]);
}

fn plan_at(version: u64) -> replan_core::CanonicalSchedule {
    use replan_core::{CanonicalSchedule, Category, DayRecord};
    use time::macros::date;

    let label = format!("Easy run v{version}");
    CanonicalSchedule::from_parts(
        date!(2026 - 03 - 16),
        version,
        vec![DayRecord::new(date!(2026 - 03 - 16), label, Category::Active)],
    )
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_storage_swap_is_exclusive_across_handles() {
    use replan_storage::{ScheduleStorage, StorageError};

    const ROUNDS: u64 = 25;
    const WRITERS: usize = 8;

    let dir = tempfile::tempdir().unwrap();
    FileStorage::open(dir.path())
        .unwrap()
        .initialize_schedule("plan", plan_at(0))
        .await
        .unwrap();

    for round in 0..ROUNDS {
        let mut handles = Vec::new();
        for _ in 0..WRITERS {
            let root = dir.path().to_path_buf();
            handles.push(tokio::spawn(async move {
                let storage = FileStorage::open(root).unwrap();
                storage.swap_schedule("plan", round, plan_at(round + 1)).await
            }));
        }
        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(v) => {
                    assert_eq!(v, round + 1);
                    winners += 1;
                }
                Err(StorageError::ConcurrentConflict { .. }) => {}
                Err(e) => panic!("unexpected error in round {round}: {e}"),
            }
        }
        assert_eq!(winners, 1, "round {round} had {winners} winners");
    }

    let record = FileStorage::open(dir.path())
        .unwrap()
        .get_schedule("plan")
        .await
        .unwrap();
    assert_eq!(record.version(), ROUNDS);
    assert_eq!(record.schedule, plan_at(ROUNDS));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_storage_initialize_is_exclusive_across_handles() {
    use replan_storage::{ScheduleStorage, StorageError};

    let dir = tempfile::tempdir().unwrap();
    let mut handles = Vec::new();
    for i in 0..8u64 {
        let root = dir.path().to_path_buf();
        handles.push(tokio::spawn(async move {
            let storage = FileStorage::open(root).unwrap();
            storage.initialize_schedule("plan", plan_at(i)).await
        }));
    }

    let mut winner = None;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(record) => {
                assert!(winner.is_none(), "two initializations succeeded");
                winner = Some(record);
            }
            Err(StorageError::AlreadyInitialized { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    let winner = winner.expect("one initialization succeeds");
    let storage = FileStorage::open(dir.path()).unwrap();
    assert_eq!(storage.get_schedule("plan").await.unwrap().schedule, winner.schedule);
    assert_eq!(storage.list_schedules().await.unwrap(), vec!["plan".to_string()]);
}
