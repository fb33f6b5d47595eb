use std::sync::Arc;

use replan_core::{
    CanonicalSchedule, Category, DayRecord, ProposedPatch, RejectionClass, Relativity, Resolution,
};
use replan_engine::{
    CommitError, EngineConfig, FixedClock, ProposalError, ProposeError, ResolvePhraseError,
    ScheduleEditor,
};
use replan_storage::{FileStorage, MemoryStorage, ScheduleStorage};
use time::macros::{date, datetime};
use time::Duration;

/// Seven days from Wednesday 2026-03-18; the Monday is already completed.
fn week_one() -> CanonicalSchedule {
    let labels = [
        ("Easy 40 min", Category::Active),
        ("Intervals 6 x 800m", Category::Active),
        ("Rest", Category::Rest),
        ("Tempo 30 min", Category::Active),
        ("Long run 90 min", Category::Active),
        ("Rest", Category::Rest),
        ("Strides", Category::Active),
    ];
    let days = labels
        .iter()
        .enumerate()
        .map(|(i, (label, category))| {
            let mut day = DayRecord::new(
                date!(2026 - 03 - 18) + Duration::days(i as i64),
                *label,
                *category,
            );
            day.completed = i == 5;
            day
        })
        .collect();
    CanonicalSchedule::new(date!(2026 - 03 - 18), days).unwrap()
}

async fn editor() -> ScheduleEditor<MemoryStorage, Arc<FixedClock>> {
    let storage = MemoryStorage::new();
    storage.initialize_schedule("plan", week_one()).await.unwrap();
    let clock = Arc::new(FixedClock::new(datetime!(2026-03-19 08:00 UTC)));
    ScheduleEditor::new(storage, clock, EngineConfig::default())
}

#[tokio::test]
async fn propose_then_commit_round_trip() {
    let editor = editor().await;
    let proposal = editor
        .propose(
            "plan",
            &[
                ProposedPatch::cancel_week_day(1, "Tue"),
                ProposedPatch::replace("2026-03-20", "Easy 30 min"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(proposal.patches.len(), 2);
    assert_eq!(proposal.schedule_version_at_creation, 0);

    let result = editor.commit(&proposal.id, 0).await.unwrap();
    assert_eq!(result.new_version, 1);
    let dates: Vec<_> = result.changes.iter().map(|c| c.date).collect();
    assert_eq!(dates, vec![date!(2026 - 03 - 20), date!(2026 - 03 - 24)]);

    let record = editor.schedule("plan").await.unwrap();
    assert_eq!(record.version(), 1);
    assert_eq!(record.schedule.len(), 7);
    assert_eq!(record.schedule.day(date!(2026 - 03 - 24)).unwrap().label, "Rest");
    assert_eq!(
        record.schedule.day(date!(2026 - 03 - 20)).unwrap().label,
        "Easy 30 min"
    );
}

#[tokio::test]
async fn rejected_set_does_not_disturb_prior_proposal() {
    let editor = editor().await;
    let prior = editor
        .propose("plan", &[ProposedPatch::cancel("2026-03-21")])
        .await
        .unwrap();

    let err = editor
        .propose(
            "plan",
            &[
                ProposedPatch::cancel("2026-03-22"),
                ProposedPatch::cancel("2026-04-30"),
            ],
        )
        .await
        .unwrap_err();
    match err {
        ProposeError::Rejected(report) => {
            assert!(report.has_class(RejectionClass::DateNotInSchedule));
            assert_eq!(report.failing_indices(), vec![1]);
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    let result = editor.commit(&prior.id, 0).await.unwrap();
    assert_eq!(result.new_version, 1);
    assert_eq!(result.changes[0].date, date!(2026 - 03 - 21));
}

#[tokio::test]
async fn completed_day_is_immutable() {
    let editor = editor().await;
    match editor
        .propose("plan", &[ProposedPatch::replace("2026-03-23", "Swim")])
        .await
    {
        Err(ProposeError::Rejected(report)) => {
            assert_eq!(report.classes(), vec![RejectionClass::ImmutableTargetRejection]);
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn stale_version_conflicts_and_leaves_schedule_unchanged() {
    let editor = editor().await;
    let first = editor
        .propose("plan", &[ProposedPatch::cancel("2026-03-19")])
        .await
        .unwrap();
    editor.commit(&first.id, 0).await.unwrap();

    let before = editor.schedule("plan").await.unwrap();
    let second = editor
        .propose("plan", &[ProposedPatch::cancel("2026-03-22")])
        .await
        .unwrap();
    match editor.commit(&second.id, 0).await {
        Err(CommitError::Conflict {
            submitted, current, ..
        }) => {
            assert_eq!(submitted, 0);
            assert_eq!(current, 1);
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
    let after = editor.schedule("plan").await.unwrap();
    assert_eq!(after.schedule, before.schedule);
    assert_eq!(after.version(), 1);
}

#[tokio::test]
async fn two_proposals_on_same_version_only_first_commits() {
    let editor = editor().await;
    let a = editor
        .propose("plan", &[ProposedPatch::replace("2026-03-19", "Hills")])
        .await
        .unwrap();
    let b = editor
        .propose("plan", &[ProposedPatch::replace("2026-03-19", "Fartlek")])
        .await
        .unwrap();

    editor.commit(&a.id, 0).await.unwrap();
    // Even with the fresh version, b was built against version 0.
    assert!(matches!(
        editor.commit(&b.id, 1).await,
        Err(CommitError::Conflict { .. })
    ));
    let record = editor.schedule("plan").await.unwrap();
    assert_eq!(record.schedule.day(date!(2026 - 03 - 19)).unwrap().label, "Hills");
}

#[tokio::test]
async fn expired_proposal_cannot_be_read_or_committed() {
    let editor = editor().await;
    let proposal = editor
        .propose("plan", &[ProposedPatch::cancel("2026-03-19")])
        .await
        .unwrap();
    editor.clock().advance(Duration::minutes(25));

    assert!(matches!(
        editor.proposal(&proposal.id).await,
        Err(ProposalError::Expired { .. })
    ));
    assert!(matches!(
        editor.commit(&proposal.id, 0).await,
        Err(CommitError::Expired { .. })
    ));
    assert_eq!(editor.schedule("plan").await.unwrap().version(), 0);
}

#[tokio::test]
async fn ttl_comes_from_config() {
    let storage = MemoryStorage::new();
    storage.initialize_schedule("plan", week_one()).await.unwrap();
    let clock = Arc::new(FixedClock::new(datetime!(2026-03-19 08:00 UTC)));
    let config = EngineConfig::from_toml_str("[proposals]\nttl_minutes = 5").unwrap();
    let editor = ScheduleEditor::new(storage, clock, config);

    let proposal = editor
        .propose("plan", &[ProposedPatch::cancel("2026-03-19")])
        .await
        .unwrap();
    assert_eq!(proposal.expires_at - proposal.created_at, Duration::minutes(5));
    editor.clock().advance(Duration::minutes(6));
    assert_eq!(editor.purge_expired().await.unwrap(), 1);
}

#[tokio::test]
async fn resolve_uses_clock_and_anchor() {
    let editor = editor().await;
    // Clock says Thursday 2026-03-19.
    let resolution = editor.resolve(Some("plan"), "next Tuesday").await.unwrap();
    let target = resolution.resolved().unwrap();
    assert_eq!(target.date, date!(2026 - 03 - 24));
    assert_eq!(target.relativity, Relativity::Future);
    assert_eq!(target.week, Some(1));

    let editor = editor.with_today(date!(2025 - 02 - 12));
    match editor.resolve(None, "Tuesday").await.unwrap() {
        Resolution::Ambiguous(a) => {
            let dates: Vec<_> = a.candidates.iter().map(|c| c.date).collect();
            assert_eq!(dates, vec![date!(2025 - 02 - 11), date!(2025 - 02 - 18)]);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[tokio::test]
async fn resolve_reports_errors_per_phrase() {
    let editor = editor().await;
    let results = editor
        .resolve_all(None, &["today", "someday", "tomorrow"])
        .await
        .unwrap();
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());

    assert!(matches!(
        editor.resolve(Some("missing"), "today").await,
        Err(ResolvePhraseError::Storage(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_commits_on_file_storage_exactly_one_wins() {
    let storage = FileStorage::temporary().unwrap();
    storage.initialize_schedule("plan", week_one()).await.unwrap();
    let clock = Arc::new(FixedClock::new(datetime!(2026-03-19 08:00 UTC)));
    let editor = Arc::new(ScheduleEditor::new(storage, clock, EngineConfig::default()));

    let mut ids = Vec::new();
    for i in 0..6 {
        let label = format!("Option {i}");
        let p = editor
            .propose("plan", &[ProposedPatch::replace("2026-03-19", &label)])
            .await
            .unwrap();
        ids.push(p.id);
    }

    let mut handles = Vec::new();
    for id in ids {
        let editor = editor.clone();
        handles.push(tokio::spawn(async move { editor.commit(&id, 0).await }));
    }

    let mut committed = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(CommitError::Conflict { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(committed, 1);
    assert_eq!(conflicts, 5);
    assert_eq!(editor.schedule("plan").await.unwrap().version(), 1);
}
