//! Engine integration tests over a temp-dir file store and an in-memory
//! record store.
//!
//! Run with: `cargo test -p mediagate-workflow --test engine_test`

mod helpers;

use helpers::{sample_attributes, setup};
use mediagate_core::RecordState;
use mediagate_db::RecordStore;
use mediagate_storage::FileStore;
use mediagate_workflow::{Outcome, PolicyViolation, Upload};

#[tokio::test]
async fn test_privileged_add_creates_stable_record() {
    let env = setup().await;

    let outcome = env.add("movie.mp4", b"original", &env.admin).await;
    assert_eq!(outcome, Outcome::Done);

    let record = env.record_at("movie.mp4").await;
    assert_eq!(record.state, RecordState::Stable);
    assert_eq!(record.added_by, env.admin.id);
    assert_eq!(record.attributes, sample_attributes());
    assert_eq!(env.content("movie.mp4").await, b"original");
    assert_eq!(env.engine.public_path(&record.path), "Videos/movie.mp4");
}

#[tokio::test]
async fn test_standard_add_waits_for_approval() {
    let env = setup().await;

    assert!(env.add("movie.mp4", b"original", &env.user).await.is_done());
    let record = env.record_at("movie.mp4").await;
    assert_eq!(record.state, RecordState::Adding);

    let outcome = env
        .engine
        .apply(record.id, &env.admin, &env.cancel)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Done);
    assert_eq!(env.record_at("movie.mp4").await.state, RecordState::Stable);
    assert_eq!(env.keys().await, vec!["movie.mp4"]);
}

#[tokio::test]
async fn test_rejected_add_removes_file_and_record() {
    let env = setup().await;
    env.add("movie.mp4", b"original", &env.user).await;
    let record = env.record_at("movie.mp4").await;

    let outcome = env
        .engine
        .reject(record.id, &env.admin, &env.cancel)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Done);
    assert!(env.records().await.is_empty());
    assert!(env.keys().await.is_empty());
}

#[tokio::test]
async fn test_standard_replace_then_apply_swaps_content() {
    let env = setup().await;
    env.add("movie.mp4", b"original", &env.admin).await;
    let original = env.record_at("movie.mp4").await;

    assert!(env.replace("movie.mp4", b"updated", &env.user).await.is_done());

    let replacement = env.record_at("replace.movie.mp4").await;
    let original_now = env.record_at("movie.mp4").await;
    assert_eq!(replacement.state, RecordState::Replacing);
    assert_eq!(
        original_now.state,
        RecordState::BeingReplaced {
            by: env.user.id,
            on: replacement.id
        }
    );
    assert_eq!(env.content("movie.mp4").await, b"original");
    assert_eq!(env.content("replace.movie.mp4").await, b"updated");

    // Approving from the original's side resolves the same pair
    let outcome = env
        .engine
        .apply(original.id, &env.admin, &env.cancel)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Done);

    let records = env.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, replacement.id);
    assert_eq!(records[0].path, "movie.mp4");
    assert_eq!(records[0].state, RecordState::Stable);
    assert_eq!(env.content("movie.mp4").await, b"updated");
    assert_eq!(env.keys().await, vec!["movie.mp4"]);
}

#[tokio::test]
async fn test_apply_from_replacement_side() {
    let env = setup().await;
    env.add("movie.mp4", b"original", &env.admin).await;
    env.replace("movie.mp4", b"updated", &env.user).await;
    let replacement = env.record_at("replace.movie.mp4").await;

    let outcome = env
        .engine
        .apply(replacement.id, &env.admin, &env.cancel)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Done);
    assert_eq!(env.record_at("movie.mp4").await.id, replacement.id);
    assert_eq!(env.content("movie.mp4").await, b"updated");
}

#[tokio::test]
async fn test_rejected_replace_keeps_original() {
    let env = setup().await;
    env.add("movie.mp4", b"original", &env.admin).await;
    let original = env.record_at("movie.mp4").await;
    env.replace("movie.mp4", b"updated", &env.user).await;
    let replacement = env.record_at("replace.movie.mp4").await;

    let outcome = env
        .engine
        .reject(replacement.id, &env.admin, &env.cancel)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Done);
    let records = env.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, original.id);
    assert_eq!(records[0].state, RecordState::Stable);
    assert_eq!(env.content("movie.mp4").await, b"original");
    assert_eq!(env.keys().await, vec!["movie.mp4"]);
}

#[tokio::test]
async fn test_privileged_replace_swaps_in_place_with_new_row() {
    let env = setup().await;
    env.add("movie.mp4", b"original", &env.admin).await;
    let original = env.record_at("movie.mp4").await;

    assert!(env.replace("movie.mp4", b"updated", &env.admin).await.is_done());

    let current = env.record_at("movie.mp4").await;
    assert_ne!(current.id, original.id);
    assert_eq!(current.state, RecordState::Stable);
    assert!(env.records.get(original.id).await.unwrap().is_none());
    assert_eq!(env.content("movie.mp4").await, b"updated");
    assert_eq!(env.keys().await, vec!["movie.mp4"]);
}

#[tokio::test]
async fn test_replace_without_record_adds() {
    let env = setup().await;

    assert!(env.replace("movie.mp4", b"fresh", &env.user).await.is_done());

    assert_eq!(env.record_at("movie.mp4").await.state, RecordState::Adding);
    assert_eq!(env.keys().await, vec!["movie.mp4"]);
}

#[tokio::test]
async fn test_delete_flows() {
    let env = setup().await;
    env.add("a.mp4", b"a", &env.admin).await;
    env.add("b.mp4", b"b", &env.admin).await;
    let a = env.record_at("a.mp4").await;
    let b = env.record_at("b.mp4").await;

    // Privileged delete is immediate
    let outcome = env.engine.delete(a.id, &env.admin, &env.cancel).await.unwrap();
    assert_eq!(outcome, Outcome::Done);
    assert!(env.records.get(a.id).await.unwrap().is_none());
    assert_eq!(env.keys().await, vec!["b.mp4"]);

    // Standard delete is a proposal
    env.engine.delete(b.id, &env.user, &env.cancel).await.unwrap();
    assert_eq!(
        env.record_at("b.mp4").await.state,
        RecordState::Deleting { by: env.user.id }
    );

    env.engine.reject(b.id, &env.admin, &env.cancel).await.unwrap();
    assert_eq!(env.record_at("b.mp4").await.state, RecordState::Stable);
    assert_eq!(env.keys().await, vec!["b.mp4"]);

    env.engine.delete(b.id, &env.user, &env.cancel).await.unwrap();
    env.engine.apply(b.id, &env.admin, &env.cancel).await.unwrap();
    assert!(env.records().await.is_empty());
    assert!(env.keys().await.is_empty());
}

#[tokio::test]
async fn test_upload_names_are_checked() {
    let env = setup().await;

    assert_eq!(
        env.add("backup.movie.mp4", b"x", &env.admin).await,
        Outcome::Refused(PolicyViolation::ReservedPrefix("backup."))
    );
    assert_eq!(
        env.replace("replace.movie.mp4", b"x", &env.admin).await,
        Outcome::Refused(PolicyViolation::ReservedPrefix("replace."))
    );
    assert_eq!(
        env.add("clips/", b"x", &env.admin).await,
        Outcome::Refused(PolicyViolation::InvalidName(String::new()))
    );
    assert!(env.keys().await.is_empty());
}

#[tokio::test]
async fn test_long_names_leave_room_for_transient_keys() {
    let env = setup().await;

    let too_long = format!("{}.mp4", "a".repeat(246));
    assert_eq!(
        env.add(&too_long, b"x", &env.admin).await,
        Outcome::Refused(PolicyViolation::InvalidName(too_long.clone()))
    );
    assert!(env.keys().await.is_empty());
    assert!(env.records().await.is_empty());

    // 240 bytes plus "backup.replace." is exactly 255
    let longest = format!("{}.mp4", "b".repeat(236));
    assert!(env.add(&longest, b"original", &env.admin).await.is_done());
    assert!(env.replace(&longest, b"updated", &env.user).await.is_done());

    let replacement = env.record_at(&format!("replace.{}", longest)).await;
    let outcome = env
        .engine
        .reject(replacement.id, &env.admin, &env.cancel)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Done);

    let original = env.record_at(&longest).await;
    let outcome = env
        .engine
        .delete(original.id, &env.admin, &env.cancel)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Done);
    assert!(env.keys().await.is_empty());
    assert!(env.records().await.is_empty());
}

#[tokio::test]
async fn test_add_refuses_occupied_path() {
    let env = setup().await;
    env.add("movie.mp4", b"original", &env.user).await;

    let outcome = env.add("movie.mp4", b"other", &env.admin).await;
    assert_eq!(
        outcome,
        Outcome::Refused(PolicyViolation::PathOccupied("movie.mp4".to_string()))
    );
    assert_eq!(env.content("movie.mp4").await, b"original");
    assert_eq!(env.records().await.len(), 1);
}

#[tokio::test]
async fn test_add_refuses_untracked_file() {
    let env = setup().await;
    let path = env.files.local_path("stray.mp4").unwrap();
    tokio::fs::write(&path, b"stray").await.unwrap();

    let outcome = env.add("stray.mp4", b"new", &env.admin).await;
    assert!(matches!(
        outcome,
        Outcome::Refused(PolicyViolation::PathOccupied(_))
    ));
    assert_eq!(env.content("stray.mp4").await, b"stray");
}

#[tokio::test]
async fn test_pending_records_refuse_replace_and_delete() {
    let env = setup().await;
    env.add("movie.mp4", b"original", &env.user).await;
    let pending = env.record_at("movie.mp4").await;

    assert_eq!(
        env.replace("movie.mp4", b"updated", &env.admin).await,
        Outcome::Refused(PolicyViolation::PendingChange("movie.mp4".to_string()))
    );
    assert_eq!(
        env.engine
            .delete(pending.id, &env.admin, &env.cancel)
            .await
            .unwrap(),
        Outcome::Refused(PolicyViolation::NotStable("movie.mp4".to_string()))
    );
    assert_eq!(env.keys().await, vec!["movie.mp4"]);
}

#[tokio::test]
async fn test_standard_identity_cannot_resolve() {
    let env = setup().await;
    env.add("movie.mp4", b"original", &env.user).await;
    let pending = env.record_at("movie.mp4").await;

    for outcome in [
        env.engine.apply(pending.id, &env.user, &env.cancel).await.unwrap(),
        env.engine.reject(pending.id, &env.user, &env.cancel).await.unwrap(),
    ] {
        assert_eq!(outcome, Outcome::Refused(PolicyViolation::NotPrivileged));
    }
    assert_eq!(env.record_at("movie.mp4").await.state, RecordState::Adding);
}

#[tokio::test]
async fn test_stale_target_is_reported_gone() {
    let env = setup().await;
    env.add("movie.mp4", b"original", &env.admin).await;
    let record = env.record_at("movie.mp4").await;

    env.engine.delete(record.id, &env.admin, &env.cancel).await.unwrap();

    for outcome in [
        env.engine.delete(record.id, &env.admin, &env.cancel).await.unwrap(),
        env.engine.apply(record.id, &env.admin, &env.cancel).await.unwrap(),
        env.engine.reject(record.id, &env.admin, &env.cancel).await.unwrap(),
    ] {
        assert_eq!(outcome, Outcome::Refused(PolicyViolation::RecordGone));
    }
}

#[tokio::test]
async fn test_resolving_stable_record_is_noop() {
    let env = setup().await;
    env.add("movie.mp4", b"original", &env.admin).await;
    let record = env.record_at("movie.mp4").await;
    let commits = env.records.commit_count();
    let mut notices = env.engine.subscribe();

    assert!(env.engine.apply(record.id, &env.admin, &env.cancel).await.unwrap().is_done());
    assert!(env.engine.reject(record.id, &env.admin, &env.cancel).await.unwrap().is_done());

    assert_eq!(env.records.commit_count(), commits);
    assert!(notices.try_recv().is_err());
    assert_eq!(env.record_at("movie.mp4").await, record);
}

#[tokio::test]
async fn test_upload_from_path_uses_file_name() {
    let env = setup().await;
    let source_dir = tempfile::tempdir().unwrap();
    let source = source_dir.path().join("clip.mkv");
    tokio::fs::write(&source, b"clip").await.unwrap();

    let upload = Upload::from_path(&source).await.unwrap();
    let outcome = env.engine.add(upload, &env.admin, &env.cancel).await.unwrap();

    assert_eq!(outcome, Outcome::Done);
    assert_eq!(env.content("clip.mkv").await, b"clip");
}

#[tokio::test]
async fn test_refusal_messages_name_the_file() {
    let env = setup().await;
    env.add("movie.mp4", b"original", &env.admin).await;

    let outcome = env.add("movie.mp4", b"again", &env.admin).await;
    let message = outcome.refusal().map(|v| v.to_string()).unwrap_or_default();
    assert_eq!(message, "A file named \"movie.mp4\" already exists");
}
