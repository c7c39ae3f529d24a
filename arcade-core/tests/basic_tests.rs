mod common;

use arcade_core::{GameSession, ScoreStore};
use arcade_types::{GameKind, ScoreKind, ScoreRecord};
use common::*;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_start_resets_score_and_level() {
    let (mut session, _) = create_test_session(GameKind::SpeedPickle);
    session.start_game();
    session.update_score(450);
    session.set_level(4);

    session.start_game();
    let state = session.state();
    assert!(state.is_playing);
    assert_eq!(state.score, 0);
    assert_eq!(state.level, 1);
    assert_eq!(state.best_score, 450);
}

#[test]
fn test_best_score_tracks_highest_update() {
    let (mut session, _) = create_test_session(GameKind::PicklePop);
    session.start_game();
    for score in [100, 700, 300, 650] {
        session.update_score(score);
        assert!(session.state().best_score >= session.state().score);
    }
    assert_eq!(session.state().score, 650);
    assert_eq!(session.state().best_score, 700);
}

#[test]
fn test_level_is_never_zero() {
    let (mut session, _) = create_test_session(GameKind::SequenceMemory);
    session.set_level(0);
    assert_eq!(session.state().level, 1);
}

#[tokio::test]
async fn test_first_save_is_new_best() {
    let (mut session, store) = create_test_session(GameKind::SpeedPickle);
    assert!(play_to_score(&mut session, 500).await);

    let best = store
        .best_for(TEST_USER, GameKind::SpeedPickle)
        .await
        .unwrap()
        .expect("best record written");
    assert_eq!(best.score, 500);
    assert_eq!(best.kind, ScoreKind::Best);
}

#[tokio::test]
async fn test_lower_score_keeps_best() {
    let (mut session, store) = create_test_session(GameKind::SpeedPickle);
    assert!(play_to_score(&mut session, 500).await);
    tokio::time::sleep(Duration::from_millis(2)).await;
    assert!(!play_to_score(&mut session, 300).await);

    let best = store
        .best_for(TEST_USER, GameKind::SpeedPickle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(best.score, 500);

    // two history records plus the single best record
    let all = store.scores_for_user(TEST_USER).await.unwrap();
    let history = all.iter().filter(|r| r.kind == ScoreKind::History).count();
    assert_eq!(history, 2);
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_equal_score_is_not_new_best() {
    let (mut session, _) = create_test_session(GameKind::WordScramble);
    assert!(play_to_score(&mut session, 140).await);
    tokio::time::sleep(Duration::from_millis(2)).await;
    assert!(!play_to_score(&mut session, 140).await);
}

#[tokio::test]
async fn test_new_best_detected_even_though_display_best_rose() {
    // update_score raises best_score before the save; the new-best check
    // must compare against the stored best instead
    let (mut session, _) = create_test_session(GameKind::PickleMatch);
    session.start_game();
    session.update_score(800);
    assert_eq!(session.state().best_score, 800);
    let outcome = session.end_game().await;
    assert!(outcome.is_new_best);
    assert_eq!(outcome.score, 800);
    assert!(!session.state().is_playing);
}

#[tokio::test]
async fn test_anonymous_session_never_persists() {
    let (mut session, store) = create_anonymous_session(GameKind::ReactionTime);
    assert!(!play_to_score(&mut session, 1000).await);
    assert!(!session.save_score(1000).await);
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn test_store_failure_is_swallowed() {
    let mut session = GameSession::new(
        GameKind::SequenceMemory,
        Some(TEST_USER.to_string()),
        Arc::new(FailingScoreStore),
    );
    session.load_best().await;
    assert_eq!(session.state().best_score, 0);

    let outcome = {
        session.start_game();
        session.update_score(300);
        session.end_game().await
    };
    assert!(!outcome.is_new_best);
    assert_eq!(outcome.score, 300);
}

#[tokio::test]
async fn test_failed_best_load_keeps_higher_stored_best() {
    let store = Arc::new(FlakyBestStore::new(1));
    store
        .save(ScoreRecord::best(TEST_USER, GameKind::PicklePop, 900, 1_000))
        .await
        .unwrap();

    let mut session = GameSession::new(
        GameKind::PicklePop,
        Some(TEST_USER.to_string()),
        store.clone(),
    );
    session.load_best().await;
    assert!(!play_to_score(&mut session, 50).await);

    let best = store
        .best_for(TEST_USER, GameKind::PicklePop)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(best.score, 900);
}

#[tokio::test]
async fn test_unreadable_best_skips_best_write() {
    // both the load and the re-read at save time fail
    let store = Arc::new(FlakyBestStore::new(2));
    let mut session = GameSession::new(
        GameKind::SpeedPickle,
        Some(TEST_USER.to_string()),
        store.clone(),
    );
    session.load_best().await;
    assert!(!play_to_score(&mut session, 700).await);

    let all = store.scores_for_user(TEST_USER).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].kind, ScoreKind::History);
}

#[tokio::test]
async fn test_load_best_seeds_from_store() {
    let (mut first, store) = create_test_session(GameKind::PicklePop);
    play_to_score(&mut first, 420).await;

    let mut second = GameSession::new(GameKind::PicklePop, Some(TEST_USER.to_string()), store);
    second.load_best().await;
    assert_eq!(second.state().best_score, 420);
    assert!(!play_to_score(&mut second, 400).await);
    assert!(play_to_score(&mut second, 421).await);
}

#[tokio::test]
async fn test_reset_keeps_best_without_saving() {
    let (mut session, store) = create_test_session(GameKind::SpeedPickle);
    session.start_game();
    session.update_score(250);
    session.set_level(3);
    session.reset_game();

    let state = session.state();
    assert!(!state.is_playing);
    assert_eq!(state.score, 0);
    assert_eq!(state.level, 1);
    assert_eq!(state.best_score, 250);
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn test_pending_save_can_be_spawned() {
    let (mut session, store) = create_test_session(GameKind::WordScramble);
    session.start_game();
    session.update_score(90);
    let pending = session.finish().expect("signed-in session");
    assert_eq!(pending.score(), 90);

    let outcome = tokio::spawn(pending.persist()).await.unwrap();
    assert!(outcome.is_new_best);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_session_events() {
    let (mut session, _) = create_test_session(GameKind::SequenceMemory);
    let collector = EventCollector::new();
    session.add_event_handler(Box::new(collector.clone()));

    session.start_game();
    session.set_level(2);
    session.set_level(2);
    session.update_score(300);
    session.end_game().await;

    assert_eq!(collector.event_count(), 3);
    assert!(collector.has_event_type(|e| matches!(
        e,
        arcade_core::SessionEvent::LevelChanged { level: 2, .. }
    )));
    assert!(matches!(
        collector.last_event(),
        Some(arcade_core::SessionEvent::GameEnded { score: 300, .. })
    ));
    assert_eq!(collector.get_events()[0].game(), GameKind::SequenceMemory);
}
