use sqlx::PgPool;

use super::fixtures::{program, setup, unit, user};
use crate::{CompletionRecorder, Ledger};

#[sqlx::test(migrations = false)]
async fn test_second_completion_awards_nothing(pool: PgPool) {
    setup(&pool).await;
    let member = user(&pool, "member").await;
    let p = program(&pool, "easy").await;
    let u = unit(&pool, p, 1, 30).await;
    let recorder = CompletionRecorder::new(pool.clone());

    let first = recorder.record_completion(member, u).await.unwrap();
    assert!(!first.already_completed);
    assert_eq!(first.xp_awarded, 30);
    assert_eq!(first.total_xp, 30);

    let second = recorder.record_completion(member, u).await.unwrap();
    assert!(second.already_completed);
    assert_eq!(second.xp_awarded, 0);
    assert_eq!(second.total_xp, 30);
    assert_eq!(second.record.id, first.record.id);
}

#[sqlx::test(migrations = false)]
async fn test_concurrent_duplicate_completion_pays_once(pool: PgPool) {
    setup(&pool).await;
    let member = user(&pool, "member").await;
    let p = program(&pool, "medium").await;
    let u = unit(&pool, p, 1, 30).await;
    let recorder = CompletionRecorder::new(pool.clone());

    let (a, b) = tokio::join!(
        recorder.record_completion(member, u),
        recorder.record_completion(member, u)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.xp_awarded + b.xp_awarded, 60);
    assert!(a.already_completed != b.already_completed);
    assert_eq!(Ledger::new(pool).level(member).await.unwrap().xp, 60);
}

#[sqlx::test(migrations = false)]
async fn test_complete_day_folds_units_into_one_gain(pool: PgPool) {
    setup(&pool).await;
    let member = user(&pool, "member").await;
    let p = program(&pool, "medium").await;
    let first = unit(&pool, p, 1, 30).await;
    unit(&pool, p, 1, 20).await;
    unit(&pool, p, 2, 45).await;
    let recorder = CompletionRecorder::new(pool.clone());

    let day = recorder.complete_day(member, first).await.unwrap();
    assert_eq!(day.units_completed, 2);
    assert_eq!(day.xp_awarded, 100);
    assert_eq!(day.total_xp, 100);
    assert!(!day.program_completed);
    assert!(day.assignment_status.is_none());

    let again = recorder.complete_day(member, first).await.unwrap();
    assert!(again.already_completed);
    assert_eq!(again.xp_awarded, 0);
    assert_eq!(again.total_xp, 100);
}

#[sqlx::test(migrations = false)]
async fn test_complete_day_skips_units_already_done(pool: PgPool) {
    setup(&pool).await;
    let member = user(&pool, "member").await;
    let p = program(&pool, "easy").await;
    let done = unit(&pool, p, 1, 30).await;
    unit(&pool, p, 1, 15).await;
    let recorder = CompletionRecorder::new(pool.clone());

    recorder.record_completion(member, done).await.unwrap();
    let day = recorder.complete_day(member, done).await.unwrap();
    assert_eq!(day.units_completed, 1);
    assert_eq!(day.xp_awarded, 15);
    assert_eq!(day.total_xp, 45);
    assert!(day.program_completed);
}

#[sqlx::test(migrations = false)]
async fn test_crossing_silver_levels_up(pool: PgPool) {
    setup(&pool).await;
    let member = user(&pool, "member").await;
    let ledger = Ledger::new(pool.clone());

    let below = ledger.add_xp(member, 999).await.unwrap();
    assert!(!below.leveled_up);
    assert_eq!(below.ledger.level_name, "Bronze");

    let crossed = ledger.add_xp(member, 1).await.unwrap();
    assert!(crossed.leveled_up);
    assert_eq!((crossed.previous_rank, crossed.new_rank), (1, 2));

    let noop = ledger.add_xp(member, 0).await.unwrap();
    assert!(!noop.leveled_up);
    assert_eq!(noop.ledger.xp, 1000);

    let view = ledger.level(member).await.unwrap();
    assert_eq!(view.level_name, "Silver");
    assert_eq!(view.xp_to_next, Some(4000));
}

#[sqlx::test(migrations = false)]
async fn test_unknown_user_is_not_found(pool: PgPool) {
    setup(&pool).await;
    let p = program(&pool, "easy").await;
    let u = unit(&pool, p, 1, 30).await;

    let err = CompletionRecorder::new(pool)
        .record_completion(uuid::Uuid::new_v4(), u)
        .await
        .unwrap_err();
    assert!(matches!(err, common::Error::NotFound(_)));
}

#[sqlx::test(migrations = false)]
async fn test_analytics_reflect_todays_completions(pool: PgPool) {
    setup(&pool).await;
    let member = user(&pool, "member").await;
    let p = program(&pool, "easy").await;
    let day1 = unit(&pool, p, 1, 30).await;
    unit(&pool, p, 2, 30).await;
    unit(&pool, p, 3, 30).await;
    CompletionRecorder::new(pool.clone())
        .complete_day(member, day1)
        .await
        .unwrap();

    let analytics = crate::Analytics::new(pool);
    let today = chrono::Utc::now().date_naive();

    let summary = analytics.summary(member, today).await.unwrap();
    assert_eq!(summary.completed_this_week, 1);
    assert_eq!(summary.current_streak, 1);
    assert_eq!(summary.xp_last_30_days, 30);
    assert_eq!(summary.monthly_challenge.target, 20);

    let progress = analytics.program_progress(member, p).await.unwrap();
    assert_eq!(progress.total_days, 3);
    assert_eq!(progress.completed_day_numbers, vec![1]);
    assert_eq!(progress.completion_percentage, 33.3);
    assert_eq!(progress.xp_earned, 30);

    let week = analytics.weekly_activity(member, today).await.unwrap();
    assert_eq!(week[6].count, 1);
    assert_eq!(week[6].height, 100);
}
