//! Read-only progress analytics
//!
//! Everything here is computed from completion history against an explicit
//! `today`, so results are reproducible for any as-of date.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate};
use common::models::CompletionRecord;
use common::Error;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::completions::start_of_day;
use crate::db_err;
use crate::ledger::ensure_user;

/// Monthly challenge target when the user hasn't set one
pub const DEFAULT_MONTHLY_TARGET: i32 = 20;
/// Days in the consistency and XP windows
const TRAILING_WINDOW_DAYS: i64 = 30;

/// A completion reduced to what analytics need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionPoint {
    pub date: NaiveDate,
    pub xp: i64,
}

impl From<&CompletionRecord> for CompletionPoint {
    fn from(record: &CompletionRecord) -> Self {
        Self {
            date: record.completed_at.date_naive(),
            xp: record.xp_earned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeeklyImprovement {
    pub percent: f64,
    pub this_week: i64,
    pub previous_week: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyChallenge {
    pub description: String,
    pub target: i32,
    pub completed: i64,
    pub days_left: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub as_of: NaiveDate,
    pub weekly_improvement: f64,
    pub completed_this_week: i64,
    pub completed_prev_week: i64,
    pub consistency: f64,
    pub xp_last_30_days: i64,
    pub current_streak: u32,
    pub monthly_challenge: MonthlyChallenge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityDay {
    pub label: String,
    pub date: NaiveDate,
    pub count: i64,
    /// Bar height from 20 to 100
    pub height: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramProgress {
    pub program_id: Uuid,
    pub total_days: i64,
    pub completed_days: i64,
    pub completed_day_numbers: Vec<i32>,
    pub completion_percentage: f64,
    pub xp_earned: i64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn count_between(points: &[CompletionPoint], from: NaiveDate, to: NaiveDate) -> i64 {
    points
        .iter()
        .filter(|p| p.date >= from && p.date <= to)
        .count() as i64
}

/// Completions in the last 7 days against the 7 days before
pub fn weekly_improvement(points: &[CompletionPoint], today: NaiveDate) -> WeeklyImprovement {
    let week_start = today - Duration::days(6);
    let prev_start = week_start - Duration::days(7);
    let prev_end = week_start - Duration::days(1);

    let this_week = count_between(points, week_start, today);
    let previous_week = count_between(points, prev_start, prev_end);

    let percent = if previous_week == 0 {
        if this_week > 0 {
            100.0
        } else {
            0.0
        }
    } else {
        round1((this_week - previous_week) as f64 / previous_week as f64 * 100.0)
    };

    WeeklyImprovement {
        percent,
        this_week,
        previous_week,
    }
}

/// Share of the last 30 days with at least one completion, in percent
pub fn consistency(points: &[CompletionPoint], today: NaiveDate) -> f64 {
    let start = today - Duration::days(TRAILING_WINDOW_DAYS - 1);
    let active: HashSet<NaiveDate> = points
        .iter()
        .filter(|p| p.date >= start && p.date <= today)
        .map(|p| p.date)
        .collect();
    round1(active.len() as f64 / TRAILING_WINDOW_DAYS as f64 * 100.0)
}

pub fn xp_last_30_days(points: &[CompletionPoint], today: NaiveDate) -> i64 {
    let start = today - Duration::days(TRAILING_WINDOW_DAYS - 1);
    points
        .iter()
        .filter(|p| p.date >= start && p.date <= today)
        .map(|p| p.xp)
        .sum()
}

pub fn first_of_month(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

pub fn last_of_month(today: NaiveDate) -> NaiveDate {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(today)
}

pub fn monthly_challenge(points: &[CompletionPoint], today: NaiveDate, target: i32) -> MonthlyChallenge {
    MonthlyChallenge {
        description: format!("Complete {} workouts this month", target),
        target,
        completed: count_between(points, first_of_month(today), today),
        days_left: (last_of_month(today) - today).num_days(),
    }
}

/// Consecutive days with a completion, ending today
pub fn current_streak(active_days: &[NaiveDate], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = active_days.iter().copied().collect();
    let mut streak = 0;
    let mut day = today;
    while days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

/// Per-day completion counts for the last 7 days, oldest first
pub fn weekly_activity(points: &[CompletionPoint], today: NaiveDate) -> Vec<ActivityDay> {
    let start = today - Duration::days(6);
    let mut counts: BTreeMap<NaiveDate, i64> = (0..7)
        .map(|offset| (start + Duration::days(offset), 0))
        .collect();
    for p in points {
        if let Some(count) = counts.get_mut(&p.date) {
            *count += 1;
        }
    }

    let max = counts.values().copied().max().unwrap_or(0);
    counts
        .into_iter()
        .map(|(date, count)| {
            let height = if max > 0 {
                20 + (count as f64 / max as f64 * 80.0) as i64
            } else {
                20
            };
            ActivityDay {
                label: date.format("%a").to_string().chars().take(1).collect(),
                date,
                count,
                height,
                is_active: count > 0,
            }
        })
        .collect()
}

pub fn summarize(
    points: &[CompletionPoint],
    active_days: &[NaiveDate],
    today: NaiveDate,
    monthly_target: i32,
) -> AnalyticsSummary {
    let weekly = weekly_improvement(points, today);
    AnalyticsSummary {
        as_of: today,
        weekly_improvement: weekly.percent,
        completed_this_week: weekly.this_week,
        completed_prev_week: weekly.previous_week,
        consistency: consistency(points, today),
        xp_last_30_days: xp_last_30_days(points, today),
        current_streak: current_streak(active_days, today),
        monthly_challenge: monthly_challenge(points, today, monthly_target),
    }
}

pub fn program_progress(
    program_id: Uuid,
    total_days: i64,
    completed_day_numbers: Vec<i32>,
    xp_earned: i64,
) -> ProgramProgress {
    let completed_days = completed_day_numbers.len() as i64;
    let completion_percentage = if total_days > 0 {
        round1(completed_days as f64 / total_days as f64 * 100.0)
    } else {
        0.0
    };
    ProgramProgress {
        program_id,
        total_days,
        completed_days,
        completed_day_numbers,
        completion_percentage,
        xp_earned,
    }
}

/// Analytics queries over the pool
#[derive(Clone)]
pub struct Analytics {
    pool: PgPool,
}

impl Analytics {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_points(&self, user_id: Uuid, since: NaiveDate) -> Result<Vec<CompletionPoint>, Error> {
        let records = db::completions::list_since(&self.pool, user_id, start_of_day(since))
            .await
            .map_err(db_err)?;
        Ok(records.iter().map(CompletionPoint::from).collect())
    }

    pub async fn summary(&self, user_id: Uuid, today: NaiveDate) -> Result<AnalyticsSummary, Error> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        ensure_user(&mut conn, user_id).await?;
        let target = db::ledgers::get(&mut *conn, user_id)
            .await
            .map_err(db_err)?
            .and_then(|l| l.monthly_challenge_target)
            .unwrap_or(DEFAULT_MONTHLY_TARGET);
        drop(conn);

        let since = (today - Duration::days(TRAILING_WINDOW_DAYS - 1)).min(first_of_month(today));
        let points = self.load_points(user_id, since).await?;
        let active_days = db::completions::list_active_days(&self.pool, user_id)
            .await
            .map_err(db_err)?;

        Ok(summarize(&points, &active_days, today, target))
    }

    pub async fn weekly_activity(&self, user_id: Uuid, today: NaiveDate) -> Result<Vec<ActivityDay>, Error> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        ensure_user(&mut conn, user_id).await?;
        drop(conn);

        let points = self.load_points(user_id, today - Duration::days(6)).await?;
        Ok(weekly_activity(&points, today))
    }

    pub async fn program_progress(&self, user_id: Uuid, program_id: Uuid) -> Result<ProgramProgress, Error> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        ensure_user(&mut conn, user_id).await?;
        db::programs::get_by_id(&mut *conn, program_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::NotFound(format!("Program {} not found", program_id)))?;

        let total_days = db::programs::count_days(&mut *conn, program_id)
            .await
            .map_err(db_err)?;
        let day_numbers = db::completions::completed_day_numbers(&mut *conn, user_id, program_id)
            .await
            .map_err(db_err)?;
        let xp_earned = db::completions::xp_for_program(&mut *conn, user_id, program_id)
            .await
            .map_err(db_err)?;

        Ok(program_progress(program_id, total_days, day_numbers, xp_earned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn points_on(days: &[NaiveDate]) -> Vec<CompletionPoint> {
        days.iter().map(|d| CompletionPoint { date: *d, xp: 30 }).collect()
    }

    fn days_back(today: NaiveDate, offsets: &[i64]) -> Vec<NaiveDate> {
        offsets.iter().map(|o| today - Duration::days(*o)).collect()
    }

    #[test]
    fn test_weekly_improvement_no_previous_week() {
        let today = date(2026, 6, 15);
        let w = weekly_improvement(&points_on(&days_back(today, &[0, 3])), today);
        assert_eq!(w.percent, 100.0);
        assert_eq!(w.this_week, 2);
        assert_eq!(weekly_improvement(&[], today).percent, 0.0);
    }

    #[test]
    fn test_weekly_improvement_ratio() {
        let today = date(2026, 6, 15);
        // 2 this week, 3 the week before
        let pts = points_on(&days_back(today, &[0, 6, 7, 10, 13]));
        let w = weekly_improvement(&pts, today);
        assert_eq!((w.this_week, w.previous_week), (2, 3));
        assert_eq!(w.percent, -33.3);
    }

    #[test]
    fn test_weekly_improvement_ignores_older() {
        let today = date(2026, 6, 15);
        let pts = points_on(&days_back(today, &[1, 14, 20]));
        let w = weekly_improvement(&pts, today);
        assert_eq!(w.previous_week, 0);
        assert_eq!(w.percent, 100.0);
    }

    #[test]
    fn test_consistency_counts_distinct_days() {
        let today = date(2026, 6, 15);
        // Three completions on two distinct days, one outside the window
        let pts = points_on(&days_back(today, &[0, 0, 29, 30]));
        assert_eq!(consistency(&pts, today), 6.7);
    }

    #[test]
    fn test_xp_last_30_days() {
        let today = date(2026, 6, 15);
        let pts = vec![
            CompletionPoint { date: today, xp: 60 },
            CompletionPoint { date: today - Duration::days(29), xp: 40 },
            CompletionPoint { date: today - Duration::days(30), xp: 1000 },
        ];
        assert_eq!(xp_last_30_days(&pts, today), 100);
    }

    #[test]
    fn test_monthly_challenge() {
        let today = date(2026, 6, 15);
        let pts = points_on(&[date(2026, 5, 31), date(2026, 6, 1), date(2026, 6, 15)]);
        let challenge = monthly_challenge(&pts, today, DEFAULT_MONTHLY_TARGET);
        assert_eq!(challenge.completed, 2);
        assert_eq!(challenge.days_left, 15);
        assert_eq!(challenge.target, 20);
        assert_eq!(challenge.description, "Complete 20 workouts this month");
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(last_of_month(date(2026, 12, 5)), date(2026, 12, 31));
        assert_eq!(last_of_month(date(2028, 2, 10)), date(2028, 2, 29));
        assert_eq!(first_of_month(date(2026, 2, 17)), date(2026, 2, 1));
        let last = date(2026, 1, 31);
        assert_eq!(monthly_challenge(&[], last, 5).days_left, 0);
    }

    #[test]
    fn test_streak_zero_without_today() {
        let today = date(2026, 6, 15);
        assert_eq!(current_streak(&days_back(today, &[1, 2, 3]), today), 0);
    }

    #[test]
    fn test_streak_stops_at_gap() {
        let today = date(2026, 6, 15);
        assert_eq!(current_streak(&days_back(today, &[0, 1, 2, 4, 5]), today), 3);
    }

    #[test]
    fn test_streak_covers_full_run() {
        let today = date(2026, 6, 15);
        let n = 10;
        let days: Vec<NaiveDate> = (0..=n).map(|o| today - Duration::days(o)).collect();
        assert!(current_streak(&days, today) >= (n + 1) as u32);
    }

    #[test]
    fn test_weekly_activity_shape() {
        let today = date(2026, 6, 15); // a Monday
        let pts = points_on(&days_back(today, &[0, 0, 2, 9]));
        let week = weekly_activity(&pts, today);

        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, today - Duration::days(6));
        assert_eq!(week[6].date, today);
        assert_eq!(week[6].label, "M");
        assert_eq!(week[6].count, 2);
        assert_eq!(week[6].height, 100);
        assert_eq!(week[4].count, 1);
        assert_eq!(week[4].height, 60);
        assert_eq!(week[0].height, 20);
        assert!(!week[0].is_active);
        assert!(week[4].is_active);
    }

    #[test]
    fn test_weekly_activity_empty_week() {
        let today = date(2026, 6, 15);
        let week = weekly_activity(&[], today);
        assert!(week.iter().all(|d| d.height == 20 && !d.is_active));
    }

    #[test]
    fn test_program_progress() {
        let id = Uuid::new_v4();
        let progress = program_progress(id, 3, vec![1, 3], 120);
        assert_eq!(progress.completed_days, 2);
        assert_eq!(progress.completion_percentage, 66.7);
        assert_eq!(program_progress(id, 0, vec![], 0).completion_percentage, 0.0);
    }

    #[test]
    fn test_summary_ignores_future_points() {
        let today = date(2026, 6, 15);
        let future = today + Duration::days(1);
        let pts = points_on(&[today, future]);
        let summary = summarize(&pts, &[today, future], today, 20);
        assert_eq!(summary.completed_this_week, 1);
        assert_eq!(summary.xp_last_30_days, 30);
        assert_eq!(summary.current_streak, 1);
        assert_eq!(summary.monthly_challenge.completed, 1);
    }
}
