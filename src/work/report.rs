//! Read-side aggregation of closed work sessions into nested
//! year / month / day rollups. Pure transforms: input is never mutated and
//! nothing here is persisted.
//!
//! Totals accumulate in full `f64` precision through the fold and are
//! rounded to two decimals only at the output boundary, so rounding error
//! never compounds across buckets.

use std::collections::BTreeMap;

use serde::Serialize;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::work::repo::SessionRow;

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayReport {
    pub date: String,
    pub total_hours: f64,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthReport {
    pub year: i32,
    pub month: u8,
    pub month_key: String,
    pub total_hours: f64,
    pub days_worked: usize,
    pub daily_hours: Vec<DayReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearReport {
    pub year: i32,
    pub months: Vec<MonthReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportUser {
    pub id: Uuid,
    pub name: String,
    pub lastname: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserReport {
    pub user: ReportUser,
    pub total_hours: f64,
    pub yearly_data: Vec<YearReport>,
}

/// Two-decimal rounding, applied only at the presentation boundary.
pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

pub fn elapsed_hours(start: OffsetDateTime, end: OffsetDateTime) -> f64 {
    (end - start).as_seconds_f64() / 3600.0
}

#[derive(Default)]
struct DayAcc {
    total: f64,
    sessions: Vec<SessionSummary>,
}

#[derive(Default)]
struct MonthAcc {
    total: f64,
    days: BTreeMap<Date, DayAcc>,
}

type YearMap = BTreeMap<i32, BTreeMap<u8, MonthAcc>>;

fn fold<'a>(sessions: impl Iterator<Item = &'a SessionRow>) -> YearMap {
    let mut years = YearMap::new();
    for s in sessions {
        let month = years
            .entry(s.date.year())
            .or_default()
            .entry(u8::from(s.date.month()))
            .or_default();
        let day = month.days.entry(s.date).or_default();
        day.total += s.total_hours;
        day.sessions.push(SessionSummary {
            id: s.id,
            start_time: s.start_time,
            end_time: s.end_time,
            hours: round_hours(s.total_hours),
        });
        month.total += s.total_hours;
    }
    years
}

/// Years, months and days all come out descending; BTreeMap iteration is
/// ascending, so each level is reversed.
fn materialize(years: YearMap) -> Vec<YearReport> {
    years
        .into_iter()
        .rev()
        .map(|(year, months)| YearReport {
            year,
            months: months
                .into_iter()
                .rev()
                .map(|(month, acc)| MonthReport {
                    year,
                    month,
                    month_key: format!("{year:04}-{month:02}"),
                    total_hours: round_hours(acc.total),
                    days_worked: acc.days.len(),
                    daily_hours: acc
                        .days
                        .into_iter()
                        .rev()
                        .map(|(date, day)| DayReport {
                            date: date.to_string(),
                            total_hours: round_hours(day.total),
                            sessions: day.sessions,
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

/// Single-user rollup: year -> month -> day, all descending.
pub fn build_yearly(sessions: &[SessionRow]) -> Vec<YearReport> {
    materialize(fold(sessions.iter()))
}

/// Multi-user rollup with a per-user grand total. Users come out ascending
/// by lastname then name, case-insensitive; inner buckets match
/// [`build_yearly`].
pub fn build_team(sessions: &[SessionRow]) -> Vec<UserReport> {
    let mut by_user: BTreeMap<Uuid, (ReportUser, f64, Vec<&SessionRow>)> = BTreeMap::new();
    for s in sessions {
        let entry = by_user.entry(s.user_id).or_insert_with(|| {
            (
                ReportUser {
                    id: s.user_id,
                    name: s.name.clone(),
                    lastname: s.lastname.clone(),
                    email: s.email.clone(),
                },
                0.0,
                Vec::new(),
            )
        });
        entry.1 += s.total_hours;
        entry.2.push(s);
    }

    let mut reports: Vec<UserReport> = by_user
        .into_values()
        .map(|(user, total, rows)| UserReport {
            total_hours: round_hours(total),
            yearly_data: materialize(fold(rows.into_iter())),
            user,
        })
        .collect();

    reports.sort_by(|a, b| {
        let left = (a.user.lastname.to_lowercase(), a.user.name.to_lowercase());
        let right = (b.user.lastname.to_lowercase(), b.user.name.to_lowercase());
        left.cmp(&right)
    });
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn session(
        user: (Uuid, &str, &str),
        start: OffsetDateTime,
        hours: f64,
    ) -> SessionRow {
        SessionRow {
            id: Uuid::new_v4(),
            user_id: user.0,
            start_time: start,
            end_time: Some(start + time::Duration::seconds_f64(hours * 3600.0)),
            date: start.date(),
            total_hours: hours,
            name: user.1.to_string(),
            lastname: user.2.to_string(),
            email: format!("{}@x.com", user.1.to_lowercase()),
        }
    }

    #[test]
    fn ninety_minutes_rounds_to_one_point_five() {
        let start = datetime!(2024-03-05 09:00 UTC);
        let end = start + time::Duration::milliseconds(5_400_000);
        assert_eq!(round_hours(elapsed_hours(start, end)), 1.50);
    }

    #[test]
    fn empty_input_yields_empty_report() {
        assert!(build_yearly(&[]).is_empty());
        assert!(build_team(&[]).is_empty());
    }

    #[test]
    fn buckets_are_ordered_descending() {
        let alice = (Uuid::new_v4(), "Alice", "Smith");
        let sessions = vec![
            session(alice, datetime!(2023-12-31 08:00 UTC), 2.0),
            session(alice, datetime!(2024-01-02 08:00 UTC), 3.0),
            session(alice, datetime!(2024-01-15 08:00 UTC), 4.0),
            session(alice, datetime!(2024-11-05 08:00 UTC), 1.0),
        ];

        let report = build_yearly(&sessions);
        let years: Vec<i32> = report.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2024, 2023]);

        let months_2024: Vec<u8> = report[0].months.iter().map(|m| m.month).collect();
        assert_eq!(months_2024, vec![11, 1]);
        assert_eq!(report[0].months[0].month_key, "2024-11");
        assert_eq!(report[0].months[1].month_key, "2024-01");

        let january = &report[0].months[1];
        let days: Vec<&str> = january.daily_hours.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(days, vec!["2024-01-15", "2024-01-02"]);
        assert_eq!(january.days_worked, 2);
        assert_eq!(january.total_hours, 7.0);
    }

    #[test]
    fn sessions_within_a_day_keep_newest_first_order() {
        let alice = (Uuid::new_v4(), "Alice", "Smith");
        // list_closed returns newest first; the fold must not reorder.
        let late = session(alice, datetime!(2024-05-01 14:00 UTC), 2.0);
        let early = session(alice, datetime!(2024-05-01 08:00 UTC), 3.0);
        let sessions = vec![late.clone(), early];

        let report = build_yearly(&sessions);
        let day = &report[0].months[0].daily_hours[0];
        assert_eq!(day.sessions.len(), 2);
        assert_eq!(day.sessions[0].id, late.id);
        assert_eq!(day.total_hours, 5.0);
    }

    #[test]
    fn day_totals_round_at_the_boundary_not_per_session() {
        let alice = (Uuid::new_v4(), "Alice", "Smith");
        let sessions = vec![
            session(alice, datetime!(2024-05-01 08:00 UTC), 1.004),
            session(alice, datetime!(2024-05-01 12:00 UTC), 1.004),
        ];

        let report = build_yearly(&sessions);
        let day = &report[0].months[0].daily_hours[0];
        // Summing rounded per-session values would give 2.00.
        assert_eq!(day.total_hours, 2.01);
        assert_eq!(day.sessions[0].hours, 1.0);
    }

    #[test]
    fn rollups_are_internally_consistent() {
        let alice = (Uuid::new_v4(), "Alice", "Smith");
        let sessions = vec![
            session(alice, datetime!(2024-01-02 08:00 UTC), 1.333_333),
            session(alice, datetime!(2024-01-02 13:00 UTC), 2.666_667),
            session(alice, datetime!(2024-01-10 08:00 UTC), 0.123_456),
            session(alice, datetime!(2024-02-03 08:00 UTC), 7.891_011),
        ];

        let report = build_yearly(&sessions);
        for year in &report {
            for month in &year.months {
                let day_sum: f64 = month.daily_hours.iter().map(|d| d.total_hours).sum();
                assert!(
                    (day_sum - month.total_hours).abs() <= 0.01,
                    "month {} day sum {day_sum} vs total {}",
                    month.month_key,
                    month.total_hours
                );
            }
        }

        let team = build_team(&sessions);
        assert_eq!(team.len(), 1);
        let month_sum: f64 = team[0]
            .yearly_data
            .iter()
            .flat_map(|y| y.months.iter())
            .map(|m| m.total_hours)
            .sum();
        assert!((month_sum - team[0].total_hours).abs() <= 0.01);
    }

    #[test]
    fn team_report_orders_users_by_lastname_then_name_case_insensitive() {
        let zed = (Uuid::new_v4(), "zed", "adams");
        let ann = (Uuid::new_v4(), "Ann", "Brown");
        let bob = (Uuid::new_v4(), "Bob", "ADAMS");
        let sessions = vec![
            session(ann, datetime!(2024-03-01 08:00 UTC), 1.0),
            session(zed, datetime!(2024-03-01 08:00 UTC), 2.0),
            session(bob, datetime!(2024-03-01 08:00 UTC), 3.0),
        ];

        let team = build_team(&sessions);
        let order: Vec<&str> = team.iter().map(|u| u.user.name.as_str()).collect();
        assert_eq!(order, vec!["Bob", "zed", "Ann"]);
    }

    #[test]
    fn team_report_totals_per_user() {
        let alice = (Uuid::new_v4(), "Alice", "Smith");
        let bob = (Uuid::new_v4(), "Bob", "Jones");
        let sessions = vec![
            session(alice, datetime!(2023-06-01 08:00 UTC), 4.0),
            session(alice, datetime!(2024-06-01 08:00 UTC), 2.5),
            session(bob, datetime!(2024-06-01 08:00 UTC), 8.0),
        ];

        let team = build_team(&sessions);
        assert_eq!(team.len(), 2);
        let alice_report = team.iter().find(|u| u.user.name == "Alice").unwrap();
        assert_eq!(alice_report.total_hours, 6.5);
        let years: Vec<i32> = alice_report.yearly_data.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2024, 2023]);
    }
}
