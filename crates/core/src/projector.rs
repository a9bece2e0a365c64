//! Pure projections of a task snapshot into the list, calendar, timeline, and
//! summary views. Nothing here mutates its input or touches the store.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::model::{Priority, Task, TaskStatus};

const MUTED_BACKGROUND: &str = "#F3F3F3";
const MUTED_FOREGROUND: &str = "#B0B0B0";

/// Deterministic styling for a calendar block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventStyle {
    pub background: &'static str,
    pub foreground: &'static str,
    pub muted: bool,
}

impl EventStyle {
    pub fn for_task(priority: Priority, status: TaskStatus) -> Self {
        if status == TaskStatus::Completed {
            return Self {
                background: MUTED_BACKGROUND,
                foreground: MUTED_FOREGROUND,
                muted: true,
            };
        }

        let background = match priority {
            Priority::High => "rgba(255,59,48,0.15)",
            Priority::Medium => "rgba(255,204,0,0.15)",
            Priority::Low => "rgba(52,199,89,0.15)",
        };
        Self {
            background,
            foreground: priority.color(),
            muted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: i64,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub priority: Priority,
    pub status: TaskStatus,
    pub recurrence: Option<String>,
    pub style: EventStyle,
}

impl From<&Task> for CalendarEvent {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            start: task.start_time,
            end: task.end_time,
            all_day: false,
            priority: task.priority,
            status: task.status,
            recurrence: task.recurrence.clone().filter(|label| !label.trim().is_empty()),
            style: EventStyle::for_task(task.priority, task.status),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub completed: usize,
    pub pending: usize,
    pub recurring: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.completed + self.pending
    }
}

pub fn to_calendar_events(tasks: &[Task]) -> Vec<CalendarEvent> {
    tasks.iter().map(CalendarEvent::from).collect()
}

/// Bucket events by the calendar day their start falls on in `tz`.
pub fn events_by_day<Tz: TimeZone>(
    events: &[CalendarEvent],
    tz: &Tz,
) -> BTreeMap<NaiveDate, Vec<CalendarEvent>> {
    let mut days: BTreeMap<NaiveDate, Vec<CalendarEvent>> = BTreeMap::new();
    for event in events {
        let day = event.start.with_timezone(tz).date_naive();
        days.entry(day).or_default().push(event.clone());
    }
    for bucket in days.values_mut() {
        bucket.sort_by_key(|event| event.start);
    }
    days
}

/// Monday of the week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

/// The seven days of the week containing `anchor`, each with its events.
pub fn events_in_week<Tz: TimeZone>(
    events: &[CalendarEvent],
    anchor: NaiveDate,
    tz: &Tz,
) -> Vec<(NaiveDate, Vec<CalendarEvent>)> {
    let mut by_day = events_by_day(events, tz);
    let monday = week_start(anchor);
    (0..7)
        .map(|offset| {
            let day = monday + Duration::days(offset);
            (day, by_day.remove(&day).unwrap_or_default())
        })
        .collect()
}

/// Tasks starting on `date` in `tz`, ascending by start time. The sort is
/// stable, so equal start times keep their incoming order.
pub fn to_timeline<Tz: TimeZone>(tasks: &[Task], date: NaiveDate, tz: &Tz) -> Vec<Task> {
    let mut day: Vec<Task> = tasks
        .iter()
        .filter(|task| task.start_time.with_timezone(tz).date_naive() == date)
        .cloned()
        .collect();
    day.sort_by_key(|task| task.start_time);
    day
}

pub fn summarize(tasks: &[Task]) -> Summary {
    tasks.iter().fold(Summary::default(), |mut summary, task| {
        if task.is_completed() {
            summary.completed += 1;
        } else {
            summary.pending += 1;
        }
        if task.is_recurring() {
            summary.recurring += 1;
        }
        summary
    })
}
