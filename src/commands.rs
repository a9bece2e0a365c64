use std::io::Write;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use todocal_client::{LoadState, LocalApi, Severity, SyncController};

use crate::cli::{AddArgs, CliCommand, DateArgs, EditArgs};
use crate::config::AppConfig;
use crate::core::projector::{self, CalendarEvent};
use crate::core::{TaskError, TasksService};
use crate::model::{NewTask, Task, TaskStatus};
use crate::parser::{parse_date, parse_timestamp};

type Controller = SyncController<LocalApi>;

/// Run one command against the store at `config`. Mutations go through the
/// sync controller so the CLI reports exactly what an interactive client
/// would show.
pub fn execute<W: Write>(config: &AppConfig, command: CliCommand, mut writer: W) -> Result<()> {
    let service = TasksService::new(config.clone()).context("Failed to open task store")?;
    let mut controller = SyncController::new(LocalApi::new(service));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(run(&mut controller, command, &mut writer))
}

async fn run<W: Write>(controller: &mut Controller, command: CliCommand, writer: &mut W) -> Result<()> {
    controller.reload().await;
    if let LoadState::Failed(message) = controller.state() {
        bail!("Failed to load tasks: {message}");
    }

    match command {
        CliCommand::List => write_list(&controller.tasks(), writer),
        CliCommand::Add(args) => handle_add(controller, args, writer).await,
        CliCommand::Edit(args) => handle_edit(controller, args, writer).await,
        CliCommand::Done(args) => {
            handle_status(controller, args.id, TaskStatus::Completed, writer).await
        }
        CliCommand::Reopen(args) => {
            handle_status(controller, args.id, TaskStatus::Pending, writer).await
        }
        CliCommand::Delete(args) => {
            controller.delete(args.id).await;
            report(controller, writer)
        }
        CliCommand::Timeline(args) => handle_timeline(controller, &args, writer),
        CliCommand::Calendar(args) => handle_calendar(controller, &args, writer),
        CliCommand::Summary => {
            let summary = controller.views(Local::now().date_naive(), &Local).summary;
            writeln!(writer, "Completed: {}", summary.completed)?;
            writeln!(writer, "Pending:   {}", summary.pending)?;
            writeln!(writer, "Recurring: {}", summary.recurring)?;
            Ok(())
        }
    }
}

async fn handle_add<W: Write>(controller: &mut Controller, args: AddArgs, writer: &mut W) -> Result<()> {
    let input = NewTask {
        title: args.title.join(" "),
        reason: args.reason,
        start_time: parse_timestamp(&args.start)?,
        end_time: parse_timestamp(&args.end)?,
        recurrence: args.recurrence,
        priority: args.priority,
    };

    let created = controller.create(input).await;
    report(controller, writer)?;
    if let Some(task) = created {
        writeln!(writer, "{}", TaskLine(&task))?;
    }
    Ok(())
}

async fn handle_edit<W: Write>(controller: &mut Controller, args: EditArgs, writer: &mut W) -> Result<()> {
    if args.is_empty() {
        bail!("Nothing to change for task {}; pass at least one field", args.id);
    }
    if !controller.begin_edit(args.id) {
        return Err(TaskError::NotFound(args.id).into());
    }

    if let Some(draft) = controller.draft_mut() {
        if let Some(title) = args.title {
            draft.title = title;
        }
        if let Some(reason) = args.reason {
            draft.reason = reason;
        }
        if let Some(start) = args.start {
            draft.start_time = start;
        }
        if let Some(end) = args.end {
            draft.end_time = end;
        }
        if let Some(recurrence) = args.recurrence {
            draft.recurrence = recurrence;
        }
        if let Some(priority) = args.priority {
            draft.priority = priority;
        }
    }

    if !controller.save_edit().await {
        let message = controller
            .draft()
            .and_then(|draft| draft.error.clone())
            .unwrap_or_else(|| format!("Failed to update task {}", args.id));
        return Err(anyhow!(message));
    }
    report(controller, writer)
}

async fn handle_status<W: Write>(
    controller: &mut Controller,
    id: i64,
    target: TaskStatus,
    writer: &mut W,
) -> Result<()> {
    let current = controller
        .task(id)
        .map(|task| task.status)
        .ok_or(TaskError::NotFound(id))?;
    if current == target {
        writeln!(writer, "Task {id} is already {target}")?;
        return Ok(());
    }

    controller.toggle_complete(id).await;
    report(controller, writer)
}

fn handle_timeline<W: Write>(controller: &Controller, args: &DateArgs, writer: &mut W) -> Result<()> {
    let date = parse_date(&args.date)?;
    let timeline = controller.views(date, &Local).timeline;

    writeln!(writer, "Timeline for {}", date.format("%A, %B %-d, %Y"))?;
    if timeline.is_empty() {
        writeln!(writer, "No tasks scheduled for this day.")?;
        return Ok(());
    }
    for task in &timeline {
        let start = task.start_time.with_timezone(&Local);
        let end = task.end_time.with_timezone(&Local);
        writeln!(
            writer,
            "{} - {}  {}  [{}]{}",
            start.format("%H:%M"),
            end.format("%H:%M"),
            task.title,
            task.priority,
            if task.is_completed() { " (done)" } else { "" }
        )?;
    }
    Ok(())
}

fn handle_calendar<W: Write>(controller: &Controller, args: &DateArgs, writer: &mut W) -> Result<()> {
    let anchor = parse_date(&args.date)?;
    let events = controller.views(anchor, &Local).calendar;
    let week = projector::events_in_week(&events, anchor, &Local);

    for (day, events) in week {
        write_day(writer, day, &events)?;
    }
    Ok(())
}

fn write_day<W: Write>(writer: &mut W, day: NaiveDate, events: &[CalendarEvent]) -> Result<()> {
    writeln!(writer, "{}", day.format("%a %Y-%m-%d"))?;
    for event in events {
        writeln!(
            writer,
            "  {} {} #{} {}{}",
            if event.style.muted { "x" } else { "o" },
            event.start.with_timezone(&Local).format("%H:%M"),
            event.id,
            event.title,
            event
                .recurrence
                .as_deref()
                .map(|label| format!(" ({label})"))
                .unwrap_or_default()
        )?;
    }
    Ok(())
}

fn write_list<W: Write>(tasks: &[Task], writer: &mut W) -> Result<()> {
    if tasks.is_empty() {
        writeln!(writer, "No tasks yet. Add your first task!")?;
        return Ok(());
    }
    for task in tasks {
        writeln!(writer, "{}", TaskLine(task))?;
    }
    Ok(())
}

/// Print the controller's notification, or turn it into an error.
fn report<W: Write>(controller: &Controller, writer: &mut W) -> Result<()> {
    match controller.snackbar() {
        Some(notice) if matches!(notice.severity, Severity::Error | Severity::Warning) => {
            Err(anyhow!(notice.message.clone()))
        }
        Some(notice) => {
            writeln!(writer, "{}", notice.message)?;
            Ok(())
        }
        None => Ok(()),
    }
}

struct TaskLine<'a>(&'a Task);

impl std::fmt::Display for TaskLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let task = self.0;
        let start = task.start_time.with_timezone(&Local);
        let end = task.end_time.with_timezone(&Local);
        let end_format = if start.date_naive() == end.date_naive() {
            "%H:%M"
        } else {
            "%Y-%m-%d %H:%M"
        };
        write!(
            f,
            "[{}] #{} {}  {} - {}  {}",
            if task.is_completed() { "x" } else { " " },
            task.id,
            task.title,
            start.format("%Y-%m-%d %H:%M"),
            end.format(end_format),
            task.priority
        )?;
        if let Some(recurrence) = task.recurrence.as_deref() {
            write!(f, "  ({recurrence})")?;
        }
        if let Some(reason) = task.reason.as_deref() {
            write!(f, "  because: {reason}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{DateArgs, IdArgs};
    use crate::model::Priority;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn temp_config() -> (AppConfig, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");
        (config, dir)
    }

    fn run_command(config: &AppConfig, command: CliCommand) -> Result<String> {
        let mut output = Vec::new();
        execute(config, command, &mut output)?;
        Ok(String::from_utf8(output).expect("utf8"))
    }

    fn add(title: &str, start: &str, end: &str) -> CliCommand {
        CliCommand::Add(AddArgs {
            title: vec![title.to_string()],
            start: start.to_string(),
            end: end.to_string(),
            reason: None,
            recurrence: None,
            priority: None,
        })
    }

    fn tasks(config: &AppConfig) -> Vec<Task> {
        TasksService::new(config.clone()).unwrap().list().unwrap()
    }

    fn date(value: &str) -> DateArgs {
        DateArgs {
            date: value.to_string(),
        }
    }

    #[test]
    fn add_reports_snackbar_and_persists() {
        let (config, _dir) = temp_config();
        let output = run_command(
            &config,
            CliCommand::Add(AddArgs {
                title: vec!["Write".into(), "report".into()],
                start: "2024-01-01T09:00".into(),
                end: "2024-01-01T10:00".into(),
                reason: Some("Quarterly review".into()),
                recurrence: None,
                priority: Some(Priority::High),
            }),
        )
        .unwrap();

        assert!(output.starts_with("Task added!"));
        assert!(output.contains("Write report"));
        let stored = tasks(&config);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].priority, Priority::High);
        assert_eq!(stored[0].reason.as_deref(), Some("Quarterly review"));
    }

    #[test]
    fn add_with_inverted_range_fails_without_row() {
        let (config, _dir) = temp_config();
        let err = run_command(&config, add("Backwards", "2024-01-01T10:00", "2024-01-01T09:00"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to add task: End time cannot be before start time"
        );
        assert!(tasks(&config).is_empty());
    }

    #[test]
    fn list_orders_by_start_and_handles_empty_store() {
        let (config, _dir) = temp_config();
        let empty = run_command(&config, CliCommand::List).unwrap();
        assert_eq!(empty, "No tasks yet. Add your first task!\n");

        run_command(&config, add("Later", "2024-01-01T14:00", "2024-01-01T15:00")).unwrap();
        run_command(&config, add("Earlier", "2024-01-01T08:00", "2024-01-01T09:00")).unwrap();
        let output = run_command(&config, CliCommand::List).unwrap();
        let earlier = output.find("Earlier").unwrap();
        let later = output.find("Later").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn done_and_reopen_toggle_status() {
        let (config, _dir) = temp_config();
        run_command(&config, add("Write report", "2024-01-01T09:00", "2024-01-01T10:00")).unwrap();
        let id = tasks(&config)[0].id;

        let done = run_command(&config, CliCommand::Done(IdArgs { id })).unwrap();
        assert_eq!(done, "Marked as completed!\n");
        let again = run_command(&config, CliCommand::Done(IdArgs { id })).unwrap();
        assert_eq!(again, format!("Task {id} is already completed\n"));

        let reopened = run_command(&config, CliCommand::Reopen(IdArgs { id })).unwrap();
        assert_eq!(reopened, "Marked as pending\n");
        assert_eq!(tasks(&config)[0].status, TaskStatus::Pending);
    }

    #[test]
    fn edit_changes_only_given_fields() {
        let (config, _dir) = temp_config();
        run_command(&config, add("Write report", "2024-01-01T09:00", "2024-01-01T10:00")).unwrap();
        let original = tasks(&config).remove(0);

        let output = run_command(
            &config,
            CliCommand::Edit(EditArgs {
                id: original.id,
                title: Some("Write final report".into()),
                reason: None,
                start: None,
                end: None,
                recurrence: Some("weekly".into()),
                priority: None,
            }),
        )
        .unwrap();
        assert_eq!(output, "Task updated!\n");

        let updated = tasks(&config).remove(0);
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.title, "Write final report");
        assert_eq!(updated.recurrence.as_deref(), Some("weekly"));
        assert_eq!(updated.start_time, original.start_time);
        assert_eq!(updated.priority, original.priority);
    }

    #[test]
    fn edit_rejects_inverted_range_locally() {
        let (config, _dir) = temp_config();
        run_command(&config, add("Write report", "2024-01-01T09:00", "2024-01-01T10:00")).unwrap();
        let id = tasks(&config)[0].id;

        let err = run_command(
            &config,
            CliCommand::Edit(EditArgs {
                id,
                title: None,
                reason: None,
                start: None,
                end: Some("2024-01-01T08:00".into()),
                recurrence: None,
                priority: None,
            }),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "End time cannot be before start time.");
    }

    #[test]
    fn delete_reports_and_missing_ids_fail() {
        let (config, _dir) = temp_config();
        run_command(&config, add("Write report", "2024-01-01T09:00", "2024-01-01T10:00")).unwrap();
        let id = tasks(&config)[0].id;

        let output = run_command(&config, CliCommand::Delete(IdArgs { id })).unwrap();
        assert_eq!(output, "Task deleted\n");
        assert!(tasks(&config).is_empty());

        let err = run_command(&config, CliCommand::Delete(IdArgs { id })).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Failed to delete task: Task {id} not found")
        );
    }

    #[test]
    fn timeline_shows_only_the_requested_day() {
        let (config, _dir) = temp_config();
        run_command(&config, add("Afternoon", "2024-01-01T15:00", "2024-01-01T16:00")).unwrap();
        run_command(&config, add("Morning", "2024-01-01T08:00", "2024-01-01T09:00")).unwrap();
        run_command(&config, add("Next day", "2024-01-02T08:00", "2024-01-02T09:00")).unwrap();

        let output = run_command(&config, CliCommand::Timeline(date("2024-01-01"))).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Timeline for Monday, January 1, 2024");
        assert_eq!(lines[1], "08:00 - 09:00  Morning  [Medium]");
        assert_eq!(lines[2], "15:00 - 16:00  Afternoon  [Medium]");
        assert_eq!(lines.len(), 3);

        let empty = run_command(&config, CliCommand::Timeline(date("2024-01-05"))).unwrap();
        assert!(empty.ends_with("No tasks scheduled for this day.\n"));
    }

    #[test]
    fn calendar_prints_monday_first_week() {
        let (config, _dir) = temp_config();
        run_command(&config, add("Standup", "2024-01-03T09:00", "2024-01-03T09:15")).unwrap();

        let output = run_command(&config, CliCommand::Calendar(date("2024-01-04"))).unwrap();
        let headers: Vec<&str> = output.lines().filter(|line| !line.starts_with(' ')).collect();
        assert_eq!(headers.len(), 7);
        assert_eq!(headers[0], "Mon 2024-01-01");
        assert!(output.contains("Wed 2024-01-03\n  o 09:00 #1 Standup\n"));
    }

    #[test]
    fn summary_counts_statuses() {
        let (config, _dir) = temp_config();
        run_command(&config, add("One", "2024-01-01T09:00", "2024-01-01T10:00")).unwrap();
        run_command(&config, add("Two", "2024-01-01T11:00", "2024-01-01T12:00")).unwrap();
        let id = tasks(&config)[0].id;
        run_command(&config, CliCommand::Done(IdArgs { id })).unwrap();

        let output = run_command(&config, CliCommand::Summary).unwrap();
        assert_eq!(output, "Completed: 1\nPending:   1\nRecurring: 0\n");
    }
}
