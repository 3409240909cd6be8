//! Text front-end: parses terminal commands into engine events and renders
//! the board and notifications back as text.
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;
use thiserror::Error;

use crate::board::{Board, DateWindow, JobFilter};
use crate::coordinator::Intent;
use crate::drag::{DragEvent, DropTarget};
use crate::model::{parse_date_applied, Job, JobId, JobPatch, JobStatus, NewJob, UnknownStatus};
use crate::notify::{Notification, NotificationId, NotificationKind};

pub const HELP: &str = "\
commands:
  board                          show the board
  reload                         fetch all jobs again
  add <company> | <title> [| <STATUS>]
  edit <id> key=value ...        keys: company title status notes link date
  status <id> <STATUS>           set status directly
  move <id> <STATUS|id>          drag a card onto a column or another card
  drag start <id> | drag over <id> <target> | drag end <id> [target]
  delete <id>                    delete with undo window
  undo                           run the latest notification action
  action <n> | dismiss <n>       act on / close notification n
  toasts                         list notifications
  search [text]                  filter by company, title or notes
  since <days|all>               filter by date applied
  quit";

static EDIT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\w+)=(?:"([^"]*)"|(\S+))"#).expect("valid edit field regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid id: {0}")]
    BadId(String),
    #[error(transparent)]
    Status(#[from] UnknownStatus),
    #[error("invalid drop target: {0}")]
    Target(String),
    #[error("unknown field: {0}")]
    Field(String),
    #[error("expected key=value, got: {0}")]
    Malformed(String),
    #[error("invalid date: {0}")]
    Date(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Help,
    Quit,
    Toasts,
    Undo,
    Search(String),
    Since(DateWindow),
    Action(NotificationId),
    Dismiss(NotificationId),
    Intent(Intent),
    /// Drag events, applied in order.
    Gesture(Vec<DragEvent>),
}

pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match head.to_ascii_lowercase().as_str() {
        "" => return Err(ParseError::Empty),
        "board" | "ls" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "toasts" => Command::Toasts,
        "undo" => Command::Undo,
        "reload" => Command::Intent(Intent::Reload),
        "search" => Command::Search(rest.to_string()),
        "since" => Command::Since(parse_window(rest)?),
        "add" => Command::Intent(Intent::Create(parse_new_job(rest)?)),
        "edit" => {
            let (id, fields) = rest
                .split_once(char::is_whitespace)
                .ok_or(ParseError::Usage("edit <id> key=value ..."))?;
            let patch = parse_patch(fields)?;
            Command::Intent(Intent::Update {
                id: parse_id(id)?,
                patch,
            })
        }
        "status" => match args.as_slice() {
            [id, status] => Command::Intent(Intent::UpdateStatus {
                id: parse_id(id)?,
                status: status.parse()?,
            }),
            _ => return Err(ParseError::Usage("status <id> <STATUS>")),
        },
        "move" => match args.as_slice() {
            [id, target] => {
                let active = parse_id(id)?;
                let over = Some(parse_target(target)?);
                Command::Gesture(vec![
                    DragEvent::Start { active },
                    DragEvent::Over { active, over },
                    DragEvent::End { active, over },
                ])
            }
            _ => return Err(ParseError::Usage("move <id> <STATUS|id>")),
        },
        "drag" => Command::Gesture(vec![parse_drag(&args)?]),
        "delete" | "rm" => match args.as_slice() {
            [id] => Command::Intent(Intent::Delete(parse_id(id)?)),
            _ => return Err(ParseError::Usage("delete <id>")),
        },
        "action" => match args.as_slice() {
            [n] => Command::Action(parse_notification_id(n)?),
            _ => return Err(ParseError::Usage("action <n>")),
        },
        "dismiss" => match args.as_slice() {
            [n] => Command::Dismiss(parse_notification_id(n)?),
            _ => return Err(ParseError::Usage("dismiss <n>")),
        },
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn parse_id(raw: &str) -> Result<JobId, ParseError> {
    raw.trim()
        .parse()
        .map_err(|_| ParseError::BadId(raw.to_string()))
}

fn parse_notification_id(raw: &str) -> Result<NotificationId, ParseError> {
    raw.trim()
        .parse()
        .map_err(|_| ParseError::BadId(raw.to_string()))
}

fn parse_target(raw: &str) -> Result<DropTarget, ParseError> {
    raw.parse().map_err(ParseError::Target)
}

fn parse_drag(args: &[&str]) -> Result<DragEvent, ParseError> {
    const USAGE: &str = "drag start <id> | drag over <id> <target> | drag end <id> [target]";
    let event = match args {
        ["start", id] => DragEvent::Start {
            active: parse_id(id)?,
        },
        ["over", id, target] => DragEvent::Over {
            active: parse_id(id)?,
            over: Some(parse_target(target)?),
        },
        ["end", id] => DragEvent::End {
            active: parse_id(id)?,
            over: None,
        },
        ["end", id, target] => DragEvent::End {
            active: parse_id(id)?,
            over: Some(parse_target(target)?),
        },
        _ => return Err(ParseError::Usage(USAGE)),
    };
    Ok(event)
}

fn parse_window(raw: &str) -> Result<DateWindow, ParseError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        return Ok(DateWindow::Any);
    }
    raw.parse()
        .map(DateWindow::LastDays)
        .map_err(|_| ParseError::Usage("since <days|all>"))
}

fn parse_new_job(raw: &str) -> Result<NewJob, ParseError> {
    const USAGE: &str = "add <company> | <title> [| <STATUS>]";
    let parts: Vec<&str> = raw.split('|').map(str::trim).collect();
    let (company, title, status) = match parts.as_slice() {
        [company, title] => (*company, *title, None),
        [company, title, status] => (*company, *title, Some(status.parse::<JobStatus>()?)),
        _ => return Err(ParseError::Usage(USAGE)),
    };
    if company.is_empty() || title.is_empty() {
        return Err(ParseError::Usage(USAGE));
    }
    let mut job = NewJob::new(company, title);
    if let Some(status) = status {
        job.status = status;
    }
    Ok(job)
}

fn parse_patch(raw: &str) -> Result<JobPatch, ParseError> {
    let stray = EDIT_FIELD.replace_all(raw, " ");
    if let Some(token) = stray.split_whitespace().next() {
        return Err(ParseError::Malformed(token.to_string()));
    }
    let mut patch = JobPatch::default();
    for caps in EDIT_FIELD.captures_iter(raw) {
        let key = &caps[1];
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        match key {
            "company" => patch.company_name = Some(value),
            "title" => patch.job_title = Some(value),
            "status" => patch.status = Some(value.parse()?),
            "notes" => patch.notes = Some(value),
            "link" => patch.email_thread_link = Some(value),
            "date" => {
                patch.date_applied =
                    Some(parse_date_applied(&value).ok_or(ParseError::Date(value))?)
            }
            other => return Err(ParseError::Field(other.to_string())),
        }
    }
    if patch.is_empty() {
        return Err(ParseError::Usage("edit <id> key=value ..."));
    }
    Ok(patch)
}

pub fn render_board(jobs: &[Job], filter: &JobFilter) -> String {
    let board = Board::from_jobs(jobs, filter);
    let mut out = String::new();
    let _ = writeln!(out, "Total applications: {}", jobs.len());
    if !filter.is_empty() {
        let _ = writeln!(out, "Showing {} matching", board.total());
    }
    for (status, count) in board.counts() {
        let _ = writeln!(out, "{} ({})", status, count);
        for job in board.column(status) {
            let _ = writeln!(
                out,
                "  #{:<4} {} - {}  [{}]",
                job.id,
                job.company_name,
                job.job_title,
                job.date_applied.format("%Y-%m-%d")
            );
        }
    }
    out
}

pub fn render_notifications(notifications: &[Notification]) -> String {
    let mut out = String::new();
    for n in notifications {
        let marker = match n.kind {
            NotificationKind::Success => "ok",
            NotificationKind::Error => "!!",
            NotificationKind::Info => "--",
        };
        let _ = write!(out, "[{}] {} {}", n.id, marker, n.message);
        if let Some(action) = &n.action {
            let _ = write!(out, "  ({}: action {})", action.label, n.id);
        }
        out.push('\n');
    }
    out
}
