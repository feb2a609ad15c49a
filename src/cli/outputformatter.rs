use chrono::Utc;
use terminal_size::{terminal_size, Width};

use crate::clock::{ClockState, ClockView};
use crate::models::{format_elapsed, ActiveShift, AuthenticatedUser, EmployeeJob};

fn get_terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) if w > 20 => w as usize,
        _ => 100,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

struct Column {
    title: &'static str,
    align: Align,
}

const JOB_COLUMNS: [Column; 5] = [
    Column { title: "", align: Align::Left },
    Column { title: "id", align: Align::Right },
    Column { title: "job", align: Align::Left },
    Column { title: "department", align: Align::Left },
    Column { title: "wage", align: Align::Right },
];

/// Render the jobs assignable to an employee as an ASCII table; `selected` is starred.
pub fn render_jobs(jobs: &[EmployeeJob], selected: Option<i64>) -> String {
    let rows: Vec<[String; 5]> = jobs
        .iter()
        .map(|j| {
            [
                if selected == Some(j.employee_job_id) { "*".to_string() } else { String::new() },
                j.employee_job_id.to_string(),
                j.job_title.clone(),
                j.department_name.clone(),
                format!("{:.2}", j.hourly_wage),
            ]
        })
        .collect();
    render_table(&JOB_COLUMNS, &rows, get_terminal_width())
}

fn render_table<const N: usize>(columns: &[Column; N], rows: &[[String; N]], term_width: usize) -> String {
    // Each column costs three characters of border and padding.
    let cap = (term_width / N.max(1)).saturating_sub(3).max(4);
    let widths: [usize; N] = std::array::from_fn(|i| {
        rows.iter().map(|r| r[i].chars().count()).chain([columns[i].title.chars().count()]).max().unwrap_or(0).min(cap)
    });
    let rule = rule_line(&widths);
    let titles: [String; N] = std::array::from_fn(|i| columns[i].title.to_string());
    let mut out = vec![rule.clone(), table_line(columns, &titles, &widths), rule.clone()];
    out.extend(rows.iter().map(|r| table_line(columns, r, &widths)));
    out.push(rule);
    out.join("\n")
}

fn rule_line(widths: &[usize]) -> String {
    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
    format!("+{}+", dashes.join("+"))
}

fn table_line<const N: usize>(columns: &[Column; N], cells: &[String; N], widths: &[usize; N]) -> String {
    let parts: Vec<String> = (0..N)
        .map(|i| {
            let w = widths[i];
            let text = clip(&cells[i], w);
            match columns[i].align {
                Align::Left => format!(" {:<w$} ", text),
                Align::Right => format!(" {:>w$} ", text),
            }
        })
        .collect();
    format!("|{}|", parts.join("|"))
}

/// Shorten to `width` characters, marking the cut with an ellipsis.
fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

pub fn render_shift(shift: &ActiveShift) -> String {
    let now = Utc::now();
    format!(
        "on shift as {} since {} | elapsed {} | earned ${:.2}",
        shift.job_title,
        shift.clock_in.with_timezone(&chrono::Local).format("%H:%M"),
        format_elapsed(shift.elapsed(now)),
        shift.earnings(now)
    )
}

pub fn render_user(user: &AuthenticatedUser) -> String {
    format!("{} ({}, {:?}, id {})", user.display_name(), user.username, user.role, user.id)
}

/// Multi-line status text for the clock panel.
pub fn render_view(view: &ClockView) -> String {
    let mut lines: Vec<String> = Vec::new();
    match &view.state {
        ClockState::Initializing => lines.push("resolving clock status...".to_string()),
        ClockState::ClockIn { jobs, selected } => {
            lines.push("next action: CLOCK IN".to_string());
            lines.push(render_jobs(jobs, *selected));
            if selected.is_none() {
                lines.push("select a job with --job <id> to clock in".to_string());
            }
        }
        ClockState::NoJobs => {
            lines.push("next action: CLOCK IN".to_string());
            lines.push("no jobs are assigned to you; contact your manager".to_string());
        }
        ClockState::ClockOut { shift } => {
            lines.push("next action: CLOCK OUT".to_string());
            match shift {
                Some(s) => lines.push(render_shift(s)),
                None => lines.push("no active shift details available".to_string()),
            }
        }
        ClockState::Unavailable { reason } => {
            lines.push("clock actions are unavailable; contact your supervisor".to_string());
            if let Some(r) = reason {
                lines.push(format!("(reason: {})", r));
            }
        }
    }
    if let Some(e) = &view.last_error {
        lines.push(format!("error: {}", e));
    }
    lines.join("\n")
}
