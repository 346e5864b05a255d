//! Rendering for the three views and the sidebar.
//!
//! Pure functions from `App` state to ratatui widgets; nothing in here
//! mutates state.

use crate::app::{App, View};
use crate::text::{human_bytes, shorten_path};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use scrutiny_client::types::JobStatus;
use scrutiny_core::chat::Role;
use scrutiny_core::markdown::{self, Block as MdBlock, Span as MdSpan};
use scrutiny_core::report::Severity;
use scrutiny_core::upload::UploadState;

pub fn render(frame: &mut Frame, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(0)])
        .split(frame.area());

    render_sidebar(frame, app, columns[0]);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(columns[1]);

    match app.view {
        View::Upload => render_upload(frame, app, main[0]),
        View::Dashboard => render_dashboard(frame, app, main[0]),
        View::Chat => render_chat(frame, app, main[0]),
    }
    render_footer(frame, app, main[1]);
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn status_style(status: JobStatus) -> Style {
    let color = match status {
        JobStatus::Pending => Color::Yellow,
        JobStatus::Processing => Color::Cyan,
        JobStatus::Completed => Color::Green,
        JobStatus::Failed => Color::Red,
    };
    Style::default().fg(color)
}

fn severity_style(severity: Severity) -> Style {
    let color = match severity {
        Severity::Critical => Color::Red,
        Severity::High => Color::LightRed,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::Blue,
    };
    Style::default().fg(color)
}

fn score_style(score: u8) -> Style {
    let color = if score >= 80 {
        Color::Green
    } else if score >= 50 {
        Color::Yellow
    } else {
        Color::Red
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled("server", dim())));
    lines.push(Line::from(shorten_path(&app.server_label, 26)));
    lines.push(Line::default());

    lines.push(Line::from(Span::styled("views", dim())));
    for (view, label) in [
        (View::Upload, "upload"),
        (View::Dashboard, "dashboard"),
        (View::Chat, "chat"),
    ] {
        let marker = if app.view == view { "▸ " } else { "  " };
        let style = if app.view == view {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(format!("{marker}{label}"), style)));
    }
    lines.push(Line::default());

    lines.push(Line::from(Span::styled(
        format!("files ({})", app.items.len()),
        dim(),
    )));
    for item in app.items.iter().take(8) {
        let (glyph, style) = match item.state {
            UploadState::Uploading => ("…", dim()),
            UploadState::Completed => ("✓", Style::default().fg(Color::Green)),
            UploadState::Error => ("✗", Style::default().fg(Color::Red)),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{glyph} "), style),
            Span::raw(shorten_path(&item.name, 24)),
        ]));
    }
    if app.items.len() > 8 {
        lines.push(Line::from(Span::styled(
            format!("  +{} more", app.items.len() - 8),
            dim(),
        )));
    }
    lines.push(Line::default());

    if let Some(job_id) = &app.job_id {
        lines.push(Line::from(Span::styled("job", dim())));
        lines.push(Line::from(shorten_path(job_id, 26)));
        if let Some(job) = &app.job {
            lines.push(Line::from(vec![
                Span::styled(job.status.to_string(), status_style(job.status)),
                Span::raw(format!("  {}%", job.progress)),
            ]));
            if let Some(started) = &job.start_time {
                lines.push(Line::from(Span::styled(
                    format!("started {}", shorten_path(started, 24)),
                    dim(),
                )));
            }
        }
        if app.job_failed.is_some() {
            lines.push(Line::from(Span::styled(
                "failed",
                Style::default().fg(Color::Red),
            )));
        }
        if app.channel_lost {
            lines.push(Line::from(Span::styled("polling (no live feed)", dim())));
        }
    }

    let sidebar = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" scrutiny ")
            .title_style(Style::default().add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(sidebar, area);
}

fn render_upload(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    if let Some(repo) = &app.repo {
        lines.push(Line::from(vec![
            Span::styled("repository  ", dim()),
            Span::raw(repo.clone()),
        ]));
        lines.push(Line::default());
        lines.push(Line::from("press enter to analyze the repository"));
    } else if app.items.is_empty() {
        lines.push(Line::from("no files queued"));
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "pass files on the command line: scrutiny app.py lib.py",
            dim(),
        )));
    } else {
        for (i, item) in app.items.iter().enumerate() {
            let marker = if i == app.selected { "▸ " } else { "  " };
            let (glyph, style) = match item.state {
                UploadState::Uploading => ("…", dim()),
                UploadState::Completed => ("✓", Style::default().fg(Color::Green)),
                UploadState::Error => ("✗", Style::default().fg(Color::Red)),
            };
            let mut spans = vec![
                Span::raw(marker),
                Span::styled(format!("{glyph} "), style),
                Span::raw(item.name.clone()),
                Span::styled(format!("  {}", human_bytes(item.size_bytes)), dim()),
            ];
            if let Some(path) = &item.server_path {
                spans.push(Span::styled(format!("  → {}", shorten_path(path, 40)), dim()));
            }
            if let Some(error) = &item.error {
                spans.push(Span::styled(
                    format!("  {error}"),
                    Style::default().fg(Color::Red),
                ));
            }
            lines.push(Line::from(spans));
        }
        lines.push(Line::default());
        if app.uploading {
            lines.push(Line::from(Span::styled("uploading…", dim())));
        } else {
            lines.push(Line::from(Span::styled(
                "enter: upload + analyze   x: remove   ↑/↓: select",
                dim(),
            )));
        }
    }

    let view = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" upload "));
    frame.render_widget(view, area);
}

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let (ratio, label) = match (&app.job, &app.job_failed) {
        (_, Some(message)) => (1.0, format!("failed — {message}")),
        (Some(job), None) => (
            f64::from(job.progress) / 100.0,
            format!("{} {}% {}", job.status, job.progress, job.message),
        ),
        (None, None) if app.job_id.is_some() => (0.0, "attaching…".to_string()),
        (None, None) => (0.0, "no analysis running".to_string()),
    };
    let gauge_style = if app.job_failed.is_some() {
        Style::default().fg(Color::Red)
    } else if app.report.is_some() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" analysis "))
        .gauge_style(gauge_style)
        .ratio(ratio.clamp(0.0, 1.0))
        .label(label);
    frame.render_widget(gauge, rows[0]);

    let mut lines: Vec<Line> = Vec::new();
    if let Some(message) = &app.results_error {
        lines.push(Line::from(Span::styled(
            format!("results error: {message}"),
            Style::default().fg(Color::Red),
        )));
        lines.push(Line::from(Span::styled("press r to retry", dim())));
        lines.push(Line::default());
    }

    if let Some(report) = &app.report {
        let summary = &report.summary;
        lines.push(Line::from(vec![
            Span::styled("overall ", dim()),
            Span::styled(summary.overall_score.to_string(), score_style(summary.overall_score)),
            Span::styled("   security ", dim()),
            Span::styled(
                report.metrics.security.to_string(),
                score_style(report.metrics.security),
            ),
            Span::styled("   performance ", dim()),
            Span::styled(
                report.metrics.performance.to_string(),
                score_style(report.metrics.performance),
            ),
            Span::styled("   quality ", dim()),
            Span::styled(
                report.metrics.code_quality.to_string(),
                score_style(report.metrics.code_quality),
            ),
            Span::styled("   docs ", dim()),
            Span::styled(
                report.metrics.documentation.to_string(),
                score_style(report.metrics.documentation),
            ),
        ]));
        lines.push(Line::from(vec![
            Span::raw(format!(
                "{} issue(s) across {} file(s)   ",
                summary.total_issues, summary.total_files
            )),
            Span::styled(format!("{} critical", summary.severity.critical), severity_style(Severity::Critical)),
            Span::raw("  "),
            Span::styled(format!("{} high", summary.severity.high), severity_style(Severity::High)),
            Span::raw("  "),
            Span::styled(format!("{} medium", summary.severity.medium), severity_style(Severity::Medium)),
            Span::raw("  "),
            Span::styled(format!("{} low", summary.severity.low), severity_style(Severity::Low)),
        ]));
        if !summary.agent_breakdown.is_empty() {
            let agents = summary
                .agent_breakdown
                .iter()
                .map(|(agent, count)| format!("{agent} {count}"))
                .collect::<Vec<_>>()
                .join("   ");
            lines.push(Line::from(Span::styled(agents, dim())));
        }
        if let Some(seconds) = report.total_analysis_time {
            lines.push(Line::from(Span::styled(
                format!("analyzed in {seconds:.1}s"),
                dim(),
            )));
        }
        lines.push(Line::default());

        lines.push(Line::from(Span::styled(
            "top issues",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for issue in report.top_issues.iter().take(12) {
            let location = match issue.line {
                Some(line) => format!("{}:{line}", issue.file),
                None => issue.file.clone(),
            };
            lines.push(Line::from(vec![
                Span::styled(format!("[{}] ", issue.severity), severity_style(issue.severity)),
                Span::raw(issue.title.clone()),
                Span::styled(format!("  {location}"), dim()),
                Span::styled(format!("  ({})", issue.agent), dim()),
            ]));
        }
        if report.top_issues.len() > 12 {
            lines.push(Line::from(Span::styled(
                format!("  +{} more", report.top_issues.len() - 12),
                dim(),
            )));
        }
    } else if app.job_failed.is_none() && app.job_id.is_some() && app.results_error.is_none() {
        lines.push(Line::from(Span::styled("waiting for results…", dim())));
    } else if app.job_id.is_none() {
        lines.push(Line::from(Span::styled(
            "start an analysis from the upload view",
            dim(),
        )));
    }

    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" report "));
    frame.render_widget(body, rows[1]);
}

fn render_chat(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let messages = app.transcript.messages();
    let mut lines: Vec<Line> = Vec::new();
    for (i, message) in messages.iter().enumerate() {
        let (who, style) = match message.role {
            Role::User => ("you", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Role::Assistant => ("scrutiny", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        };
        lines.push(Line::from(vec![
            Span::styled(who, style),
            Span::styled(
                format!("  {}", message.created_at.format("%H:%M")),
                dim(),
            ),
        ]));

        // Only the newest assistant message is revealed progressively.
        let content = if message.role == Role::Assistant && i == messages.len() - 1 {
            message.content.chars().take(app.reveal).collect::<String>()
        } else {
            message.content.clone()
        };
        lines.extend(markdown_lines(&content));
        lines.push(Line::default());
    }
    if app.waiting_reply {
        lines.push(Line::from(Span::styled("thinking…", dim())));
    }

    // Keep the tail of the transcript in view.
    let visible = rows[0].height.saturating_sub(2) as usize;
    if lines.len() > visible {
        lines.drain(..lines.len() - visible);
    }

    let transcript = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" chat "));
    frame.render_widget(transcript, rows[0]);

    let input_line = Line::from(vec![
        Span::raw(app.input.clone()),
        Span::styled("█", Style::default().fg(Color::DarkGray)),
    ]);
    let input = Paragraph::new(input_line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" message (enter: send, ctrl+y: copy code) "),
    );
    frame.render_widget(input, rows[1]);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(notice) = &app.notice {
        Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        let hints = match app.view {
            View::Upload => "tab: switch view   enter: analyze   q: quit",
            View::Dashboard => "tab: switch view   r: refresh results   q: quit",
            View::Chat => "tab: switch view   esc: dashboard   ctrl+c: quit",
        };
        Line::from(Span::styled(hints, dim()))
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Map parsed markdown blocks onto styled terminal lines.
pub(crate) fn markdown_lines(content: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for block in markdown::parse(content) {
        match block {
            MdBlock::Code { language, content } => {
                let fence = if language.is_empty() {
                    "```".to_string()
                } else {
                    format!("``` {language}")
                };
                lines.push(Line::from(Span::styled(fence, dim())));
                for code_line in content.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {code_line}"),
                        Style::default().fg(Color::Yellow),
                    )));
                }
                lines.push(Line::from(Span::styled("```", dim())));
            }
            MdBlock::Heading { level, spans } => {
                let mut rendered = vec![Span::styled(
                    format!("{} ", "#".repeat(level as usize)),
                    dim(),
                )];
                rendered.extend(inline_spans(spans, Modifier::BOLD));
                lines.push(Line::from(rendered));
            }
            MdBlock::Bullet { spans } => {
                let mut rendered = vec![Span::raw("  • ")];
                rendered.extend(inline_spans(spans, Modifier::empty()));
                lines.push(Line::from(rendered));
            }
            MdBlock::Ordered { number, spans } => {
                let mut rendered = vec![Span::raw(format!("  {number}. "))];
                rendered.extend(inline_spans(spans, Modifier::empty()));
                lines.push(Line::from(rendered));
            }
            MdBlock::Paragraph { spans } => {
                lines.push(Line::from(inline_spans(spans, Modifier::empty())));
            }
            MdBlock::Blank => lines.push(Line::default()),
        }
    }
    lines
}

fn inline_spans(spans: Vec<MdSpan>, extra: Modifier) -> Vec<Span<'static>> {
    spans
        .into_iter()
        .map(|span| match span {
            MdSpan::Text(text) => Span::styled(text, Style::default().add_modifier(extra)),
            MdSpan::Bold(text) => {
                Span::styled(text, Style::default().add_modifier(Modifier::BOLD | extra))
            }
            MdSpan::Italic(text) => {
                Span::styled(text, Style::default().add_modifier(Modifier::ITALIC | extra))
            }
            MdSpan::Code(text) => Span::styled(
                text,
                Style::default().fg(Color::Yellow).add_modifier(extra),
            ),
            MdSpan::Filename(text) => Span::styled(
                text,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::UNDERLINED | extra),
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_lines_fence_and_content() {
        let lines = markdown_lines("```python\nprint('a')\nx = 1\n```");
        // Opening fence, two code lines, closing fence.
        assert_eq!(lines.len(), 4);
        assert!(lines[0].spans[0].content.contains("python"));
        assert!(lines[1].spans[0].content.contains("print('a')"));
    }

    #[test]
    fn test_markdown_lines_inline_styles() {
        let lines = markdown_lines("**bold** and `code` in file.py");
        assert_eq!(lines.len(), 1);
        let spans = &lines[0].spans;
        assert!(spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[2].style.fg, Some(Color::Yellow));
        assert_eq!(spans[4].style.fg, Some(Color::Cyan));
    }

    #[test]
    fn test_markdown_lines_bullets_and_headings() {
        let lines = markdown_lines("# Title\n- item one");
        assert!(lines[0].spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(lines[1].spans[0].content, "  • ");
    }

    #[test]
    fn test_score_style_thresholds() {
        assert_eq!(score_style(100).fg, Some(Color::Green));
        assert_eq!(score_style(80).fg, Some(Color::Green));
        assert_eq!(score_style(79).fg, Some(Color::Yellow));
        assert_eq!(score_style(49).fg, Some(Color::Red));
    }
}
