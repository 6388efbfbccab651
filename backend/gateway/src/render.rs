//! HTML rendering for the dashboards and live feed rows.

use std::collections::BTreeMap;
use std::fmt::Write;

use heartlog_core::{Event, SourceKey};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 1100px; margin: 2rem auto; padding: 0 1rem; background: #0d1117; color: #c9d1d9; }
nav a { color: #58a6ff; margin-right: 1rem; }
table { width: 100%; border-collapse: collapse; }
td { padding: 0.35rem 0.5rem; border-bottom: 1px solid #21262d; vertical-align: top; }
td.time { white-space: nowrap; color: #8b949e; }
pre { margin: 0; white-space: pre-wrap; }
.hours { display: flex; gap: 2px; }
.hour { width: 12px; height: 18px; border-radius: 2px; background: #21262d; }
.hour.on { background: #2ea043; }
"#;

// Prepends live log rows to the table. Heartbeat rows share the feed and are
// skipped; keepalive frames are ignored by EventSource.
const LIVE_SCRIPT: &str = r#"
const feed = new EventSource("/.sse");
feed.onmessage = (e) => {
  const tpl = document.createElement("template");
  tpl.innerHTML = e.data.trim();
  const row = tpl.content.firstElementChild;
  if (row && row.dataset.type === "event") {
    document.getElementById("events").prepend(row);
  }
};
"#;

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_time(event: &Event) -> String {
    event.created_at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Append one table row for `event` to `buf`.
pub fn write_event_row(buf: &mut String, event: &Event) {
    let _ = write!(
        buf,
        r#"<tr class="event-row" data-type="{kind}">
  <td class="time">{time}</td>
  <td class="origin">{origin}</td>
  <td class="owner">{owner}</td>
  <td class="body"><pre>{body}</pre></td>
</tr>
"#,
        kind = event.event_type,
        time = format_time(event),
        origin = html_escape(&event.origin),
        owner = html_escape(&event.owner),
        body = html_escape(&event.body),
    );
}

pub fn event_row(event: &Event) -> String {
    let mut buf = String::new();
    write_event_row(&mut buf, event);
    buf
}

fn layout(title: &str, content: &str, script: Option<&str>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<nav><a href="/">events</a><a href="/monitor">monitor</a></nav>
<h1>{title}</h1>
{content}
{script}
</body>
</html>"#,
        title = html_escape(title),
        style = STYLE,
        content = content,
        script = script
            .map(|s| format!("<script>{s}</script>"))
            .unwrap_or_default(),
    )
}

/// Events dashboard, newest first, with live updates.
pub fn events_page(events: &[Event]) -> String {
    let mut rows = String::new();
    for event in events {
        write_event_row(&mut rows, event);
    }

    let content = format!(
        r#"<form method="post" action="/.clear"><button type="submit">clear all</button></form>
<table>
<tbody id="events">
{rows}</tbody>
</table>"#
    );
    layout("events", &content, Some(LIVE_SCRIPT))
}

/// Monitor dashboard: one row of hourly cells per source, oldest hour first.
pub fn monitor_page(groups: &BTreeMap<SourceKey, Vec<bool>>, window_hours: usize) -> String {
    let mut rows = String::new();
    for (key, hours) in groups {
        let mut cells = String::new();
        for (idx, seen) in hours.iter().enumerate() {
            let ago = hours.len() - 1 - idx;
            let _ = write!(
                cells,
                r#"<span class="hour {state}" title="{ago}h ago"></span>"#,
                state = if *seen { "on" } else { "off" },
            );
        }
        let _ = writeln!(
            rows,
            r#"<tr><td class="source">{source}</td><td><div class="hours">{cells}</div></td></tr>"#,
            source = html_escape(&key.to_string()),
        );
    }

    let content = format!(
        r#"<p>last {window_hours} hours</p>
<table>
<tbody>
{rows}</tbody>
</table>"#
    );
    layout("monitor", &content, None)
}
