use std::fmt::Write as _;

use crate::core::state::{MonitorSnapshot, SleepStatus};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; background: linear-gradient(135deg, #f8fafc, #f1f5f9); margin: 0; padding: 1rem; color: #1e293b; }
main { max-width: 72rem; margin: 0 auto; }
header { text-align: center; margin-bottom: 2rem; }
header p { color: #475569; }
.feed { position: relative; aspect-ratio: 16 / 9; background: #0f172a; border-radius: .75rem; overflow: hidden; margin-bottom: 2rem; }
.feed img { width: 100%; height: 100%; object-fit: cover; }
.overlay { position: absolute; top: 1rem; }
.overlay.left { left: 1rem; }
.overlay.right { right: 1rem; }
.badge { display: inline-flex; align-items: center; gap: .5rem; padding: .5rem 1rem; border-radius: 999px; background: #fff; font-size: .875rem; font-weight: 500; }
.badge.recording { background: #dc2626; color: #fff; }
.dot { width: .5rem; height: .5rem; border-radius: 50%; }
.green { background: #22c55e; } .red { background: #ef4444; } .yellow { background: #eab308; } .gray { background: #6b7280; } .rec { background: #f87171; }
.off { height: 100%; display: flex; flex-direction: column; align-items: center; justify-content: center; background: #1e293b; }
.off p { margin: .25rem; color: #cbd5e1; } .off small { color: #64748b; }
.controls { display: flex; justify-content: center; margin-bottom: 2rem; }
.controls button { padding: .75rem 2rem; font-size: 1.125rem; border: 0; border-radius: .5rem; color: #fff; cursor: pointer; }
.start { background: #16a34a; } .stop { background: #dc2626; }
.legend { display: grid; grid-template-columns: repeat(auto-fit, minmax(14rem, 1fr)); gap: 1rem; }
.card { background: #fff; border-radius: .75rem; padding: 1.5rem; text-align: center; }
.card .dot { width: 1.5rem; height: 1.5rem; margin: 0 auto .75rem; }
.card p { font-size: .875rem; color: #475569; }
dialog { border: 0; border-radius: .75rem; padding: 1.5rem; }
"#;

const LEGEND: [(SleepStatus, &str, &str); 3] = [
    (SleepStatus::Awake, "Awake", "Eyes open and alert"),
    (SleepStatus::Sleeping, "Sleeping", "Eyes closed, sleeping detected"),
    (SleepStatus::NoFaceDetected, "No Face", "Face not detected in frame"),
];

const REFRESH_SCRIPT: &str = r#"
setInterval(async () => {
  const badge = document.getElementById("status-badge");
  if (!badge) return;
  const res = await fetch("/status");
  if (res.ok) badge.outerHTML = await res.text();
}, 1000);
"#;

/// The live status badge. Served on its own so the page can refresh it
/// without restarting the preview stream.
pub fn status_badge(status: SleepStatus) -> String {
    format!(
        "<span id=\"status-badge\" class=\"badge\"><span class=\"dot {}\"></span>{}</span>",
        status.color(),
        status.label()
    )
}

pub fn page(app_name: &str, snapshot: &MonitorSnapshot) -> String {
    let app_name = escape(app_name);
    let mut html = String::with_capacity(4096);

    let _ = write!(
        html,
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{app_name}</title><style>{STYLE}</style></head><body><main>\
         <header><h1>{app_name}</h1><p>Real-time sleep status monitoring</p></header>"
    );

    html.push_str("<section class=\"feed\">");
    if snapshot.recording {
        let _ = write!(
            html,
            "<img src=\"/preview\" alt=\"Live camera preview\">\
             <div class=\"overlay left\">{}</div>\
             <div class=\"overlay right\"><span class=\"badge recording\">\
             <span class=\"dot rec\"></span>Recording</span></div>",
            status_badge(snapshot.status)
        );
    } else {
        html.push_str(
            "<div class=\"off\"><p>Camera is off</p>\
             <small>Click \"Start Camera\" to begin monitoring</small></div>",
        );
    }
    html.push_str("</section>");

    let (action, class, label) = if snapshot.recording {
        ("/stop", "stop", "Stop Camera")
    } else {
        ("/start", "start", "Start Camera")
    };
    let _ = write!(
        html,
        "<form class=\"controls\" method=\"post\" action=\"{action}\">\
         <button class=\"{class}\" type=\"submit\">{label}</button></form>"
    );

    html.push_str("<section class=\"legend\">");
    for (status, title, description) in LEGEND {
        let _ = write!(
            html,
            "<div class=\"card\"><div class=\"dot {}\"></div><h3>{title}</h3><p>{description}</p></div>",
            status.color()
        );
    }
    html.push_str("</section>");

    if let Some(notice) = &snapshot.notice {
        let _ = write!(
            html,
            "<dialog open><p>{}</p><form method=\"post\" action=\"/notice/dismiss\">\
             <button type=\"submit\">OK</button></form></dialog>",
            escape(notice)
        );
    }

    if snapshot.recording {
        let _ = write!(html, "<script>{REFRESH_SCRIPT}</script>");
    }
    html.push_str("</main></body></html>");
    html
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{page, status_badge};
    use crate::core::state::{MonitorSnapshot, SleepStatus};

    fn recording(status: SleepStatus) -> MonitorSnapshot {
        MonitorSnapshot {
            recording: true,
            connected: true,
            status,
            notice: None,
        }
    }

    #[test]
    fn stopped_page_shows_placeholder_and_start_button() {
        let html = page("Sleep Detection Monitor", &MonitorSnapshot::default());
        assert!(html.contains("Camera is off"));
        assert!(html.contains("action=\"/start\""));
        assert!(html.contains("Start Camera"));
        assert!(!html.contains("/preview"));
        assert!(!html.contains("Recording"));
        assert!(!html.contains("<dialog"));
    }

    #[test]
    fn recording_page_shows_preview_badge_and_indicator() {
        let html = page("Sleep Detection Monitor", &recording(SleepStatus::Sleeping));
        assert!(html.contains("src=\"/preview\""));
        assert!(html.contains("<span class=\"dot red\"></span>Sleeping"));
        assert!(html.contains("Recording</span>"));
        assert!(html.contains("action=\"/stop\""));
        assert!(html.contains("Stop Camera"));
        assert!(!html.contains("Camera is off"));
    }

    #[test]
    fn legend_lists_the_three_active_states() {
        let html = page("x", &MonitorSnapshot::default());
        assert_eq!(html.matches("class=\"card\"").count(), 3);
        assert!(html.contains("Eyes open and alert"));
        assert!(html.contains("Eyes closed, sleeping detected"));
        assert!(html.contains("Face not detected in frame"));
    }

    #[test]
    fn badge_follows_status() {
        assert!(status_badge(SleepStatus::Awake).contains("dot green\"></span>Awake"));
        assert!(
            status_badge(SleepStatus::NoFaceDetected)
                .contains("dot yellow\"></span>No Face Detected")
        );
        assert!(status_badge(SleepStatus::CameraOff).contains("dot gray\"></span>Camera Off"));
    }

    #[test]
    fn notice_is_rendered_as_escaped_modal() {
        let snapshot = MonitorSnapshot {
            notice: Some("Could not access <camera>".to_string()),
            ..MonitorSnapshot::default()
        };
        let html = page("A & B", &snapshot);
        assert!(html.contains("<dialog open><p>Could not access &lt;camera&gt;</p>"));
        assert!(html.contains("<title>A &amp; B</title>"));
    }
}
