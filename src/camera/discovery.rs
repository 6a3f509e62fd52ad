use std::collections::BTreeSet;

use anyhow::Result;
use serde::Serialize;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoDevice {
    pub card: String,
    pub path: String,
    pub formats: Vec<String>,
}

/// Lists capture devices, preferring `v4l2-ctl` and falling back to `/dev/video*`.
pub async fn probe_devices() -> Result<Vec<VideoDevice>> {
    match v4l2_devices().await {
        Ok(list) if !list.is_empty() => Ok(list),
        _ => dev_nodes().await,
    }
}

async fn v4l2_devices() -> Result<Vec<VideoDevice>> {
    let output = Command::new("v4l2-ctl")
        .arg("--list-devices")
        .output()
        .await?;
    if !output.status.success() {
        return Ok(Vec::new());
    }

    let listing = String::from_utf8_lossy(&output.stdout);
    let mut devices = Vec::new();
    for (card, paths) in parse_device_listing(&listing) {
        for path in paths {
            let formats = device_formats(&path).await.unwrap_or_default();
            devices.push(VideoDevice {
                card: card.clone(),
                path,
                formats,
            });
        }
    }
    Ok(devices)
}

async fn device_formats(path: &str) -> Result<Vec<String>> {
    let output = Command::new("v4l2-ctl")
        .args(["--list-formats-ext", "-d", path])
        .output()
        .await?;
    if !output.status.success() {
        return Ok(Vec::new());
    }
    Ok(parse_formats(&String::from_utf8_lossy(&output.stdout)))
}

async fn dev_nodes() -> Result<Vec<VideoDevice>> {
    let mut paths = Vec::new();
    let mut dir = tokio::fs::read_dir("/dev").await?;
    while let Some(entry) = dir.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("video") {
            paths.push(format!("/dev/{name}"));
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| VideoDevice {
            card: "Detected video device".to_string(),
            path,
            formats: Vec::new(),
        })
        .collect())
}

/// Groups `v4l2-ctl --list-devices` output into `(card, [/dev/videoN])`.
fn parse_device_listing(listing: &str) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for raw in listing.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if raw.starts_with(' ') || raw.starts_with('\t') {
            if let Some((_, paths)) = groups.last_mut() {
                if line.starts_with("/dev/video") {
                    paths.push(line.to_string());
                }
            }
        } else {
            groups.push((line.trim_end_matches(':').to_string(), Vec::new()));
        }
    }
    groups.retain(|(_, paths)| !paths.is_empty());
    groups
}

fn parse_formats(listing: &str) -> Vec<String> {
    let mut formats = BTreeSet::new();
    for line in listing.lines() {
        let mut quoted = line.split('\'');
        if let (Some(_), Some(value)) = (quoted.next(), quoted.next()) {
            let value = value.trim();
            if !value.is_empty() {
                formats.insert(value.to_string());
            }
        }
    }
    formats.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_device_listing, parse_formats};

    #[test]
    fn groups_device_nodes_by_card() {
        let listing = "\
Integrated Camera: Integrated C (usb-0000:00:14.0-8):
\t/dev/video0
\t/dev/video1
\t/dev/media0

bcm2835-codec-decode (platform:bcm2835-codec):
\t/dev/media2
";
        let groups = parse_device_listing(listing);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, "Integrated Camera: Integrated C (usb-0000:00:14.0-8)");
        assert_eq!(groups[0].1, vec!["/dev/video0", "/dev/video1"]);
    }

    #[test]
    fn collects_distinct_pixel_formats() {
        let listing = "\
ioctl: VIDIOC_ENUM_FMT
\tType: Video Capture

\t[0]: 'MJPG' (Motion-JPEG, compressed)
\t\tSize: Discrete 1280x720
\t[1]: 'YUYV' (YUYV 4:2:2)
\t[2]: 'MJPG' (Motion-JPEG, compressed)
";
        assert_eq!(parse_formats(listing), vec!["MJPG", "YUYV"]);
    }
}
