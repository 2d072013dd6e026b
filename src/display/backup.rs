//! Backup display formatting
//!
//! Formats backups for terminal output in list and detail views.

use chrono::{DateTime, Utc};

use crate::backup::BackupEntry;

/// Format a list of backups as a table, newest first as given
pub fn format_backup_list(backups: &[BackupEntry], now: DateTime<Utc>) -> String {
    if backups.is_empty() {
        return "No backups found.".to_string();
    }

    let name_width = backups.iter().map(|b| b.name.len()).max().unwrap_or(4).max(4);
    let reason_width = backups
        .iter()
        .map(|b| b.reason.len())
        .max()
        .unwrap_or(6)
        .max(6);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<name_width$}  {:<reason_width$}  {:>10}  {:>6}\n",
        "Name",
        "Reason",
        "Size",
        "Age",
        name_width = name_width,
        reason_width = reason_width,
    ));
    output.push_str(&format!(
        "{:-<name_width$}  {:-<reason_width$}  {:->10}  {:->6}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
        reason_width = reason_width,
    ));

    for backup in backups {
        output.push_str(&format!(
            "{:<name_width$}  {:<reason_width$}  {:>10}  {:>6}\n",
            backup.name,
            backup.reason,
            format_size(backup.size_bytes),
            format_duration(now.signed_duration_since(backup.created_at)),
            name_width = name_width,
            reason_width = reason_width,
        ));
    }

    output.push_str(&format!("\nTotal: {} backup(s)", backups.len()));
    output
}

/// Format one backup with its captured files
pub fn format_backup_details(backup: &BackupEntry) -> String {
    let mut output = String::new();
    output.push_str("Backup Details\n");
    output.push_str("==============\n");
    output.push_str(&format!("Name:     {}\n", backup.name));
    output.push_str(&format!("Location: {}\n", backup.path.display()));
    output.push_str(&format!(
        "Created:  {}\n",
        backup.created_at.format("%Y-%m-%d %H:%M:%S%.3f UTC")
    ));
    output.push_str(&format!("Reason:   {}\n", backup.reason));
    output.push_str(&format!("Size:     {}\n", format_size(backup.size_bytes)));

    if !backup.files.is_empty() {
        output.push_str("\nFiles:\n");
        for file in &backup.files {
            output.push_str(&format!("  {} ({})\n", file.path, format_size(file.size_bytes)));
        }
    }

    output
}

/// Format a duration in human-readable form
pub fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::CapturedFile;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn sample_entry() -> BackupEntry {
        BackupEntry {
            name: "backup-20250101-120000-000".to_string(),
            path: PathBuf::from("/backups/backup-20250101-120000-000"),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            reason: "pre-update".to_string(),
            files: vec![CapturedFile {
                path: "settings/settings.json".to_string(),
                size_bytes: 16,
            }],
            size_bytes: 2048,
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(17), "17 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::minutes(5)), "5m");
        assert_eq!(format_duration(chrono::Duration::hours(3)), "3h");
        assert_eq!(format_duration(chrono::Duration::days(2)), "2d");
        assert_eq!(format_duration(chrono::Duration::days(65)), "2mo");
        assert_eq!(format_duration(chrono::Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_format_empty_list() {
        assert_eq!(format_backup_list(&[], Utc::now()), "No backups found.");
    }

    #[test]
    fn test_format_list() {
        let entry = sample_entry();
        let now = entry.created_at + chrono::Duration::hours(2);
        let output = format_backup_list(&[entry], now);

        assert!(output.starts_with("Name"));
        assert!(output.contains("backup-20250101-120000-000  pre-update"));
        assert!(output.contains("2.0 KB"));
        assert!(output.contains("2h"));
        assert!(output.ends_with("Total: 1 backup(s)"));
    }

    #[test]
    fn test_format_details() {
        let output = format_backup_details(&sample_entry());
        assert!(output.contains("Reason:   pre-update"));
        assert!(output.contains("settings/settings.json (16 B)"));
        assert!(output.contains("2025-01-01 12:00:00.000 UTC"));
    }
}
