//! Entry naming for the snapshot store
//!
//! Promoted entries are named `backup-YYYYMMDD-HHMMSS-mmm`, optionally followed
//! by `-N` (N >= 2) when another entry already holds the same millisecond.
//! In-progress and being-deleted entries live under reserved dot-prefixes and
//! never parse as entry names.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use uuid::Uuid;

const ENTRY_PREFIX: &str = "backup-";

/// Prefix of entries still being written
const TEMP_PREFIX: &str = ".tmp-";

/// Prefix of entries that have been withdrawn and are being removed
const TRASH_PREFIX: &str = ".trash-";

/// Parsed name of a promoted entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryName {
    timestamp: DateTime<Utc>,
    sequence: u32,
}

impl EntryName {
    /// Name for a backup taken at `timestamp`, truncated to milliseconds
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        let millis = timestamp.timestamp_subsec_millis();
        let timestamp = timestamp
            .with_nanosecond(millis * 1_000_000)
            .unwrap_or(timestamp);
        Self {
            timestamp,
            sequence: 1,
        }
    }

    /// The same timestamp with the given disambiguating sequence number
    pub fn with_sequence(self, sequence: u32) -> Self {
        Self {
            sequence: sequence.max(1),
            ..self
        }
    }

    /// The following name at the same timestamp, or None once the sequence
    /// space is exhausted
    pub fn successor(self) -> Option<Self> {
        self.sequence.checked_add(1).map(|sequence| self.with_sequence(sequence))
    }

    /// Parse a directory name, returning None for anything that is not an entry
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(ENTRY_PREFIX)?;

        // Expected: YYYYMMDD-HHMMSS-mmm or YYYYMMDD-HHMMSS-mmm-N
        let parts: Vec<&str> = rest.split('-').collect();
        if parts.len() < 3 || parts.len() > 4 {
            return None;
        }

        let (date_part, time_part, millis_part) = (parts[0], parts[1], parts[2]);
        if date_part.len() != 8 || time_part.len() != 6 || millis_part.len() != 3 {
            return None;
        }
        if !rest.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
            return None;
        }

        let sequence: u32 = match parts.get(3) {
            // Suffixes start at 2 and carry no leading zeros
            Some(seq) => {
                if seq.starts_with('0') {
                    return None;
                }
                let seq: u32 = seq.parse().ok()?;
                if seq < 2 {
                    return None;
                }
                seq
            }
            None => 1,
        };

        let year: i32 = date_part[0..4].parse().ok()?;
        let month: u32 = date_part[4..6].parse().ok()?;
        let day: u32 = date_part[6..8].parse().ok()?;
        let hour: u32 = time_part[0..2].parse().ok()?;
        let minute: u32 = time_part[2..4].parse().ok()?;
        let second: u32 = time_part[4..6].parse().ok()?;
        let millis: u32 = millis_part.parse().ok()?;

        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;
        let timestamp = DateTime::from_naive_utc_and_offset(NaiveDateTime::new(date, time), Utc);

        Some(Self {
            timestamp,
            sequence,
        })
    }

    /// Creation time encoded in the name
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Disambiguating sequence number (1 when the name has no suffix)
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}-{:03}",
            ENTRY_PREFIX,
            self.timestamp.format("%Y%m%d-%H%M%S"),
            self.timestamp.timestamp_subsec_millis()
        )?;
        if self.sequence > 1 {
            write!(f, "-{}", self.sequence)?;
        }
        Ok(())
    }
}

impl Ord for EntryName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for EntryName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Fresh directory name for an in-progress entry
pub fn temp_name() -> String {
    format!("{}{}", TEMP_PREFIX, Uuid::new_v4())
}

/// Fresh directory name for an entry being deleted
pub fn trash_name() -> String {
    format!("{}{}", TRASH_PREFIX, Uuid::new_v4())
}

/// Whether a directory name belongs to an unfinished create or delete
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) || name.starts_with(TRASH_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    fn sample_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 27, 14, 30, 22).unwrap()
            + chrono::Duration::milliseconds(456)
    }

    #[test]
    fn test_format_entry_name() {
        let name = EntryName::at(sample_time());
        assert_eq!(name.to_string(), "backup-20251127-143022-456");
        assert_eq!(
            name.with_sequence(3).to_string(),
            "backup-20251127-143022-456-3"
        );
    }

    #[test]
    fn test_successor_stops_at_sequence_limit() {
        let name = EntryName::at(sample_time());
        assert_eq!(name.successor().unwrap().sequence(), 2);

        let last = EntryName::parse("backup-20251127-143022-456-4294967295").unwrap();
        assert_eq!(last.sequence(), u32::MAX);
        assert!(last.successor().is_none());
    }

    #[test]
    fn test_parse_entry_name() {
        let name = EntryName::parse("backup-20251127-143022-456").unwrap();
        assert_eq!(name.timestamp().year(), 2025);
        assert_eq!(name.timestamp().month(), 11);
        assert_eq!(name.timestamp().day(), 27);
        assert_eq!(name.timestamp().timestamp_subsec_millis(), 456);
        assert_eq!(name.sequence(), 1);

        let name = EntryName::parse("backup-20251127-143022-456-12").unwrap();
        assert_eq!(name.sequence(), 12);
        assert_eq!(name.to_string(), "backup-20251127-143022-456-12");
    }

    #[test]
    fn test_rejects_non_entry_names() {
        assert!(EntryName::parse("backup-20251127-143022").is_none());
        assert!(EntryName::parse("backup-20251327-143022-456").is_none());
        assert!(EntryName::parse("backup-20251127-143022-456-1").is_none());
        assert!(EntryName::parse("backup-20251127-143022-456-02").is_none());
        assert!(EntryName::parse("backup-20251127-143022-456.json").is_none());
        assert!(EntryName::parse("backup-+0251127-143022-456").is_none());
        assert!(EntryName::parse("../backup-20251127-143022-456").is_none());
        assert!(EntryName::parse(&temp_name()).is_none());
        assert!(EntryName::parse(&trash_name()).is_none());
    }

    #[test]
    fn test_at_truncates_to_millis() {
        let precise = sample_time() + chrono::Duration::nanoseconds(789_123);
        let name = EntryName::at(precise);
        assert_eq!(name, EntryName::at(sample_time()));
        assert_eq!(EntryName::parse(&name.to_string()), Some(name));
    }

    #[test]
    fn test_ordering_uses_sequence_after_timestamp() {
        let first = EntryName::at(sample_time());
        let second = first.with_sequence(2);
        let later = EntryName::at(sample_time() + chrono::Duration::milliseconds(1));

        assert!(first < second);
        assert!(second < later);
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved(&temp_name()));
        assert!(is_reserved(&trash_name()));
        assert!(!is_reserved("backup-20251127-143022-456"));
    }
}
