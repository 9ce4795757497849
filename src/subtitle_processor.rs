use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;

use crate::file_utils::FileManager;

// @module: SRT parsing and assembly

// @const: SRT timing line regex, accepts ',' or '.' before milliseconds
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})")
        .expect("valid SRT timing regex")
});

// @struct: Single subtitle cue
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    // @field: Sequence number as found in the source file
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Cue text, lines joined with '\n'
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    /// Parse an SRT timestamp (`HH:MM:SS,mmm`) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(
            f,
            "{} --> {}",
            Self::format_timestamp(self.start_time_ms),
            Self::format_timestamp(self.end_time_ms)
        )?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Ordered subtitle cues of one SRT document
#[derive(Debug, Clone, Default)]
pub struct SubtitleCollection {
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    pub fn new(entries: Vec<SubtitleEntry>) -> Self {
        Self { entries }
    }

    /// Decode a downloaded body and parse it
    ///
    /// Bodies are decoded lossily as UTF-8 so that a stray Latin-1 byte does
    /// not throw away the whole track.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let content = String::from_utf8_lossy(bytes);
        Self::parse_srt_string(&content)
    }

    /// Parse SRT content, keeping cue order and numbering as found
    ///
    /// Blocks without a timing line or without text are skipped. Fails when
    /// no cue survives.
    pub fn parse_srt_string(content: &str) -> Result<Self> {
        let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n").replace('\r', "\n");
        let mut entries = Vec::new();
        let mut skipped = 0usize;

        for block in content.split("\n\n") {
            let lines: Vec<&str> = block.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()).collect();
            if lines.is_empty() {
                continue;
            }

            // The timing line is the first or, after a sequence number, the second line
            let timing_index = match lines.iter().take(2).position(|l| TIMESTAMP_REGEX.is_match(l)) {
                Some(index) => index,
                None => {
                    skipped += 1;
                    continue;
                }
            };

            let caps = match TIMESTAMP_REGEX.captures(lines[timing_index]) {
                Some(caps) => caps,
                None => {
                    skipped += 1;
                    continue;
                }
            };
            let (start_ms, end_ms) = match (Self::timestamp_from_caps(&caps, 1), Self::timestamp_from_caps(&caps, 5)) {
                (Ok(start), Ok(end)) => (start, end),
                _ => {
                    skipped += 1;
                    continue;
                }
            };

            let text = lines[timing_index + 1..].join("\n");
            if text.trim().is_empty() {
                skipped += 1;
                continue;
            }

            let seq_num = if timing_index == 1 {
                lines[0].trim().parse::<usize>().unwrap_or(entries.len() + 1)
            } else {
                entries.len() + 1
            };

            entries.push(SubtitleEntry::new(seq_num, start_ms, end_ms, text));
        }

        if skipped > 0 {
            warn!("Skipped {} malformed subtitle blocks", skipped);
        }

        if entries.is_empty() {
            return Err(anyhow!("No valid subtitle entries were found in the SRT content"));
        }

        debug!("Parsed {} subtitle entries", entries.len());
        Ok(Self { entries })
    }

    fn timestamp_from_caps(caps: &regex::Captures, start_idx: usize) -> Result<u64> {
        let hours: u64 = caps[start_idx].parse()?;
        let minutes: u64 = caps[start_idx + 1].parse()?;
        let seconds: u64 = caps[start_idx + 2].parse()?;
        let millis_raw = &caps[start_idx + 3];
        // "5" after the separator means 500 ms, not 5 ms
        let millis: u64 = format!("{:0<3}", millis_raw).parse()?;
        if minutes >= 60 || seconds >= 60 {
            return Err(anyhow!("Invalid time components"));
        }
        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Cue texts in order, one translation unit per cue
    pub fn texts(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.text.clone()).collect()
    }

    /// Copy of this collection with every cue text replaced, timings kept
    pub fn with_texts(&self, texts: &[String]) -> Result<Self> {
        if texts.len() != self.entries.len() {
            return Err(anyhow!(
                "Cannot rebuild subtitles: {} cues but {} texts",
                self.entries.len(),
                texts.len()
            ));
        }

        let entries = self
            .entries
            .iter()
            .zip(texts)
            .map(|(entry, text)| SubtitleEntry {
                text: text.trim().to_string(),
                ..entry.clone()
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn to_srt_string(&self) -> String {
        self.entries.iter().map(|e| e.to_string()).collect()
    }

    /// Write subtitles to an SRT file, replacing any existing file atomically
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        FileManager::replace_file(path, &self.to_srt_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
