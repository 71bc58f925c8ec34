//! Per-channel logger with file and callback output.
//!
//! Each channel run gets its own logger that:
//! - Writes to a dedicated log file
//! - Sends messages to a callback (if provided)
//! - Keeps encoder output out of the log in compact mode
//! - Maintains a tail buffer of encoder output for failure diagnosis

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Local;
use parking_lot::Mutex;
use regex::Regex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// `frame=  123` in encoder progress output.
static FRAME_PROGRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"frame=\s*(\d+)").expect("valid regex"));

/// Per-channel logger with dual output (file + callback).
pub struct ChannelLogger {
    channel_name: String,
    log_path: PathBuf,
    file_writer: Mutex<Option<BufWriter<File>>>,
    callback: Option<LogCallback>,
    config: LogConfig,
    tail_buffer: Mutex<VecDeque<String>>,
    /// Last progress value logged (for compact mode filtering).
    last_progress: Mutex<Option<u32>>,
}

impl ChannelLogger {
    /// Create a logger writing to `<log_dir>/<channel_name>.log`.
    pub fn new(
        channel_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let channel_name = channel_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&channel_name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            channel_name,
            log_path,
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            callback,
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
            last_progress: Mutex::new(None),
        })
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        let msg = MessagePrefix::Warning.format(message);
        self.log(LogLevel::Warn, &msg);
    }

    pub fn error(&self, message: &str) {
        let msg = MessagePrefix::Error.format(message);
        self.log(LogLevel::Error, &msg);
    }

    /// Log a command being executed.
    pub fn command(&self, command: &str) {
        let msg = MessagePrefix::Command.format(command);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        let msg = MessagePrefix::Phase.format(phase_name);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a section marker.
    pub fn section(&self, section_name: &str) {
        let msg = MessagePrefix::Section.format(section_name);
        self.log(LogLevel::Info, &msg);
    }

    pub fn success(&self, message: &str) {
        let msg = MessagePrefix::Success.format(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Log progress update (filtered in compact mode).
    ///
    /// Returns true if the progress was logged, false if filtered.
    pub fn progress(&self, percent: u32) -> bool {
        let percent = percent.min(100);
        {
            let mut last = self.last_progress.lock();
            if self.config.compact {
                let step = self.config.progress_step.max(1);
                let current_step = percent / step;
                let filtered = match *last {
                    Some(prev) => current_step <= prev / step && !(percent == 100 && prev < 100),
                    None => current_step == 0 && percent < 100,
                };
                if filtered {
                    return false;
                }
            }
            *last = Some(percent);
        }

        self.log(LogLevel::Info, &format!("Progress: {}%", percent));
        true
    }

    /// Record one line of encoder output.
    ///
    /// Lines always enter the tail buffer; outside compact mode they are
    /// also written to the log. `frame=N` progress lines are turned into
    /// [`progress`](Self::progress) updates against `total_frames`.
    pub fn output_line(&self, line: &str, is_stderr: bool, total_frames: Option<usize>) {
        {
            let mut buffer = self.tail_buffer.lock();
            if self.config.error_tail > 0 {
                if buffer.len() >= self.config.error_tail {
                    buffer.pop_front();
                }
                buffer.push_back(line.to_string());
            }
        }

        if let Some(total) = total_frames.filter(|t| *t > 0) {
            if let Some(frame) = parse_frame_progress(line) {
                let percent = (frame.saturating_mul(100) / total as u64).min(100) as u32;
                self.progress(percent);
            }
        }

        if self.config.compact {
            return;
        }

        let prefix = if is_stderr { "[stderr] " } else { "" };
        let msg = format!("{}{}", prefix, line);
        self.output(&self.format_message(&msg));
    }

    /// Write the tail buffer to the log (typically after a failure).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    pub fn clear_tail(&self) {
        self.tail_buffer.lock().clear();
    }

    /// Current tail buffer contents.
    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Log encoder arguments one option per line.
    pub fn log_arguments_pretty(&self, program: &str, tokens: &[String]) {
        self.section("encoder options");
        let mut lines = vec![program.to_string()];
        let mut iter = tokens.iter().peekable();
        while let Some(token) = iter.next() {
            match iter.peek() {
                Some(next) if token.starts_with('-') && !next.starts_with('-') => {
                    lines.push(format!("{} {}", token, next));
                    iter.next();
                }
                _ => lines.push(token.clone()),
            }
        }
        self.info(&lines.join(" \\\n  "));
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Flush and close the log file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = self.callback {
            callback(formatted);
        }
    }
}

impl Drop for ChannelLogger {
    fn drop(&mut self) {
        self.close();
    }
}

fn parse_frame_progress(line: &str) -> Option<u64> {
    FRAME_PROGRESS
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Builder for creating a ChannelLogger with fluent API.
pub struct ChannelLoggerBuilder {
    channel_name: String,
    log_dir: PathBuf,
    config: LogConfig,
    callback: Option<LogCallback>,
}

impl ChannelLoggerBuilder {
    pub fn new(channel_name: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            channel_name: channel_name.into(),
            log_dir: log_dir.into(),
            config: LogConfig::default(),
            callback: None,
        }
    }

    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn compact(mut self, compact: bool) -> Self {
        self.config.compact = compact;
        self
    }

    pub fn callback(mut self, callback: LogCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn build(self) -> std::io::Result<ChannelLogger> {
        ChannelLogger::new(self.channel_name, self.log_dir, self.config, self.callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = ChannelLogger::new("mobile", dir.path(), LogConfig::default(), None).unwrap();

        assert!(logger.log_path().exists());
        assert!(logger.log_path().ends_with("mobile.log"));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = ChannelLogger::new("mobile", dir.path(), LogConfig::default(), None).unwrap();

        logger.phase("Locate");
        logger.info("Found 8 frames");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("=== Locate ==="));
        assert!(content.contains("Found 8 frames"));
    }

    #[test]
    fn calls_callback() {
        let dir = tempdir().unwrap();
        let call_count = Arc::new(AtomicUsize::new(0));
        let count_clone = call_count.clone();

        let logger = ChannelLoggerBuilder::new("desktop", dir.path())
            .callback(Box::new(move |_msg| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }))
            .build()
            .unwrap();

        logger.info("Message 1");
        logger.warn("Message 2");
        logger.debug("filtered at info level");

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            progress_step: 20,
            ..LogConfig::default()
        };
        let logger = ChannelLogger::new("mobile", dir.path(), config, None).unwrap();

        assert!(!logger.progress(5));
        assert!(!logger.progress(15));
        assert!(logger.progress(20));
        assert!(!logger.progress(25));
        assert!(logger.progress(40));
        assert!(logger.progress(100));
        assert!(!logger.progress(100));
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            error_tail: 5,
            ..LogConfig::default()
        };
        let logger = ChannelLogger::new("mobile", dir.path(), config, None).unwrap();

        for i in 0..10 {
            logger.output_line(&format!("Line {}", i), false, None);
        }

        let tail = logger.get_tail();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0], "Line 5");
        assert_eq!(tail[4], "Line 9");
    }

    #[test]
    fn encoder_frame_lines_drive_progress() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        };
        let logger = ChannelLogger::new("mobile", dir.path(), config, None).unwrap();

        logger.output_line("frame=   40 fps=0.0 q=28.0 size=0kB", true, Some(80));
        logger.output_line("frame=   80 fps=0.0 q=28.0 size=12kB", true, Some(80));
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("Progress: 50%"));
        assert!(content.contains("Progress: 100%"));
        // Compact mode keeps the raw lines out of the log
        assert!(!content.contains("fps=0.0"));
    }

    #[test]
    fn parses_frame_counter() {
        assert_eq!(parse_frame_progress("frame=  123 fps=25"), Some(123));
        assert_eq!(parse_frame_progress("frame=7"), Some(7));
        assert_eq!(parse_frame_progress("Stream mapping:"), None);
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("has/slash"), "has_slash");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
