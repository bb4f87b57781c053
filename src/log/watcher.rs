//! # LogWatcher: tail a log file and wait for patterns.
//!
//! A watcher keeps two offsets into one file:
//! - `origin`: content before it is ignored by every search; set by
//!   [`LogWatcher::positioning`].
//! - `cursor`: end of the last incremental match; advanced by
//!   [`LogWatcher::seek_wait`] in [`StartAt::LastMatch`] mode.
//!
//! ## Rules
//! - `origin <= cursor` at all times.
//! - `cursor` never moves backward, so a sequence of `LastMatch` waits asserts
//!   that lines appear in that relative order.
//! - A pattern that does not appear before the deadline yields `Ok(false)`;
//!   only a dead process yields an error ([`StartError`]).
//! - Waiting sleeps per [`BackoffPolicy`]; it never spins.
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use testvisor::{LogWatcher, SeekOptions};
//!
//! # async fn demo() -> Result<(), testvisor::LogError> {
//! let mut log = LogWatcher::new("var/01_box/master.log");
//! log.positioning().await?;
//! // ... start the server ...
//! let ready = log
//!     .seek_wait("ready to accept requests", SeekOptions::new().timeout(Duration::from_secs(5)).from_last_match())
//!     .await?;
//! assert!(ready);
//! # Ok(())
//! # }
//! ```

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex_lite::Regex;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::{Instant, sleep};

use crate::core::Config;
use crate::error::{LogError, StartError};
use crate::log::Liveness;
use crate::policies::BackoffPolicy;

/// Where [`LogWatcher::seek_wait`] starts scanning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StartAt {
    /// Rescan everything after the origin; the cursor is left untouched.
    #[default]
    Origin,
    /// Continue after the previous `LastMatch` match; advances the cursor on success.
    LastMatch,
}

/// Options for [`LogWatcher::seek_wait`].
///
/// The deadline is an explicit instant if one is given, otherwise
/// `now + timeout` (default 10s).
pub struct SeekOptions<'a> {
    process: Option<&'a mut dyn Liveness>,
    name: Option<String>,
    deadline: Option<Instant>,
    timeout: Duration,
    start: StartAt,
}

impl<'a> SeekOptions<'a> {
    /// Timeout used when neither a deadline nor a timeout is set.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Options with no process, no name, a 10s timeout and [`StartAt::Origin`].
    pub fn new() -> Self {
        Self {
            process: None,
            name: None,
            deadline: None,
            timeout: Self::DEFAULT_TIMEOUT,
            start: StartAt::Origin,
        }
    }

    /// Fails the wait as soon as `process` has exited.
    pub fn process(mut self, process: &'a mut dyn Liveness) -> Self {
        self.process = Some(process);
        self
    }

    /// Instance name reported in the [`StartError`].
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Absolute deadline; takes precedence over [`timeout`](Self::timeout).
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Relative timeout, counted from the start of the wait.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Scan start selector.
    pub fn start(mut self, start: StartAt) -> Self {
        self.start = start;
        self
    }

    /// Shorthand for `start(StartAt::LastMatch)`.
    pub fn from_last_match(self) -> Self {
        self.start(StartAt::LastMatch)
    }
}

impl Default for SeekOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tails a single log file.
#[derive(Clone, Debug)]
pub struct LogWatcher {
    path: PathBuf,
    origin: u64,
    cursor: u64,
    poll: BackoffPolicy,
}

impl LogWatcher {
    /// Creates a watcher positioned at the beginning of `path` (which need not exist yet).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            origin: 0,
            cursor: 0,
            poll: BackoffPolicy::default(),
        }
    }

    /// Creates a watcher that polls with `cfg.poll`.
    pub fn with_config(path: impl Into<PathBuf>, cfg: &Config) -> Self {
        Self::new(path).with_poll(cfg.poll)
    }

    /// Replaces the idle-poll policy.
    pub fn with_poll(mut self, poll: BackoffPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Idle-poll policy in use.
    pub fn poll(&self) -> &BackoffPolicy {
        &self.poll
    }

    /// Path of the watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Offset before which content is ignored.
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Offset just past the last incremental match.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Marks the current end of the file as the origin.
    ///
    /// If the file does not exist yet the origin is left unchanged, so a file
    /// created later is searched from its first byte.
    pub async fn positioning(&mut self) -> io::Result<&mut Self> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => {
                self.origin = meta.len();
                self.cursor = self.cursor.max(self.origin);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        Ok(self)
    }

    /// Single pass from the origin to the end of the file looking for the
    /// literal `needle`.
    ///
    /// Returns the byte position of the needle inside the first matching line,
    /// or `None` if the file does not exist or no line contains it.
    pub async fn seek_once(&self, needle: &str) -> io::Result<Option<usize>> {
        let file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(self.origin)).await?;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(None);
            }
            let line = DecodedLine::new(&buf);
            if let Some(pos) = line.text.find(needle) {
                return Ok(Some(line.raw_offset(pos)));
            }
        }
    }

    /// Polls the file until a line matches `pattern` (regular-expression search)
    /// or the deadline passes.
    ///
    /// ### Flow
    /// 1. Wait until the file exists.
    /// 2. Seek to the origin or the cursor (see [`StartAt`]).
    /// 3. Until the deadline: fail if the process exited; read a line; at EOF
    ///    (or on an unterminated line that does not match yet) sleep and retry
    ///    from the same offset; on match return `Ok(true)`.
    ///
    /// ### Errors
    /// - [`LogError::Start`] when the watched process has exited. This is
    ///   checked before every read and wins over any match.
    /// - [`LogError::Pattern`] / [`LogError::Io`] for a bad pattern or a read failure.
    pub async fn seek_wait(
        &mut self,
        pattern: &str,
        opts: SeekOptions<'_>,
    ) -> Result<bool, LogError> {
        let re = Regex::new(pattern)?;
        let deadline = opts
            .deadline
            .unwrap_or_else(|| Instant::now() + opts.timeout);
        let SeekOptions {
            mut process,
            name,
            start,
            ..
        } = opts;

        let mut idle = 0u32;
        let file = loop {
            ensure_alive(&mut process, &name)?;
            match File::open(&self.path).await {
                Ok(f) => break f,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            if !self.nap(&mut idle, deadline).await {
                return Ok(false);
            }
        };

        let from = match start {
            StartAt::Origin => self.origin,
            StartAt::LastMatch => self.cursor,
        };
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(from)).await?;

        let mut line_start = from;
        let mut buf = Vec::new();
        idle = 0;
        while Instant::now() < deadline {
            ensure_alive(&mut process, &name)?;

            buf.clear();
            let n = reader.read_until(b'\n', &mut buf).await?;
            if n > 0 {
                let line = DecodedLine::new(&buf);
                if let Some(m) = re.find(line.text.trim_end_matches(['\n', '\r'])) {
                    if start == StartAt::LastMatch {
                        let end = line_start + line.raw_offset(m.end()) as u64;
                        self.cursor = self.cursor.max(end);
                    }
                    return Ok(true);
                }
                if buf.last() == Some(&b'\n') {
                    line_start += n as u64;
                    idle = 0;
                    continue;
                }
                reader.seek(SeekFrom::Start(line_start)).await?;
            }
            if !self.nap(&mut idle, deadline).await {
                break;
            }
        }
        Ok(false)
    }

    /// Sleeps for the next poll interval, never past `deadline`.
    ///
    /// Returns `false` without sleeping if the deadline has already passed.
    async fn nap(&self, idle: &mut u32, deadline: Instant) -> bool {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let pause = self.poll.next(*idle).min(deadline - now);
        *idle = idle.saturating_add(1);
        sleep(pause).await;
        true
    }
}

/// A lossily decoded log line that remembers where each decoded byte came from.
///
/// Every invalid sequence becomes one U+FFFD (three bytes), so offsets found in
/// `text` must go through [`DecodedLine::raw_offset`] before touching the file.
struct DecodedLine {
    text: String,
    /// `raw_end[i]`: raw offset just past the source of decoded byte `i`.
    raw_end: Vec<usize>,
}

impl DecodedLine {
    fn new(raw: &[u8]) -> Self {
        let mut text = String::with_capacity(raw.len());
        let mut raw_end = Vec::with_capacity(raw.len());
        let mut pos = 0;
        for chunk in raw.utf8_chunks() {
            let valid = chunk.valid();
            text.push_str(valid);
            raw_end.extend((1..=valid.len()).map(|i| pos + i));
            pos += valid.len();

            let invalid = chunk.invalid();
            if !invalid.is_empty() {
                pos += invalid.len();
                text.push(char::REPLACEMENT_CHARACTER);
                raw_end.extend([pos; 3]);
            }
        }
        Self { text, raw_end }
    }

    /// Raw byte offset corresponding to decoded offset `at` (a char boundary).
    fn raw_offset(&self, at: usize) -> usize {
        match at.checked_sub(1) {
            Some(i) => self.raw_end.get(i).copied().unwrap_or(0),
            None => 0,
        }
    }
}

fn ensure_alive(
    process: &mut Option<&mut dyn Liveness>,
    name: &Option<String>,
) -> Result<(), StartError> {
    if let Some(p) = process.as_deref_mut() {
        if p.has_exited() {
            return Err(StartError {
                name: name.clone(),
                timeout: None,
            });
        }
    }
    Ok(())
}
