//! # Report Sinks
//!
//! The dump code writes whole lines through [`LogSink`]. A sink never reports
//! failure back to the caller: we are describing a crash and must keep going
//! whatever happens to one of the output streams.
//!
//! Two sinks ship with the crate:
//!
//! - [`ReportLog`]: routes each line by its [`ScopeFlags`] to the tombstone
//!   file, the system log (`tracing`) and an optional crash collector stream.
//! - [`CapturedLog`]: keeps the lines in memory, with their scopes.

use std::io::{self, Write};

use tracing::{info, warn};

use crate::scope::ScopeFlags;

/// `tracing` target used when report lines are mirrored to the system log.
pub const REPORT_TARGET: &str = "tombstone::report";

/// Append-only destination for report lines
///
/// `line` never contains the trailing newline. An empty `line` is a blank
/// separator line.
pub trait LogSink
{
    /// Append one line with the given scope.
    fn log_line(&mut self, scope: ScopeFlags, line: &str);
}

impl<S: LogSink + ?Sized> LogSink for &mut S
{
    fn log_line(&mut self, scope: ScopeFlags, line: &str)
    {
        (**self).log_line(scope, line);
    }
}

/// Tombstone writer with scope-based routing
///
/// Routing rules:
///
/// | destination         | condition                                   |
/// |---------------------|---------------------------------------------|
/// | tombstone writer    | always (when present)                       |
/// | system log          | `AT_FAULT` and the log is not quiet         |
/// | collector stream    | `AT_FAULT` and not `SENSITIVE` (when present) |
///
/// ## Example
///
/// ```rust
/// use tombstone_core::log::{LogSink, ReportLog};
/// use tombstone_core::ScopeFlags;
///
/// let mut log = ReportLog::new(Vec::new()).quiet(true);
/// log.log_line(ScopeFlags::AT_FAULT, "    x0   0000000000000000");
/// let bytes = log.into_tombstone().unwrap();
/// assert_eq!(bytes, b"    x0   0000000000000000\n");
/// ```
pub struct ReportLog<W, C = io::Sink>
{
    tombstone: Option<W>,
    collector: Option<C>,
    quiet: bool,
    write_failures: usize,
}

impl<W: Write> ReportLog<W>
{
    /// Create a log that writes every line to `tombstone`.
    pub fn new(tombstone: W) -> Self
    {
        Self {
            tombstone: Some(tombstone),
            collector: None,
            quiet: false,
            write_failures: 0,
        }
    }
}

impl ReportLog<io::Sink>
{
    /// Create a log with no tombstone writer (system log and collector only).
    pub fn without_tombstone() -> Self
    {
        Self {
            tombstone: None,
            collector: None,
            quiet: false,
            write_failures: 0,
        }
    }
}

impl<W: Write, C: Write> ReportLog<W, C>
{
    /// Also send non-sensitive lines about the faulting thread to `collector`.
    pub fn with_collector<C2: Write>(self, collector: C2) -> ReportLog<W, C2>
    {
        ReportLog {
            tombstone: self.tombstone,
            collector: Some(collector),
            quiet: self.quiet,
            write_failures: self.write_failures,
        }
    }

    /// Stop mirroring lines to the system log.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self
    {
        self.quiet = quiet;
        self
    }

    /// Number of lines that failed to reach one of the writers.
    pub fn write_failures(&self) -> usize
    {
        self.write_failures
    }

    /// Flush both writers, ignoring errors beyond counting them.
    pub fn flush(&mut self)
    {
        let tombstone = self.tombstone.as_mut().map(Write::flush);
        let collector = self.collector.as_mut().map(Write::flush);
        for result in [tombstone, collector].into_iter().flatten() {
            if let Err(err) = result {
                self.record_failure(&err);
            }
        }
    }

    /// Give back the tombstone writer.
    pub fn into_tombstone(self) -> Option<W>
    {
        self.tombstone
    }

    fn record_failure(&mut self, err: &io::Error)
    {
        if self.write_failures == 0 {
            warn!(error = %err, "report write failed, further failures are only counted");
        }
        self.write_failures += 1;
    }
}

impl<W: Write, C: Write> LogSink for ReportLog<W, C>
{
    fn log_line(&mut self, scope: ScopeFlags, line: &str)
    {
        if let Some(tombstone) = self.tombstone.as_mut() {
            if let Err(err) = writeln!(tombstone, "{line}") {
                self.record_failure(&err);
            }
        }

        if scope.is_at_fault() && !self.quiet {
            info!(target: REPORT_TARGET, sensitive = scope.is_sensitive(), "{line}");
        }

        if scope.is_at_fault() && !scope.is_sensitive() {
            if let Some(collector) = self.collector.as_mut() {
                if let Err(err) = writeln!(collector, "{line}") {
                    self.record_failure(&err);
                }
            }
        }
    }
}

/// In-memory sink that keeps every line with its scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedLog
{
    lines: Vec<(ScopeFlags, String)>,
}

impl CapturedLog
{
    /// Create an empty log.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// All lines with their scopes, in order.
    pub fn entries(&self) -> &[(ScopeFlags, String)]
    {
        &self.lines
    }

    /// Lines only, in order.
    pub fn lines(&self) -> impl Iterator<Item = &str>
    {
        self.lines.iter().map(|(_, line)| line.as_str())
    }

    /// Render as the text a tombstone file would contain.
    pub fn text(&self) -> String
    {
        let mut out = String::new();
        for line in self.lines() {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl LogSink for CapturedLog
{
    fn log_line(&mut self, scope: ScopeFlags, line: &str)
    {
        self.lines.push((scope, line.to_owned()));
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    /// Writer that fails every write.
    struct Broken;

    impl Write for Broken
    {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize>
        {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()>
        {
            Ok(())
        }
    }

    #[test]
    fn collector_skips_sensitive_and_bystander_lines()
    {
        let mut log = ReportLog::new(Vec::new()).quiet(true).with_collector(Vec::new());
        log.log_line(ScopeFlags::AT_FAULT, "fault");
        log.log_line(ScopeFlags::AT_FAULT.sensitive(), "secret");
        log.log_line(ScopeFlags::BYSTANDER, "other thread");

        let collector = log.collector.take().unwrap();
        assert_eq!(String::from_utf8(collector).unwrap(), "fault\n");

        let tombstone = log.into_tombstone().unwrap();
        assert_eq!(String::from_utf8(tombstone).unwrap(), "fault\nsecret\nother thread\n");
    }

    #[test]
    fn write_errors_are_counted_not_raised()
    {
        let mut log = ReportLog::new(Broken).quiet(true);
        log.log_line(ScopeFlags::AT_FAULT, "one");
        log.log_line(ScopeFlags::AT_FAULT, "two");
        assert_eq!(log.write_failures(), 2);
    }

    #[test]
    fn captured_log_text()
    {
        let mut log = CapturedLog::new();
        log.log_line(ScopeFlags::AT_FAULT, "");
        log.log_line(ScopeFlags::AT_FAULT, "code around pc:");
        assert_eq!(log.text(), "\ncode around pc:\n");
        assert_eq!(log.entries().len(), 2);
    }
}
