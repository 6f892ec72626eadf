//! Application execution: streams input lines through the line statistics worker

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::active::{
    ActiveBehavior, ActiveObject, ActiveObjectConfig, ActiveObjectError, ActiveObjectStats,
    ProcessingContext, ReplySender,
};
use crate::notifications::ProcessingFailure;
use crate::queue::QueueError;
use crate::{cli, config};

use super::initialization::worker_config;

const FULL_QUEUE_RETRY: Duration = Duration::from_millis(1);

/// Running totals kept by the worker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineTotals {
    pub lines: u64,
    pub words: u64,
    pub bytes: u64,
    pub longest_line: usize,
}

impl LineTotals {
    fn add_line(&mut self, text: &str) {
        let content = text.trim_end_matches(['\n', '\r']);
        self.lines += 1;
        self.words += content.split_whitespace().count() as u64;
        self.bytes += text.len() as u64;
        self.longest_line = self.longest_line.max(content.chars().count());
    }
}

/// Messages accepted by the line statistics worker
#[derive(Debug)]
pub enum LineMessage {
    /// One input line, terminator included
    Line(String),
    /// Request for the totals so far
    Snapshot(ReplySender<LineTotals>),
    Stop,
}

/// Counts lines, words and bytes. Lines containing NUL bytes are refused.
#[derive(Debug, Default)]
pub struct LineStats {
    totals: LineTotals,
}

impl ActiveBehavior for LineStats {
    type Message = LineMessage;

    fn is_stop_message(message: &LineMessage) -> bool {
        matches!(message, LineMessage::Stop)
    }

    fn stop_message() -> LineMessage {
        LineMessage::Stop
    }

    fn process_message(&mut self, ctx: &ProcessingContext<'_, LineMessage>, message: &LineMessage) -> Result<()> {
        match message {
            LineMessage::Line(text) => {
                if text.contains('\0') {
                    bail!("binary content in input line {}", ctx.sequence() + 1);
                }
                self.totals.add_line(text);
            }
            LineMessage::Snapshot(reply) => {
                if !reply.send(self.totals.clone()) {
                    debug!("Snapshot requester no longer waiting");
                }
            }
            LineMessage::Stop => {}
        }
        Ok(())
    }

    fn after_process_messages(&mut self, ctx: &ProcessingContext<'_, LineMessage>) -> Result<()> {
        debug!("'{}' counted {} lines", ctx.name(), self.totals.lines);
        Ok(())
    }
}

/// Outcome of one run of the demo
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub totals: LineTotals,
    /// Lines refused by a full queue under the reject policy
    pub dropped_lines: u64,
    pub failures: Vec<ProcessingFailure>,
    pub worker: ActiveObjectStats,
}

/// Run the demo as configured by the command line and configuration file
pub fn run(args: &cli::Args, config: &config::ConfigManager) -> Result<RunReport> {
    let worker = worker_config(args, config)?;
    let reader = open_input(args.input.as_deref())?;
    process_input(reader, worker)
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file: {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Post every line of `reader` to a fresh worker and collect its totals
pub fn process_input<R: BufRead>(mut reader: R, worker: ActiveObjectConfig) -> Result<RunReport> {
    let object = ActiveObject::with_config(worker, LineStats::default())?;

    let failures = Arc::new(Mutex::new(Vec::new()));
    {
        let failures = Arc::clone(&failures);
        object.notifications().subscribe_exception(move |failure: &ProcessingFailure| {
            failures.lock().push(failure.clone());
        });
    }

    object
        .launch(object.config().start_timeout())
        .context("Failed to start line statistics worker")?;

    let mut dropped_lines = 0u64;
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        let read = reader.read_until(b'\n', &mut buffer)
            .context("Failed to read input")?;
        if read == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buffer).into_owned();
        match object.post(LineMessage::Line(line)) {
            Ok(()) => {}
            Err(QueueError::Full) => dropped_lines += 1,
            Err(e) => return Err(e).context("Worker stopped accepting input"),
        }
    }

    if dropped_lines > 0 {
        warn!("Dropped {} lines while the worker queue was full", dropped_lines);
    }

    let totals = request_totals(&object)?;
    if !object.stop_default() {
        bail!(
            "Worker '{}' did not stop within {}ms",
            object.name(),
            object.config().stop_timeout_ms
        );
    }

    let worker = object.stats();
    info!("{}", worker.summary());

    let failures = std::mem::take(&mut *failures.lock());
    Ok(RunReport {
        totals,
        dropped_lines,
        failures,
        worker,
    })
}

/// Ask the worker for its totals; the request queues behind every posted line
fn request_totals(object: &ActiveObject<LineStats>) -> Result<LineTotals> {
    let timeout = object.config().stop_timeout();
    let deadline = Instant::now().checked_add(timeout);
    loop {
        match object.request(LineMessage::Snapshot, timeout) {
            // A rejecting queue may still be full of lines
            Err(ActiveObjectError::Queue(QueueError::Full))
                if deadline.map_or(true, |deadline| Instant::now() < deadline) =>
            {
                thread::sleep(FULL_QUEUE_RETRY);
            }
            result => return result.context("Failed to collect totals from worker"),
        }
    }
}

/// Render the report as text or pretty JSON
pub fn render_report(report: &RunReport, json: bool) -> Result<String> {
    if json {
        let json = serde_json::to_string_pretty(report)
            .context("Failed to serialize report to JSON")?;
        return Ok(json + "\n");
    }

    let mut output = format!(
        "Lines: {} | Words: {} | Bytes: {}\nLongest line: {}\n",
        report.totals.lines, report.totals.words, report.totals.bytes, report.totals.longest_line
    );
    if report.dropped_lines > 0 {
        output.push_str(&format!("Dropped lines: {}\n", report.dropped_lines));
    }
    for failure in &report.failures {
        output.push_str(&format!("Rejected: {}\n", failure));
    }
    output.push_str(&format!("Worker: {}\n", report.worker.summary()));
    Ok(output)
}
