mod common;

use common::{harness, id_rows, idle_harness, meta, RecordingStore, ScriptedClient};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::Mutex;

struct CaptureLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    lines: Mutex::new(Vec::new()),
};

fn install() {
    // Every test installs; only the first call succeeds.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Trace);
}

/// Lines at `level` containing every fragment in `needles`.
fn captured(level: Level, needles: &[&str]) -> Vec<String> {
    LOGGER
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|(line_level, line)| {
            *line_level == level && needles.iter().all(|needle| line.contains(needle))
        })
        .map(|(_, line)| line.clone())
        .collect()
}

#[test]
fn best_effort_range_exclusion_logs_a_warning() {
    install();
    let h = idle_harness();
    h.ctx
        .search_collections("articles")
        .exclude("released__range", vec![1990, 1999])
        .unwrap();

    let lines = captured(Level::Warn, &["event=exclude_range", "released__range"]);
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains("module=query"));
}

#[test]
fn dropped_rows_log_the_missing_record() {
    install();
    let client = ScriptedClient::new(meta(&[], 1), id_rows(&[(1, 4242)]));
    let h = harness(client, RecordingStore::default());
    let mut qs = h.ctx.search_collections("articles");
    assert!(qs.rows().unwrap().is_empty());

    let lines = captured(Level::Warn, &["event=record_missing", "local_id=4242"]);
    assert_eq!(lines.len(), 1, "{lines:?}");
}
