//! Integration tests for the growing-schema CSV output

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tablog::csv_output::{CsvOutput, WARNING_TARGET};
use tablog::error::TablogError;
use tablog::input::{InputKind, LogInput, LogOutput};
use tablog::tabular::TabularInput;
use tempfile::tempdir;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Counts warnings emitted on the CSV output target.
struct WarningCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for WarningCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() == WARNING_TARGET
            && *event.metadata().level() == tracing::Level::WARN
        {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Runs `f` with a subscriber counting drift warnings; returns the count.
fn count_warnings<F: FnOnce()>(f: F) -> usize {
    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarningCounter(count.clone()));
    tracing::subscriber::with_default(subscriber, f);
    count.load(Ordering::SeqCst)
}

/// Counts debug events reporting a CSV row append.
struct AppendCounter(Arc<AtomicUsize>);

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for AppendCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != tracing::Level::DEBUG {
            return;
        }
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        if visitor.0 == "appended CSV row" {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Helper: read the header and data rows of a CSV file
fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

fn write(output: &mut CsvOutput, tabular: &TabularInput) {
    output.record(LogInput::Tabular(tabular)).unwrap();
}

/// `{foo:1}`, `{foo:2, bar:20}`, `{foo:3, bar:30}` reads back with the first
/// row blank-filled under the final header.
#[test]
fn test_migration_preserves_history() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.csv");

    let mut output = CsvOutput::new(&path).unwrap();
    write(&mut output, &[("foo", 1)].into_iter().collect());
    write(&mut output, &[("foo", 2), ("bar", 20)].into_iter().collect());
    write(&mut output, &[("foo", 3), ("bar", 30)].into_iter().collect());
    output.close().unwrap();

    let (header, rows) = read_csv(&path);
    assert_eq!(header, vec!["foo", "bar"]);
    assert_eq!(rows, vec![vec!["1", ""], vec!["2", "20"], vec!["3", "30"]]);
}

/// A training loop that starts logging a new key after its first iteration.
#[test]
fn test_growing_schema_training_loop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("progress.csv");

    let mut output = CsvOutput::new(&path).unwrap();
    let mut tabular = TabularInput::new();
    for i in 0..4i64 {
        tabular.record("itr", i);
        tabular.record("loss", 100.0 / (2.0 + i as f64));
        if i > 0 {
            tabular.record("new_data", i);
        }
        let ack = output.record(LogInput::Tabular(&tabular)).unwrap();
        tabular.acknowledge(&ack);
        output.flush().unwrap();
    }
    output.close().unwrap();

    let (header, rows) = read_csv(&path);
    assert_eq!(header, vec!["itr", "loss", "new_data"]);
    assert_eq!(
        rows,
        vec![
            vec!["0", "50.0", ""],
            vec!["1", "33.333333333333336", "1"],
            vec!["2", "25.0", "2"],
            vec!["3", "20.0", "3"],
        ]
    );
    assert_eq!(tabular.unmarked_keys().count(), 0);
}

/// Two keys introduced one after the other in the same loop.
#[test]
fn test_two_step_growth() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("progress.csv");

    let mut output = CsvOutput::new(&path).unwrap();
    let mut tabular = TabularInput::new();
    for i in 0..4i64 {
        tabular.record("itr", i);
        tabular.record("multiplied_data", i * 2);
        if i * 2 >= 1 {
            tabular.record("new_multiplied_data", i * 4);
        }
        write(&mut output, &tabular);
    }
    output.close().unwrap();

    let (header, rows) = read_csv(&path);
    assert_eq!(header, vec!["itr", "multiplied_data", "new_multiplied_data"]);
    assert_eq!(rows[0], vec!["0", "0", ""]);
    assert_eq!(rows[3], vec!["3", "6", "12"]);
    assert_eq!(output.diagnostics().seen_count(), 1);
}

#[test]
fn test_warn_once_per_distinct_drift() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.csv");

    let emitted = count_warnings(|| {
        let mut output = CsvOutput::new(&path).unwrap();
        write(&mut output, &[("foo", 1)].into_iter().collect());
        // drift: bar
        write(&mut output, &[("foo", 2), ("bar", 20)].into_iter().collect());
        // same shape again, no drift left
        write(&mut output, &[("foo", 2), ("bar", 20)].into_iter().collect());
        // drift: baz
        write(&mut output, &[("baz", 1)].into_iter().collect());
        output.close().unwrap();
    });

    assert_eq!(emitted, 2);
}

#[test]
fn test_identical_drift_message_collapses() {
    let dir = tempdir().unwrap();

    // Reporting the same drift message again is swallowed
    let emitted = count_warnings(|| {
        let mut output = CsvOutput::new(&dir.path().join("out.csv")).unwrap();
        write(&mut output, &[("foo", 1)].into_iter().collect());
        write(&mut output, &[("foo", 2), ("bar", 20)].into_iter().collect());
        let message = tablog::csv_output::drift_message(&["bar"]);
        assert!(!output.diagnostics_mut().warn_once(&message));
    });

    assert_eq!(emitted, 1);
}

#[test]
fn test_disabled_diagnostics_same_output() {
    let dir = tempdir().unwrap();
    let enabled_path = dir.path().join("enabled.csv");
    let disabled_path = dir.path().join("disabled.csv");

    let records: Vec<TabularInput> = vec![
        [("a", 1)].into_iter().collect(),
        [("a", 2), ("b", 3)].into_iter().collect(),
        [("c", 4)].into_iter().collect(),
        [("a", 5), ("d", 6)].into_iter().collect(),
    ];

    let enabled = count_warnings(|| {
        let mut output = CsvOutput::new(&enabled_path).unwrap();
        for record in &records {
            write(&mut output, record);
        }
        output.close().unwrap();
    });
    let disabled = count_warnings(|| {
        let mut output = CsvOutput::new(&disabled_path).unwrap();
        output.disable_warnings();
        for record in &records {
            write(&mut output, record);
        }
        output.close().unwrap();
    });

    assert_eq!(enabled, 3);
    assert_eq!(disabled, 0);
    assert_eq!(
        std::fs::read(&enabled_path).unwrap(),
        std::fs::read(&disabled_path).unwrap()
    );
}

#[test]
fn test_each_append_is_logged_at_debug() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.csv");

    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(AppendCounter(count.clone()));
    tracing::subscriber::with_default(subscriber, || {
        let mut output = CsvOutput::new(&path).unwrap();
        write(&mut output, &TabularInput::new());
        write(&mut output, &[("foo", 1)].into_iter().collect());
        write(&mut output, &[("foo", 2), ("bar", 20)].into_iter().collect());
        write(&mut output, &TabularInput::new());
        output.close().unwrap();
    });

    // The leading empty record writes nothing; the trailing one is a blank row
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn test_empty_input_before_any_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.csv");

    let emitted = count_warnings(|| {
        let mut output = CsvOutput::new(&path).unwrap();
        let ack = output.record(LogInput::Tabular(&TabularInput::new())).unwrap();
        assert!(ack.is_empty());
        output.close().unwrap();
    });

    assert_eq!(emitted, 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_empty_input_then_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.csv");

    let mut output = CsvOutput::new(&path).unwrap();
    write(&mut output, &TabularInput::new());
    write(&mut output, &[("foo", 1), ("bar", 10)].into_iter().collect());
    output.close().unwrap();

    assert_eq!(output.diagnostics().seen_count(), 0);
    let (header, rows) = read_csv(&path);
    assert_eq!(header, vec!["foo", "bar"]);
    assert_eq!(rows, vec![vec!["1", "10"]]);
}

#[test]
fn test_unacceptable_input_kind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.csv");

    let mut output = CsvOutput::new(&path).unwrap();
    assert_eq!(output.types_accepted(), &[InputKind::Tabular]);
    assert!(!output.accepts(InputKind::Text));

    let result = output.record(LogInput::Text("foo"));
    assert!(matches!(
        result,
        Err(TablogError::InvalidInputKind(InputKind::Text))
    ));

    // The output is still usable
    write(&mut output, &[("foo", 1)].into_iter().collect());
    output.close().unwrap();
    let (_, rows) = read_csv(&path);
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_output_through_trait_object() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.csv");

    let mut output: Box<dyn LogOutput> = Box::new(CsvOutput::new(&path).unwrap());
    let tabular: TabularInput = [("x", 1)].into_iter().collect();
    let ack = output.record(LogInput::Tabular(&tabular)).unwrap();
    assert_eq!(ack.len(), 1);
    output.close().unwrap();
    output.close().unwrap();

    let (header, _) = read_csv(&path);
    assert_eq!(header, vec!["x"]);
}

#[test]
fn test_migration_leaves_no_temp_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.csv");

    let mut output = CsvOutput::new(&path).unwrap();
    for i in 0..5i64 {
        let key = format!("k{}", i);
        write(&mut output, &[(key.as_str(), i)].into_iter().collect());
    }
    output.close().unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);

    let (header, rows) = read_csv(&path);
    assert_eq!(header, vec!["k0", "k1", "k2", "k3", "k4"]);
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4], vec!["", "", "", "", "4"]);
}

#[test]
fn test_dropping_output_flushes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.csv");

    {
        let mut output = CsvOutput::new(&path).unwrap();
        write(&mut output, &[("a", 1)].into_iter().collect());
    }

    let (header, rows) = read_csv(&path);
    assert_eq!(header, vec!["a"]);
    assert_eq!(rows, vec![vec!["1"]]);
}
