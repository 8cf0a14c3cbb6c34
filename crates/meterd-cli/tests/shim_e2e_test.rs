//! End-to-end tests: `meterd shim` and `meterd input` running as supervised
//! external plugins.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use meterd_core::{ExecdConfig, FieldValue, Supervisor, TriggerSignal};
use meterd_test_utils::{CollectingAccumulator, base_time, counter_sample};

const WAIT: std::time::Duration = std::time::Duration::from_secs(10);

const METERD: &str = env!("CARGO_BIN_EXE_meterd");

#[tokio::test]
async fn count_multiplier_doubles_every_sample() {
    let config = ExecdConfig::new([METERD, "shim", "count-multiplier"]).with_name("multiplier");
    let acc = Arc::new(CollectingAccumulator::new());
    let supervisor = Supervisor::new(config);
    supervisor.start(acc.clone()).await.unwrap();

    for i in 0..10 {
        supervisor.submit(counter_sample(1, i)).await.unwrap();
    }
    supervisor.stop().await.unwrap();

    let samples = acc.samples();
    assert_eq!(samples.len(), 10);
    for (i, sample) in samples.iter().enumerate() {
        assert_eq!(sample.name(), "test");
        assert_eq!(sample.tag("city"), Some("Toronto"));
        assert_eq!(sample.field("count"), Some(&FieldValue::Integer(2)));
        assert_eq!(
            sample.timestamp(),
            base_time() + chrono::Duration::nanoseconds(i as i64)
        );
    }
}

#[tokio::test]
async fn add_tag_shim_enriches_samples() {
    let config = ExecdConfig::new([
        METERD, "shim", "add-tag", "--option", "key=hi", "--option", "value=mom",
    ]);
    let acc = Arc::new(CollectingAccumulator::new());
    let supervisor = Supervisor::new(config);
    supervisor.start(acc.clone()).await.unwrap();

    supervisor.submit(counter_sample(5, 0)).await.unwrap();
    supervisor.stop().await.unwrap();

    let samples = acc.samples();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].tag("hi"), Some("mom"));
    assert_eq!(samples[0].tag("city"), Some("Toronto"));
    assert_eq!(samples[0].field("count"), Some(&FieldValue::Integer(5)));
}

#[tokio::test]
async fn counter_input_gathers_on_stdin_trigger() {
    let config = ExecdConfig::new([METERD, "input", "counter", "--option", "measurement=ticks"])
        .with_signal(TriggerSignal::Stdin);
    let acc = Arc::new(CollectingAccumulator::new());
    let supervisor = Supervisor::new(config);
    supervisor.start(acc.clone()).await.unwrap();

    for _ in 0..3 {
        supervisor.trigger_flush().await.unwrap();
    }
    assert!(acc.wait_for(3, WAIT).await, "got {} samples", acc.len());
    supervisor.stop().await.unwrap();

    let samples = acc.samples();
    assert_eq!(samples.len(), 3);
    let counts: Vec<_> = samples
        .iter()
        .map(|s| {
            assert_eq!(s.name(), "ticks");
            s.field("count").and_then(FieldValue::as_i64)
        })
        .collect();
    assert_eq!(counts, vec![Some(1), Some(2), Some(3)]);
    assert_eq!(supervisor.restarts(), 0);
}

// ---------------------------------------------------------------------------
// Direct invocation
// ---------------------------------------------------------------------------

fn run_shim(args: &[&str], input: &str) -> std::process::Output {
    let mut child = Command::new(METERD)
        .arg("shim")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn meterd");
    child
        .stdin
        .take()
        .expect("stdin piped")
        .write_all(input.as_bytes())
        .expect("failed to write input");
    child.wait_with_output().expect("failed to wait for meterd")
}

#[test]
fn shim_exits_cleanly_on_eof() {
    let output = run_shim(
        &["add-tag", "--option", "key=hi", "--option", "value=mom"],
        "thing value=1i 1\nthing value=2i 2\n",
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "thing,hi=mom value=1i 1\nthing,hi=mom value=2i 2\n"
    );
}

#[test]
fn shim_fails_on_malformed_input() {
    let output = run_shim(&["identity"], "ok value=1i 1\nnot-a-record\n");
    assert!(!output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "ok value=1i 1\n");
}

#[test]
fn shim_rejects_unknown_processor() {
    let output = run_shim(&["no-such-processor"], "");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no-such-processor"));
}

#[test]
fn processors_command_lists_builtins() {
    let output = Command::new(METERD)
        .arg("processors")
        .output()
        .expect("failed to run meterd");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    for name in ["identity", "count-multiplier", "add-tag"] {
        assert!(stdout.contains(name), "missing {name} in:\n{stdout}");
    }
}

#[test]
fn input_exits_cleanly_on_eof() {
    let mut child = Command::new(METERD)
        .args(["input", "counter"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn meterd");
    child
        .stdin
        .take()
        .expect("stdin piped")
        .write_all(b"\n\n")
        .expect("failed to write triggers");
    let output = child.wait_with_output().expect("failed to wait for meterd");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "stdout: {stdout}");
    assert!(lines[0].starts_with("counter count=1i "));
    assert!(lines[1].starts_with("counter count=2i "));
}

#[test]
fn inputs_command_lists_builtins() {
    let output = Command::new(METERD)
        .arg("inputs")
        .output()
        .expect("failed to run meterd");
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout).unwrap().contains("counter"));
}
