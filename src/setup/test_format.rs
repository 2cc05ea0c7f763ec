use std::cell::RefCell;
use std::io::{self, Write};
use std::str::from_utf8;

use chrono::DateTime;
use slog::{slog_error, slog_info, slog_warn, Drain};

use super::log_format::CadenceFormat;

thread_local! {
    static BUFFER: RefCell<Vec<u8>> = RefCell::new(Vec::new());
}

struct TestWriter;

impl Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BUFFER.with(|buffer| buffer.borrow_mut().write(buf))
    }
    fn flush(&mut self) -> io::Result<()> {
        BUFFER.with(|buffer| buffer.borrow_mut().flush())
    }
}

#[test]
fn test_cadence_format() {
    let decorator = slog_term::PlainSyncDecorator::new(TestWriter);
    let drain = CadenceFormat::new(decorator).fuse();
    let logger = slog::Logger::root(drain, slog::o!());

    slog_info!(logger, "leader loop started");
    slog_info!(logger, "merged remote batch from replica {}", 1);
    slog_info!(logger, "round committed: "; "global_version" => 7, "batches" => 3);
    slog_warn!(logger, "discarding stale ack: "; "acked" => 4, "current" => 5);
    slog_error!(logger, "commit notice without a pending proposal: "; "from" => 2);

    // timestamp occupies columns 1..28; everything after it is deterministic
    let expect = r#"[2026-08-30T18:10:00.000000Z] [INFO] [cadence::setup::test_format:31] leader loop started
[2026-08-30T18:10:00.000000Z] [INFO] [cadence::setup::test_format:32] merged remote batch from replica 1
[2026-08-30T18:10:00.000000Z] [INFO] [cadence::setup::test_format:33] round committed: global_version: 7, batches: 3
[2026-08-30T18:10:00.000000Z] [WARN] [cadence::setup::test_format:34] discarding stale ack: acked: 4, current: 5
[2026-08-30T18:10:00.000000Z] [ERRO] [cadence::setup::test_format:35] commit notice without a pending proposal: from: 2
"#;

    BUFFER.with(|buffer| {
        let buffer = buffer.borrow_mut();
        let output = from_utf8(&*buffer).unwrap();

        let mut lines = 0;
        for (output_line, expect_line) in output.lines().zip(expect.lines()) {
            let date_time = &output_line[1..28];
            assert!(valid_date_time(date_time), "timestamp {}", date_time);

            assert_eq!(&expect_line[30..], &output_line[30..]);
            lines += 1;
        }
        assert_eq!(5, lines);
    })
}

fn valid_date_time(dt: &str) -> bool {
    DateTime::parse_from_rfc3339(dt).is_ok()
}
