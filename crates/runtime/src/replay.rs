use std::io::{self, Write};

use crate::logging::{RunLogEvent, RunLogEventKind, RunLogWriter};
use crate::session::TickReport;

pub const REPLAY_CSV_HEADER: &str = "tick,step,time,da,rt,rt_forecast,action,strategy,soc,\
energy,ancillary,virtual,degradation,forecast_error,total_pnl\n";

pub struct ReplayCsvWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReplayCsvWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(REPLAY_CSV_HEADER.as_bytes())
    }

    pub fn write_header_and_log(
        &mut self,
        tick: u64,
        run_log_writer: &mut dyn RunLogWriter,
    ) -> io::Result<()> {
        self.write_header()?;
        self.writer.flush()?;
        run_log_writer.write(RunLogEvent::new(
            tick,
            RunLogEventKind::ReplayArtifactWritten,
            None,
        ));
        Ok(())
    }

    pub fn append_tick(&mut self, tick: u64, report: &TickReport) -> io::Result<()> {
        let pnl = &report.pnl;
        writeln!(
            self.writer,
            "{tick},{},{},{:.2},{:.2},{:.2},{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
            report.step,
            escape_csv_field(&report.time),
            report.price.da,
            report.price.rt,
            report.rt_forecast,
            escape_csv_field(report.decision.best_action.as_str()),
            escape_csv_field(report.decision.best_strategy.label()),
            report.soc,
            pnl.energy,
            pnl.ancillary,
            pnl.virtuals,
            pnl.degradation,
            pnl.forecast_error,
            report.total_pnl,
        )?;
        self.writer.flush()
    }
}

fn escape_csv_field(value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|ch| matches!(ch, ',' | '"' | '\n' | '\r'));
    if !needs_quotes {
        return value.to_string();
    }

    let escaped = value.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, io, rc::Rc};

    use crate::logging::{InMemoryRunLogWriter, RunLogEventKind, RunLogWriter};
    use crate::session::SimSession;

    use super::{escape_csv_field, ReplayCsvWriter, REPLAY_CSV_HEADER};

    struct TrackingWriter {
        bytes: Vec<u8>,
        flush_called: Rc<Cell<bool>>,
        flush_fails: bool,
    }

    impl TrackingWriter {
        fn new(flush_called: Rc<Cell<bool>>, flush_fails: bool) -> Self {
            Self {
                bytes: Vec::new(),
                flush_called,
                flush_fails,
            }
        }
    }

    impl io::Write for TrackingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flush_called.set(true);
            if self.flush_fails {
                return Err(io::Error::other("flush failed"));
            }
            Ok(())
        }
    }

    struct FlushAssertingLogWriter {
        flush_called: Rc<Cell<bool>>,
    }

    impl RunLogWriter for FlushAssertingLogWriter {
        fn write(&mut self, _event: crate::logging::RunLogEvent) {
            assert!(
                self.flush_called.get(),
                "expected writer flush before logging"
            );
        }
    }

    #[test]
    fn write_header_and_log_flushes_before_emitting_log() {
        let flush_called = Rc::new(Cell::new(false));
        let writer = TrackingWriter::new(Rc::clone(&flush_called), false);
        let mut replay_writer = ReplayCsvWriter::new(writer);
        let mut log_writer = FlushAssertingLogWriter { flush_called };

        replay_writer
            .write_header_and_log(7, &mut log_writer)
            .expect("header write should flush and log");
    }

    #[test]
    fn write_header_and_log_propagates_flush_errors() {
        let flush_called = Rc::new(Cell::new(false));
        let writer = TrackingWriter::new(Rc::clone(&flush_called), true);
        let mut replay_writer = ReplayCsvWriter::new(writer);
        let mut log_writer = InMemoryRunLogWriter::new();

        let err = replay_writer
            .write_header_and_log(3, &mut log_writer)
            .expect_err("flush failure should be returned");

        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(log_writer.events().len(), 0);
    }

    #[test]
    fn write_header_and_log_records_replay_artifact() {
        let mut output = Vec::new();
        let mut replay_writer = ReplayCsvWriter::new(&mut output);
        let mut log_writer = InMemoryRunLogWriter::new();

        replay_writer
            .write_header_and_log(42, &mut log_writer)
            .expect("header and log write should succeed");

        assert_eq!(String::from_utf8(output).unwrap(), REPLAY_CSV_HEADER);
        assert_eq!(log_writer.events().len(), 1);
        assert_eq!(log_writer.events()[0].tick, 42);
        assert_eq!(
            log_writer.events()[0].kind,
            RunLogEventKind::ReplayArtifactWritten
        );
    }

    #[test]
    fn appends_one_row_per_tick_matching_header_width() {
        let mut session = SimSession::default();
        let mut output = Vec::new();
        {
            let mut writer = ReplayCsvWriter::new(&mut output);
            writer.write_header().unwrap();
            for tick in 1..=3 {
                let report = session.step();
                writer.append_tick(tick, &report).unwrap();
            }
        }

        let csv = String::from_utf8(output).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        let columns = REPLAY_CSV_HEADER.trim_end().split(',').count();

        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("1,0,00:00,"));
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), columns);
        }
    }

    #[test]
    fn escapes_text_fields_with_csv_rules() {
        assert_eq!(escape_csv_field("Hold SOC"), "Hold SOC");
        assert_eq!(
            escape_csv_field("buy,\"market\"\nleg2"),
            "\"buy,\"\"market\"\"\nleg2\""
        );
    }
}
