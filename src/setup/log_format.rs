use std::{io, result};

use slog::{Drain, OwnedKVList, Record, KV};
use slog_term::{Decorator, RecordDecorator, Serializer};

/// UTC, fixed width, sortable as text. cadence.log lines from different
/// nodes of one in-process cluster interleave, so the timestamp must
/// collate without parsing.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// CadenceFormat renders one record as
/// `[timestamp] [LVL] [module:line] msg k: v, ...`.
/// The module path is used instead of the file path: consensus and
/// coordinator logs are read per component, not per file.
pub struct CadenceFormat<D>
where
    D: Decorator,
{
    decorator: D,
}

impl<D> Drain for CadenceFormat<D>
where
    D: Decorator,
{
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record, values: &OwnedKVList) -> result::Result<Self::Ok, Self::Err> {
        self.format(record, values)
    }
}

impl<D> CadenceFormat<D>
where
    D: Decorator,
{
    pub fn new(d: D) -> CadenceFormat<D> {
        CadenceFormat { decorator: d }
    }

    fn format(&self, record: &Record, values: &OwnedKVList) -> io::Result<()> {
        self.decorator.with_record(record, values, |decorator| {
            write_header(decorator, record)?;

            decorator.start_whitespace()?;
            write!(decorator, " ")?;

            decorator.start_msg()?;
            write!(decorator, "{}", record.msg())?;

            write_fields(decorator, record, values)?;

            decorator.start_whitespace()?;
            writeln!(decorator)?;

            decorator.flush()
        })
    }
}

fn write_header(rd: &mut dyn RecordDecorator, record: &Record) -> io::Result<()> {
    rd.start_timestamp()?;
    write!(rd, "[{}]", chrono::Utc::now().format(TIMESTAMP_FORMAT))?;

    rd.start_whitespace()?;
    write!(rd, " ")?;

    rd.start_level()?;
    write!(rd, "[{}]", record.level().as_short_str())?;

    rd.start_whitespace()?;
    write!(rd, " ")?;

    // there is no `start_module()` or `start_line()`
    rd.start_msg()?;
    write!(rd, "[{}:{}]", record.module(), record.line())
}

fn write_fields(
    rd: &mut dyn RecordDecorator,
    record: &Record,
    values: &OwnedKVList,
) -> io::Result<()> {
    let mut serializer = Serializer::new(rd, false, true); // no comma, print record kvs just as what write

    record.kv().serialize(record, &mut serializer)?;
    values.serialize(record, &mut serializer)?;

    serializer.finish()
}
