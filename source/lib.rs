// Reconstructs the life of every mail message out of a Zimbra-style mail log:
// Postfix proper plus the amavisd and dkim-milter loopback paths. Lines are
// classified against an ordered rule catalog, routed to per-PID daemon
// machines or per-queueid message machines, and the retired messages are
// consolidated by message identifier at the end.

use anyhow::Context as _;
use chrono::Datelike as _;
use std::{error, fmt, fs, io};

pub mod catalog;
pub mod daemon;
pub mod engine;
pub mod message;
pub mod record;

#[derive(Debug)]
pub enum Error {
  // No rule matched: the catalog is incomplete and the results can't be
  // trusted until it's fixed.
  UnmatchedLine(String),
  // A classified event reached a machine in a state that doesn't admit it.
  UnexpectedEvent {
    machine: String,
    state: String,
    event: String,
    line: String,
  },
  // A write-once attribute received a second, different value.
  Conflict {
    machine: String,
    attribute: &'static str,
    current: String,
    line: String,
  },
}

impl Error {
  pub(crate) fn unexpected(
    machine: String,
    state: impl fmt::Debug,
    record: &record::Record,
  ) -> anyhow::Error {
    Self::UnexpectedEvent {
      machine,
      state: format!("{state:?}"),
      event: record.name().to_string(),
      line: record.all().to_string(),
    }
    .into()
  }

  pub(crate) fn conflict(
    machine: String,
    attribute: &'static str,
    current: &str,
    record: &record::Record,
  ) -> anyhow::Error {
    Self::Conflict {
      machine,
      attribute,
      current: current.to_string(),
      line: record.all().to_string(),
    }
    .into()
  }
}

impl fmt::Display for Error {
  fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::UnmatchedLine(line) => write!(formatter, "no rule matches: {line}"),
      Error::UnexpectedEvent {
        machine,
        state,
        event,
        line,
      } => write!(
        formatter,
        "{machine} in state {state} doesn't admit {event}: {line}"
      ),
      Error::Conflict {
        machine,
        attribute,
        current,
        line,
      } => write!(
        formatter,
        "{machine} already has {attribute} <{current}>: {line}"
      ),
    }
  }
}

impl error::Error for Error {}

fn current_year() -> i32 {
  chrono::Local::now().year()
}

#[derive(clap::Args)]
#[group(skip)]
pub struct Arguments {
  #[arg(help = "Mail log to reconstruct, optionally xz-compressed")]
  pub log: String,

  #[arg(
    long = "year",
    help = "Calendar year the log was written in (syslog timestamps don't carry one)",
    default_value_t = current_year()
  )]
  pub year: i32,
}

pub fn run(arguments: &Arguments) -> anyhow::Result<()> {
  let mut engine = engine::Engine::new(arguments.year);
  let file =
    fs::File::open(&arguments.log).with_context(|| format!("couldn't open {}", arguments.log))?;
  if arguments.log.ends_with(".xz") {
    engine.parse(io::BufReader::new(xz2::read::XzDecoder::new(file)))?;
  } else {
    engine.parse(io::BufReader::new(file))?;
  }
  log::info!("consolidating by message identifier");
  engine.dump(&mut io::stdout().lock())?;
  Ok(())
}
