use crate::{catalog, daemon, message, record};
use anyhow::Context as _;
use std::{collections, io};

// One parse run: the live maps, the retired messages and the dispatch loop
// tying the machines together. Log order is the only order; a line is driven
// to completion before the next one is read.
#[derive(Debug)]
pub struct Engine {
  year: i32,
  processes: collections::HashMap<String, daemon::Process>,
  // Messages whose queue identifier is still in flight.
  messages: collections::HashMap<String, message::MailMessage>,
  processed: Vec<message::MailMessage>,
}

impl Engine {
  pub fn new(year: i32) -> Self {
    Self {
      year,
      processes: collections::HashMap::new(),
      messages: collections::HashMap::new(),
      processed: Vec::new(),
    }
  }

  pub fn processed(&self) -> &[message::MailMessage] {
    &self.processed
  }

  pub fn in_flight(&self) -> usize {
    self.messages.len()
  }

  pub fn message(&self, queueid: &str) -> Option<&message::MailMessage> {
    self.messages.get(queueid)
  }

  pub fn parse<R>(&mut self, reader: R) -> anyhow::Result<()>
  where
    R: io::BufRead,
  {
    let mut lines = 0u64;
    for line in reader.lines() {
      let line = line?;
      lines += 1;
      self.feed(&line).with_context(|| format!("line {lines}"))?;
      if lines % 10_000 == 0 {
        log::debug!("{lines} line(s) classified");
      }
    }
    log::info!(
      "{lines} line(s) classified, {} message(s) processed, {} still in flight",
      self.processed.len(),
      self.messages.len(),
    );
    Ok(())
  }

  pub fn feed(&mut self, line: &str) -> anyhow::Result<()> {
    let record = record::classify(line, self.year)?;
    match record.rule.router {
      catalog::Router::Postfix | catalog::Router::DkimMilter | catalog::Router::Amavisd => {
        self.drive_daemon(record)
      }
      catalog::Router::QueueId => self.drive_message(record),
      // Diagnostic lines: classified, never state-driving.
      catalog::Router::Pid => Ok(()),
    }
  }

  fn drive_daemon(&mut self, record: record::Record) -> anyhow::Result<()> {
    let pid = record.require("PID")?.to_string();
    let process = match self.processes.entry(pid.clone()) {
      collections::hash_map::Entry::Occupied(occupied) => occupied.into_mut(),
      collections::hash_map::Entry::Vacant(vacant) => {
        vacant.insert(daemon::Process::new(record.rule.router, &pid)?)
      }
    };
    match process.process(&record)? {
      Some(daemon::Command::AddMessage(message)) => {
        let queueid = message
          .queueid
          .clone()
          .with_context(|| format!("a minted message carries a queue identifier: {}", record.all()))?;
        self.messages.insert(queueid, message);
      }
      Some(daemon::Command::DeletePid) => {
        self.processes.remove(&pid);
      }
      None => (),
    }
    Ok(())
  }

  fn drive_message(&mut self, record: record::Record) -> anyhow::Result<()> {
    let queueid = record.require("queueid")?.to_string();
    let message = match self.messages.entry(queueid.clone()) {
      collections::hash_map::Entry::Vacant(vacant) => match record.name() {
        // cleanup can mint a message in response to an error without any
        // daemon machine having seen it.
        "messageid_identified" => vacant.insert(message::MailMessage::new(
          message::Source::Internal,
          Some(queueid.clone()),
        )),
        // Locally submitted; the pickup event itself fills in the queue
        // identifier.
        "pickup" => vacant.insert(message::MailMessage::new(message::Source::Local, None)),
        name => {
          // The message's prolog predates the log window.
          log::trace!("ignoring {name} for unknown queue identifier {queueid}");
          return Ok(());
        }
      },
      collections::hash_map::Entry::Occupied(occupied) => {
        let message = occupied.into_mut();
        if record.name() == "messageid_identified" {
          // A message can disappear mid-flight and its queue identifier come
          // back under another message identifier; retire the old message and
          // start over. The same message identifier twice would mean the
          // correlation went wrong somewhere.
          if message.messageid.as_deref() == record.field("messageid") {
            Err(crate::Error::unexpected(
              format!("message {queueid}"),
              message.state,
              &record,
            ))?
          }
          let retired = std::mem::replace(
            message,
            message::MailMessage::new(message::Source::Internal, Some(queueid.clone())),
          );
          self.processed.push(retired);
        }
        message
      }
    };
    if let Some(message::Command::MessageDone) = message.process(record)? {
      if let Some(done) = self.messages.remove(&queueid) {
        self.processed.push(done);
      }
    }
    Ok(())
  }

  // Groups the retired messages by their message identifier, the one header
  // that survives internal re-queueing. Ordered, so two runs over the same
  // input dump identically.
  pub fn consolidate(&self) -> collections::BTreeMap<&str, Vec<&message::MailMessage>> {
    let mut groups: collections::BTreeMap<&str, Vec<&message::MailMessage>> =
      collections::BTreeMap::new();
    for message in &self.processed {
      groups
        .entry(message.messageid.as_deref().unwrap_or(""))
        .or_default()
        .push(message);
    }
    groups
  }

  pub fn dump<W>(&self, writer: &mut W) -> anyhow::Result<()>
  where
    W: io::Write,
  {
    for (_, messages) in self.consolidate() {
      let first = messages[0]; // Groups are built non-empty.
      write!(
        writer,
        "{} from=<{}> ->",
        first.queueid.as_deref().unwrap_or(""),
        first.mail_from.as_deref().unwrap_or(""),
      )?;
      for (to, orig_to) in first.instances.keys() {
        match orig_to {
          Some(orig_to) => write!(writer, " <{to}> (original <{orig_to}>)")?,
          None => write!(writer, " <{to}>")?,
        }
      }
      writeln!(writer)?;
    }
    Ok(())
  }
}
