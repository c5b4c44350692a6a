// A MailMessage models the full trip of one queued mail object through the
// stack, not just through postfix proper. Per-recipient outcomes live in the
// Instance sub-machines because a single queue entry fans out to several
// destinations with independent fates.

use crate::record;
use std::collections;

// Where a message entered the engine's view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
  Smtpd,
  DkimMilter,
  Amavisd,
  // Synthesized when cleanup mints a message we never saw a daemon create.
  Internal,
  // Locally submitted through the pickup service.
  Local,
}

// The recipient key: the final address plus the pre-rewrite address when
// rewriting occurred. An absent orig_to is not the same thing as an empty one.
pub type Recipient = (String, Option<String>);

// Tells the engine to retire the message from the live map.
#[derive(Debug, PartialEq)]
pub enum Command {
  MessageDone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceState {
  Init,
  MessageQueued,
  LocallyDelivered,
  MessageBounced,
  MessageSpam,
  MessageRejected,
  MessageDeferred,
  Amavis10024,
  Amavis10026,
}

// One destination's status for a message.
#[derive(Debug)]
pub struct Instance {
  pub rcpt_to: Recipient,
  pub state: InstanceState,
  // The queue identifier the downstream hop assigned, when one was reported.
  pub newqueueid: Option<String>,
  // Where this recipient's copy was handed off.
  pub relayhostname: Option<String>,
  pub relayhostip: Option<String>,
  pub relayport: Option<String>,
  // The amavis identifier when the copy was dropped as spam.
  pub spamid: Option<String>,
}

impl Instance {
  fn new(rcpt_to: Recipient) -> Self {
    Self {
      rcpt_to,
      state: InstanceState::Init,
      newqueueid: None,
      relayhostname: None,
      relayhostip: None,
      relayport: None,
      spamid: None,
    }
  }

  fn identity(&self) -> String {
    match &self.rcpt_to {
      (to, Some(orig_to)) => format!("recipient <{to}> (original <{orig_to}>)"),
      (to, None) => format!("recipient <{to}>"),
    }
  }

  fn unexpected(&self, record: &record::Record) -> anyhow::Error {
    crate::Error::unexpected(self.identity(), self.state, record)
  }

  fn set_newqueueid(&mut self, record: &record::Record) -> anyhow::Result<()> {
    if let Some(newqueueid) = &self.newqueueid {
      Err(crate::Error::conflict(
        self.identity(),
        "newqueueid",
        newqueueid,
        record,
      ))?
    }
    self.newqueueid = Some(record.require("newqueueid")?.to_string());
    Ok(())
  }

  // The triple is written as a whole, even for relay=none or relay=local where
  // all three captures are absent.
  fn set_relay(&mut self, record: &record::Record) -> anyhow::Result<()> {
    if let Some(relayhostname) = self
      .relayhostname
      .as_ref()
      .or(self.relayhostip.as_ref())
      .or(self.relayport.as_ref())
    {
      Err(crate::Error::conflict(
        self.identity(),
        "relay",
        relayhostname,
        record,
      ))?
    }
    self.relayhostname = record.field("relayhostname").map(str::to_string);
    self.relayhostip = record.field("relayhostip").map(str::to_string);
    self.relayport = record.field("relayport").map(str::to_string);
    Ok(())
  }

  fn process(&mut self, record: &record::Record) -> anyhow::Result<()> {
    match (self.state, record.name()) {
      (InstanceState::Init, "message_queued") => {
        self.set_newqueueid(record)?;
        self.set_relay(record)?;
        self.state = InstanceState::MessageQueued;
      }
      (InstanceState::Init, "message_queued_all") => {
        self.set_relay(record)?;
        self.state = InstanceState::MessageQueued;
      }
      (InstanceState::Init, "local_delivery") => self.state = InstanceState::LocallyDelivered,
      (InstanceState::Init, "message_deferred_smtp" | "message_deferred_error") => {
        self.state = InstanceState::MessageDeferred
      }
      (InstanceState::Init, "message_bounced_smtp" | "message_bounced_error") => {
        self.state = InstanceState::MessageBounced
      }
      (InstanceState::Init, "message_spam_discarded") => {
        self.spamid = Some(record.require("spamid")?.to_string());
        self.state = InstanceState::MessageSpam;
      }
      (InstanceState::Init, "smtpd_amavis_10026_queueid") => {
        self.state = InstanceState::Amavis10026
      }
      // The same copy can get queued more than once (redirections, mailing
      // lists, ...) and the log entries are indistinguishable, so duplicates
      // are ignored rather than told apart.
      (InstanceState::MessageQueued, "message_queued" | "message_queued_all") => (),
      (InstanceState::Amavis10026, "message_queued") => {
        self.set_newqueueid(record)?;
        self.set_relay(record)?;
        self.state = InstanceState::MessageQueued;
      }
      (InstanceState::Amavis10026, "smtpd_amavis_10024_queueid") => {
        self.state = InstanceState::Amavis10024
      }
      (
        InstanceState::Amavis10024,
        "smtpd_address_rejected_queueid" | "smtpd_address_rejected_queueid_unqualified",
      ) => self.state = InstanceState::MessageRejected,
      (InstanceState::Amavis10024, "message_queued") => {
        self.set_newqueueid(record)?;
        self.set_relay(record)?;
        self.state = InstanceState::MessageQueued;
      }
      (InstanceState::MessageDeferred, "message_queued") => {
        self.set_newqueueid(record)?;
        self.set_relay(record)?;
        self.state = InstanceState::MessageQueued;
      }
      (InstanceState::MessageDeferred, "message_queued_all") => {
        self.set_relay(record)?;
        self.state = InstanceState::MessageQueued;
      }
      // Retries show up as more deferrals.
      (InstanceState::MessageDeferred, "message_deferred_smtp" | "message_deferred_error") => (),
      // Same reasoning as for the duplicate message_queued above.
      (InstanceState::LocallyDelivered, "local_delivery") => (),
      _ => Err(self.unexpected(record))?,
    }
    Ok(())
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
  // No queue identifier yet, the message was locally picked up.
  Init,
  QueueIdIdentified,
  MessageIdIdentified,
  Done,
  MilterReject,
}

#[derive(Debug)]
pub struct MailMessage {
  pub source: Source,
  pub state: State,
  pub queueid: Option<String>,
  pub messageid: Option<String>,
  // The envelope sender. A message has exactly one; a second, different value
  // showing up later is a protocol violation.
  pub mail_from: Option<String>,
  pub clienthostname: Option<String>,
  pub clienthostip: Option<String>,
  // Every record this message consumed, in log order.
  pub records: Vec<record::Record>,
  pub instances: collections::BTreeMap<Recipient, Instance>,
}

impl MailMessage {
  pub fn new(source: Source, queueid: Option<String>) -> Self {
    Self {
      source,
      state: match queueid {
        Some(_) => State::QueueIdIdentified,
        None => State::Init,
      },
      queueid,
      messageid: None,
      mail_from: None,
      clienthostname: None,
      clienthostip: None,
      records: Vec::new(),
      instances: collections::BTreeMap::new(),
    }
  }

  // A message minted by the smtpd machine, carrying the envelope pairs the
  // connection announced to the recipient filter.
  pub fn from_smtpd(
    queueid: String,
    from_to: Vec<(String, String)>,
    clienthostname: Option<String>,
    clienthostip: Option<String>,
  ) -> anyhow::Result<Self> {
    let mut message = Self::new(Source::Smtpd, Some(queueid));
    message.clienthostname = clienthostname;
    message.clienthostip = clienthostip;
    for (from, to) in from_to {
      match &message.mail_from {
        Some(mail_from) => anyhow::ensure!(
          *mail_from == from,
          "expected the single sender <{mail_from}>, got <{from}>"
        ),
        None => message.mail_from = Some(from),
      }
      let rcpt_to = (to, None);
      message
        .instances
        .entry(rcpt_to.clone())
        .or_insert_with(|| Instance::new(rcpt_to));
    }
    Ok(message)
  }

  fn identity(&self) -> String {
    match &self.queueid {
      Some(queueid) => format!("message {queueid}"),
      None => "message without a queue identifier".to_string(),
    }
  }

  fn unexpected(&self, record: &record::Record) -> anyhow::Error {
    crate::Error::unexpected(self.identity(), self.state, record)
  }

  fn set_mail_from(&mut self, record: &record::Record) -> anyhow::Result<()> {
    let from = record.require("from")?;
    match &self.mail_from {
      Some(mail_from) if mail_from == from => Ok(()),
      // A client sometimes announces one address in MAIL FROM and qmgr then
      // reports a completely different one, so no prefix tolerance for
      // server-side domain completion is attempted; mismatches are surfaced.
      Some(mail_from) => Err(crate::Error::conflict(
        self.identity(),
        "mail_from",
        mail_from,
        record,
      )),
      None => {
        self.mail_from = Some(from.to_string());
        Ok(())
      }
    }
  }

  fn no_orig_to(&self, record: &record::Record) -> anyhow::Result<()> {
    anyhow::ensure!(
      record.field("orig_to").is_none(),
      "{}: {} never carries orig_to: {}",
      self.identity(),
      record.name(),
      record.all(),
    );
    Ok(())
  }

  fn delegate(&mut self, rcpt_to: Recipient, record: &record::Record) -> anyhow::Result<()> {
    self
      .instances
      .entry(rcpt_to.clone())
      .or_insert_with(|| Instance::new(rcpt_to))
      .process(record)
  }

  pub fn process(&mut self, record: record::Record) -> anyhow::Result<Option<Command>> {
    let command = self.dispatch(&record);
    // The record lands in the log whether or not it changed anything.
    self.records.push(record);
    command
  }

  fn dispatch(&mut self, record: &record::Record) -> anyhow::Result<Option<Command>> {
    match (self.state, record.name()) {
      (State::Init, "pickup") => {
        // The from field is deliberately not taken: the server completes the
        // domain and qmgr reports the full address later.
        self.queueid = Some(record.require("queueid")?.to_string());
        self.state = State::QueueIdIdentified;
      }
      (State::QueueIdIdentified, "messageid_identified") => {
        self.messageid = Some(record.require("messageid")?.to_string());
        self.state = State::MessageIdIdentified;
      }
      (
        State::QueueIdIdentified,
        "smtpd_amavis_10024_queueid"
        | "smtpd_amavis_10026_queueid"
        | "smtpd_address_rejected_queueid"
        | "smtpd_address_rejected_queueid_unqualified",
      ) => {
        self.set_mail_from(record)?;
        self.no_orig_to(record)?;
        self.delegate((record.require("to")?.to_string(), None), record)?;
      }
      (State::MessageIdIdentified, "from_identified") => self.set_mail_from(record)?,
      (
        State::MessageIdIdentified,
        "message_deferred_smtp"
        | "message_deferred_error"
        | "message_bounced_smtp"
        | "message_bounced_error",
      ) => {
        self.no_orig_to(record)?;
        self.delegate((record.require("to")?.to_string(), None), record)?;
      }
      (
        State::MessageIdIdentified,
        "message_queued" | "message_queued_all" | "message_spam_discarded" | "local_delivery",
      ) => {
        let rcpt_to = (
          record.require("to")?.to_string(),
          record.field("orig_to").map(str::to_string),
        );
        self.delegate(rcpt_to, record)?;
      }
      (State::MessageIdIdentified, "message_removed") => {
        self.state = State::Done;
        return Ok(Some(Command::MessageDone));
      }
      (State::MessageIdIdentified, "cleanup_milter_reject") => {
        self.state = State::MilterReject;
        return Ok(Some(Command::MessageDone));
      }
      (
        State::MessageIdIdentified,
        "message_expired" | "delivery_status_error" | "delivery_status_success",
      ) => {
        // The notification's own queue identifier is captured but not linked
        // back; it stays in the record log only.
        self.no_orig_to(record)?;
      }
      // The next line details the failure.
      (State::MessageIdIdentified, "smtp_unavailable") => (),
      // Greylisting or an overloaded destination; the responsible recipient
      // can't be singled out without more postprocessing.
      (State::MessageIdIdentified, "message_deferred_spam") => (),
      (State::MessageIdIdentified, "smtp_pix_workarounds") => (),
      _ => Err(self.unexpected(record))?,
    }
    Ok(None)
  }
}
