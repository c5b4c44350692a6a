// The per-PID front-end machines. They only exist to observe a daemon's
// connection lifecycle and mint MailMessage objects the moment a queue
// identifier appears; everything after that is routed by queue identifier.

use crate::{catalog, message, record};
use std::mem;

// What the engine has to do after driving a daemon machine.
#[derive(Debug)]
pub enum Command {
  // Ownership of the freshly minted message transfers to the live queue map.
  AddMessage(message::MailMessage),
  // The daemon disconnected, drop its PID entry.
  DeletePid,
}

#[derive(Debug)]
pub enum Process {
  Postfix(Postfix),
  DkimMilter(DkimMilter),
  Amavisd(Amavisd),
}

impl Process {
  pub fn new(router: catalog::Router, pid: &str) -> anyhow::Result<Self> {
    Ok(match router {
      catalog::Router::Postfix => Self::Postfix(Postfix::new(pid)),
      catalog::Router::DkimMilter => Self::DkimMilter(DkimMilter::new(pid)),
      catalog::Router::Amavisd => Self::Amavisd(Amavisd::new(pid)),
      router => anyhow::bail!("{router:?} doesn't route to a daemon machine"),
    })
  }

  pub fn process(&mut self, record: &record::Record) -> anyhow::Result<Option<Command>> {
    match self {
      Self::Postfix(postfix) => postfix.process(record),
      Self::DkimMilter(dkimmilter) => dkimmilter.process(record),
      Self::Amavisd(amavisd) => amavisd.process(record),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PostfixState {
  Init,
  Connected,
  Amavis10026,
  MessageDone,
}

// A single postfix smtpd process. Tracking the whole connection (rather than
// just the queue identifier line) is what lets the minted message carry the
// client host and the envelope addresses announced to the recipient filter.
#[derive(Debug)]
pub struct Postfix {
  pid: String,
  state: PostfixState,
  clienthostname: Option<String>,
  clienthostip: Option<String>,
  from_to: Vec<(String, String)>,
}

impl Postfix {
  fn new(pid: &str) -> Self {
    Self {
      pid: pid.to_string(),
      state: PostfixState::Init,
      clienthostname: None,
      clienthostip: None,
      from_to: Vec::new(),
    }
  }

  fn unexpected(&self, record: &record::Record) -> anyhow::Error {
    crate::Error::unexpected(
      format!("postfix/smtpd[{}]", self.pid),
      self.state,
      record,
    )
  }

  fn append_from_to(&mut self, record: &record::Record) -> anyhow::Result<()> {
    self.from_to.push((
      record.require("from")?.to_string(),
      record.require("to")?.to_string(),
    ));
    Ok(())
  }

  fn process(&mut self, record: &record::Record) -> anyhow::Result<Option<Command>> {
    match (self.state, record.name()) {
      (PostfixState::Init, "smtpd_client_connect") => {
        self.clienthostname = record.field("clienthostname").map(str::to_string);
        self.clienthostip = record.field("clienthostip").map(str::to_string);
        self.state = PostfixState::Connected;
        Ok(None)
      }
      (PostfixState::Connected, "smtpd_amavis_10026") => {
        self.append_from_to(record)?;
        self.state = PostfixState::Amavis10026;
        Ok(None)
      }
      // A client connecting and disconnecting without pushing anything.
      (PostfixState::Connected, "smtpd_client_disconnect") => Ok(Some(Command::DeletePid)),
      (PostfixState::Amavis10026, "smtpd_amavis_10026") => {
        self.append_from_to(record)?;
        Ok(None)
      }
      (PostfixState::Amavis10026, "smtpd_queueid_identified") => {
        self.state = PostfixState::MessageDone;
        Ok(Some(Command::AddMessage(message::MailMessage::from_smtpd(
          record.require("queueid")?.to_string(),
          mem::take(&mut self.from_to),
          self.clienthostname.clone(),
          self.clienthostip.clone(),
        )?)))
      }
      (PostfixState::Amavis10026, "smtpd_client_disconnect") => Ok(Some(Command::DeletePid)),
      (PostfixState::MessageDone, event) => {
        // One connection can push several messages in a row; start over.
        self.from_to.clear();
        match event {
          "smtpd_client_disconnect" => Ok(Some(Command::DeletePid)),
          "smtpd_amavis_10026" => {
            self.append_from_to(record)?;
            self.state = PostfixState::Amavis10026;
            Ok(None)
          }
          _ => Err(self.unexpected(record)),
        }
      }
      _ => Err(self.unexpected(record)),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FilterState {
  Init,
  Connected,
}

// The smtpd front-end postfix runs for the dkim-milter loopback path.
#[derive(Debug)]
pub struct DkimMilter {
  pid: String,
  state: FilterState,
}

impl DkimMilter {
  fn new(pid: &str) -> Self {
    Self {
      pid: pid.to_string(),
      state: FilterState::Init,
    }
  }

  fn process(&mut self, record: &record::Record) -> anyhow::Result<Option<Command>> {
    match (self.state, record.name()) {
      (FilterState::Init, "dkimmilter_client_connect") => {
        self.state = FilterState::Connected;
        Ok(None)
      }
      (FilterState::Init, "dkimmilter_client_disconnect") => Ok(Some(Command::DeletePid)),
      (FilterState::Connected, "dkimmilter_queueid_identified") => {
        Ok(Some(Command::AddMessage(message::MailMessage::new(
          message::Source::DkimMilter,
          Some(record.require("queueid")?.to_string()),
        ))))
      }
      (FilterState::Connected, "dkimmilter_client_disconnect") => Ok(Some(Command::DeletePid)),
      _ => Err(crate::Error::unexpected(
        format!("postfix/dkimmilter/smtpd[{}]", self.pid),
        self.state,
        record,
      )),
    }
  }
}

// The smtpd front-end postfix runs for the amavisd loopback path.
#[derive(Debug)]
pub struct Amavisd {
  pid: String,
  state: FilterState,
}

impl Amavisd {
  fn new(pid: &str) -> Self {
    Self {
      pid: pid.to_string(),
      state: FilterState::Init,
    }
  }

  fn process(&mut self, record: &record::Record) -> anyhow::Result<Option<Command>> {
    match (self.state, record.name()) {
      (FilterState::Init, "amavisd_client_connect") => {
        self.state = FilterState::Connected;
        Ok(None)
      }
      // The connect can be missing when the process outlives a log rotation;
      // tolerate a mid-stream start.
      (FilterState::Init, "amavisd_queueid_identified") => {
        self.state = FilterState::Connected;
        Ok(Some(Command::AddMessage(message::MailMessage::new(
          message::Source::Amavisd,
          Some(record.require("queueid")?.to_string()),
        ))))
      }
      (FilterState::Init, "amavisd_client_disconnect") => Ok(Some(Command::DeletePid)),
      (FilterState::Connected, "amavisd_queueid_identified") => {
        Ok(Some(Command::AddMessage(message::MailMessage::new(
          message::Source::Amavisd,
          Some(record.require("queueid")?.to_string()),
        ))))
      }
      (FilterState::Connected, "amavisd_client_disconnect") => Ok(Some(Command::DeletePid)),
      _ => Err(crate::Error::unexpected(
        format!("postfix/amavisd/smtpd[{}]", self.pid),
        self.state,
        record,
      )),
    }
  }
}
