use crate::catalog;
use std::collections;

// A classified log line: the winning rule plus the named captures. The
// timestamp is promoted to a date because syslog omits the year and the caller
// has to supply it.
#[derive(Debug)]
pub struct Record {
  pub rule: &'static catalog::Rule,
  pub timestamp: chrono::NaiveDateTime,
  fields: collections::HashMap<&'static str, String>,
}

impl Record {
  pub fn name(&self) -> &'static str {
    self.rule.name
  }

  // The whole matched line (capture group zero).
  pub fn all(&self) -> &str {
    // Guaranteed by classify: group zero always participates.
    self.fields.get("all").unwrap()
  }

  // None when the capture group didn't participate in the match (for example an
  // absent orig_to=<...>), which is distinct from a group that matched the
  // empty string.
  pub fn field(&self, name: &str) -> Option<&str> {
    self.fields.get(name).map(String::as_str)
  }

  pub fn require(&self, name: &str) -> anyhow::Result<&str> {
    match self.field(name) {
      Some(value) => Ok(value),
      None => anyhow::bail!("{}: no {name} captured in: {}", self.rule.name, self.all()),
    }
  }
}

// Linear scan over the catalog, first full-line match wins.
pub fn classify(line: &str, year: i32) -> anyhow::Result<Record> {
  for rule in catalog::rules() {
    let captures = match rule.pattern.captures(line) {
      Some(captures) => captures,
      None => continue,
    };
    if rule.debug {
      log::debug!("{}: {captures:?}", rule.name);
    }
    let mut timestamp = None;
    let mut fields = collections::HashMap::new();
    for (name, capture) in rule.fields.iter().zip(captures.iter()) {
      let capture = match capture {
        Some(capture) => capture,
        None => continue,
      };
      if *name == "timestamp" {
        // "Jul  7 03:03:45" or "Jun 30 04:02:57"; naive local time, no timezone
        // inference.
        timestamp = Some(
          chrono::NaiveDateTime::parse_from_str(
            &format!("{year} {}", capture.as_str()),
            "%Y %b %e %H:%M:%S",
          )
          .map_err(|error| {
            anyhow::anyhow!("{}: bad timestamp {:?}: {error}", rule.name, capture.as_str())
          })?,
        );
      } else if !name.is_empty() {
        fields.insert(*name, capture.as_str().to_string());
      }
    }
    return Ok(Record {
      rule,
      // Every rule captures a timestamp as its first group.
      timestamp: timestamp
        .ok_or_else(|| anyhow::anyhow!("{}: no timestamp captured", rule.name))?,
      fields,
    });
  }
  Err(crate::Error::UnmatchedLine(line.to_string()).into())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamp_gets_the_ambient_year() -> anyhow::Result<()> {
    let record = classify(
      "Aug 25 03:37:58 mail postfix/qmgr[3569]: ACF22321AC7: removed",
      2013,
    )?;
    assert_eq!("message_removed", record.name());
    assert_eq!(
      chrono::NaiveDate::from_ymd_opt(2013, 8, 25)
        .unwrap()
        .and_hms_opt(3, 37, 58)
        .unwrap(),
      record.timestamp
    );
    assert_eq!(Some("ACF22321AC7"), record.field("queueid"));
    Ok(())
  }

  #[test]
  fn single_digit_day() -> anyhow::Result<()> {
    let record = classify(
      "Sep  9 00:40:15 mail postfix/smtpd[4349]: warning: non-SMTP command from unknown[89.248.172.122]: Content-Type: text/html",
      2013,
    )?;
    assert_eq!("smtpd_command_error", record.name());
    assert_eq!(9, chrono::Datelike::day(&record.timestamp));
    Ok(())
  }

  #[test]
  fn discarded_groups_are_absent() -> anyhow::Result<()> {
    let record = classify(
      "Aug 25 03:37:58 mail postfix/smtpd[24044]: connect from guppy.example-domain.com[197.100.0.140]",
      2013,
    )?;
    assert_eq!(Some("guppy.example-domain.com"), record.field("clienthostname"));
    assert_eq!(Some("197.100.0.140"), record.field("clienthostip"));
    assert_eq!(None, record.field("queueid"));
    Ok(())
  }

  #[test]
  fn optional_orig_to_is_absent_not_empty() -> anyhow::Result<()> {
    let record = classify(
      "Aug 25 03:37:59 mail postfix/lmtp[9246]: 21361321ACB: to=<machine@example.com>, relay=mail.example.com[172.16.20.3]:7025, delay=0.06, delays=0/0/0.01/0.05, dsn=2.1.5, status=sent (250 2.1.5 Delivery OK)",
      2013,
    )?;
    assert_eq!("local_delivery", record.name());
    assert_eq!(Some("machine@example.com"), record.field("to"));
    assert_eq!(None, record.field("orig_to"));

    let record = classify(
      "Aug 27 09:36:41 mail postfix/lmtp[19258]: BE8A0321ACC: to=<nsurname@example.com>, orig_to=<list@example.com>, relay=mail.example.com[172.16.20.3]:7025, delay=0.1, delays=0.01/0/0/0.09, dsn=2.1.5, status=sent (250 2.1.5 Delivery OK)",
      2013,
    )?;
    assert_eq!(Some("list@example.com"), record.field("orig_to"));
    Ok(())
  }

  #[test]
  fn spam_capture() -> anyhow::Result<()> {
    let record = classify(
      "Aug 25 03:38:53 mail postfix/smtp[8978]: 4A314321AC7: to=<nsurname@example.com>, orig_to=<name.surname@example.com>, relay=127.0.0.1[127.0.0.1]:10024, delay=4, delays=1.9/0/0/2.1, dsn=2.7.0, status=sent (250 2.7.0 Ok, discarded, id=19653-19 - spam)",
      2013,
    )?;
    assert_eq!("message_spam_discarded", record.name());
    assert_eq!(Some("19653-19"), record.field("spamid"));
    assert_eq!(Some("127.0.0.1"), record.field("relayhostname"));
    assert_eq!(Some("127.0.0.1"), record.field("relayhostip"));
    assert_eq!(Some("10024"), record.field("relayport"));
    Ok(())
  }

  #[test]
  fn new_queueid_capture() -> anyhow::Result<()> {
    let record = classify(
      "Aug 25 03:37:58 mail postfix/smtp[5929]: ACF22321AC7: to=<mailarchive@[172.16.1.10]>, relay=127.0.0.1[127.0.0.1]:10026, delay=0.15, delays=0.01/0/0/0.14, dsn=2.0.0, status=sent (250 2.0.0 from MTA(smtp:[127.0.0.1]:10030): 250 2.0.0 Ok: queued as C1FF3321AC9)",
      2013,
    )?;
    assert_eq!("message_queued", record.name());
    assert_eq!(Some("C1FF3321AC9"), record.field("newqueueid"));
    Ok(())
  }

  #[test]
  fn unmatched_line_is_fatal() {
    let error = classify("Aug 25 03:37:58 mail crond[123]: whatever", 2013).unwrap_err();
    match error.downcast_ref::<crate::Error>() {
      Some(crate::Error::UnmatchedLine(line)) => {
        assert_eq!("Aug 25 03:37:58 mail crond[123]: whatever", line)
      }
      _ => panic!("expected an unmatched line error, got {error:?}"),
    }
  }
}
