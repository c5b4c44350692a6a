// End-to-end runs over literal log lines, checking the final shape of the
// reconstructed messages.

use anyhow::Context as _;
use maillog::{engine, message};
use pretty_assertions::assert_eq;
use std::{fs, io::Write as _};
use test_log::test;

const YEAR: i32 = 2013;

fn feed(engine: &mut engine::Engine, lines: &[&str]) -> anyhow::Result<()> {
  for line in lines {
    engine.feed(line)?;
  }
  Ok(())
}

#[test]
fn local_pickup_delivered_and_removed() -> anyhow::Result<()> {
  let mut engine = engine::Engine::new(YEAR);
  feed(&mut engine, &[
    "Aug 25 03:38:36 mail postfix/pickup[2268]: 17442321AC9: uid=498 from=<zimbra>",
    "Aug 25 03:38:36 mail postfix/cleanup[6880]: 17442321AC9: message-id=<X@h>",
    "Aug 25 03:38:36 mail postfix/qmgr[3569]: 17442321AC9: from=<zimbra@h>, size=744, nrcpt=1 (queue active)",
    "Aug 25 03:38:36 mail postfix/lmtp[9246]: 17442321AC9: to=<u@h>, relay=mail.example.com[172.16.20.3]:7025, delay=0.06, delays=0/0/0.01/0.05, dsn=2.1.5, status=sent (250 2.1.5 Delivery OK)",
    "Aug 25 03:38:36 mail postfix/qmgr[3569]: 17442321AC9: removed",
  ])?;

  assert_eq!(0, engine.in_flight());
  let done = engine
    .processed()
    .iter()
    .find(|message| message.messageid.as_deref() == Some("<X@h>"))
    .context("the delivered message is retired")?;
  assert_eq!(message::State::Done, done.state);
  assert_eq!(Some("17442321AC9"), done.queueid.as_deref());
  assert_eq!(Some("zimbra@h"), done.mail_from.as_deref());
  assert_eq!(1, done.instances.len());
  assert_eq!(
    message::InstanceState::LocallyDelivered,
    done.instances[&("u@h".to_string(), None)].state
  );
  Ok(())
}

#[test]
fn smtpd_connection_mints_a_message() -> anyhow::Result<()> {
  let mut engine = engine::Engine::new(YEAR);
  feed(&mut engine, &[
    "Aug 25 03:37:58 mail postfix/smtpd[24044]: connect from guppy.example-domain.com[197.100.0.140]",
    "Aug 25 03:37:58 mail postfix/smtpd[24044]: NOQUEUE: filter: RCPT from guppy.example-domain.com[197.100.0.140]: <machine@example.com>: Sender address triggers FILTER smtp-amavis:[127.0.0.1]:10026; from=<machine@example.com> to=<MAILER-DAEMON@mail.example.com> proto=SMTP helo=<example.com>",
    "Aug 25 03:37:58 mail postfix/smtpd[24044]: ACF22321AC7: client=guppy.example-domain.com[197.100.0.140]",
  ])?;

  let message = engine.message("ACF22321AC7").context("minted message")?;
  assert_eq!(message::Source::Smtpd, message.source);
  assert_eq!(Some("machine@example.com"), message.mail_from.as_deref());
  assert_eq!(Some("guppy.example-domain.com"), message.clienthostname.as_deref());
  assert_eq!(Some("197.100.0.140"), message.clienthostip.as_deref());
  assert!(message
    .instances
    .contains_key(&("MAILER-DAEMON@mail.example.com".to_string(), None)));
  Ok(())
}

#[test]
fn amavis_10024_rejection() -> anyhow::Result<()> {
  let mut engine = engine::Engine::new(YEAR);
  feed(&mut engine, &[
    "Aug 26 07:52:55 mail postfix/smtpd[28574]: connect from mxout3.iskon.hr[213.191.128.82]",
    "Aug 26 07:52:55 mail postfix/smtpd[28574]: NOQUEUE: filter: RCPT from mxout3.iskon.hr[213.191.128.82]: <s-1@inet.hr>: Sender address triggers FILTER smtp-amavis:[127.0.0.1]:10026; from=<s-1@inet.hr> to=<name.surname@example.com> proto=ESMTP helo=<mxout3.iskon.hr>",
    "Aug 26 07:52:55 mail postfix/smtpd[28574]: 1E378321AC7: client=mxout3.iskon.hr[213.191.128.82]",
    "Aug 26 07:52:56 mail postfix/smtpd[28574]: 1E378321AC7: filter: RCPT from mxout3.iskon.hr[213.191.128.82]: <s-1@inet.hr>: Sender address triggers FILTER smtp-amavis:[127.0.0.1]:10026; from=<s-1@inet.hr> to=<name.surname@example.com> proto=ESMTP helo=<mxout3.iskon.hr>",
    "Aug 26 07:52:56 mail postfix/smtpd[28574]: 1E378321AC7: filter: RCPT from mxout3.iskon.hr[213.191.128.82]: <s-1@inet.hr>: Sender address triggers FILTER smtp-amavis:[127.0.0.1]:10024; from=<s-1@inet.hr> to=<name.surname@example.com> proto=ESMTP helo=<mxout3.iskon.hr>",
    "Aug 26 07:52:56 mail postfix/smtpd[28574]: 1E378321AC7: reject: RCPT from mxout3.iskon.hr[213.191.128.82]: 550 5.1.1 <name.surname@example.com>: Recipient address rejected: example.com; from=<s-1@inet.hr> to=<name.surname@example.com> proto=ESMTP helo=<mxout3.iskon.hr>",
    "Aug 26 07:52:56 mail postfix/smtpd[28574]: disconnect from mxout3.iskon.hr[213.191.128.82]",
  ])?;

  let message = engine.message("1E378321AC7").context("minted message")?;
  let instance = &message.instances[&("name.surname@example.com".to_string(), None)];
  assert_eq!(message::InstanceState::MessageRejected, instance.state);
  assert_eq!(None, instance.newqueueid);
  Ok(())
}

#[test]
fn spam_is_discarded_not_queued() -> anyhow::Result<()> {
  let mut engine = engine::Engine::new(YEAR);
  feed(&mut engine, &[
    "Aug 25 03:38:49 mail postfix/cleanup[6880]: 4A314321AC7: message-id=<spam@h>",
    "Aug 25 03:38:53 mail postfix/smtp[8978]: 4A314321AC7: to=<nsurname@example.com>, orig_to=<name.surname@example.com>, relay=127.0.0.1[127.0.0.1]:10024, delay=4, delays=1.9/0/0/2.1, dsn=2.7.0, status=sent (250 2.7.0 Ok, discarded, id=19653-19 - spam)",
  ])?;

  let message = engine.message("4A314321AC7").context("message in flight")?;
  let instance = &message.instances[&(
    "nsurname@example.com".to_string(),
    Some("name.surname@example.com".to_string()),
  )];
  assert_eq!(message::InstanceState::MessageSpam, instance.state);
  assert_eq!(Some("19653-19"), instance.spamid.as_deref());
  Ok(())
}

#[test]
fn deferred_then_queued() -> anyhow::Result<()> {
  let mut engine = engine::Engine::new(YEAR);
  feed(&mut engine, &[
    "Aug 25 03:39:00 mail postfix/cleanup[6880]: 70920321AD8: message-id=<d@h>",
    "Aug 25 03:39:00 mail postfix/qmgr[3569]: 70920321AD8: from=<a@h>, size=100, nrcpt=1 (queue active)",
    "Aug 25 03:41:37 mail postfix/smtp[1494]: 70920321AD8: to=<name.surname@example-domain.com>, relay=none, delay=130583, delays=130580/0/3/0, dsn=4.4.1, status=deferred (connect to example-domain.com[192.168.4.9]:25: Connection refused)",
    "Aug 25 05:00:00 mail postfix/smtp[1494]: 70920321AD8: to=<name.surname@example-domain.com>, relay=127.0.0.1[127.0.0.1]:10024, delay=5000, delays=4999/0/0/1, dsn=2.0.0, status=sent (250 2.0.0 Ok: queued as C4C58321AC9)",
  ])?;

  let message = engine.message("70920321AD8").context("message in flight")?;
  let instance = &message.instances[&("name.surname@example-domain.com".to_string(), None)];
  assert_eq!(message::InstanceState::MessageQueued, instance.state);
  assert_eq!(Some("C4C58321AC9"), instance.newqueueid.as_deref());
  assert_eq!(Some("127.0.0.1"), instance.relayhostname.as_deref());
  assert_eq!(Some("127.0.0.1"), instance.relayhostip.as_deref());
  assert_eq!(Some("10024"), instance.relayport.as_deref());
  Ok(())
}

#[test]
fn milter_reject_retires_the_message() -> anyhow::Result<()> {
  let mut engine = engine::Engine::new(YEAR);
  feed(&mut engine, &[
    "Aug 27 23:01:17 mail postfix/cleanup[9931]: 591F7321ACD: message-id=<r@h>",
    "Aug 27 23:01:18 mail postfix/cleanup[9931]: 591F7321ACD: milter-reject: END-OF-MESSAGE from unknown[2.186.157.28]: 4.7.1 Service unavailable - try again later; from=<username@6789.us> to=<username@domain.com> proto=ESMTP helo=<[2.186.157.28]>",
  ])?;

  assert_eq!(0, engine.in_flight());
  let done = engine
    .processed()
    .iter()
    .find(|message| message.messageid.as_deref() == Some("<r@h>"))
    .context("the rejected message is retired")?;
  assert_eq!(message::State::MilterReject, done.state);
  Ok(())
}

#[test]
fn dump_is_deterministic() -> anyhow::Result<()> {
  let mut engine = engine::Engine::new(YEAR);
  feed(&mut engine, &[
    "Aug 25 03:38:36 mail postfix/pickup[2268]: 17442321AC9: uid=498 from=<zimbra>",
    "Aug 25 03:38:36 mail postfix/cleanup[6880]: 17442321AC9: message-id=<X@h>",
    "Aug 25 03:38:36 mail postfix/qmgr[3569]: 17442321AC9: from=<zimbra@h>, size=744, nrcpt=1 (queue active)",
    "Aug 25 03:38:36 mail postfix/lmtp[9246]: 17442321AC9: to=<u@h>, relay=mail.example.com[172.16.20.3]:7025, delay=0.06, delays=0/0/0.01/0.05, dsn=2.1.5, status=sent (250 2.1.5 Delivery OK)",
    "Aug 25 03:38:36 mail postfix/qmgr[3569]: 17442321AC9: removed",
  ])?;

  let mut output = Vec::new();
  engine.dump(&mut output)?;
  assert_eq!(
    "17442321AC9 from=<> ->\n17442321AC9 from=<zimbra@h> -> <u@h>\n",
    String::from_utf8(output)?
  );
  Ok(())
}

#[test]
fn xz_compressed_input() -> anyhow::Result<()> {
  let directory = tempfile::tempdir()?;
  let path = directory.path().join("mail.log.xz");
  let mut encoder = xz2::write::XzEncoder::new(fs::File::create(&path)?, 6);
  for line in [
    "Aug 25 03:38:36 mail postfix/pickup[2268]: 17442321AC9: uid=498 from=<zimbra>",
    "Aug 25 03:38:36 mail postfix/cleanup[6880]: 17442321AC9: message-id=<X@h>",
    "Aug 25 03:38:36 mail postfix/qmgr[3569]: 17442321AC9: from=<zimbra@h>, size=744, nrcpt=1 (queue active)",
    "Aug 25 03:38:36 mail postfix/qmgr[3569]: 17442321AC9: removed",
  ] {
    writeln!(encoder, "{line}")?;
  }
  encoder.finish()?;

  maillog::run(&maillog::Arguments {
    log: path
      .to_str()
      .with_context(|| format!("couldn't convert {path:?} to string"))?
      .to_string(),
    year: YEAR,
  })
}
