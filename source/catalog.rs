// The rule table for a Zimbra 8 mail stack: Postfix proper plus the amavisd and
// dkim-milter front-ends it spawns. Rules are tried in declaration order and the
// first full-line match wins, so a handful of orderings below are load-bearing
// and called out where they matter.

use once_cell::sync::Lazy;

// Date and a time in a format "Jul  7 03:03:45" or "Jun 30 04:02:57".
const DATE: &str = "([a-zA-Z]{3}[ ]{1,2}[0-9]{1,2} [0-9]{2}:[0-9]{2}:[0-9]{2})";

// Host name, without domain.
const HOSTNAME: &str = "([a-zA-Z0-9_-]+)";

// PID in square brackets.
const PID: &str = r"\[([0-9]+)\]";

// IPv4 address.
const IPV4: &str = "([0-9]{1,3}.[0-9]{1,3}.[0-9]{1,3}.[0-9]{1,3})";

// Port number.
const PORT: &str = "([0-9]{1,5})";

// FQDN.
const FQDN: &str = "([a-zA-Z0-9._-]+)";

// Mail address within <>.
const MAIL: &str = "<([^>]*)>";

// Identifier within a helo command.
const HELO: &str = "<([^>]*)>";

// Postfix queue identifier, a string of 7 to 12 uppercase letters and numbers.
const QUEUEID: &str = "([A-Z0-9]{7,12})";

const CONN_USE: &str = "conn_use=([0-9.]+)";

// A single delay value.
const DELAY: &str = "delay=([0-9.]+)";

// The four-part delay breakdown.
const DELAYS: &str = "delays=([0-9.]+)/([0-9.]+)/([0-9.]+)/([0-9.]+)";

// DSN status.
const DSN: &str = r"dsn=([0-9]\.[0-9]\.[0-9])";

const UID: &str = "uid=([0-9]+)";

// Spam identifier assigned when amavis drops a message.
const SPAM_ID: &str = "id=([0-9-]+)";

// Which state machine a rule's records are dispatched to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Router {
  // By PID, to the matching daemon machine.
  Postfix,
  DkimMilter,
  Amavisd,
  // By queue identifier, to a MailMessage.
  QueueId,
  // Diagnostic lines: classified, never state-driving.
  Pid,
}

#[derive(Debug)]
pub struct Rule {
  pub name: &'static str,
  pub pattern: regex::Regex,
  // One name per capture group, in group order; an empty name discards the
  // group. Group zero is always "all".
  pub fields: &'static [&'static str],
  pub router: Router,
  pub debug: bool,
}

fn rule(
  name: &'static str,
  pattern: &str,
  fields: &'static [&'static str],
  router: Router,
  debug: bool,
) -> Rule {
  // The table is static data, a malformed entry is a programming error.
  let pattern = regex::Regex::new(&format!("^{pattern}$")).unwrap();
  assert_eq!(
    pattern.captures_len(),
    fields.len(),
    "{name}: the field list doesn't cover the capture groups"
  );
  Rule {
    name,
    pattern,
    fields,
    router,
    debug,
  }
}

pub fn rules() -> &'static [Rule] {
  &RULES
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
  // FQDN or "unknown", with the IP (or "unknown") in square brackets.
  let client = format!(r"(({FQDN}|unknown)\[({IPV4}|unknown)\])");
  // The same, plus a port.
  let client_port = format!("({client}:{PORT})");
  // relay=none, relay=local or relay=host[ip]:port.
  let relay = format!("relay=((none)|(local)|{client_port})");
  let to = format!("to={MAIL}");
  let orig_to = format!("orig_to={MAIL}");
  let from = format!("from={MAIL}");

  vec![
    // Aug 25 18:28:01 mail postfix/smtpd[25292]: D3B73321AC7: client=93-136-95-83.adsl.net.t-com.hr[93.136.95.83], sasl_method=PLAIN, sasl_username=username
    rule(
      "smtpd_sasl_login",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: {QUEUEID}: client={client}, sasl_method=(PLAIN|LOGIN), sasl_username=([a-z0-9A-Z.]+)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "clienthostname", "", "clienthostip", "", "sasl_method", "username"],
      Router::QueueId,
      false,
    ),
    // Aug 27 12:20:01 mail postfix/smtpd[28312]: warning: unknown[1.2.3.4]: SASL LOGIN authentication failed: authentication failure
    rule(
      "smtpd_sasl_login_failure",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: warning: {client}: SASL (LOGIN|PLAIN) authentication failed: authentication failure"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", "", "method"],
      Router::Pid,
      false,
    ),
    // Aug 27 12:20:01 mail postfix/smtpd[28312]: warning: SASL authentication failure: Password verification failed
    rule(
      "smtpd_sasl_password_failure",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: warning: SASL authentication failure: Password verification failed"),
      &["all", "timestamp", "hostname", "PID"],
      Router::Pid,
      false,
    ),
    // Aug 25 03:45:46 mail postfix/smtpd[24044]: Anonymous TLS connection established from mail-ob0-f182.google.com[209.85.214.182]: TLSv1 with cipher ECDHE-RSA-RC4-SHA (128/128 bits)
    rule(
      "smtpd_tls_established",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: Anonymous TLS connection established from {client}: (.*)"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", "", "tlscipher"],
      Router::Pid,
      false,
    ),
    // Aug 25 14:40:01 mail postfix/smtpd[23025]: SSL_accept error from unknown[10.10.0.101]: -1
    rule(
      "smtpd_ssl_accept_error",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: SSL_accept error from {client}: (.*)"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", "", "sslerror"],
      Router::Pid,
      false,
    ),
    // Aug 25 14:40:01 mail postfix/smtpd[23025]: warning: TLS library problem: 23025:error:1408F119:SSL routines:SSL3_GET_RECORD:decryption failed or bad record mac:s3_pkt.c:484:
    rule(
      "smtpd_tls_library_error",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: warning: TLS library problem: (.+)"),
      &["all", "timestamp", "hostname", "PID", "tlserror"],
      Router::Pid,
      false,
    ),
    // Sep  9 00:40:15 mail postfix/smtpd[4349]: warning: non-SMTP command from unknown[89.248.172.122]: Content-Type: text/html
    rule(
      "smtpd_command_error",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: warning: non-SMTP command from {client}: (.*)"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", "", "error"],
      Router::Pid,
      false,
    ),
    // Aug 25 03:37:58 mail postfix/smtpd[24044]: connect from guppy.example-domain.com[197.100.0.140]
    rule(
      "smtpd_client_connect",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: connect from {client}"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", ""],
      Router::Postfix,
      false,
    ),
    // Aug 25 03:37:58 mail postfix/smtpd[24044]: NOQUEUE: filter: RCPT from guppy.example-domain.com[197.100.0.140]: <machine@example.com>: Sender address triggers FILTER smtp-amavis:[127.0.0.1]:10026; from=<machine@example.com> to=<MAILER-DAEMON@mail.example.com> proto=SMTP helo=<example.com>
    rule(
      "smtpd_amavis_10026",
      &format!(r"{DATE} {HOSTNAME} postfix/smtpd{PID}: NOQUEUE: filter: (RCPT|VRFY) from {client}: {MAIL}: Sender address triggers FILTER smtp-amavis:\[127.0.0.1\]:10026; from={MAIL} to={MAIL} proto=E?SMTP helo={HELO}"),
      &["all", "timestamp", "hostname", "PID", "smtpcommand", "", "clienthostname", "", "clienthostip", "", "", "from", "to", "heloid"],
      Router::Postfix,
      false,
    ),
    // Aug 25 04:03:14 mail postfix/smtpd[24890]: 1B41C321AC7: filter: RCPT from unknown[197.100.1.49]: <arpwatch@monitor1.example-domain.com>: Sender address triggers FILTER smtp-amavis:[127.0.0.1]:10026; from=<arpwatch@monitor1.example-domain.com> to=<nsurname@example.com> proto=ESMTP helo=<monitor1.example-domain.com>
    rule(
      "smtpd_amavis_10026_queueid",
      &format!(r"{DATE} {HOSTNAME} postfix/smtpd{PID}: {QUEUEID}: filter: RCPT from {client}: {MAIL}: Sender address triggers FILTER smtp-amavis:\[127.0.0.1\]:10026; from={MAIL} to={MAIL} proto=E?SMTP helo={HELO}"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "clienthostname", "", "clienthostip", "", "from", "", "to", "heloid"],
      Router::QueueId,
      false,
    ),
    // Aug 25 03:38:50 mail postfix/smtpd[24044]: NOQUEUE: filter: RCPT from netacc-gpn-4-217-128.pool.telenor.hu[84.224.217.128]: <>: Sender address triggers FILTER smtp-amavis:[127.0.0.1]:10024; from=<> to=<name.surname@example.com> proto=SMTP helo=<84.224.217.128>
    rule(
      "smtpd_amavis_10024",
      &format!(r"{DATE} {HOSTNAME} postfix/smtpd{PID}: NOQUEUE: filter: (RCPT|VRFY) from {client}: {MAIL}: Sender address triggers FILTER smtp-amavis:\[127.0.0.1\]:10024; from={MAIL} to={MAIL} proto=E?SMTP helo={HELO}"),
      &["all", "timestamp", "hostname", "PID", "smtpcommand", "", "clienthostname", "", "clienthostip", "", "", "from", "to", "heloid"],
      Router::Pid,
      false,
    ),
    // Aug 26 07:52:56 mail postfix/smtpd[28574]: 1E378321AC7: filter: RCPT from mxout3.iskon.hr[213.191.128.82]: <s-1@inet.hr>: Sender address triggers FILTER smtp-amavis:[127.0.0.1]:10024; from=<s-1@inet.hr> to=<name.surname@example.com> proto=ESMTP helo=<mxout3.iskon.hr>
    rule(
      "smtpd_amavis_10024_queueid",
      &format!(r"{DATE} {HOSTNAME} postfix/smtpd{PID}: {QUEUEID}: filter: RCPT from {client}: {MAIL}: Sender address triggers FILTER smtp-amavis:\[127.0.0.1\]:10024; from={MAIL} to={MAIL} proto=E?SMTP helo={HELO}"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "clienthostname", "", "clienthostip", "", "", "from", "to", "heloid"],
      Router::QueueId,
      false,
    ),
    // Aug 25 03:37:58 mail postfix/smtpd[24044]: ACF22321AC7: client=guppy.example-domain.com[197.100.0.140]
    rule(
      "smtpd_queueid_identified",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: {QUEUEID}: client={client}"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "clienthostname", "", "clienthostip", ""],
      Router::Postfix,
      false,
    ),
    // Aug 28 16:39:09 mail postfix/smtpd[26747]: warning: Illegal address syntax from unknown[197.100.2.123] in RCPT command: <inga@h.s.p.t.-com>
    rule(
      "smtpd_invalid_syntax",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: warning: Illegal address syntax from {client} in (RCPT|MAIL) command: {MAIL}"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", "", "command", "to"],
      Router::Pid,
      false,
    ),
    // Aug 29 15:16:20 mail postfix/smtpd[5414]: improper command pipelining after QUIT from guppy.example-domain.com[197.100.0.140]:
    rule(
      "smtpd_improper_pipelining",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: improper command pipelining after (QUIT|DATA) from {client}:(.*)"),
      &["all", "timestamp", "hostname", "PID", "command", "", "clienthostname", "", "clienthostip", "", "error"],
      Router::Pid,
      false,
    ),
    // Aug 25 03:45:02 mail postfix/smtpd[22024]: NOQUEUE: reject: RCPT from 189-47-180-38.dsl.telesp.net.br[189.47.180.38]: 550 5.1.1 <nsurname@example.com>: Recipient address rejected: example.com; from=<nsurname@actgen.in> to=<nsurname@example.com> proto=ESMTP helo=<189-47-180-38.dsl.telesp.net.br>
    rule(
      "smtpd_address_rejected",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: NOQUEUE: reject: RCPT from {client}: 550 5.1.1 {MAIL}: Recipient address rejected: {FQDN}; {from} {to} proto=E?SMTP helo={HELO}"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", "", "", "", "from", "to", "heloid"],
      Router::Pid,
      false,
    ),
    // Aug 25 18:03:59 mail postfix/smtpd[24548]: NOQUEUE: reject: RCPT from 1-164-95-121.dynamic.hinet.net[1.164.95.121]: 554 5.7.1 <smtp@k888.tw>: Relay access denied; from=<ffrqfa@hotmail.com> to=<smtp@k888.tw> proto=SMTP helo=<212.92.192.73>
    rule(
      "smtpd_relay_denied",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: NOQUEUE: reject: (VRFY|RCPT) from {client}: 554 5.7.1 {MAIL}: Relay access denied; {from} {to} proto=E?SMTP helo={HELO}"),
      &["all", "timestamp", "hostname", "PID", "smtpcommand", "", "clienthostname", "", "clienthostip", "", "", "from", "to", "heloid"],
      Router::Pid,
      false,
    ),
    // This one is strange, how is it possible to have neither a from field nor a HELO id?
    // Sep  1 08:46:14 mail postfix/smtpd[6438]: NOQUEUE: reject: VRFY from unknown[200.170.193.170]: 554 5.7.1 <root>: Relay access denied; to=<root> proto=SMTP
    rule(
      "smtpd_relay_denied_strange",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: NOQUEUE: reject: (VRFY|RCPT) from {client}: 554 5.7.1 {MAIL}: Relay access denied; {to} proto=E?SMTP"),
      &["all", "timestamp", "hostname", "PID", "smtpcommand", "", "clienthostname", "", "clienthostip", "", "", "to"],
      Router::Pid,
      false,
    ),
    // Sep  9 09:17:29 mail postfix/smtpd[16004]: NOQUEUE: reject: RCPT from unknown[151.252.231.186]: 504 5.5.2 <u@paccpv>: Recipient address rejected: need fully-qualified address; from=<nsurname@example.com> to=<u@paccpv> proto=ESMTP helo=<[192.168.1.5]>
    rule(
      "smtpd_address_rejected_unqualified",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: NOQUEUE: reject: RCPT from {client}: 504 5.5.2 {MAIL}: Recipient address rejected: need fully-qualified address; {from} {to} proto=E?SMTP helo={HELO}"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", "", "", "from", "to", "helo"],
      Router::Pid,
      false,
    ),
    // Aug 26 07:52:56 mail postfix/smtpd[28574]: 1E378321AC7: reject: RCPT from mxout3.iskon.hr[213.191.128.82]: 550 5.1.1 <name.surname@example.com>: Recipient address rejected: example.com; from=<s-1@inet.hr> to=<name.surname@example.com> proto=ESMTP helo=<mxout3.iskon.hr>
    rule(
      "smtpd_address_rejected_queueid",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: {QUEUEID}: reject: RCPT from {client}: 550 5.1.1 {MAIL}: Recipient address rejected: {FQDN}; {from} {to} proto=E?SMTP helo={HELO}"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "clienthostname", "", "clienthostip", "", "", "", "from", "to", "heloid"],
      Router::QueueId,
      false,
    ),
    // Sep  8 15:58:16 mail postfix/smtpd[24133]: 0BD70321AC7: reject: RCPT from unknown[31.217.64.6]: 504 5.5.2 <llel>: Recipient address rejected: need fully-qualified address; from=<nsurname@example.com> to=<llel> proto=ESMTP helo=<[10.209.238.199]>
    rule(
      "smtpd_address_rejected_queueid_unqualified",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: {QUEUEID}: reject: RCPT from {client}: 504 5.5.2 {MAIL}: Recipient address rejected: need fully-qualified address; {from} {to} proto=E?SMTP helo={HELO}"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "clienthostname", "", "clienthostip", "", "", "from", "to", "heloid"],
      Router::QueueId,
      false,
    ),
    // Aug 25 03:50:15 mail postfix/smtpd[24044]: warning: hostname 190-177-172-246.speedy.com.ar does not resolve to address 190.177.172.246: Name or service not known
    rule(
      "dns_warning",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: warning: hostname {FQDN} does not resolve to address {IPV4}(: (.+))?"),
      &["all", "timestamp", "hostname", "PID", "clienthostname", "clienthostip", "", "errormessage"],
      Router::Pid,
      false,
    ),
    // Sep 18 01:32:19 mail postfix/smtpd[1087]: warning: numeric hostname: 190.208.191.182
    rule(
      "numeric_hostname_warning",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: warning: numeric hostname: {IPV4}"),
      &["all", "timestamp", "hostname", "PID", "clienthostip"],
      Router::Pid,
      false,
    ),
    // Aug 25 03:37:58 mail postfix/cleanup[6880]: ACF22321AC7: message-id=<AC40A$20130825$03360900@SAS>
    rule(
      "messageid_identified",
      &format!("{DATE} {HOSTNAME} postfix/cleanup{PID}: {QUEUEID}: (resent-)?message-id=([^ ]+) ?"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "messageid"],
      Router::QueueId,
      false,
    ),
    // Aug 25 03:37:58 mail postfix/qmgr[3569]: ACF22321AC7: from=<machine@example.com>, size=744, nrcpt=2 (queue active)
    rule(
      "from_identified",
      &format!(r"{DATE} {HOSTNAME} postfix/qmgr{PID}: {QUEUEID}: from={MAIL}, size=([0-9]+), nrcpt=([0-9]+) \(queue active\)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "from", "size", "nrcpt"],
      Router::QueueId,
      false,
    ),
    // Aug 25 03:37:58 mail postfix/smtpd[24044]: disconnect from guppy.example-domain.com[197.100.0.140]
    rule(
      "smtpd_client_disconnect",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: disconnect from {client}"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", ""],
      Router::Postfix,
      false,
    ),
    // Aug 25 03:37:58 mail postfix/dkimmilter/smtpd[28263]: connect from localhost[127.0.0.1]
    rule(
      "dkimmilter_client_connect",
      &format!("{DATE} {HOSTNAME} postfix/dkimmilter/smtpd{PID}: connect from {client}"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", ""],
      Router::DkimMilter,
      false,
    ),
    // Aug 25 03:37:58 mail postfix/dkimmilter/smtpd[28263]: C1FF3321AC9: client=localhost[127.0.0.1]
    rule(
      "dkimmilter_queueid_identified",
      &format!("{DATE} {HOSTNAME} postfix/dkimmilter/smtpd{PID}: {QUEUEID}: client={client}"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "clienthostname", "", "clienthostip", ""],
      Router::DkimMilter,
      false,
    ),
    // Aug 25 03:37:58 mail postfix/dkimmilter/smtpd[28263]: disconnect from localhost[127.0.0.1]
    rule(
      "dkimmilter_client_disconnect",
      &format!("{DATE} {HOSTNAME} postfix/dkimmilter/smtpd{PID}: disconnect from {client}"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", ""],
      Router::DkimMilter,
      false,
    ),
    // Aug 27 13:00:30 mail postfix/smtpd[8384]: warning: milter inet:127.0.0.1:7026: can't read SMFIC_CONNECT reply packet header: Success
    rule(
      "smtpd_milter_warning",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: warning: milter inet:{IPV4}:{PORT}: (.+)"),
      &["all", "timestamp", "hostname", "PID", "hostip", "hostport", "message"],
      Router::Pid,
      false,
    ),
    // Aug 27 23:01:18 mail postfix/cleanup[9931]: warning: milter inet:127.0.0.1:7026: can't read SMFIC_BODYEOB reply packet header: Success
    rule(
      "cleanup_milter_warning",
      &format!("{DATE} {HOSTNAME} postfix/cleanup{PID}: warning: milter inet:{IPV4}:{PORT}: (.+)"),
      &["all", "timestamp", "hostname", "PID", "hostip", "hostport", "message"],
      Router::Pid,
      false,
    ),
    // Aug 27 23:01:18 mail postfix/cleanup[9931]: 591F7321ACD: milter-reject: END-OF-MESSAGE from unknown[2.186.157.28]: 4.7.1 Service unavailable - try again later; from=<username@6789.us> to=<username@domain.com> proto=ESMTP helo=<[2.186.157.28]>
    rule(
      "cleanup_milter_reject",
      &format!("{DATE} {HOSTNAME} postfix/cleanup{PID}: {QUEUEID}: milter-reject: END-OF-MESSAGE from {client}: (.+)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "clienthostname", "", "clienthostip", "", "errormsg"],
      Router::QueueId,
      false,
    ),
    // Aug 27 13:00:30 mail postfix/smtpd[8384]: NOQUEUE: milter-reject: CONNECT from unknown[unknown]: 451 4.7.1 Service unavailable - try again later; proto=SMTP
    rule(
      "smtpd_milter_reject",
      &format!("{DATE} {HOSTNAME} postfix/smtpd{PID}: NOQUEUE: milter-reject: CONNECT from {client}: (.+)"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", "", "errormsg"],
      Router::Pid,
      false,
    ),
    // Must come before message_queued and message_queued_all, both of which also
    // match a discarded-as-spam status=sent line.
    // Aug 25 03:38:53 mail postfix/smtp[8978]: 4A314321AC7: to=<nsurname@example.com>, orig_to=<name.surname@example.com>, relay=127.0.0.1[127.0.0.1]:10024, delay=4, delays=1.9/0/0/2.1, dsn=2.7.0, status=sent (250 2.7.0 Ok, discarded, id=19653-19 - spam)
    rule(
      "message_spam_discarded",
      &format!(r"{DATE} {HOSTNAME} postfix/smtp{PID}: {QUEUEID}: {to}(, {orig_to})?, {relay}, {DELAY}, {DELAYS}, {DSN}, status=sent \(250 2.7.0 Ok, discarded, {SPAM_ID} - spam\)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "to", "", "orig_to", "", "", "", "", "", "relayhostname", "", "relayhostip", "", "relayport", "delay", "delay1", "delay2", "delay3", "delay4", "dsn", "spamid"],
      Router::QueueId,
      false,
    ),
    // Must come before message_queued_all: this is the "queued as NEWID" form that
    // carries the downstream queue identifier.
    // Aug 25 03:37:58 mail postfix/smtp[5929]: ACF22321AC7: to=<mailarchive@[172.16.1.10]>, relay=127.0.0.1[127.0.0.1]:10026, delay=0.15, delays=0.01/0/0/0.14, dsn=2.0.0, status=sent (250 2.0.0 from MTA(smtp:[127.0.0.1]:10030): 250 2.0.0 Ok: queued as C1FF3321AC9)
    rule(
      "message_queued",
      &format!(r"{DATE} {HOSTNAME} postfix/smtp{PID}: {QUEUEID}: {to}(, {orig_to})?, {relay}(, {CONN_USE})?, {DELAY}, {DELAYS}, dsn=2.0.0, status=sent \(.+ queued as {QUEUEID}\)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "to", "", "orig_to", "", "", "", "", "", "relayhostname", "", "relayhostip", "", "relayport", "", "conn_use", "delay", "delay1", "delay2", "delay3", "delay4", "newqueueid"],
      Router::QueueId,
      false,
    ),
    // Aug 25 18:28:44 mail postfix/smtp[30924]: 24CCC321AC7: to=<n.surname@gmail.com>, relay=gmail-smtp-in.l.google.com[173.194.70.26]:25, delay=1.9, delays=0.09/0/0.35/1.4, dsn=2.0.0, status=sent (250 2.0.0 OK 1377448124 p9si7157489eeu.264 - gsmtp)
    rule(
      "message_queued_all",
      &format!(r"{DATE} {HOSTNAME} postfix/smtp{PID}: {QUEUEID}: {to}(, {orig_to})?, {relay}, {DELAY}, {DELAYS}, dsn=2.[0-7].0, status=sent \((.+)\)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "to", "", "orig_to", "", "", "", "", "", "relayhostname", "", "relayhostip", "", "relayport", "delay", "delay1", "delay2", "delay3", "delay4", "statusmsg"],
      Router::QueueId,
      false,
    ),
    // Aug 25 03:37:59 mail postfix/smtp[1494]: 1F4AE321ACA: to=<MAILER-DAEMON@mail.example.com>, relay=none, delay=0.01, delays=0/0/0/0, dsn=5.4.6, status=bounced (mail for mail.example.com loops back to myself)
    rule(
      "message_bounced_smtp",
      &format!(r"{DATE} {HOSTNAME} postfix/smtp{PID}: {QUEUEID}: {to}, {relay}, {DELAY}, {DELAYS}, {DSN}, status=bounced \((.+)\)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "to", "", "", "", "", "", "", "", "", "", "", "delay", "delay1", "delay2", "delay3", "delay4", "dsn", "statusmsg"],
      Router::QueueId,
      false,
    ),
    // Aug 26 09:53:53 mail postfix/error[26803]: 9C467321ACA: to=<nousername@example.com>, relay=none, delay=0.08, delays=0.01/0.07/0/0, dsn=5.0.0, status=bounced (example.com)
    rule(
      "message_bounced_error",
      &format!(r"{DATE} {HOSTNAME} postfix/error{PID}: {QUEUEID}: {to}, {relay}, {DELAY}, {DELAYS}, {DSN}, status=bounced \((.+)\)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "to", "relayhostname", "", "", "", "", "", "", "", "", "", "delay", "delay1", "delay2", "delay3", "delay4", "dsn", "statusmsg"],
      Router::QueueId,
      false,
    ),
    // Aug 25 03:41:37 mail postfix/smtp[1494]: 70920321AD8: to=<name.surname@example-domain.com>, relay=none, delay=130583, delays=130580/0/3/0, dsn=4.4.1, status=deferred (connect to example-domain.com[192.168.4.9]:25: Connection refused)
    rule(
      "message_deferred_smtp",
      &format!(r"{DATE} {HOSTNAME} postfix/smtp{PID}: {QUEUEID}: {to}, {relay}(, {CONN_USE})?, {DELAY}, {DELAYS}, {DSN}, status=deferred \((.+)\)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "to", "", "", "", "", "", "relayhostname", "", "relayhostip", "", "relayport", "", "conn_use", "delay", "delay1", "delay2", "delay3", "delay4", "dsn", "errormsg"],
      Router::QueueId,
      false,
    ),
    // Aug 26 15:56:36 mail postfix/error[303]: B8582321AD6: to=<name.surname@example-domain.com>, relay=none, delay=432998, delays=432998/0.01/0/0.01, dsn=4.4.1, status=deferred (delivery temporarily suspended: connect to example-domain.com[192.168.4.9]:25: Connection refused)
    rule(
      "message_deferred_error",
      &format!(r"{DATE} {HOSTNAME} postfix/error{PID}: {QUEUEID}: {to}, {relay}, {DELAY}, {DELAYS}, {DSN}, status=deferred \((.+)\)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "to", "", "", "", "", "", "", "", "", "", "", "delay", "delay1", "delay2", "delay3", "delay4", "dsn", "statusmsg"],
      Router::QueueId,
      false,
    ),
    // Aug 26 12:19:31 mail postfix/smtp[1664]: 5B972321AC7: host mail-in-a.mx.xnet.hr[83.139.103.70] said: 450 4.3.2 Service currently unavailable (in reply to RCPT TO command)
    rule(
      "smtp_unavailable",
      &format!("{DATE} {HOSTNAME} postfix/smtp{PID}: {QUEUEID}: host {client} said: (.+)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "relayhostname", "", "relayhostip", "", "errormsg"],
      Router::QueueId,
      false,
    ),
    // Aug 26 11:43:10 mail postfix/smtp[23009]: 45F5A321AC7: host mta6.am0.yahoodns.net[66.196.118.35] refused to talk to me: 421 4.7.0 [GL01] Message from (212.92.192.73) temporarily deferred - 4.16.50. Please refer to http://postmaster.yahoo.com/errors/postmaster-21.html
    rule(
      "message_deferred_spam",
      &format!("{DATE} {HOSTNAME} postfix/smtp{PID}: {QUEUEID}: host {client} refused to talk to me: (.+)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "relayhostname", "", "relayhostip", "", "errormsg"],
      Router::QueueId,
      false,
    ),
    // Aug 25 03:37:58 mail postfix/qmgr[3569]: ACF22321AC7: removed
    rule(
      "message_removed",
      &format!("{DATE} {HOSTNAME} postfix/qmgr{PID}: {QUEUEID}: removed"),
      &["all", "timestamp", "hostname", "PID", "queueid"],
      Router::QueueId,
      false,
    ),
    // Aug 25 11:41:37 mail postfix/qmgr[3569]: 477BB321ACC: from=<nsurname@example.com>, status=expired, returned to sender
    rule(
      "message_expired",
      &format!("{DATE} {HOSTNAME} postfix/qmgr{PID}: {QUEUEID}: {from}, status=expired, returned to sender"),
      &["all", "timestamp", "hostname", "PID", "queueid", "to"],
      Router::QueueId,
      false,
    ),
    // Aug 25 03:37:59 mail postfix/amavisd/smtpd[6894]: connect from localhost[127.0.0.1]
    rule(
      "amavisd_client_connect",
      &format!("{DATE} {HOSTNAME} postfix/amavisd/smtpd{PID}: connect from {client}"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", ""],
      Router::Amavisd,
      false,
    ),
    // Aug 25 03:37:59 mail postfix/amavisd/smtpd[6894]: 1CE0D321AC7: client=localhost[127.0.0.1]
    rule(
      "amavisd_queueid_identified",
      &format!("{DATE} {HOSTNAME} postfix/amavisd/smtpd{PID}: {QUEUEID}: client={client}"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "clienthostname", "", "clienthostip", ""],
      Router::Amavisd,
      false,
    ),
    // Aug 25 03:37:59 mail postfix/amavisd/smtpd[6894]: disconnect from localhost[127.0.0.1]
    rule(
      "amavisd_client_disconnect",
      &format!("{DATE} {HOSTNAME} postfix/amavisd/smtpd{PID}: disconnect from {client}"),
      &["all", "timestamp", "hostname", "PID", "", "clienthostname", "", "clienthostip", ""],
      Router::Amavisd,
      false,
    ),
    // Aug 25 03:37:59 mail postfix/bounce[19921]: 1F4AE321ACA: sender non-delivery notification: 21361321ACB
    rule(
      "delivery_status_error",
      &format!("{DATE} {HOSTNAME} postfix/bounce{PID}: {QUEUEID}: sender non-delivery notification: {QUEUEID}"),
      &["all", "timestamp", "hostname", "PID", "queueid", "newqueueid"],
      Router::QueueId,
      false,
    ),
    // Aug 26 09:52:43 mail postfix/bounce[26512]: 8BC4D321ACB: sender delivery status notification: A3603321AC9
    rule(
      "delivery_status_success",
      &format!("{DATE} {HOSTNAME} postfix/bounce{PID}: {QUEUEID}: sender delivery status notification: {QUEUEID}"),
      &["all", "timestamp", "hostname", "PID", "queueid", "newqueueid"],
      Router::QueueId,
      false,
    ),
    // Aug 25 03:37:59 mail postfix/lmtp[9246]: 21361321ACB: to=<machine@example.com>, relay=mail.example.com[172.16.20.3]:7025, delay=0.06, delays=0/0/0.01/0.05, dsn=2.1.5, status=sent (250 2.1.5 Delivery OK)
    rule(
      "local_delivery",
      &format!(r"{DATE} {HOSTNAME} postfix/lmtp{PID}: {QUEUEID}: {to}(, {orig_to})?, {relay}(, {CONN_USE})?, {DELAY}, {DELAYS}, dsn=2.1.5, status=sent \(250 2.1.5 Delivery OK\)"),
      &["all", "timestamp", "hostname", "PID", "queueid", "to", "", "orig_to", "", "", "", "", "", "relayhostname", "", "relayhostip", "", "relayport", "", "conn_use", "delay", "delay1", "delay2", "delay3", "delay4"],
      Router::QueueId,
      false,
    ),
    // Aug 25 03:38:36 mail postfix/pickup[2268]: 17442321AC9: uid=498 from=<zimbra>
    rule(
      "pickup",
      &format!("{DATE} {HOSTNAME} postfix/pickup{PID}: {QUEUEID}: {UID} {from}"),
      &["all", "timestamp", "hostname", "PID", "queueid", "uid", "from"],
      Router::QueueId,
      false,
    ),
    // Aug 25 03:41:37 mail postfix/smtp[1494]: connect to example-domain.com[169.254.15.116]:25: No route to host
    rule(
      "connect_error_no_route",
      &format!("{DATE} {HOSTNAME} postfix/smtp{PID}: connect to {client_port}: No route to host"),
      &["all", "timestamp", "hostname", "PID", "", "", "remotehostname", "", "remotehostip", "", "remoteport"],
      Router::Pid,
      false,
    ),
    // Aug 25 03:41:37 mail postfix/smtp[1494]: connect to example-domain.com[192.168.4.8]:25: Connection refused
    rule(
      "connect_error_refused",
      &format!("{DATE} {HOSTNAME} postfix/smtp{PID}: connect to {client_port}: Connection refused"),
      &["all", "timestamp", "hostname", "PID", "", "", "remotehostname", "", "remotehostip", "", "remoteport"],
      Router::Pid,
      false,
    ),
    // Aug 25 04:32:05 mail postfix/smtp[30314]: connect to 24x7onlineseo.com[74.220.199.6]:25: Connection timed out
    rule(
      "connect_error_timeout",
      &format!("{DATE} {HOSTNAME} postfix/smtp{PID}: connect to {client_port}: Connection timed out"),
      &["all", "timestamp", "hostname", "PID", "", "", "remotehostname", "", "remotehostip", "", "remoteport"],
      Router::Pid,
      false,
    ),
    // Aug 25 03:43:06 mail postfix/anvil[15611]: statistics: max connection rate 1/60s for (smtp:37.45.32.87) at Aug 25 03:35:52
    rule(
      "anvil",
      &format!("{DATE} {HOSTNAME} postfix/anvil{PID}: .+"),
      &["all", "timestamp", "hostname", "PID"],
      Router::Pid,
      false,
    ),
    // Aug 25 04:05:19 mail postfix/scache[25189]: statistics: start interval Aug 25 04:03:15
    rule(
      "scache",
      &format!("{DATE} {HOSTNAME} postfix/scache{PID}: .+"),
      &["all", "timestamp", "hostname", "PID"],
      Router::Pid,
      false,
    ),
    // Aug 25 03:57:00 mail postfix/smtpd[22024]: lost connection after HELO from unknown[123.18.191.216]
    // Aug 25 15:15:58 mail postfix/smtpd[24337]: timeout after DATA (0 bytes) from unknown[27.110.254.200]
    // Sep 25 11:26:30 mail postfix/smtpd[17289]: too many errors after DATA from unknown[14.222.46.38]
    rule(
      "smtpd_connection_error",
      &format!(r"{DATE} {HOSTNAME} postfix/smtpd{PID}: (too many errors|lost connection|timeout) after (NOOP|END-OF-MESSAGE|UNKNOWN|MAIL|EHLO|STARTTLS|RSET|CONNECT|AUTH|HELO|RCPT|DATA|DATA \([0-9]+ bytes\)) from {client}"),
      &["all", "timestamp", "hostname", "PID", "error", "state", "", "remotehostname", "", "remotehostip", ""],
      Router::Pid,
      false,
    ),
    // Aug 25 03:56:20 mail postfix/amavisd/smtpd[16299]: timeout after END-OF-MESSAGE from localhost[127.0.0.1]
    rule(
      "amavisd_connection_error",
      &format!(r"{DATE} {HOSTNAME} postfix/amavisd/smtpd{PID}: (lost connection|timeout) after (END-OF-MESSAGE|UNKNOWN|MAIL|EHLO|STARTTLS|RSET|CONNECT|AUTH|HELO|RCPT|DATA|DATA \([0-9]+ bytes\)) from {client}"),
      &["all", "timestamp", "hostname", "PID", "error", "state", "", "remotehostname", "", "remotehostip", ""],
      Router::Pid,
      false,
    ),
    // Aug 25 05:14:16 mail postfix/dkimmilter/smtpd[27025]: timeout after END-OF-MESSAGE from localhost[127.0.0.1]
    rule(
      "dkimmilter_connection_error",
      &format!(r"{DATE} {HOSTNAME} postfix/dkimmilter/smtpd{PID}: (lost connection|timeout) after (END-OF-MESSAGE|UNKNOWN|MAIL|EHLO|STARTTLS|RSET|CONNECT|AUTH|HELO|RCPT|DATA|DATA \([0-9]+ bytes\)) from {client}"),
      &["all", "timestamp", "hostname", "PID", "error", "state", "", "remotehostname", "", "remotehostip", ""],
      Router::Pid,
      false,
    ),
    // Aug 26 09:37:46 mail postfix/smtp[25848]: D4B65321AC7: enabling PIX workarounds: disable_esmtp delay_dotcrlf for tom.hrt.hr[213.5.56.13]:25
    rule(
      "smtp_pix_workarounds",
      &format!("{DATE} {HOSTNAME} postfix/smtp{PID}: {QUEUEID}: enabling PIX workarounds: disable_esmtp delay_dotcrlf for {client_port}"),
      &["all", "timestamp", "hostname", "PID", "queueid", "", "", "clienthostname", "", "clienthostip", "", "clientport"],
      Router::QueueId,
      false,
    ),
  ]
});
