//! Fuzz target for access table parsing and matching.
//!
//! Run with: cargo +nightly fuzz run fuzz_access_table
//!
//! The first line of the input is split into a query; the rest is parsed as
//! a `hosts.allow` table and matched against it.

#![no_main]

use libfuzzer_sys::fuzz_target;
use netgate_config::pattern::AccessQuery;
use netgate_config::table::AccessTable;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let (head, body) = s.split_once('\n').unwrap_or((s, ""));
    let mut fields = head.split(' ');
    let daemon = fields.next().unwrap_or("sshd");
    let host = fields.next().unwrap_or("unknown");
    let addr = fields.next().unwrap_or("unknown");
    let user = fields.next().unwrap_or("unknown");

    let table = AccessTable::parse(body);
    let query = AccessQuery::new(daemon, host, addr, user);

    // Should never panic regardless of input
    if let Some(entry) = table.first_match(&query) {
        let _ = entry.verdict(netgate_config::policy::Effect::Deny);
    }
});
