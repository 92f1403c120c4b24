//! Host access tables in the `hosts.allow` / `hosts.deny` format.
//!
//! ```text
//! # daemon_list : client_list [ : option ... ]
//! sshd, approx : 192.168. .example.com EXCEPT gw.example.com
//! ALL : UNKNOWN : deny
//! ```
//!
//! Tables are read fresh on every evaluation, so edits take effect without a
//! restart.

use std::io;
use std::path::Path;

use crate::pattern::{AccessQuery, PatternList};
use crate::policy::Effect;

/// One rule line from an access table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    /// 1-based line number where the rule starts.
    pub line: usize,
    pub daemons: PatternList,
    pub clients: PatternList,
    /// Raw options following the second `:`, in order.
    pub options: Vec<String>,
}

impl TableEntry {
    /// Whether both the daemon list and the client list match `query`.
    pub fn matches(&self, query: &AccessQuery<'_>) -> bool {
        self.daemons.matches_daemon(query) && self.clients.matches_client(query)
    }

    /// The verdict this entry yields when it matches. An `allow` or `deny`
    /// option overrides the table's own verdict.
    pub fn verdict(&self, table_effect: Effect) -> Effect {
        self.options
            .iter()
            .rev()
            .find_map(|opt| {
                if opt.eq_ignore_ascii_case("allow") {
                    Some(Effect::Allow)
                } else if opt.eq_ignore_ascii_case("deny") {
                    Some(Effect::Deny)
                } else {
                    None
                }
            })
            .unwrap_or(table_effect)
    }
}

/// An ordered access table. The first matching entry wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessTable {
    entries: Vec<TableEntry>,
}

impl AccessTable {
    /// Parse table text. Malformed lines are skipped with a warning.
    pub fn parse(content: &str) -> Self {
        let mut entries = Vec::new();

        for (line, text) in logical_lines(content) {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut fields = trimmed.splitn(3, ':');
            let daemons = fields.next().unwrap_or_default();
            let Some(clients) = fields.next() else {
                tracing::warn!(line, "missing \":\" separator in access table; line skipped");
                continue;
            };
            let options = fields
                .next()
                .map(|opts| {
                    opts.split(':')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let daemons = PatternList::parse(daemons);
            let clients = PatternList::parse(clients);
            if daemons.is_empty() || clients.is_empty() {
                tracing::warn!(line, "empty daemon or client list in access table; line skipped");
                continue;
            }

            entries.push(TableEntry {
                line,
                daemons,
                clients,
                options,
            });
        }

        Self { entries }
    }

    /// Read and parse a table file. A file that does not exist is an empty
    /// table; every other I/O failure is returned.
    pub fn load(path: &Path) -> io::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::trace!(path = %path.display(), "access table absent; treating as empty");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// The first entry matching `query`, if any.
    pub fn first_match(&self, query: &AccessQuery<'_>) -> Option<&TableEntry> {
        self.entries.iter().find(|e| e.matches(query))
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Join backslash-continued lines, yielding each logical line with the
/// number of its first physical line.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in content.lines().enumerate() {
        let (start, mut buf) = pending.take().unwrap_or_else(|| (idx + 1, String::new()));
        match raw.strip_suffix('\\') {
            Some(head) => {
                buf.push_str(head);
                buf.push(' ');
                pending = Some((start, buf));
            }
            None => {
                buf.push_str(raw);
                out.push((start, buf));
            }
        }
    }
    if let Some(last) = pending {
        out.push(last);
    }
    out
}
