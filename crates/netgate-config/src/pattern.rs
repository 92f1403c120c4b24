//! Pattern language shared by the host access tables and the TOML rule set.
//!
//! Follows the `hosts_access(5)` conventions: lists of patterns separated by
//! commas or whitespace, an optional `EXCEPT` operator, the wildcards `ALL`,
//! `KNOWN`, `UNKNOWN`, `LOCAL` and `PARANOID`, `.domain` suffixes, `n.n.`
//! address prefixes, `net/mask` pairs and `user@host` client patterns.

use std::fmt;
use std::net::Ipv4Addr;

/// Value the policy layer uses for a host name, address or user it could not
/// determine.
pub const UNKNOWN: &str = "unknown";

/// Host name reported when the forward and reverse lookups disagree.
pub const PARANOID: &str = "paranoid";

/// A single access query: who is asking which daemon for service.
///
/// Values are taken verbatim from the caller; interpretation of the
/// [`UNKNOWN`] and [`PARANOID`] sentinels happens during matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessQuery<'a> {
    /// Daemon process name (e.g. "sshd", "approx").
    pub daemon: &'a str,
    /// Client host name.
    pub client_host: &'a str,
    /// Client address in textual form.
    pub client_addr: &'a str,
    /// Client user name.
    pub client_user: &'a str,
}

impl<'a> AccessQuery<'a> {
    pub fn new(
        daemon: &'a str,
        client_host: &'a str,
        client_addr: &'a str,
        client_user: &'a str,
    ) -> Self {
        Self {
            daemon,
            client_host,
            client_addr,
            client_user,
        }
    }
}

/// A parsed pattern list with an optional `EXCEPT` tail.
///
/// `A B EXCEPT C` matches when `A` or `B` matches and `C` does not. The tail
/// is itself a list, so exceptions nest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatternList {
    include: Vec<String>,
    except: Option<Box<PatternList>>,
}

impl PatternList {
    /// Parse a list of comma- or whitespace-separated patterns.
    pub fn parse(s: &str) -> Self {
        let tokens: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();
        Self::from_tokens(&tokens)
    }

    fn from_tokens(tokens: &[&str]) -> Self {
        match tokens.iter().position(|t| *t == "EXCEPT") {
            Some(at) => Self {
                include: tokens[..at].iter().map(|t| t.to_string()).collect(),
                except: Some(Box::new(Self::from_tokens(&tokens[at + 1..]))),
            },
            None => Self {
                include: tokens.iter().map(|t| t.to_string()).collect(),
                except: None,
            },
        }
    }

    /// Whether the list contains no patterns at all.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.except.is_none()
    }

    /// Patterns before the first `EXCEPT`.
    pub fn patterns(&self) -> &[String] {
        &self.include
    }

    fn matches_with(&self, f: &dyn Fn(&str) -> bool) -> bool {
        self.include.iter().any(|p| f(p))
            && !self.except.as_ref().is_some_and(|e| e.matches_with(f))
    }

    /// Match this list against the daemon named in `query`.
    pub fn matches_daemon(&self, query: &AccessQuery<'_>) -> bool {
        self.matches_with(&|tok| daemon_match(tok, query.daemon))
    }

    /// Match this list against the client described by `query`.
    pub fn matches_client(&self, query: &AccessQuery<'_>) -> bool {
        self.matches_with(&|tok| client_match(tok, query))
    }
}

impl fmt::Display for PatternList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.include.join(", "))?;
        if let Some(except) = &self.except {
            write!(f, " EXCEPT {except}")?;
        }
        Ok(())
    }
}

fn host_known(name: &str) -> bool {
    !name.eq_ignore_ascii_case(UNKNOWN) && !name.eq_ignore_ascii_case(PARANOID)
}

fn addr_known(addr: &str) -> bool {
    !addr.eq_ignore_ascii_case(UNKNOWN)
}

/// Split `tok` at the first `@` that is not its leading character.
fn split_at_sign(tok: &str) -> Option<(&str, &str)> {
    tok.char_indices()
        .skip(1)
        .find(|(_, c)| *c == '@')
        .map(|(i, _)| (&tok[..i], &tok[i + 1..]))
}

/// `daemon` or `daemon@host`. The server endpoint is never known to this
/// layer, so a host part only matches the patterns that accept an unknown host.
fn daemon_match(tok: &str, daemon: &str) -> bool {
    match split_at_sign(tok) {
        Some((name, host)) => {
            string_match(name, daemon)
                && (host.eq_ignore_ascii_case("ALL") || host.eq_ignore_ascii_case("UNKNOWN"))
        }
        None => string_match(tok, daemon),
    }
}

fn client_match(tok: &str, query: &AccessQuery<'_>) -> bool {
    match split_at_sign(tok) {
        Some((user, host)) => user_match(user, query.client_user) && host_match(host, query),
        None => host_match(tok, query),
    }
}

fn user_match(tok: &str, user: &str) -> bool {
    if tok.eq_ignore_ascii_case("UNKNOWN") {
        return user.eq_ignore_ascii_case(UNKNOWN);
    }
    string_match(tok, user)
}

fn host_match(tok: &str, query: &AccessQuery<'_>) -> bool {
    let name = query.client_host;
    let addr = query.client_addr;

    if tok.starts_with('@') {
        tracing::debug!(pattern = tok, "NIS netgroups are not supported; pattern never matches");
        return false;
    }
    if tok.eq_ignore_ascii_case("ALL") {
        return true;
    }
    if tok.eq_ignore_ascii_case("KNOWN") {
        return addr_known(addr) && host_known(name);
    }
    if tok.eq_ignore_ascii_case("UNKNOWN") {
        return !addr_known(addr) || name.eq_ignore_ascii_case(UNKNOWN);
    }
    if tok.eq_ignore_ascii_case("LOCAL") {
        return !name.contains('.') && host_known(name);
    }
    if tok.eq_ignore_ascii_case("PARANOID") {
        return name.eq_ignore_ascii_case(PARANOID);
    }
    if let Some((net, mask)) = tok.split_once('/') {
        return masked_match(net, mask, addr);
    }
    if tok.contains(['*', '?']) {
        return wildcard_match(tok, addr) || (!is_inet_literal(tok) && wildcard_match(tok, name));
    }
    string_match(tok, addr) || (!is_inet_literal(tok) && string_match(tok, name))
}

/// Plain string patterns: `.suffix`, `prefix.`, `ALL`, `KNOWN`, or exact.
fn string_match(tok: &str, s: &str) -> bool {
    if let Some(suffix) = tok.strip_prefix('.') {
        return s.len() > suffix.len() + 1 && ends_with_ignore_case(s, tok);
    }
    if tok.eq_ignore_ascii_case("ALL") {
        return true;
    }
    if tok.eq_ignore_ascii_case("KNOWN") {
        return !s.eq_ignore_ascii_case(UNKNOWN);
    }
    if tok.ends_with('.') {
        return s.len() >= tok.len()
            && s.as_bytes()[..tok.len()].eq_ignore_ascii_case(tok.as_bytes());
    }
    tok.eq_ignore_ascii_case(s)
}

fn ends_with_ignore_case(s: &str, suffix: &str) -> bool {
    s.len() >= suffix.len()
        && s.as_bytes()[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

/// A token made only of digits, dots and slashes names an address, never a host.
fn is_inet_literal(tok: &str) -> bool {
    tok.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '/')
}

/// `n.n.n.n/m.m.m.m` or `n.n.n.n/len`.
fn masked_match(net: &str, mask: &str, addr: &str) -> bool {
    let Ok(net) = net.parse::<Ipv4Addr>() else {
        return false;
    };
    let mask = match mask.parse::<Ipv4Addr>() {
        Ok(mask) => u32::from(mask),
        Err(_) => match mask.parse::<u32>() {
            Ok(0) => 0,
            Ok(len) if len <= 32 => u32::MAX << (32 - len),
            _ => return false,
        },
    };
    let Ok(addr) = addr.parse::<Ipv4Addr>() else {
        return false;
    };
    u32::from(addr) & mask == u32::from(net) & mask
}

/// Shell-style `*` and `?` matching, case-insensitive.
fn wildcard_match(pattern: &str, s: &str) -> bool {
    let p = pattern.as_bytes();
    let s = s.as_bytes();
    let (mut pi, mut si) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while si < s.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some((pi, si));
            pi += 1;
        } else if pi < p.len() && (p[pi] == b'?' || p[pi].eq_ignore_ascii_case(&s[si])) {
            pi += 1;
            si += 1;
        } else if let Some((sp, ss)) = star {
            pi = sp + 1;
            si = ss + 1;
            star = Some((sp, ss + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == b'*')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query<'a>(host: &'a str, addr: &'a str) -> AccessQuery<'a> {
        AccessQuery::new("sshd", host, addr, "alice")
    }

    #[test]
    fn test_parse_commas_and_whitespace() {
        let list = PatternList::parse("sshd, in.ftpd  approx");
        assert_eq!(list.patterns(), ["sshd", "in.ftpd", "approx"]);
        assert!(!list.is_empty());
        assert!(PatternList::parse("  ,, ").is_empty());
    }

    #[test]
    fn test_all_matches_everything() {
        let list = PatternList::parse("ALL");
        assert!(list.matches_daemon(&query("a", "1.2.3.4")));
        assert!(list.matches_client(&query("unknown", "unknown")));
    }

    #[test]
    fn test_except_operator() {
        let list = PatternList::parse("ALL EXCEPT .evil.example.com");
        assert!(list.matches_client(&query("client.example.com", "203.0.113.5")));
        assert!(!list.matches_client(&query("bad.evil.example.com", "203.0.113.9")));
    }

    #[test]
    fn test_nested_except() {
        let list = PatternList::parse("ALL EXCEPT 10. EXCEPT 10.0.0.1");
        assert!(list.matches_client(&query("h", "192.0.2.1")));
        assert!(!list.matches_client(&query("h", "10.1.2.3")));
        assert!(list.matches_client(&query("h", "10.0.0.1")));
    }

    #[test]
    fn test_domain_suffix() {
        let list = PatternList::parse(".example.com");
        assert!(list.matches_client(&query("client.EXAMPLE.com", "203.0.113.5")));
        assert!(!list.matches_client(&query("example.com", "203.0.113.5")));
        assert!(!list.matches_client(&query("client.example.org", "203.0.113.5")));
    }

    #[test]
    fn test_address_prefix() {
        let list = PatternList::parse("203.0.113.");
        assert!(list.matches_client(&query("unknown", "203.0.113.5")));
        assert!(!list.matches_client(&query("unknown", "203.0.114.5")));
    }

    #[test]
    fn test_net_mask() {
        let dotted = PatternList::parse("192.168.0.0/255.255.0.0");
        assert!(dotted.matches_client(&query("h", "192.168.44.1")));
        assert!(!dotted.matches_client(&query("h", "192.169.0.1")));

        let prefix = PatternList::parse("10.0.0.0/8");
        assert!(prefix.matches_client(&query("h", "10.200.1.1")));
        assert!(!prefix.matches_client(&query("h", "11.0.0.1")));

        let garbage = PatternList::parse("10.0.0.0/99");
        assert!(!garbage.matches_client(&query("h", "10.0.0.1")));
    }

    #[test]
    fn test_known_unknown_local_paranoid() {
        assert!(PatternList::parse("KNOWN").matches_client(&query("a.example.com", "192.0.2.1")));
        assert!(!PatternList::parse("KNOWN").matches_client(&query("unknown", "192.0.2.1")));
        assert!(PatternList::parse("UNKNOWN").matches_client(&query("unknown", "192.0.2.1")));
        assert!(PatternList::parse("UNKNOWN").matches_client(&query("a", "unknown")));
        assert!(PatternList::parse("LOCAL").matches_client(&query("buildhost", "192.0.2.1")));
        assert!(!PatternList::parse("LOCAL").matches_client(&query("a.example.com", "192.0.2.1")));
        assert!(PatternList::parse("PARANOID").matches_client(&query("paranoid", "192.0.2.1")));
        assert!(!PatternList::parse("LOCAL").matches_client(&query("paranoid", "192.0.2.1")));
    }

    #[test]
    fn test_user_at_host() {
        let list = PatternList::parse("alice@.example.com");
        assert!(list.matches_client(&query("c.example.com", "203.0.113.5")));
        let bob = AccessQuery::new("sshd", "c.example.com", "203.0.113.5", "bob");
        assert!(!list.matches_client(&bob));

        let unknown_user = PatternList::parse("UNKNOWN@ALL");
        let nobody = AccessQuery::new("sshd", "c.example.com", "203.0.113.5", "unknown");
        assert!(unknown_user.matches_client(&nobody));
        assert!(!unknown_user.matches_client(&bob));
    }

    #[test]
    fn test_wildcards() {
        let list = PatternList::parse("*.example.com 198.51.100.?");
        assert!(list.matches_client(&query("x.y.example.com", "192.0.2.1")));
        assert!(list.matches_client(&query("unknown", "198.51.100.7")));
        assert!(!list.matches_client(&query("unknown", "198.51.100.77")));
    }

    #[test]
    fn test_star_against_literal_star() {
        // A '*' in the subject must not pin the pattern's '*' to one byte.
        assert!(wildcard_match("a*b", "a*xb"));
        assert!(wildcard_match("*.lab", "*.x.lab"));
        assert!(!wildcard_match("a*b", "a*xc"));
    }

    #[test]
    fn test_numeric_pattern_never_matches_host_name() {
        let list = PatternList::parse("10.0.0.1");
        assert!(!list.matches_client(&query("10.0.0.1", "192.0.2.1")));
        assert!(list.matches_client(&query("h", "10.0.0.1")));
    }

    #[test]
    fn test_netgroup_never_matches() {
        assert!(!PatternList::parse("@trusted").matches_client(&query("h", "192.0.2.1")));
    }

    #[test]
    fn test_daemon_patterns() {
        let q = query("h", "192.0.2.1");
        assert!(PatternList::parse("sshd").matches_daemon(&q));
        assert!(PatternList::parse("SSHD").matches_daemon(&q));
        assert!(!PatternList::parse("approx").matches_daemon(&q));
        assert!(PatternList::parse("sshd@ALL").matches_daemon(&q));
        assert!(!PatternList::parse("sshd@192.0.2.10").matches_daemon(&q));
    }

    #[test]
    fn test_display_roundtrips_except() {
        let list = PatternList::parse("a, b EXCEPT c");
        assert_eq!(list.to_string(), "a, b EXCEPT c");
    }
}
