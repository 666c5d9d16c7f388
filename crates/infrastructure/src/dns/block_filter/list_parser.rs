use std::net::IpAddr;

const RESERVED_NAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "local",
    "broadcasthost",
    "ip6-localhost",
    "ip6-loopback",
    "ip6-localnet",
    "ip6-mcastprefix",
    "ip6-allnodes",
    "ip6-allrouters",
    "ip6-allhosts",
    "0.0.0.0",
];

/// Extracts the hostname from one block list line.
///
/// Accepts `ip hostname`, a bare hostname and the `||hostname^` adblock
/// form. Comments, blank lines, loopback aliases and dotless names yield
/// `None`.
pub fn parse_list_line(line: &str) -> Option<String> {
    let line = match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let line = line.trim();

    if line.is_empty() || line.starts_with('!') || line.starts_with("@@") {
        return None;
    }

    let candidate = if let Some(inner) = line.strip_prefix("||") {
        match inner.find('^') {
            Some(pos) => &inner[..pos],
            None => inner,
        }
    } else {
        let mut parts = line.split_whitespace();
        let first = parts.next()?;
        match parts.next() {
            Some(second) if first.parse::<IpAddr>().is_ok() => second,
            Some(_) => return None,
            None => first,
        }
    };

    let name = candidate.trim().trim_end_matches('.').to_ascii_lowercase();
    if !is_plausible_hostname(&name) {
        return None;
    }
    Some(name)
}

fn is_plausible_hostname(name: &str) -> bool {
    if !name.contains('.') || RESERVED_NAMES.contains(&name) {
        return false;
    }
    if name.parse::<IpAddr>().is_ok() {
        return false;
    }
    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    })
}
