use crate::config::types::ScrapeRule;
use crate::labels::value::LabelSet;
use std::net::SocketAddr;

/// Outcome of looking a record up in the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Labels of the matched rule, empty when nothing matched
    pub labels: LabelSet,
    /// The key that matched, or the last key that was tried
    pub tag: String,
    pub matched: bool,
}

/// Maps a record's tag or source host to the labels of a scrape rule.
///
/// Rules are scanned in configuration order and the first rule whose tag
/// equals the key wins.
#[derive(Debug, Clone, Default)]
pub struct LabelResolver {
    rules: Vec<ScrapeRule>,
}

impl LabelResolver {
    pub fn new(rules: Vec<ScrapeRule>) -> Self {
        Self { rules }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Resolve labels for a record.
    ///
    /// The syslog tag is tried first. When it is absent or unknown, the host
    /// part of the sender address is used as the lookup key instead. An
    /// unmatched record still resolves, with an empty label set.
    pub fn resolve(&self, tag: Option<&str>, source_address: Option<&str>) -> Resolution {
        let tag = tag.filter(|t| !t.is_empty());

        if let Some(tag) = tag {
            if let Some(labels) = self.lookup(tag) {
                return Resolution {
                    labels: labels.clone(),
                    tag: tag.to_string(),
                    matched: true,
                };
            }
        }

        let host = source_address.and_then(host_of).filter(|h| !h.is_empty());
        if let Some(host) = &host {
            if let Some(labels) = self.lookup(host) {
                return Resolution {
                    labels: labels.clone(),
                    tag: host.clone(),
                    matched: true,
                };
            }
        }

        Resolution {
            labels: LabelSet::new(),
            tag: host.or_else(|| tag.map(str::to_string)).unwrap_or_default(),
            matched: false,
        }
    }

    fn lookup(&self, key: &str) -> Option<&LabelSet> {
        self.rules
            .iter()
            .find(|rule| rule.tag == key)
            .map(|rule| &rule.labels)
    }
}

/// Strip the port from a sender address.
///
/// Accepts `host:port`, `[v6]:port`, a bare IPv6 address, or a bare host.
fn host_of(address: &str) -> Option<String> {
    let address = address.trim();
    if address.is_empty() {
        return None;
    }

    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Some(addr.ip().to_string());
    }

    if let Some(rest) = address.strip_prefix('[') {
        return rest.split(']').next().map(str::to_string);
    }

    match address.matches(':').count() {
        0 => Some(address.to_string()),
        1 => address.split(':').next().map(str::to_string),
        // More than one colon without brackets: an IPv6 address with no port
        _ => Some(address.to_string()),
    }
}
