//! Per-worker proxy selection.

/// Proxies parsed from a pipe-delimited list (`http://a:3128|socks5://b:1080`).
/// An empty entry means a direct connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyList {
    entries: Vec<String>,
}

impl ProxyList {
    pub fn parse(list: &str) -> Self {
        ProxyList {
            entries: list.split('|').map(|s| s.trim().to_string()).collect(),
        }
    }

    /// Proxy for the HEAD probe (the first entry).
    pub fn primary(&self) -> Option<&str> {
        self.for_worker(0)
    }

    /// Proxy for worker `index`, assigned round-robin over the entries.
    pub fn for_worker(&self, index: usize) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let entry = self.entries[index % self.entries.len()].as_str();
        if entry.is_empty() {
            None
        } else {
            Some(entry)
        }
    }
}
