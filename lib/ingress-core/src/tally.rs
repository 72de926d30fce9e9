//! Host tally and winner selection

use std::collections::BTreeMap;
use tracing::debug;

/// Count of live serving pods per node address for one ingress.
///
/// Kept ordered by address so that selection never depends on hash order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostTally {
    hosts: BTreeMap<String, u32>,
}

impl HostTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more live pod at `address`
    pub fn record(&mut self, address: impl Into<String>) {
        *self.hosts.entry(address.into()).or_insert(0) += 1;
    }

    /// Pods counted at `address`
    pub fn count(&self, address: &str) -> u32 {
        self.hosts.get(address).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Number of distinct addresses
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Total pods counted across all addresses
    pub fn total(&self) -> u32 {
        self.hosts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.hosts.iter().map(|(addr, count)| (addr.as_str(), *count))
    }

    /// Pick the address with the strictly greatest count.
    ///
    /// Ties go to the lexicographically smallest address. Returns `None` for
    /// an empty tally.
    pub fn select_winner(&self) -> Option<&str> {
        let mut winner = None;
        let mut max = 0;

        for (address, count) in self.iter() {
            debug!(host = address, num = count, "Tallied host");
            if count > max {
                winner = Some(address);
                max = count;
            }
        }

        winner
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for HostTally {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        let mut tally = HostTally::new();
        for (address, count) in iter {
            *tally.hosts.entry(address.into()).or_insert(0) += count;
        }
        tally
    }
}
