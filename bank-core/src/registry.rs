use std::collections::HashMap;

use bank_proto::ClientId;

/// Initial balance credited to a client on its first discovery.
pub const INITIAL_BALANCE: i64 = 100;

/// The last accepted request for a client, replayed verbatim when a duplicate
/// of it arrives.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LastLog {
    pub seqn: u32,
    pub dest: ClientId,
    pub value: u32,
}

/// One known client: its identity, sequencing watermark, and balance.
#[derive(Clone, Debug)]
pub struct ClientRecord {
    pub ip: ClientId,
    pub last_req: u32,
    pub balance: i64,
    pub last_log: Option<LastLog>,
}

impl ClientRecord {
    fn new(ip: ClientId) -> Self {
        ClientRecord { ip, last_req: 0, balance: INITIAL_BALANCE, last_log: None }
    }
}

/// Maps IPv4 identities to client records. The ordering of entries is never
/// observed externally, so a plain hash map suffices — the registry is
/// deliberately left unbounded, with no capacity cap.
#[derive(Clone, Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, ClientRecord>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        ClientRegistry { clients: HashMap::new() }
    }

    pub fn find(&self, ip: ClientId) -> Option<&ClientRecord> {
        self.clients.get(&ip)
    }

    pub fn find_mut(&mut self, ip: ClientId) -> Option<&mut ClientRecord> {
        self.clients.get_mut(&ip)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientRecord> {
        self.clients.values()
    }

    /// Inserts a fresh client record if `ip` is unknown. Returns whether a new
    /// record was created, so the caller can decide whether to credit
    /// `total_balance`: insertion is idempotent, with no totals adjustment
    /// on rediscovery.
    pub fn insert(&mut self, ip: ClientId) -> bool {
        if self.clients.contains_key(&ip) {
            return false;
        }
        self.clients.insert(ip, ClientRecord::new(ip));
        true
    }
}
