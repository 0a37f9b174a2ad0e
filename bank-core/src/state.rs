use bank_proto::ClientId;

use crate::registry::{ClientRegistry, LastLog, INITIAL_BALANCE};

/// Aggregate bank state: the client registry plus the running totals that
/// must stay in lockstep with it.
#[derive(Clone, Debug, Default)]
pub struct BankState {
    registry: ClientRegistry,
    pub num_transactions: u64,
    pub total_transferred: u64,
    pub total_balance: i64,
}

/// A point-in-time view of the three running totals, echoed in log lines and
/// compared against in tests.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Snapshot {
    pub num_transactions: u64,
    pub total_transferred: u64,
    pub total_balance: i64,
}

/// The result of processing one `REQ`, mirroring exactly what goes into the
/// `ACK_REQ` and into the required log line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub processed: bool,
    pub duplicate: bool,
    pub ack_seq: u32,
    pub new_balance: u32,
    pub snapshot: Snapshot,
}

/// The origin of a `REQ` has no client record. The shell turns this into an
/// `ERROR_REQ` reply rather than any ordinary `Outcome`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnknownOrigin;

impl BankState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            num_transactions: self.num_transactions,
            total_transferred: self.total_transferred,
            total_balance: self.total_balance,
        }
    }

    pub fn find(&self, ip: ClientId) -> Option<&crate::registry::ClientRecord> {
        self.registry.find(ip)
    }

    pub fn clients(&self) -> impl Iterator<Item = &crate::registry::ClientRecord> {
        self.registry.iter()
    }

    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Registers `orig` on its first `DISCOVERY`; a no-op on rediscovery.
    pub fn handle_discovery(&mut self, orig: ClientId) {
        if self.registry.insert(orig) {
            self.total_balance += INITIAL_BALANCE;
        }
    }

    /// Applies the duplicate/out-of-order/policy decision table to one `REQ`. Mutates `self` in
    /// place; returns [`UnknownOrigin`] when the origin has never been
    /// discovered, and an [`Outcome`] in every other case.
    pub fn process_request(
        &mut self,
        orig: ClientId,
        seqn: u32,
        dest: ClientId,
        value: u32,
    ) -> Result<Outcome, UnknownOrigin> {
        if self.registry.find(orig).is_none() {
            return Err(UnknownOrigin);
        }

        let last_req = self.registry.find(orig).unwrap().last_req;

        // Case 2: duplicate.
        if seqn <= last_req {
            let balance = self.registry.find(orig).unwrap().balance;
            return Ok(Outcome {
                processed: false,
                duplicate: true,
                ack_seq: last_req,
                new_balance: clamp_to_wire(balance),
                snapshot: self.snapshot(),
            });
        }

        // Case 3: out of order.
        if seqn > last_req + 1 {
            let balance = self.registry.find(orig).unwrap().balance;
            return Ok(Outcome {
                processed: false,
                duplicate: false,
                ack_seq: last_req,
                new_balance: clamp_to_wire(balance),
                snapshot: self.snapshot(),
            });
        }

        // From here seqn == last_req + 1: the request is consumed one way or
        // another, so every remaining branch advances last_req and last_log.
        let record_log = LastLog { seqn, dest, value };

        // Case 4: balance query.
        if value == 0 {
            let balance = self.consume(orig, seqn, record_log);
            return Ok(self.consumed_outcome(seqn, balance));
        }

        // Case 5: unknown destination.
        if self.registry.find(dest).is_none() {
            let balance = self.consume(orig, seqn, record_log);
            return Ok(self.consumed_outcome(seqn, balance));
        }

        // Case 6: insufficient funds.
        let origin_balance = self.registry.find(orig).unwrap().balance;
        if origin_balance < value as i64 {
            let balance = self.consume(orig, seqn, record_log);
            return Ok(self.consumed_outcome(seqn, balance));
        }

        // Case 7: self-transfer. Net balance effect is zero, but the sequence
        // is still consumed and last_log updated like any other accepted REQ.
        if dest == orig {
            let balance = self.consume(orig, seqn, record_log);
            return Ok(self.consumed_outcome(seqn, balance));
        }

        // Case 8: effected transfer.
        {
            let origin = self.registry.find_mut(orig).unwrap();
            origin.balance -= value as i64;
            origin.last_req = seqn;
            origin.last_log = Some(record_log);
        }
        self.registry.find_mut(dest).unwrap().balance += value as i64;
        self.num_transactions += 1;
        self.total_transferred += value as u64;

        let new_balance = self.registry.find(orig).unwrap().balance;
        Ok(self.consumed_outcome(seqn, new_balance))
    }

    /// Shared tail of cases 4–7: advance the watermark and log, leaving
    /// aggregates untouched, and return the origin's (unchanged) balance.
    fn consume(&mut self, orig: ClientId, seqn: u32, log: LastLog) -> i64 {
        let origin = self.registry.find_mut(orig).unwrap();
        origin.last_req = seqn;
        origin.last_log = Some(log);
        origin.balance
    }

    fn consumed_outcome(&self, seqn: u32, balance: i64) -> Outcome {
        Outcome {
            processed: true,
            duplicate: false,
            ack_seq: seqn,
            new_balance: clamp_to_wire(balance),
            snapshot: self.snapshot(),
        }
    }
}

/// The wire's `new_balance` field is an unsigned 32-bit integer; negative
/// balances (which the invariants say should never occur through normal
/// processing) are clamped to zero rather than wrapped, matching the source.
fn clamp_to_wire(balance: i64) -> u32 {
    if balance < 0 {
        0
    } else {
        balance.min(u32::MAX as i64) as u32
    }
}
