//! Randomized concurrent exercise of [`BankState`] checking that its core
//! arithmetic invariants hold no matter how requests interleave.
//!
//! `Property` here plays the same role `Property` / `Expectation::Always`
//! play in an exhaustive model checker: a named predicate over state,
//! checked after every run. The state space here is driven by `rand`
//! instead of enumerated, which is enough for arithmetic invariants over a
//! handful of clients and requests.
//!
//! The batch generator also computes an independent oracle for
//! `num_transactions`, `total_transferred`, and each client's final
//! `last_req` (P6, P7, P4): every client's own actions are routed to a
//! single dedicated thread, so that client's requests are applied in
//! exactly the order they were generated regardless of how threads are
//! scheduled relative to each other, and every fresh transfer's `value` is
//! bounded by a running floor balance that ignores incoming credits —
//! so whether a transfer is affordable is fixed at generation time, never
//! dependent on the race between threads crediting each other.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::thread;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{BankState, INITIAL_BALANCE};
use bank_proto::ClientId;

/// A single always-true check against a [`BankState`] snapshot, named so a
/// failing assertion identifies which invariant broke.
struct Property {
    name: &'static str,
    check: fn(&BankState) -> bool,
}

const PROPERTIES: &[Property] = &[
    Property {
        name: "total_balance equals the sum of client balances",
        check: |st| st.total_balance == st.clients().map(|c| c.balance).sum::<i64>(),
    },
    Property {
        name: "total_balance equals INITIAL_BALANCE * client_count",
        check: |st| st.total_balance == INITIAL_BALANCE * st.client_count() as i64,
    },
    Property {
        name: "no client balance is negative",
        check: |st| st.clients().all(|c| c.balance >= 0),
    },
];

fn assert_properties(st: &BankState) {
    for p in PROPERTIES {
        assert!((p.check)(st), "{}", p.name);
    }
}

#[derive(Clone, Copy, Debug)]
enum Action {
    Discover(ClientId),
    Transfer { orig: ClientId, seqn: u32, dest: ClientId, value: u32 },
    Replay { orig: ClientId, seqn: u32, dest: ClientId, value: u32 },
}

/// The client a given action is routed by, for per-client thread
/// partitioning: the one identity whose own `last_req`/outgoing balance the
/// action can affect.
fn owner(action: &Action) -> ClientId {
    match *action {
        Action::Discover(ip) => ip,
        Action::Transfer { orig, .. } | Action::Replay { orig, .. } => orig,
    }
}

fn client_pool(n: u8) -> Vec<ClientId> {
    (1..=n).map(|d| ClientId::from(Ipv4Addr::new(10, 1, 1, d))).collect()
}

/// Ground truth computed alongside the generated batch: what a correct
/// implementation must arrive at regardless of scheduling, since every fresh
/// transfer's affordability and every client's own request ordering are
/// fixed at generation time rather than left to the race between threads.
struct ExpectedOutcome {
    num_transactions: u64,
    total_transferred: u64,
    /// Final `last_req` and balance per client.
    per_client: HashMap<ClientId, (u32, i64)>,
}

/// Builds a randomized batch of actions: every client discovers first, then a
/// mix of fresh in-order transfers and replays of already-sent requests,
/// exercising the at-most-one-effect guarantee under duplication. Alongside
/// the batch, computes the [`ExpectedOutcome`] that must hold no matter how
/// the batch is scheduled across threads.
fn random_batch(rng: &mut impl Rng, clients: &[ClientId], rounds: u32) -> (Vec<Action>, ExpectedOutcome) {
    let mut actions: Vec<Action> = clients.iter().map(|&c| Action::Discover(c)).collect();
    let mut sent: Vec<(ClientId, u32, ClientId, u32)> = Vec::new();
    let mut next_seqn = vec![0u32; clients.len()];
    // Worst-case balance per client, counting only its own outgoing sends
    // and ignoring any credits it is owed — a lower bound on the real
    // balance at the moment any schedule could process its next request.
    let mut floor_balance = vec![INITIAL_BALANCE; clients.len()];
    let mut balance = vec![INITIAL_BALANCE; clients.len()];
    let mut num_transactions: u64 = 0;
    let mut total_transferred: u64 = 0;

    for _ in 0..rounds {
        let orig_idx = rng.gen_range(0..clients.len());
        let orig = clients[orig_idx];

        if !sent.is_empty() && rng.gen_bool(0.3) {
            let &(o, s, d, v) = sent.choose(rng).unwrap();
            actions.push(Action::Replay { orig: o, seqn: s, dest: d, value: v });
            continue;
        }

        let dest_idx = loop {
            let idx = rng.gen_range(0..clients.len());
            if clients.len() == 1 || idx != orig_idx {
                break idx;
            }
        };
        let dest = clients[dest_idx];

        // Bound the value by what this client can afford counting only its
        // own prior sends: affordability is then a fact about the batch, not
        // about whatever order threads happen to apply it in.
        let max_affordable = floor_balance[orig_idx].min(50);
        let value = if max_affordable <= 0 { 0 } else { rng.gen_range(0..=max_affordable) as u32 };

        next_seqn[orig_idx] += 1;
        let seqn = next_seqn[orig_idx];
        sent.push((orig, seqn, dest, value));
        actions.push(Action::Transfer { orig, seqn, dest, value });

        if value > 0 {
            floor_balance[orig_idx] -= value as i64;
            balance[orig_idx] -= value as i64;
            balance[dest_idx] += value as i64;
            num_transactions += 1;
            total_transferred += value as u64;
        }
    }

    let per_client = clients
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, (next_seqn[i], balance[i])))
        .collect();

    (actions, ExpectedOutcome { num_transactions, total_transferred, per_client })
}

fn apply(state: &Mutex<BankState>, action: Action) {
    let mut st = state.lock().unwrap();
    match action {
        Action::Discover(ip) => st.handle_discovery(ip),
        Action::Transfer { orig, seqn, dest, value } | Action::Replay { orig, seqn, dest, value } => {
            let _ = st.process_request(orig, seqn, dest, value);
        }
    }
}

/// Runs `batch` concurrently: one thread per distinct action owner, each
/// applying its own actions strictly in generation order, so per-client
/// ordering (and thus per-client `last_req`/balance) is exactly what
/// generation produced no matter how the threads are scheduled relative to
/// each other.
fn run_concurrently(state: &Arc<Mutex<BankState>>, clients: &[ClientId], batch: &[Action]) {
    let handles: Vec<_> = clients
        .iter()
        .map(|&client| {
            let state = Arc::clone(state);
            let queue: Vec<Action> = batch.iter().copied().filter(|a| owner(a) == client).collect();
            thread::spawn(move || {
                for action in queue {
                    apply(&state, action);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn invariants_hold_under_random_concurrent_interleaving() {
    let state = Arc::new(Mutex::new(BankState::new()));
    let mut rng = rand::thread_rng();
    let clients = client_pool(6);
    let (batch, expected) = random_batch(&mut rng, &clients, 200);

    run_concurrently(&state, &clients, &batch);

    let st = state.lock().unwrap();
    assert_properties(&st);
    assert_eq!(st.num_transactions, expected.num_transactions, "P6: num_transactions must match the oracle");
    assert_eq!(st.total_transferred, expected.total_transferred, "P7: total_transferred must match the oracle");
    for (&client, &(expected_last_req, expected_balance)) in &expected.per_client {
        let record = st.find(client).expect("every pooled client discovered up front");
        assert_eq!(
            record.last_req, expected_last_req,
            "P4: last_req for {client} must match the oracle regardless of scheduling"
        );
        assert_eq!(record.balance, expected_balance, "final balance for {client} must match the oracle");
    }
}

#[test]
fn duplicate_replays_never_double_mutate() {
    let state = Arc::new(Mutex::new(BankState::new()));
    let clients = client_pool(2);
    apply(&state, Action::Discover(clients[0]));
    apply(&state, Action::Discover(clients[1]));
    apply(&state, Action::Transfer { orig: clients[0], seqn: 1, dest: clients[1], value: 10 });

    let before = state.lock().unwrap().snapshot();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let state = Arc::clone(&state);
            let (orig, dest) = (clients[0], clients[1]);
            thread::spawn(move || {
                apply(&state, Action::Replay { orig, seqn: 1, dest, value: 10 });
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let after = state.lock().unwrap().snapshot();
    assert_eq!(before, after, "replaying an already-applied REQ must not mutate aggregates again");
    assert_properties(&state.lock().unwrap());
}
