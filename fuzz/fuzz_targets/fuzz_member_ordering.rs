#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tessera_core::PartyId;
use tessera_relay::{MemberOrdering, MemberTracker};

#[derive(Debug, Arbitrary)]
struct Input {
    local: String,
    polls: Vec<Vec<String>>,
}

fuzz_target!(|input: Input| {
    let local = PartyId::new(input.local);
    let mut tracker = MemberTracker::new(local.clone());
    for poll in &input.polls {
        let listing: Vec<PartyId> = poll.iter().cloned().map(PartyId::new).collect();
        tracker.observe(&listing);
    }

    let local_first = tracker.ordered(MemberOrdering::LocalFirst);
    let sorted = tracker.ordered(MemberOrdering::Lexicographic);

    // Local party exactly once, first for the initiator
    assert_eq!(local_first[0], local);
    assert_eq!(local_first.iter().filter(|p| **p == local).count(), 1);
    assert_eq!(local_first.len(), tracker.len());
    assert!(sorted.windows(2).all(|w| w[0] < w[1]));

    let mut a = local_first.clone();
    a.sort();
    assert_eq!(a, sorted);
});
