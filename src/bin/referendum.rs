//! A sample confidential referendum, end to end
use sealed_ballot::{
    BenalohEngine, Choice, HomomorphicEngine, SealedBallot, VoterId, VotingSession,
    MODULUS_BITS, RING_BITS,
};

const VOTERS: usize = 10;

fn main() {
    let engine = BenalohEngine::generate(RING_BITS, MODULUS_BITS);
    let admin = VoterId::derive("election-office");
    let mut session =
        VotingSession::open(engine, admin, "Adopt the new charter").expect("session open");

    // Half the electorate seals ballots client-side with validity proofs,
    // the other half uses the implicit one-unit path
    for i in 0..VOTERS {
        let voter = VoterId::derive(&format!("voter-{i}"));
        let choice = if i % 3 == 0 { Choice::No } else { Choice::Yes };
        if i % 2 == 0 {
            let ballot = SealedBallot::seal(session.engine().public_key());
            session.cast_ballot(voter, choice, &ballot).expect("cast");
        } else {
            session.cast_ballot_implicit(voter, choice).expect("cast");
        }
    }

    // A second ballot from the same identity is rejected
    let repeat = session.cast_ballot_implicit(VoterId::derive("voter-0"), Choice::Yes);
    println!("repeat ballot: {:?}", repeat.unwrap_err());

    // Only the administrator can close and reveal
    let outsider = session.close(VoterId::derive("outsider"));
    println!("outsider close: {:?}", outsider.unwrap_err());

    let tally = session.close(admin).expect("close");
    println!(
        "proposal {:?} decided: yes={} no={} ({} ballots)",
        session.proposal(),
        tally.yes,
        tally.no,
        session.total_votes()
    );
    for event in session.events() {
        println!("audit: {event:?}");
    }
}
