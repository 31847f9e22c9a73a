//! The voting session: lifecycle control and the confidential tally.
//!
//! A session is created once, stays Active while ballots accumulate, and is
//! closed exactly once by the administrator. While Active, the only readable
//! tally information is the public count of accepted ballots; the yes/no
//! breakdown lives in two encrypted counters that nobody, operator included,
//! can read. Closing decrypts both counters and publishes the outcome.
//!
//! Every precondition is checked before any mutation, so a rejected
//! operation leaves no observable trace beyond its error.
use crate::{
    ballot::{Choice, SealedBallot},
    engine::{CiphertextHandle, HomomorphicEngine},
    errors::VoteError,
};
use digest::Digest;
use serde::{Deserialize, Serialize};
use sha3::Sha3_256;
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

/// An opaque 32-byte caller identity, attested by the host environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoterId(pub [u8; 32]);

impl VoterId {
    /// Derive an identity from a human-readable label. Convenient for demos
    /// and tests; a real host supplies attested identities directly.
    pub fn derive(label: &str) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(label.as_bytes());
        let hash = hasher.finalize();
        let mut id = [0u8; 32];
        id.copy_from_slice(&hash);
        Self(id)
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// The two-state lifecycle. Active is initial, Ended is terminal, and the
/// only transition is Active -> Ended via [`VotingSession::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Active,
    Ended,
}

/// The plaintext totals revealed by closing the vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedTally {
    pub yes: u64,
    pub no: u64,
}

/// The append-only audit trail. Only the session pushes entries; anyone may
/// read them. Note that a cast event names the voter but never the choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    VotingStarted { proposal: String },
    VoteCast { voter: VoterId },
    VotingEnded { yes: u64, no: u64 },
}

/// A single-proposal confidential voting session, generic over the
/// encryption engine it delegates ciphertext work to
pub struct VotingSession<E: HomomorphicEngine> {
    engine: E,
    administrator: VoterId,
    proposal: String,
    state: LifecycleState,
    yes_counter: CiphertextHandle,
    no_counter: CiphertextHandle,
    voted: HashSet<VoterId>,
    total_votes: u64,
    outcome: Option<RevealedTally>,
    events: Vec<Event>,
}

impl<E: HomomorphicEngine> VotingSession<E> {
    /// Start a session: both counters begin as encrypted zeros with compute
    /// access granted, and the start of voting is recorded on the audit
    /// trail. The proposal text is immutable from here on.
    pub fn open(
        mut engine: E,
        administrator: VoterId,
        proposal: impl Into<String>,
    ) -> Result<Self, VoteError> {
        let proposal = proposal.into();
        let yes_counter = engine.encrypt_zero()?;
        engine.grant_compute_access(yes_counter);
        let no_counter = engine.encrypt_zero()?;
        engine.grant_compute_access(no_counter);

        info!(%administrator, proposal = %proposal, "voting started");
        let events = vec![Event::VotingStarted {
            proposal: proposal.clone(),
        }];
        Ok(Self {
            engine,
            administrator,
            proposal,
            state: LifecycleState::Active,
            yes_counter,
            no_counter,
            voted: HashSet::new(),
            total_votes: 0,
            outcome: None,
            events,
        })
    }

    /// Cast a ballot sealed by the voter. The engine validates the
    /// ciphertext against its proof before anything is accumulated; a voter
    /// who fails validation has not voted.
    pub fn cast_ballot(
        &mut self,
        caller: VoterId,
        choice: Choice,
        ballot: &SealedBallot,
    ) -> Result<(), VoteError> {
        self.check_can_vote(caller)?;
        let unit = self
            .engine
            .validate_and_import(ballot.get_ciphertext(), ballot.get_proof())
            .map_err(|err| {
                warn!(voter = %caller, "ballot rejected: invalid proof");
                err
            })?;
        self.accumulate(caller, choice, unit)
    }

    /// Cast a ballot without supplying ciphertext: the engine constructs the
    /// one-unit contribution itself, so no validity proof is needed. Shares
    /// every invariant with [`Self::cast_ballot`], including one ballot per
    /// voter across both entry points.
    pub fn cast_ballot_implicit(
        &mut self,
        caller: VoterId,
        choice: Choice,
    ) -> Result<(), VoteError> {
        self.check_can_vote(caller)?;
        let unit = self.engine.encrypt_constant(1)?;
        self.accumulate(caller, choice, unit)
    }

    /// Close the vote and reveal the totals. Administrator only, and only
    /// once: the authorization check comes first, so a non-administrator is
    /// told Unauthorized no matter the lifecycle state.
    pub fn close(&mut self, caller: VoterId) -> Result<RevealedTally, VoteError> {
        if caller != self.administrator {
            warn!(caller = %caller, "close rejected: not the administrator");
            return Err(VoteError::Unauthorized);
        }
        if self.state != LifecycleState::Active {
            warn!("close rejected: voting already ended");
            return Err(VoteError::VotingClosed);
        }

        // decrypt before flipping state so a failed oracle call leaves the
        // session fully intact
        let yes = self.engine.decrypt(self.yes_counter)?;
        let no = self.engine.decrypt(self.no_counter)?;
        self.state = LifecycleState::Ended;
        let tally = RevealedTally { yes, no };
        self.outcome = Some(tally);
        self.events.push(Event::VotingEnded { yes, no });
        info!(yes, no, total = self.total_votes, "voting ended");
        Ok(tally)
    }

    pub fn proposal(&self) -> &str {
        &self.proposal
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn administrator(&self) -> VoterId {
        self.administrator
    }

    /// Total accepted ballots, public at all times
    pub fn total_votes(&self) -> u64 {
        self.total_votes
    }

    /// Whether the identity has an accepted ballot on record
    pub fn has_voted(&self, voter: VoterId) -> bool {
        self.voted.contains(&voter)
    }

    /// The still-encrypted counter for a choice. Readable in either state;
    /// decryption authority stays with the engine's access control.
    pub fn encrypted_counter(&self, choice: Choice) -> CiphertextHandle {
        match choice {
            Choice::Yes => self.yes_counter,
            Choice::No => self.no_counter,
        }
    }

    /// The revealed totals, present once the session has ended
    pub fn outcome(&self) -> Option<RevealedTally> {
        self.outcome
    }

    /// The audit trail so far
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Borrow the engine, e.g. to obtain the public key for sealing ballots
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Preconditions shared by both cast entry points, checked before any
    /// mutation: the session must be Active and the caller must not have
    /// voted through either entry point.
    fn check_can_vote(&self, caller: VoterId) -> Result<(), VoteError> {
        if self.state != LifecycleState::Active {
            warn!(voter = %caller, "ballot rejected: voting already ended");
            return Err(VoteError::VotingClosed);
        }
        if self.voted.contains(&caller) {
            warn!(voter = %caller, "ballot rejected: duplicate voter");
            return Err(VoteError::DuplicateVoter);
        }
        Ok(())
    }

    /// Fold an already-validated unit contribution into the chosen counter
    /// and commit the caller's participation. Nothing here can fail for
    /// caller-visible reasons; engine failures abort before the voter record
    /// or public tally change.
    fn accumulate(
        &mut self,
        caller: VoterId,
        choice: Choice,
        unit: CiphertextHandle,
    ) -> Result<(), VoteError> {
        let counter = self.encrypted_counter(choice);
        let updated = self.engine.homomorphic_add(counter, unit)?;
        self.engine.grant_compute_access(updated);
        match choice {
            Choice::Yes => self.yes_counter = updated,
            Choice::No => self.no_counter = updated,
        }

        self.voted.insert(caller);
        self.total_votes += 1;
        self.events.push(Event::VoteCast { voter: caller });
        info!(voter = %caller, total = self.total_votes, "ballot accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::BenalohEngine, MODULUS_BITS, RING_BITS};

    fn session(admin: VoterId) -> VotingSession<BenalohEngine> {
        let engine = BenalohEngine::generate(RING_BITS, MODULUS_BITS);
        VotingSession::open(engine, admin, "Upgrade X").unwrap()
    }

    /// Two implicit ballots, a duplicate attempt, then close: yes=1, no=1,
    /// totalVotes=2
    #[test]
    fn test_scenario_basic_election() {
        let admin = VoterId::derive("admin");
        let mut session = session(admin);
        let v1 = VoterId::derive("v1");
        let v2 = VoterId::derive("v2");

        session.cast_ballot_implicit(v1, Choice::Yes).unwrap();
        session.cast_ballot_implicit(v2, Choice::No).unwrap();
        assert_eq!(
            session.cast_ballot_implicit(v1, Choice::No),
            Err(VoteError::DuplicateVoter)
        );

        let tally = session.close(admin).unwrap();
        assert_eq!(tally, RevealedTally { yes: 1, no: 1 });
        assert_eq!(session.total_votes(), 2);
        assert_eq!(session.outcome(), Some(tally));
        assert_eq!(session.state(), LifecycleState::Ended);
    }

    /// A non-administrator cannot close, and the session stays Active
    #[test]
    fn test_close_requires_administrator() {
        let admin = VoterId::derive("admin");
        let mut session = session(admin);
        let intruder = VoterId::derive("intruder");

        assert_eq!(session.close(intruder), Err(VoteError::Unauthorized));
        assert_eq!(session.state(), LifecycleState::Active);

        // still Unauthorized once the vote has ended
        session.close(admin).unwrap();
        assert_eq!(session.close(intruder), Err(VoteError::Unauthorized));
    }

    /// After a successful close, further casts and closes are rejected
    #[test]
    fn test_ended_session_rejects_everything() {
        let admin = VoterId::derive("admin");
        let mut session = session(admin);
        session.cast_ballot_implicit(VoterId::derive("v1"), Choice::Yes).unwrap();
        session.close(admin).unwrap();

        assert_eq!(
            session.cast_ballot_implicit(VoterId::derive("v2"), Choice::No),
            Err(VoteError::VotingClosed)
        );
        assert_eq!(session.close(admin), Err(VoteError::VotingClosed));
        // the counters remain queryable, still encrypted
        let _ = session.encrypted_counter(Choice::Yes);
        let _ = session.encrypted_counter(Choice::No);
    }

    /// An invalid proof leaves the voter record, the public tally, and the
    /// counters untouched
    #[test]
    fn test_invalid_proof_mutates_nothing() {
        let admin = VoterId::derive("admin");
        let mut session = session(admin);
        let voter = VoterId::derive("voter");

        let pk = *session.engine().public_key();
        let honest = SealedBallot::seal(&pk);
        let decoy = SealedBallot::seal(&pk);
        // proof transplanted onto a different ciphertext
        let forged = SealedBallot::from_parts(*decoy.get_ciphertext(), honest.get_proof().clone());

        let yes_before = session.encrypted_counter(Choice::Yes);
        assert_eq!(
            session.cast_ballot(voter, Choice::Yes, &forged),
            Err(VoteError::InvalidProof)
        );
        assert!(!session.has_voted(voter));
        assert_eq!(session.total_votes(), 0);
        assert_eq!(session.encrypted_counter(Choice::Yes), yes_before);
        assert_eq!(session.events().len(), 1);

        let tally = session.close(admin).unwrap();
        assert_eq!(tally, RevealedTally { yes: 0, no: 0 });
    }

    /// Closing with zero ballots reveals zero totals
    #[test]
    fn test_empty_election() {
        let admin = VoterId::derive("admin");
        let mut session = session(admin);
        let tally = session.close(admin).unwrap();
        assert_eq!(tally, RevealedTally { yes: 0, no: 0 });
        assert_eq!(session.total_votes(), 0);
    }

    /// Ballot order does not affect the revealed totals
    #[test]
    fn test_order_independence() {
        let admin = VoterId::derive("admin");
        let votes = [
            ("a", Choice::Yes),
            ("b", Choice::No),
            ("c", Choice::Yes),
            ("d", Choice::Yes),
            ("e", Choice::No),
        ];

        let mut forward = session(admin);
        for (label, choice) in votes {
            forward.cast_ballot_implicit(VoterId::derive(label), choice).unwrap();
        }
        let forward_tally = forward.close(admin).unwrap();

        let mut backward = session(admin);
        for (label, choice) in votes.iter().rev() {
            backward.cast_ballot_implicit(VoterId::derive(label), *choice).unwrap();
        }
        let backward_tally = backward.close(admin).unwrap();

        assert_eq!(forward_tally, RevealedTally { yes: 3, no: 2 });
        assert_eq!(forward_tally, backward_tally);
    }

    /// The two entry points share the one-ballot-per-voter record
    #[test]
    fn test_entry_points_are_mutually_exclusive() {
        let admin = VoterId::derive("admin");
        let mut session = session(admin);
        let voter = VoterId::derive("voter");

        session.cast_ballot_implicit(voter, Choice::Yes).unwrap();
        let pk = *session.engine().public_key();
        let ballot = SealedBallot::seal(&pk);
        assert_eq!(
            session.cast_ballot(voter, Choice::No, &ballot),
            Err(VoteError::DuplicateVoter)
        );
        assert!(session.has_voted(voter));
        assert_eq!(session.total_votes(), 1);
    }

    /// Explicit, proof-carrying ballots accumulate like implicit ones
    #[test]
    fn test_explicit_ballots_tally() {
        let admin = VoterId::derive("admin");
        let mut session = session(admin);
        let pk = *session.engine().public_key();

        session
            .cast_ballot(VoterId::derive("v1"), Choice::Yes, &SealedBallot::seal(&pk))
            .unwrap();
        session
            .cast_ballot(VoterId::derive("v2"), Choice::Yes, &SealedBallot::seal(&pk))
            .unwrap();
        session
            .cast_ballot_implicit(VoterId::derive("v3"), Choice::No)
            .unwrap();

        let tally = session.close(admin).unwrap();
        assert_eq!(tally, RevealedTally { yes: 2, no: 1 });
        assert_eq!(session.total_votes(), 3);
    }

    /// The audit trail records starts, casts (voter only, never the choice),
    /// and the final totals, and serializes cleanly
    #[test]
    fn test_event_log() {
        let admin = VoterId::derive("admin");
        let mut session = session(admin);
        let voter = VoterId::derive("voter");
        session.cast_ballot_implicit(voter, Choice::Yes).unwrap();
        session.close(admin).unwrap();

        assert_eq!(
            session.events(),
            &[
                Event::VotingStarted {
                    proposal: "Upgrade X".into()
                },
                Event::VoteCast { voter },
                Event::VotingEnded { yes: 1, no: 0 },
            ]
        );

        let json = serde_json::to_string(session.events()).unwrap();
        assert!(json.contains("VotingEnded"));
        assert!(!json.contains("Yes"), "events must not leak the choice");
    }

    /// Read accessors have no preconditions
    #[test]
    fn test_accessors() {
        let admin = VoterId::derive("admin");
        let session = session(admin);
        assert_eq!(session.proposal(), "Upgrade X");
        assert_eq!(session.administrator(), admin);
        assert_eq!(session.state(), LifecycleState::Active);
        assert_eq!(session.total_votes(), 0);
        assert!(!session.has_voted(VoterId::derive("nobody")));
        assert_eq!(session.outcome(), None);
    }
}
