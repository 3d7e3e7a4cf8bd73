use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::ballot::repo_types::Ballot;
use crate::catalog::repo_types::Catalog;
use crate::error::{BallotRejection, EngineError};
use crate::store::BallotStore;

/// Check every ballot entry against the catalog. Stops at the first bad
/// entry, in position-id order.
pub fn check_against_catalog(catalog: &Catalog, ballot: &Ballot) -> Result<(), BallotRejection> {
    let positions = catalog.position_index();
    let candidates = catalog.candidate_index();

    for (&position_id, &candidate_id) in ballot {
        if !positions.contains_key(&position_id) {
            return Err(BallotRejection::UnknownPosition(position_id));
        }
        let Some(candidate) = candidates.get(&candidate_id) else {
            return Err(BallotRejection::UnknownCandidate {
                position_id,
                candidate_id,
            });
        };
        if candidate.position_id != position_id {
            return Err(BallotRejection::CandidatePositionMismatch {
                position_id,
                candidate_id,
                actual_position_id: candidate.position_id,
            });
        }
    }
    Ok(())
}

/// All-or-nothing validation that runs before anything is written.
/// A subset of positions, or no positions at all, is a valid ballot.
#[instrument(skip(store, ballot), fields(entries = ballot.len()))]
pub async fn validate_ballot(
    store: &dyn BallotStore,
    user_id: Uuid,
    ballot: &Ballot,
) -> Result<(), EngineError> {
    if store.find_user(user_id).await?.is_none() {
        warn!(%user_id, "ballot from unknown user");
        return Err(BallotRejection::UnknownUser(user_id).into());
    }

    let catalog = store.catalog().await?;
    check_against_catalog(&catalog, ballot).map_err(|reason| {
        warn!(%user_id, %reason, "ballot rejected");
        EngineError::InvalidBallot(reason)
    })
}

/// Apply an already validated ballot as one unit: every (user, position)
/// vote is inserted or revised, then the user is marked as having voted.
/// On failure nothing from this ballot is visible.
#[instrument(skip(store, ballot), fields(entries = ballot.len()))]
pub async fn record_ballot(
    store: &dyn BallotStore,
    user_id: Uuid,
    ballot: &Ballot,
) -> Result<(), EngineError> {
    if let Err(e) = store.apply_ballot(user_id, ballot).await {
        error!(error = %e, %user_id, transient = e.is_transient(), "ballot rolled back");
        return Err(e);
    }
    for (position_id, candidate_id) in ballot {
        info!(%user_id, %position_id, %candidate_id, "vote recorded");
    }
    Ok(())
}

/// Validate, then record.
pub async fn cast_ballot(
    store: &dyn BallotStore,
    user_id: Uuid,
    ballot: &Ballot,
) -> Result<(), EngineError> {
    validate_ballot(store, user_id, ballot).await?;
    record_ballot(store, user_id, ballot).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::catalog::repo_types::{Candidate, Position};
    use crate::identity::repo_types::{NewUser, User};
    use crate::store::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        user: User,
        p1: Position,
        p2: Position,
        a: Candidate,
        b: Candidate,
        c: Candidate,
        d: Candidate,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let user = store
            .insert_user(&NewUser::from_identifier("voter@example.com", "pw"))
            .await
            .unwrap();
        let p1 = store.insert_position("P1", "students").await.unwrap();
        let p2 = store.insert_position("P2", "teachers").await.unwrap();
        let a = store.insert_candidate(p1.id, "A", None).await.unwrap();
        let b = store.insert_candidate(p1.id, "B", None).await.unwrap();
        let c = store.insert_candidate(p2.id, "C", None).await.unwrap();
        let d = store.insert_candidate(p2.id, "D", None).await.unwrap();
        Fixture {
            store,
            user,
            p1,
            p2,
            a,
            b,
            c,
            d,
        }
    }

    fn assert_one_vote_per_slot(votes: &[crate::ballot::repo_types::Vote]) {
        let mut seen = HashSet::new();
        for v in votes {
            assert!(seen.insert((v.user_id, v.position_id)), "duplicate slot {v:?}");
        }
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let f = fixture().await;
        let ghost = Uuid::new_v4();
        let err = validate_ballot(&f.store, ghost, &Ballot::from([(f.p1.id, f.a.id)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidBallot(BallotRejection::UnknownUser(id)) if id == ghost
        ));
    }

    #[tokio::test]
    async fn unknown_position_and_candidate_are_rejected() {
        let f = fixture().await;
        let bogus = Uuid::new_v4();

        let err = validate_ballot(&f.store, f.user.id, &Ballot::from([(bogus, f.a.id)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidBallot(BallotRejection::UnknownPosition(id)) if id == bogus
        ));

        let err = validate_ballot(&f.store, f.user.id, &Ballot::from([(f.p1.id, bogus)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidBallot(BallotRejection::UnknownCandidate { candidate_id, .. })
                if candidate_id == bogus
        ));
    }

    #[tokio::test]
    async fn candidate_from_other_position_is_rejected() {
        let f = fixture().await;
        let err = validate_ballot(&f.store, f.user.id, &Ballot::from([(f.p1.id, f.c.id)]))
            .await
            .unwrap_err();
        match err {
            EngineError::InvalidBallot(BallotRejection::CandidatePositionMismatch {
                position_id,
                candidate_id,
                actual_position_id,
            }) => {
                assert_eq!(position_id, f.p1.id);
                assert_eq!(candidate_id, f.c.id);
                assert_eq!(actual_position_id, f.p2.id);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn partial_and_empty_ballots_are_valid() {
        let f = fixture().await;
        validate_ballot(&f.store, f.user.id, &Ballot::from([(f.p2.id, f.d.id)]))
            .await
            .unwrap();
        validate_ballot(&f.store, f.user.id, &Ballot::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_ballot_only_flips_has_voted() {
        let f = fixture().await;
        cast_ballot(&f.store, f.user.id, &Ballot::new()).await.unwrap();
        assert!(f.store.all_votes().await.unwrap().is_empty());
        assert!(f.store.find_user(f.user.id).await.unwrap().unwrap().has_voted);
    }

    #[tokio::test]
    async fn same_ballot_twice_is_idempotent() {
        let f = fixture().await;
        let ballot = Ballot::from([(f.p1.id, f.a.id), (f.p2.id, f.c.id)]);
        cast_ballot(&f.store, f.user.id, &ballot).await.unwrap();
        let first = f.store.votes_for_user(f.user.id).await.unwrap();
        cast_ballot(&f.store, f.user.id, &ballot).await.unwrap();
        let second = f.store.votes_for_user(f.user.id).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        for (x, y) in first.iter().zip(&second) {
            assert_eq!(
                (x.id, x.user_id, x.position_id, x.candidate_id),
                (y.id, y.user_id, y.position_id, y.candidate_id)
            );
        }
        assert!(f.store.find_user(f.user.id).await.unwrap().unwrap().has_voted);
    }

    #[tokio::test]
    async fn resubmission_revises_the_choice() {
        let f = fixture().await;
        cast_ballot(&f.store, f.user.id, &Ballot::from([(f.p1.id, f.a.id)]))
            .await
            .unwrap();
        cast_ballot(&f.store, f.user.id, &Ballot::from([(f.p1.id, f.b.id)]))
            .await
            .unwrap();

        let votes = f.store.votes_for_user(f.user.id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].position_id, f.p1.id);
        assert_eq!(votes[0].candidate_id, f.b.id);
    }

    #[tokio::test]
    async fn invalid_entry_blocks_the_whole_ballot() {
        let f = fixture().await;
        let ballot = Ballot::from([(f.p1.id, f.a.id), (f.p2.id, Uuid::new_v4())]);

        let err = cast_ballot(&f.store, f.user.id, &ballot).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidBallot(_)));
        assert!(f.store.votes_for_user(f.user.id).await.unwrap().is_empty());
        assert!(!f.store.find_user(f.user.id).await.unwrap().unwrap().has_voted);
    }

    #[tokio::test]
    async fn storage_rejection_rolls_back_earlier_upserts() {
        let f = fixture().await;
        cast_ballot(&f.store, f.user.id, &Ballot::from([(f.p1.id, f.a.id)]))
            .await
            .unwrap();

        // Skip validation so the store itself has to refuse the bad row.
        let ballot = Ballot::from([(f.p1.id, f.b.id), (f.p2.id, f.a.id)]);
        let err = record_ballot(&f.store, f.user.id, &ballot).await.unwrap_err();
        assert!(matches!(err, EngineError::StorageConflict(_)));

        let votes = f.store.votes_for_user(f.user.id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].candidate_id, f.a.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_resubmissions_leave_one_row() {
        let f = fixture().await;
        let store = Arc::new(f.store);
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let choice = if i % 2 == 0 { f.a.id } else { f.b.id };
            let ballot = Ballot::from([(f.p1.id, choice)]);
            let user_id = f.user.id;
            handles.push(tokio::spawn(async move {
                cast_ballot(store.as_ref(), user_id, &ballot).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let votes = store.all_votes().await.unwrap();
        assert_one_vote_per_slot(&votes);
        assert_eq!(votes.len(), 1);
        assert!(votes[0].candidate_id == f.a.id || votes[0].candidate_id == f.b.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn tally_never_sees_half_a_ballot() {
        let f = fixture().await;
        let store = Arc::new(f.store);
        let mut voters = Vec::new();
        for i in 0..25 {
            let user = store
                .insert_user(&NewUser::from_identifier(&format!("v{i}@example.com"), "pw"))
                .await
                .unwrap();
            voters.push(user.id);
        }

        let writer = {
            let store = store.clone();
            let ballot = Ballot::from([(f.p1.id, f.a.id), (f.p2.id, f.d.id)]);
            tokio::spawn(async move {
                for user_id in voters {
                    cast_ballot(store.as_ref(), user_id, &ballot).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        // Every ballot touches both positions, so both totals move together.
        while !writer.is_finished() {
            let rows = store.tally().await.unwrap();
            let p1: i64 = rows.iter().filter(|r| r.position_id == f.p1.id).map(|r| r.votes).sum();
            let p2: i64 = rows.iter().filter(|r| r.position_id == f.p2.id).map(|r| r.votes).sum();
            assert_eq!(p1, p2);
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
        assert_one_vote_per_slot(&store.all_votes().await.unwrap());
    }

    #[test]
    fn catalog_check_is_pure() {
        let catalog = Catalog::default();
        let p = Uuid::new_v4();
        let c = Uuid::new_v4();
        assert_eq!(
            check_against_catalog(&catalog, &Ballot::from([(p, c)])),
            Err(BallotRejection::UnknownPosition(p))
        );
        assert_eq!(check_against_catalog(&catalog, &Ballot::new()), Ok(()));
    }
}
