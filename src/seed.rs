use tracing::{debug, info, instrument};

use crate::error::EngineError;
use crate::identity::repo_types::NewUser;
use crate::store::BallotStore;

const SAMPLE_POSITIONS: &[(&str, &str, &[&str])] = &[
    ("President", "students", &["Alice", "Bob"]),
    ("Secretary", "students", &["Carol", "Dave"]),
    ("Head Teacher", "teachers", &["Ms. Johnson", "Mr. Smith"]),
    ("Staff Rep", "staff", &["Ms. Green", "Mr. Brown"]),
];

const SAMPLE_USERS: &[(&str, &str, &str)] = &[
    ("John Doe", "john@example.com", "Password123"),
    ("Jane Smith", "jane@example.com", "Password123"),
];

fn avatar_url(name: &str) -> String {
    let query: String = name
        .chars()
        .filter(|c| *c != '.')
        .map(|c| if c == ' ' { '+' } else { c })
        .collect();
    format!("https://ui-avatars.com/api/?name={query}")
}

/// Fill an empty store with a small demo election. Positions are only added
/// when the catalog is empty; sample users only when their identifier is free.
#[instrument(skip(store))]
pub async fn seed_sample_data(store: &dyn BallotStore) -> Result<(), EngineError> {
    for (name, email, credential) in SAMPLE_USERS {
        if store.find_user_by_email(email).await?.is_some() {
            continue;
        }
        let new = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            credential: credential.to_string(),
        };
        match store.insert_user(&new).await {
            Ok(_) | Err(EngineError::StorageConflict(_)) => {}
            Err(e) => return Err(e),
        }
    }

    if !store.catalog().await?.is_empty() {
        debug!("catalog already populated");
        return Ok(());
    }

    for (position, category, candidates) in SAMPLE_POSITIONS {
        let p = store.insert_position(position, category).await?;
        for candidate in *candidates {
            let image = avatar_url(candidate);
            store
                .insert_candidate(p.id, candidate, Some(image.as_str()))
                .await?;
        }
    }
    info!(positions = SAMPLE_POSITIONS.len(), "sample election seeded");
    Ok(())
}
