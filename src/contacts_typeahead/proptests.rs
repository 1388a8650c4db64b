use proptest::prelude::*;

use super::trie::{normalize, NamedRecord, Trie, ValidationError};

#[derive(Debug, Clone)]
struct Contact {
    name: Option<String>,
    id: usize,
}

impl NamedRecord for Contact {
    fn display_name(&self) -> Result<&str, ValidationError> {
        match &self.name {
            Some(name) => Ok(name),
            None => Err(ValidationError::MissingName),
        }
    }
}

fn build_index(names: &[String]) -> Trie<Contact> {
    let mut index = Trie::new();
    for (id, name) in names.iter().enumerate() {
        let inserted = index.insert(Contact {
            name: Some(name.clone()),
            id,
        });
        assert_eq!(Ok(()), inserted);
    }
    index
}

fn matched_ids(index: &Trie<Contact>, query: &str) -> Vec<usize> {
    index
        .find_with_prefix(query)
        .iter()
        .map(|contact| contact.id)
        .collect()
}

proptest! {
    #[test]
    fn inserted_names_are_found_under_every_prefix(
        names in prop::collection::vec("[a-zA-Z]{1,12}", 1..40),
    ) {
        let index = build_index(&names);
        for (id, name) in names.iter().enumerate() {
            prop_assert!(index.contains_exact(name));

            let key = normalize(name);
            for end in 0..=key.chars().count() {
                let prefix: String = key.chars().take(end).collect();
                prop_assert!(
                    matched_ids(&index, &prefix).contains(&id),
                    "record {} missing under prefix {:?}",
                    id,
                    prefix
                );
            }
        }
    }

    #[test]
    fn empty_prefix_returns_every_record(
        names in prop::collection::vec("[a-zA-Z]{0,12}", 0..40),
    ) {
        let index = build_index(&names);
        prop_assert_eq!(names.len(), index.len());
        prop_assert_eq!(names.len(), matched_ids(&index, "").len());
    }

    #[test]
    fn queries_are_case_insensitive(
        names in prop::collection::vec("[a-zA-Z]{1,12}", 1..40),
        query in "[a-zA-Z]{0,4}",
    ) {
        let index = build_index(&names);
        prop_assert_eq!(
            matched_ids(&index, &query.to_lowercase()),
            matched_ids(&index, &query.to_uppercase())
        );
    }

    #[test]
    fn repeated_queries_are_deterministic(
        names in prop::collection::vec("[a-zA-Z]{1,12}", 1..40),
        query in "[a-zA-Z]{0,4}",
    ) {
        let index = build_index(&names);
        prop_assert_eq!(matched_ids(&index, &query), matched_ids(&index, &query));
    }

    #[test]
    fn missing_prefixes_yield_empty_results(
        names in prop::collection::vec("[a-z]{1,12}", 1..40),
        query in "[0-9]{1,4}",
    ) {
        // Digit-only queries can never match alphabetic keys.
        let index = build_index(&names);
        prop_assert_eq!(Vec::<usize>::new(), matched_ids(&index, &query));
    }

    #[test]
    fn nameless_records_are_rejected_and_kept_out(
        names in prop::collection::vec("[a-zA-Z]{1,12}", 1..20),
        nameless in 1usize..5,
    ) {
        let mut records: Vec<Contact> = names
            .iter()
            .enumerate()
            .map(|(id, name)| Contact { name: Some(name.clone()), id })
            .collect();
        for id in 0..nameless {
            records.push(Contact { name: None, id: names.len() + id });
        }

        let mut index = Trie::new();
        let outcome = index.batch_insert(records);
        prop_assert_eq!(names.len(), outcome.inserted);
        prop_assert_eq!(nameless, outcome.rejected.len());
        prop_assert_eq!(names.len(), matched_ids(&index, "").len());
    }
}
