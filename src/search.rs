use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use itertools::Itertools;

use crate::session::Session;
use crate::util::format_rfc3339;

/// A session paired with its lowercase fuzzy-search key.
#[derive(Debug, Clone)]
pub struct Row {
    pub session: Session,
    pub search_key: String,
}

impl Row {
    #[must_use]
    pub fn new(session: Session) -> Self {
        let search_key = [
            session.id.clone(),
            session.working_dir.clone(),
            session.last_action.clone(),
            format_rfc3339(session.created_at).unwrap_or_default(),
            format_rfc3339(session.updated_at).unwrap_or_default(),
        ]
        .join(" ")
        .to_lowercase();
        Self {
            session,
            search_key,
        }
    }
}

/// Rank `rows` against `query`, returning indices into `rows`.
///
/// A blank query keeps every row in its original order. Otherwise only matching
/// rows are returned, best match first, then most recently updated, then by ID.
#[must_use]
pub fn rank(query: &str, rows: &[Row]) -> Vec<usize> {
    let query = query.trim();
    if query.is_empty() {
        return (0..rows.len()).collect();
    }

    let needle = query.to_lowercase();
    let matcher = SkimMatcherV2::default().ignore_case();
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| {
            matcher
                .fuzzy_match(&row.search_key, &needle)
                .map(|score| (index, score))
        })
        .sorted_by(|&(a_index, a_score), &(b_index, b_score)| {
            let (a, b) = (&rows[a_index].session, &rows[b_index].session);
            b_score
                .cmp(&a_score)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
                .then_with(|| a.id.cmp(&b.id))
        })
        .map(|(index, _)| index)
        .collect()
}
