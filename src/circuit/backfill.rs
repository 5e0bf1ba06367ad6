// Flexible-flag backfill for legacy definitions
//
// Older circuits marked administrative stages only through their titles.
// This turns those keyword matches into an explicit `is_flexible` flag once,
// at migration time. The planner never looks at titles.

use regex::{Regex, RegexBuilder};
use tracing::info;

use crate::circuit::types::Status;
use crate::ids::StatusId;

/// Whole-word, case-insensitive matcher for any of `keywords`. `None` when no usable keyword is given.
pub fn keyword_matcher(keywords: &[String]) -> Result<Option<Regex>, regex::Error> {
    let alternatives: Vec<String> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(regex::escape)
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }

    RegexBuilder::new(&format!(r"\b(?:{})\b", alternatives.join("|")))
        .case_insensitive(true)
        .build()
        .map(Some)
}

/// Set `is_flexible` on statuses whose title or description mentions a keyword
///
/// Returns the ids that changed. Statuses already flexible are left alone.
pub fn backfill_flexible_flags(
    statuses: &mut [Status],
    keywords: &[String],
) -> Result<Vec<StatusId>, regex::Error> {
    let Some(matcher) = keyword_matcher(keywords)? else {
        return Ok(Vec::new());
    };

    let mut changed = Vec::new();
    for status in statuses.iter_mut().filter(|s| !s.is_flexible) {
        let hit = matcher.is_match(&status.title) || matcher.is_match(&status.description);
        if hit {
            status.is_flexible = true;
            info!(status_id = %status.id, title = %status.title, "Marked status flexible");
            changed.push(status.id);
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<String> {
        vec!["flexible".into(), "any".into(), "free".into()]
    }

    #[test]
    fn test_whole_word_matches_only() {
        let mut statuses = vec![
            Status::new(1, "Draft"),
            Status::new(2, "Free routing"),
            Status::new(3, "Company review"),
            Status::new(4, "Freelance check"),
            Status::new(5, "Hold").with_description("Can move to ANY stage"),
        ];

        let changed = backfill_flexible_flags(&mut statuses, &keywords()).unwrap();
        assert_eq!(changed, vec![StatusId(2), StatusId(5)]);
        assert!(!statuses[2].is_flexible);
        assert!(!statuses[3].is_flexible);
    }

    #[test]
    fn test_already_flexible_not_reported() {
        let mut statuses = vec![Status::new(1, "Flexible desk").flexible()];
        let changed = backfill_flexible_flags(&mut statuses, &keywords()).unwrap();
        assert!(changed.is_empty());
        assert!(statuses[0].is_flexible);
    }

    #[test]
    fn test_keywords_are_escaped_and_blank_ignored() {
        assert!(keyword_matcher(&[" ".to_string()]).unwrap().is_none());

        let matcher = keyword_matcher(&["a.b".to_string()]).unwrap().unwrap();
        assert!(matcher.is_match("A.B desk"));
        assert!(!matcher.is_match("axb desk"));
    }
}
