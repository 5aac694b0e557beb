//! Transformation ranking against the active document's syntax.

use crate::document::ScopeMatcher;
use crate::error::SpandocError;
use crate::output::RankedTransformation;
use crate::settings::{OrderedMap, Transformation};
use tracing::debug;

/// Rank transformations best-first by their best-matching scope selector.
///
/// Transformations whose selectors all score zero are left out. Equal scores
/// keep configuration order.
///
/// # Errors
/// - [`SpandocError::NoTransformationsConfigured`] when the table is empty.
/// - [`SpandocError::NoMatchingTransformation`] when nothing matches; the
///   host should show this as information and do nothing else.
pub fn rank_transformations(
    transformations: &OrderedMap<Transformation>,
    matcher: &dyn ScopeMatcher,
) -> Result<Vec<RankedTransformation>, SpandocError> {
    if transformations.is_empty() {
        return Err(SpandocError::NoTransformationsConfigured);
    }

    let mut ranked: Vec<RankedTransformation> = transformations
        .iter()
        .filter_map(|(name, t)| {
            best_selector(t, matcher).map(|(_, score)| RankedTransformation {
                name: name.clone(),
                score,
            })
        })
        .collect();

    if ranked.is_empty() {
        return Err(SpandocError::NoMatchingTransformation {
            syntax: matcher.describe(),
        });
    }

    // stable: ties keep configuration order
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    debug!(
        "Ranked transformations: {:?}",
        ranked.iter().map(|r| (&r.name, r.score)).collect::<Vec<_>>()
    );
    Ok(ranked)
}

/// The highest-scoring selector of one transformation and its score.
///
/// The first selector reaching the maximum wins; zero scores never win.
pub(crate) fn best_selector<'t>(
    transformation: &'t Transformation,
    matcher: &dyn ScopeMatcher,
) -> Option<(&'t str, u32)> {
    let mut best: Option<(&str, u32)> = None;
    for (selector, _) in transformation.scope.iter() {
        let score = matcher.score(selector);
        if score == 0 {
            continue;
        }
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((selector.as_str(), score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DottedScopeMatcher;

    fn transformation(selectors: &[(&str, &str)]) -> Transformation {
        Transformation {
            scope: selectors
                .iter()
                .map(|(s, f)| (s.to_string(), f.to_string()))
                .collect(),
            ..Transformation::default()
        }
    }

    fn names(ranked: &[RankedTransformation]) -> Vec<&str> {
        ranked.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn single_match() {
        let ts: OrderedMap<Transformation> =
            [("to-html".to_string(), transformation(&[("text.plain", "markdown")]))]
                .into_iter()
                .collect();
        let matcher = |s: &str| u32::from(s == "text.plain");
        let ranked = rank_transformations(&ts, &matcher).unwrap();
        assert_eq!(names(&ranked), vec!["to-html"]);
        assert_eq!(ranked[0].score, 1);
    }

    #[test]
    fn highest_score_first_and_zero_excluded() {
        let ts: OrderedMap<Transformation> = [
            ("generic".to_string(), transformation(&[("text.html", "html")])),
            ("none".to_string(), transformation(&[("source.rust", "x")])),
            ("specific".to_string(), transformation(&[("text.html.markdown", "markdown")])),
        ]
        .into_iter()
        .collect();
        let matcher = DottedScopeMatcher::new("text.html.markdown");
        let ranked = rank_transformations(&ts, &matcher).unwrap();
        assert_eq!(names(&ranked), vec!["specific", "generic"]);
    }

    #[test]
    fn best_selector_per_transformation() {
        let ts: OrderedMap<Transformation> = [
            ("a".to_string(), transformation(&[("text", "x")])),
            (
                "b".to_string(),
                transformation(&[("source.python", "y"), ("text.html.markdown", "markdown")]),
            ),
        ]
        .into_iter()
        .collect();
        let matcher = DottedScopeMatcher::new("text.html.markdown");
        let ranked = rank_transformations(&ts, &matcher).unwrap();
        assert_eq!(names(&ranked), vec!["b", "a"]);
        assert_eq!(ranked[0].score, 3);
    }

    #[test]
    fn ties_keep_configuration_order() {
        let ts: OrderedMap<Transformation> = ["zeta", "alpha", "mid"]
            .into_iter()
            .map(|n| (n.to_string(), transformation(&[("text.plain", "markdown")])))
            .collect();
        let matcher = |_: &str| 5u32;
        let ranked = rank_transformations(&ts, &matcher).unwrap();
        assert_eq!(names(&ranked), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn nothing_matches() {
        let ts: OrderedMap<Transformation> =
            [("x".to_string(), transformation(&[("source.rust", "x")]))].into_iter().collect();
        let matcher = DottedScopeMatcher::new("text.plain");
        let err = rank_transformations(&ts, &matcher).unwrap_err();
        match err {
            SpandocError::NoMatchingTransformation { syntax } => assert_eq!(syntax, "text.plain"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_table_is_a_configuration_error() {
        let ts = OrderedMap::<Transformation>::new();
        let matcher = DottedScopeMatcher::new("text.plain");
        let err = rank_transformations(&ts, &matcher).unwrap_err();
        assert!(
            matches!(err, SpandocError::NoTransformationsConfigured),
            "got {err:?}"
        );
    }

    #[test]
    fn best_selector_first_max_wins() {
        let t = transformation(&[("a", "fmt-a"), ("b", "fmt-b"), ("c", "fmt-c")]);
        let matcher = |s: &str| -> u32 {
            match s {
                "a" => 1,
                "b" | "c" => 2,
                _ => 0,
            }
        };
        assert_eq!(best_selector(&t, &matcher), Some(("b", 2)));
    }
}
