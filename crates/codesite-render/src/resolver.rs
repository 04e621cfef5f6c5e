//! Picks the template that renders a request.

use codesite_rules::Facts;
use tracing::debug;

use crate::environment::{RequestClassifier, RequestEnvironment};
use crate::model::Template;
use crate::store::EntityStore;

/// Selects among the templates stored for `request_type`.
///
/// Candidates are the active templates whose type equals `request_type`,
/// tried in ascending priority (ties keep their input order). The first
/// whose condition tree holds is returned. An unconditional template always
/// holds, so it acts as the fallback for every template after it.
///
/// ```
/// use codesite_render::resolver::resolve;
/// use codesite_render::{RequestEnvironment, RequestKind, Template};
/// use codesite_rules::{Op, RuleSet};
///
/// let strict = Template {
///     id: 1,
///     template_type: "single-post".into(),
///     priority: 1,
///     conditions: RuleSet::all().rule("logged_in", Op::Is, true),
///     ..Template::default()
/// };
/// let fallback = Template {
///     id: 2,
///     template_type: "single-post".into(),
///     ..Template::default()
/// };
/// let templates = [fallback, strict];
/// let env = RequestEnvironment::new(RequestKind::Single);
/// assert_eq!(resolve("single-post", &templates, &env).map(|t| t.id), Some(2));
/// ```
pub fn resolve<'t, F: Facts + ?Sized>(
    request_type: &str,
    templates: &'t [Template],
    facts: &F,
) -> Option<&'t Template> {
    let mut candidates: Vec<&Template> = templates
        .iter()
        .filter(|t| t.status.is_active() && t.template_type == request_type)
        .collect();
    candidates.sort_by_key(|t| t.priority);

    let chosen = candidates
        .into_iter()
        .find(|t| t.conditions.evaluate(facts));
    match chosen {
        Some(t) => debug!(
            request_type,
            template = t.id,
            name = %t.name,
            priority = t.priority,
            "template resolved"
        ),
        None => debug!(request_type, "no template matches"),
    }
    chosen
}

/// Classifies the request and resolves against the store's templates.
pub fn resolve_for_request<S, C>(
    store: &S,
    classifier: &C,
    env: &RequestEnvironment,
) -> Option<Template>
where
    S: EntityStore + ?Sized,
    C: RequestClassifier + ?Sized,
{
    let request_type = classifier.classify(env)?;
    let templates = store.templates_by_type(&request_type);
    resolve(&request_type, &templates, env).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{PostRecord, RequestKind, Term};
    use crate::model::Status;
    use crate::store::MemoryStore;
    use codesite_rules::{Op, RuleSet};

    fn template(id: u64, priority: i64, conditions: RuleSet) -> Template {
        Template {
            id,
            name: format!("T{}", id),
            template_type: "single-post".into(),
            priority,
            conditions,
            ..Template::default()
        }
    }

    fn news_post() -> RequestEnvironment {
        RequestEnvironment::new(RequestKind::Single).with_post(PostRecord {
            id: 5,
            categories: vec![Term {
                slug: "news".into(),
                ..Term::default()
            }],
            ..PostRecord::default()
        })
    }

    #[test]
    fn lower_priority_wins() {
        let templates = vec![
            template(1, 20, RuleSet::default()),
            template(2, 5, RuleSet::default()),
        ];
        let env = news_post();
        assert_eq!(resolve("single-post", &templates, &env).map(|t| t.id), Some(2));
    }

    #[test]
    fn first_matching_condition_wins() {
        let news = RuleSet::all().rule("category", Op::Is, "news");
        let sports = RuleSet::all().rule("category", Op::Is, "sports");
        let templates = vec![
            template(1, 1, sports),
            template(2, 2, news),
            template(3, 3, RuleSet::default()),
        ];
        let env = news_post();
        assert_eq!(resolve("single-post", &templates, &env).map(|t| t.id), Some(2));
    }

    #[test]
    fn unconditional_template_is_the_fallback() {
        let sports = RuleSet::all().rule("category", Op::Is, "sports");
        let templates = vec![template(1, 1, sports), template(2, 50, RuleSet::default())];
        let env = news_post();
        assert_eq!(resolve("single-post", &templates, &env).map(|t| t.id), Some(2));
    }

    #[test]
    fn nothing_matches() {
        let sports = RuleSet::all().rule("category", Op::Is, "sports");
        let templates = vec![template(1, 1, sports)];
        let env = news_post();
        assert!(resolve("single-post", &templates, &env).is_none());
        assert!(resolve("single-post", &[], &env).is_none());
    }

    #[test]
    fn skips_inactive_and_mismatched() {
        let mut draft = template(1, 1, RuleSet::default());
        draft.status = Status::Draft;
        let mut page = template(2, 1, RuleSet::default());
        page.template_type = "page".into();
        let templates = vec![draft, page, template(3, 9, RuleSet::default())];
        let env = news_post();
        assert_eq!(resolve("single-post", &templates, &env).map(|t| t.id), Some(3));
    }

    #[test]
    fn equal_priorities_keep_input_order() {
        let templates = vec![
            template(9, 10, RuleSet::default()),
            template(4, 10, RuleSet::default()),
        ];
        let env = news_post();
        assert_eq!(resolve("single-post", &templates, &env).map(|t| t.id), Some(9));
    }

    #[test]
    fn resolves_through_store_and_classifier() {
        let mut store = MemoryStore::new();
        store.insert_template(template(4, 10, RuleSet::default()));
        let env = news_post();
        let classifier = crate::environment::QueryClassifier;
        assert_eq!(
            resolve_for_request(&store, &classifier, &env).map(|t| t.id),
            Some(4)
        );
        let other = RequestEnvironment::new(RequestKind::Other);
        assert!(resolve_for_request(&store, &classifier, &other).is_none());
    }
}
