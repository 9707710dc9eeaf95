//! Insight-weighted ranking of recommended actions.

use std::collections::HashMap;

use super::insights::ContextInsight;
use crate::domain::RecommendedAction;

/// Re-rank `templates` against `insights` and keep the best `limit`.
///
/// Each template's priority grows by `importance * relevance_score` for every
/// insight whose category it declares. A `{category}` placeholder for a
/// declared category takes the value of that category's most important
/// insight; any other placeholder is left untouched.
pub fn rank_actions(
    templates: &[RecommendedAction],
    insights: &[ContextInsight],
    limit: usize,
) -> Vec<RecommendedAction> {
    let mut leading: HashMap<&str, &ContextInsight> = HashMap::new();
    for insight in insights {
        leading
            .entry(insight.category.as_str())
            .and_modify(|current| {
                if insight.importance > current.importance {
                    *current = insight;
                }
            })
            .or_insert(insight);
    }

    let mut ranked: Vec<RecommendedAction> = templates
        .iter()
        .map(|template| {
            let boost: f64 = template
                .context_relevance
                .iter()
                .flat_map(|relevance| {
                    insights
                        .iter()
                        .filter(move |i| i.category == relevance.category)
                        .map(move |i| i.importance * relevance.relevance_score)
                })
                .sum();

            let mut prompt = template.prompt.clone();
            for relevance in &template.context_relevance {
                let Some(insight) = leading.get(relevance.category.as_str()) else {
                    continue;
                };
                let placeholder = format!("{{{}}}", relevance.category);
                prompt = prompt.replace(&placeholder, &insight.value.to_string());
            }

            RecommendedAction {
                priority: template.priority + boost,
                prompt,
                ..template.clone()
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    ranked.truncate(limit);
    ranked
}
