//! Stage planning: stage + intent + collected payloads -> tool invocations

use super::executor::CollectedPayloads;
use super::stages::Stage;
use crate::intent::{Entities, IntentCategory, IntentRecord, MutationAction};
use adpilot_tools::{Capability, CampaignFilter, Payload, Platform, ToolRegistry};
use serde_json::{json, Value};
use std::collections::HashSet;

/// Campaigns fetched per platform for ranking intents
const RANKING_FETCH_LIMIT: usize = 50;

/// Results requested from the corpus search
const CORPUS_SEARCH_LIMIT: usize = 5;

/// Distinct research queries per run
const MAX_RESEARCH_QUERIES: usize = 3;

/// Topic words folded into one research query
const TOPICS_PER_QUERY: usize = 3;

const NO_DATA: &str = "No campaign data was collected.";

/// One planned tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    /// Capability to call
    pub capability: Capability,
    /// JSON arguments
    pub arguments: Value,
}

impl ToolInvocation {
    /// Create an invocation
    #[must_use]
    pub fn new(capability: Capability, arguments: Value) -> Self {
        Self {
            capability,
            arguments,
        }
    }
}

/// What a stage will do
#[derive(Debug, Clone, PartialEq)]
pub enum StagePlan {
    /// Issue these calls
    Invoke(Vec<ToolInvocation>),
    /// Nothing to do
    Skip {
        /// Capability the stage would have used
        tool: Capability,
        /// Why the stage was skipped
        reason: String,
    },
}

/// Inputs to planning one stage
pub struct PlanContext<'a> {
    /// The question
    pub question: &'a str,
    /// Classified intent
    pub intent: &'a IntentRecord,
    /// Payloads of earlier stages
    pub collected: &'a CollectedPayloads,
    /// Registered adapters
    pub registry: &'a ToolRegistry,
    /// Year used in research queries
    pub year: i32,
}

/// Turns stages into tool invocations
#[derive(Debug, Clone, Default)]
pub struct StagePlanner;

impl StagePlanner {
    /// Create a planner
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Plan one stage. Compile is handled by the synthesizer and plans nothing.
    #[must_use]
    pub fn plan(&self, stage: Stage, ctx: &PlanContext<'_>) -> StagePlan {
        let plan = match stage {
            Stage::FetchData => self.plan_fetch(ctx),
            Stage::Analyze => self.plan_analyze(ctx),
            Stage::Research => self.plan_research(ctx),
            Stage::GenerateContent => self.plan_content(ctx),
            Stage::Mutate => self.plan_mutate(ctx),
            Stage::Compile => StagePlan::Invoke(Vec::new()),
        };
        Self::keep_registered(plan, ctx.registry)
    }

    fn keep_registered(plan: StagePlan, registry: &ToolRegistry) -> StagePlan {
        let StagePlan::Invoke(invocations) = plan else {
            return plan;
        };
        let Some(first) = invocations.first().map(|i| i.capability) else {
            return StagePlan::Invoke(invocations);
        };
        let registered: Vec<ToolInvocation> = invocations
            .into_iter()
            .filter(|i| registry.has(i.capability))
            .collect();
        if registered.is_empty() {
            StagePlan::Skip {
                tool: first,
                reason: format!("no adapter registered for {}", first),
            }
        } else {
            StagePlan::Invoke(registered)
        }
    }

    fn plan_fetch(&self, ctx: &PlanContext<'_>) -> StagePlan {
        let entities = &ctx.intent.entities;
        let category = ctx.intent.category;
        let ranking = ctx.intent.ranks_campaigns();

        let filter = if category == IntentCategory::ActionMutation && !ranking {
            match entities.mutation_filter() {
                Some(filter) => Some(filter),
                None => {
                    return StagePlan::Skip {
                        tool: Capability::ListCampaigns,
                        reason: mutation_lookup_skip(entities).to_string(),
                    }
                }
            }
        } else {
            entities.filter()
        };

        if !entities.campaign_ids.is_empty() {
            return StagePlan::Invoke(
                entities
                    .campaign_ids
                    .iter()
                    .map(|id| ToolInvocation::new(Capability::CampaignDetail, json!({ "campaign_id": id })))
                    .collect(),
            );
        }

        if let Some(filter) = filter {
            let arguments = serde_json::to_value(&filter).unwrap_or_else(|_| json!({}));
            return StagePlan::Invoke(vec![ToolInvocation::new(Capability::ListCampaigns, arguments)]);
        }

        let fetch = |platform: &Platform| {
            let arguments = if ranking {
                json!({ "platform": platform, "limit": RANKING_FETCH_LIMIT })
            } else {
                json!({ "platform": platform })
            };
            ToolInvocation::new(Capability::FetchCampaigns, arguments)
        };

        if !entities.platforms.is_empty() {
            return StagePlan::Invoke(entities.platforms.iter().map(fetch).collect());
        }

        let mut invocations: Vec<ToolInvocation> = Platform::ALL.iter().map(fetch).collect();
        if !ranking {
            invocations.push(ToolInvocation::new(
                Capability::SearchCampaigns,
                json!({ "query": ctx.question.trim(), "limit": CORPUS_SEARCH_LIMIT }),
            ));
        }
        StagePlan::Invoke(invocations)
    }

    fn plan_research(&self, ctx: &PlanContext<'_>) -> StagePlan {
        let tool = if ctx.registry.has(Capability::WebSearch) {
            Capability::WebSearch
        } else if ctx.registry.has(Capability::EncyclopediaSearch) {
            Capability::EncyclopediaSearch
        } else {
            return StagePlan::Skip {
                tool: Capability::WebSearch,
                reason: "no research adapter registered".to_string(),
            };
        };

        StagePlan::Invoke(
            research_queries(ctx.intent, ctx.year)
                .into_iter()
                .map(|query| ToolInvocation::new(tool, json!({ "query": query })))
                .collect(),
        )
    }

    fn plan_analyze(&self, ctx: &PlanContext<'_>) -> StagePlan {
        let data = ctx
            .collected
            .render_stage(Stage::FetchData)
            .unwrap_or_else(|| NO_DATA.to_string());

        if ctx.intent.category == IntentCategory::Brainstorm {
            let mut arguments = json!({
                "goals": goal_text(ctx.question),
                "data": data,
            });
            if let Some(research) = ctx.collected.render_stage(Stage::Research) {
                arguments["research"] = Value::String(research);
            }
            return StagePlan::Invoke(vec![ToolInvocation::new(Capability::OptimizeStrategy, arguments)]);
        }

        let platforms = &ctx.intent.entities.platforms;
        let trends = match platforms.as_slice() {
            [platform] => json!({ "platform": platform }),
            _ => json!({}),
        };
        StagePlan::Invoke(vec![
            ToolInvocation::new(
                Capability::AnalyzePerformance,
                json!({ "question": ctx.question.trim(), "data": data }),
            ),
            ToolInvocation::new(Capability::AnalyzeTrends, trends),
        ])
    }

    fn plan_content(&self, ctx: &PlanContext<'_>) -> StagePlan {
        let mut arguments = json!({ "brief": goal_text(ctx.question) });
        if let Some(platform) = ctx.intent.entities.platforms.first() {
            arguments["platform"] = json!(platform);
        }
        let context = ctx
            .collected
            .render_stage(Stage::Analyze)
            .or_else(|| ctx.collected.render_stage(Stage::FetchData));
        if let Some(context) = context {
            arguments["context"] = Value::String(context);
        }
        StagePlan::Invoke(vec![ToolInvocation::new(Capability::GenerateContent, arguments)])
    }

    fn plan_mutate(&self, ctx: &PlanContext<'_>) -> StagePlan {
        let entities = &ctx.intent.entities;
        let Some(action) = &entities.action else {
            return StagePlan::Skip {
                tool: Capability::UpdateCampaign,
                reason: "no mutation action requested".to_string(),
            };
        };

        if let MutationAction::Create { name, budget } = action {
            let platform = entities.platforms.first().copied().unwrap_or(Platform::Facebook);
            let name = name
                .clone()
                .unwrap_or_else(|| format!("New {} campaign", platform));
            let mut arguments = json!({
                "name": name,
                "platform": platform,
                "status": "draft",
            });
            if let Some(budget) = budget {
                arguments["budget"] = json!(budget);
            }
            return StagePlan::Invoke(vec![ToolInvocation::new(Capability::CreateCampaign, arguments)]);
        }

        let Some(update) = action.to_update() else {
            return StagePlan::Skip {
                tool: Capability::UpdateCampaign,
                reason: "action has no update".to_string(),
            };
        };
        let update_value = serde_json::to_value(&update).unwrap_or_else(|_| json!({}));

        if !entities.campaign_ids.is_empty() {
            return StagePlan::Invoke(
                entities
                    .campaign_ids
                    .iter()
                    .map(|id| {
                        let mut arguments = update_value.clone();
                        arguments["campaign_id"] = json!(id);
                        ToolInvocation::new(Capability::UpdateCampaign, arguments)
                    })
                    .collect(),
            );
        }

        if ctx.intent.ranks_campaigns() {
            let ids = ranked_ids(ctx.collected);
            if ids.is_empty() {
                return StagePlan::Skip {
                    tool: Capability::BulkUpdateCampaigns,
                    reason: format!("no ranked campaigns to apply {}", update),
                };
            }
            let filter = CampaignFilter::new().with_ids(ids);
            return StagePlan::Invoke(vec![ToolInvocation::new(
                Capability::BulkUpdateCampaigns,
                json!({ "filter": filter, "update": update_value }),
            )]);
        }

        match entities.mutation_filter() {
            Some(filter) => StagePlan::Invoke(vec![ToolInvocation::new(
                Capability::BulkUpdateCampaigns,
                json!({ "filter": filter, "update": update_value }),
            )]),
            None if entities.all_campaigns => StagePlan::Invoke(vec![ToolInvocation::new(
                Capability::BulkUpdateCampaigns,
                json!({ "all": true, "update": update_value }),
            )]),
            None => StagePlan::Skip {
                tool: Capability::BulkUpdateCampaigns,
                reason: format!("no campaigns selected for {}", update),
            },
        }
    }
}

fn mutation_lookup_skip(entities: &Entities) -> &'static str {
    if !entities.campaign_ids.is_empty() {
        "mutation targets campaigns by id"
    } else if entities.all_campaigns {
        "mutation applies to every campaign"
    } else if matches!(entities.action, Some(MutationAction::Create { .. })) {
        "create needs no existing campaigns"
    } else {
        "no campaign selection to look up"
    }
}

/// Ids of the ranked campaigns fetched for this run, best match first
fn ranked_ids(collected: &CollectedPayloads) -> Vec<String> {
    collected
        .payloads_for(Stage::FetchData)
        .into_iter()
        .find_map(|payload| match payload {
            Payload::Campaigns(campaigns) => Some(campaigns.iter().map(|c| c.id.clone()).collect()),
            _ => None,
        })
        .unwrap_or_default()
}

fn goal_text(question: &str) -> String {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        "Improve overall campaign performance".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Up to three distinct research queries for an intent
#[must_use]
pub(crate) fn research_queries(intent: &IntentRecord, year: i32) -> Vec<String> {
    let entities = &intent.entities;
    let mut candidates = Vec::new();
    if !entities.topics.is_empty() {
        let topics: Vec<&str> = entities
            .topics
            .iter()
            .take(TOPICS_PER_QUERY)
            .map(String::as_str)
            .collect();
        candidates.push(format!("{} {} trends", topics.join(" "), year));
    }
    for platform in &entities.platforms {
        candidates.push(format!("{} advertising {} trends", platform, year));
    }
    if entities.platforms.is_empty() {
        candidates.push(format!("social media advertising {} trends", year));
    }

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|q| {
            let key = q.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
            seen.insert(key)
        })
        .take(MAX_RESEARCH_QUERIES)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentSource;
    use adpilot_tools::{register_builtins, BuiltinsConfig, Comparison, MemoryStore, Metric, MetricThreshold};
    use std::sync::Arc;

    fn registry(encyclopedia: bool) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        let config = BuiltinsConfig::new(Arc::new(MemoryStore::new())).with_encyclopedia(encyclopedia);
        register_builtins(&mut registry, &config).unwrap();
        registry
    }

    fn intent(category: IntentCategory, entities: Entities) -> IntentRecord {
        IntentRecord::new(category, 0.8, entities, IntentSource::Keyword)
    }

    fn plan(stage: Stage, question: &str, intent: &IntentRecord, registry: &ToolRegistry) -> StagePlan {
        let collected = CollectedPayloads::default();
        let ctx = PlanContext {
            question,
            intent,
            collected: &collected,
            registry,
            year: 2026,
        };
        StagePlanner::new().plan(stage, &ctx)
    }

    fn invocations(plan: StagePlan) -> Vec<ToolInvocation> {
        match plan {
            StagePlan::Invoke(invocations) => invocations,
            StagePlan::Skip { reason, .. } => panic!("unexpected skip: {}", reason),
        }
    }

    #[test]
    fn test_ranking_fetches_every_platform() {
        let registry = registry(false);
        let intent = intent(IntentCategory::InformationalRanking, Entities::default());
        let calls = invocations(plan(Stage::FetchData, "top campaigns", &intent, &registry));
        assert_eq!(calls.len(), Platform::ALL.len());
        assert!(calls.iter().all(|c| c.capability == Capability::FetchCampaigns));
        assert_eq!(calls[0].arguments["limit"], json!(RANKING_FETCH_LIMIT));
    }

    #[test]
    fn test_generic_fetch_adds_corpus_search() {
        let registry = registry(false);
        let intent = intent(IntentCategory::InformationalAnalysis, Entities::default());
        let calls = invocations(plan(Stage::FetchData, "how are we doing", &intent, &registry));
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].capability, Capability::SearchCampaigns);
    }

    #[test]
    fn test_threshold_fetch_uses_listing() {
        let registry = registry(false);
        let entities = Entities {
            thresholds: vec![MetricThreshold::new(Metric::Ctr, Comparison::Below, 2.0)],
            action: Some(MutationAction::Pause),
            ..Default::default()
        };
        let intent = intent(IntentCategory::ActionMutation, entities);
        let calls = invocations(plan(Stage::FetchData, "pause", &intent, &registry));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].capability, Capability::ListCampaigns);
        assert_eq!(calls[0].arguments["thresholds"][0]["metric"], json!("ctr"));

        let mutate = invocations(plan(Stage::Mutate, "pause", &intent, &registry));
        assert_eq!(mutate[0].capability, Capability::BulkUpdateCampaigns);
        assert_eq!(mutate[0].arguments["update"]["status"], json!("paused"));
    }

    #[test]
    fn test_mutation_without_selection_skips_fetch() {
        let registry = registry(false);
        let entities = Entities {
            action: Some(MutationAction::Pause),
            ..Default::default()
        };
        let intent = intent(IntentCategory::ActionMutation, entities);
        assert!(matches!(
            plan(Stage::FetchData, "pause everything", &intent, &registry),
            StagePlan::Skip { .. }
        ));
        assert!(matches!(
            plan(Stage::Mutate, "pause everything", &intent, &registry),
            StagePlan::Skip { tool: Capability::BulkUpdateCampaigns, .. }
        ));
    }

    #[test]
    fn test_update_per_campaign_id() {
        let registry = registry(false);
        let entities = Entities {
            campaign_ids: vec!["fb_a_1".into(), "ig_b_2".into()],
            action: Some(MutationAction::ScaleBudget { factor: 1.2 }),
            ..Default::default()
        };
        let intent = intent(IntentCategory::ActionMutation, entities);
        let calls = invocations(plan(Stage::Mutate, "", &intent, &registry));
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].arguments["campaign_id"], json!("ig_b_2"));
        assert_eq!(calls[1].arguments["budget_factor"], json!(1.2));
    }

    #[test]
    fn test_create_defaults() {
        let registry = registry(false);
        let entities = Entities {
            action: Some(MutationAction::Create { name: None, budget: Some(500.0) }),
            ..Default::default()
        };
        let intent = intent(IntentCategory::ActionMutation, entities);
        let calls = invocations(plan(Stage::Mutate, "create a campaign", &intent, &registry));
        assert_eq!(calls[0].capability, Capability::CreateCampaign);
        assert_eq!(calls[0].arguments["platform"], json!("facebook"));
        assert_eq!(calls[0].arguments["budget"], json!(500.0));
    }

    #[test]
    fn test_no_action_skips_mutate() {
        let registry = registry(false);
        let intent = intent(IntentCategory::Hybrid, Entities::default());
        assert!(matches!(
            plan(Stage::Mutate, "", &intent, &registry),
            StagePlan::Skip { .. }
        ));
    }

    #[test]
    fn test_research_queries_are_distinct() {
        let entities = Entities {
            topics: vec!["sneakers".into(), "summer".into()],
            ..Default::default()
        };
        let queries = research_queries(&intent(IntentCategory::Brainstorm, entities), 2026);
        assert_eq!(
            queries,
            vec![
                "sneakers summer 2026 trends".to_string(),
                "social media advertising 2026 trends".to_string()
            ]
        );

        let entities = Entities {
            platforms: vec![Platform::Facebook, Platform::Instagram],
            topics: vec!["Facebook".into(), "advertising".into()],
            ..Default::default()
        };
        let queries = research_queries(&intent(IntentCategory::Brainstorm, entities), 2026);
        assert_eq!(queries.len(), 2);
    }

    #[test]
    fn test_research_falls_back_to_encyclopedia() {
        let intent = intent(IntentCategory::Brainstorm, Entities::default());
        let calls = invocations(plan(Stage::Research, "ideas", &intent, &registry(true)));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].capability, Capability::EncyclopediaSearch);

        assert!(matches!(
            plan(Stage::Research, "ideas", &intent, &registry(false)),
            StagePlan::Skip { .. }
        ));
    }

    #[test]
    fn test_generation_stages_skip_without_llm() {
        let registry = registry(false);
        let intent = intent(IntentCategory::InformationalAnalysis, Entities::default());
        let calls = invocations(plan(Stage::Analyze, "why", &intent, &registry));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].capability, Capability::AnalyzeTrends);

        assert!(matches!(
            plan(Stage::GenerateContent, "write copy", &intent, &registry),
            StagePlan::Skip { tool: Capability::GenerateContent, .. }
        ));
    }
}
