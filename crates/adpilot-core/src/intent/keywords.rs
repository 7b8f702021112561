//! Tier-1 classification: trigger phrases and regex entity extraction

use super::types::{Entities, IntentCategory, MutationAction};
use adpilot_tools::{CampaignStatus, Comparison, Metric, MetricThreshold, Platform};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const CONFIDENCE_BASE: f64 = 0.5;
const CONFIDENCE_STEP: f64 = 0.1;
const CONFIDENCE_CAP: f64 = 0.9;
const MAX_TOPICS: usize = 5;

const RANKING_TRIGGERS: &[&str] = &[
    "top", "best", "worst", "highest", "lowest", "rank", "ranked", "ranking", "leaderboard",
    "best performing", "top performing",
];

const MUTATION_TRIGGERS: &[&str] = &[
    "pause", "activate", "reactivate", "resume", "deactivate", "update", "modify", "create",
    "launch", "increase budget", "decrease budget",
];

const BRAINSTORM_TRIGGERS: &[&str] = &[
    "fresh ideas", "brainstorm", "market trends", "innovative", "latest trends", "new ideas",
    "industry best practices", "ideas", "trends", "trending", "inspiration", "creative ideas",
];

const ANALYSIS_TRIGGERS: &[&str] = &[
    "analyze", "analyse", "analysis", "report", "recommendations", "recommend", "improve",
    "optimize", "strategy", "compare", "comparison", "insights", "evaluate", "performance", "why",
    "breakdown", "review", "summary", "summarize",
];

const CONTENT_TRIGGERS: &[&str] = &[
    "ad copy", "copy", "caption", "captions", "content", "headline", "headlines", "creative",
    "post", "write", "slogan", "hashtags",
];

const STOPWORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "are", "been", "before", "being",
    "between", "both", "but", "can", "could", "does", "doing", "each", "for", "from", "give",
    "have", "having", "here", "into", "just", "like", "make", "more", "most", "much", "need",
    "only", "other", "over", "please", "same", "should", "show", "some", "such", "tell", "than",
    "that", "their", "them", "then", "there", "these", "they", "this", "those", "through",
    "under", "very", "what", "when", "where", "which", "while", "will", "with", "would", "your",
    "campaign", "campaigns", "below", "above", "less", "greater", "want", "know", "help",
    "facebook", "instagram", "insta", "budget", "budgets",
];

const METRIC_PATTERN: &str = r"conversion[ _]rate|cvr|conversions|click[- ]through[- ]rate|cost[- ]per[- ]click|return on ad spend|roas|ctr|cpc|revenue|spend|budget|clicks|impressions";

static PLATFORM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(facebook|fb|instagram|insta|ig)\b").expect("PLATFORM_REGEX is a compile-time constant")
});

static THRESHOLD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b({METRIC_PATTERN})\s*(?:is\s+|of\s+)?(below|under|less than|lower than|<|above|over|greater than|more than|higher than|>)\s*\$?\s*(\d+(?:\.\d+)?)"
    ))
    .expect("THRESHOLD_REGEX is a compile-time constant")
});

static TOP_N_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:top|best|worst|bottom)\s+(\d{1,3})\b|\b(\d{1,3})\s+(?:best|worst|top|bottom|lowest|highest|weakest|poorest)\b")
        .expect("TOP_N_REGEX is a compile-time constant")
});

static ALL_CAMPAIGNS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:all|every)\s+(?:of\s+)?(?:(?:my|our|the)\s+)?(?:[a-z]+\s+)?campaigns?\b|\beverything\b")
        .expect("ALL_CAMPAIGNS_REGEX is a compile-time constant")
});

static BY_METRIC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\bby\s+({METRIC_PATTERN})\b")).expect("BY_METRIC_REGEX is a compile-time constant")
});

static EXTREME_METRIC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(highest|lowest|best|top|worst)\s+(?:\d+\s+)?({METRIC_PATTERN})\b"
    ))
    .expect("EXTREME_METRIC_REGEX is a compile-time constant")
});

static WORST_FIRST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:worst|bottom|poorest|weakest|underperforming)\b")
        .expect("WORST_FIRST_REGEX is a compile-time constant")
});

static CAMPAIGN_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b((?:fb|ig)_[a-z0-9_]+)\b").expect("CAMPAIGN_ID_REGEX is a compile-time constant")
});

static AMOUNT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s?(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)").expect("AMOUNT_REGEX is a compile-time constant")
});

static QUOTED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["\u{201C}]([^"\u{201C}\u{201D}]{2,80})["\u{201D}]"#)
        .expect("QUOTED_REGEX is a compile-time constant")
});

static STATUS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(active|paused|completed|draft)\s+(?:[a-z]+\s+)?campaigns?\b")
        .expect("STATUS_REGEX is a compile-time constant")
});

static CREATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:create|launch|start|set up)\s+(?:an?\s+)?(?:new\s+)?(?:(?:facebook|fb|instagram|insta|ig)\s+)?campaign")
        .expect("CREATE_REGEX is a compile-time constant")
});

static SET_BUDGET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bset\s+(?:the\s+)?budgets?\s+(?:to|at)\s+\$?\s*(\d+(?:\.\d+)?)")
        .expect("SET_BUDGET_REGEX is a compile-time constant")
});

static SCALE_BUDGET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(increase|raise|boost|double|decrease|reduce|cut|lower|halve)\b[^.?!]*?\bbudgets?\b(?:[^.?!]*?\bby\s+(\d+(?:\.\d+)?)\s*%)?")
        .expect("SCALE_BUDGET_REGEX is a compile-time constant")
});

static PAUSE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:pause|stop|deactivate|halt|turn off)\b").expect("PAUSE_REGEX is a compile-time constant")
});

static ACTIVATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:activate|reactivate|resume|unpause|restart|enable|turn on)\b")
        .expect("ACTIVATE_REGEX is a compile-time constant")
});

/// Trigger phrase group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerGroup {
    /// Ranking words
    Ranking,
    /// Mutation verbs
    Mutation,
    /// Brainstorm words
    Brainstorm,
    /// Analysis words
    Analysis,
    /// Content-generation words
    Content,
}

/// Tier-1 result
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMatch {
    /// Matched category, `None` when no trigger fired
    pub category: Option<IntentCategory>,
    /// Confidence from trigger hits
    pub confidence: f64,
    /// Trigger hits of the deciding groups
    pub hits: usize,
    /// Extracted entities
    pub entities: Entities,
}

impl KeywordMatch {
    /// Category with the no-match default applied
    #[must_use]
    pub fn resolved_category(&self) -> IntentCategory {
        self.category.unwrap_or(IntentCategory::Hybrid)
    }
}

/// Trigger phrases per group
///
/// Phrases match on whole words of the lowercased question.
#[derive(Debug, Clone)]
pub struct TriggerTable {
    ranking: Vec<String>,
    mutation: Vec<String>,
    brainstorm: Vec<String>,
    analysis: Vec<String>,
    content: Vec<String>,
}

fn owned(phrases: &[&str]) -> Vec<String> {
    phrases.iter().map(|p| (*p).to_string()).collect()
}

impl Default for TriggerTable {
    fn default() -> Self {
        Self {
            ranking: owned(RANKING_TRIGGERS),
            mutation: owned(MUTATION_TRIGGERS),
            brainstorm: owned(BRAINSTORM_TRIGGERS),
            analysis: owned(ANALYSIS_TRIGGERS),
            content: owned(CONTENT_TRIGGERS),
        }
    }
}

/// Lowercase, keep word characters, pad with spaces for phrase lookup
fn normalize(text: &str) -> String {
    let mapped: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();
    let joined = mapped.split_whitespace().collect::<Vec<_>>().join(" ");
    format!(" {} ", joined)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

impl TriggerTable {
    /// Create the default table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add phrases to a group
    #[must_use]
    pub fn with_triggers<I, S>(mut self, group: TriggerGroup, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target = self.group_mut(group);
        for phrase in phrases {
            let phrase = phrase.into().trim().to_lowercase();
            if !phrase.is_empty() && !target.contains(&phrase) {
                target.push(phrase);
            }
        }
        self
    }

    /// Phrases of a group
    #[must_use]
    pub fn triggers(&self, group: TriggerGroup) -> &[String] {
        match group {
            TriggerGroup::Ranking => &self.ranking,
            TriggerGroup::Mutation => &self.mutation,
            TriggerGroup::Brainstorm => &self.brainstorm,
            TriggerGroup::Analysis => &self.analysis,
            TriggerGroup::Content => &self.content,
        }
    }

    fn group_mut(&mut self, group: TriggerGroup) -> &mut Vec<String> {
        match group {
            TriggerGroup::Ranking => &mut self.ranking,
            TriggerGroup::Mutation => &mut self.mutation,
            TriggerGroup::Brainstorm => &mut self.brainstorm,
            TriggerGroup::Analysis => &mut self.analysis,
            TriggerGroup::Content => &mut self.content,
        }
    }

    fn hits(&self, group: TriggerGroup, normalized: &str) -> usize {
        self.triggers(group)
            .iter()
            .filter(|phrase| normalized.contains(&format!(" {} ", phrase)))
            .count()
    }

    /// Classify a question and extract its entities
    #[must_use]
    pub fn classify(&self, question: &str) -> KeywordMatch {
        let normalized = normalize(question);
        let entities = self.extract_entities(question, &normalized);

        let mut mutation = self.hits(TriggerGroup::Mutation, &normalized);
        if mutation == 0 && entities.action.is_some() {
            mutation = 1;
        }
        let analysis = self.hits(TriggerGroup::Analysis, &normalized);
        let brainstorm = self.hits(TriggerGroup::Brainstorm, &normalized);
        let ranking = self.hits(TriggerGroup::Ranking, &normalized);

        let (category, hits) = if mutation > 0 && analysis > 0 {
            (Some(IntentCategory::Hybrid), mutation + analysis)
        } else if mutation > 0 {
            (Some(IntentCategory::ActionMutation), mutation)
        } else if brainstorm > 0 {
            (Some(IntentCategory::Brainstorm), brainstorm)
        } else if analysis > 0 {
            (Some(IntentCategory::InformationalAnalysis), analysis)
        } else if ranking > 0 {
            (Some(IntentCategory::InformationalRanking), ranking)
        } else {
            (None, 0)
        };

        let confidence = if category.is_some() {
            (CONFIDENCE_BASE + CONFIDENCE_STEP * hits as f64).min(CONFIDENCE_CAP)
        } else {
            0.0
        };

        KeywordMatch {
            category,
            confidence,
            hits,
            entities,
        }
    }

    fn extract_entities(&self, question: &str, normalized: &str) -> Entities {
        let lower = question.to_lowercase();
        let mut entities = Entities::default();

        for caps in PLATFORM_REGEX.captures_iter(&lower) {
            if let Some(platform) = Platform::parse_loose(&caps[1]) {
                if !entities.platforms.contains(&platform) {
                    entities.platforms.push(platform);
                }
            }
        }

        for caps in THRESHOLD_REGEX.captures_iter(&lower) {
            let Ok(metric) = caps[1].parse::<Metric>() else {
                continue;
            };
            let comparison = match &caps[2] {
                "below" | "under" | "less than" | "lower than" | "<" => Comparison::Below,
                _ => Comparison::Above,
            };
            if let Some(value) = parse_number(&caps[3]) {
                entities
                    .thresholds
                    .push(MetricThreshold::new(metric, comparison, value));
            }
        }

        entities.top_n = TOP_N_REGEX
            .captures(&lower)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .filter(|n| *n > 0);
        entities.all_campaigns = ALL_CAMPAIGNS_REGEX.is_match(&lower);

        entities.worst_first = WORST_FIRST_REGEX.is_match(&lower);
        if let Some(caps) = BY_METRIC_REGEX.captures(&lower) {
            entities.ranking_metric = caps[1].parse::<Metric>().ok();
        } else if let Some(caps) = EXTREME_METRIC_REGEX.captures(&lower) {
            if let Ok(metric) = caps[2].parse::<Metric>() {
                let literal_low = matches!(&caps[1], "lowest");
                let literal_high = matches!(&caps[1], "highest");
                if (literal_low && !metric.lower_is_better())
                    || (literal_high && metric.lower_is_better())
                {
                    entities.worst_first = true;
                }
                entities.ranking_metric = Some(metric);
            }
        }

        for caps in CAMPAIGN_ID_REGEX.captures_iter(&lower) {
            let id = caps[1].to_string();
            if !entities.campaign_ids.contains(&id) {
                entities.campaign_ids.push(id);
            }
        }

        for caps in QUOTED_REGEX.captures_iter(question) {
            let name = caps[1].trim().to_string();
            if !name.is_empty() && !entities.quoted_names.contains(&name) {
                entities.quoted_names.push(name);
            }
        }

        entities.status = STATUS_REGEX
            .captures(&lower)
            .and_then(|caps| caps[1].parse::<CampaignStatus>().ok());

        entities.action = self.extract_action(&lower, &entities.quoted_names);
        entities.wants_content = self.hits(TriggerGroup::Content, normalized) > 0;
        entities.topics = self.extract_topics(normalized);
        entities
    }

    fn extract_action(&self, lower: &str, quoted: &[String]) -> Option<MutationAction> {
        if CREATE_REGEX.is_match(lower) {
            let budget = AMOUNT_REGEX
                .captures(lower)
                .and_then(|caps| parse_number(&caps[1]));
            return Some(MutationAction::Create {
                name: quoted.first().cloned(),
                budget,
            });
        }

        if let Some(amount) = SET_BUDGET_REGEX
            .captures(lower)
            .and_then(|caps| parse_number(&caps[1]))
        {
            return Some(MutationAction::SetBudget { amount });
        }

        if let Some(caps) = SCALE_BUDGET_REGEX.captures(lower) {
            let percent = caps.get(2).and_then(|m| parse_number(m.as_str()));
            let factor = match &caps[1] {
                "double" => 2.0,
                "halve" => 0.5,
                "increase" | "raise" | "boost" => percent.map_or(1.2, |p| 1.0 + p / 100.0),
                _ => percent
                    .map(|p| 1.0 - p / 100.0)
                    .filter(|f| *f > 0.0)
                    .unwrap_or(0.8),
            };
            return Some(MutationAction::ScaleBudget { factor });
        }

        if PAUSE_REGEX.is_match(lower) {
            return Some(MutationAction::Pause);
        }
        if ACTIVATE_REGEX.is_match(lower) {
            return Some(MutationAction::Activate);
        }
        None
    }

    fn extract_topics(&self, normalized: &str) -> Vec<String> {
        let triggers: HashSet<&str> = [
            TriggerGroup::Ranking,
            TriggerGroup::Mutation,
            TriggerGroup::Brainstorm,
            TriggerGroup::Analysis,
            TriggerGroup::Content,
        ]
        .iter()
        .flat_map(|group| self.triggers(*group))
        .flat_map(|phrase| phrase.split_whitespace())
        .collect();

        let mut topics: Vec<String> = Vec::new();
        for word in normalized.split_whitespace() {
            if word.chars().count() < 4
                || !word.chars().all(char::is_alphabetic)
                || STOPWORDS.contains(&word)
                || triggers.contains(word)
                || word.parse::<Metric>().is_ok()
            {
                continue;
            }
            if !topics.iter().any(|t| t == word) {
                topics.push(word.to_string());
            }
            if topics.len() == MAX_TOPICS {
                break;
            }
        }
        topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(question: &str) -> KeywordMatch {
        TriggerTable::new().classify(question)
    }

    #[test]
    fn test_ranking_question() {
        let m = classify("Show me the top 10 best performing campaigns.");
        assert_eq!(m.category, Some(IntentCategory::InformationalRanking));
        assert_eq!(m.entities.top_n, Some(10));
        assert!(m.entities.platforms.is_empty());
        assert!((m.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_pause_with_threshold() {
        let m = classify("Pause all campaigns with CTR below 2%.");
        assert_eq!(m.category, Some(IntentCategory::ActionMutation));
        assert_eq!(m.entities.action, Some(MutationAction::Pause));
        assert_eq!(
            m.entities.thresholds,
            vec![MetricThreshold::new(Metric::Ctr, Comparison::Below, 2.0)]
        );
        assert!(m.entities.filter().is_some());
    }

    #[test]
    fn test_hybrid_when_mutation_and_analysis() {
        let m = classify("Analyze Instagram performance and pause anything with ROAS under 1.5");
        assert_eq!(m.category, Some(IntentCategory::Hybrid));
        assert_eq!(m.entities.platforms, vec![Platform::Instagram]);
        assert_eq!(m.entities.thresholds[0].metric, Metric::Roas);
        assert!((m.entities.thresholds[0].value - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_brainstorm_beats_ranking() {
        let m = classify("Give me fresh ideas for our best sneaker campaigns");
        assert_eq!(m.category, Some(IntentCategory::Brainstorm));
        assert!(m.entities.topics.contains(&"sneaker".to_string()));
    }

    #[test]
    fn test_analysis_beats_ranking() {
        let m = classify("Analyze the top 5 campaigns by ROAS and recommend improvements");
        assert_eq!(m.category, Some(IntentCategory::InformationalAnalysis));
        assert_eq!(m.entities.top_n, Some(5));
        assert_eq!(m.entities.ranking_metric, Some(Metric::Roas));
    }

    #[test]
    fn test_ranked_pause() {
        let m = classify("Pause the 3 worst campaigns by CTR");
        assert_eq!(m.category, Some(IntentCategory::ActionMutation));
        assert_eq!(m.entities.action, Some(MutationAction::Pause));
        assert_eq!(m.entities.top_n, Some(3));
        assert!(m.entities.worst_first);
        assert_eq!(m.entities.ranking_metric, Some(Metric::Ctr));
        assert!(m.entities.ranked_update());
        assert!(!m.entities.all_campaigns);
    }

    #[test]
    fn test_all_campaigns_wording() {
        assert!(classify("Pause all campaigns").entities.all_campaigns);
        assert!(classify("activate every instagram campaign").entities.all_campaigns);
        assert!(classify("pause all of our campaigns").entities.all_campaigns);
        assert!(!classify("pause fb_summer_1").entities.all_campaigns);
    }

    #[test]
    fn test_analysis_question() {
        let m = classify("Why did revenue drop on facebook last week?");
        assert_eq!(m.category, Some(IntentCategory::InformationalAnalysis));
        assert_eq!(m.entities.platforms, vec![Platform::Facebook]);
    }

    #[test]
    fn test_no_match() {
        let m = classify("hello there");
        assert_eq!(m.category, None);
        assert_eq!(m.confidence, 0.0);
        assert_eq!(m.resolved_category(), IntentCategory::Hybrid);

        let empty = classify("");
        assert_eq!(empty.category, None);
        assert_eq!(empty.entities, Entities::default());
    }

    #[test]
    fn test_confidence_capped() {
        let m = classify("top best worst highest lowest ranking leaderboard");
        assert!((m.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_budget_actions() {
        let m = classify("Increase the budget of fb_summer_sale_3 by 50%");
        assert_eq!(m.entities.action, Some(MutationAction::ScaleBudget { factor: 1.5 }));
        assert_eq!(m.entities.campaign_ids, vec!["fb_summer_sale_3".to_string()]);

        let m = classify("halve the budget for instagram campaigns");
        assert_eq!(m.entities.action, Some(MutationAction::ScaleBudget { factor: 0.5 }));

        let m = classify("set budget to $250 for ig_spring_2");
        assert_eq!(m.entities.action, Some(MutationAction::SetBudget { amount: 250.0 }));
    }

    #[test]
    fn test_create_action() {
        let m = classify("Create a new Instagram campaign called \"Winter Drop\" with a $1,500 budget");
        assert_eq!(m.category, Some(IntentCategory::ActionMutation));
        assert_eq!(
            m.entities.action,
            Some(MutationAction::Create {
                name: Some("Winter Drop".into()),
                budget: Some(1500.0),
            })
        );
        assert!(m.entities.filter().is_none());
    }

    #[test]
    fn test_deactivate_is_pause() {
        let m = classify("deactivate paused campaigns on instagram");
        assert_eq!(m.entities.action, Some(MutationAction::Pause));
        assert_eq!(m.entities.status, Some(CampaignStatus::Paused));
    }

    #[test]
    fn test_ranking_metric() {
        let m = classify("which campaigns have the lowest CPC?");
        assert_eq!(m.entities.ranking_metric, Some(Metric::Cpc));
        assert!(!m.entities.worst_first);

        let m = classify("show the worst 5 campaigns by ctr");
        assert_eq!(m.entities.ranking_metric, Some(Metric::Ctr));
        assert!(m.entities.worst_first);
        assert_eq!(m.entities.top_n, Some(5));
    }

    #[test]
    fn test_content_words() {
        let m = classify("Write ad copy for our instagram launch");
        assert!(m.entities.wants_content);
    }

    #[test]
    fn test_custom_triggers() {
        let table = TriggerTable::new().with_triggers(TriggerGroup::Ranking, ["podium"]);
        let m = table.classify("who is on the podium this month");
        assert_eq!(m.category, Some(IntentCategory::InformationalRanking));
    }
}
