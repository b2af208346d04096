//! The orchestrator: composes a roster of agents under five coordination
//! modes, using a `ReActJudge` to arbitrate debate and consensus rounds.

use std::collections::HashMap;
use std::sync::Arc;

use agent_core::{BaseAgent, DebateTurn, Decision, ReActJudge};

/// One agent entry on the orchestrator's roster.
#[derive(Clone)]
pub struct RosterAgent {
    pub id: String,
    pub base: BaseAgent,
}

impl RosterAgent {
    pub fn new(id: impl Into<String>, base: BaseAgent) -> Self {
        Self { id: id.into(), base }
    }
}

/// Output of a `Sequential` run: each agent's reply, in order.
#[derive(Debug, Clone)]
pub struct SequentialResult {
    pub replies: Vec<(String, String)>,
    pub final_output: String,
}

/// Output of a `Parallel` run: every agent's independent reply.
#[derive(Debug, Clone)]
pub struct ParallelResult {
    pub replies: Vec<(String, String)>,
}

/// One round of a debate, with the judge's verdict if one was consulted.
#[derive(Debug, Clone)]
pub struct DebateRound {
    pub turns: Vec<DebateTurn>,
    pub decision: Option<Decision>,
}

#[derive(Debug, Clone)]
pub struct DebateResult {
    pub rounds: Vec<DebateRound>,
    pub decision: Decision,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct VoteResult {
    pub ballots: Vec<(String, String, String)>, // (agent_id, option, rationale)
    pub winner: String,
}

#[derive(Debug, Clone)]
pub struct ConsensusResult {
    pub rounds_run: usize,
    pub positions: Vec<(String, String)>,
    pub reached: bool,
}

/// Owns the roster and the judge used to arbitrate debate/consensus.
pub struct Orchestrator {
    roster: Vec<RosterAgent>,
    judge: ReActJudge,
}

impl Orchestrator {
    pub fn new(roster: Vec<RosterAgent>, judge: ReActJudge) -> Self {
        Self { roster, judge }
    }

    /// Runs agents in roster order, feeding each the previous agent's
    /// output appended to the original task.
    pub async fn sequential(&self, task: &str) -> agent_core::Result<SequentialResult> {
        let mut replies = Vec::with_capacity(self.roster.len());
        let mut running = task.to_string();

        for agent in &self.roster {
            let reply = agent.base.chat(running.clone(), true).await;
            running = format!("{task}\n\nPrevious output from {}:\n{reply}", agent.id);
            replies.push((agent.id.clone(), reply));
        }

        let final_output = replies.last().map(|(_, r)| r.clone()).unwrap_or_default();
        Ok(SequentialResult { replies, final_output })
    }

    /// Dispatches the same task to every roster agent concurrently. A
    /// failing agent's reply is its error text, not a run-aborting error.
    pub async fn parallel(&self, task: &str) -> agent_core::Result<ParallelResult> {
        let futures = self.roster.iter().map(|agent| {
            let task = task.to_string();
            let agent = agent.clone();
            async move {
                let reply = agent.base.chat(task, true).await;
                (agent.id, reply)
            }
        });
        let replies = futures::future::join_all(futures).await;
        Ok(ParallelResult { replies })
    }

    /// Runs up to `max_rounds` debate rounds, consulting the judge after
    /// each. Terminates early on CONSENSUS or DIVERGENCE at or above
    /// `confidence_threshold`, or once `max_rounds` is exhausted.
    pub async fn debate(
        &self,
        task: &str,
        max_rounds: usize,
        confidence_threshold: f32,
    ) -> agent_core::Result<DebateResult> {
        let mut transcript = Vec::new();
        let mut rounds = Vec::new();
        let mut final_decision = Decision::Continue;

        for round in 1..=max_rounds {
            let mut round_turns = Vec::with_capacity(self.roster.len());
            for agent in &self.roster {
                let prompt = if transcript.is_empty() {
                    task.to_string()
                } else {
                    format!("{task}\n\nDebate so far:\n{}", render_transcript(&transcript))
                };
                let reply = agent.base.chat(prompt, true).await;
                let turn = DebateTurn {
                    agent: agent.id.clone(),
                    content: reply,
                };
                round_turns.push(turn.clone());
                transcript.push(turn);
            }

            let judgment = self.judge.judge(&transcript, round, max_rounds).await?;
            let terminate_early = matches!(judgment.decision, Decision::Consensus | Decision::Divergence)
                && judgment.confidence >= confidence_threshold;

            let decision = judgment.decision;
            rounds.push(DebateRound {
                turns: round_turns,
                decision: Some(decision),
            });

            if terminate_early || round == max_rounds {
                final_decision = if round == max_rounds && !terminate_early {
                    Decision::Timeout
                } else {
                    decision
                };
                break;
            }
        }

        let summary_prompt = format!(
            "Summarize the following multi-agent debate transcript in a few sentences:\n{}",
            render_transcript(&transcript)
        );
        let summary = self.judge.base.chat(summary_prompt, false).await;

        Ok(DebateResult {
            rounds,
            decision: final_decision,
            summary,
        })
    }

    /// Asks each agent to cast a single ballot of the form
    /// `Vote: <option> Reason: <rationale>`, falling back to treating the
    /// whole reply as the option with an empty rationale if unparseable.
    /// Majority wins; ties go to the option whose first ballot came first.
    pub async fn vote(&self, task: &str, options: &[String]) -> agent_core::Result<VoteResult> {
        let prompt = format!(
            "{task}\n\nChoose exactly one of: {}.\nRespond as: Vote: <option>\nReason: <rationale>",
            options.join(", ")
        );

        let mut ballots = Vec::with_capacity(self.roster.len());
        for agent in &self.roster {
            let reply = agent.base.chat(prompt.clone(), true).await;
            let (option, rationale) = parse_ballot(&reply, options);
            ballots.push((agent.id.clone(), option, rationale));
        }

        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for (_, option, _) in &ballots {
            if !counts.contains_key(option.as_str()) {
                order.push(option.as_str());
            }
            *counts.entry(option.as_str()).or_insert(0) += 1;
        }

        // `max_by_key` would return the *last* maximal element on a tie;
        // scan manually so the first option cast keeps the tie.
        let mut winner = "";
        let mut winner_count = 0;
        for option in order {
            let count = counts[option];
            if count > winner_count {
                winner = option;
                winner_count = count;
            }
        }
        let winner = winner.to_string();

        Ok(VoteResult { ballots, winner })
    }

    /// Polls each agent for its position every round, asking the judge
    /// whether at least `threshold` fraction hold semantically
    /// equivalent positions. Runs at most `max_rounds` rounds.
    pub async fn consensus(
        &self,
        task: &str,
        max_rounds: usize,
        threshold: f32,
    ) -> agent_core::Result<ConsensusResult> {
        let mut positions = Vec::new();

        for round in 1..=max_rounds {
            positions.clear();
            for agent in &self.roster {
                let reply = agent.base.chat(task.to_string(), true).await;
                positions.push((agent.id.clone(), reply));
            }

            let turns: Vec<DebateTurn> = positions
                .iter()
                .map(|(id, content)| DebateTurn {
                    agent: id.clone(),
                    content: content.clone(),
                })
                .collect();
            let judgment = self.judge.judge(&turns, round, max_rounds).await?;

            let agreeing = estimate_agreement_fraction(&judgment, positions.len());
            if agreeing >= threshold || round == max_rounds {
                return Ok(ConsensusResult {
                    rounds_run: round,
                    positions,
                    reached: agreeing >= threshold,
                });
            }
        }

        Ok(ConsensusResult {
            rounds_run: max_rounds,
            positions,
            reached: false,
        })
    }

    pub fn roster_ids(&self) -> Vec<String> {
        self.roster.iter().map(|a| a.id.clone()).collect()
    }
}

fn render_transcript(transcript: &[DebateTurn]) -> String {
    transcript
        .iter()
        .map(|t| format!("{}: {}", t.agent, t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The judge's `confidence` doubles as the agreement fraction: a
/// CONSENSUS or SUFFICIENT verdict at confidence `c` is read as `c`
/// fraction of the roster agreeing; anything else counts as no
/// agreement this round.
fn estimate_agreement_fraction(judgment: &agent_core::Judgment, roster_size: usize) -> f32 {
    if roster_size == 0 {
        return 0.0;
    }
    match judgment.decision {
        Decision::Consensus | Decision::Sufficient => judgment.confidence,
        _ => 0.0,
    }
}

fn parse_ballot(reply: &str, options: &[String]) -> (String, String) {
    let mut option = None;
    let mut rationale = String::new();

    for line in reply.lines() {
        let trimmed = line.trim();
        if let Some(rest) = strip_prefix_ci(trimmed, "Vote:") {
            option = options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(rest.trim()))
                .cloned()
                .or_else(|| Some(rest.trim().to_string()));
        } else if let Some(rest) = strip_prefix_ci(trimmed, "Reason:") {
            rationale = rest.trim().to_string();
        }
    }

    let option = option.unwrap_or_else(|| {
        options
            .iter()
            .find(|o| reply.to_ascii_lowercase().contains(&o.to_ascii_lowercase()))
            .cloned()
            .unwrap_or_else(|| reply.trim().to_string())
    });

    (option, rationale)
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use llm::{ChatModel, ChatRequest, ChatResponse, Message, MessageChunk, MessageChunkStream, UsageMetadata};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Replays scripted text in call order, cycling the last entry once exhausted.
    #[derive(Clone)]
    struct ScriptedModel {
        replies: Vec<String>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: replies.into_iter().map(|s| s.to_string()).collect(),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn chat(&self, _request: ChatRequest) -> llm::Result<ChatResponse> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .replies
                .get(index)
                .or_else(|| self.replies.last())
                .cloned()
                .unwrap_or_default();
            Ok(ChatResponse {
                message: Message::assistant(reply),
                finish_reason: Some("stop".to_string()),
                usage: Some(UsageMetadata::new(1, 1)),
                metadata: Default::default(),
            })
        }

        async fn stream(&self, request: ChatRequest) -> llm::Result<MessageChunkStream> {
            let response = self.chat(request).await?;
            let text = response.message.text().unwrap_or_default().to_string();
            Ok(Box::pin(stream::iter(vec![Ok(MessageChunk::delta(text))])))
        }

        fn clone_box(&self) -> Box<dyn ChatModel> {
            Box::new(self.clone())
        }
    }

    /// Always fails, for exercising a roster agent that can't reach its LLM.
    #[derive(Clone)]
    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn chat(&self, _request: ChatRequest) -> llm::Result<ChatResponse> {
            Err(llm::LlmError::Upstream {
                status: 500,
                message: "simulated upstream failure".to_string(),
            })
        }

        async fn stream(&self, _request: ChatRequest) -> llm::Result<MessageChunkStream> {
            Err(llm::LlmError::Upstream {
                status: 500,
                message: "simulated upstream failure".to_string(),
            })
        }

        fn clone_box(&self) -> Box<dyn ChatModel> {
            Box::new(self.clone())
        }
    }

    fn roster_agent(id: &str, replies: Vec<&str>) -> RosterAgent {
        let model = Arc::new(ScriptedModel::new(replies));
        RosterAgent::new(id, BaseAgent::new(id, "worker", model))
    }

    fn judge(replies: Vec<&str>) -> ReActJudge {
        let model = Arc::new(ScriptedModel::new(replies));
        ReActJudge::new(BaseAgent::new("judge", "arbiter", model))
    }

    #[tokio::test]
    async fn sequential_feeds_prior_output_forward() {
        let roster = vec![roster_agent("a", vec!["first"]), roster_agent("b", vec!["second"])];
        let orchestrator = Orchestrator::new(roster, judge(vec!["{}"]));

        let result = orchestrator.sequential("start").await.unwrap();
        assert_eq!(result.replies.len(), 2);
        assert_eq!(result.final_output, "second");
    }

    #[tokio::test]
    async fn parallel_collects_every_reply() {
        let roster = vec![roster_agent("a", vec!["reply a"]), roster_agent("b", vec!["reply b"])];
        let orchestrator = Orchestrator::new(roster, judge(vec!["{}"]));

        let result = orchestrator.parallel("task").await.unwrap();
        assert_eq!(result.replies.len(), 2);
        assert!(result.replies.iter().any(|(id, r)| id == "a" && r == "reply a"));
        assert!(result.replies.iter().any(|(id, r)| id == "b" && r == "reply b"));
    }

    #[tokio::test]
    async fn debate_terminates_early_on_high_confidence_consensus() {
        let roster = vec![roster_agent("a", vec!["yes"]), roster_agent("b", vec!["yes"])];
        let consensus_json = serde_json::json!({
            "decision": "CONSENSUS",
            "confidence": 0.95,
            "reason": "agents agree",
            "suggestions": [],
        })
        .to_string();
        let orchestrator = Orchestrator::new(roster, judge(vec![&consensus_json, "final summary"]));

        let result = orchestrator.debate("should we proceed?", 5, 0.8).await.unwrap();
        assert_eq!(result.rounds.len(), 1);
        assert_eq!(result.decision, Decision::Consensus);
    }

    #[tokio::test]
    async fn debate_times_out_after_max_rounds_without_consensus() {
        let roster = vec![roster_agent("a", vec!["no", "still no"])];
        let continue_json = serde_json::json!({
            "decision": "CONTINUE",
            "confidence": 0.1,
            "reason": "undecided",
            "suggestions": [],
        })
        .to_string();
        let orchestrator = Orchestrator::new(
            roster,
            judge(vec![&continue_json, &continue_json, "final summary"]),
        );

        let result = orchestrator.debate("topic", 2, 0.8).await.unwrap();
        assert_eq!(result.rounds.len(), 2);
        assert_eq!(result.decision, Decision::Timeout);
    }

    #[tokio::test]
    async fn vote_majority_wins_with_first_vote_tiebreak() {
        let roster = vec![
            roster_agent("a", vec!["Vote: red\nReason: warmer"]),
            roster_agent("b", vec!["Vote: blue\nReason: calmer"]),
            roster_agent("c", vec!["Vote: red\nReason: agree with a"]),
        ];
        let orchestrator = Orchestrator::new(roster, judge(vec!["{}"]));

        let options = vec!["red".to_string(), "blue".to_string()];
        let result = orchestrator.vote("pick a color", &options).await.unwrap();
        assert_eq!(result.winner, "red");
        assert_eq!(result.ballots.len(), 3);
    }

    #[tokio::test]
    async fn vote_tie_goes_to_the_option_whose_first_ballot_came_first() {
        let roster = vec![
            roster_agent("a", vec!["Vote: blue\nReason: first"]),
            roster_agent("b", vec!["Vote: red\nReason: second"]),
        ];
        let orchestrator = Orchestrator::new(roster, judge(vec!["{}"]));

        let options = vec!["red".to_string(), "blue".to_string()];
        let result = orchestrator.vote("pick a color", &options).await.unwrap();
        assert_eq!(result.winner, "blue");
        assert_eq!(result.ballots.len(), 2);
    }

    #[tokio::test]
    async fn sequential_records_a_failing_participant_as_a_value_and_continues() {
        let roster = vec![
            RosterAgent::new("a", BaseAgent::new("a", "worker", Arc::new(FailingModel))),
            roster_agent("b", vec!["picked up after a"]),
        ];
        let orchestrator = Orchestrator::new(roster, judge(vec!["{}"]));

        let result = orchestrator.sequential("start").await.unwrap();
        assert_eq!(result.replies.len(), 2);
        assert!(result.replies[0].1.starts_with("error:"));
        assert_eq!(result.final_output, "picked up after a");
    }

    #[tokio::test]
    async fn consensus_reaches_agreement_before_max_rounds() {
        let roster = vec![roster_agent("a", vec!["position x"]), roster_agent("b", vec!["position x"])];
        let sufficient_json = serde_json::json!({
            "decision": "SUFFICIENT",
            "confidence": 1.0,
            "reason": "both equivalent",
            "suggestions": [],
        })
        .to_string();
        let orchestrator = Orchestrator::new(roster, judge(vec![&sufficient_json]));

        let result = orchestrator.consensus("agree on x", 3, 0.5).await.unwrap();
        assert!(result.reached);
        assert_eq!(result.rounds_run, 1);
    }
}
