// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memory service: fact updates, solution capture, and relevance queries.
//!
//! Persistence lives in the storage stores; this layer adds the events and
//! the token-overlap scoring used at retrieval time.

use crate::error::EngineError;
use crate::publish::EventPublisher;
use chrono::{DateTime, Utc};
use pilot_core::{Clock, Event, EventKind, Mode, Stage, TaskId};
use pilot_storage::{MemoryStore, SolutionRecord, SolutionStore};
use std::collections::HashSet;
use std::sync::Arc;

/// Maximum recency bonus for a just-captured solution; decays linearly to
/// zero over thirty days.
const RECENCY_BONUS_MAX: f64 = 3.0;
const RECENCY_WINDOW_DAYS: f64 = 30.0;

/// A solution with its computed relevance.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSolution {
    pub record: SolutionRecord,
    pub score: f64,
}

/// Facts + solutions over their stores, publishing memory events.
pub struct MemoryService<C: Clock> {
    facts: MemoryStore,
    solutions: SolutionStore,
    publisher: Arc<dyn EventPublisher>,
    clock: C,
}

impl<C: Clock> MemoryService<C> {
    pub fn new(
        facts: MemoryStore,
        solutions: SolutionStore,
        publisher: Arc<dyn EventPublisher>,
        clock: C,
    ) -> Self {
        Self {
            facts,
            solutions,
            publisher,
            clock,
        }
    }

    /// Append facts and publish `memory_facts_updated` with the 80-char
    /// first-line summary.
    pub fn update_facts(&self, task_id: &TaskId, lines: &[String]) -> Result<(), EngineError> {
        let update = self.facts.append_facts(lines)?;
        self.publisher.publish(Event::new(
            task_id.clone(),
            Mode::Answer,
            Stage::None,
            EventKind::MemoryFactsUpdated {
                summary: update.summary,
            },
        ))?;
        Ok(())
    }

    /// Persist a solution and publish `solution_captured`.
    pub fn capture_solution(
        &self,
        task_id: &TaskId,
        record: &SolutionRecord,
    ) -> Result<(), EngineError> {
        self.solutions.save(record)?;
        self.publisher.publish(Event::new(
            task_id.clone(),
            Mode::Answer,
            Stage::None,
            EventKind::SolutionCaptured {
                solution_id: record.solution_id.clone(),
                problem: record.problem.clone(),
            },
        ))?;
        Ok(())
    }

    /// Top-k solutions by shared-token + recency score, best first.
    /// Zero-overlap solutions never match, however fresh.
    pub fn query_relevant_solutions(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredSolution>, EngineError> {
        let query_tokens = tokenize(query);
        let now = self.clock.utc_now();

        let mut scored: Vec<ScoredSolution> = self
            .solutions
            .load_all()?
            .into_iter()
            .filter_map(|record| {
                let score = score_solution(&query_tokens, &record, now);
                (score > 0.0).then_some(ScoredSolution { record, score })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Lowercase, strip punctuation, keep tokens of two or more characters.
fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(ToString::to_string)
        .collect()
}

fn score_solution(
    query_tokens: &HashSet<String>,
    record: &SolutionRecord,
    now: DateTime<Utc>,
) -> f64 {
    let mut text = record.problem.clone();
    text.push(' ');
    text.push_str(&record.fix);
    for tag in &record.tags {
        text.push(' ');
        text.push_str(tag);
    }

    let shared = tokenize(&text)
        .intersection(query_tokens)
        .count() as f64;
    if shared == 0.0 {
        return 0.0;
    }

    let age_days = (now - record.captured_at).num_seconds().max(0) as f64 / 86_400.0;
    let recency = RECENCY_BONUS_MAX * (1.0 - age_days / RECENCY_WINDOW_DAYS).clamp(0.0, 1.0);

    2.0 * shared + recency
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
