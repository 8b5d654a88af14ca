/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulated job instances.

use crate::model::{Task, Time};

/// Remaining work below which a job counts as finished.
pub const COMPLETION_EPS: f64 = 1e-4;

/// Lifecycle of a job: `Released → Running → Completed | Missed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Released,
    Running,
    Completed,
    Missed,
}

impl JobState {
    pub fn is_pending(self) -> bool {
        matches!(self, JobState::Released | JobState::Running)
    }
}

/// One release of a periodic task.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Index of the task inside its component.
    pub task_index: usize,
    pub priority: u32,
    pub release: Time,
    /// Absolute deadline, `release + period`.
    pub deadline: Time,
    pub remaining: f64,
    pub state: JobState,
    pub completion: Option<Time>,
}

impl Job {
    pub fn release(task_index: usize, task: &Task, now: Time) -> Self {
        Self {
            task_index,
            priority: task.priority.unwrap_or(u32::MAX),
            release: now,
            deadline: now + task.period,
            remaining: task.wcet_effective,
            state: JobState::Released,
            completion: None,
        }
    }

    /// Run for at most `quantum` units of work during the slot `[now, now+1)`.
    ///
    /// Returns the work actually done.  A job that finishes is stamped with
    /// completion `now + 1` and classified against its deadline.
    pub fn execute(&mut self, quantum: f64, now: Time) -> f64 {
        let done = self.remaining.min(quantum).max(0.0);
        self.remaining -= done;
        self.state = JobState::Running;

        if self.remaining <= COMPLETION_EPS {
            let completion = now + 1;
            self.remaining = 0.0;
            self.completion = Some(completion);
            self.state = if completion <= self.deadline {
                JobState::Completed
            } else {
                JobState::Missed
            };
        }
        done
    }

    /// Force an unfinished job into `Missed` at the end of the run.
    pub fn expire(&mut self) {
        if self.state.is_pending() {
            self.state = JobState::Missed;
        }
    }

    /// `completion − release` for a job that ran to completion.
    pub fn response_time(&self) -> Option<Time> {
        self.completion.map(|c| c - self.release)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
