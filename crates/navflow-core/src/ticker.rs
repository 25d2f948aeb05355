use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use navflow_shared::TaskDto;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Live reading of one running timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elapsed {
    pub task_id: u64,
    pub title: String,
    pub seconds: u64,
}

impl Elapsed {
    pub fn clock(&self) -> String {
        format_clock(self.seconds)
    }
}

/// Tracked time plus the running segment. Never mutates the task.
pub fn elapsed_seconds(task: &TaskDto, now: DateTime<Utc>) -> u64 {
    let tracked = task.time_spent() * 60;
    match (task.is_timer_running, task.timer_started_at) {
        (true, Some(started)) => {
            let running = (now - started).num_seconds().max(0) as u64;
            tracked + running
        }
        _ => tracked,
    }
}

pub fn running(tasks: &[TaskDto], now: DateTime<Utc>) -> Vec<Elapsed> {
    tasks
        .iter()
        .filter(|t| t.is_timer_running)
        .map(|t| Elapsed {
            task_id: t.id,
            title: t.title.clone(),
            seconds: elapsed_seconds(t, now),
        })
        .collect()
}

pub fn format_clock(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

#[derive(Debug, Clone, Copy)]
pub struct ElapsedTicker {
    period: Duration,
    max_ticks: Option<u64>,
}

impl ElapsedTicker {
    pub fn new(period: Duration, max_ticks: Option<u64>) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            max_ticks,
        }
    }

    /// Calls `render` once per tick until `max_ticks` is reached or Ctrl-C.
    /// Returns the number of ticks rendered.
    #[tracing::instrument(skip(self, tasks, render), fields(period_ms = self.period.as_millis() as u64, running = tasks.iter().filter(|t| t.is_timer_running).count()))]
    pub async fn run<F>(&self, tasks: &[TaskDto], mut render: F) -> anyhow::Result<u64>
    where
        F: FnMut(u64, &[Elapsed]),
    {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    ticks += 1;
                    let readings = running(tasks, Utc::now());
                    render(ticks, &readings);
                    if self.max_ticks.is_some_and(|max| ticks >= max) {
                        debug!(ticks, "tick limit reached");
                        break;
                    }
                }
                signal = &mut ctrl_c => {
                    signal.context("failed to listen for Ctrl-C")?;
                    info!(ticks, "ticker interrupted");
                    break;
                }
            }
        }
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, TimeZone};
    use navflow_shared::{Priority, TaskStatus};

    use super::*;

    fn task(running: bool, minutes: Option<u64>, started: Option<DateTime<Utc>>) -> TaskDto {
        TaskDto {
            id: 7,
            title: "write report".to_string(),
            description: None,
            project: Some(1),
            project_name: String::new(),
            section: None,
            section_name: None,
            section_color: None,
            priority: Priority::High,
            status: TaskStatus::InProgress,
            assigned_to_email: None,
            due_date: None,
            created_at: Utc::now(),
            updated_at: None,
            time_spent_minutes: minutes,
            time_spent_display: None,
            is_timer_running: running,
            timer_started_at: started,
            position: 0,
        }
    }

    #[test]
    fn adds_running_segment_to_tracked_time() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();
        let started = now - ChronoDuration::seconds(95);

        assert_eq!(elapsed_seconds(&task(true, Some(2), Some(started)), now), 215);
        assert_eq!(elapsed_seconds(&task(false, Some(2), Some(started)), now), 120);
        assert_eq!(elapsed_seconds(&task(true, None, None), now), 0);
        assert_eq!(format_clock(3723), "01:02:03");
    }

    #[tokio::test]
    async fn stops_after_max_ticks() {
        let tasks = vec![task(true, Some(1), Some(Utc::now()))];
        let ticker = ElapsedTicker::new(Duration::from_millis(5), Some(3));

        let mut seen = Vec::new();
        let ticks = ticker
            .run(&tasks, |tick, readings| seen.push((tick, readings.len())))
            .await
            .unwrap();

        assert_eq!(ticks, 3);
        assert_eq!(seen, vec![(1, 1), (2, 1), (3, 1)]);
        assert_eq!(tasks[0].time_spent_minutes, Some(1));
    }
}
