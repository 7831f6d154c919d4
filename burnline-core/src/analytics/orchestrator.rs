//! Analytics orchestration.
//!
//! [`AnalyticsService`] is the entry point a web layer calls. The single-chart
//! methods run synchronously on the caller's thread. [`AnalyticsService::compute_analytics`]
//! fans the independent sprint breakdowns out onto blocking worker threads
//! and joins them. Any branch failure fails the whole request, so a caller
//! never sees a partially populated result.

use crate::analytics::breakdown::{allocate_by_team, StoryBreakdown, TeamAllocation};
use crate::analytics::clock::{Clock, SystemClock};
use crate::analytics::delta::aggregate_daily_deltas;
use crate::analytics::overview::{compute_overview, Overview};
use crate::analytics::quality::DataQuality;
use crate::analytics::reader::{read_container_log, AnalysisWindow};
use crate::analytics::reconstruct::reconstruct_initial_state;
use crate::analytics::series::{build_burndown, build_progress, BurndownPoint, ProgressPoint};
use crate::analytics::status::StatusClassifier;
use crate::analytics::AnalyticsSource;
use crate::config::AnalyticsConfig;
use crate::error::{Error, Result};
use crate::types::{ContainerRef, Objective, Sprint};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Daily burndown of one sprint window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurndownReport {
    pub sprint_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Stories in the sprint at `start`
    pub initial_scope: i64,
    pub points: Vec<BurndownPoint>,
    pub data_quality: DataQuality,
}

/// Daily progress of one objective over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveProgress {
    pub objective: Objective,
    pub window_days: u32,
    pub points: Vec<ProgressPoint>,
    pub data_quality: DataQuality,
}

/// Everything a sprint dashboard shows, computed in one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintAnalytics {
    pub sprint: Sprint,
    pub overview: Overview,
    pub breakdown: StoryBreakdown,
    pub burndown: BurndownReport,
    pub team_allocation: Vec<TeamAllocation>,
    pub computed_at: DateTime<Utc>,
}

/// Computes sprint and objective analytics from an [`AnalyticsSource`].
pub struct AnalyticsService<S> {
    source: Arc<S>,
    clock: Arc<dyn Clock>,
    config: AnalyticsConfig,
}

impl<S: AnalyticsSource + 'static> AnalyticsService<S> {
    pub fn new(source: Arc<S>, config: AnalyticsConfig) -> Self {
        Self {
            source,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the wall clock, typically with a fixed one in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Burndown of sprint `sprint_id` between `start` and `end`.
    pub fn compute_burndown(
        &self,
        sprint_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BurndownReport> {
        let window = AnalysisWindow::new(start, end)?;
        let classifier = StatusClassifier::load(self.source.as_ref())?;
        burndown(
            self.source.as_ref(),
            &classifier,
            sprint_id,
            &window,
            self.clock.now(),
        )
    }

    /// Progress of objective `objective_id` over the last `window_days` days.
    pub fn compute_progress_chart(
        &self,
        objective_id: &str,
        window_days: u32,
    ) -> Result<ObjectiveProgress> {
        let now = self.clock.now();
        let objective = self
            .source
            .fetch_objective(objective_id)?
            .ok_or_else(|| Error::ObjectiveNotFound(objective_id.to_string()))?;
        let window = AnalysisWindow::trailing(now, window_days)?;
        let classifier = StatusClassifier::load(self.source.as_ref())?;

        let container = ContainerRef::Objective(objective.id.clone());
        let log = read_container_log(self.source.as_ref(), &container, &window, now)?;
        let initial = reconstruct_initial_state(&log, &classifier);

        let mut data_quality = DataQuality::default();
        let deltas = aggregate_daily_deltas(&log, &classifier, &mut data_quality);
        let points = build_progress(
            &initial,
            &deltas,
            &window,
            now.date_naive(),
            &mut data_quality,
        );

        tracing::info!(
            objective_id,
            window_days,
            points = points.len(),
            clean = data_quality.is_clean(),
            "Computed objective progress"
        );

        Ok(ObjectiveProgress {
            objective,
            window_days,
            points,
            data_quality,
        })
    }

    /// Objective progress over the configured default window.
    pub fn compute_default_progress_chart(&self, objective_id: &str) -> Result<ObjectiveProgress> {
        self.compute_progress_chart(objective_id, self.config.objective_window_days)
    }

    /// Summary metrics for `sprint` as of now.
    pub fn compute_overview(&self, sprint: &Sprint, breakdown: &StoryBreakdown) -> Overview {
        compute_overview(
            sprint.start_date,
            sprint.end_date,
            self.clock.now(),
            breakdown,
            &self.config.health,
        )
    }

    /// Category breakdown of the container's current stories.
    pub fn compute_story_breakdown(&self, container: &ContainerRef) -> Result<StoryBreakdown> {
        let classifier = StatusClassifier::load(self.source.as_ref())?;
        story_breakdown(self.source.as_ref(), &classifier, container)
    }

    /// Per-team breakdown of the container's current stories.
    pub fn compute_team_allocation(&self, container: &ContainerRef) -> Result<Vec<TeamAllocation>> {
        let classifier = StatusClassifier::load(self.source.as_ref())?;
        team_allocation(self.source.as_ref(), &classifier, container)
    }

    /// Compute every sprint dashboard breakdown concurrently.
    ///
    /// Runs under the configured time budget and stops early when `cancel`
    /// fires. Work already running on a blocking thread is abandoned rather
    /// than interrupted; its result is dropped.
    pub async fn compute_analytics(
        &self,
        sprint_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SprintAnalytics> {
        let budget = Duration::from_millis(self.config.timeout_ms);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(sprint_id, "Sprint analytics cancelled");
                Err(Error::Cancelled)
            }
            result = tokio::time::timeout(budget, self.fan_out(sprint_id)) => match result {
                Ok(analytics) => analytics,
                Err(_) => {
                    tracing::warn!(
                        sprint_id,
                        timeout_ms = self.config.timeout_ms,
                        "Sprint analytics timed out"
                    );
                    Err(Error::Timeout(self.config.timeout_ms))
                }
            },
        }
    }

    async fn fan_out(&self, sprint_id: &str) -> Result<SprintAnalytics> {
        let now = self.clock.now();

        let (sprint, classifier) = {
            let source = Arc::clone(&self.source);
            let sprint_id = sprint_id.to_string();
            blocking(move || {
                let sprint = source
                    .fetch_sprint(&sprint_id)?
                    .ok_or(Error::SprintNotFound(sprint_id))?;
                let classifier = StatusClassifier::load(source.as_ref())?;
                Ok((sprint, classifier))
            })
            .await?
        };
        let classifier = Arc::new(classifier);
        let container = ContainerRef::Sprint(sprint.id.clone());
        let window = AnalysisWindow::new(sprint.start_date, sprint.end_date)?;

        let breakdown_task = {
            let source = Arc::clone(&self.source);
            let classifier = Arc::clone(&classifier);
            let container = container.clone();
            blocking(move || story_breakdown(source.as_ref(), &classifier, &container))
        };
        let burndown_task = {
            let source = Arc::clone(&self.source);
            let classifier = Arc::clone(&classifier);
            let sprint_id = sprint.id.clone();
            blocking(move || burndown(source.as_ref(), &classifier, &sprint_id, &window, now))
        };
        let allocation_task = {
            let source = Arc::clone(&self.source);
            let classifier = Arc::clone(&classifier);
            let container = container.clone();
            blocking(move || team_allocation(source.as_ref(), &classifier, &container))
        };

        let (breakdown, burndown, team_allocation) =
            tokio::try_join!(breakdown_task, burndown_task, allocation_task)?;

        let overview = compute_overview(
            sprint.start_date,
            sprint.end_date,
            now,
            &breakdown,
            &self.config.health,
        );

        tracing::info!(
            sprint_id = %sprint.id,
            stories = breakdown.total,
            status = %overview.status,
            teams = team_allocation.len(),
            "Computed sprint analytics"
        );

        Ok(SprintAnalytics {
            sprint,
            overview,
            breakdown,
            burndown,
            team_allocation,
            computed_at: now,
        })
    }
}

/// Run synchronous source work on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Task(e.to_string()))?
}

fn burndown<S: AnalyticsSource + ?Sized>(
    source: &S,
    classifier: &StatusClassifier,
    sprint_id: &str,
    window: &AnalysisWindow,
    now: DateTime<Utc>,
) -> Result<BurndownReport> {
    let container = ContainerRef::Sprint(sprint_id.to_string());
    let log = read_container_log(source, &container, window, now)?;
    let initial = reconstruct_initial_state(&log, classifier);

    let mut data_quality = DataQuality::default();
    let deltas = aggregate_daily_deltas(&log, classifier, &mut data_quality);
    let points = build_burndown(
        &initial,
        &deltas,
        window,
        now.date_naive(),
        &mut data_quality,
    );

    tracing::debug!(
        sprint_id,
        initial_scope = initial.scope(),
        points = points.len(),
        clamps = data_quality.clamp_events,
        unresolved = data_quality.unresolved_count(),
        "Computed burndown"
    );

    Ok(BurndownReport {
        sprint_id: sprint_id.to_string(),
        start: window.start,
        end: window.end,
        initial_scope: initial.scope(),
        points,
        data_quality,
    })
}

fn story_breakdown<S: AnalyticsSource + ?Sized>(
    source: &S,
    classifier: &StatusClassifier,
    container: &ContainerRef,
) -> Result<StoryBreakdown> {
    let stories = source.fetch_current_members(container)?;
    Ok(StoryBreakdown::tally(&stories, classifier))
}

fn team_allocation<S: AnalyticsSource + ?Sized>(
    source: &S,
    classifier: &StatusClassifier,
    container: &ContainerRef,
) -> Result<Vec<TeamAllocation>> {
    let stories = source.fetch_current_members(container)?;
    let teams = source.fetch_teams()?;
    Ok(allocate_by_team(&stories, &teams, classifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::clock::FixedClock;
    use crate::analytics::testing::at;
    use crate::db::Database;
    use crate::types::{
        ActivityRecord, ActivityType, Status, StatusCategory, Story, Team, TrackedField,
    };

    /// Wraps a database, optionally failing or stalling the team lookup.
    struct StubSource {
        db: Database,
        fail_teams: bool,
        stall_teams: Option<Duration>,
    }

    impl AnalyticsSource for StubSource {
        fn fetch_sprint(&self, sprint_id: &str) -> Result<Option<Sprint>> {
            self.db.fetch_sprint(sprint_id)
        }

        fn fetch_objective(&self, objective_id: &str) -> Result<Option<Objective>> {
            self.db.fetch_objective(objective_id)
        }

        fn fetch_current_members(&self, container: &ContainerRef) -> Result<Vec<Story>> {
            self.db.fetch_current_members(container)
        }

        fn fetch_stories(&self, story_ids: &[String]) -> Result<Vec<Story>> {
            self.db.fetch_stories(story_ids)
        }

        fn fetch_membership_log(
            &self,
            container: &ContainerRef,
            since: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> Result<Vec<ActivityRecord>> {
            self.db.fetch_membership_log(container, since, until)
        }

        fn fetch_status_log(
            &self,
            story_ids: &[String],
            since: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> Result<Vec<ActivityRecord>> {
            self.db.fetch_status_log(story_ids, since, until)
        }

        fn fetch_statuses(&self) -> Result<Vec<Status>> {
            self.db.fetch_statuses()
        }

        fn fetch_teams(&self) -> Result<Vec<Team>> {
            if let Some(stall) = self.stall_teams {
                std::thread::sleep(stall);
            }
            if self.fail_teams {
                return Err(Error::DataSource("team service unavailable".to_string()));
            }
            self.db.fetch_teams()
        }
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.upsert_team(&Team {
            id: "team-1".into(),
            name: "Platform".into(),
        })
        .unwrap();
        for (id, category) in [
            ("todo", StatusCategory::Unstarted),
            ("doing", StatusCategory::Started),
            ("done", StatusCategory::Completed),
        ] {
            db.upsert_status(&Status {
                id: id.into(),
                name: id.into(),
                category,
            })
            .unwrap();
        }
        db.upsert_sprint(&Sprint {
            id: "sprint-1".into(),
            team_id: "team-1".into(),
            name: "Sprint 1".into(),
            start_date: at(1, 0),
            end_date: at(5, 0),
        })
        .unwrap();
        for n in 1..=4 {
            db.upsert_story(&Story {
                id: format!("s{}", n),
                team_id: "team-1".into(),
                sequence_id: n,
                title: format!("Story {}", n),
                status_id: if n == 1 { "done".into() } else { "todo".into() },
                sprint_id: Some("sprint-1".into()),
                objective_id: None,
                created_at: at(1, 0) - chrono::Duration::days(7),
                deleted_at: None,
                archived_at: None,
            })
            .unwrap();
        }
        db.insert_activity(
            "s1",
            TrackedField::Status,
            Some("doing"),
            Some("done"),
            ActivityType::Updated,
            at(3, 12),
        )
        .unwrap();
        db
    }

    fn service(source: StubSource, timeout_ms: u64) -> AnalyticsService<StubSource> {
        let config = AnalyticsConfig {
            timeout_ms,
            ..AnalyticsConfig::default()
        };
        AnalyticsService::new(Arc::new(source), config).with_clock(Arc::new(FixedClock(at(4, 12))))
    }

    fn healthy() -> StubSource {
        StubSource {
            db: seeded(),
            fail_teams: false,
            stall_teams: None,
        }
    }

    #[tokio::test]
    async fn test_compute_analytics_combines_all_branches() {
        let service = service(healthy(), 30_000);
        let analytics = service
            .compute_analytics("sprint-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(analytics.breakdown.total, 4);
        assert_eq!(analytics.breakdown.completed, 1);
        assert_eq!(analytics.overview.completion_pct, 25);
        assert_eq!(analytics.team_allocation.len(), 1);
        assert_eq!(analytics.team_allocation[0].team_name, "Platform");

        let remaining: Vec<_> = analytics.burndown.points.iter().map(|p| p.remaining).collect();
        assert_eq!(remaining, vec![4, 4, 3, 3, 3]);
        assert_eq!(analytics.computed_at, at(4, 12));
    }

    #[tokio::test]
    async fn test_failing_branch_fails_whole_request() {
        let source = StubSource {
            fail_teams: true,
            ..healthy()
        };
        let result = service(source, 30_000)
            .compute_analytics("sprint-1", &CancellationToken::new())
            .await;

        match result {
            Err(Error::DataSource(msg)) => assert!(msg.contains("team service")),
            other => panic!("expected data source error, got {:?}", other.map(|a| a.sprint.id)),
        }
    }

    #[tokio::test]
    async fn test_unknown_sprint() {
        let result = service(healthy(), 30_000)
            .compute_analytics("nope", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(Error::SprintNotFound(id)) if id == "nope"));
    }

    #[tokio::test]
    async fn test_cancelled_request_returns_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = service(healthy(), 30_000)
            .compute_analytics("sprint-1", &cancel)
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_slow_branch_times_out() {
        let source = StubSource {
            stall_teams: Some(Duration::from_millis(800)),
            ..healthy()
        };
        let result = service(source, 100)
            .compute_analytics("sprint-1", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(Error::Timeout(100))));
    }

    #[test]
    fn test_sync_entry_points() {
        let service = service(healthy(), 30_000);

        let report = service
            .compute_burndown("sprint-1", at(1, 0), at(5, 0))
            .unwrap();
        assert_eq!(report.initial_scope, 4);
        assert_eq!(report.points.len(), 5);

        let container = ContainerRef::Sprint("sprint-1".into());
        let breakdown = service.compute_story_breakdown(&container).unwrap();
        let sprint = service.source.fetch_sprint("sprint-1").unwrap().unwrap();
        let overview = service.compute_overview(&sprint, &breakdown);
        assert_eq!(overview.days_elapsed, 3);

        assert!(matches!(
            service.compute_progress_chart("missing", 30),
            Err(Error::ObjectiveNotFound(_))
        ));
    }
}
