//! Extraction orchestrator
//!
//! Resolves the organizations to extract for, picks the endpoint and record
//! processor for the configured target, drives time-window chunking and hands
//! every resulting table to a [`TableSink`].

use crate::client::{LinkedInClient, Paginated, Transport};
use crate::config::{ExtractionTarget, Parameters, StatisticsType};
use crate::error::{Error, Result};
use crate::melt::{
    build_table, into_row, standardized_data_table, StatisticsKind, Table, TableOptions,
    FOLLOWER_STATISTICS, PAGE_STATISTICS, SHARE_STATISTICS,
};
use crate::models::{StandardizedDataType, TimeIntervals, TimeRange, Urn};
use crate::state::compute_watermark;
use crate::writer::{PersistOutcome, TableSink};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Role queried on the ACL endpoint when no organization IDs are configured
pub const ACL_ROLE_ASSIGNEE: &str = "roleAssignee";

pub const POSTS_TABLE: &str = "posts";
pub const COMMENTS_TABLE: &str = "comments";
pub const LIKES_TABLE: &str = "likes";
pub const ORGANIZATIONS_TABLE: &str = "organizations";

/// A statistics endpoint of the client, callable per organization
pub type StatisticsEndpoint<T> =
    for<'c> fn(&'c LinkedInClient<T>, &Urn, Option<TimeIntervals>) -> Paginated<'c, T>;

/// Endpoint and processor selected for one statistics target
pub struct StatisticsSource<T: Transport> {
    pub endpoint: StatisticsEndpoint<T>,
    pub kind: StatisticsKind,
    pub statistics_type: StatisticsType,
}

/// Pair the configured target with its endpoint and processor
pub fn select_statistics_source<T: Transport>(
    target: ExtractionTarget,
    statistics_type: StatisticsType,
) -> Result<StatisticsSource<T>> {
    let (endpoint, kind) = match target {
        ExtractionTarget::PageStatistics => (
            LinkedInClient::<T>::page_statistics as StatisticsEndpoint<T>,
            PAGE_STATISTICS,
        ),
        ExtractionTarget::FollowerStatistics => (
            LinkedInClient::<T>::follower_statistics as StatisticsEndpoint<T>,
            FOLLOWER_STATISTICS,
        ),
        ExtractionTarget::ShareStatistics => (
            LinkedInClient::<T>::share_statistics as StatisticsEndpoint<T>,
            SHARE_STATISTICS,
        ),
        other => {
            return Err(Error::Validation(format!(
                "extraction target {other:?} has no statistics endpoint"
            )))
        }
    };
    Ok(StatisticsSource {
        endpoint,
        kind,
        statistics_type,
    })
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRun {
    /// Names of the tables the sink actually wrote
    pub tables_persisted: Vec<String>,
    /// Value to store as next run's "last run"
    pub watermark: DateTime<Utc>,
}

pub struct Extractor<'c, T: Transport> {
    client: &'c LinkedInClient<T>,
    parameters: &'c Parameters,
}

impl<'c, T: Transport> Extractor<'c, T> {
    pub fn new(client: &'c LinkedInClient<T>, parameters: &'c Parameters) -> Self {
        Extractor { client, parameters }
    }

    /// Configured IDs, or every organization the caller administers
    pub fn resolve_organizations(&self) -> Result<Vec<Urn>> {
        if !self.parameters.organization_ids.is_empty() {
            return Ok(self
                .parameters
                .organization_ids
                .iter()
                .map(|&id| Urn::organization(id))
                .collect());
        }

        info!("No organization IDs configured, using the organizations administered by the caller");
        let organizations = self
            .client
            .organization_acls(Some(ACL_ROLE_ASSIGNEE))
            .map(|acl| {
                let acl = acl?;
                acl.get("organization")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        Error::Format(format!("organization ACL lacks an organization URN: {acl}"))
                    })?
                    .parse::<Urn>()
            })
            .collect::<Result<Vec<_>>>()?;
        info!(count = organizations.len(), "resolved administered organizations");
        Ok(organizations)
    }

    pub fn resolve_time_range(
        &self,
        last_run: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Option<TimeRange>> {
        self.parameters
            .time_range
            .as_ref()
            .map(|config| TimeRange::from_config(config, last_run, now))
            .transpose()
    }

    /// Run the configured extraction, persisting every table into `sink`.
    ///
    /// Any error, including a client error for a single organization, aborts
    /// the whole run.
    pub fn run(
        &self,
        sink: &mut dyn TableSink,
        last_run: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<ExtractionRun> {
        let time_range = self.resolve_time_range(last_run, now)?;
        let mut run = ExtractionRun {
            tables_persisted: Vec::new(),
            watermark: compute_watermark(now, time_range.as_ref()),
        };

        let target = self.parameters.extraction_target;
        info!(?target, "starting extraction");
        match target {
            ExtractionTarget::PageStatistics
            | ExtractionTarget::FollowerStatistics
            | ExtractionTarget::ShareStatistics => {
                let source = select_statistics_source(target, self.parameters.statistics_type)?;
                self.extract_statistics(&source, time_range, sink, &mut run)?;
            }
            ExtractionTarget::Posts => self.extract_posts(sink, &mut run)?,
            ExtractionTarget::Enums => self.extract_enums(sink, &mut run)?,
            ExtractionTarget::Organizations => self.extract_organizations(sink, &mut run)?,
        }

        info!(tables = run.tables_persisted.len(), "extraction finished");
        Ok(run)
    }

    fn extract_statistics(
        &self,
        source: &StatisticsSource<T>,
        time_range: Option<TimeRange>,
        sink: &mut dyn TableSink,
        run: &mut ExtractionRun,
    ) -> Result<()> {
        let client = self.client;
        let endpoint = source.endpoint;

        match source.statistics_type {
            StatisticsType::TimeBound => {
                let Some(time_range) = time_range else {
                    return Err(Error::user(
                        "Time range must be specified for time-bound statistics.",
                        "Please fill in date_from and date_to in the time range configuration.",
                    ));
                };
                if time_range.is_empty() {
                    warn!(%time_range, "Time range is empty, no data will be extracted");
                    return Ok(());
                }

                let organizations = self.resolve_organizations()?;
                let intervals = TimeIntervals::new(self.parameters.time_granularity, time_range);
                let records = organizations.iter().flat_map(move |organization| {
                    intervals
                        .to_chunks()
                        .flat_map(move |chunk| endpoint(client, organization, Some(chunk)))
                });
                let table = source.kind.time_bound_table(records)?;
                self.persist(sink, table, run)
            }
            StatisticsType::Lifetime => {
                if time_range.is_some() {
                    debug!("time range is ignored for lifetime statistics");
                }
                let organizations = self.resolve_organizations()?;
                let records = organizations
                    .iter()
                    .flat_map(|organization| endpoint(client, organization, None));
                for table in source.kind.aggregate_total_statistics_tables(records)? {
                    self.persist(sink, table, run)?;
                }
                Ok(())
            }
        }
    }

    /// Posts are buffered so their URNs can drive the comment and like calls
    fn extract_posts(&self, sink: &mut dyn TableSink, run: &mut ExtractionRun) -> Result<()> {
        let organizations = self.resolve_organizations()?;

        let mut posts = Vec::new();
        for organization in &organizations {
            for is_dsc in [false, true] {
                for post in self.client.posts_by_author(organization, is_dsc) {
                    posts.push(post?);
                }
            }
        }
        let post_urns = posts
            .iter()
            .map(|post| {
                post.get("id")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .ok_or_else(|| Error::Format(format!("post lacks a string id: {post}")))
            })
            .collect::<Result<Vec<_>>>()?;
        info!(posts = posts.len(), "posts fetched");

        let table = build_table(
            posts.into_iter().map(into_row),
            POSTS_TABLE,
            &["id"],
            TableOptions::default(),
        )?;
        self.persist(sink, table, run)?;

        let mut comments = Vec::new();
        let mut likes = Vec::new();
        for post_urn in &post_urns {
            let summary = self.client.social_action_summary(post_urn)?;
            let total_comments = summary
                .pointer("/commentsSummary/aggregatedTotalComments")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let total_likes = summary
                .pointer("/likesSummary/totalLikes")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            debug!(post = %post_urn, total_comments, total_likes, "social action summary");

            if total_comments > 0 {
                for comment in self.client.comments_on_post(post_urn) {
                    comments.push(comment?);
                }
            }
            if total_likes > 0 {
                for like in self.client.likes_on_post(post_urn) {
                    likes.push(like?);
                }
            }
        }

        for (name, records) in [(COMMENTS_TABLE, comments), (LIKES_TABLE, likes)] {
            let table = build_table(
                records.into_iter().map(into_row),
                name,
                &["$URN"],
                TableOptions::default(),
            )?;
            self.persist(sink, table, run)?;
        }
        Ok(())
    }

    fn extract_enums(&self, sink: &mut dyn TableSink, run: &mut ExtractionRun) -> Result<()> {
        for data_type in StandardizedDataType::ALL {
            let table = standardized_data_table(data_type, self.client.standardized_data(data_type))?;
            self.persist(sink, table, run)?;
        }
        Ok(())
    }

    fn extract_organizations(&self, sink: &mut dyn TableSink, run: &mut ExtractionRun) -> Result<()> {
        let organizations = self.resolve_organizations()?;
        let client = self.client;
        let records = organizations
            .iter()
            .map(|organization| client.organization(organization.id).and_then(into_row));
        let table = build_table(records, ORGANIZATIONS_TABLE, &["id"], TableOptions::default())?;
        self.persist(sink, table, run)
    }

    fn persist(&self, sink: &mut dyn TableSink, table: Table<'_>, run: &mut ExtractionRun) -> Result<()> {
        let name = table.name.clone();
        let outcome = sink.persist(table, self.parameters.incremental, self.parameters.debug)?;
        if let PersistOutcome::Written { .. } = outcome {
            run.tables_persisted.push(name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiRequest, ApiResponse};
    use crate::models::TimeRangeConfig;
    use chrono::TimeZone;
    use std::cell::Cell;

    struct NoNetwork {
        calls: Cell<usize>,
    }

    impl Transport for NoNetwork {
        fn get(&self, _request: &ApiRequest) -> Result<ApiResponse> {
            self.calls.set(self.calls.get() + 1);
            Ok(ApiResponse {
                status: 500,
                body: String::new(),
            })
        }
    }

    struct Discard;

    impl TableSink for Discard {
        fn persist(&mut self, _table: Table<'_>, _incremental: bool, _include_header: bool) -> Result<PersistOutcome> {
            Ok(PersistOutcome::Empty)
        }
    }

    fn parameters(target: ExtractionTarget, statistics_type: StatisticsType) -> Parameters {
        Parameters {
            extraction_target: target,
            statistics_type,
            organization_ids: vec![1],
            time_range: None,
            time_granularity: Default::default(),
            incremental: false,
            debug: false,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_select_statistics_source() {
        let source =
            select_statistics_source::<NoNetwork>(ExtractionTarget::ShareStatistics, StatisticsType::Lifetime)
                .unwrap();
        assert_eq!(source.kind, SHARE_STATISTICS);

        assert!(matches!(
            select_statistics_source::<NoNetwork>(ExtractionTarget::Posts, StatisticsType::Lifetime),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_configured_ids_need_no_api_call() {
        let client = LinkedInClient::with_transport(NoNetwork { calls: Cell::new(0) }, "t");
        let mut params = parameters(ExtractionTarget::PageStatistics, StatisticsType::Lifetime);
        params.organization_ids = vec![5, 6];
        let organizations = Extractor::new(&client, &params).resolve_organizations().unwrap();
        assert_eq!(organizations, vec![Urn::organization(5), Urn::organization(6)]);
        assert_eq!(client.transport().calls.get(), 0);
    }

    #[test]
    fn test_time_bound_without_range_is_user_error() {
        let client = LinkedInClient::with_transport(NoNetwork { calls: Cell::new(0) }, "t");
        let params = parameters(ExtractionTarget::FollowerStatistics, StatisticsType::TimeBound);
        let err = Extractor::new(&client, &params).run(&mut Discard, None, now()).unwrap_err();
        assert!(matches!(err, Error::User { .. }));
        assert_eq!(client.transport().calls.get(), 0);
    }

    #[test]
    fn test_zero_length_range_skips_api() {
        let client = LinkedInClient::with_transport(NoNetwork { calls: Cell::new(0) }, "t");
        let mut params = parameters(ExtractionTarget::PageStatistics, StatisticsType::TimeBound);
        params.time_range = Some(TimeRangeConfig {
            date_from: "2024-01-01".to_string(),
            date_to: "2024-01-01".to_string(),
        });
        let run = Extractor::new(&client, &params).run(&mut Discard, None, now()).unwrap();
        assert!(run.tables_persisted.is_empty());
        assert_eq!(run.watermark, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(client.transport().calls.get(), 0);
    }

    #[test]
    fn test_transport_fault_aborts_run() {
        let client = LinkedInClient::with_transport(NoNetwork { calls: Cell::new(0) }, "t");
        let params = parameters(ExtractionTarget::ShareStatistics, StatisticsType::Lifetime);
        let err = Extractor::new(&client, &params).run(&mut Discard, None, now()).unwrap_err();
        assert!(matches!(err, Error::Transport { status: Some(500), .. }));
    }
}
