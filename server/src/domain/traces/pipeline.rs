//! Trace Processing Pipeline
//!
//! Fans a batch of decoded spans out over worker tasks:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                     TRACE PROCESSING PIPELINE                      │
//! ├────────────────────────────────────────────────────────────────────┤
//! │                                                                    │
//! │             ┌──▶ worker 1 ──┐                                      │
//! │  Vec<Span> ─┼──▶ worker 2 ──┼──▶ Vec<Span> (hosts + event records) │
//! │             └──▶ worker N ──┘                                      │
//! │                                                                    │
//! │  each worker: SpanProcessor (own digest) over a contiguous chunk   │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Processing is CPU-bound, so chunks run on the blocking thread pool. Output
//! keeps input order: each host span is followed by its event records. A worker
//! that panics loses its chunk; the loss is logged with the dropped span count.

use std::sync::Arc;

use futures::future::join_all;

use super::processor::SpanProcessor;
use super::project::ProjectResolver;
use super::span::Span;

/// Batch processor over a fixed number of workers.
pub struct TracePipeline {
    projects: Arc<dyn ProjectResolver>,
    workers: usize,
}

impl TracePipeline {
    pub fn new(projects: Arc<dyn ProjectResolver>, workers: usize) -> Self {
        Self {
            projects,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run the engine over a batch of spans.
    pub async fn run(&self, spans: Vec<Span>) -> Vec<Span> {
        if spans.is_empty() {
            return Vec::new();
        }

        let total = spans.len();
        let chunk_size = total.div_ceil(self.workers);
        tracing::debug!(spans = total, workers = self.workers, chunk_size, "Processing batch");

        let mut chunks = Vec::with_capacity(self.workers);
        let mut iter = spans.into_iter().peekable();
        while iter.peek().is_some() {
            chunks.push(iter.by_ref().take(chunk_size).collect::<Vec<_>>());
        }

        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        let handles = chunks.into_iter().map(|chunk| {
            let projects = Arc::clone(&self.projects);
            tokio::task::spawn_blocking(move || {
                let mut processor = SpanProcessor::new(projects);
                chunk
                    .into_iter()
                    .flat_map(|span| processor.process(span))
                    .collect::<Vec<_>>()
            })
        });

        let mut records = Vec::with_capacity(total);
        let mut lost = 0;
        for (result, size) in join_all(handles).await.into_iter().zip(sizes) {
            match result {
                Ok(chunk) => records.extend(chunk),
                Err(e) => {
                    lost += size;
                    tracing::error!(
                        error = %e,
                        lost_spans = size,
                        "Trace worker failed, chunk dropped"
                    );
                }
            }
        }

        tracing::debug!(records = records.len(), lost_spans = lost, "Batch processed");
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traces::keys;
    use crate::domain::traces::project::{Project, ProjectError, StaticProjects};
    use crate::domain::traces::span::{SpanEvent, TraceId};

    fn pipeline(workers: usize) -> TracePipeline {
        let projects = StaticProjects::new([Project {
            id: 1,
            ..Default::default()
        }]);
        TracePipeline::new(Arc::new(projects), workers)
    }

    fn make_span(i: usize) -> Span {
        let mut span = Span {
            project_id: 1,
            trace_id: TraceId::new(i as u128 + 1),
            id: i as u64 + 1,
            name: format!("span-{i}"),
            ..Default::default()
        };
        span.attrs.insert(keys::DB_STATEMENT, format!("SELECT * FROM t WHERE id = {i}"));
        span
    }

    #[tokio::test]
    async fn test_empty_batch() {
        assert!(pipeline(4).run(Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_order_preserved_across_workers() {
        let spans: Vec<Span> = (0..10).map(make_span).collect();
        let records = pipeline(3).run(spans).await;

        assert_eq!(records.len(), 10);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.name, format!("span-{i}"));
            assert_eq!(record.system, "db:unknown_db");
        }
    }

    #[tokio::test]
    async fn test_same_shape_same_group_on_any_worker() {
        let spans: Vec<Span> = (0..8)
            .map(|i| {
                let mut span = make_span(i);
                span.name = "query".to_string();
                span
            })
            .collect();
        let records = pipeline(4).run(spans).await;

        let first = records[0].group_id;
        assert!(records.iter().all(|r| r.group_id == first));
    }

    #[tokio::test]
    async fn test_events_follow_their_host() {
        let mut host = make_span(0);
        host.events.push(SpanEvent {
            name: keys::EVENT_LOG.to_string(),
            ..Default::default()
        });
        let records = pipeline(2).run(vec![host, make_span(1)]).await;

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "span-0");
        assert_eq!(records[1].event_name, keys::EVENT_LOG);
        assert_eq!(records[1].parent_id, records[0].id);
        assert_eq!(records[2].name, "span-1");
    }

    /// Resolver that panics for one project id
    struct PanickingResolver(u32);

    impl ProjectResolver for PanickingResolver {
        fn resolve(&self, project_id: u32) -> Result<Arc<Project>, ProjectError> {
            if project_id == self.0 {
                panic!("resolver failure for project {project_id}");
            }
            Ok(Arc::new(Project {
                id: project_id,
                ..Default::default()
            }))
        }
    }

    #[tokio::test]
    async fn test_failed_worker_drops_only_its_chunk() {
        let spans: Vec<Span> = (0..4)
            .map(|i| {
                let mut span = make_span(i);
                if i >= 2 {
                    span.project_id = 13;
                }
                span
            })
            .collect();
        let pipeline = TracePipeline::new(Arc::new(PanickingResolver(13)), 2);
        let records = pipeline.run(spans).await;

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["span-0", "span-1"]);
    }

    #[test]
    fn test_workers_at_least_one() {
        assert_eq!(pipeline(0).workers(), 1);
    }
}
