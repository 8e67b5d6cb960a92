//! Integration tests for pipeline execution.

#[cfg(test)]
mod tests {
    use crate::baggage::{keys, Baggage};
    use crate::cancellation::CancellationToken;
    use crate::context::RunContext;
    use crate::core::StageStatus;
    use crate::errors::ExplainerError;
    use crate::events::CollectingProgressSink;
    use crate::pipeline::{Pipeline, PipelineConfig};
    use crate::stages::{FnStage, RegisteredStage, Stage};
    use crate::testing::{ExecutionLog, FailingStage, RecordingStage, WritingStage, TRACE};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn log() -> ExecutionLog {
        ExecutionLog::default()
    }

    fn recording(name: &str, deps: &[&str], log: &ExecutionLog) -> RegisteredStage {
        RegisteredStage::enrichment(RecordingStage::new(name, deps, log))
    }

    #[derive(Debug)]
    struct CancellingStage {
        token: Arc<CancellationToken>,
    }

    #[async_trait]
    impl Stage for CancellingStage {
        fn name(&self) -> &str {
            "cancel"
        }

        async fn process(&self, _ctx: &RunContext, _baggage: &mut Baggage) -> anyhow::Result<()> {
            self.token.cancel("caller hung up");
            Ok(())
        }
    }

    #[derive(Debug)]
    struct CancelledStage;

    #[async_trait]
    impl Stage for CancelledStage {
        fn name(&self) -> &str {
            "llm_call"
        }

        async fn process(&self, _ctx: &RunContext, _baggage: &mut Baggage) -> anyhow::Result<()> {
            Err(ExplainerError::Cancelled("deadline".to_string()).into())
        }
    }

    #[tokio::test]
    async fn test_runs_in_dependency_order() {
        let log = log();
        let pipeline = Pipeline::new("explain")
            .with_stage(recording("explain", &["tags", "prices"], &log))
            .unwrap()
            .with_stage(recording("tags", &["fetch"], &log))
            .unwrap()
            .with_stage(recording("prices", &["fetch"], &log))
            .unwrap()
            .with_stage(recording("fetch", &[], &log))
            .unwrap();

        pipeline.run(&RunContext::new(1), Baggage::new()).await.unwrap();

        assert_eq!(*log.lock(), vec!["fetch", "tags", "prices", "explain"]);
        assert_eq!(
            pipeline.execution_order().unwrap(),
            vec!["fetch", "tags", "prices", "explain"]
        );
    }

    #[tokio::test]
    async fn test_every_stage_runs_exactly_once() {
        let log = log();
        let mut pipeline = Pipeline::new("diamond");
        pipeline.register(recording("d", &["b", "c"], &log)).unwrap();
        pipeline.register(recording("b", &["a"], &log)).unwrap();
        pipeline.register(recording("c", &["a"], &log)).unwrap();
        pipeline.register(recording("a", &[], &log)).unwrap();

        pipeline.run(&RunContext::new(1), Baggage::new()).await.unwrap();

        let ran = log.lock().clone();
        assert_eq!(ran.len(), 4);
        assert_eq!(ran, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_generated_graphs_respect_registered_dependencies() {
        // Deterministic linear congruential generator keeps the case list stable.
        let mut seed: u64 = 0x5eed;
        let mut next = move |bound: usize| {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            usize::try_from(seed >> 33).unwrap() % bound
        };

        for case in 0..25 {
            let size = 2 + next(7);
            let names: Vec<String> = (0..size).map(|i| format!("s{i}")).collect();
            let mut declared: Vec<(String, Vec<String>)> = Vec::new();
            for i in 0..size {
                let mut deps = Vec::new();
                for j in 0..i {
                    if next(3) == 0 {
                        deps.push(names[j].clone());
                    }
                }
                if next(4) == 0 {
                    deps.push(format!("ghost{i}"));
                }
                declared.push((names[i].clone(), deps));
            }
            // Register in a shuffled order.
            for i in (1..declared.len()).rev() {
                declared.swap(i, next(i + 1));
            }

            let log = log();
            let mut pipeline = Pipeline::new(format!("case-{case}"));
            for (name, deps) in &declared {
                let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
                pipeline.register(recording(name, &deps, &log)).unwrap();
            }
            pipeline.run(&RunContext::new(1), Baggage::new()).await.unwrap();

            let ran = log.lock().clone();
            assert_eq!(ran.len(), size, "case {case}");
            let position = |name: &str| ran.iter().position(|r| r == name);
            for (name, deps) in &declared {
                for dep in deps.iter().filter(|d| !d.starts_with("ghost")) {
                    assert!(
                        position(dep) < position(name),
                        "case {case}: {dep} must run before {name}"
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn test_unregistered_dependency_is_ignored() {
        let log = log();
        let pipeline = Pipeline::new("lenient")
            .with_stage(recording("tags", &["prices"], &log))
            .unwrap();

        pipeline.run(&RunContext::new(1), Baggage::new()).await.unwrap();
        assert_eq!(*log.lock(), vec!["tags"]);
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_unregistered_dependency() {
        let log = log();
        let pipeline = Pipeline::new("strict")
            .with_config(PipelineConfig {
                strict_dependencies: true,
            })
            .with_stage(recording("fetch", &[], &log))
            .unwrap()
            .with_stage(recording("tags", &["prices"], &log))
            .unwrap();

        let err = pipeline
            .run(&RunContext::new(1), Baggage::new())
            .await
            .unwrap_err();

        match err {
            ExplainerError::MissingDependency(e) => {
                assert_eq!(e.stage, "tags");
                assert_eq!(e.dependency, "prices");
                assert_eq!(e.error_info.code, "PIPELINE-MISSING_DEP");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_cycle_fails_before_any_stage_runs() {
        let log = log();
        let pipeline = Pipeline::new("cyclic")
            .with_stage(recording("fetch", &[], &log))
            .unwrap()
            .with_stage(recording("a", &["b"], &log))
            .unwrap()
            .with_stage(recording("b", &["a"], &log))
            .unwrap();

        let err = pipeline
            .run(&RunContext::new(1), Baggage::new())
            .await
            .unwrap_err();

        match err {
            ExplainerError::CycleDetected(e) => assert_eq!(e.cycle_path, vec!["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let log = log();
        let mut pipeline = Pipeline::new("dupes");
        pipeline.register(recording("fetch", &[], &log)).unwrap();
        let err = pipeline.register(recording("fetch", &[], &log)).unwrap_err();

        assert!(matches!(err, ExplainerError::DuplicateStage(ref e) if e.stage == "fetch"));
        assert_eq!(pipeline.len(), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut pipeline = Pipeline::new("blank");
        let err = pipeline
            .register_enrichment(FnStage::new("  ", |_: &mut Baggage| Ok(())))
            .unwrap_err();
        assert!(matches!(err, ExplainerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_failure_stops_later_stages_and_names_stage() {
        let log = log();
        let sink = Arc::new(CollectingProgressSink::new());
        let pipeline = Pipeline::new("failing")
            .with_stage(recording("fetch", &[], &log))
            .unwrap()
            .with_stage(RegisteredStage::enrichment(
                FailingStage::new("prices", "price api returned 503")
                    .depends_on(&["fetch"])
                    .with_log(&log),
            ))
            .unwrap()
            .with_stage(recording("explain", &["prices"], &log))
            .unwrap()
            .with_stage(recording("tags", &[], &log))
            .unwrap();

        let ctx = RunContext::new(1).with_progress(sink.clone());
        let err = pipeline.run(&ctx, Baggage::new()).await.unwrap_err();

        assert_eq!(err.failed_stage(), Some("prices"));
        assert!(err.to_string().contains("price api returned 503"));
        assert_eq!(*log.lock(), vec!["fetch", "prices"]);
        assert_eq!(
            sink.transitions(),
            vec![
                ("fetch".to_string(), StageStatus::Running),
                ("fetch".to_string(), StageStatus::Finished),
                ("prices".to_string(), StageStatus::Running),
                ("prices".to_string(), StageStatus::Failed),
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_reports_labels_and_durations() {
        let sink = Arc::new(CollectingProgressSink::new());
        let pipeline = Pipeline::new("progress")
            .with_stage(RegisteredStage::contextual(WritingStage::new("fetch", &[], "ctx")))
            .unwrap();

        let ctx = RunContext::new(1).with_progress(sink.clone());
        pipeline.run(&ctx, Baggage::new()).await.unwrap();

        let updates = sink.updates();
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| u.run_id == ctx.run_id()));
        assert_eq!(updates[0].label, "fetch");
        assert!(updates[0].duration_ms.is_none());
        assert!(updates[1].duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_prompt_contexts_collected_in_order() {
        let pipeline = Pipeline::new("contexts")
            .with_stage(RegisteredStage::contextual(WritingStage::new(
                "roles",
                &["fetch"],
                "Sender is an EOA",
            )))
            .unwrap()
            .with_stage(RegisteredStage::contextual(WritingStage::new(
                "fetch",
                &[],
                "Transaction 0x01",
            )))
            .unwrap()
            .with_stage(RegisteredStage::contextual(WritingStage::new(
                "quiet",
                &[],
                "   ",
            )))
            .unwrap();

        let baggage = pipeline.run(&RunContext::new(1), Baggage::new()).await.unwrap();

        let contexts = baggage.get(&keys::PROMPT_CONTEXTS).unwrap();
        let stages: Vec<&str> = contexts.iter().map(|c| c.stage.as_str()).collect();
        assert_eq!(stages, vec!["fetch", "roles"]);
        assert_eq!(contexts[0].context, "Transaction 0x01");
        assert_eq!(
            baggage.get(&TRACE).unwrap(),
            &vec!["fetch".to_string(), "roles".to_string(), "quiet".to_string()]
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_run() {
        let log = log();
        let token = Arc::new(CancellationToken::new());
        token.cancel("user aborted");
        let pipeline = Pipeline::new("cancelled")
            .with_stage(recording("fetch", &[], &log))
            .unwrap();

        let ctx = RunContext::new(1).with_cancellation(token);
        let err = pipeline.run(&ctx, Baggage::new()).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_checked_between_stages() {
        let log = log();
        let token = Arc::new(CancellationToken::new());
        let pipeline = Pipeline::new("cancel-mid")
            .with_stage(RegisteredStage::enrichment(CancellingStage {
                token: token.clone(),
            }))
            .unwrap()
            .with_stage(recording("after", &["cancel"], &log))
            .unwrap();

        let ctx = RunContext::new(1).with_cancellation(token);
        let err = pipeline.run(&ctx, Baggage::new()).await.unwrap_err();

        assert!(matches!(err, ExplainerError::Cancelled(ref reason) if reason == "caller hung up"));
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_stage_cancellation_error_surfaces_as_cancelled() {
        let pipeline = Pipeline::new("cancel-in-stage")
            .with_stage(RegisteredStage::enrichment(CancelledStage))
            .unwrap();

        let err = pipeline
            .run(&RunContext::new(1), Baggage::new())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(err.failed_stage().is_none());
    }
}
