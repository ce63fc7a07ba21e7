#[cfg(test)]
mod tests {
    use crate::address::Address;
    use crate::config::RegistryConfig;
    use crate::engine::{EngineFactory, ExecutionEngine, ExecutionOutcome};
    use crate::error::{QuireError, Result};
    use crate::item::{Item, ItemKind, ItemOutput, ItemPatch, OutputRecord};
    use crate::session::{
        DialogRegistry, ItemQuery, NotebookRegistry, RegisterMode, SessionRef, SessionRegistry,
    };
    use crate::store::ItemStore;
    use crate::address::{IdentifierResolver, PositionalResolver};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // Mock ItemStore keeping documents in memory
    #[derive(Default)]
    struct MockItemStore {
        documents: Mutex<HashMap<PathBuf, Vec<Item>>>,
        fail_saves: AtomicBool,
        save_delay: Duration,
    }

    impl MockItemStore {
        fn document(&self, path: &str) -> Option<Vec<Item>> {
            self.documents.lock().unwrap().get(Path::new(path)).cloned()
        }

        fn put(&self, path: &str, items: Vec<Item>) {
            self.documents
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), items);
        }
    }

    #[async_trait]
    impl ItemStore for MockItemStore {
        async fn load(&self, path: &Path) -> Result<Vec<Item>> {
            self.documents
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| QuireError::load_failed(path.display().to_string(), "no such file"))
        }

        async fn save(&self, items: &[Item], path: &Path) -> Result<()> {
            tokio::time::sleep(self.save_delay).await;
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(QuireError::io("disk full"));
            }
            self.documents
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), items.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &Path) -> bool {
            self.documents.lock().unwrap().contains_key(path)
        }
    }

    // Mock engine echoing its source after an optional delay
    #[derive(Default)]
    struct MockEngine {
        delay: Duration,
        count: AtomicU64,
        stopped: AtomicBool,
        shut_down: AtomicBool,
    }

    #[async_trait]
    impl ExecutionEngine for MockEngine {
        async fn execute(&self, source: &str, _timeout: Duration) -> Result<ExecutionOutcome> {
            tokio::time::sleep(self.delay).await;
            let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ExecutionOutcome {
                records: vec![OutputRecord::stream("stdout", source)],
                execution_count: count,
            })
        }

        async fn stop(&self) -> Result<()> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn restart(&self) -> Result<()> {
            self.count.store(0, Ordering::SeqCst);
            Ok(())
        }

        async fn shutdown(&self) -> Result<()> {
            self.shut_down.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockEngineFactory {
        delay: Duration,
        engines: Mutex<HashMap<String, Arc<MockEngine>>>,
    }

    impl MockEngineFactory {
        fn engine(&self, session: &str) -> Arc<MockEngine> {
            self.engines.lock().unwrap()[session].clone()
        }
    }

    impl EngineFactory for MockEngineFactory {
        fn create(&self, session: &str) -> Arc<dyn ExecutionEngine> {
            let engine = Arc::new(MockEngine {
                delay: self.delay,
                ..MockEngine::default()
            });
            self.engines
                .lock()
                .unwrap()
                .insert(session.to_string(), engine.clone());
            engine
        }
    }

    struct Fixture<R: crate::address::AddressResolver> {
        registry: SessionRegistry<R>,
        store: Arc<MockItemStore>,
        engines: Arc<MockEngineFactory>,
    }

    fn fixture<R: crate::address::AddressResolver>(
        resolver: R,
        config: RegistryConfig,
        delay: Duration,
    ) -> Fixture<R> {
        let store = Arc::new(MockItemStore::default());
        let engines = Arc::new(MockEngineFactory {
            delay,
            ..MockEngineFactory::default()
        });
        Fixture {
            registry: SessionRegistry::new(resolver, store.clone(), engines.clone(), config),
            store,
            engines,
        }
    }

    // Notebook registry over a store whose saves take 100ms
    fn slow_notebooks() -> Fixture<PositionalResolver> {
        let store = Arc::new(MockItemStore {
            save_delay: Duration::from_millis(100),
            ..MockItemStore::default()
        });
        let engines = Arc::new(MockEngineFactory::default());
        Fixture {
            registry: SessionRegistry::new(
                PositionalResolver,
                store.clone(),
                engines.clone(),
                RegistryConfig::default(),
            ),
            store,
            engines,
        }
    }

    fn notebooks() -> Fixture<PositionalResolver> {
        fixture(PositionalResolver, RegistryConfig::default(), Duration::ZERO)
    }

    fn dialogs() -> Fixture<IdentifierResolver> {
        fixture(IdentifierResolver, RegistryConfig::default(), Duration::ZERO)
    }

    async fn contents<R: crate::address::AddressResolver>(
        registry: &SessionRegistry<R>,
        target: &SessionRef,
    ) -> Vec<String> {
        registry
            .items(target)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.content)
            .collect()
    }

    async fn seed(registry: &NotebookRegistry, names: &[&str]) {
        for name in names {
            registry
                .insert(&SessionRef::Active, Address::END, None, *name)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_register_activates_and_rejects_duplicates() {
        let fx = notebooks();
        let summary = fx
            .registry
            .register("a", RegisterMode::Create, None)
            .await
            .unwrap();
        assert!(summary.is_active);
        fx.registry
            .register("b", RegisterMode::Create, None)
            .await
            .unwrap();
        assert_eq!(fx.registry.get_active().await.as_deref(), Some("b"));

        let err = fx
            .registry
            .register("a", RegisterMode::Create, None)
            .await
            .unwrap_err();
        assert!(err.is_already_exists());

        fx.registry.set_active("a").await.unwrap();
        let sessions = fx.registry.list_sessions().await;
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].is_active);
        assert!(!sessions[1].is_active);

        assert!(fx.registry.set_active("zzz").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_operations_without_active_session() {
        let fx = notebooks();
        let err = fx
            .registry
            .insert(&SessionRef::Active, Address::END, None, "x")
            .await
            .unwrap_err();
        assert_eq!(err, QuireError::NoActiveSession);

        let err = fx
            .registry
            .undo(&SessionRef::from("ghost"), 1)
            .await
            .unwrap_err();
        assert_eq!(err, QuireError::not_found("notebook", "ghost"));
    }

    #[tokio::test]
    async fn test_batch_delete_and_undo() {
        let fx = notebooks();
        fx.registry
            .register("nb", RegisterMode::Create, None)
            .await
            .unwrap();
        seed(&fx.registry, &["A", "B", "C", "D", "E"]).await;
        let active = SessionRef::Active;

        let removed = fx
            .registry
            .delete(&active, vec![Address::Index(3), Address::Index(1)])
            .await
            .unwrap();
        assert_eq!(
            removed.iter().map(|i| i.content.as_str()).collect::<Vec<_>>(),
            ["B", "D"]
        );
        assert_eq!(contents(&fx.registry, &active).await, ["A", "C", "E"]);

        let step = fx.registry.undo(&active, 1).await.unwrap();
        assert_eq!(step.performed, 1);
        assert_eq!(
            contents(&fx.registry, &active).await,
            ["A", "B", "C", "D", "E"]
        );

        let err = fx
            .registry
            .delete(&active, vec![Address::Index(0), Address::Index(9)])
            .await
            .unwrap_err();
        assert!(err.is_out_of_range());
        assert_eq!(contents(&fx.registry, &active).await.len(), 5);
    }

    #[tokio::test]
    async fn test_new_operation_after_undo_clears_redo() {
        let fx = notebooks();
        fx.registry
            .register("nb", RegisterMode::Create, None)
            .await
            .unwrap();
        seed(&fx.registry, &["A", "B"]).await;
        fx.registry.undo(&SessionRef::Active, 1).await.unwrap();
        seed(&fx.registry, &["C"]).await;

        let history = fx.registry.history(&SessionRef::Active).await.unwrap();
        assert!(history.redo.is_empty());
        assert_eq!(history.undo.len(), 2);

        let step = fx.registry.redo(&SessionRef::Active, 1).await.unwrap();
        assert_eq!(step.performed, 0);
    }

    #[tokio::test]
    async fn test_history_capacity_evicts_oldest() {
        let config = RegistryConfig {
            history_capacity: 5,
            ..RegistryConfig::default()
        };
        let fx = fixture(PositionalResolver, config, Duration::ZERO);
        fx.registry
            .register("nb", RegisterMode::Create, None)
            .await
            .unwrap();
        for i in 0..10 {
            fx.registry
                .insert(&SessionRef::Active, Address::END, None, format!("{i}"))
                .await
                .unwrap();
        }

        let step = fx.registry.undo(&SessionRef::Active, 100).await.unwrap();
        assert_eq!(step.requested, 100);
        assert_eq!(step.performed, 5);
        assert_eq!(
            contents(&fx.registry, &SessionRef::Active).await,
            ["0", "1", "2", "3", "4"]
        );
    }

    #[tokio::test]
    async fn test_reports_carry_context() {
        let fx = notebooks();
        fx.registry
            .register("nb", RegisterMode::Create, None)
            .await
            .unwrap();
        seed(&fx.registry, &["A", "B", "C", "D"]).await;

        let report = fx
            .registry
            .move_item(&SessionRef::Active, Address::Index(3), Address::Index(0))
            .await
            .unwrap();
        assert_eq!(report.address.as_ref().map(|a| a.index), Some(0));
        assert!(report.context[0].focus);
        assert_eq!(report.context[0].first_line, "D");
        assert_eq!(report.item_count, 4);

        let report = fx
            .registry
            .swap(&SessionRef::Active, Address::Index(2), Address::Index(2))
            .await
            .unwrap();
        assert_eq!(report.description, "swap 2 <-> 2");
        let history = fx.registry.history(&SessionRef::Active).await.unwrap();
        assert_eq!(history.undo.last().map(String::as_str), Some("swap 2 <-> 2"));
    }

    #[tokio::test]
    async fn test_dialog_identifiers_survive_edits() {
        let fx = dialogs();
        fx.registry
            .register("chat", RegisterMode::Create, None)
            .await
            .unwrap();
        let active = SessionRef::Active;
        let first = fx
            .registry
            .insert(&active, Address::END, Some(ItemKind::Prompt), "hello")
            .await
            .unwrap();
        let second = fx
            .registry
            .insert(&active, Address::Id(first.id.clone()), None, "before hello")
            .await
            .unwrap();
        assert_eq!(second.index, 0);

        let (address, item) = fx
            .registry
            .read_item(&active, &Address::Id(first.id.clone()))
            .await
            .unwrap();
        assert_eq!(address.index, 1);
        assert_eq!(item.kind, ItemKind::Prompt);

        fx.registry
            .delete(&active, vec![Address::Id(first.id.clone())])
            .await
            .unwrap();
        let err = fx
            .registry
            .read_item(&active, &Address::Id(first.id.clone()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let third = fx
            .registry
            .insert(&active, Address::END, None, "again")
            .await
            .unwrap();
        assert_ne!(third.id, first.id);

        let err = fx
            .registry
            .insert(&active, Address::END, Some(ItemKind::Markdown), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, QuireError::InvalidKind { .. }));
    }

    #[tokio::test]
    async fn test_update_and_untracked_output() {
        let fx = dialogs();
        fx.registry
            .register("chat", RegisterMode::Create, None)
            .await
            .unwrap();
        let active = SessionRef::Active;
        let address = fx
            .registry
            .insert(&active, Address::END, Some(ItemKind::Prompt), "question")
            .await
            .unwrap();
        let target = Address::Id(address.id.clone());

        fx.registry
            .update(
                &active,
                target.clone(),
                ItemPatch::content("better question").with_pinned(true),
            )
            .await
            .unwrap();
        fx.registry
            .set_output(&active, &target, ItemOutput::Text("answer".to_string()))
            .await
            .unwrap();
        assert_eq!(fx.registry.history(&active).await.unwrap().undo.len(), 2);

        fx.registry.undo(&active, 1).await.unwrap();
        let (_, item) = fx.registry.read_item(&active, &target).await.unwrap();
        assert_eq!(item.content, "question");
        assert!(!item.flags.pinned);
        assert_eq!(item.output, ItemOutput::Text("answer".to_string()));
    }

    #[tokio::test]
    async fn test_list_items_filters_by_kind() {
        let fx = notebooks();
        fx.registry
            .register("nb", RegisterMode::Create, None)
            .await
            .unwrap();
        let active = SessionRef::Active;
        for (kind, content) in [
            (ItemKind::Markdown, "# Title"),
            (ItemKind::Code, "x = 1"),
            (ItemKind::Markdown, "notes"),
            (ItemKind::Code, "print(x)"),
        ] {
            fx.registry
                .insert(&active, Address::END, Some(kind), content)
                .await
                .unwrap();
        }

        let query = ItemQuery {
            kind: Some(ItemKind::Code),
            ..ItemQuery::default()
        };
        let previews = fx.registry.list_items(&active, &query).await.unwrap();
        assert_eq!(
            previews.iter().map(|p| p.index).collect::<Vec<_>>(),
            [1, 3]
        );

        let query = ItemQuery {
            start: 1,
            limit: Some(2),
            kind: None,
        };
        let previews = fx.registry.list_items(&active, &query).await.unwrap();
        assert_eq!(
            previews.iter().map(|p| p.index).collect::<Vec<_>>(),
            [1, 2]
        );
    }

    #[tokio::test]
    async fn test_create_and_connect_with_backing_files() {
        let fx = notebooks();
        fx.store.put("taken.json", Vec::new());
        let err = fx
            .registry
            .register("nb", RegisterMode::Create, Some(Path::new("taken.json")))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());

        fx.registry
            .register("nb", RegisterMode::Create, Some(Path::new("fresh.json")))
            .await
            .unwrap();
        assert_eq!(fx.store.document("fresh.json"), Some(Vec::new()));

        let err = fx
            .registry
            .register("other", RegisterMode::Connect, Some(Path::new("missing.json")))
            .await
            .unwrap_err();
        assert!(matches!(err, QuireError::LoadFailed { .. }));

        fx.store
            .put("saved.json", vec![Item::new(ItemKind::Code, "loaded")]);
        let summary = fx
            .registry
            .register("other", RegisterMode::Connect, Some(Path::new("saved.json")))
            .await
            .unwrap();
        assert_eq!(summary.item_count, 1);
        assert!(!summary.is_dirty);
    }

    #[tokio::test]
    async fn test_release_saves_dirty_session() {
        let fx = notebooks();
        fx.registry
            .register("nb", RegisterMode::Create, Some(Path::new("nb.json")))
            .await
            .unwrap();
        seed(&fx.registry, &["A"]).await;

        fx.store.fail_saves.store(true, Ordering::SeqCst);
        assert!(fx.registry.release("nb").await.is_err());
        assert_eq!(fx.registry.get_active().await.as_deref(), Some("nb"));

        fx.store.fail_saves.store(false, Ordering::SeqCst);
        fx.registry.release("nb").await.unwrap();
        assert_eq!(fx.registry.get_active().await, None);
        assert!(fx.engines.engine("nb").shut_down.load(Ordering::SeqCst));
        let saved = fx.store.document("nb.json").unwrap();
        assert_eq!(saved[0].content, "A");

        assert!(fx.registry.release("nb").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_explicit_save_clears_dirty_flag() {
        let fx = notebooks();
        fx.registry
            .register("nb", RegisterMode::Create, Some(Path::new("nb.json")))
            .await
            .unwrap();
        seed(&fx.registry, &["A", "B"]).await;
        assert!(fx.registry.session_summary(&SessionRef::Active).await.unwrap().is_dirty);

        let path = fx.registry.save(&SessionRef::Active).await.unwrap();
        assert_eq!(path, PathBuf::from("nb.json"));
        assert!(!fx.registry.session_summary(&SessionRef::Active).await.unwrap().is_dirty);
        assert_eq!(fx.store.document("nb.json").unwrap().len(), 2);

        fx.registry
            .register("scratch", RegisterMode::Create, None)
            .await
            .unwrap();
        let err = fx.registry.save(&SessionRef::Active).await.unwrap_err();
        assert!(matches!(err, QuireError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_execute_item_stores_outputs() {
        let fx = notebooks();
        fx.registry
            .register("nb", RegisterMode::Create, None)
            .await
            .unwrap();
        let active = SessionRef::Active;
        fx.registry
            .insert(&active, Address::END, Some(ItemKind::Markdown), "# doc")
            .await
            .unwrap();
        fx.registry
            .insert(&active, Address::END, None, "print('hi')")
            .await
            .unwrap();

        let report = fx
            .registry
            .execute_item(&active, &Address::Index(1), None)
            .await
            .unwrap();
        assert_eq!(report.outcome.execution_count, 1);
        assert_eq!(report.address.map(|a| a.index), Some(1));

        let (_, item) = fx
            .registry
            .read_item(&active, &Address::Index(1))
            .await
            .unwrap();
        assert_eq!(item.execution_count, Some(1));
        assert!(item.time_run.is_some());
        assert_eq!(
            item.output,
            ItemOutput::Records(vec![OutputRecord::stream("stdout", "print('hi')")])
        );
        assert!(fx.registry.history(&active).await.unwrap().undo.len() == 2);

        let err = fx
            .registry
            .execute_item(&active, &Address::Index(0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, QuireError::InvalidKind { .. }));

        fx.registry.restart(&active).await.unwrap();
        let outcome = fx
            .registry
            .execute_code(&active, "1 + 1", None)
            .await
            .unwrap();
        assert_eq!(outcome.execution_count, 1);
    }

    #[tokio::test]
    async fn test_execution_timeout_stops_engine() {
        let config = RegistryConfig {
            max_timeout_secs: 0.05,
            ..RegistryConfig::default()
        };
        let fx: Fixture<PositionalResolver> =
            fixture(PositionalResolver, config, Duration::from_secs(5));
        let registry: &NotebookRegistry = &fx.registry;
        registry
            .register("nb", RegisterMode::Create, None)
            .await
            .unwrap();
        registry
            .insert(&SessionRef::Active, Address::END, None, "while True: pass")
            .await
            .unwrap();

        let err = registry
            .execute_item(&SessionRef::Active, &Address::Index(0), Some(10.0))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(fx.engines.engine("nb").stopped.load(Ordering::SeqCst));

        let (_, item) = registry
            .read_item(&SessionRef::Active, &Address::Index(0))
            .await
            .unwrap();
        assert!(item.output.is_empty());
        assert_eq!(item.content, "while True: pass");
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_history() {
        let fx = dialogs();
        let registry: &DialogRegistry = &fx.registry;
        registry
            .register("one", RegisterMode::Create, None)
            .await
            .unwrap();
        registry
            .register("two", RegisterMode::Create, None)
            .await
            .unwrap();
        let one = SessionRef::from("one");
        let two = SessionRef::from("two");
        registry
            .insert(&one, Address::END, None, "only in one")
            .await
            .unwrap();

        let step = registry.undo(&two, 1).await.unwrap();
        assert_eq!(step.performed, 0);
        assert_eq!(contents(registry, &one).await, ["only in one"]);
        assert!(contents(registry, &two).await.is_empty());

        registry.clear_history(&one).await.unwrap();
        assert_eq!(registry.undo(&one, 1).await.unwrap().performed, 0);
        assert_eq!(contents(registry, &one).await, ["only in one"]);
    }

    #[tokio::test]
    async fn test_connect_with_reissued_ids_is_dirty_until_saved() {
        let fx = dialogs();
        let item = Item::new(ItemKind::Prompt, "asked twice");
        fx.store.put("chat.json", vec![item.clone(), item]);

        let summary = fx
            .registry
            .register("chat", RegisterMode::Connect, Some(Path::new("chat.json")))
            .await
            .unwrap();
        assert!(summary.is_dirty);

        fx.registry.save(&SessionRef::Active).await.unwrap();
        let saved = fx.store.document("chat.json").unwrap();
        assert_ne!(saved[0].id(), saved[1].id());
        fx.registry.release("chat").await.unwrap();

        let summary = fx
            .registry
            .register("chat", RegisterMode::Connect, Some(Path::new("chat.json")))
            .await
            .unwrap();
        assert!(!summary.is_dirty);
        let items = fx.registry.items(&SessionRef::Active).await.unwrap();
        assert_eq!(items[0].id(), saved[0].id());
        assert_eq!(items[1].id(), saved[1].id());
    }

    #[tokio::test]
    async fn test_insert_and_execute_runs_new_code_item() {
        let fx = notebooks();
        fx.registry
            .register("nb", RegisterMode::Create, None)
            .await
            .unwrap();
        let active = SessionRef::Active;
        fx.registry
            .insert(&active, Address::END, Some(ItemKind::Markdown), "# doc")
            .await
            .unwrap();

        let report = fx
            .registry
            .insert_and_execute(&active, Address::END, "print(2)", None)
            .await
            .unwrap();
        assert_eq!(report.session, "nb");
        assert_eq!(report.address.as_ref().map(|a| a.index), Some(1));
        assert_eq!(
            report.outcome.records,
            vec![OutputRecord::stream("stdout", "print(2)")]
        );

        let (_, item) = fx
            .registry
            .read_item(&active, &Address::Index(1))
            .await
            .unwrap();
        assert_eq!(item.kind, ItemKind::Code);
        assert_eq!(item.execution_count, Some(1));
        assert_eq!(fx.registry.history(&active).await.unwrap().undo.len(), 2);

        let err = fx
            .registry
            .insert_and_execute(&active, Address::Index(9), "x", None)
            .await
            .unwrap_err();
        assert!(err.is_out_of_range());
        assert_eq!(fx.registry.items(&active).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_creates_on_one_path_admit_one_session() {
        let fx = slow_notebooks();
        let path = Some(Path::new("/same.json"));

        let (a, b) = tokio::join!(
            fx.registry.register("a", RegisterMode::Create, path),
            fx.registry.register("b", RegisterMode::Create, path),
        );
        assert!(a.is_ok());
        assert_eq!(b.unwrap_err(), QuireError::already_exists("file", "/same.json"));

        let sessions = fx.registry.list_sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].name, "a");

        // A live session owns the file even for connect mode.
        let err = fx
            .registry
            .register("c", RegisterMode::Connect, path)
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_creates_of_one_name_leave_no_orphan_file() {
        let fx = slow_notebooks();

        let (a, b) = tokio::join!(
            fx.registry
                .register("nb", RegisterMode::Create, Some(Path::new("/a.json"))),
            fx.registry
                .register("nb", RegisterMode::Create, Some(Path::new("/b.json"))),
        );
        assert!(a.is_ok());
        assert_eq!(b.unwrap_err(), QuireError::already_exists("notebook", "nb"));
        assert_eq!(fx.store.document("/a.json"), Some(Vec::new()));
        assert_eq!(fx.store.document("/b.json"), None);

        fx.registry
            .register("other", RegisterMode::Create, Some(Path::new("/b.json")))
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_release_keeps_session_and_blocks_reregister() {
        let fx = slow_notebooks();
        fx.registry
            .register("nb", RegisterMode::Create, Some(Path::new("nb.json")))
            .await
            .unwrap();
        seed(&fx.registry, &["precious"]).await;
        fx.store.fail_saves.store(true, Ordering::SeqCst);

        let (released, registered) = tokio::join!(fx.registry.release("nb"), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            fx.registry.register("nb", RegisterMode::Create, None).await
        });
        assert_eq!(released.unwrap_err(), QuireError::io("disk full"));
        assert!(registered.unwrap_err().is_already_exists());

        let nb = SessionRef::from("nb");
        assert_eq!(contents(&fx.registry, &nb).await, ["precious"]);
        assert!(fx.registry.session_summary(&nb).await.unwrap().is_dirty);
        assert_eq!(fx.registry.get_active().await.as_deref(), Some("nb"));
        assert!(!fx.engines.engine("nb").shut_down.load(Ordering::SeqCst));

        fx.store.fail_saves.store(false, Ordering::SeqCst);
        fx.registry.release("nb").await.unwrap();
        assert_eq!(fx.store.document("nb.json").unwrap()[0].content, "precious");
        assert!(fx.engines.engine("nb").shut_down.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_edits_during_release_are_saved() {
        let fx = slow_notebooks();
        fx.registry
            .register("nb", RegisterMode::Create, Some(Path::new("nb.json")))
            .await
            .unwrap();
        seed(&fx.registry, &["A"]).await;

        let (released, second_release, inserted) = tokio::join!(
            fx.registry.release("nb"),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                fx.registry.release("nb").await
            },
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                fx.registry
                    .insert(&SessionRef::from("nb"), Address::END, None, "B")
                    .await
            },
        );
        released.unwrap();
        inserted.unwrap();
        assert!(matches!(second_release, Err(QuireError::InvalidArgument(_))));

        let saved = fx.store.document("nb.json").unwrap();
        assert_eq!(
            saved.iter().map(|i| i.content.as_str()).collect::<Vec<_>>(),
            ["A", "B"]
        );
        assert!(fx.registry.list_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_with_failing_save_registers_nothing() {
        let fx = notebooks();
        fx.store.fail_saves.store(true, Ordering::SeqCst);

        let err = fx
            .registry
            .register("nb", RegisterMode::Create, Some(Path::new("nb.json")))
            .await
            .unwrap_err();
        assert_eq!(err, QuireError::io("disk full"));
        assert!(fx.registry.list_sessions().await.is_empty());
        assert_eq!(fx.registry.get_active().await, None);
        assert_eq!(fx.store.document("nb.json"), None);

        fx.store.fail_saves.store(false, Ordering::SeqCst);
        fx.registry
            .register("nb", RegisterMode::Create, Some(Path::new("nb.json")))
            .await
            .unwrap();
    }
}
