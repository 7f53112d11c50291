//! Adapter 端到端测试
//!
//! Drives the public API against in-memory connectors: filtering, caching,
//! batching, lazy setup, failure isolation and collisions.

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use toolbridge_core::{
    AdapterConfig, AdapterError, BridgeConfig, CallError, Connector, ConnectorHandle,
    ConversionError, Definition, DefinitionKind, FilterConfig, InitializationError, InvokeError,
    PromptDefinition, RawResult, ResourceDefinition, StaticConnector, ToolDefinition,
};
use toolbridge_runtime::{
    Backend, Conversion, ConnectorState, FunctionBackend, NamespacedBackend, NativeTool,
    NormalizedResult, PreparedCall, ToolAdapter, function_schemas,
};

// ============== 基础设施 ==============

fn shared(connector: StaticConnector) -> Arc<dyn Connector> {
    Arc::new(connector)
}

fn tools_named<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<ToolDefinition> {
    names
        .into_iter()
        .map(|name| ToolDefinition::new(name, format!("{name} tool")))
        .collect()
}

fn names(tools: &[toolbridge_runtime::ConvertedTool]) -> Vec<String> {
    tools.iter().map(|t| t.name().to_string()).collect()
}

/// Backend that counts conversions and setups, and can reject given names
#[derive(Default)]
struct CountingBackend {
    conversions: AtomicUsize,
    prepares: AtomicUsize,
    reject: Vec<String>,
    conversion_delay: Option<Duration>,
}

impl CountingBackend {
    fn rejecting<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            reject: names.into_iter().map(str::to_string).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Backend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    async fn convert_tool(
        &self,
        tool: &ToolDefinition,
        _connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        self.conversions.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.conversion_delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject.contains(&tool.name) {
            return Err(ConversionError::failed(
                DefinitionKind::Tool,
                &tool.name,
                "rejected",
            ));
        }
        Ok(Conversion::Native(NativeTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            schema: tool.input_schema.clone(),
            target: toolbridge_runtime::InvokeTarget::CallTool {
                name: tool.name.clone(),
            },
        }))
    }

    async fn convert_resource(
        &self,
        _resource: &ResourceDefinition,
        _connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        Ok(Conversion::Skip)
    }

    async fn convert_prompt(
        &self,
        _prompt: &PromptDefinition,
        _connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        Ok(Conversion::Skip)
    }

    async fn prepare(
        &self,
        tool: &NativeTool,
        _connector: &dyn Connector,
    ) -> Result<PreparedCall, ConversionError> {
        self.prepares.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(PreparedCall::new(tool.target.clone()))
    }
}

/// Shares one counting backend between the adapter and the test body
struct SharedCounter(Arc<CountingBackend>);

#[async_trait]
impl Backend for SharedCounter {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn convert_tool(
        &self,
        tool: &ToolDefinition,
        connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        self.0.convert_tool(tool, connector).await
    }

    async fn convert_resource(
        &self,
        resource: &ResourceDefinition,
        connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        self.0.convert_resource(resource, connector).await
    }

    async fn convert_prompt(
        &self,
        prompt: &PromptDefinition,
        connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        self.0.convert_prompt(prompt, connector).await
    }

    async fn prepare(
        &self,
        tool: &NativeTool,
        connector: &dyn Connector,
    ) -> Result<PreparedCall, ConversionError> {
        self.0.prepare(tool, connector).await
    }
}

/// Backend that only knows how to convert tools
struct ToolsOnly;

#[async_trait]
impl Backend for ToolsOnly {
    fn name(&self) -> &str {
        "tools-only"
    }

    async fn convert_tool(
        &self,
        tool: &ToolDefinition,
        connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        NamespacedBackend.convert_tool(tool, connector).await
    }
}

// ============== 转换 ==============

#[tokio::test]
async fn test_create_tool_is_idempotent() {
    let adapter = ToolAdapter::new(FunctionBackend::default());
    let connector = shared(StaticConnector::new("fs"));
    let definition: Definition = ToolDefinition::new("read_file", "Read a file")
        .with_schema(json!({"type": "object", "properties": {"path": {"type": "string"}}}))
        .into();

    let first = adapter.create_tool(&definition, &connector).await.unwrap();
    let second = adapter.create_tool(&definition, &connector).await.unwrap();

    assert!(!first.ptr_eq(&second));
    assert_eq!(first.name(), second.name());
    assert_eq!(first.description(), second.description());
    assert_eq!(first.schema(), second.schema());
}

#[tokio::test]
async fn test_deny_wins_over_allow() {
    let adapter = ToolAdapter::new(NamespacedBackend);
    let connector = shared(StaticConnector::new("s").with_tools(tools_named(["A", "B", "C"])));
    let filter = FilterConfig::new().allow(["A", "B"]).deny(["B"]);

    let tools = adapter.create_tools(&[connector.clone()], Some(&filter)).await.unwrap();
    assert_eq!(names(&tools), vec!["mcp__s__A"]);
}

#[tokio::test]
async fn test_pattern_filtering() {
    let adapter = ToolAdapter::new(FunctionBackend::default());
    let connector = shared(
        StaticConnector::new("s").with_tools(tools_named(["file_read", "file_delete", "web_search"])),
    );
    let filter = FilterConfig::new()
        .allow_patterns(["file_.*"])
        .deny_patterns([".*_delete"]);

    let tools = adapter.create_tools(&[connector.clone()], Some(&filter)).await.unwrap();
    assert_eq!(names(&tools), vec!["file_read"]);
}

#[tokio::test]
async fn test_unimplemented_hook_is_a_hard_failure() {
    let adapter = ToolAdapter::new(ToolsOnly);
    let connector = shared(
        StaticConnector::new("docs")
            .with_tool(ToolDefinition::new("search", ""))
            .with_resource(ResourceDefinition::new("file:///readme", "readme")),
    );

    let err = adapter.create_tools(&[connector.clone()], None).await.unwrap_err();
    assert!(matches!(
        err,
        AdapterError::Conversion(ConversionError::NotImplemented { hook: "convert_resource", .. })
    ));

    let resource: Definition = ResourceDefinition::new("file:///readme", "readme").into();
    let err = adapter.create_tool(&resource, &connector).await.unwrap_err();
    assert!(matches!(err, AdapterError::Conversion(_)));
}

// ============== 缓存与批处理 ==============

#[tokio::test]
async fn test_concurrent_create_tools_single_pass() {
    let counter = Arc::new(CountingBackend {
        conversion_delay: Some(Duration::from_millis(10)),
        ..CountingBackend::default()
    });
    let adapter = ToolAdapter::new(SharedCounter(Arc::clone(&counter)));
    let connector = Arc::new(
        StaticConnector::new("slow")
            .with_tools(tools_named(["a", "b", "c"]))
            .with_init_delay(Duration::from_millis(30)),
    );
    let dyn_connector: Arc<dyn Connector> = connector.clone();
    let connectors = [dyn_connector];

    let (first, second) = tokio::join!(
        adapter.create_tools(&connectors, None),
        adapter.create_tools(&connectors, None),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(adapter.cache().conversion_passes(), 1);
    assert_eq!(connector.init_calls(), 1);
    assert_eq!(counter.conversions.load(Ordering::SeqCst), 3);
    assert_eq!(names(&first), names(&second));
    assert!(first.iter().zip(&second).all(|(a, b)| a.ptr_eq(b)));

    // served from cache afterwards
    adapter.create_tools(&connectors, None).await.unwrap();
    assert_eq!(adapter.cache().conversion_passes(), 1);
}

#[tokio::test]
async fn test_batches_drop_failures_and_keep_order() {
    let all: Vec<String> = (0..25).map(|i| format!("tool_{i:02}")).collect();
    let counter = CountingBackend::rejecting(["tool_03", "tool_17"]);
    let config = AdapterConfig {
        chunk_size: 10,
        ..AdapterConfig::default()
    };
    let adapter = ToolAdapter::with_config(counter, config).unwrap();
    let connector = shared(StaticConnector::new("big").with_tools(tools_named(all.iter().map(String::as_str))));

    let tools = adapter.create_tools(&[connector.clone()], None).await.unwrap();

    let expected: Vec<String> = all
        .iter()
        .filter(|name| *name != "tool_03" && *name != "tool_17")
        .cloned()
        .collect();
    assert_eq!(tools.len(), 23);
    assert_eq!(names(&tools), expected);

    let key = toolbridge_runtime::CacheKey::new(connector.id(), FilterConfig::default());
    assert_eq!(adapter.cache().get(&key).map(|entry| entry.dropped), Some(2));
}

// ============== 延迟初始化 ==============

#[tokio::test]
async fn test_lazy_setup_runs_once() {
    let counter = Arc::new(CountingBackend::default());
    let adapter = ToolAdapter::new(SharedCounter(Arc::clone(&counter)));
    let connector = shared(
        StaticConnector::new("fs")
            .with_tool(ToolDefinition::new("echo", ""))
            .with_response("echo", Ok(RawResult::text("pong"))),
    );

    let tools = adapter.create_tools(&[connector.clone()], None).await.unwrap();
    let tool = &tools[0];
    assert_eq!(counter.prepares.load(Ordering::SeqCst), 0);

    let results = join_all((0..5).map(|_| tool.invoke(json!({})))).await;
    assert_eq!(results.len(), 5);
    for result in results {
        assert_eq!(result.unwrap(), NormalizedResult::Success("pong".to_string()));
    }
    assert_eq!(counter.prepares.load(Ordering::SeqCst), 1);

    tool.clone().invoke(json!({})).await.unwrap();
    assert_eq!(counter.prepares.load(Ordering::SeqCst), 1);
}

// ============== 故障隔离 ==============

#[tokio::test]
async fn test_execution_failure_is_isolated() {
    let adapter = ToolAdapter::new(FunctionBackend::default());
    let connector = shared(
        StaticConnector::new("fs")
            .with_tools(tools_named(["write", "read"]))
            .with_response("write", Err(CallError::Execution("read-only filesystem".to_string())))
            .with_response("read", Ok(RawResult::text("contents"))),
    );

    let tools = adapter.create_tools(&[connector.clone()], None).await.unwrap();
    let write = tools.iter().find(|t| t.name() == "write").unwrap();
    let read = tools.iter().find(|t| t.name() == "read").unwrap();

    let failed = write.invoke(json!({"path": "/a"})).await.unwrap();
    assert_eq!(failed, NormalizedResult::Failure("read-only filesystem".to_string()));

    let ok = read.invoke(json!({"path": "/a"})).await.unwrap();
    assert_eq!(ok, NormalizedResult::Success("contents".to_string()));
}

#[tokio::test]
async fn test_failed_connector_does_not_affect_others() {
    let adapter = ToolAdapter::new(NamespacedBackend);
    let broken = Arc::new(StaticConnector::new("broken").with_init_failure("exec not found"));
    let broken_dyn: Arc<dyn Connector> = broken.clone();
    let healthy = shared(StaticConnector::new("healthy").with_tools(tools_named(["ping"])));

    let collection = adapter
        .collect_tools(&[broken_dyn.clone(), healthy.clone()], None)
        .await
        .unwrap();

    assert_eq!(collection.names(), vec!["mcp__healthy__ping"]);
    assert_eq!(collection.failures.len(), 1);
    assert_eq!(collection.failures[0].name, "broken");
    assert_eq!(
        collection.failures[0].error,
        InitializationError::failed("broken", "exec not found")
    );
    assert!(matches!(
        adapter.connector_state(broken_dyn.id()),
        ConnectorState::Failed(_)
    ));

    // terminal until reset
    adapter.create_tools(&[broken_dyn.clone()], None).await.unwrap();
    assert_eq!(broken.init_calls(), 1);

    adapter.reset(broken_dyn.id());
    assert_eq!(adapter.connector_state(broken_dyn.id()), ConnectorState::Idle);
    adapter.create_tools(&[broken_dyn], None).await.unwrap();
    assert_eq!(broken.init_calls(), 2);
}

#[tokio::test]
async fn test_init_timeout_is_reported() {
    let config = AdapterConfig {
        init_timeout_ms: 20,
        ..AdapterConfig::default()
    };
    let adapter = ToolAdapter::with_config(NamespacedBackend, config).unwrap();
    let hung = shared(
        StaticConnector::new("hung")
            .with_tools(tools_named(["a"]))
            .with_init_delay(Duration::from_millis(500)),
    );

    let collection = adapter.collect_tools(&[hung.clone()], None).await.unwrap();
    assert!(collection.tools.is_empty());
    assert!(matches!(
        collection.failures[0].error,
        InitializationError::Timeout { timeout_ms: 20, .. }
    ));
    assert!(adapter.cache().is_empty());
}

#[tokio::test]
async fn test_invocation_timeout_normalizes() {
    let config = AdapterConfig {
        call_timeout_ms: 20,
        ..AdapterConfig::default()
    };
    let adapter = ToolAdapter::with_config(FunctionBackend::default(), config).unwrap();
    let connector = shared(
        StaticConnector::new("slow")
            .with_tools(tools_named(["crawl"]))
            .with_response("crawl", Ok(RawResult::text("done")))
            .with_call_delay(Duration::from_millis(500)),
    );

    let tools = adapter.create_tools(&[connector.clone()], None).await.unwrap();
    let result = tools[0].invoke(json!({})).await.unwrap();
    assert_eq!(
        result,
        NormalizedResult::Failure("Tool 'crawl' timed out after 20ms".to_string())
    );
}

#[tokio::test]
async fn test_transport_failure_escalates() {
    let adapter = ToolAdapter::new(FunctionBackend::default());
    let connector = shared(
        StaticConnector::new("remote")
            .with_tools(tools_named(["fetch"]))
            .with_response("fetch", Err(CallError::Transport("connection reset".to_string()))),
    );

    let tools = adapter.create_tools(&[connector.clone()], None).await.unwrap();
    let err = tools[0].invoke(json!({})).await.unwrap_err();
    assert_eq!(
        err,
        InvokeError::Transport {
            tool: "fetch".to_string(),
            message: "connection reset".to_string(),
        }
    );
}

#[tokio::test]
async fn test_dropped_connector_escalates() {
    let adapter = ToolAdapter::new(NamespacedBackend);
    let connector = shared(StaticConnector::new("tmp").with_tools(tools_named(["a"])));

    let tools = adapter.create_tools(&[connector.clone()], None).await.unwrap();
    adapter.reset_all();
    drop(connector);

    let err = tools[0].invoke(json!({})).await.unwrap_err();
    assert!(matches!(err, InvokeError::ConnectorDropped { .. }));
}

// ============== 多 connector 聚合 ==============

#[tokio::test]
async fn test_collisions_first_connector_wins() {
    let adapter = ToolAdapter::new(FunctionBackend::default());
    let first = shared(
        StaticConnector::new("primary")
            .with_tools(tools_named(["search", "open"]))
            .with_response("search", Ok(RawResult::text("from primary"))),
    );
    let second = shared(
        StaticConnector::new("secondary")
            .with_tools(tools_named(["search", "close"]))
            .with_response("search", Ok(RawResult::text("from secondary"))),
    );

    let collection = adapter
        .collect_tools(&[first.clone(), second.clone()], None)
        .await
        .unwrap();

    assert_eq!(collection.names(), vec!["search", "open", "close"]);
    assert_eq!(collection.collisions.len(), 1);
    assert_eq!(collection.collisions[0].kept, "primary");
    assert_eq!(collection.collisions[0].dropped, "secondary");
    assert!(!collection.is_complete());

    let search = &collection.tools[0];
    assert_eq!(search.connector_id(), first.id());
    assert_eq!(search.invoke(json!({})).await.unwrap().output(), "from primary");
}

#[tokio::test]
async fn test_namespaced_backend_avoids_collisions() {
    let adapter = ToolAdapter::new(NamespacedBackend);
    let a = shared(StaticConnector::new("a").with_tools(tools_named(["search"])));
    let b = shared(StaticConnector::new("b").with_tools(tools_named(["search"])));

    let collection = adapter.collect_tools(&[a, b], None).await.unwrap();
    assert!(collection.is_complete());
    assert_eq!(collection.names(), vec!["mcp__a__search", "mcp__b__search"]);
}

#[tokio::test]
async fn test_resources_and_prompts_invoke_through_connector() {
    let adapter = ToolAdapter::new(FunctionBackend::default());
    let connector = shared(
        StaticConnector::new("docs")
            .with_resource(ResourceDefinition::new("file:///guide.md", "guide"))
            .with_prompt(PromptDefinition::new("review", "Review a diff").with_argument(
                "diff",
                "Unified diff",
                true,
            ))
            .with_response("file:///guide.md", Ok(RawResult::text("# Guide")))
            .with_response("review", Ok(RawResult::text("Please review"))),
    );

    let tools = adapter.create_tools(&[connector.clone()], None).await.unwrap();
    assert_eq!(names(&tools), vec!["read_guide", "prompt_review"]);

    let guide = tools[0].invoke(json!({})).await.unwrap();
    assert_eq!(guide.output(), "# Guide");
    let prompt = tools[1].invoke(json!({"diff": "+1"})).await.unwrap();
    assert_eq!(prompt.output(), "Please review");

    let schemas = function_schemas(&tools);
    assert_eq!(schemas[1]["function"]["name"], "prompt_review");
    assert_eq!(schemas[1]["function"]["parameters"]["required"], json!(["diff"]));
}

// ============== 配置 ==============

#[tokio::test]
async fn test_adapter_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("toolbridge.yaml");
    std::fs::write(
        &path,
        r#"
adapter:
  chunk_size: 2
  filter:
    deny_patterns: ["admin_.*"]
backend:
  use_prefix: true
"#,
    )
    .unwrap();

    let config = BridgeConfig::load(&path).unwrap();
    let adapter =
        ToolAdapter::with_config(FunctionBackend::new(config.backend), config.adapter).unwrap();
    let connector = shared(
        StaticConnector::new("github").with_tools(tools_named(["list_issues", "admin_purge"])),
    );

    let tools = adapter.create_tools(&[connector.clone()], None).await.unwrap();
    assert_eq!(names(&tools), vec!["github_list_issues"]);
}
