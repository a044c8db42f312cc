//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - `expect_tasks()` で期待される task type を登録
//! - `build()` 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - 不足があれば BuildError を返す（未知の task type で実行時に FAILED になる前に気付ける）

use std::sync::Arc;

use crate::app::analysis_commands::AnalysisCommands;
use crate::app::build_commands::BuildCommands;
use crate::app::dispatcher::TaskDispatcher;
use crate::app::executor::MonoTaskExecutor;
use crate::app::handlers::{
    AnalyzeCommitsHandler, AnalyzeCommitsTask, AnalyzeRepositoryHandler, AnalyzeRepositoryTask,
};
use crate::app::maintenance::MaintenanceSweeps;
use crate::app::scheduler::PeriodicJob;
use crate::app::task_commands::TaskCommands;
use crate::config::ScaConfig;
use crate::impls::InMemoryStore;
use crate::ports::{
    AnalysisStore, BuildRunner, Clock, RepositoryCatalog, ResultStore, TaskStore,
};
use crate::typed::{Handler, RegistryError, Task, TypedRegistry};

/// Task types every deployment is expected to handle.
pub const DEFAULT_TASK_TYPES: [&str; 2] = [AnalyzeCommitsTask::TYPE, AnalyzeRepositoryTask::TYPE];

/// External collaborators the app is wired against.
#[derive(Clone)]
pub struct Services {
    pub tasks: Arc<dyn TaskStore>,
    pub analyses: Arc<dyn AnalysisStore>,
    pub results: Arc<dyn ResultStore>,
    pub repositories: Arc<dyn RepositoryCatalog>,
    pub builds: Arc<dyn BuildRunner>,
    pub clock: Arc<dyn Clock>,
}

impl Services {
    /// Every store port backed by one in-memory store.
    pub fn in_memory(
        store: Arc<InMemoryStore>,
        builds: Arc<dyn BuildRunner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks: store.clone(),
            analyses: store.clone(),
            results: store.clone(),
            repositories: store,
            builds,
            clock,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task types: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),
}

pub struct AppBuilder {
    services: Services,
    config: ScaConfig,
    registry: TypedRegistry,
    expected_tasks: Option<Vec<String>>,
}

impl AppBuilder {
    pub fn new(services: Services, config: ScaConfig) -> Self {
        Self {
            services,
            config,
            registry: TypedRegistry::new(),
            expected_tasks: None,
        }
    }

    pub fn task_commands(&self) -> TaskCommands {
        TaskCommands::new(self.services.tasks.clone(), self.services.clock.clone())
    }

    pub fn analysis_commands(&self) -> AnalysisCommands {
        AnalysisCommands::new(
            self.services.analyses.clone(),
            self.services.results.clone(),
            self.services.tasks.clone(),
            self.services.clock.clone(),
        )
    }

    pub fn build_commands(&self) -> BuildCommands {
        BuildCommands::new(self.services.builds.clone())
    }

    /// Registers the `analyze_commits` and `analyze_repository` handlers.
    pub fn with_default_handlers(self) -> Result<Self, RegistryError> {
        let commits = AnalyzeCommitsHandler::new(
            self.build_commands(),
            self.services.repositories.clone(),
            self.task_commands(),
            self.config.sampling.max_years,
        );
        let repository = AnalyzeRepositoryHandler::new(
            self.build_commands(),
            self.analysis_commands(),
            self.services.results.clone(),
            self.config.ingestion.bulk_chunk_size,
        );

        self.register::<AnalyzeCommitsTask, _>(commits)?
            .register::<AnalyzeRepositoryTask, _>(repository)
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<T, H>(handler)?;
        Ok(self)
    }

    pub fn expect_tasks(mut self, task_types: &[&str]) -> Self {
        self.expected_tasks = Some(task_types.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected) = &self.expected_tasks {
            let missing: Vec<String> = expected
                .iter()
                .filter(|t| !self.registry.contains(t))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingTaskTypes(missing));
            }
        }

        let task_commands = self.task_commands();
        let analysis_commands = self.analysis_commands();
        let dispatcher = Arc::new(TaskDispatcher::new(Arc::new(self.registry)));

        let executor = Arc::new(MonoTaskExecutor::new(
            task_commands.clone(),
            dispatcher.clone(),
            self.config.executor.clone(),
        ));
        let maintenance = Arc::new(MaintenanceSweeps::new(
            self.services.analyses.clone(),
            analysis_commands.clone(),
            task_commands.clone(),
            self.services.clock.clone(),
            self.config.maintenance.clone(),
        ));

        Ok(App {
            executor,
            maintenance,
            dispatcher,
            task_commands,
            analysis_commands,
        })
    }
}

pub struct App {
    executor: Arc<MonoTaskExecutor>,
    maintenance: Arc<MaintenanceSweeps>,
    dispatcher: Arc<TaskDispatcher>,
    task_commands: TaskCommands,
    analysis_commands: AnalysisCommands,
}

impl App {
    pub fn executor(&self) -> &Arc<MonoTaskExecutor> {
        &self.executor
    }

    pub fn maintenance(&self) -> &Arc<MaintenanceSweeps> {
        &self.maintenance
    }

    pub fn task_commands(&self) -> &TaskCommands {
        &self.task_commands
    }

    pub fn analysis_commands(&self) -> &AnalysisCommands {
        &self.analysis_commands
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.dispatcher.registry().registered_types()
    }

    /// Starts the executor and the maintenance sweeps.
    pub fn start(&self) -> RunningApp {
        let mut jobs = vec![self.executor.start()];
        jobs.extend(self.maintenance.start());
        RunningApp { jobs }
    }
}

/// Handle over every started timer.
pub struct RunningApp {
    jobs: Vec<PeriodicJob>,
}

impl RunningApp {
    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(PeriodicJob::name).collect()
    }

    pub async fn shutdown_and_join(self) {
        for job in &self.jobs {
            job.request_shutdown();
        }
        for job in self.jobs {
            job.shutdown_and_join().await;
        }
    }
}
