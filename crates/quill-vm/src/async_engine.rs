//! Asynchronous and parallel engine APIs.
//!
//! This module provides async/await compatible APIs for the Quill engine,
//! enabling non-blocking file I/O, and a rayon-backed executor for running
//! compiled programs on many VMs at once.
//!
//! # Features
//!
//! - `async`: [`AsyncEngine`] with tokio file reads
//! - `parallel`: [`ParallelExecutor`] on a rayon thread pool
//!
//! # Example
//!
//! ```ignore
//! use quill_vm::AsyncEngine;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = AsyncEngine::new();
//!     let result = engine.eval_file("script.ql").await.unwrap();
//!     println!("{}", result);
//! }
//! ```

#[cfg(feature = "async")]
use std::path::Path;
#[cfg(feature = "async")]
use std::sync::Arc;

#[cfg(feature = "async")]
use tokio::fs;
#[cfg(feature = "async")]
use tokio::sync::RwLock;

#[cfg(feature = "async")]
use crate::Engine;
use crate::error::Result;
use crate::runtime::value::Value;

/// An asynchronous Quill engine.
///
/// Wraps the synchronous [`Engine`] so it can be shared between tasks.
/// Evaluations are serialized; file reads are not.
#[cfg(feature = "async")]
#[derive(Clone)]
pub struct AsyncEngine {
    /// The underlying engine (thread-safe wrapper)
    engine: Arc<RwLock<Engine>>,
}

#[cfg(feature = "async")]
impl AsyncEngine {
    /// Creates a new async engine.
    pub fn new() -> Self {
        Self::from_engine(Engine::new())
    }

    /// Wraps an existing engine, keeping its state.
    pub fn from_engine(engine: Engine) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
        }
    }

    /// Evaluates Quill source code.
    ///
    /// Parsing, compilation and execution all happen under the write lock.
    pub async fn eval(&self, source: &str) -> Result<Value> {
        let mut engine = self.engine.write().await;
        engine.eval(source)
    }

    /// Evaluates a Quill file.
    ///
    /// Uses tokio's async file I/O for non-blocking reads.
    pub async fn eval_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let source = fs::read_to_string(path.as_ref()).await?;
        self.eval(&source).await
    }

    /// Evaluates several files.
    ///
    /// All files are read concurrently, then evaluated one after another in
    /// the order given. A file that fails to read or run does not stop the
    /// others.
    pub async fn eval_files(&self, paths: &[impl AsRef<Path>]) -> Vec<Result<Value>> {
        let reads = paths.iter().map(|path| fs::read_to_string(path.as_ref()));
        let sources = futures::future::join_all(reads).await;

        let mut results = Vec::with_capacity(sources.len());
        for source in sources {
            results.push(match source {
                Ok(source) => self.eval(&source).await,
                Err(err) => Err(err.into()),
            });
        }
        results
    }
}

#[cfg(feature = "async")]
impl Default for AsyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs independent compilations and executions on a thread pool.
#[cfg(feature = "parallel")]
pub struct ParallelExecutor {
    /// Thread pool for CPU-bound work
    pool: rayon::ThreadPool,
}

#[cfg(feature = "parallel")]
impl ParallelExecutor {
    /// Creates a new parallel executor with the default number of threads.
    pub fn new() -> std::result::Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new().build()?;
        Ok(Self { pool })
    }

    /// Creates a parallel executor with a specific number of threads.
    pub fn with_threads(
        num_threads: usize,
    ) -> std::result::Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;
        Ok(Self { pool })
    }

    /// Compiles multiple sources in parallel, each as its own program.
    pub fn compile_parallel(&self, sources: &[&str]) -> Vec<Result<crate::compiler::Bytecode>> {
        use rayon::prelude::*;

        self.pool.install(|| {
            sources
                .par_iter()
                .map(|source| {
                    let program = crate::parser::Parser::new(source).parse_program()?;
                    let mut compiler = crate::compiler::Compiler::new();
                    Ok(compiler.compile(&program)?)
                })
                .collect()
        })
    }

    /// Runs one compiled program on `instances` independent VMs.
    ///
    /// Every VM starts from fresh globals; results are in instance order.
    pub fn run_parallel(
        &self,
        bytecode: &crate::compiler::Bytecode,
        instances: usize,
        config: crate::config::VmConfig,
    ) -> Vec<Result<Value>> {
        use rayon::prelude::*;

        self.pool.install(|| {
            (0..instances)
                .into_par_iter()
                .map(|_| {
                    let mut vm = crate::vm::VM::with_config(bytecode.clone(), config);
                    vm.run()?;
                    Ok(vm.last_popped())
                })
                .collect()
        })
    }
}
