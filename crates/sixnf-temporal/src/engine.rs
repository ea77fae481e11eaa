//! The interception facade implementing `ITemporalEngine`.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use sixnf_core::config::{SixnfConfig, TemporalConfig};
use sixnf_core::errors::SixnfResult;
use sixnf_core::models::{
    physical, CatalogEntry, ExecOutcome, Params, StatementIntent, Timestamp, TransactionControl,
};
use sixnf_core::traits::{ICatalogStore, ISqlEngine, ITemporalEngine};
use sixnf_storage::SqliteEngine;

use crate::catalog::SchemaCatalog;
use crate::classifier::Classifier;
use crate::clock::TransactionClock;
use crate::normalizer;
use crate::parser::split_statements;
use crate::pipeline::WritePipeline;
use crate::translator::rewrite_select;

/// Intercepts SQL for registered temporal tables and forwards everything
/// else to the underlying engine.
///
/// Owns its catalog cache and transaction clock; two engines over the same
/// database share persisted definitions but not timestamps.
pub struct TemporalEngine {
    pub(crate) engine: Arc<dyn ISqlEngine>,
    pub(crate) catalog: SchemaCatalog,
    pub(crate) classifier: Classifier,
    pub(crate) clock: TransactionClock,
    pub(crate) config: TemporalConfig,
}

impl TemporalEngine {
    pub fn new<E>(engine: Arc<E>, config: TemporalConfig) -> Self
    where
        E: ISqlEngine + ICatalogStore + 'static,
    {
        let catalog = SchemaCatalog::new(engine.clone(), config.catalog_cache_capacity);
        Self {
            engine,
            catalog,
            classifier: Classifier::new(),
            clock: TransactionClock::new(),
            config,
        }
    }

    /// Open a SQLite-backed engine from configuration.
    pub fn open(config: &SixnfConfig) -> SixnfResult<Self> {
        let engine = Arc::new(SqliteEngine::open(&config.storage)?);
        Ok(Self::new(engine, config.temporal.clone()))
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// The wrapped engine, for statements that must bypass interception.
    pub fn sql_engine(&self) -> &dyn ISqlEngine {
        self.engine.as_ref()
    }

    fn passthrough(&self, sql: &str, params: &Params) -> SixnfResult<ExecOutcome> {
        self.engine.execute(sql, params)
    }

    fn control(&self, control: &TransactionControl) -> SixnfResult<()> {
        match control {
            TransactionControl::Begin => {
                self.engine.begin()?;
                self.clock.begin()
            }
            TransactionControl::Commit => {
                self.engine.commit()?;
                self.clock.commit()
            }
            TransactionControl::Rollback => {
                self.engine.rollback()?;
                self.clock.rollback()?;
                self.catalog.invalidate();
                warn!("transaction rolled back");
                Ok(())
            }
            TransactionControl::Savepoint(name) => {
                self.engine.savepoint(name)?;
                self.clock.savepoint(name)
            }
            TransactionControl::Release(name) => {
                self.engine.release(name)?;
                self.clock.release(name).map(|_| ())
            }
            TransactionControl::RollbackTo(name) => {
                self.engine.rollback_to(name)?;
                self.clock.rollback_to(name)?;
                self.catalog.invalidate();
                Ok(())
            }
        }
    }

    /// Run one intent's writes atomically at the transaction timestamp.
    ///
    /// Outside a transaction the intent gets its own; inside one it runs in
    /// a fresh savepoint that is rolled back if any step fails.
    fn write<T>(&self, f: impl FnOnce(Timestamp) -> SixnfResult<T>) -> SixnfResult<T> {
        let implicit = self.engine.is_autocommit()?;
        let savepoint = if implicit {
            self.control(&TransactionControl::Begin)?;
            None
        } else if self.config.intent_savepoints {
            let name = format!("{}{}", physical::PREFIX, Uuid::new_v4().simple());
            self.control(&TransactionControl::Savepoint(name.clone()))?;
            Some(name)
        } else {
            None
        };

        match self.clock.now(self.engine.as_ref()).and_then(f) {
            Ok(value) => {
                if implicit {
                    self.control(&TransactionControl::Commit)?;
                } else if let Some(name) = savepoint {
                    self.control(&TransactionControl::Release(name))?;
                }
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "intent failed, undoing its writes");
                let undo = if implicit {
                    self.control(&TransactionControl::Rollback)
                } else if let Some(name) = savepoint {
                    self.control(&TransactionControl::RollbackTo(name.clone()))
                        .and_then(|_| self.control(&TransactionControl::Release(name)))
                } else {
                    Ok(())
                };
                self.catalog.invalidate();
                if let Err(undo_err) = undo {
                    warn!(error = %undo_err, "undo after failed intent also failed");
                }
                Err(err)
            }
        }
    }

    fn pipeline(&self) -> WritePipeline<'_> {
        WritePipeline::new(self.engine.as_ref(), &self.catalog, &self.config)
    }

    fn dispatch(&self, intent: StatementIntent, sql: &str, params: &Params) -> SixnfResult<ExecOutcome> {
        let entry = match intent.target() {
            Some(target) if !matches!(intent, StatementIntent::CreateTable(_)) => {
                match self.catalog.lookup(&target.name)? {
                    Some(entry) => Some(entry),
                    None => return self.passthrough(sql, params),
                }
            }
            _ => None,
        };

        match (intent, entry) {
            (StatementIntent::Transaction(control), _) => {
                self.control(&control)?;
                Ok(ExecOutcome::Affected(0))
            }
            (StatementIntent::CreateTable(create), _) if create.is_temporal() => {
                self.write(|_| {
                    if let Some(plan) = normalizer::normalize(self.engine.as_ref(), &self.catalog, &create)? {
                        normalizer::execute_plan(self.engine.as_ref(), &plan)?;
                    }
                    Ok(())
                })?;
                Ok(ExecOutcome::Affected(0))
            }
            (StatementIntent::Insert(insert), Some(entry)) => {
                let rows = self.write(|now| self.pipeline().insert(&entry, &insert, params, now))?;
                Ok(ExecOutcome::Affected(rows))
            }
            (StatementIntent::Update(update), Some(entry)) => {
                let rows = self.write(|now| self.pipeline().update(&entry, &update, params, now))?;
                Ok(ExecOutcome::Affected(rows))
            }
            (StatementIntent::Delete(delete), Some(entry)) => {
                let rows = self.write(|now| self.pipeline().delete(&entry, &delete, params, now))?;
                Ok(ExecOutcome::Affected(rows))
            }
            (StatementIntent::Select(select), Some(entry)) => {
                match rewrite_select(self.engine.as_ref(), &entry, &select, params)? {
                    Some(bound) => self.engine.execute(&bound.sql, &bound.params),
                    None => self.passthrough(sql, params),
                }
            }
            _ => self.passthrough(sql, params),
        }
    }
}

impl ITemporalEngine for TemporalEngine {
    fn execute_intercepted(&self, sql: &str, params: &Params) -> SixnfResult<ExecOutcome> {
        let intent = self.classifier.classify(sql);
        debug!(kind = intent.kind(), "intercepted statement");
        self.dispatch(intent, sql, params)
    }

    fn execute_script(&self, sql: &str) -> SixnfResult<Vec<ExecOutcome>> {
        split_statements(sql)
            .into_iter()
            .filter(|statement| !statement.trim().is_empty())
            .map(|statement| self.execute_intercepted(statement, &Params::None))
            .collect()
    }

    fn normalize_existing_table(&self, name: &str) -> SixnfResult<CatalogEntry> {
        let entry = self.write(|now| {
            normalizer::normalize_existing_table(self.engine.as_ref(), &self.catalog, &self.config, name, now)
        })?;
        Ok(CatalogEntry::clone(&entry))
    }

    fn normalize_all_existing_tables(&self) -> SixnfResult<Vec<CatalogEntry>> {
        let entries = self.write(|now| {
            normalizer::normalize_all_existing_tables(self.engine.as_ref(), &self.catalog, &self.config, now)
        })?;
        info!(tables = entries.len(), "normalized existing tables");
        Ok(entries.iter().map(|e| CatalogEntry::clone(e)).collect())
    }

    fn begin(&self) -> SixnfResult<()> {
        self.control(&TransactionControl::Begin)
    }

    fn commit(&self) -> SixnfResult<()> {
        self.control(&TransactionControl::Commit)
    }

    fn rollback(&self) -> SixnfResult<()> {
        self.control(&TransactionControl::Rollback)
    }

    fn savepoint(&self, name: &str) -> SixnfResult<()> {
        self.control(&TransactionControl::Savepoint(name.to_string()))
    }

    fn release(&self, name: &str) -> SixnfResult<()> {
        self.control(&TransactionControl::Release(name.to_string()))
    }

    fn rollback_to(&self, name: &str) -> SixnfResult<()> {
        self.control(&TransactionControl::RollbackTo(name.to_string()))
    }
}
