//! 成绩表缓存
//!
//! 共享缓存中每个学期一个 `NotesTable`，另有按评测缓存的成绩和已渲染的成绩单。
//! 请求内的 `RequestScope` 保证同一请求看到同一份快照。
//! 后端读错误按未命中处理，写错误只记录日志。

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::ObjectCache;
use crate::config::AppConfig;
use crate::errors::{Result, ScoDocError};
use crate::models::Score;
use crate::notes::NotesSettings;
use crate::notes::loader::{EvaluationScores, SemesterData};
use crate::notes::table::NotesTable;
use crate::storage::ScoreStore;

/// 成绩单版本白名单
pub const BULLETIN_VERSIONS: &[&str] = &["short", "selectedevals", "long"];

/// 一次请求（或一个工作单元）内的缓存状态
pub struct RequestScope {
    id: Uuid,
    tables: Mutex<HashMap<i64, Arc<NotesTable>>>,
    /// `Some` 表示处于延迟失效模式；集合中 `None` 代表全部学期
    deferred: Mutex<Option<BTreeSet<Option<i64>>>>,
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestScope {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            tables: Mutex::new(HashMap::new()),
            deferred: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn cached(&self, semester_id: i64) -> Option<Arc<NotesTable>> {
        self.tables
            .lock()
            .expect("request scope lock poisoned")
            .get(&semester_id)
            .cloned()
    }

    fn keep(&self, semester_id: i64, table: Arc<NotesTable>) {
        self.tables
            .lock()
            .expect("request scope lock poisoned")
            .insert(semester_id, table);
    }

    fn forget(&self, semester_ids: &[i64]) {
        let mut tables = self.tables.lock().expect("request scope lock poisoned");
        for id in semester_ids {
            tables.remove(id);
        }
    }

    fn forget_all(&self) {
        self.tables
            .lock()
            .expect("request scope lock poisoned")
            .clear();
    }

    /// 进入延迟失效模式；已在该模式中时返回 false
    pub fn begin_deferred(&self) -> bool {
        let mut deferred = self.deferred.lock().expect("request scope lock poisoned");
        if deferred.is_some() {
            return false;
        }
        *deferred = Some(BTreeSet::new());
        true
    }

    pub fn is_deferring(&self) -> bool {
        self.deferred
            .lock()
            .expect("request scope lock poisoned")
            .is_some()
    }

    /// 延迟模式下记录失效请求并返回 true
    fn defer(&self, semester_id: Option<i64>) -> bool {
        match self
            .deferred
            .lock()
            .expect("request scope lock poisoned")
            .as_mut()
        {
            Some(pending) => {
                pending.insert(semester_id);
                true
            }
            None => false,
        }
    }

    fn take_deferred(&self) -> Option<BTreeSet<Option<i64>>> {
        self.deferred
            .lock()
            .expect("request scope lock poisoned")
            .take()
    }
}

/// 成绩表缓存客户端，按院系（department）划分命名空间
pub struct ResultCache {
    backend: Arc<dyn ObjectCache>,
    store: Arc<dyn ScoreStore>,
    department: String,
    settings: NotesSettings,
    /// 评测成绩缓存的 TTL（秒）
    scores_ttl: u64,
    bulletin_ttl: u64,
}

impl ResultCache {
    pub fn new(
        backend: Arc<dyn ObjectCache>,
        store: Arc<dyn ScoreStore>,
        department: impl Into<String>,
        settings: NotesSettings,
    ) -> Self {
        Self {
            backend,
            store,
            department: department.into(),
            settings,
            scores_ttl: 0,
            bulletin_ttl: 12 * 60 * 60,
        }
    }

    pub fn with_ttls(mut self, scores_ttl: u64, bulletin_ttl: u64) -> Self {
        self.scores_ttl = scores_ttl;
        self.bulletin_ttl = bulletin_ttl;
        self
    }

    pub fn from_config(
        backend: Arc<dyn ObjectCache>,
        store: Arc<dyn ScoreStore>,
        config: &AppConfig,
    ) -> Result<Self> {
        let settings = NotesSettings::from_config(&config.notes)?;
        Ok(
            Self::new(backend, store, config.app.department.clone(), settings)
                .with_ttls(config.cache.default_ttl, config.cache.bulletin_ttl),
        )
    }

    pub fn store(&self) -> &Arc<dyn ScoreStore> {
        &self.store
    }

    pub fn settings(&self) -> &NotesSettings {
        &self.settings
    }

    fn tenant_prefix(&self) -> String {
        format!("{}_", self.department)
    }

    fn table_key(&self, semester_id: i64) -> String {
        format!("{}_NT_{}", self.department, semester_id)
    }

    fn scores_key(&self, evaluation_id: i64) -> String {
        format!("{}_EVAL_{}", self.department, evaluation_id)
    }

    fn bulletin_key(&self, semester_id: i64, version: &str) -> String {
        format!("{}_SBPDF_{}_{}", self.department, semester_id, version)
    }

    /// 获取学期成绩表：请求内副本 → 共享缓存 → 重新计算
    pub async fn get(&self, scope: &RequestScope, semester_id: i64) -> Result<Arc<NotesTable>> {
        if let Some(table) = scope.cached(semester_id) {
            return Ok(table);
        }

        let key = self.table_key(semester_id);
        if let Some(raw) = self.backend.get_raw(&key).await.found() {
            match serde_json::from_str::<NotesTable>(&raw) {
                Ok(table) => {
                    debug!("NotesTable cache hit for {}", key);
                    let table = Arc::new(table);
                    scope.keep(semester_id, table.clone());
                    return Ok(table);
                }
                Err(e) => warn!("Discarding undecodable cache entry {}: {}", key, e),
            }
        }

        debug!("NotesTable cache miss for {} (request {})", key, scope.id());
        let data = SemesterData::load(self.store.as_ref(), &CachedScores(self), semester_id).await?;
        let table = Arc::new(NotesTable::compute(data, &self.settings)?);

        match serde_json::to_string(table.as_ref()) {
            Ok(raw) => {
                if let Err(e) = self.backend.insert_raw(key.clone(), raw, 0).await {
                    warn!("Failed to store {} in shared cache: {}", key, e);
                }
            }
            Err(e) => warn!("Failed to serialize NotesTable {}: {}", key, e),
        }
        scope.keep(semester_id, table.clone());
        Ok(table)
    }

    /// 评测成绩，优先读缓存
    pub async fn evaluation_scores(&self, evaluation_id: i64) -> Result<Arc<HashMap<i64, Score>>> {
        let key = self.scores_key(evaluation_id);
        if let Some(raw) = self.backend.get_raw(&key).await.found() {
            if let Ok(scores) = serde_json::from_str::<HashMap<i64, Score>>(&raw) {
                return Ok(Arc::new(scores));
            }
        }
        let scores = self.store.get_scores(evaluation_id).await?;
        match serde_json::to_string(&scores) {
            Ok(raw) => {
                if let Err(e) = self.backend.insert_raw(key.clone(), raw, self.scores_ttl).await {
                    warn!("Failed to store {} in shared cache: {}", key, e);
                }
            }
            Err(e) => warn!("Failed to serialize scores {}: {}", key, e),
        }
        Ok(Arc::new(scores))
    }

    fn check_version(version: &str) -> Result<()> {
        if BULLETIN_VERSIONS.contains(&version) {
            Ok(())
        } else {
            Err(ScoDocError::validation(format!(
                "invalid bulletin version '{version}'"
            )))
        }
    }

    /// 已渲染的学期成绩单
    pub async fn get_bulletin(&self, semester_id: i64, version: &str) -> Result<Option<String>> {
        Self::check_version(version)?;
        Ok(self
            .backend
            .get_raw(&self.bulletin_key(semester_id, version))
            .await
            .found())
    }

    pub async fn put_bulletin(&self, semester_id: i64, version: &str, document: String) -> Result<()> {
        Self::check_version(version)?;
        let key = self.bulletin_key(semester_id, version);
        if let Err(e) = self.backend.insert_raw(key.clone(), document, self.bulletin_ttl).await {
            warn!("Failed to store {} in shared cache: {}", key, e);
        }
        Ok(())
    }

    /// 学期 `semester_id` 以及所有（传递地）资本化了它的 UE 的学期
    pub async fn dependent_semesters(&self, semester_id: i64) -> Result<Vec<i64>> {
        let mut seen = BTreeSet::from([semester_id]);
        let mut order = vec![semester_id];
        let mut queue = VecDeque::from([semester_id]);
        while let Some(current) = queue.pop_front() {
            for user in self
                .store
                .list_semesters_using_capitalized_ues_from(current)
                .await?
            {
                if seen.insert(user) {
                    order.push(user);
                    queue.push_back(user);
                }
            }
        }
        Ok(order)
    }

    /// 使学期（`None` 为全部学期）的缓存失效
    ///
    /// 处于延迟模式时只记录请求，由 `run_deferred` 统一执行。
    pub async fn invalidate(&self, scope: &RequestScope, semester_id: Option<i64>) -> Result<()> {
        if scope.defer(semester_id) {
            debug!("Deferring invalidation of {:?}", semester_id);
            return Ok(());
        }
        self.invalidate_now(scope, semester_id).await
    }

    async fn invalidate_now(&self, scope: &RequestScope, semester_id: Option<i64>) -> Result<()> {
        let Some(semester_id) = semester_id else {
            // 清空本租户的全部缓存，包括已删除的学期和评测留下的条目
            info!("Invalidating all cached results of {}", self.department);
            self.backend.remove_prefixed(&self.tenant_prefix()).await;
            scope.forget_all();
            return Ok(());
        };

        let semester_ids = self.dependent_semesters(semester_id).await?;
        info!(
            "Invalidating cached results of semesters {:?} ({})",
            semester_ids, self.department
        );

        let mut keys = Vec::new();
        for &id in &semester_ids {
            keys.push(self.table_key(id));
            for module in self.store.list_modules(id).await? {
                for evaluation in self.store.list_evaluations(module.id).await? {
                    keys.push(self.scores_key(evaluation.id));
                }
            }
            keys.extend(BULLETIN_VERSIONS.iter().map(|v| self.bulletin_key(id, v)));
        }
        self.backend.remove_many(&keys).await;
        scope.forget(&semester_ids);
        Ok(())
    }

    /// 只使已渲染的成绩单失效
    pub async fn invalidate_bulletins(&self, semester_id: i64) -> Result<()> {
        let semester_ids = self.dependent_semesters(semester_id).await?;
        let keys: Vec<String> = semester_ids
            .iter()
            .flat_map(|&id| BULLETIN_VERSIONS.iter().map(move |v| (id, *v)))
            .map(|(id, v)| self.bulletin_key(id, v))
            .collect();
        self.backend.remove_many(&keys).await;
        Ok(())
    }

    /// 结束延迟模式，去重后执行记录的失效请求
    pub async fn run_deferred(&self, scope: &RequestScope) -> Result<()> {
        let Some(pending) = scope.take_deferred() else {
            return Ok(());
        };
        if pending.contains(&None) {
            return self.invalidate_now(scope, None).await;
        }
        for semester_id in pending.into_iter().flatten() {
            self.invalidate_now(scope, Some(semester_id)).await?;
        }
        Ok(())
    }
}

/// 经由 `ResultCache` 读取评测成绩
struct CachedScores<'a>(&'a ResultCache);

#[async_trait]
impl EvaluationScores for CachedScores<'_> {
    async fn scores_for(&self, evaluation_id: i64) -> Result<Arc<HashMap<i64, Score>>> {
        self.0.evaluation_scores(evaluation_id).await
    }
}
