//! The responder server: wired responders, their path table and the engine.

use audit_engine::{
    AuditLevel, AuditScope, AuditSink, AuditStatus, APPLICATION_NAME, EVENT_SHUTDOWN, EVENT_START,
};
use futures::future::join_all;
use ocsp_api::{StatusStore, StoreFactoryRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::codec::OcspCodec;
use crate::config::OcspServerConf;
use crate::engine::{DeliveryMode, OcspEngine, OcspRespWithCacheInfo};
use crate::error::Result;
use crate::responder::{HealthCheckResult, Responder};
use crate::routing::PathTable;
use crate::wiring::{wire, Wired};

pub struct OcspServer {
    engine: OcspEngine,
    responders: Vec<Arc<Responder>>,
    paths: PathTable,
    stores: Vec<Arc<dyn StatusStore>>,
}

impl OcspServer {
    /// Wires the configuration, starts cache maintenance and audits `START`.
    ///
    /// # Errors
    /// Returns the first configuration or initialisation error. Nothing is
    /// left running when start-up fails.
    pub async fn start(
        conf: &OcspServerConf,
        registry: &StoreFactoryRegistry,
        codec: Arc<dyn OcspCodec>,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> Result<Self> {
        let Wired {
            responders,
            paths,
            stores,
            cache,
        } = match wire(conf, registry).await {
            Ok(wired) => wired,
            Err(e) => {
                audit_lifecycle(audit.as_ref(), EVENT_START, 0, Some(&e.to_string()));
                return Err(e);
            }
        };

        let engine = OcspEngine::new(codec, cache.clone(), audit.clone(), conf.store_timeout());
        let engine = match engine {
            Ok(engine) => engine,
            Err(e) => {
                if let Some(cache) = &cache {
                    cache.shutdown();
                }
                for store in &stores {
                    store.shutdown().await;
                }
                let reason = e.to_string();
                audit_lifecycle(audit.as_ref(), EVENT_START, responders.len(), Some(&reason));
                return Err(e);
            }
        };
        if let (Some(cache), Some(cache_conf)) = (&cache, &conf.response_cache) {
            cache.spawn_maintenance(Duration::from_secs(cache_conf.maintenance_interval_seconds));
        }

        let server = Self::new(engine, responders, paths, stores);
        audit_lifecycle(server.engine.audit_sink(), EVENT_START, server.responders.len(), None);
        info!(
            responders = server.responders.len(),
            paths = ?server.paths.paths().collect::<Vec<_>>(),
            "OCSP server started"
        );
        Ok(server)
    }

    /// Assembles a server from already built parts.
    pub fn new(
        engine: OcspEngine,
        responders: Vec<Arc<Responder>>,
        paths: PathTable,
        stores: Vec<Arc<dyn StatusStore>>,
    ) -> Self {
        Self {
            engine,
            responders,
            paths,
            stores,
        }
    }

    pub fn engine(&self) -> &OcspEngine {
        &self.engine
    }

    pub fn responders(&self) -> &[Arc<Responder>] {
        &self.responders
    }

    /// Responder mounted at the longest prefix of `path`.
    pub fn responder_for_path(&self, path: &str) -> Option<&Arc<Responder>> {
        self.paths
            .resolve(path)
            .and_then(|index| self.responders.get(index))
    }

    pub fn responder(&self, name: &str) -> Option<&Arc<Responder>> {
        self.responders.iter().find(|responder| responder.name() == name)
    }

    /// Answers a request received under `path`; `None` when no responder is
    /// mounted there.
    pub async fn answer(
        &self,
        path: &str,
        request: &[u8],
        delivery: DeliveryMode,
    ) -> Option<OcspRespWithCacheInfo> {
        let Some(responder) = self.responder_for_path(path) else {
            warn!(path = %path, "No responder mounted for path");
            return None;
        };
        Some(self.engine.answer(responder, request, delivery).await)
    }

    pub async fn health(&self) -> HealthCheckResult {
        let mut children =
            join_all(self.responders.iter().map(|responder| responder.health())).await;
        if let Some(cache) = self.engine.cache() {
            children.push(HealthCheckResult::leaf("response-cache", cache.is_healthy().await));
        }
        HealthCheckResult {
            name: APPLICATION_NAME.to_string(),
            healthy: children.iter().all(|child| child.healthy),
            children,
        }
    }

    /// Stops cache maintenance, shuts every store down and audits `SHUTDOWN`.
    pub async fn shutdown(&self) {
        if let Some(cache) = self.engine.cache() {
            cache.shutdown();
        }
        for store in &self.stores {
            store.shutdown().await;
        }
        audit_lifecycle(self.engine.audit_sink(), EVENT_SHUTDOWN, self.responders.len(), None);
        info!("OCSP server shut down");
    }
}

/// Records a lifecycle event; `failure` carries the reason start-up failed.
fn audit_lifecycle(
    sink: Option<&Arc<dyn AuditSink>>,
    event: &str,
    responders: usize,
    failure: Option<&str>,
) {
    let Some(sink) = sink else {
        return;
    };
    let mut audit = AuditScope::new(Arc::clone(sink), APPLICATION_NAME, event);
    audit.add("responders", responders);
    match failure {
        Some(reason) => audit.fill(AuditLevel::Error, AuditStatus::Failed, Some(reason)),
        None => audit.fill(AuditLevel::Info, AuditStatus::Successful, None),
    }
}
