//! Turns an [`OcspServerConf`] into live, fully-resolved responders.
//!
//! Wiring runs in two passes. The first checks every named object in
//! isolation (unique names, responder name charset). The second resolves
//! the references between them and instantiates stores, signers and the
//! response cache. The first problem found aborts start-up.

use ocsp_api::{
    CertprofileOption, DatasourceConf, HashAlgorithm, StatusStore, StoreContext,
    StoreFactoryRegistry, StoreSettings,
};
use response_cache::{CacheBackend, InMemoryCacheBackend, PgCacheBackend, ResponseCache};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{
    CacheBackendKind, FileOrValue, OcspServerConf, ResponseCacheConf, SignerConf, StoreConf,
};
use crate::error::{ResponderError, Result};
use crate::options::{EmbedCertsMode, RequestOption, ResponderOption, ResponseOption};
use crate::responder::{AuditOption, Responder};
use crate::routing::PathTable;
use crate::signer::{ConcurrentSigner, ResponderSigner};

/// Everything the server needs at request time.
pub struct Wired {
    pub responders: Vec<Arc<Responder>>,
    pub paths: PathTable,
    pub stores: Vec<Arc<dyn StatusStore>>,
    pub cache: Option<Arc<ResponseCache>>,
}

/// # Errors
/// Returns the first configuration problem found.
pub async fn wire(conf: &OcspServerConf, registry: &StoreFactoryRegistry) -> Result<Wired> {
    check_names(conf)?;
    if let Some(cache_conf) = &conf.response_cache {
        cache_conf.validate()?;
    }

    let signers = index("signer", conf.signers.iter().map(|c| (c.name.as_str(), c)))?;
    let stores = index("store", conf.stores.iter().map(|c| (c.name.as_str(), c)))?;
    let datasources = index("datasource", conf.datasources.iter().map(|c| (c.name.as_str(), c)))?;

    let mut request_options: HashMap<&str, Arc<RequestOption>> = HashMap::new();
    for option in &conf.request_options {
        request_options.insert(option.name.as_str(), Arc::new(option.build()?));
    }
    let response_options: HashMap<&str, Arc<ResponseOption>> = conf
        .response_options
        .iter()
        .map(|c| (c.name.as_str(), Arc::new(c.option.clone())))
        .collect();
    let audit_options: HashMap<&str, Arc<AuditOption>> = conf
        .audit_options
        .iter()
        .map(|c| (c.name.as_str(), Arc::new(c.build())))
        .collect();
    let certprofile_options: HashMap<&str, Arc<CertprofileOption>> = conf
        .certprofile_options
        .iter()
        .map(|c| (c.name.as_str(), Arc::new(c.option.clone())))
        .collect();

    // Resolve every reference before anything is instantiated.
    let mut cert_hash_algorithms: HashMap<&str, BTreeSet<HashAlgorithm>> = HashMap::new();
    for responder in &conf.responders {
        let lookup = |kind: &'static str, name: &str, found: bool| {
            if found {
                Ok(())
            } else {
                Err(ResponderError::UndefinedReference {
                    kind,
                    name: name.to_string(),
                    responder: responder.name.clone(),
                })
            }
        };
        lookup("signer", &responder.signer, signers.contains_key(responder.signer.as_str()))?;
        lookup(
            "request option",
            &responder.request_option,
            request_options.contains_key(responder.request_option.as_str()),
        )?;
        lookup(
            "response option",
            &responder.response_option,
            response_options.contains_key(responder.response_option.as_str()),
        )?;
        if let Some(name) = &responder.audit_option {
            lookup("audit option", name, audit_options.contains_key(name.as_str()))?;
        }
        if let Some(name) = &responder.certprofile_option {
            lookup("certprofile option", name, certprofile_options.contains_key(name.as_str()))?;
        }
        if responder.stores.is_empty() {
            return Err(ResponderError::InvalidConf(format!(
                "responder {} references no store",
                responder.name
            )));
        }
        for store in &responder.stores {
            lookup("store", store, stores.contains_key(store.as_str()))?;
        }

        let response_option = response_options
            .get(responder.response_option.as_str())
            .map(Arc::clone)
            .unwrap_or_default();
        let required = required_cert_hash_algorithms(
            &response_option,
            request_options.get(responder.request_option.as_str()).map(Arc::as_ref),
        );
        for store in &responder.stores {
            cert_hash_algorithms
                .entry(store.as_str())
                .or_default()
                .extend(required.iter().copied());
        }
    }

    // Stores created before a later step fails are shut down again.
    let mut live_stores: HashMap<&str, Arc<dyn StatusStore>> = HashMap::new();
    let assembled = async {
        for store_conf in &conf.stores {
            let Some(algorithms) = cert_hash_algorithms.remove(store_conf.name.as_str()) else {
                warn!(store = %store_conf.name, "Store is not referenced by any responder, skipping");
                continue;
            };
            let store = create_store(store_conf, algorithms, &datasources, registry).await?;
            live_stores.insert(store_conf.name.as_str(), store);
        }

        let mut live_signers: HashMap<&str, Arc<ResponderSigner>> = HashMap::new();
        for responder in &conf.responders {
            if live_signers.contains_key(responder.signer.as_str()) {
                continue;
            }
            if let Some(signer_conf) = signers.get(responder.signer.as_str()) {
                let signer = build_signer(signer_conf)?;
                live_signers.insert(responder.signer.as_str(), Arc::new(signer));
            }
        }
        for signer in &conf.signers {
            if !live_signers.contains_key(signer.name.as_str()) {
                warn!(signer = %signer.name, "Signer is not referenced by any responder, skipping");
            }
        }

        let mut responders = Vec::with_capacity(conf.responders.len());
        let mut mounts = Vec::new();
        for (index, responder_conf) in conf.responders.iter().enumerate() {
            let missing = |kind: &'static str, name: &str| ResponderError::UndefinedReference {
                kind,
                name: name.to_string(),
                responder: responder_conf.name.clone(),
            };
            let signer = live_signers
                .get(responder_conf.signer.as_str())
                .cloned()
                .ok_or_else(|| missing("signer", &responder_conf.signer))?;
            let request_option = request_options
                .get(responder_conf.request_option.as_str())
                .cloned()
                .ok_or_else(|| missing("request option", &responder_conf.request_option))?;
            let response_option = response_options
                .get(responder_conf.response_option.as_str())
                .cloned()
                .ok_or_else(|| missing("response option", &responder_conf.response_option))?;

            if signer.is_mac()
                && (response_option.responder_id_by_name
                    || response_option.embed_certs_mode != EmbedCertsMode::None)
            {
                return Err(ResponderError::InvalidConf(format!(
                    "responder {} uses MAC signer {}, which supports neither responder id by name nor embedded certificates",
                    responder_conf.name,
                    signer.name()
                )));
            }

            let stores = responder_conf
                .stores
                .iter()
                .map(|name| {
                    live_stores
                        .get(name.as_str())
                        .cloned()
                        .ok_or_else(|| missing("store", name))
                })
                .collect::<Result<Vec<_>>>()?;
            let audit_option = responder_conf
                .audit_option
                .as_deref()
                .and_then(|name| audit_options.get(name).cloned());
            let certprofile_option = responder_conf
                .certprofile_option
                .as_deref()
                .and_then(|name| certprofile_options.get(name).cloned());

            let option = ResponderOption {
                mode: responder_conf.mode,
                inherit_ca_revocation: responder_conf.inherit_ca_revocation,
                negotiate_signature_algorithm: responder_conf.negotiate_signature_algorithm,
            };
            responders.push(Arc::new(Responder::new(
                responder_conf.name.clone(),
                option,
                request_option,
                response_option,
                signer,
                stores,
                audit_option,
                certprofile_option,
                responder_conf.servlet_paths.clone(),
            )?));
            mounts.extend(
                responder_conf
                    .servlet_paths
                    .iter()
                    .map(|path| (path.clone(), index)),
            );
        }
        let paths = PathTable::new(mounts)?;

        let cache = match &conf.response_cache {
            Some(cache_conf) => Some(build_cache(cache_conf, conf.master, &datasources).await?),
            None => None,
        };
        Ok::<_, ResponderError>((responders, paths, cache))
    }
    .await;

    let (responders, paths, cache) = match assembled {
        Ok(assembled) => assembled,
        Err(e) => {
            shutdown_stores(live_stores.values()).await;
            return Err(e);
        }
    };

    info!(
        responders = responders.len(),
        stores = live_stores.len(),
        cache = cache.is_some(),
        "Wired OCSP responders"
    );
    Ok(Wired {
        responders,
        paths,
        stores: live_stores.into_values().collect(),
        cache,
    })
}

async fn shutdown_stores<'a>(stores: impl Iterator<Item = &'a Arc<dyn StatusStore>>) {
    for store in stores {
        warn!(store = %store.name(), "Shutting down status store after failed start-up");
        store.shutdown().await;
    }
}

/// Pass one: name uniqueness per category and the responder name charset.
fn check_names(conf: &OcspServerConf) -> Result<()> {
    unique("responder", conf.responders.iter().map(|c| c.name.as_str()))?;
    unique("signer", conf.signers.iter().map(|c| c.name.as_str()))?;
    unique("request option", conf.request_options.iter().map(|c| c.name.as_str()))?;
    unique("response option", conf.response_options.iter().map(|c| c.name.as_str()))?;
    unique("audit option", conf.audit_options.iter().map(|c| c.name.as_str()))?;
    unique("certprofile option", conf.certprofile_options.iter().map(|c| c.name.as_str()))?;
    unique("store", conf.stores.iter().map(|c| c.name.as_str()))?;
    unique("datasource", conf.datasources.iter().map(|c| c.name.as_str()))?;

    if conf.responders.is_empty() {
        return Err(ResponderError::InvalidConf("no responder is configured".to_string()));
    }
    for responder in &conf.responders {
        if responder.name.is_empty() || !responder.name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ResponderError::InvalidConf(format!(
                "invalid responder name '{}', only ASCII letters and digits are allowed",
                responder.name
            )));
        }
    }
    Ok(())
}

fn unique<'a>(kind: &'static str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ResponderError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn index<'a, T>(
    kind: &'static str,
    items: impl Iterator<Item = (&'a str, &'a T)>,
) -> Result<HashMap<&'a str, &'a T>> {
    let mut map = HashMap::new();
    for (name, item) in items {
        if map.insert(name, item).is_some() {
            return Err(ResponderError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(map)
}

/// Cert-hash algorithms a store must support for one referencing responder.
fn required_cert_hash_algorithms(
    response_option: &ResponseOption,
    request_option: Option<&RequestOption>,
) -> BTreeSet<HashAlgorithm> {
    if !response_option.include_cert_hash {
        return BTreeSet::new();
    }
    match (response_option.cert_hash_algorithm, request_option) {
        (Some(algorithm), _) => [algorithm].into_iter().collect(),
        (None, Some(request_option)) => request_option.hash_algorithms.clone(),
        (None, None) => HashAlgorithm::DEFAULT_REQUEST.into_iter().collect(),
    }
}

async fn create_store(
    conf: &StoreConf,
    cert_hash_algorithms: BTreeSet<HashAlgorithm>,
    datasources: &HashMap<&str, &DatasourceConf>,
    registry: &StoreFactoryRegistry,
) -> Result<Arc<dyn StatusStore>> {
    if !registry.can_create(&conf.store_type) {
        return Err(ResponderError::InvalidConf(format!(
            "store {} has unsupported type '{}', known types: {}",
            conf.name,
            conf.store_type,
            registry.types().join(", ")
        )));
    }
    let datasource = match &conf.datasource {
        Some(name) => Some(
            datasources
                .get(name.as_str())
                .map(|datasource| (*datasource).clone())
                .ok_or_else(|| {
                    ResponderError::InvalidConf(format!(
                        "store {} references undefined datasource {name}",
                        conf.name
                    ))
                })?,
        ),
        None => None,
    };

    let mut settings = StoreSettings::new(conf.name.clone());
    settings.retention_interval_days = conf.retention_interval_days;
    settings.unknown_serial_as_good = conf.unknown_serial_as_good;
    settings.include_archive_cutoff = conf.include_archive_cutoff;
    settings.include_crl_id = conf.include_crl_id;
    settings.ignore_expired_cert = conf.ignore_expired_cert;
    settings.ignore_not_yet_valid_cert = conf.ignore_not_yet_valid_cert;
    settings.cert_hash_algorithms = cert_hash_algorithms;

    let context = StoreContext {
        settings,
        conf: conf.conf.clone(),
        datasource,
    };
    let store = registry.create(&conf.store_type, context).await?;
    info!(store = %conf.name, store_type = %conf.store_type, "Created status store");
    Ok(store)
}

fn build_signer(conf: &SignerConf) -> Result<ResponderSigner> {
    let keys = conf
        .keys
        .iter()
        .map(|key| -> Result<Arc<ConcurrentSigner>> {
            let material = key.key.read_key()?;
            Ok(Arc::new(ConcurrentSigner::new(key.algorithm, &material, key.parallelism)?))
        })
        .collect::<Result<Vec<_>>>()?;
    let certificate = conf.cert.as_ref().map(FileOrValue::read_certificate).transpose()?;
    let chain = conf
        .ca_certs
        .iter()
        .map(FileOrValue::read_certificate)
        .collect::<Result<Vec<_>>>()?;
    Ok(ResponderSigner::new(conf.name.clone(), keys, certificate, chain)?)
}

async fn build_cache(
    conf: &ResponseCacheConf,
    master: bool,
    datasources: &HashMap<&str, &DatasourceConf>,
) -> Result<Arc<ResponseCache>> {
    let backend: Arc<dyn CacheBackend> = match conf.backend {
        CacheBackendKind::Memory => Arc::new(InMemoryCacheBackend::new()),
        CacheBackendKind::Postgres => {
            let name = conf.datasource.as_deref().ok_or_else(|| {
                ResponderError::InvalidConf("postgres response cache needs a datasource".to_string())
            })?;
            let datasource = datasources.get(name).ok_or_else(|| {
                ResponderError::InvalidConf(format!(
                    "response cache references undefined datasource {name}"
                ))
            })?;
            let backend =
                PgCacheBackend::connect(&datasource.url, datasource.max_connections).await?;
            if master {
                backend.migrate().await?;
            }
            Arc::new(backend)
        }
    };

    let cache = Arc::new(ResponseCache::new(
        backend,
        master,
        chrono::Duration::seconds(conf.validity_seconds),
    ));
    if let Err(e) = cache.init().await {
        warn!(error = %e, "Response cache not on service yet, maintenance will retry");
    }
    Ok(cache)
}
