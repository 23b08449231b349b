//! Audit pipeline
//!
//! Runs the report sections in order against a live cluster:
//! cluster info, Kasten install, profiles, then the RPO of every namespace
//! with and without PVCs.

use std::io::Write;
use std::pin::pin;

use chrono::Utc;
use futures::{StreamExt, stream};
use kasten_audit_core::{
    AuditConfig, ClusterInfo, NamespacePartition, NamespacePvcIndex, ProfileVerdict, RpoOutcome,
    assess_nodes, audit_profiles, evaluate_rpo, find_crashlooping_pods, order_actions,
};
use kasten_rs::{ConfigSource, KastenClient};

use crate::error::AuditError;
use crate::render;

/// Pass/fail view of a finished audit
#[derive(Debug, Clone, PartialEq)]
pub struct AuditSummary {
    pub nodes_healthy: bool,
    pub addon_pods_healthy: bool,
    pub kasten_version: String,
    pub profiles: ProfileVerdict,
    /// Namespaces whose RPO could not be measured
    pub namespaces_without_rpo: Vec<String>,
}

/// Drives the report against one cluster
pub struct Auditor {
    client: KastenClient,
    config: AuditConfig,
}

impl Auditor {
    pub fn new(client: KastenClient, config: AuditConfig) -> Self {
        Self { client, config }
    }

    /// Run every section, writing the report as each one completes.
    ///
    /// A fatal error stops the run; sections already written stay written.
    pub async fn run<W: Write>(&self, out: &mut W, source: ConfigSource) -> Result<AuditSummary, AuditError> {
        render::runtime(out, source)?;
        let nodes_healthy = self.cluster_info(out).await?;
        let (kasten_version, addon_pods_healthy) = self.check_kasten_install(out).await?;
        let profiles = self.audit_profiles(out).await?;
        let namespaces_without_rpo = self.audit_rpo(out).await?;

        Ok(AuditSummary {
            nodes_healthy,
            addon_pods_healthy,
            kasten_version,
            profiles,
            namespaces_without_rpo,
        })
    }

    /// Version, platform and node readiness; returns whether all nodes are ready
    pub async fn cluster_info<W: Write>(&self, out: &mut W) -> Result<bool, AuditError> {
        let info = ClusterInfo::from(&self.client.server_version().await?);
        let nodes = self.client.nodes().await?;
        let health = assess_nodes(&nodes);
        tracing::debug!("Scanned {} nodes, {} not ready", health.total, health.unready.len());

        render::cluster(out, &info, &health)?;
        Ok(health.is_healthy())
    }

    /// Namespace, Helm release and crash-looping pods of the add-on.
    ///
    /// Returns the application version and whether no pod is crash-looping.
    pub async fn check_kasten_install<W: Write>(&self, out: &mut W) -> Result<(String, bool), AuditError> {
        let namespace = &self.config.namespace;
        render::install_header(out, namespace, &self.config.release)?;

        if !self.client.namespace_exists(namespace).await? {
            render::namespace_missing(out, namespace)?;
            return Err(AuditError::NamespaceNotFound(namespace.clone()));
        }

        let release = self.client.helm_release(namespace, &self.config.release).await?;
        render::kasten_version(out, release.app_version())?;

        let pods = self.client.pods(namespace).await?;
        let crashing = find_crashlooping_pods(&pods);
        render::pod_health(out, namespace, &crashing)?;

        Ok((release.app_version().to_string(), crashing.is_empty()))
    }

    pub async fn audit_profiles<W: Write>(&self, out: &mut W) -> Result<ProfileVerdict, AuditError> {
        let profiles = self.client.profiles(&self.config.namespace).await?;
        let audit = audit_profiles(&profiles);
        render::profiles(out, &audit)?;
        Ok(audit.verdict())
    }

    /// RPO of every namespace except the add-on's own.
    ///
    /// Returns the namespaces for which no RPO could be measured.
    pub async fn audit_rpo<W: Write>(&self, out: &mut W) -> Result<Vec<String>, AuditError> {
        let pvcs = self.client.persistent_volume_claims().await?;
        let index = NamespacePvcIndex::build(&pvcs);
        let namespaces = self.client.namespaces().await?;
        let partition = NamespacePartition::build(&index, &namespaces).excluding(&self.config.namespace);

        tracing::info!(namespaces_with_pvcs = ?partition.with_pvc, "namespaces with pvcs");
        tracing::info!(namespaces_without_pvcs = ?partition.without_pvc, "namespaces without pvcs");

        let mut unmeasured = Vec::new();

        render::banner(out, "Namespaces with PVC")?;
        let with_pvc: Vec<(String, Option<usize>)> = partition
            .with_pvc
            .into_iter()
            .map(|(ns, count)| (ns, Some(count)))
            .collect();
        self.rpo_pass(out, &with_pvc, &mut unmeasured).await?;

        render::banner(out, "Namespaces without PVC")?;
        let without_pvc: Vec<(String, Option<usize>)> =
            partition.without_pvc.into_iter().map(|ns| (ns, None)).collect();
        self.rpo_pass(out, &without_pvc, &mut unmeasured).await?;

        Ok(unmeasured)
    }

    /// Fetch backup actions for each namespace with bounded concurrency and
    /// print them in input order.
    async fn rpo_pass<W: Write>(
        &self,
        out: &mut W,
        namespaces: &[(String, Option<usize>)],
        unmeasured: &mut Vec<String>,
    ) -> Result<(), AuditError> {
        let client = &self.client;
        let mut fetched = pin!(
            stream::iter(namespaces)
                .map(|(ns, count)| async move { (ns, *count, client.backup_actions(ns).await) })
                .buffered(self.config.concurrency.max(1))
        );

        while let Some((namespace, pvc_count, result)) = fetched.next().await {
            match pvc_count {
                Some(count) => render::namespace_with_pvc(out, namespace, count)?,
                None => render::namespace_without_pvc(out, namespace)?,
            }

            let mut actions = match result {
                Ok(actions) => actions,
                Err(e) => {
                    tracing::warn!("Failed to list backupactions in {}: {}", namespace, e);
                    render::rpo_unavailable(out, namespace, &e)?;
                    unmeasured.push(namespace.clone());
                    continue;
                }
            };

            order_actions(&mut actions, self.config.action_order);
            let outcome = evaluate_rpo(&actions, Utc::now());
            if !matches!(outcome, RpoOutcome::Measured { .. }) {
                unmeasured.push(namespace.clone());
            }
            render::rpo(out, namespace, &actions, &outcome)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::time::Duration;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use chrono::{DateTime, SecondsFormat};
    use http::{Request, Response, StatusCode};
    use kasten_audit_core::ActionOrder;
    use kube::client::Body;
    use serde_json::{Value, json};

    const NAMESPACES: &str = "/api/v1/namespaces";

    struct Route {
        status: StatusCode,
        body: Value,
        delay: Duration,
    }

    /// Canned API server: one JSON response per request path
    #[derive(Default)]
    struct MockApi {
        routes: HashMap<String, Route>,
    }

    impl MockApi {
        fn route(mut self, path: &str, status: StatusCode, body: Value, delay: Duration) -> Self {
            self.routes.insert(path.to_string(), Route { status, body, delay });
            self
        }

        fn json(self, path: &str, body: Value) -> Self {
            self.route(path, StatusCode::OK, body, Duration::ZERO)
        }

        fn list(self, path: &str, items: Vec<Value>) -> Self {
            self.json(path, list_of(items))
        }

        fn client(self) -> KastenClient {
            let routes = Arc::new(self.routes);
            let service = tower::service_fn(move |req: Request<Body>| {
                let routes = routes.clone();
                async move {
                    let (status, body, delay) = match routes.get(req.uri().path()) {
                        Some(route) => (route.status, route.body.clone(), route.delay),
                        None => (StatusCode::NOT_FOUND, failure(404, "NotFound"), Duration::ZERO),
                    };
                    tokio::time::sleep(delay).await;
                    let body = Body::from(serde_json::to_vec(&body).unwrap());
                    Ok::<_, Infallible>(Response::builder().status(status).body(body).unwrap())
                }
            });
            KastenClient::new(kube::Client::new(service, "default"))
        }
    }

    fn list_of(items: Vec<Value>) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "List",
            "metadata": {"resourceVersion": "1"},
            "items": items
        })
    }

    fn failure(code: u16, reason: &str) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "Status",
            "metadata": {},
            "status": "Failure",
            "message": format!("request failed: {}", reason),
            "reason": reason,
            "code": code
        })
    }

    fn backup_actions_path(namespace: &str) -> String {
        format!("/apis/actions.kio.kasten.io/v1alpha1/namespaces/{}/backupactions", namespace)
    }

    fn ts(t: DateTime<Utc>) -> String {
        t.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn make_namespace(name: &str) -> Value {
        json!({"apiVersion": "v1", "kind": "Namespace", "metadata": {"name": name}})
    }

    fn make_pvc(namespace: &str, name: &str) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "PersistentVolumeClaim",
            "metadata": {"name": name, "namespace": namespace}
        })
    }

    fn make_action(
        namespace: &str,
        name: &str,
        state: &str,
        created: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Value {
        json!({
            "apiVersion": "actions.kio.kasten.io/v1alpha1",
            "kind": "BackupAction",
            "metadata": {"name": name, "namespace": namespace, "creationTimestamp": ts(created)},
            "spec": {},
            "status": {"state": state, "endTime": ts(end)}
        })
    }

    /// Namespaces listed out of name order, PVCs in `shop` and in the add-on
    /// namespace, a slow failing listing in `wiki` and nothing in `default`
    fn rpo_cluster() -> MockApi {
        let now = Utc::now();
        let hours = chrono::Duration::hours;

        MockApi::default()
            .list(
                "/api/v1/persistentvolumeclaims",
                vec![
                    make_pvc("shop", "data-postgres-0"),
                    make_pvc("kasten-io", "catalog-pv-claim"),
                    make_pvc("shop", "data-redis-0"),
                ],
            )
            .list(
                NAMESPACES,
                vec![
                    make_namespace("wiki"),
                    make_namespace("kasten-io"),
                    make_namespace("default"),
                    make_namespace("shop"),
                ],
            )
            .list(
                &backup_actions_path("shop"),
                vec![
                    make_action("shop", "nightly-old", "Complete", now - hours(31), now - hours(30)),
                    make_action(
                        "shop",
                        "nightly-new",
                        "Complete",
                        now - hours(2),
                        now - hours(1) - chrono::Duration::minutes(30),
                    ),
                    make_action("shop", "hourly-failed", "Failed", now - hours(1), now - hours(1)),
                ],
            )
            .route(
                &backup_actions_path("wiki"),
                StatusCode::INTERNAL_SERVER_ERROR,
                failure(500, "InternalError"),
                Duration::from_millis(150),
            )
            .list(&backup_actions_path("default"), vec![])
    }

    fn position(text: &str, needle: &str) -> usize {
        text.find(needle)
            .unwrap_or_else(|| panic!("{:?} not found in report:\n{}", needle, text))
    }

    #[tokio::test]
    async fn test_missing_addon_namespace_stops_the_run() {
        let auditor = Auditor::new(MockApi::default().client(), AuditConfig::default());
        let mut out = Vec::new();

        let err = auditor.check_kasten_install(&mut out).await.unwrap_err();
        assert!(matches!(err, AuditError::NamespaceNotFound(ref ns) if ns == "kasten-io"));

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("checking if Kasten is installed in namespace kasten-io under the release k10"));
        assert!(text.contains("WARNING !! kasten-io namespace not found"));
        assert!(!text.contains("The version of kasten"));
    }

    #[tokio::test]
    async fn test_rpo_pass_excludes_addon_namespace_and_continues_after_errors() {
        let auditor = Auditor::new(rpo_cluster().client(), AuditConfig::default());
        let mut out = Vec::new();

        let unmeasured = auditor.audit_rpo(&mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(unmeasured, vec!["wiki", "default"]);
        assert!(!text.contains("kasten-io"));

        let sections = [
            "Namespaces with PVC",
            "shop has 2 PVCs",
            "The last RPO is 0 days and 1 hours",
            "Namespaces without PVC",
            "wiki has no PVC",
            "could not list backupactions in namespace wiki",
            "default has no PVC",
            "No backupactions in namespace default",
        ];
        let positions: Vec<usize> = sections.iter().map(|s| position(&text, s)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "report out of order:\n{}", text);
    }

    #[tokio::test]
    async fn test_actions_are_ordered_before_table_and_scan() {
        let auditor = Auditor::new(rpo_cluster().client(), AuditConfig::default());
        let mut out = Vec::new();
        auditor.audit_rpo(&mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(position(&text, "hourly-failed") < position(&text, "nightly-new"));
        assert!(position(&text, "nightly-new") < position(&text, "nightly-old"));
        assert!(text.contains("The last RPO is 0 days and 1 hours"));

        let as_listed = AuditConfig {
            action_order: ActionOrder::AsListed,
            ..AuditConfig::default()
        };
        let auditor = Auditor::new(rpo_cluster().client(), as_listed);
        let mut out = Vec::new();
        auditor.audit_rpo(&mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(position(&text, "nightly-old") < position(&text, "nightly-new"));
        assert!(text.contains("The last RPO is 1 days and 6 hours"));
    }

    #[tokio::test]
    async fn test_concurrent_pass_prints_in_sequential_order() {
        let mut reports = Vec::new();
        for concurrency in [1, 4] {
            let config = AuditConfig {
                concurrency,
                ..AuditConfig::default()
            };
            let auditor = Auditor::new(rpo_cluster().client(), config);
            let mut out = Vec::new();
            auditor.audit_rpo(&mut out).await.unwrap();
            reports.push(String::from_utf8(out).unwrap());
        }

        assert_eq!(reports[0], reports[1]);
    }

    #[tokio::test]
    async fn test_full_run_summary() {
        let release = json!({
            "name": "k10",
            "namespace": "kasten-io",
            "version": 2,
            "info": {"status": "deployed"},
            "chart": {"metadata": {"name": "k10", "version": "7.0.5", "appVersion": "7.0.5"}}
        });
        let payload = STANDARD.encode(STANDARD.encode(release.to_string()));

        let api = rpo_cluster()
            .json(
                "/version",
                json!({
                    "major": "1",
                    "minor": "30",
                    "gitVersion": "v1.30.2",
                    "gitCommit": "fake",
                    "gitTreeState": "clean",
                    "buildDate": "2024-06-01T00:00:00Z",
                    "goVersion": "go1.22.4",
                    "compiler": "gc",
                    "platform": "linux/amd64"
                }),
            )
            .list(
                "/api/v1/nodes",
                vec![json!({
                    "apiVersion": "v1",
                    "kind": "Node",
                    "metadata": {"name": "worker-1"},
                    "status": {"conditions": [{"type": "Ready", "status": "True"}]}
                })],
            )
            .json(&format!("{}/kasten-io", NAMESPACES), make_namespace("kasten-io"))
            .list(
                "/api/v1/namespaces/kasten-io/secrets",
                vec![json!({
                    "apiVersion": "v1",
                    "kind": "Secret",
                    "metadata": {
                        "name": "sh.helm.release.v1.k10.v2",
                        "namespace": "kasten-io",
                        "labels": {"owner": "helm", "name": "k10", "status": "deployed", "version": "2"}
                    },
                    "data": {"release": payload}
                })],
            )
            .list(
                "/api/v1/namespaces/kasten-io/pods",
                vec![json!({
                    "apiVersion": "v1",
                    "kind": "Pod",
                    "metadata": {"name": "catalog-svc-0", "namespace": "kasten-io"},
                    "status": {
                        "phase": "Running",
                        "containerStatuses": [{
                            "name": "catalog-svc",
                            "image": "gcr.io/kasten-images/catalog:7.0.5",
                            "imageID": "",
                            "ready": true,
                            "restartCount": 0,
                            "state": {"running": {}}
                        }]
                    }
                })],
            )
            .list(
                "/apis/config.kio.kasten.io/v1alpha1/namespaces/kasten-io/profiles",
                vec![json!({
                    "apiVersion": "config.kio.kasten.io/v1alpha1",
                    "kind": "Profile",
                    "metadata": {"name": "s3-immutable", "namespace": "kasten-io"},
                    "spec": {
                        "type": "Location",
                        "locationSpec": {
                            "location": {
                                "locationType": "ObjectStore",
                                "objectStore": {"name": "backups", "protectionPeriod": "168h0m0s"}
                            }
                        }
                    },
                    "status": {"validation": "Success"}
                })],
            );

        let auditor = Auditor::new(api.client(), AuditConfig::default());
        let mut out = Vec::new();
        let summary = auditor.run(&mut out, ConfigSource::InCluster).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(summary.nodes_healthy);
        assert!(summary.addon_pods_healthy);
        assert_eq!(summary.kasten_version, "7.0.5");
        assert_eq!(summary.profiles, ProfileVerdict::Protected);
        assert_eq!(summary.namespaces_without_rpo, vec!["wiki", "default"]);

        assert!(position(&text, "Audit tool is executing in pod") < position(&text, "Kubernetes version : 1.30"));
        assert!(position(&text, "The version of kasten is 7.0.5") < position(&text, "Auditing profiles"));
        assert!(text.contains("No pods in the kasten namespace kasten-io are on error"));
    }
}
