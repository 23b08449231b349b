//! Namespace partitioning by persistent storage

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Namespace, PersistentVolumeClaim};
use kube::ResourceExt;

/// Namespace name -> PVC names, in scan order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespacePvcIndex {
    pvcs: BTreeMap<String, Vec<String>>,
}

impl NamespacePvcIndex {
    /// Group claims by namespace
    pub fn build(claims: &[PersistentVolumeClaim]) -> Self {
        let mut pvcs: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for claim in claims {
            pvcs.entry(claim.namespace().unwrap_or_default())
                .or_default()
                .push(claim.name_any());
        }
        Self { pvcs }
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.pvcs.contains_key(namespace)
    }

    /// Number of PVCs in a namespace, zero when absent
    pub fn count(&self, namespace: &str) -> usize {
        self.pvcs.get(namespace).map_or(0, Vec::len)
    }

    /// Namespaces with at least one PVC, sorted by name
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.pvcs.keys().map(String::as_str)
    }
}

/// Namespaces split by whether they hold persistent storage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespacePartition {
    /// (namespace, PVC count), sorted by name
    pub with_pvc: Vec<(String, usize)>,
    /// Namespaces without any PVC, in listing order
    pub without_pvc: Vec<String>,
}

impl NamespacePartition {
    /// Split namespaces using the PVC index.
    ///
    /// The "with PVC" side comes from the index keys, so a PVC whose namespace
    /// was not listed still shows up there. The "without PVC" side is the
    /// complement of the index within the namespace list.
    pub fn build(index: &NamespacePvcIndex, namespaces: &[Namespace]) -> Self {
        let with_pvc = index
            .namespaces()
            .map(|ns| (ns.to_string(), index.count(ns)))
            .collect();

        let without_pvc = namespaces
            .iter()
            .map(|ns| ns.name_any())
            .filter(|name| !index.contains(name))
            .collect();

        Self {
            with_pvc,
            without_pvc,
        }
    }

    /// Drop a namespace from both sides (the add-on's own namespace)
    pub fn excluding(mut self, namespace: &str) -> Self {
        self.with_pvc.retain(|(ns, _)| ns != namespace);
        self.without_pvc.retain(|ns| ns != namespace);
        self
    }
}
