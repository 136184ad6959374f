// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys used by the operator
pub mod annotations {
    /// Owner reference written on CSIDriver objects handed to the csi-operator
    pub const CSI_OWNER_REF: &str = "csi.ceph.io/ownerref";
    /// Pod template annotation bumped to restart daemons after key rotation
    pub const RESTARTED_AT: &str = "ceph.rook.io/restartedAt";
    /// Key generation held by a keyring secret
    pub const KEY_GENERATION: &str = "ceph.rook.io/key-generation";
    /// Key generation the daemon mounting a keyring secret was restarted for
    pub const KEY_ROLLED_OUT: &str = "ceph.rook.io/key-generation-rolled-out";
}

/// Finalizer guarding CephFilesystem deletion
pub const FILESYSTEM_FINALIZER: &str = "cephfilesystem.ceph.rook.io";

/// The operator name reported on events
pub const OPERATOR_NAME: &str = "rook-ceph-operator";

/// Name of the ConfigMap holding CSI image overrides
pub const IMAGE_SET_CONFIGMAP: &str = "rook-csi-operator-image-set-configmap";

/// Driver name suffixes, prefixed with the operator namespace
pub mod drivers {
    pub const RBD_SUFFIX: &str = "rbd.csi.ceph.com";
    pub const CEPHFS_SUFFIX: &str = "cephfs.csi.ceph.com";
    pub const NFS_SUFFIX: &str = "nfs.csi.ceph.com";
}

/// Requeue intervals in seconds
pub mod requeue {
    /// Cluster missing or not ready yet
    pub const WAIT_FOR_CLUSTER_SECS: u64 = 10;
    /// Deletion blocked on dependents
    pub const DEPENDENTS_SECS: u64 = 10;
    /// After a failed reconcile pass
    pub const ERROR_SECS: u64 = 60;
    /// Upper bound on a single reconcile pass
    pub const PASS_TIMEOUT_SECS: u64 = 120;
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
