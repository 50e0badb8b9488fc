//! Status derivation for nodes and pods
//!
//! Reduces the overlapping status signals Kubernetes reports (conditions,
//! container states, spec flags, deletion markers) into the single status
//! strings `kubectl get` displays.

mod node;
mod pod;


pub use node::{resolve_node, NodeState, LABEL_NODE_ROLE_PREFIX};
pub use pod::{resolve_pod, LastState, PodState};
