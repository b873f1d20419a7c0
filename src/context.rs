//! Per-Connection Context
//!
//! Everything a command needs to address the store: the namespace and set
//! records live in, the data and type bin names, the shared store client
//! and the shared write policies. A context is built once per connection
//! and only read by command listeners.

use crate::config::StoreConfig;
use crate::store::{Policies, Store};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Context {
    /// Namespace every record is written to
    pub namespace: String,
    /// Set (container name) within the namespace
    pub set: String,
    /// Bin holding the container value
    pub bin: String,
    /// Bin holding the logical type name
    pub type_bin: String,
    /// Store client, shared by every connection
    pub client: Arc<dyn Store>,
    /// Write policies, shared by every connection
    pub policies: Arc<Policies>,
}

impl Context {
    pub fn new(config: &StoreConfig, client: Arc<dyn Store>, policies: Arc<Policies>) -> Self {
        Self {
            namespace: config.namespace.clone(),
            set: config.set.clone(),
            bin: config.bin.clone(),
            type_bin: config.type_bin.clone(),
            client,
            policies,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("namespace", &self.namespace)
            .field("set", &self.set)
            .field("bin", &self.bin)
            .field("type_bin", &self.type_bin)
            .finish_non_exhaustive()
    }
}
