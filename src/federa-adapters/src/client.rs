//! Hand-off to backend clients.
//!
//! Planning ends with native fragments under converter nodes. Running them
//! belongs to a [`BackendClient`] per backend kind; this module only checks
//! that a fragment reaches a client that can run it.

use common_error::{FederaError, FederaResult};
use federa_core::{BackendKind, Value};
use federa_logical::{NativeFragment, NodeId, NodeKind, Plan};
use log::debug;

/// Rows produced by a backend, one `Vec<Value>` per row.
pub type RowIter<'a> = Box<dyn Iterator<Item = FederaResult<Vec<Value>>> + 'a>;

/// Client for one backend kind.
pub trait BackendClient: Send + Sync {
    /// Per-connection state.
    type Session;

    /// Backend kind whose fragments this client runs.
    fn backend(&self) -> BackendKind;

    /// Open a session against the named store.
    fn open(&self, store: &str) -> FederaResult<Self::Session>;

    /// Run `fragments` (innermost first) with `params` bound to their
    /// placeholders.
    fn execute<'s>(
        &self,
        session: &'s mut Self::Session,
        fragments: &[&NativeFragment],
        params: &[Value],
    ) -> FederaResult<RowIter<'s>>;
}

/// The native part of a plan below one converter.
#[derive(Debug, Clone)]
pub struct StoreQuery<'a> {
    /// Converter node that pulls the rows into the enumerable engine.
    pub converter: NodeId,
    pub backend: BackendKind,
    pub store: String,
    /// Fragments of the adapter subtree, innermost (the scan) first.
    pub fragments: Vec<&'a NativeFragment>,
}

impl StoreQuery<'_> {
    /// Highest parameter index referenced, plus one.
    pub fn param_count(&self) -> usize {
        self.fragments
            .iter()
            .filter_map(|f| f.params.last())
            .max()
            .map_or(0, |last| last + 1)
    }
}

/// Every store query of `plan`, in plan pre-order.
pub fn store_queries(plan: &Plan) -> FederaResult<Vec<StoreQuery<'_>>> {
    let mut queries = Vec::new();
    for id in plan.arena.preorder(plan.root)? {
        let node = plan.arena.get(id)?;
        let NodeKind::Converter { input, from } = &node.kind else {
            continue;
        };
        let (Some(backend), Some(store)) = (from.backend(), from.store()) else {
            continue;
        };
        let mut fragments = Vec::new();
        for below in plan.arena.preorder(*input)? {
            let below = plan.arena.get(below)?;
            if below.convention() != from {
                break;
            }
            match &below.native {
                Some(fragment) => fragments.push(fragment),
                None => {
                    return Err(FederaError::planning(format!(
                        "{} node in {from} carries no native fragment",
                        below.op()
                    )));
                }
            }
        }
        fragments.reverse();
        queries.push(StoreQuery {
            converter: id,
            backend,
            store: store.to_string(),
            fragments,
        });
    }
    Ok(queries)
}

/// Run `query` through `client` after checking the backend matches and every
/// placeholder has a bound value.
pub fn execute_store_query<'s, C: BackendClient>(
    client: &C,
    session: &'s mut C::Session,
    query: &StoreQuery<'_>,
    params: &[Value],
) -> FederaResult<RowIter<'s>> {
    if query.backend != client.backend() {
        return Err(FederaError::invalid_parameter(format!(
            "{} query for store {} sent to a {} client",
            query.backend,
            query.store,
            client.backend()
        )));
    }
    if let Some(fragment) = query.fragments.iter().find(|f| f.backend != query.backend) {
        return Err(FederaError::internal(format!(
            "{} fragment in a {} query",
            fragment.backend, query.backend
        )));
    }
    let needed = query.param_count();
    if params.len() < needed {
        return Err(FederaError::invalid_parameter(format!(
            "query for store {} references {needed} parameters, {} bound",
            query.store,
            params.len()
        )));
    }
    debug!(
        "executing {} fragments on {} store {}",
        query.fragments.len(),
        query.backend,
        query.store
    );
    client.execute(session, &query.fragments, params)
}
