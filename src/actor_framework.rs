use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument, warn};

// =============================================================================
// 1. THE ABSTRACTION (Traits with Hooks, Params, and Actions)
// =============================================================================

/// Failures raised by the actor plumbing itself rather than by the entity.
///
/// Every entity error type converts from this so clients can return a single
/// domain error.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameworkError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    AlreadyExists(String),
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped the response")]
    ActorDropped,
}

/// Trait that any store record must implement to be managed by [`ResourceActor`].
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;
    type CreateParams: Send + Sync + Debug;
    type Patch: Send + Sync + Debug;
    type Action: Send + Sync + Debug;
    type ActionResult: Send + Sync + Debug;
    type Error: std::error::Error + From<FrameworkError> + Send + Sync + 'static;

    fn id(&self) -> &Self::Id;

    /// Construct the full entity from its id and creation parameters.
    fn from_create_params(id: Self::Id, params: Self::CreateParams) -> Result<Self, Self::Error>;

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn on_update(&mut self, patch: Self::Patch) -> Result<(), Self::Error>;
    fn on_delete(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    // --- Action Handler ---

    /// Handle a domain-specific action. Runs inside the actor loop, so the
    /// read-modify-write it performs is atomic with respect to other requests.
    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, Self::Error>;
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T, R> = oneshot::Sender<Result<R, <T as Entity>::Error>>;

#[derive(Debug)]
pub enum ResourceRequest<T: Entity> {
    /// Create with an actor-generated id.
    Create {
        params: T::CreateParams,
        respond_to: Response<T, T::Id>,
    },
    /// Create under a caller-chosen id. Fails if the id is taken.
    Insert {
        id: T::Id,
        params: T::CreateParams,
        respond_to: Response<T, T::Id>,
    },
    Get {
        id: T::Id,
        respond_to: Response<T, Option<T>>,
    },
    /// Fetch the entity, creating it from `params` first if it is absent.
    GetOrInsert {
        id: T::Id,
        params: T::CreateParams,
        respond_to: Response<T, T>,
    },
    Update {
        id: T::Id,
        patch: T::Patch,
        respond_to: Response<T, T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<T, ()>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T, T::ActionResult>,
    },
    List {
        respond_to: Response<T, Vec<T>>,
    },
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

pub struct ResourceActor<T: Entity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    next_id_fn: Box<dyn Fn() -> T::Id + Send + Sync>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> T::Id + Send + Sync + 'static,
    ) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        let client = ResourceClient::new(sender);
        (actor, client)
    }

    /// Runs until every client has been dropped.
    #[instrument(name = "resource_actor", skip(self), fields(entity = std::any::type_name::<T>()))]
    pub async fn run(mut self) {
        debug!("Actor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create { params, respond_to } => {
                    let id = (self.next_id_fn)();
                    let _ = respond_to.send(self.insert(id, params));
                }
                ResourceRequest::Insert { id, params, respond_to } => {
                    let _ = respond_to.send(self.insert(id, params));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let _ = respond_to.send(Ok(self.store.get(&id).cloned()));
                }
                ResourceRequest::GetOrInsert { id, params, respond_to } => {
                    if !self.store.contains_key(&id) {
                        if let Err(e) = self.insert(id.clone(), params) {
                            let _ = respond_to.send(Err(e));
                            continue;
                        }
                    }
                    let item = self.store.get(&id).cloned();
                    let _ = respond_to.send(item.ok_or_else(|| FrameworkError::NotFound(id.to_string()).into()));
                }
                ResourceRequest::Update { id, patch, respond_to } => {
                    let result = match self.store.get_mut(&id) {
                        Some(item) => item.on_update(patch).map(|_| item.clone()),
                        None => Err(FrameworkError::NotFound(id.to_string()).into()),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Delete { id, respond_to } => {
                    let result = match self.store.get(&id) {
                        Some(item) => item.on_delete(),
                        None => Err(FrameworkError::NotFound(id.to_string()).into()),
                    };
                    if result.is_ok() {
                        self.store.remove(&id);
                    }
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Action { id, action, respond_to } => {
                    let result = match self.store.get_mut(&id) {
                        Some(item) => item.handle_action(action),
                        None => Err(FrameworkError::NotFound(id.to_string()).into()),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::List { respond_to } => {
                    let _ = respond_to.send(Ok(self.store.values().cloned().collect()));
                }
            }
        }
        debug!("Actor stopped");
    }

    fn insert(&mut self, id: T::Id, params: T::CreateParams) -> Result<T::Id, T::Error> {
        if self.store.contains_key(&id) {
            warn!(id = %id, "Rejected insert over existing item");
            return Err(FrameworkError::AlreadyExists(id.to_string()).into());
        }
        let mut item = T::from_create_params(id.clone(), params)?;
        item.on_create()?;
        self.store.insert(id.clone(), item);
        Ok(id)
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

// Manual impl: a derive would demand `T: Clone` on the request type too.
impl<T: Entity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn call<R>(
        &self,
        build: impl FnOnce(Response<T, R>) -> ResourceRequest<T>,
    ) -> Result<R, T::Error> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(&self, params: T::CreateParams) -> Result<T::Id, T::Error> {
        self.call(|respond_to| ResourceRequest::Create { params, respond_to }).await
    }

    pub async fn insert(&self, id: T::Id, params: T::CreateParams) -> Result<T::Id, T::Error> {
        self.call(|respond_to| ResourceRequest::Insert { id, params, respond_to }).await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, T::Error> {
        self.call(|respond_to| ResourceRequest::Get { id, respond_to }).await
    }

    pub async fn get_or_insert(&self, id: T::Id, params: T::CreateParams) -> Result<T, T::Error> {
        self.call(|respond_to| ResourceRequest::GetOrInsert { id, params, respond_to }).await
    }

    pub async fn update(&self, id: T::Id, patch: T::Patch) -> Result<T, T::Error> {
        self.call(|respond_to| ResourceRequest::Update { id, patch, respond_to }).await
    }

    pub async fn delete(&self, id: T::Id) -> Result<(), T::Error> {
        self.call(|respond_to| ResourceRequest::Delete { id, respond_to }).await
    }

    pub async fn perform_action(&self, id: T::Id, action: T::Action) -> Result<T::ActionResult, T::Error> {
        self.call(|respond_to| ResourceRequest::Action { id, action, respond_to }).await
    }

    pub async fn list(&self) -> Result<Vec<T>, T::Error> {
        self.call(|respond_to| ResourceRequest::List { respond_to }).await
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq)]
    struct Bin {
        id: String,
        units: u32,
        sealed: bool,
    }

    #[derive(Debug)]
    struct BinCreate {
        units: u32,
    }

    #[derive(Debug)]
    enum BinAction {
        Seal,
        Take(u32),
    }

    #[derive(Debug, Clone, Error, PartialEq)]
    enum BinError {
        #[error("sealed")]
        Sealed,
        #[error("short by {0}")]
        Short(u32),
        #[error(transparent)]
        Framework(#[from] FrameworkError),
    }

    impl Entity for Bin {
        type Id = String;
        type CreateParams = BinCreate;
        type Patch = u32;
        type Action = BinAction;
        type ActionResult = u32;
        type Error = BinError;

        fn id(&self) -> &String {
            &self.id
        }

        fn from_create_params(id: String, params: BinCreate) -> Result<Self, BinError> {
            Ok(Self { id, units: params.units, sealed: false })
        }

        fn on_update(&mut self, units: u32) -> Result<(), BinError> {
            self.units = units;
            Ok(())
        }

        fn on_delete(&self) -> Result<(), BinError> {
            if self.sealed {
                return Err(BinError::Sealed);
            }
            Ok(())
        }

        fn handle_action(&mut self, action: BinAction) -> Result<u32, BinError> {
            match action {
                BinAction::Seal => {
                    self.sealed = true;
                    Ok(self.units)
                }
                BinAction::Take(n) if n > self.units => Err(BinError::Short(n - self.units)),
                BinAction::Take(n) => {
                    self.units -= n;
                    Ok(self.units)
                }
            }
        }
    }

    fn spawn_bins() -> ResourceClient<Bin> {
        let counter = Arc::new(AtomicU64::new(1));
        let next_id = move || format!("bin_{}", counter.fetch_add(1, Ordering::SeqCst));
        let (actor, client) = ResourceActor::new(10, next_id);
        tokio::spawn(actor.run());
        client
    }

    #[tokio::test]
    async fn test_resource_actor_with_actions() {
        let client = spawn_bins();

        let id = client.create(BinCreate { units: 5 }).await.unwrap();
        assert_eq!(id, "bin_1");

        assert_eq!(client.perform_action(id.clone(), BinAction::Take(2)).await, Ok(3));
        assert_eq!(
            client.perform_action(id.clone(), BinAction::Take(9)).await,
            Err(BinError::Short(6))
        );

        let bin = client.get(id.clone()).await.unwrap().unwrap();
        assert_eq!(bin.units, 3);
    }

    #[tokio::test]
    async fn test_insert_and_get_or_insert() {
        let client = spawn_bins();

        client.insert("north".into(), BinCreate { units: 1 }).await.unwrap();
        assert_eq!(
            client.insert("north".into(), BinCreate { units: 7 }).await,
            Err(BinError::Framework(FrameworkError::AlreadyExists("north".into())))
        );

        let existing = client.get_or_insert("north".into(), BinCreate { units: 7 }).await.unwrap();
        assert_eq!(existing.units, 1);
        let fresh = client.get_or_insert("south".into(), BinCreate { units: 7 }).await.unwrap();
        assert_eq!(fresh.units, 7);

        assert_eq!(client.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_hooks_can_veto_delete() {
        let client = spawn_bins();
        let id = client.create(BinCreate { units: 1 }).await.unwrap();
        client.perform_action(id.clone(), BinAction::Seal).await.unwrap();

        assert_eq!(client.delete(id.clone()).await, Err(BinError::Sealed));
        assert_eq!(
            client.delete("missing".into()).await,
            Err(BinError::Framework(FrameworkError::NotFound("missing".into())))
        );
    }
}
