//! Path-keyed, single-shot change notification.
//!
//! A [`ChangeBus`] hands out one live [`ChangeToken`] per path. Firing a path
//! runs every callback registered on its current token exactly once, then
//! installs a fresh token so later subscribers wait for the *next* change.
//!
//! ```text
//! get_token("/home/index") ──► token#1 ◄── register(cb_a), register(cb_b)
//! signal("/home/index")    ──► token#1 fires: cb_a(), cb_b()
//!                              token#2 installed (empty waiter set)
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Callback run when a token fires.
pub type ChangeCallback = Box<dyn FnOnce() + Send + 'static>;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// ChangeToken
// =============================================================================

/// Single-fire change handle.
///
/// All clones of the `Arc<ChangeToken>` handed out for one generation of a
/// path share the same waiter set.
pub struct ChangeToken {
    id: u64,
    state: Mutex<TokenState>,
}

#[derive(Default)]
struct TokenState {
    fired: bool,
    waiters: Vec<ChangeCallback>,
}

impl ChangeToken {
    fn new() -> Self {
        Self {
            id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
            state: Mutex::new(TokenState::default()),
        }
    }

    /// Process-unique identity of this token generation.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this token has already fired.
    pub fn has_changed(&self) -> bool {
        self.state.lock().fired
    }

    /// Register a callback for the next firing.
    ///
    /// Registering on a token that already fired runs the callback
    /// immediately, so a subscriber racing a signal is never missed.
    pub fn register(&self, callback: impl FnOnce() + Send + 'static) {
        let mut state = self.state.lock();
        if state.fired {
            drop(state);
            callback();
            return;
        }
        state.waiters.push(Box::new(callback));
    }

    /// Fire the token. Returns the number of callbacks run.
    ///
    /// The waiter set is swapped out under the lock and callbacks run after
    /// it is released, so a callback may safely touch the bus again.
    fn fire(&self) -> usize {
        let waiters = {
            let mut state = self.state.lock();
            if state.fired {
                return 0;
            }
            state.fired = true;
            std::mem::take(&mut state.waiters)
        };

        let count = waiters.len();
        for callback in waiters {
            callback();
        }
        count
    }
}

impl fmt::Debug for ChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ChangeToken")
            .field("id", &self.id)
            .field("fired", &state.fired)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

// =============================================================================
// ChangeBus
// =============================================================================

/// Registry of live tokens keyed by path.
#[derive(Default)]
pub struct ChangeBus {
    tokens: Mutex<FxHashMap<String, Arc<ChangeToken>>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current live token for `path`, created on first request.
    pub fn get_token(&self, path: &str) -> Arc<ChangeToken> {
        let mut tokens = self.tokens.lock();
        if let Some(token) = tokens.get(path) {
            return Arc::clone(token);
        }
        let token = Arc::new(ChangeToken::new());
        tokens.insert(path.to_owned(), Arc::clone(&token));
        token
    }

    /// Fire the current token for `path` and install a fresh one.
    ///
    /// A path nobody asked a token for is a no-op. Returns the number of
    /// callbacks run. Every callback has completed when this returns.
    pub fn signal(&self, path: &str) -> usize {
        let previous = {
            let mut tokens = self.tokens.lock();
            match tokens.get_mut(path) {
                Some(slot) => std::mem::replace(slot, Arc::new(ChangeToken::new())),
                None => return 0,
            }
        };
        previous.fire()
    }

    /// Number of paths with a live token.
    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBus")
            .field("paths", &self.tokens.lock().len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
