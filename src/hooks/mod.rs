// Tapable hook engine - ordered taps, interceptors, three tap styles
//
// A `Hook<T>` is a named extension point carrying a payload of type `T`.
// Plugins attach taps in one of three styles (direct, callback, promise) and
// the compiler drives every stage through the promise-style entry point so
// all stages are uniformly awaitable.

use crate::error::HookError;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Outcome of a single tap: an optional carried value, or a failure that
/// aborts the remaining taps for this invocation.
pub type TapResult = Result<Option<Value>, anyhow::Error>;

/// Completion callback handed to callback-style taps.
pub type Done = Box<dyn FnOnce(TapResult) + Send + 'static>;

/// How a tap was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapKind {
    Direct,
    Callback,
    Promise,
}

/// Descriptor handed to `on_tap` interceptors before a tap runs.
#[derive(Debug, Clone)]
pub struct TapInfo {
    pub name: String,
    pub kind: TapKind,
}

enum TapHandler<T> {
    Direct(Box<dyn Fn(&T) -> TapResult + Send + Sync>),
    Callback(Box<dyn Fn(Arc<T>, Done) + Send + Sync>),
    Promise(Box<dyn Fn(Arc<T>) -> BoxFuture<'static, TapResult> + Send + Sync>),
}

impl<T> TapHandler<T> {
    fn kind(&self) -> TapKind {
        match self {
            TapHandler::Direct(_) => TapKind::Direct,
            TapHandler::Callback(_) => TapKind::Callback,
            TapHandler::Promise(_) => TapKind::Promise,
        }
    }
}

struct Tap<T> {
    name: String,
    handler: TapHandler<T>,
}

/// Call-time observer attached to a hook.
///
/// `on_call` fires once per invocation with the payload; `on_tap` fires once
/// per tap about to run. Interceptors never alter control flow.
#[derive(Default)]
pub struct Interceptor<T> {
    pub on_call: Option<Box<dyn Fn(&T) + Send + Sync>>,
    pub on_tap: Option<Box<dyn Fn(&TapInfo) + Send + Sync>>,
}

/// A named extension point.
///
/// Taps execute in registration order, unconditionally; there is no priority
/// reordering. A failing tap short-circuits all subsequent taps for that
/// invocation. Taps are registered during plugin setup, before any
/// invocation, and are never removed.
pub struct Hook<T> {
    name: &'static str,
    taps: Vec<Tap<T>>,
    interceptors: Vec<Interceptor<T>>,
}

impl<T: Send + Sync + 'static> Hook<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            taps: Vec::new(),
            interceptors: Vec::new(),
        }
    }

    /// Hook name, used in error reporting.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    /// Register a direct (synchronous) tap.
    ///
    /// # Errors
    ///
    /// `HookError::DuplicateTap` if `name` is already taken on this hook.
    pub fn tap(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&T) -> TapResult + Send + Sync + 'static,
    ) -> Result<(), HookError> {
        self.push_tap(name.into(), TapHandler::Direct(Box::new(f)))
    }

    /// Register a callback-style tap. The tap signals completion through the
    /// `Done` callback it receives as its last argument.
    pub fn tap_callback(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(Arc<T>, Done) + Send + Sync + 'static,
    ) -> Result<(), HookError> {
        self.push_tap(name.into(), TapHandler::Callback(Box::new(f)))
    }

    /// Register a promise-style tap returning a boxed future.
    pub fn tap_promise(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(Arc<T>) -> BoxFuture<'static, TapResult> + Send + Sync + 'static,
    ) -> Result<(), HookError> {
        self.push_tap(name.into(), TapHandler::Promise(Box::new(f)))
    }

    fn push_tap(&mut self, name: String, handler: TapHandler<T>) -> Result<(), HookError> {
        if self.taps.iter().any(|t| t.name == name) {
            return Err(HookError::DuplicateTap {
                hook: self.name,
                tap: name,
            });
        }
        self.taps.push(Tap { name, handler });
        Ok(())
    }

    /// Attach a call-time interceptor.
    pub fn intercept(&mut self, interceptor: Interceptor<T>) {
        self.interceptors.push(interceptor);
    }

    fn fire_on_call(&self, payload: &T) {
        for interceptor in &self.interceptors {
            if let Some(on_call) = &interceptor.on_call {
                on_call(payload);
            }
        }
    }

    fn fire_on_tap(&self, tap: &Tap<T>) {
        if self.interceptors.is_empty() {
            return;
        }
        let info = TapInfo {
            name: tap.name.clone(),
            kind: tap.handler.kind(),
        };
        for interceptor in &self.interceptors {
            if let Some(on_tap) = &interceptor.on_tap {
                on_tap(&info);
            }
        }
    }

    /// Invoke all taps synchronously.
    ///
    /// Only direct taps can run on this path; hitting a callback- or
    /// promise-style tap fails with `HookError::AsyncTap` instead of
    /// silently skipping it.
    pub fn call(&self, payload: &T) -> Result<Option<Value>, HookError> {
        self.fire_on_call(payload);

        let mut carried = None;
        for tap in &self.taps {
            self.fire_on_tap(tap);
            match &tap.handler {
                TapHandler::Direct(f) => match f(payload) {
                    Ok(Some(value)) => carried = Some(value),
                    Ok(None) => {}
                    Err(cause) => {
                        return Err(HookError::Tap {
                            hook: self.name,
                            tap: tap.name.clone(),
                            cause,
                        })
                    }
                },
                _ => {
                    return Err(HookError::AsyncTap {
                        hook: self.name,
                        tap: tap.name.clone(),
                    })
                }
            }
        }
        Ok(carried)
    }

    /// Invoke all taps as an awaitable series.
    ///
    /// Taps run strictly in registration order: direct taps inline,
    /// promise taps awaited, callback taps bridged through a oneshot
    /// completion channel. The returned value is the last non-`None` value
    /// carried forward by any tap; the payload itself is never replaced.
    pub async fn call_promise(&self, payload: Arc<T>) -> Result<Option<Value>, HookError> {
        self.fire_on_call(&payload);

        let mut carried = None;
        for tap in &self.taps {
            self.fire_on_tap(tap);
            let result = match &tap.handler {
                TapHandler::Direct(f) => f(&payload),
                TapHandler::Promise(f) => f(Arc::clone(&payload)).await,
                TapHandler::Callback(f) => {
                    let (tx, rx) = oneshot::channel();
                    let done: Done = Box::new(move |result| {
                        let _ = tx.send(result);
                    });
                    f(Arc::clone(&payload), done);
                    match rx.await {
                        Ok(result) => result,
                        // The tap dropped its completion callback without
                        // calling it.
                        Err(_) => Err(anyhow::anyhow!("completion callback dropped")),
                    }
                }
            };
            match result {
                Ok(Some(value)) => carried = Some(value),
                Ok(None) => {}
                Err(cause) => {
                    return Err(HookError::Tap {
                        hook: self.name,
                        tap: tap.name.clone(),
                        cause,
                    })
                }
            }
        }
        Ok(carried)
    }

    /// Invoke all taps and deliver the terminal result to `done`.
    pub async fn call_callback(&self, payload: Arc<T>, done: Done) {
        let result = self
            .call_promise(payload)
            .await
            .map_err(anyhow::Error::from);
        done(result);
    }
}
