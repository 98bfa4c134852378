//! Typed method tables.
//!
//! A [`Receiver`] lists its methods once, by name, in a [`MethodTable`]. Each
//! entry is classified by its Rust signature while the table is built, so the
//! scanner can tell conforming migration methods (`fn(&self) -> MethodFuture`)
//! from ones that merely share the naming convention.
mod scanner;

pub use scanner::{scan, parse_method_name, Defect, InvalidCandidate, Scan};

use crate::migration::{MethodFuture, MethodResult};

use futures_util::future::BoxFuture;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;


/// An object exposing migration methods by naming convention.
pub trait Receiver: Send + Sync + Sized + 'static {
    fn methods() -> MethodTable<Self>;
}


/// Values a method hands back once its future resolves.
pub trait MethodOutput: Send + 'static {
    const ARITY: usize;

    /// The migration result, for single-result outputs only.
    fn into_result(self) -> Option<MethodResult>;
}

impl MethodOutput for MethodResult {
    const ARITY: usize = 1;

    fn into_result(self) -> Option<MethodResult> {
        Some(self)
    }
}

impl<T: Send + 'static> MethodOutput for (T, MethodResult) {
    const ARITY: usize = 2;

    fn into_result(self) -> Option<MethodResult> {
        None
    }
}

impl<T: Send + 'static, U: Send + 'static> MethodOutput for (T, U, MethodResult) {
    const ARITY: usize = 3;

    fn into_result(self) -> Option<MethodResult> {
        None
    }
}


/// Call shape of a registered method, not counting the receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    pub params: usize,
    pub returns: usize,
}

impl Signature {
    pub fn is_conforming(&self) -> bool {
        self.params == 0 && self.returns == 1
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} parameter(s), {} return value(s)", self.params, self.returns)
    }
}


pub(crate) trait ErasedMethod<R>: Send + Sync {
    fn call<'a>(&'a self, receiver: &'a R) -> MethodFuture<'a>;
}

struct Conforming<F, O> {
    f: F,
    _output: PhantomData<fn() -> O>,
}

impl<R, F, O> ErasedMethod<R> for Conforming<F, O>
where
    R: Sync,
    F: for<'a> Fn(&'a R) -> BoxFuture<'a, O> + Send + Sync,
    O: MethodOutput,
{
    fn call<'a>(&'a self, receiver: &'a R) -> MethodFuture<'a> {
        let future = (self.f)(receiver);
        Box::pin(async move {
            future
                .await
                .into_result()
                .unwrap_or_else(|| Err(anyhow::anyhow!("method does not return a single result")))
        })
    }
}


/// One entry of a [`MethodTable`].
pub struct Method<R> {
    name: &'static str,
    signature: Signature,
    call: Option<Arc<dyn ErasedMethod<R>>>,
}

impl<R> Method<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    pub(crate) fn callable(&self) -> Option<Arc<dyn ErasedMethod<R>>> {
        self.call.clone()
    }
}

impl<R> fmt::Debug for Method<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}


/// Conversion of a method item into a table entry.
///
/// `Marker` only disambiguates the implementations by call shape.
pub trait IntoMethod<R, Marker>: Sized {
    fn into_method(self, name: &'static str) -> Method<R>;
}

impl<R, F, O> IntoMethod<R, fn() -> O> for F
where
    R: Sync + 'static,
    F: for<'a> Fn(&'a R) -> BoxFuture<'a, O> + Send + Sync + 'static,
    O: MethodOutput,
{
    fn into_method(self, name: &'static str) -> Method<R> {
        let signature = Signature { params: 0, returns: O::ARITY };
        let call = if signature.is_conforming() {
            let call: Arc<dyn ErasedMethod<R>> = Arc::new(Conforming { f: self, _output: PhantomData });
            Some(call)
        } else {
            None
        };
        Method { name, signature, call }
    }
}

impl<R, F, A, O> IntoMethod<R, fn(A) -> O> for F
where
    F: for<'a> Fn(&'a R, A) -> BoxFuture<'a, O>,
    O: MethodOutput,
{
    fn into_method(self, name: &'static str) -> Method<R> {
        Method { name, signature: Signature { params: 1, returns: O::ARITY }, call: None }
    }
}

impl<R, F, A, B, O> IntoMethod<R, fn(A, B) -> O> for F
where
    F: for<'a> Fn(&'a R, A, B) -> BoxFuture<'a, O>,
    O: MethodOutput,
{
    fn into_method(self, name: &'static str) -> Method<R> {
        Method { name, signature: Signature { params: 2, returns: O::ARITY }, call: None }
    }
}


/// The capability set of a receiver: every method it chose to expose.
pub struct MethodTable<R> {
    methods: Vec<Method<R>>,
}

impl<R> MethodTable<R> {
    pub fn new() -> Self {
        MethodTable { methods: Vec::new() }
    }

    pub fn method<M, Marker>(mut self, name: &'static str, method: M) -> Self
    where
        M: IntoMethod<R, Marker>,
    {
        self.methods.push(method.into_method(name));
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Method<R>> {
        self.methods.iter()
    }
}

impl<R> Default for MethodTable<R> {
    fn default() -> Self {
        Self::new()
    }
}


/// Builds a [`MethodTable`] from method identifiers, named after themselves.
///
/// ```ignore
/// impl Receiver for Migrator {
///     fn methods() -> MethodTable<Self> {
///         swellow_methods::methods!(Migrator => [V001_init_users_up, V001_init_users_down])
///     }
/// }
/// ```
#[macro_export]
macro_rules! methods {
    ($receiver:ty => [$($name:ident),* $(,)?]) => {
        $crate::receiver::MethodTable::<$receiver>::new()
            $(.method(stringify!($name), <$receiver>::$name))*
    };
}
