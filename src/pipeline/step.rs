//! Step functions and accumulators shared by every stage.
//!
//! A step has the signature `(accumulator, element, index, sequence) -> accumulator`.
//! Stages turn a downstream step into a combined step; the pipeline folds its
//! stages into a single step and drives it over the input.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Predicate callback for filter stages: `(element, index, sequence) -> keep`.
pub type Predicate<T> = Arc<dyn Fn(&T, usize, &[T]) -> bool + Send + Sync>;

/// Transform callback for map stages: `(element, index, sequence) -> element`.
pub type Transform<T> = Arc<dyn Fn(&T, usize, &[T]) -> T + Send + Sync>;

/// Combine callback for reduce stages:
/// `(accumulator, element, index, sequence) -> accumulator`.
pub type Combine<T, A> = Arc<dyn Fn(A, &T, usize, &[T]) -> A + Send + Sync>;

/// A step function over accumulator type `Acc`.
///
/// A step built with [`Step::from_combine`] remembers which combine
/// callback it calls, so a reduce stage can recognise its own terminal step
/// when asked to wrap it.
pub struct Step<T, Acc> {
    run: Box<dyn Fn(Acc, &T, usize, &[T]) -> Acc + Send + Sync>,
    combine_id: Option<usize>,
}

impl<T, Acc> Step<T, Acc> {
    pub fn new<F>(step: F) -> Self
    where
        F: Fn(Acc, &T, usize, &[T]) -> Acc + Send + Sync + 'static,
    {
        Self {
            run: Box::new(step),
            combine_id: None,
        }
    }

    /// Terminal step that calls `combine` directly.
    pub fn from_combine(combine: &Combine<T, Acc>) -> Self
    where
        T: 'static,
        Acc: 'static,
    {
        let combine_id = callback_id(combine);
        let combine = Arc::clone(combine);
        Self {
            run: Box::new(
                move |acc: Acc, element: &T, index: usize, sequence: &[T]| {
                    combine(acc, element, index, sequence)
                },
            ),
            combine_id: Some(combine_id),
        }
    }

    pub fn call(&self, acc: Acc, element: &T, index: usize, sequence: &[T]) -> Acc {
        (self.run)(acc, element, index, sequence)
    }

    /// Whether this step is exactly `combine`, not a wrapper around it.
    pub fn is_combine<A>(&self, combine: &Combine<T, A>) -> bool {
        self.combine_id == Some(callback_id(combine))
    }
}

impl<T, Acc> fmt::Debug for Step<T, Acc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("combine", &self.combine_id.is_some())
            .finish_non_exhaustive()
    }
}

// Address of the shared callback; stable while any clone of the Arc lives.
fn callback_id<T, A>(combine: &Combine<T, A>) -> usize {
    Arc::as_ptr(combine).cast::<()>() as usize
}

/// Built-in terminal step for filter/map pipelines: append the element.
pub fn collect_step<T>() -> Step<T, Vec<T>>
where
    T: Clone + 'static,
{
    Step::new(|mut acc: Vec<T>, element: &T, _index: usize, _sequence: &[T]| {
        acc.push(element.clone());
        acc
    })
}

/// Final (or initial) accumulator of a pipeline.
///
/// The last stage decides the shape: filter/map pipelines build a new
/// sequence, reduce-terminated pipelines produce the reduce accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Accumulator<T, A> {
    /// Elements that survived every filter, after every map
    Sequence(Vec<T>),
    /// Result of the terminal reduce
    Value(A),
}

impl<T, A> Accumulator<T, A> {
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    pub fn as_sequence(&self) -> Option<&[T]> {
        match self {
            Self::Sequence(items) => Some(items),
            Self::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&A> {
        match self {
            Self::Sequence(_) => None,
            Self::Value(value) => Some(value),
        }
    }

    pub fn into_sequence(self) -> Option<Vec<T>> {
        match self {
            Self::Sequence(items) => Some(items),
            Self::Value(_) => None,
        }
    }

    pub fn into_value(self) -> Option<A> {
        match self {
            Self::Sequence(_) => None,
            Self::Value(value) => Some(value),
        }
    }
}
